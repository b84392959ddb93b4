use crate::concurrency::SiteLock;
use crate::lifecycle::{validate_transition, SiteState};
use crate::state::{observe, write_atomic, SiteMarker};
use crate::CoreError;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use wpsite_runtime::command::{CommandRunner, CommandSpec};
use wpsite_runtime::{
    hosts, link, HostsOutcome, LinkOutcome, MissingPrereq, Platform, Provisioned, Provisioner,
    RuntimeError,
};
use wpsite_runtime::privilege::Elevator;
use wpsite_schema::{render, SiteLayout, SiteName, ToolConfig};

/// Everything a controller needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory that holds one subdirectory per site.
    pub root: PathBuf,
    pub config: ToolConfig,
    /// Skip the dependency check/installation before `create`.
    pub skip_prereqs: bool,
}

impl Settings {
    pub fn new(root: impl Into<PathBuf>, config: ToolConfig) -> Self {
        Self {
            root: root.into(),
            config,
            skip_prereqs: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleAction {
    Enable,
    Disable,
}

impl ToggleAction {
    fn compose_verb(self) -> &'static str {
        match self {
            ToggleAction::Enable => "start",
            ToggleAction::Disable => "stop",
        }
    }

    fn target_state(self) -> SiteState {
        match self {
            ToggleAction::Enable => SiteState::Running,
            ToggleAction::Disable => SiteState::Stopped,
        }
    }
}

impl std::fmt::Display for ToggleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToggleAction::Enable => write!(f, "enable"),
            ToggleAction::Disable => write!(f, "disable"),
        }
    }
}

/// Result of one host-level side effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Step {
    Done(String),
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct DependencyReport {
    pub name: String,
    pub outcome: Provisioned,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateReport {
    pub name: SiteName,
    pub site_dir: PathBuf,
    pub created_dir: bool,
    pub dependencies: Vec<DependencyReport>,
    pub link: Step,
    pub hosts: Step,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteReport {
    pub name: SiteName,
    pub site_dir: PathBuf,
    pub containers_removed: bool,
    pub link: Step,
    pub hosts: Step,
}

#[derive(Debug, Clone, Serialize)]
pub struct SiteStatus {
    pub name: SiteName,
    pub state: SiteState,
    pub site_dir: PathBuf,
    pub updated_at: Option<String>,
    /// `None` when the platform has no NGINX sites directory.
    pub link_present: Option<bool>,
    /// `None` when the platform has no hosts file. An unreadable hosts file
    /// fails the whole query.
    pub hosts_entry: Option<bool>,
    /// `<compose> ps` output, when the site exists and the command succeeded.
    pub containers: Option<String>,
    pub missing_dependencies: Vec<MissingPrereq>,
}

/// Drives a site through its lifecycle.
///
/// All external effects go through the injected `CommandRunner` and
/// `Elevator`; the controller itself only touches files under the sites root.
pub struct SiteController<'a> {
    layout: SiteLayout,
    config: ToolConfig,
    skip_prereqs: bool,
    platform: Platform,
    runner: &'a dyn CommandRunner,
    elevator: &'a dyn Elevator,
}

impl<'a> SiteController<'a> {
    pub fn new(
        settings: Settings,
        platform: Platform,
        runner: &'a dyn CommandRunner,
        elevator: &'a dyn Elevator,
    ) -> Self {
        Self {
            layout: SiteLayout::new(settings.root),
            config: settings.config,
            skip_prereqs: settings.skip_prereqs,
            platform,
            runner,
            elevator,
        }
    }

    pub fn layout(&self) -> &SiteLayout {
        &self.layout
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn hosts_file(&self) -> Option<PathBuf> {
        self.config
            .hosts_file
            .clone()
            .or_else(|| self.platform.hosts_file())
    }

    pub fn nginx_sites_dir(&self) -> Option<PathBuf> {
        self.config
            .nginx_sites_dir
            .clone()
            .or_else(|| self.platform.nginx_sites_dir())
    }

    pub fn state(&self, name: &SiteName) -> SiteState {
        observe(&self.layout, name)
    }

    fn lock(&self, name: &SiteName) -> Result<SiteLock, CoreError> {
        SiteLock::try_acquire(&self.layout.lock_file(name), name)
    }

    fn compose(&self, name: &SiteName, args: &[&str]) -> CommandSpec {
        let (program, full) = self.config.compose_args(args);
        CommandSpec::new(program)
            .args(full)
            .current_dir(self.layout.site_dir(name))
    }

    fn require_site(&self, name: &SiteName) -> Result<SiteState, CoreError> {
        match self.state(name) {
            SiteState::Absent => Err(CoreError::SiteNotFound(name.to_string())),
            state => Ok(state),
        }
    }

    fn mark(&self, name: &SiteName, state: SiteState) -> Result<(), CoreError> {
        SiteMarker::now(state).write(&self.layout.state_file(name))
    }

    /// Provision `name`: dependencies, directory, config files, NGINX link,
    /// containers, hosts entry.
    ///
    /// Re-running on an existing site overwrites both config files. Nothing
    /// is rolled back when a later step fails.
    pub fn create(&self, name: &SiteName) -> Result<CreateReport, CoreError> {
        self.create_with_progress(name, &|_: &str| {})
    }

    /// `create`, announcing each phase through `progress` before it starts.
    pub fn create_with_progress(
        &self,
        name: &SiteName,
        progress: &dyn Fn(&str),
    ) -> Result<CreateReport, CoreError> {
        validate_transition(self.state(name), SiteState::Running)?;
        let _lock = self.lock(name)?;
        info!("provisioning site {name}");

        let dependencies = if self.skip_prereqs {
            debug!("skipping dependency provisioning");
            Vec::new()
        } else {
            progress("checking dependencies...");
            let provisioner = Provisioner::new(self.runner, &self.platform);
            let deps = self.config.dependencies();
            let outcomes = provisioner.ensure_all(&deps)?;
            deps.into_iter()
                .zip(outcomes)
                .map(|(name, outcome)| DependencyReport { name, outcome })
                .collect()
        };

        progress(&format!("writing configuration for {name}..."));
        let site_dir = self.layout.site_dir(name);
        let created_dir = !site_dir.is_dir();
        if created_dir {
            std::fs::create_dir_all(&site_dir)
                .map_err(|e| CoreError::fs("create", &site_dir, e))?;
        } else {
            debug!("reusing existing directory {}", site_dir.display());
        }

        let artifacts = render(name);
        write_atomic(&self.layout.compose_file(name), artifacts.compose.as_bytes())?;
        write_atomic(&self.layout.nginx_conf(name), artifacts.nginx.as_bytes())?;
        debug!("wrote compose and nginx config for {name}");

        progress("linking NGINX site...");
        let link = self.link_nginx(name)?;

        progress("starting containers...");
        self.runner.run_checked(&self.compose(name, &["up", "-d"]))?;
        self.mark(name, SiteState::Running)?;

        progress("updating hosts file...");
        let hosts = match self.add_hosts_entry(name) {
            Ok(outcome) => Step::Done(hosts_label(outcome).to_owned()),
            Err(CoreError::Runtime(e)) if e.is_unsupported() => {
                warn!("{e}; skipping hosts entry");
                Step::Skipped(e.to_string())
            }
            Err(CoreError::Runtime(e))
                if matches!(
                    e.io_kind(),
                    Some(ErrorKind::PermissionDenied | ErrorKind::NotFound)
                ) =>
            {
                error!("failed to add hosts entry: {e}");
                Step::Failed(e.to_string())
            }
            Err(e) => return Err(e),
        };

        info!("WordPress site {name} created successfully");
        Ok(CreateReport {
            name: name.clone(),
            site_dir,
            created_dir,
            dependencies,
            link,
            hosts,
        })
    }

    fn link_nginx(&self, name: &SiteName) -> Result<Step, CoreError> {
        let Some(sites_dir) = self.nginx_sites_dir() else {
            let msg = format!("NGINX site linking is not supported on {}", self.platform);
            warn!("{msg}; skipping");
            return Ok(Step::Skipped(msg));
        };
        if !sites_dir.is_dir() {
            let msg = format!("NGINX sites directory {} does not exist", sites_dir.display());
            warn!("{msg}; skipping");
            return Ok(Step::Skipped(msg));
        }

        let conf = self.layout.nginx_conf(name);
        let source = std::fs::canonicalize(&conf).map_err(|e| CoreError::fs("resolve", &conf, e))?;
        let target = link::link_target(&sites_dir, name);
        if std::fs::read_link(&target).is_ok_and(|current| current == source) {
            debug!("{} already links to {}", target.display(), source.display());
            return Ok(Step::Done("already linked".to_owned()));
        }

        let token = self.elevator.elevate("NGINX symlink creation")?;
        match link::create_link(self.runner, &self.platform, &token, &source, &target) {
            Ok(LinkOutcome::AlreadyLinked) => Ok(Step::Done("already linked".to_owned())),
            Ok(_) => Ok(Step::Done(format!("linked {}", target.display()))),
            Err(e) if e.is_unsupported() => {
                warn!("{e}; skipping");
                Ok(Step::Skipped(e.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Map `name` to 127.0.0.1 in the hosts file, once.
    pub fn add_hosts_entry(&self, name: &SiteName) -> Result<HostsOutcome, CoreError> {
        let path = self.hosts_file().ok_or_else(|| RuntimeError::Unsupported {
            operation: "hosts file modification".to_owned(),
            platform: self.platform.to_string(),
        })?;

        if hosts_contains(&path, name)? {
            debug!("hosts entry for {name} already present");
            return Ok(HostsOutcome::AlreadyPresent);
        }

        let token = self.elevator.elevate("hosts file update")?;
        Ok(hosts::add_entry(self.runner, &token, &path, name)?)
    }

    /// `enable` starts the existing containers, `disable` stops them.
    pub fn enable_disable(&self, name: &SiteName, action: ToggleAction) -> Result<(), CoreError> {
        let current = self.require_site(name)?;
        validate_transition(current, action.target_state())?;
        let _lock = self.lock(name)?;

        self.runner
            .run_checked(&self.compose(name, &[action.compose_verb()]))?;
        self.mark(name, action.target_state())?;

        match action {
            ToggleAction::Enable => info!("Site {name} enabled."),
            ToggleAction::Disable => info!("Site {name} disabled."),
        }
        Ok(())
    }

    /// Tear down containers, remove the site directory, then the NGINX link
    /// and the hosts entry.
    pub fn delete(&self, name: &SiteName) -> Result<DeleteReport, CoreError> {
        let current = self.require_site(name)?;
        validate_transition(current, SiteState::Absent)?;
        let lock = self.lock(name)?;

        let containers_removed = if self.layout.compose_file(name).is_file() {
            self.runner.run_checked(&self.compose(name, &["down"]))?;
            true
        } else {
            warn!("no compose file for {name}; skipping container teardown");
            false
        };

        let site_dir = self.layout.site_dir(name);
        self.remove_site_dir(&site_dir)?;

        let link = self.unlink_nginx(name)?;
        let hosts = self.remove_hosts_entry(name)?;

        drop(lock);
        self.remove_lock_file(name);

        info!("Site {name} deleted.");
        Ok(DeleteReport {
            name: name.clone(),
            site_dir,
            containers_removed,
            link,
            hosts,
        })
    }

    fn remove_site_dir(&self, site_dir: &Path) -> Result<(), CoreError> {
        match std::fs::remove_dir_all(site_dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            // Containers write wp-content as their own user.
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                let Some(argv) = self.platform.remove_tree_command(site_dir) else {
                    return Err(CoreError::fs("remove", site_dir, e));
                };
                debug!("retrying removal of {} with elevation", site_dir.display());
                let token = self.elevator.elevate("site directory removal")?;
                self.runner
                    .run_checked(&token.command(CommandSpec::from_argv(argv)))?;
                Ok(())
            }
            Err(e) => Err(CoreError::fs("remove", site_dir, e)),
        }
    }

    fn remove_lock_file(&self, name: &SiteName) {
        let path = self.layout.lock_file(name);
        match std::fs::remove_file(&path) {
            Ok(()) => debug!("removed lock file {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("could not remove lock file {}: {e}", path.display()),
        }
    }

    fn unlink_nginx(&self, name: &SiteName) -> Result<Step, CoreError> {
        let Some(sites_dir) = self.nginx_sites_dir() else {
            return Ok(Step::Skipped(format!(
                "NGINX site linking is not supported on {}",
                self.platform
            )));
        };
        let target = link::link_target(&sites_dir, name);
        if target.symlink_metadata().is_err() {
            return Ok(Step::Skipped("no NGINX link present".to_owned()));
        }

        let token = self.elevator.elevate("NGINX symlink removal")?;
        match link::remove_link(self.runner, &self.platform, &token, &target) {
            Ok(_) => Ok(Step::Done(format!("removed {}", target.display()))),
            Err(e) if e.is_unsupported() => {
                warn!("{e}; leaving {} in place", target.display());
                Ok(Step::Skipped(e.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn remove_hosts_entry(&self, name: &SiteName) -> Result<Step, CoreError> {
        let Some(path) = self.hosts_file() else {
            return Ok(Step::Skipped(format!(
                "hosts file modification is not supported on {}",
                self.platform
            )));
        };
        match hosts_contains(&path, name) {
            Ok(true) => {}
            Ok(false) => return Ok(Step::Skipped("no hosts entry present".to_owned())),
            Err(e) => {
                error!("failed to read hosts file: {e}");
                return Ok(Step::Failed(e.to_string()));
            }
        }

        let token = self.elevator.elevate("hosts file update")?;
        let outcome = hosts::remove_entry(self.runner, &token, &path, name)?;
        Ok(Step::Done(hosts_label(outcome).to_owned()))
    }

    pub fn status(&self, name: &SiteName) -> Result<SiteStatus, CoreError> {
        let state = self.state(name);
        let updated_at = SiteMarker::read(&self.layout.state_file(name))
            .ok()
            .flatten()
            .map(|m| m.updated_at);

        let link_present = self
            .nginx_sites_dir()
            .map(|dir| link::link_target(&dir, name).symlink_metadata().is_ok());
        let hosts_entry = self
            .hosts_file()
            .map(|path| hosts_contains(&path, name))
            .transpose()?;

        let containers = if state == SiteState::Absent {
            None
        } else {
            match self.runner.run_checked(&self.compose(name, &["ps"])) {
                Ok(out) => Some(out.stdout),
                Err(e) => {
                    warn!("could not query containers for {name}: {e}");
                    None
                }
            }
        };

        let missing_dependencies = if self.skip_prereqs {
            Vec::new()
        } else {
            Provisioner::new(self.runner, &self.platform).missing(&self.config.dependencies())?
        };

        Ok(SiteStatus {
            name: name.clone(),
            state,
            site_dir: self.layout.site_dir(name),
            updated_at,
            link_present,
            hosts_entry,
            containers,
            missing_dependencies,
        })
    }
}

fn hosts_contains(path: &Path, name: &SiteName) -> Result<bool, CoreError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CoreError::Runtime(RuntimeError::Fs {
            op: "read",
            path: path.to_path_buf(),
            source: e,
        }))?;
    Ok(hosts::has_entry(&content, name))
}

fn hosts_label(outcome: HostsOutcome) -> &'static str {
    match outcome {
        HostsOutcome::Added => "entry added",
        HostsOutcome::AlreadyPresent => "entry already present",
        HostsOutcome::Removed => "entry removed",
        HostsOutcome::NotPresent => "no entry present",
    }
}
