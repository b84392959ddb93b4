use crate::command::{CommandRunner, CommandSpec};
use crate::platform::Platform;
use crate::privilege::Elevated;
use crate::RuntimeError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use wpsite_schema::SiteName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkOutcome {
    Linked,
    AlreadyLinked,
    Removed,
    NotPresent,
}

/// Path of the per-site entry inside the NGINX sites directory.
pub fn link_target(sites_dir: &Path, name: &SiteName) -> PathBuf {
    sites_dir.join(name.as_str())
}

fn unsupported(operation: &str, platform: &Platform) -> RuntimeError {
    RuntimeError::Unsupported {
        operation: operation.to_owned(),
        platform: platform.to_string(),
    }
}

fn entry_exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// Point `target` at `source`, replacing whatever was there.
pub fn create_link(
    runner: &dyn CommandRunner,
    platform: &Platform,
    token: &Elevated,
    source: &Path,
    target: &Path,
) -> Result<LinkOutcome, RuntimeError> {
    if std::fs::read_link(target).is_ok_and(|current| current == source) {
        debug!("{} already links to {}", target.display(), source.display());
        return Ok(LinkOutcome::AlreadyLinked);
    }

    let argv = platform
        .symlink_command(source, target)
        .ok_or_else(|| unsupported("symbolic link creation", platform))?;

    // mklink refuses to overwrite; ln -sfn replaces in place.
    if platform.is_windows() && entry_exists(target) {
        remove_entry(runner, platform, token, target)?;
    }

    runner.run_checked(&token.command(CommandSpec::from_argv(argv)))?;
    info!("linked {} -> {}", target.display(), source.display());
    Ok(LinkOutcome::Linked)
}

pub fn remove_link(
    runner: &dyn CommandRunner,
    platform: &Platform,
    token: &Elevated,
    target: &Path,
) -> Result<LinkOutcome, RuntimeError> {
    if !entry_exists(target) {
        return Ok(LinkOutcome::NotPresent);
    }
    remove_entry(runner, platform, token, target)?;
    info!("removed {}", target.display());
    Ok(LinkOutcome::Removed)
}

fn remove_entry(
    runner: &dyn CommandRunner,
    platform: &Platform,
    token: &Elevated,
    target: &Path,
) -> Result<(), RuntimeError> {
    let argv = platform
        .remove_file_command(target)
        .ok_or_else(|| unsupported("symbolic link removal", platform))?;
    runner.run_checked(&token.command(CommandSpec::from_argv(argv)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRunner;
    use crate::platform::LinuxFamily;

    fn linux() -> Platform {
        Platform::Linux(LinuxFamily::Debian)
    }

    #[test]
    fn target_is_named_after_site() {
        let name = SiteName::parse("demo").unwrap();
        assert_eq!(
            link_target(Path::new("/etc/nginx/sites-enabled"), &name),
            PathBuf::from("/etc/nginx/sites-enabled/demo")
        );
    }

    #[test]
    fn create_runs_ln_through_token() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("nginx.conf");
        let target = dir.path().join("enabled-demo");
        let runner = MockRunner::new();
        let token = Elevated::with_prefix(vec!["sudo".to_owned()]);

        let outcome = create_link(&runner, &linux(), &token, &source, &target).unwrap();
        assert_eq!(outcome, LinkOutcome::Linked);
        assert_eq!(
            runner.lines(),
            vec![format!(
                "sudo ln -sfn {} {}",
                source.display(),
                target.display()
            )]
        );
    }

    #[cfg(unix)]
    #[test]
    fn existing_matching_link_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("nginx.conf");
        std::fs::write(&source, "server {}").unwrap();
        let target = dir.path().join("demo");
        std::os::unix::fs::symlink(&source, &target).unwrap();

        let runner = MockRunner::new();
        let outcome =
            create_link(&runner, &linux(), &Elevated::direct(), &source, &target).unwrap();
        assert_eq!(outcome, LinkOutcome::AlreadyLinked);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn unsupported_platform_is_explicit() {
        let runner = MockRunner::new();
        let err = create_link(
            &runner,
            &Platform::MacOs,
            &Elevated::direct(),
            Path::new("/a"),
            Path::new("/b"),
        )
        .unwrap_err();
        assert!(err.is_unsupported());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn remove_missing_link_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let runner = MockRunner::new();
        let outcome = remove_link(
            &runner,
            &linux(),
            &Elevated::direct(),
            &dir.path().join("demo"),
        )
        .unwrap();
        assert_eq!(outcome, LinkOutcome::NotPresent);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn remove_existing_link_runs_rm() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("demo");
        std::fs::write(&target, "").unwrap();
        let runner = MockRunner::new();
        let outcome = remove_link(&runner, &linux(), &Elevated::direct(), &target).unwrap();
        assert_eq!(outcome, LinkOutcome::Removed);
        assert_eq!(runner.lines(), vec![format!("rm -f {}", target.display())]);
    }
}
