use crate::command::{CommandRunner, CommandSpec};
use crate::platform::Platform;
use crate::RuntimeError;
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyStatus {
    Installed,
    NotInstalled,
}

/// Outcome of [`Provisioner::ensure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provisioned {
    AlreadyInstalled,
    Installed,
    /// Missing, and this platform has no package manager wpsite knows.
    InstallUnsupported,
}

/// A missing prerequisite with actionable install instructions.
#[derive(Debug, Clone, Serialize)]
pub struct MissingPrereq {
    pub name: String,
    pub install_hint: String,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  - {} (install: {})", self.name, self.install_hint)
    }
}

/// Look for `dependency` by running `<dependency> --version`.
///
/// Only a missing executable counts as "not installed"; any other launch
/// failure or a non-zero exit is returned as an error.
pub fn check_dependency(
    runner: &dyn CommandRunner,
    dependency: &str,
) -> Result<DependencyStatus, RuntimeError> {
    match runner.run_checked(&CommandSpec::new(dependency).arg("--version")) {
        Ok(_) => Ok(DependencyStatus::Installed),
        Err(RuntimeError::NotFound(_)) => Ok(DependencyStatus::NotInstalled),
        Err(e) => Err(e),
    }
}

/// Installs missing tools through the platform package manager.
pub struct Provisioner<'a> {
    runner: &'a dyn CommandRunner,
    platform: &'a Platform,
}

impl<'a> Provisioner<'a> {
    pub fn new(runner: &'a dyn CommandRunner, platform: &'a Platform) -> Self {
        Self { runner, platform }
    }

    pub fn ensure(&self, dependency: &str) -> Result<Provisioned, RuntimeError> {
        if check_dependency(self.runner, dependency)? == DependencyStatus::Installed {
            return Ok(Provisioned::AlreadyInstalled);
        }

        info!("{dependency} is not installed. Installing...");
        let Some(argv) = self.platform.install_command(dependency) else {
            warn!(
                "package installation is not supported on {}; install {dependency} manually",
                self.platform
            );
            return Ok(Provisioned::InstallUnsupported);
        };

        self.runner.run_checked(&CommandSpec::from_argv(argv))?;
        info!("{dependency} installed");
        Ok(Provisioned::Installed)
    }

    pub fn ensure_all(&self, dependencies: &[String]) -> Result<Vec<Provisioned>, RuntimeError> {
        dependencies.iter().map(|d| self.ensure(d)).collect()
    }

    /// Report every dependency that is currently absent, without installing.
    pub fn missing(&self, dependencies: &[String]) -> Result<Vec<MissingPrereq>, RuntimeError> {
        let mut missing = Vec::new();
        for dep in dependencies {
            if check_dependency(self.runner, dep)? == DependencyStatus::NotInstalled {
                let install_hint = self.platform.install_command(dep).map_or_else(
                    || "install it with your system package manager".to_owned(),
                    |argv| argv.join(" "),
                );
                missing.push(MissingPrereq {
                    name: dep.clone(),
                    install_hint,
                });
            }
        }
        Ok(missing)
    }
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\nwpsite needs these tools to run WordPress containers.");
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRunner;
    use crate::platform::LinuxFamily;

    fn debian() -> Platform {
        Platform::Linux(LinuxFamily::Debian)
    }

    #[test]
    fn present_dependency_is_installed() {
        let runner = MockRunner::new();
        assert_eq!(
            check_dependency(&runner, "docker").unwrap(),
            DependencyStatus::Installed
        );
        assert_eq!(runner.lines(), vec!["docker --version"]);
    }

    #[test]
    fn nonexistent_executable_is_not_installed() {
        let runner = MockRunner::new().with_missing("no-such-tool");
        assert_eq!(
            check_dependency(&runner, "no-such-tool").unwrap(),
            DependencyStatus::NotInstalled
        );
    }

    #[test]
    fn real_nonexistent_executable_is_not_installed() {
        let runner = crate::SystemRunner;
        assert_eq!(
            check_dependency(&runner, "wpsite-no-such-tool-4b1d").unwrap(),
            DependencyStatus::NotInstalled
        );
    }

    #[test]
    fn failing_version_check_is_an_error_not_absence() {
        let runner = MockRunner::new().with_failure("docker --version", "segfault");
        assert!(matches!(
            check_dependency(&runner, "docker"),
            Err(RuntimeError::CommandFailed { .. })
        ));
    }

    #[test]
    fn ensure_installs_exactly_once() {
        let runner = MockRunner::new().with_missing("no-such-tool");
        let platform = debian();
        let provisioner = Provisioner::new(&runner, &platform);
        assert_eq!(
            provisioner.ensure("no-such-tool").unwrap(),
            Provisioned::Installed
        );
        assert_eq!(runner.count("sudo apt install -y no-such-tool"), 1);
        assert_eq!(runner.calls().len(), 2);
    }

    #[test]
    fn ensure_skips_installed_tool() {
        let runner = MockRunner::new();
        let platform = debian();
        let provisioner = Provisioner::new(&runner, &platform);
        assert_eq!(
            provisioner.ensure("docker").unwrap(),
            Provisioned::AlreadyInstalled
        );
        assert_eq!(runner.count("sudo"), 0);
    }

    #[test]
    fn ensure_without_package_manager_is_skipped() {
        let runner = MockRunner::new().with_missing("docker");
        let platform = Platform::Linux(LinuxFamily::Other("arch".to_owned()));
        let provisioner = Provisioner::new(&runner, &platform);
        assert_eq!(
            provisioner.ensure("docker").unwrap(),
            Provisioned::InstallUnsupported
        );
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn installer_failure_is_fatal() {
        let runner = MockRunner::new()
            .with_missing("docker")
            .with_failure("brew install", "no bottle available");
        let platform = Platform::MacOs;
        let provisioner = Provisioner::new(&runner, &platform);
        let err = provisioner.ensure("docker").unwrap_err();
        assert!(err.to_string().contains("no bottle available"));
    }

    #[test]
    fn missing_lists_install_hints() {
        let runner = MockRunner::new().with_missing("docker-compose");
        let platform = Platform::Windows;
        let provisioner = Provisioner::new(&runner, &platform);
        let missing = provisioner
            .missing(&["docker".to_owned(), "docker-compose".to_owned()])
            .unwrap();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].install_hint, "choco install -y docker-compose");
        let report = format_missing(&missing);
        assert!(report.contains("missing prerequisites:"));
        assert!(report.contains("docker-compose"));
    }
}
