//! Elevation as an explicit precondition.
//!
//! Privileged steps (NGINX symlink, hosts file, forced tree removal) ask an
//! `Elevator` for an `Elevated` token first. The token records how the step
//! must run its commands: directly, or behind a prefix such as `sudo`.

use crate::command::{CommandRunner, CommandSpec};
use crate::platform::Platform;
use crate::RuntimeError;
use tracing::debug;
use wpsite_schema::ElevationMode;

/// Proof that a privileged operation may proceed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Elevated {
    prefix: Vec<String>,
}

impl Elevated {
    /// The current process already holds the required rights.
    pub fn direct() -> Self {
        Self { prefix: Vec::new() }
    }

    pub fn with_prefix(prefix: Vec<String>) -> Self {
        Self { prefix }
    }

    pub fn prefix(&self) -> &[String] {
        &self.prefix
    }

    pub fn is_prefixed(&self) -> bool {
        !self.prefix.is_empty()
    }

    /// Apply the token to a command.
    pub fn command(&self, spec: CommandSpec) -> CommandSpec {
        spec.prefixed(&self.prefix)
    }
}

pub trait Elevator: Send + Sync {
    fn elevate(&self, operation: &str) -> Result<Elevated, RuntimeError>;
}

/// Checks the host for administrator rights.
///
/// On Unix, an effective uid of 0 is used directly; otherwise `sudo -v`
/// must succeed (it may prompt for a password) and commands are prefixed with
/// `sudo`. On Windows, `net session` succeeds only in an elevated shell.
pub struct SystemElevator<'a> {
    runner: &'a dyn CommandRunner,
    platform: Platform,
    mode: ElevationMode,
}

impl<'a> SystemElevator<'a> {
    pub fn new(runner: &'a dyn CommandRunner, platform: Platform, mode: ElevationMode) -> Self {
        Self {
            runner,
            platform,
            mode,
        }
    }

    fn confirm(&self, spec: &CommandSpec, operation: &str) -> Result<(), RuntimeError> {
        match self.runner.run(spec) {
            Ok(out) if out.success() => Ok(()),
            Ok(_) | Err(RuntimeError::NotFound(_)) => {
                Err(RuntimeError::InsufficientPrivilege(operation.to_owned()))
            }
            Err(e) => Err(e),
        }
    }
}

impl Elevator for SystemElevator<'_> {
    fn elevate(&self, operation: &str) -> Result<Elevated, RuntimeError> {
        if self.mode == ElevationMode::None {
            return Ok(Elevated::direct());
        }

        if self.platform.is_windows() {
            self.confirm(&CommandSpec::new("net").arg("session"), operation)?;
            return Ok(Elevated::direct());
        }

        if effective_uid_is_root() {
            return Ok(Elevated::direct());
        }

        debug!("requesting sudo for {operation}");
        self.confirm(&CommandSpec::new("sudo").arg("-v"), operation)?;
        Ok(Elevated::with_prefix(vec!["sudo".to_owned()]))
    }
}

#[cfg(unix)]
fn effective_uid_is_root() -> bool {
    // SAFETY: geteuid() takes no arguments, cannot fail, and has no side effects.
    #[allow(unsafe_code)]
    unsafe {
        libc::geteuid() == 0
    }
}

#[cfg(not(unix))]
fn effective_uid_is_root() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRunner;
    use crate::platform::LinuxFamily;

    #[test]
    fn mode_none_skips_the_check() {
        let runner = MockRunner::new();
        let elevator = SystemElevator::new(
            &runner,
            Platform::Linux(LinuxFamily::Debian),
            ElevationMode::None,
        );
        assert_eq!(elevator.elevate("symlink").unwrap(), Elevated::direct());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn windows_requires_admin_session() {
        let runner = MockRunner::new().with_failure("net session", "Access is denied.");
        let elevator = SystemElevator::new(&runner, Platform::Windows, ElevationMode::Auto);
        let err = elevator.elevate("hosts file update").unwrap_err();
        assert!(matches!(err, RuntimeError::InsufficientPrivilege(ref op) if op == "hosts file update"));
    }

    #[test]
    fn windows_admin_runs_direct() {
        let runner = MockRunner::new();
        let elevator = SystemElevator::new(&runner, Platform::Windows, ElevationMode::Auto);
        assert!(!elevator.elevate("symlink").unwrap().is_prefixed());
        assert_eq!(runner.lines(), vec!["net session"]);
    }

    #[cfg(unix)]
    #[test]
    fn non_root_falls_back_to_sudo() {
        if effective_uid_is_root() {
            return;
        }
        let runner = MockRunner::new();
        let elevator = SystemElevator::new(
            &runner,
            Platform::Linux(LinuxFamily::Debian),
            ElevationMode::Auto,
        );
        let token = elevator.elevate("symlink").unwrap();
        assert_eq!(token.prefix(), ["sudo".to_owned()]);
        assert_eq!(runner.lines(), vec!["sudo -v"]);
    }

    #[cfg(unix)]
    #[test]
    fn denied_sudo_is_insufficient_privilege() {
        if effective_uid_is_root() {
            return;
        }
        let runner = MockRunner::new().with_missing("sudo");
        let elevator = SystemElevator::new(
            &runner,
            Platform::Linux(LinuxFamily::Debian),
            ElevationMode::Auto,
        );
        assert!(matches!(
            elevator.elevate("symlink"),
            Err(RuntimeError::InsufficientPrivilege(_))
        ));
    }

    #[test]
    fn token_prefixes_commands() {
        let token = Elevated::with_prefix(vec!["sudo".to_owned()]);
        let spec = token.command(CommandSpec::new("rm").args(["-f", "/etc/nginx/sites-enabled/demo"]));
        assert_eq!(spec.display(), "sudo rm -f /etc/nginx/sites-enabled/demo");
    }
}
