use crate::command::{CommandOutput, CommandRunner, CommandSpec};
use crate::privilege::{Elevated, Elevator};
use crate::RuntimeError;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Recording `CommandRunner` that never spawns a process.
///
/// Programs listed as missing fail with `NotFound`; a scripted failure makes
/// every command whose rendered line starts with the given prefix exit with
/// status 1. Everything else succeeds with empty output.
#[derive(Default)]
pub struct MockRunner {
    calls: Mutex<Vec<CommandSpec>>,
    missing: Mutex<HashSet<String>>,
    failures: Mutex<HashMap<String, String>>,
    stdout: Mutex<HashMap<String, String>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_missing(self, program: &str) -> Self {
        if let Ok(mut missing) = self.missing.lock() {
            missing.insert(program.to_owned());
        }
        self
    }

    #[must_use]
    pub fn with_failure(self, command_prefix: &str, stderr: &str) -> Self {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(command_prefix.to_owned(), stderr.to_owned());
        }
        self
    }

    #[must_use]
    pub fn with_stdout(self, command_prefix: &str, stdout: &str) -> Self {
        if let Ok(mut out) = self.stdout.lock() {
            out.insert(command_prefix.to_owned(), stdout.to_owned());
        }
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Rendered command lines, in invocation order.
    pub fn lines(&self) -> Vec<String> {
        self.calls().iter().map(CommandSpec::display).collect()
    }

    /// Number of recorded commands whose rendered line starts with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.lines().iter().filter(|l| l.starts_with(prefix)).count()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, RuntimeError> {
        let line = spec.display();
        self.calls
            .lock()
            .map_err(|e| RuntimeError::Launch {
                program: spec.program.clone(),
                source: std::io::Error::other(format!("mutex poisoned: {e}")),
            })?
            .push(spec.clone());

        let missing = self
            .missing
            .lock()
            .map(|m| m.contains(&spec.program))
            .unwrap_or(false);
        if missing {
            return Err(RuntimeError::NotFound(spec.program.clone()));
        }

        let failure = self.failures.lock().ok().and_then(|f| {
            f.iter()
                .find(|(prefix, _)| line.starts_with(prefix.as_str()))
                .map(|(_, stderr)| stderr.clone())
        });
        if let Some(stderr) = failure {
            return Ok(CommandOutput {
                status: Some(1),
                stdout: String::new(),
                stderr,
            });
        }

        let stdout = self
            .stdout
            .lock()
            .ok()
            .and_then(|o| {
                o.iter()
                    .find(|(prefix, _)| line.starts_with(prefix.as_str()))
                    .map(|(_, out)| out.clone())
            })
            .unwrap_or_default();

        Ok(CommandOutput {
            status: Some(0),
            stdout,
            stderr: String::new(),
        })
    }
}

/// `Elevator` with a fixed answer, recording which operations asked.
pub struct MockElevator {
    grant: Option<Vec<String>>,
    requests: Mutex<Vec<String>>,
}

impl MockElevator {
    /// Grants every request without a command prefix.
    pub fn granting() -> Self {
        Self {
            grant: Some(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Grants every request through `sudo`.
    pub fn via_sudo() -> Self {
        Self {
            grant: Some(vec!["sudo".to_owned()]),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn denying() -> Self {
        Self {
            grant: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Elevator for MockElevator {
    fn elevate(&self, operation: &str) -> Result<Elevated, RuntimeError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(operation.to_owned());
        }
        match &self.grant {
            Some(prefix) if prefix.is_empty() => Ok(Elevated::direct()),
            Some(prefix) => Ok(Elevated::with_prefix(prefix.clone())),
            None => Err(RuntimeError::InsufficientPrivilege(operation.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_calls_in_order() {
        let runner = MockRunner::new();
        runner.run(&CommandSpec::new("docker").arg("--version")).unwrap();
        runner.run(&CommandSpec::new("docker-compose").args(["up", "-d"])).unwrap();
        assert_eq!(runner.lines(), vec!["docker --version", "docker-compose up -d"]);
        assert_eq!(runner.count("docker-compose up"), 1);
    }

    #[test]
    fn missing_program_is_not_found() {
        let runner = MockRunner::new().with_missing("docker");
        let err = runner.run(&CommandSpec::new("docker")).unwrap_err();
        assert!(matches!(err, RuntimeError::NotFound(_)));
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn scripted_failure_exits_non_zero() {
        let runner = MockRunner::new().with_failure("docker-compose up", "port in use");
        let err = runner
            .run_checked(&CommandSpec::new("docker-compose").args(["up", "-d"]))
            .unwrap_err();
        assert!(err.to_string().contains("port in use"));
        assert!(runner.run_checked(&CommandSpec::new("docker-compose").arg("down")).is_ok());
    }

    #[test]
    fn elevator_records_requests() {
        let elevator = MockElevator::denying();
        assert!(elevator.elevate("hosts file update").is_err());
        assert_eq!(elevator.requests(), vec!["hosts file update"]);
        assert!(MockElevator::via_sudo().elevate("x").unwrap().is_prefixed());
    }
}
