pub mod create;
pub mod delete;
pub mod status;
pub mod toggle;

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;
use wpsite_core::{CoreError, Step};
use wpsite_runtime::{CommandOutput, CommandRunner, CommandSpec, RuntimeError};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;
pub const EXIT_NOT_FOUND: u8 = 3;

/// A command that could not complete: the message for stderr and the exit
/// code `main` returns.
#[derive(Debug)]
pub struct Failure {
    pub code: u8,
    pub message: String,
}

impl From<CoreError> for Failure {
    fn from(err: CoreError) -> Self {
        let code = match err {
            CoreError::SiteNotFound(_) => EXIT_NOT_FOUND,
            _ => EXIT_FAILURE,
        };
        Self {
            code,
            message: err.to_string(),
        }
    }
}

impl From<String> for Failure {
    fn from(message: String) -> Self {
        Self {
            code: EXIT_FAILURE,
            message,
        }
    }
}

pub type CommandResult = Result<u8, Failure>;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_spinner())
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        style("{spinner:.cyan} {msg}")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(style("{msg}"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(style("{msg}"));
    pb.finish_with_message(format!("✗ {msg}"));
}

/// The spinner currently on screen, if any.
#[derive(Default)]
pub struct SpinnerSlot(Mutex<Option<ProgressBar>>);

impl SpinnerSlot {
    pub fn set(&self, pb: Option<ProgressBar>) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = pb;
        }
    }

    /// Run `f` with the active spinner cleared from the terminal.
    pub fn paused<T>(&self, f: impl FnOnce() -> T) -> T {
        let active = self.0.lock().ok().and_then(|slot| slot.clone());
        match active {
            Some(pb) => pb.suspend(f),
            None => f(),
        }
    }
}

/// Hides the spinner while `sudo` runs, so its password prompt stays readable.
pub struct PausingRunner<'a> {
    inner: &'a dyn CommandRunner,
    slot: &'a SpinnerSlot,
}

impl<'a> PausingRunner<'a> {
    pub fn new(inner: &'a dyn CommandRunner, slot: &'a SpinnerSlot) -> Self {
        Self { inner, slot }
    }
}

impl CommandRunner for PausingRunner<'_> {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, RuntimeError> {
        if spec.program == "sudo" {
            self.slot.paused(|| self.inner.run(spec))
        } else {
            self.inner.run(spec)
        }
    }
}

pub fn colorize_state(state: &str) -> String {
    use console::Style;
    match state {
        "running" => Style::new().green().bold().apply_to(state).to_string(),
        "stopped" => Style::new().yellow().apply_to(state).to_string(),
        "absent" => Style::new().dim().apply_to(state).to_string(),
        other => other.to_owned(),
    }
}

pub fn print_step(label: &str, step: &Step) {
    use console::Style;
    match step {
        Step::Done(detail) => println!("{label:<8} {detail}"),
        Step::Skipped(detail) => println!(
            "{label:<8} {}",
            Style::new().yellow().apply_to(format!("skipped: {detail}"))
        ),
        Step::Failed(detail) => println!(
            "{label:<8} {}",
            Style::new().red().apply_to(format!("failed: {detail}"))
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_pretty_serializes_object() {
        let val = serde_json::json!({"state": "running"});
        let result = json_pretty(&val).unwrap();
        assert!(result.contains("\"state\""));
        assert!(result.contains("\"running\""));
    }

    #[test]
    fn colorize_state_keeps_text() {
        for state in ["running", "stopped", "absent"] {
            assert!(colorize_state(state).contains(state));
        }
        assert_eq!(colorize_state("unknown"), "unknown");
    }

    #[test]
    fn failure_code_follows_error_variant() {
        let missing = Failure::from(CoreError::SiteNotFound("demo".to_owned()));
        assert_eq!(missing.code, EXIT_NOT_FOUND);
        assert_eq!(missing.message, "site not found: demo");

        let locked = Failure::from(CoreError::SiteLocked("demo".to_owned()));
        assert_eq!(locked.code, EXIT_FAILURE);
    }

    #[test]
    fn failure_code_ignores_message_text() {
        // A wrapped error whose text happens to read like a missing site.
        let failed = Failure::from(CoreError::Runtime(wpsite_runtime::RuntimeError::CommandFailed {
            command: "docker-compose up -d".to_owned(),
            status: Some(1),
            stderr: "site not found: demo".to_owned(),
        }));
        assert_eq!(failed.code, EXIT_FAILURE);

        let serialization = Failure::from("site not found: demo".to_owned());
        assert_eq!(serialization.code, EXIT_FAILURE);
    }

    #[test]
    fn exit_codes_are_distinct() {
        assert_ne!(EXIT_SUCCESS, EXIT_FAILURE);
        assert_ne!(EXIT_FAILURE, EXIT_CONFIG_ERROR);
        assert_ne!(EXIT_CONFIG_ERROR, EXIT_NOT_FOUND);
    }

    #[test]
    fn pausing_runner_forwards_every_command() {
        use wpsite_runtime::mock::MockRunner;

        let inner = MockRunner::new();
        let slot = SpinnerSlot::default();
        slot.set(Some(ProgressBar::hidden()));
        let runner = PausingRunner::new(&inner, &slot);

        runner.run(&CommandSpec::new("sudo").arg("-v")).unwrap();
        runner
            .run(&CommandSpec::new("docker-compose").args(["up", "-d"]))
            .unwrap();
        assert_eq!(inner.lines(), ["sudo -v", "docker-compose up -d"]);
    }

    #[test]
    fn paused_returns_the_closure_result() {
        let slot = SpinnerSlot::default();
        assert_eq!(slot.paused(|| 7), 7);
        slot.set(Some(ProgressBar::hidden()));
        assert_eq!(slot.paused(|| 8), 8);
        slot.set(None);
        assert_eq!(slot.paused(|| 9), 9);
    }

    #[test]
    fn spinner_finishes() {
        let pb = spinner("testing...");
        spin_ok(&pb, "done");
        let pb = spinner("testing...");
        spin_fail(&pb, "failed");
    }
}
