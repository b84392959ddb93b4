//! The external-process boundary.
//!
//! Every program wpsite launches goes through a `CommandRunner`, so the
//! lifecycle can be exercised against `mock::MockRunner` without Docker or
//! root. Calls block until the child exits; there is no timeout.

use crate::RuntimeError;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub stdin: Option<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            stdin: None,
        }
    }

    /// Build from an argv vector as produced by the platform table.
    /// An empty vector yields an empty program name, which fails to launch.
    pub fn from_argv(argv: Vec<String>) -> Self {
        let mut iter = argv.into_iter();
        let program = iter.next().unwrap_or_default();
        Self {
            program,
            args: iter.collect(),
            cwd: None,
            stdin: None,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    #[must_use]
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Prepend `prefix` (e.g. `["sudo"]`), shifting the current program into
    /// the argument list.
    #[must_use]
    pub fn prefixed(self, prefix: &[String]) -> Self {
        let Some((first, rest)) = prefix.split_first() else {
            return self;
        };
        let mut args: Vec<String> = rest.to_vec();
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: first.clone(),
            args,
            cwd: self.cwd,
            stdin: self.stdin,
        }
    }

    /// Shell-like rendering for logs and error messages.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the child was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

pub trait CommandRunner: Send + Sync {
    /// Run `spec` to completion and capture its output.
    ///
    /// An executable that cannot be found maps to `RuntimeError::NotFound`;
    /// other spawn failures map to `RuntimeError::Launch`. A non-zero exit is
    /// not an error at this level.
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, RuntimeError>;

    /// Run `spec` and turn a non-zero exit into `RuntimeError::CommandFailed`.
    fn run_checked(&self, spec: &CommandSpec) -> Result<CommandOutput, RuntimeError> {
        let output = self.run(spec)?;
        if output.success() {
            Ok(output)
        } else {
            Err(RuntimeError::CommandFailed {
                command: spec.display(),
                status: output.status,
                stderr: output.stderr,
            })
        }
    }
}

/// Runs real processes with `std::process::Command`.
///
/// stdin is inherited unless the `CommandSpec` carries input, so `sudo` and package
/// managers can still prompt on the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, RuntimeError> {
        debug!("exec: {}", spec.display());
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }
        cmd.stdin(if spec.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::inherit()
        });

        let mut child = cmd.spawn().map_err(|e| classify_spawn_error(&spec.program, e))?;

        // The writer runs on its own thread while this one drains stdout and
        // stderr; a child that echoes its input (tee) would otherwise block
        // once the output pipe fills.
        let writer = match (&spec.stdin, child.stdin.take()) {
            (Some(input), Some(mut pipe)) => {
                let bytes = input.clone().into_bytes();
                Some(std::thread::spawn(move || pipe.write_all(&bytes)))
            }
            _ => None,
        };

        let output = child
            .wait_with_output()
            .map_err(|source| RuntimeError::Launch {
                program: spec.program.clone(),
                source,
            })?;

        if let Some(handle) = writer {
            let written = handle.join().unwrap_or_else(|_| {
                Err(std::io::Error::other("stdin writer thread panicked"))
            });
            match written {
                Ok(()) => {}
                // The child closed stdin early; its exit status speaks for it.
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    debug!("{} closed stdin before reading all input", spec.program);
                }
                Err(source) => {
                    return Err(RuntimeError::Launch {
                        program: spec.program.clone(),
                        source,
                    });
                }
            }
        }

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

fn classify_spawn_error(program: &str, err: std::io::Error) -> RuntimeError {
    if err.kind() == std::io::ErrorKind::NotFound {
        RuntimeError::NotFound(program.to_owned())
    } else {
        RuntimeError::Launch {
            program: program.to_owned(),
            source: err,
        }
    }
}
