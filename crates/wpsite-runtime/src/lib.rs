//! Host-facing runtime for wpsite.
//!
//! This crate implements everything that touches the machine outside a site
//! directory: platform detection and its capability table, the external
//! process boundary (`CommandRunner`), dependency provisioning, the explicit
//! elevation precondition, hosts-file editing, and NGINX symlink management.
//! `mock` provides recording test doubles for the process and privilege seams.

pub mod command;
pub mod hosts;
pub mod link;
pub mod mock;
pub mod platform;
pub mod prereq;
pub mod privilege;

pub use command::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
pub use hosts::HostsOutcome;
pub use link::LinkOutcome;
pub use platform::{LinuxFamily, Platform};
pub use prereq::{
    check_dependency, format_missing, DependencyStatus, MissingPrereq, Provisioned, Provisioner,
};
pub use privilege::{Elevated, Elevator, SystemElevator};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("{op} {}: {source}", path.display())]
    Fs {
        op: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("'{0}' was not found on PATH")]
    NotFound(String),
    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: String,
        source: std::io::Error,
    },
    #[error("command `{command}` failed ({}): {}", exit_label(*status), stderr_label(stderr))]
    CommandFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },
    #[error("{operation} is not supported on {platform}")]
    Unsupported { operation: String, platform: String },
    #[error("insufficient privilege for {0}")]
    InsufficientPrivilege(String),
}

impl RuntimeError {
    pub(crate) fn fs(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Fs {
            op,
            path: path.into(),
            source,
        }
    }

    /// The underlying I/O error kind for filesystem and launch failures.
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        match self {
            Self::Fs { source, .. } | Self::Launch { source, .. } => Some(source.kind()),
            _ => None,
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}

fn exit_label(status: Option<i32>) -> String {
    status.map_or_else(|| "terminated by signal".to_owned(), |c| format!("exit status {c}"))
}

fn stderr_label(stderr: &str) -> &str {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        "no output"
    } else {
        trimmed
    }
}
