//! Site lifecycle orchestration for wpsite.
//!
//! This crate ties the pure schema layer and the host runtime together into
//! the `SiteController`, the API behind every CLI action: create, enable,
//! disable, delete, hosts registration and status. It also owns the
//! lifecycle state machine, the per-site state marker, and the advisory lock
//! that keeps two processes from provisioning the same site at once.

pub mod concurrency;
pub mod controller;
pub mod lifecycle;
pub mod state;

pub use concurrency::SiteLock;
pub use controller::{
    CreateReport, DeleteReport, DependencyReport, Settings, SiteController, SiteStatus, Step,
    ToggleAction,
};
pub use lifecycle::{validate_transition, SiteState};
pub use state::SiteMarker;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("schema error: {0}")]
    Schema(#[from] wpsite_schema::SchemaError),
    #[error("runtime error: {0}")]
    Runtime(#[from] wpsite_runtime::RuntimeError),
    #[error("site not found: {0}")]
    SiteNotFound(String),
    #[error("site '{0}' is locked by another wpsite process")]
    SiteLocked(String),
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("{op} {}: {source}", path.display())]
    Fs {
        op: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    pub(crate) fn fs(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Fs {
            op,
            path: path.into(),
            source,
        }
    }
}
