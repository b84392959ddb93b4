//! Site naming, layout, artifact rendering, and configuration for wpsite.
//!
//! This crate is the pure layer: validated site names (`SiteName`), the
//! per-site directory layout (`SiteLayout`), Compose/NGINX templating
//! (`render`), and the optional TOML tool configuration (`ToolConfig`).

pub mod config;
pub mod render;
pub mod site;

pub use config::{ElevationMode, ToolConfig};
pub use render::{hosts_line, render, SiteArtifacts, HOSTS_ADDRESS};
pub use site::{SiteLayout, SiteName, COMPOSE_FILE, NGINX_FILE, STATE_FILE};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid site name '{name}': {reason}")]
    InvalidSiteName { name: String, reason: &'static str },
    #[error("failed to read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("compose_command must name a program")]
    EmptyComposeCommand,
}
