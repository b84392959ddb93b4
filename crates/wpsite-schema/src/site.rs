//! Site identity and on-disk layout.
//!
//! A site name doubles as a directory name under the sites root and as the
//! hostname served by NGINX, so it is validated against both constraints once,
//! at construction.

use crate::SchemaError;
use serde::Serialize;
use std::fmt;
use std::ops::Deref;
use std::path::{Path, PathBuf};

pub const COMPOSE_FILE: &str = "docker-compose.yml";
pub const NGINX_FILE: &str = "nginx.conf";
pub const STATE_FILE: &str = ".wpsite-state.json";
const LOCK_DIR: &str = ".wpsite-locks";
const MAX_NAME_LEN: usize = 253;

/// A validated site name, usable as a path segment and as a hostname.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SiteName(String);

impl SiteName {
    pub fn parse(input: &str) -> Result<Self, SchemaError> {
        let invalid = |reason: &'static str| SchemaError::InvalidSiteName {
            name: input.to_owned(),
            reason,
        };

        if input.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if input.len() > MAX_NAME_LEN {
            return Err(invalid("must be at most 253 characters"));
        }
        if !input
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'.')
        {
            return Err(invalid("may only contain ASCII letters, digits, '-' and '.'"));
        }
        if input.starts_with(['-', '.']) || input.ends_with(['-', '.']) {
            return Err(invalid("must not start or end with '-' or '.'"));
        }
        if input.contains("..") {
            return Err(invalid("must not contain '..'"));
        }

        Ok(Self(input.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for SiteName {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SiteName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for SiteName {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Directory layout for the sites managed under one root.
///
/// Every site lives in `<root>/<name>`; nothing is created until a caller
/// asks for it.
#[derive(Debug, Clone)]
pub struct SiteLayout {
    root: PathBuf,
}

impl SiteLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn site_dir(&self, name: &SiteName) -> PathBuf {
        self.root.join(name.as_str())
    }

    #[inline]
    pub fn compose_file(&self, name: &SiteName) -> PathBuf {
        self.site_dir(name).join(COMPOSE_FILE)
    }

    #[inline]
    pub fn nginx_conf(&self, name: &SiteName) -> PathBuf {
        self.site_dir(name).join(NGINX_FILE)
    }

    #[inline]
    pub fn state_file(&self, name: &SiteName) -> PathBuf {
        self.site_dir(name).join(STATE_FILE)
    }

    /// Lock files live beside the site directories so that deleting a site
    /// never removes a lock that is still held.
    #[inline]
    pub fn lock_file(&self, name: &SiteName) -> PathBuf {
        self.root.join(LOCK_DIR).join(format!("{name}.lock"))
    }
}
