//! The per-site state marker.
//!
//! `docker-compose` is the source of truth for containers; the marker only
//! records what wpsite last asked for, so `status` can answer without
//! querying Docker.

use crate::lifecycle::SiteState;
use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::warn;
use wpsite_schema::{SiteLayout, SiteName};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteMarker {
    pub state: SiteState,
    pub updated_at: String,
}

impl SiteMarker {
    pub fn now(state: SiteState) -> Self {
        Self {
            state,
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn read(path: &Path) -> Result<Option<Self>, CoreError> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CoreError::fs("read", path, e)),
        }
    }

    pub fn write(&self, path: &Path) -> Result<(), CoreError> {
        let content = serde_json::to_string_pretty(self)?;
        write_atomic(path, content.as_bytes())
    }
}

/// Replace `dest` with `content` via a temp file in the same directory.
pub fn write_atomic(dest: &Path, content: &[u8]) -> Result<(), CoreError> {
    let dir = dest
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| CoreError::fs("create temp file in", &dir, e))?;
    tmp.write_all(content)
        .map_err(|e| CoreError::fs("write temp file for", dest, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| CoreError::fs("fsync temp file for", dest, e))?;
    tmp.persist(dest)
        .map_err(|e| CoreError::fs("persist", dest, e.error))?;
    Ok(())
}

/// Observed lifecycle state of `name` under `layout`.
///
/// A directory with a compose file but no readable marker counts as running,
/// matching a site provisioned before markers existed or by hand.
pub fn observe(layout: &SiteLayout, name: &SiteName) -> SiteState {
    if !layout.site_dir(name).is_dir() {
        return SiteState::Absent;
    }
    match SiteMarker::read(&layout.state_file(name)) {
        Ok(Some(marker)) => return marker.state,
        Ok(None) => {}
        Err(e) => warn!("ignoring unreadable state marker for {name}: {e}"),
    }
    if layout.compose_file(name).is_file() {
        SiteState::Running
    } else {
        SiteState::Absent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".wpsite-state.json");
        let marker = SiteMarker::now(SiteState::Stopped);
        marker.write(&path).unwrap();
        assert_eq!(SiteMarker::read(&path).unwrap(), Some(marker));
    }

    #[test]
    fn missing_marker_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SiteMarker::read(&dir.path().join("absent")).unwrap().is_none());
    }

    #[test]
    fn observe_states() {
        let root = tempfile::tempdir().unwrap();
        let layout = SiteLayout::new(root.path());
        let name = SiteName::parse("demo").unwrap();
        assert_eq!(observe(&layout, &name), SiteState::Absent);

        fs::create_dir_all(layout.site_dir(&name)).unwrap();
        assert_eq!(observe(&layout, &name), SiteState::Absent);

        fs::write(layout.compose_file(&name), "services: {}").unwrap();
        assert_eq!(observe(&layout, &name), SiteState::Running);

        SiteMarker::now(SiteState::Stopped)
            .write(&layout.state_file(&name))
            .unwrap();
        assert_eq!(observe(&layout, &name), SiteState::Stopped);
    }

    #[test]
    fn corrupt_marker_falls_back_to_compose_file() {
        let root = tempfile::tempdir().unwrap();
        let layout = SiteLayout::new(root.path());
        let name = SiteName::parse("demo").unwrap();
        fs::create_dir_all(layout.site_dir(&name)).unwrap();
        fs::write(layout.compose_file(&name), "services: {}").unwrap();
        fs::write(layout.state_file(&name), "{not json").unwrap();
        assert_eq!(observe(&layout, &name), SiteState::Running);
    }
}
