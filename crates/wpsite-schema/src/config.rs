use crate::SchemaError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "WPSITE_CONFIG";

/// How privileged steps obtain elevated rights.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ElevationMode {
    /// Check for root/administrator and fall back to `sudo` on Unix.
    #[default]
    Auto,
    /// Trust the current user; no check, no prefix.
    None,
}

/// Optional user configuration, read from TOML.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ToolConfig {
    /// Program and leading arguments used to drive containers,
    /// e.g. `["docker-compose"]` or `["docker", "compose"]`.
    #[serde(default = "default_compose_command")]
    pub compose_command: Vec<String>,
    #[serde(default)]
    pub elevation: ElevationMode,
    #[serde(default)]
    pub hosts_file: Option<PathBuf>,
    #[serde(default)]
    pub nginx_sites_dir: Option<PathBuf>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            compose_command: default_compose_command(),
            elevation: ElevationMode::default(),
            hosts_file: None,
            nginx_sites_dir: None,
        }
    }
}

fn default_compose_command() -> Vec<String> {
    vec!["docker-compose".to_owned()]
}

impl ToolConfig {
    pub fn parse_str(input: &str) -> Result<Self, SchemaError> {
        let config: Self = toml::from_str(input)?;
        if config.compose_command.iter().all(|s| s.trim().is_empty()) {
            return Err(SchemaError::EmptyComposeCommand);
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let content = fs::read_to_string(path).map_err(|source| SchemaError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_str(&content)
    }

    /// Load the configuration from an explicit path, `$WPSITE_CONFIG`, or
    /// `~/.config/wpsite/config.toml`, in that order.
    ///
    /// An explicit or environment-provided path must exist. The default path
    /// is optional and its absence yields the defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, SchemaError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::load(Path::new(&path));
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// The executable that must be installed for the compose command to run.
    pub fn compose_program(&self) -> &str {
        self.compose_command
            .first()
            .map_or("docker-compose", String::as_str)
    }

    /// External tools required to provision a site, without duplicates.
    pub fn dependencies(&self) -> Vec<String> {
        let mut deps = vec!["docker".to_owned()];
        let compose = self.compose_program().to_owned();
        if !deps.contains(&compose) {
            deps.push(compose);
        }
        deps
    }

    /// Full compose invocation: configured prefix followed by `args`.
    pub fn compose_args(&self, args: &[&str]) -> (String, Vec<String>) {
        let mut iter = self.compose_command.iter().cloned();
        let program = iter.next().unwrap_or_else(|| "docker-compose".to_owned());
        let mut full: Vec<String> = iter.collect();
        full.extend(args.iter().map(|a| (*a).to_owned()));
        (program, full)
    }
}

fn default_config_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE"))?;
    Some(PathBuf::from(home).join(".config/wpsite/config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = ToolConfig::parse_str("").unwrap();
        assert_eq!(config, ToolConfig::default());
        assert_eq!(config.compose_program(), "docker-compose");
        assert_eq!(config.elevation, ElevationMode::Auto);
    }

    #[test]
    fn parses_overrides() {
        let config = ToolConfig::parse_str(
            r#"
compose_command = ["docker", "compose"]
elevation = "none"
hosts_file = "/tmp/hosts"
nginx_sites_dir = "/tmp/sites-enabled"
"#,
        )
        .unwrap();
        assert_eq!(config.compose_program(), "docker");
        assert_eq!(config.elevation, ElevationMode::None);
        assert_eq!(config.hosts_file, Some(PathBuf::from("/tmp/hosts")));
        assert_eq!(
            config.nginx_sites_dir,
            Some(PathBuf::from("/tmp/sites-enabled"))
        );
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = ToolConfig::parse_str("db_password = \"x\"").unwrap_err();
        assert!(matches!(err, SchemaError::ParseToml(_)));
    }

    #[test]
    fn rejects_empty_compose_command() {
        let err = ToolConfig::parse_str("compose_command = []").unwrap_err();
        assert!(matches!(err, SchemaError::EmptyComposeCommand));
    }

    #[test]
    fn dependencies_are_deduplicated() {
        let plugin = ToolConfig {
            compose_command: vec!["docker".to_owned(), "compose".to_owned()],
            ..ToolConfig::default()
        };
        assert_eq!(plugin.dependencies(), vec!["docker".to_owned()]);
        assert_eq!(
            ToolConfig::default().dependencies(),
            vec!["docker".to_owned(), "docker-compose".to_owned()]
        );
    }

    #[test]
    fn compose_args_prepend_configured_prefix() {
        let plugin = ToolConfig {
            compose_command: vec!["docker".to_owned(), "compose".to_owned()],
            ..ToolConfig::default()
        };
        let (program, args) = plugin.compose_args(&["up", "-d"]);
        assert_eq!(program, "docker");
        assert_eq!(args, vec!["compose", "up", "-d"]);
    }

    #[test]
    fn load_reports_missing_file_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = ToolConfig::load(&missing).unwrap_err();
        assert!(err.to_string().contains("nope.toml"));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "elevation = \"none\"\n").unwrap();
        let config = ToolConfig::resolve(Some(&path)).unwrap();
        assert_eq!(config.elevation, ElevationMode::None);
    }
}
