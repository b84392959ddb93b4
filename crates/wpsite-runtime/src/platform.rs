//! Platform detection and the per-platform capability table.
//!
//! Every capability returns `Option`; `None` is the explicit "unsupported"
//! answer that callers log and skip.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

const OS_RELEASE: &str = "/etc/os-release";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinuxFamily {
    /// yum-based distributions.
    RedHat,
    /// apt-based distributions.
    Debian,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux(LinuxFamily),
    MacOs,
    Windows,
    Unsupported(String),
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Linux(LinuxFamily::RedHat) => write!(f, "linux (redhat family)"),
            Platform::Linux(LinuxFamily::Debian) => write!(f, "linux (debian family)"),
            Platform::Linux(LinuxFamily::Other(id)) => write!(f, "linux ({id})"),
            Platform::MacOs => write!(f, "macos"),
            Platform::Windows => write!(f, "windows"),
            Platform::Unsupported(os) => write!(f, "{os}"),
        }
    }
}

impl Platform {
    pub fn detect() -> Self {
        let os = std::env::consts::OS;
        match os {
            "linux" => {
                let family = std::fs::read_to_string(OS_RELEASE)
                    .map_or_else(|_| LinuxFamily::Other("unknown".to_owned()), |c| {
                        parse_os_release(&c)
                    });
                Platform::Linux(family)
            }
            other => Self::from_os(other),
        }
    }

    /// Map a non-Linux `std::env::consts::OS` value.
    pub fn from_os(os: &str) -> Self {
        match os {
            "linux" => Platform::Linux(LinuxFamily::Other("unknown".to_owned())),
            "macos" => Platform::MacOs,
            "windows" => Platform::Windows,
            other => Platform::Unsupported(other.to_owned()),
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, Platform::Windows)
    }

    /// Package-manager invocation that installs `dependency`.
    pub fn install_command(&self, dependency: &str) -> Option<Vec<String>> {
        let cmd: &[&str] = match self {
            Platform::Linux(LinuxFamily::RedHat) => &["sudo", "yum", "install", "-y"],
            Platform::Linux(LinuxFamily::Debian) => &["sudo", "apt", "install", "-y"],
            Platform::MacOs => &["brew", "install"],
            Platform::Windows => &["choco", "install", "-y"],
            Platform::Linux(LinuxFamily::Other(_)) | Platform::Unsupported(_) => return None,
        };
        Some(with_args(cmd, [dependency]))
    }

    pub fn hosts_file(&self) -> Option<PathBuf> {
        match self {
            Platform::Linux(_) => Some(PathBuf::from("/etc/hosts")),
            Platform::Windows => Some(PathBuf::from(r"C:\Windows\System32\drivers\etc\hosts")),
            Platform::MacOs | Platform::Unsupported(_) => None,
        }
    }

    /// Directory whose entries the system NGINX loads.
    pub fn nginx_sites_dir(&self) -> Option<PathBuf> {
        match self {
            Platform::Linux(_) => Some(PathBuf::from("/etc/nginx/sites-enabled")),
            Platform::Windows => Some(PathBuf::from(r"C:\nginx\conf\sites-enabled")),
            Platform::MacOs | Platform::Unsupported(_) => None,
        }
    }

    /// Command creating (or replacing) `target` as a symlink to the file `source`.
    pub fn symlink_command(&self, source: &Path, target: &Path) -> Option<Vec<String>> {
        match self {
            Platform::Linux(_) => Some(with_args(&["ln", "-sfn"], [source, target])),
            Platform::Windows => Some(with_args(&["cmd", "/C", "mklink"], [target, source])),
            Platform::MacOs | Platform::Unsupported(_) => None,
        }
    }

    pub fn remove_file_command(&self, path: &Path) -> Option<Vec<String>> {
        match self {
            Platform::Linux(_) | Platform::MacOs => Some(with_args(&["rm", "-f"], [path])),
            Platform::Windows => Some(with_args(&["cmd", "/C", "del", "/F", "/Q"], [path])),
            Platform::Unsupported(_) => None,
        }
    }

    pub fn remove_tree_command(&self, path: &Path) -> Option<Vec<String>> {
        match self {
            Platform::Linux(_) | Platform::MacOs => Some(with_args(&["rm", "-rf"], [path])),
            Platform::Windows => Some(with_args(&["cmd", "/C", "rmdir", "/S", "/Q"], [path])),
            Platform::Unsupported(_) => None,
        }
    }
}

fn with_args<A: AsRef<std::ffi::OsStr>>(
    base: &[&str],
    args: impl IntoIterator<Item = A>,
) -> Vec<String> {
    base.iter()
        .map(|s| (*s).to_owned())
        .chain(
            args.into_iter()
                .map(|a| a.as_ref().to_string_lossy().into_owned()),
        )
        .collect()
}

/// Classify a distribution from `/etc/os-release` content.
///
/// `ID` wins over `ID_LIKE`, so a derivative that declares both keeps its own
/// identity when it is known.
pub fn parse_os_release(content: &str) -> LinuxFamily {
    let mut id = None;
    let mut id_like = Vec::new();
    for line in content.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
        match key.trim() {
            "ID" => id = Some(value.to_ascii_lowercase()),
            "ID_LIKE" => {
                id_like = value
                    .split_whitespace()
                    .map(str::to_ascii_lowercase)
                    .collect();
            }
            _ => {}
        }
    }

    let classify = |name: &str| match name {
        "rhel" | "centos" | "fedora" | "suse" | "sles" | "opensuse" => Some(LinuxFamily::RedHat),
        "ubuntu" | "debian" => Some(LinuxFamily::Debian),
        _ => None,
    };

    if let Some(family) = id.as_deref().and_then(classify) {
        return family;
    }
    if let Some(family) = id_like.iter().find_map(|n| classify(n)) {
        return family;
    }
    LinuxFamily::Other(id.unwrap_or_else(|| "unknown".to_owned()))
}
