//! Hosts-file mapping of site names to the loopback address.

use crate::command::{CommandRunner, CommandSpec};
use crate::privilege::Elevated;
use crate::RuntimeError;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::Path;
use tracing::{debug, info};
use wpsite_schema::{hosts_line, SiteName, HOSTS_ADDRESS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HostsOutcome {
    Added,
    AlreadyPresent,
    Removed,
    NotPresent,
}

fn tokens(line: &str) -> Vec<&str> {
    let data = line.split('#').next().unwrap_or_default();
    data.split_whitespace().collect()
}

fn maps_loopback(line: &str, name: &str) -> bool {
    let toks = tokens(line);
    toks.first() == Some(&HOSTS_ADDRESS) && toks[1..].iter().any(|h| h.eq_ignore_ascii_case(name))
}

fn is_managed_line(line: &str, name: &str) -> bool {
    let toks = tokens(line);
    toks.len() == 2 && toks[0] == HOSTS_ADDRESS && toks[1].eq_ignore_ascii_case(name)
}

/// Whether `content` already maps `name` to the loopback address.
pub fn has_entry(content: &str, name: &SiteName) -> bool {
    content.lines().any(|line| maps_loopback(line, name))
}

/// Terminator used by existing lines, so edits keep CRLF files CRLF.
fn line_ending(content: &str) -> &'static str {
    if content.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

fn read(path: &Path) -> Result<String, RuntimeError> {
    fs::read_to_string(path).map_err(|e| RuntimeError::fs("read", path, e))
}

/// Append `127.0.0.1 <name>` unless an equivalent mapping exists.
pub fn add_entry(
    runner: &dyn CommandRunner,
    token: &Elevated,
    path: &Path,
    name: &SiteName,
) -> Result<HostsOutcome, RuntimeError> {
    let content = read(path)?;
    if has_entry(&content, name) {
        debug!("hosts entry for {name} already present in {}", path.display());
        return Ok(HostsOutcome::AlreadyPresent);
    }

    let eol = line_ending(&content);
    let mut addition = String::new();
    if !content.is_empty() && !content.ends_with('\n') {
        addition.push_str(eol);
    }
    addition.push_str(&hosts_line(name));
    addition.push_str(eol);

    if token.is_prefixed() {
        let spec = CommandSpec::new("tee")
            .args(["-a".to_owned(), path.to_string_lossy().into_owned()])
            .stdin(addition);
        runner.run_checked(&token.command(spec))?;
    } else {
        let mut file = OpenOptions::new()
            .append(true)
            .open(path)
            .map_err(|e| RuntimeError::fs("open for append", path, e))?;
        file.write_all(addition.as_bytes())
            .map_err(|e| RuntimeError::fs("append to", path, e))?;
    }

    info!("hosts entry added for {name}");
    Ok(HostsOutcome::Added)
}

/// Remove lines that map exactly `127.0.0.1 <name>`.
///
/// Lines carrying additional aliases are left alone; wpsite never writes them.
/// Every kept line is written back byte for byte, terminator included.
pub fn remove_entry(
    runner: &dyn CommandRunner,
    token: &Elevated,
    path: &Path,
    name: &SiteName,
) -> Result<HostsOutcome, RuntimeError> {
    let content = read(path)?;
    if !content.lines().any(|l| is_managed_line(l, name)) {
        return Ok(HostsOutcome::NotPresent);
    }

    let kept: String = content
        .split_inclusive('\n')
        .filter(|l| !is_managed_line(l, name))
        .collect();

    if token.is_prefixed() {
        let spec = CommandSpec::new("tee")
            .arg(path.to_string_lossy().into_owned())
            .stdin(kept);
        runner.run_checked(&token.command(spec))?;
    } else {
        // Rewritten in place: /etc/hosts is commonly a bind mount that cannot be renamed over.
        fs::write(path, kept).map_err(|e| RuntimeError::fs("write", path, e))?;
    }

    info!("hosts entry removed for {name}");
    Ok(HostsOutcome::Removed)
}
