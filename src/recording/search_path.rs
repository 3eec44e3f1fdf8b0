//! Locating the encoder executable through `PATH`, and extending `PATH` for
//! this process so it can be found.

use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::error::RecordError;

pub const SEARCH_PATH_VAR: &str = "PATH";

/// Outcome of scanning the search path for an executable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    /// Every search path entry that was looked at, in order.
    pub checked: Vec<PathBuf>,
    /// Full paths of the matching executables, in search order.
    pub found: Vec<PathBuf>,
}

impl Discovery {
    pub fn count(&self) -> usize {
        self.found.len()
    }

    pub fn is_found(&self) -> bool {
        !self.found.is_empty()
    }

    /// More than one match. Not fatal: the OS picks the first one anyway.
    pub fn is_ambiguous(&self) -> bool {
        self.found.len() > 1
    }

    /// One diagnostic line per checked entry.
    pub fn log_entries(&self, file_name: &OsStr) {
        for dir in &self.checked {
            let candidate = dir.join(file_name);
            if self.found.contains(&candidate) {
                info!("found: {}", candidate.display());
            } else {
                info!("not found in: {}", dir.display());
            }
        }
    }
}

/// `name` plus the platform's executable suffix (`.exe` on Windows).
pub fn encoder_file_name(name: &str) -> OsString {
    let mut file = OsString::from(name);
    file.push(env::consts::EXE_SUFFIX);
    file
}

/// Look for `name` in every entry of `search_path`.
pub fn discover(name: &str, search_path: Option<&OsStr>) -> Discovery {
    let file_name = encoder_file_name(name);
    let mut discovery = Discovery::default();
    let Some(search_path) = search_path else {
        return discovery;
    };

    for dir in env::split_paths(search_path) {
        let candidate = dir.join(&file_name);
        if candidate.is_file() {
            discovery.found.push(candidate);
        }
        discovery.checked.push(dir);
    }
    discovery
}

/// [`discover`] against this process's `PATH`.
pub fn discover_in_env(name: &str) -> Discovery {
    discover(name, env::var_os(SEARCH_PATH_VAR).as_deref())
}

/// Current entries followed by `additions`, keeping the first occurrence of
/// each. Empty additions are skipped; an empty entry already in `current`
/// (the working directory on Unix) is kept.
pub fn merge_search_paths<I, P>(current: Option<&OsStr>, additions: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let existing = current.map(|c| env::split_paths(c).collect::<Vec<_>>());
    let additions = additions
        .into_iter()
        .map(|p| p.as_ref().to_path_buf())
        .filter(|p| !p.as_os_str().is_empty());

    let mut merged: Vec<PathBuf> = Vec::new();
    for entry in existing.into_iter().flatten().chain(additions) {
        if !merged.contains(&entry) {
            merged.push(entry);
        }
    }
    merged
}

/// Add directories to this process's `PATH` so the encoder can be found.
/// The parent shell is unaffected.
pub fn append_search_paths<I, P>(additions: I) -> Result<(), RecordError>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let additions: Vec<PathBuf> = additions
        .into_iter()
        .map(|p| p.as_ref().to_path_buf())
        .filter(|p| !p.as_os_str().is_empty())
        .collect();
    if additions.is_empty() {
        return Ok(());
    }

    let current = env::var_os(SEARCH_PATH_VAR);
    let merged = merge_search_paths(current.as_deref(), &additions);
    let joined = env::join_paths(merged)?;
    env::set_var(SEARCH_PATH_VAR, joined);
    Ok(())
}

/// Single-directory form of [`append_search_paths`].
pub fn append_search_path(dir: impl AsRef<Path>) -> Result<(), RecordError> {
    append_search_paths([dir])
}

/// Try launching `program` with no arguments. Only says whether the process
/// could be created, not whether it is a working encoder.
pub fn probe_invocation(program: &OsStr) -> bool {
    let child = Command::new(program)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
    match child {
        Ok(mut child) => {
            let _ = child.wait();
            true
        }
        Err(e) => {
            debug!("probe of {} failed: {e}", program.to_string_lossy());
            false
        }
    }
}
