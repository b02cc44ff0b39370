//! Local artifact storage layout
//!
//! Artifacts live under
//! `{root}/{year}/{contest_id}/sections/{mun:05}/{zone:04}/{sec:04}/`, named
//! after the basename of the URL they were downloaded from.

use crate::error::{Error, Result, TransportError};
use crate::machine::VotingMachine;
use std::path::{Path, PathBuf};

/// Permission bits of created directories (rwx for owner and group, r for others)
#[cfg(unix)]
const DIR_MODE: u32 = 0o774;

/// Directory holding `machine`'s artifacts
pub fn section_dir(root: &Path, machine: &VotingMachine) -> PathBuf {
    let key = machine.key();
    let contest = machine.section.contest;
    root.join(contest.year.to_string())
        .join(contest.contest_id.to_string())
        .join("sections")
        .join(format!("{:05}", key.municipality))
        .join(format!("{:04}", key.zone))
        .join(format!("{:04}", key.section))
}

/// Local path for the artifact at `url` inside `dir`
pub fn artifact_path(dir: &Path, url: &str) -> Result<PathBuf> {
    let parsed = url::Url::parse(url).map_err(|e| TransportError::Request {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let name = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| TransportError::Request {
            url: url.to_string(),
            reason: "URL has no file name".to_string(),
        })?;

    Ok(dir.join(name))
}

/// Create `dir` and its parents; an existing directory is fine
pub async fn ensure_dir(dir: &Path) -> Result<()> {
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(DIR_MODE);

    match builder.create(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(e) => Err(Error::Io(e)),
    }
}

/// Remove a previous artifact at `path`, if any
pub async fn remove_existing(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed previous artifact");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Io(e)),
    }
}
