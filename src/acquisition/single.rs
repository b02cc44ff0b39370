//! Single-machine acquisition

use super::{Acquirer, storage};
use crate::codec::decode_artifact_file;
use crate::error::{Error, Result};
use crate::freshness::Staleness;
use crate::locator::ArtifactKind;
use crate::machine::VotingMachine;
use std::path::PathBuf;

impl Acquirer {
    /// Resolve the artifact URL and local path for `machine`, and prepare the
    /// directory
    ///
    /// Resolves the freshness hash first when unknown. Any previous artifact
    /// at the target path is removed.
    pub(crate) async fn locate(
        &self,
        machine: &mut VotingMachine,
        url_override: Option<&str>,
    ) -> Result<(String, PathBuf)> {
        let url = match url_override {
            Some(url) => url.to_string(),
            None => {
                let hash = self.oracle.resolve_hash(machine).await?;
                self.locator
                    .artifact_url(&machine.address(), &hash, ArtifactKind::BallotBulletin)
            }
        };

        let dir = storage::section_dir(&self.config.download_root, machine);
        storage::ensure_dir(&dir).await?;
        let path = storage::artifact_path(&dir, &url)?;
        storage::remove_existing(&path).await?;

        Ok((url, path))
    }

    /// Download the ballot bulletin of `machine`
    ///
    /// Uses `url_override` instead of the located URL when given. On success
    /// the machine's artifact path is set and its staleness flag cleared; the
    /// previously decoded payload is dropped either way.
    pub async fn download_artifact(
        &self,
        machine: &mut VotingMachine,
        url_override: Option<&str>,
    ) -> Result<PathBuf> {
        let (url, path) = self.locate(machine, url_override).await?;
        machine.clear_payload();

        self.fetcher.download(&url, &path).await?;
        tracing::debug!(section = %machine.key(), path = %path.display(), "artifact downloaded");

        machine.cached_artifact_path = Some(path.clone());
        machine.is_stale = false;
        Ok(path)
    }

    /// Decode the machine's downloaded artifact and cache the result
    pub async fn decode_cached(&self, machine: &mut VotingMachine) -> Result<()> {
        let path = machine
            .cached_artifact_path
            .clone()
            .ok_or_else(|| Error::MissingArtifact(machine.key()))?;

        let (envelope, ballot) = decode_artifact_file(&path).await?;
        if let Some(mismatch) = machine.integrity_mismatch(&ballot) {
            tracing::warn!(
                expected = %mismatch.expected,
                found = %mismatch.found,
                path = %path.display(),
                "decoded ballot belongs to another section"
            );
        }

        machine.cache_payload(envelope, ballot);
        Ok(())
    }

    /// Bring one machine's decoded ballot up to date
    ///
    /// Checks staleness, downloads and decodes only when stale. On a download
    /// or decode failure the machine's payload is invalidated and the error
    /// returned.
    pub async fn check_download_process(&self, machine: &mut VotingMachine) -> Result<()> {
        let staleness = self.oracle.check(machine).await?;
        match &staleness {
            Staleness::Current(_) => {
                machine.is_stale = false;
                tracing::debug!(section = %machine.key(), "cached ballot is current");
                return Ok(());
            }
            Staleness::Newer(record) => machine.record_freshness(record),
            Staleness::NoCachedBallot => {}
        }

        machine.is_stale = true;
        let result = async {
            self.download_artifact(machine, None).await?;
            self.decode_cached(machine).await
        }
        .await;

        if let Err(e) = result {
            tracing::warn!(section = %machine.key(), error = %e, "acquisition failed");
            machine.invalidate();
            return Err(e);
        }

        tracing::info!(section = %machine.key(), "ballot refreshed");
        Ok(())
    }
}
