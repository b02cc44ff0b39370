//! Staleness oracle
//!
//! The authority publishes, per voting machine, an info document whose
//! `hashes[0]` entry names the latest artifact version (`hash`) and when it was
//! published (`dr` date + `hr` time). A machine's cached ballot is current while
//! the published timestamp is not newer than the one recorded on the machine.
//!
//! [`StalenessOracle`] is the only place that comparison is made.

use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::locator::Locator;
use crate::machine::VotingMachine;
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::sync::Arc;

/// Format of `dr` + `hr` joined by a space
pub const FRESHNESS_DATETIME_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Timestamp recorded on machines that never resolved a freshness record
///
/// Any published timestamp compares newer than it.
pub fn epoch_sentinel() -> NaiveDateTime {
    // chrono's default is 1970-01-01T00:00:00
    NaiveDateTime::default()
}

/// Current artifact version of one machine
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FreshnessRecord {
    /// Content-derived token namespacing the artifact URLs
    pub hash: String,
    /// Publication timestamp
    pub timestamp: NaiveDateTime,
}

#[derive(Deserialize)]
struct InfoDocument {
    hashes: Option<Vec<HashEntry>>,
}

#[derive(Deserialize)]
struct HashEntry {
    hash: Option<String>,
    dr: Option<String>,
    hr: Option<String>,
}

impl FreshnessRecord {
    /// Parse a machine info document fetched from `url`
    ///
    /// Fails with [`Error::MalformedFreshnessRecord`] when the body is not
    /// JSON, `hashes` is absent or empty, or `hash`/`dr`/`hr` is missing or
    /// unparseable.
    pub fn parse(url: &str, body: &[u8]) -> Result<Self> {
        let malformed = |reason: String| Error::MalformedFreshnessRecord {
            url: url.to_string(),
            reason,
        };

        let document: InfoDocument =
            serde_json::from_slice(body).map_err(|e| malformed(e.to_string()))?;
        let entry = document
            .hashes
            .ok_or_else(|| malformed("missing 'hashes'".to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| malformed("'hashes' is empty".to_string()))?;

        let hash = entry
            .hash
            .filter(|h| !h.is_empty())
            .ok_or_else(|| malformed("missing 'hash'".to_string()))?;
        let date = entry
            .dr
            .ok_or_else(|| malformed("missing 'dr'".to_string()))?;
        let time = entry
            .hr
            .ok_or_else(|| malformed("missing 'hr'".to_string()))?;

        let joined = format!("{} {}", date.trim(), time.trim());
        let timestamp = NaiveDateTime::parse_from_str(&joined, FRESHNESS_DATETIME_FORMAT)
            .map_err(|e| malformed(format!("invalid timestamp '{}': {}", joined, e)))?;

        Ok(Self { hash, timestamp })
    }
}

/// Outcome of a staleness check
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Staleness {
    /// No trusted decoded ballot is cached; nothing was fetched
    NoCachedBallot,
    /// The remote record is not newer than the cached one
    Current(FreshnessRecord),
    /// The remote record is strictly newer than the cached one
    Newer(FreshnessRecord),
}

impl Staleness {
    /// Whether a re-fetch is required
    pub fn is_stale(&self) -> bool {
        !matches!(self, Staleness::Current(_))
    }
}

/// Decides whether a machine's cached ballot must be re-fetched
#[derive(Clone)]
pub struct StalenessOracle {
    fetcher: Arc<dyn Fetcher>,
    locator: Locator,
}

impl StalenessOracle {
    /// Create an oracle fetching info documents through `fetcher`
    pub fn new(fetcher: Arc<dyn Fetcher>, locator: Locator) -> Self {
        Self { fetcher, locator }
    }

    /// Fetch and parse the machine's current freshness record
    pub async fn remote_record(&self, machine: &VotingMachine) -> Result<FreshnessRecord> {
        let url = self.locator.machine_info_url(&machine.address());
        let response = self.fetcher.fetch(&url).await?.error_for_status()?;
        FreshnessRecord::parse(&url, &response.body)
    }

    /// Compare the machine's cached record against the remote one
    ///
    /// Makes no network call when no trusted ballot is cached and exactly
    /// one otherwise. A payload flagged stale never counts as cached.
    pub async fn check(&self, machine: &VotingMachine) -> Result<Staleness> {
        if machine.cached_ballot.is_none() || machine.is_stale {
            return Ok(Staleness::NoCachedBallot);
        }

        let record = self.remote_record(machine).await?;
        let staleness = if record.timestamp > machine.remote_hash_timestamp {
            Staleness::Newer(record)
        } else {
            Staleness::Current(record)
        };

        tracing::debug!(
            section = %machine.key(),
            cached = %machine.remote_hash_timestamp,
            stale = staleness.is_stale(),
            "checked freshness"
        );
        Ok(staleness)
    }

    /// Boolean form of [`check`](Self::check)
    pub async fn is_stale(&self, machine: &VotingMachine) -> Result<bool> {
        Ok(self.check(machine).await?.is_stale())
    }

    /// The machine's freshness hash, fetching and recording it if unknown
    pub async fn resolve_hash(&self, machine: &mut VotingMachine) -> Result<String> {
        if let Some(hash) = &machine.remote_hash {
            return Ok(hash.clone());
        }

        let record = self.remote_record(machine).await?;
        machine.record_freshness(&record);
        Ok(record.hash)
    }
}

impl std::fmt::Debug for StalenessOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StalenessOracle")
            .field("locator", &self.locator)
            .finish_non_exhaustive()
    }
}
