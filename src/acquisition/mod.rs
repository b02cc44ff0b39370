//! Artifact acquisition
//!
//! [`Acquirer`] ties the locator, the fetch capability and the staleness
//! oracle together:
//! - [`Acquirer::check_download_process`] refreshes one machine (staleness
//!   check, conditional download, decode) and propagates errors
//! - [`Acquirer::download_many`] runs the three-pass bulk pipeline over a set
//!   of machines, recording per-machine failures instead of raising them

mod bulk;
mod single;
pub mod storage;

#[cfg(test)]
mod tests;

pub use bulk::{BatchReport, MachineOutcome};

use crate::config::Config;
use crate::domain::{Contest, State};
use crate::error::Result;
use crate::fetch::{Fetcher, HttpFetcher};
use crate::freshness::StalenessOracle;
use crate::listing::{SectionListing, enumerate_sections};
use crate::locator::Locator;
use crate::machine::MachineRegistry;
use crate::types::Event;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Event channel capacity; slow subscribers miss the oldest events
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Acquisition front end
pub struct Acquirer {
    config: Arc<Config>,
    fetcher: Arc<dyn Fetcher>,
    locator: Locator,
    oracle: StalenessOracle,
    event_tx: broadcast::Sender<Event>,
}

impl Acquirer {
    /// Create an acquirer using the HTTP fetcher
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let fetcher = Arc::new(HttpFetcher::new(&config)?);
        Self::with_fetcher(config, fetcher)
    }

    /// Create an acquirer on top of an existing fetcher
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        config.validate()?;

        let locator = Locator::new(config.base_url.clone());
        let oracle = StalenessOracle::new(Arc::clone(&fetcher), locator.clone());
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            locator,
            oracle,
            event_tx,
        })
    }

    /// Subscribe to progress events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resource locator rooted at the configured base URL
    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Staleness oracle sharing this acquirer's fetcher
    pub fn oracle(&self) -> &StalenessOracle {
        &self.oracle
    }

    /// Enumerate the sections of `state` and register their machines
    pub async fn enumerate_sections(
        &self,
        state: Arc<State>,
        contest: Contest,
        registry: &mut MachineRegistry,
    ) -> Result<SectionListing> {
        enumerate_sections(
            self.fetcher.as_ref(),
            &self.locator,
            state,
            contest,
            registry,
        )
        .await
    }

    pub(crate) fn emit(&self, event: Event) {
        // No subscriber is not an error
        self.event_tx.send(event).ok();
    }
}

impl std::fmt::Debug for Acquirer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Acquirer")
            .field("config", &self.config)
            .field("locator", &self.locator)
            .finish_non_exhaustive()
    }
}
