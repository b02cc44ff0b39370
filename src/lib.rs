//! # votecounter
//!
//! Acquisition and decoding of the per-machine ballot bulletins published by
//! the electoral authority.
//!
//! The crate locates the artifacts of each voting machine on the results
//! host, decides whether a cached copy is still current, downloads what
//! changed (individually or as a bulk batch), decodes the BER-encoded
//! envelope and ballot, and flattens the ballot into analysis-ready vote rows.
//!
//! ## Design
//!
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Caller-owned state** - Machines live in a [`MachineRegistry`] the
//!   caller owns and passes in; there is no global registry
//! - **Batch isolation** - One failing machine never aborts a bulk run
//! - **Event-driven progress** - Consumers subscribe to pass events
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use votecounter::{Acquirer, Config, Contest, MachineRegistry, State};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let acquirer = Acquirer::new(Config::default())?;
//!
//!     let mut events = acquirer.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let state = Arc::new(State::new("Rio de Janeiro", "RJ", None));
//!     let mut registry = MachineRegistry::new();
//!     acquirer
//!         .enumerate_sections(state, Contest::new(2022, 406), &mut registry)
//!         .await?;
//!
//!     let report = acquirer.download_registry(&mut registry).await;
//!     println!("{} ready, {} failed", report.ready(), report.failed());
//!
//!     for machine in registry.iter() {
//!         if let Ok(table) = machine.vote_table() {
//!             println!("{}: {} rows", machine, table.rows.len());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Single-machine and bulk artifact acquisition
pub mod acquisition;
/// BER envelope and ballot decoding
pub mod codec;
/// Configuration types
pub mod config;
/// Election identity model
pub mod domain;
/// Error types
pub mod error;
/// HTTP fetch capability, rate limiting and retries
pub mod fetch;
/// Remote freshness records and the staleness oracle
pub mod freshness;
/// Section enumeration
pub mod listing;
/// Resource locator
pub mod locator;
/// Voting machines and the machine registry
pub mod machine;
/// Core shared types
pub mod types;
/// Vote flattening
pub mod votes;

pub use acquisition::{Acquirer, BatchReport, MachineOutcome};
pub use codec::{Ballot, EnvelopeMetadata, decode_artifact, decode_artifact_file};
pub use config::{Config, RateLimitConfig, RetryConfig};
pub use domain::{
    Candidate, City, Contest, Country, Election, ElectionSection, ElectionZone,
    JurisdictionDomain, Office, OfficeCategory, OfficeCode, Party, PartyFederation, Region, State,
};
pub use error::{DecodeError, Error, IntegrityMismatch, Result, TransportError};
pub use fetch::{FetchResponse, Fetcher, HttpFetcher, RateLimiter};
pub use freshness::{FreshnessRecord, Staleness, StalenessOracle};
pub use listing::SectionListing;
pub use locator::{ArtifactKind, Locator, MachineAddress};
pub use machine::{MachineFailure, MachineRegistry, VotingMachine};
pub use types::{Event, MachineState, Pass, SectionKey};
pub use votes::{OfficeStats, VoteRow, VoteTable, flatten_votes};
