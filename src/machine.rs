//! Voting machines and the caller-owned machine registry

use crate::codec::{Ballot, EnvelopeMetadata};
use crate::domain::ElectionSection;
use crate::error::{Error, IntegrityMismatch, Result};
use crate::freshness::{FreshnessRecord, epoch_sentinel};
use crate::locator::MachineAddress;
use crate::types::{MachineState, SectionKey};
use crate::votes::{VoteTable, flatten_votes};
use chrono::NaiveDateTime;
use std::path::PathBuf;

/// Why a machine left a bulk run
#[derive(Debug)]
pub struct MachineFailure {
    /// State the machine was in when it failed
    pub stage: MachineState,
    /// Underlying cause
    pub error: Error,
}

/// One voting machine and its acquisition cache
///
/// The decoded payload (`cached_envelope`, `cached_ballot`) is trusted only
/// while `is_stale` is false; [`trusted_ballot`](Self::trusted_ballot) is the
/// checked accessor.
#[derive(Debug)]
pub struct VotingMachine {
    /// Section served by the machine
    pub section: ElectionSection,
    /// Serial number, filled in from the decoded ballot when unknown
    pub serial: Option<String>,
    /// Local path of the last downloaded artifact
    pub cached_artifact_path: Option<PathBuf>,
    /// Decoded envelope metadata
    pub cached_envelope: Option<EnvelopeMetadata>,
    /// Decoded ballot
    pub cached_ballot: Option<Ballot>,
    /// Whether the cached payload must not be trusted
    pub is_stale: bool,
    /// Last resolved freshness hash
    pub remote_hash: Option<String>,
    /// Publication time of `remote_hash`, or the epoch sentinel
    pub remote_hash_timestamp: NaiveDateTime,
    /// Bulk-run state
    pub state: MachineState,
    /// Failure recorded by the last bulk run
    pub failure: Option<MachineFailure>,
}

impl VotingMachine {
    /// A fresh machine with nothing cached
    pub fn new(section: ElectionSection) -> Self {
        Self {
            section,
            serial: None,
            cached_artifact_path: None,
            cached_envelope: None,
            cached_ballot: None,
            is_stale: true,
            remote_hash: None,
            remote_hash_timestamp: epoch_sentinel(),
            state: MachineState::Pending,
            failure: None,
        }
    }

    /// Composite section key
    pub fn key(&self) -> SectionKey {
        self.section.key()
    }

    /// Identifier tuple for the resource locator
    pub fn address(&self) -> MachineAddress {
        MachineAddress::from_section(&self.section)
    }

    /// Record a resolved freshness hash and its timestamp
    pub fn record_freshness(&mut self, record: &FreshnessRecord) {
        self.remote_hash = Some(record.hash.clone());
        self.remote_hash_timestamp = record.timestamp;
    }

    /// Store a freshly decoded payload and mark it trusted
    pub fn cache_payload(&mut self, envelope: EnvelopeMetadata, ballot: Ballot) {
        if self.serial.is_none() {
            self.serial = ballot.machine.serial.clone();
        }
        self.cached_envelope = Some(envelope);
        self.cached_ballot = Some(ballot);
        self.is_stale = false;
    }

    /// Drop the decoded payload and the artifact path without touching the
    /// staleness flag
    ///
    /// The path must never outlive the file it names.
    pub(crate) fn clear_payload(&mut self) {
        self.cached_artifact_path = None;
        self.cached_envelope = None;
        self.cached_ballot = None;
    }

    /// Drop the decoded payload and everything known about the remote version
    ///
    /// The next acquisition resolves the freshness hash again.
    pub fn invalidate(&mut self) {
        self.clear_payload();
        self.is_stale = true;
        self.remote_hash = None;
        self.remote_hash_timestamp = epoch_sentinel();
    }

    /// Record a bulk-run failure
    pub(crate) fn fail(&mut self, stage: MachineState, error: Error) {
        self.state = MachineState::Failed;
        self.failure = Some(MachineFailure { stage, error });
    }

    /// The cached ballot, if present and not stale
    pub fn trusted_ballot(&self) -> Result<&Ballot> {
        match &self.cached_ballot {
            Some(ballot) if !self.is_stale => Ok(ballot),
            _ => Err(Error::StalePayload(self.key())),
        }
    }

    /// Section identification mismatch between the ballot and this machine
    pub fn integrity_mismatch(&self, ballot: &Ballot) -> Option<IntegrityMismatch> {
        let found = ballot.section.key();
        let expected = self.key();
        (found != expected).then_some(IntegrityMismatch { expected, found })
    }

    /// Flatten the cached ballot into vote rows and statistics
    ///
    /// A disagreement between the ballot's section identification and this
    /// machine's is logged and attached to the table; the rows keep the
    /// ballot's identification.
    pub fn vote_table(&self) -> Result<VoteTable> {
        let ballot = self.trusted_ballot()?;
        let mut table = flatten_votes(ballot, &self.section.state().abbr);

        if let Some(mismatch) = self.integrity_mismatch(ballot) {
            tracing::warn!(
                expected = %mismatch.expected,
                found = %mismatch.found,
                "ballot section identification differs from machine"
            );
            table.mismatch = Some(mismatch);
        }

        Ok(table)
    }
}

impl std::fmt::Display for VotingMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let city = self.section.city();
        f.write_str("Urna")?;
        if let Some(serial) = &self.serial {
            write!(f, " #{}", serial)?;
        }
        write!(
            f,
            ", município {}/{} (cód. {:05}), zona {:04}, seção {:04}",
            city.name, city.state.abbr, city.id, self.section.zone.id, self.section.id
        )
    }
}

/// Append-only collection of every machine discovered by section enumeration
///
/// Owned by the caller and passed to the operations that need it.
#[derive(Debug, Default)]
pub struct MachineRegistry {
    machines: Vec<VotingMachine>,
}

impl MachineRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a machine, returning its index
    pub fn register(&mut self, machine: VotingMachine) -> usize {
        self.machines.push(machine);
        self.machines.len() - 1
    }

    /// Number of machines
    pub fn len(&self) -> usize {
        self.machines.len()
    }

    /// Whether no machine was registered
    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    /// Machine at `index`
    pub fn get(&self, index: usize) -> Option<&VotingMachine> {
        self.machines.get(index)
    }

    /// Mutable machine at `index`
    pub fn get_mut(&mut self, index: usize) -> Option<&mut VotingMachine> {
        self.machines.get_mut(index)
    }

    /// Machine serving `key`
    pub fn find(&self, key: SectionKey) -> Option<&VotingMachine> {
        self.machines.iter().find(|m| m.key() == key)
    }

    /// Machines in creation order
    pub fn iter(&self) -> impl Iterator<Item = &VotingMachine> {
        self.machines.iter()
    }

    /// All machines, for bulk operations
    pub fn as_mut_slice(&mut self) -> &mut [VotingMachine] {
        &mut self.machines
    }

    /// Remove every machine
    pub fn clear(&mut self) {
        self.machines.clear();
    }
}
