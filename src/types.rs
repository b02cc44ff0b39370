//! Core types and events for votecounter

use serde::{Deserialize, Serialize};

/// Composite identity of an election section within a contest
///
/// Displayed as `{municipality:05}/{zone:04}/{section:04}`, the same padding the
/// resource locator and the on-disk layout use.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SectionKey {
    /// Municipality code assigned by the electoral authority
    pub municipality: u32,
    /// Election zone number
    pub zone: u32,
    /// Section number
    pub section: u32,
}

impl SectionKey {
    /// Create a new SectionKey
    pub fn new(municipality: u32, zone: u32, section: u32) -> Self {
        Self {
            municipality,
            zone,
            section,
        }
    }

    /// Concatenated zero-padded code (`{mun:05}{zone:04}{sec:04}`)
    pub fn code(&self) -> String {
        format!(
            "{:05}{:04}{:04}",
            self.municipality, self.zone, self.section
        )
    }
}

impl std::fmt::Display for SectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:05}/{:04}/{:04}",
            self.municipality, self.zone, self.section
        )
    }
}

/// Per-machine state during a bulk acquisition run
///
/// `Pending → Locating → Downloading → Downloaded → Decoding → Ready`, with
/// `Failed` reachable from `Locating`, `Downloading` and `Decoding`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineState {
    /// Not yet visited
    Pending,
    /// Resolving freshness hash, URL and local path
    Locating,
    /// Artifact transfer in flight
    Downloading,
    /// Artifact on disk, not yet decoded
    Downloaded,
    /// Decoding the artifact
    Decoding,
    /// Decoded payload cached on the machine
    Ready,
    /// A stage failed; see the attached failure
    Failed,
}

impl MachineState {
    /// Whether the machine will not move any further in this run
    pub fn is_terminal(&self) -> bool {
        matches!(self, MachineState::Ready | MachineState::Failed)
    }
}

impl std::fmt::Display for MachineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MachineState::Pending => "pending",
            MachineState::Locating => "locating",
            MachineState::Downloading => "downloading",
            MachineState::Downloaded => "downloaded",
            MachineState::Decoding => "decoding",
            MachineState::Ready => "ready",
            MachineState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// The three batch-level passes of a bulk run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pass {
    /// Resolve URLs and provision local storage
    Locate,
    /// Transfer artifacts
    Download,
    /// Decode downloaded artifacts
    Decode,
}

/// Progress events emitted by the acquirer
///
/// Purely informational (progress bars, logs); outcomes are read from the
/// returned batch report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A pass started over `total` machines
    PassStarted {
        /// Pass that started
        pass: Pass,
        /// Machines entering the pass
        total: usize,
    },

    /// One machine finished a pass successfully
    MachineProgress {
        /// Current pass
        pass: Pass,
        /// Machine that progressed
        section: SectionKey,
        /// Machines handled so far in this pass
        completed: usize,
        /// Machines entering the pass
        total: usize,
    },

    /// One machine failed and leaves the batch
    MachineFailed {
        /// Pass in which it failed
        pass: Pass,
        /// Machine that failed
        section: SectionKey,
        /// Error message
        error: String,
    },

    /// A pass finished
    PassCompleted {
        /// Pass that finished
        pass: Pass,
        /// Machines that made it through
        succeeded: usize,
        /// Machines that failed in this pass
        failed: usize,
    },
}
