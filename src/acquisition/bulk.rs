//! Three-pass bulk acquisition
//!
//! 1. Locate: resolve every machine's URL and local path, prepare directories
//! 2. Download: transfer all artifacts with bounded concurrency
//! 3. Decode: decode every artifact that arrived
//!
//! Each pass finishes for the whole batch before the next starts. A machine
//! that fails is marked [`MachineState::Failed`] with its cause and skipped by
//! later passes; the rest of the batch carries on.

use super::Acquirer;
use crate::error::{Error, IntegrityMismatch};
use crate::machine::{MachineRegistry, VotingMachine};
use crate::types::{Event, MachineState, Pass, SectionKey};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Final state of one machine after a bulk run
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MachineOutcome {
    /// Machine identification
    pub key: SectionKey,
    /// Final state (`Ready` or `Failed`)
    pub state: MachineState,
    /// Stage and message of the failure, if any
    pub failure: Option<String>,
    /// Section disagreement between the machine and its decoded ballot
    pub mismatch: Option<IntegrityMismatch>,
}

/// Summary of a bulk run, in input order
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// One entry per machine
    pub outcomes: Vec<MachineOutcome>,
}

impl BatchReport {
    /// Machines that ended `Ready`
    pub fn ready(&self) -> usize {
        self.count(MachineState::Ready)
    }

    /// Machines that ended `Failed`
    pub fn failed(&self) -> usize {
        self.count(MachineState::Failed)
    }

    /// Ready machines whose ballot belongs to another section
    pub fn mismatched(&self) -> impl Iterator<Item = &MachineOutcome> {
        self.outcomes.iter().filter(|o| o.mismatch.is_some())
    }

    /// Whether every machine ended `Ready`
    pub fn all_ready(&self) -> bool {
        self.failed() == 0 && self.ready() == self.outcomes.len()
    }

    fn count(&self, state: MachineState) -> usize {
        self.outcomes.iter().filter(|o| o.state == state).count()
    }
}

struct DownloadTarget {
    index: usize,
    url: String,
    path: PathBuf,
}

impl Acquirer {
    /// Acquire every machine in the registry
    pub async fn download_registry(&self, registry: &mut MachineRegistry) -> BatchReport {
        self.download_many(registry.as_mut_slice()).await
    }

    /// Acquire `machines` in three batch-level passes
    ///
    /// Never fails as a whole: per-machine errors are recorded on the machines
    /// and summarised in the returned report.
    pub async fn download_many(&self, machines: &mut [VotingMachine]) -> BatchReport {
        let targets = self.locate_pass(machines).await;
        self.download_pass(machines, targets).await;
        self.decode_pass(machines).await;

        let outcomes = machines
            .iter()
            .map(|machine| MachineOutcome {
                key: machine.key(),
                state: machine.state,
                failure: machine
                    .failure
                    .as_ref()
                    .map(|f| format!("{}: {}", f.stage, f.error)),
                mismatch: machine
                    .cached_ballot
                    .as_ref()
                    .and_then(|ballot| machine.integrity_mismatch(ballot)),
            })
            .collect();
        let report = BatchReport { outcomes };

        tracing::info!(
            machines = machines.len(),
            ready = report.ready(),
            failed = report.failed(),
            "bulk acquisition finished"
        );
        report
    }

    async fn locate_pass(&self, machines: &mut [VotingMachine]) -> Vec<DownloadTarget> {
        let total = machines.len();
        self.emit(Event::PassStarted {
            pass: Pass::Locate,
            total,
        });
        tracing::info!(machines = total, "locating artifacts");

        let mut targets = Vec::with_capacity(total);
        for (index, machine) in machines.iter_mut().enumerate() {
            machine.state = MachineState::Locating;
            machine.failure = None;

            match self.locate(machine, None).await {
                Ok((url, path)) => {
                    machine.clear_payload();
                    machine.is_stale = true;
                    targets.push(DownloadTarget { index, url, path });
                    self.emit(Event::MachineProgress {
                        pass: Pass::Locate,
                        section: machine.key(),
                        completed: index + 1,
                        total,
                    });
                }
                Err(e) => self.record_failure(machine, Pass::Locate, e),
            }
        }

        self.emit(Event::PassCompleted {
            pass: Pass::Locate,
            succeeded: targets.len(),
            failed: total - targets.len(),
        });
        targets
    }

    async fn download_pass(&self, machines: &mut [VotingMachine], targets: Vec<DownloadTarget>) {
        let total = targets.len();
        self.emit(Event::PassStarted {
            pass: Pass::Download,
            total,
        });

        if total == 0 {
            self.emit(Event::PassCompleted {
                pass: Pass::Download,
                succeeded: 0,
                failed: 0,
            });
            return;
        }

        let concurrency = self.config.max_concurrent_downloads.min(total).max(1);
        tracing::info!(machines = total, concurrency, "downloading artifacts");

        for target in &targets {
            machines[target.index].state = MachineState::Downloading;
        }

        let mut downloads = stream::iter(targets.into_iter().map(|target| {
            let fetcher = Arc::clone(&self.fetcher);
            async move {
                let result = fetcher.download(&target.url, &target.path).await;
                (target, result)
            }
        }))
        .buffer_unordered(concurrency);

        let mut completed = 0;
        let mut succeeded = 0;
        while let Some((target, result)) = downloads.next().await {
            completed += 1;
            let machine = &mut machines[target.index];

            match result {
                Ok(()) => {
                    succeeded += 1;
                    machine.cached_artifact_path = Some(target.path);
                    machine.is_stale = false;
                    machine.state = MachineState::Downloaded;
                    self.emit(Event::MachineProgress {
                        pass: Pass::Download,
                        section: machine.key(),
                        completed,
                        total,
                    });
                }
                Err(e) => self.record_failure(machine, Pass::Download, e),
            }
        }

        self.emit(Event::PassCompleted {
            pass: Pass::Download,
            succeeded,
            failed: total - succeeded,
        });
    }

    async fn decode_pass(&self, machines: &mut [VotingMachine]) {
        let total = machines
            .iter()
            .filter(|m| m.state == MachineState::Downloaded)
            .count();
        self.emit(Event::PassStarted {
            pass: Pass::Decode,
            total,
        });
        tracing::info!(machines = total, "decoding artifacts");

        let mut completed = 0;
        let mut succeeded = 0;
        for machine in machines
            .iter_mut()
            .filter(|m| m.state == MachineState::Downloaded)
        {
            completed += 1;
            machine.state = MachineState::Decoding;

            match self.decode_cached(machine).await {
                Ok(()) => {
                    succeeded += 1;
                    machine.state = MachineState::Ready;
                    self.emit(Event::MachineProgress {
                        pass: Pass::Decode,
                        section: machine.key(),
                        completed,
                        total,
                    });
                }
                Err(e) => {
                    machine.clear_payload();
                    machine.is_stale = true;
                    self.record_failure(machine, Pass::Decode, e);
                }
            }
        }

        self.emit(Event::PassCompleted {
            pass: Pass::Decode,
            succeeded,
            failed: total - succeeded,
        });
    }

    fn record_failure(&self, machine: &mut VotingMachine, pass: Pass, error: Error) {
        tracing::warn!(
            section = %machine.key(),
            stage = %machine.state,
            error = %error,
            "machine failed"
        );
        self.emit(Event::MachineFailed {
            pass,
            section: machine.key(),
            error: error.to_string(),
        });
        let stage = machine.state;
        machine.fail(stage, error);
    }
}
