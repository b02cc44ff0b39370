// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::codec::test_helpers::sample_artifact;
use crate::config::RetryConfig;
use crate::error::{Error, TransportError};
use crate::machine::VotingMachine;
use crate::machine::tests::machine_at;
use crate::types::{MachineState, Pass, SectionKey};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MUNICIPALITY: u32 = 58017;
const ZONE: u32 = 116;

fn info_path(section: u32) -> String {
    format!(
        "/ele2022/arquivo-urna/406/dados/rj/58017/0116/{:04}/p000406-rj-m58017-z0116-s{:04}-aux.json",
        section, section
    )
}

fn artifact_path(section: u32, hash: &str) -> String {
    format!(
        "/ele2022/arquivo-urna/406/dados/rj/58017/0116/{:04}/{}/o00406-580170116{:04}.bu",
        section, hash, section
    )
}

fn info_body(hash: &str, date: &str, time: &str) -> String {
    format!(
        r#"{{"hashes":[{{"hash":"{}","dr":"{}","hr":"{}","st":"Totalizado"}}]}}"#,
        hash, date, time
    )
}

fn key(section: u32) -> SectionKey {
    SectionKey::new(MUNICIPALITY, ZONE, section)
}

fn machine(section: u32) -> VotingMachine {
    machine_at(MUNICIPALITY, ZONE, section)
}

fn acquirer(server: &MockServer, root: &TempDir) -> Acquirer {
    let config = Config {
        base_url: server.uri(),
        download_root: root.path().to_path_buf(),
        retry: RetryConfig {
            max_attempts: 1,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(20),
            backoff_multiplier: 2.0,
            jitter: false,
        },
        ..Default::default()
    };
    Acquirer::new(config).unwrap()
}

async fn mount_info(server: &MockServer, section: u32, hash: &str) {
    Mock::given(method("GET"))
        .and(path(info_path(section)))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(info_body(hash, "02/10/2022", "17:05:09")),
        )
        .mount(server)
        .await;
}

async fn mount_artifact(server: &MockServer, section: u32, hash: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(artifact_path(section, hash)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_batch_isolates_failed_download() {
    let server = MockServer::start().await;
    for section in 1..=5 {
        let hash = format!("h{}", section);
        mount_info(&server, section, &hash).await;
        if section == 3 {
            Mock::given(method("GET"))
                .and(path(artifact_path(section, &hash)))
                .respond_with(ResponseTemplate::new(404))
                .mount(&server)
                .await;
        } else {
            mount_artifact(&server, section, &hash, sample_artifact(key(section))).await;
        }
    }

    let root = tempfile::tempdir().unwrap();
    let acquirer = acquirer(&server, &root);
    let mut events = acquirer.subscribe();
    let mut machines: Vec<VotingMachine> = (1..=5).map(machine).collect();

    let report = acquirer.download_many(&mut machines).await;

    assert_eq!(report.outcomes.len(), 5);
    assert_eq!(report.ready(), 4);
    assert_eq!(report.failed(), 1);
    assert!(!report.all_ready());

    for (i, machine) in machines.iter().enumerate() {
        if i == 2 {
            assert_eq!(machine.state, MachineState::Failed);
            let failure = machine.failure.as_ref().unwrap();
            assert_eq!(failure.stage, MachineState::Downloading);
            assert!(matches!(
                failure.error,
                Error::Transport(TransportError::Status { status: 404, .. })
            ));
            assert!(machine.cached_ballot.is_none());
            assert!(machine.is_stale);
        } else {
            assert_eq!(machine.state, MachineState::Ready, "machine {}", i + 1);
            assert!(machine.failure.is_none());
            assert!(!machine.is_stale);
            assert!(machine.trusted_ballot().is_ok());
            assert_eq!(machine.serial.as_deref(), Some("2148123"));
        }
    }
    assert!(report.outcomes[2].failure.as_deref().unwrap().starts_with("downloading"));

    let stored = root
        .path()
        .join("2022/406/sections/58017/0116/0001/o00406-5801701160001.bu");
    assert!(stored.is_file());

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    assert_eq!(
        received.first(),
        Some(&Event::PassStarted {
            pass: Pass::Locate,
            total: 5
        })
    );
    assert_eq!(
        received.last(),
        Some(&Event::PassCompleted {
            pass: Pass::Decode,
            succeeded: 4,
            failed: 0
        })
    );
    assert!(received.iter().any(|e| matches!(
        e,
        Event::MachineFailed {
            pass: Pass::Download,
            section,
            ..
        } if *section == key(3)
    )));
}

#[tokio::test]
async fn test_batch_decode_and_locate_failures_are_isolated() {
    let server = MockServer::start().await;

    mount_info(&server, 1, "h1").await;
    mount_artifact(&server, 1, "h1", sample_artifact(key(1))).await;

    mount_info(&server, 2, "h2").await;
    mount_artifact(&server, 2, "h2", b"this is not a ballot".to_vec()).await;

    Mock::given(method("GET"))
        .and(path(info_path(3)))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"hashes":[]}"#))
        .mount(&server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let acquirer = acquirer(&server, &root);
    let mut machines: Vec<VotingMachine> = (1..=3).map(machine).collect();

    let report = acquirer.download_many(&mut machines).await;

    assert_eq!(machines[0].state, MachineState::Ready);

    assert_eq!(machines[1].state, MachineState::Failed);
    let decode_failure = machines[1].failure.as_ref().unwrap();
    assert_eq!(decode_failure.stage, MachineState::Decoding);
    assert!(matches!(decode_failure.error, Error::Decode(_)));
    assert!(machines[1].is_stale);
    assert!(machines[1].cached_ballot.is_none());

    assert_eq!(machines[2].state, MachineState::Failed);
    let locate_failure = machines[2].failure.as_ref().unwrap();
    assert_eq!(locate_failure.stage, MachineState::Locating);
    assert!(matches!(
        locate_failure.error,
        Error::MalformedFreshnessRecord { .. }
    ));

    assert_eq!(report.ready(), 1);
    assert_eq!(report.failed(), 2);
}

#[tokio::test]
async fn test_batch_reports_integrity_mismatch() {
    let server = MockServer::start().await;
    mount_info(&server, 1, "h1").await;
    mount_artifact(&server, 1, "h1", sample_artifact(key(7))).await;
    mount_info(&server, 2, "h2").await;
    mount_artifact(&server, 2, "h2", sample_artifact(key(2))).await;

    let root = tempfile::tempdir().unwrap();
    let acquirer = acquirer(&server, &root);
    let mut machines: Vec<VotingMachine> = (1..=2).map(machine).collect();

    let report = acquirer.download_many(&mut machines).await;
    assert!(report.all_ready());

    let mismatched: Vec<&MachineOutcome> = report.mismatched().collect();
    assert_eq!(mismatched.len(), 1);
    let mismatch = mismatched[0].mismatch.as_ref().unwrap();
    assert_eq!(mismatch.expected, key(1));
    assert_eq!(mismatch.found, key(7));
    assert!(report.outcomes[1].mismatch.is_none());
}

#[tokio::test]
async fn test_registry_batch() {
    let server = MockServer::start().await;
    for section in 1..=2 {
        let hash = format!("h{}", section);
        mount_info(&server, section, &hash).await;
        mount_artifact(&server, section, &hash, sample_artifact(key(section))).await;
    }

    let root = tempfile::tempdir().unwrap();
    let acquirer = acquirer(&server, &root);
    let mut registry = MachineRegistry::new();
    registry.register(machine(1));
    registry.register(machine(2));

    let report = acquirer.download_registry(&mut registry).await;
    assert!(report.all_ready());
    assert!(registry.iter().all(|m| m.vote_table().is_ok()));
}

#[tokio::test]
async fn test_single_machine_sequence_is_idempotent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(info_path(1)))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(info_body("h1", "02/10/2022", "17:05:09")),
        )
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(artifact_path(1, "h1")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(sample_artifact(key(1))))
        .expect(1)
        .mount(&server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let acquirer = acquirer(&server, &root);
    let mut machine = machine(1);

    acquirer.check_download_process(&mut machine).await.unwrap();
    assert!(!machine.is_stale);
    assert_eq!(machine.remote_hash.as_deref(), Some("h1"));
    let first_path = machine.cached_artifact_path.clone().unwrap();

    acquirer.check_download_process(&mut machine).await.unwrap();
    assert!(!machine.is_stale);
    assert_eq!(machine.cached_artifact_path, Some(first_path));
    assert_eq!(machine.vote_table().unwrap().rows.len(), 16);
}

#[tokio::test]
async fn test_newer_remote_record_triggers_download() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(info_path(1)))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(info_body("h1", "02/10/2022", "17:05:09")),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(info_path(1)))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(info_body("h9", "03/10/2022", "09:00:00")),
        )
        .mount(&server)
        .await;
    mount_artifact(&server, 1, "h1", sample_artifact(key(1))).await;
    Mock::given(method("GET"))
        .and(path(artifact_path(1, "h9")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(sample_artifact(key(1))))
        .expect(1)
        .mount(&server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let acquirer = acquirer(&server, &root);
    let mut machine = machine(1);

    acquirer.check_download_process(&mut machine).await.unwrap();
    assert_eq!(machine.remote_hash.as_deref(), Some("h1"));

    acquirer.check_download_process(&mut machine).await.unwrap();
    assert_eq!(machine.remote_hash.as_deref(), Some("h9"));
    assert!(!machine.is_stale);
}

#[tokio::test]
async fn test_failed_refresh_forgets_removed_artifact() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(info_path(1)))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(info_body("h1", "02/10/2022", "17:05:09")),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(info_path(1)))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(info_body("h9", "03/10/2022", "09:00:00")),
        )
        .mount(&server)
        .await;
    mount_artifact(&server, 1, "h1", sample_artifact(key(1))).await;
    Mock::given(method("GET"))
        .and(path(artifact_path(1, "h9")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let acquirer = acquirer(&server, &root);
    let mut machine = machine(1);

    acquirer.check_download_process(&mut machine).await.unwrap();
    let first_path = machine.cached_artifact_path.clone().unwrap();
    assert!(first_path.is_file());

    assert!(acquirer.check_download_process(&mut machine).await.is_err());
    assert!(!first_path.exists());
    assert!(machine.cached_artifact_path.is_none());
    assert!(machine.is_stale);
    assert!(matches!(
        acquirer.decode_cached(&mut machine).await,
        Err(Error::MissingArtifact(_))
    ));
}

#[tokio::test]
async fn test_untrusted_payload_is_downloaded_again() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(info_path(1)))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(info_body("h1", "02/10/2022", "17:05:09")),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(artifact_path(1, "h1")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(sample_artifact(key(1))))
        .expect(2)
        .mount(&server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let acquirer = acquirer(&server, &root);
    let mut machine = machine(1);

    acquirer.check_download_process(&mut machine).await.unwrap();
    machine.is_stale = true;

    acquirer.check_download_process(&mut machine).await.unwrap();
    assert!(!machine.is_stale);
    assert!(machine.trusted_ballot().is_ok());
}

#[tokio::test]
async fn test_decode_failure_propagates_and_invalidates() {
    let server = MockServer::start().await;
    mount_info(&server, 1, "h1").await;
    mount_artifact(&server, 1, "h1", b"arbitrary text".to_vec()).await;

    let root = tempfile::tempdir().unwrap();
    let acquirer = acquirer(&server, &root);
    let mut machine = machine(1);

    let result = acquirer.check_download_process(&mut machine).await;
    assert!(matches!(result, Err(Error::Decode(_))));
    assert!(machine.is_stale);
    assert!(machine.cached_ballot.is_none());
    assert!(machine.cached_envelope.is_none());
    assert!(machine.remote_hash.is_none());
}

#[tokio::test]
async fn test_download_failure_propagates() {
    let server = MockServer::start().await;
    mount_info(&server, 1, "h1").await;
    Mock::given(method("GET"))
        .and(path(artifact_path(1, "h1")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let acquirer = acquirer(&server, &root);
    let mut machine = machine(1);

    let result = acquirer.check_download_process(&mut machine).await;
    assert!(matches!(
        result,
        Err(Error::Transport(TransportError::Status { status: 404, .. }))
    ));
    assert!(machine.is_stale);
    assert!(machine.trusted_ballot().is_err());
}

#[tokio::test]
async fn test_download_with_url_override_skips_info() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(info_path(1)))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    mount_artifact(&server, 1, "manual", sample_artifact(key(1))).await;

    let root = tempfile::tempdir().unwrap();
    let acquirer = acquirer(&server, &root);
    let mut machine = machine(1);

    let url = format!("{}{}", server.uri(), artifact_path(1, "manual"));
    let stored = acquirer
        .download_artifact(&mut machine, Some(&url))
        .await
        .unwrap();
    assert!(stored.ends_with("sections/58017/0116/0001/o00406-5801701160001.bu"));

    acquirer.decode_cached(&mut machine).await.unwrap();
    assert!(machine.trusted_ballot().is_ok());
    assert_eq!(machine.serial.as_deref(), Some("2148123"));
}

#[tokio::test]
async fn test_decode_without_download_is_missing_artifact() {
    let server = MockServer::start().await;
    let root = tempfile::tempdir().unwrap();
    let acquirer = acquirer(&server, &root);
    let mut machine = machine(1);

    assert!(matches!(
        acquirer.decode_cached(&mut machine).await,
        Err(Error::MissingArtifact(k)) if k == key(1)
    ));
}

#[test]
fn test_invalid_config_rejected() {
    let config = Config {
        max_concurrent_downloads: 0,
        ..Default::default()
    };
    assert!(matches!(
        Acquirer::new(config),
        Err(Error::Config { .. })
    ));
}
