//! Common test utilities for votecounter integration tests

#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;
use votecounter::{Config, RetryConfig, SectionKey};

/// Configuration pointing at a mock server, storing under `root`
pub fn test_config(base_url: &str, root: &Path) -> Config {
    Config {
        base_url: base_url.to_string(),
        download_root: root.to_path_buf(),
        max_concurrent_downloads: 2,
        retry: RetryConfig {
            max_attempts: 0,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(10),
            backoff_multiplier: 1.0,
            jitter: false,
        },
        ..Default::default()
    }
}

fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    let len = content.len();
    if len < 0x80 {
        out.push(len as u8);
    } else {
        let bytes: Vec<u8> = len
            .to_be_bytes()
            .iter()
            .copied()
            .skip_while(|&b| b == 0)
            .collect();
        out.push(0x80 | bytes.len() as u8);
        out.extend(bytes);
    }
    out.extend_from_slice(content);
    out
}

fn int(number: u8, value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < 7
        && ((bytes[start] == 0 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xff && bytes[start + 1] & 0x80 != 0))
    {
        start += 1;
    }
    tlv(0x80 | number, &bytes[start..])
}

fn text(number: u8, value: &str) -> Vec<u8> {
    tlv(0x80 | number, value.as_bytes())
}

fn cons(number: u8, children: &[Vec<u8>]) -> Vec<u8> {
    tlv(0xa0 | number, &children.concat())
}

fn seq(children: &[Vec<u8>]) -> Vec<u8> {
    tlv(0x30, &children.concat())
}

fn common_fields(key: SectionKey, serial: Option<&str>) -> Vec<Vec<u8>> {
    let mut machine = vec![int(0, 1), text(1, "8.26.0.0")];
    if let Some(serial) = serial {
        machine.push(text(2, serial));
    }
    vec![
        cons(0, &[text(0, "20221002T170509"), cons(1, &[int(2, 544)])]),
        int(1, 2),
        cons(2, &machine),
        cons(
            3,
            &[
                cons(
                    0,
                    &[int(0, i64::from(key.municipality)), int(1, i64::from(key.zone))],
                ),
                int(1, 1015),
                int(2, i64::from(key.section)),
            ],
        ),
    ]
}

/// A ballot bulletin artifact with a single presidential race
///
/// Votes: 13 gets `a`, 22 gets `b`, plus 5 blank and 5 null; turnout is the
/// sum of all four.
pub fn presidential_artifact(key: SectionKey, serial: &str, a: i64, b: i64) -> Vec<u8> {
    let vote = |vote_type: i64, count: i64, party: Option<i64>| {
        let mut fields = vec![int(0, vote_type), int(1, count)];
        if let Some(number) = party {
            fields.push(cons(2, &[int(0, number), int(1, number)]));
        }
        seq(&fields)
    };
    let office = seq(&[
        cons(0, &[int(0, 1)]),
        int(1, 1),
        cons(
            2,
            &[
                vote(1, a, Some(13)),
                vote(1, b, Some(22)),
                vote(4, 5, None),
                vote(3, 5, None),
            ],
        ),
    ]);
    let voting = seq(&[int(0, 1), int(1, a + b + 10), cons(2, &[office])]);
    let election = seq(&[int(0, 544), int(1, a + b + 50), cons(2, &[voting])]);

    let mut ballot = common_fields(key, Some(serial));
    ballot.extend([
        text(4, "20221002T170000"),
        int(5, 0),
        int(6, a + b + 10),
        cons(7, &[election]),
    ]);
    let ballot = seq(&ballot);

    let mut envelope = common_fields(key, None);
    envelope.extend([int(4, 1), tlv(0x85, &ballot), text(6, "assinatura")]);
    seq(&envelope)
}
