//! BER writer and artifact fixtures for tests

use crate::types::SectionKey;

fn tag_octets(first: u8, number: u32) -> Vec<u8> {
    if number < 0x1f {
        return vec![first | number as u8];
    }

    let mut groups = Vec::new();
    let mut n = number;
    loop {
        groups.push((n & 0x7f) as u8);
        n >>= 7;
        if n == 0 {
            break;
        }
    }
    let mut out = vec![first | 0x1f];
    for (i, group) in groups.iter().enumerate().rev() {
        out.push(if i == 0 { *group } else { group | 0x80 });
    }
    out
}

pub(crate) fn length_octets(len: usize) -> Vec<u8> {
    if len < 0x80 {
        return vec![len as u8];
    }
    let bytes: Vec<u8> = len
        .to_be_bytes()
        .iter()
        .copied()
        .skip_while(|&b| b == 0)
        .collect();
    let mut out = vec![0x80 | bytes.len() as u8];
    out.extend(bytes);
    out
}

fn tlv(tag: Vec<u8>, content: &[u8]) -> Vec<u8> {
    let mut out = tag;
    out.extend(length_octets(content.len()));
    out.extend_from_slice(content);
    out
}

fn integer_octets(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < 7 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xff && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

/// Context-tagged primitive
pub(crate) fn ctx_prim(number: u32, content: &[u8]) -> Vec<u8> {
    tlv(tag_octets(0x80, number), content)
}

/// Context-tagged constructed value
pub(crate) fn ctx_cons(number: u32, children: &[Vec<u8>]) -> Vec<u8> {
    tlv(tag_octets(0xa0, number), &children.concat())
}

/// Universal SEQUENCE (also used for SEQUENCE OF items)
pub(crate) fn sequence(children: &[Vec<u8>]) -> Vec<u8> {
    tlv(vec![0x30], &children.concat())
}

pub(crate) fn ctx_int(number: u32, value: i64) -> Vec<u8> {
    ctx_prim(number, &integer_octets(value))
}

pub(crate) fn ctx_str(number: u32, value: &str) -> Vec<u8> {
    ctx_prim(number, value.as_bytes())
}

/// A vote total as (vote type code, count, optional (party, candidate))
pub(crate) type VoteSpec = (i64, i64, Option<(i64, i64)>);

/// One office: (office code choice, votes)
pub(crate) struct OfficeSpec {
    pub constitutional: Option<i64>,
    pub referendum: Option<i64>,
    pub votes: Vec<VoteSpec>,
}

impl OfficeSpec {
    pub fn office(code: i64, votes: Vec<VoteSpec>) -> Self {
        Self {
            constitutional: Some(code),
            referendum: None,
            votes,
        }
    }
}

/// (category code, turnout, offices)
pub(crate) type VotingSpec = (i64, i64, Vec<OfficeSpec>);

/// (election id, eligible voters, votings)
pub(crate) type ElectionSpec = (i64, i64, Vec<VotingSpec>);

fn header(election: i64) -> Vec<u8> {
    ctx_cons(
        0,
        &[
            ctx_str(0, "20221002T170509"),
            ctx_cons(1, &[ctx_int(2, election)]),
        ],
    )
}

fn machine_record(serial: Option<&str>) -> Vec<u8> {
    let mut fields = vec![ctx_int(0, 1), ctx_str(1, "8.26.0.0 - Onca-pintada")];
    if let Some(serial) = serial {
        fields.push(ctx_str(2, serial));
    }
    ctx_cons(2, &fields)
}

fn section_identification(number: u32, key: SectionKey) -> Vec<u8> {
    ctx_cons(
        number,
        &[
            ctx_cons(
                0,
                &[
                    ctx_int(0, i64::from(key.municipality)),
                    ctx_int(1, i64::from(key.zone)),
                ],
            ),
            ctx_int(1, 1015),
            ctx_int(2, i64::from(key.section)),
        ],
    )
}

fn vote_total((vote_type, count, votable): &VoteSpec) -> Vec<u8> {
    let mut fields = vec![ctx_int(0, *vote_type), ctx_int(1, *count)];
    if let Some((party, code)) = votable {
        fields.push(ctx_cons(2, &[ctx_int(0, *party), ctx_int(1, *code)]));
    }
    fields.push(ctx_prim(3, &[0xde, 0xad, 0xbe, 0xef]));
    sequence(&fields)
}

fn office_totals(office: &OfficeSpec, print_order: i64) -> Vec<u8> {
    let code = match (office.constitutional, office.referendum) {
        (Some(code), _) => ctx_int(0, code),
        (None, Some(number)) => ctx_int(1, number),
        (None, None) => ctx_int(0, 0),
    };
    let votes: Vec<Vec<u8>> = office.votes.iter().map(vote_total).collect();
    sequence(&[
        ctx_cons(0, &[code]),
        ctx_int(1, print_order),
        ctx_cons(2, &votes),
    ])
}

/// Encode an `EntidadeBoletimUrna`
pub(crate) fn ballot_bytes(key: SectionKey, serial: Option<&str>, elections: &[ElectionSpec]) -> Vec<u8> {
    let results: Vec<Vec<u8>> = elections
        .iter()
        .map(|(election_id, eligible, votings)| {
            let votings: Vec<Vec<u8>> = votings
                .iter()
                .map(|(category, turnout, offices)| {
                    let offices: Vec<Vec<u8>> = offices
                        .iter()
                        .enumerate()
                        .map(|(i, office)| office_totals(office, i as i64 + 1))
                        .collect();
                    sequence(&[
                        ctx_int(0, *category),
                        ctx_int(1, *turnout),
                        ctx_cons(2, &offices),
                    ])
                })
                .collect();
            sequence(&[
                ctx_int(0, *election_id),
                ctx_int(1, *eligible),
                ctx_cons(2, &votings),
            ])
        })
        .collect();

    sequence(&[
        header(546),
        ctx_int(1, 2),
        machine_record(serial),
        section_identification(3, key),
        ctx_str(4, "20221002T170000"),
        ctx_int(5, 3),
        ctx_int(6, 240),
        ctx_cons(7, &results),
    ])
}

/// Encode an `EntidadeEnvelopeGenerico` around `content`
pub(crate) fn envelope_bytes(key: SectionKey, kind: i64, content: &[u8]) -> Vec<u8> {
    sequence(&[
        header(546),
        ctx_int(1, 2),
        machine_record(None),
        section_identification(3, key),
        ctx_int(4, kind),
        ctx_prim(5, content),
        ctx_str(6, "assinatura-hw"),
    ])
}

/// Two elections, four offices: president (544) and governor, senator and
/// federal deputy (546). Every office's totals sum to its voting's turnout.
pub(crate) fn sample_elections() -> Vec<ElectionSpec> {
    vec![
        (
            544,
            300,
            vec![(
                1,
                250,
                vec![OfficeSpec::office(
                    1,
                    vec![
                        (1, 120, Some((13, 13))),
                        (1, 100, Some((22, 22))),
                        (4, 10, None),
                        (3, 20, None),
                    ],
                )],
            )],
        ),
        (
            546,
            300,
            vec![
                (
                    1,
                    250,
                    vec![
                        OfficeSpec::office(
                            3,
                            vec![
                                (1, 150, Some((22, 22))),
                                (1, 80, Some((13, 13))),
                                (4, 10, None),
                                (3, 10, None),
                            ],
                        ),
                        OfficeSpec::office(
                            5,
                            vec![(1, 200, Some((22, 222))), (4, 25, None), (3, 25, None)],
                        ),
                    ],
                ),
                (
                    2,
                    250,
                    vec![OfficeSpec::office(
                        6,
                        vec![
                            (1, 100, Some((22, 2222))),
                            (2, 50, Some((13, 13))),
                            (1, 60, Some((50, 5050))),
                            (4, 20, None),
                            (3, 20, None),
                        ],
                    )],
                ),
            ],
        ),
    ]
}

/// A complete, well-formed ballot bulletin artifact for `key`
pub(crate) fn sample_artifact(key: SectionKey) -> Vec<u8> {
    let ballot = ballot_bytes(key, Some("2148123"), &sample_elections());
    envelope_bytes(key, 1, &ballot)
}
