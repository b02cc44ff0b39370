//! Envelope/ballot decoder
//!
//! Artifacts are BER-encoded in two layers. The outer envelope carries
//! signing and identification metadata plus an opaque `conteudo` octet
//! string; that string is itself a BER-encoded ballot bulletin.
//!
//! Decoding is all-or-nothing: any malformed tag, truncated value or schema
//! mismatch fails with [`DecodeError`] and no partially populated record is
//! returned. Fields the schema marks optional decode to `None`; nothing else
//! is ever defaulted.
//!
//! The layout follows the `EntidadeEnvelopeGenerico` and `EntidadeBoletimUrna`
//! entities of the 2022 general elections (contest 406). Context tags are
//! numbered in field order; later fields of an extensible entity are skipped.

mod ballot;
mod ber;
mod common;
mod envelope;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use ballot::{
    Ballot, ElectionResult, OfficeTotals, VotableId, VotableTotal, VoteType, VotingResult,
};
pub use common::{ElectoralId, Header, MachineKind, MachineRecord, Phase, SectionIdentification};
pub use envelope::EnvelopeMetadata;

use crate::error::DecodeError;
use crate::locator::ArtifactKind;
use std::path::Path;

/// Decode a ballot bulletin artifact
///
/// Returns the envelope metadata (without its content) and the ballot
/// decoded from that content.
pub fn decode_artifact(bytes: &[u8]) -> Result<(EnvelopeMetadata, Ballot), DecodeError> {
    let envelope = envelope::decode_envelope(bytes)?;
    if envelope.metadata.kind != ArtifactKind::BallotBulletin {
        return Err(DecodeError::InvalidValue {
            field: "envelope.tipoEnvelope",
            reason: format!(
                "expected a ballot bulletin envelope, found {:?}",
                envelope.metadata.kind
            ),
        });
    }

    let ballot = ballot::decode_ballot(envelope.content, envelope.content_offset)?;
    Ok((envelope.metadata, ballot))
}

/// Read and decode a ballot bulletin artifact from disk
pub async fn decode_artifact_file(path: &Path) -> Result<(EnvelopeMetadata, Ballot), DecodeError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| DecodeError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let decoded = decode_artifact(&bytes)?;
    tracing::debug!(
        path = %path.display(),
        bytes = bytes.len(),
        elections = decoded.1.results.len(),
        "decoded artifact"
    );
    Ok(decoded)
}
