//! Outer envelope (`EntidadeEnvelopeGenerico`)

use super::ber::{DecodeResult, Reader, TagId};
use super::common::{self, Header, MachineRecord, Phase, SectionIdentification};
use crate::error::DecodeError;
use crate::locator::ArtifactKind;
use serde::Serialize;

/// Envelope metadata, without the wrapped content
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EnvelopeMetadata {
    /// Document header
    pub header: Header,
    /// Operating phase
    pub phase: Phase,
    /// Machine that produced the envelope
    pub machine: MachineRecord,
    /// Section identification
    pub section: SectionIdentification,
    /// Kind of artifact wrapped
    pub kind: ArtifactKind,
    /// Signer identification, when present
    pub signer: Option<String>,
}

pub(crate) struct Envelope<'a> {
    pub metadata: EnvelopeMetadata,
    pub content: &'a [u8],
    /// Absolute offset of `content` in the envelope buffer
    pub content_offset: usize,
}

fn artifact_kind(value: i64) -> Option<ArtifactKind> {
    match value {
        1 => Some(ArtifactKind::BallotBulletin),
        2 => Some(ArtifactKind::BallotImage),
        3 => Some(ArtifactKind::DigitalVoteRecord),
        4 => Some(ArtifactKind::MachineLog),
        _ => None,
    }
}

pub(crate) fn decode_envelope(bytes: &[u8]) -> DecodeResult<Envelope<'_>> {
    let mut reader = Reader::new(bytes);
    let mut fields = common::top_level(&mut reader, "EntidadeEnvelopeGenerico")?;

    let header = common::header(&fields.expect(TagId::context(0), "envelope.cabecalho")?)?;
    let phase = common::phase(
        &fields.expect(TagId::context(1), "envelope.fase")?,
        "envelope.fase",
    )?;
    let machine = common::machine_record(&fields.expect(TagId::context(2), "envelope.urna")?)?;
    let section = common::section_identification(
        &fields.expect(TagId::context(3), "envelope.identificacao")?,
    )?;

    let kind_tlv = fields.expect(TagId::context(4), "envelope.tipoEnvelope")?;
    let kind_value = kind_tlv.integer("envelope.tipoEnvelope")?;
    let kind = artifact_kind(kind_value).ok_or_else(|| DecodeError::InvalidValue {
        field: "envelope.tipoEnvelope",
        reason: format!(
            "unknown enumeration value {} at offset {}",
            kind_value, kind_tlv.offset
        ),
    })?;

    let content_tlv = fields.expect(TagId::context(5), "envelope.conteudo")?;
    let content = content_tlv.octets("envelope.conteudo")?;

    let signer = fields
        .optional(TagId::context(6))?
        .map(|t| t.visible_string("envelope.assinante"))
        .transpose()?;
    fields.skip_extensions("EntidadeEnvelopeGenerico")?;

    Ok(Envelope {
        metadata: EnvelopeMetadata {
            header,
            phase,
            machine,
            section,
            kind,
            signer,
        },
        content,
        content_offset: content_tlv.content_offset,
    })
}
