//! Records shared by the envelope and ballot schemas

use super::ber::{DecodeResult, Reader, TagId, Tlv};
use crate::error::DecodeError;
use crate::types::SectionKey;
use chrono::NaiveDateTime;
use serde::Serialize;

/// Format of schema date-time strings (`20221002T170509`)
const SCHEMA_DATETIME_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Which electoral entity a document belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElectoralId {
    /// Electoral process
    Process(u32),
    /// Contest
    Contest(u32),
    /// Election
    Election(u32),
}

/// Document header
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Header {
    /// When the document was generated
    pub generated_at: NaiveDateTime,
    /// Electoral entity identification
    pub electoral_id: ElectoralId,
}

/// Phase the machine was operating in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Simulation before election day
    Simulated,
    /// Official election
    Official,
    /// Training
    Training,
}

/// Role of the voting machine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineKind {
    /// Regular section machine
    Section,
    /// Contingency replacement
    Contingency,
    /// Section reserve
    SectionReserve,
    /// Reserve finishing a section
    ClosingReserve,
}

/// Voting machine record
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MachineRecord {
    /// Machine role
    pub kind: MachineKind,
    /// Voting software version
    pub software_version: String,
    /// Serial number, when reported
    pub serial: Option<String>,
}

/// Section identification embedded in a document
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SectionIdentification {
    /// Municipality code
    pub municipality: u32,
    /// Zone number
    pub zone: u32,
    /// Polling place number
    pub location: u32,
    /// Section number
    pub section: u32,
}

impl SectionIdentification {
    /// Composite section key
    pub fn key(&self) -> SectionKey {
        SectionKey::new(self.municipality, self.zone, self.section)
    }
}

pub(crate) fn datetime(tlv: &Tlv<'_>, field: &'static str) -> DecodeResult<NaiveDateTime> {
    let text = tlv.visible_string(field)?;
    NaiveDateTime::parse_from_str(&text, SCHEMA_DATETIME_FORMAT).map_err(|e| {
        DecodeError::InvalidValue {
            field,
            reason: format!("'{}' at offset {}: {}", text, tlv.offset, e),
        }
    })
}

fn invalid_enum(tlv: &Tlv<'_>, field: &'static str, value: i64) -> DecodeError {
    DecodeError::InvalidValue {
        field,
        reason: format!("unknown enumeration value {} at offset {}", value, tlv.offset),
    }
}

pub(crate) fn header(tlv: &Tlv<'_>) -> DecodeResult<Header> {
    let mut fields = tlv.children("cabecalho")?;
    let generated_at = datetime(
        &fields.expect(TagId::context(0), "cabecalho.dataGeracao")?,
        "cabecalho.dataGeracao",
    )?;

    let id_wrapper = fields.expect(TagId::context(1), "cabecalho.idEleitoral")?;
    let mut choice = id_wrapper.children("cabecalho.idEleitoral")?;
    let alternative = choice.read_tlv()?;
    let field = "cabecalho.idEleitoral";
    let electoral_id = match alternative.tag.id {
        id if id == TagId::context(0) => ElectoralId::Process(alternative.u32(field)?),
        id if id == TagId::context(1) => ElectoralId::Contest(alternative.u32(field)?),
        id if id == TagId::context(2) => ElectoralId::Election(alternative.u32(field)?),
        other => {
            return Err(DecodeError::UnexpectedTag {
                offset: alternative.offset,
                field,
                expected: "[0], [1] or [2]".to_string(),
                found: other.to_string(),
            });
        }
    };
    choice.skip_extensions(field)?;
    fields.skip_extensions("cabecalho")?;

    Ok(Header {
        generated_at,
        electoral_id,
    })
}

pub(crate) fn phase(tlv: &Tlv<'_>, field: &'static str) -> DecodeResult<Phase> {
    match tlv.integer(field)? {
        1 => Ok(Phase::Simulated),
        2 => Ok(Phase::Official),
        3 => Ok(Phase::Training),
        other => Err(invalid_enum(tlv, field, other)),
    }
}

pub(crate) fn machine_record(tlv: &Tlv<'_>) -> DecodeResult<MachineRecord> {
    let mut fields = tlv.children("urna")?;

    let kind_tlv = fields.expect(TagId::context(0), "urna.tipoUrna")?;
    let kind = match kind_tlv.integer("urna.tipoUrna")? {
        1 => MachineKind::Section,
        3 => MachineKind::Contingency,
        4 => MachineKind::SectionReserve,
        6 => MachineKind::ClosingReserve,
        other => return Err(invalid_enum(&kind_tlv, "urna.tipoUrna", other)),
    };
    let software_version = fields
        .expect(TagId::context(1), "urna.versaoVotacao")?
        .visible_string("urna.versaoVotacao")?;
    let serial = fields
        .optional(TagId::context(2))?
        .map(|t| t.visible_string("urna.numeroSerie"))
        .transpose()?;
    fields.skip_extensions("urna")?;

    Ok(MachineRecord {
        kind,
        software_version,
        serial,
    })
}

pub(crate) fn section_identification(tlv: &Tlv<'_>) -> DecodeResult<SectionIdentification> {
    let mut fields = tlv.children("identificacaoSecao")?;

    let place = fields.expect(TagId::context(0), "identificacaoSecao.municipioZona")?;
    let mut place_fields = place.children("identificacaoSecao.municipioZona")?;
    let municipality = place_fields
        .expect(TagId::context(0), "municipioZona.municipio")?
        .u32("municipioZona.municipio")?;
    let zone = place_fields
        .expect(TagId::context(1), "municipioZona.zona")?
        .u32("municipioZona.zona")?;
    place_fields.skip_extensions("identificacaoSecao.municipioZona")?;

    let location = fields
        .expect(TagId::context(1), "identificacaoSecao.local")?
        .u32("identificacaoSecao.local")?;
    let section = fields
        .expect(TagId::context(2), "identificacaoSecao.secao")?
        .u32("identificacaoSecao.secao")?;
    fields.skip_extensions("identificacaoSecao")?;

    Ok(SectionIdentification {
        municipality,
        zone,
        location,
        section,
    })
}

/// Read the single top-level SEQUENCE of a buffer, rejecting trailing bytes
pub(crate) fn top_level<'a>(
    reader: &mut Reader<'a>,
    field: &'static str,
) -> DecodeResult<Reader<'a>> {
    let tlv = reader.expect(TagId::SEQUENCE, field)?;
    if !reader.is_empty() {
        return Err(DecodeError::TrailingData {
            field,
            count: reader.remaining(),
        });
    }
    tlv.children(field)
}
