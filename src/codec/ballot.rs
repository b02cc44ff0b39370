//! Ballot bulletin (`EntidadeBoletimUrna`)

use super::ber::{DecodeResult, Reader, TagId, Tlv};
use super::common::{self, Header, MachineRecord, Phase, SectionIdentification};
use crate::domain::{Office, OfficeCategory, OfficeCode};
use crate::error::DecodeError;
use chrono::NaiveDateTime;
use serde::Serialize;

/// Kind of a vote total
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteType {
    /// Vote for a candidate
    Nominal,
    /// Vote for a party label only
    Party,
    /// Null vote
    Null,
    /// Blank vote
    Blank,
    /// Annulled vote
    Annulled,
    /// Annulled, tallied separately
    AnnulledSeparately,
}

impl VoteType {
    fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(VoteType::Nominal),
            2 => Some(VoteType::Party),
            3 => Some(VoteType::Null),
            4 => Some(VoteType::Blank),
            5 => Some(VoteType::Annulled),
            6 => Some(VoteType::AnnulledSeparately),
            _ => None,
        }
    }

    /// Blank and null votes are not valid votes
    pub fn is_valid(self) -> bool {
        !matches!(self, VoteType::Blank | VoteType::Null)
    }
}

/// Who a vote total was cast for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct VotableId {
    /// Party number
    pub party: u32,
    /// Candidate number (the party number for label votes)
    pub code: u32,
}

/// One vote total within an office
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VotableTotal {
    /// Kind of vote
    pub vote_type: VoteType,
    /// Number of votes
    pub count: u32,
    /// Candidate or party, absent for blank and null totals
    pub votable: Option<VotableId>,
    /// Per-total signature
    #[serde(skip)]
    pub signature: Option<Vec<u8>>,
}

/// Vote totals of one office
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OfficeTotals {
    /// Office the votes are for
    pub office: OfficeCode,
    /// Position on the printed bulletin
    pub print_order: u32,
    /// Vote totals
    pub votes: Vec<VotableTotal>,
}

/// Results of one office category within an election
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VotingResult {
    /// Office category
    pub category: OfficeCategory,
    /// Voters that showed up
    pub turnout: u32,
    /// Per-office totals
    pub offices: Vec<OfficeTotals>,
}

/// Results of one election on this machine
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ElectionResult {
    /// Election id
    pub election_id: u32,
    /// Voters eligible in the section
    pub eligible_voters: u32,
    /// Per-category results
    pub votings: Vec<VotingResult>,
}

/// A decoded ballot bulletin
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Ballot {
    /// Document header
    pub header: Header,
    /// Operating phase
    pub phase: Phase,
    /// Machine that produced the bulletin
    pub machine: MachineRecord,
    /// Section identification
    pub section: SectionIdentification,
    /// When the bulletin was issued
    pub issued_at: NaiveDateTime,
    /// Voters released by code (no biometric match)
    pub voters_released_by_code: u32,
    /// Voters identified biometrically
    pub voters_biometric: u32,
    /// Per-election results
    pub results: Vec<ElectionResult>,
}

/// Decode a ballot whose first byte sits at absolute `base` in the artifact
pub(crate) fn decode_ballot(bytes: &[u8], base: usize) -> DecodeResult<Ballot> {
    let mut reader = Reader::with_base(bytes, base);
    let mut fields = common::top_level(&mut reader, "EntidadeBoletimUrna")?;

    let header = common::header(&fields.expect(TagId::context(0), "boletim.cabecalho")?)?;
    let phase = common::phase(
        &fields.expect(TagId::context(1), "boletim.fase")?,
        "boletim.fase",
    )?;
    let machine = common::machine_record(&fields.expect(TagId::context(2), "boletim.urna")?)?;
    let section = common::section_identification(
        &fields.expect(TagId::context(3), "boletim.identificacaoSecao")?,
    )?;
    let issued_at = common::datetime(
        &fields.expect(TagId::context(4), "boletim.dataHoraEmissao")?,
        "boletim.dataHoraEmissao",
    )?;
    let voters_released_by_code = fields
        .expect(TagId::context(5), "boletim.qtdEleitoresLibCodigo")?
        .u32("boletim.qtdEleitoresLibCodigo")?;
    let voters_biometric = fields
        .expect(TagId::context(6), "boletim.qtdEleitoresCompBiometrico")?
        .u32("boletim.qtdEleitoresCompBiometrico")?;

    let results_tlv = fields.expect(TagId::context(7), "boletim.resultadosVotacaoPorEleicao")?;
    let results = sequence_of(
        &results_tlv,
        "boletim.resultadosVotacaoPorEleicao",
        election_result,
    )?;
    fields.skip_extensions("EntidadeBoletimUrna")?;

    Ok(Ballot {
        header,
        phase,
        machine,
        section,
        issued_at,
        voters_released_by_code,
        voters_biometric,
        results,
    })
}

/// Decode every SEQUENCE item of a SEQUENCE OF
fn sequence_of<'a, T>(
    tlv: &Tlv<'a>,
    field: &'static str,
    item: impl Fn(&Tlv<'a>) -> DecodeResult<T>,
) -> DecodeResult<Vec<T>> {
    let mut items = tlv.children(field)?;
    let mut out = Vec::new();
    while !items.is_empty() {
        out.push(item(&items.expect(TagId::SEQUENCE, field)?)?);
    }
    Ok(out)
}

fn election_result(tlv: &Tlv<'_>) -> DecodeResult<ElectionResult> {
    let mut fields = tlv.children("ResultadoVotacaoPorEleicao")?;

    let election_id = fields
        .expect(TagId::context(0), "ResultadoVotacaoPorEleicao.idEleicao")?
        .u32("ResultadoVotacaoPorEleicao.idEleicao")?;
    let eligible_voters = fields
        .expect(TagId::context(1), "ResultadoVotacaoPorEleicao.qtdEleitoresAptos")?
        .u32("ResultadoVotacaoPorEleicao.qtdEleitoresAptos")?;
    let votings = sequence_of(
        &fields.expect(TagId::context(2), "ResultadoVotacaoPorEleicao.resultadosVotacao")?,
        "ResultadoVotacaoPorEleicao.resultadosVotacao",
        voting_result,
    )?;
    fields.skip_extensions("ResultadoVotacaoPorEleicao")?;

    Ok(ElectionResult {
        election_id,
        eligible_voters,
        votings,
    })
}

fn voting_result(tlv: &Tlv<'_>) -> DecodeResult<VotingResult> {
    let mut fields = tlv.children("ResultadoVotacao")?;

    let category_tlv = fields.expect(TagId::context(0), "ResultadoVotacao.tipoCargo")?;
    let category_code = category_tlv.integer("ResultadoVotacao.tipoCargo")?;
    let category =
        OfficeCategory::from_code(category_code).ok_or_else(|| DecodeError::InvalidValue {
            field: "ResultadoVotacao.tipoCargo",
            reason: format!(
                "unknown enumeration value {} at offset {}",
                category_code, category_tlv.offset
            ),
        })?;
    let turnout = fields
        .expect(TagId::context(1), "ResultadoVotacao.qtdComparecimento")?
        .u32("ResultadoVotacao.qtdComparecimento")?;
    let offices = sequence_of(
        &fields.expect(TagId::context(2), "ResultadoVotacao.totaisVotosCargo")?,
        "ResultadoVotacao.totaisVotosCargo",
        office_totals,
    )?;
    fields.skip_extensions("ResultadoVotacao")?;

    Ok(VotingResult {
        category,
        turnout,
        offices,
    })
}

fn office_code(tlv: &Tlv<'_>) -> DecodeResult<OfficeCode> {
    let field = "TotalVotosCargo.codigoCargo";
    let mut choice = tlv.children(field)?;
    let alternative = choice.read_tlv()?;
    choice.skip_extensions(field)?;

    if alternative.tag.id == TagId::context(0) {
        let code = alternative.integer(field)?;
        let office = Office::from_code(code).ok_or_else(|| DecodeError::InvalidValue {
            field,
            reason: format!(
                "unknown office code {} at offset {}",
                code, alternative.offset
            ),
        })?;
        Ok(OfficeCode::Constitutional(office))
    } else if alternative.tag.id == TagId::context(1) {
        Ok(OfficeCode::Referendum(alternative.u32(field)?))
    } else {
        Err(DecodeError::UnexpectedTag {
            offset: alternative.offset,
            field,
            expected: "[0] or [1]".to_string(),
            found: alternative.tag.id.to_string(),
        })
    }
}

fn office_totals(tlv: &Tlv<'_>) -> DecodeResult<OfficeTotals> {
    let mut fields = tlv.children("TotalVotosCargo")?;

    let office = office_code(&fields.expect(TagId::context(0), "TotalVotosCargo.codigoCargo")?)?;
    let print_order = fields
        .expect(TagId::context(1), "TotalVotosCargo.ordemImpressao")?
        .u32("TotalVotosCargo.ordemImpressao")?;
    let votes = sequence_of(
        &fields.expect(TagId::context(2), "TotalVotosCargo.votosVotaveis")?,
        "TotalVotosCargo.votosVotaveis",
        votable_total,
    )?;
    fields.skip_extensions("TotalVotosCargo")?;

    Ok(OfficeTotals {
        office,
        print_order,
        votes,
    })
}

fn votable_total(tlv: &Tlv<'_>) -> DecodeResult<VotableTotal> {
    let mut fields = tlv.children("TotalVotosVotavel")?;

    let type_tlv = fields.expect(TagId::context(0), "TotalVotosVotavel.tipoVoto")?;
    let type_code = type_tlv.integer("TotalVotosVotavel.tipoVoto")?;
    let vote_type = VoteType::from_code(type_code).ok_or_else(|| DecodeError::InvalidValue {
        field: "TotalVotosVotavel.tipoVoto",
        reason: format!(
            "unknown enumeration value {} at offset {}",
            type_code, type_tlv.offset
        ),
    })?;
    let count = fields
        .expect(TagId::context(1), "TotalVotosVotavel.quantidadeVotos")?
        .u32("TotalVotosVotavel.quantidadeVotos")?;

    let votable = match fields.optional(TagId::context(2))? {
        Some(id) => {
            let mut id_fields = id.children("TotalVotosVotavel.identificacaoVotavel")?;
            let party = id_fields
                .expect(TagId::context(0), "identificacaoVotavel.partido")?
                .u32("identificacaoVotavel.partido")?;
            let code = id_fields
                .expect(TagId::context(1), "identificacaoVotavel.codigo")?
                .u32("identificacaoVotavel.codigo")?;
            id_fields.skip_extensions("TotalVotosVotavel.identificacaoVotavel")?;
            Some(VotableId { party, code })
        }
        None => None,
    };

    let signature = fields
        .optional(TagId::context(3))?
        .map(|t| t.octets("TotalVotosVotavel.assinatura").map(<[u8]>::to_vec))
        .transpose()?;
    fields.skip_extensions("TotalVotosVotavel")?;

    Ok(VotableTotal {
        vote_type,
        count,
        votable,
        signature,
    })
}
