//! Offices, office categories and jurisdictional domains

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Constitutional offices, numbered with the authority's office codes
///
/// The numeric code is shared by the simplified-results resource paths
/// (`c0005` for senator) and the ballot schema's office enumeration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Office {
    /// Presidente
    #[serde(rename = "presidente")]
    President = 1,
    /// Vice-presidente
    #[serde(rename = "vicePresidente")]
    VicePresident = 2,
    /// Governador
    #[serde(rename = "governador")]
    Governor = 3,
    /// Vice-governador
    #[serde(rename = "viceGovernador")]
    ViceGovernor = 4,
    /// Senador
    #[serde(rename = "senador")]
    Senator = 5,
    /// Deputado federal
    #[serde(rename = "deputadoFederal")]
    FederalDeputy = 6,
    /// Deputado estadual
    #[serde(rename = "deputadoEstadual")]
    StateDeputy = 7,
    /// Deputado distrital (federal district only)
    #[serde(rename = "deputadoDistrital")]
    DistrictDeputy = 8,
    /// Primeiro suplente de senador
    #[serde(rename = "primeiroSuplenteSenador")]
    FirstAlternateSenator = 9,
    /// Segundo suplente de senador
    #[serde(rename = "segundoSuplenteSenador")]
    SecondAlternateSenator = 10,
    /// Prefeito
    #[serde(rename = "prefeito")]
    Mayor = 11,
    /// Vice-prefeito
    #[serde(rename = "vicePrefeito")]
    ViceMayor = 12,
    /// Vereador
    #[serde(rename = "vereador")]
    Councillor = 13,
}

/// Offices published by the simplified-results endpoint, by lookup name
const RESULTS_OFFICES: &[(&str, Office)] = &[
    ("presidente", Office::President),
    ("governador", Office::Governor),
    ("senador", Office::Senator),
    ("deputado federal", Office::FederalDeputy),
    ("deputado estadual", Office::StateDeputy),
    ("deputado distrital", Office::DistrictDeputy),
];

impl Office {
    /// Authority office code
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Office for an authority office code
    pub fn from_code(code: i64) -> Option<Self> {
        let office = match code {
            1 => Office::President,
            2 => Office::VicePresident,
            3 => Office::Governor,
            4 => Office::ViceGovernor,
            5 => Office::Senator,
            6 => Office::FederalDeputy,
            7 => Office::StateDeputy,
            8 => Office::DistrictDeputy,
            9 => Office::FirstAlternateSenator,
            10 => Office::SecondAlternateSenator,
            11 => Office::Mayor,
            12 => Office::ViceMayor,
            13 => Office::Councillor,
            _ => return None,
        };
        Some(office)
    }

    /// Resolve a simplified-results office name (case-insensitive)
    ///
    /// Only the offices the results endpoint publishes are accepted; anything
    /// else fails with [`Error::UnknownOffice`].
    pub fn from_results_name(name: &str) -> Result<Self> {
        let wanted = name.trim().to_lowercase();
        RESULTS_OFFICES
            .iter()
            .find(|(candidate, _)| *candidate == wanted)
            .map(|(_, office)| *office)
            .ok_or_else(|| Error::UnknownOffice(name.to_string()))
    }

    /// Authority schema name (e.g. "deputadoFederal")
    pub fn name(self) -> &'static str {
        match self {
            Office::President => "presidente",
            Office::VicePresident => "vicePresidente",
            Office::Governor => "governador",
            Office::ViceGovernor => "viceGovernador",
            Office::Senator => "senador",
            Office::FederalDeputy => "deputadoFederal",
            Office::StateDeputy => "deputadoEstadual",
            Office::DistrictDeputy => "deputadoDistrital",
            Office::FirstAlternateSenator => "primeiroSuplenteSenador",
            Office::SecondAlternateSenator => "segundoSuplenteSenador",
            Office::Mayor => "prefeito",
            Office::ViceMayor => "vicePrefeito",
            Office::Councillor => "vereador",
        }
    }

    /// Level at which votes for this office are aggregated
    ///
    /// President is national; senators and every deputy office are per state;
    /// all remaining offices are classified at municipality level.
    pub fn domain(self) -> JurisdictionDomain {
        match self {
            Office::President => JurisdictionDomain::Country,
            Office::Senator
            | Office::FederalDeputy
            | Office::StateDeputy
            | Office::DistrictDeputy => JurisdictionDomain::State,
            _ => JurisdictionDomain::Municipality,
        }
    }
}

impl std::fmt::Display for Office {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Office identification as carried by a ballot: a constitutional office or a
/// free-form referendum question number
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfficeCode {
    /// Constitutional office
    Constitutional(Office),
    /// Referendum question number
    Referendum(u32),
}

impl OfficeCode {
    /// Aggregation level of the votes for this office
    pub fn domain(&self) -> JurisdictionDomain {
        match self {
            OfficeCode::Constitutional(office) => office.domain(),
            OfficeCode::Referendum(_) => JurisdictionDomain::Municipality,
        }
    }
}

impl std::fmt::Display for OfficeCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OfficeCode::Constitutional(office) => write!(f, "{}", office),
            OfficeCode::Referendum(number) => write!(f, "consulta{}", number),
        }
    }
}

/// Office category (majoritarian, proportional or referendum)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfficeCategory {
    /// Majoritarian offices (president, governor, senator, mayor)
    Majoritarian = 1,
    /// Proportional offices (deputies, councillors)
    Proportional = 2,
    /// Referendum questions
    Referendum = 3,
}

impl OfficeCategory {
    /// Category for its schema enumeration value
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(OfficeCategory::Majoritarian),
            2 => Some(OfficeCategory::Proportional),
            3 => Some(OfficeCategory::Referendum),
            _ => None,
        }
    }
}

/// Level at which a given office's votes are aggregated
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JurisdictionDomain {
    /// Whole country
    Country,
    /// One state
    State,
    /// One municipality
    Municipality,
}
