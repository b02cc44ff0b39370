//! Resource locator
//!
//! Pure mapping from entity identifiers to resource URLs on the results host.
//! Numeric identifiers are zero-padded to fixed widths: municipality to 5
//! digits, zone, section and office code to 4.
//!
//! The locator only checks what it can check locally (the national
//! jurisdiction on the listing endpoint, the office lookup table). Whether an
//! office is published for a given jurisdiction (e.g. state deputies in the
//! federal district, which elects district deputies instead) is only observable
//! through the host's response.

use crate::domain::{ElectionSection, Office};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Jurisdiction code of the national aggregate
pub const NATIONAL_JURISDICTION: &str = "br";

/// Per-machine artifacts published by the host
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Ballot bulletin (`.bu`)
    BallotBulletin,
    /// Printable ballot image (`.imgbu`)
    BallotImage,
    /// Digital vote record (`.rdv`)
    DigitalVoteRecord,
    /// Compressed machine log (`.logjez`)
    MachineLog,
}

impl ArtifactKind {
    /// File extension used by the host
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::BallotBulletin => "bu",
            ArtifactKind::BallotImage => "imgbu",
            ArtifactKind::DigitalVoteRecord => "rdv",
            ArtifactKind::MachineLog => "logjez",
        }
    }
}

/// Identifier tuple addressing one voting machine's resources
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MachineAddress {
    /// Election year
    pub year: u16,
    /// Contest id
    pub contest_id: u32,
    /// Lowercase state code
    pub jurisdiction: String,
    /// Municipality code
    pub municipality: u32,
    /// Zone number
    pub zone: u32,
    /// Section number
    pub section: u32,
}

impl MachineAddress {
    /// Address of the machine serving `section`
    pub fn from_section(section: &ElectionSection) -> Self {
        let key = section.key();
        Self {
            year: section.contest.year,
            contest_id: section.contest.contest_id,
            jurisdiction: section.state().code(),
            municipality: key.municipality,
            zone: key.zone,
            section: key.section,
        }
    }

    /// `{mun:05}/{zone:04}/{sec:04}` directory segment
    fn directory(&self) -> String {
        format!(
            "{:05}/{:04}/{:04}",
            self.municipality, self.zone, self.section
        )
    }
}

/// Builds resource URLs under a base URL
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Locator {
    base_url: String,
}

impl Locator {
    /// Create a locator rooted at `base_url` (trailing slashes are ignored)
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    /// Root of the results host
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Simplified results for one office in one jurisdiction
    ///
    /// e.g. `…/ele2022/546/dados-simplificados/rj/rj-c0005-e000546-r.json`
    pub fn results_url(
        &self,
        year: u16,
        election_id: u32,
        office: &str,
        jurisdiction: &str,
    ) -> Result<String> {
        let office = Office::from_results_name(office)?;
        let jurisdiction = jurisdiction.to_lowercase();

        Ok(format!(
            "{}/ele{}/{}/dados-simplificados/{j}/{j}-c{:04}-e{:06}-r.json",
            self.base_url,
            year,
            election_id,
            office.code(),
            election_id,
            j = jurisdiction
        ))
    }

    /// Listing of municipalities, zones and sections of one state
    ///
    /// e.g. `…/ele2022/arquivo-urna/406/config/rj/rj-p000406-cs.json`. The
    /// national aggregate has no listing and fails with
    /// [`Error::InvalidJurisdiction`].
    pub fn listing_url(&self, year: u16, contest_id: u32, jurisdiction: &str) -> Result<String> {
        let jurisdiction = jurisdiction.to_lowercase();
        if jurisdiction == NATIONAL_JURISDICTION {
            return Err(Error::InvalidJurisdiction(jurisdiction));
        }

        Ok(format!(
            "{}/ele{}/arquivo-urna/{}/config/{j}/{j}-p{:06}-cs.json",
            self.base_url,
            year,
            contest_id,
            contest_id,
            j = jurisdiction
        ))
    }

    /// Machine info document listing the current freshness hashes
    ///
    /// e.g. `…/arquivo-urna/406/dados/rj/58017/0116/0001/p000406-rj-m58017-z0116-s0001-aux.json`
    pub fn machine_info_url(&self, address: &MachineAddress) -> String {
        format!(
            "{}/ele{}/arquivo-urna/{}/dados/{j}/{}/p{:06}-{j}-m{:05}-z{:04}-s{:04}-aux.json",
            self.base_url,
            address.year,
            address.contest_id,
            address.directory(),
            address.contest_id,
            address.municipality,
            address.zone,
            address.section,
            j = address.jurisdiction
        )
    }

    /// Download URL of one artifact, namespaced under the freshness hash
    ///
    /// e.g. `…/dados/rj/60011/0004/0010/{hash}/o00406-6001100040010.bu`
    pub fn artifact_url(&self, address: &MachineAddress, hash: &str, kind: ArtifactKind) -> String {
        format!(
            "{}/ele{}/arquivo-urna/{}/dados/{}/{}/{}/o{:05}-{:05}{:04}{:04}.{}",
            self.base_url,
            address.year,
            address.contest_id,
            address.jurisdiction,
            address.directory(),
            hash,
            address.contest_id,
            address.municipality,
            address.zone,
            address.section,
            kind.extension()
        )
    }
}
