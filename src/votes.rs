//! Vote flattening and jurisdiction classification
//!
//! Turns a decoded ballot into one [`VoteRow`] per (election, office, vote
//! total) and one [`OfficeStats`] per (election, office category). Section
//! identification on every row comes from the ballot itself.

use crate::codec::{Ballot, VoteType};
use crate::domain::{JurisdictionDomain, OfficeCategory, OfficeCode};
use crate::error::IntegrityMismatch;
use crate::locator::NATIONAL_JURISDICTION;
use serde::Serialize;

/// One vote total, flattened
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VoteRow {
    /// Office the votes are for
    pub office: OfficeCode,
    /// Category of the office
    pub office_category: OfficeCategory,
    /// Party number, absent for blank and null totals
    pub candidate_party: Option<u32>,
    /// Candidate number, absent for blank and null totals
    pub candidate_code: Option<u32>,
    /// Kind of vote
    pub vote_type: VoteType,
    /// Number of votes
    pub vote_count: u64,
    /// False for blank and null votes
    pub is_valid: bool,
    /// Level the office is aggregated at
    pub jurisdiction_domain: JurisdictionDomain,
    /// `br` for national offices, the state code for state offices, the
    /// municipality id otherwise
    pub jurisdiction_local_code: String,
    /// Election id
    pub election_id: u32,
    /// Municipality reported by the ballot
    pub municipality_id: u32,
    /// Zone reported by the ballot
    pub zone_id: u32,
    /// Section reported by the ballot
    pub section_id: u32,
}

/// Turnout statistics of one office category in one election
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OfficeStats {
    /// Election id
    pub election_id: u32,
    /// Office category
    pub office_category: OfficeCategory,
    /// Voters eligible in the section
    pub eligible_voters: u32,
    /// Voters that showed up
    pub turnout: u32,
    /// State code of the requesting machine
    pub state: String,
    /// Municipality reported by the ballot
    pub municipality_id: u32,
    /// Zone reported by the ballot
    pub zone_id: u32,
    /// Section reported by the ballot
    pub section_id: u32,
}

/// Flattened ballot
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VoteTable {
    /// Vote rows
    pub rows: Vec<VoteRow>,
    /// Per-category statistics
    pub stats: Vec<OfficeStats>,
    /// Set when the ballot's section disagrees with the requesting machine
    pub mismatch: Option<IntegrityMismatch>,
}

impl VoteTable {
    /// Sum of vote counts for one office in one election
    pub fn office_total(&self, election_id: u32, office: OfficeCode) -> u64 {
        self.rows
            .iter()
            .filter(|r| r.election_id == election_id && r.office == office)
            .map(|r| r.vote_count)
            .sum()
    }
}

/// Flatten `ballot`, classifying state-level offices under `state`
///
/// `state` is the two-letter code of the state the ballot was requested for.
pub fn flatten_votes(ballot: &Ballot, state: &str) -> VoteTable {
    let location = &ballot.section;
    let mut rows = Vec::new();
    let mut stats = Vec::new();

    for election in &ballot.results {
        for voting in &election.votings {
            stats.push(OfficeStats {
                election_id: election.election_id,
                office_category: voting.category,
                eligible_voters: election.eligible_voters,
                turnout: voting.turnout,
                state: state.to_string(),
                municipality_id: location.municipality,
                zone_id: location.zone,
                section_id: location.section,
            });

            for office in &voting.offices {
                let domain = office.office.domain();
                let local_code = match domain {
                    JurisdictionDomain::Country => NATIONAL_JURISDICTION.to_string(),
                    JurisdictionDomain::State => state.to_string(),
                    JurisdictionDomain::Municipality => location.municipality.to_string(),
                };

                rows.extend(office.votes.iter().map(|vote| VoteRow {
                    office: office.office,
                    office_category: voting.category,
                    candidate_party: vote.votable.map(|v| v.party),
                    candidate_code: vote.votable.map(|v| v.code),
                    vote_type: vote.vote_type,
                    vote_count: u64::from(vote.count),
                    is_valid: vote.vote_type.is_valid(),
                    jurisdiction_domain: domain,
                    jurisdiction_local_code: local_code.clone(),
                    election_id: election.election_id,
                    municipality_id: location.municipality,
                    zone_id: location.zone,
                    section_id: location.section,
                }));
            }
        }
    }

    VoteTable {
        rows,
        stats,
        mismatch: None,
    }
}
