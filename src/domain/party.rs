//! Parties, federations and candidates

use super::{City, Country, Office, State};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A federation of parties running together
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PartyFederation {
    /// Federation name
    pub name: String,
}

impl std::fmt::Display for PartyFederation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// A political party
///
/// Identity is the party number alone: two records with the same number and
/// different names are the same party, which is what deduplication across
/// sources relies on.
#[derive(Clone, Debug)]
pub struct Party {
    /// Party number
    pub number: u16,
    /// Party name
    pub name: String,
    /// Federation the party belongs to, if any
    pub federation: Option<Arc<PartyFederation>>,
}

impl Party {
    /// Create a party without federation
    pub fn new(number: u16, name: impl Into<String>) -> Self {
        Self {
            number,
            name: name.into(),
            federation: None,
        }
    }

    /// Attach the party to a federation
    pub fn with_federation(mut self, federation: Arc<PartyFederation>) -> Self {
        self.federation = Some(federation);
        self
    }
}

impl PartialEq for Party {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number
    }
}

impl Eq for Party {}

impl Hash for Party {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.number.hash(state);
    }
}

impl std::fmt::Display for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.number)?;
        if let Some(federation) = &self.federation {
            write!(f, " ({})", federation)?;
        }
        Ok(())
    }
}

/// Jurisdiction a candidate runs in
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CandidateDomain {
    /// Nationwide office
    Country(Arc<Country>),
    /// Statewide office
    State(Arc<State>),
    /// Municipal office
    City(Arc<City>),
}

/// A candidate for an office
///
/// Equality covers office, number, domain and party; the name is descriptive.
#[derive(Clone, Debug)]
pub struct Candidate {
    /// Office being disputed
    pub job: Office,
    /// Ballot number
    pub number: u32,
    /// Jurisdiction of the candidacy
    pub domain: CandidateDomain,
    /// Party the candidate runs for
    pub party: Arc<Party>,
    /// Candidate name
    pub name: String,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.job == other.job
            && self.number == other.number
            && self.domain == other.domain
            && self.party == other.party
    }
}

impl Eq for Candidate {}

impl Hash for Candidate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.job.hash(state);
        self.number.hash(state);
        self.domain.hash(state);
        self.party.hash(state);
    }
}

impl std::fmt::Display for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let domain = match &self.domain {
            CandidateDomain::Country(_) => String::new(),
            CandidateDomain::State(state) => format!("/{}", state.abbr),
            CandidateDomain::City(city) => format!("/{}", city.name),
        };
        write!(
            f,
            "{} - {}{} #{} ({})",
            self.name, self.job, domain, self.number, self.party.name
        )
    }
}

/// Votes attributed to one candidate
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteCount {
    /// The candidate
    pub candidate: Candidate,
    /// Number of votes
    pub votes: u64,
}

/// Count occurrences of each candidate, in order of first appearance
pub fn total_votes(candidates: &[Candidate]) -> Vec<VoteCount> {
    let mut index: HashMap<&Candidate, usize> = HashMap::new();
    let mut counts: Vec<VoteCount> = Vec::new();

    for candidate in candidates {
        match index.get(candidate) {
            Some(&position) => counts[position].votes += 1,
            None => {
                index.insert(candidate, counts.len());
                counts.push(VoteCount {
                    candidate: candidate.clone(),
                    votes: 1,
                });
            }
        }
    }

    counts
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_party_equality_by_number() {
        let psol_rede = Arc::new(PartyFederation {
            name: "PSOL REDE".to_string(),
        });
        let psol = Party::new(50, "PSOL").with_federation(psol_rede);
        let pl = Party::new(22, "PL");
        let pl_fake = Party::new(22, "PL2");

        assert_eq!(psol.name, "PSOL");
        assert_eq!(psol.number, 50);
        assert_eq!(pl, pl_fake);
        assert_ne!(pl, psol);
        assert_eq!(Party::new(50, "A"), Party::new(50, "B"));
        assert_ne!(Party::new(50, "A"), Party::new(22, "A"));
        assert_eq!(psol.to_string(), "PSOL (50) (PSOL REDE)");
    }

    fn candidate(number: u32, name: &str, state: &Arc<State>) -> Candidate {
        Candidate {
            job: Office::Governor,
            number,
            domain: CandidateDomain::State(Arc::clone(state)),
            party: Arc::new(Party::new(22, "PL")),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_candidate_equality_excludes_name() {
        let rj = Arc::new(State::new("Rio de Janeiro", "RJ", None));
        assert_eq!(candidate(22, "Fulano", &rj), candidate(22, "Beltrano", &rj));
        assert_ne!(candidate(22, "Fulano", &rj), candidate(23, "Fulano", &rj));
        assert_eq!(
            candidate(22, "Fulano", &rj).to_string(),
            "Fulano - governador/RJ #22 (PL)"
        );
    }

    #[test]
    fn test_total_votes_groups_by_identity() {
        let rj = Arc::new(State::new("Rio de Janeiro", "RJ", None));
        let ballots = vec![
            candidate(22, "Fulano", &rj),
            candidate(13, "Ciclano", &rj),
            candidate(22, "Fulano de Tal", &rj),
        ];

        let totals = total_votes(&ballots);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].candidate.number, 22);
        assert_eq!(totals[0].votes, 2);
        assert_eq!(totals[1].votes, 1);
    }
}
