//! Election identity model
//!
//! Immutable value entities forming the containment chain
//! `State → City → ElectionZone → ElectionSection`. Children hold shared
//! references to their parents; parents never own their children, so the
//! chain cannot form reference cycles and the entities live as long as any
//! voting machine still points into them.
//!
//! Equality follows the authority's identity rules: names and back-references
//! are descriptive and do not take part in comparisons.

mod office;
mod party;

pub use office::{JurisdictionDomain, Office, OfficeCategory, OfficeCode};
pub use party::{Candidate, CandidateDomain, Party, PartyFederation, VoteCount, total_votes};

use crate::types::SectionKey;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// An election cycle instance (e.g. the 2022 general elections, contest 406)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Contest {
    /// Election year
    pub year: u16,
    /// Authority-assigned contest id
    pub contest_id: u32,
}

impl Contest {
    /// Create a new Contest
    pub fn new(year: u16, contest_id: u32) -> Self {
        Self { year, contest_id }
    }
}

/// A specific ballot type within a contest
///
/// For example, "offices other than president, round 1" is election 546 of
/// contest 406.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Election {
    /// Authority-assigned election id
    pub id: u32,
    /// Contest the election belongs to
    pub contest: Contest,
}

impl Election {
    /// Create a new Election
    pub fn new(id: u32, contest: Contest) -> Self {
        Self { id, contest }
    }
}

/// Country (display only)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Country {
    /// Country name
    pub name: String,
}

/// Geographic region grouping states (display only)
#[derive(Clone, Debug)]
pub struct Region {
    /// Region name
    pub name: String,
    /// Short code
    pub abbr: String,
    /// Enclosing country
    pub country: Arc<Country>,
}

impl PartialEq for Region {
    fn eq(&self, other: &Self) -> bool {
        self.abbr == other.abbr && self.country == other.country
    }
}

impl Eq for Region {}

/// A federative unit, identified by its two-letter code
#[derive(Clone, Debug)]
pub struct State {
    /// State name
    pub name: String,
    /// Two-letter code as published (e.g. "RJ")
    pub abbr: String,
    /// Enclosing region; absent for pseudo-states such as voters abroad ("ZZ")
    pub region: Option<Arc<Region>>,
}

impl State {
    /// Create a new State
    pub fn new(
        name: impl Into<String>,
        abbr: impl Into<String>,
        region: Option<Arc<Region>>,
    ) -> Self {
        Self {
            name: name.into(),
            abbr: abbr.into(),
            region,
        }
    }

    /// Lowercase jurisdiction code used in resource paths
    pub fn code(&self) -> String {
        self.abbr.to_lowercase()
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.abbr.eq_ignore_ascii_case(&other.abbr)
    }
}

impl Eq for State {}

impl Hash for State {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.abbr.to_ascii_uppercase().hash(state);
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.abbr)
    }
}

/// A municipality, identified by its authority code
#[derive(Clone, Debug)]
pub struct City {
    /// Authority municipality code
    pub id: u32,
    /// Municipality name
    pub name: String,
    /// Enclosing state
    pub state: Arc<State>,
}

impl PartialEq for City {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for City {}

impl Hash for City {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for City {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {} (Cód. {:05})", self.name, self.state.abbr, self.id)
    }
}

/// An election zone within a municipality
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElectionZone {
    /// Zone number, unique within the municipality
    pub id: u32,
    /// Enclosing municipality
    pub city: Arc<City>,
}

impl std::fmt::Display for ElectionZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, zona {:04}", self.city, self.id)
    }
}

/// An election section within a zone, as enumerated for one contest
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElectionSection {
    /// Section number, unique within the zone
    pub id: u32,
    /// Enclosing zone
    pub zone: Arc<ElectionZone>,
    /// Contest the section was enumerated under
    pub contest: Contest,
}

impl ElectionSection {
    /// Composite (municipality, zone, section) key
    pub fn key(&self) -> SectionKey {
        SectionKey::new(self.zone.city.id, self.zone.id, self.id)
    }

    /// Enclosing municipality
    pub fn city(&self) -> &City {
        &self.zone.city
    }

    /// Enclosing state
    pub fn state(&self) -> &State {
        &self.zone.city.state
    }
}

impl std::fmt::Display for ElectionSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}, seção {:04}, pleito {} ({})",
            self.zone, self.id, self.contest.contest_id, self.contest.year
        )
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn rio() -> Arc<State> {
        let brasil = Arc::new(Country {
            name: "Brasil".to_string(),
        });
        let sudeste = Arc::new(Region {
            name: "Sudeste".to_string(),
            abbr: "SE".to_string(),
            country: brasil,
        });
        Arc::new(State::new("Rio de Janeiro", "RJ", Some(sudeste)))
    }

    #[test]
    fn test_city_equality_ignores_name() {
        let state = rio();
        let a = City {
            id: 58653,
            name: "Niterói".to_string(),
            state: Arc::clone(&state),
        };
        let b = City {
            id: 58653,
            name: "Nictheroy".to_string(),
            state,
        };
        assert_eq!(a, b);
    }

    #[test]
    fn test_state_equality_by_code() {
        let a = State::new("Rio de Janeiro", "RJ", None);
        let b = State::new("Rio de Janeiro2", "rj", None);
        assert_eq!(a, b);
        assert_eq!(a.code(), "rj");
    }

    #[test]
    fn test_section_key_and_display() {
        let city = Arc::new(City {
            id: 58017,
            name: "Angra dos Reis".to_string(),
            state: rio(),
        });
        let zone = Arc::new(ElectionZone { id: 116, city });
        let section = ElectionSection {
            id: 1,
            zone,
            contest: Contest::new(2022, 406),
        };

        assert_eq!(section.key(), SectionKey::new(58017, 116, 1));
        assert_eq!(section.state().abbr, "RJ");
        assert_eq!(
            section.to_string(),
            "Angra dos Reis, RJ (Cód. 58017), zona 0116, seção 0001, pleito 406 (2022)"
        );
    }
}
