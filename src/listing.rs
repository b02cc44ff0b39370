//! Section enumeration from the per-state metadata listing
//!
//! The listing document nests municipalities, zones and sections under short
//! keys: `abr[0].mu[]` with `cd`/`nm`, each with `zon[]` (`cd`), each with
//! `sec[]` (`ns`). Codes are published as zero-padded strings.

use crate::domain::{City, Contest, ElectionSection, ElectionZone, State};
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::locator::Locator;
use crate::machine::{MachineRegistry, VotingMachine};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Deserialize)]
struct ListingDocument {
    #[serde(default)]
    abr: Vec<StateEntry>,
}

#[derive(Deserialize)]
struct StateEntry {
    #[serde(default)]
    mu: Vec<MunicipalityEntry>,
}

#[derive(Deserialize)]
struct MunicipalityEntry {
    cd: Code,
    nm: String,
    #[serde(default)]
    zon: Vec<ZoneEntry>,
}

#[derive(Deserialize)]
struct ZoneEntry {
    cd: Code,
    #[serde(default)]
    sec: Vec<SectionEntry>,
}

#[derive(Deserialize)]
struct SectionEntry {
    ns: Code,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Code {
    Number(u64),
    Text(String),
}

impl Code {
    fn parse(&self, url: &str, what: &str) -> Result<u32> {
        let parsed = match self {
            Code::Number(n) => u32::try_from(*n).ok(),
            Code::Text(s) => s.trim().parse::<u32>().ok(),
        };
        parsed.ok_or_else(|| Error::Listing {
            url: url.to_string(),
            reason: format!("invalid {} code {}", what, self),
        })
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Code::Number(n) => write!(f, "{}", n),
            Code::Text(s) => write!(f, "'{}'", s),
        }
    }
}

/// Entities discovered in one state's listing, keyed by zero-padded codes
#[derive(Clone, Debug, Default)]
pub struct SectionListing {
    /// Municipalities by `{mun:05}`
    pub cities: BTreeMap<String, Arc<City>>,
    /// Zones by `{mun:05}{zone:04}`
    pub zones: BTreeMap<String, Arc<ElectionZone>>,
    /// Sections by `{mun:05}{zone:04}{sec:04}`
    pub sections: BTreeMap<String, ElectionSection>,
}

/// Enumerate every section of `state` in `contest`
///
/// Registers one [`VotingMachine`] per section in `registry`, in document
/// order, and returns the discovered entities.
pub async fn enumerate_sections(
    fetcher: &dyn Fetcher,
    locator: &Locator,
    state: Arc<State>,
    contest: Contest,
    registry: &mut MachineRegistry,
) -> Result<SectionListing> {
    let url = locator.listing_url(contest.year, contest.contest_id, &state.code())?;
    let response = fetcher.fetch(&url).await?.error_for_status()?;

    let document: ListingDocument =
        serde_json::from_slice(&response.body).map_err(|e| Error::Listing {
            url: url.clone(),
            reason: e.to_string(),
        })?;
    let entry = document.abr.into_iter().next().ok_or_else(|| Error::Listing {
        url: url.clone(),
        reason: "missing 'abr[0]'".to_string(),
    })?;

    // Parse everything before touching the registry so a bad code leaves it unchanged
    let mut listing = SectionListing::default();
    let mut discovered = Vec::new();
    for municipality in &entry.mu {
        let city_id = municipality.cd.parse(&url, "municipality")?;
        let city = Arc::new(City {
            id: city_id,
            name: municipality.nm.clone(),
            state: Arc::clone(&state),
        });
        listing
            .cities
            .insert(format!("{:05}", city_id), Arc::clone(&city));

        for zone_entry in &municipality.zon {
            let zone_id = zone_entry.cd.parse(&url, "zone")?;
            let zone = Arc::new(ElectionZone {
                id: zone_id,
                city: Arc::clone(&city),
            });
            listing
                .zones
                .insert(format!("{:05}{:04}", city_id, zone_id), Arc::clone(&zone));

            for section_entry in &zone_entry.sec {
                let section = ElectionSection {
                    id: section_entry.ns.parse(&url, "section")?,
                    zone: Arc::clone(&zone),
                    contest,
                };
                listing
                    .sections
                    .insert(section.key().code(), section.clone());
                discovered.push(section);
            }
        }
    }

    for section in discovered {
        registry.register(VotingMachine::new(section));
    }

    tracing::info!(
        state = %state.abbr,
        contest = contest.contest_id,
        cities = listing.cities.len(),
        zones = listing.zones.len(),
        sections = listing.sections.len(),
        "enumerated sections"
    );

    Ok(listing)
}
