//! Drift between the connection points seen in the feed and the two
//! reference catalogs.
//!
//! Observed identifiers are split by shape. Generation identifiers are
//! matched one-for-one against catalog units in catalog order, so a unit
//! listed once absorbs exactly one observation. Substation-family
//! identifiers are matched by site code, and a substation absorbs every
//! observation carrying its code.

pub mod identifier;
mod multiset;

use std::collections::HashSet;

use dispatch_client::domain::{PlantSite, SubstationEntry};
use serde::Serialize;

use self::identifier::{is_generation_identifier, substation_code_of};
use self::multiset::Multiset;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationDrift {
    /// Active catalog units that did not report.
    pub not_in_dispatch_list: Vec<String>,
    /// Reporting units the catalog does not know.
    pub not_in_generator_list: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstationDrift {
    /// Catalog site codes with no reporting connection point.
    pub not_in_dispatch_list: Vec<String>,
    /// Reporting connection points whose site code the catalog does not know.
    pub not_in_substation_list: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult {
    pub generation: GenerationDrift,
    pub substations: SubstationDrift,
}

impl ReconciliationResult {
    pub fn is_clean(&self) -> bool {
        self.anomaly_count() == 0
    }

    pub fn anomaly_count(&self) -> usize {
        self.generation.not_in_dispatch_list.len()
            + self.generation.not_in_generator_list.len()
            + self.substations.not_in_dispatch_list.len()
            + self.substations.not_in_substation_list.len()
    }
}

/// Classify `observed` against both catalogs. Inputs are only borrowed, so
/// identical inputs always give identical results.
pub fn reconcile<S: AsRef<str>>(
    observed: &[S],
    generation_catalog: &[PlantSite],
    substation_catalog: &[SubstationEntry],
) -> ReconciliationResult {
    let (observed_gen, observed_sub): (Vec<&str>, Vec<&str>) = observed
        .iter()
        .map(|id| id.as_ref())
        .partition(|id| is_generation_identifier(id));

    ReconciliationResult {
        generation: reconcile_generation(&observed_gen, generation_catalog),
        substations: reconcile_substations(&observed_sub, substation_catalog),
    }
}

fn reconcile_generation(observed: &[&str], catalog: &[PlantSite]) -> GenerationDrift {
    let mut remaining = Multiset::new(observed.iter().copied());
    let mut not_in_dispatch_list = Vec::new();

    for unit in catalog.iter().flat_map(|plant| plant.units.iter()) {
        if !remaining.take(&unit.node) && unit.is_expected_to_report() {
            not_in_dispatch_list.push(unit.node.clone());
        }
    }

    GenerationDrift {
        not_in_dispatch_list,
        not_in_generator_list: remaining.leftovers(observed.iter().copied()),
    }
}

fn reconcile_substations(observed: &[&str], catalog: &[SubstationEntry]) -> SubstationDrift {
    // Site codes seen in the feed that no catalog entry has claimed yet.
    let mut unclaimed: HashSet<&str> = observed.iter().map(|id| substation_code_of(id)).collect();
    let mut not_in_dispatch_list = Vec::new();

    for entry in catalog {
        if !unclaimed.remove(entry.site_id.as_str()) {
            not_in_dispatch_list.push(entry.site_id.clone());
        }
    }

    let not_in_substation_list = observed
        .iter()
        .filter(|id| unclaimed.contains(substation_code_of(id)))
        .map(|id| id.to_string())
        .collect();

    SubstationDrift {
        not_in_dispatch_list,
        not_in_substation_list,
    }
}
