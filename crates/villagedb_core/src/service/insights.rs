//! Read-only projections for dashboard, map and chart consumers.
//!
//! # Responsibility
//! - Parse numeric string fields for consumers that need numbers.
//! - Aggregate dashboard counters over the full set.
//!
//! # Invariants
//! - Records whose numeric fields fail to parse are skipped, never fatal.
//! - Projections preserve full-set order.

use crate::model::village::{Village, VillageId};

/// Tag that marks a village as urban in dashboard counters.
pub const URBAN_TAG: &str = "urban";

/// Dashboard counters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VillageStats {
    pub total_villages: usize,
    /// Villages tagged `urban`.
    pub urban_areas: usize,
    /// Sum of parseable `demographics.populationSize` values, saturating at
    /// `u64::MAX`.
    pub total_population: u64,
    /// Mean of parseable `landArea` values; `0.0` when none parse.
    pub avg_land_area: f64,
}

/// One map pin.
#[derive(Debug, Clone, PartialEq)]
pub struct MapMarker {
    pub id: VillageId,
    pub name: String,
    pub region: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Raw population text, if demographics are set.
    pub population: Option<String>,
}

/// One bar of the population chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulationPoint {
    pub name: String,
    pub population: u64,
}

/// Computes dashboard counters over `villages`.
pub fn village_stats(villages: &[Village]) -> VillageStats {
    let urban_areas = villages
        .iter()
        .filter(|village| village.has_tag(URBAN_TAG))
        .count();
    let total_population = villages
        .iter()
        .filter_map(population_of)
        .fold(0u64, u64::saturating_add);

    let land_areas = villages
        .iter()
        .filter_map(|village| parse_decimal(&village.land_area))
        .collect::<Vec<_>>();
    let avg_land_area = if land_areas.is_empty() {
        0.0
    } else {
        land_areas.iter().sum::<f64>() / land_areas.len() as f64
    };

    VillageStats {
        total_villages: villages.len(),
        urban_areas,
        total_population,
        avg_land_area,
    }
}

/// Map pins for villages with valid coordinates.
pub fn map_markers(villages: &[Village]) -> Vec<MapMarker> {
    villages
        .iter()
        .filter_map(|village| {
            let latitude = parse_decimal(&village.latitude)?;
            let longitude = parse_decimal(&village.longitude)?;
            if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
                return None;
            }
            Some(MapMarker {
                id: village.id,
                name: village.name.clone(),
                region: village.region.clone(),
                latitude,
                longitude,
                population: village
                    .demographics
                    .as_ref()
                    .map(|demographics| demographics.population_size.clone()),
            })
        })
        .collect()
}

/// Population chart series for villages with a parseable population.
pub fn population_series(villages: &[Village]) -> Vec<PopulationPoint> {
    villages
        .iter()
        .filter_map(|village| {
            Some(PopulationPoint {
                name: village.name.clone(),
                population: population_of(village)?,
            })
        })
        .collect()
}

fn population_of(village: &Village) -> Option<u64> {
    let raw = village.demographics.as_ref()?.population_size.trim();
    raw.replace(',', "").parse::<u64>().ok()
}

fn parse_decimal(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}
