use std::collections::HashMap;

use serde::Serialize;

use super::filter::{filtered_rows, AdsorbateSlot, FilterCriteria};
use super::model::{IsothermRef, PressureGrid, RawMeasurement};
use crate::stats::{stats, PerMaterialStat};

// ---------------------------------------------------------------------------
// Per-material statistics
// ---------------------------------------------------------------------------

/// Statistics of every tracked column for one material and one adsorbate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotStats {
    pub henry: PerMaterialStat,
    /// One entry per pressure bucket of the grid.
    pub loading: Vec<PerMaterialStat>,
    /// Isotherm documents behind these statistics, in dataset order.
    pub isotherms: Vec<IsothermRef>,
}

impl SlotStats {
    pub fn loading_at(&self, bucket: usize) -> PerMaterialStat {
        self.loading
            .get(bucket)
            .copied()
            .unwrap_or(PerMaterialStat::EMPTY)
    }
}

/// Joined statistics of one material present under both adsorbates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedStats {
    pub material: String,
    slots: [SlotStats; 2],
}

impl CombinedStats {
    pub fn new(material: String, first: SlotStats, second: SlotStats) -> Self {
        Self {
            material,
            slots: [first, second],
        }
    }

    pub fn slot(&self, slot: AdsorbateSlot) -> &SlotStats {
        &self.slots[slot.index()]
    }

    pub fn x(&self) -> &SlotStats {
        self.slot(AdsorbateSlot::First)
    }

    pub fn y(&self) -> &SlotStats {
        self.slot(AdsorbateSlot::Second)
    }
}

/// Outcome of a selection. No shared material is a normal result, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Materials(Vec<CombinedStats>),
    NoCommonMaterials,
}

impl Selection {
    pub fn into_materials(self) -> Vec<CombinedStats> {
        match self {
            Selection::Materials(rows) => rows,
            Selection::NoCommonMaterials => Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Filter, group and join the measurements of both adsorbates.
///
/// Rows follow the first-seen order of materials in the adsorbate-1 subset.
pub fn select(
    measurements: &[RawMeasurement],
    criteria: &FilterCriteria,
    grid: &PressureGrid,
) -> Selection {
    let first = group_by_material(filtered_rows(measurements, criteria, &criteria.adsorbate_1));
    let second = group_by_material(filtered_rows(measurements, criteria, &criteria.adsorbate_2));

    let second_index: HashMap<&str, usize> = second
        .iter()
        .enumerate()
        .map(|(i, (material, _))| (*material, i))
        .collect();

    let joined: Vec<CombinedStats> = first
        .iter()
        .filter_map(|(material, rows_x)| {
            let rows_y = &second[*second_index.get(material)?].1;
            Some(CombinedStats::new(
                material.to_string(),
                slot_stats(rows_x, grid),
                slot_stats(rows_y, grid),
            ))
        })
        .collect();

    if joined.is_empty() {
        log::info!(
            "no material shared by {} and {}",
            criteria.adsorbate_1,
            criteria.adsorbate_2
        );
        return Selection::NoCommonMaterials;
    }
    Selection::Materials(joined)
}

/// Per-material statistics for a single adsorbate, in first-seen order.
///
/// Backs [`KpiStore::single_adsorbate`](crate::kpi::KpiStore::single_adsorbate),
/// which charts one gas without the inner join.
pub fn select_single(
    measurements: &[RawMeasurement],
    criteria: &FilterCriteria,
    adsorbate: &str,
    grid: &PressureGrid,
) -> Vec<(String, SlotStats)> {
    group_by_material(filtered_rows(measurements, criteria, adsorbate))
        .into_iter()
        .map(|(material, rows)| (material.to_string(), slot_stats(&rows, grid)))
        .collect()
}

/// Group rows by material, keeping first-seen order of materials and
/// dataset order within a group.
fn group_by_material<'a, I>(rows: I) -> Vec<(&'a str, Vec<&'a RawMeasurement>)>
where
    I: Iterator<Item = &'a RawMeasurement>,
{
    let mut groups: Vec<(&'a str, Vec<&'a RawMeasurement>)> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    for row in rows {
        let i = *index.entry(row.material.as_str()).or_insert_with(|| {
            groups.push((row.material.as_str(), Vec::new()));
            groups.len() - 1
        });
        groups[i].1.push(row);
    }
    groups
}

fn slot_stats(rows: &[&RawMeasurement], grid: &PressureGrid) -> SlotStats {
    let henry = stats(rows.iter().map(|m| m.henry));
    let loading = (0..grid.len())
        .map(|bucket| stats(rows.iter().map(|m| m.loading_at(bucket))))
        .collect();
    let isotherms = rows.iter().map(|m| m.isotherm.clone()).collect();
    SlotStats {
        henry,
        loading,
        isotherms,
    }
}
