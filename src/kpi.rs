use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::data::filter::FilterCriteria;
use crate::data::model::{DatasetProvider, PressureGrid};
use crate::data::select::{select, select_single, CombinedStats, Selection, SlotStats};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Query parameters: display-only knobs that never change the material set
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryParameters {
    /// Pressure (bar) at which uptake is compared.
    pub uptake_pressure: f64,
    /// Lower bound (bar) of the working capacity range.
    pub working_capacity_low: f64,
    /// Upper bound (bar) of the working capacity range.
    pub working_capacity_high: f64,
}

impl Default for QueryParameters {
    fn default() -> Self {
        Self {
            uptake_pressure: 0.5,
            working_capacity_low: 0.5,
            working_capacity_high: 5.0,
        }
    }
}

/// Grid buckets resolved from [`QueryParameters`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Buckets {
    pub uptake: usize,
    pub low: usize,
    pub high: usize,
}

impl Buckets {
    fn resolve(params: &QueryParameters, grid: &PressureGrid) -> Result<Self> {
        Ok(Self {
            uptake: grid.bucket(params.uptake_pressure)?,
            low: grid.bucket(params.working_capacity_low)?,
            high: grid.bucket(params.working_capacity_high)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Snapshot rows
// ---------------------------------------------------------------------------

/// A metric for both adsorbates: `x` is adsorbate 1, `y` adsorbate 2.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairedValue {
    pub x: f64,
    pub y: f64,
    pub count_x: usize,
    pub count_y: usize,
}

impl PairedValue {
    /// Number of measurements behind both values.
    pub fn count(&self) -> usize {
        self.count_x + self.count_y
    }

    pub fn is_missing(&self) -> bool {
        self.x.is_nan() || self.y.is_nan()
    }
}

/// One screened material.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedMaterialRow {
    pub material: String,
    pub henry: PairedValue,
    pub uptake: PairedValue,
    pub working_capacity: PairedValue,
    /// Henry coefficient ratio `henry.y / henry.x`.
    pub selectivity: f64,
    /// `(working_capacity.y / working_capacity.x) * selectivity`.
    pub screening: f64,
}

fn henry_pair(stats: &CombinedStats) -> PairedValue {
    PairedValue {
        x: stats.x().henry.median,
        y: stats.y().henry.median,
        count_x: stats.x().henry.count,
        count_y: stats.y().henry.count,
    }
}

fn uptake_pair(stats: &CombinedStats, bucket: usize) -> PairedValue {
    let (x, y) = (stats.x().loading_at(bucket), stats.y().loading_at(bucket));
    PairedValue {
        x: x.median,
        y: y.median,
        count_x: x.count,
        count_y: y.count,
    }
}

fn working_capacity_pair(stats: &CombinedStats, low: usize, high: usize) -> PairedValue {
    let (x_low, x_high) = (stats.x().loading_at(low), stats.x().loading_at(high));
    let (y_low, y_high) = (stats.y().loading_at(low), stats.y().loading_at(high));
    PairedValue {
        x: x_high.median - x_low.median,
        y: y_high.median - y_low.median,
        count_x: x_low.count.max(x_high.count),
        count_y: y_low.count.max(y_high.count),
    }
}

fn screening(working_capacity: &PairedValue, selectivity: f64) -> f64 {
    (working_capacity.y / working_capacity.x) * selectivity
}

fn derive_row(stats: &CombinedStats, buckets: &Buckets) -> CombinedMaterialRow {
    let henry = henry_pair(stats);
    let selectivity = henry.y / henry.x;
    let working_capacity = working_capacity_pair(stats, buckets.low, buckets.high);
    CombinedMaterialRow {
        material: stats.material.clone(),
        henry,
        uptake: uptake_pair(stats, buckets.uptake),
        working_capacity,
        selectivity,
        screening: screening(&working_capacity, selectivity),
    }
}

// ---------------------------------------------------------------------------
// Patches
// ---------------------------------------------------------------------------

/// Column update produced by [`KpiStore::patch_uptake`], one entry per row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UptakePatch {
    pub pressure: f64,
    pub uptake: Vec<PairedValue>,
}

/// Column update produced by [`KpiStore::patch_working_capacity`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkingCapacityPatch {
    pub low: f64,
    pub high: f64,
    pub working_capacity: Vec<PairedValue>,
    pub screening: Vec<f64>,
}

// ---------------------------------------------------------------------------
// KpiStore
// ---------------------------------------------------------------------------

/// Owns the current snapshot and the per-material statistics it was derived
/// from. `cache[i]` always backs `rows[i]`.
pub struct KpiStore {
    provider: Arc<dyn DatasetProvider>,
    grid: PressureGrid,
    criteria: FilterCriteria,
    params: QueryParameters,
    buckets: Buckets,
    cache: Vec<CombinedStats>,
    rows: Vec<CombinedMaterialRow>,
}

impl KpiStore {
    /// Create an empty store. Nothing is computed until [`Self::full_recompute`].
    pub fn new(provider: Arc<dyn DatasetProvider>, params: QueryParameters) -> Result<Self> {
        let grid = provider.grid();
        grid.validate()?;
        let buckets = Buckets::resolve(&params, &grid)?;
        Ok(Self {
            provider,
            grid,
            criteria: FilterCriteria::default(),
            params,
            buckets,
            cache: Vec::new(),
            rows: Vec::new(),
        })
    }

    /// Re-filter and re-group the raw dataset and replace the snapshot.
    ///
    /// A provider failure leaves the previous snapshot in place.
    pub fn full_recompute(&mut self, criteria: FilterCriteria) -> Result<&[CombinedMaterialRow]> {
        let started = Instant::now();
        let measurements = self.provider.measurements()?;
        let cache = match select(measurements, &criteria, &self.grid) {
            Selection::Materials(cache) => cache,
            Selection::NoCommonMaterials => Vec::new(),
        };
        self.rows = cache
            .iter()
            .map(|stats| derive_row(stats, &self.buckets))
            .collect();
        self.cache = cache;
        self.criteria = criteria;
        log::info!(
            "recomputed {} materials from {} rows in {:?}",
            self.rows.len(),
            measurements.len(),
            started.elapsed()
        );
        Ok(&self.rows)
    }

    /// Replace all query parameters and recompute from the dataset.
    ///
    /// On any error the previous parameters and snapshot stay in place.
    pub fn set_query(&mut self, params: QueryParameters) -> Result<&[CombinedMaterialRow]> {
        let buckets = Buckets::resolve(&params, &self.grid)?;
        let previous = (self.params, self.buckets);
        self.params = params;
        self.buckets = buckets;
        let criteria = self.criteria.clone();
        if let Err(e) = self.full_recompute(criteria).map(|_| ()) {
            (self.params, self.buckets) = previous;
            return Err(e);
        }
        Ok(&self.rows)
    }

    /// Per-material statistics of one adsorbate under the current filter,
    /// whether or not the material was also measured with the other one.
    pub fn single_adsorbate(&self, adsorbate: &str) -> Result<Vec<(String, SlotStats)>> {
        let measurements = self.provider.measurements()?;
        Ok(select_single(measurements, &self.criteria, adsorbate, &self.grid))
    }

    /// Recompute the uptake column from the cached statistics.
    pub fn patch_uptake(&mut self, pressure: f64) -> Result<UptakePatch> {
        let bucket = self.grid.bucket(pressure)?;
        let started = Instant::now();
        self.params.uptake_pressure = pressure;
        self.buckets.uptake = bucket;

        let uptake: Vec<PairedValue> = self
            .cache
            .iter()
            .zip(self.rows.iter_mut())
            .map(|(stats, row)| {
                row.uptake = uptake_pair(stats, bucket);
                row.uptake
            })
            .collect();
        log::debug!("uptake patch at {pressure} bar took {:?}", started.elapsed());
        Ok(UptakePatch { pressure, uptake })
    }

    /// Recompute working capacity and the screening metric from the cached
    /// statistics. The selectivity already in each row is reused.
    pub fn patch_working_capacity(&mut self, low: f64, high: f64) -> Result<WorkingCapacityPatch> {
        let low_bucket = self.grid.bucket(low)?;
        let high_bucket = self.grid.bucket(high)?;
        let started = Instant::now();
        self.params.working_capacity_low = low;
        self.params.working_capacity_high = high;
        self.buckets.low = low_bucket;
        self.buckets.high = high_bucket;

        let mut working_capacity = Vec::with_capacity(self.rows.len());
        let mut screening_column = Vec::with_capacity(self.rows.len());
        for (stats, row) in self.cache.iter().zip(self.rows.iter_mut()) {
            row.working_capacity = working_capacity_pair(stats, low_bucket, high_bucket);
            row.screening = screening(&row.working_capacity, row.selectivity);
            working_capacity.push(row.working_capacity);
            screening_column.push(row.screening);
        }
        log::debug!(
            "working capacity patch {low}..{high} bar took {:?}",
            started.elapsed()
        );
        Ok(WorkingCapacityPatch {
            low,
            high,
            working_capacity,
            screening: screening_column,
        })
    }

    pub fn rows(&self) -> &[CombinedMaterialRow] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&CombinedMaterialRow> {
        self.rows.get(index)
    }

    /// Cached statistics backing row `index`.
    pub fn stats(&self, index: usize) -> Option<&CombinedStats> {
        self.cache.get(index)
    }

    pub fn material_index(&self, material: &str) -> Option<usize> {
        self.rows.iter().position(|r| r.material == material)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn params(&self) -> &QueryParameters {
        &self.params
    }

    pub fn grid(&self) -> &PressureGrid {
        &self.grid
    }

    pub(crate) fn buckets(&self) -> &Buckets {
        &self.buckets
    }

    /// Indices of the `n` best rows by screening metric, best first.
    /// Rows without a screening value sort last.
    pub fn ranked(&self, n: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.rows.len()).collect();
        indices.sort_by(|&a, &b| {
            let (sa, sb) = (self.rows[a].screening, self.rows[b].screening);
            match (sa.is_nan(), sb.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => sb.total_cmp(&sa),
            }
        });
        indices.truncate(n);
        indices
    }
}
