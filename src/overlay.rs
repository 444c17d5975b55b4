use serde::Serialize;

use crate::data::select::CombinedStats;
use crate::error::{Result, ScreenError};
use crate::kpi::{Buckets, CombinedMaterialRow, KpiStore, PairedValue};

/// The three scatter plots a selection is highlighted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MetricFamily {
    Henry,
    Uptake,
    WorkingCapacity,
}

impl MetricFamily {
    pub const ALL: [MetricFamily; 3] = [
        MetricFamily::Henry,
        MetricFamily::Uptake,
        MetricFamily::WorkingCapacity,
    ];

    fn value(self, row: &CombinedMaterialRow) -> PairedValue {
        match self {
            MetricFamily::Henry => row.henry,
            MetricFamily::Uptake => row.uptake,
            MetricFamily::WorkingCapacity => row.working_capacity,
        }
    }

    /// `(error_x, error_y)` for a row whose values are both present.
    fn errors(self, stats: &CombinedStats, buckets: &Buckets) -> (f64, f64) {
        match self {
            MetricFamily::Henry => (stats.x().henry.error, stats.y().henry.error),
            MetricFamily::Uptake => (
                stats.x().loading_at(buckets.uptake).error,
                stats.y().loading_at(buckets.uptake).error,
            ),
            MetricFamily::WorkingCapacity => (
                stats.x().loading_at(buckets.low).error + stats.x().loading_at(buckets.high).error,
                stats.y().loading_at(buckets.low).error + stats.y().loading_at(buckets.high).error,
            ),
        }
    }
}

/// A two-point line from `from` to `to`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    pub from: [f64; 2],
    pub to: [f64; 2],
}

/// Error bars of one selected material on one plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorMarker {
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub error_x: f64,
    pub error_y: f64,
    /// Lower and upper half of the x bar, then of the y bar.
    pub segments: [Segment; 4],
}

impl ErrorMarker {
    fn new(label: String, value: PairedValue, errors: (f64, f64)) -> Self {
        let (x, y) = (value.x, value.y);
        let (ex, ey) = errors;
        Self {
            label,
            x,
            y,
            error_x: ex,
            error_y: ey,
            segments: [
                Segment { from: [x - ex, y], to: [x, y] },
                Segment { from: [x, y], to: [x + ex, y] },
                Segment { from: [x, y - ey], to: [x, y] },
                Segment { from: [x, y], to: [x, y + ey] },
            ],
        }
    }
}

/// Error bars of the current selection, one independent set per family.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SelectionOverlay {
    henry: Vec<ErrorMarker>,
    uptake: Vec<ErrorMarker>,
    working_capacity: Vec<ErrorMarker>,
}

impl SelectionOverlay {
    /// Rebuild every family for `indices`.
    pub fn full_overlay(&mut self, indices: &[usize], store: &KpiStore) -> Result<()> {
        let henry = markers(MetricFamily::Henry, indices, store)?;
        let uptake = markers(MetricFamily::Uptake, indices, store)?;
        let working_capacity = markers(MetricFamily::WorkingCapacity, indices, store)?;
        self.henry = henry;
        self.uptake = uptake;
        self.working_capacity = working_capacity;
        Ok(())
    }

    /// Rebuild only the uptake family.
    pub fn uptake_overlay(&mut self, indices: &[usize], store: &KpiStore) -> Result<()> {
        self.uptake = markers(MetricFamily::Uptake, indices, store)?;
        Ok(())
    }

    /// Rebuild only the working capacity family.
    pub fn working_capacity_overlay(&mut self, indices: &[usize], store: &KpiStore) -> Result<()> {
        self.working_capacity = markers(MetricFamily::WorkingCapacity, indices, store)?;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.henry.clear();
        self.uptake.clear();
        self.working_capacity.clear();
    }

    pub fn family(&self, family: MetricFamily) -> &[ErrorMarker] {
        match family {
            MetricFamily::Henry => &self.henry,
            MetricFamily::Uptake => &self.uptake,
            MetricFamily::WorkingCapacity => &self.working_capacity,
        }
    }

    pub fn is_empty(&self) -> bool {
        MetricFamily::ALL.iter().all(|f| self.family(*f).is_empty())
    }
}

fn markers(family: MetricFamily, indices: &[usize], store: &KpiStore) -> Result<Vec<ErrorMarker>> {
    indices
        .iter()
        .map(|&index| {
            let (row, stats) = store
                .row(index)
                .zip(store.stats(index))
                .ok_or(ScreenError::RowOutOfRange {
                    index,
                    len: store.len(),
                })?;
            let value = family.value(row);
            // A material missing one axis still gets a label, drawn at the origin.
            if value.is_missing() {
                let zero = PairedValue { x: 0.0, y: 0.0, ..value };
                return Ok(ErrorMarker::new(row.material.clone(), zero, (0.0, 0.0)));
            }
            let errors = family.errors(stats, store.buckets());
            Ok(ErrorMarker::new(row.material.clone(), value, errors))
        })
        .collect()
}
