use serde::{Deserialize, Serialize};

use super::model::{IsothermType, RawMeasurement};

// ---------------------------------------------------------------------------
// Filter criteria: which measurements take part in a recompute
// ---------------------------------------------------------------------------

/// Row-level filter applied before any grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    /// `None` keeps both experimental and simulated rows.
    pub kind: Option<IsothermType>,
    pub temperature_target: f64,
    pub temperature_tolerance: f64,
    pub adsorbate_1: String,
    pub adsorbate_2: String,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            kind: None,
            temperature_target: 303.0,
            temperature_tolerance: 10.0,
            adsorbate_1: "propane".into(),
            adsorbate_2: "propene".into(),
        }
    }
}

impl FilterCriteria {
    /// Inclusive temperature window `[target - tolerance, target + tolerance]`.
    pub fn temperature_window(&self) -> (f64, f64) {
        (
            self.temperature_target - self.temperature_tolerance,
            self.temperature_target + self.temperature_tolerance,
        )
    }

    /// Type and temperature predicate; the adsorbate split happens afterwards.
    pub fn admits(&self, m: &RawMeasurement) -> bool {
        if let Some(kind) = self.kind {
            if m.kind != kind {
                return false;
            }
        }
        let (low, high) = self.temperature_window();
        (low..=high).contains(&m.temperature)
    }

    /// Adsorbate name for a slot.
    pub fn adsorbate(&self, slot: AdsorbateSlot) -> &str {
        match slot {
            AdsorbateSlot::First => &self.adsorbate_1,
            AdsorbateSlot::Second => &self.adsorbate_2,
        }
    }
}

/// Which of the two compared adsorbates a value belongs to.
/// The first adsorbate is plotted on `x`, the second on `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdsorbateSlot {
    First,
    Second,
}

impl AdsorbateSlot {
    pub const BOTH: [AdsorbateSlot; 2] = [AdsorbateSlot::First, AdsorbateSlot::Second];

    pub fn index(self) -> usize {
        match self {
            AdsorbateSlot::First => 0,
            AdsorbateSlot::Second => 1,
        }
    }
}

/// Return the rows of `measurements` admitted by `criteria` for `adsorbate`,
/// keeping dataset order.
pub fn filtered_rows<'a>(
    measurements: &'a [RawMeasurement],
    criteria: &'a FilterCriteria,
    adsorbate: &'a str,
) -> impl Iterator<Item = &'a RawMeasurement> + 'a {
    measurements
        .iter()
        .filter(move |m| m.adsorbate == adsorbate && criteria.admits(m))
}
