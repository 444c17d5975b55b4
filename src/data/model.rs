use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, ScreenError};

/// Tolerance used when snapping a query pressure onto the grid.
const GRID_TOLERANCE: f64 = 1e-6;

// ---------------------------------------------------------------------------
// IsothermType – where a measurement came from
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IsothermType {
    #[serde(alias = "exp")]
    Experimental,
    #[serde(alias = "sim")]
    Simulated,
}

impl fmt::Display for IsothermType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IsothermType::Experimental => write!(f, "experimental"),
            IsothermType::Simulated => write!(f, "simulated"),
        }
    }
}

impl FromStr for IsothermType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exp" | "experimental" => Ok(IsothermType::Experimental),
            "sim" | "simulated" => Ok(IsothermType::Simulated),
            other => Err(format!("unknown isotherm type '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// PressureGrid – the buckets every loading vector is indexed by
// ---------------------------------------------------------------------------

/// Fixed pressure buckets `0, step, 2·step, …, max` (bar).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PressureGrid {
    pub step: f64,
    pub max: f64,
}

impl Default for PressureGrid {
    fn default() -> Self {
        Self {
            step: 0.5,
            max: 20.0,
        }
    }
}

impl PressureGrid {
    /// A grid whose `step` is positive and divides `max` into whole buckets.
    pub fn new(step: f64, max: f64) -> Result<Self, ScreenError> {
        let grid = Self { step, max };
        grid.validate()?;
        Ok(grid)
    }

    /// Check a grid built field by field, e.g. from a config file.
    pub fn validate(&self) -> Result<(), ScreenError> {
        let invalid = |reason: &'static str| ScreenError::InvalidGrid {
            step: self.step,
            max: self.max,
            reason,
        };
        if !self.step.is_finite() || self.step <= 0.0 {
            return Err(invalid("step must be a positive number"));
        }
        if !self.max.is_finite() || self.max < 0.0 {
            return Err(invalid("max must be a non-negative number"));
        }
        let buckets = (self.max / self.step).round();
        if (buckets * self.step - self.max).abs() > GRID_TOLERANCE {
            return Err(invalid("step does not divide max"));
        }
        Ok(())
    }

    /// Number of buckets, both ends included. Zero for an invalid grid.
    pub fn len(&self) -> usize {
        if self.validate().is_err() {
            return 0;
        }
        (self.max / self.step).round() as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pressure (bar) at bucket `index`.
    pub fn pressure(&self, index: usize) -> f64 {
        index as f64 * self.step
    }

    /// Snap a pressure onto its bucket index.
    pub fn bucket(&self, pressure: f64) -> Result<usize, ScreenError> {
        let off_grid = || ScreenError::PressureOffGrid {
            pressure,
            step: self.step,
            max: self.max,
        };
        if !pressure.is_finite() || pressure < -GRID_TOLERANCE {
            return Err(off_grid());
        }
        let index = (pressure / self.step).round();
        if (index * self.step - pressure).abs() > GRID_TOLERANCE {
            return Err(off_grid());
        }
        let index = index as usize;
        if index >= self.len() {
            return Err(off_grid());
        }
        Ok(index)
    }
}

// ---------------------------------------------------------------------------
// RawMeasurement – one row of the source table
// ---------------------------------------------------------------------------

/// Opaque handle to a stored isotherm document, resolved by an
/// [`IsothermDecoder`](crate::isotherm::decode::IsothermDecoder).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IsothermRef(pub String);

impl fmt::Display for IsothermRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single isotherm measurement of one adsorbate on one material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMeasurement {
    pub material: String,
    pub adsorbate: String,
    /// Kelvin.
    pub temperature: f64,
    #[serde(rename = "type")]
    pub kind: IsothermType,
    /// Henry coefficient, NaN when unknown.
    pub henry: f64,
    /// Loading at each grid bucket, NaN when unknown.
    pub loading: Vec<f64>,
    pub isotherm: IsothermRef,
}

impl RawMeasurement {
    /// Loading at bucket `index`; buckets past the end of the vector are missing.
    pub fn loading_at(&self, index: usize) -> f64 {
        self.loading.get(index).copied().unwrap_or(f64::NAN)
    }
}

// ---------------------------------------------------------------------------
// DatasetProvider – read-only access to the measurements
// ---------------------------------------------------------------------------

/// Read-only source of measurements, shared with the KPI store.
pub trait DatasetProvider: Send + Sync {
    fn measurements(&self) -> Result<&[RawMeasurement], DatasetError>;

    fn grid(&self) -> PressureGrid;
}

// ---------------------------------------------------------------------------
// RawDataset – the complete loaded dataset
// ---------------------------------------------------------------------------

/// In-memory measurements with pre-computed indices.
#[derive(Debug, Clone)]
pub struct RawDataset {
    pub measurements: Vec<RawMeasurement>,
    /// Sorted set of every adsorbate in the table.
    pub adsorbates: BTreeSet<String>,
    pub grid: PressureGrid,
}

impl RawDataset {
    pub fn from_measurements(measurements: Vec<RawMeasurement>, grid: PressureGrid) -> Self {
        let adsorbates = measurements
            .iter()
            .map(|m| m.adsorbate.clone())
            .collect();
        RawDataset {
            measurements,
            adsorbates,
            grid,
        }
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    /// Number of distinct materials.
    pub fn material_count(&self) -> usize {
        self.measurements
            .iter()
            .map(|m| m.material.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }
}

impl DatasetProvider for RawDataset {
    fn measurements(&self) -> Result<&[RawMeasurement], DatasetError> {
        Ok(&self.measurements)
    }

    fn grid(&self) -> PressureGrid {
        self.grid
    }
}
