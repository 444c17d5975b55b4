use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::color::ISOTHERM_PALETTE_SIZE;
use crate::data::filter::FilterCriteria;
use crate::data::model::PressureGrid;
use crate::kpi::QueryParameters;

/// Initial state of a screening session. Every field is optional in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub filter: FilterCriteria,
    pub query: QueryParameters,
    pub grid: PressureGrid,
    pub palette_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            filter: FilterCriteria::default(),
            query: QueryParameters::default(),
            grid: PressureGrid::default(),
            palette_size: ISOTHERM_PALETTE_SIZE,
        }
    }
}

impl SessionConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config
            .grid
            .validate()
            .with_context(|| format!("checking config {}", path.display()))?;
        Ok(config)
    }
}
