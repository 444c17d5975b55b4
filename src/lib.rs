//! KPI engine for screening adsorbent materials for a two-gas separation.
//!
//! Raw isotherm measurements are reduced to outlier-robust per-material
//! statistics, joined across the two adsorbates and turned into Henry,
//! uptake and working capacity metrics. A [`state::Session`] owns that
//! snapshot, patches it when only a display pressure changes and streams
//! detail curves for a single selected material on background threads.

pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod isotherm;
pub mod kpi;
pub mod overlay;
pub mod state;
pub mod stats;

pub use config::SessionConfig;
pub use data::filter::{AdsorbateSlot, FilterCriteria};
pub use data::model::{DatasetProvider, IsothermType, PressureGrid, RawDataset, RawMeasurement};
pub use error::{DatasetError, ScreenError};
pub use kpi::{CombinedMaterialRow, KpiStore, QueryParameters};
pub use state::{Session, SessionEvent, SessionUpdate};
