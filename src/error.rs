use thiserror::Error;

/// Failure reported by a [`DatasetProvider`](crate::data::model::DatasetProvider).
///
/// The core never retries or rewraps these; they reach the caller as-is.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("dataset unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by the KPI engine and the session orchestrator.
#[derive(Debug, Error)]
pub enum ScreenError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("pressure {pressure} bar is not on the {step} bar grid (0..={max})")]
    PressureOffGrid { pressure: f64, step: f64, max: f64 },

    #[error("row {index} is out of range for a snapshot of {len} materials")]
    RowOutOfRange { index: usize, len: usize },

    #[error("invalid pressure grid (step {step}, max {max}): {reason}")]
    InvalidGrid {
        step: f64,
        max: f64,
        reason: &'static str,
    },
}

pub type Result<T, E = ScreenError> = std::result::Result<T, E>;
