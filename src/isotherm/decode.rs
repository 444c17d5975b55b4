use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::data::model::IsothermRef;

/// Curve fields recovered from a stored isotherm.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedIsotherm {
    pub label: String,
    pub pressure: Vec<f64>,
    pub loading: Vec<f64>,
    pub citation: String,
    pub temperature: f64,
}

/// Resolves isotherm references into curves.
///
/// Implementations must not panic on malformed input; `None` means "skip".
/// Decoding runs on loader worker threads and may block.
pub trait IsothermDecoder: Send + Sync {
    fn decode(&self, reference: &IsothermRef) -> Option<DecodedIsotherm>;
}

// ---------------------------------------------------------------------------
// JSON documents on disk
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct IsothermDocument {
    #[serde(default)]
    filename: Option<String>,
    #[serde(rename = "DOI", default)]
    doi: String,
    temperature: f64,
    isotherm_data: Vec<IsothermPoint>,
}

#[derive(Debug, Deserialize)]
struct IsothermPoint {
    pressure: f64,
    total_adsorption: f64,
}

/// Reads `<root>/<reference>.json` isotherm documents:
///
/// ```json
/// {
///   "filename": "10.1021-abc.isotherm3",
///   "DOI": "10.1021/abc",
///   "temperature": 303,
///   "isotherm_data": [{ "pressure": 0.5, "total_adsorption": 1.2 }, ...]
/// }
/// ```
#[derive(Debug, Clone)]
pub struct JsonIsothermDecoder {
    root: PathBuf,
}

impl JsonIsothermDecoder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, reference: &IsothermRef) -> Option<PathBuf> {
        let name = reference.0.trim();
        // References are file stems, never paths.
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return None;
        }
        Some(self.root.join(format!("{name}.json")))
    }
}

impl IsothermDecoder for JsonIsothermDecoder {
    fn decode(&self, reference: &IsothermRef) -> Option<DecodedIsotherm> {
        let Some(path) = self.document_path(reference) else {
            log::info!("skipping isotherm '{reference}': not a valid reference");
            return None;
        };
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                log::info!("skipping isotherm '{reference}': {e}");
                return None;
            }
        };
        let doc: IsothermDocument = match serde_json::from_str(&text) {
            Ok(doc) => doc,
            Err(e) => {
                log::info!("skipping isotherm '{reference}': {e}");
                return None;
            }
        };
        if doc.isotherm_data.is_empty() {
            log::info!("skipping isotherm '{reference}': no data points");
            return None;
        }

        let (pressure, loading) = doc
            .isotherm_data
            .iter()
            .map(|p| (p.pressure, p.total_adsorption))
            .unzip();
        Some(DecodedIsotherm {
            label: doc.filename.unwrap_or_else(|| reference.0.clone()),
            pressure,
            loading,
            citation: doc.doi,
            temperature: doc.temperature,
        })
    }
}
