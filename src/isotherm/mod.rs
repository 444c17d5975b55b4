/// Detail curves for a single selected material.
///
/// ```text
///   owner thread                      one thread per (material, slot)
///   ────────────                      ───────────────────────────────
///   CurveRequest ──dispatch──┬──▶ median curve queued at once
///                            └──▶ decode each stored isotherm (may block),
///                                 stop once the generation moves on
///                                        │
///   pump() ◀──── CurveDelivery ──────────┘  (tagged with generation)
///     │
///     ▼
///   generation matches? ── no ──▶ dropped
///     │ yes
///     ▼
///   IsothermCurve (coloured) ──▶ CurvePanel
/// ```
pub mod decode;
pub mod loader;

use serde::Serialize;

use crate::color::Rgb;

/// A curve ready for display. Owned by whoever it was delivered to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IsothermCurve {
    pub label: String,
    pub pressure: Vec<f64>,
    pub loading: Vec<f64>,
    pub citation: String,
    pub temperature: f64,
    pub color: Rgb,
}

/// Curves shown for one adsorbate of the selected material.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurvePanel {
    pub material: Option<String>,
    pub curves: Vec<IsothermCurve>,
    /// Axis extents; start at 1 and grow with the last point of each curve.
    pub x_end: f64,
    pub y_end: f64,
}

impl Default for CurvePanel {
    fn default() -> Self {
        Self {
            material: None,
            curves: Vec::new(),
            x_end: 1.0,
            y_end: 1.0,
        }
    }
}

impl CurvePanel {
    pub fn reset(&mut self, material: Option<String>) {
        *self = Self {
            material,
            ..Self::default()
        };
    }

    pub fn push(&mut self, curve: IsothermCurve) {
        if let Some(&p) = curve.pressure.last() {
            if p > self.x_end {
                self.x_end = p;
            }
        }
        if let Some(&l) = curve.loading.last() {
            if l > self.y_end {
                self.y_end = l;
            }
        }
        self.curves.push(curve);
    }
}
