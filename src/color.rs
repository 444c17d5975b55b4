use std::fmt;

use palette::{Hsl, IntoColor, Srgb};
use serde::{Serialize, Serializer};

/// Number of entries in the isotherm palette before it wraps around.
pub const ISOTHERM_PALETTE_SIZE: usize = 20;

// ---------------------------------------------------------------------------
// Rgb – an 8-bit colour handed to the display layer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Colour of the synthesized median curve, never drawn from a palette.
    pub const MEDIAN: Rgb = Rgb(0, 0, 0);
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Rgb> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.45);
            let rgb: Srgb = hsl.into_color();
            Rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// CyclicPalette – session-wide colour sequence for measured isotherms
// ---------------------------------------------------------------------------

/// Hands out palette colours in order and wraps around at the end.
#[derive(Debug, Clone)]
pub struct CyclicPalette {
    colors: Vec<Rgb>,
    next: usize,
}

impl Default for CyclicPalette {
    fn default() -> Self {
        Self::new(ISOTHERM_PALETTE_SIZE)
    }
}

impl CyclicPalette {
    pub fn new(size: usize) -> Self {
        Self {
            colors: generate_palette(size.max(1)),
            next: 0,
        }
    }

    /// Next colour in the cycle.
    pub fn next_color(&mut self) -> Rgb {
        let color = self.colors[self.next];
        self.next = (self.next + 1) % self.colors.len();
        color
    }
}
