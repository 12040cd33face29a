#![forbid(unsafe_code)]

//! Piecewise-linear color gradients.
//!
//! A [`ColorGradient`] is an ordered list of [`ColorStop`]s covering the
//! closed interval `[0, 1]`. Sampling finds the bracketing pair with
//! `stops[i].heat <= h < stops[i + 1].heat` and interpolates each channel
//! independently. Values at or above the last stop return the last color,
//! so `h == 1.0` is inside the domain.
//!
//! # Example
//!
//! ```
//! use heatfield_core::{ColorGradient, ColorStop, PackedRgba};
//!
//! let g = ColorGradient::new(vec![
//!     ColorStop::new(0.0, PackedRgba::BLACK),
//!     ColorStop::new(1.0, PackedRgba::WHITE),
//! ])
//! .unwrap();
//! assert_eq!(g.sample(1.0), PackedRgba::WHITE);
//! ```

use std::fmt;

use crate::color::PackedRgba;

/// One anchor of a gradient: a heat fraction and the color shown there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    /// Position in `[0, 1]`.
    pub heat: f32,
    pub color: PackedRgba,
}

impl ColorStop {
    #[inline]
    pub const fn new(heat: f32, color: PackedRgba) -> Self {
        Self { heat, color }
    }
}

/// Why a stop table was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum GradientError {
    /// Fewer than two stops.
    TooFewStops,
    /// A stop heat is NaN or infinite.
    NonFinite { index: usize },
    /// A stop heat lies outside `[0, 1]`.
    OutOfRange { index: usize, heat: f32 },
    /// `stops[index].heat` is not strictly greater than the previous stop.
    Unsorted { index: usize },
    /// The first stop is not at 0.
    MissingStart { heat: f32 },
    /// The last stop is not at 1.
    MissingEnd { heat: f32 },
    /// A textual `heat:rrggbb` entry could not be parsed.
    Malformed { entry: String },
}

impl fmt::Display for GradientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewStops => write!(f, "gradient needs at least two stops"),
            Self::NonFinite { index } => write!(f, "stop {index} has a non-finite heat"),
            Self::OutOfRange { index, heat } => {
                write!(f, "stop {index} heat {heat} is outside [0, 1]")
            }
            Self::Unsorted { index } => {
                write!(f, "stop {index} is not above the previous stop")
            }
            Self::MissingStart { heat } => {
                write!(f, "first stop must be at 0 (found {heat})")
            }
            Self::MissingEnd { heat } => write!(f, "last stop must be at 1 (found {heat})"),
            Self::Malformed { entry } => {
                write!(f, "malformed stop {entry:?} (expected heat:rrggbb)")
            }
        }
    }
}

impl std::error::Error for GradientError {}

/// A validated, immutable stop table.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorGradient {
    stops: Vec<ColorStop>,
}

impl ColorGradient {
    /// Validate and wrap a stop table.
    ///
    /// Stops must be finite, within `[0, 1]`, strictly ascending, and start
    /// at exactly 0 and end at exactly 1.
    pub fn new(stops: Vec<ColorStop>) -> Result<Self, GradientError> {
        validate_stops(&stops)?;
        Ok(Self { stops })
    }

    /// Parse a comma-separated `heat:rrggbb` list, e.g.
    /// `"0:0a051e,0.5:ff5000,1:ffffc8"`.
    pub fn parse(value: &str) -> Result<Self, GradientError> {
        let mut stops = Vec::new();
        for entry in value.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let malformed = || GradientError::Malformed {
                entry: entry.to_string(),
            };
            let (heat, hex) = entry.split_once(':').ok_or_else(malformed)?;
            let heat: f32 = heat.trim().parse().map_err(|_| malformed())?;
            let color = PackedRgba::from_hex(hex).ok_or_else(malformed)?;
            stops.push(ColorStop::new(heat, color));
        }
        Self::new(stops)
    }

    /// The validated stops, ascending.
    #[inline]
    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }

    /// Color at normalized heat `h`. Input is clamped to `[0, 1]`; NaN maps to 0.
    #[inline]
    pub fn sample(&self, h: f32) -> PackedRgba {
        sample_stops(&self.stops, h)
    }
}

impl fmt::Display for ColorGradient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stop) in self.stops.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            let c = stop.color;
            write!(f, "{}:{:02x}{:02x}{:02x}", stop.heat, c.r(), c.g(), c.b())?;
        }
        Ok(())
    }
}

fn validate_stops(stops: &[ColorStop]) -> Result<(), GradientError> {
    if stops.len() < 2 {
        return Err(GradientError::TooFewStops);
    }
    for (index, stop) in stops.iter().enumerate() {
        if !stop.heat.is_finite() {
            return Err(GradientError::NonFinite { index });
        }
        if !(0.0..=1.0).contains(&stop.heat) {
            return Err(GradientError::OutOfRange {
                index,
                heat: stop.heat,
            });
        }
        if index > 0 && stop.heat <= stops[index - 1].heat {
            return Err(GradientError::Unsorted { index });
        }
    }
    let first = stops[0].heat;
    if first != 0.0 {
        return Err(GradientError::MissingStart { heat: first });
    }
    let last = stops[stops.len() - 1].heat;
    if last != 1.0 {
        return Err(GradientError::MissingEnd { heat: last });
    }
    Ok(())
}

/// Sample an ascending stop slice at `h`.
///
/// Shared by [`ColorGradient`] and the built-in palette tables, which are
/// `const` slices and skip runtime validation.
pub(crate) fn sample_stops(stops: &[ColorStop], h: f32) -> PackedRgba {
    let Some(last) = stops.last() else {
        return PackedRgba::BLACK;
    };
    let h = if h.is_nan() { 0.0 } else { h.clamp(0.0, 1.0) };
    if h >= last.heat {
        return last.color;
    }
    for pair in stops.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if h >= lo.heat && h < hi.heat {
            let t = (h - lo.heat) / (hi.heat - lo.heat);
            return lo.color.lerp(hi.color, t);
        }
    }
    // Only reachable when h sits below the first stop.
    stops[0].color
}
