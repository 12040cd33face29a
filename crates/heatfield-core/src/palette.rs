#![forbid(unsafe_code)]

//! Named palettes.
//!
//! Each variant either carries a stop table (sampled with the same rules as
//! [`ColorGradient`]) or is a procedural `t -> RGB` function. Every palette
//! is continuous over `[0, 1]` and has fixed endpoint colors.

use std::fmt;

use crate::color::PackedRgba;
use crate::gradient::{ColorGradient, ColorStop, sample_stops};

const EMBER_STOPS: [ColorStop; 8] = [
    ColorStop::new(0.0, PackedRgba::rgb(10, 5, 30)),
    ColorStop::new(0.15, PackedRgba::rgb(30, 5, 60)),
    ColorStop::new(0.3, PackedRgba::rgb(60, 10, 100)),
    ColorStop::new(0.45, PackedRgba::rgb(140, 0, 120)),
    ColorStop::new(0.6, PackedRgba::rgb(200, 30, 80)),
    ColorStop::new(0.75, PackedRgba::rgb(255, 80, 0)),
    ColorStop::new(0.9, PackedRgba::rgb(255, 180, 50)),
    ColorStop::new(1.0, PackedRgba::rgb(255, 255, 200)),
];

const THERMAL_STOPS: [ColorStop; 5] = [
    ColorStop::new(0.0, PackedRgba::rgb(0, 0, 0)),
    ColorStop::new(0.2, PackedRgba::rgb(0, 0, 100)),
    ColorStop::new(0.45, PackedRgba::rgb(255, 0, 0)),
    ColorStop::new(0.7, PackedRgba::rgb(255, 200, 0)),
    ColorStop::new(1.0, PackedRgba::rgb(255, 255, 255)),
];

const COOL_STOPS: [ColorStop; 4] = [
    ColorStop::new(0.0, PackedRgba::rgb(0, 0, 0)),
    ColorStop::new(0.3, PackedRgba::rgb(0, 60, 120)),
    ColorStop::new(0.6, PackedRgba::rgb(0, 255, 200)),
    ColorStop::new(1.0, PackedRgba::rgb(180, 255, 255)),
];

/// Color mapping applied to normalized heat.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Palette {
    /// Deep violet through magenta and orange to cream.
    #[default]
    Ember,
    /// Black, blue, red, yellow, white.
    Thermal,
    /// Black through teal to pale cyan.
    Cool,
    /// Procedural: `r = |3t - 1.5| - 0.2`, `g = sin(pi t)`, `b = 1 - |2t - 0.8|`,
    /// each clamped to `[0, 1]`. Endpoints are `(255, 0, 51)` and `(255, 0, 0)`.
    Plasma,
    /// A user-supplied stop table.
    Custom(ColorGradient),
}

impl Palette {
    /// The built-in palettes, in display order.
    pub const BUILTIN: [Palette; 4] = [
        Palette::Ember,
        Palette::Thermal,
        Palette::Cool,
        Palette::Plasma,
    ];

    /// Look up a built-in palette by name (case-insensitive).
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "ember" => Some(Self::Ember),
            "thermal" => Some(Self::Thermal),
            "cool" => Some(Self::Cool),
            "plasma" => Some(Self::Plasma),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ember => "ember",
            Self::Thermal => "thermal",
            Self::Cool => "cool",
            Self::Plasma => "plasma",
            Self::Custom(_) => "custom",
        }
    }

    /// Color at normalized heat `t`; `t` is clamped to `[0, 1]`.
    pub fn color_at(&self, t: f32) -> PackedRgba {
        match self {
            Self::Ember => sample_stops(&EMBER_STOPS, t),
            Self::Thermal => sample_stops(&THERMAL_STOPS, t),
            Self::Cool => sample_stops(&COOL_STOPS, t),
            Self::Plasma => plasma(t),
            Self::Custom(gradient) => gradient.sample(t),
        }
    }

    /// Colors at `t = 0` and `t = 1`.
    pub fn endpoints(&self) -> (PackedRgba, PackedRgba) {
        (self.color_at(0.0), self.color_at(1.0))
    }

    /// Stop table, if this palette is table-driven.
    pub fn stops(&self) -> Option<&[ColorStop]> {
        match self {
            Self::Ember => Some(&EMBER_STOPS),
            Self::Thermal => Some(&THERMAL_STOPS),
            Self::Cool => Some(&COOL_STOPS),
            Self::Plasma => None,
            Self::Custom(gradient) => Some(gradient.stops()),
        }
    }
}

impl fmt::Display for Palette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn plasma(t: f32) -> PackedRgba {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let r = (3.0 * t - 1.5).abs() - 0.2;
    let g = (std::f32::consts::PI * t).sin();
    let b = 1.0 - (2.0 * t - 0.8).abs();
    PackedRgba::rgb(unit_to_u8(r), unit_to_u8(g), unit_to_u8(b))
}

#[inline]
fn unit_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tables_are_valid_gradients() {
        for palette in Palette::BUILTIN {
            if let Some(stops) = palette.stops() {
                assert!(
                    ColorGradient::new(stops.to_vec()).is_ok(),
                    "{palette} table invalid"
                );
            }
        }
    }

    #[test]
    fn ember_endpoints() {
        assert_eq!(
            Palette::Ember.endpoints(),
            (PackedRgba::rgb(10, 5, 30), PackedRgba::rgb(255, 255, 200))
        );
    }

    #[test]
    fn ember_hits_interior_stops_exactly() {
        assert_eq!(Palette::Ember.color_at(0.75), PackedRgba::rgb(255, 80, 0));
        assert_eq!(Palette::Ember.color_at(0.45), PackedRgba::rgb(140, 0, 120));
    }

    #[test]
    fn plasma_endpoints_are_documented() {
        assert_eq!(
            Palette::Plasma.endpoints(),
            (PackedRgba::rgb(255, 0, 51), PackedRgba::rgb(255, 0, 0))
        );
    }

    #[test]
    fn plasma_is_continuous() {
        let mut prev = Palette::Plasma.color_at(0.0);
        for i in 1..=1000 {
            let c = Palette::Plasma.color_at(i as f32 / 1000.0);
            for (a, b) in prev.to_array().iter().zip(c.to_array()) {
                assert!(a.abs_diff(b) <= 3, "jump at step {i}: {prev:?} -> {c:?}");
            }
            prev = c;
        }
    }

    #[test]
    fn parse_and_name_agree() {
        for palette in Palette::BUILTIN {
            assert_eq!(Palette::parse(palette.name()), Some(palette.clone()));
        }
        assert_eq!(Palette::parse("THERMAL"), Some(Palette::Thermal));
        assert_eq!(Palette::parse("rainbow"), None);
    }

    #[test]
    fn custom_delegates_to_gradient() {
        let g = ColorGradient::parse("0:000000,1:ff0000").unwrap();
        let p = Palette::Custom(g);
        assert_eq!(p.name(), "custom");
        assert_eq!(p.color_at(1.0), PackedRgba::rgb(255, 0, 0));
    }
}
