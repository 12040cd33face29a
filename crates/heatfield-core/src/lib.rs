#![forbid(unsafe_code)]

//! Core types for the heatfield engine.
//!
//! Everything here is a leaf: no per-frame state lives in this crate. The
//! pipeline itself (accumulation, diffusion, field evaluation) is in
//! `heatfield-fx`, which consumes these types.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`geometry`] | `Size`, `Point`, source-to-output mapping |
//! | [`color`] | `PackedRgba` and luminance |
//! | [`gradient`] | Color stops and piecewise-linear gradients |
//! | [`palette`] | Built-in palettes and custom gradients |
//! | [`config`] | Flat, hot-swappable engine configuration |
//! | [`sample`] | Energy samples delivered by input adapters |
//! | [`logging`] | Tracing macros (no-ops without the `tracing` feature) |

pub mod color;
pub mod config;
pub mod geometry;
pub mod gradient;
pub mod logging;
pub mod palette;
pub mod sample;

#[cfg(feature = "tracing")]
pub use logging::{debug, debug_span, info, trace, warn};

pub use color::PackedRgba;
pub use config::{ConfigError, ConfigParse, EngineConfig, RendererKind, ViewMode};
pub use geometry::{FitMode, Point, Size, SourceMapping};
pub use gradient::{ColorGradient, ColorStop, GradientError};
pub use palette::Palette;
pub use sample::{
    Keypoint, KeypointFrame, OccupancyMask, Pose, SampleSet, SampleSlot, VideoFrame,
};
