#![forbid(unsafe_code)]

//! Per-frame heat-field pipeline.
//!
//! Each frame runs to completion before the next input is accepted:
//!
//! 1. take the latest [`SampleSet`](heatfield_core::SampleSet), if any
//! 2. decay accumulated energy ([`TemporalDecay`])
//! 3. inject new energy ([`HeatGrid`] or [`DecayBuffer`])
//! 4. extract blobs or diffuse ([`BlobExtractor`], [`SpatialSmoother`])
//! 5. evaluate the visible field ([`MetaballField`] or [`BilinearUpsampler`])
//! 6. map to color ([`ColorMapper`]) and write the [`Raster`]
//!
//! The two strategies are [`FieldRenderer`] implementations owned by a
//! [`HeatEngine`].

pub mod blob;
pub mod decay;
pub mod dense;
pub mod engine;
pub mod field;
pub mod grid;
pub mod mapper;
pub mod metaball;
pub mod motion;
pub mod raster;
pub mod smoother;
pub mod upsample;

pub use blob::{Blob, BlobExtractor};
pub use decay::TemporalDecay;
pub use dense::DecayBuffer;
pub use engine::{EngineError, FrameStats, HeatEngine};
pub use field::renderers::{DenseFieldRenderer, GridMetaballRenderer};
pub use field::{FieldContext, FieldRenderer, FieldStats};
pub use grid::HeatGrid;
pub use mapper::ColorMapper;
pub use metaball::{FieldSample, MetaballField, MetaballParams};
pub use motion::MotionDetector;
pub use raster::Raster;
pub use smoother::SpatialSmoother;
pub use upsample::BilinearUpsampler;
