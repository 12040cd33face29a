#![forbid(unsafe_code)]

pub mod dense;
pub mod metaballs;

pub use dense::DenseFieldRenderer;
pub use metaballs::GridMetaballRenderer;

use heatfield_core::{EngineConfig, RendererKind, Size};

use crate::field::FieldRenderer;

/// Build the renderer selected by `config.renderer`.
pub fn build(config: &EngineConfig, output: Size) -> Box<dyn FieldRenderer + Send> {
    match config.renderer {
        RendererKind::Metaballs => Box::new(GridMetaballRenderer::new(config, output)),
        RendererKind::Dense => Box::new(DenseFieldRenderer::new(config, output)),
    }
}
