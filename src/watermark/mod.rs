//! Watermark module: per-viewer stamp tiling over page-oriented documents.
//!
//! Every delivered document is a fresh derivative with the viewer's stamp
//! tiled across all pages. The tiling math lives in [`tiling`] and is
//! library-independent; [`pdf_canvas`] binds it to PDF via lopdf.
//!
//! # Pipeline position
//!
//! Runs after the integrity gate and before derivative storage. A document
//! that passed integrity can still fail here with
//! [`WatermarkError::RenderFailure`] when the container does not decode.

pub mod canvas;
pub mod error;
pub mod pdf_canvas;
pub mod renderer;
pub mod style;
pub mod template;
pub mod tiling;

#[cfg(test)]
pub mod test_pdf;

// Re-export main types for convenience
pub use canvas::{PageCanvas, PageSize, TextExtent};
pub use error::WatermarkError;
pub use pdf_canvas::PdfCanvas;
pub use renderer::{stamp_pages, WatermarkRenderer};
pub use style::{parse_hex_color, Color, StampStyle};
pub use template::{resolve_stamp, StampContext};
pub use tiling::{TileGrid, TilePlacement};
