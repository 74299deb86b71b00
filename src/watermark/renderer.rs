//! Stamp renderer: drives the tiling algorithm over a [`PageCanvas`].

use super::canvas::PageCanvas;
use super::pdf_canvas::PdfCanvas;
use super::tiling::TileGrid;
use super::{StampStyle, WatermarkError};
use tracing::debug;

/// Tile `text` across every page of `canvas` per `style`.
///
/// Each page is measured and planned independently, so mixed page sizes get
/// correctly-sized grids. Returns the total number of tiles placed.
pub fn stamp_pages<C: PageCanvas>(
    canvas: &mut C,
    text: &str,
    style: &StampStyle,
) -> Result<u64, WatermarkError> {
    let extent = canvas.measure_text(text, style.font_size);
    if extent.width <= 0.0 {
        return Err(WatermarkError::InvalidStyle(
            "stamp text measures to zero width".to_string(),
        ));
    }

    let mut total = 0u64;
    for page in 0..canvas.page_count() {
        let size = canvas.page_size(page)?;
        let grid = TileGrid::plan(size, extent);
        for placement in grid.placements() {
            canvas.draw_rotated_text(page, placement.x, placement.y, text, style)?;
        }
        debug!(
            page,
            cols = grid.cols,
            rows = grid.rows,
            "stamped page"
        );
        total += grid.tile_count();
    }
    Ok(total)
}

/// Produces a per-viewer stamped derivative from original document bytes.
///
/// Stateless; one value serves concurrent renders. Every call decodes its
/// own canvas, so requests share no mutable state.
#[derive(Debug, Clone, Copy, Default)]
pub struct WatermarkRenderer;

impl WatermarkRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Decode `original`, tile `stamp_text` across every page, and return
    /// the new document bytes. Page count and order are preserved.
    pub fn render(
        &self,
        original: &[u8],
        stamp_text: &str,
        style: &StampStyle,
    ) -> Result<Vec<u8>, WatermarkError> {
        style.validate()?;
        if stamp_text.is_empty() {
            return Err(WatermarkError::InvalidStyle(
                "stamp text is empty".to_string(),
            ));
        }

        let mut canvas = PdfCanvas::open(original)?;
        let tiles = stamp_pages(&mut canvas, stamp_text, style)?;
        debug!(pages = canvas.page_count(), tiles, "render complete");
        canvas.into_bytes()
    }
}
