//! Page canvas capability.
//!
//! The tiling algorithm is independent of any concrete document library; it
//! only needs to measure text, know page geometry, and place rotated glyph
//! runs. [`PageCanvas`] is that seam: the production implementation is the
//! lopdf-backed [`super::pdf_canvas::PdfCanvas`], tests use a recording
//! canvas that counts draw calls.

use super::{StampStyle, WatermarkError};

/// Page dimensions in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

/// Rendered extent of a piece of text at a given font size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextExtent {
    pub width: f64,
    pub height: f64,
}

impl TextExtent {
    /// Diagonal of the text's bounding box. This is the footprint the text
    /// can occupy at any rotation, so tile spacing is derived from it.
    pub fn diagonal(&self) -> f64 {
        self.width.hypot(self.height)
    }
}

/// Drawing surface for one document.
///
/// Implementations accumulate stamp draws and bake them into a new byte
/// stream when the render completes. Page indices are 0-based and stable
/// across the life of the canvas.
pub trait PageCanvas {
    fn page_count(&self) -> usize;

    fn page_size(&self, page: usize) -> Result<PageSize, WatermarkError>;

    /// Measure `text` at `font_size` in the canvas's stamp font.
    fn measure_text(&self, text: &str, font_size: f64) -> TextExtent;

    /// Place one glyph run centered at `(x, y)` in page coordinates, rotated
    /// and blended per `style`. Rotation and opacity are render parameters
    /// of the run itself, not post-processing.
    fn draw_rotated_text(
        &mut self,
        page: usize,
        x: f64,
        y: f64,
        text: &str,
        style: &StampStyle,
    ) -> Result<(), WatermarkError>;
}

/// Test double that records every draw call instead of rendering.
#[cfg(test)]
pub struct RecordingCanvas {
    pub pages: Vec<PageSize>,
    /// Fixed extent returned by `measure_text`, letting tests pick the
    /// diagonal exactly.
    pub extent: TextExtent,
    /// One entry per draw call: (page, x, y).
    pub draws: Vec<(usize, f64, f64)>,
}

#[cfg(test)]
impl RecordingCanvas {
    pub fn new(pages: Vec<PageSize>, extent: TextExtent) -> Self {
        Self {
            pages,
            extent,
            draws: Vec::new(),
        }
    }

    pub fn draws_on_page(&self, page: usize) -> usize {
        self.draws.iter().filter(|(p, _, _)| *p == page).count()
    }
}

#[cfg(test)]
impl PageCanvas for RecordingCanvas {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_size(&self, page: usize) -> Result<PageSize, WatermarkError> {
        self.pages
            .get(page)
            .copied()
            .ok_or_else(|| WatermarkError::RenderFailure(format!("page {} out of range", page)))
    }

    fn measure_text(&self, _text: &str, _font_size: f64) -> TextExtent {
        self.extent
    }

    fn draw_rotated_text(
        &mut self,
        page: usize,
        x: f64,
        y: f64,
        _text: &str,
        _style: &StampStyle,
    ) -> Result<(), WatermarkError> {
        self.draws.push((page, x, y));
        Ok(())
    }
}
