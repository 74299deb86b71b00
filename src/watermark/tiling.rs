//! Tile grid geometry for the stamp layer.
//!
//! Spacing derives from the stamp text's diagonal so that tiles never
//! overlap at any rotation, and the grid is padded two rows/columns beyond
//! the page so rotated tiles are not clipped at the edges.

use super::canvas::{PageSize, TextExtent};

/// Placement of a single stamp instance, in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilePlacement {
    pub x: f64,
    pub y: f64,
}

/// The computed grid for one page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileGrid {
    pub cols: u32,
    pub rows: u32,
    pub spacing_x: f64,
    pub spacing_y: f64,
    origin_x: f64,
    origin_y: f64,
    center_x: f64,
    center_y: f64,
}

impl TileGrid {
    /// Plan the grid covering `page` for a stamp of the given extent.
    ///
    /// Spacing is twice the stamp diagonal on both axes. Column and row
    /// counts are `ceil(extent / spacing) + 2`; the origin sits one spacing
    /// before the page's visual origin so the padded grid stays centered.
    pub fn plan(page: PageSize, stamp: TextExtent) -> Self {
        let d = stamp.diagonal();
        let spacing = 2.0 * d;

        let cols = (page.width / spacing).ceil() as u32 + 2;
        let rows = (page.height / spacing).ceil() as u32 + 2;

        Self {
            cols,
            rows,
            spacing_x: spacing,
            spacing_y: spacing,
            origin_x: -spacing,
            origin_y: -spacing,
            center_x: page.width / 2.0,
            center_y: page.height / 2.0,
        }
    }

    pub fn tile_count(&self) -> u64 {
        u64::from(self.cols) * u64::from(self.rows)
    }

    /// All placements in row-major order.
    pub fn placements(&self) -> impl Iterator<Item = TilePlacement> + '_ {
        let grid = *self;
        (0..grid.rows).flat_map(move |row| {
            (0..grid.cols).map(move |col| TilePlacement {
                x: grid.origin_x + f64::from(col) * grid.spacing_x + grid.center_x,
                y: grid.origin_y + f64::from(row) * grid.spacing_y + grid.center_y,
            })
        })
    }
}
