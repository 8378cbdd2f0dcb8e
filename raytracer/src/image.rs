//! Sensor Images

use crate::rays::PixelIndex;
use lfm_core::common::*;
use lfm_core::error::*;

/// Row-major 2D grid.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Grid<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

/// Image of per-pixel values.
pub type Image = Grid<Float>;

/// Per-pixel flags.
pub type PixelMask = Grid<bool>;

impl<T: Copy + Default> Grid<T> {
    /// Create a grid filled with the default value.
    ///
    /// * `rows` - Number of rows.
    /// * `cols` - Number of columns.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![T::default(); rows * cols],
        }
    }

    /// Create a grid from row-major data.
    ///
    /// * `rows` - Number of rows.
    /// * `cols` - Number of columns.
    /// * `data` - Values.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(RaytraceError::ShapeMismatch {
                expected: vec![rows, cols],
                found: vec![data.len()],
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Create a grid of `rows x cols` with `values[i]` at `pixels[i]` and the
    /// default value everywhere else.
    ///
    /// * `rows`   - Number of rows.
    /// * `cols`   - Number of columns.
    /// * `pixels` - Pixel of each value.
    /// * `values` - Values.
    pub fn scatter(rows: usize, cols: usize, pixels: &[PixelIndex], values: &[T]) -> Result<Self> {
        if pixels.len() != values.len() {
            return Err(RaytraceError::ShapeMismatch {
                expected: vec![pixels.len()],
                found: vec![values.len()],
            });
        }
        let mut grid = Self::new(rows, cols);
        for (&(row, col), &value) in pixels.iter().zip(values.iter()) {
            grid.set(row, col, value)?;
        }
        Ok(grid)
    }

    /// Returns the number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns the row-major values.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Returns the value at a pixel, or `None` outside the grid.
    ///
    /// * `row` - Row.
    /// * `col` - Column.
    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    /// Sets the value at a pixel.
    ///
    /// * `row`   - Row.
    /// * `col`   - Column.
    /// * `value` - The value.
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows || col >= self.cols {
            return Err(RaytraceError::ShapeMismatch {
                expected: vec![self.rows, self.cols],
                found: vec![row + 1, col + 1],
            });
        }
        self.data[row * self.cols + col] = value;
        Ok(())
    }

    /// Copies `tile` into this grid with its top-left corner at `origin`.
    ///
    /// * `tile`   - The tile.
    /// * `origin` - Top-left pixel of the tile.
    pub fn place_tile(&mut self, tile: &Self, origin: PixelIndex) -> Result<()> {
        let (row0, col0) = origin;
        if row0 + tile.rows > self.rows || col0 + tile.cols > self.cols {
            return Err(RaytraceError::ShapeMismatch {
                expected: vec![self.rows, self.cols],
                found: vec![row0 + tile.rows, col0 + tile.cols],
            });
        }
        for row in 0..tile.rows {
            let src = &tile.data[row * tile.cols..(row + 1) * tile.cols];
            let start = (row0 + row) * self.cols + col0;
            self.data[start..start + tile.cols].copy_from_slice(src);
        }
        Ok(())
    }

    /// Returns a copy of the `rows x cols` region with its top-left corner at
    /// `origin`.
    ///
    /// * `origin` - Top-left pixel of the region.
    /// * `rows`   - Number of rows.
    /// * `cols`   - Number of columns.
    pub fn sub_image(&self, origin: PixelIndex, rows: usize, cols: usize) -> Result<Self> {
        let (row0, col0) = origin;
        if row0 + rows > self.rows || col0 + cols > self.cols {
            return Err(RaytraceError::ShapeMismatch {
                expected: vec![self.rows, self.cols],
                found: vec![row0 + rows, col0 + cols],
            });
        }
        let mut data = Vec::with_capacity(rows * cols);
        for row in row0..row0 + rows {
            let start = row * self.cols + col0;
            data.extend_from_slice(&self.data[start..start + cols]);
        }
        Ok(Self { rows, cols, data })
    }

    /// Joins grids of equal height left to right.
    ///
    /// * `grids` - The grids.
    pub fn concat_horizontal(grids: &[Self]) -> Result<Self> {
        let rows = grids.first().map_or(0, |g| g.rows);
        if let Some(g) = grids.iter().find(|g| g.rows != rows) {
            return Err(RaytraceError::ShapeMismatch {
                expected: vec![rows],
                found: vec![g.rows],
            });
        }
        let cols = grids.iter().map(|g| g.cols).sum();
        let mut data = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for g in grids.iter() {
                data.extend_from_slice(&g.data[row * g.cols..(row + 1) * g.cols]);
            }
        }
        Ok(Self { rows, cols, data })
    }

    /// Joins grids of equal width top to bottom.
    ///
    /// * `grids` - The grids.
    pub fn concat_vertical(grids: &[Self]) -> Result<Self> {
        let cols = grids.first().map_or(0, |g| g.cols);
        if let Some(g) = grids.iter().find(|g| g.cols != cols) {
            return Err(RaytraceError::ShapeMismatch {
                expected: vec![cols],
                found: vec![g.cols],
            });
        }
        let rows = grids.iter().map(|g| g.rows).sum();
        let data = grids.iter().flat_map(|g| g.data.iter().copied()).collect();
        Ok(Self { rows, cols, data })
    }
}

impl Image {
    /// Returns the largest absolute difference between two images of the same
    /// shape, or infinity if the shapes differ.
    ///
    /// * `other` - The other image.
    pub fn max_abs_diff(&self, other: &Self) -> Float {
        if self.rows != other.rows || self.cols != other.cols {
            return Float::INFINITY;
        }
        self.data
            .iter()
            .zip(other.data.iter())
            .fold(0.0, |acc, (a, b)| max(acc, (a - b).abs()))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(rows: usize, cols: usize, start: Float) -> Image {
        Image::from_vec(rows, cols, (0..rows * cols).map(|i| start + i as Float).collect()).unwrap()
    }

    #[test]
    fn scatter_leaves_unhit_pixels_at_zero() {
        let img = Image::scatter(2, 3, &[(0, 1), (1, 2)], &[5.0, 7.0]).unwrap();
        assert_eq!(img.data(), &[0.0, 5.0, 0.0, 0.0, 0.0, 7.0]);
        assert!(Image::scatter(2, 3, &[(2, 0)], &[1.0]).is_err());
    }

    #[test]
    fn place_tile_then_sub_image() {
        let mut img = Image::new(4, 4);
        let tile = ramp(2, 2, 1.0);
        img.place_tile(&tile, (1, 2)).unwrap();
        assert_eq!(img.get(1, 2), Some(1.0));
        assert_eq!(img.get(2, 3), Some(4.0));
        assert_eq!(img.get(0, 0), Some(0.0));
        assert_eq!(img.sub_image((1, 2), 2, 2).unwrap(), tile);
        assert!(img.place_tile(&tile, (3, 3)).is_err());
    }

    #[test]
    fn concat_matches_place_tile() {
        let tiles = [ramp(2, 2, 0.0), ramp(2, 2, 10.0), ramp(2, 2, 20.0), ramp(2, 2, 30.0)];
        let top = Image::concat_horizontal(&tiles[0..2]).unwrap();
        let bottom = Image::concat_horizontal(&tiles[2..4]).unwrap();
        let joined = Image::concat_vertical(&[top, bottom]).unwrap();

        let mut placed = Image::new(4, 4);
        for (i, tile) in tiles.iter().enumerate() {
            placed.place_tile(tile, ((i / 2) * 2, (i % 2) * 2)).unwrap();
        }
        assert_eq!(joined, placed);
    }

    #[test]
    fn concat_rejects_mismatched_shapes() {
        assert!(Image::concat_horizontal(&[ramp(2, 2, 0.0), ramp(3, 2, 0.0)]).is_err());
        assert!(Image::concat_vertical(&[ramp(2, 2, 0.0), ramp(2, 3, 0.0)]).is_err());
    }

    #[test]
    fn mask_grid() {
        let mask = PixelMask::scatter(2, 2, &[(1, 0)], &[true]).unwrap();
        assert_eq!(mask.data(), &[false, false, true, false]);
        assert_eq!(mask.get(5, 0), None);
    }
}
