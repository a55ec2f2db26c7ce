// SPDX-License-Identifier: GPL-3.0-only

//! Typed pixel grids shared by frame sources and the capture pipeline

use crate::constants::sensor;
use crate::errors::GridSizeError;

/// One color sample, RGB order
pub type Rgb = [u8; 3];

/// Fixed-size row-major 2D array of samples
///
/// Grids are never resized after construction. Transformations such as
/// hole filling produce a new grid rather than mutating the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid<T> {
    width: u32,
    height: u32,
    data: Vec<T>,
}

/// Per-pixel distance samples in millimeters, `0` meaning no reading
pub type DepthGrid = Grid<u16>;

/// Per-pixel color samples, pixel-aligned with a [`DepthGrid`]
pub type ColorGrid = Grid<Rgb>;

impl<T: Copy> Grid<T> {
    /// Create a grid with every sample set to `value`
    pub fn filled(width: u32, height: u32, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width as usize * height as usize],
        }
    }

    /// Wrap a row-major buffer, checking that it matches the dimensions
    pub fn from_vec(width: u32, height: u32, data: Vec<T>) -> Result<Self, GridSizeError> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(GridSizeError {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build a grid by evaluating `f(x, y)` for every pixel in row-major order
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> T) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Total number of pixels
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Sample at `(x, y)`, or `None` outside the grid
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Option<T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Row-major view of all samples
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Iterate `(x, y, sample)` in row-major order
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32, T)> + '_ {
        let width = self.width.max(1);
        self.data
            .iter()
            .enumerate()
            .map(move |(i, &v)| (i as u32 % width, i as u32 / width, v))
    }
}

impl DepthGrid {
    /// Number of pixels with no reading
    pub fn hole_count(&self) -> usize {
        self.data
            .iter()
            .filter(|&&d| d == sensor::NO_READING)
            .count()
    }
}

impl ColorGrid {
    /// Wrap a packed RGB24 buffer (3 bytes per pixel)
    pub fn from_rgb_bytes(width: u32, height: u32, bytes: &[u8]) -> Result<Self, GridSizeError> {
        let expected = width as usize * height as usize;
        if bytes.len() != expected * sensor::COLOR_CHANNELS {
            return Err(GridSizeError {
                width,
                height,
                expected,
                actual: bytes.len() / sensor::COLOR_CHANNELS,
            });
        }
        let data = bytes
            .chunks_exact(sensor::COLOR_CHANNELS)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        Ok(Self {
            width,
            height,
            data,
        })
    }
}
