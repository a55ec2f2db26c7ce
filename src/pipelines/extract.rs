// SPDX-License-Identifier: GPL-3.0-only

//! Foreground extraction against the background key
//!
//! A pixel is foreground when it has a reading and is closer to the camera
//! than the key surface by more than `key_distance` depth units. Foreground
//! pixels are lifted to camera space with a fixed pinhole approximation and
//! take the color of the aligned color pixel.

use super::key::{BackgroundKey, KeyDepth};
use crate::backends::{ColorGrid, DepthGrid};
use crate::constants::{projection, sensor};
use crate::stream::Point;

/// Converts depth + color frames into foreground points
#[derive(Debug, Clone)]
pub struct FrameExtractor {
    key: BackgroundKey,
    key_distance: u16,
}

impl FrameExtractor {
    pub fn new(key: BackgroundKey, key_distance: u16) -> Self {
        Self { key, key_distance }
    }

    pub fn key(&self) -> &BackgroundKey {
        &self.key
    }

    pub fn key_distance(&self) -> u16 {
        self.key_distance
    }

    /// Whether a depth sample at `(x, y)` is foreground
    #[inline]
    pub fn is_foreground(&self, x: u32, y: u32, depth: u16) -> bool {
        if depth == sensor::NO_READING {
            return false;
        }
        match self.key.depth_at(x, y) {
            // Keep only strictly closer than (key - key_distance)
            Some(KeyDepth::Surface(key)) => {
                i32::from(depth) < i32::from(key) - i32::from(self.key_distance)
            }
            Some(KeyDepth::Unfilled) | None => false,
        }
    }

    /// Extract foreground points in row-major scan order
    pub fn extract(&self, depth: &DepthGrid, color: &ColorGrid) -> Vec<Point> {
        let mut points = Vec::new();
        self.extract_into(depth, color, &mut points);
        points
    }

    /// Like [`Self::extract`], reusing `out`'s allocation
    ///
    /// Pixels missing from any of the three grids are skipped.
    pub fn extract_into(&self, depth: &DepthGrid, color: &ColorGrid, out: &mut Vec<Point>) {
        out.clear();
        let (width, height) = depth.dimensions();
        for (x, y, d) in depth.pixels() {
            if !self.is_foreground(x, y, d) {
                continue;
            }
            let Some(rgb) = color.get(x, y) else {
                continue;
            };
            out.push(Point::new(project(x, y, d, width, height), rgb));
        }
    }
}

/// Lift pixel `(x, y)` with depth `d` into camera space (meters)
pub fn project(x: u32, y: u32, d: u16, width: u32, height: u32) -> [f32; 3] {
    let z = f32::from(d) * projection::DEPTH_SCALE_M;
    let dx = x as f32 - (width / 2) as f32;
    let dy = y as f32 - (height / 2) as f32;
    [
        dx * z * projection::PIXEL_SCALE,
        dy * z * projection::PIXEL_SCALE,
        z,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: u32 = 8;
    const H: u32 = 6;

    fn flat_key(value: u16) -> BackgroundKey {
        BackgroundKey::from_grid(DepthGrid::filled(W, H, value))
    }

    fn single_pixel(x: u32, y: u32, d: u16) -> DepthGrid {
        DepthGrid::from_fn(W, H, |px, py| if (px, py) == (x, y) { d } else { 0 })
    }

    fn colors() -> ColorGrid {
        ColorGrid::from_fn(W, H, |x, y| [x as u8, y as u8, 200])
    }

    #[test]
    fn test_single_foreground_pixel() {
        let extractor = FrameExtractor::new(flat_key(500), 50);
        let points = extractor.extract(&single_pixel(3, 2, 100), &colors());
        assert_eq!(points.len(), 1);
        let p = points[0];
        assert!((p.z() - 0.1).abs() < 1e-6);
        assert_eq!(p.color, [3, 2, 200, 0]);
    }

    #[test]
    fn test_threshold_boundary() {
        let extractor = FrameExtractor::new(flat_key(500), 50);
        assert!(!extractor.is_foreground(0, 0, 450));
        assert!(extractor.is_foreground(0, 0, 449));
        assert!(!extractor.is_foreground(0, 0, 0));
        assert!(!extractor.is_foreground(0, 0, 600));
    }

    #[test]
    fn test_unfilled_key_is_background() {
        let extractor = FrameExtractor::new(flat_key(0), 1);
        assert!(!extractor.is_foreground(1, 1, 1));
        assert!(extractor.extract(&single_pixel(1, 1, 1), &colors()).is_empty());
    }

    #[test]
    fn test_key_closer_than_margin_never_wraps() {
        let extractor = FrameExtractor::new(flat_key(30), 50);
        assert!(!extractor.is_foreground(0, 0, 1));
    }

    #[test]
    fn test_row_major_order() {
        let depth = DepthGrid::from_fn(W, H, |x, y| if (x + y) % 3 == 0 { 200 } else { 0 });
        let points = FrameExtractor::new(flat_key(1000), 10).extract(&depth, &colors());
        let order: Vec<_> = points.iter().map(|p| (p.color[1], p.color[0])).collect();
        let mut sorted = order.clone();
        sorted.sort();
        assert_eq!(order, sorted);
    }

    #[test]
    fn test_projection_center_and_offsets() {
        let [x, y, z] = project(W / 2, H / 2, 1000, W, H);
        assert_eq!((x, y), (0.0, 0.0));
        assert!((z - 1.0).abs() < 1e-6);

        let [x, y, _] = project(W / 2 + 10, H / 2 + 5, 2000, W, H);
        assert!((x - 10.0 * 2.0 * projection::PIXEL_SCALE).abs() < 1e-6);
        assert!((y - 5.0 * 2.0 * projection::PIXEL_SCALE).abs() < 1e-6);
    }
}
