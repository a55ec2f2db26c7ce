// SPDX-License-Identifier: GPL-3.0-only

//! Simulated depth sensor
//!
//! Renders a static room (back wall plus a floor rising toward the camera)
//! with sparse, frame-varying dropout holes, and an orange sphere orbiting in
//! front of the wall once the warm-up frames have passed. The first frames
//! can be made deliberately noisy to exercise the key builder's retry path.

use super::{ColorGrid, DepthGrid, FrameSource, Rgb, SourceResult};
use crate::constants::sensor;

/// Wall distance in millimeters
const WALL_MM: f32 = 3000.0;
/// Depth at the bottom row of the floor
const FLOOR_NEAR_MM: f32 = 1800.0;
/// Sphere center distance in millimeters
const SPHERE_MM: f32 = 1500.0;
/// Sphere radius in pixels
const SPHERE_RADIUS_PX: f32 = 40.0;
/// Millimeters of sphere bulge per pixel of radius
const SPHERE_MM_PER_PX: f32 = 4.0;
const SPHERE_COLOR: Rgb = [240, 130, 30];

/// Deterministic simulated sensor
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    width: u32,
    height: u32,
    /// Index of the next depth frame
    next_frame: u64,
    /// Dropout percentage on normal frames
    hole_percent: u32,
    /// Dropout percentage on the leading noisy frames
    noisy_hole_percent: u32,
    noisy_frames: u64,
    /// First frame index showing the sphere
    sphere_from: u64,
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self {
            width: sensor::WIDTH,
            height: sensor::HEIGHT,
            next_frame: 0,
            hole_percent: 5,
            noisy_hole_percent: 40,
            noisy_frames: 0,
            sphere_from: 1,
        }
    }
}

impl SyntheticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render at a resolution other than the sensor's
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Make the first `frames` frames exceed the key hole threshold.
    /// The sphere appears right after the first clean frame.
    pub fn with_noisy_frames(mut self, frames: u64) -> Self {
        self.noisy_frames = frames;
        self.sphere_from = frames + 1;
        self
    }

    pub fn with_hole_percent(mut self, percent: u32) -> Self {
        self.hole_percent = percent.min(100);
        self
    }

    /// Index of the frame the last `get_depth` returned
    fn current_frame(&self) -> u64 {
        self.next_frame.saturating_sub(1)
    }

    fn background_mm(&self, y: u32) -> f32 {
        let floor_start = self.height as f32 * 2.0 / 3.0;
        let y = y as f32;
        if y < floor_start {
            return WALL_MM;
        }
        let t = (y - floor_start) / (self.height as f32 - floor_start).max(1.0);
        WALL_MM + (FLOOR_NEAR_MM - WALL_MM) * t
    }

    fn sphere_center(&self, frame: u64) -> Option<(f32, f32)> {
        if frame < self.sphere_from {
            return None;
        }
        let t = (frame - self.sphere_from) as f32 * 0.1;
        let cx = self.width as f32 / 2.0 + self.width as f32 / 4.0 * t.cos();
        let cy = self.height as f32 / 2.0 + self.height as f32 / 6.0 * t.sin();
        Some((cx, cy))
    }

    /// Sphere depth at a pixel, when the sphere covers it
    fn sphere_mm(&self, frame: u64, x: u32, y: u32) -> Option<f32> {
        let (cx, cy) = self.sphere_center(frame)?;
        let d2 = (x as f32 - cx).powi(2) + (y as f32 - cy).powi(2);
        let r2 = SPHERE_RADIUS_PX * SPHERE_RADIUS_PX;
        (d2 <= r2).then(|| SPHERE_MM - (r2 - d2).sqrt() * SPHERE_MM_PER_PX)
    }

    fn is_hole(&self, frame: u64, x: u32, y: u32) -> bool {
        let percent = if frame < self.noisy_frames {
            self.noisy_hole_percent
        } else {
            self.hole_percent
        };
        mix(frame, x, y) % 100 < u64::from(percent)
    }
}

/// Cheap deterministic per-pixel hash
fn mix(frame: u64, x: u32, y: u32) -> u64 {
    let mut h = frame
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add((u64::from(x) << 32) | u64::from(y));
    h ^= h >> 33;
    h = h.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
    h ^= h >> 33;
    h = h.wrapping_mul(0xC4CE_B9FE_1A85_EC53);
    h ^ (h >> 33)
}

impl FrameSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn get_depth(&mut self) -> SourceResult<DepthGrid> {
        let frame = self.next_frame;
        self.next_frame += 1;
        Ok(DepthGrid::from_fn(self.width, self.height, |x, y| {
            if self.is_hole(frame, x, y) {
                return sensor::NO_READING;
            }
            let mm = self
                .sphere_mm(frame, x, y)
                .unwrap_or_else(|| self.background_mm(y));
            mm.round() as u16
        }))
    }

    fn get_color(&mut self) -> SourceResult<ColorGrid> {
        let frame = self.current_frame();
        Ok(ColorGrid::from_fn(self.width, self.height, |x, y| {
            if self.sphere_mm(frame, x, y).is_some() {
                return SPHERE_COLOR;
            }
            let shade = (60 + (y * 120) / self.height.max(1)) as u8;
            [shade, shade, (shade / 2).saturating_add(90)]
        }))
    }
}
