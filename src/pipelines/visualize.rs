// SPDX-License-Identifier: GPL-3.0-only

//! Background key visualization
//!
//! Renders a key as a turbo-colormapped RGB image (blue = near, red = far),
//! auto-ranged over the key's surface depths. Unfilled pixels are black.

use super::key::{BackgroundKey, KeyDepth};
use image::{ImageResult, RgbImage};
use std::path::Path;
use tracing::info;

/// Range used when the key has no usable depth spread
const FALLBACK_RANGE_MM: (u16, u16) = (0, 4000);

/// Turbo colormap (Google), polynomial approximation
fn turbo(t: f32) -> [u8; 3] {
    let r = (0.13572138
        + t * (4.6153926 + t * (-42.66032 + t * (132.13108 + t * (-152.54825 + t * 59.28144)))))
        .clamp(0.0, 1.0);
    let g = (0.09140261
        + t * (2.19418 + t * (4.84296 + t * (-14.18503 + t * (4.27805 + t * 2.53377)))))
        .clamp(0.0, 1.0);
    let b = (0.1066733
        + t * (12.64194 + t * (-60.58204 + t * (109.99648 + t * (-82.52904 + t * 20.43388)))))
        .clamp(0.0, 1.0);
    [(r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8]
}

/// Min/max surface depth of the key
fn surface_range(key: &BackgroundKey) -> (u16, u16) {
    let (width, height) = key.dimensions();
    let mut range: Option<(u16, u16)> = None;
    for y in 0..height {
        for x in 0..width {
            if let Some(KeyDepth::Surface(d)) = key.depth_at(x, y) {
                range = Some(match range {
                    Some((lo, hi)) => (lo.min(d), hi.max(d)),
                    None => (d, d),
                });
            }
        }
    }
    match range {
        Some((lo, hi)) if hi > lo => (lo, hi),
        _ => FALLBACK_RANGE_MM,
    }
}

/// Render the key as an RGB image
pub fn key_to_image(key: &BackgroundKey) -> RgbImage {
    let (width, height) = key.dimensions();
    let (min_depth, max_depth) = surface_range(key);
    let range = f32::from(max_depth - min_depth);

    RgbImage::from_fn(width, height, |x, y| {
        let rgb = match key.depth_at(x, y) {
            Some(KeyDepth::Surface(d)) => {
                let t = (f32::from(d.saturating_sub(min_depth)) / range).clamp(0.0, 1.0);
                turbo(t)
            }
            Some(KeyDepth::Unfilled) | None => [0, 0, 0],
        };
        image::Rgb(rgb)
    })
}

/// Save the key as a PNG
pub fn save_key_image(key: &BackgroundKey, path: &Path) -> ImageResult<()> {
    key_to_image(key).save(path)?;
    info!(path = %path.display(), "Saved key image");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::DepthGrid;

    #[test]
    fn test_unfilled_pixels_are_black() {
        let grid = DepthGrid::from_fn(4, 2, |x, _| if x == 0 { 0 } else { 1000 + x as u16 * 100 });
        let img = key_to_image(&BackgroundKey::from_grid(grid));
        assert_eq!(img.dimensions(), (4, 2));
        assert_eq!(img.get_pixel(0, 1).0, [0, 0, 0]);
        assert_ne!(img.get_pixel(1, 0).0, img.get_pixel(3, 0).0);
    }

    #[test]
    fn test_flat_key_uses_fallback_range() {
        let key = BackgroundKey::from_grid(DepthGrid::filled(2, 2, 2000));
        assert_eq!(surface_range(&key), FALLBACK_RANGE_MM);
    }

    #[test]
    fn test_turbo_endpoints() {
        let near = turbo(0.15);
        let far = turbo(0.95);
        assert!(near[2] > near[0]);
        assert!(far[0] > far[2]);
    }
}
