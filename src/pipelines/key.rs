// SPDX-License-Identifier: GPL-3.0-only

//! Background key construction
//!
//! The key is a dense reference depth grid of the static scene. It is built
//! once per capture session from the first sensor frame whose dropout rate is
//! acceptable; remaining dropouts are filled from the nearest surrounding
//! readings with an expanding square-ring search.

use crate::backends::{DepthGrid, SourceResult};
use crate::constants::{key, sensor};
use crate::errors::KeyError;
use tracing::{debug, info, warn};

/// Depth of the background key at one pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDepth {
    /// A background surface at this depth (millimeters)
    Surface(u16),
    /// The pixel could not be filled within the search radius.
    /// Subtraction treats it as infinitely far, so it never yields foreground.
    Unfilled,
}

/// Statistics gathered while building a key
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyStats {
    /// Candidate frames pulled, including the accepted one
    pub attempts: u32,
    /// Hole fraction of the accepted candidate
    pub hole_fraction: f64,
    /// Holes that the ring search filled
    pub filled: usize,
    /// Holes left without a value
    pub unfilled: usize,
}

/// Dense background reference used for foreground subtraction
///
/// Immutable once built.
#[derive(Debug, Clone)]
pub struct BackgroundKey {
    grid: DepthGrid,
    stats: KeyStats,
}

impl BackgroundKey {
    /// Wrap an already-filled grid. Remaining `0` samples are unfilled pixels.
    pub fn from_grid(grid: DepthGrid) -> Self {
        let unfilled = grid.hole_count();
        Self {
            grid,
            stats: KeyStats {
                attempts: 0,
                hole_fraction: 0.0,
                filled: 0,
                unfilled,
            },
        }
    }

    /// Key depth at `(x, y)`, `None` outside the grid
    #[inline]
    pub fn depth_at(&self, x: u32, y: u32) -> Option<KeyDepth> {
        self.grid.get(x, y).map(|d| {
            if d == sensor::NO_READING {
                KeyDepth::Unfilled
            } else {
                KeyDepth::Surface(d)
            }
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.grid.dimensions()
    }

    /// The filled grid; unfilled pixels keep the no-reading value
    pub fn grid(&self) -> &DepthGrid {
        &self.grid
    }

    pub fn stats(&self) -> &KeyStats {
        &self.stats
    }
}

/// Fraction of pixels with no reading, as an exact `holes / total` ratio
pub fn hole_fraction(grid: &DepthGrid) -> f64 {
    if grid.is_empty() {
        return 1.0;
    }
    grid.hole_count() as f64 / grid.len() as f64
}

/// Minimum reading on the border of the square of half-width `radius`
/// centered on `(cx, cy)`, clipped to the grid
fn ring_minimum(grid: &DepthGrid, cx: u32, cy: u32, radius: u32) -> Option<u16> {
    let (width, height) = grid.dimensions();
    let (cx, cy, r) = (cx as i64, cy as i64, radius as i64);
    let x0 = (cx - r).max(0);
    let x1 = (cx + r).min(width as i64 - 1);
    let y0 = (cy - r).max(0);
    let y1 = (cy + r).min(height as i64 - 1);

    let mut best: Option<u16> = None;
    let mut consider = |x: i64, y: i64| {
        if let Some(d) = grid.get(x as u32, y as u32)
            && d != sensor::NO_READING
        {
            best = Some(best.map_or(d, |b| b.min(d)));
        }
    };

    // Top and bottom edges, only where they fall inside the grid
    for y in [cy - r, cy + r] {
        if (0..height as i64).contains(&y) {
            for x in x0..=x1 {
                consider(x, y);
            }
        }
    }
    // Left and right edges, excluding the corners already visited
    for x in [cx - r, cx + r] {
        if (0..width as i64).contains(&x) {
            for y in (y0..=y1).filter(|&y| y != cy - r && y != cy + r) {
                consider(x, y);
            }
        }
    }

    best
}

/// Whether the ring of `radius` around `(x, y)` lies entirely outside the grid
fn ring_outside(grid: &DepthGrid, x: u32, y: u32, radius: u32) -> bool {
    let (width, height) = grid.dimensions();
    x < radius
        && y < radius
        && x + radius >= width
        && y + radius >= height
}

/// Fill every hole with the smallest reading on the nearest ring that has one
///
/// Searches rings of radius `1..=max_radius` in the *input* grid only, so the
/// result does not depend on scan order. Returns the new grid and the number
/// of holes left unfilled.
pub fn fill_holes(grid: &DepthGrid, max_radius: u32) -> (DepthGrid, usize) {
    let mut unfilled = 0usize;
    let filled = DepthGrid::from_fn(grid.width(), grid.height(), |x, y| {
        let d = grid.get(x, y).unwrap_or(sensor::NO_READING);
        if d != sensor::NO_READING {
            return d;
        }
        for radius in 1..=max_radius {
            if ring_outside(grid, x, y, radius) {
                break;
            }
            if let Some(v) = ring_minimum(grid, x, y, radius) {
                return v;
            }
        }
        unfilled += 1;
        sensor::NO_READING
    });
    (filled, unfilled)
}

/// Builds a [`BackgroundKey`] from a stream of candidate depth grids
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyBuilder {
    max_attempts: Option<u32>,
}

impl KeyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give up after this many rejected candidates. `None` retries forever.
    pub fn max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Pull candidates from `next_depth` until one is acceptable, then fill it
    ///
    /// Candidates whose hole fraction exceeds the threshold are discarded and
    /// logged. Source failures end the build immediately.
    pub fn build<F>(&self, mut next_depth: F) -> Result<BackgroundKey, KeyError>
    where
        F: FnMut() -> SourceResult<DepthGrid>,
    {
        let mut attempts = 0u32;
        let (candidate, fraction) = loop {
            let grid = next_depth()?;
            attempts += 1;
            let fraction = hole_fraction(&grid);
            if fraction <= key::HOLE_FRACTION_THRESHOLD {
                break (grid, fraction);
            }

            warn!(
                attempt = attempts,
                holes_percent = format_args!("{:.1}", fraction * 100.0),
                "Key candidate has too many holes, retrying"
            );
            if let Some(max) = self.max_attempts
                && attempts >= max
            {
                return Err(KeyError::AttemptsExhausted {
                    attempts,
                    last_hole_fraction: fraction,
                });
            }
        };

        let holes = candidate.hole_count();
        debug!(holes, max_radius = key::MAX_FILL_RADIUS, "Filling key holes");
        let (grid, unfilled) = fill_holes(&candidate, key::MAX_FILL_RADIUS);

        if unfilled > 0 {
            warn!(unfilled, "Key pixels could not be filled");
        }
        info!(
            attempts,
            holes_percent = format_args!("{:.1}", fraction * 100.0),
            filled = holes - unfilled,
            unfilled,
            "Background key built"
        );

        Ok(BackgroundKey {
            grid,
            stats: KeyStats {
                attempts,
                hole_fraction: fraction,
                filled: holes - unfilled,
                unfilled,
            },
        })
    }
}
