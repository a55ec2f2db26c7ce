// SPDX-License-Identifier: GPL-3.0-only

//! Point stream container
//!
//! A stream is a headerless sequence of frame records, all little-endian:
//!
//! ```text
//! Stream      := FrameRecord*
//! FrameRecord := count:u32 Point[count]
//! Point       := x:f32 y:f32 z:f32 color:u8[3] pad:u8
//! ```
//!
//! There is no frame total and no trailer. Readers find the end of the
//! stream by failing to read the next count field.

pub mod playback;
pub mod reader;
pub mod writer;

pub use playback::{PlaybackBuffer, Tick};
pub use reader::{FrameIter, StreamReader};
pub use writer::StreamWriter;

use crate::backends::Rgb;
use crate::constants::stream::POINT_SIZE_BYTES;

/// One colored point in camera space
///
/// `#[repr(C)]` and `Pod` so a frame can be handed to a GPU upload as raw
/// bytes. The on-disk encoding does not rely on this layout; see
/// [`Point::to_le_bytes`].
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Point {
    /// Camera-space position in meters
    pub position: [f32; 3],
    /// RGB plus one padding byte, written as zero
    pub color: [u8; 4],
}

const _: () = assert!(std::mem::size_of::<Point>() == POINT_SIZE_BYTES);

impl Point {
    pub fn new(position: [f32; 3], rgb: Rgb) -> Self {
        Self {
            position,
            color: [rgb[0], rgb[1], rgb[2], 0],
        }
    }

    pub fn x(&self) -> f32 {
        self.position[0]
    }

    pub fn y(&self) -> f32 {
        self.position[1]
    }

    pub fn z(&self) -> f32 {
        self.position[2]
    }

    pub fn rgb(&self) -> Rgb {
        [self.color[0], self.color[1], self.color[2]]
    }

    /// Encode as a 16-byte little-endian record
    pub fn to_le_bytes(&self) -> [u8; POINT_SIZE_BYTES] {
        let mut out = [0u8; POINT_SIZE_BYTES];
        for (i, v) in self.position.iter().enumerate() {
            out[i * 4..i * 4 + 4].copy_from_slice(&v.to_le_bytes());
        }
        out[12..16].copy_from_slice(&self.color);
        out
    }

    /// Decode a 16-byte little-endian record, keeping the pad byte as stored
    pub fn from_le_bytes(bytes: &[u8; POINT_SIZE_BYTES]) -> Self {
        let f = |i: usize| f32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        Self {
            position: [f(0), f(4), f(8)],
            color: [bytes[12], bytes[13], bytes[14], bytes[15]],
        }
    }
}
