// SPDX-License-Identifier: GPL-3.0-only

//! Error types for capture, key building, and the point stream

use std::path::PathBuf;
use thiserror::Error;

/// Frame source (sensor) errors
///
/// Any of these ends a capture session.
#[derive(Debug, Error)]
pub enum SourceError {
    /// No depth sensor at the requested index
    #[error("depth camera {0} not found")]
    DeviceNotFound(usize),
    /// The sensor was found but streaming could not start
    #[error("failed to start depth camera: {0}")]
    StartFailed(String),
    /// The sensor did not deliver a depth frame
    #[error("could not get depth data: {0}")]
    Depth(String),
    /// The sensor did not deliver a color frame
    #[error("could not get color data: {0}")]
    Color(String),
    /// A frame arrived with dimensions other than the sensor's
    #[error("frame is {width}x{height}, expected {expected_width}x{expected_height}")]
    FrameSize {
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },
    /// No frame source is compiled into this build
    #[error("no depth camera support in this build (enable the `freedepth` feature)")]
    Unsupported,
}

/// Building a grid from a flat buffer of the wrong length
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("buffer holds {actual} samples, {width}x{height} grid needs {expected}")]
pub struct GridSizeError {
    pub width: u32,
    pub height: u32,
    pub expected: usize,
    pub actual: usize,
}

/// Background key construction errors
#[derive(Debug, Error)]
pub enum KeyError {
    /// The frame source failed while supplying a key candidate
    #[error(transparent)]
    Source(#[from] SourceError),
    /// Every allowed candidate had too many holes
    #[error(
        "no usable key frame after {attempts} attempts (last had {:.1}% holes)",
        .last_hole_fraction * 100.0
    )]
    AttemptsExhausted {
        attempts: u32,
        last_hole_fraction: f64,
    },
}

/// Point stream container errors
#[derive(Debug, Error)]
pub enum StreamError {
    /// Underlying read/write failure, including short writes
    #[error("stream I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A frame's count was read but its point payload ended early
    #[error(
        "stream truncated in frame {frame}: expected {expected_points} points, found {available_bytes} of {expected_bytes} payload bytes"
    )]
    Truncated {
        frame: u64,
        expected_points: u32,
        expected_bytes: usize,
        available_bytes: usize,
    },
    /// A frame declares more points than the reader is willing to buffer
    #[error("frame {frame} declares {count} points, limit is {max}")]
    FrameTooLarge { frame: u64, count: u32, max: usize },
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("key distance must be between {min} and {max}, got {value}")]
    KeyDistanceOutOfRange { value: u32, min: u16, max: u16 },
    #[error("frame count must be at least 1")]
    ZeroFrameCount,
}

/// Capture session errors
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error("could not save key image {path}: {source}")]
    KeyImage {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// Point cloud export errors
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error("stream has no frame {0}")]
    FrameNotFound(u64),
    #[error("frame {0} has no points to export")]
    EmptyFrame(u64),
    #[error("LAS export failed: {0}")]
    Las(#[from] las::Error),
}
