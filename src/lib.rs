// SPDX-License-Identifier: GPL-3.0-only

//! pctrack - depth camera to colored point cloud streams
//!
//! Captures the foreground of a depth camera's view as one colored point
//! cloud per frame and stores the sequence in a simple count-prefixed
//! binary stream that can be played back or exported.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Frame sources (Kinect via freedepth, synthetic)
//! - [`pipelines`]: Background key, foreground extraction, capture session, export
//! - [`stream`]: Point stream container reader, writer and playback buffer
//! - [`config`]: Capture configuration file handling
//! - [`terminal`]: Terminal point cloud player
//!
//! # Example
//!
//! ```no_run
//! use pctrack::backends::SyntheticSource;
//! use pctrack::pipelines::session::{run_capture, CaptureSettings};
//! use pctrack::stream::StreamWriter;
//! use std::sync::atomic::AtomicBool;
//!
//! let mut source = SyntheticSource::new();
//! let mut writer = StreamWriter::create("capture.pcs".as_ref())?;
//! let summary = run_capture(&mut source, &mut writer, &CaptureSettings::default(), &AtomicBool::new(false))?;
//! println!("{} frames", summary.frames);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod pipelines;
pub mod stream;
pub mod terminal;

// Re-export commonly used types
pub use config::CaptureConfig;
pub use stream::Point;
