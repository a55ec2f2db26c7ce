// SPDX-License-Identifier: GPL-3.0-only

//! Frame source abstraction
//!
//! The capture pipeline pulls time-aligned depth and color grids from a
//! [`FrameSource`] on demand:
//!
//! ```text
//! ┌──────────────┐   get_depth()    ┌─────────────┐
//! │ FrameSource  │ ───────────────▶ │ Key Builder │ (once)
//! │              │   get_depth()    ├─────────────┤
//! │ Kinect /     │   get_color()    │  Extractor  │ (per frame)
//! │ Synthetic    │ ───────────────▶ └─────────────┘
//! └──────────────┘
//! ```
//!
//! Waiting for the device, including any timeout, is entirely the
//! source's business. Every error it returns is fatal to the session.

#[cfg(all(target_arch = "x86_64", feature = "freedepth"))]
pub mod kinect;
pub mod synthetic;
pub mod types;

pub use synthetic::SyntheticSource;
pub use types::*;

use crate::config::CaptureConfig;
use crate::errors::SourceError;

/// Result type for frame source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// A sensor that supplies depth and color grids on a pull basis
///
/// A `get_color` call returns the color frame that belongs with the most
/// recent `get_depth` call.
pub trait FrameSource {
    /// Human-readable source name for logs
    fn name(&self) -> &str;

    /// `(width, height)` of every grid this source produces
    fn dimensions(&self) -> (u32, u32);

    /// Block until the next depth grid is available
    fn get_depth(&mut self) -> SourceResult<DepthGrid>;

    /// Block until the color grid paired with the last depth grid is available
    fn get_color(&mut self) -> SourceResult<ColorGrid>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn dimensions(&self) -> (u32, u32) {
        (**self).dimensions()
    }

    fn get_depth(&mut self) -> SourceResult<DepthGrid> {
        (**self).get_depth()
    }

    fn get_color(&mut self) -> SourceResult<ColorGrid> {
        (**self).get_color()
    }
}

/// A depth sensor found on this machine
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    pub index: usize,
    pub name: String,
    pub serial: String,
}

/// Which source a capture session reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Physical depth camera at `device_index`
    Device,
    /// Simulated scene, no hardware required
    Synthetic,
}

/// Open the frame source for a capture session
pub fn open_source(kind: SourceKind, config: &CaptureConfig) -> SourceResult<Box<dyn FrameSource>> {
    match kind {
        SourceKind::Synthetic => Ok(Box::new(SyntheticSource::new())),
        SourceKind::Device => open_device(config),
    }
}

#[cfg(all(target_arch = "x86_64", feature = "freedepth"))]
fn open_device(config: &CaptureConfig) -> SourceResult<Box<dyn FrameSource>> {
    let timeout = std::time::Duration::from_millis(config.acquisition_timeout_ms);
    Ok(Box::new(kinect::KinectSource::open(
        config.device_index,
        timeout,
    )?))
}

#[cfg(not(all(target_arch = "x86_64", feature = "freedepth")))]
fn open_device(_config: &CaptureConfig) -> SourceResult<Box<dyn FrameSource>> {
    Err(SourceError::Unsupported)
}

/// Enumerate connected depth sensors
pub fn list_devices() -> Vec<DeviceDescriptor> {
    #[cfg(all(target_arch = "x86_64", feature = "freedepth"))]
    {
        kinect::enumerate_devices()
    }
    #[cfg(not(all(target_arch = "x86_64", feature = "freedepth")))]
    {
        Vec::new()
    }
}

/// Check that a grid matches the source's advertised dimensions
pub(crate) fn check_dimensions(
    actual: (u32, u32),
    expected: (u32, u32),
) -> SourceResult<()> {
    if actual != expected {
        return Err(SourceError::FrameSize {
            width: actual.0,
            height: actual.1,
            expected_width: expected.0,
            expected_height: expected.1,
        });
    }
    Ok(())
}
