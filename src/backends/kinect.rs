// SPDX-License-Identifier: GPL-3.0-only

//! Kinect frame source via freedepth
//!
//! Streams Bayer video and 11-bit depth straight from USB, bypassing the
//! kernel driver. Raw disparity is converted to millimeters with the
//! device-calibrated lookup table, so invalid readings come out as 0.
//!
//! Frames are pulled synchronously: `get_depth` blocks on the depth channel
//! and `get_color` then takes the newest video frame. Stale frames queued
//! while the pipeline was busy are dropped.

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use freedepth::{DepthFormat, DepthFrame, DepthToMm, KinectStreamer, Resolution, VideoFormat, VideoFrame};
use tracing::{debug, info, warn};

use super::{check_dimensions, ColorGrid, DepthGrid, DeviceDescriptor, FrameSource, SourceResult};
use crate::constants::sensor;
use crate::errors::SourceError;

/// Enumerate depth cameras via freedepth
pub fn enumerate_devices() -> Vec<DeviceDescriptor> {
    let devices = match freedepth::enumerate_devices() {
        Ok(d) => d,
        Err(e) => {
            debug!("Failed to enumerate depth cameras: {}", e);
            return Vec::new();
        }
    };

    devices
        .iter()
        .map(|dev| {
            let serial = dev
                .id
                .serial
                .clone()
                .unwrap_or_else(|| "unknown".to_string());
            debug!(name = %dev.name, index = dev.index, serial = %serial, "Found depth camera");
            DeviceDescriptor {
                index: dev.index,
                name: dev.name.clone(),
                serial,
            }
        })
        .collect()
}

/// Live Kinect sensor
pub struct KinectSource {
    name: String,
    streamer: Option<KinectStreamer>,
    video_rx: Receiver<VideoFrame>,
    depth_rx: Receiver<DepthFrame>,
    converter: DepthToMm,
    timeout: Duration,
    rgb_scratch: Vec<u8>,
}

impl KinectSource {
    /// Open device `index` and start streaming at 640x480
    ///
    /// Unbinds the kernel driver until the source is dropped.
    pub fn open(index: usize, timeout: Duration) -> SourceResult<Self> {
        let descriptor = enumerate_devices()
            .into_iter()
            .find(|d| d.index == index)
            .ok_or(SourceError::DeviceNotFound(index))?;

        info!(device = index, name = %descriptor.name, "Starting depth camera");

        let mut streamer = KinectStreamer::new(index)
            .map_err(|e| SourceError::StartFailed(format!("failed to create streamer: {}", e)))?;

        let (video_rx, depth_rx) = streamer
            .start(VideoFormat::Bayer, Resolution::Medium, DepthFormat::Depth11Bit)
            .map_err(|e| SourceError::StartFailed(format!("failed to start streaming: {}", e)))?;

        let registration = streamer.create_depth_registration();
        let converter = registration.depth_to_mm().clone();

        Ok(Self {
            name: descriptor.name,
            streamer: Some(streamer),
            video_rx,
            depth_rx,
            converter,
            timeout,
            rgb_scratch: Vec::new(),
        })
    }

    fn expected(&self) -> (u32, u32) {
        (sensor::WIDTH, sensor::HEIGHT)
    }
}

/// Block for one message, then drain to the newest
fn recv_latest<T>(rx: &Receiver<T>, timeout: Duration) -> Result<T, String> {
    let first = rx.recv_timeout(timeout).map_err(|e| match e {
        RecvTimeoutError::Timeout => format!("no frame within {} ms", timeout.as_millis()),
        RecvTimeoutError::Disconnected => "stream disconnected".to_string(),
    })?;
    Ok(rx.try_iter().last().unwrap_or(first))
}

impl FrameSource for KinectSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> (u32, u32) {
        self.expected()
    }

    fn get_depth(&mut self) -> SourceResult<DepthGrid> {
        let frame = recv_latest(&self.depth_rx, self.timeout).map_err(SourceError::Depth)?;
        check_dimensions((frame.width, frame.height), self.expected())?;

        let raw = frame
            .as_u16()
            .ok_or_else(|| SourceError::Depth("frame is not 16-bit depth".to_string()))?;
        let mut depth_mm = vec![0u16; raw.len()];
        self.converter.convert_frame(raw, &mut depth_mm);

        DepthGrid::from_vec(frame.width, frame.height, depth_mm)
            .map_err(|e| SourceError::Depth(e.to_string()))
    }

    fn get_color(&mut self) -> SourceResult<ColorGrid> {
        let frame = recv_latest(&self.video_rx, self.timeout).map_err(SourceError::Color)?;
        check_dimensions((frame.width, frame.height), self.expected())?;

        // Kinect video is always Bayer at the hardware level
        let pixels = (frame.width * frame.height) as usize;
        self.rgb_scratch.clear();
        self.rgb_scratch.resize(pixels * sensor::COLOR_CHANNELS, 0);
        freedepth::convert_bayer_to_rgb(&frame.data, &mut self.rgb_scratch, frame.width, frame.height);

        ColorGrid::from_rgb_bytes(frame.width, frame.height, &self.rgb_scratch)
            .map_err(|e| SourceError::Color(e.to_string()))
    }
}

impl Drop for KinectSource {
    fn drop(&mut self) {
        if let Some(mut streamer) = self.streamer.take() {
            info!("Stopping depth camera");
            streamer.stop();
            if let Err(e) = streamer.rebind_driver() {
                warn!("Failed to rebind kernel driver: {}", e);
            }
        }
    }
}
