// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

/// Depth sensor geometry and sample encoding
pub mod sensor {
    /// Depth/color grid width in pixels (medium resolution mode)
    pub const WIDTH: u32 = 640;

    /// Depth/color grid height in pixels (medium resolution mode)
    pub const HEIGHT: u32 = 480;

    /// Depth sample meaning "no reading"
    ///
    /// The calibrated raw-to-millimeter converter maps every invalid
    /// disparity to this value.
    pub const NO_READING: u16 = 0;

    /// Number of color channels per pixel
    pub const COLOR_CHANNELS: usize = 3;
}

/// Background key construction
pub mod key {
    /// Maximum fraction of "no reading" pixels a key candidate may have
    pub const HOLE_FRACTION_THRESHOLD: f64 = 0.25;

    /// Largest ring radius searched when filling a hole (inclusive)
    pub const MAX_FILL_RADIUS: u32 = 63;
}

/// Fixed pinhole approximation used to lift pixels into camera space
pub mod projection {
    /// Meters per depth unit (depth samples are millimeters)
    pub const DEPTH_SCALE_M: f32 = 0.001;

    /// Meters of lateral offset per pixel per meter of depth
    pub const PIXEL_SCALE: f32 = 0.0021;
}

/// Foreground extraction and capture loop
pub mod capture {
    /// Smallest accepted foreground margin, in depth units
    pub const MIN_KEY_DISTANCE: u16 = 1;

    /// Largest accepted foreground margin, in depth units
    pub const MAX_KEY_DISTANCE: u16 = 1000;

    /// Margin used when neither the config file nor the command line sets one
    pub const DEFAULT_KEY_DISTANCE: u16 = 50;

    /// Frames captured when neither the config file nor the command line sets a count
    pub const DEFAULT_FRAME_COUNT: u32 = 300;

    /// How long a Kinect source waits for a single frame before failing
    pub const DEFAULT_ACQUISITION_TIMEOUT_MS: u64 = 2000;

    /// Frames between `info` progress lines
    pub const PROGRESS_INTERVAL: u32 = 30;
}

/// Binary point stream container
pub mod stream {
    /// Size of an encoded frame count field
    pub const COUNT_SIZE_BYTES: usize = 4;

    /// Size of one encoded point: 3 x f32 position + RGB + pad
    pub const POINT_SIZE_BYTES: usize = 16;

    /// Largest frame the reader will buffer (one point per sensor pixel)
    pub const MAX_FRAME_POINTS: usize =
        super::sensor::WIDTH as usize * super::sensor::HEIGHT as usize;
}

/// File naming and default locations
pub mod file_formats {
    /// Extension for point stream containers
    pub const STREAM_EXTENSION: &str = "pcs";

    /// Extension for exported LAS point clouds
    pub const LAS_EXTENSION: &str = "las";

    /// Folder created under the user's video directory for captures
    pub const DEFAULT_SAVE_FOLDER: &str = "PointClouds";

    /// Config file name under `$XDG_CONFIG_HOME/pctrack/`
    pub const CONFIG_FILE_NAME: &str = "capture.json";

    /// Application directory name for config lookups
    pub const APP_DIR_NAME: &str = "pctrack";

    /// Check whether a file extension names a point stream
    pub fn is_stream_extension(ext: &str) -> bool {
        ext.eq_ignore_ascii_case(STREAM_EXTENSION)
    }
}

/// Terminal playback viewer timing
pub mod playback {
    use std::time::Duration;

    /// One viewer tick; at most one frame record is read per tick
    pub const TICK: Duration = Duration::from_millis(16);

    /// Half-width of the visible scene in meters
    pub const VIEW_HALF_WIDTH_M: f32 = 1.5;
}
