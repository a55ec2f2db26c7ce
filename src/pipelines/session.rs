// SPDX-License-Identifier: GPL-3.0-only

//! Capture session
//!
//! One session builds the background key once, then turns each subsequent
//! depth + color pair into one frame record. All per-session state lives in
//! the extractor and the writer passed in; nothing is global.

use super::extract::FrameExtractor;
use super::key::{KeyBuilder, KeyStats};
use super::visualize::save_key_image;
use crate::backends::{FrameSource, check_dimensions};
use crate::constants::capture;
use crate::errors::CaptureError;
use crate::stream::StreamWriter;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Parameters of one capture session
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    /// Frames to capture after the key is built
    pub frame_count: u32,
    /// Foreground margin in depth units
    pub key_distance: u16,
    /// Key candidates to try before giving up, `None` for unlimited
    pub max_key_attempts: Option<u32>,
    /// Save the built key as a PNG here
    pub key_image: Option<PathBuf>,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            frame_count: capture::DEFAULT_FRAME_COUNT,
            key_distance: capture::DEFAULT_KEY_DISTANCE,
            max_key_attempts: None,
            key_image: None,
        }
    }
}

/// What a session produced
#[derive(Debug, Clone)]
pub struct CaptureSummary {
    pub key: KeyStats,
    pub frames: u64,
    pub points: u64,
    /// The stop flag ended the session before `frame_count` frames
    pub interrupted: bool,
    pub elapsed: Duration,
}

/// Run a capture session into `writer`
///
/// `stop` is checked only between frames, so a frame in progress is always
/// written in full. Any source or write error ends the session; records
/// already written stay valid.
pub fn run_capture<S, W>(
    source: &mut S,
    writer: &mut StreamWriter<W>,
    settings: &CaptureSettings,
    stop: &AtomicBool,
) -> Result<CaptureSummary, CaptureError>
where
    S: FrameSource + ?Sized,
    W: Write,
{
    let start = Instant::now();
    let (width, height) = source.dimensions();
    info!(
        source = source.name(),
        width,
        height,
        frames = settings.frame_count,
        key_distance = settings.key_distance,
        "Starting capture session"
    );

    let key = KeyBuilder::new()
        .max_attempts(settings.max_key_attempts)
        .build(|| source.get_depth())?;
    let key_stats = *key.stats();

    if let Some(path) = &settings.key_image {
        save_key_image(&key, path).map_err(|source| CaptureError::KeyImage {
            path: path.clone(),
            source,
        })?;
    }

    let extractor = FrameExtractor::new(key, settings.key_distance);
    let mut points = Vec::new();
    let frames_before = writer.frames_written();
    let points_before = writer.points_written();
    let mut interrupted = false;

    for frame in 0..settings.frame_count {
        if stop.load(Ordering::Relaxed) {
            info!(frame, "Capture stopped");
            interrupted = true;
            break;
        }

        let depth = source.get_depth()?;
        check_dimensions(depth.dimensions(), extractor.key().dimensions())?;
        let color = source.get_color()?;
        check_dimensions(color.dimensions(), depth.dimensions())?;
        extractor.extract_into(&depth, &color, &mut points);
        writer.write_frame(&points)?;

        debug!(frame, points = points.len(), "Captured frame");
        if (frame + 1) % capture::PROGRESS_INTERVAL == 0 {
            info!(
                frame = frame + 1,
                total = settings.frame_count,
                points = writer.points_written() - points_before,
                "Capture progress"
            );
        }
    }

    writer.flush()?;

    let summary = CaptureSummary {
        key: key_stats,
        frames: writer.frames_written() - frames_before,
        points: writer.points_written() - points_before,
        interrupted,
        elapsed: start.elapsed(),
    };
    info!(
        frames = summary.frames,
        points = summary.points,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "Capture session finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{ColorGrid, DepthGrid, SourceResult, SyntheticSource};
    use crate::errors::{KeyError, SourceError};
    use crate::stream::StreamReader;
    use std::io::Cursor;

    /// Replays a fixed list of depth grids with a constant color
    struct Scripted {
        depth: Vec<DepthGrid>,
        served: usize,
        color_size: (u32, u32),
    }

    impl Scripted {
        fn new(depth: Vec<DepthGrid>) -> Self {
            Self {
                depth,
                served: 0,
                color_size: (4, 4),
            }
        }
    }

    impl FrameSource for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn dimensions(&self) -> (u32, u32) {
            (4, 4)
        }

        fn get_depth(&mut self) -> SourceResult<DepthGrid> {
            let grid = self
                .depth
                .get(self.served)
                .cloned()
                .ok_or_else(|| SourceError::Depth("script exhausted".to_string()))?;
            self.served += 1;
            Ok(grid)
        }

        fn get_color(&mut self) -> SourceResult<ColorGrid> {
            let (width, height) = self.color_size;
            Ok(ColorGrid::filled(width, height, [10, 20, 30]))
        }
    }

    fn settings(frame_count: u32) -> CaptureSettings {
        CaptureSettings {
            frame_count,
            key_distance: 50,
            ..Default::default()
        }
    }

    #[test]
    fn test_one_record_per_frame() {
        let key = DepthGrid::filled(4, 4, 500);
        let near = DepthGrid::from_fn(4, 4, |x, y| if (x, y) == (1, 1) { 100 } else { 0 });
        let mut source = Scripted::new(vec![key, near.clone(), DepthGrid::filled(4, 4, 0), near]);
        let mut writer = StreamWriter::new(Vec::new());
        let summary =
            run_capture(&mut source, &mut writer, &settings(3), &AtomicBool::new(false)).unwrap();
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.points, 2);
        assert!(!summary.interrupted);

        let bytes = writer.finish().unwrap();
        let counts: Vec<usize> = StreamReader::new(Cursor::new(bytes))
            .frames()
            .map(|f| f.unwrap().len())
            .collect();
        assert_eq!(counts, vec![1, 0, 1]);
    }

    #[test]
    fn test_stop_flag_is_checked_between_frames() {
        let mut source = SyntheticSource::new().with_size(32, 24);
        let mut writer = StreamWriter::new(Vec::new());
        let stop = AtomicBool::new(true);
        let summary = run_capture(&mut source, &mut writer, &settings(10), &stop).unwrap();
        assert_eq!(summary.frames, 0);
        assert!(summary.interrupted);
    }

    #[test]
    fn test_source_failure_ends_session() {
        let mut source = Scripted::new(vec![DepthGrid::filled(4, 4, 500)]);
        let mut writer = StreamWriter::new(Vec::new());
        let err = run_capture(&mut source, &mut writer, &settings(5), &AtomicBool::new(false))
            .unwrap_err();
        assert!(matches!(err, CaptureError::Source(SourceError::Depth(_))));
    }

    #[test]
    fn test_depth_size_change_is_fatal() {
        let mut source = Scripted::new(vec![
            DepthGrid::filled(4, 4, 500),
            DepthGrid::filled(3, 3, 100),
        ]);
        let mut writer = StreamWriter::new(Vec::new());
        let err = run_capture(&mut source, &mut writer, &settings(2), &AtomicBool::new(false))
            .unwrap_err();
        assert!(matches!(
            err,
            CaptureError::Source(SourceError::FrameSize {
                width: 3,
                height: 3,
                expected_width: 4,
                expected_height: 4,
            })
        ));
        assert_eq!(writer.frames_written(), 0);
    }

    #[test]
    fn test_color_size_mismatch_is_fatal() {
        let mut source = Scripted::new(vec![
            DepthGrid::filled(4, 4, 500),
            DepthGrid::filled(4, 4, 100),
        ]);
        source.color_size = (2, 2);
        let mut writer = StreamWriter::new(Vec::new());
        let err = run_capture(&mut source, &mut writer, &settings(1), &AtomicBool::new(false))
            .unwrap_err();
        assert!(matches!(
            err,
            CaptureError::Source(SourceError::FrameSize { width: 2, height: 2, .. })
        ));
        assert_eq!(writer.frames_written(), 0);
    }

    #[test]
    fn test_key_attempt_cap() {
        let mut source = SyntheticSource::new()
            .with_size(32, 24)
            .with_noisy_frames(10);
        let mut writer = StreamWriter::new(Vec::new());
        let capped = CaptureSettings {
            max_key_attempts: Some(3),
            ..settings(5)
        };
        let err = run_capture(&mut source, &mut writer, &capped, &AtomicBool::new(false))
            .unwrap_err();
        assert!(matches!(
            err,
            CaptureError::Key(KeyError::AttemptsExhausted { attempts: 3, .. })
        ));
        assert_eq!(writer.frames_written(), 0);
    }
}
