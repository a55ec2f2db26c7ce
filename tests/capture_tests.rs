// SPDX-License-Identifier: GPL-3.0-only

//! End-to-end capture tests against the synthetic sensor

use pctrack::backends::{DepthGrid, FrameSource, SyntheticSource};
use pctrack::pipelines::extract::FrameExtractor;
use pctrack::pipelines::key::{BackgroundKey, KeyBuilder};
use pctrack::pipelines::laz_export;
use pctrack::pipelines::session::{CaptureSettings, run_capture};
use pctrack::stream::{StreamReader, StreamWriter};
use std::sync::atomic::AtomicBool;

#[test]
fn test_single_pixel_scenario() {
    let key = BackgroundKey::from_grid(DepthGrid::filled(640, 480, 500));
    let depth = DepthGrid::from_fn(640, 480, |x, y| if (x, y) == (100, 200) { 100 } else { 0 });
    let color = pctrack::backends::ColorGrid::filled(640, 480, [7, 8, 9]);

    let points = FrameExtractor::new(key, 50).extract(&depth, &color);
    assert_eq!(points.len(), 1);
    assert!((points[0].z() - 0.1).abs() < 1e-6);
    assert_eq!(points[0].rgb(), [7, 8, 9]);
}

#[test]
fn test_synthetic_capture_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("synthetic.pcs");
    let key_image = dir.path().join("key.png");

    let mut source = SyntheticSource::new().with_size(160, 120).with_noisy_frames(2);
    let mut writer = StreamWriter::create(&path).unwrap();
    let settings = CaptureSettings {
        frame_count: 8,
        key_distance: 50,
        max_key_attempts: None,
        key_image: Some(key_image.clone()),
    };
    let summary = run_capture(&mut source, &mut writer, &settings, &AtomicBool::new(false)).unwrap();
    writer.finish().unwrap();

    assert_eq!(summary.key.attempts, 3, "Two noisy candidates are rejected");
    assert_eq!(summary.key.unfilled, 0);
    assert_eq!(summary.frames, 8);
    assert!(key_image.exists());

    // The orbiting sphere is the only foreground
    let mut reader = StreamReader::open(&path).unwrap();
    let frames: Vec<_> = reader.frames().map(|f| f.unwrap()).collect();
    assert_eq!(frames.len(), 8);
    for frame in &frames {
        assert!(!frame.is_empty());
        assert!(frame.iter().all(|p| p.z() < 1.6 && p.rgb() == [240, 130, 30]));
    }
    let total: usize = frames.iter().map(Vec::len).sum();
    assert_eq!(total as u64, summary.points);

    let las = dir.path().join("frame.las");
    let exported = laz_export::export_frame_las(&path, 3, &las).unwrap();
    assert_eq!(exported, frames[3].len());
}

#[test]
fn test_key_from_synthetic_background() {
    let mut source = SyntheticSource::new().with_size(64, 48);
    let key = KeyBuilder::new().build(|| source.get_depth()).unwrap();
    assert_eq!(key.stats().attempts, 1);
    assert!(key.grid().hole_count() == 0);
}
