// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for constants module

use pctrack::constants::{capture, file_formats, key, sensor, stream};

#[test]
fn test_point_record_size() {
    // 3 x f32 position + 3 color bytes + 1 pad byte
    assert_eq!(stream::POINT_SIZE_BYTES, 16);
    assert_eq!(std::mem::size_of::<pctrack::Point>(), stream::POINT_SIZE_BYTES);
}

#[test]
fn test_max_frame_matches_sensor() {
    assert_eq!(
        stream::MAX_FRAME_POINTS,
        (sensor::WIDTH * sensor::HEIGHT) as usize
    );
}

#[test]
fn test_key_distance_bounds() {
    assert!(capture::MIN_KEY_DISTANCE >= 1);
    assert!(capture::DEFAULT_KEY_DISTANCE >= capture::MIN_KEY_DISTANCE);
    assert!(capture::DEFAULT_KEY_DISTANCE <= capture::MAX_KEY_DISTANCE);
}

#[test]
fn test_key_threshold() {
    assert!(key::HOLE_FRACTION_THRESHOLD > 0.0 && key::HOLE_FRACTION_THRESHOLD < 1.0);
    assert_eq!(key::MAX_FILL_RADIUS, 63);
}

#[test]
fn test_stream_extension() {
    assert!(file_formats::is_stream_extension("pcs"));
    assert!(file_formats::is_stream_extension("PCS"));
    assert!(!file_formats::is_stream_extension("las"));
}
