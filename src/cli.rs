// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Capturing point cloud streams
//! - Inspecting and exporting stored streams
//! - Listing depth cameras

use chrono::Local;
use pctrack::backends::{self, SourceKind};
use pctrack::config::CaptureConfig;
use pctrack::constants::file_formats;
use pctrack::errors::StreamError;
use pctrack::pipelines::laz_export;
use pctrack::pipelines::session::run_capture;
use pctrack::stream::{StreamReader, StreamWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// Command-line options for a capture, before merging with the config file
#[derive(Debug, Default)]
pub struct CaptureOptions {
    pub output: Option<PathBuf>,
    pub frames: Option<u32>,
    pub key_distance: Option<u32>,
    pub device: Option<usize>,
    pub synthetic: bool,
    pub max_key_attempts: Option<u32>,
    pub key_image: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

/// List all connected depth cameras
pub fn list_devices() -> Result<(), Box<dyn std::error::Error>> {
    let devices = backends::list_devices();

    if devices.is_empty() {
        println!("No depth cameras found.");
        return Ok(());
    }

    println!("Available depth cameras:");
    println!();
    for device in &devices {
        println!("  [{}] {}", device.index, device.name);
        println!("      Serial: {}", device.serial);
    }

    Ok(())
}

/// Capture a point cloud stream
pub fn capture(options: CaptureOptions) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = CaptureConfig::load_or_default(options.config.as_deref())?;
    if let Some(frames) = options.frames {
        config.frame_count = frames;
    }
    if let Some(key_distance) = options.key_distance {
        config.key_distance = key_distance;
    }
    if let Some(device) = options.device {
        config.device_index = device;
    }
    if options.max_key_attempts.is_some() {
        config.max_key_attempts = options.max_key_attempts;
    }
    let settings = config.capture_settings(options.key_image)?;

    // Determine output path
    let output_path = if let Some(path) = options.output {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        path
    } else {
        let dir = config.output_dir();
        std::fs::create_dir_all(&dir)?;
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        dir.join(format!(
            "pc_{}.{}",
            timestamp,
            file_formats::STREAM_EXTENSION
        ))
    };

    let kind = if options.synthetic {
        SourceKind::Synthetic
    } else {
        SourceKind::Device
    };
    let mut source = backends::open_source(kind, &config)?;
    println!("Using source: {}", source.name());
    println!("Output: {}", output_path.display());
    println!(
        "Frames: {} (key distance {} mm)",
        settings.frame_count, settings.key_distance
    );

    // Set up Ctrl+C handler
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    let mut writer = StreamWriter::create(&output_path)?;
    println!();
    println!("Building background key... (keep the scene empty)");
    let summary = run_capture(&mut *source, &mut writer, &settings, &stop_flag)?;
    writer.finish()?;

    if summary.interrupted {
        println!("Stopped early.");
    }
    println!(
        "Key: {} attempt(s), {:.1}% holes, {} filled, {} unfilled",
        summary.key.attempts,
        summary.key.hole_fraction * 100.0,
        summary.key.filled,
        summary.key.unfilled
    );
    println!(
        "Captured {} frames, {} points in {:.1}s",
        summary.frames,
        summary.points,
        summary.elapsed.as_secs_f64()
    );
    println!("Stream saved: {}", output_path.display());

    Ok(())
}

/// Play a stream in the terminal
pub fn play(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    check_extension(input);
    pctrack::terminal::run(input)
}

/// Print per-frame point counts and check the stream for truncation
pub fn info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    check_extension(input);
    let mut reader = StreamReader::open(input)?;

    let mut total: u64 = 0;
    let mut empty: u64 = 0;
    let mut largest: u32 = 0;
    let result = loop {
        let frame = reader.frames_read();
        match reader.skip_frame() {
            Ok(Some(count)) => {
                println!("  frame {:>6}: {:>7} points", frame, count);
                total += u64::from(count);
                largest = largest.max(count);
                if count == 0 {
                    empty += 1;
                }
            }
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }
    };

    let frames = reader.frames_read();
    println!();
    println!("File: {}", input.display());
    println!("Frames: {} ({} empty)", frames, empty);
    println!("Points: {} total, {} max per frame", total, largest);
    if frames > 0 {
        println!("Average: {:.1} points per frame", total as f64 / frames as f64);
    }

    match result {
        Ok(()) => {
            println!("Status: complete");
            Ok(())
        }
        Err(e @ StreamError::Truncated { .. }) => {
            println!("Status: truncated");
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Export one frame of a stream as a LAS file
pub fn export(
    input: &Path,
    frame: u64,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let output_path = output.unwrap_or_else(|| {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "frame".to_string());
        input.with_file_name(format!(
            "{}_frame{}.{}",
            stem,
            frame,
            file_formats::LAS_EXTENSION
        ))
    });
    if let Some(parent) = output_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let count = laz_export::export_frame_las(input, frame, &output_path)?;
    println!(
        "Exported frame {} ({} points) to {}",
        frame,
        count,
        output_path.display()
    );
    Ok(())
}

fn check_extension(path: &Path) {
    let is_stream = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(file_formats::is_stream_extension);
    if !is_stream {
        warn!(path = %path.display(), "File does not have a .{} extension", file_formats::STREAM_EXTENSION);
    }
}
