// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "pctrack")]
#[command(about = "Capture and play back colored point cloud streams from a depth camera")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture a point cloud stream
    Capture {
        /// Output file path (default: ~/Videos/PointClouds/pc_TIMESTAMP.pcs)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of frames to capture after the key is built
        #[arg(short = 'n', long)]
        frames: Option<u32>,

        /// Foreground margin in millimeters (1-1000)
        #[arg(short, long)]
        key_distance: Option<u32>,

        /// Depth camera index to use (from 'pctrack list')
        #[arg(long)]
        device: Option<usize>,

        /// Use the simulated sensor instead of a depth camera
        #[arg(long)]
        synthetic: bool,

        /// Give up building the key after this many noisy frames
        #[arg(long)]
        max_key_attempts: Option<u32>,

        /// Save the background key as a PNG
        #[arg(long)]
        key_image: Option<PathBuf>,

        /// Config file (default: ~/.config/pctrack/capture.json)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Play a stream in the terminal
    Play {
        /// Stream file
        input: PathBuf,
    },

    /// Show frame counts and check a stream for truncation
    Info {
        /// Stream file
        input: PathBuf,
    },

    /// Export one frame as a LAS point cloud
    Export {
        /// Stream file
        input: PathBuf,

        /// Frame index (0-based)
        #[arg(short, long, default_value = "0")]
        frame: u64,

        /// Output file path (default: INPUT_frameN.las next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List available depth cameras
    List,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=pctrack=debug, RUST_LOG=info
    // The player owns the screen, so only errors get through there.
    let filter = match cli.command {
        Commands::Play { .. } => tracing_subscriber::EnvFilter::new("error"),
        _ => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .init();

    match cli.command {
        Commands::Capture {
            output,
            frames,
            key_distance,
            device,
            synthetic,
            max_key_attempts,
            key_image,
            config,
        } => cli::capture(cli::CaptureOptions {
            output,
            frames,
            key_distance,
            device,
            synthetic,
            max_key_attempts,
            key_image,
            config,
        }),
        Commands::Play { input } => cli::play(&input),
        Commands::Info { input } => cli::info(&input),
        Commands::Export {
            input,
            frame,
            output,
        } => cli::export(&input, frame, output),
        Commands::List => cli::list_devices(),
    }
}
