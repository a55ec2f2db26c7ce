// SPDX-License-Identifier: GPL-3.0-only

//! Capture and export pipelines
//!
//! ```text
//! ┌──────────────┐     ┌───────────────┐     ┌───────────────┐     ┌──────────────┐
//! │ FrameSource  │ ──▶ │  Key Builder  │ ──▶ │   Extractor   │ ──▶ │ StreamWriter │
//! │ depth, color │     │  (once)       │     │  (per frame)  │     │  .pcs file   │
//! └──────────────┘     └───────────────┘     └───────────────┘     └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`key`]: background key acquisition and hole filling
//! - [`extract`]: foreground subtraction and projection to points
//! - [`session`]: the capture loop tying source, key, extractor and writer together
//! - [`visualize`]: key images for inspection
//! - [`laz_export`]: single-frame LAS export

pub mod extract;
pub mod key;
pub mod laz_export;
pub mod session;
pub mod visualize;
