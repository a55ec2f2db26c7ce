// SPDX-License-Identifier: GPL-3.0-only

//! Frame record writer

use super::Point;
use crate::constants::stream::POINT_SIZE_BYTES;
use crate::errors::StreamError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, trace};

/// Appends count-prefixed frame records to a sink in capture order
///
/// Every write must complete in full; a short write surfaces as
/// [`StreamError::Io`] and the stream should be considered lost.
pub struct StreamWriter<W: Write> {
    sink: W,
    scratch: Vec<u8>,
    frames_written: u64,
    points_written: u64,
}

impl StreamWriter<BufWriter<File>> {
    /// Create (or truncate) a stream file
    pub fn create(path: &Path) -> Result<Self, StreamError> {
        let file = File::create(path)?;
        debug!(path = %path.display(), "Opened point stream for writing");
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> StreamWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            scratch: Vec::new(),
            frames_written: 0,
            points_written: 0,
        }
    }

    /// Write one frame record
    pub fn write_frame(&mut self, points: &[Point]) -> Result<(), StreamError> {
        let count = u32::try_from(points.len()).map_err(|_| {
            StreamError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("frame of {} points does not fit a u32 count", points.len()),
            ))
        })?;

        self.scratch.clear();
        self.scratch.reserve(points.len() * POINT_SIZE_BYTES);
        for p in points {
            self.scratch.extend_from_slice(&p.to_le_bytes());
        }

        self.sink.write_all(&count.to_le_bytes())?;
        self.sink.write_all(&self.scratch)?;

        trace!(frame = self.frames_written, count, "Wrote frame record");
        self.frames_written += 1;
        self.points_written += u64::from(count);
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), StreamError> {
        self.sink.flush()?;
        Ok(())
    }

    /// Flush and hand back the sink
    pub fn finish(mut self) -> Result<W, StreamError> {
        self.sink.flush()?;
        Ok(self.sink)
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn points_written(&self) -> u64 {
        self.points_written
    }
}
