// SPDX-License-Identifier: GPL-3.0-only

//! Playback buffer decoupling stream reads from the consumer's cadence
//!
//! The consumer calls [`PlaybackBuffer::tick`] once per iteration of its own
//! loop. At most one frame record is read per tick. After a frame is
//! buffered, the buffer stays in the holding state until the consumer calls
//! [`PlaybackBuffer::release`], typically after copying the points to
//! wherever it renders from.

use super::{Point, StreamReader};
use crate::errors::StreamError;
use std::io::Read;
use tracing::{debug, warn};

/// Buffer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Nothing buffered; the next tick reads a frame
    Idle,
    /// A frame of `count` points is buffered for the consumer
    Holding { count: u32 },
}

/// Outcome of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// A frame with this many points is now held
    NewFrame(u32),
    /// A zero-point frame was consumed; the next tick reads again
    EmptyFrame,
    /// No frame could be read. Keep presenting the last frame.
    EndOfStream,
    /// The previous frame has not been released yet; nothing was read
    Holding,
}

/// One-frame buffer over a [`StreamReader`]
pub struct PlaybackBuffer<R: Read> {
    reader: StreamReader<R>,
    points: Vec<Point>,
    state: PlaybackState,
    frame_index: Option<u64>,
    ended: bool,
}

impl<R: Read> PlaybackBuffer<R> {
    pub fn new(reader: StreamReader<R>) -> Self {
        let points = Vec::with_capacity(reader.max_points());
        Self {
            reader,
            points,
            state: PlaybackState::Idle,
            frame_index: None,
            ended: false,
        }
    }

    /// Advance by at most one frame record
    ///
    /// A failure to read the count field is the end of the stream, not an
    /// error. A short point payload after a valid count is returned as
    /// [`StreamError::Truncated`] and should end playback.
    pub fn tick(&mut self) -> Result<Tick, StreamError> {
        if let PlaybackState::Holding { .. } = self.state {
            return Ok(Tick::Holding);
        }

        let count = match self.reader.read_count() {
            Ok(Some(count)) => count,
            Ok(None) => return Ok(self.end_of_stream()),
            Err(e) => {
                warn!(error = %e, "Stream read failed, treating as end of stream");
                return Ok(self.end_of_stream());
            }
        };
        self.ended = false;

        let index = self.reader.frames_read();
        if count == 0 {
            // Advances the stream without touching the buffer
            self.reader.read_payload(0, &mut Vec::new())?;
            debug!(frame = index, "Skipped empty frame");
            return Ok(Tick::EmptyFrame);
        }

        self.reader.read_payload(count, &mut self.points)?;
        self.frame_index = Some(index);
        self.state = PlaybackState::Holding { count };
        Ok(Tick::NewFrame(count))
    }

    fn end_of_stream(&mut self) -> Tick {
        if !self.ended {
            debug!(frames = self.reader.frames_read(), "Reached end of stream");
            self.ended = true;
        }
        Tick::EndOfStream
    }

    /// Mark the held frame as consumed
    pub fn release(&mut self) {
        self.state = PlaybackState::Idle;
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Points of the held frame, if any
    pub fn points(&self) -> Option<&[Point]> {
        match self.state {
            PlaybackState::Holding { count } => Some(&self.points[..count as usize]),
            PlaybackState::Idle => None,
        }
    }

    /// Held frame as raw bytes in host layout, for GPU staging
    pub fn as_bytes(&self) -> Option<&[u8]> {
        self.points().map(bytemuck::cast_slice)
    }

    /// Stream index of the most recently buffered frame
    pub fn frame_index(&self) -> Option<u64> {
        self.frame_index
    }

    /// Whether the last tick found the end of the stream
    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamWriter;
    use std::io::Cursor;

    fn buffer(frames: &[Vec<Point>]) -> PlaybackBuffer<Cursor<Vec<u8>>> {
        let mut writer = StreamWriter::new(Vec::new());
        for f in frames {
            writer.write_frame(f).unwrap();
        }
        let bytes = writer.finish().unwrap();
        PlaybackBuffer::new(StreamReader::new(Cursor::new(bytes)))
    }

    #[test]
    fn test_hold_until_released() {
        let p = Point::new([0.1, 0.2, 0.3], [9, 8, 7]);
        let mut buf = buffer(&[vec![p; 2], vec![p]]);

        assert_eq!(buf.tick().unwrap(), Tick::NewFrame(2));
        assert_eq!(buf.tick().unwrap(), Tick::Holding);
        assert_eq!(buf.points().unwrap().len(), 2);
        assert_eq!(buf.as_bytes().unwrap().len(), 32);

        buf.release();
        assert!(buf.points().is_none());
        assert_eq!(buf.tick().unwrap(), Tick::NewFrame(1));
        assert_eq!(buf.frame_index(), Some(1));
    }

    #[test]
    fn test_empty_frame_then_end() {
        let p = Point::default();
        let mut buf = buffer(&[vec![], vec![p]]);
        assert_eq!(buf.tick().unwrap(), Tick::EmptyFrame);
        assert_eq!(buf.state(), PlaybackState::Idle);
        assert_eq!(buf.tick().unwrap(), Tick::NewFrame(1));
        buf.release();
        assert_eq!(buf.tick().unwrap(), Tick::EndOfStream);
        assert_eq!(buf.tick().unwrap(), Tick::EndOfStream);
        assert!(buf.is_ended());
    }

    #[test]
    fn test_truncated_payload_is_fatal() {
        let mut writer = StreamWriter::new(Vec::new());
        writer.write_frame(&[Point::default(); 2]).unwrap();
        let mut bytes = writer.finish().unwrap();
        bytes.truncate(10);
        let mut buf = PlaybackBuffer::new(StreamReader::new(Cursor::new(bytes)));
        assert!(matches!(buf.tick(), Err(StreamError::Truncated { .. })));
    }
}
