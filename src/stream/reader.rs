// SPDX-License-Identifier: GPL-3.0-only

//! Frame record reader

use super::Point;
use crate::constants::stream::{COUNT_SIZE_BYTES, MAX_FRAME_POINTS, POINT_SIZE_BYTES};
use crate::errors::StreamError;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;
use tracing::{debug, warn};

/// Reads frame records one at a time
///
/// `Ok(None)` from the read methods marks the end of the stream: the next
/// count field could not be read. A count followed by a short payload is
/// corruption and reported as [`StreamError::Truncated`].
pub struct StreamReader<R: Read> {
    source: R,
    max_points: usize,
    frames_read: u64,
    scratch: Vec<u8>,
}

impl StreamReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, StreamError> {
        let file = File::open(path)?;
        debug!(path = %path.display(), "Opened point stream for reading");
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> StreamReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            max_points: MAX_FRAME_POINTS,
            frames_read: 0,
            scratch: Vec::new(),
        }
    }

    /// Refuse frames declaring more than `max_points` points
    pub fn with_max_points(mut self, max_points: usize) -> Self {
        self.max_points = max_points;
        self
    }

    pub fn max_points(&self) -> usize {
        self.max_points
    }

    /// Index of the next frame to be read
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Read the next count field
    ///
    /// Returns `Ok(None)` at a clean end of stream. A partial count field is
    /// also treated as the end, since no payload can follow it.
    pub fn read_count(&mut self) -> Result<Option<u32>, StreamError> {
        let mut buf = [0u8; COUNT_SIZE_BYTES];
        let mut filled = 0;
        while filled < COUNT_SIZE_BYTES {
            match self.source.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        match filled {
            0 => Ok(None),
            COUNT_SIZE_BYTES => Ok(Some(u32::from_le_bytes(buf))),
            partial => {
                warn!(
                    frame = self.frames_read,
                    trailing_bytes = partial,
                    "Ignoring trailing bytes at end of stream"
                );
                Ok(None)
            }
        }
    }

    /// Read `count` points into `out`, replacing its contents
    fn read_points(&mut self, count: u32, out: &mut Vec<Point>) -> Result<(), StreamError> {
        if count as usize > self.max_points {
            return Err(StreamError::FrameTooLarge {
                frame: self.frames_read,
                count,
                max: self.max_points,
            });
        }

        let len = count as usize * POINT_SIZE_BYTES;
        self.scratch.clear();
        self.scratch.reserve(len);
        let available = (&mut self.source)
            .take(len as u64)
            .read_to_end(&mut self.scratch)?;
        if available < len {
            return Err(StreamError::Truncated {
                frame: self.frames_read,
                expected_points: count,
                expected_bytes: len,
                available_bytes: available,
            });
        }

        out.clear();
        out.extend(self.scratch.chunks_exact(POINT_SIZE_BYTES).map(|chunk| {
            let mut record = [0u8; POINT_SIZE_BYTES];
            record.copy_from_slice(chunk);
            Point::from_le_bytes(&record)
        }));
        self.frames_read += 1;
        Ok(())
    }

    /// Read the next frame into `out`, returning its point count
    pub fn read_frame_into(&mut self, out: &mut Vec<Point>) -> Result<Option<u32>, StreamError> {
        let Some(count) = self.read_count()? else {
            return Ok(None);
        };
        self.read_points(count, out)?;
        Ok(Some(count))
    }

    /// Read the next frame
    pub fn read_frame(&mut self) -> Result<Option<Vec<Point>>, StreamError> {
        let mut points = Vec::new();
        Ok(self.read_frame_into(&mut points)?.map(|_| points))
    }

    /// Read a frame's payload after its count was obtained with [`Self::read_count`]
    pub fn read_payload(&mut self, count: u32, out: &mut Vec<Point>) -> Result<(), StreamError> {
        self.read_points(count, out)
    }

    /// Skip over the next frame without decoding it, returning its count
    pub fn skip_frame(&mut self) -> Result<Option<u32>, StreamError> {
        let Some(count) = self.read_count()? else {
            return Ok(None);
        };
        let len = count as u64 * POINT_SIZE_BYTES as u64;
        let skipped = std::io::copy(&mut (&mut self.source).take(len), &mut std::io::sink())?;
        if skipped < len {
            return Err(StreamError::Truncated {
                frame: self.frames_read,
                expected_points: count,
                expected_bytes: len as usize,
                available_bytes: skipped as usize,
            });
        }
        self.frames_read += 1;
        Ok(Some(count))
    }

    /// Iterate over the remaining frames
    pub fn frames(&mut self) -> FrameIter<'_, R> {
        FrameIter {
            reader: self,
            done: false,
        }
    }

}

/// Iterator over the frames of a [`StreamReader`]
///
/// Stops after the first error.
pub struct FrameIter<'a, R: Read> {
    reader: &'a mut StreamReader<R>,
    done: bool,
}

impl<R: Read> Iterator for FrameIter<'_, R> {
    type Item = Result<Vec<Point>, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.reader.read_frame().transpose();
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamWriter;
    use std::io::Cursor;

    fn encode(frames: &[Vec<Point>]) -> Vec<u8> {
        let mut writer = StreamWriter::new(Vec::new());
        for f in frames {
            writer.write_frame(f).unwrap();
        }
        writer.finish().unwrap()
    }

    #[test]
    fn test_empty_stream() {
        let mut reader = StreamReader::new(Cursor::new(Vec::new()));
        assert!(reader.read_frame().unwrap().is_none());
    }

    #[test]
    fn test_truncated_payload() {
        let mut bytes = encode(&[vec![Point::default(); 3]]);
        bytes.truncate(4 + 16 + 5);
        let mut reader = StreamReader::new(Cursor::new(bytes));
        match reader.read_frame() {
            Err(StreamError::Truncated {
                frame,
                expected_points,
                expected_bytes,
                available_bytes,
            }) => {
                assert_eq!(frame, 0);
                assert_eq!(expected_points, 3);
                assert_eq!(expected_bytes, 48);
                assert_eq!(available_bytes, 21);
            }
            other => panic!("expected truncation, got {other:?}"),
        }
    }

    #[test]
    fn test_partial_count_is_end_of_stream() {
        let mut bytes = encode(&[vec![Point::default()]]);
        bytes.extend_from_slice(&[7, 0]);
        let mut reader = StreamReader::new(Cursor::new(bytes));
        assert_eq!(reader.read_frame().unwrap().map(|f| f.len()), Some(1));
        assert!(reader.read_frame().unwrap().is_none());
    }

    #[test]
    fn test_frame_too_large() {
        let bytes = encode(&[vec![Point::default(); 5]]);
        let mut reader = StreamReader::new(Cursor::new(bytes)).with_max_points(4);
        assert!(matches!(
            reader.read_frame(),
            Err(StreamError::FrameTooLarge { count: 5, max: 4, .. })
        ));
    }

    #[test]
    fn test_frames_stop_after_error() {
        let bytes = encode(&[vec![Point::default(); 5], vec![Point::default()]]);
        let mut reader = StreamReader::new(Cursor::new(bytes)).with_max_points(4);
        let items: Vec<_> = reader.frames().take(4).collect();
        assert_eq!(items.len(), 1);
        assert!(matches!(
            items[0],
            Err(StreamError::FrameTooLarge { count: 5, .. })
        ));
    }

    #[test]
    fn test_frames_yields_all_then_stops() {
        let bytes = encode(&[vec![Point::default(); 2], vec![], vec![Point::default()]]);
        let mut reader = StreamReader::new(Cursor::new(bytes));
        let lens: Vec<usize> = reader.frames().map(|f| f.unwrap().len()).collect();
        assert_eq!(lens, vec![2, 0, 1]);
    }

    #[test]
    fn test_skip_frame() {
        let second = vec![Point::new([1.0, 2.0, 3.0], [4, 5, 6])];
        let bytes = encode(&[vec![Point::default(); 2], second.clone()]);
        let mut reader = StreamReader::new(Cursor::new(bytes));
        assert_eq!(reader.skip_frame().unwrap(), Some(2));
        assert_eq!(reader.read_frame().unwrap(), Some(second));
        assert_eq!(reader.frames_read(), 2);
    }
}
