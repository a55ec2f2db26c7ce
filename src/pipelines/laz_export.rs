// SPDX-License-Identifier: GPL-3.0-only

//! LAS point cloud export
//!
//! Writes one stored frame as an uncompressed LAS 1.4 file with color.

use crate::errors::ExportError;
use crate::stream::{Point, StreamReader};
use las::{Builder, Color, Writer};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Coordinate precision of exported points (1 mm)
const LAS_SCALE: f64 = 0.001;

/// Read frame `index` (zero-based) from a stream
pub fn read_frame_at<R: Read>(
    reader: &mut StreamReader<R>,
    index: u64,
) -> Result<Vec<Point>, ExportError> {
    while reader.frames_read() < index {
        if reader.skip_frame()?.is_none() {
            return Err(ExportError::FrameNotFound(index));
        }
    }
    reader
        .read_frame()?
        .ok_or(ExportError::FrameNotFound(index))
}

/// Min and max of one coordinate over all points
fn bounds(points: &[Point], axis: usize) -> (f64, f64) {
    points
        .iter()
        .map(|p| f64::from(p.position[axis]))
        .fold((f64::MAX, f64::MIN), |(min, max), v| (min.min(v), max.max(v)))
}

/// Export points as a LAS file with color
///
/// `frame` is only used for error reporting.
pub fn export_points_las(points: &[Point], frame: u64, output_path: &Path) -> Result<(), ExportError> {
    if points.is_empty() {
        return Err(ExportError::EmptyFrame(frame));
    }

    info!(
        point_count = points.len(),
        path = %output_path.display(),
        "Exporting point cloud"
    );

    let transform = |axis| {
        let (min, max) = bounds(points, axis);
        las::Transform {
            scale: LAS_SCALE,
            offset: (min + max) / 2.0,
        }
    };

    let mut builder = Builder::from((1, 4)); // LAS 1.4
    builder.point_format.has_color = true;
    builder.point_format.is_compressed = false;
    builder.transforms = las::Vector {
        x: transform(0),
        y: transform(1),
        z: transform(2),
    };
    let header = builder.into_header()?;

    let mut writer = Writer::from_path(output_path, header)?;
    for p in points {
        let [r, g, b] = p.rgb();
        let mut point = las::Point::default();
        point.x = f64::from(p.x());
        point.y = f64::from(p.y());
        point.z = f64::from(p.z());
        point.color = Some(Color::new(
            u16::from(r) * 256,
            u16::from(g) * 256,
            u16::from(b) * 256,
        ));
        writer.write_point(point)?;
    }
    writer.close()?;

    debug!(path = %output_path.display(), "LAS export complete");
    Ok(())
}

/// Export frame `index` of the stream at `input` to `output`
///
/// Returns the number of points written.
pub fn export_frame_las(input: &Path, index: u64, output: &Path) -> Result<usize, ExportError> {
    let mut reader = StreamReader::open(input)?;
    let points = read_frame_at(&mut reader, index)?;
    export_points_las(&points, index, output)?;
    Ok(points.len())
}
