/// LAS/LAZ reading and writing through the `las` crate
use crate::bounds::PointCloudBounds;
use crate::error::Result;
use crate::point_set::{Point, PointSet};
use las::{Builder, Reader, Transform, Vector, Writer};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Millimetre quantisation for written coordinates.
const COORDINATE_SCALE: f64 = 0.001;

/// Upper bound on points reserved up front; the header count is not trusted.
const MAX_RESERVED_POINTS: usize = 1 << 20;

/// Create LAS file reader for point cloud access.
/// Handles both .las and .laz compressed formats.
pub fn create_reader(file_path: &Path) -> Result<Reader> {
    let file = File::open(file_path)?;
    let buf_reader = BufReader::new(file);
    Ok(Reader::new(buf_reader)?)
}

/// Load every point of a LAS/LAZ file; intensity becomes the attribute.
pub fn read_las(file_path: &Path) -> Result<PointSet> {
    let mut reader = create_reader(file_path)?;
    let declared = usize::try_from(reader.header().number_of_points()).unwrap_or(usize::MAX);

    let mut points = Vec::with_capacity(declared.min(MAX_RESERVED_POINTS));
    for point_result in reader.points() {
        let point = point_result?;
        points.push(Point::new(point.x, point.y, point.z).with_attribute(point.intensity as f64));
    }
    PointSet::new(points, true)
}

/// Transforms with offsets at the floored minimum of the set, so projected
/// coordinates such as UTM stay within the i32 record range.
fn transforms_for(points: &PointSet) -> Vector<Transform> {
    let bounds = PointCloudBounds::from_points(points);
    let offset = |min: f64| if bounds.is_valid() { min.floor() } else { 0.0 };
    Vector {
        x: Transform {
            scale: COORDINATE_SCALE,
            offset: offset(bounds.min_x),
        },
        y: Transform {
            scale: COORDINATE_SCALE,
            offset: offset(bounds.min_y),
        },
        z: Transform {
            scale: COORDINATE_SCALE,
            offset: offset(bounds.min_z),
        },
    }
}

/// Write LAS 1.4 point format 0; a `.laz` path is written compressed.
/// The attribute is rounded and clamped into the u16 intensity field.
pub fn write_las(file_path: &Path, points: &PointSet) -> Result<()> {
    let transforms = transforms_for(points);
    // An unencodable point must fail here: the writer panics if dropped
    // after a failed write.
    for p in points {
        transforms.x.inverse(p.x)?;
        transforms.y.inverse(p.y)?;
        transforms.z.inverse(p.z)?;
    }

    let mut builder = Builder::from((1, 4));
    builder.point_format = las::point::Format::new(0)?;
    builder.transforms = transforms;
    let header = builder.into_header()?;

    let mut writer = Writer::from_path(file_path, header)?;
    for p in points {
        let point = las::Point {
            x: p.x,
            y: p.y,
            z: p.z,
            intensity: p.attribute.round().clamp(0.0, u16::MAX as f64) as u16,
            ..Default::default()
        };
        writer.write_point(point)?;
    }
    writer.close()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PreprocessError;

    #[test]
    fn las_round_trip_keeps_positions_and_intensity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.las");
        let points = vec![
            Point::new(1.25, -3.5, 10.0).with_attribute(12.0),
            Point::new(0.0, 0.5, -2.0).with_attribute(70000.0),
        ];
        let set = PointSet::new(points, true).unwrap();

        write_las(&path, &set).unwrap();
        let back = read_las(&path).unwrap();

        assert_eq!(back.len(), 2);
        let a = back.points()[0];
        // transforms quantise to millimetres
        assert!((a.x - 1.25).abs() < 1e-3);
        assert!((a.y + 3.5).abs() < 1e-3);
        assert!((a.z - 10.0).abs() < 1e-3);
        assert_eq!(a.attribute, 12.0);
        assert_eq!(back.points()[1].attribute, u16::MAX as f64);
    }

    #[test]
    fn utm_scale_coordinates_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("utm.las");
        let set = PointSet::new(
            vec![
                Point::new(500_000.0, 5_000_000.0, 12.0).with_attribute(3.0),
                Point::new(500_123.456, 5_000_987.654, 140.25).with_attribute(4.0),
            ],
            true,
        )
        .unwrap();

        write_las(&path, &set).unwrap();
        let back = read_las(&path).unwrap();
        for (a, b) in back.iter().zip(set.iter()) {
            assert!((a.x - b.x).abs() < 1e-3, "x {} vs {}", a.x, b.x);
            assert!((a.y - b.y).abs() < 1e-3, "y {} vs {}", a.y, b.y);
            assert!((a.z - b.z).abs() < 1e-3, "z {} vs {}", a.z, b.z);
        }
    }

    #[test]
    fn unencodable_extent_is_an_error_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.las");
        // 1e7 m span at millimetre scale overflows the i32 record range
        let set = PointSet::from_positions([[0.0, 0.0, 0.0], [1.0e7, 0.0, 0.0]]).unwrap();
        assert!(matches!(write_las(&path, &set), Err(PreprocessError::Las(_))));
    }

    #[test]
    fn empty_set_writes_a_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.las");
        write_las(&path, &PointSet::default()).unwrap();
        assert!(read_las(&path).unwrap().is_empty());
    }
}
