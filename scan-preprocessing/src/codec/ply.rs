/// PLY point reading and writing.
///
/// Reads `ascii`, `binary_little_endian` and `binary_big_endian` files. Only
/// the `vertex` element is decoded: `x`, `y`, `z` and, when present,
/// `intensity` or `scalar_intensity` as the point attribute. Elements before
/// `vertex` are skipped; anything after it is ignored. Header counts are not
/// trusted for allocation: a short body is an error.
use crate::error::{PreprocessError, Result};
use crate::point_set::{Point, PointSet};
use std::io::{self, BufRead, Read, Write};

const ATTRIBUTE_NAMES: &[&str] = &["intensity", "scalar_intensity"];

/// Upper bound on vertices reserved before any row has been read.
const MAX_RESERVED_VERTICES: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Ascii,
    LittleEndian,
    BigEndian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl ScalarType {
    fn parse(name: &str) -> Result<Self> {
        Ok(match name {
            "char" | "int8" => ScalarType::I8,
            "uchar" | "uint8" => ScalarType::U8,
            "short" | "int16" => ScalarType::I16,
            "ushort" | "uint16" => ScalarType::U16,
            "int" | "int32" => ScalarType::I32,
            "uint" | "uint32" => ScalarType::U32,
            "float" | "float32" => ScalarType::F32,
            "double" | "float64" => ScalarType::F64,
            other => return Err(ply_error(format!("unknown property type '{}'", other))),
        })
    }

    fn size(self) -> usize {
        match self {
            ScalarType::I8 | ScalarType::U8 => 1,
            ScalarType::I16 | ScalarType::U16 => 2,
            ScalarType::I32 | ScalarType::U32 | ScalarType::F32 => 4,
            ScalarType::F64 => 8,
        }
    }
}

#[derive(Debug, Clone)]
enum PropertyKind {
    Scalar(ScalarType),
    List { count: ScalarType, item: ScalarType },
}

#[derive(Debug, Clone)]
struct Property {
    name: String,
    kind: PropertyKind,
}

#[derive(Debug, Clone)]
struct Element {
    name: String,
    count: usize,
    properties: Vec<Property>,
}

#[derive(Debug)]
struct Header {
    encoding: Encoding,
    elements: Vec<Element>,
}

/// Slots of the vertex properties we care about.
struct VertexLayout {
    x: usize,
    y: usize,
    z: usize,
    attribute: Option<usize>,
}

impl VertexLayout {
    fn from_element(element: &Element) -> Result<Self> {
        let find = |name: &str| element.properties.iter().position(|p| p.name == name);
        let required = |name: &str| {
            find(name).ok_or_else(|| ply_error(format!("vertex element has no '{}' property", name)))
        };
        Ok(Self {
            x: required("x")?,
            y: required("y")?,
            z: required("z")?,
            attribute: ATTRIBUTE_NAMES.iter().find_map(|name| find(name)),
        })
    }
}

pub fn read_ply<R: BufRead>(mut reader: R) -> Result<PointSet> {
    let header = read_header(&mut reader)?;
    let mut points = Vec::new();
    let mut has_attribute = false;

    match header.encoding {
        Encoding::Ascii => {
            let mut body = String::new();
            reader.read_to_string(&mut body)?;
            let mut tokens = body.split_whitespace();
            for element in &header.elements {
                if element.name == "vertex" {
                    let layout = VertexLayout::from_element(element)?;
                    has_attribute = layout.attribute.is_some();
                    points = read_vertices(element, &layout, || {
                        read_ascii_row(&mut tokens, element)
                    })?;
                    break;
                }
                // rows without properties carry no data
                if element.properties.is_empty() {
                    continue;
                }
                for _ in 0..element.count {
                    read_ascii_row(&mut tokens, element)?;
                }
            }
        }
        encoding => {
            for element in &header.elements {
                if element.name == "vertex" {
                    let layout = VertexLayout::from_element(element)?;
                    has_attribute = layout.attribute.is_some();
                    points = read_vertices(element, &layout, || {
                        read_binary_row(&mut reader, element, encoding)
                    })?;
                    break;
                }
                if element.properties.is_empty() {
                    continue;
                }
                for _ in 0..element.count {
                    read_binary_row(&mut reader, element, encoding)?;
                }
            }
        }
    }

    PointSet::new(points, has_attribute)
}

/// Writes `binary_little_endian` with double coordinates and a float
/// intensity when the set carries an attribute.
pub fn write_ply<W: Write>(writer: &mut W, points: &PointSet) -> Result<()> {
    writeln!(writer, "ply")?;
    writeln!(writer, "format binary_little_endian 1.0")?;
    writeln!(writer, "element vertex {}", points.len())?;
    writeln!(writer, "property double x")?;
    writeln!(writer, "property double y")?;
    writeln!(writer, "property double z")?;
    if points.has_attribute() {
        writeln!(writer, "property float intensity")?;
    }
    writeln!(writer, "end_header")?;

    for p in points {
        writer.write_all(&p.x.to_le_bytes())?;
        writer.write_all(&p.y.to_le_bytes())?;
        writer.write_all(&p.z.to_le_bytes())?;
        if points.has_attribute() {
            writer.write_all(&(p.attribute as f32).to_le_bytes())?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn read_vertices<F>(element: &Element, layout: &VertexLayout, mut next_row: F) -> Result<Vec<Point>>
where
    F: FnMut() -> Result<Vec<f64>>,
{
    let mut points = Vec::with_capacity(element.count.min(MAX_RESERVED_VERTICES));
    for _ in 0..element.count {
        let row = next_row()?;
        let attribute = layout.attribute.map_or(0.0, |i| row[i]);
        points.push(Point::new(row[layout.x], row[layout.y], row[layout.z]).with_attribute(attribute));
    }
    Ok(points)
}

fn read_header<R: BufRead>(reader: &mut R) -> Result<Header> {
    let mut line = String::new();
    let mut next_line = |reader: &mut R| -> Result<String> {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(ply_error("unexpected end of file in header"));
        }
        Ok(line.trim().to_string())
    };

    if next_line(reader)? != "ply" {
        return Err(ply_error("missing 'ply' magic"));
    }

    let mut encoding = None;
    let mut elements: Vec<Element> = Vec::new();
    loop {
        let line = next_line(reader)?;
        let mut words = line.split_whitespace();
        match words.next() {
            Some("format") => {
                encoding = Some(match words.next() {
                    Some("ascii") => Encoding::Ascii,
                    Some("binary_little_endian") => Encoding::LittleEndian,
                    Some("binary_big_endian") => Encoding::BigEndian,
                    other => {
                        return Err(ply_error(format!("unsupported format {:?}", other)));
                    }
                });
            }
            Some("element") => {
                let name = words
                    .next()
                    .ok_or_else(|| ply_error("element without a name"))?;
                let count = words
                    .next()
                    .and_then(|c| c.parse().ok())
                    .ok_or_else(|| ply_error(format!("invalid count for element '{}'", name)))?;
                elements.push(Element {
                    name: name.to_string(),
                    count,
                    properties: Vec::new(),
                });
            }
            Some("property") => {
                let element = elements
                    .last_mut()
                    .ok_or_else(|| ply_error("property declared before any element"))?;
                let words: Vec<&str> = words.collect();
                let property = match words.as_slice() {
                    ["list", count, item, name] => Property {
                        name: name.to_string(),
                        kind: PropertyKind::List {
                            count: ScalarType::parse(count)?,
                            item: ScalarType::parse(item)?,
                        },
                    },
                    [ty, name] => Property {
                        name: name.to_string(),
                        kind: PropertyKind::Scalar(ScalarType::parse(ty)?),
                    },
                    _ => return Err(ply_error(format!("malformed property line '{}'", line))),
                };
                element.properties.push(property);
            }
            Some("end_header") => break,
            Some("comment") | Some("obj_info") | None => {}
            Some(other) => return Err(ply_error(format!("unexpected header keyword '{}'", other))),
        }
    }

    let encoding = encoding.ok_or_else(|| ply_error("missing format line"))?;
    if !elements.iter().any(|e| e.name == "vertex") {
        return Err(ply_error("no vertex element"));
    }
    Ok(Header { encoding, elements })
}

/// One row; list properties yield their length so indices stay aligned.
fn read_ascii_row<'a, I>(tokens: &mut I, element: &Element) -> Result<Vec<f64>>
where
    I: Iterator<Item = &'a str>,
{
    let mut next_value = || -> Result<f64> {
        let token = tokens
            .next()
            .ok_or_else(|| ply_error(format!("unexpected end of data in '{}'", element.name)))?;
        token
            .parse::<f64>()
            .map_err(|_| ply_error(format!("invalid number '{}'", token)))
    };

    let mut row = Vec::with_capacity(element.properties.len());
    for property in &element.properties {
        match property.kind {
            PropertyKind::Scalar(_) => row.push(next_value()?),
            PropertyKind::List { .. } => {
                let len = next_value()?;
                for _ in 0..len as usize {
                    next_value()?;
                }
                row.push(len);
            }
        }
    }
    Ok(row)
}

fn read_binary_row<R: Read>(reader: &mut R, element: &Element, encoding: Encoding) -> Result<Vec<f64>> {
    let mut row = Vec::with_capacity(element.properties.len());
    for property in &element.properties {
        match property.kind {
            PropertyKind::Scalar(ty) => row.push(read_binary_scalar(reader, ty, encoding)?),
            PropertyKind::List { count, item } => {
                let len = read_binary_scalar(reader, count, encoding)?;
                skip_list_items(reader, len, item)?;
                row.push(len);
            }
        }
    }
    Ok(row)
}

/// Discards `len` list items without buffering them.
fn skip_list_items<R: Read>(reader: &mut R, len: f64, item: ScalarType) -> Result<()> {
    if !(len >= 0.0 && len.fract() == 0.0 && len <= u32::MAX as f64) {
        return Err(ply_error(format!("invalid list length {}", len)));
    }
    let bytes = (len as u64) * item.size() as u64;
    let skipped = io::copy(&mut reader.by_ref().take(bytes), &mut io::sink())?;
    if skipped != bytes {
        return Err(ply_error("unexpected end of data in list property"));
    }
    Ok(())
}

fn read_binary_scalar<R: Read>(reader: &mut R, ty: ScalarType, encoding: Encoding) -> Result<f64> {
    let mut buf = [0u8; 8];
    let bytes = &mut buf[..ty.size()];
    reader.read_exact(bytes)?;
    if encoding == Encoding::BigEndian {
        bytes.reverse();
    }
    // `bytes` is little-endian from here on
    Ok(match ty {
        ScalarType::I8 => bytes[0] as i8 as f64,
        ScalarType::U8 => bytes[0] as f64,
        ScalarType::I16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f64,
        ScalarType::U16 => u16::from_le_bytes([bytes[0], bytes[1]]) as f64,
        ScalarType::I32 => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
        ScalarType::U32 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
        ScalarType::F32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
        ScalarType::F64 => {
            let mut wide = [0u8; 8];
            wide.copy_from_slice(bytes);
            f64::from_le_bytes(wide)
        }
    })
}

fn ply_error(msg: impl Into<String>) -> PreprocessError {
    PreprocessError::Ply(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const ASCII_CLOUD: &str = "ply
format ascii 1.0
comment written by hand
element camera 1
property float px
property list uchar int ids
element vertex 3
property float x
property float y
property float z
property uchar red
property float intensity
element face 1
property list uchar int vertex_indices
end_header
0.5 2 1 2
1.0 2.0 3.0 255 0.25
-1.5 0 4 10 7
0 0 0 0 1
3 0 1 2
";

    #[test]
    fn reads_ascii_with_skipped_elements() {
        let set = read_ply(Cursor::new(ASCII_CLOUD)).unwrap();
        assert_eq!(set.len(), 3);
        assert!(set.has_attribute());
        let p = set.points()[1];
        assert_eq!((p.x, p.y, p.z, p.attribute), (-1.5, 0.0, 4.0, 7.0));
    }

    #[test]
    fn binary_round_trip_preserves_coordinates() {
        let points = vec![
            Point::new(0.1, -2.75, 1e6).with_attribute(3.5),
            Point::new(-0.0, 7.0, 1.0 / 3.0).with_attribute(0.0),
        ];
        let set = PointSet::new(points, true).unwrap();
        let mut bytes = Vec::new();
        write_ply(&mut bytes, &set).unwrap();

        let back = read_ply(Cursor::new(bytes)).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn attribute_is_optional() {
        let set = PointSet::from_positions([[1.0, 2.0, 3.0]]).unwrap();
        let mut bytes = Vec::new();
        write_ply(&mut bytes, &set).unwrap();
        let back = read_ply(Cursor::new(bytes)).unwrap();
        assert!(!back.has_attribute());
        assert_eq!(back.points()[0].attribute, 0.0);
    }

    #[test]
    fn reads_big_endian_floats() {
        let mut bytes = b"ply\nformat binary_big_endian 1.0\nelement vertex 1\n\
property float x\nproperty float y\nproperty float z\nend_header\n"
            .to_vec();
        for v in [1.5f32, -2.0, 8.25] {
            bytes.extend_from_slice(&v.to_be_bytes());
        }
        let set = read_ply(Cursor::new(bytes)).unwrap();
        assert_eq!(set.points()[0].position(), [1.5, -2.0, 8.25]);
    }

    #[test]
    fn rejects_truncated_and_malformed_input() {
        let truncated = "ply\nformat ascii 1.0\nelement vertex 2\nproperty float x\n\
property float y\nproperty float z\nend_header\n1 2 3\n";
        assert!(read_ply(Cursor::new(truncated)).is_err());

        let no_z = "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\n\
property float y\nend_header\n1 2\n";
        assert!(matches!(
            read_ply(Cursor::new(no_z)),
            Err(PreprocessError::Ply(_))
        ));

        assert!(read_ply(Cursor::new("not a ply file\n")).is_err());
    }

    #[test]
    fn rejects_non_finite_vertices() {
        let cloud = "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\n\
property float y\nproperty float z\nend_header\nnan 0 0\n";
        assert!(matches!(
            read_ply(Cursor::new(cloud)),
            Err(PreprocessError::NonFiniteCoordinate { index: 0 })
        ));
    }

    #[test]
    fn oversized_vertex_count_is_an_error() {
        let mut bytes = b"ply\nformat binary_little_endian 1.0\n\
element vertex 18446744073709551615\n\
property float x\nproperty float y\nproperty float z\nend_header\n"
            .to_vec();
        for v in [1.0f32, 2.0, 3.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        assert!(read_ply(Cursor::new(bytes)).is_err());
    }

    #[test]
    fn oversized_list_length_is_an_error() {
        let mut bytes = b"ply\nformat binary_little_endian 1.0\n\
element face 1\nproperty list uint int vertex_indices\n\
element vertex 1\nproperty float x\nproperty float y\nproperty float z\nend_header\n"
            .to_vec();
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 8]);
        assert!(matches!(
            read_ply(Cursor::new(bytes)),
            Err(PreprocessError::Ply(_))
        ));
    }

    #[test]
    fn empty_elements_with_huge_counts_are_skipped() {
        let cloud = "ply\nformat ascii 1.0\nelement marker 18446744073709551615\n\
element vertex 1\nproperty float x\nproperty float y\nproperty float z\nend_header\n1 2 3\n";
        let set = read_ply(Cursor::new(cloud)).unwrap();
        assert_eq!(set.points()[0].position(), [1.0, 2.0, 3.0]);
    }
}
