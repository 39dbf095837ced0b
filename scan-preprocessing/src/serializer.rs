/// Fixed-record binary output for downstream array consumers.
///
/// Each point becomes four little-endian f32 values `x * s, y * s, z * s,
/// attribute`. There is no header; the record count is `len / 16`. Narrowing
/// to f32 is lossy for values that are not exactly representable, and a
/// scaled value beyond the f32 range is an error.
///
/// `.npy` output wraps the same payload in a NumPy v1.0 header describing a
/// C-ordered `<f4` array of shape `(N, 4)`.
use crate::constants::RECORD_SIZE;
use crate::error::{PreprocessError, Result};
use crate::point_set::{Point, PointSet};
use std::fs;
use std::path::Path;

const NPY_MAGIC: &[u8] = b"\x93NUMPY";
const NPY_ALIGNMENT: usize = 64;
/// magic + version + u16 header length
const NPY_PREAMBLE_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Bin,
    Npy,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "bin" => Ok(OutputFormat::Bin),
            "npy" => Ok(OutputFormat::Npy),
            _ => Err(PreprocessError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

pub fn serialize(points: &PointSet, scale_factor: f64) -> Result<Vec<u8>> {
    if !scale_factor.is_finite() {
        return Err(PreprocessError::InvalidScale(scale_factor));
    }

    let mut bytes = Vec::with_capacity(points.len() * RECORD_SIZE);
    for (index, p) in points.iter().enumerate() {
        let record = [
            (p.x * scale_factor) as f32,
            (p.y * scale_factor) as f32,
            (p.z * scale_factor) as f32,
            p.attribute as f32,
        ];
        // `as f32` saturates to infinity, which no reader accepts back
        if record.iter().any(|v| !v.is_finite()) {
            return Err(PreprocessError::RecordOverflow { index });
        }
        for value in record {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
    }
    Ok(bytes)
}

pub fn deserialize(bytes: &[u8]) -> Result<PointSet> {
    if bytes.len() % RECORD_SIZE != 0 {
        return Err(PreprocessError::MalformedRecords {
            len: bytes.len(),
            record_size: RECORD_SIZE,
        });
    }

    let points = bytes
        .chunks_exact(RECORD_SIZE)
        .map(|record| {
            let field = |i: usize| {
                let offset = i * 4;
                f32::from_le_bytes([
                    record[offset],
                    record[offset + 1],
                    record[offset + 2],
                    record[offset + 3],
                ]) as f64
            };
            Point::new(field(0), field(1), field(2)).with_attribute(field(3))
        })
        .collect();
    PointSet::new(points, true)
}

/// Serializes in the layout selected by `format`.
pub fn encode(points: &PointSet, scale_factor: f64, format: OutputFormat) -> Result<Vec<u8>> {
    let payload = serialize(points, scale_factor)?;
    Ok(match format {
        OutputFormat::Bin => payload,
        OutputFormat::Npy => {
            let mut bytes = npy_header(points.len());
            bytes.extend_from_slice(&payload);
            bytes
        }
    })
}

/// Writes `points` to `path`, choosing the layout from the extension.
pub fn write_records(path: &Path, points: &PointSet, scale_factor: f64) -> Result<()> {
    let format = OutputFormat::from_path(path)?;
    let bytes = encode(points, scale_factor, format)?;
    fs::write(path, bytes)?;
    Ok(())
}

fn npy_header(rows: usize) -> Vec<u8> {
    let mut dict = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': ({}, 4), }}",
        rows
    );
    // Pad with spaces so the payload starts on an aligned offset; the
    // header must end in a newline.
    let unpadded = NPY_PREAMBLE_LEN + dict.len() + 1;
    let padding = (NPY_ALIGNMENT - unpadded % NPY_ALIGNMENT) % NPY_ALIGNMENT;
    dict.push_str(&" ".repeat(padding));
    dict.push('\n');

    let mut bytes = Vec::with_capacity(NPY_PREAMBLE_LEN + dict.len());
    bytes.extend_from_slice(NPY_MAGIC);
    bytes.extend_from_slice(&[1, 0]);
    bytes.extend_from_slice(&(dict.len() as u16).to_le_bytes());
    bytes.extend_from_slice(dict.as_bytes());
    bytes
}

/// Strips a header produced by [`encode`] and returns the record payload.
pub fn npy_payload(bytes: &[u8]) -> Result<&[u8]> {
    let invalid = |msg: &str| PreprocessError::MalformedNpy(msg.to_string());

    if bytes.len() < NPY_PREAMBLE_LEN || &bytes[..6] != NPY_MAGIC {
        return Err(invalid("missing NumPy magic"));
    }
    if bytes[6] != 1 {
        return Err(invalid("unsupported NumPy format version"));
    }
    let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
    let data_start = NPY_PREAMBLE_LEN + header_len;
    if bytes.len() < data_start {
        return Err(invalid("truncated NumPy header"));
    }
    let header = String::from_utf8_lossy(&bytes[NPY_PREAMBLE_LEN..data_start]);
    if !header.contains("'descr': '<f4'") || !header.contains("'fortran_order': False") {
        return Err(invalid("NumPy header does not describe <f4 C-ordered records"));
    }
    Ok(&bytes[data_start..])
}
