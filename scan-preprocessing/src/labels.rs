/// Box label conversion from JSON annotations to plain text lines.
///
/// Each object becomes `x y z dx dy dz rot class`, where centroid and
/// dimensions are multiplied by the same factor as the point records and the
/// z rotation is kept in radians.
use crate::error::{PreprocessError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

/// Only `z` is written out; roll and pitch are accepted and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rotations {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxLabel {
    pub name: String,
    pub centroid: Centroid,
    pub dimensions: Dimensions,
    pub rotations: Rotations,
}

/// One annotation file; fields other than `objects` are ignored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LabelFile {
    pub objects: Vec<BoxLabel>,
}

impl BoxLabel {
    pub fn scaled(&self, scale_factor: f64) -> BoxLabel {
        BoxLabel {
            name: self.name.clone(),
            centroid: Centroid {
                x: self.centroid.x * scale_factor,
                y: self.centroid.y * scale_factor,
                z: self.centroid.z * scale_factor,
            },
            dimensions: Dimensions {
                length: self.dimensions.length * scale_factor,
                width: self.dimensions.width * scale_factor,
                height: self.dimensions.height * scale_factor,
            },
            rotations: self.rotations,
        }
    }

    /// Space separated line; floats keep a decimal point (`20.0`, not `20`).
    pub fn to_line(&self) -> String {
        format!(
            "{:?} {:?} {:?} {:?} {:?} {:?} {:?} {}",
            self.centroid.x,
            self.centroid.y,
            self.centroid.z,
            self.dimensions.length,
            self.dimensions.width,
            self.dimensions.height,
            self.rotations.z,
            self.name
        )
    }
}

pub fn parse_labels(json: &str) -> Result<LabelFile> {
    Ok(serde_json::from_str(json)?)
}

/// Text for one label file, one scaled line per object in input order.
pub fn format_labels(labels: &LabelFile, scale_factor: f64) -> Result<String> {
    if !scale_factor.is_finite() {
        return Err(PreprocessError::InvalidScale(scale_factor));
    }
    let mut text = String::new();
    for object in &labels.objects {
        text.push_str(&object.scaled(scale_factor).to_line());
        text.push('\n');
    }
    Ok(text)
}

/// Zero padded frame name, e.g. `000042.txt`.
pub fn label_file_name(ordinal: usize) -> String {
    format!("{:06}.txt", ordinal)
}
