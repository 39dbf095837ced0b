/// Point file codecs, chosen by file extension.
pub mod laz;
pub mod ply;

use crate::constants::POINT_FILE_EXTENSIONS;
use crate::error::{PreprocessError, Result};
use crate::point_set::PointSet;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointFormat {
    Ply,
    Las,
}

impl PointFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        match lowercase_extension(path).as_deref() {
            Some("ply") => Ok(PointFormat::Ply),
            Some("las") | Some("laz") => Ok(PointFormat::Las),
            _ => Err(PreprocessError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// True for files batch discovery should pick up.
pub fn is_point_file(path: &Path) -> bool {
    lowercase_extension(path)
        .map(|ext| POINT_FILE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

pub fn load(path: &Path) -> Result<PointSet> {
    let points = match PointFormat::from_path(path)? {
        PointFormat::Ply => ply::read_ply(BufReader::new(File::open(path)?))?,
        PointFormat::Las => laz::read_las(path)?,
    };
    log::debug!("Loaded {} points from {}", points.len(), path.display());
    Ok(points)
}

pub fn save(path: &Path, points: &PointSet) -> Result<()> {
    match PointFormat::from_path(path)? {
        PointFormat::Ply => {
            let mut writer = BufWriter::new(File::create(path)?);
            ply::write_ply(&mut writer, points)?;
        }
        PointFormat::Las => laz::write_las(path, points)?,
    }
    log::debug!("Saved {} points to {}", points.len(), path.display());
    Ok(())
}

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}
