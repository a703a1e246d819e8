use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

/// Real-valued backscatter sample (linear power)
pub type Backscatter = f32;

/// 2D backscatter raster (rows x columns)
pub type BackscatterImage = Array2<Backscatter>;

/// 2D 8-bit raster produced by normalization
pub type ByteImage = Array2<u8>;

/// 3D browse raster (rows x columns x 4 channels)
pub type BrowseImage = Array3<u8>;

/// Number of channels in a browse image: co-pol, cross-pol, co-pol, coverage
pub const BROWSE_BANDS: usize = 4;

/// Polarization modes for Sentinel-1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarization {
    VV,
    VH,
    HV,
    HH,
}

impl std::fmt::Display for Polarization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Polarization::VV => write!(f, "VV"),
            Polarization::VH => write!(f, "VH"),
            Polarization::HV => write!(f, "HV"),
            Polarization::HH => write!(f, "HH"),
        }
    }
}

/// The two inputs of a dual-pol browse pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    CoPol,
    CrossPol,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::CoPol => write!(f, "co-pol"),
            Channel::CrossPol => write!(f, "cross-pol"),
        }
    }
}

/// Geospatial transformation parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self {
            top_left_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            top_left_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.top_left_x,
            self.pixel_width,
            self.rotation_x,
            self.top_left_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }

    /// Map a (column, row) pixel position to georeferenced coordinates
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.top_left_x + col * self.pixel_width + row * self.rotation_x,
            self.top_left_y + col * self.rotation_y + row * self.pixel_height,
        )
    }
}

/// Error types for browse generation
#[derive(Debug, thiserror::Error)]
pub enum BrowseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("Shape mismatch: co-pol is {co_pol:?}, cross-pol is {cross_pol:?}")]
    ShapeMismatch {
        co_pol: (usize, usize),
        cross_pol: (usize, usize),
    },

    #[error("No {label} found for {id}")]
    MissingInput { label: String, id: String },

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Processing error: {0}")]
    Processing(String),
}

/// Result type for browse operations
pub type BrowseResult<T> = Result<T, BrowseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polarization_display() {
        assert_eq!(Polarization::VV.to_string(), "VV");
        assert_eq!(Polarization::HV.to_string(), "HV");
    }

    #[test]
    fn test_geo_transform_round_trip() {
        let gt = [500000.0, 30.0, 0.0, 4200000.0, 0.0, -30.0];
        let transform = GeoTransform::from_gdal(gt);
        assert_eq!(transform.to_gdal(), gt);

        let (x, y) = transform.apply(2.0, 3.0);
        assert_eq!(x, 500060.0);
        assert_eq!(y, 4199910.0);
    }

    #[test]
    fn test_missing_input_message() {
        let err = BrowseError::MissingInput {
            label: "VV.tif".to_string(),
            id: "mock-item".to_string(),
        };
        assert_eq!(err.to_string(), "No VV.tif found for mock-item");
    }
}
