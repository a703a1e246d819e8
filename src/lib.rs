//! opera-rtc-browse: RGB browse imagery for OPERA Sentinel-1 RTC products
//!
//! This library turns the co-pol (VV) and cross-pol (VH) backscatter rasters of an
//! OPERA RTC-S1 granule into a 4-band byte browse image (VV, VH, VV, coverage)
//! reprojected onto a fixed geographic grid for catalog display.

pub mod types;
pub mod core;
pub mod io;
pub mod workflow;
pub mod logging;

#[cfg(feature = "python")]
mod python;

// Re-export main types and functions for easier access
pub use types::{
    BackscatterImage, BrowseError, BrowseImage, BrowseResult, ByteImage, Channel, GeoTransform,
    Polarization,
};

pub use crate::core::{compose, normalize, BrowseCompositor, BrowseProfile, CalibrationRange};
pub use io::{create_browse_image, RasterConfig};
pub use workflow::{process_file_pair, GranuleJob, ServiceAdapter, ServiceMessage};
