//! Orchestration of the browse pipeline for each deployment mode

pub mod granule;
pub mod service;

pub use granule::{GranuleJob, GranuleOutcome, GranuleResolver};
pub use service::{ServiceAdapter, ServiceMessage};
pub use crate::io::scratch::ScratchFiles;

use crate::core::BrowseCompositor;
use crate::io::raster::{create_browse_image, RasterConfig};
use crate::types::BrowseResult;
use std::path::{Path, PathBuf};

/// Direct mode: build the browse product for a local file pair into `output_dir`
pub fn process_file_pair<P: AsRef<Path>, Q: AsRef<Path>, R: AsRef<Path>>(
    co_pol_path: P,
    cross_pol_path: Q,
    output_dir: R,
    compositor: &BrowseCompositor,
    config: &RasterConfig,
) -> BrowseResult<PathBuf> {
    log::info!(
        "Creating browse image from {} and {}",
        co_pol_path.as_ref().display(),
        cross_pol_path.as_ref().display()
    );
    std::fs::create_dir_all(output_dir.as_ref())?;
    create_browse_image(co_pol_path, cross_pol_path, output_dir, compositor, config)
}
