//! Core browse-image modules

pub mod normalize;
pub mod calibration;
pub mod composite;

// Re-export main types
pub use normalize::{normalize, normalize_with_range, CalibrationRange};
pub use calibration::{BrowseProfile, RangeSource, ValueTransform};
pub use composite::{compose, coverage_mask, BrowseCompositor};
