//! I/O modules: rasters, granule downloads, staging and catalog items

pub mod raster;
pub mod assets;
pub mod earthdata;
pub mod storage;
pub mod stac;
pub mod scratch;

pub use raster::{create_browse_image, read_band, write_browse, RasterConfig};
pub use assets::{AssetSelector, ChannelMatcher};
pub use earthdata::{AsfSearch, Downloader, EarthdataAuth, EarthdataCredentials, EarthdataSession};
pub use storage::{ObjectStorage, S3Stager, Stager};
pub use stac::{StacAsset, StacItem};
pub use scratch::ScratchFiles;
