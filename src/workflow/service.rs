use crate::core::BrowseCompositor;
use crate::io::assets::AssetSelector;
use crate::io::earthdata::Downloader;
use crate::io::raster::{create_browse_image, RasterConfig};
use crate::io::stac::{StacItem, BROWSE_MEDIA_TYPE};
use crate::io::storage::Stager;
use crate::types::{BrowseError, BrowseResult};
use serde::{Deserialize, Serialize};

/// Work message of the managed service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMessage {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub staging_location: Option<String>,
}

/// Managed-service adapter turning a catalog item into a browse item
pub struct ServiceAdapter<D: Downloader, S: Stager> {
    pub message: ServiceMessage,
    pub downloader: D,
    pub stager: S,
    pub selector: AssetSelector,
    pub compositor: BrowseCompositor,
    pub raster_config: RasterConfig,
}

impl<D: Downloader, S: Stager> ServiceAdapter<D, S> {
    pub fn new(message: ServiceMessage, downloader: D, stager: S, compositor: BrowseCompositor) -> Self {
        Self {
            message,
            downloader,
            stager,
            selector: AssetSelector::catalog_assets(),
            compositor,
            raster_config: RasterConfig::default(),
        }
    }

    /// Process one item: download both polarizations into a scratch
    /// directory, build the browse image, stage it and return a copy of the
    /// item whose only asset is the staged browse image.
    pub fn process_item(&self, item: &StacItem) -> BrowseResult<StacItem> {
        log::info!("Processing item {}", item.id);

        let hrefs = item.hrefs();
        let (co_href, cross_href) = self.selector.select_pair(&hrefs, &item.id)?;
        let location = self.message.staging_location.as_deref().ok_or_else(|| {
            BrowseError::Config(format!("No staging location in message for {}", item.id))
        })?;

        let temp_dir = tempfile::TempDir::new()?;
        let token = self.message.access_token.as_deref();
        let co_pol = self.downloader.download(co_href, temp_dir.path(), token)?;
        let cross_pol = self.downloader.download(cross_href, temp_dir.path(), token)?;

        let rgb_path = create_browse_image(
            &co_pol,
            &cross_pol,
            temp_dir.path(),
            &self.compositor,
            &self.raster_config,
        )?;
        let name = rgb_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| BrowseError::InvalidFormat(format!("Invalid output path: {}", rgb_path.display())))?
            .to_string();

        let url = self.stager.stage(&rgb_path, &name, BROWSE_MEDIA_TYPE, location)?;
        Ok(item.with_browse_asset(url, name))
    }
}
