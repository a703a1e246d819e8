use crate::core::BrowseCompositor;
use crate::io::assets::AssetSelector;
use crate::io::earthdata::{is_opera_rtc_granule, AsfSearch, Downloader};
use crate::io::raster::{create_browse_image, RasterConfig};
use crate::io::storage::ObjectStorage;
use crate::types::{BrowseResult, Polarization};
use crate::workflow::ScratchFiles;
use std::path::PathBuf;

/// Resolves a granule name to its product URLs
pub trait GranuleResolver {
    fn granule_urls(&self, granule: &str) -> BrowseResult<Vec<String>>;
}

impl GranuleResolver for AsfSearch {
    fn granule_urls(&self, granule: &str) -> BrowseResult<Vec<String>> {
        AsfSearch::granule_urls(self, granule)
    }
}

/// Result of a granule run
#[derive(Debug, Clone, PartialEq)]
pub struct GranuleOutcome {
    pub browse_path: PathBuf,
    /// Object key when the product was uploaded
    pub uploaded_key: Option<String>,
}

/// Download-then-process-then-upload run for one granule
#[derive(Debug, Clone)]
pub struct GranuleJob {
    pub granule: String,
    pub working_dir: PathBuf,
    pub bucket: Option<String>,
    pub bucket_prefix: String,
    pub selector: AssetSelector,
    pub compositor: BrowseCompositor,
    pub raster_config: RasterConfig,
}

impl GranuleJob {
    pub fn new(granule: impl Into<String>, working_dir: impl Into<PathBuf>, compositor: BrowseCompositor) -> Self {
        Self {
            granule: granule.into(),
            working_dir: working_dir.into(),
            bucket: None,
            bucket_prefix: String::new(),
            selector: AssetSelector::granule_urls(),
            compositor,
            raster_config: RasterConfig::default(),
        }
    }

    pub fn with_bucket(mut self, bucket: Option<String>, prefix: impl Into<String>) -> Self {
        self.bucket = bucket;
        self.bucket_prefix = prefix.into();
        self
    }

    /// Local file a polarization of this granule is stored as
    pub fn local_path(&self, polarization: Polarization) -> PathBuf {
        self.working_dir.join(format!("{}_{}.tif", self.granule, polarization))
    }

    /// Locate or download the co-pol and cross-pol rasters, tracking each in
    /// `sources` as soon as it is on disk
    fn fetch_inputs<R, D>(
        &self,
        resolver: &R,
        downloader: &D,
        sources: &mut ScratchFiles,
    ) -> BrowseResult<(PathBuf, PathBuf)>
    where
        R: GranuleResolver,
        D: Downloader,
    {
        let co_pol = self.local_path(Polarization::VV);
        let cross_pol = self.local_path(Polarization::VH);
        if co_pol.exists() && cross_pol.exists() {
            log::info!("Inputs for {} already present, skipping download", self.granule);
            sources.track(co_pol.clone());
            sources.track(cross_pol.clone());
            return Ok((co_pol, cross_pol));
        }

        let urls = resolver.granule_urls(&self.granule)?;
        let candidates: Vec<&str> = urls.iter().map(String::as_str).collect();
        let (co_url, cross_url) = self.selector.select_pair(&candidates, &self.granule)?;

        let co_pol = downloader.download(co_url, &self.working_dir, None)?;
        sources.track(co_pol.clone());
        let cross_pol = downloader.download(cross_url, &self.working_dir, None)?;
        sources.track(cross_pol.clone());
        Ok((co_pol, cross_pol))
    }

    /// Produce the browse image, removing the source rasters afterwards
    pub fn run<R, D>(&self, resolver: &R, downloader: &D) -> BrowseResult<GranuleOutcome>
    where
        R: GranuleResolver,
        D: Downloader,
    {
        log::info!("Processing granule {}", self.granule);
        if !is_opera_rtc_granule(&self.granule) {
            log::warn!("{} does not look like an OPERA RTC-S1 granule name", self.granule);
        }
        std::fs::create_dir_all(&self.working_dir)?;

        let mut sources = ScratchFiles::new();
        let (co_pol, cross_pol) = self.fetch_inputs(resolver, downloader, &mut sources)?;

        let browse_path = create_browse_image(
            &co_pol,
            &cross_pol,
            &self.working_dir,
            &self.compositor,
            &self.raster_config,
        )?;
        drop(sources);

        let uploaded_key = match &self.bucket {
            Some(bucket) => {
                let storage = ObjectStorage::new(bucket)?;
                Some(storage.upload_file(&browse_path, &self.bucket_prefix)?)
            }
            None => None,
        };

        Ok(GranuleOutcome {
            browse_path,
            uploaded_key,
        })
    }
}
