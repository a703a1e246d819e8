use ndarray::Array2;
use opera_rtc_browse::io::earthdata::url_filename;
use opera_rtc_browse::io::raster::write_band;
use opera_rtc_browse::io::stac::{StacAsset, StacItem, BROWSE_ASSET_KEY};
use opera_rtc_browse::io::{Downloader, Stager};
use opera_rtc_browse::{
    BrowseCompositor, BrowseProfile, BrowseResult, GeoTransform, ServiceAdapter, ServiceMessage,
};
use gdal::spatial_ref::SpatialRef;
use std::cell::RefCell;
use std::path::{Path, PathBuf};

/// Writes a small synthetic raster instead of fetching the URL
#[derive(Default)]
struct SyntheticDownloader {
    tokens: RefCell<Vec<Option<String>>>,
}

impl Downloader for SyntheticDownloader {
    fn download(&self, url: &str, destination_dir: &Path, access_token: Option<&str>) -> BrowseResult<PathBuf> {
        assert!(url == "url/to/mock_VV.tif" || url == "url/to/mock_VH.tif");
        self.tokens.borrow_mut().push(access_token.map(str::to_string));

        let path = destination_dir.join(url_filename(url)?);
        let data = Array2::from_shape_fn((20, 20), |(r, c)| 0.01 + 0.001 * (r * c) as f32);
        let projection = SpatialRef::from_epsg(32611)?.to_wkt()?;
        write_band(
            &path,
            &data,
            &GeoTransform::from_gdal([399960.0, 30.0, 0.0, 4100040.0, 0.0, -30.0]),
            &projection,
        )?;
        Ok(path)
    }
}

#[derive(Default)]
struct RecordingStager {
    staged: RefCell<Vec<(PathBuf, String, String, String)>>,
}

impl Stager for RecordingStager {
    fn stage(&self, local: &Path, remote_name: &str, mime: &str, location: &str) -> BrowseResult<String> {
        assert!(local.exists(), "Staged file must exist while staging");
        self.staged.borrow_mut().push((
            local.to_path_buf(),
            remote_name.to_string(),
            mime.to_string(),
            location.to_string(),
        ));
        Ok("mock-staged-url".to_string())
    }
}

fn mock_item() -> StacItem {
    StacItem::new("mock-pystac-item")
        .with_asset("data", StacAsset::new("url/to/mock_VH.tif"))
        .with_asset("data1", StacAsset::new("url/to/mock_VV.tif"))
}

#[test]
fn test_process_item() {
    let _ = env_logger::builder().is_test(true).try_init();

    let message = ServiceMessage {
        access_token: Some("mock-access-token".to_string()),
        staging_location: Some("mock-staging-location".to_string()),
    };
    let adapter = ServiceAdapter::new(
        message,
        SyntheticDownloader::default(),
        RecordingStager::default(),
        BrowseCompositor::new(BrowseProfile::opera_amplitude()),
    );

    let item = mock_item();
    let result = adapter.process_item(&item).expect("Failed to process item");

    let expected = item.with_browse_asset("mock-staged-url", "mock_rgb.tif");
    assert_eq!(result, expected);

    let asset = &result.assets[BROWSE_ASSET_KEY];
    assert_eq!(asset.media_type.as_deref(), Some("image/tiff"));
    assert_eq!(asset.roles, vec!["visual".to_string()]);

    let staged = adapter.stager.staged.borrow();
    assert_eq!(staged.len(), 1);
    let (local, remote_name, mime, location) = &staged[0];
    assert_eq!(remote_name, "mock_rgb.tif");
    assert_eq!(mime, "image/tiff");
    assert_eq!(location, "mock-staging-location");
    assert!(!local.exists(), "Scratch directory must be removed after processing");

    let tokens = adapter.downloader.tokens.borrow();
    assert_eq!(tokens.len(), 2);
    assert!(tokens.iter().all(|t| t.as_deref() == Some("mock-access-token")));
}

#[test]
fn test_result_item_serialization() {
    let result = mock_item().with_browse_asset("mock-staged-url", "mock_rgb.tif");
    let value = serde_json::to_value(&result).expect("Failed to serialize item");

    assert_eq!(value["id"], "mock-pystac-item");
    assert_eq!(value["assets"]["rgb_browse"]["href"], "mock-staged-url");
    assert_eq!(value["assets"]["rgb_browse"]["title"], "mock_rgb.tif");
    assert_eq!(value["assets"]["rgb_browse"]["type"], "image/tiff");
    assert_eq!(value["assets"]["rgb_browse"]["roles"][0], "visual");
    assert!(value["assets"].get("data").is_none());
}
