use ndarray::{s, Array2};
use opera_rtc_browse::io::raster::{read_band, read_browse, write_band, write_browse, OUTPUT_PIXEL_SPACING};
use opera_rtc_browse::{
    normalize, process_file_pair, BrowseCompositor, BrowseError, BrowseProfile, GeoTransform, RasterConfig,
};
use gdal::spatial_ref::SpatialRef;
use std::path::Path;
use tempfile::TempDir;

fn utm_projection() -> String {
    SpatialRef::from_epsg(32611)
        .and_then(|srs| srs.to_wkt())
        .expect("Failed to build UTM projection")
}

fn utm_transform() -> GeoTransform {
    GeoTransform::from_gdal([399960.0, 30.0, 0.0, 4100040.0, 0.0, -30.0])
}

fn write_pair(dir: &Path, co: &Array2<f32>, cross: &Array2<f32>) -> (std::path::PathBuf, std::path::PathBuf) {
    let projection = utm_projection();
    let co_path = dir.join("test_VV.tif");
    let cross_path = dir.join("test_VH.tif");
    write_band(&co_path, co, &utm_transform(), &projection).expect("Failed to write co-pol");
    write_band(&cross_path, cross, &utm_transform(), &projection).expect("Failed to write cross-pol");
    (co_path, cross_path)
}

#[test]
fn test_file_pair_end_to_end() {
    let _ = env_logger::builder().is_test(true).try_init();

    let input_dir = TempDir::new().expect("Failed to create temp directory");
    let output_dir = TempDir::new().expect("Failed to create temp directory");

    // Left half has no cross-pol coverage
    let co = Array2::from_shape_fn((64, 64), |(r, c)| (0.14 + 0.38 * (r + c) as f32 / 126.0).powi(2));
    let cross = Array2::from_shape_fn((64, 64), |(_, c)| if c < 32 { f32::NAN } else { 0.02 });
    let (co_path, cross_path) = write_pair(input_dir.path(), &co, &cross);

    let compositor = BrowseCompositor::new(BrowseProfile::opera_amplitude());
    let output = process_file_pair(&co_path, &cross_path, output_dir.path(), &compositor, &RasterConfig::default())
        .expect("Failed to create browse image");

    assert_eq!(output, output_dir.path().join("test_rgb.tif"));
    assert!(co_path.exists(), "Direct mode must not delete its inputs");
    assert!(!output_dir.path().join("test_VV_tmp.tif").exists());

    let (image, transform, projection) = read_browse(&output).expect("Failed to read browse image");
    println!("Browse image: {:?}, transform: {:?}", image.dim(), transform);

    assert_eq!(image.dim().2, 4);
    assert_eq!(transform.pixel_width, OUTPUT_PIXEL_SPACING);
    assert_eq!(transform.pixel_height, -OUTPUT_PIXEL_SPACING);
    assert!(projection.contains("WGS") || projection.contains("4326"));

    assert_eq!(image.slice(s![.., .., 0]), image.slice(s![.., .., 2]));
    let alpha = image.slice(s![.., .., 3]);
    assert!(alpha.iter().all(|&v| v == 0 || v == 255));
    assert!(alpha.iter().any(|&v| v == 255));
    assert!(alpha.iter().any(|&v| v == 0));
}

#[test]
fn test_browse_values_before_reprojection() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let co = Array2::from_shape_fn((8, 8), |(r, _)| if r == 0 { f32::NAN } else { 0.0196 });
    let cross = Array2::from_shape_fn((8, 8), |(_, c)| if c == 7 { f32::NAN } else { 0.067081 });
    let (co_path, cross_path) = write_pair(dir.path(), &co, &cross);

    let co_band = read_band(&co_path).expect("Failed to read co-pol");
    let cross_band = read_band(&cross_path).expect("Failed to read cross-pol");
    let compositor = BrowseCompositor::new(BrowseProfile::opera_amplitude());
    let browse = compositor
        .composite(&co_band.data, &cross_band.data)
        .expect("Failed to composite");

    // Writer round trip reproduces the exact array
    let path = dir.path().join("browse.tif");
    write_browse(&path, &browse, &co_band.geo_transform, &co_band.projection, &RasterConfig::default())
        .expect("Failed to write browse");
    let (read_back, _, _) = read_browse(&path).expect("Failed to read browse");
    assert_eq!(read_back, browse);

    assert_eq!(browse[[0, 0, 3]], 0);
    assert_eq!(browse[[3, 7, 3]], 0);
    assert_eq!(browse[[3, 3, 3]], 255);
    assert_eq!(browse[[3, 3, 0]], 0);
    // sqrt(0.067081) = 0.259, the cross-pol upper bound
    assert_eq!(browse[[3, 3, 1]], 255);
}

#[test]
fn test_mismatched_inputs_fail() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let co = Array2::<f32>::from_elem((10, 12), 0.1);
    let cross = Array2::<f32>::from_elem((12, 10), 0.01);
    let (co_path, cross_path) = write_pair(dir.path(), &co, &cross);

    let compositor = BrowseCompositor::new(BrowseProfile::linear_power());
    let result = process_file_pair(&co_path, &cross_path, dir.path(), &compositor, &RasterConfig::default());
    assert!(matches!(result, Err(BrowseError::ShapeMismatch { .. })));
    assert!(!dir.path().join("test_rgb.tif").exists());
}

#[test]
fn test_missing_input_file() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let compositor = BrowseCompositor::new(BrowseProfile::opera_amplitude());
    let result = process_file_pair(
        dir.path().join("absent_VV.tif"),
        dir.path().join("absent_VH.tif"),
        dir.path(),
        &compositor,
        &RasterConfig::default(),
    );
    assert!(matches!(result, Err(BrowseError::Gdal(_))));
}

#[test]
fn test_normalize_public_api() {
    let input = ndarray::arr1(&[0.0f64, 1.0, 4.0, f64::NAN]).mapv(f64::sqrt);
    let output = normalize(&input, 0.0, 2.0);
    assert_eq!(output.to_vec(), vec![0u8, 128, 255, 0]);
}
