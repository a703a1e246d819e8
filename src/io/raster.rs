use crate::core::BrowseCompositor;
use crate::io::scratch::ScratchFiles;
use crate::types::{
    BackscatterImage, BrowseError, BrowseImage, BrowseResult, GeoTransform, BROWSE_BANDS,
};
use gdal::errors::CplErrType;
use gdal::raster::{Buffer, RasterCreationOption};
use gdal::spatial_ref::{CoordTransform, SpatialRef};
use gdal::{Dataset, DriverManager};
use ndarray::{s, Array2, Array3};
use std::path::{Path, PathBuf};
use std::sync::Once;

/// Geographic WGS84 grid the browse product is delivered on
pub const OUTPUT_SRS: &str = "+proj=longlat +ellps=WGS84 +datum=WGS84 +no_defs";

/// Output pixel spacing in degrees (both axes)
pub const OUTPUT_PIXEL_SPACING: f64 = 2.74658203125e-4;

/// Suffix appended to the browse product name
pub const BROWSE_SUFFIX: &str = "_rgb";

/// Number of samples taken along each edge when computing the output extent
const EDGE_SAMPLES: usize = 21;

static DRIVER_ERROR_HANDLER: Once = Once::new();

/// Raster output parameters
#[derive(Debug, Clone)]
pub struct RasterConfig {
    /// Target spatial reference (PROJ string)
    pub output_srs: String,
    /// Target pixel spacing in target units
    pub pixel_spacing: f64,
    /// GeoTIFF compression scheme
    pub compression: String,
    /// Write internally tiled GeoTIFFs
    pub tiled: bool,
    /// Route GDAL driver messages into the `log` facade
    pub forward_driver_errors: bool,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            output_srs: OUTPUT_SRS.to_string(),
            pixel_spacing: OUTPUT_PIXEL_SPACING,
            compression: "LZW".to_string(),
            tiled: true,
            forward_driver_errors: true,
        }
    }
}

impl RasterConfig {
    /// Apply process-wide GDAL settings. Call once at startup.
    pub fn install(&self) {
        if !self.forward_driver_errors {
            return;
        }
        DRIVER_ERROR_HANDLER.call_once(|| {
            gdal::config::set_error_handler(|class, number, message| match class {
                CplErrType::Fatal | CplErrType::Failure => {
                    log::error!("GDAL error {}: {}", number, message)
                }
                CplErrType::Warning => log::warn!("GDAL warning {}: {}", number, message),
                CplErrType::Debug => log::debug!("GDAL: {}", message),
                CplErrType::None => {}
            });
        });
    }

    fn creation_options(&self) -> Vec<RasterCreationOption<'_>> {
        let mut options = vec![RasterCreationOption {
            key: "COMPRESS",
            value: self.compression.as_str(),
        }];
        if self.tiled {
            options.push(RasterCreationOption {
                key: "TILED",
                value: "YES",
            });
        }
        options
    }
}

/// First band of a raster with its georeferencing
#[derive(Debug, Clone)]
pub struct RasterBand {
    pub data: BackscatterImage,
    pub geo_transform: GeoTransform,
    pub projection: String,
}

/// Read the first band of a raster as `f32`
pub fn read_band<P: AsRef<Path>>(path: P) -> BrowseResult<RasterBand> {
    log::info!("Reading raster: {}", path.as_ref().display());

    let dataset = Dataset::open(path.as_ref())?;
    let geo_transform = dataset.geo_transform()?;
    let projection = dataset.projection();
    let (width, height) = dataset.raster_size();
    log::debug!("Raster size: {}x{}", width, height);

    let rasterband = dataset.rasterband(1)?;
    let band_data = rasterband.read_as::<f32>((0, 0), (width, height), (width, height), None)?;

    let data = Array2::from_shape_vec((height, width), band_data.data)
        .map_err(|e| BrowseError::Processing(format!("Failed to reshape band data: {}", e)))?;

    Ok(RasterBand {
        data,
        geo_transform: GeoTransform::from_gdal(geo_transform),
        projection,
    })
}

/// Write a single `f32` band GeoTIFF
pub fn write_band<P: AsRef<Path>>(
    path: P,
    image: &BackscatterImage,
    transform: &GeoTransform,
    projection: &str,
) -> BrowseResult<()> {
    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let (height, width) = image.dim();

    let mut dataset = driver.create_with_band_type::<f32, _>(
        path.as_ref(),
        width as isize,
        height as isize,
        1,
    )?;
    dataset.set_geo_transform(&transform.to_gdal())?;
    dataset.set_projection(projection)?;

    let mut rasterband = dataset.rasterband(1)?;
    let flat_data: Vec<f32> = image.iter().cloned().collect();
    let buffer = Buffer::new((width, height), flat_data);
    rasterband.write((0, 0), (width, height), &buffer)?;
    Ok(())
}

/// Write a 4-band browse image as a compressed, tiled byte GeoTIFF
pub fn write_browse<P: AsRef<Path>>(
    path: P,
    image: &BrowseImage,
    transform: &GeoTransform,
    projection: &str,
    config: &RasterConfig,
) -> BrowseResult<()> {
    log::info!("Writing browse raster: {}", path.as_ref().display());

    let (height, width, bands) = image.dim();
    if bands != BROWSE_BANDS {
        return Err(BrowseError::InvalidFormat(format!(
            "Browse image must have {} bands, got {}",
            BROWSE_BANDS, bands
        )));
    }

    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let mut dataset = driver.create_with_band_type_with_options::<u8, _>(
        path.as_ref(),
        width as isize,
        height as isize,
        BROWSE_BANDS as isize,
        &config.creation_options(),
    )?;
    dataset.set_geo_transform(&transform.to_gdal())?;
    dataset.set_projection(projection)?;

    for band in 0..BROWSE_BANDS {
        let mut rasterband = dataset.rasterband(band as isize + 1)?;
        let flat_data: Vec<u8> = image.slice(s![.., .., band]).iter().cloned().collect();
        let buffer = Buffer::new((width, height), flat_data);
        rasterband.write((0, 0), (width, height), &buffer)?;
    }
    Ok(())
}

/// Read a browse raster back into a (rows, columns, bands) array
pub fn read_browse<P: AsRef<Path>>(path: P) -> BrowseResult<(BrowseImage, GeoTransform, String)> {
    let dataset = Dataset::open(path.as_ref())?;
    let geo_transform = GeoTransform::from_gdal(dataset.geo_transform()?);
    let projection = dataset.projection();
    let (width, height) = dataset.raster_size();
    let bands = dataset.raster_count() as usize;

    let mut image = Array3::<u8>::zeros((height, width, bands));
    for band in 0..bands {
        let rasterband = dataset.rasterband(band as isize + 1)?;
        let buffer = rasterband.read_as::<u8>((0, 0), (width, height), (width, height), None)?;
        let plane = Array2::from_shape_vec((height, width), buffer.data)
            .map_err(|e| BrowseError::Processing(format!("Failed to reshape band {}: {}", band + 1, e)))?;
        image.slice_mut(s![.., .., band]).assign(&plane);
    }

    Ok((image, geo_transform, projection))
}

/// Output grid of a reprojection: transform plus (width, height)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputGrid {
    pub geo_transform: GeoTransform,
    pub width: usize,
    pub height: usize,
}

/// Compute the target grid covering a source raster.
///
/// Source edges are densified before transformation so curved boundaries
/// in the target system stay inside the extent.
pub fn output_grid(
    source_transform: &GeoTransform,
    source_size: (usize, usize),
    source_srs: &SpatialRef,
    target_srs: &SpatialRef,
    pixel_spacing: f64,
) -> BrowseResult<OutputGrid> {
    let (width, height) = (source_size.0 as f64, source_size.1 as f64);
    let mut xs = Vec::with_capacity(EDGE_SAMPLES * 4);
    let mut ys = Vec::with_capacity(EDGE_SAMPLES * 4);

    for i in 0..EDGE_SAMPLES {
        let t = i as f64 / (EDGE_SAMPLES - 1) as f64;
        for (col, row) in [
            (t * width, 0.0),
            (t * width, height),
            (0.0, t * height),
            (width, t * height),
        ] {
            let (x, y) = source_transform.apply(col, row);
            xs.push(x);
            ys.push(y);
        }
    }
    let mut zs = vec![0.0; xs.len()];

    let transform = CoordTransform::new(source_srs, target_srs)?;
    transform.transform_coords(&mut xs, &mut ys, &mut zs)?;

    let min_x = xs.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_x = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min_y = ys.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_y = ys.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    if !(min_x.is_finite() && max_x.is_finite() && min_y.is_finite() && max_y.is_finite()) {
        return Err(BrowseError::Processing(
            "Source extent could not be transformed to the output grid".to_string(),
        ));
    }

    let out_width = ((max_x - min_x) / pixel_spacing).ceil().max(1.0) as usize;
    let out_height = ((max_y - min_y) / pixel_spacing).ceil().max(1.0) as usize;

    Ok(OutputGrid {
        geo_transform: GeoTransform {
            top_left_x: min_x,
            pixel_width: pixel_spacing,
            rotation_x: 0.0,
            top_left_y: max_y,
            rotation_y: 0.0,
            pixel_height: -pixel_spacing,
        },
        width: out_width,
        height: out_height,
    })
}

/// Warp a browse raster onto the configured geographic grid
pub fn reproject<P: AsRef<Path>, Q: AsRef<Path>>(
    source_path: P,
    output_path: Q,
    config: &RasterConfig,
) -> BrowseResult<()> {
    log::info!(
        "Reprojecting {} -> {}",
        source_path.as_ref().display(),
        output_path.as_ref().display()
    );

    let source = Dataset::open(source_path.as_ref())?;
    let source_srs = source.spatial_ref()?;
    let target_srs = SpatialRef::from_proj4(&config.output_srs)?;
    let grid = output_grid(
        &GeoTransform::from_gdal(source.geo_transform()?),
        source.raster_size(),
        &source_srs,
        &target_srs,
        config.pixel_spacing,
    )?;
    log::debug!("Output grid: {}x{} {:?}", grid.width, grid.height, grid.geo_transform);

    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let mut output = driver.create_with_band_type_with_options::<u8, _>(
        output_path.as_ref(),
        grid.width as isize,
        grid.height as isize,
        source.raster_count(),
        &config.creation_options(),
    )?;
    output.set_geo_transform(&grid.geo_transform.to_gdal())?;
    output.set_spatial_ref(&target_srs)?;

    gdal::raster::reproject(&source, &output)?;
    Ok(())
}

/// Browse product file name derived from the co-pol file name.
///
/// The trailing three characters of the stem (the `_VV` polarization
/// suffix) are replaced by `_rgb`; the extension is kept.
pub fn browse_filename<P: AsRef<Path>>(co_pol_path: P) -> BrowseResult<String> {
    let path = co_pol_path.as_ref();
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| BrowseError::InvalidFormat(format!("Invalid co-pol file name: {}", path.display())))?;

    // Stems shorter than the suffix leave nothing in front of `_rgb`
    let cut = stem.char_indices().rev().nth(2).map_or(0, |(idx, _)| idx);

    let mut name = format!("{}{}", &stem[..cut], BROWSE_SUFFIX);
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        name.push('.');
        name.push_str(ext);
    }
    Ok(name)
}

/// Create the browse raster for a co-pol/cross-pol file pair.
///
/// Writes `<co_pol_stem>_tmp.tif` into `working_dir`, reprojects it to the
/// final product and removes the intermediate. Nothing is left behind when
/// writing or reprojection fails.
pub fn create_browse_image<P: AsRef<Path>, Q: AsRef<Path>, R: AsRef<Path>>(
    co_pol_path: P,
    cross_pol_path: Q,
    working_dir: R,
    compositor: &BrowseCompositor,
    config: &RasterConfig,
) -> BrowseResult<PathBuf> {
    let co_pol_path = co_pol_path.as_ref();
    let working_dir = working_dir.as_ref();
    let browse_path = working_dir.join(browse_filename(co_pol_path)?);

    let co_pol = read_band(co_pol_path)?;
    let cross_pol = read_band(cross_pol_path)?;
    let browse = compositor.composite(&co_pol.data, &cross_pol.data)?;

    let stem = co_pol_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("browse");
    let tmp_path = working_dir.join(format!("{}_tmp.tif", stem));

    // The intermediate always goes; a partial product only on failure
    let mut scratch = ScratchFiles::new();
    scratch.track(tmp_path.clone());
    scratch.track(browse_path.clone());

    write_browse(
        &tmp_path,
        &browse,
        &co_pol.geo_transform,
        &co_pol.projection,
        config,
    )?;
    reproject(&tmp_path, &browse_path, config)?;
    scratch.release(&browse_path);

    log::info!("Browse image created: {}", browse_path.display());
    Ok(browse_path)
}
