//! Create an RGB browse image for an OPERA RTC-S1 granule.
//!
//! Example:
//!     create_browse granule OPERA_L2_RTC-S1_T035-073251-IW2_20240113T020816Z_20240113T113128Z_S1A_30_v1.0
//!     create_browse pair test_VV.tif test_VH.tif

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use opera_rtc_browse::io::earthdata::{DownloadParams, EarthdataAuth};
use opera_rtc_browse::io::{AsfSearch, EarthdataCredentials, EarthdataSession};
use opera_rtc_browse::{logging, process_file_pair, BrowseCompositor, BrowseProfile, GranuleJob, RasterConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "create_browse")]
#[command(about = "Create RGB browse imagery for OPERA RTC-S1 products", version)]
struct Args {
    /// Calibration profile (opera-amplitude, linear-power, percentile)
    #[arg(long, global = true, default_value = BrowseProfile::OPERA_AMPLITUDE)]
    profile: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the browse image from a local co-pol/cross-pol file pair
    Pair {
        /// Co-pol (VV) backscatter raster
        co_pol_path: PathBuf,
        /// Cross-pol (VH) backscatter raster
        cross_pol_path: PathBuf,
        /// Directory the browse image is written to
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },
    /// Download a granule, build its browse image and optionally upload it
    Granule {
        /// OPERA S1 RTC granule to create a browse image for
        granule: String,
        /// Username for NASA's EarthData
        #[arg(long, env = "EARTHDATA_USERNAME")]
        earthdata_username: Option<String>,
        /// Password for NASA's EarthData
        #[arg(long, env = "EARTHDATA_PASSWORD", hide_env_values = true)]
        earthdata_password: Option<String>,
        /// AWS S3 bucket to upload the final product to
        #[arg(long)]
        bucket: Option<String>,
        /// Add a bucket prefix to the product
        #[arg(long, default_value = "")]
        bucket_prefix: String,
        /// Working directory for intermediate files
        #[arg(long, default_value = ".")]
        working_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();

    let raster_config = RasterConfig::default();
    raster_config.install();
    let compositor = BrowseCompositor::new(BrowseProfile::by_name(&args.profile)?);

    match args.command {
        Command::Pair {
            co_pol_path,
            cross_pol_path,
            output_dir,
        } => {
            let output = process_file_pair(&co_pol_path, &cross_pol_path, &output_dir, &compositor, &raster_config)
                .with_context(|| format!("Failed to create browse image from {}", co_pol_path.display()))?;
            log::info!("Wrote {}", output.display());
        }
        Command::Granule {
            granule,
            earthdata_username,
            earthdata_password,
            bucket,
            bucket_prefix,
            working_dir,
        } => {
            let params = DownloadParams::default();
            let auth = match EarthdataCredentials::resolve(earthdata_username, earthdata_password) {
                Ok(credentials) => EarthdataAuth::Credentials(credentials),
                Err(e) => {
                    log::warn!("{}; downloading anonymously", e);
                    EarthdataAuth::Anonymous
                }
            };
            let search = AsfSearch::new(&params)?;
            let session = EarthdataSession::new(auth, params)?;

            let mut job = GranuleJob::new(granule.as_str(), working_dir, compositor)
                .with_bucket(bucket, bucket_prefix);
            job.raster_config = raster_config;

            let outcome = job
                .run(&search, &session)
                .with_context(|| format!("Failed to create browse image for {}", granule))?;
            log::info!("Wrote {}", outcome.browse_path.display());
            if let Some(key) = outcome.uploaded_key {
                log::info!("Uploaded to {}", key);
            }
        }
    }

    Ok(())
}
