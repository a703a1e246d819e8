//! Managed-service entry point: process one catalog item into a browse item.

use anyhow::{Context, Result};
use clap::Parser;
use opera_rtc_browse::io::earthdata::{DownloadParams, EarthdataAuth};
use opera_rtc_browse::io::{EarthdataSession, S3Stager, StacItem};
use opera_rtc_browse::{logging, BrowseCompositor, BrowseProfile, RasterConfig, ServiceAdapter, ServiceMessage};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "browse_service")]
#[command(about = "Run the OPERA RTC-S1 browse service on a catalog item")]
struct Args {
    /// Service message as JSON (accessToken, stagingLocation)
    #[arg(long, env = "BROWSE_SERVICE_MESSAGE")]
    message: String,

    /// Input STAC item (JSON file)
    #[arg(long)]
    item: PathBuf,

    /// Where to write the result item; stdout when omitted
    #[arg(long)]
    output: Option<PathBuf>,

    /// Calibration profile (opera-amplitude, linear-power, percentile)
    #[arg(long, default_value = BrowseProfile::OPERA_AMPLITUDE)]
    profile: String,
}

fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();

    let message: ServiceMessage = serde_json::from_str(&args.message).context("Invalid service message")?;
    let item: StacItem = serde_json::from_str(
        &std::fs::read_to_string(&args.item).with_context(|| format!("Failed to read {}", args.item.display()))?,
    )
    .with_context(|| format!("Invalid STAC item in {}", args.item.display()))?;

    let raster_config = RasterConfig::default();
    raster_config.install();

    let session = EarthdataSession::new(EarthdataAuth::Anonymous, DownloadParams::default())?;
    let compositor = BrowseCompositor::new(BrowseProfile::by_name(&args.profile)?);
    let mut adapter = ServiceAdapter::new(message, session, S3Stager, compositor);
    adapter.raster_config = raster_config;

    let result = adapter
        .process_item(&item)
        .with_context(|| format!("Failed to process item {}", item.id))?;
    let json = serde_json::to_string_pretty(&result)?;

    match args.output {
        Some(path) => std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{}", json),
    }
    Ok(())
}
