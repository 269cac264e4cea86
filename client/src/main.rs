//! mapbox-tiles: fetch, stitch and inspect map tiles from the command line

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use log::info;
use mapbox_client::maps::cache::FileCache;
use mapbox_client::maps::composite::{Tile, stitch_tiles};
use mapbox_client::maps::types::{MapFormat, MapId};
use mapbox_client::maps::util::{DEFAULT_JPEG_QUALITY, save_image_jpeg, save_image_png};
use mapbox_client::{ClientConfig, Location, Mapbox};
use web_time::Instant;

#[derive(Parser)]
#[command(name = "mapbox-tiles")]
#[command(about = "Fetch and composite Mapbox map tiles", long_about = None)]
struct Cli {
    /// Access token (defaults to $MAPBOX_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stitch every tile between two corners into one image
    Stitch {
        #[command(flatten)]
        area: Area,

        /// Tileset, e.g. mapbox.satellite or username.tileset
        #[arg(long, default_value = "mapbox.satellite")]
        map_id: MapId,

        /// Tile format (png, png32..png256, jpg70, jpg80, jpg90)
        #[arg(long, default_value = "jpg90")]
        format: MapFormat,

        /// Request @2x tiles
        #[arg(long)]
        high_dpi: bool,
    },
    /// Report the highest elevation between two corners and write a grayscale relief
    Elevation {
        #[command(flatten)]
        area: Area,

        /// Height mapped to white (defaults to the highest elevation found)
        #[arg(long)]
        max_height: Option<f64>,
    },
}

#[derive(Args)]
struct Area {
    /// First corner as lat,lng
    #[arg(long, value_parser = parse_location, allow_hyphen_values = true)]
    from: Location,

    /// Opposite corner as lat,lng
    #[arg(long, value_parser = parse_location, allow_hyphen_values = true)]
    to: Location,

    /// Zoom level (1-22)
    #[arg(long, default_value = "10")]
    zoom: u8,

    /// Output image path (.png or .jpg)
    #[arg(long)]
    output: PathBuf,

    /// Directory for the append-only tile cache
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Fetch tiles one at a time instead of concurrently
    #[arg(long)]
    sequential: bool,
}

fn parse_location(s: &str) -> std::result::Result<Location, String> {
    let (lat, lng) = s
        .split_once(',')
        .ok_or_else(|| format!("expected lat,lng (got {})", s))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("latitude: {}", e))?;
    let lng: f64 = lng.trim().parse().map_err(|e| format!("longitude: {}", e))?;
    if !(-90.0..=90.0).contains(&lat) {
        return Err(format!("latitude out of range ({})", lat));
    }
    Ok(Location::new(lat, lng))
}

fn client(token: Option<String>, cache_dir: Option<&Path>) -> Result<Mapbox> {
    let config = match token {
        Some(token) => ClientConfig::new(token),
        None => ClientConfig::from_env().context("No access token, pass --token or set MAPBOX_TOKEN")?,
    };
    let mut mapbox = Mapbox::with_config(config).context("Failed to create client")?;

    if let Some(dir) = cache_dir {
        let cache = FileCache::new(dir)
            .with_context(|| format!("Failed to open tile cache {}", dir.display()))?;
        mapbox.maps.set_cache(Arc::new(cache));
    }
    Ok(mapbox)
}

fn fetch(mapbox: &Mapbox, area: &Area, map_id: &MapId, format: MapFormat, high_dpi: bool) -> Result<Tile> {
    if !(1..=22).contains(&area.zoom) {
        bail!("Zoom level must be between 1 and 22");
    }

    let start = Instant::now();
    let tiles = if area.sequential {
        mapbox
            .maps
            .get_enclosing_tiles(map_id, area.from, area.to, area.zoom, format, high_dpi)
    } else {
        mapbox
            .maps
            .get_enclosing_tiles_concurrent(map_id, area.from, area.to, area.zoom, format, high_dpi)
    }
    .context("Failed to fetch tiles")?;

    let count: usize = tiles.iter().map(Vec::len).sum();
    info!("Fetched {} tiles in {:?}", count, start.elapsed());

    stitch_tiles(&tiles).context("Failed to stitch tiles")
}

fn write_image(tile: &Tile, path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => save_image_jpeg(tile.image(), path, DEFAULT_JPEG_QUALITY),
        _ => save_image_png(tile.image(), path),
    }
    .with_context(|| format!("Failed to write {}", path.display()))?;

    println!(
        "Wrote {}x{} image to {}",
        tile.width(),
        tile.height(),
        path.display()
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Stitch {
            area,
            map_id,
            format,
            high_dpi,
        } => {
            let mapbox = client(cli.token, area.cache_dir.as_deref())?;
            let stitched = fetch(&mapbox, &area, &map_id, format, high_dpi)?;
            write_image(&stitched, &area.output)?;
        }
        Command::Elevation { area, max_height } => {
            let mapbox = client(cli.token, area.cache_dir.as_deref())?;
            let terrain = fetch(&mapbox, &area, &MapId::TerrainRgb, MapFormat::PngRaw, false)?;

            let highest = terrain.highest_elevation();
            println!("Highest elevation: {:.1} m", highest);

            let max_height = max_height.unwrap_or(highest);
            if max_height <= 0.0 {
                bail!("Maximum height must be positive (got {})", max_height);
            }
            write_image(&terrain.flatten_altitudes(max_height), &area.output)?;
        }
    }

    Ok(())
}
