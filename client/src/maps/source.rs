//! Where tile bytes come from

use std::sync::Arc;

use log::debug;
use reqwest::header::CONTENT_TYPE;

use super::tile::TileId;
use super::types::{MapFormat, MapId};
use crate::base::Base;
use crate::error::{Result, TransportError};

/// Maps API version segment
pub const API_VERSION: &str = "v4";

/// Undecoded tile response
#[derive(Clone, Debug, Default)]
pub struct RawTile {
    pub status: u16,
    /// Media type without parameters, e.g. `image/png`
    pub content_type: Option<String>,
    /// Declared body length, if the response carried one
    pub content_length: Option<u64>,
    pub data: Vec<u8>,
}

impl RawTile {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Fetches raw tile bytes for a wrapped tile id
pub trait TileSource: Send + Sync {
    fn fetch(&self, map_id: &MapId, tile: TileId, format: MapFormat, high_dpi: bool) -> Result<RawTile>;
}

/// Request path of a tile, `v4/{map_id}/{level}/{x}/{y}[@2x].{format}`
pub fn tile_path(map_id: &MapId, tile: TileId, format: MapFormat, high_dpi: bool) -> String {
    let dpi = if high_dpi { "@2x" } else { "" };
    format!(
        "{}/{}/{}/{}/{}{}.{}",
        API_VERSION, map_id, tile.level, tile.x, tile.y, dpi, format
    )
}

/// Tile source backed by the maps API
#[derive(Clone)]
pub struct HttpTileSource {
    base: Arc<Base>,
}

impl HttpTileSource {
    pub fn new(base: Arc<Base>) -> Self {
        Self { base }
    }
}

impl TileSource for HttpTileSource {
    fn fetch(&self, map_id: &MapId, tile: TileId, format: MapFormat, high_dpi: bool) -> Result<RawTile> {
        let path = tile_path(map_id, tile, format, high_dpi);
        let response = self.base.query_request(&path, &[])?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase());
        let content_length = response.content_length();
        let data = response.bytes().map_err(TransportError::from)?.to_vec();

        debug!(
            "Fetched {} ({} bytes, {:?})",
            path,
            data.len(),
            content_type
        );

        Ok(RawTile {
            status,
            content_type,
            content_length,
            data,
        })
    }
}
