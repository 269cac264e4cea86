//! Map sources and raster formats served by the maps API

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Tileset identifier
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub enum MapId {
    Streets,
    Light,
    Dark,
    Satellite,
    StreetsSatellite,
    Wheatpaste,
    StreetsBasic,
    Comic,
    Outdoors,
    RunBikeHike,
    Pencil,
    Pirates,
    Emerald,
    HighContrast,
    /// Terrain-RGB elevation tiles, only served as [`MapFormat::PngRaw`]
    TerrainRgb,
    /// Any other tileset, e.g. `username.abc123`
    Custom(String),
}

const NAMED_MAP_IDS: [(MapId, &str); 15] = [
    (MapId::Streets, "mapbox.streets"),
    (MapId::Light, "mapbox.light"),
    (MapId::Dark, "mapbox.dark"),
    (MapId::Satellite, "mapbox.satellite"),
    (MapId::StreetsSatellite, "mapbox.streets-satellite"),
    (MapId::Wheatpaste, "mapbox.wheatpaste"),
    (MapId::StreetsBasic, "mapbox.streets-basic"),
    (MapId::Comic, "mapbox.comic"),
    (MapId::Outdoors, "mapbox.outdoors"),
    (MapId::RunBikeHike, "mapbox.run-bike-hike"),
    (MapId::Pencil, "mapbox.pencil"),
    (MapId::Pirates, "mapbox.pirates"),
    (MapId::Emerald, "mapbox.emerald"),
    (MapId::HighContrast, "mapbox.high-contrast"),
    (MapId::TerrainRgb, "mapbox.terrain-rgb"),
];

impl MapId {
    pub fn as_str(&self) -> &str {
        if let MapId::Custom(id) = self {
            return id;
        }
        NAMED_MAP_IDS
            .iter()
            .find(|(id, _)| id == self)
            .map(|(_, name)| *name)
            .unwrap_or_default()
    }
}

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MapId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::Configuration("empty map id".into()));
        }
        Ok(NAMED_MAP_IDS
            .iter()
            .find(|(_, name)| *name == s)
            .map(|(id, _)| id.clone())
            .unwrap_or_else(|| MapId::Custom(s.to_string())))
    }
}

/// Raster output format
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum MapFormat {
    /// True colour PNG
    Png,
    /// 32 colour indexed PNG
    Png32,
    /// 64 colour indexed PNG
    Png64,
    /// 128 colour indexed PNG
    Png128,
    /// 256 colour indexed PNG
    Png256,
    /// Raw PNG, only for [`MapId::TerrainRgb`]
    PngRaw,
    /// 70% quality JPEG
    Jpg70,
    /// 80% quality JPEG
    Jpg80,
    /// 90% quality JPEG
    Jpg90,
}

impl MapFormat {
    pub const ALL: [MapFormat; 9] = [
        MapFormat::Png,
        MapFormat::Png32,
        MapFormat::Png64,
        MapFormat::Png128,
        MapFormat::Png256,
        MapFormat::PngRaw,
        MapFormat::Jpg70,
        MapFormat::Jpg80,
        MapFormat::Jpg90,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MapFormat::Png => "png",
            MapFormat::Png32 => "png32",
            MapFormat::Png64 => "png64",
            MapFormat::Png128 => "png128",
            MapFormat::Png256 => "png256",
            MapFormat::PngRaw => "pngraw",
            MapFormat::Jpg70 => "jpg70",
            MapFormat::Jpg80 => "jpg80",
            MapFormat::Jpg90 => "jpg90",
        }
    }

    pub fn is_png(&self) -> bool {
        !self.is_jpeg()
    }

    pub fn is_jpeg(&self) -> bool {
        matches!(self, MapFormat::Jpg70 | MapFormat::Jpg80 | MapFormat::Jpg90)
    }

    /// Colour-indexed (paletted) PNG variants
    pub fn is_indexed(&self) -> bool {
        matches!(
            self,
            MapFormat::Png32 | MapFormat::Png64 | MapFormat::Png128 | MapFormat::Png256
        )
    }

    /// JPEG quality for encoding, if this is a JPEG format
    pub fn jpeg_quality(&self) -> Option<u8> {
        match self {
            MapFormat::Jpg70 => Some(70),
            MapFormat::Jpg80 => Some(80),
            MapFormat::Jpg90 => Some(90),
            _ => None,
        }
    }
}

impl fmt::Display for MapFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MapFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        MapFormat::ALL
            .iter()
            .find(|f| f.as_str() == s)
            .copied()
            .ok_or_else(|| Error::Configuration(format!("unknown map format ({})", s)))
    }
}

/// Reject map id / format combinations the service cannot serve
pub fn validate_combination(map_id: &MapId, format: MapFormat) -> Result<()> {
    match (map_id, format) {
        (MapId::TerrainRgb, MapFormat::PngRaw) => Ok(()),
        (MapId::TerrainRgb, other) => Err(Error::Configuration(format!(
            "{} only supports pngraw outputs (requested {})",
            map_id, other
        ))),
        (other, MapFormat::PngRaw) => Err(Error::Configuration(format!(
            "pngraw outputs are only supported by {} (requested {})",
            MapId::TerrainRgb,
            other
        ))),
        (MapId::Satellite, f) if f.is_indexed() => Err(Error::Configuration(format!(
            "{} does not support indexed png outputs (requested {})",
            map_id, f
        ))),
        _ => Ok(()),
    }
}
