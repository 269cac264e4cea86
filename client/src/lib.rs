//! Mapbox web API client with tile-space geometry and compositing
//!
//! ```no_run
//! use mapbox_client::{Location, Mapbox};
//! use mapbox_client::maps::types::{MapFormat, MapId};
//! use mapbox_client::maps::composite::stitch_tiles;
//!
//! # fn main() -> mapbox_client::Result<()> {
//! let mapbox = Mapbox::new("pk.token")?;
//! let tiles = mapbox.maps.get_enclosing_tiles_concurrent(
//!     &MapId::Satellite,
//!     Location::new(-36.5, 174.5),
//!     Location::new(-37.2, 175.3),
//!     10,
//!     MapFormat::Jpg90,
//!     false,
//! )?;
//! let composite = stitch_tiles(&tiles)?;
//! # Ok(())
//! # }
//! ```

pub mod base;
pub mod config;
pub mod directions;
pub mod directions_matrix;
pub mod error;
pub mod geocode;
pub mod map_matching;
pub mod maps;
pub mod surface;

use std::sync::Arc;

pub use base::{Base, BoundingBox, Location, RouteGeometry};
pub use config::ClientConfig;
pub use error::{Error, Result};

use directions::Directions;
use directions_matrix::DirectionsMatrix;
use geocode::Geocode;
use map_matching::MapMatching;
use maps::Maps;
use surface::Surface;

/// Every API wrapper bound to one shared [`Base`]
pub struct Mapbox {
    base: Arc<Base>,
    pub maps: Maps,
    pub geocode: Geocode,
    pub directions: Directions,
    pub directions_matrix: DirectionsMatrix,
    pub map_matching: MapMatching,
    pub surface: Surface,
}

impl Mapbox {
    /// Create a client for an access token; fails on an empty token before any request
    pub fn new(token: &str) -> Result<Self> {
        Self::with_config(ClientConfig::new(token))
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let base = Arc::new(Base::with_config(config)?);
        Ok(Self {
            maps: Maps::new(Arc::clone(&base)),
            geocode: Geocode::new(Arc::clone(&base)),
            directions: Directions::new(Arc::clone(&base)),
            directions_matrix: DirectionsMatrix::new(Arc::clone(&base)),
            map_matching: MapMatching::new(Arc::clone(&base)),
            surface: Surface::new(Arc::clone(&base)),
            base,
        })
    }

    /// Client configured from `MAPBOX_TOKEN` / `MAPBOX_BASE_URL`
    pub fn from_env() -> Result<Self> {
        Self::with_config(ClientConfig::from_env()?)
    }

    pub fn base(&self) -> &Base {
        &self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_token() {
        let err = Mapbox::new("").err().unwrap();
        assert_eq!(err.to_string(), "configuration error: Mapbox API token not found");
    }

    #[test]
    fn test_shared_base() {
        let mapbox = Mapbox::with_config(
            ClientConfig::new("pk.test").with_base_url("http://127.0.0.1:9"),
        )
        .unwrap();
        assert_eq!(mapbox.base().config().access_token, "pk.test");
        assert_eq!(mapbox.base().url("v4/x"), "http://127.0.0.1:9/v4/x");
    }

    #[test]
    fn test_debug_flag_reaches_shared_base() {
        let mapbox = Mapbox::with_config(ClientConfig::new("pk.test").with_debug(true)).unwrap();
        assert!(mapbox.base().config().debug);
        assert!(!Mapbox::new("pk.test").unwrap().base().config().debug);
    }
}
