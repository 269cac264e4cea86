//! Spherical (Web) Mercator projection between locations and global pixels
//!
//! The per-zoom scaling constants only depend on the tile size, so they are
//! computed once per size and kept in a [`ProjectionCache`] shared by every
//! [`Mercator`] cloned from the same instance.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::{Arc, RwLock};

/// Number of zoom levels precomputed per tile size
pub const CACHED_ZOOM_LEVELS: usize = 30;

/// Largest absolute value of `sin(lat)` fed to the projection
const MAX_SIN_LAT: f64 = 0.9999;

/// Scaling constants for one tile size at one zoom level
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomConstants {
    /// Pixels per degree of longitude
    pub bc: f64,
    /// Pixels per radian
    pub cc: f64,
    /// Pixel offset of the origin (half the global extent)
    pub zc: f64,
    /// Global pixel extent
    pub ac: f64,
}

impl ZoomConstants {
    pub fn compute(tile_size: u32, zoom: u8) -> Self {
        let extent = tile_size as f64 * 2f64.powi(zoom as i32);
        Self {
            bc: extent / 360.0,
            cc: extent / (2.0 * PI),
            zc: extent / 2.0,
            ac: extent,
        }
    }
}

/// Append-only store of projection constants keyed by tile size.
///
/// Entries are written once and never mutated, so concurrent readers only
/// contend on the lock while a new tile size is being populated.
#[derive(Debug, Default)]
pub struct ProjectionCache {
    levels: RwLock<HashMap<u32, Arc<[ZoomConstants; CACHED_ZOOM_LEVELS]>>>,
}

impl ProjectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constants for every cached zoom level of `tile_size`, computing them on first use
    pub fn levels(&self, tile_size: u32) -> Arc<[ZoomConstants; CACHED_ZOOM_LEVELS]> {
        if let Ok(levels) = self.levels.read() {
            if let Some(entry) = levels.get(&tile_size) {
                return Arc::clone(entry);
            }
        }

        let computed: Arc<[ZoomConstants; CACHED_ZOOM_LEVELS]> = Arc::new(std::array::from_fn(
            |zoom| ZoomConstants::compute(tile_size, zoom as u8),
        ));

        match self.levels.write() {
            // A racing writer may have inserted the same values already
            Ok(mut levels) => Arc::clone(levels.entry(tile_size).or_insert(computed)),
            Err(_) => computed,
        }
    }

    /// Number of tile sizes populated so far
    pub fn len(&self) -> usize {
        self.levels.read().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mercator projector backed by an explicit constant cache
#[derive(Clone, Debug, Default)]
pub struct Mercator {
    cache: Arc<ProjectionCache>,
}

impl Mercator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a projector sharing an existing cache
    pub fn with_cache(cache: Arc<ProjectionCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<ProjectionCache> {
        &self.cache
    }

    fn constants(&self, zoom: u8, tile_size: u32) -> ZoomConstants {
        let zoom_index = zoom as usize;
        if zoom_index < CACHED_ZOOM_LEVELS {
            self.cache.levels(tile_size)[zoom_index]
        } else {
            ZoomConstants::compute(tile_size, zoom)
        }
    }

    /// Unquantised global pixel location of a lat/lng, clamped to the global extent
    pub fn location_to_pixel_exact(&self, lat: f64, lng: f64, zoom: u8, tile_size: u32) -> (f64, f64) {
        let c = self.constants(zoom, tile_size);
        let f = lat.to_radians().sin().clamp(-MAX_SIN_LAT, MAX_SIN_LAT);

        let x = c.zc + lng * c.bc;
        let y = c.zc + 0.5 * ((1.0 + f) / (1.0 - f)).ln() * -c.cc;

        (x.clamp(0.0, c.ac), y.clamp(0.0, c.ac))
    }

    /// Global pixel location of a lat/lng at the given zoom and tile size
    pub fn location_to_pixel(&self, lat: f64, lng: f64, zoom: u8, tile_size: u32) -> (f64, f64) {
        let (x, y) = self.location_to_pixel_exact(lat, lng, zoom, tile_size);
        (x.floor(), y.floor())
    }

    /// Location (lat, lng in degrees) of a global pixel
    pub fn pixel_to_location(&self, x: f64, y: f64, zoom: u8, tile_size: u32) -> (f64, f64) {
        let c = self.constants(zoom, tile_size);

        let lng = (x - c.zc) / c.bc;
        let g = (y - c.zc) / -c.cc;
        let lat = (2.0 * g.exp().atan() - 0.5 * PI).to_degrees();

        (lat, lng)
    }

    /// Tile containing a lat/lng at the given zoom and tile size
    pub fn location_to_tile_id(&self, lat: f64, lng: f64, zoom: u8, tile_size: u32) -> (i64, i64) {
        let (x, y) = self.location_to_pixel(lat, lng, zoom, tile_size);
        let size = tile_size as f64;
        ((x / size).floor() as i64, (y / size).floor() as i64)
    }
}
