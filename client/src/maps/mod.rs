//! Maps API: tile fetching with caching, projection and compositing

pub mod cache;
pub mod composite;
pub mod loader;
pub mod mercator;
pub mod source;
pub mod terrain;
pub mod tile;
pub mod types;
pub mod util;

use std::sync::Arc;

use image::{ImageFormat, RgbaImage};
use log::{debug, warn};

use crate::base::{self, Base, Location};
use crate::error::{ApiError, DecodeError, Result, TransportError};
use cache::{CacheError, CacheKey, TileCache};
use composite::Tile;
use mercator::Mercator;
use source::{HttpTileSource, RawTile, TileSource};
use tile::{TileId, TileRange, enclosing_tile_ids};
use types::{MapFormat, MapId, validate_combination};

/// Maps API wrapper
pub struct Maps {
    source: Arc<dyn TileSource>,
    cache: Option<Arc<dyn TileCache>>,
    projector: Mercator,
}

impl Maps {
    /// Maps API over HTTP
    pub fn new(base: Arc<Base>) -> Self {
        Self::with_source(Arc::new(HttpTileSource::new(base)))
    }

    /// Maps API over any tile source
    pub fn with_source(source: Arc<dyn TileSource>) -> Self {
        Self {
            source,
            cache: None,
            projector: Mercator::new(),
        }
    }

    /// Attach a tile cache, consulted before every fetch
    pub fn set_cache(&mut self, cache: Arc<dyn TileCache>) {
        self.cache = Some(cache);
    }

    pub fn with_cache(mut self, cache: Arc<dyn TileCache>) -> Self {
        self.set_cache(cache);
        self
    }

    /// Projector shared by every tile this instance returns
    pub fn projector(&self) -> &Mercator {
        &self.projector
    }

    /// Fetch and decode a single tile.
    ///
    /// `id` may lie outside the grid for its level; the request and cache key
    /// use the wrapped id while the returned tile keeps `id`, so it lines up
    /// with its neighbours in global pixel space.
    pub fn get_tile(&self, map_id: &MapId, id: TileId, format: MapFormat, high_dpi: bool) -> Result<Tile> {
        validate_combination(map_id, format)?;
        let wrapped = id.wrapped()?;
        let key = CacheKey::new(map_id.clone(), wrapped, format, high_dpi);

        if let Some(cache) = &self.cache {
            match cache.fetch(&key) {
                Ok(Some(image)) => {
                    debug!("Cache hit for {}", key.file_name());
                    return Ok(self.tile(id, image));
                }
                Ok(None) => {}
                Err(e) => warn!("Cache fetch failed for {}: {}", key.file_name(), e),
            }
        }

        let raw = self.source.fetch(map_id, wrapped, format, high_dpi)?;
        let image = decode_raw_tile(&raw, &source::tile_path(map_id, wrapped, format, high_dpi))?;

        if let Some(cache) = &self.cache {
            match cache.save(&key, &image) {
                Ok(()) => {}
                Err(CacheError::UnsupportedFormat(format)) => {
                    debug!("Not caching {} tile {}", format, key.file_name())
                }
                Err(e) => warn!("Cache save failed for {}: {}", key.file_name(), e),
            }
        }

        Ok(self.tile(id, image))
    }

    /// Tiles enclosing two corner locations, fetched one after another.
    ///
    /// Returns rows of columns ordered north to south and west to east.
    pub fn get_enclosing_tiles(
        &self,
        map_id: &MapId,
        a: Location,
        b: Location,
        level: u8,
        format: MapFormat,
        high_dpi: bool,
    ) -> Result<Vec<Vec<Tile>>> {
        let range = self.enclosing_range(map_id, a, b, level, format)?;
        loader::load_grid(&range, |id| self.get_tile(map_id, id, format, high_dpi))
    }

    /// [`Maps::get_enclosing_tiles`] with one worker per tile
    pub fn get_enclosing_tiles_concurrent(
        &self,
        map_id: &MapId,
        a: Location,
        b: Location,
        level: u8,
        format: MapFormat,
        high_dpi: bool,
    ) -> Result<Vec<Vec<Tile>>> {
        let range = self.enclosing_range(map_id, a, b, level, format)?;
        loader::load_grid_concurrent(&range, |id| {
            self.get_tile(map_id, id, format, high_dpi)
        })
    }

    fn enclosing_range(
        &self,
        map_id: &MapId,
        a: Location,
        b: Location,
        level: u8,
        format: MapFormat,
    ) -> Result<TileRange> {
        validate_combination(map_id, format)?;
        let range = enclosing_tile_ids(a, b, level);
        debug!(
            "Enclosing tiles for {:?} / {:?}: {}x{} at level {}",
            a,
            b,
            range.width(),
            range.height(),
            level
        );
        Ok(range)
    }

    fn tile(&self, id: TileId, image: RgbaImage) -> Tile {
        Tile::new(id, image.width(), image).with_projector(self.projector.clone())
    }
}

/// Validate a raw tile response and decode its image
fn decode_raw_tile(raw: &RawTile, path: &str) -> Result<RgbaImage> {
    let received = raw.data.len() as u64;
    if let Some(expected) = raw.content_length {
        if expected != received {
            return Err(TransportError::ContentLengthMismatch { expected, received }.into());
        }
    }

    let content_type = raw.content_type.as_deref().unwrap_or_default();
    if content_type == "application/json" {
        let message = base::api_message(&raw.data)
            .unwrap_or_else(|| String::from_utf8_lossy(&raw.data).into_owned());
        return Err(ApiError::Message(message).into());
    }

    if !raw.is_success() {
        return Err(TransportError::Status {
            status: raw.status,
            path: path.to_string(),
        }
        .into());
    }

    let format = match content_type {
        "image/png" => ImageFormat::Png,
        "image/jpeg" | "image/jpg" => ImageFormat::Jpeg,
        other => return Err(DecodeError::UnsupportedContentType(other.to_string()).into()),
    };

    let image = image::load_from_memory_with_format(&raw.data, format).map_err(DecodeError::from)?;
    Ok(image.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, GeometryError};
    use cache::MemoryCache;
    use image::Rgba;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const AUCKLAND_A: Location = Location {
        latitude: -36.5,
        longitude: 174.5,
    };
    const AUCKLAND_B: Location = Location {
        latitude: -37.2,
        longitude: 176.5,
    };

    fn png_bytes(value: u8) -> Vec<u8> {
        let image = RgbaImage::from_pixel(256, 256, Rgba([value, 0, 0, 255]));
        util::encode_image(&image, MapFormat::Png).unwrap()
    }

    /// Serves a solid PNG whose red channel encodes the tile x
    #[derive(Default)]
    struct MockSource {
        requests: Mutex<Vec<TileId>>,
        fail_at: Option<TileId>,
        response: Option<RawTile>,
    }

    impl MockSource {
        fn failing_at(id: TileId) -> Self {
            Self {
                fail_at: Some(id),
                ..Default::default()
            }
        }

        fn responding(raw: RawTile) -> Self {
            Self {
                response: Some(raw),
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl TileSource for MockSource {
        fn fetch(&self, _map_id: &MapId, tile: TileId, _format: MapFormat, _high_dpi: bool) -> Result<RawTile> {
            self.requests.lock().unwrap().push(tile);
            if self.fail_at == Some(tile) {
                return Err(ApiError::RateLimitExceeded.into());
            }
            if let Some(raw) = &self.response {
                return Ok(raw.clone());
            }
            let data = png_bytes(tile.x as u8);
            Ok(RawTile {
                status: 200,
                content_type: Some("image/png".into()),
                content_length: Some(data.len() as u64),
                data,
            })
        }
    }

    struct BrokenCache {
        saves: AtomicUsize,
    }

    impl TileCache for BrokenCache {
        fn fetch(&self, _key: &CacheKey) -> std::result::Result<Option<RgbaImage>, CacheError> {
            Err(CacheError::Poisoned)
        }

        fn save(&self, _key: &CacheKey, _image: &RgbaImage) -> std::result::Result<(), CacheError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            Err(CacheError::Poisoned)
        }
    }

    fn client_for(source: MockSource) -> (Maps, Arc<MockSource>) {
        let source = Arc::new(source);
        (Maps::with_source(source.clone()), source)
    }

    #[test]
    fn test_get_tile_keeps_requested_id() {
        let (maps, source) = client_for(MockSource::default());
        let tile = maps
            .get_tile(&MapId::Streets, TileId::new(17, 10, 4), MapFormat::Png, false)
            .unwrap();

        assert_eq!(tile.id, TileId::new(17, 10, 4));
        assert_eq!(tile.size, 256);
        // Served for the wrapped id
        assert_eq!(source.requests.lock().unwrap()[0], TileId::new(1, 10, 4));
        assert_eq!(tile.image().get_pixel(0, 0)[0], 1);
    }

    #[test]
    fn test_get_tile_rejects_bad_combination_before_fetch() {
        let (maps, source) = client_for(MockSource::default());
        let err = maps
            .get_tile(&MapId::TerrainRgb, TileId::new(1, 1, 2), MapFormat::Png, false)
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        let err = maps
            .get_tile(&MapId::Streets, TileId::new(0, 0, 0), MapFormat::Png, false)
            .unwrap_err();
        assert!(matches!(err, Error::Geometry(GeometryError::InvalidZoom(0))));
        assert_eq!(source.calls(), 0);
    }

    #[test]
    fn test_content_length_mismatch() {
        let data = png_bytes(5);
        let (maps, _) = client_for(MockSource::responding(RawTile {
            status: 200,
            content_type: Some("image/png".into()),
            content_length: Some(data.len() as u64 + 10),
            data,
        }));
        let err = maps
            .get_tile(&MapId::Streets, TileId::new(1, 1, 2), MapFormat::Png, false)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Transport(TransportError::ContentLengthMismatch { .. })
        ));
    }

    #[test]
    fn test_json_body_is_api_error() {
        let (maps, _) = client_for(MockSource::responding(RawTile {
            status: 404,
            content_type: Some("application/json".into()),
            content_length: None,
            data: br#"{"message":"Tile not found"}"#.to_vec(),
        }));
        let err = maps
            .get_tile(&MapId::Streets, TileId::new(1, 1, 2), MapFormat::Png, false)
            .unwrap_err();
        assert!(matches!(err, Error::Api(ApiError::Message(m)) if m == "Tile not found"));

        let (maps, _) = client_for(MockSource::responding(RawTile {
            status: 200,
            content_type: Some("application/json".into()),
            content_length: None,
            data: b"upstream exploded".to_vec(),
        }));
        let err = maps
            .get_tile(&MapId::Streets, TileId::new(1, 1, 2), MapFormat::Png, false)
            .unwrap_err();
        assert!(matches!(err, Error::Api(ApiError::Message(m)) if m == "upstream exploded"));
    }

    #[test]
    fn test_status_and_content_type_errors() {
        let (maps, _) = client_for(MockSource::responding(RawTile {
            status: 500,
            content_type: Some("image/png".into()),
            content_length: None,
            data: Vec::new(),
        }));
        let err = maps
            .get_tile(&MapId::Streets, TileId::new(1, 1, 2), MapFormat::Png, false)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Transport(TransportError::Status { status: 500, ref path }) if path == "v4/mapbox.streets/2/1/1.png"
        ));

        let (maps, _) = client_for(MockSource::responding(RawTile {
            status: 200,
            content_type: Some("image/webp".into()),
            content_length: None,
            data: vec![1, 2, 3],
        }));
        let err = maps
            .get_tile(&MapId::Streets, TileId::new(1, 1, 2), MapFormat::Png, false)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Decode(DecodeError::UnsupportedContentType(t)) if t == "image/webp"
        ));
    }

    #[test]
    fn test_jpeg_response() {
        let image = RgbaImage::from_pixel(512, 512, Rgba([30, 60, 90, 255]));
        let data = util::encode_image(&image, MapFormat::Jpg90).unwrap();
        let (maps, _) = client_for(MockSource::responding(RawTile {
            status: 200,
            content_type: Some("image/jpeg".into()),
            content_length: Some(data.len() as u64),
            data,
        }));
        let tile = maps
            .get_tile(&MapId::Satellite, TileId::new(1, 1, 2), MapFormat::Jpg90, true)
            .unwrap();
        assert_eq!(tile.size, 512);
    }

    #[test]
    fn test_cache_hit_skips_source() {
        let cache = Arc::new(MemoryCache::default());
        let (maps, source) = client_for(MockSource::default());
        let maps = maps.with_cache(cache.clone());
        let id = TileId::new(2, 3, 3);

        let first = maps.get_tile(&MapId::Streets, id, MapFormat::Png, false).unwrap();
        assert_eq!(cache.len(), 1);
        let second = maps.get_tile(&MapId::Streets, id, MapFormat::Png, false).unwrap();

        assert_eq!(source.calls(), 1);
        assert_eq!(first.image(), second.image());
        assert_eq!(second.id, id);
    }

    #[test]
    fn test_cache_failures_are_not_fatal() {
        let cache = Arc::new(BrokenCache {
            saves: AtomicUsize::new(0),
        });
        let (maps, source) = client_for(MockSource::default());
        let maps = maps.with_cache(cache.clone());

        assert!(maps
            .get_tile(&MapId::Streets, TileId::new(2, 3, 3), MapFormat::Png, false)
            .is_ok());
        assert_eq!(source.calls(), 1);
        assert_eq!(cache.saves.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_enclosing_tiles_sequential_and_concurrent_agree() {
        let (maps, _) = client_for(MockSource::default());
        let sequential = maps
            .get_enclosing_tiles(&MapId::Streets, AUCKLAND_A, AUCKLAND_B, 8, MapFormat::Png, false)
            .unwrap();
        let concurrent = maps
            .get_enclosing_tiles_concurrent(&MapId::Streets, AUCKLAND_B, AUCKLAND_A, 8, MapFormat::Png, false)
            .unwrap();

        let range = enclosing_tile_ids(AUCKLAND_A, AUCKLAND_B, 8);
        assert_eq!(sequential.len(), range.height());
        assert_eq!(sequential[0].len(), range.width());
        for ((row, col), id) in range.iter() {
            assert_eq!(sequential[row][col].id, id);
            assert_eq!(concurrent[row][col].id, id);
            assert_eq!(sequential[row][col].image(), concurrent[row][col].image());
        }

        let stitched = composite::stitch_tiles(&concurrent).unwrap();
        assert_eq!(stitched.id, range.origin());
        assert_eq!(
            stitched.image().dimensions(),
            (range.width() as u32 * 256, range.height() as u32 * 256)
        );
    }

    #[test]
    fn test_enclosing_tiles_fail_on_any_tile() {
        let range = enclosing_tile_ids(AUCKLAND_A, AUCKLAND_B, 8);
        assert!(range.len() > 1);
        let last = TileId::new(range.x_end, range.y_end, 8);

        let (maps, _) = client_for(MockSource::failing_at(last));
        let result = maps.get_enclosing_tiles_concurrent(
            &MapId::Streets,
            AUCKLAND_A,
            AUCKLAND_B,
            8,
            MapFormat::Png,
            false,
        );
        assert!(matches!(result, Err(Error::Api(ApiError::RateLimitExceeded))));

        let (maps, source) = client_for(MockSource::failing_at(range.origin()));
        let result = maps.get_enclosing_tiles(
            &MapId::Streets,
            AUCKLAND_A,
            AUCKLAND_B,
            8,
            MapFormat::Png,
            false,
        );
        assert!(result.is_err());
        assert_eq!(source.calls(), 1);
    }

    #[test]
    fn test_enclosing_tiles_across_antimeridian() {
        let a = Location::new(-45.942805, 166.5685);
        let b = Location::new(-34.2186101, 183.4015517);
        let (maps, source) = client_for(MockSource::default());
        let grid = maps
            .get_enclosing_tiles(&MapId::Streets, a, b, 4, MapFormat::Png, false)
            .unwrap();

        let range = enclosing_tile_ids(a, b, 4);
        assert_eq!(grid[0].last().unwrap().id.x, range.x_end);
        assert!(range.x_end >= 16);
        assert!(source.requests.lock().unwrap().iter().all(|t| (0..16).contains(&t.x)));
    }
}
