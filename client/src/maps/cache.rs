//! Tile caches
//!
//! A cache is a pure optimisation: the fetch path logs and ignores every
//! [`CacheError`], treating it as a miss.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use image::RgbaImage;
use log::debug;
use thiserror::Error;
use web_time::Instant;

use super::tile::TileId;
use super::types::{MapFormat, MapId};
use super::util;

const DEFAULT_MAX_TILES: usize = 256;
const DEFAULT_MAX_MEMORY: usize = 64 * 1024 * 1024;

/// Everything that affects the bytes of a cached tile
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct CacheKey {
    pub map_id: MapId,
    pub x: i64,
    pub y: i64,
    pub level: u8,
    pub format: MapFormat,
    pub high_dpi: bool,
}

impl CacheKey {
    /// Key for a (wrapped) tile id
    pub fn new(map_id: MapId, tile: TileId, format: MapFormat, high_dpi: bool) -> Self {
        Self {
            map_id,
            x: tile.x,
            y: tile.y,
            level: tile.level,
            format,
            high_dpi,
        }
    }

    /// File name used by [`FileCache`], e.g. `mapbox.streets-15-10-4@2x.png`
    pub fn file_name(&self) -> String {
        let dpi = if self.high_dpi { "@2x" } else { "" };
        format!(
            "{}-{}-{}-{}{}.{}",
            self.map_id, self.x, self.y, self.level, dpi, self.format
        )
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cached image unreadable: {0}")]
    Image(#[from] image::ImageError),

    #[error("cache encode failed: {0}")]
    Encode(#[from] crate::error::Error),

    #[error("{0} tiles cannot be cached")]
    UnsupportedFormat(MapFormat),

    #[error("cache lock poisoned")]
    Poisoned,
}

/// Store of decoded tiles, shared by concurrent fetch workers
pub trait TileCache: Send + Sync {
    /// Cached raster for `key`, `None` on a miss
    fn fetch(&self, key: &CacheKey) -> Result<Option<RgbaImage>, CacheError>;

    /// Store a raster under `key`
    fn save(&self, key: &CacheKey, image: &RgbaImage) -> Result<(), CacheError>;
}

/// Append-only on-disk cache.
///
/// Files are never evicted or revalidated: once a tile is written it is served
/// for as long as the directory exists. `pngraw` tiles are not cached.
#[derive(Clone, Debug)]
pub struct FileCache {
    base_path: PathBuf,
}

impl FileCache {
    /// Open a cache directory, creating it if needed
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.base_path.join(key.file_name())
    }
}

impl TileCache for FileCache {
    fn fetch(&self, key: &CacheKey) -> Result<Option<RgbaImage>, CacheError> {
        if key.format == MapFormat::PngRaw {
            return Ok(None);
        }

        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        let data = fs::read(&path)?;
        let image = image::load_from_memory(&data)?.to_rgba8();
        debug!("Cache hit {}", path.display());
        Ok(Some(image))
    }

    fn save(&self, key: &CacheKey, image: &RgbaImage) -> Result<(), CacheError> {
        if key.format == MapFormat::PngRaw {
            return Err(CacheError::UnsupportedFormat(key.format));
        }

        let path = self.path_for(key);
        if path.exists() {
            return Ok(());
        }

        let data = util::encode_image(image, key.format)?;
        fs::write(&path, data)?;
        debug!("Cached {}", path.display());
        Ok(())
    }
}

/// Bytes held by an RGBA raster
pub fn tile_memory_size(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}

struct CachedTile {
    image: Arc<RgbaImage>,
    memory_size: usize,
    created_at: Instant,
}

struct LruTiles {
    tiles: HashMap<CacheKey, CachedTile>,
    access_order: Vec<CacheKey>,
    max_tiles: usize,
    current_memory: usize,
    max_memory: usize,
}

impl LruTiles {
    fn get(&mut self, key: &CacheKey) -> Option<Arc<RgbaImage>> {
        let image = self.tiles.get(key).map(|tile| Arc::clone(&tile.image))?;
        self.update_access_order(key);
        Some(image)
    }

    fn insert(&mut self, key: CacheKey, image: RgbaImage) {
        let memory_size = tile_memory_size(image.width(), image.height());

        // Replace in place rather than evicting for an update
        if let Some(old) = self.tiles.remove(&key) {
            self.current_memory -= old.memory_size;
            self.access_order.retain(|k| k != &key);
        }

        while self.should_evict(memory_size) {
            if !self.evict_oldest() {
                break;
            }
        }

        self.current_memory += memory_size;
        self.tiles.insert(
            key.clone(),
            CachedTile {
                image: Arc::new(image),
                memory_size,
                created_at: Instant::now(),
            },
        );
        self.access_order.push(key);
    }

    fn should_evict(&self, new_tile_memory: usize) -> bool {
        !self.tiles.is_empty()
            && (self.tiles.len() >= self.max_tiles
                || self.current_memory + new_tile_memory > self.max_memory)
    }

    /// Evict the least recently used tile
    fn evict_oldest(&mut self) -> bool {
        if self.access_order.is_empty() {
            return false;
        }
        let oldest = self.access_order.remove(0);
        match self.tiles.remove(&oldest) {
            Some(tile) => {
                self.current_memory -= tile.memory_size;
                debug!(
                    "Evicted tile {} after {:?} ({} of {} bytes held)",
                    oldest.file_name(),
                    tile.created_at.elapsed(),
                    self.current_memory,
                    self.max_memory
                );
                true
            }
            None => false,
        }
    }

    fn update_access_order(&mut self, key: &CacheKey) {
        if let Some(pos) = self.access_order.iter().position(|k| k == key) {
            let key = self.access_order.remove(pos);
            self.access_order.push(key);
        }
    }

    fn remove(&mut self, key: &CacheKey) -> bool {
        match self.tiles.remove(key) {
            Some(tile) => {
                self.current_memory -= tile.memory_size;
                self.access_order.retain(|k| k != key);
                true
            }
            None => false,
        }
    }
}

/// In-memory LRU cache bounded by tile count and raster memory
pub struct MemoryCache {
    inner: Mutex<LruTiles>,
}

impl MemoryCache {
    /// Create a new tile cache
    /// - max_tiles: Maximum number of tiles to cache (e.g., 256)
    /// - max_memory: Maximum raster memory in bytes (e.g., 64MB)
    pub fn new(max_tiles: usize, max_memory: usize) -> Self {
        Self {
            inner: Mutex::new(LruTiles {
                tiles: HashMap::with_capacity(max_tiles),
                access_order: Vec::with_capacity(max_tiles),
                max_tiles,
                current_memory: 0,
                max_memory,
            }),
        }
    }

    /// Check if a tile is cached, without touching its recency
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner
            .lock()
            .map(|lru| lru.tiles.contains_key(key))
            .unwrap_or(false)
    }

    /// Shared handle to a cached raster, marking it as recently used
    pub fn get(&self, key: &CacheKey) -> Option<Arc<RgbaImage>> {
        self.inner.lock().ok()?.get(key)
    }

    pub fn remove(&self, key: &CacheKey) -> bool {
        self.inner
            .lock()
            .map(|mut lru| lru.remove(key))
            .unwrap_or(false)
    }

    pub fn clear(&self) {
        if let Ok(mut lru) = self.inner.lock() {
            lru.tiles.clear();
            lru.access_order.clear();
            lru.current_memory = 0;
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|lru| lru.tiles.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes of raster data currently held
    pub fn memory_used(&self) -> usize {
        self.inner.lock().map(|lru| lru.current_memory).unwrap_or(0)
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TILES, DEFAULT_MAX_MEMORY)
    }
}

impl TileCache for MemoryCache {
    fn fetch(&self, key: &CacheKey) -> Result<Option<RgbaImage>, CacheError> {
        let mut lru = self.inner.lock().map_err(|_| CacheError::Poisoned)?;
        Ok(lru.get(key).map(|image| image.as_ref().clone()))
    }

    fn save(&self, key: &CacheKey, image: &RgbaImage) -> Result<(), CacheError> {
        let mut lru = self.inner.lock().map_err(|_| CacheError::Poisoned)?;
        lru.insert(key.clone(), image.clone());
        Ok(())
    }
}
