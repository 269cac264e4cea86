//! Tile coordinate system and conversions
//! Uses Web Mercator projection (EPSG:3857) slippy map tile numbering

use std::f64::consts::PI;

use crate::base::Location;
use crate::error::{GeometryError, Result};

/// Latitude limit of the square Web Mercator world
pub const MAX_LATITUDE: f64 = 85.05112878;

/// Identifier for a map tile.
///
/// `x` and `y` may lie outside `[0, 2^level)` when they describe a position
/// beyond the antimeridian; use [`TileId::wrapped`] before requesting them.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct TileId {
    pub x: i64,
    pub y: i64,
    pub level: u8,
}

impl TileId {
    pub fn new(x: i64, y: i64, level: u8) -> Self {
        Self { x, y, level }
    }

    /// Number of tiles along each axis at this tile's level
    pub fn tile_count(&self) -> i64 {
        1_i64 << self.level
    }

    /// This tile reduced into the valid grid for its level
    pub fn wrapped(&self) -> Result<TileId> {
        let (x, y) = wrap_tile_id(self.x, self.y, self.level)?;
        Ok(TileId::new(x, y, self.level))
    }

    /// Location of the north-west corner of this tile
    pub fn north_west(&self) -> Location {
        let (lat, lon) = tile_xy_to_lat_lon(self.x as f64, self.y as f64, self.level);
        Location::new(lat, lon)
    }
}

/// Convert latitude/longitude to fractional tile coordinates (for sub-tile positioning).
///
/// Longitude is not normalised, so points past the antimeridian map to tiles
/// beyond the grid edge.
pub fn lat_lon_to_tile_xy(lat: f64, lon: f64, zoom: u8) -> (f64, f64) {
    let n = 2f64.powi(zoom as i32);

    let x = (lon + 180.0) / 360.0 * n;

    let lat_rad = clamp_latitude(lat).to_radians();
    let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n;

    (x, y)
}

/// Convert tile coordinates to latitude/longitude (top-left corner of tile)
pub fn tile_xy_to_lat_lon(x: f64, y: f64, zoom: u8) -> (f64, f64) {
    let n = 2f64.powi(zoom as i32);

    let lon = x / n * 360.0 - 180.0;
    let lat_rad = (PI * (1.0 - 2.0 * y / n)).sinh().atan();

    (lat_rad.to_degrees(), lon)
}

/// Tile containing a location at the given zoom.
///
/// Rows are clamped to the grid since latitude is bounded; columns are left
/// unwrapped.
pub fn location_to_tile_id(loc: Location, zoom: u8) -> TileId {
    let (x, y) = lat_lon_to_tile_xy(loc.latitude, loc.longitude, zoom);
    let max_tile = (1_i64 << zoom.min(62)) - 1;
    TileId::new(x.floor() as i64, (y.floor() as i64).clamp(0, max_tile), zoom)
}

/// Wrap tile indices into `[0, 2^level)` for api requests,
/// e.g. tile (16, 10) at level 4 becomes (0, 10).
///
/// Level 0 has no defined wrap and is rejected.
pub fn wrap_tile_id(x: i64, y: i64, level: u8) -> Result<(i64, i64)> {
    if level == 0 || level >= 63 {
        return Err(GeometryError::InvalidZoom(level).into());
    }
    let max_tiles = 1_i64 << level;
    Ok((x.rem_euclid(max_tiles), y.rem_euclid(max_tiles)))
}

/// Clamp latitude to valid Mercator range
pub fn clamp_latitude(lat: f64) -> f64 {
    lat.clamp(-MAX_LATITUDE, MAX_LATITUDE)
}

/// Inclusive rectangle of tile indices at one zoom level
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct TileRange {
    pub x_start: i64,
    pub y_start: i64,
    pub x_end: i64,
    pub y_end: i64,
    pub level: u8,
}

impl TileRange {
    /// Number of tile columns
    pub fn width(&self) -> usize {
        (self.x_end - self.x_start + 1) as usize
    }

    /// Number of tile rows
    pub fn height(&self) -> usize {
        (self.y_end - self.y_start + 1) as usize
    }

    pub fn len(&self) -> usize {
        self.width() * self.height()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Top-left tile of the range
    pub fn origin(&self) -> TileId {
        TileId::new(self.x_start, self.y_start, self.level)
    }

    pub fn contains(&self, tile: &TileId) -> bool {
        tile.level == self.level
            && (self.x_start..=self.x_end).contains(&tile.x)
            && (self.y_start..=self.y_end).contains(&tile.y)
    }

    /// Tiles in row-major order, paired with their (row, column) in the grid
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), TileId)> + '_ {
        (self.y_start..=self.y_end).enumerate().flat_map(move |(row, y)| {
            (self.x_start..=self.x_end)
                .enumerate()
                .map(move |(col, x)| ((row, col), TileId::new(x, y, self.level)))
        })
    }
}

/// Range of tiles enclosing two corner locations, given in either order.
///
/// The range is not wrapped, so its size reflects the true geographic span
/// even across the antimeridian.
pub fn enclosing_tile_ids(a: Location, b: Location, level: u8) -> TileRange {
    let ta = location_to_tile_id(a, level);
    let tb = location_to_tile_id(b, level);

    TileRange {
        x_start: ta.x.min(tb.x),
        y_start: ta.y.min(tb.y),
        x_end: ta.x.max(tb.x),
        y_end: ta.y.max(tb.y),
        level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_location_to_tile_id() {
        let tile = location_to_tile_id(Location::new(-45.942805, 166.5685), 4);
        assert_eq!((tile.x, tile.y), (15, 10));

        // New York City at zoom 16
        let tile = location_to_tile_id(Location::new(40.7128, -74.0060), 16);
        assert_eq!((tile.x, tile.y), (19295, 24640));
    }

    #[test]
    fn test_polar_rows_stay_in_grid() {
        for z in 1..=8u8 {
            let range = enclosing_tile_ids(Location::new(-90.0, 0.0), Location::new(-80.0, 10.0), z);
            assert_eq!(range.y_end, (1 << z) - 1);
            assert_eq!(TileId::new(0, range.y_end, z).wrapped().unwrap().y, range.y_end);

            let range = enclosing_tile_ids(Location::new(90.0, 0.0), Location::new(80.0, 10.0), z);
            assert_eq!(range.y_start, 0);
        }
    }

    #[test]
    fn test_wrap_tile_id() {
        // At zoom 2, max tiles = 4 (0-3)
        assert_eq!(wrap_tile_id(4, 2, 2).unwrap(), (0, 2)); // Wrap around
        assert_eq!(wrap_tile_id(-1, 3, 2).unwrap(), (3, 3)); // Wrap negative
        assert_eq!(wrap_tile_id(16, 10, 4).unwrap(), (0, 10));
    }

    #[test]
    fn test_wrap_always_in_range() {
        for level in 1..=12u8 {
            let max = 1_i64 << level;
            for x in (0..5000).step_by(37) {
                let (wx, wy) = wrap_tile_id(x, x * 3 + 1, level).unwrap();
                assert!((0..max).contains(&wx));
                assert!((0..max).contains(&wy));
            }
        }
    }

    #[test]
    fn test_wrap_rejects_level_zero() {
        assert!(matches!(
            wrap_tile_id(0, 0, 0),
            Err(Error::Geometry(GeometryError::InvalidZoom(0)))
        ));
    }

    #[test]
    fn test_enclosing_range_is_order_independent() {
        let a = Location::new(-45.942805, 166.5685);
        let b = Location::new(-34.2186101, 183.4015517);
        let forward = enclosing_tile_ids(a, b, 6);
        let reverse = enclosing_tile_ids(b, a, 6);
        assert_eq!(forward, reverse);
        assert!(forward.x_start <= forward.x_end);
        assert!(forward.y_start <= forward.y_end);

        // Mixed corners: north-west / south-east given as south-west / north-east
        let c = Location::new(a.latitude, b.longitude);
        let d = Location::new(b.latitude, a.longitude);
        assert_eq!(enclosing_tile_ids(c, d, 6), forward);
    }

    #[test]
    fn test_enclosing_range_spans_antimeridian() {
        let a = Location::new(-45.942805, 166.5685);
        let b = Location::new(-34.2186101, 183.4015517);
        let range = enclosing_tile_ids(a, b, 6);

        assert!(range.x_end >= 64, "range must keep its unwrapped extent");
        assert!(range.contains(&location_to_tile_id(a, 6)));
        assert!(range.contains(&location_to_tile_id(b, 6)));

        let wrapped = TileId::new(range.x_end, range.y_end, 6).wrapped().unwrap();
        assert!(wrapped.x < 64);
    }

    #[test]
    fn test_range_iteration_is_contiguous() {
        let range = TileRange {
            x_start: 3,
            y_start: 7,
            x_end: 5,
            y_end: 8,
            level: 4,
        };
        let tiles: Vec<_> = range.iter().collect();
        assert_eq!(tiles.len(), range.len());
        assert_eq!(tiles[0], ((0, 0), TileId::new(3, 7, 4)));
        assert_eq!(tiles[4], ((1, 1), TileId::new(4, 8, 4)));
        assert_eq!(tiles[5], ((1, 2), TileId::new(5, 8, 4)));
    }

    #[test]
    fn test_tile_corner() {
        let corner = TileId::new(512, 512, 10).north_west();
        assert!(corner.latitude.abs() < 1e-9);
        assert!(corner.longitude.abs() < 1e-9);
    }
}
