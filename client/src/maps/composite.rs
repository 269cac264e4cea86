//! Raster tiles with positioning data, overlay drawing and stitching

use image::{DynamicImage, Rgba, RgbaImage, imageops};

use super::mercator::Mercator;
use super::terrain;
use super::tile::TileId;
use crate::base::Location;
use crate::error::{GeometryError, Result};

/// Horizontal anchor of an overlay relative to the draw point
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Horizontal {
    Left,
    #[default]
    Center,
    Right,
}

/// Vertical anchor of an overlay relative to the draw point
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Vertical {
    Top,
    #[default]
    Center,
    Bottom,
}

/// Overlay justification
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DrawConfig {
    pub vertical: Vertical,
    pub horizontal: Horizontal,
}

impl DrawConfig {
    /// Overlay centred on the draw point
    pub const CENTER: DrawConfig = DrawConfig {
        vertical: Vertical::Center,
        horizontal: Horizontal::Center,
    };

    pub fn new(vertical: Vertical, horizontal: Horizontal) -> Self {
        Self {
            vertical,
            horizontal,
        }
    }

    /// Top-left corner at which an overlay of `(width, height)` must be drawn
    fn origin(&self, x: i64, y: i64, width: u32, height: u32) -> (i64, i64) {
        let (w, h) = (width as i64, height as i64);
        let ox = match self.horizontal {
            Horizontal::Left => x,
            Horizontal::Center => x - w / 2,
            Horizontal::Right => x - w,
        };
        let oy = match self.vertical {
            Vertical::Top => y,
            Vertical::Center => y - h / 2,
            Vertical::Bottom => y - h,
        };
        (ox, oy)
    }
}

/// A raster covering one or more map tiles.
///
/// `id` is the top-left tile and `size` the edge length of a single tile, so a
/// stitched composite keeps addressing global pixels the same way as its
/// source tiles.
#[derive(Clone, Debug)]
pub struct Tile {
    pub id: TileId,
    pub size: u32,
    image: RgbaImage,
    projector: Mercator,
}

impl Tile {
    pub fn new(id: TileId, size: u32, image: RgbaImage) -> Self {
        Self {
            id,
            size,
            image,
            projector: Mercator::default(),
        }
    }

    /// Build a tile from any decoded image, converting it to RGBA
    pub fn from_image(id: TileId, size: u32, image: DynamicImage) -> Self {
        Self::new(id, size, image.to_rgba8())
    }

    /// Share an existing projector (and its constant cache)
    pub fn with_projector(mut self, projector: Mercator) -> Self {
        self.projector = projector;
        self
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    fn check_local(&self, x: i64, y: i64) -> Result<(u32, u32)> {
        let (width, height) = (self.width() as i64, self.height() as i64);
        if !(0..width).contains(&x) {
            return Err(GeometryError::OutOfBounds {
                axis: 'x',
                offset: x,
                max: width,
            }
            .into());
        }
        if !(0..height).contains(&y) {
            return Err(GeometryError::OutOfBounds {
                axis: 'y',
                offset: y,
                max: height,
            }
            .into());
        }
        Ok((x as u32, y as u32))
    }

    /// Translate a global pixel into this tile's local pixel space
    pub fn global_to_local(&self, x: i64, y: i64) -> Result<(u32, u32)> {
        let size = self.size as i64;
        self.check_local(x - self.id.x * size, y - self.id.y * size)
    }

    /// Local pixel of a location on this tile.
    ///
    /// Longitudes are resolved to whichever copy of the world lies at or after
    /// the tile's west edge, so a composite spanning the antimeridian addresses
    /// `190` and `-170` at the same pixel east of the seam.
    pub fn location_to_local(&self, loc: Location) -> Result<(u32, u32)> {
        let lng = (loc.longitude + 180.0).rem_euclid(360.0) - 180.0;
        let (x, y) = self
            .projector
            .location_to_pixel_exact(loc.latitude, lng, self.id.level, self.size);

        let world = self.size as f64 * 2f64.powi(self.id.level as i32);
        let west = (self.id.x * self.size as i64) as f64;
        let x = x + world * ((west - x) / world).ceil();
        self.global_to_local(x.floor() as i64, y.floor() as i64)
    }

    /// Draw `overlay` anchored at the local pixel `(x, y)`.
    ///
    /// Only the anchor has to lie on the raster. Parts of the justified overlay
    /// that fall past the tile edge are clipped, so a marker at a border is
    /// partially drawn.
    pub fn draw_local(&mut self, overlay: &RgbaImage, x: i64, y: i64, config: DrawConfig) -> Result<()> {
        self.check_local(x, y)?;
        let (ox, oy) = config.origin(x, y, overlay.width(), overlay.height());
        imageops::overlay(&mut self.image, overlay, ox, oy);
        Ok(())
    }

    /// Draw `overlay` anchored at the global pixel `(x, y)`
    pub fn draw_global(&mut self, overlay: &RgbaImage, x: i64, y: i64, config: DrawConfig) -> Result<()> {
        let (lx, ly) = self.global_to_local(x, y)?;
        self.draw_local(overlay, lx as i64, ly as i64, config)
    }

    /// Draw `overlay` anchored at a location
    pub fn draw_location(&mut self, overlay: &RgbaImage, loc: Location, config: DrawConfig) -> Result<()> {
        let (lx, ly) = self.location_to_local(loc)?;
        self.draw_local(overlay, lx as i64, ly as i64, config)
    }

    /// Walk the line from `from` towards `to` in local pixels, replacing each
    /// visited pixel with the result of `interpolate`.
    ///
    /// The walk takes `round(length)` fixed steps and stops before `to`.
    pub fn interpolate_local<F>(&mut self, from: (u32, u32), to: (u32, u32), mut interpolate: F) -> Result<()>
    where
        F: FnMut(Rgba<u8>) -> Rgba<u8>,
    {
        let (x1, y1) = self.check_local(from.0 as i64, from.1 as i64)?;
        let (x2, y2) = self.check_local(to.0 as i64, to.1 as i64)?;

        let (x1, y1, x2, y2) = (x1 as i64, y1 as i64, x2 as i64, y2 as i64);
        let (dx, dy) = (x2 - x1, y2 - y1);
        let steps = ((dx * dx + dy * dy) as f64).sqrt().round() as i64;

        if steps == 0 {
            let pixel = self.image.get_pixel_mut(x1 as u32, y1 as u32);
            *pixel = interpolate(*pixel);
            return Ok(());
        }

        for i in 0..steps {
            let x = x1 + i * dx / steps;
            let y = y1 + i * dy / steps;
            let pixel = self.image.get_pixel_mut(x as u32, y as u32);
            *pixel = interpolate(*pixel);
        }

        Ok(())
    }

    /// [`Tile::interpolate_local`] between two global pixels
    pub fn interpolate_global<F>(&mut self, from: (i64, i64), to: (i64, i64), interpolate: F) -> Result<()>
    where
        F: FnMut(Rgba<u8>) -> Rgba<u8>,
    {
        let a = self.global_to_local(from.0, from.1)?;
        let b = self.global_to_local(to.0, to.1)?;
        self.interpolate_local(a, b, interpolate)
    }

    /// [`Tile::interpolate_local`] between two locations
    pub fn interpolate_locations<F>(&mut self, from: Location, to: Location, interpolate: F) -> Result<()>
    where
        F: FnMut(Rgba<u8>) -> Rgba<u8>,
    {
        let a = self.location_to_local(from)?;
        let b = self.location_to_local(to)?;
        self.interpolate_local(a, b, interpolate)
    }

    /// Draw a solid line between two locations
    pub fn draw_line(&mut self, from: Location, to: Location, colour: Rgba<u8>) -> Result<()> {
        self.interpolate_locations(from, to, |_| colour)
    }

    /// Elevation at a location on a terrain-rgb tile
    pub fn get_altitude(&self, loc: Location) -> Result<f64> {
        let (x, y) = self.location_to_local(loc)?;
        Ok(terrain::rgba_to_height(self.image.get_pixel(x, y)))
    }

    /// Elevations sampled along the line between two locations on a terrain-rgb tile
    pub fn interpolate_altitudes(&mut self, from: Location, to: Location) -> Result<Vec<f64>> {
        let mut altitudes = Vec::new();
        self.interpolate_locations(from, to, |pixel| {
            altitudes.push(terrain::rgba_to_height(&pixel));
            pixel
        })?;
        Ok(altitudes)
    }

    /// Highest elevation on a terrain-rgb tile
    pub fn highest_elevation(&self) -> f64 {
        terrain::highest_elevation(&self.image)
    }

    /// Grayscale rendering of a terrain-rgb tile, leaving this tile untouched
    pub fn flatten_altitudes(&self, max_height: f64) -> Tile {
        Tile {
            id: self.id,
            size: self.size,
            image: terrain::flatten_elevations(&self.image, max_height),
            projector: self.projector.clone(),
        }
    }
}

/// Combine a grid of equally sized tiles (rows of columns) into one tile.
///
/// The result is addressed from the top-left tile of the grid.
pub fn stitch_tiles(grid: &[Vec<Tile>]) -> Result<Tile> {
    let first = grid
        .first()
        .and_then(|row| row.first())
        .ok_or(GeometryError::EmptyGrid)?;
    let columns = grid[0].len();
    if grid.iter().any(|row| row.len() != columns) {
        return Err(GeometryError::EmptyGrid.into());
    }

    let (tile_width, tile_height) = first.image.dimensions();
    for tile in grid.iter().flatten() {
        if tile.image.dimensions() != (tile_width, tile_height) {
            return Err(GeometryError::DimensionMismatch {
                expected: (tile_width, tile_height),
                found: tile.image.dimensions(),
            }
            .into());
        }
    }

    let mut stitched = RgbaImage::new(tile_width * columns as u32, tile_height * grid.len() as u32);
    for (row, tiles) in grid.iter().enumerate() {
        for (col, tile) in tiles.iter().enumerate() {
            let x = col as i64 * tile_width as i64;
            let y = row as i64 * tile_height as i64;
            imageops::replace(&mut stitched, &tile.image, x, y);
        }
    }

    Ok(Tile {
        id: first.id,
        size: first.size,
        image: stitched,
        projector: first.projector.clone(),
    })
}
