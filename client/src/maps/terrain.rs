//! Terrain-RGB elevation encoding and elevation grid helpers
//!
//! Elevation is stored as `-10000 + (r * 65536 + g * 256 + b) * 0.1` metres.

use image::{Rgba, RgbaImage};
use log::trace;

/// Elevation of the all-zero pixel
pub const BASE_ELEVATION: f64 = -10000.0;

/// Metres per encoded step
pub const ELEVATION_STEP: f64 = 0.1;

const MAX_ENCODED: u32 = 0x00FF_FFFF;

/// Decode an elevation from a terrain-rgb pixel
pub fn pixel_to_height(r: u8, g: u8, b: u8) -> f64 {
    let encoded = (r as u32) * 65536 + (g as u32) * 256 + b as u32;
    BASE_ELEVATION + encoded as f64 * ELEVATION_STEP
}

/// Encode an elevation into a terrain-rgb pixel, saturating at the encodable range
pub fn height_to_pixel(height: f64) -> (u8, u8, u8) {
    let encoded = ((height - BASE_ELEVATION) / ELEVATION_STEP)
        .round()
        .clamp(0.0, MAX_ENCODED as f64) as u32;
    (
        (encoded >> 16) as u8,
        ((encoded >> 8) & 0xFF) as u8,
        (encoded & 0xFF) as u8,
    )
}

/// Decode the elevation stored in an RGBA pixel
pub fn rgba_to_height(pixel: &Rgba<u8>) -> f64 {
    let [r, g, b, _] = pixel.0;
    pixel_to_height(r, g, b)
}

/// Highest decoded elevation in a terrain raster
pub fn highest_elevation(image: &RgbaImage) -> f64 {
    image
        .pixels()
        .map(rgba_to_height)
        .fold(f64::NEG_INFINITY, f64::max)
}

/// Grayscale visualisation of a terrain raster, `elevation / max_height` mapped onto 0-255
pub fn flatten_elevations(image: &RgbaImage, max_height: f64) -> RgbaImage {
    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let height = rgba_to_height(image.get_pixel(x, y));
        let level = (height / max_height * 255.0).clamp(0.0, 255.0) as u8;
        Rgba([level, level, level, 255])
    })
}

fn is_missing(value: f64, sentinel: f64) -> bool {
    value == sentinel || (sentinel.is_nan() && value.is_nan())
}

/// Linearly fill sentinel runs bounded by valid values on both sides.
/// Runs touching either end of the line keep the sentinel.
fn interpolate_line(line: &[f64], sentinel: f64) -> Vec<f64> {
    let mut filled = line.to_vec();
    let mut last_valid: Option<usize> = None;

    for (i, &value) in line.iter().enumerate() {
        if is_missing(value, sentinel) {
            continue;
        }
        if let Some(last) = last_valid {
            let gap = i - last;
            if gap > 1 {
                let delta = (value - line[last]) / gap as f64;
                trace!(
                    "filling {} values between {} ({:.2}) and {} ({:.2})",
                    gap - 1,
                    last,
                    line[last],
                    i,
                    value
                );
                for j in 1..gap {
                    filled[last + j] = line[last] + j as f64 * delta;
                }
            }
        }
        last_valid = Some(i);
    }

    filled
}

/// Build a dense surface from a sparse grid of samples.
///
/// Gaps marked with `sentinel` are interpolated along each row and then along
/// each column; cells filled on both axes take the mean, cells filled on only
/// one axis take that value, and cells with no valid neighbours on either
/// axis keep the sentinel.
pub fn gradient_interpolate_2d(grid: &[Vec<f64>], sentinel: f64) -> Vec<Vec<f64>> {
    let rows = grid.len();
    let cols = grid.iter().map(Vec::len).max().unwrap_or(0);
    if rows == 0 || cols == 0 {
        return Vec::new();
    }

    // Ragged rows are padded with the sentinel
    let square: Vec<Vec<f64>> = grid
        .iter()
        .map(|row| {
            let mut row = row.clone();
            row.resize(cols, sentinel);
            row
        })
        .collect();

    let by_row: Vec<Vec<f64>> = square
        .iter()
        .map(|row| interpolate_line(row, sentinel))
        .collect();

    let by_col: Vec<Vec<f64>> = (0..cols)
        .map(|x| {
            let column: Vec<f64> = square.iter().map(|row| row[x]).collect();
            interpolate_line(&column, sentinel)
        })
        .collect();

    (0..rows)
        .map(|y| {
            (0..cols)
                .map(|x| {
                    let horizontal = by_row[y][x];
                    let vertical = by_col[x][y];
                    match (
                        is_missing(horizontal, sentinel),
                        is_missing(vertical, sentinel),
                    ) {
                        (true, _) => vertical,
                        (false, true) => horizontal,
                        (false, false) => (horizontal + vertical) / 2.0,
                    }
                })
                .collect()
        })
        .collect()
}
