//! Grid tile loading, sequential or one worker per tile

use std::sync::mpsc;
use std::thread;

use log::debug;
use web_time::Instant;

use super::composite::Tile;
use super::tile::{TileId, TileRange};
use crate::error::{GeometryError, Result};

/// Load every tile of `range` in row-major order, stopping at the first failure
pub fn load_grid<F>(range: &TileRange, fetch: F) -> Result<Vec<Vec<Tile>>>
where
    F: Fn(TileId) -> Result<Tile>,
{
    let start = Instant::now();
    let mut grid: Vec<Vec<Tile>> = Vec::with_capacity(range.height());

    for ((row, _), id) in range.iter() {
        if row == grid.len() {
            grid.push(Vec::with_capacity(range.width()));
        }
        grid[row].push(fetch(id)?);
    }

    debug!(
        "Loaded {} tiles at level {} in {:?}",
        range.len(),
        range.level,
        start.elapsed()
    );
    Ok(grid)
}

/// Upper bound on worker threads alive at once
pub const MAX_WORKERS: usize = 64;

type Slots = Vec<Vec<Option<Tile>>>;

/// Load every tile of `range` on its own worker thread.
///
/// Results are placed by grid position, not completion order. The first error
/// fails the whole grid; workers already running finish and their results are
/// discarded.
///
/// Tiles are dispatched in batches of [`MAX_WORKERS`], so a large range never
/// holds more than that many threads. A thread that cannot be spawned fails the
/// grid with an I/O error.
pub fn load_grid_concurrent<F>(range: &TileRange, fetch: F) -> Result<Vec<Vec<Tile>>>
where
    F: Fn(TileId) -> Result<Tile> + Sync,
{
    let start = Instant::now();
    let tiles: Vec<_> = range.iter().collect();
    let mut slots: Slots = (0..range.height())
        .map(|_| (0..range.width()).map(|_| None).collect())
        .collect();

    for batch in tiles.chunks(MAX_WORKERS) {
        load_batch(batch, &fetch, &mut slots)?;
    }

    let grid = slots
        .into_iter()
        .map(|row| row.into_iter().collect::<Option<Vec<Tile>>>())
        .collect::<Option<Vec<Vec<Tile>>>>()
        .ok_or(GeometryError::EmptyGrid)?;

    debug!(
        "Loaded {} tiles concurrently at level {} in {:?}",
        range.len(),
        range.level,
        start.elapsed()
    );
    Ok(grid)
}

fn load_batch<F>(batch: &[((usize, usize), TileId)], fetch: &F, slots: &mut Slots) -> Result<()>
where
    F: Fn(TileId) -> Result<Tile> + Sync,
{
    // Room for every result, so workers never block once the receiver is gone
    let (result_tx, result_rx) = mpsc::sync_channel(batch.len().max(1));

    thread::scope(|s| {
        for &(position, id) in batch {
            let result_tx = result_tx.clone();
            thread::Builder::new()
                .name(format!("tile-{}-{}-{}", id.level, id.x, id.y))
                .spawn_scoped(s, move || {
                    let result = fetch(id);
                    if result_tx.send((position, id, result)).is_err() {
                        debug!("Discarding tile {:?}, grid already failed", id);
                    }
                })?;
        }
        drop(result_tx);

        for ((row, col), id, result) in result_rx {
            match result {
                Ok(tile) => slots[row][col] = Some(tile),
                Err(e) => {
                    debug!("Tile {:?} failed: {}", id, e);
                    return Err(e);
                }
            }
        }
        Ok(())
    })
}
