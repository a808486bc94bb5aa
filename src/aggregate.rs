//! Grid aggregation: fetch, flatten and clean every tile of the grid

use serde_json::Value;
use tracing::{info, warn};

use crate::{
    fetcher::TileSource,
    flatten::{flatten, Table},
    models::{Dataset, GridBounds, RawVesselRow},
};

/// Aggregation progress, reported after every tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn label(&self) -> String {
        format!("{}/{} tiles processed", self.completed, self.total)
    }

    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }

    pub fn is_done(&self) -> bool {
        self.completed == self.total
    }
}

/// Scrape the whole grid into one cleaned dataset.
///
/// Tiles are fetched one at a time in grid order. A failed tile is logged
/// and contributes no rows; `on_progress` is still called for it. Returns
/// an empty dataset when no tile yields vessels.
pub async fn aggregate<S, F>(
    source: &S,
    grid: GridBounds,
    zoom: u8,
    mut on_progress: F,
) -> Dataset
where
    S: TileSource,
    F: FnMut(&Progress),
{
    let total = grid.tile_count();
    let mut tables = Vec::new();

    for (index, tile) in grid.tiles(zoom).enumerate() {
        match source.fetch(tile).await {
            Ok(payload) => {
                let table = flatten(&payload);
                if !table.is_empty() {
                    tables.push(table);
                }
            }
            Err(e) => {
                warn!(
                    "Skipping tile x={} y={} z={} (status: {}): {}",
                    tile.x,
                    tile.y,
                    tile.zoom,
                    e.status_label(),
                    e
                );
            }
        }

        on_progress(&Progress {
            completed: index + 1,
            total,
        });
    }

    let tiles_with_data = tables.len();
    let dataset = clean(tables);
    info!(
        "Aggregated {} vessels from {}/{} tiles",
        dataset.len(),
        tiles_with_data,
        total
    );
    dataset
}

/// Concatenate tile tables and drop rows without position or speed
pub fn clean(tables: Vec<Table>) -> Dataset {
    let mut combined = Table::default();
    for table in tables {
        combined.extend(table);
    }

    combined
        .into_rows()
        .into_iter()
        .filter_map(|row| match serde_json::from_value::<RawVesselRow>(Value::Object(row)) {
            Ok(raw) => raw.into_record(),
            Err(e) => {
                warn!("Dropping unreadable vessel row: {}", e);
                None
            }
        })
        .collect()
}
