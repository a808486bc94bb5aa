//! Scraping pipeline: aggregation behind the TTL cache

use std::sync::Arc;
use std::time::Duration;

use crate::{
    aggregate::{aggregate, Progress},
    cache::{GridKey, TtlCache},
    fetcher::TileSource,
    models::{Dataset, GridBounds},
};

/// Grid scraper whose results are reused for one TTL window
pub struct Pipeline<S> {
    source: S,
    grid: GridBounds,
    zoom: u8,
    dedup_by_ship_id: bool,
    cache: TtlCache<GridKey, Dataset>,
}

impl<S> Pipeline<S>
where
    S: TileSource,
{
    pub fn new(source: S, grid: GridBounds, zoom: u8, ttl: Duration) -> Self {
        Self {
            source,
            grid,
            zoom,
            dedup_by_ship_id: false,
            cache: TtlCache::new(ttl),
        }
    }

    pub fn dedup_by_ship_id(mut self, enabled: bool) -> Self {
        self.dedup_by_ship_id = enabled;
        self
    }

    pub fn grid(&self) -> GridBounds {
        self.grid
    }

    /// Give back the tile source, dropping the cache
    pub fn into_source(self) -> S {
        self.source
    }

    /// Current dataset, scraping the grid only when the cached one expired.
    ///
    /// `on_progress` is not called on a cache hit.
    pub async fn load<F>(&self, on_progress: F) -> Arc<Dataset>
    where
        F: FnMut(&Progress),
    {
        self.cache
            .get_or_compute((self.grid, self.zoom), || async move {
                let dataset = aggregate(&self.source, self.grid, self.zoom, on_progress).await;
                if self.dedup_by_ship_id {
                    dataset.dedup_by_ship_id()
                } else {
                    dataset
                }
            })
            .await
    }
}
