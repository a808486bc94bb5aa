//! Tile fetcher

use std::future::Future;

use reqwest::{header, Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::{
    config::FetcherConfig,
    errors::{FetchError, RiasViewerError},
    models::TileCoordinate,
};

/// Source of raw tile payloads.
///
/// One attempt per call, no retry. A failure means "no vessels for this
/// tile" to the caller.
pub trait TileSource {
    fn fetch(
        &self,
        tile: TileCoordinate,
    ) -> impl Future<Output = Result<Value, FetchError>> + Send;
}

/// Fetches tiles from the tracking service over HTTP
#[derive(Debug, Clone)]
pub struct HttpTileFetcher {
    client: Client,
    base_url: String,
}

impl HttpTileFetcher {
    /// Create a fetcher sharing one HTTP client across all tile requests
    pub fn new(config: &FetcherConfig) -> Result<Self, RiasViewerError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json, text/plain, */*"),
        );

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Tile data URL for the given coordinate
    pub fn tile_url(&self, tile: TileCoordinate) -> String {
        tile_url(&self.base_url, tile)
    }
}

pub(crate) fn tile_url(base_url: &str, tile: TileCoordinate) -> String {
    format!(
        "{}/getData/get_data_json_4/z:{}/X:{}/Y:{}/station:0",
        base_url, tile.zoom, tile.x, tile.y
    )
}

impl TileSource for HttpTileFetcher {
    async fn fetch(&self, tile: TileCoordinate) -> Result<Value, FetchError> {
        let url = self.tile_url(tile);
        debug!("Fetching tile {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout { url: url.clone() }
            } else {
                FetchError::Transport {
                    url: url.clone(),
                    origin: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout { url: url.clone() }
            } else {
                FetchError::Transport {
                    url: url.clone(),
                    origin: e.to_string(),
                }
            }
        })?;

        serde_json::from_slice(&body).map_err(|e| FetchError::InvalidJson {
            url,
            origin: e.to_string(),
        })
    }
}
