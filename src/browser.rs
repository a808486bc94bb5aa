//! Headless Chromium tile fetcher
//!
//! Tiles are loaded by navigating a real browser page to the tile URL, so
//! the request carries the cookies and script-driven checks of a browser
//! session. One browser and one page are shared across all tiles.

use std::time::Duration;

use chromiumoxide::{error::CdpError, Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::{
    config::FetcherConfig,
    errors::{FetchError, RiasViewerError},
    fetcher::{tile_url, TileSource},
    models::TileCoordinate,
};

/// Text of the loaded document; Chromium wraps JSON responses in a `<pre>`
const BODY_TEXT: &str = "document.body ? document.body.innerText : ''";

pub struct BrowserTileFetcher {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    base_url: String,
    timeout: Duration,
}

impl BrowserTileFetcher {
    /// Launch a headless browser and open the page used for every tile
    pub async fn launch(config: &FetcherConfig) -> Result<Self, RiasViewerError> {
        let browser_config = BrowserConfig::builder()
            .arg(format!("--user-agent={}", config.user_agent))
            .request_timeout(config.timeout)
            .build()
            .map_err(|message| RiasViewerError::ConfigurationError { message })?;

        let (browser, mut events) = Browser::launch(browser_config).await?;
        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let Err(e) = event {
                    debug!("Browser event loop stopped: {}", e);
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await?;
        info!("Launched headless browser for tile fetching");

        Ok(Self {
            browser,
            page,
            handler,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
        })
    }

    /// Close the browser and wait for its process to exit
    pub async fn close(mut self) -> Result<(), RiasViewerError> {
        self.browser.close().await?;
        self.browser.wait().await?;
        self.handler.abort();
        info!("Closed headless browser");
        Ok(())
    }

    async fn load(&self, url: &str) -> Result<Value, FetchError> {
        let transport = |e: CdpError| FetchError::Transport {
            url: url.to_string(),
            origin: e.to_string(),
        };

        self.page.goto(url).await.map_err(transport)?;
        let request = self
            .page
            .wait_for_navigation_response()
            .await
            .map_err(transport)?;
        let status = request
            .as_ref()
            .and_then(|request| request.response.as_ref())
            .map(|response| response.status);
        check_status(url, status)?;

        let body: String = self
            .page
            .evaluate(BODY_TEXT)
            .await
            .map_err(transport)?
            .into_value()
            .map_err(|e| FetchError::InvalidJson {
                url: url.to_string(),
                origin: e.to_string(),
            })?;
        parse_body(url, &body)
    }
}

impl TileSource for BrowserTileFetcher {
    async fn fetch(&self, tile: TileCoordinate) -> Result<Value, FetchError> {
        let url = tile_url(&self.base_url, tile);
        debug!("Navigating to tile {}", url);

        match tokio::time::timeout(self.timeout, self.load(&url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout { url }),
        }
    }
}

/// Navigation status must be exactly 200
fn check_status(url: &str, status: Option<i64>) -> Result<(), FetchError> {
    match status {
        Some(200) => Ok(()),
        Some(status) => Err(FetchError::Status {
            url: url.to_string(),
            status: u16::try_from(status).unwrap_or(0),
        }),
        None => Err(FetchError::Transport {
            url: url.to_string(),
            origin: "navigation produced no response".to_string(),
        }),
    }
}

fn parse_body(url: &str, body: &str) -> Result<Value, FetchError> {
    serde_json::from_str(body).map_err(|e| FetchError::InvalidJson {
        url: url.to_string(),
        origin: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const URL: &str = "http://127.0.0.1/getData/get_data_json_4/z:5/X:0/Y:0/station:0";

    #[test]
    fn test_check_status() {
        assert!(check_status(URL, Some(200)).is_ok());
        assert_eq!(check_status(URL, Some(403)).unwrap_err().status(), Some(403));
        assert_eq!(check_status(URL, Some(204)).unwrap_err().status(), Some(204));

        let missing = check_status(URL, None).unwrap_err();
        assert_eq!(missing.status(), None);
        assert_eq!(missing.status_label(), "no response");
    }

    #[test]
    fn test_parse_body() {
        let payload = parse_body(URL, r#"{"data":{"rows":[]}}"#).unwrap();
        assert_eq!(payload, json!({ "data": { "rows": [] } }));

        let challenge = parse_body(URL, "Checking your browser...").unwrap_err();
        assert!(matches!(challenge, FetchError::InvalidJson { .. }));
        assert_eq!(challenge.status(), Some(200));
    }
}
