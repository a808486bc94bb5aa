#![cfg(feature = "browser")]

mod common;

use std::time::Duration;

use rias_viewer::{
    aggregate::aggregate, browser::BrowserTileFetcher, config::FetcherConfig, models::GridBounds,
};

use common::{serve, tile_path, Routes};

#[tokio::test]
#[ignore = "requires a local Chromium install"]
async fn test_browser_scrape_with_failing_tile() {
    let routes = Routes::from([
        (
            tile_path(5, 0, 0),
            (
                200,
                r#"{"data":[{"LAT":"10.0","LON":"20.0","SPEED":"50"}]}"#.to_string(),
            ),
        ),
        (tile_path(5, 0, 1), (500, "Internal Server Error".to_string())),
    ]);
    let (addr, requests) = serve(routes).await;

    let fetcher = BrowserTileFetcher::launch(&FetcherConfig {
        base_url: format!("http://{}", addr),
        timeout: Duration::from_secs(10),
        ..FetcherConfig::default()
    })
    .await
    .unwrap();

    let grid = GridBounds::new(0, 0, 0, 1).unwrap();
    let dataset = aggregate(&fetcher, grid, 5, |_| {}).await;
    fetcher.close().await.unwrap();

    assert_eq!(dataset.len(), 1);
    assert_eq!(dataset.records()[0].speed, 5.0);
    assert!(requests
        .lock()
        .unwrap()
        .iter()
        .any(|r| r.to_lowercase().contains("user-agent: mozilla/5.0")));
}
