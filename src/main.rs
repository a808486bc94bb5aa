//! Vessel viewer launcher

use chrono::Utc;
#[cfg(feature = "browser")]
use rias_viewer::browser::BrowserTileFetcher;
use rias_viewer::{
    config::{AppConfig, FetchBackend},
    derived::{
        alerts, filter_by_state, histogram, summary, AlertKind, MovementFilter,
        HISTOGRAM_MAX_BINS,
    },
    errors::RiasViewerError,
    export,
    fetcher::{HttpTileFetcher, TileSource},
    map::MapView,
    models::Dataset,
    pipeline::Pipeline,
    state::{PipelineState, RefreshOutcome},
};
use tokio::{signal, time::MissedTickBehavior};
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<(), RiasViewerError> {
    #[cfg(feature = "dotenvy")]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = AppConfig::load()?;
    config.validate()?;

    match config.fetcher.backend {
        FetchBackend::Http => {
            let fetcher = HttpTileFetcher::new(&config.fetcher)?;
            run(fetcher, &config).await?;
        }
        #[cfg(feature = "browser")]
        FetchBackend::Browser => {
            let fetcher = BrowserTileFetcher::launch(&config.fetcher).await?;
            let pipeline = run(fetcher, &config).await?;
            pipeline.into_source().close().await?;
        }
        #[cfg(not(feature = "browser"))]
        FetchBackend::Browser => {
            return Err(RiasViewerError::ConfigurationError {
                message: "Browser backend requires the `browser` feature".to_string(),
            });
        }
    }

    Ok(())
}

/// Refresh until Ctrl-C, then hand the pipeline back for cleanup
async fn run<S: TileSource>(
    source: S,
    config: &AppConfig,
) -> Result<Pipeline<S>, RiasViewerError> {
    let pipeline = Pipeline::new(
        source,
        config.grid.bounds()?,
        config.grid.zoom,
        config.cache.ttl,
    )
    .dedup_by_ship_id(config.refresh.dedup_by_ship_id);
    let state = PipelineState::new(config.refresh.keep_last_good);

    info!(
        "Scraping {} tiles at zoom {} every {:?} ({:?} backend)",
        pipeline.grid().tile_count(),
        config.grid.zoom,
        config.refresh.interval,
        config.fetcher.backend
    );

    let shutdown_signal = signal::ctrl_c();

    tokio::select! {
        _ = run_viewer(&pipeline, state, config) => {
            info!("Viewer stopped");
        }
        _ = shutdown_signal => {
            info!("Received shutdown signal");
        }
    }

    Ok(pipeline)
}

async fn run_viewer<S: TileSource>(
    pipeline: &Pipeline<S>,
    mut state: PipelineState,
    config: &AppConfig,
) {
    let mut ticker = tokio::time::interval(config.refresh.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let dataset = pipeline
            .load(|progress| info!("{}", progress.label()))
            .await;
        let outcome = state.apply(dataset, Utc::now());

        if let Err(e) = present(&outcome, config) {
            error!("Presentation error: {}", e);
        }
        info!("{}", state.last_run_label());
    }
}

fn present(outcome: &RefreshOutcome, config: &AppConfig) -> Result<(), RiasViewerError> {
    let dataset = match outcome {
        RefreshOutcome::Fresh(dataset) => dataset,
        RefreshOutcome::Stale { dataset, since } => {
            warn!("No valid data this cycle, showing data from {}", since);
            dataset
        }
        RefreshOutcome::Empty { .. } => {
            warn!("No existen datos válidos.");
            return Ok(());
        }
    };

    report(dataset);

    export::write_csv_file(dataset, &config.export.csv_path)?;
    if let Some(path) = &config.export.geojson_path {
        if let Some(view) = MapView::from_dataset(dataset) {
            export::write_geojson_file(&view, path)?;
        }
    }
    Ok(())
}

fn report(dataset: &Dataset) {
    let stats = summary(dataset);
    info!("{}", stats.banner());
    info!(
        "Vessels: {}, mean speed: {:.2} knots, slow (<5 knots): {}",
        stats.count, stats.mean_speed, stats.slow_count
    );
    info!(
        "Moving: {}, docked: {}",
        filter_by_state(dataset, MovementFilter::Moving).len(),
        filter_by_state(dataset, MovementFilter::Docked).len()
    );

    for alert in alerts(dataset) {
        match alert {
            AlertKind::HighSpeed => warn!("{}", alert.message()),
            AlertKind::Stopped => info!("{}", alert.message()),
        }
    }

    for bin in histogram(dataset, HISTOGRAM_MAX_BINS) {
        debug!("{:>6.1}-{:<6.1} knots: {}", bin.start, bin.end, bin.count);
    }
}
