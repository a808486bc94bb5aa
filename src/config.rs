//! Application configuration

use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_with::serde_as;

use crate::errors::RiasViewerError;
use crate::models::GridBounds;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub grid: GridConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

/// Tile grid scraped on every refresh
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct GridConfig {
    pub x_min: i64,
    pub x_max: i64,
    pub y_min: i64,
    pub y_max: i64,
    pub zoom: u8,
}

/// How tiles are requested from the tracking service
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FetchBackend {
    /// Plain HTTP client with a browser user agent
    #[default]
    Http,
    /// Headless Chromium session, requires the `browser` feature
    Browser,
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct FetcherConfig {
    #[serde(default)]
    pub backend: FetchBackend,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    #[serde(default = "default_timeout")]
    pub timeout: Duration,
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    #[serde(default = "default_ttl")]
    pub ttl: Duration,
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct RefreshConfig {
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    #[serde(default = "default_interval")]
    pub interval: Duration,
    /// Show the last good dataset when a refresh comes back empty
    #[serde(default)]
    pub keep_last_good: bool,
    #[serde(default)]
    pub dedup_by_ship_id: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportConfig {
    #[serde(default = "default_csv_path")]
    pub csv_path: PathBuf,
    #[serde(default)]
    pub geojson_path: Option<PathBuf>,
}

fn default_base_url() -> String {
    "https://www.marinetraffic.com".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_ttl() -> Duration {
    Duration::from_secs(300)
}

fn default_interval() -> Duration {
    Duration::from_secs(300)
}

fn default_csv_path() -> PathBuf {
    PathBuf::from("barcos_marine_traffic.csv")
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            backend: FetchBackend::default(),
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout: default_timeout(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl: default_ttl() }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            keep_last_good: false,
            dedup_by_ship_id: false,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
            geojson_path: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(
                Environment::with_prefix("RIASVIEWER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), RiasViewerError> {
        let bounds = self.grid.bounds()?;
        if !bounds.fits_zoom(self.grid.zoom) {
            return Err(RiasViewerError::ConfigurationError {
                message: format!(
                    "Grid x [{}, {}], y [{}, {}] is outside the tiles of zoom {}",
                    self.grid.x_min,
                    self.grid.x_max,
                    self.grid.y_min,
                    self.grid.y_max,
                    self.grid.zoom
                ),
            });
        }
        self.fetcher.validate()?;
        if self.cache.ttl.is_zero() {
            return Err(RiasViewerError::ConfigurationError {
                message: "Cache TTL must be greater than zero".to_string(),
            });
        }
        if self.refresh.interval.is_zero() {
            return Err(RiasViewerError::ConfigurationError {
                message: "Refresh interval must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl GridConfig {
    /// Checked grid rectangle
    pub fn bounds(&self) -> Result<GridBounds, RiasViewerError> {
        GridBounds::new(self.x_min, self.x_max, self.y_min, self.y_max)
    }
}

impl FetcherConfig {
    fn validate(&self) -> Result<(), RiasViewerError> {
        if self.base_url.trim().is_empty() {
            return Err(RiasViewerError::ConfigurationError {
                message: "Fetcher base URL cannot be empty".to_string(),
            });
        }
        if self.timeout.is_zero() {
            return Err(RiasViewerError::ConfigurationError {
                message: "Fetcher timeout must be greater than zero".to_string(),
            });
        }
        if self.backend == FetchBackend::Browser && !cfg!(feature = "browser") {
            return Err(RiasViewerError::ConfigurationError {
                message: "Browser backend requires the `browser` feature".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;
    use std::env;

    fn config() -> AppConfig {
        AppConfig {
            grid: GridConfig {
                x_min: 1946,
                x_max: 1950,
                y_min: 1516,
                y_max: 1518,
                zoom: 13,
            },
            fetcher: FetcherConfig::default(),
            cache: CacheConfig::default(),
            refresh: RefreshConfig::default(),
            export: ExportConfig::default(),
        }
    }

    #[test]
    fn test_load_config() {
        env::set_var("RIASVIEWER__GRID__X_MIN", "10");
        env::set_var("RIASVIEWER__GRID__X_MAX", "12");
        env::set_var("RIASVIEWER__GRID__Y_MIN", "20");
        env::set_var("RIASVIEWER__GRID__Y_MAX", "21");
        env::set_var("RIASVIEWER__GRID__ZOOM", "9");
        env::set_var("RIASVIEWER__CACHE__TTL", "60");
        env::set_var("RIASVIEWER__REFRESH__KEEP_LAST_GOOD", "true");

        let config = AppConfig::load().unwrap();
        assert_eq!(
            config.grid,
            GridConfig {
                x_min: 10,
                x_max: 12,
                y_min: 20,
                y_max: 21,
                zoom: 9,
            }
        );
        assert_eq!(config.cache.ttl, Duration::from_secs(60));
        assert!(config.refresh.keep_last_good);
        assert_eq!(config.fetcher.user_agent, "Mozilla/5.0");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = config();
        assert_eq!(config.cache.ttl, Duration::from_secs(300));
        assert_eq!(config.refresh.interval, Duration::from_secs(300));
        assert!(!config.refresh.keep_last_good);
        assert_eq!(
            config.export.csv_path,
            PathBuf::from("barcos_marine_traffic.csv")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fetch_backend_from_file() {
        let source = r#"
            [grid]
            x_min = 0
            x_max = 1
            y_min = 0
            y_max = 1
            zoom = 5

            [fetcher]
            backend = "browser"
            timeout = 10
        "#;
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.fetcher.backend, FetchBackend::Browser);
        assert_eq!(config.fetcher.timeout, Duration::from_secs(10));
        assert_eq!(config.validate().is_ok(), cfg!(feature = "browser"));
        assert_eq!(FetcherConfig::default().backend, FetchBackend::Http);
    }

    #[test]
    fn test_validate_inverted_bounds() {
        let mut config = config();
        config.grid.y_min = 1519;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_grid_outside_zoom() {
        let mut zoomed_out = config();
        zoomed_out.grid.zoom = 10;
        assert!(zoomed_out.validate().is_err());

        let mut negative = config();
        negative.grid.x_min = -1;
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_validate_overflowing_grid() {
        let mut config = config();
        config.grid.x_min = i64::MIN;
        config.grid.x_max = i64::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_ttl() {
        let mut config = config();
        config.cache.ttl = Duration::from_secs(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_base_url() {
        let mut config = config();
        config.fetcher.base_url = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
