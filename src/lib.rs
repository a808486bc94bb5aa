//! Vessel position viewer: scrapes tracking-service tiles into a vessel table

pub mod aggregate;
#[cfg(feature = "browser")]
pub mod browser;
pub mod cache;
pub mod config;
pub mod derived;
pub mod errors;
pub mod export;
pub mod fetcher;
pub mod flatten;
pub mod map;
pub mod models;
pub mod pipeline;
pub mod state;
