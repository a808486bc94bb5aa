//! Derived state: movement filters, speed statistics and alerts

use std::collections::BTreeSet;
use std::fmt;

use crate::models::{Dataset, VesselRecord};

/// Speed in knots below which a vessel counts as docked
pub const DOCKED_SPEED_THRESHOLD: f64 = 5.0;

/// Speed in knots above which a vessel raises a high-speed alert
pub const HIGH_SPEED_THRESHOLD: f64 = 30.0;

/// Default bin limit for the speed histogram
pub const HISTOGRAM_MAX_BINS: usize = 30;

/// Movement classification by the docked speed threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovementState {
    Moving,
    Docked,
}

impl MovementState {
    pub fn of(record: &VesselRecord) -> Self {
        if record.speed < DOCKED_SPEED_THRESHOLD {
            MovementState::Docked
        } else {
            MovementState::Moving
        }
    }
}

impl fmt::Display for MovementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MovementState::Moving => write!(f, "moving"),
            MovementState::Docked => write!(f, "docked"),
        }
    }
}

/// Which vessels to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MovementFilter {
    #[default]
    All,
    Moving,
    Docked,
}

impl MovementFilter {
    pub fn matches(&self, record: &VesselRecord) -> bool {
        match self {
            MovementFilter::All => true,
            MovementFilter::Moving => MovementState::of(record) == MovementState::Moving,
            MovementFilter::Docked => MovementState::of(record) == MovementState::Docked,
        }
    }
}

pub fn filter_by_state(dataset: &Dataset, filter: MovementFilter) -> Dataset {
    dataset
        .iter()
        .filter(|r| filter.matches(r))
        .cloned()
        .collect()
}

/// Headline statistics of a dataset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    /// Mean speed in knots, NaN for an empty dataset
    pub mean_speed: f64,
    /// Vessels below the docked threshold
    pub slow_count: usize,
}

impl Summary {
    pub fn banner(&self) -> String {
        format!("{} barcos encontrados.", self.count)
    }
}

pub fn summary(dataset: &Dataset) -> Summary {
    let count = dataset.len();
    let total: f64 = dataset.speeds().sum();
    let mean_speed = if count == 0 {
        f64::NAN
    } else {
        total / count as f64
    };
    let slow_count = dataset
        .speeds()
        .filter(|s| *s < DOCKED_SPEED_THRESHOLD)
        .count();

    Summary {
        count,
        mean_speed,
        slow_count,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AlertKind {
    /// Some vessel goes faster than the high-speed threshold
    HighSpeed,
    /// Some vessel reports exactly zero speed
    Stopped,
}

impl AlertKind {
    pub fn message(&self) -> &'static str {
        match self {
            AlertKind::HighSpeed => "Hay barcos con velocidad mayor a 30 knots.",
            AlertKind::Stopped => "Algunos barcos están completamente detenidos.",
        }
    }
}

pub fn alerts(dataset: &Dataset) -> BTreeSet<AlertKind> {
    let mut alerts = BTreeSet::new();
    if dataset.speeds().any(|s| s > HIGH_SPEED_THRESHOLD) {
        alerts.insert(AlertKind::HighSpeed);
    }
    if dataset.speeds().any(|s| s == 0.0) {
        alerts.insert(AlertKind::Stopped);
    }
    alerts
}

/// One bar of the speed histogram, covering `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Equal-width speed histogram.
///
/// The bin width is a round step (1, 2 or 5 times a power of ten) chosen
/// so that at most `max_bins` bins cover the observed range. The maximum
/// speed falls in the last bin.
pub fn histogram(dataset: &Dataset, max_bins: usize) -> Vec<HistogramBin> {
    let max_bins = max_bins.max(1);
    let Some((min, max)) = speed_range(dataset) else {
        return Vec::new();
    };

    let (start, step, bins) = bin_layout(min, max, max_bins);
    let mut counts = vec![0usize; bins];
    for speed in dataset.speeds() {
        let index = (((speed - start) / step).floor() as usize).min(bins - 1);
        counts[index] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            start: start + i as f64 * step,
            end: start + (i + 1) as f64 * step,
            count,
        })
        .collect()
}

/// Lowest and highest speed, `None` for an empty dataset
pub fn speed_range(dataset: &Dataset) -> Option<(f64, f64)> {
    dataset.speeds().fold(None, |range, speed| match range {
        None => Some((speed, speed)),
        Some((min, max)) => Some((min.min(speed), max.max(speed))),
    })
}

fn bin_layout(min: f64, max: f64, max_bins: usize) -> (f64, f64, usize) {
    let span = max - min;
    if span <= 0.0 {
        return (min.floor(), 1.0, 1);
    }

    let raw = span / max_bins as f64;
    let mut magnitude = 10f64.powf(raw.log10().floor());
    loop {
        for multiplier in [1.0, 2.0, 5.0] {
            let step = magnitude * multiplier;
            let start = (min / step).floor() * step;
            let bins = (((max - start) / step).ceil() as usize).max(1);
            if bins <= max_bins {
                return (start, step, bins);
            }
        }
        magnitude *= 10.0;
    }
}
