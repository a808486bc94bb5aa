//! Map styling: speed colormap, marker layers and the map view

use std::fmt;

use serde::Serialize;

use crate::{
    derived::{speed_range, MovementState},
    models::{Dataset, VesselRecord},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

const GREEN: Rgb = Rgb(0, 128, 0);
const YELLOW: Rgb = Rgb(255, 255, 0);
const RED: Rgb = Rgb(255, 0, 0);
const ORANGE: Rgb = Rgb(255, 165, 0);
const LIME: Rgb = Rgb(0, 255, 0);

/// Linear green, yellow, red colormap over the observed speed range.
///
/// Rebuilt for every dataset, so the scale follows the current min and max
/// speed rather than a fixed range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedColormap {
    vmin: f64,
    vmax: f64,
}

impl SpeedColormap {
    pub fn new(vmin: f64, vmax: f64) -> Self {
        Self { vmin, vmax }
    }

    /// `None` for an empty dataset
    pub fn from_dataset(dataset: &Dataset) -> Option<Self> {
        speed_range(dataset).map(|(vmin, vmax)| Self::new(vmin, vmax))
    }

    pub fn caption(&self) -> &'static str {
        "Velocidad del barco (knots)"
    }

    pub fn color(&self, speed: f64) -> Rgb {
        let span = self.vmax - self.vmin;
        if span <= 0.0 || !speed.is_finite() {
            return GREEN;
        }

        let t = ((speed - self.vmin) / span).clamp(0.0, 1.0);
        if t <= 0.5 {
            lerp(GREEN, YELLOW, t * 2.0)
        } else {
            lerp(YELLOW, RED, (t - 0.5) * 2.0)
        }
    }
}

fn lerp(from: Rgb, to: Rgb, t: f64) -> Rgb {
    let channel = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    Rgb(
        channel(from.0, to.0),
        channel(from.1, to.1),
        channel(from.2, to.2),
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerStyle {
    pub color: String,
    pub layer: MovementLayer,
}

/// Map layer a marker is drawn on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementLayer {
    Moving,
    Docked,
}

impl From<MovementState> for MovementLayer {
    fn from(state: MovementState) -> Self {
        match state {
            MovementState::Moving => MovementLayer::Moving,
            MovementState::Docked => MovementLayer::Docked,
        }
    }
}

/// Overlay groups of the rendered map.
///
/// Every marker is drawn on the speed layer and in the cluster, plus on the
/// docked or moving layer by its movement state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MapLayer {
    Speed,
    Docked,
    Moving,
    Cluster,
}

impl MapLayer {
    pub const ALL: [MapLayer; 4] = [
        MapLayer::Speed,
        MapLayer::Docked,
        MapLayer::Moving,
        MapLayer::Cluster,
    ];

    /// Label shown in the layer control
    pub fn name(&self) -> &'static str {
        match self {
            MapLayer::Speed => "Barcos (Velocidad)",
            MapLayer::Docked => "Barcos Atracados",
            MapLayer::Moving => "Barcos en Movimiento",
            MapLayer::Cluster => "Cluster de barcos",
        }
    }

    /// Only the cluster is shown until toggled on
    pub fn shown_by_default(&self) -> bool {
        matches!(self, MapLayer::Cluster)
    }
}

impl From<MovementLayer> for MapLayer {
    fn from(layer: MovementLayer) -> Self {
        match layer {
            MovementLayer::Moving => MapLayer::Moving,
            MovementLayer::Docked => MapLayer::Docked,
        }
    }
}

/// Marker size: screen pixels, or meters on the ground
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "unit", content = "value", rename_all = "snake_case")]
pub enum Radius {
    Pixels(u32),
    Meters(u32),
}

/// How a marker is drawn on one layer. Cluster pins have no radius.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerStyle {
    pub color: String,
    pub radius: Option<Radius>,
    pub fill_opacity: f64,
}

pub fn style_for(record: &VesselRecord, colormap: &SpeedColormap) -> MarkerStyle {
    MarkerStyle {
        color: colormap.color(record.speed).to_string(),
        layer: MovementState::of(record).into(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
    pub speed: f64,
    pub popup: String,
    pub style: MarkerStyle,
}

impl Marker {
    /// Layers this marker is drawn on, in drawing order
    pub fn layers(&self) -> [MapLayer; 3] {
        [MapLayer::Speed, self.style.layer.into(), MapLayer::Cluster]
    }

    pub fn on_layer(&self, layer: MapLayer) -> bool {
        self.layers().contains(&layer)
    }

    pub fn layer_style(&self, layer: MapLayer) -> LayerStyle {
        let (color, radius, fill_opacity) = match layer {
            MapLayer::Speed => (self.style.color.clone(), Some(Radius::Pixels(6)), 0.8),
            MapLayer::Docked => (ORANGE.to_string(), Some(Radius::Meters(100)), 0.6),
            MapLayer::Moving => (LIME.to_string(), Some(Radius::Pixels(7)), 0.9),
            MapLayer::Cluster => (GREEN.to_string(), None, 1.0),
        };
        LayerStyle {
            color,
            radius,
            fill_opacity,
        }
    }
}

/// Everything a map renderer needs for one dataset
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    /// Mean latitude and longitude
    pub center: (f64, f64),
    pub colormap: SpeedColormap,
    pub markers: Vec<Marker>,
}

impl MapView {
    /// `None` for an empty dataset, which has no center
    pub fn from_dataset(dataset: &Dataset) -> Option<Self> {
        let colormap = SpeedColormap::from_dataset(dataset)?;
        let n = dataset.len() as f64;
        let lat = dataset.iter().map(|r| r.latitude).sum::<f64>() / n;
        let lon = dataset.iter().map(|r| r.longitude).sum::<f64>() / n;

        let markers = dataset
            .iter()
            .map(|record| Marker {
                latitude: record.latitude,
                longitude: record.longitude,
                name: record.ship_name.clone(),
                speed: record.speed,
                popup: format!("{} - {:.2} knots", record.ship_name, record.speed),
                style: style_for(record, &colormap),
            })
            .collect();

        Some(Self {
            center: (lat, lon),
            colormap,
            markers,
        })
    }

    pub fn layer(&self, layer: MovementLayer) -> impl Iterator<Item = &Marker> {
        self.markers.iter().filter(move |m| m.style.layer == layer)
    }

    /// Markers drawn on `layer` with their style there
    pub fn overlay(&self, layer: MapLayer) -> impl Iterator<Item = (&Marker, LayerStyle)> {
        self.markers
            .iter()
            .filter(move |m| m.on_layer(layer))
            .map(move |m| (m, m.layer_style(layer)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vessel(name: &str, lat: f64, lon: f64, speed: f64) -> VesselRecord {
        VesselRecord {
            ship_id: None,
            ship_name: name.to_string(),
            latitude: lat,
            longitude: lon,
            speed,
            course: None,
            ship_type: None,
            destination: None,
            flag: None,
        }
    }

    #[test]
    fn test_colormap_endpoints_and_midpoint() {
        let colormap = SpeedColormap::new(0.0, 20.0);
        assert_eq!(colormap.color(0.0).to_string(), "#008000");
        assert_eq!(colormap.color(10.0).to_string(), "#ffff00");
        assert_eq!(colormap.color(20.0).to_string(), "#ff0000");
        assert_eq!(colormap.color(5.0), Rgb(128, 192, 0));
    }

    #[test]
    fn test_colormap_clamps_and_handles_flat_range() {
        let colormap = SpeedColormap::new(2.0, 4.0);
        assert_eq!(colormap.color(-1.0), GREEN);
        assert_eq!(colormap.color(99.0), RED);
        assert_eq!(SpeedColormap::new(3.0, 3.0).color(3.0), GREEN);
    }

    #[test]
    fn test_colormap_follows_dataset_range() {
        let dataset: Dataset = vec![vessel("A", 0.0, 0.0, 10.0), vessel("B", 0.0, 0.0, 14.0)]
            .into_iter()
            .collect();
        let colormap = SpeedColormap::from_dataset(&dataset).unwrap();
        assert_eq!(colormap, SpeedColormap::new(10.0, 14.0));
        assert_eq!(colormap.color(14.0), RED);
        assert!(SpeedColormap::from_dataset(&Dataset::default()).is_none());
    }

    #[test]
    fn test_style_assigns_layer_by_threshold() {
        let colormap = SpeedColormap::new(0.0, 10.0);
        assert_eq!(
            style_for(&vessel("A", 0.0, 0.0, 4.99), &colormap).layer,
            MovementLayer::Docked
        );
        assert_eq!(
            style_for(&vessel("B", 0.0, 0.0, 5.0), &colormap).layer,
            MovementLayer::Moving
        );
    }

    #[test]
    fn test_map_view_centers_on_mean_position() {
        let dataset: Dataset = vec![
            vessel("ALFA", 42.0, -8.0, 0.0),
            vessel("BRAVO", 43.0, -9.0, 12.5),
        ]
        .into_iter()
        .collect();
        let view = MapView::from_dataset(&dataset).unwrap();

        assert_eq!(view.center, (42.5, -8.5));
        assert_eq!(view.markers.len(), 2);
        assert_eq!(view.markers[1].popup, "BRAVO - 12.50 knots");
        assert_eq!(view.layer(MovementLayer::Docked).count(), 1);
        assert_eq!(view.layer(MovementLayer::Moving).count(), 1);
        assert!(MapView::from_dataset(&Dataset::default()).is_none());
    }

    #[test]
    fn test_overlays_follow_movement_state() {
        let dataset: Dataset = vec![
            vessel("ALFA", 42.0, -8.0, 0.0),
            vessel("BRAVO", 43.0, -9.0, 12.5),
            vessel("CHARLIE", 43.0, -9.0, 20.0),
        ]
        .into_iter()
        .collect();
        let view = MapView::from_dataset(&dataset).unwrap();

        assert_eq!(view.overlay(MapLayer::Speed).count(), 3);
        assert_eq!(view.overlay(MapLayer::Cluster).count(), 3);
        assert_eq!(view.overlay(MapLayer::Moving).count(), 2);

        let docked: Vec<_> = view.overlay(MapLayer::Docked).collect();
        assert_eq!(docked.len(), 1);
        assert_eq!(docked[0].0.name, "ALFA");
        assert_eq!(
            docked[0].1,
            LayerStyle {
                color: "#ffa500".to_string(),
                radius: Some(Radius::Meters(100)),
                fill_opacity: 0.6,
            }
        );
    }

    #[test]
    fn test_layer_styles_per_overlay() {
        let dataset: Dataset = vec![vessel("A", 0.0, 0.0, 0.0), vessel("B", 0.0, 0.0, 10.0)]
            .into_iter()
            .collect();
        let view = MapView::from_dataset(&dataset).unwrap();
        let moving = &view.markers[1];

        assert_eq!(
            moving.layers(),
            [MapLayer::Speed, MapLayer::Moving, MapLayer::Cluster]
        );
        assert_eq!(moving.layer_style(MapLayer::Speed).color, "#ff0000");
        assert_eq!(moving.layer_style(MapLayer::Speed).radius, Some(Radius::Pixels(6)));
        assert_eq!(moving.layer_style(MapLayer::Moving).color, "#00ff00");
        assert_eq!(moving.layer_style(MapLayer::Moving).radius, Some(Radius::Pixels(7)));
        assert_eq!(moving.layer_style(MapLayer::Cluster).radius, None);

        let shown: Vec<_> = MapLayer::ALL
            .iter()
            .filter(|l| l.shown_by_default())
            .map(|l| l.name())
            .collect();
        assert_eq!(shown, vec!["Cluster de barcos"]);
    }
}
