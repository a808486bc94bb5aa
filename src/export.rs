//! Table export: CSV with display labels, GeoJSON for map layers

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::{errors::RiasViewerError, map::MapView, models::Dataset};

/// Display labels of the exported columns, in order
pub const DISPLAY_HEADERS: [&str; 6] = [
    "Nombre del barco",
    "Velocidad (knots)",
    "Dirección (°)",
    "Tipo de barco",
    "Destino",
    "Bandera",
];

#[derive(Debug, Serialize)]
struct DisplayRow<'a> {
    ship_name: &'a str,
    speed: f64,
    course: Option<f64>,
    ship_type: Option<&'a str>,
    destination: Option<&'a str>,
    flag: Option<&'a str>,
}

/// Write the display columns of `dataset` as UTF-8 CSV with a header row.
pub fn write_csv<W: Write>(dataset: &Dataset, writer: W) -> Result<(), RiasViewerError> {
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv.write_record(DISPLAY_HEADERS)?;
    for record in dataset.iter() {
        csv.serialize(DisplayRow {
            ship_name: &record.ship_name,
            speed: record.speed,
            course: record.course,
            ship_type: record.ship_type.as_deref(),
            destination: record.destination.as_deref(),
            flag: record.flag.as_deref(),
        })?;
    }
    csv.flush()?;
    Ok(())
}

pub fn to_csv_bytes(dataset: &Dataset) -> Result<Vec<u8>, RiasViewerError> {
    let mut buffer = Vec::new();
    write_csv(dataset, &mut buffer)?;
    Ok(buffer)
}

pub fn write_csv_file(dataset: &Dataset, path: &Path) -> Result<(), RiasViewerError> {
    let file = File::create(path)?;
    write_csv(dataset, BufWriter::new(file))?;
    info!("Wrote {} vessels to {}", dataset.len(), path.display());
    Ok(())
}

/// Markers as a GeoJSON `FeatureCollection` of points
pub fn to_geojson(view: &MapView) -> Value {
    let features: Vec<Value> = view
        .markers
        .iter()
        .map(|marker| {
            json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": [marker.longitude, marker.latitude],
                },
                "properties": {
                    "name": marker.name,
                    "speed": marker.speed,
                    "popup": marker.popup,
                    "color": marker.style.color,
                    "layer": marker.style.layer,
                    "layers": marker.layers(),
                },
            })
        })
        .collect();

    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

pub fn write_geojson_file(view: &MapView, path: &Path) -> Result<(), RiasViewerError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &to_geojson(view))?;
    writer.flush()?;
    info!("Wrote {} markers to {}", view.markers.len(), path.display());
    Ok(())
}
