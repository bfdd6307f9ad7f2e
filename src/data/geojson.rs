use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::load::read_text;
use super::value_to_string;
use crate::util::zone_title;

/// A closed ring of `[lon, lat]` pairs.
pub type Ring = Vec<[f64; 2]>;
/// Exterior ring first, then holes.
pub type Polygon = Vec<Ring>;

#[derive(Clone, Debug, PartialEq)]
pub struct ZoneRecord {
    pub id: String,
    pub name: Option<String>,
    pub class: Option<String>,
    pub population: Option<f64>,
    /// Per-category counts (the `jobs` property).
    pub categories: BTreeMap<String, f64>,
    pub polygons: Vec<Polygon>,
    /// `Point` and `MultiPoint` positions.
    pub markers: Vec<[f64; 2]>,
}

impl ZoneRecord {
    pub fn title(&self) -> String {
        zone_title(self.name.as_deref(), self.class.as_deref())
    }

    pub fn category_value(&self, category: &str) -> Option<f64> {
        self.categories.get(category).copied()
    }

    pub fn points(&self) -> impl Iterator<Item = [f64; 2]> + '_ {
        self.polygons
            .iter()
            .flatten()
            .flatten()
            .chain(&self.markers)
            .copied()
    }
}

#[derive(Clone, Debug, Default)]
pub struct ZoneCollection {
    pub zones: Vec<ZoneRecord>,
}

impl ZoneCollection {
    pub fn get(&self, id: &str) -> Option<&ZoneRecord> {
        self.zones.iter().find(|zone| zone.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }
}

pub fn load_zones(path: &Path) -> Result<ZoneCollection> {
    let raw = read_text(path)?;
    parse_zones(&raw).with_context(|| format!("failed to parse zones from {}", path.display()))
}

pub fn parse_zones(raw: &str) -> Result<ZoneCollection> {
    let parsed: Value = serde_json::from_str(raw).context("invalid GeoJSON")?;
    let object = parsed
        .as_object()
        .ok_or_else(|| anyhow!("GeoJSON root is not an object"))?;

    match object.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => {}
        Some(other) => return Err(anyhow!("expected a FeatureCollection, found {other}")),
        None => return Err(anyhow!("GeoJSON root has no type")),
    }

    let features = object
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("FeatureCollection has no features array"))?;

    let mut zones = Vec::with_capacity(features.len());
    for (index, feature) in features.iter().enumerate() {
        match parse_feature(index, feature) {
            Some(zone) => zones.push(zone),
            None => warn!(feature = index, "skipping feature without usable geometry"),
        }
    }

    debug!(zones = zones.len(), "parsed zones");
    Ok(ZoneCollection { zones })
}

fn parse_feature(index: usize, feature: &Value) -> Option<ZoneRecord> {
    let empty = Map::new();
    let properties = feature
        .get("properties")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let (polygons, markers) = feature.get("geometry").map(parse_geometry)?;
    if polygons.is_empty() && markers.is_empty() {
        return None;
    }

    let id = properties
        .get("id")
        .and_then(value_to_string)
        .or_else(|| feature.get("id").and_then(value_to_string))
        .unwrap_or_else(|| format!("zone-{index}"));

    let categories = properties
        .get("jobs")
        .and_then(Value::as_object)
        .map(|jobs| {
            jobs.iter()
                .filter_map(|(key, value)| value.as_f64().map(|count| (key.clone(), count)))
                .collect()
        })
        .unwrap_or_default();

    Some(ZoneRecord {
        id,
        name: properties.get("name").and_then(value_to_string),
        class: properties.get("class").and_then(value_to_string),
        population: properties.get("population").and_then(Value::as_f64),
        categories,
        polygons,
        markers,
    })
}

fn parse_geometry(geometry: &Value) -> (Vec<Polygon>, Vec<[f64; 2]>) {
    let coordinates = geometry.get("coordinates");
    match (geometry.get("type").and_then(Value::as_str), coordinates) {
        (Some("Polygon"), Some(coordinates)) => {
            (parse_polygon(coordinates).into_iter().collect(), Vec::new())
        }
        (Some("MultiPolygon"), Some(Value::Array(polygons))) => {
            (polygons.iter().filter_map(parse_polygon).collect(), Vec::new())
        }
        (Some("Point"), Some(coordinates)) => {
            (Vec::new(), parse_position(coordinates).into_iter().collect())
        }
        (Some("MultiPoint"), Some(Value::Array(points))) => {
            (Vec::new(), points.iter().filter_map(parse_position).collect())
        }
        _ => (Vec::new(), Vec::new()),
    }
}

fn parse_position(value: &Value) -> Option<[f64; 2]> {
    let pair = value.as_array()?;
    Some([pair.first()?.as_f64()?, pair.get(1)?.as_f64()?])
}

fn parse_polygon(value: &Value) -> Option<Polygon> {
    let rings = value
        .as_array()?
        .iter()
        .filter_map(parse_ring)
        .collect::<Vec<_>>();
    (!rings.is_empty()).then_some(rings)
}

fn parse_ring(value: &Value) -> Option<Ring> {
    let ring = value
        .as_array()?
        .iter()
        .filter_map(parse_position)
        .collect::<Vec<_>>();
    (ring.len() >= 3).then_some(ring)
}
