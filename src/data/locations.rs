use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde_json::Value;

use super::load::read_json;

/// A named point drawn over the map.
#[derive(Clone, Debug, PartialEq)]
pub struct Location {
    pub name: String,
    pub lon_lat: [f64; 2],
}

pub fn load_locations(path: &Path) -> Result<Vec<Location>> {
    let value = read_json(path)?;
    parse_locations(&value).with_context(|| format!("failed to parse locations from {}", path.display()))
}

/// Parses `{name: [lon, lat]}`; locations come back sorted by name.
pub fn parse_locations(value: &Value) -> Result<Vec<Location>> {
    let object = value
        .as_object()
        .ok_or_else(|| anyhow!("locations document is not an object"))?;

    object
        .iter()
        .map(|(name, point)| {
            let pair = point
                .as_array()
                .filter(|pair| pair.len() >= 2)
                .ok_or_else(|| anyhow!("location {name} is not a [lon, lat] pair"))?;
            let lon = pair[0].as_f64().ok_or_else(|| anyhow!("location {name} has a non-numeric longitude"))?;
            let lat = pair[1].as_f64().ok_or_else(|| anyhow!("location {name} has a non-numeric latitude"))?;
            Ok(Location {
                name: name.clone(),
                lon_lat: [lon, lat],
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_named_pairs() {
        let locations = parse_locations(&json!({"Cathédrale": [6.6355, 46.5225]})).unwrap();
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].name, "Cathédrale");
        assert_eq!(locations[0].lon_lat, [6.6355, 46.5225]);
    }

    #[test]
    fn rejects_short_pairs() {
        let error = parse_locations(&json!({"Ouchy": [6.62]})).unwrap_err();
        assert!(error.to_string().contains("Ouchy"));
    }
}
