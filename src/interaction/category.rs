use std::collections::HashMap;

use serde::Deserialize;

use super::color::{Color, LinearColorScale};
use crate::data::geojson::ZoneRecord;

/// One selectable category of the choropleth and its color ramp domain.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CategorySpec {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    pub min: f64,
    pub max: f64,
    pub color: Color,
}

impl CategorySpec {
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

/// Colors zones by the selected category, either by raw count or as a
/// share of the zone's population.
#[derive(Clone, Debug)]
pub struct CategoryColoring {
    default_color: Color,
    categories: Vec<CategorySpec>,
}

impl CategoryColoring {
    pub fn new(default_color: Color, categories: Vec<CategorySpec>) -> Self {
        Self {
            default_color,
            categories,
        }
    }

    pub fn default_color(&self) -> Color {
        self.default_color
    }

    pub fn categories(&self) -> &[CategorySpec] {
        &self.categories
    }

    pub fn spec(&self, category: &str) -> Option<&CategorySpec> {
        self.categories.iter().find(|spec| spec.id == category)
    }

    pub fn palette(&self) -> HashMap<String, Color> {
        self.categories
            .iter()
            .map(|spec| (spec.id.clone(), spec.color))
            .collect()
    }

    /// White to the category color over its domain, or `[0, 1]` for proportions.
    pub fn scale(&self, category: &str, proportion: bool) -> Option<LinearColorScale> {
        let spec = self.spec(category)?;
        let domain = if proportion {
            (0.0, 1.0)
        } else {
            (spec.min, spec.max)
        };
        Some(LinearColorScale::new(domain, (Color::WHITE, spec.color)))
    }

    /// A zone without the selected category counts as zero.
    pub fn zone_color(&self, zone: &ZoneRecord, category: Option<&str>, proportion: bool) -> Color {
        let Some(category) = category else {
            return self.default_color;
        };
        let Some(scale) = self.scale(category, proportion) else {
            return self.default_color;
        };

        let count = zone.category_value(category).unwrap_or(0.0);
        let value = if proportion {
            match zone.population {
                Some(population) if population > 0.0 => count / population,
                _ => 0.0,
            }
        } else {
            count
        };

        scale.color(if value.is_finite() { value } else { 0.0 })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn coloring() -> CategoryColoring {
        CategoryColoring::new(
            Color::GRAY,
            vec![CategorySpec {
                id: "administration".to_owned(),
                label: None,
                min: 1.0,
                max: 17.0,
                color: Color::rgb(0, 0, 255),
            }],
        )
    }

    fn zone(jobs: &[(&str, f64)], population: Option<f64>) -> ZoneRecord {
        ZoneRecord {
            id: "z".to_owned(),
            name: None,
            class: None,
            population,
            categories: jobs.iter().map(|(k, v)| (k.to_string(), *v)).collect::<BTreeMap<_, _>>(),
            polygons: Vec::new(),
            markers: Vec::new(),
        }
    }

    #[test]
    fn no_selection_uses_default_color() {
        let coloring = coloring();
        assert_eq!(coloring.zone_color(&zone(&[("administration", 9.0)], None), None, false), Color::GRAY);
        assert_eq!(
            coloring.zone_color(&zone(&[("administration", 9.0)], None), Some("no_job"), false),
            Color::GRAY
        );
    }

    #[test]
    fn counts_map_through_category_ramp() {
        let coloring = coloring();
        let color = coloring.zone_color(&zone(&[("administration", 9.0)], None), Some("administration"), false);
        assert_eq!(color, Color::rgb(128, 128, 255));
        assert_eq!(coloring.spec("administration").unwrap().display_label(), "administration");
    }

    #[test]
    fn missing_category_colors_at_zero() {
        let coloring = coloring();
        let scale = coloring.scale("administration", false).unwrap();
        let color = coloring.zone_color(&zone(&[], Some(10.0)), Some("administration"), false);
        assert_eq!(color, scale.color(0.0));
    }

    #[test]
    fn proportion_divides_by_population() {
        let coloring = coloring();
        let color = coloring.zone_color(&zone(&[("administration", 5.0)], Some(10.0)), Some("administration"), true);
        assert_eq!(color, Color::rgb(128, 128, 255));

        let unpopulated = coloring.zone_color(&zone(&[("administration", 5.0)], None), Some("administration"), true);
        assert_eq!(unpopulated, Color::WHITE);
    }
}
