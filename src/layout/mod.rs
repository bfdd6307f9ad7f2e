mod forces;
pub mod packing;
pub mod projection;
mod quadtree;
pub mod sankey;
pub mod simulation;

use std::collections::HashMap;

use eframe::egui::{Pos2, Rect};

use crate::data::geojson::ZoneRecord;
use packing::PackedHierarchy;
use projection::Mercator;
use simulation::PositionReader;

/// Geometry the interaction controllers may ask about. Points handed to
/// `project` are data coordinates (lon/lat on the map); everything returned
/// is in base screen space, before the zoom transform.
pub trait GeometryQuery {
    fn project(&self, data_point: Pos2) -> Option<Pos2>;
    fn invert_project(&self, screen_point: Pos2) -> Option<Pos2>;
    fn current_node_position(&self, node_id: &str) -> Option<Pos2>;
    fn zone_bounding_box(&self, zone_id: &str) -> Option<Rect>;
}

/// Projected outline of one map zone.
#[derive(Clone, Debug)]
pub struct ZoneShape {
    /// Each polygon's exterior ring, projected.
    pub outlines: Vec<Vec<Pos2>>,
    pub markers: Vec<Pos2>,
    pub bounds: Rect,
}

/// Answers geometry queries for one widget: the map projection, a force
/// layout's latest positions, or a circle packing.
#[derive(Default)]
pub struct LayoutAdapter {
    projection: Option<Mercator>,
    zones: HashMap<String, ZoneShape>,
    node_index: HashMap<String, usize>,
    positions: Option<PositionReader>,
}

impl LayoutAdapter {
    pub fn for_map(projection: Mercator, zones: &[ZoneRecord]) -> Self {
        let mut adapter = Self {
            projection: Some(projection),
            ..Self::default()
        };
        adapter.reproject(projection, zones);
        adapter
    }

    pub fn for_network(node_ids: impl IntoIterator<Item = String>, reader: PositionReader) -> Self {
        Self {
            node_index: node_ids
                .into_iter()
                .enumerate()
                .map(|(index, id)| (id, index))
                .collect(),
            positions: Some(reader),
            ..Self::default()
        }
    }

    pub fn for_packing(packed: &PackedHierarchy) -> Self {
        let zones = packed
            .circles
            .iter()
            .map(|circle| {
                (
                    circle.id.clone(),
                    ZoneShape {
                        outlines: Vec::new(),
                        markers: Vec::new(),
                        bounds: circle.bounds(),
                    },
                )
            })
            .collect();
        Self {
            zones,
            ..Self::default()
        }
    }

    /// Rebuilds projected zone shapes, e.g. after the viewport moved the
    /// projection's translate.
    pub fn reproject(&mut self, projection: Mercator, zones: &[ZoneRecord]) {
        self.projection = Some(projection);
        self.zones = zones
            .iter()
            .filter_map(|zone| {
                let shape = project_zone(&projection, zone)?;
                Some((zone.id.clone(), shape))
            })
            .collect();
    }

    pub fn projection(&self) -> Option<&Mercator> {
        self.projection.as_ref()
    }

    pub fn zone_shape(&self, zone_id: &str) -> Option<&ZoneShape> {
        self.zones.get(zone_id)
    }

    pub fn node_index(&self, node_id: &str) -> Option<usize> {
        self.node_index.get(node_id).copied()
    }
}

fn project_zone(projection: &Mercator, zone: &ZoneRecord) -> Option<ZoneShape> {
    let outlines = zone
        .polygons
        .iter()
        .filter_map(|polygon| polygon.first())
        .map(|ring| {
            ring.iter()
                .filter_map(|&point| projection.project(point))
                .map(|[x, y]| Pos2::new(x as f32, y as f32))
                .collect::<Vec<_>>()
        })
        .filter(|outline| outline.len() >= 3)
        .collect::<Vec<_>>();
    let markers = zone
        .markers
        .iter()
        .filter_map(|&point| projection.project(point))
        .map(|[x, y]| Pos2::new(x as f32, y as f32))
        .collect::<Vec<_>>();

    let mut points = outlines.iter().flatten().chain(&markers).copied();
    let first = points.next()?;
    let bounds = points.fold(Rect::from_min_max(first, first), |bounds, point| {
        bounds.union(Rect::from_min_max(point, point))
    });

    Some(ZoneShape {
        outlines,
        markers,
        bounds,
    })
}

impl GeometryQuery for LayoutAdapter {
    fn project(&self, data_point: Pos2) -> Option<Pos2> {
        match &self.projection {
            Some(projection) => projection.project_pos(data_point),
            None => Some(data_point),
        }
    }

    fn invert_project(&self, screen_point: Pos2) -> Option<Pos2> {
        match &self.projection {
            Some(projection) => projection.invert_pos(screen_point),
            None => Some(screen_point),
        }
    }

    fn current_node_position(&self, node_id: &str) -> Option<Pos2> {
        let index = self.node_index(node_id)?;
        self.positions.as_ref()?.position(index)
    }

    fn zone_bounding_box(&self, zone_id: &str) -> Option<Rect> {
        self.zones.get(zone_id).map(|shape| shape.bounds)
    }
}
