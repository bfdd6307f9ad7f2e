use std::collections::HashMap;

use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Sense, Stroke, Ui, Vec2, pos2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use storymap::config::StoryConfig;
use storymap::data::Dataset;
use storymap::data::geojson::ZoneCollection;
use storymap::data::locations::Location;
use storymap::interaction::SelectionContext;
use storymap::interaction::barplot::BarPlotUpdater;
use storymap::interaction::category::CategoryColoring;
use storymap::interaction::zone::{ZoneChange, ZoneInteractionController, ZoneSeed};
use storymap::layout::projection::Mercator;
use storymap::layout::{GeometryQuery, LayoutAdapter};
use tracing::debug;

use super::render_utils::{fill_polygon, outline_polygon, point_in_polygon, to_base, to_screen, triangulate};

const MARKER_RADIUS: f32 = 5.0;

struct ZoneMesh {
    id: String,
    outlines: Vec<Vec<Pos2>>,
    markers: Vec<Pos2>,
}

pub(super) struct MapView {
    zones: Dataset<ZoneCollection>,
    locations: Vec<Location>,
    coloring: CategoryColoring,
    center: [f64; 2],
    scale: f64,
    adapter: LayoutAdapter,
    meshes: Vec<ZoneMesh>,
    triangles: HashMap<String, Vec<Vec<[u32; 3]>>>,
    controller: Option<ZoneInteractionController>,
    pub(super) barplot: BarPlotUpdater,
    pub(super) category: Option<String>,
    pub(super) proportion: bool,
    pub(super) show_locations: bool,
    pub(super) search: String,
    viewport: Vec2,
    hovered_zone: Option<String>,
}

impl MapView {
    pub(super) fn new(
        zones: Dataset<ZoneCollection>,
        locations: Dataset<Vec<Location>>,
        config: &StoryConfig,
    ) -> Self {
        let coloring = config.category_coloring();
        let triangles = zones
            .ready()
            .map(|collection| triangulate_zones(config.map.center, config.map.scale, collection))
            .unwrap_or_default();
        let controller = zones.ready().map(|collection| {
            let seeds = collection
                .zones
                .iter()
                .map(|zone| ZoneSeed {
                    id: zone.id.clone(),
                    display_name: zone.title(),
                    fill: coloring.default_color(),
                })
                .collect();
            ZoneInteractionController::new(config.map_interaction(), Vec2::ZERO, seeds)
        });

        Self {
            zones,
            locations: match locations {
                Dataset::Ready(locations) => locations,
                Dataset::Unavailable(_) => Vec::new(),
            },
            barplot: BarPlotUpdater::new(config.barplot(), Vec2::new(300.0, 160.0), coloring.palette()),
            coloring,
            center: config.map.center,
            scale: config.map.scale,
            adapter: LayoutAdapter::default(),
            meshes: Vec::new(),
            triangles,
            controller,
            category: None,
            proportion: false,
            show_locations: true,
            search: String::new(),
            viewport: Vec2::ZERO,
            hovered_zone: None,
        }
    }

    pub(super) fn unavailable_reason(&self) -> Option<&str> {
        match &self.zones {
            Dataset::Ready(_) => None,
            Dataset::Unavailable(reason) => Some(reason.as_str()),
        }
    }

    pub(super) fn coloring(&self) -> &CategoryColoring {
        &self.coloring
    }

    pub(super) fn zone_count(&self) -> usize {
        self.zones.ready().map_or(0, ZoneCollection::len)
    }

    pub(super) fn focused(&self) -> Option<&str> {
        self.controller.as_ref()?.focused()
    }

    pub(super) fn focused_zone_title(&self) -> Option<String> {
        let id = self.focused()?;
        self.zones.ready()?.get(id).map(|zone| zone.title())
    }

    pub(super) fn focused_population(&self) -> Option<f64> {
        let id = self.focused()?;
        self.zones.ready()?.get(id)?.population
    }

    pub(super) fn search_matches(&self, limit: usize) -> Vec<(String, String)> {
        let query = self.search.trim();
        let Some(collection) = self.zones.ready() else {
            return Vec::new();
        };
        if query.is_empty() {
            return Vec::new();
        }

        let matcher = SkimMatcherV2::default();
        let mut scored = collection
            .zones
            .iter()
            .filter_map(|zone| {
                let title = zone.name.clone().unwrap_or_else(|| zone.title());
                let score = matcher
                    .fuzzy_match(&title, query)
                    .or_else(|| matcher.fuzzy_match(&title.to_lowercase(), &query.to_lowercase()))?;
                Some((score, zone.id.clone(), title))
            })
            .collect::<Vec<_>>();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.2.cmp(&b.2)));
        scored
            .into_iter()
            .take(limit)
            .map(|(_, id, title)| (id, title))
            .collect()
    }

    pub(super) fn set_category(&mut self, category: Option<String>, proportion: bool, now: f64) {
        if self.category == category && self.proportion == proportion {
            return;
        }
        self.category = category;
        self.proportion = proportion;
        debug!(category = ?self.category, proportion, "recoloring map");

        if let (Some(collection), Some(controller)) = (self.zones.ready(), self.controller.as_mut()) {
            for zone in &collection.zones {
                let color = self
                    .coloring
                    .zone_color(zone, self.category.as_deref(), self.proportion);
                controller.recolor(&zone.id, color, now);
            }
        }

        if let Some(selection) = self.focused_selection() {
            self.barplot
                .update(&selection.values, selection.selected.as_deref(), now);
        }
    }

    pub(super) fn focus_zone(&mut self, zone_id: &str, now: f64) {
        let Some(controller) = self.controller.as_mut() else {
            return;
        };
        let change = controller.on_click(zone_id, &self.adapter, now);
        self.apply_change(change, now);
    }

    fn focused_selection(&self) -> Option<SelectionContext> {
        let id = self.focused()?;
        let zone = self.zones.ready()?.get(id)?;
        let values = zone
            .categories
            .iter()
            .map(|(category, value)| (category.clone(), *value))
            .collect();
        Some(SelectionContext::new(values, self.category.clone()))
    }

    fn apply_change(&mut self, change: Option<ZoneChange>, now: f64) {
        match change {
            Some(ZoneChange::Focused(_)) => {
                if let Some(selection) = self.focused_selection() {
                    self.barplot
                        .update(&selection.values, selection.selected.as_deref(), now);
                }
            }
            Some(ZoneChange::Released(_)) => self.barplot.clear(now),
            None => {}
        }
    }

    fn ensure_viewport(&mut self, size: Vec2) {
        if self.viewport == size {
            return;
        }
        self.viewport = size;

        let projection = Mercator::new(
            self.center,
            self.scale,
            [size.x as f64 / 2.0, size.y as f64 / 2.0],
        );
        let Some(collection) = self.zones.ready() else {
            return;
        };
        self.adapter = LayoutAdapter::for_map(projection, &collection.zones);
        self.meshes = collection
            .zones
            .iter()
            .filter_map(|zone| {
                let shape = self.adapter.zone_shape(&zone.id)?;
                Some(ZoneMesh {
                    id: zone.id.clone(),
                    outlines: shape.outlines.clone(),
                    markers: shape.markers.clone(),
                })
            })
            .collect();

        if let Some(controller) = self.controller.as_mut() {
            controller.resize(size, &self.adapter);
        }
    }

    fn zone_at(&self, base: Pos2, marker_radius: f32) -> Option<&str> {
        self.meshes
            .iter()
            .find(|mesh| {
                mesh.outlines
                    .iter()
                    .any(|outline| point_in_polygon(base, outline))
                    || mesh
                        .markers
                        .iter()
                        .any(|&marker| marker.distance(base) <= marker_radius)
            })
            .map(|mesh| mesh.id.as_str())
    }

    pub(super) fn draw(&mut self, ui: &mut Ui, now: f64) {
        if let Some(reason) = self.unavailable_reason() {
            ui.vertical_centered(|ui| {
                ui.add_space(80.0);
                ui.heading("Map data unavailable");
                ui.label(reason);
            });
            return;
        }

        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, Color32::from_rgb(24, 28, 34));

        self.ensure_viewport(rect.size());
        if let Some(controller) = self.controller.as_mut() {
            let change = controller.tick(&self.adapter, now);
            self.apply_change(change, now);
        }

        self.handle_pointer(ui, rect, &response, now);

        let Some(controller) = self.controller.as_ref() else {
            return;
        };
        let transform = controller.transform(now);

        for mesh in &self.meshes {
            let fill = controller
                .fill(&mesh.id, now)
                .unwrap_or(self.coloring.default_color())
                .to_color32();
            let highlighted = controller.is_highlighted(&mesh.id);
            let stroke = if highlighted {
                Stroke::new(2.0, Color32::WHITE)
            } else {
                Stroke::new(0.6, Color32::from_gray(40))
            };

            let triangles = self.triangles.get(&mesh.id);
            for (index, outline) in mesh.outlines.iter().enumerate() {
                let points = outline
                    .iter()
                    .map(|&point| to_screen(rect, transform, point))
                    .collect::<Vec<_>>();
                if let Some(triangles) = triangles.and_then(|rings| rings.get(index)) {
                    fill_polygon(&painter, &points, triangles, fill);
                }
                outline_polygon(&painter, points, stroke);
            }
            for &marker in &mesh.markers {
                let screen = to_screen(rect, transform, marker);
                painter.circle(screen, MARKER_RADIUS, fill, stroke);
            }
        }

        if self.show_locations {
            for location in &self.locations {
                let data_point = pos2(location.lon_lat[0] as f32, location.lon_lat[1] as f32);
                let Some(base) = self.adapter.project(data_point) else {
                    continue;
                };
                let screen = to_screen(rect, transform, base);
                if !rect.contains(screen) {
                    continue;
                }
                painter.circle_filled(screen, 3.5, Color32::from_rgb(250, 220, 90));
                painter.text(
                    screen + Vec2::new(6.0, 0.0),
                    Align2::LEFT_CENTER,
                    &location.name,
                    FontId::proportional(11.0),
                    Color32::from_rgb(250, 240, 200),
                );
            }
        }

        if let Some(label) = controller.label() {
            let screen = to_screen(rect, transform, label.position);
            let galley_rect = painter.text(
                screen,
                Align2::CENTER_CENTER,
                &label.text,
                FontId::proportional(15.0),
                Color32::WHITE,
            );
            painter.rect_stroke(
                galley_rect.expand(4.0),
                3.0,
                Stroke::new(1.0, Color32::from_white_alpha(90)),
                egui::StrokeKind::Outside,
            );
        }

        if controller.is_animating(now) || self.barplot.is_animating(now) {
            ui.ctx().request_repaint();
        }
    }

    fn handle_pointer(&mut self, ui: &Ui, rect: Rect, response: &egui::Response, now: f64) {
        let Some(transform) = self.controller.as_ref().map(|controller| controller.transform(now)) else {
            return;
        };
        let pointer = response.hover_pos();
        let marker_radius = MARKER_RADIUS / transform.k.max(f32::EPSILON);
        let hit = pointer
            .and_then(|pointer| self.zone_at(to_base(rect, transform, pointer), marker_radius))
            .map(str::to_owned);
        let Some(controller) = self.controller.as_mut() else {
            return;
        };

        if hit != self.hovered_zone {
            if let Some(previous) = self.hovered_zone.take() {
                controller.on_unhover(&previous, now);
            }
            if let Some(current) = &hit {
                controller.on_hover(current, &self.adapter, now);
            }
            self.hovered_zone = hit.clone();
        }

        if response.clicked() {
            let change = match &hit {
                Some(zone_id) => controller.on_click(zone_id, &self.adapter, now),
                None => controller.release(now),
            };
            self.apply_change(change, now);
            return;
        }

        if response.double_clicked() {
            controller.reset_view();
        }

        if response.hovered() {
            let scroll = ui.input(|input| input.raw_scroll_delta.y);
            if scroll.abs() > f32::EPSILON
                && let Some(pointer) = pointer
            {
                let factor = (1.0 + scroll * 0.0018).clamp(0.85, 1.15);
                controller.pointer_zoom(factor, Pos2::ZERO + (pointer - rect.min), now);
            }
        }

        if response.dragged_by(egui::PointerButton::Primary)
            || response.dragged_by(egui::PointerButton::Secondary)
        {
            controller.pointer_pan(response.drag_delta(), now);
        }
    }
}

// Ear clipping indices stay valid under the viewport-dependent translate, so
// rings are triangulated once per dataset.
fn triangulate_zones(
    center: [f64; 2],
    scale: f64,
    collection: &ZoneCollection,
) -> HashMap<String, Vec<Vec<[u32; 3]>>> {
    let adapter = LayoutAdapter::for_map(Mercator::new(center, scale, [0.0, 0.0]), &collection.zones);
    collection
        .zones
        .iter()
        .filter_map(|zone| {
            let shape = adapter.zone_shape(&zone.id)?;
            let rings = shape.outlines.iter().map(|ring| triangulate(ring)).collect();
            Some((zone.id.clone(), rings))
        })
        .collect()
}
