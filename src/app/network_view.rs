use std::collections::HashMap;

use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Sense, Stroke, Ui, Vec2, pos2};
use storymap::config::StoryConfig;
use storymap::data::Dataset;
use storymap::data::network::{NetworkGraph, NetworkScaling};
use storymap::interaction::barplot::BarPlotUpdater;
use storymap::interaction::color::Color;
use storymap::interaction::network::{NetworkHighlightConfig, NetworkHighlightController};
use storymap::interaction::transition::ZoomTransform;
use storymap::layout::simulation::{ForceParams, ForceSimulation};
use storymap::layout::{GeometryQuery, LayoutAdapter};
use tracing::info;

use super::render_utils::{circle_visible, draw_background, edge_visible, to_base, to_screen};

pub(super) struct NetworkPane {
    pub(super) graph: NetworkGraph,
    pub(super) controller: NetworkHighlightController,
    pub(super) simulation: ForceSimulation,
    adapter: LayoutAdapter,
    view: ZoomTransform,
    zoom_extent: (f32, f32),
    viewport: Vec2,
    hovered_node: Option<String>,
    panning: bool,
    draw_order: Vec<usize>,
    pub(super) barplot: BarPlotUpdater,
}

impl NetworkPane {
    fn new(graph: NetworkGraph, config: &StoryConfig) -> Self {
        let simulation = ForceSimulation::new(
            config.force_params(),
            graph.node_sizes(),
            &graph.link_pairs(),
            Pos2::ZERO,
        );
        let adapter = LayoutAdapter::for_network(
            graph.nodes.iter().map(|node| node.id.clone()),
            simulation.reader(),
        );
        let palette = kind_palette(&graph, config);
        let mut draw_order = (0..graph.nodes.len()).collect::<Vec<_>>();
        draw_order.sort_by(|a, b| graph.nodes[*a].size.total_cmp(&graph.nodes[*b].size));
        info!(
            network = %graph.name,
            nodes = graph.nodes.len(),
            links = graph.links.len(),
            "network ready"
        );

        Self {
            controller: NetworkHighlightController::new(config.network_highlight(), &graph),
            simulation,
            adapter,
            view: ZoomTransform::IDENTITY,
            zoom_extent: (config.network.scale_extent[0], config.network.scale_extent[1]),
            viewport: Vec2::ZERO,
            hovered_node: None,
            panning: false,
            draw_order,
            barplot: BarPlotUpdater::new(config.barplot(), Vec2::new(300.0, 160.0), palette),
            graph,
        }
    }

    pub(super) fn rescale(&mut self, scaling: NetworkScaling, now: f64) {
        self.graph.rescale(scaling);
        self.controller.set_static_sizes(&self.graph, now);
        self.simulation.set_radii(self.graph.node_sizes());
    }

    pub(super) fn set_force_params(&mut self, params: ForceParams) {
        self.simulation.set_params(params);
    }

    pub(super) fn set_highlight_config(&mut self, config: NetworkHighlightConfig, now: f64) {
        self.controller.set_config(config, now);
    }

    fn ensure_viewport(&mut self, size: Vec2) {
        if self.viewport == size {
            return;
        }
        self.viewport = size;
        self.simulation.set_center(pos2(size.x / 2.0, size.y / 2.0));
        self.simulation.reheat();
    }

    fn node_at(&self, base: Pos2, now: f64) -> Option<usize> {
        (0..self.graph.nodes.len())
            .filter_map(|index| {
                let position = self.adapter.current_node_position(&self.graph.nodes[index].id)?;
                let radius = self.controller.node_visual(index, now)?.radius;
                let distance = position.distance(base);
                (distance <= radius).then_some((index, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }

    fn set_hovered(&mut self, hovered: Option<String>, now: f64) {
        if hovered == self.hovered_node || self.controller.is_dragging() {
            return;
        }

        if let Some(previous) = self.hovered_node.take()
            && self.controller.on_unhover(&previous, now)
        {
            self.barplot.clear(now);
        }

        if let Some(current) = &hovered
            && let Some(selection) = self.controller.on_hover(current, now)
        {
            self.barplot
                .update(&selection.values, selection.selected.as_deref(), now);
        }
        self.hovered_node = hovered;
    }

    fn handle_pointer(&mut self, ui: &Ui, rect: Rect, response: &egui::Response, now: f64) {
        let pointer = response.hover_pos().or_else(|| response.interact_pointer_pos());
        let base = pointer.map(|pointer| to_base(rect, self.view, pointer));
        let hit = base.and_then(|base| self.node_at(base, now));

        if !self.controller.is_dragging() {
            let hovered = hit.map(|index| self.graph.nodes[index].id.clone());
            self.set_hovered(hovered, now);
        }

        if response.drag_started_by(egui::PointerButton::Primary) {
            match (hit, base) {
                (Some(index), Some(base)) => {
                    let id = self.graph.nodes[index].id.clone();
                    self.controller.drag_start(&id, base, &mut self.simulation);
                }
                _ => self.panning = true,
            }
        }

        if self.controller.is_dragging() {
            if let Some(base) = base {
                self.controller.drag_move(base, &mut self.simulation);
            }
            if response.drag_stopped() {
                self.controller.drag_end(&mut self.simulation);
            }
        } else if self.panning || response.dragged_by(egui::PointerButton::Secondary) {
            self.view = self.view.translated(response.drag_delta());
            if response.drag_stopped() {
                self.panning = false;
            }
        }

        if response.hovered() {
            let scroll = ui.input(|input| input.raw_scroll_delta.y);
            if scroll.abs() > f32::EPSILON
                && let Some(pointer) = pointer
            {
                let factor = (1.0 + scroll * 0.0018).clamp(0.85, 1.15);
                self.view = self.view.scaled_around(
                    factor,
                    Pos2::ZERO + (pointer - rect.min),
                    self.zoom_extent,
                );
            }
        }

        if response.double_clicked() {
            self.view = ZoomTransform::IDENTITY;
        }
    }

    fn draw(&mut self, ui: &mut Ui, now: f64, colors: &NetworkColors) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        draw_background(&painter, rect, self.view);

        self.ensure_viewport(rect.size());
        if self.simulation.is_running() {
            self.simulation.tick();
        }
        self.handle_pointer(ui, rect, &response, now);

        let snapshot = self.simulation.reader().snapshot();
        let screen = snapshot
            .positions
            .iter()
            .map(|&position| to_screen(rect, self.view, position))
            .collect::<Vec<_>>();

        for (index, link) in self.graph.links.iter().enumerate() {
            let (Some(&start), Some(&end)) = (screen.get(link.source), screen.get(link.target)) else {
                continue;
            };
            let width = link.weight * self.view.k.sqrt();
            if !edge_visible(rect, start, end, width) {
                continue;
            }
            let opacity = self.controller.link_opacity(index, now).unwrap_or(1.0);
            painter.line_segment([start, end], Stroke::new(width, colors.link.with_opacity(opacity)));
        }

        for &index in &self.draw_order {
            let (Some(&center), Some(visual)) =
                (screen.get(index), self.controller.node_visual(index, now))
            else {
                continue;
            };
            let node = &self.graph.nodes[index];
            let radius = visual.radius * self.view.k;
            if !circle_visible(rect, center, radius) {
                continue;
            }

            let fill = colors.node(&node.kind);
            painter.circle(
                center,
                radius,
                fill.with_opacity(visual.fill_opacity),
                Stroke::new(1.0, Color32::from_black_alpha((visual.fill_opacity * 160.0) as u8)),
            );

            let font_size = (visual.label_size * self.view.k.sqrt()).max(1.0);
            painter.text(
                center + Vec2::new(radius + 2.0, 0.0),
                Align2::LEFT_CENTER,
                &node.label,
                FontId::proportional(font_size),
                Color::WHITE.with_opacity(visual.label_opacity),
            );
        }

        if self.simulation.is_running()
            || self.controller.is_animating(now)
            || self.barplot.is_animating(now)
            || response.dragged()
        {
            ui.ctx().request_repaint();
        }
    }
}

fn kind_palette(graph: &NetworkGraph, config: &StoryConfig) -> HashMap<String, Color> {
    let colors = NetworkColors::from_config(config);
    graph
        .kinds()
        .into_iter()
        .map(|kind| (kind.to_owned(), colors.node(kind)))
        .collect()
}

pub(super) struct NetworkColors {
    primary_kind: String,
    primary: Color,
    secondary: Color,
    link: Color,
}

impl NetworkColors {
    fn from_config(config: &StoryConfig) -> Self {
        Self {
            primary_kind: config.network.primary_kind.clone(),
            primary: config.network.primary_color,
            secondary: config.network.secondary_color,
            link: config.network.link_color,
        }
    }

    fn node(&self, kind: &str) -> Color {
        if kind == self.primary_kind {
            self.primary
        } else {
            self.secondary
        }
    }
}

pub(super) struct NetworkView {
    panes: Vec<(String, Dataset<NetworkPane>)>,
    colors: NetworkColors,
    pub(super) selected: usize,
    pub(super) scaling: NetworkScaling,
    pub(super) forces: ForceParams,
    pub(super) highlight: NetworkHighlightConfig,
}

impl NetworkView {
    pub(super) fn new(networks: Vec<(String, Dataset<NetworkGraph>)>, config: &StoryConfig) -> Self {
        let panes = networks
            .into_iter()
            .map(|(name, dataset)| (name, dataset.map(|graph| NetworkPane::new(graph, config))))
            .collect();

        Self {
            panes,
            colors: NetworkColors::from_config(config),
            selected: 0,
            scaling: config.network_scaling(),
            forces: config.force_params(),
            highlight: config.network_highlight(),
        }
    }

    pub(super) fn names(&self) -> Vec<&str> {
        self.panes.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub(super) fn is_empty(&self) -> bool {
        self.panes.is_empty()
    }

    pub(super) fn selected_name(&self) -> Option<&str> {
        self.panes.get(self.selected).map(|(name, _)| name.as_str())
    }

    pub(super) fn selected_pane(&self) -> Option<&NetworkPane> {
        self.panes.get(self.selected)?.1.ready()
    }

    pub(super) fn selected_pane_mut(&mut self) -> Option<&mut NetworkPane> {
        self.panes.get_mut(self.selected)?.1.ready_mut()
    }

    pub(super) fn primary_kind(&self) -> &str {
        &self.colors.primary_kind
    }

    pub(super) fn apply_settings(&mut self, now: f64) {
        let (scaling, forces, highlight) = (self.scaling, self.forces, self.highlight);
        for pane in self.panes.iter_mut().filter_map(|(_, dataset)| dataset.ready_mut()) {
            pane.rescale(scaling, now);
            pane.set_force_params(forces);
            pane.set_highlight_config(highlight, now);
        }
    }

    pub(super) fn draw(&mut self, ui: &mut Ui, now: f64) {
        if self.panes.is_empty() {
            ui.vertical_centered(|ui| {
                ui.add_space(80.0);
                ui.heading("No network configured");
                ui.label("Pass one or more --network files.");
            });
            return;
        }

        if let Some((_, Dataset::Unavailable(reason))) = self.panes.get(self.selected) {
            let reason = reason.clone();
            ui.vertical_centered(|ui| {
                ui.add_space(80.0);
                ui.heading("Network data unavailable");
                ui.label(reason);
            });
            return;
        }

        let Self {
            panes,
            colors,
            selected,
            ..
        } = self;
        if let Some(pane) = panes
            .get_mut(*selected)
            .and_then(|(_, dataset)| dataset.ready_mut())
        {
            pane.draw(ui, now, colors);
        }
    }
}
