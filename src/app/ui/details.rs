use eframe::egui::{self, Align2, Color32, FontId, RichText, Sense, Stroke, Ui, pos2, vec2};
use storymap::interaction::barplot::BarPlotUpdater;
use storymap::util::truncate_label;

use super::super::{Tab, ViewModel};

const BAR_PLOT_HEIGHT: f32 = 180.0;
const BAR_LABEL_SPACE: f32 = 18.0;

fn draw_bar_plot(ui: &mut Ui, barplot: &mut BarPlotUpdater, now: f64) {
    let width = ui.available_width().max(60.0);
    let (rect, _) = ui.allocate_exact_size(vec2(width, BAR_PLOT_HEIGHT), Sense::hover());
    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 4.0, Color32::from_rgb(28, 32, 38));

    barplot.resize(vec2(width, BAR_PLOT_HEIGHT - BAR_LABEL_SPACE), now);
    barplot.prune(now);

    let origin = rect.min;
    for bar in barplot.bars() {
        let geometry = bar.geometry(now);
        let bar_rect = geometry.rect(origin);
        painter.rect_filled(bar_rect, 0.0, bar.color.with_opacity(geometry.opacity));
        if bar.selected {
            painter.rect_stroke(
                bar_rect,
                0.0,
                Stroke::new(1.5, Color32::WHITE),
                egui::StrokeKind::Outside,
            );
        }

        if !bar.is_exiting() && geometry.width > 12.0 {
            painter.text(
                pos2(bar_rect.center().x, rect.bottom() - BAR_LABEL_SPACE / 2.0),
                Align2::CENTER_CENTER,
                truncate_label(&bar.label, (geometry.width / 6.0) as usize),
                FontId::proportional(10.0),
                Color32::from_gray(200),
            );
            painter.text(
                pos2(bar_rect.center().x, bar_rect.top() - 2.0),
                Align2::CENTER_BOTTOM,
                format!("{:.0}", bar.value),
                FontId::proportional(10.0),
                Color32::from_gray(220),
            );
        }
    }

    if barplot.is_animating(now) {
        ui.ctx().request_repaint();
    }
}

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui, now: f64) {
        match self.tab {
            Tab::Map => self.draw_map_details(ui, now),
            Tab::Network => self.draw_network_details(ui, now),
            Tab::Packing => self.draw_packing_details(ui),
            Tab::Stats => self.draw_stats_details(ui),
            Tab::Sankey => self.draw_sankey_details(ui, now),
            Tab::Violin => self.draw_violin_details(ui),
        }
    }

    fn draw_map_details(&mut self, ui: &mut Ui, now: f64) {
        ui.heading("Zone Details");
        ui.add_space(6.0);

        let Some(title) = self.map.focused_zone_title() else {
            ui.label("Click a zone to zoom in and see its jobs.");
            return;
        };

        ui.label(RichText::new(title).strong());
        if let Some(population) = self.map.focused_population() {
            ui.label(format!("Population: {population:.0}"));
        }
        ui.separator();

        if self.map.barplot.is_empty() {
            ui.label("No jobs recorded for this zone.");
        }
        draw_bar_plot(ui, &mut self.map.barplot, now);
    }

    fn draw_network_details(&mut self, ui: &mut Ui, now: f64) {
        ui.heading("Node Details");
        ui.add_space(6.0);

        let Some(pane) = self.network.selected_pane() else {
            ui.label("No network loaded.");
            return;
        };

        ui.label(format!("Layout temperature: {:.3}", pane.simulation.alpha()));
        let hovered = pane
            .controller
            .hovered()
            .and_then(|id| pane.graph.node(id))
            .map(|node| {
                let neighbors = pane
                    .controller
                    .adjacency()
                    .index_of(&node.id)
                    .map_or(0, |index| pane.controller.adjacency().neighbors(index).len());
                (node.label.clone(), node.kind.clone(), node.raw_size, neighbors)
            });

        ui.separator();
        match hovered {
            Some((label, kind, size, neighbors)) => {
                ui.label(RichText::new(label).strong());
                ui.label(format!("Kind: {kind}"));
                ui.label(format!("Size: {size:.0}"));
                ui.label(format!("Neighbors: {neighbors}"));
            }
            None => {
                ui.label("Hover a node to emphasise its neighbors.");
            }
        }

        ui.separator();
        ui.label(RichText::new("Neighbors by kind").strong());
        if let Some(pane) = self.network.selected_pane_mut() {
            draw_bar_plot(ui, &mut pane.barplot, now);
        }
    }

    fn draw_packing_details(&mut self, ui: &mut Ui) {
        ui.heading("About");
        ui.add_space(6.0);
        if let Some(name) = self.packing.focused_name() {
            ui.label(RichText::new(name).strong());
        }
        ui.label(self.packing.description());
    }

    fn draw_stats_details(&mut self, ui: &mut Ui) {
        ui.heading("About");
        ui.add_space(6.0);
        ui.label(
            "Observed statistic against the distribution obtained by permuting the labels. \
             Empty bins are not drawn.",
        );
        ui.separator();
        ui.label(format!("Source: {}", self.stats.file_name()));
        if let Some(error) = self.stats.last_error() {
            ui.colored_label(Color32::from_rgb(220, 90, 80), error);
        }
    }

    fn draw_sankey_details(&mut self, ui: &mut Ui, now: f64) {
        ui.heading("Flow Details");
        ui.add_space(6.0);

        match self.sankey.hovered_text() {
            Some(text) => {
                ui.label(RichText::new(text).strong());
            }
            None => {
                ui.label("Hover a node or a band.");
            }
        }
        ui.separator();
        draw_bar_plot(ui, &mut self.sankey.barplot, now);
    }

    fn draw_violin_details(&mut self, ui: &mut Ui) {
        ui.heading("Groups");
        ui.add_space(6.0);

        for (group, count) in self.violin.group_sizes() {
            ui.horizontal(|ui| {
                ui.label(group);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(format!("n = {count}"));
                });
            });
        }
        if let Some(error) = self.violin.last_error() {
            ui.separator();
            ui.colored_label(Color32::from_rgb(220, 90, 80), error);
        }
    }
}
