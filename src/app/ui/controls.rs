use std::ops::RangeInclusive;

use eframe::egui::{self, Color32, Key, Response, Sense, Ui, vec2};
use storymap::data::stats::Series;

use super::super::{Tab, ViewModel};

const ARROW_BASE_RATE: f32 = 10.0;
const ARROW_RAMP_PER_SEC: f32 = 9.0;
const ARROW_MAX_MULTIPLIER: f32 = 40.0;
const SEARCH_RESULTS: usize = 12;

#[derive(Clone, Copy, Default)]
struct ArrowHold([f32; 2]);

fn arrow_multiplier(held: f32) -> f32 {
    let ramp = held * ARROW_RAMP_PER_SEC;
    (1.0 + ramp + 0.15 * ramp * ramp).min(ARROW_MAX_MULTIPLIER)
}

fn accelerate_with_arrows(ui: &Ui, response: &Response, value: &mut f32, min: f32, max: f32) -> bool {
    let id = response.id.with("arrow_hold");
    if !response.has_focus() {
        ui.ctx().data_mut(|data| data.remove::<ArrowHold>(id));
        return false;
    }

    let (dt, up, down) = ui.input(|input| {
        (
            input.stable_dt.min(0.1),
            input.key_down(Key::ArrowRight) || input.key_down(Key::ArrowUp),
            input.key_down(Key::ArrowLeft) || input.key_down(Key::ArrowDown),
        )
    });
    let mut hold = ui.ctx().data(|data| data.get_temp::<ArrowHold>(id)).unwrap_or_default();
    for (held, pressed) in hold.0.iter_mut().zip([up, down]) {
        *held = if pressed { *held + dt } else { 0.0 };
    }
    ui.ctx().data_mut(|data| data.insert_temp(id, hold));

    let (sign, held) = match (up, down) {
        (true, false) => (1.0, hold.0[0]),
        (false, true) => (-1.0, hold.0[1]),
        _ => return false,
    };

    let step = ((max - min) / 200.0).max(0.0005);
    let previous = *value;
    *value = (*value + sign * step * ARROW_BASE_RATE * arrow_multiplier(held) * dt).clamp(min, max);
    ui.ctx().request_repaint();
    (*value - previous).abs() > f32::EPSILON
}

fn tuned_slider(
    ui: &mut Ui,
    value: &mut f32,
    range: RangeInclusive<f32>,
    text: &str,
    hover: &str,
) -> bool {
    let (min, max) = (*range.start(), *range.end());
    let slider = ui
        .add(
            egui::Slider::new(&mut *value, range)
                .text(text)
                .clamping(egui::SliderClamping::Always),
        )
        .on_hover_text(hover);
    if slider.hovered() {
        slider.request_focus();
    }
    let mut changed = slider.changed();
    changed |= accelerate_with_arrows(ui, &slider, value, min, max);
    changed
}

fn swatch(ui: &mut Ui, color: Color32) {
    let (rect, _) = ui.allocate_exact_size(vec2(14.0, 14.0), Sense::hover());
    ui.painter().rect_filled(rect, 2.0, color);
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui, now: f64) {
        match self.tab {
            Tab::Map => self.draw_map_controls(ui, now),
            Tab::Network => self.draw_network_controls(ui, now),
            Tab::Packing => self.draw_packing_controls(ui),
            Tab::Stats => self.draw_stats_controls(ui, now),
            Tab::Sankey => self.draw_sankey_controls(ui),
            Tab::Violin => self.draw_violin_controls(ui),
        }
    }

    fn draw_map_controls(&mut self, ui: &mut Ui, now: f64) {
        ui.heading("Map");
        ui.separator();

        if let Some(reason) = self.map.unavailable_reason() {
            ui.label(format!("Map data unavailable: {reason}"));
            return;
        }

        ui.label("Find a zone")
            .on_hover_text("Fuzzy search over zone names; click a result to zoom to it.");
        ui.text_edit_singleline(&mut self.map.search);
        let matches = self.map.search_matches(SEARCH_RESULTS);
        let mut focus_request = None;
        for (id, title) in &matches {
            let selected = self.map.focused() == Some(id.as_str());
            if ui.selectable_label(selected, title).clicked() {
                focus_request = Some(id.clone());
            }
        }
        if let Some(id) = focus_request {
            self.map.focus_zone(&id, now);
        }

        ui.separator();

        let mut category = self.map.category.clone();
        let mut proportion = self.map.proportion;
        let selected_text = category
            .as_deref()
            .and_then(|id| self.map.coloring().spec(id))
            .map_or("None", |spec| spec.display_label())
            .to_owned();
        egui::ComboBox::from_label("Category")
            .selected_text(selected_text)
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut category, None, "None");
                for spec in self.map.coloring().categories() {
                    ui.selectable_value(&mut category, Some(spec.id.clone()), spec.display_label());
                }
            });
        ui.checkbox(&mut proportion, "Share of population")
            .on_hover_text("Divide the category count by the zone population.");
        self.map.set_category(category, proportion, now);

        if let Some(scale) = self
            .map
            .category
            .as_deref()
            .and_then(|id| self.map.coloring().scale(id, self.map.proportion))
        {
            ui.horizontal(|ui| {
                ui.label(format!("{:.2}", scale.domain.0));
                for step in 0..=8 {
                    let t = step as f64 / 8.0;
                    let value = scale.domain.0 + (scale.domain.1 - scale.domain.0) * t;
                    swatch(ui, scale.color(value).to_color32());
                }
                ui.label(format!("{:.2}", scale.domain.1));
            });
        }

        ui.separator();
        ui.checkbox(&mut self.map.show_locations, "Show locations");
    }

    fn draw_network_controls(&mut self, ui: &mut Ui, now: f64) {
        ui.heading("Networks");
        ui.separator();

        if self.network.is_empty() {
            ui.label("No network configured.");
            return;
        }

        let names = self
            .network
            .names()
            .into_iter()
            .map(str::to_owned)
            .collect::<Vec<_>>();
        let selected_text = self.network.selected_name().unwrap_or_default().to_owned();
        egui::ComboBox::from_label("Network")
            .selected_text(selected_text)
            .show_ui(ui, |ui| {
                for (index, name) in names.iter().enumerate() {
                    ui.selectable_value(&mut self.network.selected, index, name);
                }
            });

        ui.separator();
        let mut changed = false;

        ui.collapsing("Sizes", |ui| {
            let scaling = &mut self.network.scaling;
            let mut node_exponent = scaling.node_exponent as f32;
            let mut link_exponent = scaling.link_exponent as f32;
            let mut min_node = scaling.min_node_size as f32;
            let mut max_node = scaling.max_node_size as f32;

            changed |= tuned_slider(
                ui,
                &mut node_exponent,
                0.1..=1.5,
                "Node size exponent",
                "Exponent applied to raw node sizes before rescaling.",
            );
            changed |= tuned_slider(
                ui,
                &mut link_exponent,
                0.1..=1.5,
                "Link weight exponent",
                "Exponent applied to raw link weights before rescaling.",
            );
            changed |= tuned_slider(
                ui,
                &mut min_node,
                1.0..=20.0,
                "Min node radius",
                "Radius of the smallest node.",
            );
            changed |= tuned_slider(
                ui,
                &mut max_node,
                20.0..=80.0,
                "Max node radius",
                "Radius of the largest node.",
            );

            scaling.node_exponent = node_exponent as f64;
            scaling.link_exponent = link_exponent as f64;
            scaling.min_node_size = min_node as f64;
            scaling.max_node_size = max_node as f64;
            self.network.highlight.min_node_size = min_node;
            self.network.highlight.max_node_size = max_node;
        });

        ui.collapsing("Highlight", |ui| {
            let highlight = &mut self.network.highlight;
            changed |= tuned_slider(
                ui,
                &mut highlight.transparency,
                0.0..=1.0,
                "Transparency",
                "Opacity of nodes and links away from the hovered node.",
            );
            changed |= tuned_slider(
                ui,
                &mut highlight.node_size_inc,
                0.0..=20.0,
                "Hover growth",
                "Radius added to the hovered node.",
            );
            changed |= tuned_slider(
                ui,
                &mut highlight.label_size_add,
                0.0..=20.0,
                "Label size",
                "Points added to emphasised labels.",
            );
        });

        ui.collapsing("Forces", |ui| {
            let forces = &mut self.network.forces;
            changed |= tuned_slider(
                ui,
                &mut forces.charge_strength,
                -2000.0..=0.0,
                "Charge",
                "Many-body strength; negative values repel.",
            );
            changed |= tuned_slider(
                ui,
                &mut forces.link_distance,
                5.0..=200.0,
                "Link distance",
                "Rest length of every link.",
            );
            changed |= tuned_slider(
                ui,
                &mut forces.collide_padding,
                0.0..=20.0,
                "Collision padding",
                "Gap kept between node outlines.",
            );
        });

        if changed {
            self.network.apply_settings(now);
        }

        ui.separator();
        let primary = self.network.primary_kind().to_owned();
        ui.horizontal(|ui| {
            swatch(ui, self.config.network.primary_color.to_color32());
            ui.label(primary);
            swatch(ui, self.config.network.secondary_color.to_color32());
            ui.label("other");
        });
        ui.label("Drag nodes to pin them; drag the background to pan, scroll to zoom.");
    }

    fn draw_packing_controls(&mut self, ui: &mut Ui) {
        ui.heading("Transport");
        ui.separator();

        if let Some(reason) = self.packing.unavailable_reason() {
            ui.label(format!("Packing data unavailable: {reason}"));
            return;
        }

        ui.label(match self.packing.focused_name() {
            Some(name) => format!("Inside: {name}"),
            None => "Click a circle to zoom in.".to_owned(),
        });
        ui.separator();
        egui::ScrollArea::vertical().show(ui, |ui| {
            for (name, value) in self.packing.focused_children() {
                ui.horizontal(|ui| {
                    ui.label(name);
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.label(format!("{value:.0}"));
                    });
                });
            }
        });
    }

    fn draw_stats_controls(&mut self, ui: &mut Ui, now: f64) {
        ui.heading("Permutation test");
        ui.separator();

        for (series, text) in [(Series::NonPermuted, "Observed"), (Series::Permuted, "Permuted")] {
            let color = self.stats.series_color(series);
            let mut visible = self.stats.is_visible(series);
            ui.horizontal(|ui| {
                swatch(ui, color);
                if ui.checkbox(&mut visible, text).changed() {
                    self.stats.set_visible(series, visible, now);
                }
            });
        }

        let features = self.stats.features().to_vec();
        if features.is_empty() {
            return;
        }

        ui.separator();
        ui.label("Features")
            .on_hover_text("Statistics computed on the checked features.");
        let locked = self.stats.selection().is_locked(now);
        let mut toggled = None;
        for feature in &features {
            let mut checked = self.stats.selection().contains(feature);
            if ui.add_enabled(!locked, egui::Checkbox::new(&mut checked, feature.as_str())).changed() {
                toggled = Some(feature.clone());
            }
        }
        if let Some(feature) = toggled {
            self.stats.toggle_feature(&feature, now);
        }
        if self.stats.is_loading() {
            ui.spinner();
        }
    }

    fn draw_sankey_controls(&mut self, ui: &mut Ui) {
        ui.heading("Flows");
        ui.separator();

        if let Some(reason) = self.sankey.unavailable_reason() {
            ui.label(format!("Flow data unavailable: {reason}"));
            return;
        }

        ui.label("Hover a node or a band to see where its flows go.");
        ui.separator();
        egui::ScrollArea::vertical().show(ui, |ui| {
            for (group, color) in self.sankey.group_legend() {
                ui.horizontal(|ui| {
                    swatch(ui, color);
                    ui.label(group);
                });
            }
        });
    }

    fn draw_violin_controls(&mut self, ui: &mut Ui) {
        ui.heading("Distributions");
        ui.separator();

        let features = self.violin.features().to_vec();
        if features.is_empty() {
            ui.label("No violin data configured.");
            return;
        }

        let mut feature = self.violin.feature().to_owned();
        egui::ComboBox::from_label("Group by")
            .selected_text(feature.clone())
            .show_ui(ui, |ui| {
                for name in &features {
                    ui.selectable_value(&mut feature, name.clone(), name);
                }
            });
        self.violin.select_feature(&feature);
        if self.violin.is_loading() {
            ui.spinner();
        }
    }
}
