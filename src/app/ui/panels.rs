use std::sync::Arc;

use eframe::egui::{self, Align, Context, Layout};
use storymap::config::StoryConfig;

use super::super::map_view::MapView;
use super::super::network_view::NetworkView;
use super::super::packing_view::PackingView;
use super::super::sankey_view::SankeyView;
use super::super::stats_view::StatsView;
use super::super::violin_view::ViolinView;
use super::super::{LoadedData, Tab, ViewModel};

impl ViewModel {
    pub(in crate::app) fn new(data: LoadedData, config: Arc<StoryConfig>) -> Self {
        let tab = if data.zones.is_ready() {
            Tab::Map
        } else if data.networks.iter().any(|(_, dataset)| dataset.is_ready()) {
            Tab::Network
        } else if data.hierarchy.is_ready() {
            Tab::Packing
        } else if data.stats.is_ready() {
            Tab::Stats
        } else if data.flows.is_ready() {
            Tab::Sankey
        } else if data.violins.is_ready() {
            Tab::Violin
        } else {
            Tab::Map
        };

        Self {
            map: MapView::new(data.zones, data.locations, &config),
            network: NetworkView::new(data.networks, &config),
            packing: PackingView::new(data.hierarchy, &config),
            stats: StatsView::new(data.stats, &config),
            sankey: SankeyView::new(data.flows, &config),
            violin: ViolinView::new(data.violins, &config),
            tab,
            config,
        }
    }

    pub(in crate::app) fn show(&mut self, ctx: &Context, reload_requested: &mut bool, is_loading: bool) {
        let now = ctx.input(|input| input.time);

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("storymap");
                    ui.separator();
                    for tab in Tab::ALL {
                        ui.selectable_value(&mut self.tab, tab, tab.label());
                    }
                    ui.separator();
                    let reload_button =
                        ui.add_enabled(!is_loading, egui::Button::new("Reload datasets"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(self.summary_text());
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| self.draw_controls(ui, now));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| self.draw_details(ui, now));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                if is_loading {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Reloading datasets...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                    return;
                }

                match self.tab {
                    Tab::Map => self.map.draw(ui, now),
                    Tab::Network => self.network.draw(ui, now),
                    Tab::Packing => self.packing.draw(ui, now),
                    Tab::Stats => self.stats.draw(ui, now),
                    Tab::Sankey => self.sankey.draw(ui, now),
                    Tab::Violin => self.violin.draw(ui, now),
                }
            });
    }

    fn summary_text(&self) -> String {
        match self.tab {
            Tab::Map => format!(
                "zones: {}  categories: {}",
                self.map.zone_count(),
                self.config.categories.len()
            ),
            Tab::Network => match self.network.selected_pane() {
                Some(pane) => format!(
                    "nodes: {}  links: {}",
                    pane.graph.nodes.len(),
                    pane.graph.links.len()
                ),
                None => format!("networks: {}", self.network.names().len()),
            },
            Tab::Packing => format!("leaves: {}", self.packing.leaf_count()),
            Tab::Stats => format!("bins: {}  file: {}", self.stats.bin_count(), self.stats.file_name()),
            Tab::Sankey => format!(
                "nodes: {}  flows: {}",
                self.sankey.node_count(),
                self.sankey.flow_count()
            ),
            Tab::Violin => format!(
                "feature: {}  groups: {}",
                self.violin.feature(),
                self.violin.group_count()
            ),
        }
    }
}
