use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use anyhow::Result;
use eframe::egui::{self, Context};
use storymap::config::StoryConfig;
use storymap::data::Dataset;
use storymap::data::geojson::{ZoneCollection, load_zones};
use storymap::data::hierarchy::{HierarchyNode, load_hierarchy};
use storymap::data::locations::{Location, load_locations};
use storymap::data::network::{NetworkGraph, load_network};
use storymap::data::sankey::{FlowGraph, load_flows};
use storymap::data::stats::{LoadedStats, open_stats};
use storymap::data::violin::{LoadedViolins, open_violins};
use tracing::info;

mod map_view;
mod network_view;
mod packing_view;
mod render_utils;
mod sankey_view;
mod stats_view;
mod ui;
mod violin_view;

use map_view::MapView;
use network_view::NetworkView;
use packing_view::PackingView;
use sankey_view::SankeyView;
use stats_view::StatsView;
use violin_view::ViolinView;

#[derive(Clone, Debug, Default)]
pub struct DataSources {
    pub map: Option<PathBuf>,
    pub locations: Option<PathBuf>,
    pub networks: Vec<PathBuf>,
    pub packing: Option<PathBuf>,
    pub stats: Option<PathBuf>,
    pub sankey: Option<PathBuf>,
    pub violin: Option<PathBuf>,
}

pub struct StoryMapApp {
    sources: DataSources,
    config: Arc<StoryConfig>,
    state: AppState,
    reload_rx: Option<Receiver<LoadedData>>,
}

enum AppState {
    Loading { rx: Receiver<LoadedData> },
    Ready(Box<ViewModel>),
    Error(String),
}

struct LoadedData {
    zones: Dataset<ZoneCollection>,
    locations: Dataset<Vec<Location>>,
    networks: Vec<(String, Dataset<NetworkGraph>)>,
    hierarchy: Dataset<HierarchyNode>,
    stats: Dataset<LoadedStats>,
    flows: Dataset<FlowGraph>,
    violins: Dataset<LoadedViolins>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tab {
    Map,
    Network,
    Packing,
    Stats,
    Sankey,
    Violin,
}

impl Tab {
    const ALL: [Self; 6] = [
        Self::Map,
        Self::Network,
        Self::Packing,
        Self::Stats,
        Self::Sankey,
        Self::Violin,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::Map => "Map",
            Self::Network => "Networks",
            Self::Packing => "Transport",
            Self::Stats => "Permutation test",
            Self::Sankey => "Flows",
            Self::Violin => "Distributions",
        }
    }
}

struct ViewModel {
    config: Arc<StoryConfig>,
    tab: Tab,
    map: MapView,
    network: NetworkView,
    packing: PackingView,
    stats: StatsView,
    sankey: SankeyView,
    violin: ViolinView,
}

fn load_optional<T>(
    what: &str,
    path: Option<&Path>,
    load: impl FnOnce(&Path) -> Result<T>,
) -> Dataset<T> {
    match path {
        Some(path) => Dataset::from_result(what, load(path)),
        None => Dataset::not_configured(what),
    }
}

fn load_datasets(sources: &DataSources, config: &StoryConfig) -> LoadedData {
    let scaling = config.network_scaling();
    let networks = sources
        .networks
        .iter()
        .map(|path| {
            let name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            let dataset = Dataset::from_result("network", load_network(path, scaling));
            (name, dataset)
        })
        .collect();

    LoadedData {
        zones: load_optional("map", sources.map.as_deref(), load_zones),
        locations: load_optional("locations", sources.locations.as_deref(), load_locations),
        networks,
        hierarchy: load_optional("packing", sources.packing.as_deref(), load_hierarchy),
        stats: load_optional("stats", sources.stats.as_deref(), |path| {
            open_stats(path, &config.stats.features, &config.stats.default_features)
        }),
        flows: load_optional("sankey", sources.sankey.as_deref(), load_flows),
        violins: load_optional("violin", sources.violin.as_deref(), |path| {
            open_violins(path, &config.violin.default_feature)
        }),
    }
}

impl StoryMapApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, sources: DataSources, config: StoryConfig) -> Self {
        let config = Arc::new(config);
        let state = Self::start_load(&sources, &config);
        Self {
            sources,
            config,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(sources: &DataSources, config: &Arc<StoryConfig>) -> Receiver<LoadedData> {
        let (tx, rx) = mpsc::channel();
        let sources = sources.clone();
        let config = Arc::clone(config);

        thread::spawn(move || {
            info!(networks = sources.networks.len(), "loading datasets");
            let _ = tx.send(load_datasets(&sources, &config));
        });

        rx
    }

    fn start_load(sources: &DataSources, config: &Arc<StoryConfig>) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(sources, config),
        }
    }
}

impl eframe::App for StoryMapApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(data) => {
                        transition = Some(AppState::Ready(Box::new(ViewModel::new(
                            data,
                            Arc::clone(&self.config),
                        ))));
                    }
                    Err(TryRecvError::Empty) => ctx.request_repaint(),
                    Err(TryRecvError::Disconnected) => {
                        transition =
                            Some(AppState::Error("Background load worker disconnected".to_owned()));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading datasets...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load datasets");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(&self.sources, &self.config));
                    }
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(&self.sources, &self.config));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(data) => {
                            transition = Some(AppState::Ready(Box::new(ViewModel::new(
                                data,
                                Arc::clone(&self.config),
                            ))));
                        }
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            transition =
                                Some(AppState::Error("Background load worker disconnected".to_owned()));
                        }
                    }
                }
            }
        }

        if let Some(next_state) = transition {
            self.reload_rx = None;
            self.state = next_state;
        }
    }
}
