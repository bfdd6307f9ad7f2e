mod app;

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;
use storymap::config::StoryConfig;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// GeoJSON feature collection of city divisions
    #[arg(long)]
    map: Option<PathBuf>,

    /// JSON object of named points, `{name: [lon, lat]}`
    #[arg(long)]
    locations: Option<PathBuf>,

    /// Network document; repeat for several networks
    #[arg(long)]
    network: Vec<PathBuf>,

    /// Hierarchy document for the circle packing
    #[arg(long)]
    packing: Option<PathBuf>,

    /// Permutation test histogram document, or a directory of
    /// `stats_<features>.json` documents to pick features from
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Flow list for the sankey chart, `[{source, target, value}]`
    #[arg(long)]
    sankey: Option<PathBuf>,

    /// `violin_<feature>.json` document, or a directory of them
    #[arg(long)]
    violin: Option<PathBuf>,

    /// Config file path (defaults to ./storymap.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("storymap=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = StoryConfig::load(args.config.as_deref())?;
    let sources = app::DataSources {
        map: args.map,
        locations: args.locations,
        networks: args.network,
        packing: args.packing,
        stats: args.stats,
        sankey: args.sankey,
        violin: args.violin,
    };

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "storymap",
        options,
        Box::new(move |cc| Ok(Box::new(app::StoryMapApp::new(cc, sources, config)))),
    )
    .map_err(|error| anyhow!("failed to run the window: {error}"))
}
