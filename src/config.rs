//! Runtime configuration.
//!
//! Built-in defaults reproduce the site's constants. An optional TOML file and
//! `STORYMAP__SECTION__KEY` environment variables override them.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::data::network::NetworkScaling;
use crate::interaction::barplot::BarPlotConfig;
use crate::interaction::category::{CategoryColoring, CategorySpec};
use crate::interaction::color::Color;
use crate::interaction::network::NetworkHighlightConfig;
use crate::interaction::zone::{HighlightStyle, ZoneInteractionConfig};
use crate::layout::simulation::ForceParams;

pub const DEFAULT_CONFIG_FILE: &str = "storymap.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct StoryConfig {
    #[serde(default)]
    pub map: MapConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub packing: PackingConfig,

    #[serde(default)]
    pub barplot: BarPlotSettings,

    #[serde(default)]
    pub stats: StatsConfig,

    #[serde(default)]
    pub sankey: SankeyConfig,

    #[serde(default)]
    pub violin: ViolinConfig,

    #[serde(default = "default_categories")]
    pub categories: Vec<CategorySpec>,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            map: MapConfig::default(),
            network: NetworkConfig::default(),
            packing: PackingConfig::default(),
            barplot: BarPlotSettings::default(),
            stats: StatsConfig::default(),
            sankey: SankeyConfig::default(),
            violin: ViolinConfig::default(),
            categories: default_categories(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapConfig {
    #[serde(default = "default_map_center")]
    pub center: [f64; 2],

    #[serde(default = "default_map_scale")]
    pub scale: f64,

    #[serde(default = "default_min_zoom_dimension")]
    pub min_zoom_dimension: f32,

    #[serde(default = "default_zone_color")]
    pub default_color: Color,

    #[serde(default = "default_highlight_factor")]
    pub highlight_factor: f32,

    #[serde(default = "default_zoom_fill_ratio")]
    pub zoom_fill_ratio: f32,

    #[serde(default = "default_zoom_duration_ms")]
    pub zoom_duration_ms: u64,

    #[serde(default = "default_fade_duration_ms")]
    pub fade_duration_ms: u64,

    #[serde(default = "default_scale_extent")]
    pub scale_extent: [f32; 2],
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: default_map_center(),
            scale: default_map_scale(),
            min_zoom_dimension: default_min_zoom_dimension(),
            default_color: default_zone_color(),
            highlight_factor: default_highlight_factor(),
            zoom_fill_ratio: default_zoom_fill_ratio(),
            zoom_duration_ms: default_zoom_duration_ms(),
            fade_duration_ms: default_fade_duration_ms(),
            scale_extent: default_scale_extent(),
        }
    }
}

fn default_map_center() -> [f64; 2] {
    [6.635, 46.525]
}

fn default_map_scale() -> f64 {
    700_000.0
}

fn default_min_zoom_dimension() -> f32 {
    100.0
}

fn default_zone_color() -> Color {
    Color::GRAY
}

fn default_highlight_factor() -> f32 {
    1.25
}

fn default_zoom_fill_ratio() -> f32 {
    0.7
}

fn default_zoom_duration_ms() -> u64 {
    750
}

fn default_fade_duration_ms() -> u64 {
    200
}

fn default_scale_extent() -> [f32; 2] {
    [1.0, 8.0]
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_size_exponent")]
    pub exp_node_size_scale: f64,

    #[serde(default = "default_size_exponent")]
    pub exp_link_weight_scale: f64,

    #[serde(default = "default_transparency")]
    pub transparency: f32,

    #[serde(default = "default_min_node_size")]
    pub min_node_size: f32,

    #[serde(default = "default_max_node_size")]
    pub max_node_size: f32,

    #[serde(default = "default_min_link_weight")]
    pub min_link_weight: f32,

    #[serde(default = "default_max_link_weight")]
    pub max_link_weight: f32,

    #[serde(default = "default_size_increment")]
    pub label_size_add: f32,

    #[serde(default = "default_size_increment")]
    pub node_size_inc: f32,

    #[serde(default = "default_size_increment")]
    pub label_size_inc: f32,

    #[serde(default = "default_charge_strength")]
    pub charge_strength: f32,

    #[serde(default = "default_collide_size_add")]
    pub collide_size_add: f32,

    #[serde(default = "default_link_distance")]
    pub link_distance: f32,

    #[serde(default = "default_fade_duration_ms")]
    pub transition_duration_ms: u64,

    #[serde(default = "default_scale_extent")]
    pub scale_extent: [f32; 2],

    /// Node kind drawn with `primary_color`; every other kind uses `secondary_color`.
    #[serde(default = "default_primary_kind")]
    pub primary_kind: String,

    #[serde(default = "default_primary_color")]
    pub primary_color: Color,

    #[serde(default = "default_secondary_color")]
    pub secondary_color: Color,

    #[serde(default = "default_link_color")]
    pub link_color: Color,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            exp_node_size_scale: default_size_exponent(),
            exp_link_weight_scale: default_size_exponent(),
            transparency: default_transparency(),
            min_node_size: default_min_node_size(),
            max_node_size: default_max_node_size(),
            min_link_weight: default_min_link_weight(),
            max_link_weight: default_max_link_weight(),
            label_size_add: default_size_increment(),
            node_size_inc: default_size_increment(),
            label_size_inc: default_size_increment(),
            charge_strength: default_charge_strength(),
            collide_size_add: default_collide_size_add(),
            link_distance: default_link_distance(),
            transition_duration_ms: default_fade_duration_ms(),
            scale_extent: default_scale_extent(),
            primary_kind: default_primary_kind(),
            primary_color: default_primary_color(),
            secondary_color: default_secondary_color(),
            link_color: default_link_color(),
        }
    }
}

fn default_size_exponent() -> f64 {
    0.7
}

fn default_transparency() -> f32 {
    0.1
}

fn default_min_node_size() -> f32 {
    7.0
}

fn default_max_node_size() -> f32 {
    40.0
}

fn default_min_link_weight() -> f32 {
    1.0
}

fn default_max_link_weight() -> f32 {
    8.0
}

fn default_size_increment() -> f32 {
    5.0
}

fn default_charge_strength() -> f32 {
    -700.0
}

fn default_collide_size_add() -> f32 {
    2.0
}

fn default_link_distance() -> f32 {
    30.0
}

fn default_primary_kind() -> String {
    "vocation".to_string()
}

fn default_primary_color() -> Color {
    Color::rgb(0xFF, 0x33, 0x33)
}

fn default_secondary_color() -> Color {
    Color::rgb(0x29, 0xA3, 0x29)
}

fn default_link_color() -> Color {
    Color::rgb(0xBB, 0xBB, 0xBB)
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackingConfig {
    #[serde(default = "default_packing_padding")]
    pub padding: f64,

    #[serde(default = "default_min_font_size")]
    pub min_font_size: f32,

    #[serde(default = "default_max_font_size")]
    pub max_font_size: f32,

    #[serde(default = "default_packing_background")]
    pub background: Color,

    #[serde(default = "default_packing_deep_color")]
    pub deep_color: Color,

    /// Depth at which branch fills reach `deep_color`.
    #[serde(default = "default_color_depth")]
    pub color_depth: f64,

    #[serde(default = "default_packing_text")]
    pub default_text: String,

    /// Text shown when a circle with this name gains focus.
    #[serde(default = "default_packing_descriptions")]
    pub descriptions: BTreeMap<String, String>,
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            padding: default_packing_padding(),
            min_font_size: default_min_font_size(),
            max_font_size: default_max_font_size(),
            background: default_packing_background(),
            deep_color: default_packing_deep_color(),
            color_depth: default_color_depth(),
            default_text: default_packing_text(),
            descriptions: default_packing_descriptions(),
        }
    }
}

impl PackingConfig {
    /// Focus text for a circle name, ignoring case.
    pub fn description(&self, name: &str) -> Option<&str> {
        self.descriptions
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, text)| text.as_str())
    }
}

fn default_packing_padding() -> f64 {
    3.0
}

fn default_min_font_size() -> f32 {
    5.0
}

fn default_max_font_size() -> f32 {
    100.0
}

fn default_packing_background() -> Color {
    Color::rgb(0xF4, 0xEF, 0xDA)
}

fn default_packing_deep_color() -> Color {
    Color::rgb(0x2E, 0x5D, 0x52)
}

fn default_color_depth() -> f64 {
    2.0
}

fn default_packing_text() -> String {
    "Click on each circle to zoom in and explore the different types of transportation."
        .to_string()
}

fn default_packing_descriptions() -> BTreeMap<String, String> {
    [
        ("B", "A kaleidoscope of bus numbers crisscross Switzerland, each serving its unique route in cities and rural corners alike."),
        ("Bus", "A kaleidoscope of bus numbers crisscross Switzerland, each serving its unique route in cities and rural corners alike."),
        ("T", "Trams, the urban chariots, mark their presence in the bustling cities of Geneva, Zurich, Basel, and Bern, weaving through the cityscape."),
        ("M", "Lausanne boasts the only metro system in Switzerland - the M1, a modern marvel darting beneath the city."),
        ("Metro", "Lausanne boasts the only metro system in Switzerland - the M1, a modern marvel darting beneath the city."),
        ("Train", "Switzerland's train network, from local 'S' trains to high-speed ICEs, weaves a diverse tapestry of punctuality, efficiency, and connectivity."),
        ("CC", "From the scenic trails of Montreux to the peak of Jungfraujoch, rack railways conquer the Swiss mountains, providing unforgettable journeys."),
        ("Rack Railway", "From the scenic trails of Montreux to the peak of Jungfraujoch, rack railways conquer the Swiss mountains, providing unforgettable journeys."),
        ("Boat", "Whether it's the serene Lac de Thoune or the expansive Lac des Quatre Cantons, boats gently cut through the tranquil Swiss waters, offering a unique perspective of the landscape."),
        ("BAT", "Whether it's the serene Lac de Thoune or the expansive Lac des Quatre Cantons, boats gently cut through the tranquil Swiss waters, offering a unique perspective of the landscape."),
        ("S", "The local 'S' trains serve as the reliable veins of the Swiss rail system, connecting suburbs to city centers."),
        ("R", "'R' trains, or Regional trains, make frequent stops, ensuring even the smallest towns are connected."),
        ("RE", "The Regional Express (RE) trains, quicker than the 'R', make fewer stops, bringing regions closer together."),
        ("IC", "InterCity (IC) trains link major Swiss cities, providing a swift and comfortable journey."),
        ("TER", "Transport Express Régional (TER) trains ensure the smooth running of regional transport, serving both urban and rural areas."),
        ("RJX", "Railjet Express (RJX) is the high-speed star, offering a swift connection between major cities."),
        ("RJ", "Railjet (RJ) trains, while not as fast as RJX, still offer quick, long-distance travel across the country."),
        ("EC", "EuroCity (EC) trains reach beyond Swiss borders, connecting Switzerland with neighboring European countries."),
        ("ICE", "The InterCity Express (ICE) trains are the epitome of speed and comfort, bringing distant cities within easy reach."),
        ("Z", "The 'Z' trains, a rare sight, are special trains often used for seasonal routes or specific events."),
        ("RB", "RegionalBahn (RB) trains are the workhorses of the Swiss rail system, stopping at each station within a region."),
        ("NJ", "NightJet (NJ) trains turn travel time into rest time, offering sleeping facilities for long-distance overnight journeys."),
        ("PE", "The Panorama Express (PE) offers scenic rides through some of the most beautiful landscapes Switzerland has to offer."),
        ("IRE", "InterRegio-Express (IRE) trains offer regional services with fewer stops, connecting regions quickly and efficiently."),
        ("EXT", "The 'EXT' trains are extra trains deployed during peak times or special events to ensure everyone gets where they're going."),
        ("IR", "InterRegio (IR) trains are crucial connectors, bridging the gap between local and long-distance services by linking smaller cities with major Swiss hubs."),
        ("TGV", "The TGV (Train à Grande Vitesse), or 'High-Speed Train', is France's intercity high-speed rail service, but its influence extends beyond French borders, including into Switzerland."),
        ("RBus", "The 'R' buses, similar to 'R' trains, are regional buses. They serve a vital role in connecting smaller towns and regions that may not have direct train services."),
        ("CAR", "The 'CAR' buses in Switzerland refer to coach services, usually providing longer distance intercity connections or international routes."),
    ]
    .into_iter()
    .map(|(name, text)| (name.to_owned(), text.to_owned()))
    .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct BarPlotSettings {
    #[serde(default = "default_band_padding")]
    pub padding: f32,

    #[serde(default = "default_barplot_duration_ms")]
    pub duration_ms: u64,

    #[serde(default = "default_dimmed_opacity")]
    pub dimmed_opacity: f32,
}

impl Default for BarPlotSettings {
    fn default() -> Self {
        Self {
            padding: default_band_padding(),
            duration_ms: default_barplot_duration_ms(),
            dimmed_opacity: default_dimmed_opacity(),
        }
    }
}

fn default_band_padding() -> f32 {
    0.2
}

fn default_barplot_duration_ms() -> u64 {
    500
}

fn default_dimmed_opacity() -> f32 {
    0.35
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsConfig {
    #[serde(default = "default_histogram_opacity")]
    pub opacity: f32,

    #[serde(default = "default_non_permuted_color")]
    pub non_permuted_color: Color,

    #[serde(default = "default_permuted_color")]
    pub permuted_color: Color,

    /// Selectable features; empty means every feature named by a
    /// `stats_*.json` file in the stats directory.
    #[serde(default)]
    pub features: Vec<String>,

    #[serde(default)]
    pub default_features: Vec<String>,

    #[serde(default = "default_stats_duration_ms")]
    pub duration_ms: u64,

    /// Checkboxes stay disabled this long after a change.
    #[serde(default = "default_stats_lockout_ms")]
    pub lockout_ms: u64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            opacity: default_histogram_opacity(),
            non_permuted_color: default_non_permuted_color(),
            permuted_color: default_permuted_color(),
            features: Vec::new(),
            default_features: Vec::new(),
            duration_ms: default_stats_duration_ms(),
            lockout_ms: default_stats_lockout_ms(),
        }
    }
}

impl StatsConfig {
    pub fn duration(&self) -> f64 {
        millis(self.duration_ms)
    }

    pub fn lockout(&self) -> f64 {
        millis(self.lockout_ms)
    }
}

fn default_histogram_opacity() -> f32 {
    0.5
}

fn default_non_permuted_color() -> Color {
    Color::rgb(0x9E, 0x28, 0x46)
}

fn default_permuted_color() -> Color {
    Color::rgb(0x77, 0x77, 0x77)
}

fn default_stats_duration_ms() -> u64 {
    750
}

fn default_stats_lockout_ms() -> u64 {
    800
}

#[derive(Debug, Clone, Deserialize)]
pub struct SankeyConfig {
    #[serde(default = "default_sankey_node_width")]
    pub node_width: f32,

    #[serde(default = "default_sankey_node_padding")]
    pub node_padding: f32,

    #[serde(default = "default_sankey_margin_x")]
    pub margin_x: f32,

    #[serde(default = "default_sankey_margin_y")]
    pub margin_y: f32,

    #[serde(default = "default_sankey_link_opacity")]
    pub link_opacity: f32,

    #[serde(default = "default_sankey_hovered_link_opacity")]
    pub hovered_link_opacity: f32,

    #[serde(default = "default_sankey_node_stroke_opacity")]
    pub node_stroke_opacity: f32,

    #[serde(default = "default_sankey_label_padding")]
    pub label_padding: f32,

    #[serde(default = "default_sankey_fade_duration_ms")]
    pub fade_duration_ms: u64,

    #[serde(default = "default_sankey_fallback_color")]
    pub fallback_color: Color,

    /// Node colors by group, the first word of the node id.
    #[serde(default = "default_sankey_colors")]
    pub colors: BTreeMap<String, Color>,
}

impl Default for SankeyConfig {
    fn default() -> Self {
        Self {
            node_width: default_sankey_node_width(),
            node_padding: default_sankey_node_padding(),
            margin_x: default_sankey_margin_x(),
            margin_y: default_sankey_margin_y(),
            link_opacity: default_sankey_link_opacity(),
            hovered_link_opacity: default_sankey_hovered_link_opacity(),
            node_stroke_opacity: default_sankey_node_stroke_opacity(),
            label_padding: default_sankey_label_padding(),
            fade_duration_ms: default_sankey_fade_duration_ms(),
            fallback_color: default_sankey_fallback_color(),
            colors: default_sankey_colors(),
        }
    }
}

impl SankeyConfig {
    pub fn group_color(&self, group: &str) -> Color {
        self.colors
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(group))
            .map_or(self.fallback_color, |(_, color)| *color)
    }

    pub fn fade_duration(&self) -> f64 {
        millis(self.fade_duration_ms)
    }
}

fn default_sankey_node_width() -> f32 {
    15.0
}

fn default_sankey_node_padding() -> f32 {
    10.0
}

fn default_sankey_margin_x() -> f32 {
    1.0
}

fn default_sankey_margin_y() -> f32 {
    5.0
}

fn default_sankey_link_opacity() -> f32 {
    0.5
}

fn default_sankey_hovered_link_opacity() -> f32 {
    0.8
}

fn default_sankey_node_stroke_opacity() -> f32 {
    0.5
}

fn default_sankey_label_padding() -> f32 {
    6.0
}

fn default_sankey_fade_duration_ms() -> u64 {
    150
}

fn default_sankey_fallback_color() -> Color {
    Color::rgb(0xAA, 0xAA, 0xAA)
}

fn default_sankey_colors() -> BTreeMap<String, Color> {
    let blue = Color::rgb(0x20, 0x81, 0xC3);
    let green = Color::rgb(0x28, 0x9E, 0x61);
    let violet = Color::rgb(0x72, 0x5A, 0xC1);
    let orange = Color::rgb(0xF4, 0x74, 0x3B);
    let sand = Color::rgb(0xF4, 0xB8, 0x60);
    let wine = Color::rgb(0x9E, 0x28, 0x46);

    [
        ("bourg", blue),
        ("place_st_francois", blue),
        ("affaires", blue),
        ("chailly", green),
        ("grange", green),
        ("la_sallaz", green),
        ("ouchy", green),
        ("campagne", green),
        ("barre", violet),
        ("cite_derriere", violet),
        ("cite_dessous", violet),
        ("cathedrale", violet),
        ("cheneau_de_bourg", orange),
        ("montee_st_francois", orange),
        ("rue_du_pre", orange),
        ("centre", orange),
        ("ale", sand),
        ("grand_st_jean", sand),
        ("montee_de_st_laurent", sand),
        ("palud", sand),
        ("st_laurent", sand),
        ("commerce", sand),
        ("marterey", wine),
        ("culture", wine),
    ]
    .into_iter()
    .map(|(group, color)| (group.to_owned(), color))
    .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViolinConfig {
    #[serde(default = "default_violin_feature")]
    pub default_feature: String,

    /// Epanechnikov kernel half-width, in data units.
    #[serde(default = "default_violin_bandwidth")]
    pub bandwidth: f64,

    /// Added below the smallest and above the largest value.
    #[serde(default = "default_violin_value_margin")]
    pub value_margin: f64,

    #[serde(default = "default_violin_samples")]
    pub samples: usize,

    /// Half-width of a violin is `band * density * width_factor`.
    #[serde(default = "default_violin_width_factor")]
    pub width_factor: f32,

    #[serde(default = "default_violin_padding")]
    pub padding: f32,

    #[serde(default = "default_violin_fill")]
    pub fill: Color,

    #[serde(default = "default_violin_stroke")]
    pub stroke: Color,

    #[serde(default = "default_violin_opacity")]
    pub opacity: f32,

    #[serde(default = "default_violin_duration_ms")]
    pub duration_ms: u64,
}

impl Default for ViolinConfig {
    fn default() -> Self {
        Self {
            default_feature: default_violin_feature(),
            bandwidth: default_violin_bandwidth(),
            value_margin: default_violin_value_margin(),
            samples: default_violin_samples(),
            width_factor: default_violin_width_factor(),
            padding: default_violin_padding(),
            fill: default_violin_fill(),
            stroke: default_violin_stroke(),
            opacity: default_violin_opacity(),
            duration_ms: default_violin_duration_ms(),
        }
    }
}

impl ViolinConfig {
    pub fn duration(&self) -> f64 {
        millis(self.duration_ms)
    }
}

fn default_violin_feature() -> String {
    "divisions".to_owned()
}

fn default_violin_bandwidth() -> f64 {
    3.0
}

fn default_violin_value_margin() -> f64 {
    10.0
}

fn default_violin_samples() -> usize {
    100
}

fn default_violin_width_factor() -> f32 {
    3.0
}

fn default_violin_padding() -> f32 {
    0.1
}

fn default_violin_fill() -> Color {
    Color::rgb(0x9E, 0x28, 0x46)
}

fn default_violin_stroke() -> Color {
    Color::rgb(0x25, 0x03, 0x12)
}

fn default_violin_opacity() -> f32 {
    0.6
}

fn default_violin_duration_ms() -> u64 {
    750
}

fn category(id: &str, min: f64, max: f64, color: Color) -> CategorySpec {
    CategorySpec {
        id: id.to_string(),
        label: None,
        min,
        max,
        color,
    }
}

fn default_categories() -> Vec<CategorySpec> {
    vec![
        category("administration", 1.0, 17.0, Color::rgb(0, 0, 255)),
        category("agricole", 3.0, 122.0, Color::rgb(0x00, 0xA5, 0x9B)),
        category("artisanat", 2.0, 93.0, Color::rgb(0x6F, 0x22, 0x82)),
        category("commerce", 6.0, 44.0, Color::rgb(0xE8, 0x4E, 0x10)),
        category("construction", 1.0, 39.0, Color::rgb(0xFC, 0xBB, 0x00)),
        category("rente", 5.0, 140.0, Color::rgb(0x14, 0x3A, 0x85)),
        category("service", 1.0, 77.0, Color::rgb(0x00, 0x97, 0x3B)),
    ]
}

fn millis(ms: u64) -> f64 {
    ms as f64 / 1000.0
}

impl StoryConfig {
    /// Loads `path` when given (it must exist), otherwise the optional
    /// `storymap.toml` in the working directory, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("STORYMAP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("failed to read configuration")?;

        config
            .try_deserialize()
            .context("invalid configuration")
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Config::builder()
            .add_source(File::from_str(raw, config::FileFormat::Toml))
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")
    }

    pub fn map_interaction(&self) -> ZoneInteractionConfig {
        ZoneInteractionConfig {
            highlight: HighlightStyle::Lighten(self.map.highlight_factor),
            zoom_fill_ratio: self.map.zoom_fill_ratio,
            min_zoom_dimension: self.map.min_zoom_dimension,
            zoom_duration: millis(self.map.zoom_duration_ms),
            fade_duration: millis(self.map.fade_duration_ms),
            scale_extent: (self.map.scale_extent[0], self.map.scale_extent[1]),
            pointer_navigation: true,
            direct_refocus: false,
        }
    }

    /// Circle packing: outline highlight, the focused circle fills the view,
    /// no free navigation, parent to child in one zoom.
    pub fn packing_interaction(&self) -> ZoneInteractionConfig {
        ZoneInteractionConfig {
            highlight: HighlightStyle::Outline,
            zoom_fill_ratio: 1.0,
            min_zoom_dimension: 1.0,
            zoom_duration: millis(self.map.zoom_duration_ms),
            fade_duration: millis(self.map.fade_duration_ms),
            scale_extent: (1.0, 1.0),
            pointer_navigation: false,
            direct_refocus: true,
        }
    }

    pub fn network_scaling(&self) -> NetworkScaling {
        NetworkScaling {
            node_exponent: self.network.exp_node_size_scale,
            link_exponent: self.network.exp_link_weight_scale,
            min_node_size: self.network.min_node_size as f64,
            max_node_size: self.network.max_node_size as f64,
            min_link_weight: self.network.min_link_weight as f64,
            max_link_weight: self.network.max_link_weight as f64,
        }
    }

    pub fn network_highlight(&self) -> NetworkHighlightConfig {
        NetworkHighlightConfig {
            transparency: self.network.transparency,
            node_size_inc: self.network.node_size_inc,
            label_size_add: self.network.label_size_add,
            label_size_inc: self.network.label_size_inc,
            min_node_size: self.network.min_node_size,
            max_node_size: self.network.max_node_size,
            transition_duration: millis(self.network.transition_duration_ms),
            ..NetworkHighlightConfig::default()
        }
    }

    pub fn force_params(&self) -> ForceParams {
        ForceParams {
            charge_strength: self.network.charge_strength,
            link_distance: self.network.link_distance,
            collide_padding: self.network.collide_size_add,
            ..ForceParams::default()
        }
    }

    pub fn category_coloring(&self) -> CategoryColoring {
        CategoryColoring::new(self.map.default_color, self.categories.clone())
    }

    pub fn barplot(&self) -> BarPlotConfig {
        BarPlotConfig {
            padding: self.barplot.padding,
            duration: millis(self.barplot.duration_ms),
            dimmed_opacity: self.barplot.dimmed_opacity,
            ..BarPlotConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_reproduce_site_constants() {
        let config = StoryConfig::default();
        let map = config.map_interaction();
        assert_eq!(map.highlight, HighlightStyle::Lighten(1.25));
        assert_eq!(map.zoom_duration, 0.75);
        assert_eq!(config.network_scaling(), NetworkScaling::default());
        assert_eq!(config.network_highlight(), NetworkHighlightConfig::default());
        assert_eq!(config.force_params(), ForceParams::default());
        assert_eq!(config.categories.len(), 7);
    }

    #[test]
    fn toml_overrides_sections_and_categories() {
        let config = StoryConfig::from_toml(
            r##"
            [map]
            scale = 350000.0
            default_color = "rgb(100, 100, 100)"

            [network]
            transparency = 0.25

            [[categories]]
            id = "vigneron"
            label = "Vignerons"
            min = 0.0
            max = 12.0
            color = "#800020"
            "##,
        )
        .unwrap();

        assert_eq!(config.map.scale, 350_000.0);
        assert_eq!(config.map.center, [6.635, 46.525]);
        assert_eq!(config.map.default_color, Color::rgb(100, 100, 100));
        assert_eq!(config.network.transparency, 0.25);
        assert_eq!(config.network.min_node_size, 7.0);
        assert_eq!(config.categories.len(), 1);
        assert_eq!(config.categories[0].display_label(), "Vignerons");
        assert_eq!(config.categories[0].color, Color::rgb(0x80, 0x00, 0x20));
    }

    #[test]
    fn sankey_and_violin_sections_override_defaults() {
        let config = StoryConfig::from_toml(
            r##"
            [sankey]
            hovered_link_opacity = 0.9

            [sankey.colors]
            Bourg = "#000000"

            [violin]
            default_feature = "age"
            bandwidth = 2.0

            [stats]
            features = ["sexe", "age"]
            lockout_ms = 400
            "##,
        )
        .unwrap();

        assert_eq!(config.sankey.hovered_link_opacity, 0.9);
        assert_eq!(config.sankey.link_opacity, 0.5);
        assert_eq!(config.sankey.group_color("bourg"), Color::BLACK);
        assert_eq!(config.sankey.group_color("palud"), config.sankey.fallback_color);
        assert_eq!(config.violin.default_feature, "age");
        assert_eq!(config.violin.bandwidth, 2.0);
        assert_eq!(config.violin.samples, 100);
        assert_eq!(config.stats.features, ["sexe", "age"]);
        assert_eq!(config.stats.lockout(), 0.4);
        assert_eq!(config.stats.duration(), 0.75);
    }

    #[test]
    fn sankey_group_colors_ignore_case() {
        let sankey = SankeyConfig::default();
        assert_eq!(sankey.group_color("Commerce"), Color::rgb(0xF4, 0xB8, 0x60));
        assert_eq!(sankey.group_color("rente"), Color::rgb(0xAA, 0xAA, 0xAA));
    }

    #[test]
    fn malformed_colors_are_rejected() {
        let error = StoryConfig::from_toml("[map]\ndefault_color = \"#12\"\n").unwrap_err();
        assert!(format!("{error:#}").contains("invalid configuration"));
    }
}
