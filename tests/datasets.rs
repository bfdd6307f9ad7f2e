use std::path::Path;

use storymap::config::StoryConfig;
use storymap::data::Dataset;
use storymap::data::geojson::{load_zones, parse_zones};
use storymap::data::hierarchy::parse_hierarchy;
use storymap::data::stats::{Series, parse_stats};
use storymap::interaction::color::Color;
use storymap::layout::packing::pack;

#[test]
fn shipped_config_matches_built_in_defaults() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("storymap.toml");
    let shipped = StoryConfig::load(Some(&path)).unwrap();
    let defaults = StoryConfig::default();

    assert_eq!(shipped.categories, defaults.categories);
    assert_eq!(shipped.map.center, defaults.map.center);
    assert_eq!(shipped.map.default_color, defaults.map.default_color);
    assert_eq!(shipped.network_scaling(), defaults.network_scaling());
    assert_eq!(shipped.network_highlight(), defaults.network_highlight());
    assert_eq!(shipped.force_params(), defaults.force_params());
    assert_eq!(shipped.packing.background, Color::rgb(0xF4, 0xEF, 0xDA));
    assert_eq!(
        shipped.packing.descriptions.len(),
        defaults.packing.descriptions.len()
    );
    for name in defaults.packing.descriptions.keys() {
        assert_eq!(
            shipped.packing.description(name),
            defaults.packing.description(name)
        );
    }
    assert!(shipped.packing.description("Metro").is_some_and(|text| text.contains("M1")));
    assert_eq!(shipped.packing.description("Chars"), None);
    assert_eq!(shipped.stats.lockout_ms, defaults.stats.lockout_ms);
    assert_eq!(shipped.sankey.hovered_link_opacity, defaults.sankey.hovered_link_opacity);
    assert_eq!(shipped.sankey.colors, defaults.sankey.colors);
    assert_eq!(shipped.violin.default_feature, defaults.violin.default_feature);
    assert_eq!(shipped.violin.stroke, defaults.violin.stroke);
}

#[test]
fn explicit_config_path_must_exist() {
    let error = StoryConfig::load(Some(Path::new("/definitely/not/storymap.toml"))).unwrap_err();
    assert!(format!("{error:#}").contains("configuration"));
}

#[test]
fn broken_zone_file_disables_only_that_dataset() {
    let missing = Dataset::from_result("map", load_zones(Path::new("/no/such/zones.geojson")));
    match missing {
        Dataset::Unavailable(reason) => assert!(reason.contains("/no/such/zones.geojson")),
        Dataset::Ready(_) => panic!("missing file loaded"),
    }

    let malformed = Dataset::from_result("map", parse_zones(r#"{"type": "Feature"}"#));
    assert!(!malformed.is_ready());

    let stats = Dataset::from_result(
        "stats",
        parse_stats(r#"{"xs": [0.1, 0.2], "permuted_ys": [3, 0], "non_permuted_ys": [1, 2]}"#),
    );
    assert!(stats.is_ready());
}

#[test]
fn zones_without_the_selected_category_use_the_ramp_start() {
    let zones = parse_zones(
        r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"id": "z", "jobs": {"rente": 4}},
                "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}
            }]
        }"#,
    )
    .unwrap();
    let coloring = StoryConfig::default().category_coloring();
    let zone = &zones.zones[0];

    let scale = coloring.scale("commerce", false).unwrap();
    assert_eq!(
        coloring.zone_color(zone, Some("commerce"), false),
        scale.color(0.0)
    );
}

#[test]
fn histogram_skips_empty_bins() {
    let stats = parse_stats(r#"{"xs": [0.1, 0.2, 0.3], "permuted_ys": [3, 0, 1], "non_permuted_ys": [0, 2, 0]}"#)
        .unwrap();
    let bars = stats.bars();
    assert_eq!(bars.len(), 3);
    assert!(bars.iter().all(|bar| bar.y > 0.0));
    assert_eq!(
        bars.iter().filter(|bar| bar.series == Series::NonPermuted).count(),
        1
    );
}

#[test]
fn packed_hierarchy_keeps_every_node() {
    let tree = parse_hierarchy(
        r#"{
            "name": "transport",
            "children": [
                {"name": "Train", "children": [{"name": "IC", "value": 12}, {"name": "RE", "value": 4}]},
                {"name": "Boat", "value": 30}
            ]
        }"#,
    )
    .unwrap();
    assert_eq!(tree.leaf_count(), 3);

    let packed = pack(
        &tree,
        eframe::egui::pos2(300.0, 300.0),
        eframe::egui::vec2(600.0, 600.0),
        3.0,
    );
    assert_eq!(packed.circles.len(), 5);
    let root = packed.root().unwrap();
    for circle in &packed.circles[1..] {
        assert!((circle.center - root.center).length() + circle.radius <= root.radius + 1e-2);
    }
}
