use std::fs;

use eframe::egui::{Rect, pos2, vec2};
use storymap::config::{SankeyConfig, ViolinConfig};
use storymap::data::sankey::parse_flows;
use storymap::data::violin::{ViolinCatalog, open_violins};
use storymap::interaction::sankey::{SankeyController, SankeyHover};
use storymap::interaction::violin::ViolinUpdater;
use storymap::layout::sankey::{SankeyParams, layout};

const FLOWS: &str = r#"[
    {"source": "bourg 1798", "target": "commerce 1832", "value": 12},
    {"source": "bourg 1798", "target": "culture 1832", "value": 3},
    {"source": "palud 1798", "target": "commerce 1832", "value": 5}
]"#;

fn params() -> SankeyParams {
    SankeyParams {
        node_width: 15.0,
        node_padding: 10.0,
        extent: Rect::from_min_max(pos2(1.0, 5.0), pos2(399.0, 395.0)),
    }
}

#[test]
fn hovering_a_laid_out_node_feeds_its_flows_and_leaving_clears_them() {
    let graph = parse_flows(FLOWS).unwrap();
    let chart = layout(&graph, &params()).unwrap();
    let mut controller = SankeyController::new(SankeyConfig::default(), &graph);

    let bourg = graph.index_of("bourg 1798").unwrap();
    let center = chart.nodes[bourg].rect().center();
    let hovered = chart.node_at(center).map(SankeyHover::Node);
    assert_eq!(hovered, Some(SankeyHover::Node(bourg)));

    let context = controller.on_hover(&graph, hovered, 0.0).flatten().unwrap();
    assert_eq!(
        context.values,
        [("commerce 1832".to_owned(), 12.0), ("culture 1832".to_owned(), 3.0)]
    );
    assert_eq!(context.selected, None);

    assert_eq!(controller.on_hover(&graph, None, 0.5), Some(None));
    assert_eq!(controller.hovered(), None);
}

#[test]
fn hovering_a_band_selects_its_target_in_the_source_flows() {
    let graph = parse_flows(FLOWS).unwrap();
    let chart = layout(&graph, &params()).unwrap();
    let mut controller = SankeyController::new(SankeyConfig::default(), &graph);

    let band = &chart.links[2];
    let source = &chart.nodes[band.source];
    let target = &chart.nodes[band.target];
    let middle = pos2((source.x1 + target.x0) / 2.0, (band.y0 + band.y1) / 2.0);
    assert_eq!(chart.link_at(middle), Some(2));

    let context = controller
        .on_hover(&graph, Some(SankeyHover::Link(2)), 0.0)
        .flatten()
        .unwrap();
    assert_eq!(context.values, [("commerce 1832".to_owned(), 5.0)]);
    assert_eq!(context.selected.as_deref(), Some("commerce 1832"));

    let settled = SankeyConfig::default().fade_duration();
    assert_eq!(controller.link_opacity(2, settled), 0.8);
    assert_eq!(controller.link_opacity(0, settled), 0.5);
}

#[test]
fn switching_violin_feature_fades_out_groups_that_disappear() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("violin_divisions.json"),
        r#"[{"group": "bourg", "values": [20, 30, 40]}, {"group": "palud", "values": [25, 35]}]"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("violin_age.json"),
        r#"[{"group": "bourg", "values": [50, 60]}]"#,
    )
    .unwrap();

    let loaded = open_violins(dir.path(), "divisions").unwrap();
    assert_eq!(loaded.catalog.features, ["age", "divisions"]);
    assert_eq!(loaded.feature, "divisions");

    let config = ViolinConfig::default();
    let duration = config.duration();
    let mut updater = ViolinUpdater::new(config, vec2(400.0, 300.0));
    updater.update(loaded.groups, 0.0);
    assert_eq!(updater.violins().len(), 2);
    assert_eq!(updater.violins()[0].shape(0.0).opacity, 0.0);

    let age = loaded.catalog.load("age").unwrap();
    updater.update(age, duration);
    let palud = updater.violins().iter().find(|violin| violin.group == "palud").unwrap();
    assert!(palud.is_exiting());

    updater.prune(3.0 * duration);
    assert_eq!(updater.violins().len(), 1);
    assert_eq!(updater.violins()[0].group, "bourg");
    assert_eq!(updater.axis().map(|axis| axis.domain), Some((40.0, 70.0)));
    let widest = updater.violins()[0].target().max_half_width();
    assert!(widest > 0.0 && widest < updater.band_width());
}

#[test]
fn single_violin_document_offers_only_its_feature() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("violin_age.json");
    fs::write(&path, r#"[{"group": 1798, "values": [1, 2]}]"#).unwrap();

    let catalog = ViolinCatalog::open(&path).unwrap();
    assert_eq!(catalog.features, ["age"]);
    assert_eq!(catalog.path_for("age"), path);
    assert!(ViolinCatalog::open(&dir.path().join("stats_.json")).is_err());
}
