use eframe::egui::{Rect, vec2};
use storymap::config::StoryConfig;
use storymap::data::geojson::{ZoneCollection, parse_zones};
use storymap::interaction::barplot::BarPlotUpdater;
use storymap::interaction::zone::{InteractionState, ZoneChange, ZoneInteractionController, ZoneSeed};
use storymap::layout::projection::Mercator;
use storymap::layout::{GeometryQuery, LayoutAdapter};

const ZONES: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {
            "type": "Feature",
            "properties": {
                "id": "cite",
                "name": "Cité",
                "class": "quartier",
                "population": 400,
                "jobs": {"commerce": 20, "artisanat": 8}
            },
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[6.630, 46.520], [6.640, 46.520], [6.640, 46.525], [6.630, 46.525], [6.630, 46.520]]]
            }
        },
        {
            "type": "Feature",
            "properties": {"id": "ouchy", "name": "Ouchy", "jobs": {"rente": 12}},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[6.620, 46.505], [6.632, 46.505], [6.626, 46.512], [6.620, 46.505]]]
            }
        },
        {
            "type": "Feature",
            "properties": {"id": "chapelle"},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[6.650, 46.530], [6.650, 46.530], [6.650, 46.530], [6.650, 46.530]]]
            }
        },
        {
            "type": "Feature",
            "properties": {"id": "puits", "name": "Puits de la Palud"},
            "geometry": {"type": "Point", "coordinates": [6.633, 46.522]}
        }
    ]
}"#;

const VIEWPORT: (f32, f32) = (800.0, 600.0);

struct Fixture {
    config: StoryConfig,
    zones: ZoneCollection,
    adapter: LayoutAdapter,
    controller: ZoneInteractionController,
}

fn fixture() -> Fixture {
    let config = StoryConfig::default();
    let zones = parse_zones(ZONES).unwrap();
    let projection = Mercator::new(
        config.map.center,
        config.map.scale,
        [VIEWPORT.0 as f64 / 2.0, VIEWPORT.1 as f64 / 2.0],
    );
    let adapter = LayoutAdapter::for_map(projection, &zones.zones);
    let coloring = config.category_coloring();
    let seeds = zones
        .zones
        .iter()
        .map(|zone| ZoneSeed {
            id: zone.id.clone(),
            display_name: zone.title(),
            fill: coloring.zone_color(zone, None, false),
        })
        .collect();
    let controller = ZoneInteractionController::new(
        config.map_interaction(),
        vec2(VIEWPORT.0, VIEWPORT.1),
        seeds,
    );

    Fixture {
        config,
        zones,
        adapter,
        controller,
    }
}

fn bounds(fixture: &Fixture, zone_id: &str) -> Rect {
    fixture.adapter.zone_bounding_box(zone_id).unwrap()
}

fn assert_close(a: f32, b: f32) {
    assert!((a - b).abs() < 1e-3, "{a} != {b}");
}

#[test]
fn click_zooms_onto_the_projected_zone() {
    let mut fixture = fixture();
    let change = fixture.controller.on_click("cite", &fixture.adapter, 0.0);
    assert_eq!(change, Some(ZoneChange::Focused("cite".to_owned())));

    let expected = fixture.controller.focus_transform(bounds(&fixture, "cite"));
    let settled = fixture.controller.transform(5.0);
    assert_close(settled.k, expected.k);
    assert_close(settled.x, expected.x);
    assert_close(settled.y, expected.y);

    let center = settled.apply(bounds(&fixture, "cite").center());
    assert_close(center.x, VIEWPORT.0 / 2.0);
    assert_close(center.y, VIEWPORT.1 / 2.0);
    assert!(!fixture.controller.is_animating(5.0));
}

#[test]
fn clicking_another_zone_zooms_out_before_refocusing() {
    let mut fixture = fixture();
    fixture.controller.on_click("cite", &fixture.adapter, 0.0);

    let change = fixture.controller.on_click("ouchy", &fixture.adapter, 2.0);
    assert_eq!(change, Some(ZoneChange::Released("cite".to_owned())));
    assert_eq!(fixture.controller.state(), &InteractionState::Idle);
    assert_eq!(fixture.controller.queued_focus(), Some("ouchy"));
    assert!(!fixture.controller.is_highlighted("cite"));

    assert_eq!(fixture.controller.tick(&fixture.adapter, 2.1), None);
    assert!(!fixture.controller.on_hover("cite", &fixture.adapter, 2.1));

    let refocused = fixture.controller.tick(&fixture.adapter, 4.0);
    assert_eq!(refocused, Some(ZoneChange::Focused("ouchy".to_owned())));
    assert_eq!(fixture.controller.focused(), Some("ouchy"));
    assert_eq!(fixture.controller.queued_focus(), None);
}

#[test]
fn releasing_restores_identity_and_colors() {
    let mut fixture = fixture();
    let before = fixture.controller.target_fill("cite").unwrap();
    fixture.controller.on_click("cite", &fixture.adapter, 0.0);
    assert_ne!(fixture.controller.target_fill("cite"), Some(before));

    assert_eq!(
        fixture.controller.release(2.0),
        Some(ZoneChange::Released("cite".to_owned()))
    );
    assert!(fixture.controller.transform(10.0).is_identity());
    assert_eq!(fixture.controller.fill("cite", 10.0), Some(before));
    assert_eq!(fixture.controller.release(10.0), None);
}

#[test]
fn point_sized_zone_still_zooms_to_a_finite_scale() {
    let mut fixture = fixture();
    let degenerate = bounds(&fixture, "chapelle");
    assert_eq!(degenerate.width(), 0.0);

    fixture.controller.on_click("chapelle", &fixture.adapter, 0.0);
    let settled = fixture.controller.transform(5.0);
    let floor = fixture.config.map.min_zoom_dimension;
    let expected = (VIEWPORT.0 / floor).min(VIEWPORT.1 / floor) * fixture.config.map.zoom_fill_ratio;
    assert!(settled.k.is_finite());
    assert_close(settled.k, expected);
}

#[test]
fn point_feature_is_focusable_and_capped_by_the_floor() {
    let mut fixture = fixture();
    let well = bounds(&fixture, "puits");
    assert_eq!(well.size(), vec2(0.0, 0.0));

    assert!(fixture.controller.on_hover("puits", &fixture.adapter, 0.0));
    assert_eq!(fixture.controller.label().unwrap().text, "Puits");
    fixture.controller.on_unhover("puits", 0.1);

    let change = fixture.controller.on_click("puits", &fixture.adapter, 0.2);
    assert_eq!(change, Some(ZoneChange::Focused("puits".to_owned())));

    let floor = fixture.config.map.min_zoom_dimension;
    let cap = (VIEWPORT.0 / floor).min(VIEWPORT.1 / floor) * fixture.config.map.zoom_fill_ratio;
    let settled = fixture.controller.transform(5.0);
    assert!(settled.k.is_finite() && settled.x.is_finite() && settled.y.is_finite());
    assert!(settled.k <= cap + 1e-3);
    assert_close(settled.k, cap);

    let center = settled.apply(well.center());
    assert_close(center.x, VIEWPORT.0 / 2.0);
    assert_close(center.y, VIEWPORT.1 / 2.0);
}

#[test]
fn clicking_the_focused_zone_again_restores_its_recolored_fill() {
    let mut fixture = fixture();
    let coloring = fixture.config.category_coloring();
    let cite = fixture.zones.get("cite").unwrap();
    let commerce = coloring.zone_color(cite, Some("commerce"), false);
    assert_ne!(commerce, coloring.default_color());

    fixture.controller.recolor("cite", commerce, 0.0);
    assert_eq!(fixture.controller.fill("cite", 1.0), Some(commerce));

    fixture.controller.on_click("cite", &fixture.adapter, 1.0);
    assert_eq!(fixture.controller.saved_fill("cite"), Some(commerce));
    assert_ne!(fixture.controller.fill("cite", 5.0), Some(commerce));
    assert!(!fixture.controller.transform(5.0).is_identity());

    let change = fixture.controller.on_click("cite", &fixture.adapter, 5.0);
    assert_eq!(change, Some(ZoneChange::Released("cite".to_owned())));
    assert_eq!(fixture.controller.state(), &InteractionState::Idle);
    assert_eq!(fixture.controller.queued_focus(), None);
    assert!(fixture.controller.target_transform().is_identity());
    assert!(fixture.controller.transform(10.0).is_identity());
    assert_eq!(fixture.controller.fill("cite", 10.0), Some(commerce));
    assert!(!fixture.controller.is_highlighted("cite"));
    assert_eq!(fixture.controller.tick(&fixture.adapter, 10.0), None);
}

#[test]
fn hover_label_sits_on_the_zone_center() {
    let mut fixture = fixture();
    assert!(fixture.controller.on_hover("cite", &fixture.adapter, 0.0));

    let label = fixture.controller.label().unwrap();
    assert_eq!(label.text, "Cité");
    let center = bounds(&fixture, "cite").center();
    assert!((label.position - center).length() < 0.01);

    assert!(fixture.controller.on_unhover("cite", 0.1));
    assert!(fixture.controller.label().is_none());
}

#[test]
fn category_switch_recolors_and_feeds_the_bar_plot() {
    let mut fixture = fixture();
    let coloring = fixture.config.category_coloring();
    fixture.controller.on_click("cite", &fixture.adapter, 0.0);

    for zone in &fixture.zones.zones {
        let color = coloring.zone_color(zone, Some("commerce"), false);
        fixture.controller.recolor(&zone.id, color, 1.0);
    }
    let ouchy = fixture.zones.get("ouchy").unwrap();
    assert_eq!(
        fixture.controller.fill("ouchy", 5.0),
        Some(coloring.zone_color(ouchy, Some("commerce"), false))
    );

    fixture.controller.release(5.0);
    let cite = fixture.zones.get("cite").unwrap();
    assert_eq!(
        fixture.controller.fill("cite", 10.0),
        Some(coloring.zone_color(cite, Some("commerce"), false))
    );

    let mut barplot = BarPlotUpdater::new(
        fixture.config.barplot(),
        vec2(300.0, 160.0),
        coloring.palette(),
    );
    let values = cite
        .categories
        .iter()
        .map(|(category, count)| (category.clone(), *count))
        .collect::<Vec<_>>();
    assert!(barplot.update(&values, Some("commerce"), 0.0));

    let labels = barplot.bars().iter().map(|bar| bar.label.as_str()).collect::<Vec<_>>();
    assert_eq!(labels, ["commerce", "artisanat"]);
    assert!(barplot.bars()[0].selected);
    assert_eq!(barplot.max_value(), 20.0);
}
