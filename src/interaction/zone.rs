use std::collections::HashMap;

use eframe::egui::{Pos2, Rect, Vec2};
use tracing::debug;

use super::color::Color;
use super::transition::{Tween, ZoomTransform, ZoomTransition};
use crate::layout::GeometryQuery;

/// Interaction state of one zone view. Hover and focus never coexist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InteractionState {
    Idle,
    Hovering(String),
    Focused(String),
}

/// How a hovered zone is emphasised.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HighlightStyle {
    /// Channels multiplied by the factor.
    Lighten(f32),
    Fixed(Color),
    /// Fill kept; the view strokes the zone outline instead.
    Outline,
}

impl HighlightStyle {
    pub fn apply(self, base: Color) -> Color {
        match self {
            Self::Lighten(factor) => base.lighten(factor),
            Self::Fixed(color) => color,
            Self::Outline => base,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ZoneInteractionConfig {
    pub highlight: HighlightStyle,
    pub zoom_fill_ratio: f32,
    pub min_zoom_dimension: f32,
    pub zoom_duration: f64,
    pub fade_duration: f64,
    pub scale_extent: (f32, f32),
    pub pointer_navigation: bool,
    /// Clicking another zone while focused zooms straight to it instead of
    /// zooming out first.
    pub direct_refocus: bool,
}

impl Default for ZoneInteractionConfig {
    fn default() -> Self {
        Self {
            highlight: HighlightStyle::Lighten(1.25),
            zoom_fill_ratio: 0.7,
            min_zoom_dimension: 100.0,
            zoom_duration: 0.75,
            fade_duration: 0.2,
            scale_extent: (1.0, 8.0),
            pointer_navigation: true,
            direct_refocus: false,
        }
    }
}

/// Initial description of a zone handed to the controller at load time.
#[derive(Clone, Debug)]
pub struct ZoneSeed {
    pub id: String,
    pub display_name: String,
    pub fill: Color,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FloatingLabel {
    pub zone_id: String,
    pub text: String,
    pub position: Pos2,
}

/// Focus changes reported to the caller so dependent views can follow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ZoneChange {
    Focused(String),
    Released(String),
}

struct ZoneVisual {
    display_name: String,
    fill: Tween<Color>,
    saved_fill: Option<Color>,
}

pub struct ZoneInteractionController {
    config: ZoneInteractionConfig,
    state: InteractionState,
    zones: HashMap<String, ZoneVisual>,
    label: Option<FloatingLabel>,
    zoom: ZoomTransition,
    free_view: ZoomTransform,
    viewport: Vec2,
    queued_focus: Option<String>,
}

impl ZoneInteractionController {
    pub fn new(config: ZoneInteractionConfig, viewport: Vec2, zones: Vec<ZoneSeed>) -> Self {
        let zones = zones
            .into_iter()
            .map(|seed| {
                (
                    seed.id,
                    ZoneVisual {
                        display_name: seed.display_name,
                        fill: Tween::settled(seed.fill),
                        saved_fill: None,
                    },
                )
            })
            .collect();

        Self {
            config,
            state: InteractionState::Idle,
            zones,
            label: None,
            zoom: ZoomTransition::settled(ZoomTransform::IDENTITY),
            free_view: ZoomTransform::IDENTITY,
            viewport,
            queued_focus: None,
        }
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn focused(&self) -> Option<&str> {
        match &self.state {
            InteractionState::Focused(id) => Some(id),
            _ => None,
        }
    }

    pub fn hovered(&self) -> Option<&str> {
        match &self.state {
            InteractionState::Hovering(id) => Some(id),
            _ => None,
        }
    }

    pub fn queued_focus(&self) -> Option<&str> {
        self.queued_focus.as_deref()
    }

    pub fn label(&self) -> Option<&FloatingLabel> {
        self.label.as_ref()
    }

    pub fn config(&self) -> &ZoneInteractionConfig {
        &self.config
    }

    pub fn fill(&self, zone_id: &str, now: f64) -> Option<Color> {
        self.zones.get(zone_id).map(|zone| zone.fill.value_at(now))
    }

    pub fn target_fill(&self, zone_id: &str) -> Option<Color> {
        self.zones.get(zone_id).map(|zone| *zone.fill.target())
    }

    pub fn saved_fill(&self, zone_id: &str) -> Option<Color> {
        self.zones.get(zone_id).and_then(|zone| zone.saved_fill)
    }

    pub fn is_highlighted(&self, zone_id: &str) -> bool {
        self.saved_fill(zone_id).is_some()
    }

    pub fn pointer_navigation_enabled(&self) -> bool {
        self.config.pointer_navigation
            && self.queued_focus.is_none()
            && !matches!(self.state, InteractionState::Focused(_))
    }

    pub fn transform(&self, now: f64) -> ZoomTransform {
        if self.zoom_settled_idle(now) {
            self.free_view
        } else {
            self.zoom.value_at(now)
        }
    }

    pub fn target_transform(&self) -> ZoomTransform {
        match self.state {
            InteractionState::Focused(_) => self.zoom.target(),
            _ => self.free_view,
        }
    }

    pub fn is_animating(&self, now: f64) -> bool {
        !self.zoom.is_finished(now)
            || self.queued_focus.is_some()
            || self.zones.values().any(|zone| !zone.fill.is_finished(now))
    }

    pub fn on_hover(&mut self, zone_id: &str, geometry: &dyn GeometryQuery, now: f64) -> bool {
        if self.queued_focus.is_some() {
            return false;
        }

        match &self.state {
            InteractionState::Focused(_) => return false,
            InteractionState::Hovering(current) if current == zone_id => return false,
            InteractionState::Hovering(current) => {
                let current = current.clone();
                self.on_unhover(&current, now);
            }
            InteractionState::Idle => {}
        }

        if !self.highlight(zone_id, geometry, now) {
            return false;
        }

        self.state = InteractionState::Hovering(zone_id.to_owned());
        true
    }

    pub fn on_unhover(&mut self, zone_id: &str, now: f64) -> bool {
        if self.hovered() != Some(zone_id) {
            return false;
        }

        self.restore(zone_id, now);
        self.state = InteractionState::Idle;
        true
    }

    pub fn on_click(
        &mut self,
        zone_id: &str,
        geometry: &dyn GeometryQuery,
        now: f64,
    ) -> Option<ZoneChange> {
        if let InteractionState::Focused(current) = &self.state {
            let current = current.clone();
            if self.config.direct_refocus
                && current != zone_id
                && self.zones.contains_key(zone_id)
                && geometry.zone_bounding_box(zone_id).is_some()
            {
                self.restore(&current, now);
                debug!(from = %current, to = %zone_id, "refocusing directly");
                return self.focus(zone_id, geometry, now);
            }
            self.unfocus(&current, now);
            if current != zone_id && self.zones.contains_key(zone_id) {
                debug!(from = %current, to = %zone_id, "queueing refocus after zoom-out");
                self.queued_focus = Some(zone_id.to_owned());
            }
            return Some(ZoneChange::Released(current));
        }

        if self.queued_focus.is_some() {
            if self.zones.contains_key(zone_id) {
                self.queued_focus = Some(zone_id.to_owned());
            }
            return None;
        }

        self.focus(zone_id, geometry, now)
    }

    /// Click outside every zone.
    pub fn release(&mut self, now: f64) -> Option<ZoneChange> {
        self.queued_focus = None;
        let InteractionState::Focused(current) = &self.state else {
            return None;
        };
        let current = current.clone();
        self.unfocus(&current, now);
        Some(ZoneChange::Released(current))
    }

    /// Completes a queued refocus once the previous zoom-out has finished.
    pub fn tick(&mut self, geometry: &dyn GeometryQuery, now: f64) -> Option<ZoneChange> {
        if !self.zoom.is_finished(now) {
            return None;
        }

        let next = self.queued_focus.take()?;
        self.focus(&next, geometry, now)
    }

    pub fn recolor(&mut self, zone_id: &str, color: Color, now: f64) {
        let fade = self.config.fade_duration;
        let highlight = self.config.highlight;
        let Some(zone) = self.zones.get_mut(zone_id) else {
            return;
        };

        if zone.saved_fill.is_some() {
            zone.saved_fill = Some(color);
            zone.fill.retarget(highlight.apply(color), now, fade);
        } else {
            zone.fill.retarget(color, now, fade);
        }
    }

    pub fn pointer_zoom(&mut self, factor: f32, anchor: Pos2, now: f64) {
        if !self.pointer_navigation_enabled() || !self.zoom.is_finished(now) {
            return;
        }
        self.free_view = self
            .free_view
            .scaled_around(factor, anchor, self.config.scale_extent);
    }

    pub fn pointer_pan(&mut self, delta: Vec2, now: f64) {
        if !self.pointer_navigation_enabled() || !self.zoom.is_finished(now) {
            return;
        }
        self.free_view = self.free_view.translated(delta);
    }

    pub fn reset_view(&mut self) {
        if self.pointer_navigation_enabled() {
            self.free_view = ZoomTransform::IDENTITY;
        }
    }

    pub fn resize(&mut self, viewport: Vec2, geometry: &dyn GeometryQuery) {
        if self.viewport == viewport {
            return;
        }
        self.viewport = viewport;

        if let InteractionState::Focused(id) = &self.state
            && let Some(bounds) = geometry.zone_bounding_box(id)
        {
            let target = self.focus_transform(bounds);
            self.zoom.jump_to(target);
        }
    }

    /// Zoom that centers `bounds` in the viewport, with dimensions floored so
    /// the scale stays finite for degenerate zones.
    pub fn focus_transform(&self, bounds: Rect) -> ZoomTransform {
        let min_dimension = self.config.min_zoom_dimension.max(f32::EPSILON);
        let zone_width = bounds.width().abs().max(min_dimension);
        let zone_height = bounds.height().abs().max(min_dimension);

        let k = (self.viewport.x / zone_width).min(self.viewport.y / zone_height)
            * self.config.zoom_fill_ratio;
        let center = bounds.center();

        ZoomTransform {
            x: self.viewport.x / 2.0 - center.x * k,
            y: self.viewport.y / 2.0 - center.y * k,
            k,
        }
    }

    fn zoom_settled_idle(&self, now: f64) -> bool {
        self.zoom.is_finished(now)
            && self.queued_focus.is_none()
            && !matches!(self.state, InteractionState::Focused(_))
    }

    fn focus(
        &mut self,
        zone_id: &str,
        geometry: &dyn GeometryQuery,
        now: f64,
    ) -> Option<ZoneChange> {
        let bounds = geometry.zone_bounding_box(zone_id)?;
        if !self.zones.contains_key(zone_id) {
            return None;
        }

        if let Some(current) = self.hovered().map(str::to_owned)
            && current != zone_id
        {
            self.restore(&current, now);
        }
        self.highlight(zone_id, geometry, now);

        let start = self.transform(now);
        self.zoom.jump_to(start);
        self.free_view = ZoomTransform::IDENTITY;

        let target = self.focus_transform(bounds);
        self.zoom
            .retarget(target, self.viewport, now, self.config.zoom_duration);
        self.state = InteractionState::Focused(zone_id.to_owned());
        debug!(zone = %zone_id, scale = target.k, "focused zone");

        Some(ZoneChange::Focused(zone_id.to_owned()))
    }

    fn unfocus(&mut self, zone_id: &str, now: f64) {
        self.zoom.retarget(
            ZoomTransform::IDENTITY,
            self.viewport,
            now,
            self.config.zoom_duration,
        );
        self.free_view = ZoomTransform::IDENTITY;
        self.restore(zone_id, now);
        self.state = InteractionState::Idle;
    }

    fn highlight(&mut self, zone_id: &str, geometry: &dyn GeometryQuery, now: f64) -> bool {
        let fade = self.config.fade_duration;
        let style = self.config.highlight;
        let Some(zone) = self.zones.get_mut(zone_id) else {
            return false;
        };

        if zone.saved_fill.is_none() {
            let prior = *zone.fill.target();
            zone.saved_fill = Some(prior);
            zone.fill.retarget(style.apply(prior), now, fade);
        }

        let text = zone.display_name.clone();
        self.label = geometry.zone_bounding_box(zone_id).map(|bounds| {
            let center = bounds.center();
            let position = geometry
                .invert_project(center)
                .and_then(|data_point| geometry.project(data_point))
                .unwrap_or(center);
            FloatingLabel {
                zone_id: zone_id.to_owned(),
                text,
                position,
            }
        });
        true
    }

    fn restore(&mut self, zone_id: &str, now: f64) {
        let fade = self.config.fade_duration;
        if let Some(zone) = self.zones.get_mut(zone_id)
            && let Some(saved) = zone.saved_fill.take()
        {
            zone.fill.retarget(saved, now, fade);
        }

        if self
            .label
            .as_ref()
            .is_some_and(|label| label.zone_id == zone_id)
        {
            self.label = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::{pos2, vec2};

    use super::*;

    struct Boxes(HashMap<String, Rect>);

    impl GeometryQuery for Boxes {
        fn project(&self, point: Pos2) -> Option<Pos2> {
            Some(point)
        }

        fn invert_project(&self, point: Pos2) -> Option<Pos2> {
            Some(point)
        }

        fn current_node_position(&self, _node_id: &str) -> Option<Pos2> {
            None
        }

        fn zone_bounding_box(&self, zone_id: &str) -> Option<Rect> {
            self.0.get(zone_id).copied()
        }
    }

    fn fixture() -> (ZoneInteractionController, Boxes) {
        let seeds = vec![
            ZoneSeed {
                id: "bourg".to_owned(),
                display_name: "Bourg".to_owned(),
                fill: Color::rgb(100, 40, 20),
            },
            ZoneSeed {
                id: "ouchy".to_owned(),
                display_name: "Ouchy".to_owned(),
                fill: Color::GRAY,
            },
        ];
        let boxes = Boxes(HashMap::from([
            (
                "bourg".to_owned(),
                Rect::from_min_max(pos2(100.0, 100.0), pos2(300.0, 200.0)),
            ),
            (
                "ouchy".to_owned(),
                Rect::from_min_max(pos2(500.0, 400.0), pos2(500.0, 400.0)),
            ),
        ]));
        let controller = ZoneInteractionController::new(
            ZoneInteractionConfig::default(),
            vec2(800.0, 600.0),
            seeds,
        );
        (controller, boxes)
    }

    #[test]
    fn hover_then_unhover_restores_exact_color() {
        let (mut controller, boxes) = fixture();
        let original = controller.target_fill("bourg").unwrap();

        for round in 0..5 {
            let now = round as f64 * 0.05;
            assert!(controller.on_hover("bourg", &boxes, now));
            assert_eq!(controller.target_fill("bourg"), Some(original.lighten(1.25)));
            assert!(controller.on_unhover("bourg", now + 0.01));
        }

        assert_eq!(controller.target_fill("bourg"), Some(original));
        assert_eq!(controller.fill("bourg", 10.0), Some(original));
        assert_eq!(controller.state(), &InteractionState::Idle);
        assert!(controller.label().is_none());
    }

    #[test]
    fn hover_places_label_at_box_center() {
        let (mut controller, boxes) = fixture();
        controller.on_hover("bourg", &boxes, 0.0);
        let label = controller.label().unwrap();
        assert_eq!(label.text, "Bourg");
        assert_eq!(label.position, pos2(200.0, 150.0));
    }

    #[test]
    fn hover_is_ignored_while_focused() {
        let (mut controller, boxes) = fixture();
        controller.on_click("bourg", &boxes, 0.0);
        assert!(!controller.on_hover("ouchy", &boxes, 0.1));
        assert!(!controller.on_unhover("bourg", 0.2));
        assert_eq!(controller.focused(), Some("bourg"));
    }

    #[test]
    fn focus_scale_uses_fill_ratio_and_centers_zone() {
        let (mut controller, boxes) = fixture();
        controller.on_click("bourg", &boxes, 0.0);
        let target = controller.target_transform();
        let expected_k = (800.0_f32 / 200.0).min(600.0 / 100.0) * 0.7;
        assert!((target.k - expected_k).abs() < 1e-5);
        let center = target.apply(pos2(200.0, 150.0));
        assert!((center - pos2(400.0, 300.0)).length() < 1e-3);
        assert!(!controller.pointer_navigation_enabled());
    }

    #[test]
    fn degenerate_zone_gets_finite_positive_scale() {
        let (mut controller, boxes) = fixture();
        controller.on_click("ouchy", &boxes, 0.0);
        let k = controller.target_transform().k;
        assert!(k.is_finite() && k > 0.0);
        assert!((k - 6.0 * 0.7).abs() < 1e-5);
    }

    #[test]
    fn second_click_resolves_before_refocusing() {
        let (mut controller, boxes) = fixture();
        controller.on_click("bourg", &boxes, 0.0);
        let change = controller.on_click("ouchy", &boxes, 1.0);

        assert_eq!(change, Some(ZoneChange::Released("bourg".to_owned())));
        assert_eq!(controller.state(), &InteractionState::Idle);
        assert_eq!(controller.queued_focus(), Some("ouchy"));
        assert!(controller.tick(&boxes, 1.2).is_none());

        let change = controller.tick(&boxes, 1.0 + 0.75);
        assert_eq!(change, Some(ZoneChange::Focused("ouchy".to_owned())));
        assert_eq!(controller.focused(), Some("ouchy"));
        assert!(!controller.is_highlighted("bourg"));
    }

    #[test]
    fn direct_refocus_interpolates_from_the_current_view() {
        let (_, boxes) = fixture();
        let mut controller = ZoneInteractionController::new(
            ZoneInteractionConfig {
                direct_refocus: true,
                ..ZoneInteractionConfig::default()
            },
            vec2(800.0, 600.0),
            vec![
                ZoneSeed {
                    id: "bourg".to_owned(),
                    display_name: "Bourg".to_owned(),
                    fill: Color::GRAY,
                },
                ZoneSeed {
                    id: "ouchy".to_owned(),
                    display_name: "Ouchy".to_owned(),
                    fill: Color::GRAY,
                },
            ],
        );
        controller.on_click("bourg", &boxes, 0.0);
        let bourg_view = controller.transform(1.0);

        let change = controller.on_click("ouchy", &boxes, 1.0);
        assert_eq!(change, Some(ZoneChange::Focused("ouchy".to_owned())));
        assert_eq!(controller.focused(), Some("ouchy"));
        assert_eq!(controller.queued_focus(), None);
        assert!(!controller.is_highlighted("bourg"));
        assert!(controller.is_highlighted("ouchy"));

        let start = controller.transform(1.0);
        assert!((start.k - bourg_view.k).abs() < 1e-4);
        let expected = controller.focus_transform(boxes.0["ouchy"]);
        let settled = controller.transform(1.0 + 5.0);
        assert!((settled.k - expected.k).abs() < 1e-4);
        assert!((settled.x - expected.x).abs() < 1e-2);

        assert_eq!(
            controller.on_click("ouchy", &boxes, 7.0),
            Some(ZoneChange::Released("ouchy".to_owned()))
        );
        assert!(controller.target_transform().is_identity());
    }

    #[test]
    fn recolor_while_hovered_updates_restore_target() {
        let (mut controller, boxes) = fixture();
        controller.on_hover("bourg", &boxes, 0.0);
        controller.recolor("bourg", Color::rgb(0, 0, 200), 0.1);
        controller.on_unhover("bourg", 0.2);
        assert_eq!(controller.target_fill("bourg"), Some(Color::rgb(0, 0, 200)));
    }

    #[test]
    fn pointer_navigation_is_clamped_to_scale_extent() {
        let (mut controller, _boxes) = fixture();
        controller.pointer_zoom(100.0, pos2(400.0, 300.0), 0.0);
        assert_eq!(controller.transform(0.0).k, 8.0);
        controller.pointer_zoom(0.001, pos2(400.0, 300.0), 0.0);
        assert_eq!(controller.transform(0.0).k, 1.0);
    }
}
