use eframe::egui::{self, Align2, Color32, FontId, Rect, Sense, Stroke, Ui, Vec2, pos2};
use storymap::config::{PackingConfig, StoryConfig};
use storymap::data::Dataset;
use storymap::data::hierarchy::HierarchyNode;
use storymap::interaction::color::Color;
use storymap::interaction::zone::{ZoneInteractionConfig, ZoneInteractionController, ZoneSeed};
use storymap::layout::LayoutAdapter;
use storymap::layout::packing::{PackedHierarchy, pack, packing_size};

use super::render_utils::{sqrt_scale, text_color_for, to_base, to_screen};

pub(super) struct PackingView {
    tree: Dataset<HierarchyNode>,
    config: PackingConfig,
    interaction: ZoneInteractionConfig,
    packed: PackedHierarchy,
    adapter: LayoutAdapter,
    controller: Option<ZoneInteractionController>,
    viewport: Vec2,
    hovered_circle: Option<String>,
}

impl PackingView {
    pub(super) fn new(tree: Dataset<HierarchyNode>, config: &StoryConfig) -> Self {
        Self {
            tree,
            config: config.packing.clone(),
            interaction: config.packing_interaction(),
            packed: PackedHierarchy::default(),
            adapter: LayoutAdapter::default(),
            controller: None,
            viewport: Vec2::ZERO,
            hovered_circle: None,
        }
    }

    pub(super) fn unavailable_reason(&self) -> Option<&str> {
        match &self.tree {
            Dataset::Ready(_) => None,
            Dataset::Unavailable(reason) => Some(reason.as_str()),
        }
    }

    pub(super) fn leaf_count(&self) -> usize {
        self.tree.ready().map_or(0, HierarchyNode::leaf_count)
    }

    pub(super) fn focused_name(&self) -> Option<&str> {
        let id = self.controller.as_ref()?.focused()?;
        self.packed.find(id).map(|circle| circle.name.as_str())
    }

    pub(super) fn description(&self) -> &str {
        self.focused_name()
            .and_then(|name| self.config.description(name))
            .unwrap_or(&self.config.default_text)
    }

    pub(super) fn focused_children(&self) -> Vec<(&str, f64)> {
        let focus = self.focus_index();
        self.packed
            .get(focus)
            .map(|circle| {
                circle
                    .children
                    .iter()
                    .filter_map(|&child| self.packed.get(child))
                    .map(|child| (child.name.as_str(), child.value))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn focus_index(&self) -> usize {
        self.controller
            .as_ref()
            .and_then(ZoneInteractionController::focused)
            .and_then(|id| id.parse().ok())
            .unwrap_or(0)
    }

    fn fill_for(&self, depth: usize, leaf: bool) -> Color {
        if leaf {
            return Color::WHITE;
        }
        let t = depth as f64 / self.config.color_depth.max(1.0);
        self.config.background.lerp(self.config.deep_color, t as f32)
    }

    fn ensure_viewport(&mut self, size: Vec2) {
        if self.viewport == size {
            return;
        }
        self.viewport = size;

        let Some(tree) = self.tree.ready() else {
            return;
        };
        self.packed = pack(
            tree,
            pos2(size.x / 2.0, size.y / 2.0),
            packing_size(size),
            self.config.padding,
        );
        self.adapter = LayoutAdapter::for_packing(&self.packed);

        if let Some(controller) = self.controller.as_mut() {
            controller.resize(size, &self.adapter);
            return;
        }

        let seeds = self
            .packed
            .circles
            .iter()
            .map(|circle| ZoneSeed {
                id: circle.id.clone(),
                display_name: circle.name.clone(),
                fill: self.fill_for(circle.depth, circle.is_leaf()),
            })
            .collect();
        self.controller = Some(ZoneInteractionController::new(
            self.interaction.clone(),
            size,
            seeds,
        ));
    }

    fn handle_pointer(&mut self, rect: Rect, response: &egui::Response, now: f64) {
        let Some(transform) = self.controller.as_ref().map(|controller| controller.transform(now)) else {
            return;
        };
        let hit = response
            .hover_pos()
            .map(|pointer| to_base(rect, transform, pointer))
            .and_then(|base| self.packed.hit(base))
            .map(|circle| circle.id.clone());
        let Some(controller) = self.controller.as_mut() else {
            return;
        };

        if hit != self.hovered_circle {
            if let Some(previous) = self.hovered_circle.take() {
                controller.on_unhover(&previous, now);
            }
            if let Some(current) = &hit {
                controller.on_hover(current, &self.adapter, now);
            }
            self.hovered_circle = hit.clone();
        }

        if response.clicked() {
            match &hit {
                Some(circle_id) => {
                    controller.on_click(circle_id, &self.adapter, now);
                }
                None => {
                    controller.release(now);
                }
            }
        }
    }

    pub(super) fn draw(&mut self, ui: &mut Ui, now: f64) {
        if let Some(reason) = self.unavailable_reason() {
            let reason = reason.to_owned();
            ui.vertical_centered(|ui| {
                ui.add_space(80.0);
                ui.heading("Packing data unavailable");
                ui.label(reason);
            });
            return;
        }

        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click());
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, self.config.background.to_color32());

        self.ensure_viewport(rect.size());
        if let Some(controller) = self.controller.as_mut() {
            controller.tick(&self.adapter, now);
        }
        self.handle_pointer(rect, &response, now);

        let Some(controller) = self.controller.as_ref() else {
            return;
        };
        let transform = controller.transform(now);
        let focus = self.focus_index();

        for circle in &self.packed.circles {
            let center = to_screen(rect, transform, circle.center);
            let radius = circle.radius * transform.k;
            let fill = controller
                .fill(&circle.id, now)
                .unwrap_or_else(|| self.fill_for(circle.depth, circle.is_leaf()))
                .to_color32();
            let stroke = if controller.is_highlighted(&circle.id) {
                Stroke::new(1.5, Color32::BLACK)
            } else {
                Stroke::NONE
            };
            painter.circle(center, radius, fill, stroke);
        }

        let radius_extent = self.packed.radius_extent().unwrap_or((1.0, 1.0));
        for circle in &self.packed.circles {
            if circle.parent != Some(focus) {
                continue;
            }
            let center = to_screen(rect, transform, circle.center);
            let font_size = sqrt_scale(
                circle.radius * transform.k,
                radius_extent,
                (self.config.min_font_size, self.config.max_font_size),
            );
            let fill = controller
                .fill(&circle.id, now)
                .unwrap_or(Color::WHITE)
                .to_color32();
            painter.text(
                center,
                Align2::CENTER_CENTER,
                &circle.name,
                FontId::proportional(font_size.min(circle.radius * transform.k).max(1.0)),
                text_color_for(fill),
            );
        }

        if controller.is_animating(now) {
            ui.ctx().request_repaint();
        }
    }
}
