use eframe::egui::{
    Align2, Color32, FontId, Pos2, Rect, Sense, Shape, Stroke, StrokeKind, Ui, Vec2, pos2, vec2,
};
use storymap::config::{SankeyConfig, StoryConfig};
use storymap::data::Dataset;
use storymap::data::sankey::FlowGraph;
use storymap::interaction::barplot::BarPlotUpdater;
use storymap::interaction::sankey::{SankeyController, SankeyHover};
use storymap::layout::sankey::{SankeyLayout, SankeyParams, layout};
use tracing::warn;

const CURVE_SEGMENTS: usize = 24;

pub(super) struct SankeyView {
    graph: Dataset<FlowGraph>,
    config: SankeyConfig,
    controller: Option<SankeyController>,
    layout: Result<SankeyLayout, String>,
    side: f32,
    pub(super) barplot: BarPlotUpdater,
}

impl SankeyView {
    pub(super) fn new(graph: Dataset<FlowGraph>, config: &StoryConfig) -> Self {
        let controller = graph
            .ready()
            .map(|graph| SankeyController::new(config.sankey.clone(), graph));
        let palette = match (graph.ready(), controller.as_ref()) {
            (Some(graph), Some(controller)) => controller.palette(graph),
            _ => Default::default(),
        };

        Self {
            graph,
            config: config.sankey.clone(),
            controller,
            layout: Ok(SankeyLayout::default()),
            side: 0.0,
            barplot: BarPlotUpdater::new(config.barplot(), Vec2::new(300.0, 160.0), palette),
        }
    }

    pub(super) fn unavailable_reason(&self) -> Option<&str> {
        match &self.graph {
            Dataset::Ready(_) => self.layout.as_ref().err().map(String::as_str),
            Dataset::Unavailable(reason) => Some(reason.as_str()),
        }
    }

    pub(super) fn node_count(&self) -> usize {
        self.graph.ready().map_or(0, |graph| graph.nodes.len())
    }

    pub(super) fn flow_count(&self) -> usize {
        self.graph.ready().map_or(0, |graph| graph.flows.len())
    }

    pub(super) fn group_legend(&self) -> Vec<(String, Color32)> {
        let Some(graph) = self.graph.ready() else {
            return Vec::new();
        };
        let mut legend: Vec<(String, Color32)> = Vec::new();
        for node in &graph.nodes {
            if !legend.iter().any(|(group, _)| *group == node.group) {
                legend.push((node.group.clone(), self.config.group_color(&node.group).to_color32()));
            }
        }
        legend
    }

    pub(super) fn hovered_text(&self) -> Option<String> {
        let graph = self.graph.ready()?;
        let layout = self.layout.as_ref().ok()?;
        match self.controller.as_ref()?.hovered()? {
            SankeyHover::Node(index) => {
                let node = graph.nodes.get(index)?;
                let value = layout.nodes.get(index)?.value;
                Some(format!("{}\n{value:.0}", node.id))
            }
            SankeyHover::Link(index) => {
                let flow = graph.flows.get(index)?;
                Some(format!(
                    "{} \u{2192} {}\n{:.0}",
                    graph.nodes[flow.source].id, graph.nodes[flow.target].id, flow.value
                ))
            }
        }
    }

    fn ensure_layout(&mut self, side: f32) {
        if self.side == side {
            return;
        }
        self.side = side;
        let Some(graph) = self.graph.ready() else {
            return;
        };
        let params = SankeyParams {
            node_width: self.config.node_width,
            node_padding: self.config.node_padding,
            extent: Rect::from_min_max(
                pos2(self.config.margin_x, self.config.margin_y),
                pos2(side - self.config.margin_x, side - self.config.margin_y),
            ),
        };
        self.layout = layout(graph, &params).map_err(|error| {
            let message = format!("{error:#}");
            warn!(error = %message, "sankey layout failed");
            message
        });
    }

    fn handle_pointer(&mut self, origin: Pos2, pointer: Option<Pos2>, now: f64) {
        let (Some(graph), Some(controller), Ok(layout)) =
            (self.graph.ready(), self.controller.as_mut(), self.layout.as_ref())
        else {
            return;
        };
        let hovered = pointer.map(|pointer| Pos2::ZERO + (pointer - origin)).and_then(|local| {
            layout
                .node_at(local)
                .map(SankeyHover::Node)
                .or_else(|| layout.link_at(local).map(SankeyHover::Link))
        });

        match controller.on_hover(graph, hovered, now) {
            Some(Some(selection)) => {
                self.barplot
                    .update(&selection.values, selection.selected.as_deref(), now);
            }
            Some(None) => self.barplot.clear(now),
            None => {}
        }
    }

    pub(super) fn draw(&mut self, ui: &mut Ui, now: f64) {
        if let Dataset::Unavailable(reason) = &self.graph {
            let reason = reason.clone();
            ui.vertical_centered(|ui| {
                ui.add_space(80.0);
                ui.heading("Flow data unavailable");
                ui.label(reason);
            });
            return;
        }

        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::hover());
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, Color32::from_rgb(250, 250, 248));

        let side = rect.width().min(rect.height()).floor();
        self.ensure_layout(side);
        if let Err(reason) = &self.layout {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                reason,
                FontId::proportional(14.0),
                Color32::from_gray(60),
            );
            return;
        }

        let origin = rect.center() - vec2(side, side) / 2.0;
        self.handle_pointer(origin, response.hover_pos(), now);

        let (Some(graph), Some(controller), Ok(layout)) =
            (self.graph.ready(), self.controller.as_ref(), self.layout.as_ref())
        else {
            return;
        };

        for index in 0..layout.links.len() {
            let Some(curve) = layout.link_curve(index) else {
                continue;
            };
            let points = sample_cubic(curve.map(|point| origin + point.to_vec2()));
            let color = controller
                .link_color(graph, index)
                .with_opacity(controller.link_opacity(index, now));
            let width = layout.links[index].width.max(1.0);
            painter.add(Shape::line(points, Stroke::new(width, color)));
        }

        let node_stroke = Stroke::new(
            1.5,
            Color32::from_black_alpha((self.config.node_stroke_opacity * 255.0) as u8),
        );
        for (index, node) in layout.nodes.iter().enumerate() {
            let node_rect = node.rect().translate(origin.to_vec2());
            painter.rect_filled(node_rect, 0.0, controller.node_color(graph, index).to_color32());
            painter.rect_stroke(node_rect, 0.0, node_stroke, StrokeKind::Middle);

            let (anchor, align) = if node.x0 < side / 2.0 {
                (pos2(node_rect.right() + self.config.label_padding, node_rect.center().y), Align2::LEFT_CENTER)
            } else {
                (pos2(node_rect.left() - self.config.label_padding, node_rect.center().y), Align2::RIGHT_CENTER)
            };
            painter.text(
                anchor,
                align,
                &graph.nodes[index].id,
                FontId::proportional(10.0),
                Color32::from_gray(30),
            );
        }

        if let Some(text) = self.hovered_text() {
            painter.text(
                rect.left_top() + vec2(8.0, 8.0),
                Align2::LEFT_TOP,
                text,
                FontId::proportional(12.0),
                Color32::from_gray(20),
            );
        }

        if controller.is_animating(now) || self.barplot.is_animating(now) {
            ui.ctx().request_repaint();
        }
    }
}

fn sample_cubic([p0, p1, p2, p3]: [Pos2; 4]) -> Vec<Pos2> {
    (0..=CURVE_SEGMENTS)
        .map(|step| {
            let t = step as f32 / CURVE_SEGMENTS as f32;
            let u = 1.0 - t;
            let a = u * u * u;
            let b = 3.0 * u * u * t;
            let c = 3.0 * u * t * t;
            let d = t * t * t;
            pos2(
                a * p0.x + b * p1.x + c * p2.x + d * p3.x,
                a * p0.y + b * p1.y + c * p2.y + d * p3.y,
            )
        })
        .collect()
}
