use std::collections::HashMap;

use tracing::debug;

use super::SelectionContext;
use super::color::Color;
use super::transition::Tween;
use crate::config::SankeyConfig;
use crate::data::sankey::FlowGraph;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SankeyHover {
    Node(usize),
    Link(usize),
}

/// Hover state of a sankey chart: the hovered band brightens, leaving it
/// restores every band, and the hovered node's flows feed the bar plot.
pub struct SankeyController {
    config: SankeyConfig,
    link_opacity: Vec<Tween<f32>>,
    hovered: Option<SankeyHover>,
}

impl SankeyController {
    pub fn new(config: SankeyConfig, graph: &FlowGraph) -> Self {
        Self {
            link_opacity: vec![Tween::settled(config.link_opacity); graph.flows.len()],
            config,
            hovered: None,
        }
    }

    pub fn hovered(&self) -> Option<SankeyHover> {
        self.hovered
    }

    pub fn link_opacity(&self, index: usize, now: f64) -> f32 {
        self.link_opacity
            .get(index)
            .map_or(self.config.link_opacity, |tween| tween.value_at(now))
    }

    pub fn node_color(&self, graph: &FlowGraph, node: usize) -> Color {
        graph
            .nodes
            .get(node)
            .map_or(self.config.fallback_color, |node| self.config.group_color(&node.group))
    }

    /// Bands take the color of their source node.
    pub fn link_color(&self, graph: &FlowGraph, link: usize) -> Color {
        graph
            .flows
            .get(link)
            .map_or(self.config.fallback_color, |flow| self.node_color(graph, flow.source))
    }

    /// Node id to color, for the bar plot.
    pub fn palette(&self, graph: &FlowGraph) -> HashMap<String, Color> {
        (0..graph.nodes.len())
            .map(|index| (graph.nodes[index].id.clone(), self.node_color(graph, index)))
            .collect()
    }

    pub fn is_animating(&self, now: f64) -> bool {
        self.link_opacity.iter().any(|tween| !tween.is_finished(now))
    }

    /// Returns the new bar plot input when the hover target changed:
    /// `Some(None)` means the bar plot should be cleared.
    pub fn on_hover(
        &mut self,
        graph: &FlowGraph,
        hovered: Option<SankeyHover>,
        now: f64,
    ) -> Option<Option<SelectionContext>> {
        if hovered == self.hovered {
            return None;
        }
        debug!(?hovered, "sankey hover");
        self.hovered = hovered;

        let duration = self.config.fade_duration();
        let bright = match hovered {
            Some(SankeyHover::Link(index)) => Some(index),
            _ => None,
        };
        for (index, tween) in self.link_opacity.iter_mut().enumerate() {
            let target = if bright == Some(index) {
                self.config.hovered_link_opacity
            } else {
                self.config.link_opacity
            };
            tween.retarget(target, now, duration);
        }

        Some(match hovered {
            Some(SankeyHover::Node(node)) => flow_context(graph, node, None),
            Some(SankeyHover::Link(link)) => graph
                .flows
                .get(link)
                .and_then(|flow| flow_context(graph, flow.source, Some(flow.target))),
            None => None,
        })
    }
}

/// Flows leaving `node` keyed by target id, or the flows reaching it when
/// it is a sink. `emphasised` names the counterpart node to select.
pub fn flow_context(graph: &FlowGraph, node: usize, emphasised: Option<usize>) -> Option<SelectionContext> {
    let outgoing = graph
        .outgoing(node)
        .map(|flow| (flow.target, flow.value))
        .collect::<Vec<_>>();
    let flows = if outgoing.is_empty() {
        graph
            .incoming(node)
            .map(|flow| (flow.source, flow.value))
            .collect::<Vec<_>>()
    } else {
        outgoing
    };
    if flows.is_empty() {
        return None;
    }

    let mut totals: Vec<(String, f64)> = Vec::new();
    for (counterpart, value) in flows {
        let id = &graph.nodes[counterpart].id;
        match totals.iter_mut().find(|(label, _)| label == id) {
            Some((_, total)) => *total += value,
            None => totals.push((id.clone(), value)),
        }
    }

    let selected = emphasised.and_then(|index| graph.nodes.get(index)).map(|node| node.id.clone());
    Some(SelectionContext::new(totals, selected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sankey::parse_flows;

    const FLOWS: &str = r#"[
        {"source": "bourg 1798", "target": "commerce", "value": 12},
        {"source": "bourg 1798", "target": "rente", "value": 4},
        {"source": "bourg 1798", "target": "rente", "value": 1},
        {"source": "palud 1798", "target": "commerce", "value": 4}
    ]"#;

    #[test]
    fn hovering_a_band_brightens_only_that_band() {
        let graph = parse_flows(FLOWS).unwrap();
        let config = SankeyConfig::default();
        let mut controller = SankeyController::new(config.clone(), &graph);

        controller.on_hover(&graph, Some(SankeyHover::Link(1)), 0.0);
        let settled = config.fade_duration();
        assert_eq!(controller.link_opacity(1, settled), 0.8);
        assert_eq!(controller.link_opacity(0, settled), 0.5);
        assert!(controller.is_animating(settled / 2.0));

        controller.on_hover(&graph, None, 1.0);
        assert_eq!(controller.link_opacity(1, 1.0 + settled), 0.5);
        assert!(!controller.is_animating(1.0 + settled));
    }

    #[test]
    fn band_hover_feeds_the_source_flows_with_the_target_selected() {
        let graph = parse_flows(FLOWS).unwrap();
        let mut controller = SankeyController::new(SankeyConfig::default(), &graph);

        let context = controller
            .on_hover(&graph, Some(SankeyHover::Link(1)), 0.0)
            .flatten()
            .unwrap();
        assert_eq!(
            context.values,
            [("commerce".to_owned(), 12.0), ("rente".to_owned(), 5.0)]
        );
        assert_eq!(context.selected.as_deref(), Some("rente"));

        assert_eq!(controller.on_hover(&graph, Some(SankeyHover::Link(1)), 0.1), None);
        assert_eq!(controller.on_hover(&graph, None, 0.2), Some(None));
    }

    #[test]
    fn sinks_report_their_inflows() {
        let graph = parse_flows(FLOWS).unwrap();
        let commerce = graph.index_of("commerce").unwrap();
        let context = flow_context(&graph, commerce, None).unwrap();
        assert_eq!(
            context.values,
            [("bourg 1798".to_owned(), 12.0), ("palud 1798".to_owned(), 4.0)]
        );
        assert_eq!(context.selected, None);
    }

    #[test]
    fn colors_follow_the_node_group() {
        let graph = parse_flows(FLOWS).unwrap();
        let controller = SankeyController::new(SankeyConfig::default(), &graph);
        assert_eq!(controller.node_color(&graph, 0), Color::rgb(0x20, 0x81, 0xC3));
        assert_eq!(controller.link_color(&graph, 3), Color::rgb(0xF4, 0xB8, 0x60));
        let rente = graph.index_of("rente").unwrap();
        assert_eq!(controller.node_color(&graph, rente), Color::rgb(0xAA, 0xAA, 0xAA));
        assert_eq!(controller.palette(&graph).len(), 4);
    }
}
