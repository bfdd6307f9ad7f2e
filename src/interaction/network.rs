use std::collections::{HashMap, HashSet};

use eframe::egui::Pos2;
use tracing::debug;

use super::SelectionContext;
use super::scale::rescale;
use super::transition::{Lerp, Tween};
use crate::data::network::NetworkGraph;
use crate::layout::simulation::ForceSimulation;

/// Undirected neighbor lists, built once per dataset.
#[derive(Clone, Debug, Default)]
pub struct AdjacencyIndex {
    index_by_id: HashMap<String, usize>,
    neighbors: Vec<Vec<usize>>,
}

impl AdjacencyIndex {
    pub fn new(graph: &NetworkGraph) -> Self {
        let mut neighbors = vec![Vec::new(); graph.nodes.len()];
        for link in &graph.links {
            neighbors[link.source].push(link.target);
            neighbors[link.target].push(link.source);
        }
        for list in &mut neighbors {
            list.sort_unstable();
            list.dedup();
        }

        Self {
            index_by_id: graph
                .nodes
                .iter()
                .enumerate()
                .map(|(index, node)| (node.id.clone(), index))
                .collect(),
            neighbors,
        }
    }

    pub fn index_of(&self, node_id: &str) -> Option<usize> {
        self.index_by_id.get(node_id).copied()
    }

    pub fn neighbors(&self, index: usize) -> &[usize] {
        self.neighbors.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_connected_index(&self, a: usize, b: usize) -> bool {
        a == b || self.neighbors(a).binary_search(&b).is_ok()
    }

    /// True when `a` and `b` share a link in either direction, or are the same node.
    pub fn is_connected(&self, a: &str, b: &str) -> bool {
        if a == b {
            return true;
        }
        match (self.index_of(a), self.index_of(b)) {
            (Some(a), Some(b)) => self.is_connected_index(a, b),
            _ => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NetworkHighlightConfig {
    pub transparency: f32,
    pub node_size_inc: f32,
    pub label_size_add: f32,
    pub label_size_inc: f32,
    pub min_node_size: f32,
    pub max_node_size: f32,
    pub transition_duration: f64,
    pub drag_alpha_target: f32,
}

impl Default for NetworkHighlightConfig {
    fn default() -> Self {
        Self {
            transparency: 0.1,
            node_size_inc: 5.0,
            label_size_add: 5.0,
            label_size_inc: 5.0,
            min_node_size: 7.0,
            max_node_size: 40.0,
            transition_duration: 0.2,
            drag_alpha_target: 0.3,
        }
    }
}

/// Rendered state of one node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeVisual {
    pub radius: f32,
    pub fill_opacity: f32,
    pub label_size: f32,
    pub label_opacity: f32,
}

impl Lerp for NodeVisual {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        Self {
            radius: self.radius.lerp(&other.radius, t),
            fill_opacity: self.fill_opacity.lerp(&other.fill_opacity, t),
            label_size: self.label_size.lerp(&other.label_size, t),
            label_opacity: self.label_opacity.lerp(&other.label_opacity, t),
        }
    }
}

struct LinkState {
    source: usize,
    target: usize,
    weight: f32,
    opacity: Tween<f32>,
}

/// Neighbor emphasis and drag protocol for one network view.
pub struct NetworkHighlightController {
    config: NetworkHighlightConfig,
    adjacency: AdjacencyIndex,
    ids: Vec<String>,
    kinds: Vec<String>,
    static_sizes: Vec<f32>,
    nodes: Vec<Tween<NodeVisual>>,
    links: Vec<LinkState>,
    hovered: Option<usize>,
    dragging: Option<usize>,
}

impl NetworkHighlightController {
    pub fn new(config: NetworkHighlightConfig, graph: &NetworkGraph) -> Self {
        let static_sizes = graph.node_sizes();
        let nodes = static_sizes
            .iter()
            .map(|&size| Tween::settled(resting_visual(size, &config)))
            .collect();
        let links = graph
            .links
            .iter()
            .map(|link| LinkState {
                source: link.source,
                target: link.target,
                weight: link.weight,
                opacity: Tween::settled(1.0),
            })
            .collect();

        Self {
            config,
            adjacency: AdjacencyIndex::new(graph),
            ids: graph.nodes.iter().map(|node| node.id.clone()).collect(),
            kinds: graph.nodes.iter().map(|node| node.kind.clone()).collect(),
            static_sizes,
            nodes,
            links,
            hovered: None,
            dragging: None,
        }
    }

    pub fn config(&self) -> &NetworkHighlightConfig {
        &self.config
    }

    pub fn adjacency(&self) -> &AdjacencyIndex {
        &self.adjacency
    }

    pub fn is_connected(&self, a: &str, b: &str) -> bool {
        self.adjacency.is_connected(a, b)
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.map(|index| self.ids[index].as_str())
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging.is_some()
    }

    pub fn dragged(&self) -> Option<&str> {
        self.dragging.map(|index| self.ids[index].as_str())
    }

    pub fn node_visual(&self, index: usize, now: f64) -> Option<NodeVisual> {
        self.nodes.get(index).map(|tween| tween.value_at(now))
    }

    pub fn target_node_visual(&self, index: usize) -> Option<NodeVisual> {
        self.nodes.get(index).map(|tween| *tween.target())
    }

    pub fn link_opacity(&self, index: usize, now: f64) -> Option<f32> {
        self.links.get(index).map(|link| link.opacity.value_at(now))
    }

    pub fn target_link_opacity(&self, index: usize) -> Option<f32> {
        self.links.get(index).map(|link| *link.opacity.target())
    }

    pub fn is_animating(&self, now: f64) -> bool {
        self.nodes.iter().any(|tween| !tween.is_finished(now))
            || self.links.iter().any(|link| !link.opacity.is_finished(now))
    }

    /// Emphasises the hovered node and its neighbors. Returns the neighbor
    /// counts per node kind for the bar plot.
    pub fn on_hover(&mut self, node_id: &str, now: f64) -> Option<SelectionContext> {
        if self.dragging.is_some() {
            return None;
        }
        let hovered = self.adjacency.index_of(node_id)?;
        self.hovered = Some(hovered);
        self.emphasise(hovered, now);

        debug!(node = node_id, neighbors = self.adjacency.neighbors(hovered).len(), "hovered node");
        Some(self.selection_context(hovered))
    }

    pub fn on_unhover(&mut self, node_id: &str, now: f64) -> bool {
        if self.dragging.is_some() || self.hovered() != Some(node_id) {
            return false;
        }
        self.hovered = None;
        self.rest(now);
        true
    }

    /// Pins the node under the pointer and keeps the simulation warm.
    pub fn drag_start(&mut self, node_id: &str, pointer: Pos2, simulation: &mut ForceSimulation) -> bool {
        let Some(index) = self.adjacency.index_of(node_id) else {
            return false;
        };
        self.dragging = Some(index);
        simulation.set_alpha_target(self.config.drag_alpha_target);
        simulation.pin(index, pointer);
        debug!(node = node_id, "drag started");
        true
    }

    pub fn drag_move(&mut self, pointer: Pos2, simulation: &mut ForceSimulation) {
        if let Some(index) = self.dragging {
            simulation.pin(index, pointer);
        }
    }

    pub fn drag_end(&mut self, simulation: &mut ForceSimulation) {
        let Some(index) = self.dragging.take() else {
            return;
        };
        simulation.set_alpha_target(0.0);
        simulation.unpin(index);
        debug!(node = %self.ids[index], "drag ended");
    }

    /// Picks up new presentation sizes after the graph was rescaled.
    pub fn set_static_sizes(&mut self, graph: &NetworkGraph, now: f64) {
        self.static_sizes = graph.node_sizes();
        for (link, source) in self.links.iter_mut().zip(&graph.links) {
            link.weight = source.weight;
        }
        self.refresh(now);
    }

    pub fn set_config(&mut self, config: NetworkHighlightConfig, now: f64) {
        if self.config == config {
            return;
        }
        self.config = config;
        self.refresh(now);
    }

    /// Re-applies the current emphasis, drag or not.
    fn refresh(&mut self, now: f64) {
        match self.hovered {
            Some(hovered) => self.emphasise(hovered, now),
            None => self.rest(now),
        }
    }

    fn emphasise(&mut self, hovered: usize, now: f64) {
        let config = self.config;
        let duration = config.transition_duration;
        let neighbor_sizes = self.neighbor_sizes(hovered);

        for (index, tween) in self.nodes.iter_mut().enumerate() {
            let size = self.static_sizes[index];
            let target = if index == hovered {
                NodeVisual {
                    radius: size + config.node_size_inc,
                    fill_opacity: 1.0,
                    label_size: size + config.label_size_inc + config.label_size_add,
                    label_opacity: 1.0,
                }
            } else if self.adjacency.is_connected_index(hovered, index) {
                let radius = neighbor_sizes.get(&index).copied().unwrap_or(size);
                NodeVisual {
                    radius,
                    fill_opacity: 1.0,
                    label_size: radius + config.label_size_add,
                    label_opacity: 1.0,
                }
            } else {
                NodeVisual {
                    fill_opacity: config.transparency,
                    label_opacity: config.transparency,
                    ..resting_visual(size, &config)
                }
            };
            tween.retarget(target, now, duration);
        }

        for link in &mut self.links {
            let touches = link.source == hovered || link.target == hovered;
            let opacity = if touches { 1.0 } else { config.transparency };
            link.opacity.retarget(opacity, now, duration);
        }
    }

    fn rest(&mut self, now: f64) {
        let duration = self.config.transition_duration;
        for (tween, &size) in self.nodes.iter_mut().zip(&self.static_sizes) {
            tween.retarget(resting_visual(size, &self.config), now, duration);
        }
        for link in &mut self.links {
            link.opacity.retarget(1.0, now, duration);
        }
    }

    /// Radius of each neighbor: the weight of the first link joining it to
    /// `hovered`, rescaled from the hovered node's incident weight range.
    fn neighbor_sizes(&self, hovered: usize) -> HashMap<usize, f32> {
        let incident = self
            .links
            .iter()
            .filter(|link| link.source == hovered || link.target == hovered)
            .collect::<Vec<_>>();
        if incident.is_empty() {
            return HashMap::new();
        }

        let (min_weight, max_weight) = incident.iter().fold(
            (f32::INFINITY, f32::NEG_INFINITY),
            |(min, max), link| (min.min(link.weight), max.max(link.weight)),
        );

        let mut sizes = HashMap::new();
        for link in incident {
            let other = if link.source == hovered {
                link.target
            } else {
                link.source
            };
            sizes.entry(other).or_insert_with(|| {
                rescale(
                    link.weight as f64,
                    min_weight as f64,
                    max_weight as f64,
                    self.config.min_node_size as f64,
                    self.config.max_node_size as f64,
                ) as f32
            });
        }
        sizes
    }

    fn selection_context(&self, hovered: usize) -> SelectionContext {
        let mut kinds: Vec<&str> = Vec::new();
        for kind in &self.kinds {
            if !kinds.contains(&kind.as_str()) {
                kinds.push(kind);
            }
        }

        let neighbors = self
            .adjacency
            .neighbors(hovered)
            .iter()
            .filter(|&&index| index != hovered)
            .collect::<HashSet<_>>();
        let values = kinds
            .into_iter()
            .map(|kind| {
                let count = neighbors
                    .iter()
                    .filter(|&&&index| self.kinds[index] == kind)
                    .count();
                (kind.to_owned(), count as f64)
            })
            .collect();

        SelectionContext::new(values, Some(self.kinds[hovered].clone()))
    }
}

fn resting_visual(size: f32, config: &NetworkHighlightConfig) -> NodeVisual {
    NodeVisual {
        radius: size,
        fill_opacity: 1.0,
        label_size: size + config.label_size_add,
        label_opacity: 1.0,
    }
}
