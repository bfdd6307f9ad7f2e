use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use super::load::read_text;
use super::string_or_number;
use crate::interaction::scale::ScaleRange;

#[derive(Clone, Debug, Deserialize)]
struct RawNetwork {
    #[serde(default)]
    nodes: Vec<RawNode>,
    #[serde(default)]
    links: Vec<RawLink>,
}

#[derive(Clone, Debug, Deserialize)]
struct RawNode {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    size: f64,
    #[serde(default, rename = "type")]
    kind: String,
}

#[derive(Clone, Debug, Deserialize)]
struct RawLink {
    #[serde(deserialize_with = "string_or_number")]
    source: String,
    #[serde(deserialize_with = "string_or_number")]
    target: String,
    #[serde(default = "unit_weight")]
    weight: f64,
}

fn unit_weight() -> f64 {
    1.0
}

/// Exponent rescaling of node sizes and link weights.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NetworkScaling {
    pub node_exponent: f64,
    pub link_exponent: f64,
    pub min_node_size: f64,
    pub max_node_size: f64,
    pub min_link_weight: f64,
    pub max_link_weight: f64,
}

impl Default for NetworkScaling {
    fn default() -> Self {
        Self {
            node_exponent: 0.7,
            link_exponent: 0.7,
            min_node_size: 7.0,
            max_node_size: 40.0,
            min_link_weight: 1.0,
            max_link_weight: 8.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NetworkNode {
    pub id: String,
    pub label: String,
    pub kind: String,
    pub raw_size: f64,
    /// Presentation radius after rescaling.
    pub size: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NetworkLink {
    pub source: usize,
    pub target: usize,
    pub raw_weight: f64,
    /// Presentation stroke width after rescaling.
    pub weight: f32,
}

#[derive(Clone, Debug)]
pub struct NetworkGraph {
    pub name: String,
    pub nodes: Vec<NetworkNode>,
    pub links: Vec<NetworkLink>,
    index: HashMap<String, usize>,
}

impl NetworkGraph {
    pub fn index_of(&self, node_id: &str) -> Option<usize> {
        self.index.get(node_id).copied()
    }

    pub fn node(&self, node_id: &str) -> Option<&NetworkNode> {
        self.index_of(node_id).map(|index| &self.nodes[index])
    }

    pub fn link_pairs(&self) -> Vec<(usize, usize)> {
        self.links.iter().map(|link| (link.source, link.target)).collect()
    }

    pub fn node_sizes(&self) -> Vec<f32> {
        self.nodes.iter().map(|node| node.size).collect()
    }

    /// Distinct node kinds in first-seen order.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = Vec::new();
        for node in &self.nodes {
            if !kinds.contains(&node.kind.as_str()) {
                kinds.push(&node.kind);
            }
        }
        kinds
    }

    /// Recomputes presentation sizes and weights from the raw values.
    pub fn rescale(&mut self, scaling: NetworkScaling) {
        let node_range = ScaleRange::fit(
            self.nodes.iter().map(|node| node.raw_size),
            scaling.node_exponent,
            scaling.min_node_size,
            scaling.max_node_size,
        );
        for node in &mut self.nodes {
            node.size = node_range.scale(node.raw_size) as f32;
        }

        let link_range = ScaleRange::fit(
            self.links.iter().map(|link| link.raw_weight),
            scaling.link_exponent,
            scaling.min_link_weight,
            scaling.max_link_weight,
        );
        for link in &mut self.links {
            link.weight = link_range.scale(link.raw_weight) as f32;
        }
    }
}

pub fn parse_network(name: &str, raw: &str, scaling: NetworkScaling) -> Result<NetworkGraph> {
    let document: RawNetwork = serde_json::from_str(raw).context("invalid network document")?;

    let mut index = HashMap::with_capacity(document.nodes.len());
    let mut nodes = Vec::with_capacity(document.nodes.len());
    for node in document.nodes {
        if index.contains_key(&node.id) {
            warn!(network = name, node = %node.id, "duplicate node id, keeping the first");
            continue;
        }
        index.insert(node.id.clone(), nodes.len());
        nodes.push(NetworkNode {
            label: node.label.unwrap_or_else(|| node.id.clone()),
            id: node.id,
            kind: node.kind,
            raw_size: node.size,
            size: 0.0,
        });
    }

    let mut links = Vec::with_capacity(document.links.len());
    for link in document.links {
        match (index.get(&link.source), index.get(&link.target)) {
            (Some(&source), Some(&target)) => links.push(NetworkLink {
                source,
                target,
                raw_weight: link.weight,
                weight: 0.0,
            }),
            _ => warn!(
                network = name,
                source = %link.source,
                target = %link.target,
                "dropping link with unknown endpoint"
            ),
        }
    }

    let mut graph = NetworkGraph {
        name: name.to_owned(),
        nodes,
        links,
        index,
    };
    graph.rescale(scaling);
    debug!(
        network = name,
        nodes = graph.nodes.len(),
        links = graph.links.len(),
        "parsed network"
    );
    Ok(graph)
}

pub fn load_network(path: &Path, scaling: NetworkScaling) -> Result<NetworkGraph> {
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let raw = read_text(path)?;
    parse_network(&name, &raw, scaling)
        .with_context(|| format!("failed to parse network from {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAIR: &str = r#"{
        "nodes": [
            {"id": "A", "label": "Vigneron", "size": 10, "type": "vocation"},
            {"id": "B", "size": 100, "type": "road"}
        ],
        "links": [
            {"source": "A", "target": "B", "weight": 3},
            {"source": "A", "target": "Z", "weight": 1}
        ]
    }"#;

    #[test]
    fn sizes_rescale_into_presentation_range() {
        let graph = parse_network("roads", PAIR, NetworkScaling::default()).unwrap();
        assert!((graph.nodes[0].size - 7.0).abs() < 1e-4);
        assert!((graph.nodes[1].size - 40.0).abs() < 1e-4);
        assert_eq!(graph.nodes[1].label, "B");
        assert_eq!(graph.kinds(), ["vocation", "road"]);
    }

    #[test]
    fn unresolved_links_are_dropped() {
        let graph = parse_network("roads", PAIR, NetworkScaling::default()).unwrap();
        assert_eq!(graph.links.len(), 1);
        assert_eq!(graph.link_pairs(), [(0, 1)]);
        assert!((graph.links[0].weight - 4.5).abs() < 1e-4);
    }

    #[test]
    fn rescale_follows_new_bounds() {
        let mut graph = parse_network("roads", PAIR, NetworkScaling::default()).unwrap();
        graph.rescale(NetworkScaling {
            min_node_size: 2.0,
            max_node_size: 4.0,
            ..NetworkScaling::default()
        });
        assert!((graph.nodes[0].size - 2.0).abs() < 1e-4);
        assert!((graph.nodes[1].size - 4.0).abs() < 1e-4);
    }
}
