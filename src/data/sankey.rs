use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::debug;

use super::load::read_text;
use super::string_or_number;

#[derive(Clone, Debug, Deserialize)]
struct RawFlow {
    #[serde(deserialize_with = "string_or_number")]
    source: String,
    #[serde(deserialize_with = "string_or_number")]
    target: String,
    value: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FlowNode {
    pub id: String,
    /// Leading word of the id, used for coloring.
    pub group: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Flow {
    pub source: usize,
    pub target: usize,
    pub value: f64,
}

/// Nodes in order of first appearance, sources before targets.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlowGraph {
    pub nodes: Vec<FlowNode>,
    pub flows: Vec<Flow>,
}

impl FlowGraph {
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.id == id)
    }

    pub fn outgoing(&self, node: usize) -> impl Iterator<Item = &Flow> {
        self.flows.iter().filter(move |flow| flow.source == node)
    }

    pub fn incoming(&self, node: usize) -> impl Iterator<Item = &Flow> {
        self.flows.iter().filter(move |flow| flow.target == node)
    }
}

/// Text before the first character outside `[A-Za-z0-9_]`.
pub fn node_group(id: &str) -> &str {
    id.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .next()
        .unwrap_or_default()
}

pub fn parse_flows(raw: &str) -> Result<FlowGraph> {
    let records: Vec<RawFlow> = serde_json::from_str(raw).context("invalid flow document")?;

    let mut order = Vec::with_capacity(records.len() * 2);
    order.extend(records.iter().map(|record| record.source.as_str()));
    order.extend(records.iter().map(|record| record.target.as_str()));

    let mut index = HashMap::new();
    let mut nodes = Vec::new();
    for id in order {
        if !index.contains_key(id) {
            index.insert(id.to_owned(), nodes.len());
            nodes.push(FlowNode {
                id: id.to_owned(),
                group: node_group(id).to_owned(),
            });
        }
    }

    let mut flows = Vec::with_capacity(records.len());
    for record in &records {
        if !record.value.is_finite() || record.value < 0.0 {
            bail!(
                "flow {} -> {} has invalid value {}",
                record.source,
                record.target,
                record.value
            );
        }
        flows.push(Flow {
            source: index[&record.source],
            target: index[&record.target],
            value: record.value,
        });
    }

    debug!(nodes = nodes.len(), flows = flows.len(), "parsed flows");
    Ok(FlowGraph { nodes, flows })
}

pub fn load_flows(path: &Path) -> Result<FlowGraph> {
    let raw = read_text(path)?;
    parse_flows(&raw).with_context(|| format!("failed to parse flows from {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLOWS: &str = r#"[
        {"source": "bourg 1798", "target": "commerce", "value": 12},
        {"source": "palud-1832", "target": "commerce", "value": 3},
        {"source": "bourg 1798", "target": "rente", "value": 5}
    ]"#;

    #[test]
    fn nodes_follow_sources_then_targets() {
        let graph = parse_flows(FLOWS).unwrap();
        let ids = graph.nodes.iter().map(|node| node.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, ["bourg 1798", "palud-1832", "commerce", "rente"]);
        assert_eq!(graph.flows[1], Flow { source: 1, target: 2, value: 3.0 });
        assert_eq!(graph.incoming(2).count(), 2);
        assert_eq!(graph.outgoing(0).map(|flow| flow.value).sum::<f64>(), 17.0);
    }

    #[test]
    fn group_is_the_leading_word() {
        assert_eq!(node_group("bourg 1798"), "bourg");
        assert_eq!(node_group("place_st_francois-2"), "place_st_francois");
        assert_eq!(node_group("commerce"), "commerce");
        assert_eq!(node_group(" leading"), "");
    }

    #[test]
    fn negative_values_are_rejected() {
        let error = parse_flows(r#"[{"source": "a", "target": "b", "value": -1}]"#).unwrap_err();
        assert!(format!("{error:#}").contains("invalid value"));
    }
}
