use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::load::read_text;
use super::string_or_number;

/// Node of the circle-packing tree: `{name, value?, children?}`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct HierarchyNode {
    #[serde(deserialize_with = "string_or_number")]
    pub name: String,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    pub fn leaf_count(&self) -> usize {
        if self.children.is_empty() {
            1
        } else {
            self.children.iter().map(HierarchyNode::leaf_count).sum()
        }
    }
}

pub fn parse_hierarchy(raw: &str) -> Result<HierarchyNode> {
    serde_json::from_str(raw).context("invalid hierarchy document")
}

pub fn load_hierarchy(path: &Path) -> Result<HierarchyNode> {
    let raw = read_text(path)?;
    parse_hierarchy(&raw).with_context(|| format!("failed to parse hierarchy from {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_names_and_missing_fields() {
        let tree = parse_hierarchy(
            r#"{"name": "transport", "children": [
                {"name": "Bus", "children": [{"name": 1, "value": 12}, {"name": "2", "value": 3}]},
                {"name": "Metro", "value": 4}
            ]}"#,
        )
        .unwrap();

        assert_eq!(tree.value, None);
        assert_eq!(tree.children[0].children[0].name, "1");
        assert_eq!(tree.leaf_count(), 3);
    }

    #[test]
    fn rejects_nameless_nodes() {
        assert!(parse_hierarchy(r#"{"value": 3}"#).is_err());
    }
}
