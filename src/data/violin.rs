use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::debug;

use super::load::read_text;
use super::string_or_number;

const VIOLIN_PREFIX: &str = "violin_";
const VIOLIN_SUFFIX: &str = ".json";

/// Observed values of one group.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ViolinGroup {
    #[serde(deserialize_with = "string_or_number")]
    pub group: String,
    pub values: Vec<f64>,
}

pub fn violin_file_name(feature: &str) -> String {
    format!("{VIOLIN_PREFIX}{feature}{VIOLIN_SUFFIX}")
}

/// Smallest and largest value over every group.
pub fn value_extent(groups: &[ViolinGroup]) -> Option<(f64, f64)> {
    let mut values = groups.iter().flat_map(|group| group.values.iter().copied());
    let first = values.next()?;
    Some(values.fold((first, first), |(min, max), value| (min.min(value), max.max(value))))
}

pub fn parse_violin(raw: &str) -> Result<Vec<ViolinGroup>> {
    let groups: Vec<ViolinGroup> = serde_json::from_str(raw).context("invalid violin document")?;
    if let Some(group) = groups.iter().find(|group| group.values.iter().any(|value| !value.is_finite())) {
        bail!("group {} has a non-finite value", group.group);
    }
    Ok(groups)
}

pub fn load_violin(path: &Path) -> Result<Vec<ViolinGroup>> {
    let raw = read_text(path)?;
    parse_violin(&raw).with_context(|| format!("failed to parse violin groups from {}", path.display()))
}

/// `violin_<feature>.json` documents sharing a directory.
#[derive(Clone, Debug, PartialEq)]
pub struct ViolinCatalog {
    pub directory: PathBuf,
    pub features: Vec<String>,
}

impl ViolinCatalog {
    /// A directory lists every feature it holds a document for; a single
    /// document offers just its own feature.
    pub fn open(path: &Path) -> Result<Self> {
        if path.is_dir() {
            let mut features = BTreeSet::new();
            let entries = fs::read_dir(path).with_context(|| format!("failed to list {}", path.display()))?;
            for entry in entries {
                let entry = entry.with_context(|| format!("failed to list {}", path.display()))?;
                if let Some(feature) = entry.file_name().to_str().and_then(feature_of) {
                    features.insert(feature.to_owned());
                }
            }
            if features.is_empty() {
                bail!("no violin_*.json document in {}", path.display());
            }
            debug!(directory = %path.display(), features = ?features, "violin catalog");
            return Ok(Self {
                directory: path.to_path_buf(),
                features: features.into_iter().collect(),
            });
        }

        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .with_context(|| format!("{} is not a file name", path.display()))?;
        let feature = feature_of(name)
            .with_context(|| format!("{} is not named violin_<feature>.json", path.display()))?;
        Ok(Self {
            directory: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            features: vec![feature.to_owned()],
        })
    }

    /// `preferred` when the catalog has it, otherwise the first feature.
    pub fn initial_feature(&self, preferred: &str) -> Option<&str> {
        self.features
            .iter()
            .find(|feature| *feature == preferred)
            .or_else(|| self.features.first())
            .map(String::as_str)
    }

    pub fn path_for(&self, feature: &str) -> PathBuf {
        self.directory.join(violin_file_name(feature))
    }

    pub fn load(&self, feature: &str) -> Result<Vec<ViolinGroup>> {
        load_violin(&self.path_for(feature))
    }
}

fn feature_of(file_name: &str) -> Option<&str> {
    file_name
        .strip_prefix(VIOLIN_PREFIX)?
        .strip_suffix(VIOLIN_SUFFIX)
        .filter(|feature| !feature.is_empty())
}

/// A violin catalog with the groups of its initial feature.
#[derive(Clone, Debug)]
pub struct LoadedViolins {
    pub catalog: ViolinCatalog,
    pub feature: String,
    pub groups: Vec<ViolinGroup>,
}

pub fn open_violins(path: &Path, preferred: &str) -> Result<LoadedViolins> {
    let catalog = ViolinCatalog::open(path)?;
    let feature = catalog
        .initial_feature(preferred)
        .map(str::to_owned)
        .with_context(|| format!("no violin feature in {}", path.display()))?;
    let groups = catalog.load(&feature)?;
    Ok(LoadedViolins {
        catalog,
        feature,
        groups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_parse_with_numeric_names() {
        let groups = parse_violin(r#"[{"group": 1798, "values": [1, 5]}, {"group": "1832", "values": [-2]}]"#).unwrap();
        assert_eq!(groups[0].group, "1798");
        assert_eq!(value_extent(&groups), Some((-2.0, 5.0)));
        assert_eq!(value_extent(&[]), None);
    }

    #[test]
    fn feature_comes_from_the_file_name() {
        assert_eq!(feature_of("violin_divisions.json"), Some("divisions"));
        assert_eq!(feature_of("violin_.json"), None);
        assert_eq!(feature_of("stats_age.json"), None);
        assert_eq!(violin_file_name("age"), "violin_age.json");
    }

    #[test]
    fn preferred_feature_falls_back_to_the_first() {
        let catalog = ViolinCatalog {
            directory: PathBuf::from("data"),
            features: vec!["age".to_owned(), "divisions".to_owned()],
        };
        assert_eq!(catalog.initial_feature("divisions"), Some("divisions"));
        assert_eq!(catalog.initial_feature("metier"), Some("age"));
        assert_eq!(catalog.path_for("age"), PathBuf::from("data/violin_age.json"));
    }
}
