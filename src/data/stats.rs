use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::debug;

use super::load::read_text;

const STATS_PREFIX: &str = "stats_";
const STATS_SUFFIX: &str = ".json";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Series {
    NonPermuted,
    Permuted,
}

impl Series {
    pub fn key_prefix(self) -> &'static str {
        match self {
            Self::NonPermuted => "non_permuted",
            Self::Permuted => "permuted",
        }
    }

    /// Series of a histogram bar key such as `permuted-3`.
    pub fn of_key(key: &str) -> Option<Self> {
        match key.rsplit_once('-')?.0 {
            "non_permuted" => Some(Self::NonPermuted),
            "permuted" => Some(Self::Permuted),
            _ => None,
        }
    }
}

/// Histogram of a statistic against its permutation-test null distribution.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct PermutationStats {
    pub xs: Vec<f64>,
    pub non_permuted_ys: Vec<f64>,
    pub permuted_ys: Vec<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HistogramBar {
    pub key: String,
    pub x: f64,
    pub y: f64,
    pub series: Series,
}

impl PermutationStats {
    /// Non-empty bins of both series, keyed by series and bin index.
    pub fn bars(&self) -> Vec<HistogramBar> {
        let mut bars = Vec::new();
        for (index, &x) in self.xs.iter().enumerate() {
            for (series, ys) in [
                (Series::NonPermuted, &self.non_permuted_ys),
                (Series::Permuted, &self.permuted_ys),
            ] {
                let Some(&y) = ys.get(index) else {
                    continue;
                };
                if y != 0.0 {
                    bars.push(HistogramBar {
                        key: format!("{}-{index}", series.key_prefix()),
                        x,
                        y,
                        series,
                    });
                }
            }
        }
        bars
    }

    pub fn x_extent(&self) -> Option<(f64, f64)> {
        let min = self.xs.iter().copied().reduce(f64::min)?;
        let max = self.xs.iter().copied().reduce(f64::max)?;
        Some((min, max))
    }

    pub fn y_max(&self) -> f64 {
        self.non_permuted_ys
            .iter()
            .chain(&self.permuted_ys)
            .copied()
            .fold(0.0, f64::max)
    }
}

pub fn parse_stats(raw: &str) -> Result<PermutationStats> {
    let stats: PermutationStats = serde_json::from_str(raw).context("invalid stats document")?;
    if stats.xs.is_empty() {
        bail!("stats document has no bins");
    }
    Ok(stats)
}

pub fn load_stats(path: &Path) -> Result<PermutationStats> {
    let raw = read_text(path)?;
    parse_stats(&raw).with_context(|| format!("failed to parse stats from {}", path.display()))
}

/// File holding the statistics for a feature selection: the features sorted,
/// reversed and joined by `_`.
pub fn stats_file_name(features: &[String]) -> String {
    let mut sorted = features.to_vec();
    sorted.sort();
    sorted.dedup();
    sorted.reverse();
    format!("{STATS_PREFIX}{}{STATS_SUFFIX}", sorted.join("_"))
}

/// A directory of per-selection statistics files.
#[derive(Clone, Debug, PartialEq)]
pub struct StatsCatalog {
    pub directory: PathBuf,
    pub features: Vec<String>,
}

impl StatsCatalog {
    /// Uses `configured` when given, otherwise collects the feature names
    /// appearing in the directory's `stats_*.json` file names.
    pub fn discover(directory: &Path, configured: &[String]) -> Result<Self> {
        if !directory.is_dir() {
            bail!("{} is not a directory", directory.display());
        }

        let features = if configured.is_empty() {
            let mut found = BTreeSet::new();
            let entries = fs::read_dir(directory)
                .with_context(|| format!("failed to list {}", directory.display()))?;
            for entry in entries {
                let entry = entry.with_context(|| format!("failed to list {}", directory.display()))?;
                let name = entry.file_name();
                let Some(stem) = name
                    .to_str()
                    .and_then(|name| name.strip_prefix(STATS_PREFIX))
                    .and_then(|rest| rest.strip_suffix(STATS_SUFFIX))
                else {
                    continue;
                };
                found.extend(stem.split('_').filter(|part| !part.is_empty()).map(str::to_owned));
            }
            found.into_iter().collect()
        } else {
            configured
                .iter()
                .cloned()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        };

        debug!(directory = %directory.display(), features = ?features, "stats catalog");
        Ok(Self {
            directory: directory.to_path_buf(),
            features,
        })
    }

    pub fn path_for(&self, selected: &[String]) -> PathBuf {
        self.directory.join(stats_file_name(selected))
    }

    pub fn load(&self, selected: &[String]) -> Result<PermutationStats> {
        load_stats(&self.path_for(selected))
    }
}

/// Where histograms come from: a single document, or a catalog keyed by
/// feature selection.
#[derive(Clone, Debug, PartialEq)]
pub enum StatsSource {
    File(PathBuf),
    Catalog(StatsCatalog),
}

impl StatsSource {
    pub fn open(path: &Path, configured: &[String]) -> Result<Self> {
        if path.is_dir() {
            StatsCatalog::discover(path, configured).map(Self::Catalog)
        } else {
            Ok(Self::File(path.to_path_buf()))
        }
    }

    pub fn features(&self) -> &[String] {
        match self {
            Self::File(_) => &[],
            Self::Catalog(catalog) => &catalog.features,
        }
    }

    /// Keeps the requested features the source knows about, sorted.
    pub fn known_selection(&self, requested: &[String]) -> Vec<String> {
        let features = self.features();
        let mut selected = requested
            .iter()
            .filter(|feature| features.contains(feature))
            .cloned()
            .collect::<Vec<_>>();
        selected.sort();
        selected.dedup();
        selected
    }

    /// A single document ignores the selection.
    pub fn path_for(&self, selected: &[String]) -> PathBuf {
        match self {
            Self::File(path) => path.clone(),
            Self::Catalog(catalog) => catalog.path_for(selected),
        }
    }

    pub fn load(&self, selected: &[String]) -> Result<PermutationStats> {
        load_stats(&self.path_for(selected))
    }
}

/// A stats source with the histogram of its initial selection.
#[derive(Clone, Debug)]
pub struct LoadedStats {
    pub source: StatsSource,
    pub selected: Vec<String>,
    pub stats: PermutationStats,
}

pub fn open_stats(path: &Path, configured: &[String], default_features: &[String]) -> Result<LoadedStats> {
    let source = StatsSource::open(path, configured)?;
    let selected = source.known_selection(default_features);
    let stats = source.load(&selected)?;
    Ok(LoadedStats {
        source,
        selected,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_bins_are_skipped() {
        let stats = parse_stats(
            r#"{"xs": [0.1, 0.2, 0.3], "non_permuted_ys": [0, 4, 1], "permuted_ys": [2, 0, 7]}"#,
        )
        .unwrap();
        let keys = stats.bars().into_iter().map(|bar| bar.key).collect::<Vec<_>>();
        assert_eq!(keys, ["permuted-0", "non_permuted-1", "non_permuted-2", "permuted-2"]);
        assert_eq!(stats.y_max(), 7.0);
        assert_eq!(stats.x_extent(), Some((0.1, 0.3)));
    }

    #[test]
    fn file_name_sorts_features_in_reverse() {
        let features = ["age".to_owned(), "sexe".to_owned(), "metier".to_owned()];
        assert_eq!(stats_file_name(&features), "stats_sexe_metier_age.json");
        assert_eq!(stats_file_name(&[]), "stats_.json");
    }

    #[test]
    fn keys_map_back_to_their_series() {
        assert_eq!(Series::of_key("non_permuted-12"), Some(Series::NonPermuted));
        assert_eq!(Series::of_key("permuted-0"), Some(Series::Permuted));
        assert_eq!(Series::of_key("other-1"), None);
    }

    #[test]
    fn empty_bins_are_an_error() {
        assert!(parse_stats(r#"{"xs": [], "non_permuted_ys": [], "permuted_ys": []}"#).is_err());
    }
}
