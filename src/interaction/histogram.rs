use eframe::egui::Vec2;

use crate::config::StatsConfig;
use crate::data::stats::{PermutationStats, Series};

use super::barplot::{Bar, BarGeometry, BarTarget, join, prune_exited};
use super::color::Color;

/// Overlaid permutation histograms, joined by `series-bin` key so that a
/// new feature selection morphs the bars instead of redrawing them.
pub struct HistogramUpdater {
    config: StatsConfig,
    size: Vec2,
    bars: Vec<Bar>,
    stats: Option<PermutationStats>,
    show_non_permuted: bool,
    show_permuted: bool,
}

impl HistogramUpdater {
    pub fn new(config: StatsConfig, size: Vec2) -> Self {
        Self {
            config,
            size,
            bars: Vec::new(),
            stats: None,
            show_non_permuted: true,
            show_permuted: true,
        }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn stats(&self) -> Option<&PermutationStats> {
        self.stats.as_ref()
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn is_visible(&self, series: Series) -> bool {
        match series {
            Series::NonPermuted => self.show_non_permuted,
            Series::Permuted => self.show_permuted,
        }
    }

    pub fn is_animating(&self, now: f64) -> bool {
        self.bars.iter().any(|bar| !bar.is_settled(now))
    }

    pub fn series_color(&self, series: Series) -> Color {
        match series {
            Series::NonPermuted => self.config.non_permuted_color,
            Series::Permuted => self.config.permuted_color,
        }
    }

    pub fn update(&mut self, stats: PermutationStats, now: f64) {
        self.stats = Some(stats);
        self.rejoin(now);
    }

    pub fn set_visible(&mut self, series: Series, visible: bool, now: f64) {
        if self.is_visible(series) == visible {
            return;
        }
        match series {
            Series::NonPermuted => self.show_non_permuted = visible,
            Series::Permuted => self.show_permuted = visible,
        }
        self.rejoin(now);
    }

    pub fn resize(&mut self, size: Vec2, now: f64) {
        if self.size == size {
            return;
        }
        self.size = size;
        self.rejoin(now);
    }

    pub fn prune(&mut self, now: f64) {
        prune_exited(&mut self.bars, now);
    }

    fn rejoin(&mut self, now: f64) {
        let targets = self.targets();
        let previous = std::mem::take(&mut self.bars);
        self.bars = join(previous, targets, self.size.y, now, self.config.duration());
    }

    fn targets(&self) -> Vec<BarTarget> {
        let Some(stats) = &self.stats else {
            return Vec::new();
        };
        let Some((x_min, x_max)) = stats.x_extent() else {
            return Vec::new();
        };

        let width = self.size.x;
        let height = self.size.y;
        let span = x_max - x_min;
        let x_of = |x: f64| {
            if span > 0.0 {
                ((x - x_min) / span) as f32 * width
            } else {
                0.0
            }
        };
        let y_max = stats.y_max();
        let y_of = |y: f64| {
            if y_max > 0.0 {
                height - (y / y_max) as f32 * height
            } else {
                height
            }
        };
        let bar_width = (width / stats.xs.len() as f32 - 1.0).max(0.0);

        stats
            .bars()
            .into_iter()
            .filter(|bar| self.is_visible(bar.series))
            .map(|bar| {
                let top = y_of(bar.y);
                BarTarget {
                    label: bar.key,
                    value: bar.y,
                    color: self.series_color(bar.series),
                    selected: false,
                    geometry: BarGeometry {
                        x: x_of(bar.x),
                        width: bar_width,
                        y: top,
                        height: height - top,
                        opacity: self.config.opacity,
                    },
                }
            })
            .collect()
    }
}

/// Checked features of a catalog. Every change locks the checkboxes for a
/// while so that reloads do not pile up.
#[derive(Clone, Debug)]
pub struct FeatureSelection {
    selected: Vec<String>,
    lockout: f64,
    locked_until: f64,
}

impl FeatureSelection {
    pub fn new(selected: Vec<String>, lockout: f64) -> Self {
        let mut selected = selected;
        selected.sort();
        selected.dedup();
        Self {
            selected,
            lockout,
            locked_until: f64::NEG_INFINITY,
        }
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn contains(&self, feature: &str) -> bool {
        self.selected.iter().any(|selected| selected == feature)
    }

    pub fn is_locked(&self, now: f64) -> bool {
        now < self.locked_until
    }

    /// Flips `feature` and returns the selection to load, or `None` while
    /// locked.
    pub fn toggle(&mut self, feature: &str, now: f64) -> Option<Vec<String>> {
        if self.is_locked(now) {
            return None;
        }
        match self.selected.iter().position(|selected| selected == feature) {
            Some(index) => {
                self.selected.remove(index);
            }
            None => {
                self.selected.push(feature.to_owned());
                self.selected.sort();
            }
        }
        self.locked_until = now + self.lockout;
        Some(self.selected.clone())
    }

    /// Whether a reply loaded for `selection` still matches the checkboxes.
    pub fn is_current(&self, selection: &[String]) -> bool {
        self.selected.as_slice() == selection
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;

    fn stats(non_permuted: &[f64], permuted: &[f64]) -> PermutationStats {
        PermutationStats {
            xs: vec![0.0, 1.0, 2.0, 3.0],
            non_permuted_ys: non_permuted.to_vec(),
            permuted_ys: permuted.to_vec(),
        }
    }

    fn histogram() -> HistogramUpdater {
        HistogramUpdater::new(StatsConfig::default(), vec2(300.0, 100.0))
    }

    #[test]
    fn bars_are_placed_on_a_linear_x_scale() {
        let mut histogram = histogram();
        histogram.update(stats(&[0.0, 2.0, 4.0, 0.0], &[1.0, 0.0, 0.0, 0.0]), 0.0);

        let keys = histogram.bars().iter().map(|bar| bar.label.as_str()).collect::<Vec<_>>();
        assert_eq!(keys, ["permuted-0", "non_permuted-1", "non_permuted-2"]);

        let tallest = histogram.bars()[2].target();
        assert_eq!(tallest.x, 200.0);
        assert_eq!(tallest.width, 74.0);
        assert_eq!(tallest.y, 0.0);
        assert_eq!(tallest.height, 100.0);
        assert_eq!(tallest.opacity, 0.5);
        assert_eq!(histogram.bars()[1].target().height, 50.0);
        assert_eq!(histogram.bars()[0].color, StatsConfig::default().permuted_color);
    }

    #[test]
    fn new_selection_morphs_shared_bins_and_drops_the_rest() {
        let mut histogram = histogram();
        histogram.update(stats(&[0.0, 2.0, 4.0, 0.0], &[1.0, 0.0, 0.0, 0.0]), 0.0);
        histogram.update(stats(&[0.0, 4.0, 0.0, 0.0], &[0.0, 0.0, 0.0, 0.0]), 1.0);

        let find = |key: &str| histogram.bars().iter().find(|bar| bar.label == key).unwrap();
        assert!(!find("non_permuted-1").is_exiting());
        assert_eq!(find("non_permuted-1").geometry(1.0).height, 50.0);
        assert_eq!(find("non_permuted-1").target().height, 100.0);
        assert!(find("non_permuted-2").is_exiting());
        assert!(find("permuted-0").is_exiting());

        histogram.prune(2.0);
        assert_eq!(histogram.bars().len(), 1);
        assert!(!histogram.is_animating(2.0));
    }

    #[test]
    fn toggling_locks_the_selection_for_the_lockout() {
        let mut selection = FeatureSelection::new(vec!["sexe".to_owned()], 0.8);
        assert_eq!(
            selection.toggle("age", 1.0),
            Some(vec!["age".to_owned(), "sexe".to_owned()])
        );
        assert!(selection.is_locked(1.5));
        assert_eq!(selection.toggle("sexe", 1.5), None);
        assert!(selection.contains("sexe"));

        assert_eq!(selection.toggle("sexe", 2.0), Some(vec!["age".to_owned()]));
        assert!(!selection.is_current(&["age".to_owned(), "sexe".to_owned()]));
        assert!(selection.is_current(&["age".to_owned()]));
    }

    #[test]
    fn hiding_a_series_shrinks_its_bars_away() {
        let mut histogram = histogram();
        histogram.update(stats(&[0.0, 2.0, 4.0, 0.0], &[1.0, 0.0, 0.0, 0.0]), 0.0);
        histogram.set_visible(Series::Permuted, false, 1.0);

        let permuted = histogram.bars().iter().filter(|bar| Series::of_key(&bar.label) == Some(Series::Permuted));
        assert!(permuted.clone().all(Bar::is_exiting));
        assert_eq!(permuted.count(), 1);

        histogram.prune(2.0);
        assert!(histogram.bars().iter().all(|bar| Series::of_key(&bar.label) == Some(Series::NonPermuted)));
    }
}
