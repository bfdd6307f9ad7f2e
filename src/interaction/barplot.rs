use std::collections::{HashMap, HashSet};

use eframe::egui::{Pos2, Rect, Vec2, pos2};

use super::color::Color;
use super::transition::{Lerp, Tween};

#[derive(Clone, Debug)]
pub struct BarPlotConfig {
    /// Band padding, inner and outer.
    pub padding: f32,
    pub duration: f64,
    pub dimmed_opacity: f32,
    pub fallback_color: Color,
}

impl Default for BarPlotConfig {
    fn default() -> Self {
        Self {
            padding: 0.2,
            duration: 0.5,
            dimmed_opacity: 0.35,
            fallback_color: Color::WHITE,
        }
    }
}

/// Bar rectangle in plot coordinates: `y` grows downward from the top edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BarGeometry {
    pub x: f32,
    pub width: f32,
    pub y: f32,
    pub height: f32,
    pub opacity: f32,
}

impl Lerp for BarGeometry {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        Self {
            x: self.x.lerp(&other.x, t),
            width: self.width.lerp(&other.width, t),
            y: self.y.lerp(&other.y, t),
            height: self.height.lerp(&other.height, t),
            opacity: self.opacity.lerp(&other.opacity, t),
        }
    }
}

impl BarGeometry {
    pub fn rect(&self, origin: Pos2) -> Rect {
        Rect::from_min_size(
            pos2(origin.x + self.x, origin.y + self.y),
            Vec2::new(self.width, self.height.max(0.0)),
        )
    }
}

#[derive(Clone, Debug)]
pub struct Bar {
    pub label: String,
    pub value: f64,
    pub color: Color,
    pub selected: bool,
    geometry: Tween<BarGeometry>,
    exiting: Option<f64>,
}

impl Bar {
    pub fn geometry(&self, now: f64) -> BarGeometry {
        self.geometry.value_at(now)
    }

    pub fn target(&self) -> BarGeometry {
        *self.geometry.target()
    }

    pub fn is_exiting(&self) -> bool {
        self.exiting.is_some()
    }

    pub fn is_settled(&self, now: f64) -> bool {
        self.geometry.is_finished(now)
    }
}

/// Keyed bar chart: bars enter from the baseline, update in place and
/// shrink away before being dropped.
pub struct BarPlotUpdater {
    config: BarPlotConfig,
    size: Vec2,
    palette: HashMap<String, Color>,
    bars: Vec<Bar>,
    max_value: f64,
    last_input: Option<(Vec<(String, f64)>, Option<String>)>,
}

impl BarPlotUpdater {
    pub fn new(config: BarPlotConfig, size: Vec2, palette: HashMap<String, Color>) -> Self {
        Self {
            config,
            size,
            palette,
            bars: Vec::new(),
            max_value: 0.0,
            last_input: None,
        }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn max_value(&self) -> f64 {
        self.max_value
    }

    pub fn is_animating(&self, now: f64) -> bool {
        self.bars.iter().any(|bar| !bar.is_settled(now))
    }

    pub fn is_empty(&self) -> bool {
        self.bars.iter().all(Bar::is_exiting)
    }

    /// Joins `values` against the current bars by label. Returns `false`
    /// when the input matches the previous call and nothing was touched.
    pub fn update(&mut self, values: &[(String, f64)], selected: Option<&str>, now: f64) -> bool {
        if let Some((last_values, last_selected)) = &self.last_input
            && last_values.as_slice() == values
            && last_selected.as_deref() == selected
        {
            return false;
        }
        self.last_input = Some((values.to_vec(), selected.map(str::to_owned)));

        let mut sorted = values.to_vec();
        sorted.sort_by(|(_, a), (_, b)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        let mut seen = HashSet::new();
        sorted.retain(|(label, _)| seen.insert(label.clone()));

        self.max_value = sorted.iter().map(|(_, value)| *value).fold(0.0, f64::max);
        let has_selection = selected.is_some_and(|label| sorted.iter().any(|(l, _)| l == label));
        self.join(&sorted, selected, has_selection, now);
        true
    }

    pub fn clear(&mut self, now: f64) {
        self.update(&[], None, now);
    }

    pub fn resize(&mut self, size: Vec2, now: f64) {
        if self.size == size {
            return;
        }
        self.size = size;
        if let Some((values, selected)) = self.last_input.take() {
            self.update(&values, selected.as_deref(), now);
        }
    }

    /// Drops exited bars whose shrink transition has finished.
    pub fn prune(&mut self, now: f64) {
        prune_exited(&mut self.bars, now);
    }

    fn join(&mut self, sorted: &[(String, f64)], selected: Option<&str>, has_selection: bool, now: f64) {
        let count = sorted.len();
        let padding = self.config.padding.clamp(0.0, 0.99);
        let step = if count == 0 {
            0.0
        } else {
            self.size.x / (count as f32 - padding + 2.0 * padding)
        };
        let bandwidth = step * (1.0 - padding);
        let height = self.size.y;
        let max_value = self.max_value;
        let y_of = |value: f64| -> f32 {
            if max_value <= 0.0 {
                height
            } else {
                height - (value / max_value) as f32 * height
            }
        };

        let targets = sorted
            .iter()
            .enumerate()
            .map(|(rank, (label, value))| {
                let is_selected = selected == Some(label.as_str());
                let opacity = if has_selection && !is_selected {
                    self.config.dimmed_opacity
                } else {
                    1.0
                };
                let top = y_of(*value);
                BarTarget {
                    label: label.clone(),
                    value: *value,
                    color: self
                        .palette
                        .get(label)
                        .copied()
                        .unwrap_or(self.config.fallback_color),
                    selected: is_selected,
                    geometry: BarGeometry {
                        x: step * (rank as f32 + padding),
                        width: bandwidth,
                        y: top,
                        height: height - top,
                        opacity,
                    },
                }
            })
            .collect();

        let previous = std::mem::take(&mut self.bars);
        self.bars = join(previous, targets, height, now, self.config.duration);
    }
}

/// Where one keyed bar should end up.
#[derive(Clone, Debug)]
pub struct BarTarget {
    pub label: String,
    pub value: f64,
    pub color: Color,
    pub selected: bool,
    pub geometry: BarGeometry,
}

/// Keyed enter/update/exit join of `targets` against `previous` bars.
///
/// Entering bars grow up from `baseline`, updated bars retarget from where
/// they currently are, and bars missing from `targets` shrink onto the
/// baseline and stay flagged as exiting until [`prune_exited`] drops them.
/// Output order follows `targets`, then exiting bars by label.
pub fn join(previous: Vec<Bar>, targets: Vec<BarTarget>, baseline: f32, now: f64, duration: f64) -> Vec<Bar> {
    let mut previous = previous
        .into_iter()
        .map(|bar| (bar.label.clone(), bar))
        .collect::<HashMap<_, _>>();

    let mut bars = Vec::with_capacity(targets.len() + previous.len());
    for target in targets {
        let bar = match previous.remove(&target.label) {
            Some(mut bar) => {
                bar.value = target.value;
                bar.color = target.color;
                bar.selected = target.selected;
                bar.exiting = None;
                bar.geometry.retarget(target.geometry, now, duration);
                bar
            }
            None => {
                let mut geometry = Tween::settled(BarGeometry {
                    y: baseline,
                    height: 0.0,
                    ..target.geometry
                });
                geometry.retarget(target.geometry, now, duration);
                Bar {
                    label: target.label,
                    value: target.value,
                    color: target.color,
                    selected: target.selected,
                    geometry,
                    exiting: None,
                }
            }
        };
        bars.push(bar);
    }

    let mut leaving = previous.into_values().collect::<Vec<_>>();
    leaving.sort_by(|a, b| a.label.cmp(&b.label));
    for mut bar in leaving {
        if bar.exiting.is_none() {
            let current = bar.geometry.value_at(now);
            bar.geometry.retarget(
                BarGeometry {
                    y: baseline,
                    height: 0.0,
                    ..current
                },
                now,
                duration,
            );
            bar.exiting = Some(now);
            bar.selected = false;
        }
        bars.push(bar);
    }

    bars
}

pub fn prune_exited(bars: &mut Vec<Bar>, now: f64) {
    bars.retain(|bar| !bar.is_exiting() || !bar.is_settled(now));
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;

    fn values(pairs: &[(&str, f64)]) -> Vec<(String, f64)> {
        pairs.iter().map(|(label, value)| (label.to_string(), *value)).collect()
    }

    fn plot() -> BarPlotUpdater {
        let palette = HashMap::from([("commerce".to_owned(), Color::rgb(0xE8, 0x4E, 0x10))]);
        BarPlotUpdater::new(BarPlotConfig::default(), vec2(120.0, 100.0), palette)
    }

    #[test]
    fn bars_sorted_descending_in_bands() {
        let mut plot = plot();
        plot.update(&values(&[("rente", 5.0), ("commerce", 20.0)]), None, 0.0);

        let labels = plot.bars().iter().map(|bar| bar.label.as_str()).collect::<Vec<_>>();
        assert_eq!(labels, ["commerce", "rente"]);

        let step = 120.0 / 2.2;
        let commerce = plot.bars()[0].target();
        assert!((commerce.x - step * 0.2).abs() < 1e-4);
        assert!((commerce.width - step * 0.8).abs() < 1e-4);
        assert_eq!(commerce.y, 0.0);
        assert_eq!(commerce.height, 100.0);
        assert_eq!(plot.bars()[1].target().height, 25.0);

        assert_eq!(plot.bars()[0].color, Color::rgb(0xE8, 0x4E, 0x10));
        assert_eq!(plot.bars()[1].color, Color::WHITE);
    }

    #[test]
    fn entering_bars_grow_from_baseline() {
        let mut plot = plot();
        plot.update(&values(&[("rente", 5.0)]), None, 0.0);
        let start = plot.bars()[0].geometry(0.0);
        assert_eq!(start.height, 0.0);
        assert_eq!(start.y, 100.0);
        assert_eq!(plot.bars()[0].geometry(0.5).height, 100.0);
    }

    #[test]
    fn identical_input_is_a_no_op() {
        let mut plot = plot();
        let input = values(&[("rente", 5.0), ("commerce", 20.0)]);
        assert!(plot.update(&input, Some("rente"), 0.0));
        let before = plot.bars()[1].geometry(0.3);
        assert!(!plot.update(&input, Some("rente"), 0.3));
        assert_eq!(plot.bars()[1].geometry(0.3), before);
    }

    #[test]
    fn exiting_bars_shrink_then_prune() {
        let mut plot = plot();
        plot.update(&values(&[("rente", 5.0), ("commerce", 20.0)]), None, 0.0);
        plot.update(&values(&[("commerce", 20.0)]), None, 1.0);

        let rente = plot.bars().iter().find(|bar| bar.label == "rente").unwrap();
        assert!(rente.is_exiting());
        assert_eq!(rente.target().height, 0.0);

        plot.prune(1.2);
        assert_eq!(plot.bars().len(), 2);
        plot.prune(1.5);
        assert_eq!(plot.bars().len(), 1);
    }

    #[test]
    fn rejoining_a_key_that_is_still_exiting_revives_it() {
        let target = |label: &str, height: f32| BarTarget {
            label: label.to_owned(),
            value: height as f64,
            color: Color::GRAY,
            selected: false,
            geometry: BarGeometry {
                x: 10.0,
                width: 8.0,
                y: 100.0 - height,
                height,
                opacity: 1.0,
            },
        };

        let bars = join(Vec::new(), vec![target("permuted-0", 40.0)], 100.0, 0.0, 0.75);
        let bars = join(bars, Vec::new(), 100.0, 1.0, 0.75);
        assert!(bars[0].is_exiting());

        let halfway = bars[0].geometry(1.3);
        let bars = join(bars, vec![target("permuted-0", 60.0)], 100.0, 1.3, 0.75);
        assert_eq!(bars.len(), 1);
        assert!(!bars[0].is_exiting());
        assert_eq!(bars[0].geometry(1.3), halfway);
        assert_eq!(bars[0].geometry(3.0).height, 60.0);
    }

    #[test]
    fn selection_dims_other_bars() {
        let mut plot = plot();
        plot.update(&values(&[("rente", 5.0), ("commerce", 20.0)]), Some("rente"), 0.0);
        let rente = plot.bars().iter().find(|bar| bar.label == "rente").unwrap();
        let commerce = plot.bars().iter().find(|bar| bar.label == "commerce").unwrap();
        assert!(rente.selected);
        assert_eq!(rente.target().opacity, 1.0);
        assert_eq!(commerce.target().opacity, 0.35);

        plot.update(&values(&[("rente", 5.0), ("commerce", 20.0)]), Some("unknown"), 1.0);
        assert!(plot.bars().iter().all(|bar| bar.target().opacity == 1.0));
    }
}
