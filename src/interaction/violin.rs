use std::collections::HashMap;

use eframe::egui::{Pos2, Vec2, pos2};

use super::transition::{Lerp, Tween};
use crate::config::ViolinConfig;
use crate::data::violin::{ViolinGroup, value_extent};

/// Epanechnikov kernel of half-width `bandwidth`.
pub fn epanechnikov(bandwidth: f64, offset: f64) -> f64 {
    let u = offset / bandwidth;
    if u.abs() <= 1.0 {
        0.75 * (1.0 - u * u) / bandwidth
    } else {
        0.0
    }
}

/// Density of `values` at each of `at`, as `(value, density)` pairs.
pub fn kernel_density(values: &[f64], at: &[f64], bandwidth: f64) -> Vec<(f64, f64)> {
    at.iter()
        .map(|&x| {
            let density = if values.is_empty() {
                0.0
            } else {
                values.iter().map(|&v| epanechnikov(bandwidth, x - v)).sum::<f64>() / values.len() as f64
            };
            (x, density)
        })
        .collect()
}

/// Round-numbered ticks covering `[start, stop]`, about `count` of them,
/// spaced by 1, 2 or 5 times a power of ten.
pub fn nice_ticks(start: f64, stop: f64, count: usize) -> Vec<f64> {
    if !(start.is_finite() && stop.is_finite()) || count == 0 {
        return Vec::new();
    }
    if start == stop {
        return vec![start];
    }
    let (low, high) = if start < stop { (start, stop) } else { (stop, start) };

    let raw_step = (high - low) / count as f64;
    let power = raw_step.log10().floor();
    let error = raw_step / 10_f64.powf(power);
    let factor = if error >= 50_f64.sqrt() {
        10.0
    } else if error >= 10_f64.sqrt() {
        5.0
    } else if error >= 2_f64.sqrt() {
        2.0
    } else {
        1.0
    };
    let step = factor * 10_f64.powf(power);

    let first = (low / step).ceil() as i64;
    let last = (high / step).floor() as i64;
    (first..=last).map(|index| index as f64 * step).collect()
}

/// One violin: its centre line and the half-width at each sampled height.
#[derive(Clone, Debug, PartialEq)]
pub struct ViolinShape {
    pub center: f32,
    pub opacity: f32,
    /// `[y, half_width]` pairs, top to bottom order not required.
    pub profile: Vec<[f32; 2]>,
}

impl ViolinShape {
    /// Closed outline: down the right side, back up the left.
    pub fn outline(&self, origin: Pos2) -> Vec<Pos2> {
        let right = self
            .profile
            .iter()
            .map(|&[y, half]| pos2(origin.x + self.center + half, origin.y + y));
        let left = self
            .profile
            .iter()
            .rev()
            .map(|&[y, half]| pos2(origin.x + self.center - half, origin.y + y));
        right.chain(left).collect()
    }

    pub fn max_half_width(&self) -> f32 {
        self.profile.iter().map(|&[_, half]| half).fold(0.0, f32::max)
    }

    fn resampled(&self, count: usize) -> Vec<[f32; 2]> {
        let len = self.profile.len();
        if len == count || len == 0 {
            return self.profile.clone();
        }
        if len == 1 {
            return vec![self.profile[0]; count];
        }
        (0..count)
            .map(|index| {
                let position = index as f32 * (len - 1) as f32 / (count - 1).max(1) as f32;
                let lower = position.floor() as usize;
                let upper = (lower + 1).min(len - 1);
                let t = position - lower as f32;
                let [y0, w0] = self.profile[lower];
                let [y1, w1] = self.profile[upper];
                [y0 + (y1 - y0) * t, w0 + (w1 - w0) * t]
            })
            .collect()
    }
}

impl Lerp for ViolinShape {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        let count = self.profile.len().max(other.profile.len());
        let from = self.resampled(count);
        let to = other.resampled(count);
        let profile = if from.is_empty() {
            to
        } else if to.is_empty() {
            from
        } else {
            from.iter()
                .zip(&to)
                .map(|(&[y0, w0], &[y1, w1])| [y0.lerp(&y1, t), w0.lerp(&w1, t)])
                .collect()
        };
        Self {
            center: self.center.lerp(&other.center, t),
            opacity: self.opacity.lerp(&other.opacity, t),
            profile,
        }
    }
}

pub struct Violin {
    pub group: String,
    pub count: usize,
    shape: Tween<ViolinShape>,
    exiting: bool,
}

impl Violin {
    pub fn shape(&self, now: f64) -> ViolinShape {
        self.shape.value_at(now)
    }

    pub fn target(&self) -> &ViolinShape {
        self.shape.target()
    }

    pub fn is_exiting(&self) -> bool {
        self.exiting
    }
}

/// Value axis shared by every violin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ValueAxis {
    pub domain: (f64, f64),
    pub height: f32,
}

impl ValueAxis {
    pub fn y(&self, value: f64) -> f32 {
        let span = self.domain.1 - self.domain.0;
        if span <= 0.0 {
            return self.height / 2.0;
        }
        self.height - ((value - self.domain.0) / span) as f32 * self.height
    }
}

/// Keyed violins per group: entering violins fade in with their final
/// shape, kept ones morph, and missing ones fade out before removal.
pub struct ViolinUpdater {
    config: ViolinConfig,
    size: Vec2,
    violins: Vec<Violin>,
    groups: Vec<ViolinGroup>,
    axis: Option<ValueAxis>,
    bandwidth: f32,
}

impl ViolinUpdater {
    pub fn new(config: ViolinConfig, size: Vec2) -> Self {
        Self {
            config,
            size,
            violins: Vec::new(),
            groups: Vec::new(),
            axis: None,
            bandwidth: 0.0,
        }
    }

    pub fn violins(&self) -> &[Violin] {
        &self.violins
    }

    pub fn axis(&self) -> Option<ValueAxis> {
        self.axis
    }

    /// Width of one group's band.
    pub fn band_width(&self) -> f32 {
        self.bandwidth
    }

    pub fn is_animating(&self, now: f64) -> bool {
        self.violins.iter().any(|violin| !violin.shape.is_finished(now))
    }

    pub fn update(&mut self, groups: Vec<ViolinGroup>, now: f64) {
        self.groups = groups;
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
        self.violins
            .retain(|violin| !violin.exiting || !violin.shape.is_finished(now));
    }

    fn rejoin(&mut self, now: f64) {
        let duration = self.config.duration();
        let targets = self.targets();

        let mut previous = std::mem::take(&mut self.violins)
            .into_iter()
            .map(|violin| (violin.group.clone(), violin))
            .collect::<HashMap<_, _>>();

        let mut violins = Vec::with_capacity(targets.len() + previous.len());
        for (group, count, shape) in targets {
            let violin = match previous.remove(&group) {
                Some(mut violin) => {
                    violin.count = count;
                    violin.exiting = false;
                    violin.shape.retarget(shape, now, duration);
                    violin
                }
                None => {
                    let mut tween = Tween::settled(ViolinShape {
                        opacity: 0.0,
                        ..shape.clone()
                    });
                    tween.retarget(shape, now, duration);
                    Violin {
                        group,
                        count,
                        shape: tween,
                        exiting: false,
                    }
                }
            };
            violins.push(violin);
        }

        let mut leaving = previous.into_values().collect::<Vec<_>>();
        leaving.sort_by(|a, b| a.group.cmp(&b.group));
        for mut violin in leaving {
            if !violin.exiting {
                let faded = ViolinShape {
                    opacity: 0.0,
                    ..violin.shape.value_at(now)
                };
                violin.shape.retarget(faded, now, duration);
                violin.exiting = true;
            }
            violins.push(violin);
        }
        self.violins = violins;
    }

    fn targets(&mut self) -> Vec<(String, usize, ViolinShape)> {
        let Some((min, max)) = value_extent(&self.groups) else {
            self.axis = None;
            return Vec::new();
        };
        let axis = ValueAxis {
            domain: (min - self.config.value_margin, max + self.config.value_margin),
            height: self.size.y,
        };
        self.axis = Some(axis);

        let count = self.groups.len();
        let padding = self.config.padding.clamp(0.0, 0.99);
        let step = self.size.x / (count as f32 - padding + 2.0 * padding).max(1.0);
        self.bandwidth = step * (1.0 - padding);

        let samples = nice_ticks(axis.domain.0, axis.domain.1, self.config.samples);
        self.groups
            .iter()
            .enumerate()
            .map(|(rank, group)| {
                let profile = kernel_density(&group.values, &samples, self.config.bandwidth)
                    .into_iter()
                    .map(|(value, density)| {
                        [axis.y(value), self.bandwidth * density as f32 * self.config.width_factor]
                    })
                    .collect();
                let shape = ViolinShape {
                    center: step * (rank as f32 + padding) + self.bandwidth / 2.0,
                    opacity: self.config.opacity,
                    profile,
                };
                (group.group.clone(), group.values.len(), shape)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;

    fn group(name: &str, values: &[f64]) -> ViolinGroup {
        ViolinGroup {
            group: name.to_owned(),
            values: values.to_vec(),
        }
    }

    #[test]
    fn kernel_integrates_to_one() {
        let step = 0.01;
        let area = (-400..=400)
            .map(|index| epanechnikov(3.0, index as f64 * step) * step)
            .sum::<f64>();
        assert!((area - 1.0).abs() < 1e-3);
        assert_eq!(epanechnikov(3.0, 3.5), 0.0);
        assert_eq!(epanechnikov(3.0, 0.0), 0.25);
    }

    #[test]
    fn density_averages_the_kernels() {
        let density = kernel_density(&[0.0, 10.0], &[0.0, 5.0], 3.0);
        assert_eq!(density, [(0.0, 0.125), (5.0, 0.0)]);
        assert_eq!(kernel_density(&[], &[1.0], 3.0), [(1.0, 0.0)]);
    }

    #[test]
    fn ticks_use_round_steps() {
        assert_eq!(nice_ticks(0.0, 10.0, 5), [0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        assert_eq!(nice_ticks(-10.0, 95.0, 100).len(), 106);
        assert_eq!(nice_ticks(0.3, 0.3, 10), [0.3]);
    }

    #[test]
    fn violins_sit_in_padded_bands_and_fade_in() {
        let mut updater = ViolinUpdater::new(ViolinConfig::default(), vec2(210.0, 100.0));
        updater.update(vec![group("1798", &[10.0, 20.0]), group("1832", &[15.0])], 0.0);

        let step = 210.0 / 2.1;
        assert!((updater.band_width() - step * 0.9).abs() < 1e-3);
        let second = updater.violins()[1].target();
        assert!((second.center - (step * 1.1 + step * 0.45)).abs() < 1e-3);
        assert_eq!(updater.axis().unwrap().domain, (0.0, 30.0));

        assert_eq!(updater.violins()[0].shape(0.0).opacity, 0.0);
        assert_eq!(updater.violins()[0].shape(0.75).opacity, 0.6);
        assert_eq!(updater.violins()[0].shape(0.0).profile, updater.violins()[0].target().profile);
    }

    #[test]
    fn missing_groups_fade_out_then_drop() {
        let mut updater = ViolinUpdater::new(ViolinConfig::default(), vec2(200.0, 100.0));
        updater.update(vec![group("1798", &[10.0, 20.0]), group("1832", &[15.0])], 0.0);
        updater.update(vec![group("1832", &[15.0, 40.0])], 1.0);

        let leaving = updater.violins().iter().find(|violin| violin.group == "1798").unwrap();
        assert!(leaving.is_exiting());
        assert_eq!(leaving.target().opacity, 0.0);

        let kept = updater.violins().iter().find(|violin| violin.group == "1832").unwrap();
        assert_eq!(kept.count, 2);
        assert!(!kept.is_exiting());

        updater.prune(2.0);
        assert_eq!(updater.violins().len(), 1);
        assert!(!updater.is_animating(2.0));
    }

    #[test]
    fn shapes_with_different_sample_counts_still_morph() {
        let from = ViolinShape {
            center: 0.0,
            opacity: 0.0,
            profile: vec![[0.0, 0.0], [10.0, 4.0]],
        };
        let to = ViolinShape {
            center: 10.0,
            opacity: 1.0,
            profile: vec![[0.0, 2.0], [5.0, 2.0], [10.0, 2.0]],
        };
        let halfway = from.lerp(&to, 0.5);
        assert_eq!(halfway.profile, [[0.0, 1.0], [5.0, 2.0], [10.0, 3.0]]);
        assert_eq!(halfway.center, 5.0);
        assert_eq!(from.lerp(&to, 1.0).profile, to.profile);
    }
}
