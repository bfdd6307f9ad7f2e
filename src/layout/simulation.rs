use std::sync::{Arc, PoisonError, RwLock};

use eframe::egui::{Pos2, Vec2, vec2};
use tracing::trace;

use super::forces::{accumulate_charge, accumulate_collisions};
use super::quadtree::QuadCell;

const ALPHA_MIN: f32 = 0.001;
const ALPHA_TICKS: f32 = 300.0;
const INITIAL_RADIUS: f32 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForceParams {
    /// Many-body strength; negative values repel.
    pub charge_strength: f32,
    pub link_distance: f32,
    /// Added to each node radius for collision.
    pub collide_padding: f32,
    pub velocity_decay: f32,
    pub theta: f32,
}

impl Default for ForceParams {
    fn default() -> Self {
        Self {
            charge_strength: -700.0,
            link_distance: 30.0,
            collide_padding: 2.0,
            velocity_decay: 0.4,
            theta: 0.9,
        }
    }
}

/// Immutable positions after one simulation tick.
#[derive(Clone, Debug, Default)]
pub struct PositionSnapshot {
    pub revision: u64,
    pub positions: Vec<Pos2>,
}

impl PositionSnapshot {
    pub fn position(&self, index: usize) -> Option<Pos2> {
        self.positions.get(index).copied()
    }
}

/// Read side of the simulation. Cloning the reader is cheap and every clone
/// sees the latest published tick.
#[derive(Clone, Debug)]
pub struct PositionReader {
    shared: Arc<RwLock<Arc<PositionSnapshot>>>,
}

impl PositionReader {
    pub fn snapshot(&self) -> Arc<PositionSnapshot> {
        let guard = self.shared.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    pub fn position(&self, index: usize) -> Option<Pos2> {
        self.snapshot().position(index)
    }

    fn publish(&self, snapshot: PositionSnapshot) {
        let mut guard = self.shared.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(snapshot);
    }
}

#[derive(Clone, Copy, Debug)]
struct SimLink {
    source: usize,
    target: usize,
    strength: f32,
    bias: f32,
}

/// Force-directed layout with link, charge, centering and collision forces,
/// cooled by an alpha temperature that decays toward `alpha_target`.
pub struct ForceSimulation {
    params: ForceParams,
    positions: Vec<Vec2>,
    velocities: Vec<Vec2>,
    radii: Vec<f32>,
    pins: Vec<Option<Vec2>>,
    links: Vec<SimLink>,
    center: Vec2,
    alpha: f32,
    alpha_target: f32,
    alpha_decay: f32,
    revision: u64,
    reader: PositionReader,
}

impl ForceSimulation {
    pub fn new(params: ForceParams, radii: Vec<f32>, links: &[(usize, usize)], center: Pos2) -> Self {
        let node_count = radii.len();
        let center = center.to_vec2();

        let golden_angle = std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());
        let positions = (0..node_count)
            .map(|index| {
                let radius = INITIAL_RADIUS * (0.5 + index as f32).sqrt();
                let angle = index as f32 * golden_angle;
                center + vec2(radius * angle.cos(), radius * angle.sin())
            })
            .collect::<Vec<_>>();

        let mut degree = vec![0usize; node_count];
        let valid_links = links
            .iter()
            .copied()
            .filter(|&(source, target)| source < node_count && target < node_count)
            .collect::<Vec<_>>();
        for &(source, target) in &valid_links {
            degree[source] += 1;
            degree[target] += 1;
        }
        let links = valid_links
            .into_iter()
            .map(|(source, target)| {
                let (ds, dt) = (degree[source] as f32, degree[target] as f32);
                SimLink {
                    source,
                    target,
                    strength: 1.0 / ds.min(dt).max(1.0),
                    bias: ds / (ds + dt),
                }
            })
            .collect();

        let reader = PositionReader {
            shared: Arc::new(RwLock::new(Arc::new(PositionSnapshot {
                revision: 0,
                positions: positions.iter().map(|p| p.to_pos2()).collect(),
            }))),
        };

        Self {
            params,
            velocities: vec![Vec2::ZERO; node_count],
            pins: vec![None; node_count],
            positions,
            radii,
            links,
            center,
            alpha: 1.0,
            alpha_target: 0.0,
            alpha_decay: 1.0 - ALPHA_MIN.powf(1.0 / ALPHA_TICKS),
            revision: 0,
            reader,
        }
    }

    pub fn reader(&self) -> PositionReader {
        self.reader.clone()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn alpha_target(&self) -> f32 {
        self.alpha_target
    }

    pub fn set_alpha_target(&mut self, target: f32) {
        self.alpha_target = target.clamp(0.0, 1.0);
    }

    /// Reheats the layout, used after parameters changed.
    pub fn reheat(&mut self) {
        self.alpha = 1.0;
    }

    pub fn is_running(&self) -> bool {
        self.alpha >= ALPHA_MIN || self.alpha_target >= ALPHA_MIN
    }

    pub fn params(&self) -> ForceParams {
        self.params
    }

    pub fn set_params(&mut self, params: ForceParams) {
        if self.params != params {
            self.params = params;
            self.reheat();
        }
    }

    pub fn set_radii(&mut self, radii: Vec<f32>) {
        if radii.len() == self.radii.len() && radii != self.radii {
            self.radii = radii;
            self.reheat();
        }
    }

    pub fn set_center(&mut self, center: Pos2) {
        self.center = center.to_vec2();
    }

    pub fn position(&self, index: usize) -> Option<Pos2> {
        self.positions.get(index).map(|p| p.to_pos2())
    }

    /// Fixes a node at `at` until `unpin` is called.
    pub fn pin(&mut self, index: usize, at: Pos2) {
        if let Some(pin) = self.pins.get_mut(index) {
            *pin = Some(at.to_vec2());
        }
    }

    pub fn unpin(&mut self, index: usize) {
        if let Some(pin) = self.pins.get_mut(index) {
            *pin = None;
        }
    }

    pub fn is_pinned(&self, index: usize) -> bool {
        self.pins.get(index).is_some_and(Option::is_some)
    }

    /// Advances one tick and publishes the new positions.
    pub fn tick(&mut self) {
        self.alpha += (self.alpha_target - self.alpha) * self.alpha_decay;

        if !self.positions.is_empty() {
            self.apply_links();
            self.apply_charge();
            self.apply_center();
            self.apply_collisions();
            self.integrate();
        }

        self.revision += 1;
        self.reader.publish(PositionSnapshot {
            revision: self.revision,
            positions: self.positions.iter().map(|p| p.to_pos2()).collect(),
        });
        trace!(revision = self.revision, alpha = self.alpha, "simulation tick");
    }

    fn apply_links(&mut self) {
        let distance = self.params.link_distance;
        for link in &self.links {
            if link.source == link.target {
                continue;
            }
            let source_next = self.positions[link.source] + self.velocities[link.source];
            let target_next = self.positions[link.target] + self.velocities[link.target];
            let mut delta = target_next - source_next;
            if delta.length_sq() < 1e-9 {
                delta = vec2(1e-3, 0.0);
            }
            let length = delta.length();
            let pull = delta * ((length - distance) / length * self.alpha * link.strength);
            self.velocities[link.target] -= pull * link.bias;
            self.velocities[link.source] += pull * (1.0 - link.bias);
        }
    }

    fn apply_charge(&mut self) {
        let unit_mass = vec![1.0; self.positions.len()];
        let Some(root) = QuadCell::build(&self.positions, &unit_mass) else {
            return;
        };
        let strength = self.params.charge_strength * self.alpha;
        for (index, velocity) in self.velocities.iter_mut().enumerate() {
            accumulate_charge(&root, index, &self.positions, strength, self.params.theta, velocity);
        }
    }

    fn apply_center(&mut self) {
        let count = self.positions.len() as f32;
        let mean = self.positions.iter().fold(Vec2::ZERO, |sum, p| sum + *p) / count;
        let shift = self.center - mean;
        for position in &mut self.positions {
            *position += shift;
        }
    }

    fn apply_collisions(&mut self) {
        let predicted = self
            .positions
            .iter()
            .zip(&self.velocities)
            .map(|(p, v)| *p + *v)
            .collect::<Vec<_>>();
        let radii = self
            .radii
            .iter()
            .map(|r| r + self.params.collide_padding)
            .collect::<Vec<_>>();
        let Some(root) = QuadCell::build(&predicted, &radii) else {
            return;
        };
        accumulate_collisions(&root, &root, true, &predicted, &radii, 1.0, &mut self.velocities);
    }

    fn integrate(&mut self) {
        let keep = 1.0 - self.params.velocity_decay;
        for ((position, velocity), pin) in self
            .positions
            .iter_mut()
            .zip(self.velocities.iter_mut())
            .zip(&self.pins)
        {
            match pin {
                Some(pinned) => {
                    *position = *pinned;
                    *velocity = Vec2::ZERO;
                }
                None => {
                    *velocity *= keep;
                    *position += *velocity;
                }
            }
        }
    }
}
