use eframe::egui::{Pos2, Vec2, pos2};

use super::color::Color;

/// Cubic in-out easing, the default curve of the site's transitions.
pub fn ease_cubic_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0) * 2.0;
    if t <= 1.0 {
        t * t * t / 2.0
    } else {
        let t = t - 2.0;
        (t * t * t + 2.0) / 2.0
    }
}

pub trait Lerp: Clone + PartialEq {
    fn lerp(&self, other: &Self, t: f64) -> Self;
}

impl Lerp for f32 {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        self + (other - self) * t as f32
    }
}

impl Lerp for f64 {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        self + (other - self) * t
    }
}

impl Lerp for Color {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        Color::lerp(*self, *other, t as f32)
    }
}

/// An eased transition toward a target value.
///
/// Retargeting starts from the value currently displayed, so a newer
/// transition on the same element always wins over an in-flight one.
#[derive(Clone, Debug)]
pub struct Tween<T> {
    from: T,
    to: T,
    start: f64,
    duration: f64,
}

impl<T: Lerp> Tween<T> {
    pub fn settled(value: T) -> Self {
        Self {
            from: value.clone(),
            to: value,
            start: 0.0,
            duration: 0.0,
        }
    }

    pub fn value_at(&self, now: f64) -> T {
        let progress = self.progress(now);
        if progress >= 1.0 {
            return self.to.clone();
        }
        self.from.lerp(&self.to, ease_cubic_in_out(progress))
    }

    pub fn target(&self) -> &T {
        &self.to
    }

    pub fn is_finished(&self, now: f64) -> bool {
        self.progress(now) >= 1.0
    }

    /// Starts a transition to `to`. Returns `false` when `to` is already the target.
    pub fn retarget(&mut self, to: T, now: f64, duration: f64) -> bool {
        if self.to == to {
            return false;
        }
        self.from = self.value_at(now);
        self.to = to;
        self.start = now;
        self.duration = duration.max(0.0);
        true
    }

    pub fn jump_to(&mut self, value: T) {
        self.from = value.clone();
        self.to = value;
        self.duration = 0.0;
    }

    fn progress(&self, now: f64) -> f64 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        ((now - self.start) / self.duration).clamp(0.0, 1.0)
    }
}

/// Pan and scale applied to base screen coordinates: `p * k + (x, y)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomTransform {
    pub x: f32,
    pub y: f32,
    pub k: f32,
}

impl ZoomTransform {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        k: 1.0,
    };

    pub fn new(x: f32, y: f32, k: f32) -> Self {
        Self { x, y, k }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    pub fn apply(&self, point: Pos2) -> Pos2 {
        pos2(point.x * self.k + self.x, point.y * self.k + self.y)
    }

    pub fn invert(&self, point: Pos2) -> Pos2 {
        pos2((point.x - self.x) / self.k, (point.y - self.y) / self.k)
    }

    /// Scales around `anchor` (a point in transformed space), clamping `k` to `extent`.
    pub fn scaled_around(&self, factor: f32, anchor: Pos2, extent: (f32, f32)) -> Self {
        let k = (self.k * factor).clamp(extent.0, extent.1);
        let base = self.invert(anchor);
        Self {
            x: anchor.x - base.x * k,
            y: anchor.y - base.y * k,
            k,
        }
    }

    pub fn translated(&self, delta: Vec2) -> Self {
        Self {
            x: self.x + delta.x,
            y: self.y + delta.y,
            k: self.k,
        }
    }
}

impl Default for ZoomTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Smooth pan-and-zoom between two transforms (van Wijk and Nuij), eased.
#[derive(Clone, Debug)]
pub struct ZoomTransition {
    from: ZoomTransform,
    to: ZoomTransform,
    viewport: Vec2,
    start: f64,
    duration: f64,
}

impl ZoomTransition {
    const RHO: f64 = std::f64::consts::SQRT_2;

    pub fn settled(transform: ZoomTransform) -> Self {
        Self {
            from: transform,
            to: transform,
            viewport: Vec2::ZERO,
            start: 0.0,
            duration: 0.0,
        }
    }

    pub fn target(&self) -> ZoomTransform {
        self.to
    }

    pub fn is_finished(&self, now: f64) -> bool {
        self.duration <= 0.0 || now - self.start >= self.duration
    }

    pub fn retarget(&mut self, to: ZoomTransform, viewport: Vec2, now: f64, duration: f64) {
        self.from = self.value_at(now);
        self.to = to;
        self.viewport = viewport;
        self.start = now;
        self.duration = duration.max(0.0);
    }

    pub fn jump_to(&mut self, transform: ZoomTransform) {
        self.from = transform;
        self.to = transform;
        self.duration = 0.0;
    }

    pub fn value_at(&self, now: f64) -> ZoomTransform {
        if self.is_finished(now) {
            return self.to;
        }

        let t = ease_cubic_in_out((now - self.start) / self.duration);
        let view_from = self.view_of(self.from);
        let view_to = self.view_of(self.to);
        self.transform_of(interpolate_view(view_from, view_to, t, Self::RHO))
    }

    fn view_of(&self, transform: ZoomTransform) -> [f64; 3] {
        let k = transform.k.max(f32::EPSILON) as f64;
        let half_w = self.viewport.x as f64 / 2.0;
        let half_h = self.viewport.y as f64 / 2.0;
        [
            (half_w - transform.x as f64) / k,
            (half_h - transform.y as f64) / k,
            self.viewport.x.max(1.0) as f64 / k,
        ]
    }

    fn transform_of(&self, view: [f64; 3]) -> ZoomTransform {
        let k = self.viewport.x.max(1.0) as f64 / view[2];
        ZoomTransform {
            x: (self.viewport.x as f64 / 2.0 - view[0] * k) as f32,
            y: (self.viewport.y as f64 / 2.0 - view[1] * k) as f32,
            k: k as f32,
        }
    }
}

/// Interpolates views `[center_x, center_y, width]` along the optimal zoom path.
fn interpolate_view(from: [f64; 3], to: [f64; 3], t: f64, rho: f64) -> [f64; 3] {
    const EPSILON_SQ: f64 = 1e-12;

    let [ux0, uy0, w0] = from;
    let [ux1, uy1, w1] = to;
    let dx = ux1 - ux0;
    let dy = uy1 - uy0;
    let d2 = dx * dx + dy * dy;
    let rho2 = rho * rho;
    let rho4 = rho2 * rho2;

    if d2 < EPSILON_SQ {
        let s_total = (w1 / w0).ln() / rho;
        return [ux0 + t * dx, uy0 + t * dy, w0 * (rho * t * s_total).exp()];
    }

    let d1 = d2.sqrt();
    let b0 = (w1 * w1 - w0 * w0 + rho4 * d2) / (2.0 * w0 * rho2 * d1);
    let b1 = (w1 * w1 - w0 * w0 - rho4 * d2) / (2.0 * w1 * rho2 * d1);
    let r0 = ((b0 * b0 + 1.0).sqrt() - b0).ln();
    let r1 = ((b1 * b1 + 1.0).sqrt() - b1).ln();
    let s_total = (r1 - r0) / rho;

    let s = t * s_total;
    let cosh_r0 = r0.cosh();
    let u = w0 / (rho2 * d1) * (cosh_r0 * (rho * s + r0).tanh() - r0.sinh());
    [ux0 + u * dx, uy0 + u * dy, w0 * cosh_r0 / (rho * s + r0).cosh()]
}
