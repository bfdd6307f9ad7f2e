use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use eframe::egui::{Pos2, pos2};

/// Spherical Mercator, centered on a longitude/latitude and translated so the
/// center lands on `translate`. `scale` multiplies radians.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mercator {
    center: [f64; 2],
    scale: f64,
    translate: [f64; 2],
}

impl Mercator {
    pub fn new(center: [f64; 2], scale: f64, translate: [f64; 2]) -> Self {
        Self {
            center,
            scale,
            translate,
        }
    }

    pub fn with_translate(mut self, translate: [f64; 2]) -> Self {
        self.translate = translate;
        self
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Longitude/latitude in degrees to base screen coordinates.
    pub fn project(&self, lon_lat: [f64; 2]) -> Option<[f64; 2]> {
        let [lon, lat] = lon_lat;
        if !lon.is_finite() || !lat.is_finite() || lat.abs() >= 90.0 {
            return None;
        }

        let lambda = (lon - self.center[0]).to_radians();
        let y = mercator_y(lat.to_radians()) - mercator_y(self.center[1].to_radians());

        Some([
            self.translate[0] + lambda * self.scale,
            self.translate[1] - y * self.scale,
        ])
    }

    pub fn invert(&self, point: [f64; 2]) -> Option<[f64; 2]> {
        if self.scale == 0.0 || !point[0].is_finite() || !point[1].is_finite() {
            return None;
        }

        let lambda = (point[0] - self.translate[0]) / self.scale;
        let y = mercator_y(self.center[1].to_radians()) - (point[1] - self.translate[1]) / self.scale;
        let phi = 2.0 * y.exp().atan() - FRAC_PI_2;

        Some([self.center[0] + lambda.to_degrees(), phi.to_degrees()])
    }

    pub fn project_pos(&self, lon_lat: Pos2) -> Option<Pos2> {
        self.project([lon_lat.x as f64, lon_lat.y as f64])
            .map(|[x, y]| pos2(x as f32, y as f32))
    }

    pub fn invert_pos(&self, point: Pos2) -> Option<Pos2> {
        self.invert([point.x as f64, point.y as f64])
            .map(|[lon, lat]| pos2(lon as f32, lat as f32))
    }
}

fn mercator_y(phi: f64) -> f64 {
    (FRAC_PI_4 + phi / 2.0).tan().ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lausanne() -> Mercator {
        Mercator::new([6.635, 46.525], 700_000.0, [400.0, 300.0])
    }

    #[test]
    fn center_projects_to_translate() {
        let [x, y] = lausanne().project([6.635, 46.525]).unwrap();
        assert!((x - 400.0).abs() < 1e-6);
        assert!((y - 300.0).abs() < 1e-6);
    }

    #[test]
    fn north_is_up_and_east_is_right() {
        let projection = lausanne();
        let [x, y] = projection.project([6.64, 46.53]).unwrap();
        assert!(x > 400.0);
        assert!(y < 300.0);
    }

    #[test]
    fn invert_round_trips() {
        let projection = lausanne();
        let point = [6.6312, 46.5197];
        let screen = projection.project(point).unwrap();
        let back = projection.invert(screen).unwrap();
        assert!((back[0] - point[0]).abs() < 1e-9);
        assert!((back[1] - point[1]).abs() < 1e-9);
    }

    #[test]
    fn poles_do_not_project() {
        assert!(lausanne().project([0.0, 90.0]).is_none());
    }
}
