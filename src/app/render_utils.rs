use eframe::egui::{Color32, Mesh, Painter, Pos2, Rect, Shape, Stroke, Vec2};
use storymap::interaction::transition::ZoomTransform;

pub(super) fn to_screen(rect: Rect, transform: ZoomTransform, base: Pos2) -> Pos2 {
    rect.min + transform.apply(base).to_vec2()
}

pub(super) fn to_base(rect: Rect, transform: ZoomTransform, screen: Pos2) -> Pos2 {
    transform.invert(Pos2::ZERO + (screen - rect.min))
}

pub(super) fn draw_background(painter: &Painter, rect: Rect, transform: ZoomTransform) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let step = (56.0 * transform.k.clamp(0.6, 1.8)).max(20.0);
    let origin = rect.min + Vec2::new(transform.x, transform.y);
    let line = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 70));

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], line);
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], line);
        y += step;
    }
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    rect.expand(radius.max(0.0)).contains(position)
}

// Liang-Barsky clip of the segment against `rect` grown by `padding`.
pub(super) fn edge_visible(rect: Rect, start: Pos2, end: Pos2, padding: f32) -> bool {
    let bounds = rect.expand(padding.max(0.0));
    let delta = end - start;
    let (mut enter, mut exit) = (0.0_f32, 1.0_f32);

    for (p, q) in [
        (-delta.x, start.x - bounds.left()),
        (delta.x, bounds.right() - start.x),
        (-delta.y, start.y - bounds.top()),
        (delta.y, bounds.bottom() - start.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return false;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            enter = enter.max(t);
        } else {
            exit = exit.min(t);
        }
        if enter > exit {
            return false;
        }
    }
    true
}

fn cross(o: Pos2, a: Pos2, b: Pos2) -> f32 {
    let oa = a - o;
    let ob = b - o;
    oa.x * ob.y - oa.y * ob.x
}

pub(super) fn point_in_polygon(point: Pos2, polygon: &[Pos2]) -> bool {
    let mut inside = false;
    let mut previous = match polygon.last() {
        Some(&last) => last,
        None => return false,
    };

    for &current in polygon {
        if (current.y > point.y) != (previous.y > point.y) {
            let t = (point.y - current.y) / (previous.y - current.y);
            if point.x < current.x + t * (previous.x - current.x) {
                inside = !inside;
            }
        }
        previous = current;
    }

    inside
}

fn signed_area(polygon: &[Pos2]) -> f32 {
    let mut area = 0.0;
    for (index, &a) in polygon.iter().enumerate() {
        let b = polygon[(index + 1) % polygon.len()];
        area += a.x * b.y - b.x * a.y;
    }
    area / 2.0
}

fn inside_triangle(p: Pos2, a: Pos2, b: Pos2, c: Pos2) -> bool {
    let d1 = cross(a, b, p);
    let d2 = cross(b, c, p);
    let d3 = cross(c, a, p);
    let has_negative = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_positive = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_negative && has_positive)
}

// Ear-clipping triangulation of a simple polygon. Falls back to a fan when
// no ear can be found (self-intersecting rings).
pub(super) fn triangulate(polygon: &[Pos2]) -> Vec<[u32; 3]> {
    let count = polygon.len();
    if count < 3 {
        return Vec::new();
    }

    let orientation = signed_area(polygon).signum();
    let mut remaining = (0..count as u32).collect::<Vec<_>>();
    let mut triangles = Vec::with_capacity(count - 2);

    while remaining.len() > 3 {
        let len = remaining.len();
        let ear = (0..len).find(|&i| {
            let prev = remaining[(i + len - 1) % len];
            let curr = remaining[i];
            let next = remaining[(i + 1) % len];
            let (a, b, c) = (
                polygon[prev as usize],
                polygon[curr as usize],
                polygon[next as usize],
            );

            if cross(a, b, c) * orientation <= 0.0 {
                return false;
            }

            remaining
                .iter()
                .filter(|&&other| other != prev && other != curr && other != next)
                .all(|&other| !inside_triangle(polygon[other as usize], a, b, c))
        });

        let Some(i) = ear else {
            let first = remaining[0];
            for pair in remaining[1..].windows(2) {
                triangles.push([first, pair[0], pair[1]]);
            }
            return triangles;
        };

        let prev = remaining[(i + len - 1) % len];
        let next = remaining[(i + 1) % len];
        triangles.push([prev, remaining[i], next]);
        remaining.remove(i);
    }

    triangles.push([remaining[0], remaining[1], remaining[2]]);
    triangles
}

pub(super) fn fill_polygon(painter: &Painter, points: &[Pos2], triangles: &[[u32; 3]], color: Color32) {
    if triangles.is_empty() {
        return;
    }

    let mut mesh = Mesh::default();
    for &point in points {
        mesh.colored_vertex(point, color);
    }
    for &[a, b, c] in triangles {
        mesh.add_triangle(a, b, c);
    }
    painter.add(Shape::mesh(mesh));
}

pub(super) fn outline_polygon(painter: &Painter, points: Vec<Pos2>, stroke: Stroke) {
    if points.len() >= 2 {
        painter.add(Shape::closed_line(points, stroke));
    }
}

pub(super) fn sqrt_scale(value: f32, domain: (f32, f32), range: (f32, f32)) -> f32 {
    let low = domain.0.max(0.0).sqrt();
    let high = domain.1.max(0.0).sqrt();
    if (high - low).abs() <= f32::EPSILON {
        return (range.0 + range.1) / 2.0;
    }

    let t = ((value.max(0.0).sqrt() - low) / (high - low)).clamp(0.0, 1.0);
    range.0 + (range.1 - range.0) * t
}

pub(super) fn text_color_for(fill: Color32) -> Color32 {
    let luminance = 0.299 * fill.r() as f32 + 0.587 * fill.g() as f32 + 0.114 * fill.b() as f32;
    if luminance > 150.0 {
        Color32::from_rgb(30, 30, 30)
    } else {
        Color32::WHITE
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::pos2;

    use super::*;

    fn l_shape() -> Vec<Pos2> {
        vec![
            pos2(0.0, 0.0),
            pos2(2.0, 0.0),
            pos2(2.0, 1.0),
            pos2(1.0, 1.0),
            pos2(1.0, 2.0),
            pos2(0.0, 2.0),
        ]
    }

    #[test]
    fn concave_ring_triangulates_without_covering_the_notch() {
        let shape = l_shape();
        let triangles = triangulate(&shape);
        assert_eq!(triangles.len(), 4);

        let notch = pos2(1.5, 1.5);
        let covered = triangles.iter().any(|&[a, b, c]| {
            inside_triangle(notch, shape[a as usize], shape[b as usize], shape[c as usize])
        });
        assert!(!covered);
    }

    #[test]
    fn triangles_survive_a_viewport_translation() {
        let shape = l_shape();
        let shifted = shape
            .iter()
            .map(|point| *point + Vec2::new(320.0, 240.0))
            .collect::<Vec<_>>();
        assert_eq!(triangulate(&shifted), triangulate(&shape));
    }

    #[test]
    fn point_in_concave_polygon() {
        let shape = l_shape();
        assert!(point_in_polygon(pos2(0.5, 1.5), &shape));
        assert!(!point_in_polygon(pos2(1.5, 1.5), &shape));
        assert!(!point_in_polygon(pos2(0.5, 0.5), &[]));
    }

    #[test]
    fn screen_and_base_round_trip() {
        let rect = Rect::from_min_size(pos2(10.0, 20.0), Vec2::new(300.0, 200.0));
        let transform = ZoomTransform::new(5.0, -4.0, 2.0);
        let screen = to_screen(rect, transform, pos2(7.0, 9.0));
        assert_eq!(screen, pos2(10.0 + 19.0, 20.0 + 14.0));
        assert_eq!(to_base(rect, transform, screen), pos2(7.0, 9.0));
    }

    #[test]
    fn edges_crossing_the_view_are_kept() {
        let rect = Rect::from_min_size(pos2(0.0, 0.0), Vec2::new(100.0, 100.0));
        assert!(edge_visible(rect, pos2(-50.0, 50.0), pos2(150.0, 50.0), 0.0));
        assert!(edge_visible(rect, pos2(10.0, 10.0), pos2(20.0, 20.0), 0.0));
        assert!(!edge_visible(rect, pos2(-50.0, -10.0), pos2(-10.0, -50.0), 0.0));
        assert!(!edge_visible(rect, pos2(150.0, -10.0), pos2(210.0, 60.0), 2.0));
        assert!(circle_visible(rect, pos2(-5.0, 50.0), 6.0));
        assert!(!circle_visible(rect, pos2(-5.0, 50.0), 4.0));
    }

    #[test]
    fn sqrt_scale_clamps_to_range() {
        assert_eq!(sqrt_scale(0.0, (0.0, 100.0), (5.0, 100.0)), 5.0);
        assert_eq!(sqrt_scale(400.0, (0.0, 100.0), (5.0, 100.0)), 100.0);
        assert_eq!(sqrt_scale(25.0, (0.0, 100.0), (0.0, 10.0)), 5.0);
    }
}
