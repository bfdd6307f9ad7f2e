use eframe::egui::{Vec2, vec2};

use super::quadtree::QuadCell;

/// Distance below which charge is clamped, in pixels.
const MIN_CHARGE_DISTANCE_SQ: f32 = 1.0;

fn separation_direction(from: usize, to: usize) -> Vec2 {
    let angle = ((from as f32) * 0.618_034 + (to as f32) * 0.414_214) * std::f32::consts::TAU;
    vec2(angle.cos(), angle.sin()) * 1e-3
}

/// Many-body charge on `index`; negative strength repels. Adds to `velocity`.
pub(super) fn accumulate_charge(
    cell: &QuadCell,
    index: usize,
    positions: &[Vec2],
    strength: f32,
    theta: f32,
    velocity: &mut Vec2,
) {
    if cell.mass <= 0.0 {
        return;
    }

    let point = positions[index];

    if cell.is_leaf() {
        for &other in &cell.members {
            if other == index {
                continue;
            }
            let mut delta = positions[other] - point;
            if delta.length_sq() < 1e-9 {
                delta = separation_direction(index, other);
            }
            let distance_sq = delta.length_sq().max(MIN_CHARGE_DISTANCE_SQ);
            *velocity += delta * (strength / distance_sq);
        }
        return;
    }

    let delta = cell.center_of_mass - point;
    let distance_sq = delta.length_sq().max(MIN_CHARGE_DISTANCE_SQ);
    let far_enough = !cell.bounds.contains(point)
        && cell.bounds.side() * cell.bounds.side() < theta * theta * distance_sq;

    if far_enough {
        *velocity += delta * (strength * cell.mass / distance_sq);
        return;
    }

    for child in cell.children() {
        accumulate_charge(child, index, positions, strength, theta, velocity);
    }
}

/// Pushes overlapping circles apart by adjusting their velocities.
pub(super) fn accumulate_collisions(
    cell_a: &QuadCell,
    cell_b: &QuadCell,
    same_cell: bool,
    positions: &[Vec2],
    radii: &[f32],
    strength: f32,
    velocities: &mut [Vec2],
) {
    let reach = cell_a.max_radius + cell_b.max_radius;
    if cell_a.bounds.gap_sq(cell_b.bounds) > reach * reach {
        return;
    }

    if cell_a.is_leaf() && cell_b.is_leaf() {
        for (offset, &from) in cell_a.members.iter().enumerate() {
            let partners = if same_cell {
                &cell_a.members[offset + 1..]
            } else {
                &cell_b.members[..]
            };
            for &to in partners {
                separate(from, to, positions, radii, strength, velocities);
            }
        }
        return;
    }

    if same_cell {
        let children = cell_a.children().collect::<Vec<_>>();
        for (offset, child) in children.iter().enumerate() {
            accumulate_collisions(child, child, true, positions, radii, strength, velocities);
            for other in &children[offset + 1..] {
                accumulate_collisions(child, other, false, positions, radii, strength, velocities);
            }
        }
        return;
    }

    let split_a = !cell_a.is_leaf()
        && (cell_b.is_leaf() || cell_a.bounds.half_extent >= cell_b.bounds.half_extent);

    if split_a {
        for child in cell_a.children() {
            accumulate_collisions(child, cell_b, false, positions, radii, strength, velocities);
        }
    } else {
        for child in cell_b.children() {
            accumulate_collisions(cell_a, child, false, positions, radii, strength, velocities);
        }
    }
}

fn separate(
    from: usize,
    to: usize,
    positions: &[Vec2],
    radii: &[f32],
    strength: f32,
    velocities: &mut [Vec2],
) {
    let (ra, rb) = (radii[from], radii[to]);
    let min_distance = ra + rb;
    let mut delta = positions[from] - positions[to];
    if delta.length_sq() < 1e-9 {
        delta = separation_direction(from, to);
    }

    let distance = delta.length();
    if distance >= min_distance {
        return;
    }

    let push = delta * ((min_distance - distance) / distance * strength);
    let weight_sq = ra * ra + rb * rb;
    let share = if weight_sq > 0.0 { rb * rb / weight_sq } else { 0.5 };
    velocities[from] += push * share;
    velocities[to] -= push * (1.0 - share);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_charge_pushes_nodes_apart() {
        let positions = vec![vec2(0.0, 0.0), vec2(10.0, 0.0)];
        let radii = vec![1.0, 1.0];
        let root = QuadCell::build(&positions, &radii).unwrap();

        let mut velocity = Vec2::ZERO;
        accumulate_charge(&root, 0, &positions, -30.0, 0.9, &mut velocity);
        assert!(velocity.x < 0.0);
        assert_eq!(velocity.y, 0.0);
    }

    #[test]
    fn overlapping_circles_separate() {
        let positions = vec![vec2(0.0, 0.0), vec2(4.0, 0.0)];
        let radii = vec![5.0, 5.0];
        let root = QuadCell::build(&positions, &radii).unwrap();

        let mut velocities = vec![Vec2::ZERO; 2];
        accumulate_collisions(&root, &root, true, &positions, &radii, 1.0, &mut velocities);
        assert!(velocities[0].x < 0.0);
        assert!(velocities[1].x > 0.0);
    }
}
