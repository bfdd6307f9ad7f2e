use std::cmp::Ordering;

use eframe::egui::{Pos2, Rect, Vec2, pos2, vec2};

use crate::data::hierarchy::HierarchyNode;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Circle {
    x: f64,
    y: f64,
    r: f64,
}

impl Circle {
    fn new(x: f64, y: f64, r: f64) -> Self {
        Self { x, y, r }
    }
}

/// One circle of the packed hierarchy, in base screen coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct PackedCircle {
    pub id: String,
    pub name: String,
    pub depth: usize,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub value: f64,
    pub center: Pos2,
    pub radius: f32,
}

impl PackedCircle {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_center_size(self.center, Vec2::splat(self.radius * 2.0))
    }

    pub fn contains(&self, point: Pos2) -> bool {
        self.center.distance_sq(point) <= self.radius * self.radius
    }
}

/// Circles in pre-order; index 0 is the root and parents precede children.
#[derive(Clone, Debug, Default)]
pub struct PackedHierarchy {
    pub circles: Vec<PackedCircle>,
}

impl PackedHierarchy {
    pub fn root(&self) -> Option<&PackedCircle> {
        self.circles.first()
    }

    pub fn get(&self, index: usize) -> Option<&PackedCircle> {
        self.circles.get(index)
    }

    pub fn find(&self, id: &str) -> Option<&PackedCircle> {
        self.circles.iter().find(|circle| circle.id == id)
    }

    /// Deepest non-leaf circle under `point`, skipping the root. Leaves take
    /// no pointer events.
    pub fn hit(&self, point: Pos2) -> Option<&PackedCircle> {
        self.circles
            .iter()
            .skip(1)
            .filter(|circle| !circle.is_leaf() && circle.contains(point))
            .max_by_key(|circle| circle.depth)
    }

    /// Smallest and largest radius, used by the label font scale.
    pub fn radius_extent(&self) -> Option<(f32, f32)> {
        self.circles.iter().map(|circle| circle.radius).fold(None, |extent, r| {
            Some(match extent {
                None => (r, r),
                Some((min, max)) => (min.min(r), max.max(r)),
            })
        })
    }
}

/// Packs `tree` into a `size` box centered at `center`: values are summed
/// bottom-up, siblings sorted by descending value, and leaf radii follow
/// the square root of their value.
pub fn pack(tree: &HierarchyNode, center: Pos2, size: Vec2, padding: f64) -> PackedHierarchy {
    let mut nodes = Vec::new();
    flatten(tree, None, 0, &mut nodes);

    let extent = size.x.min(size.y).max(0.0) as f64;
    let mut circles = vec![Circle::default(); nodes.len()];
    circles[0].x = center.x as f64;
    circles[0].y = center.y as f64;

    for (circle, node) in circles.iter_mut().zip(&nodes) {
        if node.children.is_empty() {
            circle.r = node.value.max(0.0).sqrt();
        }
    }

    for index in (0..nodes.len()).rev() {
        pack_children(index, &nodes, &mut circles, 0.0);
    }
    translate_children(&nodes, &mut circles, 1.0);

    let root_radius = circles[0].r;
    if root_radius > 0.0 && extent > 0.0 {
        let padding = padding * root_radius / extent;
        for index in (0..nodes.len()).rev() {
            pack_children(index, &nodes, &mut circles, padding);
        }
        let scale = extent / (2.0 * circles[0].r);
        translate_children(&nodes, &mut circles, scale);
    } else {
        for circle in circles.iter_mut() {
            *circle = Circle::new(center.x as f64, center.y as f64, 0.0);
        }
    }

    let circles = nodes
        .into_iter()
        .zip(circles)
        .enumerate()
        .map(|(index, (node, circle))| PackedCircle {
            id: index.to_string(),
            name: node.name,
            depth: node.depth,
            parent: node.parent,
            children: node.children,
            value: node.value,
            center: pos2(circle.x as f32, circle.y as f32),
            radius: circle.r as f32,
        })
        .collect();

    PackedHierarchy { circles }
}

struct FlatNode {
    name: String,
    depth: usize,
    parent: Option<usize>,
    children: Vec<usize>,
    value: f64,
}

fn subtree_value(node: &HierarchyNode) -> f64 {
    node.value.unwrap_or(0.0) + node.children.iter().map(subtree_value).sum::<f64>()
}

fn flatten(
    node: &HierarchyNode,
    parent: Option<usize>,
    depth: usize,
    out: &mut Vec<FlatNode>,
) -> usize {
    let index = out.len();
    out.push(FlatNode {
        name: node.name.clone(),
        depth,
        parent,
        children: Vec::new(),
        value: subtree_value(node),
    });

    let mut children = node
        .children
        .iter()
        .map(|child| (subtree_value(child), child))
        .collect::<Vec<_>>();
    children.sort_by(|(a, _), (b, _)| b.partial_cmp(a).unwrap_or(Ordering::Equal));

    let child_indices = children
        .into_iter()
        .map(|(_, child)| flatten(child, Some(index), depth + 1, out))
        .collect();
    out[index].children = child_indices;
    index
}

fn pack_children(index: usize, nodes: &[FlatNode], circles: &mut [Circle], padding: f64) {
    let children = &nodes[index].children;
    if children.is_empty() {
        return;
    }

    let mut siblings = children
        .iter()
        .map(|&child| {
            let circle = circles[child];
            Circle::new(circle.x, circle.y, circle.r + padding)
        })
        .collect::<Vec<_>>();
    let enclosing = pack_siblings(&mut siblings);

    for (&child, packed) in children.iter().zip(siblings) {
        circles[child] = Circle::new(packed.x, packed.y, packed.r - padding);
    }
    circles[index].r = enclosing + padding;
}

fn translate_children(nodes: &[FlatNode], circles: &mut [Circle], scale: f64) {
    for index in 0..nodes.len() {
        match nodes[index].parent {
            Some(parent) => {
                let origin = circles[parent];
                let circle = &mut circles[index];
                circle.x = origin.x + scale * circle.x;
                circle.y = origin.y + scale * circle.y;
                circle.r *= scale;
            }
            None => circles[index].r *= scale,
        }
    }
}

fn place(b: Circle, a: Circle, c: &mut Circle) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let d2 = dx * dx + dy * dy;
    if d2 <= 0.0 {
        c.x = a.x + c.r;
        c.y = a.y;
        return;
    }

    let a2 = (a.r + c.r).powi(2);
    let b2 = (b.r + c.r).powi(2);
    if a2 > b2 {
        let x = (d2 + b2 - a2) / (2.0 * d2);
        let y = (b2 / d2 - x * x).max(0.0).sqrt();
        c.x = b.x - x * dx - y * dy;
        c.y = b.y - x * dy + y * dx;
    } else {
        let x = (d2 + a2 - b2) / (2.0 * d2);
        let y = (a2 / d2 - x * x).max(0.0).sqrt();
        c.x = a.x + x * dx - y * dy;
        c.y = a.y + x * dy + y * dx;
    }
}

fn intersects(a: Circle, b: Circle) -> bool {
    let dr = a.r + b.r - 1e-6;
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    dr > 0.0 && dr * dr > dx * dx + dy * dy
}

fn score(a: Circle, b: Circle) -> f64 {
    let ab = a.r + b.r;
    if ab <= 0.0 {
        return a.x * a.x + a.y * a.y;
    }
    let dx = (a.x * b.r + b.x * a.r) / ab;
    let dy = (a.y * b.r + b.y * a.r) / ab;
    dx * dx + dy * dy
}

/// Places `circles` tangent to each other around the origin using a
/// front chain, then centers them on their enclosing circle. Returns the
/// enclosing radius.
fn pack_siblings(circles: &mut [Circle]) -> f64 {
    let n = circles.len();
    if n == 0 {
        return 0.0;
    }

    circles[0].x = 0.0;
    circles[0].y = 0.0;
    if n == 1 {
        return circles[0].r;
    }

    circles[0].x = -circles[1].r;
    circles[1].x = circles[0].r;
    circles[1].y = 0.0;
    if n == 2 {
        return circles[0].r + circles[1].r;
    }

    let (b, a) = (circles[1], circles[0]);
    place(b, a, &mut circles[2]);

    let mut next = vec![0usize; n];
    let mut previous = vec![0usize; n];
    let (mut a, mut b) = (0usize, 1usize);
    next[0] = 1;
    previous[2] = 1;
    next[1] = 2;
    previous[0] = 2;
    next[2] = 0;
    previous[1] = 0;

    let mut i = 3;
    'pack: while i < n {
        let (ca, cb) = (circles[a], circles[b]);
        place(ca, cb, &mut circles[i]);
        let c = i;

        let mut j = next[b];
        let mut k = previous[a];
        let mut sj = circles[b].r;
        let mut sk = circles[a].r;
        loop {
            if sj <= sk {
                if intersects(circles[j], circles[c]) {
                    b = j;
                    next[a] = b;
                    previous[b] = a;
                    continue 'pack;
                }
                sj += circles[j].r;
                j = next[j];
            } else {
                if intersects(circles[k], circles[c]) {
                    a = k;
                    next[a] = b;
                    previous[b] = a;
                    continue 'pack;
                }
                sk += circles[k].r;
                k = previous[k];
            }
            if j == next[k] {
                break;
            }
        }

        previous[c] = a;
        next[c] = b;
        next[a] = c;
        previous[b] = c;
        b = c;

        let mut best = score(circles[a], circles[next[a]]);
        let mut cursor = next[c];
        while cursor != b {
            let candidate = score(circles[cursor], circles[next[cursor]]);
            if candidate < best {
                a = cursor;
                best = candidate;
            }
            cursor = next[cursor];
        }
        b = next[a];
        i += 1;
    }

    let mut chain = vec![circles[b]];
    let mut cursor = next[b];
    while cursor != b {
        chain.push(circles[cursor]);
        cursor = next[cursor];
    }
    let enclosing = enclose(&chain);

    for circle in circles.iter_mut() {
        circle.x -= enclosing.x;
        circle.y -= enclosing.y;
    }
    enclosing.r
}

/// Smallest circle enclosing every circle in `circles` (Welzl's move-to-front).
fn enclose(circles: &[Circle]) -> Circle {
    let mut basis: Vec<Circle> = Vec::new();
    let mut enclosing: Option<Circle> = None;
    let mut i = 0;
    let mut restarts = 0usize;

    while i < circles.len() {
        let p = circles[i];
        if enclosing.is_some_and(|e| encloses_weak(e, p)) {
            i += 1;
            continue;
        }

        restarts += 1;
        match extend_basis(&basis, p) {
            Some(extended) if restarts <= circles.len() * circles.len() * 4 + 16 => {
                enclosing = Some(enclose_basis(&extended));
                basis = extended;
                i = 0;
            }
            _ => return enclose_naive(circles),
        }
    }

    enclosing.unwrap_or_default()
}

fn extend_basis(basis: &[Circle], p: Circle) -> Option<Vec<Circle>> {
    if encloses_weak_all(p, basis) {
        return Some(vec![p]);
    }

    for &b in basis {
        if encloses_not(p, b) && encloses_weak_all(enclose_two(b, p), basis) {
            return Some(vec![b, p]);
        }
    }

    for (offset, &bi) in basis.iter().enumerate() {
        for &bj in &basis[offset + 1..] {
            if encloses_not(enclose_two(bi, bj), p)
                && encloses_not(enclose_two(bi, p), bj)
                && encloses_not(enclose_two(bj, p), bi)
                && encloses_weak_all(enclose_three(bi, bj, p), basis)
            {
                return Some(vec![bi, bj, p]);
            }
        }
    }

    None
}

fn encloses_not(a: Circle, b: Circle) -> bool {
    let dr = a.r - b.r;
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    dr < 0.0 || dr * dr < dx * dx + dy * dy
}

fn encloses_weak(a: Circle, b: Circle) -> bool {
    let dr = a.r - b.r + a.r.max(b.r).max(1.0) * 1e-9;
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    dr > 0.0 && dr * dr > dx * dx + dy * dy
}

fn encloses_weak_all(a: Circle, basis: &[Circle]) -> bool {
    basis.iter().all(|&b| encloses_weak(a, b))
}

fn enclose_basis(basis: &[Circle]) -> Circle {
    match basis {
        [a] => *a,
        [a, b] => enclose_two(*a, *b),
        [a, b, c] => enclose_three(*a, *b, *c),
        _ => enclose_naive(basis),
    }
}

fn enclose_two(a: Circle, b: Circle) -> Circle {
    let x21 = b.x - a.x;
    let y21 = b.y - a.y;
    let r21 = b.r - a.r;
    let l = (x21 * x21 + y21 * y21).sqrt();
    if l <= 0.0 {
        return if a.r >= b.r { a } else { b };
    }
    Circle::new(
        (a.x + b.x + x21 / l * r21) / 2.0,
        (a.y + b.y + y21 / l * r21) / 2.0,
        (l + a.r + b.r) / 2.0,
    )
}

fn enclose_three(a: Circle, b: Circle, c: Circle) -> Circle {
    let (x1, y1, r1) = (a.x, a.y, a.r);
    let (x2, y2, r2) = (b.x, b.y, b.r);
    let (x3, y3, r3) = (c.x, c.y, c.r);
    let a2 = x1 - x2;
    let a3 = x1 - x3;
    let b2 = y1 - y2;
    let b3 = y1 - y3;
    let c2 = r2 - r1;
    let c3 = r3 - r1;
    let d1 = x1 * x1 + y1 * y1 - r1 * r1;
    let d2 = d1 - x2 * x2 - y2 * y2 + r2 * r2;
    let d3 = d1 - x3 * x3 - y3 * y3 + r3 * r3;
    let ab = a3 * b2 - a2 * b3;
    if ab == 0.0 {
        return enclose_naive(&[a, b, c]);
    }
    let xa = (b2 * d3 - b3 * d2) / (ab * 2.0) - x1;
    let xb = (b3 * c2 - b2 * c3) / ab;
    let ya = (a3 * d2 - a2 * d3) / (ab * 2.0) - y1;
    let yb = (a2 * c3 - a3 * c2) / ab;
    let qa = xb * xb + yb * yb - 1.0;
    let qb = 2.0 * (r1 + xa * xb + ya * yb);
    let qc = xa * xa + ya * ya - r1 * r1;
    let r = -(if qa.abs() > 1e-6 {
        (qb + (qb * qb - 4.0 * qa * qc).sqrt()) / (2.0 * qa)
    } else {
        qc / qb
    });
    Circle::new(x1 + xa + xb * r, y1 + ya + yb * r, r)
}

/// Centroid-based enclosure for inputs the exact solver cannot resolve.
fn enclose_naive(circles: &[Circle]) -> Circle {
    if circles.is_empty() {
        return Circle::default();
    }
    let count = circles.len() as f64;
    let x = circles.iter().map(|c| c.x).sum::<f64>() / count;
    let y = circles.iter().map(|c| c.y).sum::<f64>() / count;
    let r = circles
        .iter()
        .map(|c| ((c.x - x).powi(2) + (c.y - y).powi(2)).sqrt() + c.r)
        .fold(0.0, f64::max);
    Circle::new(x, y, r)
}

/// Base-space size for a packing that fits the viewport.
pub fn packing_size(viewport: Vec2) -> Vec2 {
    let side = viewport.x.min(viewport.y).max(1.0);
    vec2(side, side)
}
