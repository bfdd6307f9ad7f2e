use anyhow::{Result, bail};
use eframe::egui::{Pos2, Rect, pos2};

use crate::data::sankey::FlowGraph;

const RELAXATION_PASSES: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SankeyParams {
    pub node_width: f32,
    pub node_padding: f32,
    pub extent: Rect,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeBox {
    pub x0: f32,
    pub x1: f32,
    pub y0: f32,
    pub y1: f32,
    /// Larger of the inflow and outflow.
    pub value: f64,
    pub depth: usize,
    pub height: usize,
    pub layer: usize,
}

impl NodeBox {
    pub fn rect(&self) -> Rect {
        Rect::from_min_max(pos2(self.x0, self.y0), pos2(self.x1, self.y1))
    }
}

/// A flow drawn as a band of `width` from the source's right edge at `y0`
/// to the target's left edge at `y1`.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkBand {
    pub source: usize,
    pub target: usize,
    pub value: f64,
    pub width: f32,
    pub y0: f32,
    pub y1: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SankeyLayout {
    pub nodes: Vec<NodeBox>,
    pub links: Vec<LinkBand>,
}

impl SankeyLayout {
    pub fn node_at(&self, point: Pos2) -> Option<usize> {
        self.nodes.iter().position(|node| node.rect().contains(point))
    }

    /// Topmost band under `point`, approximating the centre line by a smoothstep.
    pub fn link_at(&self, point: Pos2) -> Option<usize> {
        self.links
            .iter()
            .enumerate()
            .rev()
            .find(|(_, link)| {
                let start = self.nodes[link.source].x1;
                let end = self.nodes[link.target].x0;
                if point.x < start || point.x > end || end <= start {
                    return false;
                }
                let t = (point.x - start) / (end - start);
                let eased = t * t * (3.0 - 2.0 * t);
                let y = link.y0 + (link.y1 - link.y0) * eased;
                (point.y - y).abs() <= link.width.max(1.0) / 2.0
            })
            .map(|(index, _)| index)
    }

    /// Control points of the band's centre line: a horizontal cubic.
    pub fn link_curve(&self, index: usize) -> Option<[Pos2; 4]> {
        let link = self.links.get(index)?;
        let x0 = self.nodes[link.source].x1;
        let x1 = self.nodes[link.target].x0;
        let mid = (x0 + x1) / 2.0;
        Some([
            pos2(x0, link.y0),
            pos2(mid, link.y0),
            pos2(mid, link.y1),
            pos2(x1, link.y1),
        ])
    }
}

struct Builder<'a> {
    graph: &'a FlowGraph,
    nodes: Vec<Node>,
    links: Vec<Link>,
    y0: f64,
    y1: f64,
    padding: f64,
}

#[derive(Clone, Default)]
struct Node {
    source_links: Vec<usize>,
    target_links: Vec<usize>,
    value: f64,
    depth: usize,
    height: usize,
    layer: usize,
    x0: f64,
    x1: f64,
    y0: f64,
    y1: f64,
}

#[derive(Clone)]
struct Link {
    source: usize,
    target: usize,
    value: f64,
    width: f64,
    y0: f64,
    y1: f64,
}

/// Justified sankey layout: every node sits in the column of its depth,
/// except sinks which are pushed to the last column.
///
/// Fails on circular flows.
pub fn layout(graph: &FlowGraph, params: &SankeyParams) -> Result<SankeyLayout> {
    let mut builder = Builder {
        graph,
        nodes: vec![Node::default(); graph.nodes.len()],
        links: graph
            .flows
            .iter()
            .map(|flow| Link {
                source: flow.source,
                target: flow.target,
                value: flow.value,
                width: 0.0,
                y0: 0.0,
                y1: 0.0,
            })
            .collect(),
        y0: params.extent.top() as f64,
        y1: params.extent.bottom() as f64,
        padding: params.node_padding as f64,
    };

    builder.link_nodes();
    builder.compute_values();
    builder.compute_depths()?;
    builder.compute_heights()?;
    let columns = builder.compute_layers(params);
    builder.compute_breadths(&columns);
    builder.compute_link_breadths();

    Ok(SankeyLayout {
        nodes: builder
            .nodes
            .iter()
            .map(|node| NodeBox {
                x0: node.x0 as f32,
                x1: node.x1 as f32,
                y0: node.y0 as f32,
                y1: node.y1 as f32,
                value: node.value,
                depth: node.depth,
                height: node.height,
                layer: node.layer,
            })
            .collect(),
        links: builder
            .links
            .iter()
            .map(|link| LinkBand {
                source: link.source,
                target: link.target,
                value: link.value,
                width: link.width as f32,
                y0: link.y0 as f32,
                y1: link.y1 as f32,
            })
            .collect(),
    })
}

impl Builder<'_> {
    fn link_nodes(&mut self) {
        for (index, link) in self.links.iter().enumerate() {
            self.nodes[link.source].source_links.push(index);
            self.nodes[link.target].target_links.push(index);
        }
    }

    fn compute_values(&mut self) {
        for node in &mut self.nodes {
            let outflow = node.source_links.iter().map(|&link| self.links[link].value).sum::<f64>();
            let inflow = node.target_links.iter().map(|&link| self.links[link].value).sum::<f64>();
            node.value = outflow.max(inflow);
        }
    }

    fn compute_depths(&mut self) -> Result<()> {
        let count = self.nodes.len();
        let mut current = (0..count).collect::<Vec<_>>();
        let mut depth = 0;
        while !current.is_empty() {
            let mut next = Vec::new();
            for &node in &current {
                self.nodes[node].depth = depth;
                for &link in &self.nodes[node].source_links {
                    let target = self.links[link].target;
                    if !next.contains(&target) {
                        next.push(target);
                    }
                }
            }
            depth += 1;
            if depth > count {
                bail!("circular flow between {}", self.cycle_hint(&next));
            }
            current = next;
        }
        Ok(())
    }

    fn compute_heights(&mut self) -> Result<()> {
        let count = self.nodes.len();
        let mut current = (0..count).collect::<Vec<_>>();
        let mut height = 0;
        while !current.is_empty() {
            let mut next = Vec::new();
            for &node in &current {
                self.nodes[node].height = height;
                for &link in &self.nodes[node].target_links {
                    let source = self.links[link].source;
                    if !next.contains(&source) {
                        next.push(source);
                    }
                }
            }
            height += 1;
            if height > count {
                bail!("circular flow between {}", self.cycle_hint(&next));
            }
            current = next;
        }
        Ok(())
    }

    fn cycle_hint(&self, nodes: &[usize]) -> String {
        nodes
            .iter()
            .take(4)
            .map(|&node| self.graph.nodes[node].id.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn compute_layers(&mut self, params: &SankeyParams) -> Vec<Vec<usize>> {
        let layers = self.nodes.iter().map(|node| node.depth).max().map_or(0, |depth| depth + 1);
        let x0 = params.extent.left() as f64;
        let x1 = params.extent.right() as f64;
        let dx = params.node_width as f64;
        let kx = if layers > 1 {
            (x1 - x0 - dx) / (layers - 1) as f64
        } else {
            0.0
        };

        let mut columns = vec![Vec::new(); layers];
        for (index, node) in self.nodes.iter_mut().enumerate() {
            let layer = if node.source_links.is_empty() {
                layers.saturating_sub(1)
            } else {
                node.depth.min(layers.saturating_sub(1))
            };
            node.layer = layer;
            node.x0 = x0 + layer as f64 * kx;
            node.x1 = node.x0 + dx;
            columns[layer].push(index);
        }
        columns
    }

    fn compute_breadths(&mut self, columns: &[Vec<usize>]) {
        let tallest = columns.iter().map(Vec::len).max().unwrap_or(0);
        if tallest > 1 {
            self.padding = self.padding.min((self.y1 - self.y0) / (tallest - 1) as f64);
        }
        let mut columns = columns.to_vec();
        self.initialize_breadths(&columns);

        for pass in 0..RELAXATION_PASSES {
            let alpha = 0.99_f64.powi(pass as i32);
            let beta = (1.0 - alpha).max((pass + 1) as f64 / RELAXATION_PASSES as f64);
            self.relax_right_to_left(&mut columns, alpha, beta);
            self.relax_left_to_right(&mut columns, alpha, beta);
        }
    }

    fn initialize_breadths(&mut self, columns: &[Vec<usize>]) {
        let ky = columns
            .iter()
            .filter(|column| !column.is_empty())
            .map(|column| {
                let total = column.iter().map(|&node| self.nodes[node].value).sum::<f64>();
                let free = self.y1 - self.y0 - (column.len() - 1) as f64 * self.padding;
                if total > 0.0 { free / total } else { f64::INFINITY }
            })
            .fold(f64::INFINITY, f64::min);
        let ky = if ky.is_finite() { ky } else { 0.0 };

        for column in columns {
            let mut y = self.y0;
            for &index in column {
                let node = &mut self.nodes[index];
                node.y0 = y;
                node.y1 = y + node.value * ky;
                y = node.y1 + self.padding;
                for &link in &node.source_links {
                    self.links[link].width = self.links[link].value * ky;
                }
            }

            let spread = (self.y1 - y + self.padding) / (column.len() + 1) as f64;
            for (rank, &index) in column.iter().enumerate() {
                let offset = spread * (rank + 1) as f64;
                self.nodes[index].y0 += offset;
                self.nodes[index].y1 += offset;
            }
            for &index in column {
                self.sort_node_links(index);
            }
        }
    }

    fn relax_left_to_right(&mut self, columns: &mut [Vec<usize>], alpha: f64, beta: f64) {
        for column in columns.iter_mut().skip(1) {
            for &target in column.iter() {
                let mut y = 0.0;
                let mut weight = 0.0;
                for &link in &self.nodes[target].target_links {
                    let source = self.links[link].source;
                    let v = self.links[link].value * self.layer_gap(source, target);
                    y += self.target_top(source, target) * v;
                    weight += v;
                }
                if weight <= 0.0 {
                    continue;
                }
                let dy = (y / weight - self.nodes[target].y0) * alpha;
                self.nodes[target].y0 += dy;
                self.nodes[target].y1 += dy;
                self.reorder_neighbor_links(target);
            }
            self.sort_by_breadth(column);
            self.resolve_collisions(column, beta);
        }
    }

    fn relax_right_to_left(&mut self, columns: &mut [Vec<usize>], alpha: f64, beta: f64) {
        let count = columns.len();
        for column in columns.iter_mut().take(count.saturating_sub(1)).rev() {
            for &source in column.iter() {
                let mut y = 0.0;
                let mut weight = 0.0;
                for &link in &self.nodes[source].source_links {
                    let target = self.links[link].target;
                    let v = self.links[link].value * self.layer_gap(source, target);
                    y += self.source_top(source, target) * v;
                    weight += v;
                }
                if weight <= 0.0 {
                    continue;
                }
                let dy = (y / weight - self.nodes[source].y0) * alpha;
                self.nodes[source].y0 += dy;
                self.nodes[source].y1 += dy;
                self.reorder_neighbor_links(source);
            }
            self.sort_by_breadth(column);
            self.resolve_collisions(column, beta);
        }
    }

    fn layer_gap(&self, source: usize, target: usize) -> f64 {
        self.nodes[target].layer as f64 - self.nodes[source].layer as f64
    }

    /// Where a link from `source` should enter `target` for the two ends to
    /// line up.
    fn target_top(&self, source: usize, target: usize) -> f64 {
        let source_node = &self.nodes[source];
        let mut y = source_node.y0 - (source_node.source_links.len() as f64 - 1.0) * self.padding / 2.0;
        for &link in &source_node.source_links {
            if self.links[link].target == target {
                break;
            }
            y += self.links[link].width + self.padding;
        }
        for &link in &self.nodes[target].target_links {
            if self.links[link].source == source {
                break;
            }
            y -= self.links[link].width;
        }
        y
    }

    fn source_top(&self, source: usize, target: usize) -> f64 {
        let target_node = &self.nodes[target];
        let mut y = target_node.y0 - (target_node.target_links.len() as f64 - 1.0) * self.padding / 2.0;
        for &link in &target_node.target_links {
            if self.links[link].source == source {
                break;
            }
            y += self.links[link].width + self.padding;
        }
        for &link in &self.nodes[source].source_links {
            if self.links[link].target == target {
                break;
            }
            y -= self.links[link].width;
        }
        y
    }

    fn sort_by_breadth(&self, column: &mut [usize]) {
        column.sort_by(|&a, &b| self.nodes[a].y0.total_cmp(&self.nodes[b].y0));
    }

    fn resolve_collisions(&mut self, column: &[usize], alpha: f64) {
        if column.is_empty() {
            return;
        }
        let middle = column.len() / 2;
        let subject = &self.nodes[column[middle]];
        let (above, below) = (subject.y0 - self.padding, subject.y1 + self.padding);
        self.push_up(column, above, middle as isize - 1, alpha);
        self.push_down(column, below, middle + 1, alpha);
        self.push_up(column, self.y1, column.len() as isize - 1, alpha);
        self.push_down(column, self.y0, 0, alpha);
    }

    fn push_down(&mut self, column: &[usize], mut y: f64, from: usize, alpha: f64) {
        for &index in column.iter().skip(from) {
            let node = &mut self.nodes[index];
            let dy = (y - node.y0) * alpha;
            if dy > 1e-6 {
                node.y0 += dy;
                node.y1 += dy;
            }
            y = node.y1 + self.padding;
        }
    }

    fn push_up(&mut self, column: &[usize], mut y: f64, from: isize, alpha: f64) {
        if from < 0 {
            return;
        }
        for &index in column[..=from as usize].iter().rev() {
            let node = &mut self.nodes[index];
            let dy = (node.y1 - y) * alpha;
            if dy > 1e-6 {
                node.y0 -= dy;
                node.y1 -= dy;
            }
            y = node.y0 - self.padding;
        }
    }

    fn reorder_neighbor_links(&mut self, node: usize) {
        let incoming = self.nodes[node].target_links.clone();
        for link in incoming {
            let source = self.links[link].source;
            self.sort_source_links(source);
        }
        let outgoing = self.nodes[node].source_links.clone();
        for link in outgoing {
            let target = self.links[link].target;
            self.sort_target_links(target);
        }
    }

    fn sort_node_links(&mut self, node: usize) {
        self.sort_source_links(node);
        self.sort_target_links(node);
    }

    fn sort_source_links(&mut self, node: usize) {
        let mut links = std::mem::take(&mut self.nodes[node].source_links);
        links.sort_by(|&a, &b| {
            let (ta, tb) = (self.links[a].target, self.links[b].target);
            self.nodes[ta].y0.total_cmp(&self.nodes[tb].y0).then(a.cmp(&b))
        });
        self.nodes[node].source_links = links;
    }

    fn sort_target_links(&mut self, node: usize) {
        let mut links = std::mem::take(&mut self.nodes[node].target_links);
        links.sort_by(|&a, &b| {
            let (sa, sb) = (self.links[a].source, self.links[b].source);
            self.nodes[sa].y0.total_cmp(&self.nodes[sb].y0).then(a.cmp(&b))
        });
        self.nodes[node].target_links = links;
    }

    fn compute_link_breadths(&mut self) {
        for node in &self.nodes {
            let mut y = node.y0;
            for &link in &node.source_links {
                let width = self.links[link].width;
                self.links[link].y0 = y + width / 2.0;
                y += width;
            }
            let mut y = node.y0;
            for &link in &node.target_links {
                let width = self.links[link].width;
                self.links[link].y1 = y + width / 2.0;
                y += width;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;
    use crate::data::sankey::parse_flows;

    fn params() -> SankeyParams {
        SankeyParams {
            node_width: 15.0,
            node_padding: 10.0,
            extent: Rect::from_min_size(pos2(1.0, 5.0), vec2(398.0, 290.0)),
        }
    }

    const FLOWS: &str = r#"[
        {"source": "bourg 1798", "target": "commerce", "value": 12},
        {"source": "palud 1798", "target": "commerce", "value": 4},
        {"source": "bourg 1798", "target": "rente", "value": 4},
        {"source": "commerce", "target": "bourg 1832", "value": 10}
    ]"#;

    #[test]
    fn sinks_are_justified_to_the_last_column() {
        let graph = parse_flows(FLOWS).unwrap();
        let layout = layout(&graph, &params()).unwrap();

        let rente = graph.index_of("rente").unwrap();
        let commerce = graph.index_of("commerce").unwrap();
        assert_eq!(layout.nodes[rente].depth, 1);
        assert_eq!(layout.nodes[rente].layer, 2);
        assert_eq!(layout.nodes[commerce].layer, 1);
        assert_eq!(layout.nodes[rente].x0, 399.0 - 15.0);
        assert_eq!(layout.nodes[0].x0, 1.0);
        assert!((layout.nodes[commerce].x0 - (1.0 + (398.0 - 15.0) / 2.0)).abs() < 1e-3);
    }

    #[test]
    fn node_values_take_the_larger_side() {
        let graph = parse_flows(FLOWS).unwrap();
        let layout = layout(&graph, &params()).unwrap();
        let commerce = graph.index_of("commerce").unwrap();
        assert_eq!(layout.nodes[commerce].value, 16.0);
        assert_eq!(layout.nodes[0].value, 16.0);
    }

    #[test]
    fn heights_share_one_scale_and_stay_inside_the_extent() {
        let graph = parse_flows(FLOWS).unwrap();
        let layout = layout(&graph, &params()).unwrap();
        let ky = (layout.nodes[0].y1 - layout.nodes[0].y0) as f64 / layout.nodes[0].value;
        for node in &layout.nodes {
            assert!(((node.y1 - node.y0) as f64 - node.value * ky).abs() < 1e-3);
            assert!(node.y0 >= 5.0 - 1e-3 && node.y1 <= 295.0 + 1e-3);
        }
        for link in &layout.links {
            assert!((link.width as f64 - link.value * ky).abs() < 1e-3);
        }
    }

    #[test]
    fn bands_stack_inside_their_nodes() {
        let graph = parse_flows(FLOWS).unwrap();
        let layout = layout(&graph, &params()).unwrap();
        let bourg = &layout.nodes[0];
        let outgoing = layout.links.iter().filter(|link| link.source == 0).collect::<Vec<_>>();
        let total = outgoing.iter().map(|link| link.width).sum::<f32>();
        assert!((total - (bourg.y1 - bourg.y0)).abs() < 1e-3);
        for link in outgoing {
            assert!(link.y0 - link.width / 2.0 >= bourg.y0 - 1e-3);
            assert!(link.y0 + link.width / 2.0 <= bourg.y1 + 1e-3);
        }
    }

    #[test]
    fn cycles_are_rejected() {
        let graph = parse_flows(
            r#"[{"source": "a", "target": "b", "value": 1}, {"source": "b", "target": "a", "value": 1}]"#,
        )
        .unwrap();
        let error = layout(&graph, &params()).unwrap_err();
        assert!(error.to_string().contains("circular"));
    }

    #[test]
    fn hit_testing_finds_nodes_and_bands() {
        let graph = parse_flows(FLOWS).unwrap();
        let layout = layout(&graph, &params()).unwrap();
        let bourg = layout.nodes[0].rect();
        assert_eq!(layout.node_at(bourg.center()), Some(0));

        let curve = layout.link_curve(0).unwrap();
        let start = curve[0] + vec2(0.5, 0.0);
        assert_eq!(layout.link_at(start), Some(0));
        assert_eq!(layout.link_at(pos2(-10.0, -10.0)), None);
    }
}
