use crate::config::{Config, EdgeConfig};
use crate::ir::{Graph, Vertex, VertexHandle, VertexId};
use crate::layout::{Layout, VertexLayout};
use crate::surface::DrawingSurface;
use crate::theme::Theme;

/// Which side of a fan-out an edge belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    /// Left half, leaves left of the source centre.
    True,
    /// Right half, leaves right of the source centre.
    False,
    /// Single target, or the middle one of an odd fan-out.
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetInfo {
    pub target: VertexId,
    pub mid_x: f32,
    pub mid_y: f32,
    pub top_y: f32,
    pub bottom_y: f32,
}

impl TargetInfo {
    fn from_layout(target: VertexId, layout: &VertexLayout) -> Self {
        Self {
            target,
            mid_x: layout.center_x,
            mid_y: layout.center_y,
            top_y: layout.top(),
            bottom_y: layout.bottom(),
        }
    }
}

/// Outgoing edges of one source, targets in edge declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceGroup {
    pub source: VertexId,
    pub mid_x: f32,
    pub top_y: f32,
    pub bottom_y: f32,
    pub left: f32,
    pub right: f32,
    pub width: f32,
    pub targets: Vec<TargetInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutedEdge {
    pub source: VertexId,
    pub target: VertexId,
    pub branch: Branch,
    pub points: Vec<(f32, f32)>,
}

impl RoutedEdge {
    /// Horizontal distance of the start point from the source centre.
    pub fn start_offset(&self, source_mid_x: f32) -> f32 {
        self.points.first().map_or(0.0, |p| p.0 - source_mid_x)
    }
}

pub trait EdgeRenderer {
    fn preprocess(&mut self, layout: &Layout);

    fn render(&self, surface: &mut dyn DrawingSurface, graph: &Graph);

    fn routes(&self) -> &[RoutedEdge];

    fn clear(&mut self);
}

/// Orthogonal fan-out routing between box vertices.
#[derive(Debug, Clone)]
pub struct BoxEdgeRenderer {
    config: EdgeConfig,
    theme: Theme,
    routes: Vec<RoutedEdge>,
}

impl BoxEdgeRenderer {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.edge.clone(),
            theme: config.theme.clone(),
            routes: Vec::new(),
        }
    }

    fn color(&self, branch: Branch, selected: bool) -> &str {
        let theme = &self.theme;
        match (branch, selected) {
            (Branch::True, false) => &theme.edge_true,
            (Branch::False, false) => &theme.edge_false,
            (Branch::Direct, false) => &theme.edge_direct,
            (Branch::True, true) => &theme.edge_true_selected,
            (Branch::False, true) => &theme.edge_false_selected,
            (Branch::Direct, true) => &theme.edge_direct_selected,
        }
    }
}

/// Groups layout edges by source in first-seen order. Edges touching a vertex missing
/// from the layout are skipped.
pub fn group_edges(layout: &Layout) -> Vec<SourceGroup> {
    let mut groups: Vec<SourceGroup> = Vec::new();
    for edge in &layout.edges {
        let (Some(source), Some(target)) = (layout.vertex(edge.source), layout.vertex(edge.target))
        else {
            continue;
        };
        let info = TargetInfo::from_layout(edge.target, target);
        match groups.iter_mut().find(|group| group.source == edge.source) {
            Some(group) => group.targets.push(info),
            None => groups.push(SourceGroup {
                source: edge.source,
                mid_x: source.center_x,
                top_y: source.top(),
                bottom_y: source.bottom(),
                left: source.left(),
                right: source.right(),
                width: source.width,
                targets: vec![info],
            }),
        }
    }
    groups
}

/// Routes every edge of `group`.
///
/// Targets are stably sorted by centre x. The first `n / 2` are [`Branch::True`], the last
/// `n / 2` are [`Branch::False`] and an odd middle one is [`Branch::Direct`]. Start points
/// fan out from the source centre in steps of `padding_between_edges * width`: true edges
/// at `-half·step ..= -step`, false edges at `step ..= half·step`, direct at zero.
pub fn route_group(group: &SourceGroup, config: &EdgeConfig) -> Vec<RoutedEdge> {
    let mut targets = group.targets.clone();
    targets.sort_by(|a, b| a.mid_x.partial_cmp(&b.mid_x).unwrap_or(std::cmp::Ordering::Equal));

    let count = targets.len();
    let half = count / 2;
    let step = config.padding_between_edges * group.width;

    targets
        .iter()
        .enumerate()
        .map(|(index, target)| {
            let (branch, offset) = if index < half {
                (Branch::True, -((half - index) as f32) * step)
            } else if index >= count - half {
                (Branch::False, (index + 1 - (count - half)) as f32 * step)
            } else {
                (Branch::Direct, 0.0)
            };
            let start = (group.mid_x + offset, group.bottom_y);
            RoutedEdge {
                source: group.source,
                target: target.target,
                branch,
                points: route_path(group, target, start, config.padding_line),
            }
        })
        .collect()
}

fn route_path(
    group: &SourceGroup,
    target: &TargetInfo,
    (sx, sy): (f32, f32),
    padding: f32,
) -> Vec<(f32, f32)> {
    let mut points: Vec<(f32, f32)> = Vec::with_capacity(6);
    let mut push = |point: (f32, f32)| {
        if points.last() != Some(&point) {
            points.push(point);
        }
    };
    let tx = target.mid_x;

    if target.mid_y >= sy {
        let ey = target.top_y;
        let bend = sy + padding.min(((ey - sy) / 2.0).max(0.0));
        push((sx, sy));
        push((sx, bend));
        push((tx, bend));
        push((tx, ey));
    } else {
        // Back-edge: drop below the source, go round the side facing the target and
        // climb to just under the target before entering its bottom. A target above the
        // source keeps that last run inside the gap between the two boxes.
        let ey = target.bottom_y;
        let below = sy + padding;
        let side_x = if tx < group.mid_x {
            group.left - padding
        } else {
            group.right + padding
        };
        let approach = if ey < group.top_y {
            (ey + padding).min((ey + group.top_y) / 2.0)
        } else {
            ey + padding
        };
        push((sx, sy));
        push((sx, below));
        push((side_x, below));
        push((side_x, approach));
        push((tx, approach));
        push((tx, ey));
    }
    points
}

impl EdgeRenderer for BoxEdgeRenderer {
    fn preprocess(&mut self, layout: &Layout) {
        self.routes = group_edges(layout)
            .iter()
            .flat_map(|group| route_group(group, &self.config))
            .collect();
    }

    fn render(&self, surface: &mut dyn DrawingSurface, graph: &Graph) {
        surface.set_line_width(self.config.size_line);
        for route in &self.routes {
            let selected = graph
                .vertex(VertexHandle::new(route.source))
                .is_some_and(Vertex::is_selected);
            surface.set_stroke_color(self.color(route.branch, selected));
            surface.stroke_polyline(&route.points);
        }
    }

    fn routes(&self) -> &[RoutedEdge] {
        &self.routes
    }

    fn clear(&mut self) {
        self.routes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(targets: &[(f32, f32)]) -> SourceGroup {
        SourceGroup {
            source: 0,
            mid_x: 100.0,
            top_y: 0.0,
            bottom_y: 40.0,
            left: 50.0,
            right: 150.0,
            width: 100.0,
            targets: targets
                .iter()
                .enumerate()
                .map(|(i, (x, y))| TargetInfo {
                    target: i + 1,
                    mid_x: *x,
                    mid_y: *y,
                    top_y: *y - 20.0,
                    bottom_y: *y + 20.0,
                })
                .collect(),
        }
    }

    fn branches(routes: &[RoutedEdge]) -> Vec<Branch> {
        routes.iter().map(|r| r.branch).collect()
    }

    #[test]
    fn single_target_is_direct_without_offset() {
        let routes = route_group(&group(&[(300.0, 200.0)]), &EdgeConfig::default());
        assert_eq!(branches(&routes), vec![Branch::Direct]);
        assert_eq!(routes[0].start_offset(100.0), 0.0);
        assert_eq!(routes[0].points.last(), Some(&(300.0, 180.0)));
    }

    #[test]
    fn even_fan_out_splits_in_half_by_target_x() {
        // Declared out of x order; sorting decides the branch.
        let routes = route_group(
            &group(&[(400.0, 200.0), (0.0, 200.0), (300.0, 200.0), (100.0, 200.0)]),
            &EdgeConfig::default(),
        );
        assert_eq!(
            branches(&routes),
            vec![Branch::True, Branch::True, Branch::False, Branch::False]
        );
        let targets: Vec<_> = routes.iter().map(|r| r.target).collect();
        assert_eq!(targets, vec![2, 4, 3, 1]);
        let offsets: Vec<f32> = routes.iter().map(|r| r.start_offset(100.0)).collect();
        assert_eq!(offsets, vec![-10.0, -5.0, 5.0, 10.0]);
    }

    #[test]
    fn odd_fan_out_has_one_direct_middle() {
        let routes = route_group(
            &group(&[(0.0, 200.0), (50.0, 200.0), (100.0, 200.0), (150.0, 200.0), (200.0, 200.0)]),
            &EdgeConfig::default(),
        );
        assert_eq!(
            branches(&routes),
            vec![Branch::True, Branch::True, Branch::Direct, Branch::False, Branch::False]
        );
        assert_eq!(routes[2].target, 3);
        assert_eq!(routes[2].start_offset(100.0), 0.0);
    }

    #[test]
    fn equal_x_keeps_declaration_order() {
        let routes = route_group(&group(&[(100.0, 200.0), (100.0, 300.0)]), &EdgeConfig::default());
        assert_eq!(routes[0].target, 1);
        assert_eq!(routes[1].target, 2);
    }

    #[test]
    fn forward_route_is_orthogonal_into_target_top() {
        let routes = route_group(&group(&[(300.0, 200.0)]), &EdgeConfig::default());
        let points = &routes[0].points;
        assert_eq!(points[0], (100.0, 40.0));
        assert_eq!(points[1], (100.0, 65.0));
        assert_eq!(points[2], (300.0, 65.0));
        assert_eq!(points[3], (300.0, 180.0));
        for pair in points.windows(2) {
            assert!(pair[0].0 == pair[1].0 || pair[0].1 == pair[1].1);
        }
    }

    #[test]
    fn back_edge_goes_around_the_source_box() {
        // Source box spans x 50..150, y 0..40; target sits above it.
        let routes = route_group(&group(&[(120.0, -100.0)]), &EdgeConfig::default());
        let points = &routes[0].points;
        assert_eq!(points.last(), Some(&(120.0, -80.0)));
        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            assert!(a.0 == b.0 || a.1 == b.1, "segment {a:?} -> {b:?} is not orthogonal");
            let (min_x, max_x) = (a.0.min(b.0), a.0.max(b.0));
            let (min_y, max_y) = (a.1.min(b.1), a.1.max(b.1));
            let crosses_interior = max_x > 50.0 && min_x < 150.0 && max_y > 0.0 && min_y < 40.0;
            assert!(!crosses_interior, "segment {a:?} -> {b:?} crosses the source box");
        }
    }

    #[test]
    fn back_edge_stays_between_boxes_when_ranks_are_tight() {
        // Target bottom sits 10 above the source top, less than the line padding.
        let routes = route_group(&group(&[(120.0, -30.0)]), &EdgeConfig::default());
        let points = &routes[0].points;
        assert_eq!(
            points,
            &vec![
                (100.0, 40.0),
                (100.0, 65.0),
                (175.0, 65.0),
                (175.0, -5.0),
                (120.0, -5.0),
                (120.0, -10.0),
            ]
        );
        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let (min_x, max_x) = (a.0.min(b.0), a.0.max(b.0));
            let (min_y, max_y) = (a.1.min(b.1), a.1.max(b.1));
            let crosses_interior = max_x > 50.0 && min_x < 150.0 && max_y > 0.0 && min_y < 40.0;
            assert!(!crosses_interior, "segment {a:?} -> {b:?} crosses the source box");
        }
    }

    #[test]
    fn self_loop_wraps_below_the_source() {
        let mut group = group(&[]);
        group.targets.push(TargetInfo {
            target: 0,
            mid_x: 100.0,
            mid_y: 20.0,
            top_y: 0.0,
            bottom_y: 40.0,
        });
        let routes = route_group(&group, &EdgeConfig::default());
        let points = &routes[0].points;
        assert_eq!(points.first(), Some(&(100.0, 40.0)));
        assert_eq!(points.last(), Some(&(100.0, 40.0)));
        assert!(points.iter().all(|p| p.1 >= 40.0));
    }
}
