use std::collections::BTreeMap;

use log::{trace, warn};

use crate::config::RoutingConfig;
use crate::ir::Flow;

use super::{EdgeLayout, NodeLayout, RouteKind};

/// Decides which connector shape an edge gets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct RoutingPolicy {
    pub(super) direct_rank_span: usize,
    pub(super) self_loop_pad: f32,
}

impl RoutingPolicy {
    pub(super) fn from_config(config: &RoutingConfig) -> Self {
        Self {
            direct_rank_span: config.direct_rank_span,
            self_loop_pad: config.self_loop_pad,
        }
    }

    /// Same lane and close ranks get a straight line; everything else is routed
    /// orthogonally.
    pub(super) fn classify(&self, from: &NodeLayout, to: &NodeLayout) -> RouteKind {
        if from.id == to.id {
            return RouteKind::SelfLoop;
        }
        let span = from.rank_index.abs_diff(to.rank_index);
        if from.lane_index == to.lane_index && span <= self.direct_rank_span {
            RouteKind::Direct
        } else {
            RouteKind::Orthogonal
        }
    }

    pub(super) fn waypoints(&self, kind: RouteKind, from: &NodeLayout, to: &NodeLayout) -> Vec<(f32, f32)> {
        match kind {
            RouteKind::Direct => vec![from.right_mid(), to.left_mid()],
            RouteKind::Orthogonal => orthogonal_path(from.right_mid(), to.left_mid()),
            RouteKind::SelfLoop => self_loop_path(from, self.self_loop_pad),
        }
    }
}

/// `[start, (midX, start.y), (midX, end.y), end]` with `midX` halfway between the
/// two connection points.
pub(super) fn orthogonal_path(start: (f32, f32), end: (f32, f32)) -> Vec<(f32, f32)> {
    let mid_x = (start.0 + end.0) / 2.0;
    vec![start, (mid_x, start.1), (mid_x, end.1), end]
}

/// Leaves the right side, climbs over the top, and re-enters from the left.
pub(super) fn self_loop_path(node: &NodeLayout, pad: f32) -> Vec<(f32, f32)> {
    let (right_x, mid_y) = node.right_mid();
    let left_x = node.x;
    let top_y = node.y - pad;
    vec![
        (right_x, mid_y),
        (right_x + pad, mid_y),
        (right_x + pad, top_y),
        (left_x - pad, top_y),
        (left_x - pad, mid_y),
        (left_x, mid_y),
    ]
}

/// Routes every flow whose endpoints both exist. Flows naming an unknown node are
/// dropped with a warning.
pub(super) fn route_edges(
    flows: &[Flow],
    nodes: &BTreeMap<String, NodeLayout>,
    policy: &RoutingPolicy,
) -> Vec<EdgeLayout> {
    let mut edges = Vec::with_capacity(flows.len());
    for (position, flow) in flows.iter().enumerate() {
        let id = if flow.id.trim().is_empty() {
            format!("flow_{}", position + 1)
        } else {
            flow.id.clone()
        };
        let (Some(from), Some(to)) = (nodes.get(&flow.from), nodes.get(&flow.to)) else {
            warn!(
                "dropping flow '{}': endpoint '{}' -> '{}' does not resolve",
                id, flow.from, flow.to
            );
            continue;
        };
        let route = policy.classify(from, to);
        let points = policy.waypoints(route, from, to);
        trace!("flow '{}' routed {:?} through {} points", id, route, points.len());
        edges.push(EdgeLayout {
            id,
            from: flow.from.clone(),
            to: flow.to.clone(),
            name: flow.name.clone().filter(|name| !name.is_empty()),
            condition: flow.condition.clone().filter(|cond| !cond.is_empty()),
            route,
            points,
        });
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::NodeKind;

    fn node(id: &str, lane: usize, rank: usize, x: f32, y: f32) -> NodeLayout {
        NodeLayout {
            id: id.to_string(),
            label: id.to_string(),
            kind: NodeKind::Task,
            lane_index: lane,
            rank_index: rank,
            order_in_rank: 0,
            x,
            y,
            width: 120.0,
            height: 80.0,
        }
    }

    fn nodes(list: Vec<NodeLayout>) -> BTreeMap<String, NodeLayout> {
        list.into_iter().map(|node| (node.id.clone(), node)).collect()
    }

    fn flow(id: &str, from: &str, to: &str) -> Flow {
        Flow {
            id: id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            ..Flow::default()
        }
    }

    fn policy() -> RoutingPolicy {
        RoutingPolicy::from_config(&RoutingConfig::default())
    }

    #[test]
    fn adjacent_same_lane_is_direct() {
        let a = node("a", 0, 0, 0.0, 0.0);
        let b = node("b", 0, 1, 200.0, 10.0);
        assert_eq!(policy().classify(&a, &b), RouteKind::Direct);
        assert_eq!(
            policy().waypoints(RouteKind::Direct, &a, &b),
            vec![(120.0, 40.0), (200.0, 50.0)]
        );
    }

    #[test]
    fn lane_change_or_rank_skip_is_orthogonal() {
        let a = node("a", 0, 0, 0.0, 0.0);
        let b = node("b", 1, 1, 200.0, 150.0);
        let c = node("c", 0, 2, 400.0, 0.0);
        assert_eq!(policy().classify(&a, &b), RouteKind::Orthogonal);
        assert_eq!(policy().classify(&a, &c), RouteKind::Orthogonal);
        assert_eq!(
            policy().waypoints(RouteKind::Orthogonal, &a, &b),
            vec![(120.0, 40.0), (160.0, 40.0), (160.0, 190.0), (200.0, 190.0)]
        );
    }

    #[test]
    fn wider_direct_span_keeps_skips_straight() {
        let wide = RoutingPolicy {
            direct_rank_span: 2,
            ..policy()
        };
        let a = node("a", 0, 0, 0.0, 0.0);
        let c = node("c", 0, 2, 400.0, 0.0);
        assert_eq!(wide.classify(&a, &c), RouteKind::Direct);
    }

    #[test]
    fn self_loop_starts_right_and_ends_left() {
        let a = node("a", 0, 0, 100.0, 100.0);
        let points = policy().waypoints(RouteKind::SelfLoop, &a, &a);
        assert_eq!(points.first(), Some(&a.right_mid()));
        assert_eq!(points.last(), Some(&a.left_mid()));
        assert!(points.iter().any(|p| p.1 < a.y));
        for pair in points.windows(2) {
            assert!(pair[0].0 == pair[1].0 || pair[0].1 == pair[1].1);
        }
    }

    #[test]
    fn dangling_flows_are_dropped_and_ids_synthesized() {
        let map = nodes(vec![node("a", 0, 0, 0.0, 0.0), node("b", 0, 1, 200.0, 0.0)]);
        let flows = vec![flow("", "a", "b"), flow("f2", "a", "ghost"), flow("f3", "b", "a")];
        let edges = route_edges(&flows, &map, &policy());
        let ids: Vec<&str> = edges.iter().map(|edge| edge.id.as_str()).collect();
        assert_eq!(ids, vec!["flow_1", "f3"]);
    }

    #[test]
    fn empty_condition_is_not_carried() {
        let map = nodes(vec![node("a", 0, 0, 0.0, 0.0), node("b", 0, 1, 200.0, 0.0)]);
        let mut with_cond = flow("f1", "a", "b");
        with_cond.condition = Some(String::new());
        with_cond.name = Some("Yes".to_string());
        let edges = route_edges(&[with_cond], &map, &policy());
        assert_eq!(edges[0].condition, None);
        assert_eq!(edges[0].label(), Some("Yes"));
    }
}
