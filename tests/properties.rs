use std::collections::{HashMap, HashSet};

use float_cmp::approx_eq;
use proptest::prelude::*;

use flowlane::ir::{FlowDocument, GatewayKind};
use flowlane::layout::RouteKind;
use flowlane::{Layout, LayoutConfig, compute_layout, to_bpmn_xml, validate_bpmn};

// ===================
// Strategies
// ===================

#[derive(Debug, Clone)]
struct Shape {
    actors: usize,
    /// Actor slot per task; slots past `actors` name an unknown participant.
    tasks: Vec<Option<usize>>,
    gateways: usize,
    /// Endpoint indices over tasks then gateways; indices past the end dangle.
    flows: Vec<(usize, usize)>,
}

impl Shape {
    fn node_count(&self) -> usize {
        self.tasks.len() + self.gateways
    }

    fn node_id(&self, idx: usize) -> String {
        if idx < self.tasks.len() {
            format!("t{idx}")
        } else if idx < self.node_count() {
            format!("g{}", idx - self.tasks.len())
        } else {
            format!("ghost{idx}")
        }
    }

    fn document(&self) -> FlowDocument {
        let mut doc = FlowDocument::new();
        for a in 0..self.actors {
            doc.add_actor(&format!("a{a}"), &format!("Actor {a}"));
        }
        for (idx, actor) in self.tasks.iter().enumerate() {
            let actor = actor.map(|slot| format!("a{slot}")).unwrap_or_default();
            doc.add_task(&format!("t{idx}"), &format!("Task {idx}"), &actor, None);
        }
        for g in 0..self.gateways {
            doc.add_gateway(&format!("g{g}"), "Decide?", GatewayKind::Exclusive);
        }
        for &(from, to) in &self.flows {
            doc.add_flow(&self.node_id(from), &self.node_id(to), None);
        }
        doc
    }

    fn resolved_flows(&self) -> usize {
        let n = self.node_count();
        self.flows.iter().filter(|(from, to)| *from < n && *to < n).count()
    }
}

fn shape_strategy() -> impl Strategy<Value = Shape> {
    (0usize..4, 1usize..10, 0usize..3).prop_flat_map(|(actors, tasks, gateways)| {
        let n = tasks + gateways;
        (
            prop::collection::vec(prop::option::of(0usize..actors + 1), tasks),
            prop::collection::vec((0..n + 2, 0..n + 2), 0..n * 2),
        )
            .prop_map(move |(tasks, flows)| Shape {
                actors,
                tasks,
                gateways,
                flows,
            })
    })
}

/// Only forward flows between existing nodes, so the graph is acyclic.
fn dag_strategy() -> impl Strategy<Value = Shape> {
    shape_strategy().prop_map(|mut shape| {
        let n = shape.node_count();
        shape.flows.retain(|&(from, to)| from < to && to < n);
        shape
    })
}

// ===================
// Property Test Functions
// ===================

fn check_deterministic(shape: &Shape) -> Result<(), TestCaseError> {
    let doc = shape.document();
    let config = LayoutConfig::default();
    prop_assert_eq!(compute_layout(&doc, &config), compute_layout(&doc, &config));
    Ok(())
}

/// Lanes stack without gaps or overlap and share one width.
fn check_lanes_tile(layout: &Layout) -> Result<(), TestCaseError> {
    let config = LayoutConfig::default();
    if let Some(first) = layout.lanes.first() {
        prop_assert!(approx_eq!(f32, first.y, config.margin_y));
    }
    for pair in layout.lanes.windows(2) {
        prop_assert!(approx_eq!(f32, pair[1].y, pair[0].y + pair[0].height, epsilon = 0.01));
        prop_assert!(approx_eq!(f32, pair[1].width, pair[0].width));
    }
    for lane in &layout.lanes {
        prop_assert!(lane.height > 0.0);
        prop_assert!(lane.y + lane.height <= layout.height + 0.01);
    }
    Ok(())
}

/// Every node has positive size and sits inside its lane and its rank column.
fn check_nodes_contained(layout: &Layout) -> Result<(), TestCaseError> {
    for node in layout.nodes.values() {
        prop_assert!(node.width > 0.0 && node.height > 0.0);
        let lane = &layout.lanes[node.lane_index];
        prop_assert!(node.y >= lane.y - 0.01);
        prop_assert!(node.y + node.height <= lane.y + lane.height + 0.01);
        let rank = &layout.ranks[node.rank_index];
        prop_assert!(node.x >= rank.x - 0.01);
        prop_assert!(node.x + node.width <= rank.x + rank.width + 0.01);
        prop_assert!(node.x + node.width <= layout.width);
    }
    Ok(())
}

/// Connectors leave the source's right edge and enter the target's left edge.
fn check_edge_endpoints(layout: &Layout) -> Result<(), TestCaseError> {
    for edge in &layout.edges {
        let from = &layout.nodes[&edge.from];
        let to = &layout.nodes[&edge.to];
        prop_assert!(edge.points.len() >= 2);
        prop_assert_eq!(edge.points[0], from.right_mid());
        prop_assert_eq!(edge.points[edge.points.len() - 1], to.left_mid());
        if edge.route == RouteKind::SelfLoop {
            prop_assert_eq!(&edge.from, &edge.to);
        }
    }
    Ok(())
}

fn check_forward_ranks(layout: &Layout) -> Result<(), TestCaseError> {
    for edge in &layout.edges {
        let from = layout.nodes[&edge.from].rank_index;
        let to = layout.nodes[&edge.to].rank_index;
        prop_assert!(to > from, "{} -> {}: rank {} -> {}", edge.from, edge.to, from, to);
    }
    Ok(())
}

fn reaches(successors: &HashMap<&str, Vec<&str>>, from: &str, to: &str) -> bool {
    let mut seen = HashSet::from([from]);
    let mut stack = vec![from];
    while let Some(node) = stack.pop() {
        if node == to {
            return true;
        }
        for &next in successors.get(node).into_iter().flatten() {
            if seen.insert(next) {
                stack.push(next);
            }
        }
    }
    false
}

/// In a cyclic graph, flows that do not close a cycle still point rightwards.
fn check_acyclic_edges_move_right(layout: &Layout) -> Result<(), TestCaseError> {
    let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in &layout.edges {
        successors.entry(edge.from.as_str()).or_default().push(edge.to.as_str());
    }
    for edge in &layout.edges {
        if reaches(&successors, &edge.to, &edge.from) {
            continue;
        }
        let from = layout.nodes[&edge.from].rank_index;
        let to = layout.nodes[&edge.to].rank_index;
        prop_assert!(to > from, "{} -> {}: rank {} -> {}", edge.from, edge.to, from, to);
    }
    Ok(())
}

proptest! {
    #[test]
    fn layout_is_deterministic(shape in shape_strategy()) {
        check_deterministic(&shape)?;
    }

    #[test]
    fn lanes_tile_the_canvas(shape in shape_strategy()) {
        check_lanes_tile(&compute_layout(&shape.document(), &LayoutConfig::default()))?;
    }

    #[test]
    fn nodes_stay_inside_their_cells(shape in shape_strategy()) {
        check_nodes_contained(&compute_layout(&shape.document(), &LayoutConfig::default()))?;
    }

    #[test]
    fn edges_attach_to_node_sides(shape in shape_strategy()) {
        check_edge_endpoints(&compute_layout(&shape.document(), &LayoutConfig::default()))?;
    }

    #[test]
    fn acyclic_flows_move_right(shape in dag_strategy()) {
        check_forward_ranks(&compute_layout(&shape.document(), &LayoutConfig::default()))?;
    }

    #[test]
    fn edges_outside_cycles_move_right(shape in shape_strategy()) {
        check_acyclic_edges_move_right(&compute_layout(&shape.document(), &LayoutConfig::default()))?;
    }

    #[test]
    fn dangling_flows_are_dropped(shape in shape_strategy()) {
        let layout = compute_layout(&shape.document(), &LayoutConfig::default());
        prop_assert_eq!(layout.nodes.len(), shape.node_count());
        prop_assert_eq!(layout.edges.len(), shape.resolved_flows());
    }

    #[test]
    fn bpmn_output_validates(shape in shape_strategy()) {
        let doc = shape.document();
        let layout = compute_layout(&doc, &LayoutConfig::default());
        let xml = to_bpmn_xml(&doc, &layout).map_err(|err| TestCaseError::fail(err.to_string()))?;
        let report = validate_bpmn(&xml);
        prop_assert!(report.is_valid(), "{:?}", report.errors);
    }
}
