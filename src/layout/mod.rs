mod bounds;
mod graph;
mod lanes;
mod placement;
mod ranking;
mod routing;
mod sizing;
pub(crate) mod types;
pub use types::*;

use std::collections::BTreeMap;

use log::debug;

use crate::config::LayoutConfig;
use crate::ir::FlowDocument;

use bounds::diagram_bounds;
use graph::{Adjacency, NodeTable};
use lanes::assign_lanes;
use placement::place_nodes;
use ranking::{assign_ranks, order_ranks};
use routing::{RoutingPolicy, route_edges};
use sizing::{lane_heights, rank_widths, size_nodes};

pub use lanes::{FALLBACK_LANE_ID, FALLBACK_LANE_LABEL};

/// Lays out a process document as swimlanes (one per actor, top to bottom) crossed
/// by ranks (execution steps, left to right).
///
/// Never fails: dangling flows are dropped, unknown actors fall back to the first
/// lane, and cycles are broken structurally.
pub fn compute_layout(doc: &FlowDocument, config: &LayoutConfig) -> Layout {
    let config = config.clone().sanitized();

    let table = NodeTable::from_document(doc);
    let adj = Adjacency::build(&table, &doc.flows);
    debug!(nodes = table.len(), flows = doc.flows.len(); "built node table");

    let lanes = assign_lanes(&table, &adj, &doc.actors, config.gateway_lanes);
    let ranking = assign_ranks(&table, &adj, &doc.phases, config.phase_hints);
    let order = order_ranks(&table, &ranking, &lanes.lane_of);
    debug!(lanes = lanes.lanes.len(), ranks = ranking.ranks.len(); "assigned lanes and ranks");

    let sizes = size_nodes(&table, &config);
    let widths = rank_widths(&order.by_rank, &sizes);
    let heights = lane_heights(lanes.lanes.len(), &lanes.lane_of, &sizes, &config);
    let placement = place_nodes(&order, &lanes.lane_of, &sizes, &widths, &heights, &config);

    let mut nodes = BTreeMap::new();
    for (idx, record) in table.iter() {
        let (x, y) = placement.positions[idx];
        nodes.insert(
            record.id.clone(),
            NodeLayout {
                id: record.id.clone(),
                label: record.label.clone(),
                kind: record.kind,
                lane_index: lanes.lane_of[idx],
                rank_index: ranking.rank_of[idx],
                order_in_rank: order.order_in_rank[idx],
                x,
                y,
                width: sizes[idx].width,
                height: sizes[idx].height,
            },
        );
    }

    let ranks: Vec<RankLayout> = ranking
        .ranks
        .into_iter()
        .enumerate()
        .map(|(index, spec)| RankLayout {
            index,
            phase_id: spec.phase_id,
            phase_label: spec.phase_label,
            x: placement.rank_x[index],
            width: widths[index],
        })
        .collect();

    let mut lane_layouts: Vec<LaneLayout> = lanes
        .lanes
        .into_iter()
        .enumerate()
        .map(|(index, spec)| LaneLayout {
            index,
            participant_id: spec.participant_id,
            label: spec.label,
            x: config.margin_x,
            y: placement.lane_y[index],
            width: 0.0,
            height: heights[index],
            header_width: config.lane_header_width,
        })
        .collect();

    let (width, height) = diagram_bounds(&ranks, &lane_layouts, &config);
    for lane in &mut lane_layouts {
        lane.width = width - 2.0 * config.margin_x;
    }

    let policy = RoutingPolicy::from_config(&config.routing);
    let edges = route_edges(&doc.flows, &nodes, &policy);
    debug!(edges = edges.len(), width = width, height = height; "layout complete");

    Layout {
        nodes,
        lanes: lane_layouts,
        ranks,
        edges,
        width,
        height,
    }
}
