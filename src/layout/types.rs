use std::collections::BTreeMap;

use serde::Serialize;

use crate::ir::GatewayKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "gateway", rename_all = "lowercase")]
pub enum NodeKind {
    Task,
    Gateway(GatewayKind),
}

impl NodeKind {
    pub fn is_gateway(self) -> bool {
        matches!(self, Self::Gateway(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeLayout {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
    pub lane_index: usize,
    pub rank_index: usize,
    pub order_in_rank: usize,
    /// Top-left corner.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl NodeLayout {
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn right_mid(&self) -> (f32, f32) {
        (self.x + self.width, self.y + self.height / 2.0)
    }

    pub fn left_mid(&self) -> (f32, f32) {
        (self.x, self.y + self.height / 2.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaneLayout {
    pub index: usize,
    pub participant_id: String,
    pub label: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub header_width: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankLayout {
    pub index: usize,
    pub phase_id: Option<String>,
    pub phase_label: Option<String>,
    pub x: f32,
    pub width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RouteKind {
    Direct,
    Orthogonal,
    SelfLoop,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeLayout {
    pub id: String,
    pub from: String,
    pub to: String,
    pub name: Option<String>,
    pub condition: Option<String>,
    pub route: RouteKind,
    pub points: Vec<(f32, f32)>,
}

impl EdgeLayout {
    /// Text drawn next to the connector: the condition, else the flow name.
    pub fn label(&self) -> Option<&str> {
        self.condition
            .as_deref()
            .or(self.name.as_deref())
            .filter(|text| !text.trim().is_empty())
    }
}

/// Result of one layout invocation. Read-only once returned.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub nodes: BTreeMap<String, NodeLayout>,
    pub lanes: Vec<LaneLayout>,
    pub ranks: Vec<RankLayout>,
    pub edges: Vec<EdgeLayout>,
    pub width: f32,
    pub height: f32,
}

impl Layout {
    pub fn node(&self, id: &str) -> Option<&NodeLayout> {
        self.nodes.get(id)
    }

    pub fn edge(&self, id: &str) -> Option<&EdgeLayout> {
        self.edges.iter().find(|edge| edge.id == id)
    }

    /// Nodes in lane order, then rank, then position within the rank.
    pub fn nodes_in_lane(&self, lane_index: usize) -> Vec<&NodeLayout> {
        let mut nodes: Vec<&NodeLayout> = self
            .nodes
            .values()
            .filter(|node| node.lane_index == lane_index)
            .collect();
        nodes.sort_by_key(|node| (node.rank_index, node.order_in_rank));
        nodes
    }
}
