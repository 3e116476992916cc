use crate::layout::{Layout, NodeKind, RouteKind};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<NodeDump>,
    pub lanes: Vec<LaneDump>,
    pub ranks: Vec<RankDump>,
    pub edges: Vec<EdgeDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub id: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: NodeKind,
    pub lane_index: usize,
    pub rank_index: usize,
    pub order_in_rank: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaneDump {
    pub index: usize,
    pub participant_id: String,
    pub label: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankDump {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_label: Option<String>,
    pub x: f32,
    pub width: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDump {
    pub id: String,
    pub from: String,
    pub to: String,
    pub route: RouteKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    pub waypoints: Vec<[f32; 2]>,
}

impl LayoutDump {
    pub fn from_layout(layout: &Layout) -> Self {
        let nodes = layout
            .nodes
            .values()
            .map(|node| NodeDump {
                id: node.id.clone(),
                label: node.label.clone(),
                kind: node.kind,
                lane_index: node.lane_index,
                rank_index: node.rank_index,
                order_in_rank: node.order_in_rank,
                x: node.x,
                y: node.y,
                width: node.width,
                height: node.height,
            })
            .collect();

        let lanes = layout
            .lanes
            .iter()
            .map(|lane| LaneDump {
                index: lane.index,
                participant_id: lane.participant_id.clone(),
                label: lane.label.clone(),
                x: lane.x,
                y: lane.y,
                width: lane.width,
                height: lane.height,
            })
            .collect();

        let ranks = layout
            .ranks
            .iter()
            .map(|rank| RankDump {
                index: rank.index,
                phase_id: rank.phase_id.clone(),
                phase_label: rank.phase_label.clone(),
                x: rank.x,
                width: rank.width,
            })
            .collect();

        let edges = layout
            .edges
            .iter()
            .map(|edge| EdgeDump {
                id: edge.id.clone(),
                from: edge.from.clone(),
                to: edge.to.clone(),
                route: edge.route,
                condition: edge.condition.clone(),
                waypoints: edge.points.iter().map(|(x, y)| [*x, *y]).collect(),
            })
            .collect();

        LayoutDump {
            width: layout.width,
            height: layout.height,
            nodes,
            lanes,
            ranks,
            edges,
        }
    }
}

pub fn write_layout_dump(path: &Path, layout: &Layout) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
