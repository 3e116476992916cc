use crate::config::LayoutConfig;

use super::NodeKind;
use super::graph::NodeTable;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Size {
    pub(super) width: f32,
    pub(super) height: f32,
}

/// Gateways are fixed squares. Tasks grow with their label between the base and
/// maximum widths.
pub(super) fn node_size(kind: NodeKind, label: &str, config: &LayoutConfig) -> Size {
    match kind {
        NodeKind::Gateway(_) => Size {
            width: config.gateway_size,
            height: config.gateway_size,
        },
        NodeKind::Task => {
            let task = &config.task;
            let chars = label.chars().count() as f32;
            let wanted = task.label_base_width + chars * task.char_width;
            Size {
                width: wanted.clamp(task.base_width, task.max_width.max(task.base_width)),
                height: task.height,
            }
        }
    }
}

pub(super) fn size_nodes(table: &NodeTable, config: &LayoutConfig) -> Vec<Size> {
    table
        .iter()
        .map(|(_, node)| node_size(node.kind, &node.label, config))
        .collect()
}

/// Widest node of every rank.
pub(super) fn rank_widths(by_rank: &[Vec<usize>], sizes: &[Size]) -> Vec<f32> {
    by_rank
        .iter()
        .map(|bucket| {
            bucket
                .iter()
                .map(|&idx| sizes[idx].width)
                .fold(0.0f32, f32::max)
        })
        .collect()
}

/// Tall enough to stack every node of the lane, never below the lane minimum.
pub(super) fn lane_heights(
    lane_count: usize,
    lane_of: &[usize],
    sizes: &[Size],
    config: &LayoutConfig,
) -> Vec<f32> {
    let mut counts = vec![0usize; lane_count];
    let mut tallest = vec![0.0f32; lane_count];
    for (idx, &lane) in lane_of.iter().enumerate() {
        counts[lane] += 1;
        tallest[lane] = tallest[lane].max(sizes[idx].height);
    }
    counts
        .iter()
        .zip(&tallest)
        .map(|(&count, &max_height)| {
            if count == 0 {
                return config.lane_min_height;
            }
            let stacked = max_height * count as f32
                + config.node_spacing * (count - 1) as f32
                + 2.0 * config.lane_padding;
            stacked.max(config.lane_min_height)
        })
        .collect()
}
