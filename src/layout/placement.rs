use crate::config::LayoutConfig;

use super::ranking::RankOrder;
use super::sizing::Size;

#[derive(Debug, Clone)]
pub(super) struct Placement {
    pub(super) rank_x: Vec<f32>,
    pub(super) lane_y: Vec<f32>,
    /// Top-left corner of every node.
    pub(super) positions: Vec<(f32, f32)>,
}

/// Offsets accumulate from the origin: ranks left to right after the lane header,
/// lanes top to bottom.
pub(super) fn band_offsets(start: f32, extents: &[f32], gap: f32) -> Vec<f32> {
    let mut offsets = Vec::with_capacity(extents.len());
    let mut cursor = start;
    for extent in extents {
        offsets.push(cursor);
        cursor += extent + gap;
    }
    offsets
}

/// Centers each node horizontally in its rank. Nodes sharing a (rank, lane) cell
/// are stacked with `node_spacing` between them and the stack is centered in the
/// lane.
pub(super) fn place_nodes(
    order: &RankOrder,
    lane_of: &[usize],
    sizes: &[Size],
    rank_widths: &[f32],
    lane_heights: &[f32],
    config: &LayoutConfig,
) -> Placement {
    let rank_x = band_offsets(
        config.margin_x + config.lane_header_width,
        rank_widths,
        config.rank_spacing,
    );
    let lane_y = band_offsets(config.margin_y, lane_heights, 0.0);
    let mut positions = vec![(0.0, 0.0); sizes.len()];

    for (rank, bucket) in order.by_rank.iter().enumerate() {
        // Buckets are sorted by lane, so each cell is a contiguous run.
        for cell in bucket.chunk_by(|&a, &b| lane_of[a] == lane_of[b]) {
            let lane = lane_of[cell[0]];
            let stack_height = cell.iter().map(|&idx| sizes[idx].height).sum::<f32>()
                + config.node_spacing * (cell.len() - 1) as f32;
            let mut y = (lane_y[lane] + (lane_heights[lane] - stack_height) / 2.0).max(lane_y[lane]);
            for &idx in cell {
                let x = rank_x[rank] + (rank_widths[rank] - sizes[idx].width) / 2.0;
                positions[idx] = (x, y);
                y += sizes[idx].height + config.node_spacing;
            }
        }
    }

    Placement {
        rank_x,
        lane_y,
        positions,
    }
}
