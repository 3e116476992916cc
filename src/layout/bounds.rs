use crate::config::LayoutConfig;

use super::{LaneLayout, RankLayout};

/// Canvas size recomputed from the final rank and lane records.
pub(super) fn diagram_bounds(ranks: &[RankLayout], lanes: &[LaneLayout], config: &LayoutConfig) -> (f32, f32) {
    let (min_width, min_height) = config.min_canvas();
    let rank_total: f32 = ranks.iter().map(|rank| rank.width).sum();
    let gaps = ranks.len().saturating_sub(1) as f32 * config.rank_spacing;
    let lane_total: f32 = lanes.iter().map(|lane| lane.height).sum();
    (min_width + rank_total + gaps, min_height + lane_total)
}
