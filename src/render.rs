use crate::config::{LayoutConfig, RenderConfig};
use crate::ir::GatewayKind;
use crate::layout::{EdgeLayout, Layout, LaneLayout, NodeKind, NodeLayout, RankLayout};
use crate::theme::Theme;
use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;

/// Average glyph advance relative to the font size.
const CHAR_WIDTH_RATIO: f32 = 0.6;
const LABEL_PAD_X: f32 = 6.0;
const LABEL_PAD_Y: f32 = 4.0;
const TASK_TEXT_INSET: f32 = 16.0;

#[derive(Debug, Clone)]
struct TextBlock {
    lines: Vec<String>,
    width: f32,
    height: f32,
}

pub fn render_svg(layout: &Layout, theme: &Theme, config: &LayoutConfig) -> String {
    let mut svg = String::new();
    let width = layout.width;
    let height = layout.height;

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));

    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));

    svg.push_str("<defs>");
    svg.push_str(&format!(
        "<marker id=\"arrow\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"6\" markerHeight=\"6\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{}\"/></marker>",
        theme.line_color
    ));
    svg.push_str("</defs>");

    for lane in &layout.lanes {
        svg.push_str(&lane_svg(lane, theme, config));
    }

    if let Some(first_lane) = layout.lanes.first() {
        for rank in &layout.ranks {
            svg.push_str(&phase_heading_svg(rank, first_lane.y, theme));
        }
    }

    let label_positions = compute_edge_label_positions(&layout.edges, theme, config);

    for (idx, edge) in layout.edges.iter().enumerate() {
        let d = points_to_path(&edge.points);
        svg.push_str(&format!(
            "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1.4\" marker-end=\"url(#arrow)\" />",
            d, theme.line_color
        ));

        if let Some((x, y, label)) = label_positions.get(&idx).and_then(|v| v.clone()) {
            let rect_x = x - label.width / 2.0 - LABEL_PAD_X;
            let rect_y = y - label.height / 2.0 - LABEL_PAD_Y;
            let rect_w = label.width + LABEL_PAD_X * 2.0;
            let rect_h = label.height + LABEL_PAD_Y * 2.0;
            svg.push_str(&format!(
                "<rect x=\"{rect_x:.2}\" y=\"{rect_y:.2}\" width=\"{rect_w:.2}\" height=\"{rect_h:.2}\" rx=\"6\" ry=\"6\" fill=\"{}\" stroke=\"{}\" stroke-width=\"0.8\"/>",
                theme.edge_label_background, theme.line_color
            ));
            svg.push_str(&text_block_svg(x, y, &label, theme, config));
        }
    }

    for node in layout.nodes.values() {
        match node.kind {
            NodeKind::Task => svg.push_str(&task_svg(node, theme, config)),
            NodeKind::Gateway(kind) => svg.push_str(&gateway_svg(node, kind, theme, config)),
        }
    }

    svg.push_str("</svg>");
    svg
}

fn lane_svg(lane: &LaneLayout, theme: &Theme, config: &LayoutConfig) -> String {
    let fill = if lane.index % 2 == 0 {
        &theme.lane_fill
    } else {
        &theme.lane_alt_fill
    };
    let mut out = format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1\"/>",
        lane.x, lane.y, lane.width, lane.height, fill, theme.lane_border
    );
    out.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1\"/>",
        lane.x, lane.y, lane.header_width, lane.height, theme.lane_header_fill, theme.lane_border
    ));
    let max_chars = chars_that_fit(lane.header_width - TASK_TEXT_INSET, theme);
    let block = measure_label(&lane.label, max_chars, theme, config);
    out.push_str(&text_block_svg(
        lane.x + lane.header_width / 2.0,
        lane.y + lane.height / 2.0,
        &block,
        theme,
        config,
    ));
    out
}

fn phase_heading_svg(rank: &RankLayout, top: f32, theme: &Theme) -> String {
    let Some(label) = rank.phase_label.as_deref().filter(|label| !label.is_empty()) else {
        return String::new();
    };
    let x = rank.x + rank.width / 2.0;
    let y = top - theme.font_size * 0.8;
    format!(
        "<text x=\"{x:.2}\" y=\"{y:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" font-weight=\"bold\" fill=\"{}\">{}</text>",
        theme.font_family,
        theme.font_size,
        theme.text_color,
        escape_xml(label)
    )
}

fn task_svg(node: &NodeLayout, theme: &Theme, config: &LayoutConfig) -> String {
    let mut out = format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"10\" ry=\"10\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1.4\"/>",
        node.x, node.y, node.width, node.height, theme.task_fill, theme.task_border
    );
    let (cx, cy) = node.center();
    let max_chars = chars_that_fit(node.width - TASK_TEXT_INSET, theme);
    let block = measure_label(&node.label, max_chars, theme, config);
    out.push_str(&text_block_svg(cx, cy, &block, theme, config));
    out
}

fn gateway_svg(node: &NodeLayout, kind: GatewayKind, theme: &Theme, config: &LayoutConfig) -> String {
    let (cx, cy) = node.center();
    let half = node.width / 2.0;
    let mut out = format!(
        "<polygon points=\"{:.2},{:.2} {:.2},{:.2} {:.2},{:.2} {:.2},{:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1.4\"/>",
        cx,
        cy - half,
        cx + half,
        cy,
        cx,
        cy + half,
        cx - half,
        cy,
        theme.gateway_fill,
        theme.gateway_border
    );

    let arm = half * 0.35;
    let stroke = format!("stroke=\"{}\" stroke-width=\"3\"", theme.gateway_border);
    match kind {
        GatewayKind::Exclusive => {
            out.push_str(&format!(
                "<path d=\"M {:.2} {:.2} L {:.2} {:.2} M {:.2} {:.2} L {:.2} {:.2}\" {stroke}/>",
                cx - arm,
                cy - arm,
                cx + arm,
                cy + arm,
                cx + arm,
                cy - arm,
                cx - arm,
                cy + arm
            ));
        }
        GatewayKind::Parallel => {
            out.push_str(&format!(
                "<path d=\"M {:.2} {:.2} L {:.2} {:.2} M {:.2} {:.2} L {:.2} {:.2}\" {stroke}/>",
                cx,
                cy - arm,
                cx,
                cy + arm,
                cx - arm,
                cy,
                cx + arm,
                cy
            ));
        }
        GatewayKind::Inclusive => {
            out.push_str(&format!(
                "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{arm:.2}\" fill=\"none\" {stroke}/>"
            ));
        }
    }

    if !node.label.trim().is_empty() {
        // Gateway names sit under the diamond.
        let max_chars = chars_that_fit(node.width * 2.5, theme);
        let block = measure_label(&node.label, max_chars, theme, config);
        let label_y = node.y + node.height + block.height / 2.0 + LABEL_PAD_Y;
        out.push_str(&text_block_svg(cx, label_y, &block, theme, config));
    }
    out
}

fn chars_that_fit(width: f32, theme: &Theme) -> usize {
    let glyph = (theme.font_size * CHAR_WIDTH_RATIO).max(1.0);
    ((width / glyph).floor() as usize).max(1)
}

/// Greedy word wrap. Words longer than a line, and scripts written without
/// spaces, are broken at character boundaries.
fn wrap_label(label: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in label.lines() {
        let mut current = String::new();
        let mut current_len = 0usize;
        for word in paragraph.split_whitespace() {
            let word_len = word.chars().count();
            let needed = if current_len == 0 { word_len } else { current_len + 1 + word_len };
            if needed <= max_chars {
                if current_len > 0 {
                    current.push(' ');
                }
                current.push_str(word);
                current_len = needed;
                continue;
            }
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for chunk in chars.chunks(max_chars) {
                if chunk.len() == max_chars {
                    lines.push(chunk.iter().collect());
                } else {
                    current = chunk.iter().collect();
                    current_len = chunk.len();
                }
            }
        }
        if current_len > 0 {
            lines.push(current);
        }
    }
    lines
}

fn measure_label(label: &str, max_chars: usize, theme: &Theme, config: &LayoutConfig) -> TextBlock {
    let lines = wrap_label(label, max_chars.max(1));
    let longest = lines.iter().map(|line| line.chars().count()).max().unwrap_or(0);
    TextBlock {
        width: longest as f32 * theme.font_size * CHAR_WIDTH_RATIO,
        height: lines.len() as f32 * theme.font_size * config.label_line_height,
        lines,
    }
}

fn points_to_path(points: &[(f32, f32)]) -> String {
    if points.is_empty() {
        return String::new();
    }
    let mut d = String::new();
    d.push_str(&format!("M {:.2} {:.2}", points[0].0, points[0].1));
    for point in points.iter().skip(1) {
        d.push_str(&format!(" L {:.2} {:.2}", point.0, point.1));
    }
    d
}

fn text_block_svg(x: f32, y: f32, label: &TextBlock, theme: &Theme, config: &LayoutConfig) -> String {
    if label.lines.is_empty() {
        return String::new();
    }
    let line_height = theme.font_size * config.label_line_height;
    let start_y = y - label.height / 2.0 + theme.font_size;
    let mut text = String::new();

    text.push_str(&format!(
        "<text x=\"{x:.2}\" y=\"{start_y:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">",
        theme.font_family, theme.font_size, theme.text_color
    ));

    for (idx, line) in label.lines.iter().enumerate() {
        let dy = if idx == 0 { 0.0 } else { line_height };
        text.push_str(&format!("<tspan x=\"{x:.2}\" dy=\"{dy:.2}\">{}</tspan>", escape_xml(line)));
    }

    text.push_str("</text>");
    text
}

fn compute_edge_label_positions(
    edges: &[EdgeLayout],
    theme: &Theme,
    config: &LayoutConfig,
) -> HashMap<usize, Option<(f32, f32, TextBlock)>> {
    let mut occupied: Vec<(f32, f32, f32, f32)> = Vec::new();
    let mut positions = HashMap::new();

    for (idx, edge) in edges.iter().enumerate() {
        let Some(text) = edge.label() else {
            positions.insert(idx, None);
            continue;
        };
        let label = measure_label(text, usize::MAX, theme, config);
        let (mid_x, mid_y) = edge_midpoint(edge);
        let mut offset = 0.0;
        let mut placed = None;

        for _ in 0..6 {
            let x = mid_x;
            let y = mid_y + offset;
            let rect = (
                x - label.width / 2.0 - LABEL_PAD_X,
                y - label.height / 2.0 - LABEL_PAD_Y,
                label.width + LABEL_PAD_X * 2.0,
                label.height + LABEL_PAD_Y * 2.0,
            );
            if !collides(&rect, &occupied) {
                occupied.push(rect);
                placed = Some((x, y, label.clone()));
                break;
            }
            offset += label.height + LABEL_PAD_X;
        }

        if placed.is_none() {
            placed = Some((mid_x, mid_y, label));
        }

        positions.insert(idx, placed);
    }

    positions
}

/// Middle of the vertical jog for orthogonal routes, else the chord midpoint.
fn edge_midpoint(edge: &EdgeLayout) -> (f32, f32) {
    if edge.points.len() == 4 {
        let p1 = edge.points[1];
        let p2 = edge.points[2];
        ((p1.0 + p2.0) / 2.0, (p1.1 + p2.1) / 2.0)
    } else if edge.points.len() > 4 {
        let mid = edge.points.len() / 2;
        let p1 = edge.points[mid - 1];
        let p2 = edge.points[mid];
        ((p1.0 + p2.0) / 2.0, (p1.1 + p2.1) / 2.0)
    } else if edge.points.len() >= 2 {
        let p1 = edge.points[0];
        let p2 = edge.points[edge.points.len() - 1];
        ((p1.0 + p2.0) / 2.0, (p1.1 + p2.1) / 2.0)
    } else {
        (0.0, 0.0)
    }
}

fn collides(rect: &(f32, f32, f32, f32), occupied: &[(f32, f32, f32, f32)]) -> bool {
    occupied.iter().any(|(x, y, w, h)| {
        rect.0 < x + w && rect.0 + rect.2 > *x && rect.1 < y + h && rect.1 + rect.3 > *y
    })
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
            log::debug!(path = path.display().to_string(); "wrote SVG");
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = "Arial".to_string();
    opt.fontdb_mut().load_system_fonts();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .or_else(|| usvg::Size::from_wh(800.0, 600.0))
        .ok_or_else(|| anyhow::anyhow!("invalid default render size"))?;

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, _output: &Path, _render_cfg: &RenderConfig) -> Result<()> {
    anyhow::bail!("PNG output requires the `png` feature")
}

pub(crate) fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
