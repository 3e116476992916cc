use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a gateway without an explicit participant picks its lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GatewayLanePolicy {
    /// Most common predecessor lane, then any successor lane, then lane 0.
    #[default]
    PredecessorFirst,
    /// Any successor lane, then the most common predecessor lane, then lane 0.
    SuccessorFirst,
    /// Always lane 0.
    FirstLane,
}

/// How explicit task phases influence rank assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PhaseHintPolicy {
    /// A task's phase index is a lower bound on its rank.
    #[default]
    Floor,
    /// Ranks come from graph structure alone.
    Ignore,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSizeConfig {
    pub base_width: f32,
    pub max_width: f32,
    pub height: f32,
    /// Width before any label characters are counted.
    pub label_base_width: f32,
    pub char_width: f32,
}

impl Default for TaskSizeConfig {
    fn default() -> Self {
        Self {
            base_width: 120.0,
            max_width: 280.0,
            height: 80.0,
            label_base_width: 80.0,
            char_width: 8.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Same-lane edges spanning at most this many ranks are drawn as a straight line.
    pub direct_rank_span: usize,
    /// Distance a self-loop travels away from its node.
    pub self_loop_pad: f32,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            direct_rank_span: 1,
            self_loop_pad: 20.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub margin_x: f32,
    pub margin_y: f32,
    pub lane_header_width: f32,
    pub rank_spacing: f32,
    pub node_spacing: f32,
    pub lane_padding: f32,
    pub lane_min_height: f32,
    pub gateway_size: f32,
    pub label_line_height: f32,
    pub task: TaskSizeConfig,
    pub routing: RoutingConfig,
    pub gateway_lanes: GatewayLanePolicy,
    pub phase_hints: PhaseHintPolicy,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            margin_x: 50.0,
            margin_y: 50.0,
            lane_header_width: 180.0,
            rank_spacing: 80.0,
            node_spacing: 20.0,
            lane_padding: 20.0,
            lane_min_height: 150.0,
            gateway_size: 60.0,
            label_line_height: 1.4,
            task: TaskSizeConfig::default(),
            routing: RoutingConfig::default(),
            gateway_lanes: GatewayLanePolicy::default(),
            phase_hints: PhaseHintPolicy::default(),
        }
    }
}

impl LayoutConfig {
    /// Canvas size of a document with no lanes and no ranks.
    pub fn min_canvas(&self) -> (f32, f32) {
        (
            self.margin_x * 2.0 + self.lane_header_width,
            self.margin_y * 2.0,
        )
    }

    /// Clamps values so every computed width and height stays positive and every
    /// offset stays non-negative.
    pub fn sanitized(mut self) -> Self {
        self.margin_x = self.margin_x.max(0.0);
        self.margin_y = self.margin_y.max(0.0);
        self.lane_header_width = self.lane_header_width.max(0.0);
        self.rank_spacing = self.rank_spacing.max(0.0);
        self.node_spacing = self.node_spacing.max(0.0);
        self.lane_padding = self.lane_padding.max(0.0);
        self.lane_min_height = self.lane_min_height.max(1.0);
        self.gateway_size = self.gateway_size.max(1.0);
        self.label_line_height = self.label_line_height.max(0.5);
        self.task.base_width = self.task.base_width.max(1.0);
        self.task.max_width = self.task.max_width.max(self.task.base_width);
        self.task.height = self.task.height.max(1.0);
        self.task.label_base_width = self.task.label_base_width.max(0.0);
        self.task.char_width = self.task.char_width.max(0.0);
        self.routing.self_loop_pad = self.routing.self_loop_pad.max(0.0);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::bpmn_default();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: LayoutConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    text_color: Option<String>,
    line_color: Option<String>,
    task_fill: Option<String>,
    task_border: Option<String>,
    gateway_fill: Option<String>,
    gateway_border: Option<String>,
    lane_fill: Option<String>,
    lane_alt_fill: Option<String>,
    lane_border: Option<String>,
    lane_header_fill: Option<String>,
    edge_label_background: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct TaskSizeConfigFile {
    base_width: Option<f32>,
    max_width: Option<f32>,
    height: Option<f32>,
    label_base_width: Option<f32>,
    char_width: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RoutingConfigFile {
    direct_rank_span: Option<usize>,
    self_loop_pad: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    margin_x: Option<f32>,
    margin_y: Option<f32>,
    lane_header_width: Option<f32>,
    rank_spacing: Option<f32>,
    node_spacing: Option<f32>,
    lane_padding: Option<f32>,
    lane_min_height: Option<f32>,
    gateway_size: Option<f32>,
    label_line_height: Option<f32>,
    task: Option<TaskSizeConfigFile>,
    routing: Option<RoutingConfigFile>,
    gateway_lanes: Option<GatewayLanePolicy>,
    phase_hints: Option<PhaseHintPolicy>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    width: Option<f32>,
    height: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfigFile>,
    render: Option<RenderConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        match theme_name {
            "modern" => config.theme = Theme::modern(),
            "bpmn" | "default" => config.theme = Theme::bpmn_default(),
            other => log::warn!("unknown theme '{other}', keeping the default theme"),
        }
        config.render.background = config.theme.background.clone();
    }

    if let Some(vars) = parsed.theme_variables {
        apply_theme_variables(&mut config, vars);
    }

    if let Some(layout) = parsed.layout {
        apply_layout_overrides(&mut config.layout, layout);
    }
    config.layout = config.layout.sanitized();

    if let Some(render) = parsed.render {
        if let Some(v) = render.width {
            config.render.width = v;
        }
        if let Some(v) = render.height {
            config.render.height = v;
        }
    }

    Ok(config)
}

fn apply_theme_variables(config: &mut Config, vars: ThemeVariables) {
    if let Some(v) = vars.font_family {
        config.theme.font_family = v;
    }
    if let Some(v) = vars.font_size {
        config.theme.font_size = v;
    }
    if let Some(v) = vars.text_color {
        config.theme.text_color = v;
    }
    if let Some(v) = vars.line_color {
        config.theme.line_color = v;
    }
    if let Some(v) = vars.task_fill {
        config.theme.task_fill = v;
    }
    if let Some(v) = vars.task_border {
        config.theme.task_border = v;
    }
    if let Some(v) = vars.gateway_fill {
        config.theme.gateway_fill = v;
    }
    if let Some(v) = vars.gateway_border {
        config.theme.gateway_border = v;
    }
    if let Some(v) = vars.lane_fill {
        config.theme.lane_fill = v;
    }
    if let Some(v) = vars.lane_alt_fill {
        config.theme.lane_alt_fill = v;
    }
    if let Some(v) = vars.lane_border {
        config.theme.lane_border = v;
    }
    if let Some(v) = vars.lane_header_fill {
        config.theme.lane_header_fill = v;
    }
    if let Some(v) = vars.edge_label_background {
        config.theme.edge_label_background = v;
    }
    if let Some(v) = vars.background {
        config.render.background = v.clone();
        config.theme.background = v;
    }
}

fn apply_layout_overrides(layout: &mut LayoutConfig, file: LayoutConfigFile) {
    if let Some(v) = file.margin_x {
        layout.margin_x = v;
    }
    if let Some(v) = file.margin_y {
        layout.margin_y = v;
    }
    if let Some(v) = file.lane_header_width {
        layout.lane_header_width = v;
    }
    if let Some(v) = file.rank_spacing {
        layout.rank_spacing = v;
    }
    if let Some(v) = file.node_spacing {
        layout.node_spacing = v;
    }
    if let Some(v) = file.lane_padding {
        layout.lane_padding = v;
    }
    if let Some(v) = file.lane_min_height {
        layout.lane_min_height = v;
    }
    if let Some(v) = file.gateway_size {
        layout.gateway_size = v;
    }
    if let Some(v) = file.label_line_height {
        layout.label_line_height = v;
    }
    if let Some(task) = file.task {
        if let Some(v) = task.base_width {
            layout.task.base_width = v;
        }
        if let Some(v) = task.max_width {
            layout.task.max_width = v;
        }
        if let Some(v) = task.height {
            layout.task.height = v;
        }
        if let Some(v) = task.label_base_width {
            layout.task.label_base_width = v;
        }
        if let Some(v) = task.char_width {
            layout.task.char_width = v;
        }
    }
    if let Some(routing) = file.routing {
        if let Some(v) = routing.direct_rank_span {
            layout.routing.direct_rank_span = v;
        }
        if let Some(v) = routing.self_loop_pad {
            layout.routing.self_loop_pad = v;
        }
    }
    if let Some(v) = file.gateway_lanes {
        layout.gateway_lanes = v;
    }
    if let Some(v) = file.phase_hints {
        layout.phase_hints = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn missing_path_gives_defaults() {
        let config = load_config(None).unwrap();
        assert_approx_eq!(f32, config.layout.margin_x, 50.0);
        assert_eq!(config.layout.gateway_lanes, GatewayLanePolicy::PredecessorFirst);
    }

    #[test]
    fn overrides_merge_into_defaults() {
        let config = parse_config(
            r##"{
                "theme": "modern",
                "themeVariables": {"lineColor": "#123456"},
                "layout": {
                    "rankSpacing": 120,
                    "task": {"maxWidth": 300},
                    "routing": {"directRankSpan": 2},
                    "gatewayLanes": "successorFirst",
                    "phaseHints": "ignore"
                }
            }"##,
        )
        .unwrap();
        assert_eq!(config.theme.line_color, "#123456");
        assert_eq!(config.theme.font_family, Theme::modern().font_family);
        assert_approx_eq!(f32, config.layout.rank_spacing, 120.0);
        assert_approx_eq!(f32, config.layout.task.max_width, 300.0);
        assert_approx_eq!(f32, config.layout.task.base_width, 120.0);
        assert_eq!(config.layout.routing.direct_rank_span, 2);
        assert_eq!(config.layout.gateway_lanes, GatewayLanePolicy::SuccessorFirst);
        assert_eq!(config.layout.phase_hints, PhaseHintPolicy::Ignore);
    }

    #[test]
    fn negative_sizes_are_clamped() {
        let config = parse_config(
            r#"{"layout": {"laneMinHeight": -5, "gatewaySize": 0, "task": {"height": -1}}}"#,
        )
        .unwrap();
        assert!(config.layout.lane_min_height > 0.0);
        assert!(config.layout.gateway_size > 0.0);
        assert!(config.layout.task.height > 0.0);
    }

    #[test]
    fn min_canvas_is_margins_plus_header() {
        let config = LayoutConfig::default();
        let (w, h) = config.min_canvas();
        assert_approx_eq!(f32, w, 280.0);
        assert_approx_eq!(f32, h, 100.0);
    }
}
