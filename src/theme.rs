use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub text_color: String,
    pub line_color: String,
    pub task_fill: String,
    pub task_border: String,
    pub gateway_fill: String,
    pub gateway_border: String,
    pub lane_fill: String,
    pub lane_alt_fill: String,
    pub lane_border: String,
    pub lane_header_fill: String,
    pub edge_label_background: String,
    pub background: String,
}

impl Theme {
    pub fn bpmn_default() -> Self {
        Self {
            font_family: "Arial, Helvetica, sans-serif".to_string(),
            font_size: 13.0,
            text_color: "#222222".to_string(),
            line_color: "#333333".to_string(),
            task_fill: "#FFFFFF".to_string(),
            task_border: "#333333".to_string(),
            gateway_fill: "#FFFFFF".to_string(),
            gateway_border: "#333333".to_string(),
            lane_fill: "#FFFFFF".to_string(),
            lane_alt_fill: "#F7F7F7".to_string(),
            lane_border: "#666666".to_string(),
            lane_header_fill: "#EDEDED".to_string(),
            edge_label_background: "#FFFFFF".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            text_color: "#1C2430".to_string(),
            line_color: "#7A8AA6".to_string(),
            task_fill: "#F8FAFF".to_string(),
            task_border: "#C7D2E5".to_string(),
            gateway_fill: "#FFF8E6".to_string(),
            gateway_border: "#D9B45A".to_string(),
            lane_fill: "#FFFFFF".to_string(),
            lane_alt_fill: "#F7FAFF".to_string(),
            lane_border: "#D7E0F0".to_string(),
            lane_header_fill: "#EEF2F8".to_string(),
            edge_label_background: "#FFFFFF".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::bpmn_default()
    }
}
