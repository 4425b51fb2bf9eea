use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub background: String,
    pub text_color: String,
    pub vertex_border: String,
    pub vertex_border_selected: String,
    pub vertex_background: String,
    pub vertex_shadow: String,
    pub vertex_shadow_selected: String,
    pub edge_direct: String,
    pub edge_true: String,
    pub edge_false: String,
    pub edge_direct_selected: String,
    pub edge_true_selected: String,
    pub edge_false_selected: String,
    pub error_text: String,
}

impl Theme {
    /// The debugger's own palette: near-black boxes, green/red branch edges.
    pub fn dark() -> Self {
        Self {
            font_family: "Consolas".to_string(),
            font_size: 16.0,
            background: "#161616".to_string(),
            text_color: "#9b9b9b".to_string(),
            vertex_border: "#2f2f2f".to_string(),
            vertex_border_selected: "#5f5f5f".to_string(),
            vertex_background: "#0f0f0f".to_string(),
            vertex_shadow: "#080808".to_string(),
            vertex_shadow_selected: "#191919".to_string(),
            edge_direct: "#9b9b9b".to_string(),
            edge_true: "#7fff7f".to_string(),
            edge_false: "#ff7f7f".to_string(),
            edge_direct_selected: "#9c9c9c".to_string(),
            edge_true_selected: "#9fff9f".to_string(),
            edge_false_selected: "#ff9f9f".to_string(),
            error_text: "#ff7f7f".to_string(),
        }
    }

    pub fn light() -> Self {
        Self {
            font_family: "Consolas".to_string(),
            font_size: 16.0,
            background: "#FFFFFF".to_string(),
            text_color: "#333333".to_string(),
            vertex_border: "#C7D2E5".to_string(),
            vertex_border_selected: "#7A8AA6".to_string(),
            vertex_background: "#F8FAFF".to_string(),
            vertex_shadow: "#E4E8EF".to_string(),
            vertex_shadow_selected: "#C0C8D6".to_string(),
            edge_direct: "#7A8AA6".to_string(),
            edge_true: "#2E9E4F".to_string(),
            edge_false: "#C8414B".to_string(),
            edge_direct_selected: "#4F5D75".to_string(),
            edge_true_selected: "#1F7A3A".to_string(),
            edge_false_selected: "#9E2A33".to_string(),
            error_text: "#C8414B".to_string(),
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "dark" | "default" => Some(Self::dark()),
            "light" => Some(Self::light()),
            _ => None,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}
