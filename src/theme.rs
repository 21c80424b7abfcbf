use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    /// Figure background.
    pub background: String,
    /// Fill used by "plain" nodes; boxes with this fill get an outline so
    /// they read against the figure background.
    pub box_background: String,
    /// Outline color for background-filled boxes.
    pub context: String,
    /// Default arrow and edge-label color.
    pub text_dark: String,
    pub text_light: String,
    pub edge_label_background: String,
}

impl Theme {
    pub fn light() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            background: "#FFFFFF".to_string(),
            box_background: "#f5f5f5".to_string(),
            context: "#c0c0c0".to_string(),
            text_dark: "#323034".to_string(),
            text_light: "#666666".to_string(),
            edge_label_background: "#FFFFFF".to_string(),
        }
    }

    pub fn slate() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            background: "#FFFFFF".to_string(),
            box_background: "#EEF2F8".to_string(),
            context: "#C7D2E5".to_string(),
            text_dark: "#1C2430".to_string(),
            text_light: "#7A8AA6".to_string(),
            edge_label_background: "#F8FAFF".to_string(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::light()
    }
}
