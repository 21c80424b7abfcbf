use std::path::Path;

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};

use crate::theme::Theme;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Figure size in inches, converted to pixels via `dpi`.
    pub figsize: (f32, f32),
    pub dpi: f32,
    /// Axis limits in data units. `None` auto-computes from node centers
    /// plus `margin`.
    pub xlim: Option<(f32, f32)>,
    pub ylim: Option<(f32, f32)>,
    /// Margin (data units) added around node centers when auto-computing
    /// axis limits.
    pub margin: (f32, f32),
    /// Node label font size in pixels.
    pub font_size: f32,
    pub edge_font_size: f32,
    pub title_font_size: f32,
    pub label_line_height: f32,
    /// Padding (data units) added around the measured text extent.
    pub pad: f32,
    /// Corner rounding of node boxes (data units); also the clearance kept
    /// between an arrowhead and the face it lands on.
    pub box_pad: f32,
    /// Radius of the rounded elbow corner, in data units.
    pub corner_radius: f32,
    /// Fixed node box width/height overrides (data units). When set, the
    /// measured extent is ignored on that axis.
    pub node_width: Option<f32>,
    pub node_height: Option<f32>,
    /// Cap on the vertical auto-spacing factor. 1.5 allows the tier span to
    /// grow by 50%. `None` disables the cap.
    pub max_autoscale: Option<f32>,
    pub title: Option<String>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            figsize: (18.0, 6.0),
            dpi: 100.0,
            xlim: None,
            ylim: None,
            margin: (3.0, 1.2),
            font_size: 12.0,
            edge_font_size: 11.0,
            title_font_size: 16.0,
            label_line_height: 1.35,
            pad: 0.2,
            box_pad: 0.1,
            corner_radius: 0.4,
            node_width: None,
            node_height: None,
            max_autoscale: Some(1.5),
            title: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub flow: FlowConfig,
    pub theme: Theme,
}

/// Load a JSON/JSON5 config file; absent path yields the defaults. Unknown
/// keys are ignored, missing keys fall back field by field.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: Config =
        json5::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config)
}
