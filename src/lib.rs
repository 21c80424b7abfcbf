pub mod config;
pub mod error;
pub mod ir;
pub mod layout;
pub mod render;
pub mod text_metrics;
pub mod theme;

pub use config::{Config, FlowConfig, load_config};
pub use error::{DiagramError, Result};
pub use ir::{Diagram, EdgeSpec, Face, NodeSpec};
pub use layout::{Layout, compute_layout};
pub use render::{Figure, flow_diagram, render_svg};
pub use text_metrics::{FixedMetrics, SystemFonts, TextMeasure};
pub use theme::Theme;
