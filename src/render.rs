use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result as IoResult;

use crate::config::FlowConfig;
use crate::error::Result;
use crate::ir::Diagram;
use crate::layout::{ConnectorStyle, Layout, NodeBox, RouteLayout, TextBlock, compute_layout};
use crate::text_metrics::SystemFonts;
use crate::theme::Theme;

const EDGE_STROKE_WIDTH: f32 = 1.8;
const DASH_PATTERN: &str = "6 4";
const LABEL_PAD_X: f32 = 5.0;
const LABEL_PAD_Y: f32 = 3.0;

/// Build a finished figure for a diagram, measuring text against the
/// system fonts. Fatal configuration errors (unknown node, self-loop,
/// missing font) surface here before anything is drawn.
pub fn flow_diagram(diagram: &Diagram, theme: &Theme, config: &FlowConfig) -> Result<Figure> {
    let layout = compute_layout(diagram, theme, config, &SystemFonts)?;
    Ok(Figure {
        layout,
        theme: theme.clone(),
        config: config.clone(),
    })
}

/// A computed diagram ready to render. Holds the layout plus the tokens it
/// was computed against.
#[derive(Debug, Clone)]
pub struct Figure {
    pub layout: Layout,
    theme: Theme,
    config: FlowConfig,
}

impl Figure {
    pub fn to_svg(&self) -> String {
        render_svg(&self.layout, &self.theme, &self.config)
    }

    pub fn write_svg(&self, path: &Path) -> IoResult<()> {
        std::fs::write(path, self.to_svg())?;
        Ok(())
    }

    #[cfg(feature = "png")]
    pub fn write_png(&self, path: &Path) -> IoResult<()> {
        write_output_png(&self.to_svg(), path, &self.theme)
    }
}

/// Frame mapping data coordinates (y up) onto SVG pixels (y down).
struct Frame {
    x0: f32,
    y1: f32,
    scale_x: f32,
    scale_y: f32,
}

impl Frame {
    fn of(layout: &Layout) -> Self {
        let x_range = (layout.x_range.1 - layout.x_range.0).max(1e-6);
        let y_range = (layout.y_range.1 - layout.y_range.0).max(1e-6);
        Self {
            x0: layout.x_range.0,
            y1: layout.y_range.1,
            scale_x: layout.width / x_range,
            scale_y: layout.height / y_range,
        }
    }

    fn px(&self, point: (f32, f32)) -> (f32, f32) {
        (
            (point.0 - self.x0) * self.scale_x,
            (self.y1 - point.1) * self.scale_y,
        )
    }
}

pub fn render_svg(layout: &Layout, theme: &Theme, config: &FlowConfig) -> String {
    let frame = Frame::of(layout);
    let width = layout.width;
    let height = layout.height;
    let mut svg = String::new();

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.0}\" height=\"{height:.0}\" viewBox=\"0 0 {width:.0} {height:.0}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));

    let arrow_colors = collect_arrow_colors(&layout.routes, theme);
    svg.push_str("<defs>");
    for (color, id) in &arrow_colors {
        svg.push_str(&format!(
            "<marker id=\"{id}\" viewBox=\"0 0 10 10\" refX=\"9\" refY=\"5\" markerWidth=\"7\" markerHeight=\"7\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{color}\"/></marker>",
        ));
    }
    svg.push_str("</defs>");

    // Connectors draw first so boxes sit over their tails.
    for route in &layout.routes {
        let color = route.color.as_deref().unwrap_or(&theme.text_dark);
        let marker_id = &arrow_colors[color];
        let d = connector_path(route, &frame, config);
        let dash = if route.dashed {
            format!(" stroke-dasharray=\"{DASH_PATTERN}\"")
        } else {
            String::new()
        };
        svg.push_str(&format!(
            "<path d=\"{d}\" fill=\"none\" stroke=\"{color}\" stroke-width=\"{EDGE_STROKE_WIDTH}\"{dash} marker-end=\"url(#{marker_id})\"/>",
        ));
    }

    for node in layout.boxes.values() {
        svg.push_str(&box_svg(node, &frame, theme, config));
    }
    for node in layout.boxes.values() {
        let center = frame.px((node.cx, node.cy));
        svg.push_str(&text_block_svg(
            center,
            &node.label,
            config.font_size,
            &node.text_color,
            theme,
            config,
        ));
    }

    // Labels last so they stay legible over crossings.
    for route in &layout.routes {
        let (Some(label), Some(anchor)) = (&route.label, route.label_anchor) else {
            continue;
        };
        let color = route.color.as_deref().unwrap_or(&theme.text_dark);
        let (x, y) = frame.px(anchor);
        let rect_x = x - label.width / 2.0 - LABEL_PAD_X;
        let rect_y = y - label.height / 2.0 - LABEL_PAD_Y;
        let rect_w = label.width + 2.0 * LABEL_PAD_X;
        let rect_h = label.height + 2.0 * LABEL_PAD_Y;
        svg.push_str(&format!(
            "<rect x=\"{rect_x:.2}\" y=\"{rect_y:.2}\" width=\"{rect_w:.2}\" height=\"{rect_h:.2}\" rx=\"4\" ry=\"4\" fill=\"{}\" fill-opacity=\"0.95\"/>",
            theme.edge_label_background
        ));
        svg.push_str(&text_block_svg(
            (x, y),
            label,
            config.edge_font_size,
            color,
            theme,
            config,
        ));
    }

    if let Some(title) = &layout.title {
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" font-weight=\"bold\" fill=\"{}\">{}</text>",
            width / 2.0,
            config.title_font_size + 8.0,
            theme.font_family,
            config.title_font_size,
            theme.text_dark,
            escape_xml(title)
        ));
    }

    svg.push_str("</svg>");
    svg
}

fn collect_arrow_colors<'a>(
    routes: &'a [RouteLayout],
    theme: &'a Theme,
) -> BTreeMap<&'a str, String> {
    let mut colors: BTreeMap<&str, String> = BTreeMap::new();
    colors.insert(&theme.text_dark, "arrow-0".to_string());
    for route in routes {
        if let Some(color) = route.color.as_deref() {
            let next = format!("arrow-{}", colors.len());
            colors.entry(color).or_insert(next);
        }
    }
    colors
}

fn connector_path(route: &RouteLayout, frame: &Frame, config: &FlowConfig) -> String {
    let start = frame.px(route.start);
    let end = frame.px(route.end);
    match route.style {
        ConnectorStyle::Straight => {
            format!(
                "M {:.2} {:.2} L {:.2} {:.2}",
                start.0, start.1, end.0, end.1
            )
        }
        ConnectorStyle::Elbow => {
            let bend = frame.px(route.bend());
            elbow_path(start, bend, end, config.corner_radius * frame.scale_x)
        }
        ConnectorStyle::Arc(curve) => {
            // Control point lives in data space so the bow direction matches
            // the diagram's orientation, not the flipped pixel axes.
            let control = frame.px(crate::layout::arc_control_point(
                route.start,
                route.end,
                curve,
            ));
            format!(
                "M {:.2} {:.2} Q {:.2} {:.2} {:.2} {:.2}",
                start.0, start.1, control.0, control.1, end.0, end.1
            )
        }
    }
}

/// Two-segment path with a rounded corner. The radius is clamped to half of
/// either arm so short arms still bend cleanly.
fn elbow_path(start: (f32, f32), bend: (f32, f32), end: (f32, f32), radius: f32) -> String {
    let arm_in = ((bend.0 - start.0), (bend.1 - start.1));
    let arm_out = ((end.0 - bend.0), (end.1 - bend.1));
    let len_in = arm_in.0.hypot(arm_in.1);
    let len_out = arm_out.0.hypot(arm_out.1);
    let radius = radius.min(len_in / 2.0).min(len_out / 2.0).max(0.0);
    if radius < 0.5 || len_in < 1e-3 || len_out < 1e-3 {
        return format!(
            "M {:.2} {:.2} L {:.2} {:.2} L {:.2} {:.2}",
            start.0, start.1, bend.0, bend.1, end.0, end.1
        );
    }
    let into = (
        bend.0 - arm_in.0 / len_in * radius,
        bend.1 - arm_in.1 / len_in * radius,
    );
    let out_of = (
        bend.0 + arm_out.0 / len_out * radius,
        bend.1 + arm_out.1 / len_out * radius,
    );
    format!(
        "M {:.2} {:.2} L {:.2} {:.2} Q {:.2} {:.2} {:.2} {:.2} L {:.2} {:.2}",
        start.0, start.1, into.0, into.1, bend.0, bend.1, out_of.0, out_of.1, end.0, end.1
    )
}

fn box_svg(node: &NodeBox, frame: &Frame, theme: &Theme, config: &FlowConfig) -> String {
    let (x, y) = frame.px((node.x0(), node.y1()));
    let width = 2.0 * node.half_width * frame.scale_x;
    let height = 2.0 * node.half_height * frame.scale_y;
    let rx = (config.box_pad * frame.scale_x).min(width / 2.0);
    // Background-filled boxes get an outline so they read against the canvas.
    let (stroke, stroke_width) = if node.fill.eq_ignore_ascii_case(&theme.box_background) {
        (theme.context.as_str(), 1.2)
    } else {
        ("none", 0.0)
    };
    format!(
        "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{width:.2}\" height=\"{height:.2}\" rx=\"{rx:.2}\" ry=\"{rx:.2}\" fill=\"{}\" stroke=\"{stroke}\" stroke-width=\"{stroke_width}\"/>",
        node.fill
    )
}

fn text_block_svg(
    center: (f32, f32),
    label: &TextBlock,
    font_size: f32,
    fill: &str,
    theme: &Theme,
    config: &FlowConfig,
) -> String {
    let (x, y) = center;
    let line_height = font_size * config.label_line_height;
    let total_height = label.lines.len() as f32 * line_height;
    let first_baseline = y - total_height / 2.0 + font_size;
    let mut text = format!(
        "<text x=\"{x:.2}\" y=\"{first_baseline:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{font_size}\" font-weight=\"bold\" fill=\"{fill}\">",
        theme.font_family
    );
    for (idx, line) in label.lines.iter().enumerate() {
        let dy = if idx == 0 { 0.0 } else { line_height };
        text.push_str(&format!(
            "<tspan x=\"{x:.2}\" dy=\"{dy:.2}\">{}</tspan>",
            escape_xml(line)
        ));
    }
    text.push_str("</text>");
    text
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> IoResult<()> {
    match output {
        Some(path) => std::fs::write(path, svg)?,
        None => print!("{svg}"),
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, theme: &Theme) -> IoResult<()> {
    let mut options = usvg::Options::default();
    options.font_family = theme
        .font_family
        .split(',')
        .next()
        .unwrap_or("sans-serif")
        .trim()
        .to_string();

    let tree = usvg::Tree::from_str(svg, &options)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("failed to allocate pixmap"))?;
    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlowConfig;
    use crate::ir::EdgeSpec;
    use crate::text_metrics::FixedMetrics;

    fn render_two_nodes(config: &FlowConfig) -> String {
        let mut diagram = Diagram::new();
        diagram.node("a", "Alpha", 0.0, 0.0, "#f5f5f5", "#323034");
        diagram.node("b", "Beta", 4.0, 0.0, "#228833", "#ffffff");
        diagram.edge(EdgeSpec::new("a", "b").label("go"));
        let theme = Theme::light();
        let layout = compute_layout(&diagram, &theme, config, &FixedMetrics::default()).unwrap();
        render_svg(&layout, &theme, config)
    }

    #[test]
    fn render_svg_basic() {
        let svg = render_two_nodes(&FlowConfig::default());
        assert!(svg.contains("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("Alpha"));
        assert!(svg.contains("marker-end"));
    }

    #[test]
    fn title_is_rendered_when_configured() {
        let config = FlowConfig {
            title: Some("Energy <flows>".to_string()),
            ..FlowConfig::default()
        };
        let svg = render_two_nodes(&config);
        assert!(svg.contains("Energy &lt;flows&gt;"));
    }

    #[test]
    fn dashed_edges_carry_a_dasharray() {
        let mut diagram = Diagram::new();
        diagram.node("a", "A", 0.0, 0.0, "#fff", "#000");
        diagram.node("b", "B", 4.0, 0.0, "#fff", "#000");
        diagram.edge(EdgeSpec::new("a", "b").dashed());
        let theme = Theme::light();
        let config = FlowConfig::default();
        let layout = compute_layout(&diagram, &theme, &config, &FixedMetrics::default()).unwrap();
        let svg = render_svg(&layout, &theme, &config);
        assert!(svg.contains("stroke-dasharray"));
    }

    #[test]
    fn elbow_routes_emit_a_rounded_corner() {
        let mut diagram = Diagram::new();
        diagram.node("a", "A", 0.0, 0.0, "#fff", "#000");
        diagram.node("b", "B", 4.0, 2.0, "#fff", "#000");
        diagram.edge(EdgeSpec::new("a", "b"));
        let theme = Theme::light();
        let config = FlowConfig::default();
        let layout = compute_layout(&diagram, &theme, &config, &FixedMetrics::default()).unwrap();
        assert_eq!(layout.routes[0].style, ConnectorStyle::Elbow);
        let svg = render_svg(&layout, &theme, &config);
        assert!(svg.contains(" Q "), "elbow path should bend: {svg}");
    }

    #[test]
    fn edge_color_override_gets_its_own_marker() {
        let mut diagram = Diagram::new();
        diagram.node("a", "A", 0.0, 0.0, "#fff", "#000");
        diagram.node("b", "B", 4.0, 0.0, "#fff", "#000");
        diagram.edge(EdgeSpec::new("a", "b").color("#EE6677"));
        let theme = Theme::light();
        let config = FlowConfig::default();
        let layout = compute_layout(&diagram, &theme, &config, &FixedMetrics::default()).unwrap();
        let svg = render_svg(&layout, &theme, &config);
        assert!(svg.contains("arrow-1"));
        assert!(svg.contains("#EE6677"));
    }

    #[test]
    fn escape_xml_covers_markup() {
        assert_eq!(escape_xml("a<b>&\"c'"), "a&lt;b&gt;&amp;&quot;c&apos;");
    }

    #[test]
    fn elbow_path_degrades_to_sharp_corner_when_tight() {
        let d = elbow_path((0.0, 0.0), (0.4, 0.0), (0.4, 0.4), 10.0);
        assert!(!d.contains('Q'));
    }
}
