mod autospace;
mod routing;
mod text;
pub(crate) mod types;
pub use types::*;
pub(crate) use routing::arc_control_point;

use std::collections::{BTreeMap, HashMap};

use crate::config::FlowConfig;
use crate::error::{DiagramError, Result};
use crate::ir::Diagram;
use crate::text_metrics::TextMeasure;
use crate::theme::Theme;

const COLUMN_KEY_SCALE: f32 = 1e6;
const MIN_AXIS_RANGE: f32 = 1e-6;

/// Measure boxes, auto-space tiers, and route edges. Pure over its inputs:
/// nothing is cached between calls, and the text capability is the only
/// external dependency.
pub fn compute_layout(
    diagram: &Diagram,
    theme: &Theme,
    config: &FlowConfig,
    measurer: &dyn TextMeasure,
) -> Result<Layout> {
    validate(diagram)?;

    let (xlim, mut ylim) = axis_limits(diagram, config);
    let width_px = config.figsize.0 * config.dpi;
    let mut height_px = config.figsize.1 * config.dpi;
    let scale_x = width_px / (xlim.1 - xlim.0).max(MIN_AXIS_RANGE);
    let scale_y = height_px / (ylim.1 - ylim.0).max(MIN_AXIS_RANGE);

    let mut boxes = BTreeMap::new();
    for (id, spec) in &diagram.nodes {
        let label = text::measure_label(
            &spec.label,
            config.font_size,
            &theme.font_family,
            config,
            measurer,
        )?;
        let half_width = match config.node_width {
            Some(width) => width / 2.0,
            None => label.width / scale_x / 2.0 + config.pad,
        };
        let half_height = match config.node_height {
            Some(height) => height / 2.0,
            None => label.height / scale_y / 2.0 + config.pad,
        };
        boxes.insert(
            id.clone(),
            NodeBox {
                id: id.clone(),
                cx: spec.cx,
                cy: spec.cy,
                half_width,
                half_height,
                label,
                fill: spec.fill.clone(),
                text_color: spec.text_color.clone(),
            },
        );
    }
    normalize_column_widths(&mut boxes);

    let mut edge_labels: Vec<Option<TextBlock>> = Vec::with_capacity(diagram.edges.len());
    for edge in &diagram.edges {
        edge_labels.push(match &edge.label {
            Some(label) => Some(text::measure_label(
                label,
                config.edge_font_size,
                &theme.font_family,
                config,
                measurer,
            )?),
            None => None,
        });
    }

    let line_units = config.edge_font_size / scale_y;
    let label_clearance = line_units * 3.0 + 0.5;
    let label_half_heights: Vec<Option<f32>> = edge_labels
        .iter()
        .map(|label| {
            label.as_ref().map(|block| {
                block.lines.len() as f32 * line_units * config.label_line_height / 2.0 + 0.05
            })
        })
        .collect();

    let center_span = center_span(diagram);
    let factor = autospace::autospace(
        &mut boxes,
        &diagram.edges,
        &label_half_heights,
        label_clearance,
        config.max_autoscale,
    );
    if factor > 1.0 {
        // The top tier moved up; extend the axis and figure in step so the
        // pixel scale (and thus measured box extents) stays valid.
        let shift = center_span * (factor - 1.0);
        ylim.1 += shift;
        height_px += shift * scale_y;
    }

    let routes = routing::route_edges(&diagram.edges, &boxes, edge_labels, config);

    Ok(Layout {
        boxes,
        routes,
        title: config.title.clone(),
        x_range: xlim,
        y_range: ylim,
        width: width_px,
        height: height_px,
        autoscale: factor,
    })
}

/// Configuration errors are surfaced here, before anything is measured or
/// drawn.
fn validate(diagram: &Diagram) -> Result<()> {
    for (index, edge) in diagram.edges.iter().enumerate() {
        if !diagram.nodes.contains_key(&edge.src) {
            return Err(DiagramError::UnknownNode {
                index,
                id: edge.src.clone(),
            });
        }
        if !diagram.nodes.contains_key(&edge.dst) {
            return Err(DiagramError::UnknownNode {
                index,
                id: edge.dst.clone(),
            });
        }
        if edge.src == edge.dst {
            return Err(DiagramError::SelfLoop {
                index,
                id: edge.src.clone(),
            });
        }
    }
    Ok(())
}

fn axis_limits(diagram: &Diagram, config: &FlowConfig) -> ((f32, f32), (f32, f32)) {
    let xlim = config.xlim.unwrap_or_else(|| {
        let (min, max) = center_bounds(diagram.nodes.values().map(|node| node.cx));
        (min - config.margin.0, max + config.margin.0)
    });
    let ylim = config.ylim.unwrap_or_else(|| {
        let (min, max) = center_bounds(diagram.nodes.values().map(|node| node.cy));
        (min - config.margin.1, max + config.margin.1)
    });
    (xlim, ylim)
}

fn center_bounds(values: impl Iterator<Item = f32>) -> (f32, f32) {
    let mut min = f32::MAX;
    let mut max = f32::MIN;
    let mut seen = false;
    for value in values {
        min = min.min(value);
        max = max.max(value);
        seen = true;
    }
    if seen { (min, max) } else { (0.0, 1.0) }
}

fn center_span(diagram: &Diagram) -> f32 {
    let (min, max) = center_bounds(diagram.nodes.values().map(|node| node.cy));
    (max - min).max(0.0)
}

/// Nodes stacked in the same x-column take the column's widest box so
/// aligned tiers read as a clean rail.
fn normalize_column_widths(boxes: &mut BTreeMap<String, NodeBox>) {
    let mut columns: HashMap<i64, f32> = HashMap::new();
    for node in boxes.values() {
        let key = (node.cx * COLUMN_KEY_SCALE).round() as i64;
        let entry = columns.entry(key).or_insert(0.0);
        *entry = entry.max(node.half_width);
    }
    for node in boxes.values_mut() {
        let key = (node.cx * COLUMN_KEY_SCALE).round() as i64;
        if let Some(width) = columns.get(&key) {
            node.half_width = *width;
        }
    }
}
