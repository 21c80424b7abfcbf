use std::collections::{BTreeMap, HashMap};

use crate::config::FlowConfig;
use crate::ir::{EdgeSpec, Face};

use super::{ConnectorStyle, NodeBox, RouteLayout, TextBlock};

// ── Compass-sector heuristic ────────────────────────────────────────
/// Below this |minor| / |major| ratio an edge counts as near-axis and runs
/// straight between opposing faces.
pub(super) const NEAR_AXIS_RATIO: f32 = 0.25;
/// Below this |vy| / |vx| ratio an elbow exits vertically and lands on a
/// side face; at or above it the elbow exits sideways and lands on top or
/// bottom.
pub(super) const DIAGONAL_RATIO: f32 = 0.75;

// ── Face spreading ──────────────────────────────────────────────────
/// Fraction of a face half-extent that shared anchors spread across,
/// keeping clear of the box corners.
const SPREAD_RATIO: f32 = 0.5;

const EPS: f32 = 1e-9;

/// Resolve (exit, entry) faces from the src→dst direction vector. Both
/// thresholds compare strictly, so an edge sitting exactly on a boundary
/// falls through to the steeper class. Coincident centers collapse to the
/// east-west default rather than failing.
pub(super) fn resolve_faces(vx: f32, vy: f32) -> (Face, Face) {
    if vx.abs() < EPS && vy.abs() < EPS {
        return (Face::Right, Face::Left);
    }
    if vy.abs() < vx.abs() * NEAR_AXIS_RATIO {
        if vx >= 0.0 {
            (Face::Right, Face::Left)
        } else {
            (Face::Left, Face::Right)
        }
    } else if vx.abs() < vy.abs() * NEAR_AXIS_RATIO {
        if vy >= 0.0 {
            (Face::Top, Face::Bottom)
        } else {
            (Face::Bottom, Face::Top)
        }
    } else if vy.abs() < vx.abs() * DIAGONAL_RATIO {
        let exit = if vy >= 0.0 { Face::Top } else { Face::Bottom };
        let entry = if vx >= 0.0 { Face::Left } else { Face::Right };
        (exit, entry)
    } else {
        let exit = if vx >= 0.0 { Face::Right } else { Face::Left };
        let entry = if vy >= 0.0 { Face::Bottom } else { Face::Top };
        (exit, entry)
    }
}

/// Connector style follows from the resolved face pair: faces on the same
/// axis draw straight, mixed axes bend once. A nonzero bow wins outright.
pub(super) fn connector_style(exit: Face, entry: Face, curve: f32) -> ConnectorStyle {
    if curve != 0.0 {
        ConnectorStyle::Arc(curve)
    } else if exit.is_horizontal() == entry.is_horizontal() {
        ConnectorStyle::Straight
    } else {
        ConnectorStyle::Elbow
    }
}

fn outward(point: (f32, f32), face: Face, distance: f32) -> (f32, f32) {
    match face {
        Face::Top => (point.0, point.1 + distance),
        Face::Bottom => (point.0, point.1 - distance),
        Face::Left => (point.0 - distance, point.1),
        Face::Right => (point.0 + distance, point.1),
    }
}

/// Route every edge: resolve faces (heuristic or override), spread anchors
/// on shared faces, then place labels. Assumes edges were validated against
/// the box map.
pub(super) fn route_edges(
    edges: &[EdgeSpec],
    boxes: &BTreeMap<String, NodeBox>,
    labels: Vec<Option<TextBlock>>,
    config: &FlowConfig,
) -> Vec<RouteLayout> {
    let tip = config.box_pad + 0.01;
    let mut routes = Vec::with_capacity(edges.len());

    for (edge, label) in edges.iter().zip(labels) {
        let src = &boxes[&edge.src];
        let dst = &boxes[&edge.dst];
        let vx = dst.cx - src.cx;
        let vy = dst.cy - src.cy;

        let (auto_exit, auto_entry) = resolve_faces(vx, vy);
        let mut exit_face = edge.exit.unwrap_or(auto_exit);
        let mut entry_face = edge.entry.unwrap_or(auto_entry);

        // Degenerate elbow: a side exit whose horizontal arm is shorter than
        // the rounded corner collapses to the vertical straight route.
        if edge.exit.is_none()
            && edge.entry.is_none()
            && exit_face.is_horizontal()
            && !entry_face.is_horizontal()
            && vx.abs() < config.corner_radius * 1.5
        {
            if vy >= 0.0 {
                exit_face = Face::Top;
                entry_face = Face::Bottom;
            } else {
                exit_face = Face::Bottom;
                entry_face = Face::Top;
            }
        }

        let start = src.face_point(exit_face);
        let end = outward(dst.face_point(entry_face), entry_face, tip);
        let style = connector_style(exit_face, entry_face, edge.curve);

        routes.push(RouteLayout {
            src: edge.src.clone(),
            dst: edge.dst.clone(),
            exit_face,
            entry_face,
            style,
            start,
            end,
            label,
            label_anchor: None,
            dashed: edge.dashed,
            color: edge.color.clone(),
        });
    }

    spread_shared_faces(&mut routes, boxes);

    for route in &mut routes {
        if route.label.is_some() {
            route.label_anchor = Some(label_anchor(route));
        }
    }

    routes
}

/// Redistribute anchors when several edges share a (node, face) pair, at
/// the exit end and the entry end independently. Anchors order along the
/// face by the remote node's position, ties keeping input order; curved
/// edges keep the face midpoint.
fn spread_shared_faces(routes: &mut [RouteLayout], boxes: &BTreeMap<String, NodeBox>) {
    let mut exit_groups: HashMap<(String, Face), Vec<usize>> = HashMap::new();
    let mut entry_groups: HashMap<(String, Face), Vec<usize>> = HashMap::new();
    for (idx, route) in routes.iter().enumerate() {
        if matches!(route.style, ConnectorStyle::Arc(_)) {
            continue;
        }
        exit_groups
            .entry((route.src.clone(), route.exit_face))
            .or_default()
            .push(idx);
        entry_groups
            .entry((route.dst.clone(), route.entry_face))
            .or_default()
            .push(idx);
    }

    for ((node_id, face), indices) in entry_groups {
        spread_group(routes, boxes, &node_id, face, indices, true);
    }
    for ((node_id, face), indices) in exit_groups {
        spread_group(routes, boxes, &node_id, face, indices, false);
    }
}

fn spread_group(
    routes: &mut [RouteLayout],
    boxes: &BTreeMap<String, NodeBox>,
    node_id: &str,
    face: Face,
    indices: Vec<usize>,
    is_entry: bool,
) {
    if indices.len() < 2 {
        return;
    }
    let node = &boxes[node_id];
    let count = indices.len();

    let mut keyed: Vec<(f32, usize)> = indices
        .iter()
        .map(|&idx| {
            let remote_id = if is_entry {
                &routes[idx].src
            } else {
                &routes[idx].dst
            };
            let remote = &boxes[remote_id.as_str()];
            let key = if face.is_horizontal() {
                remote.cy
            } else {
                remote.cx
            };
            (key, idx)
        })
        .collect();

    if face.is_horizontal() {
        // Side faces order top-to-bottom; stable sort keeps input order on ties.
        keyed.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        let span = node.half_height * SPREAD_RATIO;
        for (rank, &(_, idx)) in keyed.iter().enumerate() {
            let y = node.cy + span - 2.0 * span * rank as f32 / (count - 1) as f32;
            if is_entry {
                routes[idx].end.1 = y;
            } else {
                routes[idx].start.1 = y;
            }
        }
    } else {
        keyed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        let span = node.half_width * SPREAD_RATIO;
        for (rank, &(_, idx)) in keyed.iter().enumerate() {
            let x = node.cx - span + 2.0 * span * rank as f32 / (count - 1) as f32;
            if is_entry {
                routes[idx].end.0 = x;
            } else {
                routes[idx].start.0 = x;
            }
        }
    }
}

/// Where the edge label sits: straight edges at the run midpoint, elbows
/// at the midpoint of the longer arm, arcs at the curve's apex.
fn label_anchor(route: &RouteLayout) -> (f32, f32) {
    let (sx, sy) = route.start;
    let (ex, ey) = route.end;
    match route.style {
        ConnectorStyle::Straight => ((sx + ex) / 2.0, (sy + ey) / 2.0),
        ConnectorStyle::Elbow => {
            let (bx, by) = route.bend();
            let exit_arm = (bx - sx).hypot(by - sy);
            let entry_arm = (ex - bx).hypot(ey - by);
            if exit_arm >= entry_arm {
                ((sx + bx) / 2.0, (sy + by) / 2.0)
            } else {
                ((bx + ex) / 2.0, (by + ey) / 2.0)
            }
        }
        ConnectorStyle::Arc(curve) => {
            // Quadratic midpoint: B(0.5) = 0.25·P0 + 0.5·P1 + 0.25·P2
            let (cx, cy) = arc_control_point((sx, sy), (ex, ey), curve);
            (
                0.25 * sx + 0.5 * cx + 0.25 * ex,
                0.25 * sy + 0.5 * cy + 0.25 * ey,
            )
        }
    }
}

/// Control point of a curved connector: perpendicular offset from the chord
/// midpoint by `curve` × chord length. Positive bows left of travel.
pub(crate) fn arc_control_point(p0: (f32, f32), p2: (f32, f32), curve: f32) -> (f32, f32) {
    let chord = (p2.0 - p0.0, p2.1 - p0.1);
    let length = chord.0.hypot(chord.1);
    let perp = (-chord.1 / (length + EPS), chord.0 / (length + EPS));
    (
        (p0.0 + p2.0) / 2.0 + curve * length * perp.0,
        (p0.1 + p2.1) / 2.0 + curve * length * perp.1,
    )
}
