use std::collections::BTreeMap;

use crate::ir::{EdgeSpec, Face};

use super::NodeBox;
use super::routing::{DIAGONAL_RATIO, NEAR_AXIS_RATIO};

const TIER_KEY_SCALE: f32 = 1e6;
const EPS: f32 = 1e-9;

/// Nodes whose y-centers agree to within the tier tolerance share a tier.
pub(super) fn tier_key(y: f32) -> i64 {
    (y * TIER_KEY_SCALE).round() as i64
}

/// Detect vertical crowding between adjacent tiers and stretch all
/// y-centers by a single uniform factor about the lowest tier. The factor
/// is capped at `max_autoscale`; any remaining shortfall is accepted.
/// Returns the applied factor (1.0 = no change). Never fails, and a second
/// pass after a successful (uncapped) one is a no-op.
pub(super) fn autospace(
    boxes: &mut BTreeMap<String, NodeBox>,
    edges: &[EdgeSpec],
    edge_label_half_heights: &[Option<f32>],
    label_clearance: f32,
    max_autoscale: Option<f32>,
) -> f32 {
    let mut tiers: BTreeMap<i64, Vec<String>> = BTreeMap::new();
    for (id, node) in boxes.iter() {
        tiers.entry(tier_key(node.cy)).or_default().push(id.clone());
    }
    if tiers.len() < 2 {
        return 1.0;
    }

    let tier_list: Vec<(i64, f32, f32)> = tiers
        .iter()
        .map(|(key, ids)| {
            let y = boxes[&ids[0]].cy;
            let max_hh = ids
                .iter()
                .map(|id| boxes[id].half_height)
                .fold(0.0, f32::max);
            (*key, y, max_hh)
        })
        .collect();

    let mut factor = 1.0f32;
    for pair in tier_list.windows(2) {
        let (lo_key, lo_y, lo_hh) = pair[0];
        let (hi_key, hi_y, hi_hh) = pair[1];
        let mut required = lo_hh + hi_hh + label_clearance;

        for (idx, edge) in edges.iter().enumerate() {
            let Some(label_hh) = edge_label_half_heights.get(idx).copied().flatten() else {
                continue;
            };
            let (Some(src), Some(dst)) = (boxes.get(&edge.src), boxes.get(&edge.dst)) else {
                continue;
            };
            let src_key = tier_key(src.cy);
            let dst_key = tier_key(dst.cy);
            let crosses = (src_key == lo_key && dst_key == hi_key)
                || (src_key == hi_key && dst_key == lo_key);
            if !crosses {
                continue;
            }

            let vx = dst.cx - src.cx;
            let vy = dst.cy - src.cy;
            let no_overrides = edge.exit.is_none() && edge.entry.is_none();
            let near_vertical =
                no_overrides && vy.abs() > EPS && vx.abs() < vy.abs() * NEAR_AXIS_RATIO;
            let primarily_vertical = (matches!(edge.exit, Some(Face::Top | Face::Bottom))
                && matches!(edge.entry, Some(Face::Left | Face::Right)))
                || (no_overrides
                    && !near_vertical
                    && vx.abs() > EPS
                    && vy.abs() >= vx.abs() * DIAGONAL_RATIO);
            if !(near_vertical || primarily_vertical) {
                continue;
            }

            let (upper, lower) = if src_key == hi_key { (src, dst) } else { (dst, src) };
            // A label riding the vertical run needs room for itself plus the
            // boxes it threads between; elbow entries clear the lower box twice.
            let edge_required = if near_vertical {
                upper.half_height + lower.half_height + 2.0 * label_hh + 0.6
            } else {
                upper.half_height + 2.0 * lower.half_height + 2.0 * label_hh + 0.2
            };
            required = required.max(edge_required);
        }

        let gap = hi_y - lo_y;
        if gap > EPS {
            factor = factor.max(required / gap);
        }
    }

    if let Some(cap) = max_autoscale {
        factor = factor.min(cap.max(1.0));
    }
    if factor <= 1.0 + 1e-6 {
        return 1.0;
    }

    let y_min = tier_list[0].1;
    for node in boxes.values_mut() {
        node.cy = y_min + (node.cy - y_min) * factor;
    }
    factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::TextBlock;

    fn make_box(id: &str, cx: f32, cy: f32, hh: f32) -> (String, NodeBox) {
        (
            id.to_string(),
            NodeBox {
                id: id.to_string(),
                cx,
                cy,
                half_width: 1.0,
                half_height: hh,
                label: TextBlock {
                    lines: vec![id.to_string()],
                    width: 10.0,
                    height: 10.0,
                },
                fill: "#fff".to_string(),
                text_color: "#000".to_string(),
            },
        )
    }

    fn tier_boxes(gap: f32, hh: f32) -> BTreeMap<String, NodeBox> {
        BTreeMap::from([
            make_box("a", 0.0, 0.0, hh),
            make_box("b", 4.0, 0.0, hh),
            make_box("c", 0.0, gap, hh),
        ])
    }

    #[test]
    fn single_tier_is_untouched() {
        let mut boxes = BTreeMap::from([make_box("a", 0.0, 0.0, 0.3), make_box("b", 4.0, 0.0, 0.3)]);
        let factor = autospace(&mut boxes, &[], &[], 0.5, Some(1.5));
        assert_eq!(factor, 1.0);
        assert_eq!(boxes["a"].cy, 0.0);
    }

    #[test]
    fn roomy_tiers_are_untouched() {
        let mut boxes = tier_boxes(10.0, 0.3);
        let factor = autospace(&mut boxes, &[], &[], 0.5, Some(1.5));
        assert_eq!(factor, 1.0);
        assert_eq!(boxes["c"].cy, 10.0);
    }

    #[test]
    fn crowded_tiers_stretch_uniformly() {
        let mut boxes = tier_boxes(1.0, 0.4);
        let factor = autospace(&mut boxes, &[], &[], 0.5, Some(2.0));
        // required = 0.4 + 0.4 + 0.5 = 1.3 over a gap of 1.0
        assert!((factor - 1.3).abs() < 1e-4);
        assert!((boxes["c"].cy - 1.3).abs() < 1e-4);
        assert_eq!(boxes["a"].cy, 0.0);
        assert_eq!(boxes["a"].cx, 0.0);
        assert_eq!(boxes["b"].cx, 4.0);
    }

    #[test]
    fn factor_never_exceeds_cap() {
        let mut boxes = tier_boxes(0.1, 0.8);
        let factor = autospace(&mut boxes, &[], &[], 0.5, Some(1.5));
        assert!((factor - 1.5).abs() < 1e-6);
    }

    #[test]
    fn uncapped_when_disabled() {
        let mut boxes = tier_boxes(0.5, 0.4);
        let factor = autospace(&mut boxes, &[], &[], 0.5, None);
        assert!(factor > 1.5);
    }

    #[test]
    fn second_pass_is_identity() {
        let mut boxes = tier_boxes(1.0, 0.4);
        let first = autospace(&mut boxes, &[], &[], 0.5, None);
        assert!(first > 1.0);
        let snapshot: Vec<f32> = boxes.values().map(|b| b.cy).collect();
        let second = autospace(&mut boxes, &[], &[], 0.5, None);
        assert_eq!(second, 1.0);
        let after: Vec<f32> = boxes.values().map(|b| b.cy).collect();
        assert_eq!(snapshot, after);
    }

    #[test]
    fn labeled_vertical_edge_boosts_requirement() {
        let edges = vec![EdgeSpec::new("a", "c").label("between")];
        let label_hh = vec![Some(0.2)];

        let mut plain = tier_boxes(2.0, 0.4);
        let base = autospace(&mut plain, &[], &[], 0.5, None);

        let mut boosted = tier_boxes(2.0, 0.4);
        let with_label = autospace(&mut boosted, &edges, &label_hh, 0.5, None);
        // near-vertical: 0.4 + 0.4 + 2*0.2 + 0.6 = 1.8 over gap 2.0 — still
        // roomy, so widen the label until it actually binds
        let tall_label = vec![Some(0.8)];
        let mut bound = tier_boxes(2.0, 0.4);
        let with_tall = autospace(&mut bound, &edges, &tall_label, 0.5, None);

        assert_eq!(base, 1.0);
        assert_eq!(with_label, 1.0);
        assert!((with_tall - (0.4 + 0.4 + 1.6 + 0.6) / 2.0).abs() < 1e-4);
    }
}
