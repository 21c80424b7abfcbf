use std::collections::BTreeMap;

use crate::ir::Face;

/// A measured multi-line label. `width`/`height` are pixel extents.
#[derive(Debug, Clone)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub width: f32,
    pub height: f32,
}

/// A node's padded bounding box in diagram data units, centered on the
/// (possibly auto-spaced) node center.
#[derive(Debug, Clone)]
pub struct NodeBox {
    pub id: String,
    pub cx: f32,
    pub cy: f32,
    pub half_width: f32,
    pub half_height: f32,
    pub label: TextBlock,
    pub fill: String,
    pub text_color: String,
}

impl NodeBox {
    pub fn x0(&self) -> f32 {
        self.cx - self.half_width
    }

    pub fn x1(&self) -> f32 {
        self.cx + self.half_width
    }

    pub fn y0(&self) -> f32 {
        self.cy - self.half_height
    }

    pub fn y1(&self) -> f32 {
        self.cy + self.half_height
    }

    /// Midpoint of a face — the default anchor before spreading.
    pub fn face_point(&self, face: Face) -> (f32, f32) {
        match face {
            Face::Top => (self.cx, self.y1()),
            Face::Bottom => (self.cx, self.y0()),
            Face::Left => (self.x0(), self.cy),
            Face::Right => (self.x1(), self.cy),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectorStyle {
    Straight,
    Elbow,
    /// Quadratic arc bowing by the given fraction of the chord length.
    Arc(f32),
}

/// Routing decision for one edge, derived fresh each layout pass: resolved
/// faces, connector style, and the concrete anchor points after spreading.
#[derive(Debug, Clone)]
pub struct RouteLayout {
    pub src: String,
    pub dst: String,
    pub exit_face: Face,
    pub entry_face: Face,
    pub style: ConnectorStyle,
    /// Anchor on the exit face (data units).
    pub start: (f32, f32),
    /// Anchor one arrow clearance outside the entry face (data units).
    pub end: (f32, f32),
    pub label: Option<TextBlock>,
    pub label_anchor: Option<(f32, f32)>,
    pub dashed: bool,
    pub color: Option<String>,
}

impl RouteLayout {
    /// Bend point of an elbow connector: the exit arm runs to it, the entry
    /// arm leaves it.
    pub fn bend(&self) -> (f32, f32) {
        if self.exit_face.is_horizontal() {
            (self.end.0, self.start.1)
        } else {
            (self.start.0, self.end.1)
        }
    }
}

#[derive(Debug, Clone)]
pub struct Layout {
    pub boxes: BTreeMap<String, NodeBox>,
    pub routes: Vec<RouteLayout>,
    pub title: Option<String>,
    /// Axis limits in data units.
    pub x_range: (f32, f32),
    pub y_range: (f32, f32),
    /// Figure size in pixels.
    pub width: f32,
    pub height: f32,
    /// Vertical auto-spacing factor that was applied (1.0 = untouched).
    pub autoscale: f32,
}
