use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One of the four cardinal sides of a node box. The only valid attachment
/// points for edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Face {
    Top,
    Bottom,
    Left,
    Right,
}

impl Face {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "top" => Some(Self::Top),
            "bottom" => Some(Self::Bottom),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Top => Self::Bottom,
            Self::Bottom => Self::Top,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Left/right faces lie on the horizontal axis.
    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }
}

#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub label: String,
    pub cx: f32,
    pub cy: f32,
    pub fill: String,
    pub text_color: String,
}

#[derive(Debug, Clone)]
pub struct EdgeSpec {
    pub src: String,
    pub dst: String,
    pub label: Option<String>,
    pub dashed: bool,
    /// Bow of an `arc` connector: positive bows left of the travel
    /// direction, negative right, zero for straight/elbow routing.
    pub curve: f32,
    pub color: Option<String>,
    pub exit: Option<Face>,
    pub entry: Option<Face>,
}

impl EdgeSpec {
    pub fn new(src: impl Into<String>, dst: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
            label: None,
            dashed: false,
            curve: 0.0,
            color: None,
            exit: None,
            entry: None,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn dashed(mut self) -> Self {
        self.dashed = true;
        self
    }

    pub fn curve(mut self, curve: f32) -> Self {
        self.curve = curve;
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn exit(mut self, face: Face) -> Self {
        self.exit = Some(face);
        self
    }

    pub fn entry(mut self, face: Face) -> Self {
        self.entry = Some(face);
        self
    }
}

/// Caller-assembled diagram: a node map plus an ordered edge list. Edge
/// order is load-bearing — it breaks ties when anchors spread along a
/// shared face.
#[derive(Debug, Clone, Default)]
pub struct Diagram {
    pub nodes: BTreeMap<String, NodeSpec>,
    pub edges: Vec<EdgeSpec>,
}

impl Diagram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(
        &mut self,
        id: &str,
        label: impl Into<String>,
        cx: f32,
        cy: f32,
        fill: impl Into<String>,
        text_color: impl Into<String>,
    ) -> &mut Self {
        self.nodes.insert(
            id.to_string(),
            NodeSpec {
                label: label.into(),
                cx,
                cy,
                fill: fill.into(),
                text_color: text_color.into(),
            },
        );
        self
    }

    pub fn edge(&mut self, edge: EdgeSpec) -> &mut Self {
        self.edges.push(edge);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_opposites_pair_up() {
        for face in [Face::Top, Face::Bottom, Face::Left, Face::Right] {
            assert_eq!(face.opposite().opposite(), face);
        }
        assert_eq!(Face::Left.opposite(), Face::Right);
        assert_eq!(Face::Top.opposite(), Face::Bottom);
    }

    #[test]
    fn face_from_token_round_trips() {
        for token in ["top", "bottom", "left", "right"] {
            let face = Face::from_token(token).unwrap();
            assert!(Face::from_token(token) == Some(face));
        }
        assert_eq!(Face::from_token("north"), None);
    }

    #[test]
    fn diagram_builder_preserves_edge_order() {
        let mut diagram = Diagram::new();
        diagram.node("a", "A", 0.0, 0.0, "#fff", "#000");
        diagram.node("b", "B", 4.0, 0.0, "#fff", "#000");
        diagram.edge(EdgeSpec::new("a", "b").label("first"));
        diagram.edge(EdgeSpec::new("b", "a").label("second"));
        assert_eq!(diagram.edges[0].label.as_deref(), Some("first"));
        assert_eq!(diagram.edges[1].label.as_deref(), Some("second"));
    }
}
