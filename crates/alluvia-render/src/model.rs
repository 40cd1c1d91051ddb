use alluvia_core::Rgba;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn empty() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    pub fn include(&mut self, p: Point) {
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }

    pub fn is_empty(&self) -> bool {
        !(self.min_x <= self.max_x && self.min_y <= self.max_y)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Which way a stage faces: outer stages carry side rectangles and outward labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageSide {
    Left,
    Inner,
    Right,
}

impl StageSide {
    pub fn sign(self) -> f64 {
        match self {
            StageSide::Left => -1.0,
            StageSide::Inner => 0.0,
            StageSide::Right => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

impl TextAnchor {
    pub fn as_svg(self) -> &'static str {
        match self {
            TextAnchor::Start => "start",
            TextAnchor::Middle => "middle",
            TextAnchor::End => "end",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlluvialNodeLayout {
    pub stage: usize,
    pub id: String,
    /// Summed weight of the rows in this category.
    pub width: f64,
    pub x: f64,
    pub y0: f64,
    pub y1: f64,
    pub side: StageSide,
    /// Bar drawn on inner stages; outer stages use per-vein side rectangles instead.
    pub bar: Option<Vec<Point>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlluvialVeinLayout {
    pub index: usize,
    /// Stage of the source category; the target is in `stage + 1`.
    pub stage: usize,
    pub source: String,
    pub target: String,
    /// Category of the colour stage this vein is tinted by.
    pub color_key: String,
    pub width: f64,
    pub color: Rgba,
    /// Upper trace followed by the reversed lower trace.
    pub polygon: Vec<Point>,
    pub source_rect: Option<Vec<Point>>,
    pub target_rect: Option<Vec<Point>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelKind {
    Node,
    Stage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlluvialLabelLayout {
    pub kind: LabelKind,
    pub x: f64,
    pub y: f64,
    pub text: String,
    pub anchor: TextAnchor,
    /// Counter-clockwise rotation in degrees, around the anchor point.
    pub rotation: f64,
    pub font_size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlluvialDiagramLayout {
    pub stage_count: usize,
    pub stage_x: Vec<f64>,
    pub h_gap: f64,
    pub v_gap: f64,
    /// Height of the tallest stage; every stage is centred against it.
    pub max_stage_height: f64,
    pub nodes: Vec<AlluvialNodeLayout>,
    pub veins: Vec<AlluvialVeinLayout>,
    pub labels: Vec<AlluvialLabelLayout>,
    /// Extent of the drawn shapes (labels excluded), in data units with y pointing up.
    pub data_bounds: Bounds,
}

impl AlluvialDiagramLayout {
    pub fn stage_nodes(&self, stage: usize) -> impl Iterator<Item = &AlluvialNodeLayout> {
        self.nodes.iter().filter(move |n| n.stage == stage)
    }

    pub fn node(&self, stage: usize, id: &str) -> Option<&AlluvialNodeLayout> {
        self.nodes.iter().find(|n| n.stage == stage && n.id == id)
    }
}
