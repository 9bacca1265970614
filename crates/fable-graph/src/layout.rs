//! Breadth-first tree layout for the node-graph editor.
//!
//! Scenes are placed on a grid by a breadth-first walk from the start scene:
//!
//! - **column**: discovery depth (root is column 0, a scene discovered from a
//!   node in column `c` goes to column `c + 1`).
//! - **row**: the next free row of that column at first discovery. Row
//!   counters only grow.
//!
//! Pixel positions are `column * column_step` and `row * row_step`.
//!
//! Each edge leaves its source card's right side. With `n` declared outgoing
//! edges the i-th one anchors at `(i + 1) / (n + 1)` of the card height, so
//! choices fan out; a lone edge anchors at the midpoint. Edges enter the target
//! at its vertical midpoint. The curve is a cubic Bézier whose control points
//! sit halfway between the endpoints horizontally, each at its endpoint's
//! height.
//!
//! The layout is total: malformed graphs never fail, edges to unknown scenes
//! are omitted, and scenes the walk never reaches are listed as orphans.

use std::collections::{HashMap, VecDeque};

use fable_store::model::SceneEntry;
use serde::{Deserialize, Serialize};

/// Extra space around the drawn nodes.
const CANVAS_MARGIN: f64 = 60.0;
/// Canvas height reported when nothing is laid out.
const EMPTY_CANVAS_HEIGHT: f64 = 80.0;
/// Labels sit this far above the curve midpoint.
const LABEL_LIFT: f64 = 5.0;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Grid spacing and card size, in canvas units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Horizontal distance between columns.
    pub column_step: f64,
    /// Vertical distance between rows.
    pub row_step: f64,
    pub card_width: f64,
    pub card_height: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            column_step: 360.0,
            row_step: 150.0,
            card_width: 220.0,
            card_height: 110.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A cubic Bézier curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BezierCurve {
    pub start: Point,
    pub control1: Point,
    pub control2: Point,
    pub end: Point,
}

impl BezierCurve {
    /// An S-curve from `start` to `end` with both control points at the
    /// horizontal midpoint.
    pub fn s_curve(start: Point, end: Point) -> Self {
        let mid_x = (start.x + end.x) / 2.0;
        Self {
            start,
            control1: Point::new(mid_x, start.y),
            control2: Point::new(mid_x, end.y),
            end,
        }
    }

    /// SVG path data: `M sx sy C c1x c1y c2x c2y ex ey`.
    pub fn to_svg_path(&self) -> String {
        format!(
            "M {} {} C {} {} {} {} {} {}",
            self.start.x,
            self.start.y,
            self.control1.x,
            self.control1.y,
            self.control2.x,
            self.control2.y,
            self.end.x,
            self.end.y
        )
    }

    /// Midpoint of the straight line between the endpoints.
    pub fn chord_midpoint(&self) -> Point {
        Point::new(
            (self.start.x + self.end.x) / 2.0,
            (self.start.y + self.end.y) / 2.0,
        )
    }
}

/// A placed scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: String,
    pub file_path: String,
    pub column: usize,
    pub row: usize,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Linear,
    Choice,
}

/// A drawn connection between two placed scenes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeEdge {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
    /// Choice text; `None` for linear edges.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Fraction of the source card height where the edge leaves.
    pub from_anchor: f64,
    /// Fraction of the target card height where the edge arrives.
    pub to_anchor: f64,
    pub curve: BezierCurve,
    pub path: String,
    pub label_position: Point,
}

/// Nodes, edges and orphans for one character, plus the canvas extent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeLayout {
    /// Nodes in breadth-first visit order.
    pub nodes: Vec<TreeNode>,
    pub edges: Vec<TreeEdge>,
    /// Ids of scenes never reached from the start scene, in entry order.
    pub orphans: Vec<String>,
    pub canvas_width: f64,
    pub canvas_height: f64,
}

impl TreeLayout {
    pub fn node(&self, id: &str) -> Option<&TreeNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

struct Outgoing<'a> {
    target: &'a str,
    label: Option<&'a str>,
    kind: EdgeKind,
}

/// Declared outgoing edges of a scene.
///
/// A scene with a `next` draws only its linear edge, even if it also carries
/// choices. Unlinked choices are not edges.
fn outgoing(entry: &SceneEntry) -> Vec<Outgoing<'_>> {
    if let Some(next) = entry.scene.next_id() {
        return vec![Outgoing {
            target: next,
            label: None,
            kind: EdgeKind::Linear,
        }];
    }
    entry
        .scene
        .choices()
        .iter()
        .filter_map(|choice| {
            choice.target().map(|target| Outgoing {
                target,
                label: Some(choice.text.as_str()),
                kind: EdgeKind::Choice,
            })
        })
        .collect()
}

/// Lay out `entries` starting from `start`.
///
/// If `start` is empty or names no entry, every scene is an orphan and the
/// layout is empty.
pub fn compute_layout(entries: &[SceneEntry], start: &str, config: &LayoutConfig) -> TreeLayout {
    let by_id: HashMap<&str, &SceneEntry> = entries
        .iter()
        .map(|e| (e.scene.id.as_str(), e))
        .collect();

    if start.is_empty() || !by_id.contains_key(start) {
        return TreeLayout {
            orphans: entries.iter().map(|e| e.scene.id.clone()).collect(),
            canvas_width: 0.0,
            canvas_height: EMPTY_CANVAS_HEIGHT,
            ..TreeLayout::default()
        };
    }

    let cell = |column: usize, row: usize| {
        Point::new(
            column as f64 * config.column_step,
            row as f64 * config.row_step,
        )
    };

    let mut placed: HashMap<&str, (usize, usize)> = HashMap::new();
    let mut next_row: HashMap<usize, usize> = HashMap::new();
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    let mut queue = VecDeque::new();

    placed.insert(start, (0, 0));
    next_row.insert(0, 1);
    queue.push_back(start);

    while let Some(id) = queue.pop_front() {
        let Some(entry) = by_id.get(id).copied() else {
            continue;
        };
        let (column, row) = placed[id];
        let origin = cell(column, row);
        nodes.push(TreeNode {
            id: id.to_owned(),
            file_path: entry.file_path.clone(),
            column,
            row,
            x: origin.x,
            y: origin.y,
        });

        let out = outgoing(entry);
        let declared = out.len();
        for (i, edge) in out.into_iter().enumerate() {
            if !by_id.contains_key(edge.target) {
                continue;
            }
            let (to_column, to_row) = *placed.entry(edge.target).or_insert_with(|| {
                let column = column + 1;
                let slot = next_row.entry(column).or_insert(0);
                let row = *slot;
                *slot += 1;
                queue.push_back(edge.target);
                (column, row)
            });

            let from_anchor = if declared == 1 {
                0.5
            } else {
                (i + 1) as f64 / (declared + 1) as f64
            };
            let to_anchor = 0.5;
            let target = cell(to_column, to_row);
            let curve = BezierCurve::s_curve(
                Point::new(
                    origin.x + config.card_width,
                    origin.y + config.card_height * from_anchor,
                ),
                Point::new(target.x, target.y + config.card_height * to_anchor),
            );
            let mid = curve.chord_midpoint();

            edges.push(TreeEdge {
                from: id.to_owned(),
                to: edge.target.to_owned(),
                kind: edge.kind,
                label: edge.label.map(str::to_owned),
                from_anchor,
                to_anchor,
                path: curve.to_svg_path(),
                label_position: Point::new(mid.x, mid.y - LABEL_LIFT),
                curve,
            });
        }
    }

    let orphans = entries
        .iter()
        .filter(|e| !placed.contains_key(e.scene.id.as_str()))
        .map(|e| e.scene.id.clone())
        .collect();

    let max_x = nodes.iter().map(|n| n.x).fold(0.0, f64::max);
    let max_y = nodes.iter().map(|n| n.y).fold(0.0, f64::max);

    TreeLayout {
        nodes,
        edges,
        orphans,
        canvas_width: max_x + config.card_width + CANVAS_MARGIN,
        canvas_height: max_y + config.card_height + CANVAS_MARGIN,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
