//! 2D layout computation for an external renderer.
//!
//! [LayoutEngine] assigns per-node canvas coordinates and the flags a
//! renderer needs to pick marker appearance, without performing any
//! drawing itself. Horizontal positions scale cumulative branch length
//! into the available width; vertical positions give each visible leaf a
//! sequential row and place every stem's branch point at its midbranch
//! position. If any leaf would overrun the available width, the scale is
//! reduced once and the whole layout redone (a one-shot
//! rescale-and-retry, not an iterative solver).

use log::debug;

use crate::model::{NodeId, NodeKind, SequenceStore, Tree};

/// Geometry options for a layout run.
#[derive(Debug, Clone)]
pub struct LayoutOptions {
    /// Available canvas width in pixels.
    pub width: f64,
    /// Height of one leaf row in pixels.
    pub row_height: f64,
    /// Lower bound on the row height.
    pub min_row_height: f64,
    /// Padding on the left edge of the canvas.
    pub padding_left: f64,
    /// Padding on the right edge of the canvas.
    pub padding_right: f64,
    /// Treat every branch as unit length (topology-only view).
    pub dendrogram: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        LayoutOptions {
            width: 600.0,
            row_height: 12.0,
            min_row_height: 3.0,
            padding_left: 5.0,
            padding_right: 5.0,
            dendrogram: false,
        }
    }
}

/// Marker hints for a stem's branching point.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerFlags {
    /// The stem carries an ancestral-sequence leaf.
    pub ancestral_child: bool,
    /// The first child branch is hidden.
    pub first_hidden: bool,
    /// The last child branch is hidden.
    pub last_hidden: bool,
    /// A hidden branch is a whole subtree rather than a single leaf.
    pub hidden_subtree: bool,
}

/// Position and renderer flags for one laid-out node.
#[derive(Debug, Clone)]
pub struct NodePlacement {
    pub id: NodeId,
    pub kind: NodeKind,
    /// End of the branch line (the node's own position).
    pub x: f64,
    pub y: f64,
    /// Start of the branch line (the parent's position).
    pub branch_start_x: f64,
    /// Vertical extent of the child connector, for stems spanning more
    /// than one row.
    pub vertical_span: Option<(f64, f64)>,
    pub hidden: bool,
    pub altered: bool,
    pub duplication: bool,
    pub color: Option<String>,
    pub branch_color: Option<String>,
    /// Marker radius override, if any.
    pub radius: Option<u32>,
    /// Display label, resolved through the node's label source.
    pub label: String,
    /// Branching-point hints; `None` for leaves.
    pub marker: Option<MarkerFlags>,
}

/// Result of a layout run.
#[derive(Debug, Clone)]
pub struct TreeLayout {
    /// Placements in completion order (children before their stem).
    pub nodes: Vec<NodePlacement>,
    /// Canvas width in pixels.
    pub width: f64,
    /// Canvas height in pixels (visible rows times row height).
    pub height: f64,
    /// Horizontal scale applied to branch lengths, after any rescale.
    pub scale_x: f64,
    /// Names of the visible leaves in drawing order.
    pub visible_rows: Vec<String>,
}

/// Running state of one layout pass.
struct Pass {
    first_branch: bool,
    absolute_y: f64,
    overflow_x: f64,
    nodes: Vec<NodePlacement>,
    rows: Vec<String>,
}

impl Pass {
    fn new(row_height: f64) -> Self {
        Pass {
            first_branch: true,
            absolute_y: row_height * 0.6,
            overflow_x: 0.0,
            nodes: Vec::new(),
            rows: Vec::new(),
        }
    }
}

// =#========================================================================#=
// LAYOUT ENGINE
// =#========================================================================#=
/// Computes per-node coordinates and renderer flags from a [Tree].
///
/// # Example
/// ```
/// use phyledit::layout::{LayoutEngine, LayoutOptions};
/// use phyledit::model::SequenceStore;
/// use phyledit::newick::parse_str;
///
/// let mut tree = parse_str("(A:1,(B:2,C:3)D:4)Root;");
/// let sequences = SequenceStore::new();
/// let layout = LayoutEngine::new(LayoutOptions::default())
///     .layout(&mut tree, &sequences)
///     .unwrap();
/// assert_eq!(layout.visible_rows, vec!["A", "B", "C"]);
/// ```
pub struct LayoutEngine {
    options: LayoutOptions,
}

impl LayoutEngine {
    /// Creates an engine with the given options.
    pub fn new(options: LayoutOptions) -> Self {
        LayoutEngine { options }
    }

    /// Computes the layout.
    ///
    /// Ancestral leaves are materialized (from `sequences`) and the
    /// counting pass rerun before coordinates are assigned, so the tree
    /// may come straight from a parser or an editor operation.
    ///
    /// # Returns
    /// `None` if the tree has no root or no visible leaves to draw.
    pub fn layout(&self, tree: &mut Tree, sequences: &SequenceStore) -> Option<TreeLayout> {
        if !tree.is_root_set() {
            return None;
        }
        tree.restore_ancestral(sequences);
        tree.recount();
        tree.process_nodes();

        let visible_leaves = tree.root().visible_leaf_count();
        if visible_leaves == 0 {
            return None;
        }

        let row_height = self.options.row_height.max(self.options.min_row_height);
        let max_length = if self.options.dendrogram {
            tree.max_level() as f64
        } else {
            tree.max_length_from_root()
        };
        let x_limit = self.options.width - self.options.padding_right;
        let usable = self.options.width - self.options.padding_left - self.options.padding_right;
        let mut scale_x = usable / max_length;
        if !scale_x.is_finite() {
            scale_x = 0.0;
        }

        let root = tree.root_id();
        let mut pass = Pass::new(row_height);
        self.place(tree, root, self.options.padding_left, scale_x, x_limit, row_height, &mut pass);

        if pass.overflow_x > 0.0 {
            scale_x *= (x_limit - self.options.padding_left) / pass.overflow_x;
            debug!("tree overflows canvas, rescaling to {scale_x}");
            pass = Pass::new(row_height);
            self.place(tree, root, self.options.padding_left, scale_x, x_limit, row_height, &mut pass);
        }

        Some(TreeLayout {
            nodes: pass.nodes,
            width: self.options.width,
            height: visible_leaves as f64 * row_height,
            scale_x,
            visible_rows: pass.rows,
        })
    }

    /// Assigns coordinates for `id` and its visible descendants.
    /// Returns the node's y position.
    #[allow(clippy::too_many_arguments)]
    fn place(
        &self,
        tree: &mut Tree,
        id: NodeId,
        position_x: f64,
        scale_x: f64,
        x_limit: f64,
        row_height: f64,
        pass: &mut Pass,
    ) -> f64 {
        // A node without visible children occupies the next row slot;
        // the very first one stays on the baseline.
        if !pass.first_branch && tree[id].visible_child_count() == 0 && !tree[id].is_hidden() {
            pass.absolute_y += row_height;
        }

        // Unit lengths in dendrogram mode; the root keeps its zero branch.
        let length = if self.options.dendrogram {
            if tree[id].parent().is_some() { 1.0 } else { 0.0 }
        } else {
            tree[id].length()
        };
        let y;
        if !tree[id].is_leaf() {
            if tree[id].is_hidden() {
                return pass.absolute_y;
            }
            let x1 = position_x;
            let mut x2 = position_x + scale_x * length;
            if x2 - x1 < 2.0 {
                x2 = x1 + 2.0;
            }
            y = pass.absolute_y + tree.midbranch_position(id, pass.first_branch) * row_height;

            let mut child_ys = Vec::new();
            if tree[id].visible_child_count() > 0 {
                for child in tree[id].children().to_vec() {
                    if tree[child].is_hidden() {
                        continue;
                    }
                    child_ys.push(self.place(tree, child, x2, scale_x, x_limit, row_height, pass));
                }
            }
            child_ys.push(y);
            let vertical_span = (tree[id].visible_leaf_count() > 1).then(|| {
                let lo = child_ys.iter().copied().fold(f64::INFINITY, f64::min);
                let hi = child_ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                (lo, hi)
            });

            let node = &tree[id];
            let children = node.children();
            let first_hidden = children.first().is_some_and(|&c| tree[c].is_hidden());
            let last_hidden = children.last().is_some_and(|&c| tree[c].is_hidden());
            let hidden_subtree = (first_hidden
                && children.first().is_some_and(|&c| tree[c].kind() != NodeKind::Label))
                || (last_hidden
                    && children.last().is_some_and(|&c| tree[c].kind() != NodeKind::Label));
            let marker = MarkerFlags {
                ancestral_child: children
                    .get(1)
                    .is_some_and(|&c| tree[c].kind() == NodeKind::Ancestral),
                first_hidden,
                last_hidden,
                hidden_subtree,
            };
            let label = node
                .label_source
                .as_deref()
                .and_then(|key| node.info().get(key))
                .cloned()
                .unwrap_or_default();
            pass.nodes.push(NodePlacement {
                id,
                kind: node.kind(),
                x: x2,
                y,
                branch_start_x: x1,
                vertical_span,
                hidden: node.is_hidden(),
                altered: node.is_altered(),
                duplication: node.is_duplication(),
                color: node.color.clone(),
                branch_color: node.branch_color.clone(),
                radius: node.marker_radius(),
                label,
                marker: Some(marker),
            });
        } else {
            if tree[id].is_hidden() {
                return pass.absolute_y;
            }
            let x1 = position_x;
            let mut x2 = position_x + scale_x * length;
            if x2 - x1 < 0.5 {
                x2 = x1 + 0.5;
            }
            if x2 > x_limit && x2 > pass.overflow_x {
                pass.overflow_x = x2;
            }
            y = pass.absolute_y;

            let node = &tree[id];
            if !node.name().is_empty() {
                pass.rows.push(node.name().to_string());
            }
            let label = node
                .label_source
                .as_deref()
                .and_then(|key| node.info().get(key))
                .cloned()
                .unwrap_or_else(|| node.name().to_string());
            pass.nodes.push(NodePlacement {
                id,
                kind: node.kind(),
                x: x2,
                y,
                branch_start_x: x1,
                vertical_span: None,
                hidden: node.is_hidden(),
                altered: node.is_altered(),
                duplication: node.is_duplication(),
                color: node.color.clone(),
                branch_color: node.branch_color.clone(),
                radius: node.marker_radius(),
                label,
                marker: None,
            });
        }
        if pass.first_branch {
            pass.first_branch = false;
        }
        y
    }
}
