//! Node entity for editable phylogenetic trees.

use indexmap::IndexMap;

/// Index of a node in a tree (arena).
///
/// Ids are assigned by the owning [Tree](crate::model::Tree) in construction
/// order and are never reused, so they double as stable external handles
/// (e.g. for associating UI elements with nodes).
pub type NodeId = usize;

// =#========================================================================#=
// NODE KIND
// =#========================================================================#=
/// Role of a node within the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeKind {
    /// Internal node with children.
    Stem,
    /// Ordinary leaf representing an observed taxon.
    #[default]
    Label,
    /// Synthetic leaf carrying a reconstructed ancestral sequence.
    ///
    /// Always attached as the second child of a stem, excluded from
    /// default serialization, and stripped/reinserted around structural
    /// edits.
    Ancestral,
}

// =#========================================================================#=
// TREE NODE
// =#========================================================================#=
/// A single vertex of an editable phylogenetic tree.
///
/// Nodes live in the arena of their owning [Tree](crate::model::Tree) and
/// reference each other by [NodeId]: `children` is the ordered owning
/// sequence (order is meaningful for rendering and ladderization),
/// `parent` the non-owning back-reference.
///
/// # Invariants
/// - `length` is non-negative; the root's is always 0
/// - a node with children has kind [NodeKind::Stem]; leaves have none
/// - `length_from_root` and `level` are caches maintained by the top-down
///   pass, the `*_count` fields by the counting pass; neither is valid
///   between a structural mutation and the next pass
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub(crate) id: NodeId,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) kind: NodeKind,
    /// Display/identifier string; may be empty for internal nodes.
    pub(crate) name: String,
    /// Branch length, i.e. distance to the parent.
    pub(crate) length: f64,
    /// Cumulative branch length from the root (top-down pass cache).
    pub(crate) length_from_root: f64,
    /// Distance in edges from the root (top-down pass cache).
    pub(crate) level: usize,
    pub(crate) hidden: bool,
    /// Topology changed since the last external re-alignment.
    pub(crate) altered: bool,
    pub(crate) selected: bool,
    /// Materialize this stem's ancestral leaf as visible on next restore.
    pub(crate) show_anc: bool,
    pub(crate) color: Option<String>,
    pub(crate) branch_color: Option<String>,
    /// Long-form metadata key used as the display label, if overridden.
    pub(crate) label_source: Option<String>,
    /// Marker radius override in pixels.
    pub(crate) marker_radius: Option<u32>,
    /// Raw NHX tag/value pairs preserved verbatim for round trips.
    pub(crate) nhx: IndexMap<String, String>,
    /// Long-form metadata (species, bootstrap, accession, ...).
    pub(crate) info: IndexMap<String, String>,
    // Counting pass caches
    pub(crate) leaf_count: usize,
    pub(crate) node_count: usize,
    pub(crate) visible_leaf_count: usize,
    pub(crate) visible_child_count: usize,
    pub(crate) mid_branch_position: f64,
}

impl TreeNode {
    pub(crate) fn new(id: NodeId, parent: Option<NodeId>, level: usize) -> Self {
        TreeNode {
            id,
            parent,
            children: Vec::new(),
            kind: NodeKind::default(),
            name: String::new(),
            length: 0.0,
            length_from_root: 0.0,
            level,
            hidden: false,
            altered: false,
            selected: false,
            show_anc: false,
            color: None,
            branch_color: None,
            label_source: None,
            marker_radius: None,
            nhx: IndexMap::new(),
            info: IndexMap::new(),
            leaf_count: 0,
            node_count: 0,
            visible_leaf_count: 0,
            visible_child_count: 0,
            mid_branch_position: 0.0,
        }
    }

    /// Returns the id of this node.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the id of the parent node, or `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Returns the ordered child ids.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Returns the kind of this node.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Returns `true` if this node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns the display name; may be empty.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the branch length (distance to the parent).
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Returns the cached cumulative branch length from the root.
    pub fn length_from_root(&self) -> f64 {
        self.length_from_root
    }

    /// Returns the cached distance in edges from the root.
    pub fn level(&self) -> usize {
        self.level
    }

    /// Returns `true` if this node is excluded from rendering and counts.
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Returns `true` if this node's topology changed since the last
    /// external re-alignment.
    pub fn is_altered(&self) -> bool {
        self.altered
    }

    /// Returns `true` if this node is marked selected.
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Returns the node display color, if any.
    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    /// Returns the branch display color, if any.
    pub fn branch_color(&self) -> Option<&str> {
        self.branch_color.as_deref()
    }

    /// Returns the marker radius override, if any.
    pub fn marker_radius(&self) -> Option<u32> {
        self.marker_radius
    }

    /// Returns the raw preserved NHX tag/value pairs.
    pub fn nhx(&self) -> &IndexMap<String, String> {
        &self.nhx
    }

    /// Returns the long-form metadata map.
    pub fn info(&self) -> &IndexMap<String, String> {
        &self.info
    }

    /// Returns the cached number of leaves below this node.
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Returns the cached number of internal nodes in this subtree
    /// (including the node itself if it is a stem).
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Returns the cached number of visible leaves below this node.
    pub fn visible_leaf_count(&self) -> usize {
        self.visible_leaf_count
    }

    /// Returns the cached number of direct children not marked hidden.
    pub fn visible_child_count(&self) -> usize {
        self.visible_child_count
    }

    /// Returns the cached vertical branch-point position, in rows.
    pub fn mid_branch_position(&self) -> f64 {
        self.mid_branch_position
    }

    /// Returns `true` if the duplication count in the long-form metadata
    /// is present and positive.
    pub fn is_duplication(&self) -> bool {
        self.info
            .get("duplications")
            .and_then(|v| v.trim().parse::<f64>().ok())
            .is_some_and(|v| v > 0.0)
    }
}
