//! Tree module for editable phylogenetic tree representation.
//!
//! Provides [Tree], the owning arena over [TreeNode] with the passes that
//! keep derived state consistent:
//! - the counting pass ([`Tree::recount`]) maintaining leaf/visibility
//!   aggregates bottom-up,
//! - the top-down pass ([`Tree::process_nodes`]) maintaining depth and
//!   cumulative branch length caches,
//! - visibility toggling with the last-visible-sibling redirect,
//! - ancestral-leaf strip/restore around structural edits,
//! - the iterative postorder flattening consumed by the writer.

use crate::model::round_float;
use crate::model::node::{NodeId, NodeKind, TreeNode};
use crate::model::sequences::SequenceStore;

/// *During construction only*, index for unset root.
const NO_ROOT_SET_INDEX: NodeId = usize::MAX;

// =#========================================================================#=
// TREE
// =#========================================================================#=
/// An editable, possibly multifurcating phylogenetic tree represented
/// using the arena pattern on [TreeNode].
///
/// Nodes are stored in a contiguous vector and referenced by [NodeId].
/// Each node owns its ordered `children` id sequence and carries a
/// non-owning `parent` back-reference, so edit operations rewire ids
/// instead of juggling references.
///
/// # Structure
/// - Ids are assigned in construction order and never reused; detaching a
///   subtree leaves its slots in the arena but unreachable from the root.
/// - Reachability from the root defines the tree; arena slots of removed
///   subtrees are ignored by every traversal.
/// - Branch lengths are non-negative; the root's is always 0.
///
/// # Consistency
/// After any structural mutation, [`Tree::recount`] and
/// [`Tree::process_nodes`] must run before aggregate or depth/length
/// fields are read. The editing operations in
/// [TreeEditor](crate::edit::TreeEditor) take care of this.
#[derive(Debug, Clone)]
pub struct Tree {
    /// Nodes of this tree (arena pattern)
    nodes: Vec<TreeNode>,

    /// Index of the root of this tree
    root: NodeId,

    /// Some node changed topology since the last external re-alignment
    altered: bool,

    /// Maximum node level seen by the last top-down pass
    max_level: usize,

    /// Maximum root-to-node length seen by the last top-down pass
    max_length_from_root: f64,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Construction, Getters / Accessors (pub)
// ============================================================================
impl Tree {
    /// Creates a new, empty tree without a root.
    pub fn new() -> Self {
        Tree {
            nodes: Vec::new(),
            root: NO_ROOT_SET_INDEX,
            altered: false,
            max_level: 0,
            max_length_from_root: 0.0,
        }
    }

    /// Adds a new node to the arena and returns its id.
    ///
    /// The node's `parent` back-reference and level are initialized from
    /// `parent`; the caller is responsible for inserting the id into the
    /// parent's `children` sequence.
    pub fn new_node(&mut self, parent: Option<NodeId>) -> NodeId {
        let id = self.nodes.len();
        let level = parent.map_or(0, |p| self.nodes[p].level + 1);
        self.nodes.push(TreeNode::new(id, parent, level));
        id
    }

    /// Returns whether the root of the tree has been set.
    pub fn is_root_set(&self) -> bool {
        self.root != NO_ROOT_SET_INDEX
    }

    /// Returns the id of the root.
    ///
    /// # Panics
    /// Panics if the root hasn't been set yet.
    pub fn root_id(&self) -> NodeId {
        assert!(self.is_root_set(), "tree has no root");
        self.root
    }

    /// Returns a reference to the root node.
    ///
    /// # Panics
    /// Panics if the root hasn't been set yet.
    pub fn root(&self) -> &TreeNode {
        &self.nodes[self.root_id()]
    }

    pub(crate) fn set_root(&mut self, id: NodeId) {
        self.root = id;
    }

    /// Returns a reference to the node at the given id, if the id is in
    /// bounds and the node is still attached to the tree.
    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        if id >= self.nodes.len() || !self.is_root_set() {
            return None;
        }
        let mut n = id;
        while let Some(p) = self.nodes[n].parent {
            n = p;
        }
        (n == self.root).then(|| &self.nodes[id])
    }

    /// Returns the id of the first node with the given name, searching
    /// from the root in preorder.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        if !self.is_root_set() {
            return None;
        }
        let mut stack = vec![self.root];
        while let Some(n) = stack.pop() {
            if self.nodes[n].name == name {
                return Some(n);
            }
            stack.extend(self.nodes[n].children.iter().rev());
        }
        None
    }

    /// Returns `true` if some node changed topology since the last
    /// external re-alignment.
    pub fn is_altered(&self) -> bool {
        self.altered
    }

    pub(crate) fn set_altered(&mut self, altered: bool) {
        self.altered = altered;
    }

    /// Returns the maximum level seen by the last top-down pass.
    pub fn max_level(&self) -> usize {
        self.max_level
    }

    /// Returns the maximum root-to-node length seen by the last top-down
    /// pass.
    pub fn max_length_from_root(&self) -> f64 {
        self.max_length_from_root
    }

    /// Returns the number of arena slots, including detached ones.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the sum of all branch lengths reachable from the root.
    pub fn total_branch_length(&self) -> f64 {
        if !self.is_root_set() {
            return 0.0;
        }
        self.flatten(self.root)
            .iter()
            .map(|&id| self.nodes[id].length)
            .sum()
    }
}

impl std::ops::Index<NodeId> for Tree {
    type Output = TreeNode;

    fn index(&self, id: NodeId) -> &Self::Output {
        &self.nodes[id]
    }
}

impl std::ops::IndexMut<NodeId> for Tree {
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        &mut self.nodes[id]
    }
}

// ============================================================================
// Counting pass
// ============================================================================
impl Tree {
    /// Reruns the counting pass from the root.
    ///
    /// Recomputes `leaf_count`, `node_count`, `visible_leaf_count` and
    /// `visible_child_count` for every reachable node. A leaf below a
    /// hidden branch contributes to `leaf_count` but not to
    /// `visible_leaf_count`; a hidden ancestral leaf contributes to
    /// neither (it represents sequence, not a taxon).
    pub fn recount(&mut self) {
        if self.is_root_set() {
            self.count_subtree(self.root, false);
        }
    }

    fn count_subtree(&mut self, id: NodeId, hidden_branch: bool) {
        let kids = self.nodes[id].children.clone();
        let mut leaf_count = 0;
        let mut visible_leaf_count = 0;
        let mut visible_child_count = 0;
        let mut node_count = usize::from(!kids.is_empty());

        for &child in &kids {
            let child_hidden = self.nodes[child].hidden;
            if !child_hidden {
                visible_child_count += 1;
            }
            if !self.nodes[child].children.is_empty() {
                self.count_subtree(child, hidden_branch || child_hidden);
                let counted = &self.nodes[child];
                node_count += counted.node_count;
                leaf_count += counted.leaf_count;
                if !hidden_branch {
                    visible_leaf_count += counted.visible_leaf_count;
                }
            } else if child_hidden {
                if self.nodes[child].kind != NodeKind::Ancestral {
                    leaf_count += 1;
                }
            } else {
                leaf_count += 1;
                if !hidden_branch {
                    visible_leaf_count += 1;
                }
            }
        }

        let node = &mut self.nodes[id];
        node.leaf_count = leaf_count;
        node.visible_leaf_count = visible_leaf_count;
        node.visible_child_count = visible_child_count;
        node.node_count = node_count;
    }
}

// ============================================================================
// Top-down pass
// ============================================================================
impl Tree {
    /// Reruns the top-down pass from the root.
    ///
    /// Recomputes `length_from_root` and `level` for every reachable node
    /// and refreshes the tree-wide maxima.
    pub fn process_nodes(&mut self) {
        if !self.is_root_set() {
            return;
        }
        self.max_level = 0;
        self.max_length_from_root = 0.0;
        let root = self.root;
        self.nodes[root].length_from_root = 0.0;
        self.process_from(root);
    }

    fn process_from(&mut self, id: NodeId) {
        let base_length = self.nodes[id].length_from_root;
        let base_level = self.nodes[id].level;
        for &child in &self.nodes[id].children.clone() {
            let node = &mut self.nodes[child];
            node.length_from_root = round_float(base_length + node.length, 4);
            node.level = base_level + 1;
            if node.level > self.max_level {
                self.max_level = node.level;
            }
            if node.length_from_root > self.max_length_from_root {
                self.max_length_from_root = node.length_from_root;
            }
            if !self.nodes[child].children.is_empty() {
                self.process_from(child);
            }
        }
    }
}

// ============================================================================
// Visibility
// ============================================================================
impl Tree {
    /// Toggles the visibility of a node, or forces it with
    /// `force = Some(true)` (hide) / `Some(false)` (show).
    ///
    /// Hiding the last remaining visible sibling is redirected upward:
    /// instead of this node, the lowest ancestor whose parent still has
    /// at least two visible children is hidden, so a shown parent never
    /// ends up with zero visible children. Reruns the counting pass.
    ///
    /// # Returns
    /// `false` (and no change) if called on the root.
    pub fn hide_toggle(&mut self, id: NodeId, force: Option<bool>) -> bool {
        let Some(parent) = self.nodes[id].parent else {
            return false;
        };
        let hide = match force {
            Some(forced) => forced,
            None => !self.nodes[id].hidden,
        };
        if hide {
            if self.nodes[parent].visible_child_count < 2 {
                let branch = self.visible_parent_branch(id);
                self.nodes[branch].hidden = true;
            } else {
                self.nodes[id].hidden = true;
            }
        } else {
            self.nodes[id].hidden = false;
        }
        self.recount();
        true
    }

    /// Walks upward to the lowest ancestor branch whose parent keeps at
    /// least two visible children.
    fn visible_parent_branch(&self, id: NodeId) -> NodeId {
        match self.nodes[id].parent {
            Some(p) if self.nodes[p].visible_child_count > 1 => id,
            Some(p) => self.visible_parent_branch(p),
            None => id,
        }
    }

    /// Recursively shows or hides the leaves of this subtree that match
    /// the ancestral/non-ancestral selector, clearing the hidden flag on
    /// every stem on the way down. Reruns the counting pass.
    pub fn show_subtree(&mut self, id: NodeId, ancestral: bool, hide: bool) {
        self.show_subtree_from(id, ancestral, hide);
        self.recount();
    }

    fn show_subtree_from(&mut self, id: NodeId, ancestral: bool, hide: bool) {
        for &child in &self.nodes[id].children.clone() {
            if !self.nodes[child].children.is_empty() {
                self.show_subtree_from(child, ancestral, hide);
            } else if (self.nodes[child].kind == NodeKind::Ancestral) == ancestral {
                self.nodes[child].hidden = hide;
            }
        }
        self.nodes[id].hidden = false;
    }

    /// Computes and caches the vertical branch-point position of a stem,
    /// in rows relative to the current row baseline.
    ///
    /// The base position is the first child's visible-leaf count plus 0.5
    /// (minus 0.5 on the very first branch of the tree, whose leaf does
    /// not advance the row cursor), with corrections keeping the point
    /// centered relative to the rows actually drawn: +1 when the first
    /// child is itself a single row, +0.5 when a visible ancestral leaf
    /// occupies the second-child row, and -1/-0.5 when a hidden first
    /// branch or a sole visible child removes rows.
    pub fn midbranch_position(&mut self, id: NodeId, first_branch: bool) -> f64 {
        let children = self.nodes[id].children.clone();
        let Some(&first) = children.first() else {
            return 0.0;
        };
        let first_leaves = self.nodes[first].visible_leaf_count;
        let mut mid = first_leaves as f64 + if first_branch { -0.5 } else { 0.5 };
        if first_leaves == 0 {
            mid += 1.0;
        }
        let second_is_visible_anc = children.get(1).is_some_and(|&c| {
            self.nodes[c].kind == NodeKind::Ancestral && !self.nodes[c].hidden
        });
        if second_is_visible_anc {
            mid += 0.5;
            let first_hidden = self.nodes[first].hidden;
            let third_visible = children.get(2).is_some_and(|&c| !self.nodes[c].hidden);
            if (first_hidden && third_visible) || self.nodes[id].visible_child_count == 1 {
                mid -= 1.0;
            }
        } else if self.nodes[id].visible_child_count == 1 {
            mid -= 0.5;
        }
        self.nodes[id].mid_branch_position = mid;
        mid
    }
}

// ============================================================================
// Ancestral leaves
// ============================================================================
impl Tree {
    /// Strips every ancestral leaf out of the tree.
    ///
    /// A stem whose ancestral leaf was visible is flagged so the next
    /// [`restore_ancestral`](Tree::restore_ancestral) reinserts it
    /// visible. The stripped leaves stay in the arena, detached.
    pub fn strip_ancestral(&mut self) {
        if self.is_root_set() {
            self.strip_from(self.root);
        }
    }

    fn strip_from(&mut self, id: NodeId) {
        let kids = self.nodes[id].children.clone();
        let mut anc_slot = None;
        for (slot, &child) in kids.iter().enumerate() {
            if !self.nodes[child].children.is_empty() {
                self.strip_from(child);
            } else if self.nodes[child].kind == NodeKind::Ancestral {
                if !self.nodes[child].hidden {
                    self.nodes[id].show_anc = true;
                }
                anc_slot = Some(slot);
            }
        }
        if let Some(slot) = anc_slot {
            let anc = self.nodes[id].children.remove(slot);
            self.nodes[anc].parent = None;
        }
    }

    /// Reinserts ancestral-sequence leaves.
    ///
    /// Any stem with more than one child whose name has an entry in
    /// `sequences` and whose second child is not already ancestral gets a
    /// fresh ancestral leaf inserted as its second child, visible iff the
    /// stem was flagged during stripping. The match is by name: renaming
    /// a stem between strip and restore would attach a different
    /// sequence.
    pub fn restore_ancestral(&mut self, sequences: &SequenceStore) {
        if self.is_root_set() {
            self.restore_from(self.root, sequences);
        }
    }

    fn restore_from(&mut self, id: NodeId, sequences: &SequenceStore) {
        for &child in &self.nodes[id].children.clone() {
            if !self.nodes[child].children.is_empty() {
                self.restore_from(child, sequences);
            }
        }
        let node = &self.nodes[id];
        let second_is_anc = node
            .children
            .get(1)
            .is_some_and(|&c| self.nodes[c].kind == NodeKind::Ancestral);
        if node.children.len() > 1
            && !second_is_anc
            && !node.name.is_empty()
            && sequences.contains(&node.name)
        {
            let name = node.name.clone();
            let length_from_root = node.length_from_root;
            let show = node.show_anc;
            let anc = self.new_node(Some(id));
            let leaf = &mut self.nodes[anc];
            leaf.kind = NodeKind::Ancestral;
            leaf.name = name;
            leaf.length_from_root = length_from_root;
            leaf.hidden = !show;
            self.nodes[id].show_anc = false;
            self.nodes[id].children.insert(1, anc);
        }
    }
}

// ============================================================================
// Traversal and structure helpers
// ============================================================================
impl Tree {
    /// Flattens the subtree under `id` into postorder (children before
    /// parents, left to right), skipping ancestral leaves.
    ///
    /// Uses an explicit stack so arbitrarily deep trees never risk
    /// recursion-depth failure; this is the node order the Newick writer
    /// consumes.
    pub fn flatten(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack: Vec<(NodeId, usize)> = vec![(id, 0)];
        while let Some(&(node, visited)) = stack.last() {
            if let Some(&child) = self.nodes[node].children.get(visited) {
                stack.last_mut().unwrap().1 += 1;
                if self.nodes[child].kind != NodeKind::Ancestral {
                    stack.push((child, 0));
                }
            } else {
                stack.pop();
                order.push(node);
            }
        }
        order
    }

    /// Exchanges the first and last entries of a node's children.
    pub(crate) fn swap_children(&mut self, id: NodeId) {
        let n = self.nodes[id].children.len();
        if n > 1 {
            self.nodes[id].children.swap(0, n - 1);
        }
    }

    /// Marks every ancestor of `id` as altered and flags the tree for
    /// re-alignment.
    pub(crate) fn flag_path_to_root(&mut self, id: NodeId) {
        let mut n = id;
        while let Some(p) = self.nodes[n].parent {
            self.nodes[p].altered = true;
            n = p;
        }
        self.altered = true;
    }

    /// Detaches a node from both directions without touching the rest of
    /// the tree.
    pub(crate) fn detach(&mut self, id: NodeId) {
        self.nodes[id].parent = None;
        self.nodes[id].children.clear();
    }

    /// Replaces the tree root with `new_root`.
    ///
    /// Detaches `new_root` from its old parent (discarding everything on
    /// the far side), resets its branch length, level and root length,
    /// names it "Root" if unnamed, optionally flags it for re-alignment,
    /// and reruns both passes.
    pub(crate) fn install_root(&mut self, new_root: NodeId, realign: bool) {
        if let Some(old_parent) = self.nodes[new_root].parent {
            self.nodes[old_parent].children.clear();
        }
        self.nodes[new_root].parent = None;
        if self.nodes[new_root].name.is_empty() {
            self.nodes[new_root].name = "Root".to_string();
        }
        self.nodes[new_root].length = 0.0;
        self.nodes[new_root].level = 0;
        self.nodes[new_root].length_from_root = 0.0;
        if realign {
            self.nodes[new_root].altered = true;
            self.altered = true;
        }
        self.root = new_root;
        self.recount();
        self.process_nodes();
    }

    /// Validates the tree structure reachable from the root.
    ///
    /// Checks that every child's parent back-reference matches, that no
    /// node is reachable twice, that leaves and stems have consistent
    /// kinds, and that branch lengths are non-negative and finite.
    pub fn is_valid(&self) -> bool {
        if !self.is_root_set() || self.root >= self.nodes.len() {
            return false;
        }
        if self.nodes[self.root].parent.is_some() {
            return false;
        }

        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if seen[id] {
                return false;
            }
            seen[id] = true;

            let node = &self.nodes[id];
            if node.length < 0.0 || !node.length.is_finite() {
                return false;
            }
            if node.children.is_empty() {
                if node.kind == NodeKind::Stem {
                    return false;
                }
            } else if node.kind != NodeKind::Stem {
                return false;
            }
            for &child in &node.children {
                if child >= self.nodes.len() || self.nodes[child].parent != Some(id) {
                    return false;
                }
                stack.push(child);
            }
        }
        true
    }
}
