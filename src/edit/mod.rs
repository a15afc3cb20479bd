//! Structural edit operations on phylogenetic trees.
//!
//! [TreeEditor] wraps a [Tree] and a [SequenceStore] and exposes the
//! mutations a tree viewer needs: sibling swap, ladderization,
//! visibility toggling, rerooting, subtree relocation, removal and
//! pruning.
//!
//! Every operation either completes — leaving the tree with both
//! consistency passes rerun, immediately consumable by the writer and
//! the layout engine — and returns a [ChangeRecord] for an external
//! undo stack, or is rejected with an [EditError] and leaves the tree
//! unchanged.
//!
//! Topology-changing operations strip ancestral-sequence leaves before
//! mutating and reinsert them afterwards, so the algorithms themselves
//! never special-case them. Ordering-only operations (swap, ladderize,
//! visibility) keep ancestral leaves in place: they preserve the
//! anc-as-second-child invariant by construction.

use log::debug;
use thiserror::Error;

use crate::model::round_float;
use crate::model::{NodeId, NodeKind, SequenceStore, Tree};
use crate::newick::{NewickStyle, NewickWriter};

// =#========================================================================#=
// CHANGE RECORD / EDIT ERROR
// =#========================================================================#=
/// Description of one completed mutation, for an external undo/redo
/// stack.
#[derive(Debug, Clone)]
pub struct ChangeRecord {
    /// Operation name, e.g. `"Reroot"`.
    pub name: &'static str,
    /// Undo category; always `"tree"`.
    pub category: &'static str,
    /// Snapshot of the mutated tree in undo style
    /// ([NewickStyle::Snapshot]).
    pub snapshot: String,
    /// Human-readable summary of the change.
    pub description: String,
}

/// Rejection of an invalid edit. The tree is left unchanged and no
/// change record is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("the tree root cannot be the target of this operation")]
    IsRoot,
    #[error("a direct child of the root cannot be moved")]
    ChildOfRoot,
    #[error("cannot move a node onto one of its own descendants")]
    AncestorOfTarget,
    #[error("the node is already attached at this position")]
    AlreadyInPlace,
    #[error("removing this node would leave the root without a subtree")]
    WouldOrphanRoot,
    #[error("operation requires an internal node")]
    NotAStem,
}

// =#========================================================================#=
// TREE EDITOR
// =#========================================================================#=
/// Edit operations over a borrowed [Tree].
///
/// # Example
/// ```
/// use phyledit::edit::TreeEditor;
/// use phyledit::model::SequenceStore;
/// use phyledit::newick::{parse_str, to_newick};
///
/// let mut tree = parse_str("(A:1,(B:2,C:3)D:4)Root;");
/// let sequences = SequenceStore::new();
/// let c = tree.find_by_name("C").unwrap();
///
/// let record = TreeEditor::new(&mut tree, &sequences).remove(c).unwrap();
/// assert_eq!(record.name, "Remove node");
/// assert_eq!(to_newick(&tree), "(A:1,B:6)Root;");
/// ```
pub struct TreeEditor<'a> {
    tree: &'a mut Tree,
    sequences: &'a SequenceStore,
}

impl<'a> TreeEditor<'a> {
    /// Creates an editor over the given tree and sequence side table.
    pub fn new(tree: &'a mut Tree, sequences: &'a SequenceStore) -> Self {
        TreeEditor { tree, sequences }
    }

    fn record(&self, name: &'static str, description: String) -> ChangeRecord {
        debug!("{name}: {description}");
        ChangeRecord {
            name,
            category: "tree",
            snapshot: NewickWriter::new(NewickStyle::Snapshot).write(self.tree),
            description,
        }
    }

    /// Restores ancestral leaves and reruns both passes; the closing
    /// bracket of every topology-changing operation.
    fn finish(&mut self) {
        self.tree.restore_ancestral(self.sequences);
        self.tree.recount();
        self.tree.process_nodes();
    }

    /// Undoes the opening strip on a rejected operation.
    fn reject(&mut self, error: EditError) -> EditError {
        self.finish();
        error
    }
}

// ============================================================================
// Ordering and visibility operations
// ============================================================================
impl TreeEditor<'_> {
    /// Exchanges the first and last children of a node. Pure reordering,
    /// no length or topology change.
    pub fn swap(&mut self, id: NodeId) -> Result<ChangeRecord, EditError> {
        if self.tree[id].is_leaf() {
            return Err(EditError::NotAStem);
        }
        let swapped = self.tree[self.tree[id].children()[0]].name().to_string();
        self.tree.swap_children(id);
        Ok(self.record(
            "Swap nodes",
            format!("Tree node '{swapped}' swapped places with its sibling."),
        ))
    }

    /// Reorders the subtree canonically: at each stem, the children are
    /// swapped if the first has fewer visible leaves than the last;
    /// recursion descends into children with more than two visible
    /// leaves. Idempotent.
    pub fn ladderize(&mut self, id: NodeId) -> Result<ChangeRecord, EditError> {
        if self.tree[id].is_leaf() {
            return Err(EditError::NotAStem);
        }
        self.ladderize_from(id);
        let name = self.tree[id].name().to_string();
        Ok(self.record(
            "Ladderise",
            format!("The subtree of '{name}' was reordered."),
        ))
    }

    fn ladderize_from(&mut self, id: NodeId) {
        let children = self.tree[id].children().to_vec();
        if children.is_empty() {
            return;
        }
        let first = self.tree[children[0]].visible_leaf_count();
        let last = self.tree[*children.last().unwrap()].visible_leaf_count();
        if first < last {
            self.tree.swap_children(id);
        }
        for child in children {
            if self.tree[child].visible_leaf_count() > 2 {
                self.ladderize_from(child);
            }
        }
    }

    /// Toggles a node's visibility, redirecting upward if it is the last
    /// visible sibling (see [Tree::hide_toggle]).
    pub fn hide_toggle(&mut self, id: NodeId) -> Result<ChangeRecord, EditError> {
        if !self.tree.hide_toggle(id, None) {
            return Err(EditError::IsRoot);
        }
        let name = self.tree[id].name().to_string();
        Ok(self.record(
            "Toggle visibility",
            format!("Visibility of node '{name}' or its enclosing branch was toggled."),
        ))
    }

    /// Shows or hides all leaves of a subtree matching the
    /// ancestral/non-ancestral selector, unhiding every stem on the way
    /// down.
    pub fn show_subtree(
        &mut self,
        id: NodeId,
        ancestral: bool,
        hide: bool,
    ) -> Result<ChangeRecord, EditError> {
        self.tree.show_subtree(id, ancestral, hide);
        let name = self.tree[id].name().to_string();
        let what = if ancestral { "ancestral leaves" } else { "leaves" };
        let how = if hide { "hidden" } else { "shown" };
        Ok(self.record(
            "Show subtree",
            format!("All {what} under '{name}' were {how}."),
        ))
    }
}

// ============================================================================
// Topology operations
// ============================================================================
impl TreeEditor<'_> {
    /// Places a node as the new tree outgroup.
    ///
    /// The edge above `id` is split at `distance` from the node (default
    /// and fallback for out-of-range values: half the branch length) and
    /// a fresh root is installed there. The spine between the old root
    /// and the new node is reversed edge by edge, carrying the branch
    /// lengths along. If the old root is left with exactly two children
    /// it is elided and the lengths summed; a multifurcating old root
    /// just drops the stale entry.
    ///
    /// The path from the node to the old root is marked altered.
    pub fn reroot(
        &mut self,
        id: NodeId,
        distance: Option<f64>,
    ) -> Result<ChangeRecord, EditError> {
        // Rerooting at an ancestral leaf means rerooting at its stem.
        let mut node = id;
        if self.tree[node].kind() == NodeKind::Ancestral {
            match self.tree[node].parent() {
                Some(p) => node = p,
                None => return Err(EditError::IsRoot),
            }
        }
        self.tree.strip_ancestral();
        if node == self.tree.root_id() {
            return Err(self.reject(EditError::IsRoot));
        }

        let node_length = self.tree[node].length();
        let distance = match distance {
            Some(d) if d.is_finite() && d >= 0.0 && d <= node_length => d,
            _ => node_length / 2.0,
        };
        self.tree.flag_path_to_root(node);

        let new_root = self.tree.new_node(None);
        self.tree[new_root].kind = NodeKind::Stem;
        self.tree[new_root].children.push(node);
        self.tree[node].length = distance;
        let mut below = self.tree[node].parent.unwrap();
        let mut slot = child_slot(self.tree, below, node);
        self.tree[node].parent = Some(new_root);
        self.tree[new_root].children.push(below);
        let mut carried = self.tree[below].length;
        self.tree[below].length = node_length - distance;
        let mut above = self.tree[below].parent;
        self.tree[below].parent = Some(new_root);

        // Reverse the spine from the former parent down to the old root,
        // swapping the pair of branch lengths carried along.
        let mut lower = new_root;
        while let Some(upper) = above {
            let next = self.tree[upper].parent;
            self.tree[below].children[slot] = upper;
            slot = child_slot(self.tree, upper, below);
            self.tree[upper].parent = Some(below);
            let length = self.tree[upper].length;
            self.tree[upper].length = carried;
            carried = length;
            lower = below;
            below = upper;
            above = next;
        }

        // `below` is the old root now.
        if self.tree[below].children.len() == 2 {
            let other = self.tree[below].children[1 - slot];
            let at = child_slot(self.tree, lower, below);
            let stale_length = self.tree[below].length;
            self.tree[other].length += stale_length;
            self.tree[other].parent = Some(lower);
            self.tree[lower].children[at] = other;
            self.tree.detach(below);
        } else {
            self.tree[below].children.remove(slot);
        }

        self.tree.install_root(new_root, true);
        self.finish();
        Ok(self.record("Reroot", "Tree rerooted.".to_string()))
    }

    /// Relocates the subtree rooted at `id` onto the edge between
    /// `target` and its parent, splitting that edge in half with a
    /// synthetic stem.
    ///
    /// Rejected if the node is the root or a direct child of the root,
    /// if it is an ancestor of the target, or if the target already is
    /// its parent. Moving next to a sibling resolves as a plain sibling
    /// swap.
    pub fn move_to(&mut self, id: NodeId, target: NodeId) -> Result<ChangeRecord, EditError> {
        self.tree.strip_ancestral();
        let root = self.tree.root_id();
        if id == root {
            return Err(self.reject(EditError::IsRoot));
        }
        if self.tree[id].parent() == Some(root) {
            return Err(self.reject(EditError::ChildOfRoot));
        }
        let mut walk = target;
        loop {
            if walk == id {
                return Err(self.reject(EditError::AncestorOfTarget));
            }
            match self.tree[walk].parent() {
                Some(p) => walk = p,
                None => break,
            }
        }
        if self.tree[target].parent() == self.tree[id].parent() {
            let parent = self.tree[id].parent().unwrap();
            let swapped = self.tree[self.tree[parent].children()[0]].name().to_string();
            self.tree.swap_children(parent);
            self.finish();
            return Ok(self.record(
                "Swap nodes",
                format!("Tree node '{swapped}' swapped places with its sibling."),
            ));
        }
        if self.tree[id].parent() == Some(target) {
            return Err(self.reject(EditError::AlreadyInPlace));
        }

        let node_name = self.tree[id].name().to_string();
        let target_name = self.tree[target].name().to_string();

        // Rejections above guarantee the detachment cannot fail.
        self.detach_subtree(id).expect("detachment already validated");

        // A placeholder above the root lets the graft treat "target is
        // the root" like any other edge; the real root is re-read from
        // under it afterwards.
        let root = self.tree.root_id();
        let placeholder = self.tree.new_node(None);
        self.tree[placeholder].children.push(root);
        self.tree[root].parent = Some(placeholder);

        let parent = self.tree[target].parent.unwrap();
        let slot = child_slot(self.tree, parent, target);
        let stem = self.tree.new_node(Some(parent));
        self.tree[stem].kind = NodeKind::Stem;
        self.tree[parent].children[slot] = stem;
        self.tree[parent].altered = true;
        if self.tree[target].length > 0.0 {
            let half = self.tree[target].length / 2.0;
            self.tree[stem].length = half;
            self.tree[target].length = half;
        }
        self.tree[stem].children.push(id);
        self.tree[id].parent = Some(stem);
        self.tree[stem].children.push(target);
        self.tree[target].parent = Some(stem);

        let new_root = self.tree[placeholder].children[0];
        self.tree.install_root(new_root, true);
        self.tree.flag_path_to_root(id);
        self.finish();
        Ok(self.record(
            "Move node",
            format!("Tree node '{node_name}' was attached to node '{target_name}'."),
        ))
    }

    /// Deletes a node and its subtree.
    ///
    /// A parent left with a single child is elided: the sibling is
    /// spliced onto the grandparent with the branch lengths summed.
    /// Removing a child of a binary root replaces the tree with the
    /// sibling subtree (via [prune](Self::prune)); if that sibling is a
    /// leaf the edit is rejected. A multifurcating parent just drops the
    /// node.
    pub fn remove(&mut self, id: NodeId) -> Result<ChangeRecord, EditError> {
        self.tree.strip_ancestral();
        let name = self.tree[id].name().to_string();
        match self.detach_subtree(id) {
            Ok(Some(record)) => Ok(record),
            Ok(None) => {
                self.finish();
                Ok(self.record(
                    "Remove node",
                    format!("Node '{name}' was removed from the tree."),
                ))
            }
            Err(error) => Err(self.reject(error)),
        }
    }

    /// Detaches `id` (and its subtree) from the tree, eliding a binary
    /// parent. Returns the change record when removal had to fall back
    /// to pruning (binary root case).
    fn detach_subtree(&mut self, id: NodeId) -> Result<Option<ChangeRecord>, EditError> {
        let root = self.tree.root_id();
        if id == root {
            return Err(EditError::IsRoot);
        }
        let parent = self.tree[id].parent.unwrap();
        if parent != root {
            self.tree.flag_path_to_root(id);
        }

        if self.tree[parent].children.len() == 2 {
            let slot = usize::from(self.tree[parent].children[0] != id);
            let other = self.tree[parent].children[1 - slot];
            if parent == root {
                if self.tree[other].children.len() > 1 {
                    return Ok(Some(self.prune_stripped(other)));
                }
                return Err(EditError::WouldOrphanRoot);
            }
            let grandparent = self.tree[parent].parent.unwrap();
            self.tree[other].length =
                round_float(self.tree[other].length + self.tree[parent].length, 4);
            self.tree[other].parent = Some(grandparent);
            let at = child_slot(self.tree, grandparent, parent);
            self.tree[grandparent].children[at] = other;
            self.tree.detach(parent);
            self.tree[id].parent = None;
        } else {
            let slot = child_slot(self.tree, parent, id);
            self.tree[parent].children.remove(slot);
            self.tree[id].parent = None;
        }
        Ok(None)
    }

    /// Discards everything except the subtree under `id`, which becomes
    /// the new root. No re-alignment flagging.
    pub fn prune(&mut self, id: NodeId) -> Result<ChangeRecord, EditError> {
        self.tree.strip_ancestral();
        Ok(self.prune_stripped(id))
    }

    fn prune_stripped(&mut self, id: NodeId) -> ChangeRecord {
        let name = self.tree[id].name().to_string();
        self.tree.install_root(id, false);
        self.finish();
        self.record(
            "Prune subtree",
            format!("Subtree of node '{name}' was pruned from main tree."),
        )
    }
}

/// Position of `child` in `parent`'s children.
fn child_slot(tree: &Tree, parent: NodeId, child: NodeId) -> usize {
    tree[parent]
        .children()
        .iter()
        .position(|&c| c == child)
        .expect("child/parent links out of sync")
}
