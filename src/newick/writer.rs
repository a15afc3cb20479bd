//! Newick format serialization for editable phylogenetic trees.

use std::collections::HashMap;

use crate::model::meta;
use crate::model::{NodeId, NodeKind, Tree};

/// Style for serializing a tree to Newick format, controlling name
/// quoting and metadata emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewickStyle {
    /// Plain topology and branch lengths; names with spaces converted to
    /// underscores, no metadata.
    Plain,
    /// Like [Plain](NewickStyle::Plain) plus an `[&&NHX:...]` metadata
    /// block per node that has any.
    Nhx,
    /// Undo-snapshot output: names double-quoted verbatim, metadata
    /// included. Round-trips exactly through the parser.
    Snapshot,
}

// =#========================================================================#=
// NEWICK WRITER
// =#========================================================================#=
/// Serializer from a [Tree] back to extended Newick text.
///
/// The tree is flattened into a linear postorder sequence with an
/// explicit stack (arbitrarily deep trees never risk recursion-depth
/// failure), each node's depth in the *output* tree is computed (distinct
/// from the cached display depth, because ancestral leaves are excluded
/// from serialization), and parentheses are emitted by comparing
/// successive depths: a depth increase opens that many `(`, a decrease
/// emits one `)`, equal depth separates siblings with `,`.
///
/// # Configuration
/// * [`with_name_map(map)`](Self::with_name_map)
///     - maps display names back to export identifiers.
/// * [`without_stem_names()`](Self::without_stem_names)
///     - suppresses internal-node names in the output.
///
/// # Example
/// ```
/// use phyledit::newick::{parse_str, NewickStyle, NewickWriter};
///
/// let tree = parse_str("(A:1,(B:2,C:3)D:4)Root;");
/// let out = NewickWriter::new(NewickStyle::Plain).write(&tree);
/// assert_eq!(out, "(A:1,(B:2,C:3)D:4)Root;");
/// ```
pub struct NewickWriter<'a> {
    style: NewickStyle,
    skip_stem_names: bool,
    name_map: Option<&'a HashMap<String, String>>,
}

impl<'a> NewickWriter<'a> {
    /// Creates a writer with the given style.
    pub fn new(style: NewickStyle) -> Self {
        NewickWriter {
            style,
            skip_stem_names: false,
            name_map: None,
        }
    }

    /// Maps node names back through a display-name-to-export-id table.
    pub fn with_name_map(mut self, name_map: &'a HashMap<String, String>) -> Self {
        self.name_map = Some(name_map);
        self
    }

    /// Suppresses the names of internal nodes in the output.
    pub fn without_stem_names(mut self) -> Self {
        self.skip_stem_names = true;
        self
    }

    /// Serializes the whole tree.
    pub fn write(&self, tree: &Tree) -> String {
        if !tree.is_root_set() {
            return String::new();
        }
        self.write_from(tree, tree.root_id())
    }

    /// Serializes the subtree rooted at `id`.
    ///
    /// The subtree root is treated as the output root: its name is
    /// emitted but its branch length is not.
    pub fn write_from(&self, tree: &Tree, id: NodeId) -> String {
        let order = tree.flatten(id);

        // Depth in the output tree, computed root-down over the postorder
        // sequence (parents come after their children, so a node's parent
        // level is already known when walking backwards).
        let mut out_level = vec![0usize; tree.num_nodes()];
        for i in (0..order.len().saturating_sub(1)).rev() {
            let node = order[i];
            if let Some(parent) = tree[node].parent() {
                out_level[node] = out_level[parent] + 1;
            }
        }

        let mut out = String::new();
        let mut current_level = 0usize;
        let mut first = true;
        for &id in &order {
            let level = out_level[id];
            if level > current_level {
                if first {
                    first = false;
                } else {
                    out.push(',');
                }
                for _ in 0..(level - current_level) {
                    out.push('(');
                }
            } else if level < current_level {
                out.push(')');
            } else if first {
                first = false;
            } else {
                out.push(',');
            }

            let node = &tree[id];
            if !(self.skip_stem_names && node.kind() == NodeKind::Stem) {
                let mut name = node.name();
                if let Some(map) = self.name_map {
                    if let Some(export) = map.get(name) {
                        name = export;
                    }
                }
                if self.style == NewickStyle::Snapshot {
                    out.push('"');
                    out.push_str(name);
                    out.push('"');
                } else {
                    out.push_str(&name.replace(' ', "_"));
                }
            }
            if level > 0 {
                out.push(':');
                out.push_str(&format!("{}", node.length()));
            }
            if self.style != NewickStyle::Plain {
                out.push_str(&self.metadata_block(tree, id));
            }
            current_level = level;
        }
        out.push(';');
        out
    }

    /// Assembles the `[&&NHX:...]` block for a node: preserved raw pairs,
    /// `Co=Y` if hidden, `XN=realign` if altered, `Vis=Y` if the node's
    /// second child is a visible ancestral leaf, and every long-form
    /// field that maps back through the tag dictionary. Returns an empty
    /// string when there is nothing to emit.
    fn metadata_block(&self, tree: &Tree, id: NodeId) -> String {
        let node = &tree[id];
        let mut tags = String::new();
        for (key, value) in node.nhx() {
            tags.push_str(&format!(":{key}={value}"));
        }
        if node.is_hidden() {
            tags.push_str(":Co=Y");
        }
        if node.is_altered() {
            tags.push_str(":XN=realign");
        }
        if node.kind() == NodeKind::Stem {
            let second_visible_anc = node.children().get(1).is_some_and(|&c| {
                tree[c].kind() == NodeKind::Ancestral && !tree[c].is_hidden()
            });
            if second_visible_anc {
                tags.push_str(":Vis=Y");
            }
        }
        for (tag, field) in meta::NHX_TAGS {
            // "N" is a read-only alias of "ND"; emitting both would
            // duplicate the field.
            if *tag == "N" {
                continue;
            }
            if let Some(value) = node.info().get(*field) {
                if !value.is_empty() {
                    tags.push_str(&format!(":{tag}={value}"));
                }
            }
        }
        if tags.is_empty() {
            String::new()
        } else {
            format!("[&&NHX{}]", meta::sanitize_nhx(&tags))
        }
    }
}

// ============================================================================
// QUICK WRITING API (pub)
// ============================================================================
/// Serializes a tree to plain Newick (topology, names and branch lengths,
/// no metadata).
pub fn to_newick(tree: &Tree) -> String {
    NewickWriter::new(NewickStyle::Plain).write(tree)
}
