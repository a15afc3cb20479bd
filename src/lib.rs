//! Phyledit is a library for keeping a phylogenetic tree as an editable
//! in-memory structure.
//!
//! It parses tree descriptions from two textual formats, exposes
//! structural edit operations that preserve the tree invariants,
//! recomputes derived statistics after edits, serializes the tree back
//! to extended Newick text, and computes 2D layout coordinates
//! consumable by a renderer. Core functionality provided:
//! - Newick/NHX: Parse a single extended Newick string, leniently
//!   (truncated input yields a best-effort partial tree), and write it
//!   back deterministically with or without metadata.
//! - phyloXML subset: Parse `phylogeny > clade` documents onto the same
//!   tree representation, collecting residue sequences into a side
//!   table.
//! - Editing: Reroot, move, remove, prune, ladderize, sibling swap and
//!   visibility toggling, each emitting an undo record and restoring the
//!   tree invariants before returning.
//! - Layout: Per-node canvas coordinates and renderer flags, with a
//!   one-shot overflow rescale.
//!
//! Limitations:
//! - Only the documented NHX tag and phyloXML element subset is decoded;
//!   unknown NHX tags are preserved verbatim, unknown XML elements are
//!   ignored.
//! - Single tree per input; no multi-tree files.
//! - Single-threaded, synchronous; callers serialize edits.
//!
//! # Usage
//!
//! Parse a Newick string, edit it, write it back:
//! ```
//! use phyledit::edit::TreeEditor;
//! use phyledit::model::SequenceStore;
//! use phyledit::newick::{parse_str, to_newick};
//!
//! let mut tree = parse_str("(A:1,(B:2,C:3)D:4)Root;");
//! let sequences = SequenceStore::new();
//!
//! let d = tree.find_by_name("D").unwrap();
//! TreeEditor::new(&mut tree, &sequences).swap(d).unwrap();
//! assert_eq!(to_newick(&tree), "(A:1,(C:3,B:2)D:4)Root;");
//! ```
//!
//! Lay the tree out for a renderer:
//! ```
//! use phyledit::layout::{LayoutEngine, LayoutOptions};
//! use phyledit::model::SequenceStore;
//! use phyledit::newick::parse_str;
//!
//! let mut tree = parse_str("(A:1,(B:2,C:3)D:4)Root;");
//! let layout = LayoutEngine::new(LayoutOptions::default())
//!     .layout(&mut tree, &SequenceStore::new())
//!     .unwrap();
//! assert_eq!(layout.visible_rows.len(), 3);
//! ```

pub mod edit;
pub mod layout;
pub mod model;
pub mod newick;
pub mod parser;
pub mod phyloxml;

pub use edit::{ChangeRecord, EditError, TreeEditor};
pub use layout::{LayoutEngine, LayoutOptions, TreeLayout};
pub use model::{NodeId, NodeKind, SequenceStore, Tree, TreeNode};
pub use newick::{NewickParser, NewickStyle, NewickWriter};
pub use phyloxml::PhyloXmlParser;

// ============================================================================
// Quick Newick API
// ============================================================================
/// Parses a single extended Newick string using default settings.
///
/// See [`newick::parse_str`] for full documentation of this convenience
/// function.
pub fn parse_newick_str<S: AsRef<str>>(newick: S) -> Tree {
    newick::parse_str(newick)
}

// ============================================================================
// Quick phyloXML API
// ============================================================================
/// Parses a phyloXML document using default settings, collecting residue
/// sequences into `sequences`.
///
/// See [`phyloxml::parse_str`] for full documentation of this
/// convenience function.
pub fn parse_phyloxml_str<S: AsRef<str>>(
    xml: S,
    sequences: &mut SequenceStore,
) -> Option<Tree> {
    phyloxml::parse_str(xml.as_ref(), sequences)
}
