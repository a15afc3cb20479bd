//! PhyloXML-subset parser for editable phylogenetic trees.
//!
//! This module provides [PhyloXmlParser] to parse the documented subset
//! of the phyloXML format (`phylogeny > clade*` with branch lengths,
//! names, confidences, colors, taxonomy, sequences and event counts)
//! into the same [Tree](crate::model::Tree) representation the Newick
//! parser produces.
//!
//! Residue sequences found in `mol_seq` elements are stored, keyed by
//! node name, in a caller-supplied
//! [SequenceStore](crate::model::SequenceStore) — a side effect on the
//! input, not on the tree.
//!
//! A document without a `phylogeny > clade` path yields `None` ("no
//! data") rather than an error; malformed XML is handled leniently.

pub mod parser;
pub(crate) mod xml;

pub use parser::PhyloXmlParser;

use crate::model::{SequenceStore, Tree};

// ============================================================================
// QUICK PARSING API (pub)
// ============================================================================
/// Parses a phyloXML document using default settings.
///
/// # Arguments
/// * `xml` - The phyloXML document text
/// * `sequences` - Side table receiving residue sequences found in
///   `mol_seq` elements
///
/// # Returns
/// The parsed tree, or `None` if the document holds no
/// `phylogeny > clade` structure.
pub fn parse_str(xml: &str, sequences: &mut SequenceStore) -> Option<Tree> {
    PhyloXmlParser::new().parse(xml, sequences)
}
