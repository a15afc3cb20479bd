//! Extended Newick/NHX parser and writer for editable phylogenetic trees.
//!
//! This module provides [NewickParser] to parse extended Newick strings
//! into [Tree] structures and [NewickWriter] to serialize them back.
//!
//! # Quick API
//! For simple use cases with default settings:
//! * [`parse_str`] - parses a single Newick string, returns a [Tree]
//! * [`to_newick`] - serializes a tree without metadata
//!
//! # Full API
//! For more control, configure a [NewickParser] or [NewickWriter]:
//! * [`NewickParser::with_id_names`] - remap labels through an
//!   id-to-display-name table
//! * [`NewickParser::with_leaf_info`] - merge external per-leaf metadata
//! * [`NewickWriter::new`] with a [NewickStyle] - control name quoting
//!   and metadata emission
//!
//! # Format
//! The extended Newick format has the following grammar:
//! * `tree ::= vertex ';'`
//! * `vertex ::= leaf | internal_vertex`
//! * `internal_vertex ::= '(' vertex (',' vertex)* ')' [label] [branch_length]`
//! * `leaf ::= label [branch_length]`
//! * `branch_length ::= ':' number`
//!
//! Furthermore:
//! * Labels are bare tokens (terminated by `:`, `,`, `)`, `[` or `;`)
//!   or quoted strings (single or double quotes, contents verbatim)
//! * A bracketed block `[&&NHX:key=value:...]` carries per-node metadata;
//!   the recognized tags are decoded into node fields, everything else is
//!   preserved verbatim
//! * Parsing is lenient: truncated or unbalanced input yields whatever
//!   partial tree was built, never an error

pub mod parser;
pub mod writer;

pub use parser::NewickParser;
pub use writer::{NewickStyle, NewickWriter, to_newick};

use crate::model::Tree;

// ============================================================================
// QUICK PARSING API (pub)
// ============================================================================
/// Parses a single extended Newick string using default settings.
///
/// # Arguments
/// * `newick` - The Newick format string to parse
///
/// # Example
/// ```
/// use phyledit::newick::parse_str;
///
/// let tree = parse_str("((A:1.0,B:2.0)AB:3.0,C:4.0)Root;");
/// assert_eq!(tree.root().leaf_count(), 3);
/// ```
pub fn parse_str<S: AsRef<str>>(newick: S) -> Tree {
    NewickParser::new(newick.as_ref()).parse()
}
