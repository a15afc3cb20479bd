//! Structs and logic to parse extended Newick/NHX strings.

use std::collections::HashMap;

use indexmap::IndexMap;
use log::debug;

use crate::model::meta;
use crate::model::round_float;
use crate::model::{NodeId, NodeKind, Tree};
use crate::parser::CharScanner;

// =#========================================================================#=
// NEWICK PARSER
// =#========================================================================#=
/// Parser for extended Newick/NHX strings.
///
/// Consumes a single tree description and produces a [Tree] with both
/// consistency passes already run, so the result is immediately usable by
/// the writer, the editor and the layout engine.
///
/// Parsing is lenient: the parser stops at the terminating `;` (or end of
/// input) and unbalanced or truncated text yields whatever partial
/// subtree was built so far. It never fails.
///
/// # Configuration
/// * [`with_id_names(map)`](Self::with_id_names)
///     - remaps parsed labels through an id-to-display-name table before
///       the underscore-to-space normalization.
/// * [`with_leaf_info(map)`](Self::with_leaf_info)
///     - merges external per-leaf metadata into matching leaves
///       (by name) after parsing.
///
/// # Example
/// ```
/// use phyledit::newick::NewickParser;
///
/// let input = "((A:1.0,B:2.0):0.5,(C:1.0,D:1.0):0.5)Root;";
/// let tree = NewickParser::new(input).parse();
///
/// assert_eq!(tree.root().name(), "Root");
/// assert_eq!(tree.root().leaf_count(), 4);
/// ```
pub struct NewickParser<'a> {
    scanner: CharScanner,
    current: Option<char>,
    tree: Tree,
    altered: bool,
    id_names: Option<&'a HashMap<String, String>>,
    leaf_info: Option<&'a HashMap<String, IndexMap<String, String>>>,
}

// ============================================================================
// Construction & Configuration (pub)
// ============================================================================
impl<'a> NewickParser<'a> {
    /// Creates a new parser for the given Newick text.
    pub fn new(text: &str) -> Self {
        NewickParser {
            scanner: CharScanner::new(text),
            current: None,
            tree: Tree::new(),
            altered: false,
            id_names: None,
            leaf_info: None,
        }
    }

    /// Remaps parsed node names through an id-to-display-name table.
    pub fn with_id_names(mut self, id_names: &'a HashMap<String, String>) -> Self {
        self.id_names = Some(id_names);
        self
    }

    /// Merges external per-leaf metadata (keyed by leaf name) into the
    /// long-form metadata of matching leaves after parsing.
    pub fn with_leaf_info(
        mut self,
        leaf_info: &'a HashMap<String, IndexMap<String, String>>,
    ) -> Self {
        self.leaf_info = Some(leaf_info);
        self
    }
}

// ============================================================================
// Parsing
// ============================================================================
impl NewickParser<'_> {
    /// Parses the input and returns the resulting tree.
    ///
    /// The root's branch length is forced to 0 and both the counting and
    /// the top-down pass run before the tree is returned.
    pub fn parse(mut self) -> Tree {
        self.advance();
        let root = self.parse_subtree(None);
        self.tree.set_root(root);
        self.tree.set_altered(self.altered);
        self.tree[root].length = 0.0;
        self.tree.recount();
        self.merge_leaf_info();
        self.tree.process_nodes();
        debug!(
            "parsed newick tree: {} leaves, {} internal nodes",
            self.tree.root().leaf_count(),
            self.tree.root().node_count()
        );
        self.tree
    }

    /// Advances the cursor by one character; the terminating `;` reads as
    /// end of input.
    fn advance(&mut self) {
        self.current = match self.scanner.next() {
            Some(';') => None,
            c => c,
        };
    }

    /// Parses a parenthesized subtree and returns its stem node.
    ///
    /// Scans forward to the next `(`, collects children (nested subtrees
    /// or leaves) up to the matching `)`, then reads the stem's own
    /// trailing label, branch length and metadata.
    fn parse_subtree(&mut self, parent: Option<NodeId>) -> NodeId {
        while let Some(c) = self.current {
            if c == '(' {
                break;
            }
            self.advance();
        }
        let node = self.tree.new_node(parent);
        loop {
            match self.current {
                None | Some(')') => break,
                _ => {}
            }
            self.advance();
            if self.current == Some('(') {
                let child = self.parse_subtree(Some(node));
                self.tree[node].children.push(child);
            } else {
                let child = self.tree.new_node(Some(node));
                self.parse_node_data(child);
                self.tree[node].children.push(child);
            }
        }
        self.advance();
        self.parse_node_data(node);
        node
    }

    /// Reads label, branch length and `[...]` metadata into a node until
    /// the next structural delimiter.
    fn parse_node_data(&mut self, id: NodeId) {
        loop {
            let Some(c) = self.current else { break };
            if c == ')' || c == ',' {
                break;
            }
            if c == '[' {
                let block = self.quoted_string(']');
                self.apply_metadata(id, &block);
            } else if c == ':' {
                self.advance();
                let text = self.bare_string();
                self.tree[id].length = round_float(text.parse().unwrap_or(f64::NAN), 4);
            } else if c == '\'' || c == '"' {
                self.tree[id].name = self.quoted_string(c);
            } else {
                self.tree[id].name = self.bare_string();
            }
        }

        if !self.tree[id].name.is_empty() {
            let mut name = self.tree[id].name.clone();
            if let Some(map) = self.id_names {
                if let Some(display) = map.get(&name) {
                    name = display.clone();
                }
            }
            self.tree[id].name = name.trim().replace('_', " ");
        }
        self.tree[id].kind = if self.tree[id].children.is_empty() {
            NodeKind::Label
        } else {
            NodeKind::Stem
        };
    }

    /// Collects a bare token, stopping at `:`, `)`, `,` or `[`.
    fn bare_string(&mut self) -> String {
        let mut collected = String::new();
        while let Some(c) = self.current {
            if c == ':' || c == ')' || c == ',' || c == '[' {
                break;
            }
            collected.push(c);
            self.advance();
        }
        collected
    }

    /// Collects characters verbatim up to the closing delimiter, which is
    /// consumed. The opening delimiter must be the current character.
    fn quoted_string(&mut self, end: char) -> String {
        let mut collected = String::new();
        self.advance();
        while let Some(c) = self.current {
            if c == end {
                break;
            }
            collected.push(c);
            self.advance();
        }
        self.advance();
        collected
    }

    /// Decodes a bracketed metadata block (`&&NHX:key=value:...`).
    ///
    /// Pairs without a value are skipped, which also disposes of the
    /// leading `&&NHX` marker.
    fn apply_metadata(&mut self, id: NodeId, block: &str) {
        for pair in block.split(':') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            if value.is_empty() {
                continue;
            }
            self.apply_tag(id, key, value);
        }
    }

    /// Applies one decoded tag to a node, per the tag table.
    ///
    /// Tags the writer re-derives from node state (`Co`, `XN`, `Vis`) and
    /// tags decoded into the long-form dictionary are not duplicated into
    /// the raw map; everything else is preserved verbatim for round
    /// trips.
    fn apply_tag(&mut self, id: NodeId, key: &str, value: &str) {
        match key {
            "Co" if value == "Y" => self.tree[id].hidden = true,
            "Vis" if value == "Y" => self.tree[id].show_anc = true,
            "SEL" if value == "Y" => {
                self.tree[id].selected = true;
                self.preserve(id, key, value);
            }
            "XN" if value == "realign" => {
                self.tree[id].altered = true;
                self.altered = true;
            }
            "C" | "BC" => {
                let color = decode_color(value);
                if key == "C" {
                    self.tree[id].color = Some(color);
                } else {
                    self.tree[id].branch_color = Some(color);
                }
                self.preserve(id, key, value);
            }
            "NL" => {
                self.tree[id].label_source = meta::long_name(value).map(str::to_string);
                self.preserve(id, key, value);
            }
            "CR" => {
                self.tree[id].marker_radius = value.trim().parse().ok();
                self.preserve(id, key, value);
            }
            "Ev" => {
                let fields: Vec<&str> = value.split('>').collect();
                if let Some(d) = fields.get(1).and_then(|v| v.parse::<i64>().ok()) {
                    self.tree[id].info.insert("duplications".to_string(), d.to_string());
                }
                if let Some(s) = fields.get(2).and_then(|v| v.parse::<i64>().ok()) {
                    self.tree[id].info.insert("speciations".to_string(), s.to_string());
                }
                self.preserve(id, key, value);
            }
            "D" => {
                let field = match value {
                    "N" | "F" => "speciations",
                    _ => "duplications",
                };
                self.tree[id].info.insert(field.to_string(), "1".to_string());
                self.preserve(id, key, value);
            }
            _ => {
                if let Some(field) = meta::long_name(key) {
                    let mut decoded = value.to_string();
                    if key == "S" {
                        decoded = meta::capitalize(&decoded).replace('_', " ");
                    }
                    self.tree[id].info.insert(field.to_string(), decoded);
                } else {
                    self.preserve(id, key, value);
                }
            }
        }
    }

    fn preserve(&mut self, id: NodeId, key: &str, value: &str) {
        self.tree[id].nhx.insert(key.to_string(), value.to_string());
    }

    /// Merges the external per-leaf metadata table into matching leaves.
    fn merge_leaf_info(&mut self) {
        let Some(table) = self.leaf_info else { return };
        for id in self.tree.flatten(self.tree.root_id()) {
            if !self.tree[id].children.is_empty() {
                continue;
            }
            let name = self.tree[id].name.clone();
            if let Some(extra) = table.get(&name) {
                for (key, value) in extra {
                    self.tree[id].info.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

/// Decodes a `C=`/`BC=` color value: dot-separated channel values become
/// an `rgb(..)` triple, anything else is taken verbatim.
fn decode_color(value: &str) -> String {
    let channels = value.replace('.', ",");
    if channels.contains(',') {
        format!("rgb({channels})")
    } else {
        channels
    }
}
