//! Recursive descent over parsed `clade` elements.

use std::collections::HashMap;

use indexmap::IndexMap;
use log::debug;

use crate::model::round_float;
use crate::model::{NodeId, NodeKind, SequenceStore, Tree};
use crate::phyloxml::xml::{self, XmlElement};

// =#========================================================================#=
// PHYLOXML PARSER
// =#========================================================================#=
/// Parser for the phyloXML subset.
///
/// Mirrors the Newick parser's node population: each `clade` element
/// becomes one node, nested clades become its children, and the
/// documented child elements fill the same name, length, color and
/// long-form metadata fields, so both parsers agree on one internal
/// representation.
///
/// # Example
/// ```
/// use phyledit::model::SequenceStore;
/// use phyledit::phyloxml::PhyloXmlParser;
///
/// let xml = "<phylogeny><clade>\
///     <clade branch_length=\"0.1\"><name>A</name></clade>\
///     <clade branch_length=\"0.2\"><name>B</name></clade>\
/// </clade></phylogeny>";
/// let mut sequences = SequenceStore::new();
/// let tree = PhyloXmlParser::new().parse(xml, &mut sequences).unwrap();
/// assert_eq!(tree.root().leaf_count(), 2);
/// ```
#[derive(Default)]
pub struct PhyloXmlParser<'a> {
    leaf_info: Option<&'a HashMap<String, IndexMap<String, String>>>,
}

impl<'a> PhyloXmlParser<'a> {
    /// Creates a new parser with default settings.
    pub fn new() -> Self {
        PhyloXmlParser { leaf_info: None }
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

    /// Parses a phyloXML document.
    ///
    /// # Arguments
    /// * `input` - The document text
    /// * `sequences` - Side table receiving residue sequences found in
    ///   `mol_seq` elements, keyed by node name
    ///
    /// # Returns
    /// The parsed tree with both consistency passes run, or `None` if
    /// the document holds no `phylogeny > clade` structure.
    pub fn parse(&self, input: &str, sequences: &mut SequenceStore) -> Option<Tree> {
        let document = xml::parse_document(input)?;
        let phylogeny = document.find("phylogeny")?;
        let clade = phylogeny.child("clade")?;

        let mut tree = Tree::new();
        let root = self.parse_clade(clade, None, &mut tree, sequences);
        tree.set_root(root);
        tree[root].length = 0.0;
        tree.recount();
        self.merge_leaf_info(&mut tree);
        tree.process_nodes();
        debug!(
            "parsed phyloxml tree: {} leaves, {} sequences collected",
            tree.root().leaf_count(),
            sequences.len()
        );
        Some(tree)
    }

    /// Parses one `clade` element into a node, descending into nested
    /// clades first.
    fn parse_clade(
        &self,
        clade: &XmlElement,
        parent: Option<NodeId>,
        tree: &mut Tree,
        sequences: &mut SequenceStore,
    ) -> NodeId {
        let id = tree.new_node(parent);
        for nested in clade.children_named("clade") {
            let child = self.parse_clade(nested, Some(id), tree, sequences);
            tree[id].children.push(child);
        }

        let length_text = clade
            .attr("branch_length")
            .map(str::to_string)
            .or_else(|| clade.child_text("branch_length").map(str::to_string))
            .unwrap_or_default();
        tree[id].length = round_float(length_text.trim().parse().unwrap_or(f64::NAN), 4);

        if let Some(name) = clade.child_text("name") {
            let name = name.to_string();
            tree[id].info.insert("gene_id".to_string(), name.clone());
            tree[id].name = name;
        }

        for confidence in clade.children_named("confidence") {
            if let Some(kind) = confidence.attr("type") {
                tree[id]
                    .info
                    .insert(kind.to_string(), confidence.text.trim().to_string());
            }
        }

        if let Some(color) = clade.attr("color") {
            tree[id].color = Some(color.to_string());
        } else if let Some(rgb) = clade.child("color") {
            let red = rgb.child_text("red").unwrap_or_default();
            let green = rgb.child_text("green").unwrap_or_default();
            let blue = rgb.child_text("blue").unwrap_or_default();
            tree[id].color = Some(format!("rgb({red},{green},{blue})"));
        }

        if let Some(taxonomy) = clade.child("taxonomy") {
            if let Some(scientific) = taxonomy.child_text("scientific_name") {
                tree[id]
                    .info
                    .insert("scientific_name".to_string(), scientific.to_string());
            }
            let species = taxonomy
                .child_text("common_name")
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .or_else(|| tree[id].info.get("scientific_name").cloned())
                .unwrap_or_default()
                .replace('_', " ");
            tree[id].info.insert("species".to_string(), species);
            if let Some(taxon_id) = taxonomy.child_text("id") {
                tree[id]
                    .info
                    .insert("taxon_id".to_string(), taxon_id.to_string());
            }
        }

        if let Some(sequence) = clade.child("sequence") {
            if let Some(gene) = sequence.child_text("name") {
                tree[id].info.insert("gene".to_string(), gene.to_string());
            }
            if let Some(residues) = sequence.child_text("mol_seq") {
                if !tree[id].name.is_empty() {
                    sequences.insert(tree[id].name.clone(), residues);
                }
            }
            if let Some(accession) = sequence.child_text("accession") {
                tree[id]
                    .info
                    .insert("accession".to_string(), accession.to_string());
            }
        }

        if tree[id].name.is_empty() {
            let species = tree[id].info.get("species").cloned().unwrap_or_default();
            tree[id].name = if !species.is_empty() {
                species
            } else if tree[id].children.is_empty() {
                format!("Sequence {id}")
            } else {
                format!("Node {id}")
            };
        }
        tree[id].name = tree[id].name.trim().to_string();

        if let Some(events) = clade.child("events") {
            if let Some(duplications) = events.child_text("duplications") {
                tree[id]
                    .info
                    .insert("duplications".to_string(), duplications.to_string());
            }
            if let Some(speciations) = events.child_text("speciations") {
                tree[id]
                    .info
                    .insert("speciations".to_string(), speciations.to_string());
            }
        }

        tree[id].kind = if tree[id].children.is_empty() {
            NodeKind::Label
        } else {
            NodeKind::Stem
        };
        id
    }

    /// Merges the external per-leaf metadata table into matching leaves.
    fn merge_leaf_info(&self, tree: &mut Tree) {
        let Some(table) = self.leaf_info else { return };
        for id in tree.flatten(tree.root_id()) {
            if !tree[id].children.is_empty() {
                continue;
            }
            let name = tree[id].name.clone();
            if let Some(extra) = table.get(&name) {
                for (key, value) in extra {
                    tree[id].info.insert(key.clone(), value.clone());
                }
            }
        }
    }
}
