use std::collections::HashMap;

use phyledit::model::{NodeKind, SequenceStore, Tree};
use phyledit::newick::{NewickStyle, NewickWriter, parse_str, to_newick};
use phyledit::NewickParser;

// --- TESTS NEWICK STRING PARSING ---

#[test]
fn test_basic_tree_structure() {
    let tree = parse_str("(A:1,(B:2,C:3)D:4)Root;");
    let root = tree.root();

    assert_eq!(root.name(), "Root");
    assert_eq!(root.length(), 0.0);
    assert_eq!(root.children().len(), 2);
    assert_eq!(root.leaf_count(), 3);
    assert_eq!(root.visible_leaf_count(), 3);
    assert_eq!(root.node_count(), 2);

    let a = tree.find_by_name("A").unwrap();
    assert!(tree[a].is_leaf());
    assert_eq!(tree[a].kind(), NodeKind::Label);
    assert_eq!(tree[a].length(), 1.0);
    assert_eq!(tree[a].level(), 1);

    let d = tree.find_by_name("D").unwrap();
    assert_eq!(tree[d].kind(), NodeKind::Stem);
    assert_eq!(tree[d].length(), 4.0);
    assert_eq!(tree[d].children().len(), 2);

    let b = tree.find_by_name("B").unwrap();
    assert_eq!(tree[b].level(), 2);
    assert_eq!(tree[b].length_from_root(), 6.0);

    assert_eq!(tree.max_level(), 2);
    assert_eq!(tree.max_length_from_root(), 7.0);
    assert!(tree.is_valid());
}

#[test]
fn test_round_trip_is_exact_for_plain_input() {
    let input = "(A:1,(B:2,C:3)D:4)Root;";
    let tree = parse_str(input);
    assert_eq!(to_newick(&tree), input);
}

#[test]
fn test_quoted_labels_and_underscores() {
    let tree = parse_str("(('Taxon one':1.5,\"Second taxon\":2.5):3,Homo_sapiens:4)R;");
    assert!(tree.find_by_name("Taxon one").is_some());
    assert!(tree.find_by_name("Second taxon").is_some());
    // Underscores in bare labels read as spaces, and write back out as
    // underscores.
    assert!(tree.find_by_name("Homo sapiens").is_some());
    assert!(to_newick(&tree).contains("Homo_sapiens:4"));
}

#[test]
fn test_scientific_notation_branch_lengths() {
    let tree = parse_str("((A:1e-5,B:2.5E+3):1.0e2,C:3.14):0.5;");
    let b = tree.find_by_name("B").unwrap();
    assert_eq!(tree[b].length(), 2500.0);
    // Lengths round to four decimal places; 1e-5 collapses to zero.
    let a = tree.find_by_name("A").unwrap();
    assert_eq!(tree[a].length(), 0.0);
}

#[test]
fn test_root_branch_length_forced_to_zero() {
    let tree = parse_str("(A:1,B:2)Root:7;");
    assert_eq!(tree.root().length(), 0.0);
}

#[test]
fn test_nhx_known_tags() {
    let tree = parse_str(
        "(A:1[&&NHX:S=homo_sapiens:B=99:FOO=bar],B:2[&&NHX:Co=Y])R;",
    );
    let a = tree.find_by_name("A").unwrap();
    assert_eq!(tree[a].info().get("species").unwrap(), "Homo sapiens");
    assert_eq!(tree[a].info().get("bootstrap").unwrap(), "99");
    // Unknown tags are preserved verbatim.
    assert_eq!(tree[a].nhx().get("FOO").unwrap(), "bar");

    let b = tree.find_by_name("B").unwrap();
    assert!(tree[b].is_hidden());
    assert_eq!(tree.root().visible_leaf_count(), 1);
    assert_eq!(tree.root().leaf_count(), 2);
}

#[test]
fn test_nhx_event_tags() {
    let tree = parse_str("(A[&&NHX:Ev=1>5>3],B[&&NHX:D=Y],C[&&NHX:D=N])R;");
    let a = tree.find_by_name("A").unwrap();
    assert_eq!(tree[a].info().get("duplications").unwrap(), "5");
    assert_eq!(tree[a].info().get("speciations").unwrap(), "3");
    assert!(tree[a].is_duplication());

    let b = tree.find_by_name("B").unwrap();
    assert_eq!(tree[b].info().get("duplications").unwrap(), "1");
    let c = tree.find_by_name("C").unwrap();
    assert_eq!(tree[c].info().get("speciations").unwrap(), "1");
}

#[test]
fn test_nhx_display_tags() {
    let tree = parse_str("(A:1[&&NHX:C=255.0.0:CR=7],B:2[&&NHX:BC=darkred])R;");
    let a = tree.find_by_name("A").unwrap();
    assert_eq!(tree[a].color().unwrap(), "rgb(255,0,0)");
    assert_eq!(tree[a].marker_radius().unwrap(), 7);
    let b = tree.find_by_name("B").unwrap();
    assert_eq!(tree[b].branch_color().unwrap(), "darkred");
}

#[test]
fn test_nhx_realign_flag() {
    let tree = parse_str("(A:1,B:2[&&NHX:XN=realign])R;");
    let b = tree.find_by_name("B").unwrap();
    assert!(tree[b].is_altered());
    assert!(tree.is_altered());
}

#[test]
fn test_id_name_remap() {
    let mut id_names = HashMap::new();
    id_names.insert("G1".to_string(), "Gene one".to_string());
    let tree = NewickParser::new("(G1:1,B:1)R;")
        .with_id_names(&id_names)
        .parse();
    assert!(tree.find_by_name("Gene one").is_some());
}

#[test]
fn test_truncated_input_yields_partial_tree() {
    let tree = parse_str("(A:1,(B:2");
    assert!(tree.is_valid());
    assert_eq!(tree.root().leaf_count(), 2);
    assert!(tree.find_by_name("A").is_some());
    assert!(tree.find_by_name("B").is_some());
}

#[test]
fn test_empty_input_does_not_panic() {
    let tree = parse_str("");
    assert!(tree.is_valid());
    assert_eq!(tree.root().leaf_count(), 0);
}

// --- TESTS NEWICK WRITING ---

#[test]
fn test_writer_emits_metadata_block() {
    let tree = parse_str("(A:1[&&NHX:S=homo_sapiens:FOO=bar:Co=Y],B:2)R;");
    let out = NewickWriter::new(NewickStyle::Nhx).write(&tree);
    assert!(out.contains("[&&NHX:FOO=bar:Co=Y:S=Homo_sapiens]"), "got {out}");
}

#[test]
fn test_writer_snapshot_round_trips() {
    let tree = parse_str("(Taxon_one:1,(B:2,C:3)D:4[&&NHX:FOO=bar])Root;");
    let snapshot = NewickWriter::new(NewickStyle::Snapshot).write(&tree);
    // Names are double-quoted verbatim in snapshots.
    assert!(snapshot.contains("\"Taxon one\""), "got {snapshot}");
    let reparsed = parse_str(&snapshot);
    assert_eq!(to_newick(&reparsed), to_newick(&tree));
    let d = reparsed.find_by_name("D").unwrap();
    assert_eq!(reparsed[d].nhx().get("FOO").unwrap(), "bar");
}

#[test]
fn test_writer_without_stem_names() {
    let tree = parse_str("(A:1,(B:2,C:3)D:4)Root;");
    let out = NewickWriter::new(NewickStyle::Plain)
        .without_stem_names()
        .write(&tree);
    assert_eq!(out, "(A:1,(B:2,C:3):4);");
}

#[test]
fn test_writer_name_map() {
    let tree = parse_str("(A:1,B:2)R;");
    let mut name_map = HashMap::new();
    name_map.insert("A".to_string(), "seq0001".to_string());
    let out = NewickWriter::new(NewickStyle::Plain)
        .with_name_map(&name_map)
        .write(&tree);
    assert_eq!(out, "(seq0001:1,B:2)R;");
}

#[test]
fn test_writer_excludes_ancestral_leaves() {
    let mut tree = parse_str("(A:1,(B:2,C:3)D:4[&&NHX:Vis=Y])Root;");
    let mut sequences = SequenceStore::new();
    sequences.insert("D", "MKVL");
    tree.restore_ancestral(&sequences);
    tree.recount();

    let d = tree.find_by_name("D").unwrap();
    assert_eq!(tree[d].children().len(), 3);
    assert_eq!(tree[tree[d].children()[1]].kind(), NodeKind::Ancestral);
    // The restored leaf was flagged visible and counts as a row.
    assert_eq!(tree.root().visible_leaf_count(), 4);

    // Default serialization skips the ancestral leaf but records its
    // visibility.
    assert_eq!(to_newick(&tree), "(A:1,(B:2,C:3)D:4)Root;");
    let out = NewickWriter::new(NewickStyle::Nhx).write(&tree);
    assert_eq!(out, "(A:1,(B:2,C:3)D:4[&&NHX:Vis=Y])Root;");
}

#[test]
fn test_total_branch_length() {
    let tree = parse_str("(A:1,(B:2,C:3)D:4)Root;");
    assert!((tree.total_branch_length() - 10.0).abs() < 1e-9);
}

// --- TESTS STRUCTURAL EQUALITY AFTER ROUND TRIP ---

fn assert_same_topology(left: &Tree, right: &Tree) {
    fn compare(left: &Tree, l: usize, right: &Tree, r: usize) {
        assert_eq!(left[l].name(), right[r].name());
        assert!((left[l].length() - right[r].length()).abs() < 1e-9);
        assert_eq!(left[l].children().len(), right[r].children().len());
        for (&lc, &rc) in left[l].children().iter().zip(right[r].children()) {
            compare(left, lc, right, rc);
        }
    }
    compare(left, left.root_id(), right, right.root_id());
}

#[test]
fn test_round_trip_preserves_topology() {
    let inputs = [
        "(A:1,(B:2,C:3)D:4)Root;",
        "((A:0.1,B:0.2):0.3,(C:0.4,D:0.5):0.6)R;",
        "(A:1,B:2,C:3,D:4)Multi;",
        "('Name with spaces':1,(X:0.5)Single:2)R;",
    ];
    for input in inputs {
        let tree = parse_str(input);
        let reparsed = parse_str(&to_newick(&tree));
        assert_same_topology(&tree, &reparsed);
    }
}
