use phyledit::edit::{EditError, TreeEditor};
use phyledit::model::{NodeKind, SequenceStore, Tree};
use phyledit::newick::{parse_str, to_newick};

fn editor_tree(newick: &str) -> (Tree, SequenceStore) {
    (parse_str(newick), SequenceStore::new())
}

/// Every node's leaf count must equal the sum over its children, and the
/// visible count can never exceed it.
fn assert_count_invariants(tree: &Tree) {
    for id in tree.flatten(tree.root_id()) {
        let node = &tree[id];
        if node.is_leaf() {
            continue;
        }
        let sum: usize = node
            .children()
            .iter()
            .map(|&c| {
                let child = &tree[c];
                if child.is_leaf() {
                    usize::from(!(child.is_hidden() && child.kind() == NodeKind::Ancestral))
                } else {
                    child.leaf_count()
                }
            })
            .sum();
        assert_eq!(node.leaf_count(), sum, "leaf count mismatch at node {id}");
        assert!(node.visible_leaf_count() <= node.leaf_count());
    }
}

// --- SWAP / LADDERIZE ---

#[test]
fn test_swap_exchanges_first_and_last_child() {
    let (mut tree, seqs) = editor_tree("(A:1,(B:2,C:3)D:4)Root;");
    let d = tree.find_by_name("D").unwrap();
    let record = TreeEditor::new(&mut tree, &seqs).swap(d).unwrap();
    assert_eq!(record.name, "Swap nodes");
    assert_eq!(record.category, "tree");
    assert_eq!(to_newick(&tree), "(A:1,(C:3,B:2)D:4)Root;");
}

#[test]
fn test_swap_on_leaf_is_rejected() {
    let (mut tree, seqs) = editor_tree("(A:1,B:2)R;");
    let a = tree.find_by_name("A").unwrap();
    assert_eq!(
        TreeEditor::new(&mut tree, &seqs).swap(a).unwrap_err(),
        EditError::NotAStem
    );
    assert_eq!(to_newick(&tree), "(A:1,B:2)R;");
}

#[test]
fn test_ladderize_orders_larger_clades_first_and_is_idempotent() {
    let (mut tree, seqs) = editor_tree("(A:1,(B:1,(C:1,(D:1,E:1)F:1)G:1)H:1)R;");
    let root = tree.root_id();
    TreeEditor::new(&mut tree, &seqs).ladderize(root).unwrap();
    let once = to_newick(&tree);
    assert_eq!(once, "((((D:1,E:1)F:1,C:1)G:1,B:1)H:1,A:1)R;");

    TreeEditor::new(&mut tree, &seqs).ladderize(root).unwrap();
    assert_eq!(to_newick(&tree), once);
}

// --- REMOVE ---

#[test]
fn test_remove_collapses_binary_parent() {
    let (mut tree, seqs) = editor_tree("(A:1,(B:2,C:3)D:4)Root;");
    let c = tree.find_by_name("C").unwrap();
    let record = TreeEditor::new(&mut tree, &seqs).remove(c).unwrap();

    assert_eq!(record.name, "Remove node");
    // D had exactly two children, so B is spliced onto the root with the
    // lengths summed.
    assert_eq!(to_newick(&tree), "(A:1,B:6)Root;");
    assert_eq!(tree.root().leaf_count(), 2);
    assert!(tree.is_valid());
    assert!(tree.get(c).is_none());
    assert_count_invariants(&tree);
}

#[test]
fn test_remove_from_multifurcating_parent() {
    let (mut tree, seqs) = editor_tree("(A:1,B:2,C:3)R;");
    let b = tree.find_by_name("B").unwrap();
    TreeEditor::new(&mut tree, &seqs).remove(b).unwrap();
    assert_eq!(to_newick(&tree), "(A:1,C:3)R;");
    assert!(tree.is_valid());
}

#[test]
fn test_remove_root_child_prunes_to_sibling_subtree() {
    let (mut tree, seqs) = editor_tree("(A:1,(B:2,C:3)D:4)R;");
    let a = tree.find_by_name("A").unwrap();
    let record = TreeEditor::new(&mut tree, &seqs).remove(a).unwrap();
    assert_eq!(record.name, "Prune subtree");
    assert_eq!(to_newick(&tree), "(B:2,C:3)D;");
    assert!(tree.is_valid());
}

#[test]
fn test_remove_last_leaf_pair_is_rejected() {
    let (mut tree, seqs) = editor_tree("(A:1,B:2)R;");
    let a = tree.find_by_name("A").unwrap();
    assert_eq!(
        TreeEditor::new(&mut tree, &seqs).remove(a).unwrap_err(),
        EditError::WouldOrphanRoot
    );
    assert_eq!(to_newick(&tree), "(A:1,B:2)R;");
}

#[test]
fn test_remove_root_is_rejected() {
    let (mut tree, seqs) = editor_tree("(A:1,B:2)R;");
    let root = tree.root_id();
    assert_eq!(
        TreeEditor::new(&mut tree, &seqs).remove(root).unwrap_err(),
        EditError::IsRoot
    );
}

// --- REROOT ---

#[test]
fn test_reroot_at_leaf_splits_its_branch() {
    let (mut tree, seqs) = editor_tree("(A:1,(B:2,C:3)D:4)Root;");
    let b = tree.find_by_name("B").unwrap();
    let record = TreeEditor::new(&mut tree, &seqs).reroot(b, None).unwrap();

    assert_eq!(record.name, "Reroot");
    // B's branch splits in half; the old binary root is elided into A.
    assert_eq!(to_newick(&tree), "(B:1,(A:5,C:3)D:1)Root;");
    assert!((tree.total_branch_length() - 10.0).abs() < 1e-9);
    assert!(tree.is_valid());
    assert!(tree.is_altered());
    let d = tree.find_by_name("D").unwrap();
    assert!(tree[d].is_altered());
    assert_count_invariants(&tree);
}

#[test]
fn test_reroot_with_explicit_distance() {
    let (mut tree, seqs) = editor_tree("(A:1,(B:2,C:3)D:4)Root;");
    let d = tree.find_by_name("D").unwrap();
    TreeEditor::new(&mut tree, &seqs).reroot(d, Some(1.0)).unwrap();
    assert_eq!(to_newick(&tree), "((B:2,C:3)D:1,A:4)Root;");
    assert!((tree.total_branch_length() - 10.0).abs() < 1e-9);
}

#[test]
fn test_reroot_clamps_out_of_range_distance() {
    let (mut tree, seqs) = editor_tree("(A:1,(B:2,C:3)D:4)Root;");
    let d = tree.find_by_name("D").unwrap();
    // 40 exceeds D's branch length, so the default midpoint applies.
    TreeEditor::new(&mut tree, &seqs).reroot(d, Some(40.0)).unwrap();
    assert_eq!(to_newick(&tree), "((B:2,C:3)D:2,A:3)Root;");
}

#[test]
fn test_reroot_at_root_is_rejected() {
    let (mut tree, seqs) = editor_tree("(A:1,B:2)R;");
    let root = tree.root_id();
    assert_eq!(
        TreeEditor::new(&mut tree, &seqs).reroot(root, None).unwrap_err(),
        EditError::IsRoot
    );
    assert_eq!(to_newick(&tree), "(A:1,B:2)R;");
}

#[test]
fn test_reroot_preserves_length_sum_and_leaves_across_edits() {
    let (mut tree, seqs) = editor_tree("((A:1,B:2)E:3,(C:4,D:5)F:6)Root;");
    let total = tree.total_branch_length();

    let a = tree.find_by_name("A").unwrap();
    TreeEditor::new(&mut tree, &seqs).reroot(a, None).unwrap();
    assert!((tree.total_branch_length() - total).abs() < 1e-9);

    let c = tree.find_by_name("C").unwrap();
    TreeEditor::new(&mut tree, &seqs).reroot(c, None).unwrap();
    assert!((tree.total_branch_length() - total).abs() < 1e-9);

    for name in ["A", "B", "C", "D"] {
        assert!(tree.find_by_name(name).is_some(), "leaf {name} lost");
    }
    assert_eq!(tree.root().leaf_count(), 4);
    assert!(tree.is_valid());
    assert_count_invariants(&tree);
}

#[test]
fn test_reroot_from_multifurcating_root_keeps_it() {
    let (mut tree, seqs) = editor_tree("(A:1,B:2,(C:3,D:4)E:5)R;");
    let c = tree.find_by_name("C").unwrap();
    let total = tree.total_branch_length();
    TreeEditor::new(&mut tree, &seqs).reroot(c, None).unwrap();
    // The old root keeps its surviving children (multifurcating case:
    // the stale entry is dropped, nothing is merged).
    assert!((tree.total_branch_length() - total).abs() < 1e-9);
    assert_eq!(tree.root().leaf_count(), 4);
    assert!(tree.is_valid());
    let r = tree.find_by_name("R").unwrap();
    assert_eq!(tree[r].children().len(), 2);
}

// --- MOVE ---

#[test]
fn test_move_splits_target_edge() {
    let (mut tree, seqs) = editor_tree("(A:1,(B:2,C:3)D:4,E:5)Root;");
    let c = tree.find_by_name("C").unwrap();
    let a = tree.find_by_name("A").unwrap();
    let record = TreeEditor::new(&mut tree, &seqs).move_to(c, a).unwrap();

    assert_eq!(record.name, "Move node");
    assert_eq!(to_newick(&tree), "((C:3,A:0.5):0.5,B:6,E:5)Root;");
    assert_eq!(tree.root().leaf_count(), 4);
    assert!(tree.is_valid());
    assert_count_invariants(&tree);
}

#[test]
fn test_move_rejections() {
    let (mut tree, seqs) = editor_tree("((X:1,(B:2,C:3)D:4)Y:1,E:5)Root;");
    let before = to_newick(&tree);
    let root = tree.root_id();
    let c = tree.find_by_name("C").unwrap();
    let d = tree.find_by_name("D").unwrap();
    let e = tree.find_by_name("E").unwrap();
    let y = tree.find_by_name("Y").unwrap();

    let mut editor = TreeEditor::new(&mut tree, &seqs);
    assert_eq!(editor.move_to(root, e).unwrap_err(), EditError::IsRoot);
    assert_eq!(editor.move_to(y, e).unwrap_err(), EditError::ChildOfRoot);
    assert_eq!(editor.move_to(d, c).unwrap_err(), EditError::AncestorOfTarget);
    assert_eq!(editor.move_to(d, y).unwrap_err(), EditError::AlreadyInPlace);
    assert_eq!(to_newick(&tree), before);
}

#[test]
fn test_move_next_to_sibling_swaps() {
    let (mut tree, seqs) = editor_tree("(A:1,(B:2,C:3)D:4,E:5)Root;");
    let b = tree.find_by_name("B").unwrap();
    let c = tree.find_by_name("C").unwrap();
    let record = TreeEditor::new(&mut tree, &seqs).move_to(b, c).unwrap();
    assert_eq!(record.name, "Swap nodes");
    assert_eq!(to_newick(&tree), "(A:1,(C:3,B:2)D:4,E:5)Root;");
}

// --- PRUNE ---

#[test]
fn test_prune_keeps_only_subtree() {
    let (mut tree, seqs) = editor_tree("(A:1,(B:2,C:3)D:4)Root;");
    let d = tree.find_by_name("D").unwrap();
    let record = TreeEditor::new(&mut tree, &seqs).prune(d).unwrap();

    assert_eq!(record.name, "Prune subtree");
    assert_eq!(to_newick(&tree), "(B:2,C:3)D;");
    // Pruning realigns nothing.
    assert!(!tree.is_altered());
    assert!(tree.is_valid());
}

// --- VISIBILITY ---

#[test]
fn test_hide_last_visible_sibling_redirects_to_parent_branch() {
    let (mut tree, seqs) = editor_tree("(A:1,(B:2,C:3)D:4)Root;");
    let b = tree.find_by_name("B").unwrap();
    let c = tree.find_by_name("C").unwrap();
    let d = tree.find_by_name("D").unwrap();

    let mut editor = TreeEditor::new(&mut tree, &seqs);
    editor.hide_toggle(c).unwrap();
    editor.hide_toggle(b).unwrap();

    // Hiding B, the last visible child of D, hides D's branch instead:
    // a shown parent never renders with zero visible children.
    assert!(!tree[b].is_hidden());
    assert!(tree[c].is_hidden());
    assert!(tree[d].is_hidden());
    assert_eq!(tree.root().visible_leaf_count(), 1);
    assert_eq!(tree.root().leaf_count(), 3);
    assert_count_invariants(&tree);
}

#[test]
fn test_hide_toggle_root_is_rejected() {
    let (mut tree, seqs) = editor_tree("(A:1,B:2)R;");
    let root = tree.root_id();
    assert_eq!(
        TreeEditor::new(&mut tree, &seqs).hide_toggle(root).unwrap_err(),
        EditError::IsRoot
    );
}

#[test]
fn test_show_subtree_restores_visibility() {
    let (mut tree, seqs) = editor_tree("(A:1,(B:2,C:3)D:4)Root;");
    let b = tree.find_by_name("B").unwrap();
    let c = tree.find_by_name("C").unwrap();
    {
        let mut editor = TreeEditor::new(&mut tree, &seqs);
        editor.hide_toggle(c).unwrap();
        editor.hide_toggle(b).unwrap();
    }
    assert_eq!(tree.root().visible_leaf_count(), 1);

    let root = tree.root_id();
    TreeEditor::new(&mut tree, &seqs)
        .show_subtree(root, false, false)
        .unwrap();
    assert_eq!(tree.root().visible_leaf_count(), 3);
}

// --- ANCESTRAL LEAVES AROUND EDITS ---

#[test]
fn test_ancestral_leaf_survives_reroot() {
    let mut tree = parse_str("(A:1,(B:2,C:3)D:4)Root;");
    let mut seqs = SequenceStore::new();
    seqs.insert("D", "MKVLAW");

    let b = tree.find_by_name("B").unwrap();
    TreeEditor::new(&mut tree, &seqs).reroot(b, None).unwrap();

    // D keeps its name through the reroot, so its ancestral leaf is
    // reinserted as the second child afterwards.
    let d = tree.find_by_name("D").unwrap();
    assert_eq!(tree[d].children().len(), 3);
    let anc = tree[d].children()[1];
    assert_eq!(tree[anc].kind(), NodeKind::Ancestral);
    assert!(tree[anc].is_hidden());
    assert_eq!(tree[anc].name(), "D");

    // Serialization still excludes it.
    assert_eq!(to_newick(&tree), "(B:1,(A:5,C:3)D:1)Root;");
    assert_count_invariants(&tree);

    // A second edit does not double-insert.
    let root = tree.root_id();
    TreeEditor::new(&mut tree, &seqs).swap(root).unwrap();
    let d = tree.find_by_name("D").unwrap();
    assert_eq!(tree[d].children().len(), 3);
}

// --- UNDO SNAPSHOTS ---

#[test]
fn test_change_record_snapshot_matches_tree() {
    let (mut tree, seqs) = editor_tree("(A:1,(B:2,C:3)D:4)Root;");
    let c = tree.find_by_name("C").unwrap();
    let record = TreeEditor::new(&mut tree, &seqs).remove(c).unwrap();

    let restored = parse_str(&record.snapshot);
    assert_eq!(to_newick(&restored), to_newick(&tree));
    assert!(record.description.contains("'C'"));
}
