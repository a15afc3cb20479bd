use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use phyledit::newick::{parse_str, to_newick};

/// Builds a balanced Newick string with 2^depth leaves.
fn balanced_newick(depth: usize) -> String {
    fn subtree(depth: usize, next: &mut usize) -> String {
        if depth == 0 {
            let label = format!("t{next}:0.5");
            *next += 1;
            label
        } else {
            format!(
                "({},{}):0.25",
                subtree(depth - 1, next),
                subtree(depth - 1, next)
            )
        }
    }
    let mut next = 0;
    format!("{};", subtree(depth, &mut next))
}

fn newick_parsing(c: &mut Criterion) {
    for depth in [8, 12] {
        let input = balanced_newick(depth);
        c.bench_function(&format!("parse_{}_leaves", 1 << depth), |b| {
            b.iter(|| parse_str(black_box(&input)));
        });
    }
}

fn newick_writing(c: &mut Criterion) {
    for depth in [8, 12] {
        let tree = parse_str(balanced_newick(depth));
        c.bench_function(&format!("write_{}_leaves", 1 << depth), |b| {
            b.iter(|| to_newick(black_box(&tree)));
        });
    }
}

criterion_group!(parsing, newick_parsing);
criterion_group! {
    name = writing;
    config = Criterion::default().sample_size(50);
    targets = newick_writing
}
criterion_main!(parsing, writing);
