//! Benchmarks for the core matcher and composition.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rand::{Rng, SeedableRng};

use akh_match::config::MatcherConfig;
use akh_match::compose::PatternComposer;
use akh_match::matcher::PatternMatcher;
use akh_match::pattern::{Pattern, Term};
use akh_match::store::AtomSpace;

/// 1,000 concepts, each inheriting from one of 20 categories.
fn taxonomy() -> AtomSpace {
    let space = AtomSpace::new();
    let mut rng = rand::rngs::StdRng::seed_from_u64(0);
    let categories: Vec<_> = (0..20)
        .map(|i| space.concept(&format!("category-{i}")).unwrap())
        .collect();
    for i in 0..1000 {
        let entity = space.concept(&format!("entity-{i}")).unwrap();
        let parent = categories[rng.gen_range(0..categories.len())];
        space.inheritance(entity, parent).unwrap();
    }
    for pair in categories.windows(2) {
        space.inheritance(pair[0], pair[1]).unwrap();
    }
    space
}

fn bench_single_clause(c: &mut Criterion) {
    let space = taxonomy();
    let matcher = PatternMatcher::new(&space, MatcherConfig::default());
    let pattern = Pattern::new(Term::inheritance(
        Term::variable("x"),
        Term::concept("category-3"),
    ));

    c.bench_function("match_isa_1k", |bench| {
        bench.iter(|| black_box(matcher.match_pattern(&pattern).unwrap()))
    });
}

fn bench_conjunction(c: &mut Criterion) {
    let space = taxonomy();
    let matcher = PatternMatcher::new(&space, MatcherConfig::default());
    let pattern = Pattern::new(Term::and(vec![
        Term::inheritance(Term::variable("x"), Term::variable("y")),
        Term::inheritance(Term::variable("y"), Term::concept("category-10")),
    ]));

    c.bench_function("match_two_hop_1k", |bench| {
        bench.iter(|| black_box(matcher.match_pattern(&pattern).unwrap()))
    });
}

fn bench_compose_and(c: &mut Criterion) {
    let space = taxonomy();
    let mut composer = PatternComposer::new(PatternMatcher::new(&space, MatcherConfig::default()));
    composer.register(
        "left",
        Pattern::new(Term::inheritance(Term::variable("x"), Term::concept("category-1"))),
    );
    composer.register(
        "right",
        Pattern::new(Term::inheritance(Term::variable("x"), Term::variable("y"))),
    );

    c.bench_function("compose_and_1k", |bench| {
        bench.iter(|| {
            // Re-registering clears the cache so every iteration searches.
            composer.register(
                "left",
                Pattern::new(Term::inheritance(Term::variable("x"), Term::concept("category-1"))),
            );
            black_box(composer.compose_and(&["left", "right"]).unwrap())
        })
    });
}

criterion_group!(benches, bench_single_clause, bench_conjunction, bench_compose_and);
criterion_main!(benches);
