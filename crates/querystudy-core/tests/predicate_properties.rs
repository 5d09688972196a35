#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Predicate combination: chained filters and one conjunction are the same
//! condition regardless of grouping or order

use proptest::prelude::*;
use querystudy_core::query::{select_from, Predicate, QMember};

fn conjuncts(p: &Predicate) -> Vec<Predicate> {
    match p {
        Predicate::And(parts) => parts.iter().flat_map(conjuncts).collect(),
        other => vec![other.clone()],
    }
}

fn sorted(mut parts: Vec<Predicate>) -> Vec<String> {
    let mut keys: Vec<String> = parts.drain(..).map(|p| format!("{:?}", p)).collect();
    keys.sort();
    keys
}

fn age_predicates(bounds: &[i32]) -> Vec<Predicate> {
    let m = QMember::new("m");
    bounds
        .iter()
        .enumerate()
        .map(|(i, b)| if i % 2 == 0 { m.age.goe(*b) } else { m.age.loe(*b) })
        .collect()
}

proptest! {
    #[test]
    fn chained_filter_equals_single_conjunction(bounds in prop::collection::vec(0i32..100, 1..6)) {
        let m = QMember::new("m");
        let preds = age_predicates(&bounds);

        let mut chained = select_from(&m);
        for p in preds.iter().cloned() {
            chained = chained.filter(p);
        }
        let chained = chained.build().unwrap();

        let single = select_from(&m)
            .filter(Predicate::all(preds.clone()).unwrap())
            .build()
            .unwrap();

        prop_assert_eq!(chained.model(), single.model());
    }

    #[test]
    fn conjunction_is_associative_and_commutative(
        bounds in prop::collection::vec(0i32..100, 3..6),
        rotate in 0usize..6,
    ) {
        let preds = age_predicates(&bounds);
        let left_nested = preds.iter().cloned().reduce(Predicate::and).unwrap();

        let mut rotated = preds.clone();
        let by = rotate % rotated.len();
        rotated.rotate_left(by);
        let right_nested = rotated
            .into_iter()
            .rev()
            .reduce(|acc, p| p.and(acc))
            .unwrap();

        prop_assert_eq!(
            sorted(conjuncts(&left_nested)),
            sorted(conjuncts(&right_nested))
        );
    }
}
