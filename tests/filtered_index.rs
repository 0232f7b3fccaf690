use stellarview::data::filter::FilteredIndex;
use stellarview::data::session::Unavailable;
use stellarview::Error;

#[derive(Debug, Clone, Copy)]
struct Rec {
    acceptable: bool,
    inference: bool,
}

fn rec(acceptable: bool, inference: bool) -> Rec {
    Rec {
        acceptable,
        inference,
    }
}

/// Deterministic pseudo-random collections of varying length.
fn collections() -> Vec<Vec<Rec>> {
    let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
    let mut next = move || {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        seed
    };
    (0..40)
        .map(|n| {
            (0..n)
                .map(|_| {
                    let bits = next();
                    rec(bits & 1 == 1, bits & 2 == 2)
                })
                .collect()
        })
        .collect()
}

fn both_predicates(data: &Vec<Rec>) -> FilteredIndex<Rec> {
    let mut idx = FilteredIndex::new();
    idx.add_predicate("acceptable", |r: &Rec| r.acceptable, data);
    idx.add_predicate("inference", |r: &Rec| r.inference, data);
    idx
}

#[test]
fn index_map_matches_predicates_exactly() {
    for data in collections() {
        let idx = both_predicates(&data);
        let visible: Vec<usize> = idx.indices().to_vec();
        for (i, r) in data.iter().enumerate() {
            let passes = r.acceptable && r.inference;
            assert_eq!(visible.contains(&i), passes, "record {i} of {}", data.len());
        }
        assert!(visible.windows(2).all(|w| w[0] < w[1]));
        assert!(idx.is_consistent(&data));
    }
}

#[test]
fn visible_to_underlying_round_trips() {
    for data in collections() {
        let idx = both_predicates(&data);
        for row in 0..idx.visible_count() {
            let j = idx.to_underlying(row).unwrap();
            assert_eq!(idx.to_visible(j), Some(row));
        }
    }
}

#[test]
fn underlying_to_visible_round_trips_and_hidden_is_sentinel() {
    for data in collections() {
        let idx = both_predicates(&data);
        for j in 0..data.len() {
            match idx.to_visible(j) {
                Some(row) => assert_eq!(idx.to_underlying(row).unwrap(), j),
                None => assert!(!(data[j].acceptable && data[j].inference)),
            }
        }
        assert_eq!(idx.to_visible(data.len() + 10), None);
    }
}

#[test]
fn predicates_only_shrink_and_clear_restores_everything() {
    for data in collections() {
        let mut idx: FilteredIndex<Rec> = FilteredIndex::new();
        idx.reindex(&data);
        let all = idx.visible_count();
        assert_eq!(all, data.len());

        idx.add_predicate("acceptable", |r: &Rec| r.acceptable, &data);
        let one = idx.visible_count();
        assert!(one <= all);
        idx.add_predicate("inference", |r: &Rec| r.inference, &data);
        let two = idx.visible_count();
        assert!(two <= one);

        idx.remove_predicate("inference", &data).unwrap();
        assert!(idx.visible_count() >= two);

        idx.clear_predicates(&data);
        assert_eq!(idx.visible_count(), data.len());
    }
}

#[test]
fn out_of_range_row_is_an_error() {
    let data = vec![rec(true, true), rec(false, true)];
    let idx = both_predicates(&data);
    assert_eq!(idx.visible_count(), 1);
    match idx.to_underlying(1) {
        Err(Error::OutOfRange { row, len }) => {
            assert_eq!(row, 1);
            assert_eq!(len, 1);
        }
        other => panic!("expected OutOfRange, got {other:?}"),
    }
}

#[test]
fn acceptable_only_scenario() {
    let data: Vec<Rec> = (0..5).map(|i| rec(i % 2 == 0, true)).collect();
    let mut idx = FilteredIndex::new();
    idx.add_predicate("acceptable", |r: &Rec| r.acceptable, &data);

    assert_eq!(idx.visible_count(), 3);
    assert_eq!(idx.to_underlying(0).unwrap(), 0);
    assert_eq!(idx.to_underlying(1).unwrap(), 2);
    assert_eq!(idx.to_underlying(2).unwrap(), 4);
    assert_eq!(idx.to_visible(1), None);
}

#[test]
fn unavailable_collection_is_empty_without_error() {
    let mut idx: FilteredIndex<Rec> = FilteredIndex::new();
    idx.add_predicate("acceptable", |r: &Rec| r.acceptable, &Unavailable);
    idx.reindex(&Unavailable);
    assert_eq!(idx.visible_count(), 0);
    assert!(idx.to_underlying(0).is_err());

    let none: Option<Vec<Rec>> = None;
    idx.reindex(&none);
    assert_eq!(idx.visible_count(), 0);
}

#[test]
fn removing_one_of_two_predicates_recomputes() {
    let data = vec![
        rec(true, true),
        rec(false, true),
        rec(true, false),
        rec(false, false),
        rec(true, true),
        rec(false, true),
    ];
    let mut idx = both_predicates(&data);
    assert_eq!(idx.indices(), &[0, 4]);

    idx.remove_predicate("acceptable", &data).unwrap();
    assert_eq!(idx.indices(), &[0, 1, 4, 5]);
    assert!(!idx.has_predicate("acceptable"));
    assert_eq!(idx.predicate_names().collect::<Vec<_>>(), vec!["inference"]);

    match idx.remove_predicate("acceptable", &data) {
        Err(Error::PredicateNotFound(name)) => assert_eq!(name, "acceptable"),
        other => panic!("expected PredicateNotFound, got {other:?}"),
    }
}

#[test]
fn row_is_visible_bypasses_stale_map() {
    let mut data = vec![rec(true, true), rec(false, true)];
    let idx = both_predicates(&data);
    data[1].acceptable = true;
    assert!(idx.row_is_visible(1, &data));
    assert_eq!(idx.to_visible(1), None);
    assert!(!idx.is_consistent(&data));
}
