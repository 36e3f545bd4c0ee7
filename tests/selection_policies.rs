mod common;

use cardfetch::collection::Collection;
use cardfetch::error::{FetchError, ResolutionError};
use cardfetch::resolve::Resolved;
use common::{Fixture, placeholder, values, vocab_block};

// Three vocab notes for 水 whose ordinal 0 cards were reviewed 5, 2 and 9 times.
fn water() -> (Fixture, Vec<u64>) {
    let fixture = Fixture::new();
    let mut notes = Vec::new();
    for (meaning, reps) in [("water (5)", 5), ("water (2)", 2), ("water (9)", 9)] {
        let note = fixture.vocab("水", "みず", meaning, fixture.vocab_deck);
        let card = fixture.store.cards(note).unwrap()[0].id;
        fixture.store.set_reps(card, reps).unwrap();
        notes.push(note);
    }
    (fixture, notes)
}

#[test]
fn least_reps_picks_the_least_reviewed_card() {
    let (fixture, notes) = water();
    let invoking = fixture.sentence("水を飲む", "水");
    let resolved = fixture
        .resolve(&vocab_block("least_reps", ""), &invoking, fixture.reading_deck)
        .unwrap();
    assert_eq!(values(&resolved), vec![notes[1]]);
    assert_eq!(resolved.text(), "water (2)");

    let rendered = fixture.render(&placeholder(&vocab_block("least_reps[0]", "")), &invoking, fixture.reading_deck);
    assert_eq!(rendered, "water (2)");
}

#[test]
fn least_reps_orders_several_results_by_reps() {
    let (fixture, _) = water();
    let invoking = fixture.sentence("水を飲む", "水");
    let resolved = fixture
        .resolve(
            &vocab_block("least_reps", "result-count='2'; separator=' | '"),
            &invoking,
            fixture.reading_deck,
        )
        .unwrap();
    assert_eq!(resolved.text(), "water (2) | water (5)");
}

#[test]
fn least_reps_orders_all_results_when_exactly_that_many_match() {
    let (fixture, notes) = water();
    let invoking = fixture.sentence("水を飲む", "水");
    let resolved = fixture
        .resolve(&vocab_block("least_reps", "result-count='3'"), &invoking, fixture.reading_deck)
        .unwrap();
    assert_eq!(values(&resolved), vec![notes[1], notes[0], notes[2]]);
    assert_eq!(resolved.text(), "water (2),water (5),water (9)");
}

#[test]
fn random_stable_draws_a_permutation_when_exactly_that_many_match() {
    let (fixture, notes) = water();
    let invoking = fixture.sentence("水を飲む", "水");
    let block = vocab_block("random_stable", "result-count='3'");
    let drawn = values(&fixture.resolve(&block, &invoking, fixture.reading_deck).unwrap());
    let mut sorted = drawn.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, notes);
    assert_eq!(values(&fixture.resolve(&block, &invoking, fixture.reading_deck).unwrap()), drawn);
}

#[test]
fn least_reps_with_ordinal_skips_notes_without_that_card() {
    let (fixture, notes) = water();
    // only the most reviewed note has a card for the second template
    let second = fixture.store.add_card(notes[2], fixture.vocab_deck, 1).unwrap();
    fixture.store.set_reps(second, 40).unwrap();
    let invoking = fixture.sentence("水を飲む", "水");
    let resolved = fixture
        .resolve(&vocab_block("least_reps[1]", ""), &invoking, fixture.reading_deck)
        .unwrap();
    assert_eq!(values(&resolved), vec![notes[2]]);
    assert_eq!(resolved.text(), "water (9)");
}

#[test]
fn least_reps_with_ordinal_and_no_such_cards_is_empty() {
    let (fixture, _) = water();
    let invoking = fixture.sentence("水を飲む", "水");
    let resolved = fixture
        .resolve(&vocab_block("least_reps[1]", ""), &invoking, fixture.reading_deck)
        .unwrap();
    assert_eq!(resolved.text(), "");
}

#[test]
fn ordinal_beyond_the_templates_is_a_resolution_error() {
    let (fixture, _) = water();
    let invoking = fixture.sentence("水を飲む", "水");
    let error = fixture
        .resolve(&vocab_block("least_reps[2]", ""), &invoking, fixture.reading_deck)
        .unwrap_err();
    assert!(matches!(
        error,
        FetchError::Resolution(ResolutionError::InvalidOrdinal {
            ordinal: 2,
            templates: 2,
            ..
        })
    ));
}

#[test]
fn random_stable_repeats_for_the_same_query_shape() {
    let fixture = Fixture::new();
    for i in 0..20 {
        fixture.vocab("木", "き", &format!("tree {i}"), fixture.vocab_deck);
    }
    let first = fixture.sentence("木の下", "木");
    let second = fixture.sentence("大きな木", "木");
    let block = vocab_block("random_stable", "result-count='3'");
    let drawn = values(&fixture.resolve(&block, &first, fixture.reading_deck).unwrap());
    assert_eq!(drawn.len(), 3);
    for _ in 0..5 {
        assert_eq!(values(&fixture.resolve(&block, &first, fixture.reading_deck).unwrap()), drawn);
        // a different invoking note with the same query shape agrees
        assert_eq!(values(&fixture.resolve(&block, &second, fixture.reading_deck).unwrap()), drawn);
    }
}

#[test]
fn random_draws_distinct_candidates() {
    let fixture = Fixture::new();
    let mut notes = Vec::new();
    for i in 0..10 {
        notes.push(fixture.vocab("木", "き", &format!("tree {i}"), fixture.vocab_deck));
    }
    let invoking = fixture.sentence("木の下", "木");
    let drawn = values(
        &fixture
            .resolve(&vocab_block("random", "result-count='4'"), &invoking, fixture.reading_deck)
            .unwrap(),
    );
    assert_eq!(drawn.len(), 4);
    let mut distinct = drawn.clone();
    distinct.sort_unstable();
    distinct.dedup();
    assert_eq!(distinct.len(), 4);
    assert!(drawn.iter().all(|note| notes.contains(note)));
}

#[test]
fn none_takes_the_first_candidates_in_store_order() {
    let (fixture, notes) = water();
    let invoking = fixture.sentence("水を飲む", "水");
    let resolved = fixture
        .resolve(&vocab_block("none", "result-count='2'"), &invoking, fixture.reading_deck)
        .unwrap();
    assert_eq!(values(&resolved), notes[..2].to_vec());
}

#[test]
fn asking_for_more_than_there_are_returns_all_in_store_order() {
    let fixture = Fixture::new();
    let first = fixture.vocab("火", "ひ", "fire", fixture.vocab_deck);
    let second = fixture.vocab("火", "か", "Tuesday", fixture.vocab_deck);
    let invoking = fixture.sentence("火をつける", "火");
    for policy in ["none", "random", "random_stable", "least_reps"] {
        let resolved = fixture
            .resolve(&vocab_block(policy, "result-count='5'"), &invoking, fixture.reading_deck)
            .unwrap();
        assert_eq!(values(&resolved), vec![first, second], "policy {policy}");
        assert_eq!(resolved.text(), "fire,Tuesday", "policy {policy}");
    }
}

#[test]
fn nested_decks_are_searched_and_suspended_cards_are_not() {
    let fixture = Fixture::new();
    let nested = fixture.vocab("山", "やま", "mountain", fixture.extra_deck);
    let suspended = fixture.vocab("山", "さん", "Mt.", fixture.vocab_deck);
    let card = fixture.store.cards(suspended).unwrap()[0].id;
    fixture.store.set_suspended(card, true).unwrap();
    fixture.vocab("山", "やま", "elsewhere", fixture.other_deck);
    let invoking = fixture.sentence("山に登る", "山");
    let resolved = fixture
        .resolve(&vocab_block("none", "result-count='5'"), &invoking, fixture.reading_deck)
        .unwrap();
    assert_eq!(values(&resolved), vec![nested]);
}

#[test]
fn no_candidates_is_an_empty_result() {
    let (fixture, _) = water();
    let invoking = fixture.sentence("空を見る", "空");
    let resolved = fixture
        .resolve(&vocab_block("none", ""), &invoking, fixture.reading_deck)
        .unwrap();
    assert_eq!(resolved, Resolved::NoMatch);
    // an empty match text would match everything, so it matches nothing
    let invoking = fixture.sentence("…", "");
    let resolved = fixture
        .resolve(&vocab_block("none", ""), &invoking, fixture.reading_deck)
        .unwrap();
    assert_eq!(resolved, Resolved::NoMatch);
}
