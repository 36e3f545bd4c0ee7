mod common;

use cardfetch::collection::Deck;
use cardfetch::gate::DeckTree;
use cardfetch::resolve::Resolved;
use common::{Fixture, placeholder, vocab_block};

fn setup() -> Fixture {
    let fixture = Fixture::new();
    fixture.vocab("猫", "ねこ", "cat", fixture.vocab_deck);
    fixture
}

#[test]
fn deck_outside_the_allow_list_yields_nothing() {
    let fixture = setup();
    let invoking = fixture.sentence("猫がいる", "猫");
    let block = vocab_block("none", "deck-allow-list=['Japanese::Vocab']");
    let resolved = fixture.resolve(&block, &invoking, fixture.reading_deck).unwrap();
    assert_eq!(resolved, Resolved::Excluded);
    assert_eq!(resolved.text(), "");
}

#[test]
fn exclusion_wins_over_otherwise_invalid_arguments() {
    let fixture = setup();
    let invoking = fixture.sentence("猫がいる", "猫");
    let block = "container-by-name='No Such Deck'; type-by-name='No Such Type'; match-field='Nope'; \
                 pick-policy='least_reps[7]'; destination-field='Nope'; deck-allow-list=['Other']";
    let resolved = fixture.resolve(block, &invoking, fixture.reading_deck).unwrap();
    assert_eq!(resolved, Resolved::Excluded);
}

#[test]
fn listed_deck_is_allowed() {
    let fixture = setup();
    let invoking = fixture.sentence("猫がいる", "猫");
    let block = vocab_block("none", "deck-allow-list=['Other', 'japanese::reading']");
    assert_eq!(fixture.resolve(&block, &invoking, fixture.reading_deck).unwrap().text(), "cat");
}

#[test]
fn listed_ancestor_allows_nested_decks() {
    let fixture = setup();
    let invoking = fixture.sentence("猫がいる", "猫");
    let block = vocab_block("none", "deck-allow-list=['Japanese']");
    assert_eq!(fixture.resolve(&block, &invoking, fixture.reading_deck).unwrap().text(), "cat");
    assert_eq!(fixture.resolve(&block, &invoking, fixture.extra_deck).unwrap().text(), "cat");
    assert_eq!(
        fixture.resolve(&block, &invoking, fixture.other_deck).unwrap(),
        Resolved::Excluded
    );
}

#[test]
fn listing_a_child_does_not_allow_its_parent() {
    let fixture = setup();
    let invoking = fixture.sentence("猫がいる", "猫");
    let block = vocab_block("none", "deck-allow-list=['Japanese::Reading']");
    assert_eq!(
        fixture.resolve(&block, &invoking, fixture.japanese).unwrap(),
        Resolved::Excluded
    );
}

#[test]
fn allow_list_entries_are_interpolated() {
    let fixture = setup();
    // the Expression field names the deck the placeholder may run in
    let invoking = fixture.sentence("Japanese::Reading", "猫");
    let block = vocab_block("none", "deck-allow-list=['{{Expression}}']");
    assert_eq!(fixture.resolve(&block, &invoking, fixture.reading_deck).unwrap().text(), "cat");
    assert_eq!(
        fixture.resolve(&block, &invoking, fixture.other_deck).unwrap(),
        Resolved::Excluded
    );
}

#[test]
fn empty_allow_list_allows_everywhere() {
    let fixture = setup();
    let invoking = fixture.sentence("猫がいる", "猫");
    let block = vocab_block("none", "deck-allow-list=[]");
    assert_eq!(fixture.resolve(&block, &invoking, fixture.other_deck).unwrap().text(), "cat");
}

#[test]
fn excluded_placeholder_renders_as_empty_text() {
    let fixture = setup();
    let invoking = fixture.sentence("猫がいる", "猫");
    let template = format!(
        "[{}]",
        placeholder(&vocab_block("none", "deck-allow-list=['Other']"))
    );
    assert_eq!(fixture.render(&template, &invoking, fixture.reading_deck), "[]");
}

#[test]
fn a_deck_path_taken_twice_keeps_the_first_deck() {
    let deck = |id, name: &str| Deck {
        id,
        name: name.to_string(),
    };
    let tree = DeckTree::new([deck(1, "Kanji"), deck(2, "Kanji::N5"), deck(3, " kanji :: n5 ")]);
    assert_eq!(tree.len(), 2);
    assert_eq!(tree.id("KANJI::N5"), Some(2));
    assert_eq!(tree.path(3), None);
    assert_eq!(tree.descendants(1).iter().collect::<Vec<_>>(), vec![1, 2]);
}
