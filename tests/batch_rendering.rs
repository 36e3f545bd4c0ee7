mod common;

use cardfetch::batch::Batch;
use cardfetch::collection::Collection;
use cardfetch::config::Settings;
use cardfetch::error::FetchError;
use cardfetch::transform::Processors;
use common::{Fixture, placeholder, vocab_block};

fn setup() -> (Fixture, Vec<u64>) {
    let fixture = Fixture::new();
    let words = [("一", "one"), ("二", "two"), ("三", "three"), ("四", "four"), ("五", "five")];
    let mut sentences = Vec::new();
    for (kanji, meaning) in words {
        fixture.vocab(kanji, "", meaning, fixture.vocab_deck);
        sentences.push(fixture.sentence(&format!("{kanji}つ"), kanji).id());
    }
    (fixture, sentences)
}

#[test]
fn rows_come_back_in_input_order() {
    let (fixture, sentences) = setup();
    let settings = Settings {
        workers: 3,
        ..Settings::default()
    };
    let processors = Processors::default();
    let template = format!("{{{{Expression}}}}={}", placeholder(&vocab_block("none", "")));
    let mut notes = fixture.store.notes_of_type(fixture.sentence).unwrap();
    assert_eq!(notes, sentences);
    notes.reverse();
    let report = Batch::new(&fixture.store, &settings, &processors).run(&template, "{{Kanji}}.txt", &notes, None);
    assert!(!report.cancelled);
    let rendered: Vec<(u64, String, String)> = report
        .rows
        .into_iter()
        .map(|row| (row.note, row.label, row.output.unwrap()))
        .collect();
    assert_eq!(
        rendered,
        vec![
            (notes[0], "五.txt".to_string(), "五つ=five".to_string()),
            (notes[1], "四.txt".to_string(), "四つ=four".to_string()),
            (notes[2], "三.txt".to_string(), "三つ=three".to_string()),
            (notes[3], "二.txt".to_string(), "二つ=two".to_string()),
            (notes[4], "一.txt".to_string(), "一つ=one".to_string()),
        ]
    );
}

#[test]
fn invoking_deck_comes_from_the_first_card_unless_given() {
    let (fixture, sentences) = setup();
    let settings = Settings::default();
    let processors = Processors::default();
    let template = placeholder(&vocab_block("none", "deck-allow-list=['Japanese::Reading']"));
    let batch = Batch::new(&fixture.store, &settings, &processors);
    let own_deck = batch.run(&template, "", &sentences[..1], None);
    assert_eq!(own_deck.rows[0].output.as_deref().unwrap(), "one");
    let elsewhere = batch.run(&template, "", &sentences[..1], Some(fixture.other_deck));
    assert_eq!(elsewhere.rows[0].output.as_deref().unwrap(), "");
}

#[test]
fn cancelled_batch_renders_nothing_more() {
    let (fixture, sentences) = setup();
    let settings = Settings::default();
    let processors = Processors::default();
    let batch = Batch::new(&fixture.store, &settings, &processors);
    batch.cancel_token().cancel();
    let report = batch.run("{{Expression}}", "", &sentences, None);
    assert!(report.cancelled);
    assert!(report.rows.is_empty());
}

#[test]
fn empty_input_is_an_empty_report() {
    let (fixture, _) = setup();
    let settings = Settings::default();
    let processors = Processors::default();
    let report = Batch::new(&fixture.store, &settings, &processors).run("{{Expression}}", "", &[], None);
    assert!(report.rows.is_empty());
    assert!(!report.cancelled);
}

#[test]
fn unknown_note_is_an_error_row() {
    let (fixture, sentences) = setup();
    let settings = Settings::default();
    let processors = Processors::default();
    let missing = sentences.iter().max().unwrap() + 1000;
    let report = Batch::new(&fixture.store, &settings, &processors).run(
        "{{Expression}}",
        "",
        &[sentences[0], missing],
        None,
    );
    assert_eq!(report.rows.len(), 2);
    assert_eq!(report.rows[0].output.as_deref().unwrap(), "一つ");
    assert_eq!(report.rows[1].note, missing);
    assert!(matches!(report.rows[1].output, Err(FetchError::Persistence(_))));
}
