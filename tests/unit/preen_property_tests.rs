/*!
 * Property tests for core-text preening
 */

use proptest::prelude::*;

use tuforge::segment::tags::unmark;
use tuforge::segment::{BoundaryMode, Preener};

/// Words, whitespace and every inline tag kind
fn any_piece() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "Hello",
        "world.",
        " ",
        "  ",
        "\t",
        "\u{00A0}",
        "&nbsp;",
        "<x id='1'/>",
        "<x id='2' ctype='image'/>",
        "<bx id='3' rid='1'/>",
        "<ex id='4' rid='1'/>",
        "<bx id='5' rid='2' ctype='bold'/>",
        "<ex id='6' rid='2' ctype='bold'/>",
    ])
}

/// Words, whitespace and singletons only
fn singleton_piece() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "Hi",
        "there",
        " ",
        "\u{00A0}",
        "&nbsp;",
        "<x id='1'/>",
        "<x id='9' ctype='lb'/>",
    ])
}

fn segment(piece: impl Strategy<Value = &'static str>) -> impl Strategy<Value = String> {
    prop::collection::vec(piece, 0..12).prop_map(|pieces| pieces.concat())
}

fn mode(paragraph: bool) -> BoundaryMode {
    if paragraph {
        BoundaryMode::Paragraph
    } else {
        BoundaryMode::Sentence
    }
}

proptest! {
    #[test]
    fn test_preen_should_round_trip_through_unmark(text in segment(any_piece()), paragraph in any::<bool>()) {
        let preened = Preener::default().preen(&text, mode(paragraph));
        prop_assert_eq!(unmark(&preened.to_marked_string()), text.clone());
        prop_assert_eq!(preened.to_plain_string(), text);
    }

    #[test]
    fn test_preen_should_be_idempotent(text in segment(any_piece()), paragraph in any::<bool>()) {
        let preener = Preener::default();
        let once = preener.preen(&text, mode(paragraph));
        let twice = preener.preen(&once.to_marked_string(), mode(paragraph));
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn test_preen_core_should_be_empty_only_without_words(text in segment(singleton_piece())) {
        let preened = Preener::default().preen(&text, BoundaryMode::Sentence);
        let has_words = text.contains("Hi") || text.contains("there");
        prop_assert_eq!(preened.has_core(), has_words);
    }
}
