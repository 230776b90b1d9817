use std::collections::BTreeSet;

use crossword_generator::letters::{full_word_set, is_makeable, letter_counts, match_words};
use crossword_generator::synthesize;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

mod common;

fn word_strategy() -> impl Strategy<Value = String> {
    "[A-E]{2,8}"
}

proptest! {
    #[test]
    fn every_placed_word_is_extracted(words in proptest::collection::vec(word_strategy(), 1..12), seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let layout = synthesize(&words, &mut rng);
        prop_assert!(!layout.is_empty());
        prop_assert!(layout.num_rows() <= 14 && layout.num_columns() <= 14);
        let extracted = layout.word_set(2);
        for placement in layout.placements() {
            prop_assert!(extracted.contains(&placement.word), "{} missing from {:?}", placement.word, extracted);
        }
        let inputs: BTreeSet<&String> = words.iter().collect();
        for placement in layout.placements() {
            prop_assert!(inputs.contains(&placement.word));
        }
    }

    #[test]
    fn matched_words_are_constructible(seed in "[A-Z]{1,9}") {
        let dictionary = common::word_list();
        let seed_letters = letter_counts(&seed).unwrap();
        for word in match_words(&seed, &dictionary) {
            prop_assert!(is_makeable(&word, &seed_letters));
            prop_assert!(word.len() <= seed.len());
        }
    }

    #[test]
    fn full_word_set_respects_minimum_length(seed in "[A-Z]{4,9}", min_word_length in 1usize..6) {
        let dictionary = common::word_list();
        let matched: BTreeSet<String> = match_words(&seed, &dictionary).into_iter().collect();
        let full = full_word_set(&seed, &dictionary, min_word_length);
        prop_assert!(full.is_subset(&matched));
        prop_assert!(full.iter().all(|w| w.len() >= min_word_length));
        let dropped = matched.difference(&full).all(|w| w.len() < min_word_length);
        prop_assert!(dropped);
    }
}

#[test]
fn crane_scenario_matches_all_short_words() {
    let dictionary: Vec<String> = ["CAR", "RAN", "CANE", "ACNE", "ARC"].iter().map(|w| w.to_string()).collect();
    let full = full_word_set("CRANE", &dictionary, 3);
    assert_eq!(full, dictionary.iter().cloned().collect());
}
