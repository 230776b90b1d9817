use std::fs;

use crossword_generator::dictionary::{load_optional_word_set, load_word_list};
use crossword_generator::stats::{load_counted_keys, render_counted_keys};
use crossword_generator::{Counts, Dictionary, GeneratorError, KeyKind};

#[test]
fn word_stats_load_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("words.stats.txt");
    fs::write(&path, "# format=v1\n# crosswords_generated=12\ncane:4\nacre:9\n\ncane:5\n").unwrap();
    let parsed = load_counted_keys(&path, KeyKind::Word).unwrap();
    assert_eq!(parsed.crosswords_generated, Some(12));
    assert_eq!(parsed.counts.get("CANE"), Some(&5));
    assert_eq!(parsed.counts.get("ACRE"), Some(&9));
}

#[test]
fn malformed_letter_stats_name_file_and_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("letters.txt");
    fs::write(&path, "e:120\n# note\nth:4\n").unwrap();
    match load_counted_keys(&path, KeyKind::Letter) {
        Err(GeneratorError::StatsParse { path: reported, line, .. }) => {
            assert_eq!(reported, path);
            assert_eq!(line, 3);
        },
        other => panic!("expected a parse error, got {:?}", other),
    }
    let message = load_counted_keys(&path, KeyKind::Letter).unwrap_err().to_string();
    assert!(message.contains("letters.txt:3"));
}

#[test]
fn missing_stats_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.txt");
    assert!(matches!(load_counted_keys(&path, KeyKind::Word), Err(GeneratorError::StatsNotFound { .. })));
}

#[test]
fn rendered_stats_load_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.txt");
    let counts: Counts = [("TONE".to_string(), 3), ("NOTE".to_string(), 3), ("ONES".to_string(), 7)]
        .into_iter()
        .collect();
    let header = vec![("format".to_string(), "v1".to_string()), ("crosswords_generated".to_string(), "4".to_string())];
    let text = render_counted_keys(&header, counts.iter());
    assert_eq!(text, "# format=v1\n# crosswords_generated=4\nones:7\nnote:3\ntone:3\n");
    fs::write(&path, text).unwrap();

    let parsed = load_counted_keys(&path, KeyKind::Word).unwrap();
    assert_eq!(parsed.counts, counts);
    assert_eq!(parsed.crosswords_generated, Some(4));
}

#[test]
fn dictionary_files_are_normalized_and_filtered() {
    let dir = tempfile::tempdir().unwrap();
    let words = dir.path().join("words.txt");
    let forbidden = dir.path().join("forbidden.txt");
    fs::write(&words, "cane\nAcre\n\n  race \ncane\ncafé\n").unwrap();
    fs::write(&forbidden, "RACE\n").unwrap();

    assert_eq!(load_word_list(&words).unwrap(), vec!["CANE", "ACRE", "RACE", "CANE", "CAFÉ"]);
    let dictionary = Dictionary::load(&words, &forbidden).unwrap();
    assert_eq!(dictionary.words(), ["CANE", "ACRE", "CAFÉ"]);
    assert_eq!(dictionary.letter_words(), ["CANE", "ACRE"]);
}

#[test]
fn missing_forbidden_list_filters_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let words = dir.path().join("words.txt");
    fs::write(&words, "cane\nacre\n").unwrap();
    let absent = dir.path().join("forbidden.txt");
    assert!(load_optional_word_set(&absent).unwrap().is_empty());
    assert_eq!(Dictionary::load(&words, &absent).unwrap().len(), 2);
}

#[test]
fn missing_dictionary_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let absent = dir.path().join("words.txt");
    let forbidden = dir.path().join("forbidden.txt");
    assert!(matches!(Dictionary::load(&absent, &forbidden), Err(GeneratorError::DictionaryNotFound { .. })));
}
