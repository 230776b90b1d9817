//! Counted-key statistics: `KEY:COUNT` text files of letter or word frequencies.
use std::fs;
use std::io;
use std::path::Path;

use hashbrown::HashMap;

use crate::error::{GeneratorError, Result};
use crate::letters::{is_letter, is_letter_word};

/// Occurrence count per uppercase key
pub type Counts = HashMap<String, usize>;

/// Comment marker carrying how many crosswords produced a statistics file
pub const CROSSWORDS_GENERATED_PREFIX: &str = "crosswords_generated=";

/// What kind of key a statistics file holds
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum KeyKind {
    /// Exactly one letter `A`-`Z`
    Letter,
    /// One or more letters `A`-`Z`
    Word,
}

/// A parsed statistics file
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CountedKeys {
    pub counts: Counts,
    /// Value of a `# crosswords_generated=<n>` comment, if present
    pub crosswords_generated: Option<usize>,
}

fn parse_error(path: &Path, line: usize, message: &str) -> GeneratorError {
    GeneratorError::StatsParse { path: path.to_path_buf(), line, message: message.to_string() }
}

/// Reads the value of a `crosswords_generated=<n>` comment (prefix matched case-insensitively)
fn parse_crosswords_generated(comment: &str) -> Option<usize> {
    let prefix_length = CROSSWORDS_GENERATED_PREFIX.len();
    match comment.get(..prefix_length) {
        Some(head) if head.eq_ignore_ascii_case(CROSSWORDS_GENERATED_PREFIX) => {
            comment[prefix_length..].trim().parse::<usize>().ok()
        },
        _ => None,
    }
}

/// Parses counted-key text
///
/// Blank lines are skipped. Lines starting with `#` are comments, except that a
/// `crosswords_generated=<n>` comment is recorded. Every other line must be `KEY:COUNT`, where
/// the key is trimmed and uppercased and the count is a non-negative integer. A repeated key
/// overwrites the earlier count.
/// # Arguments
/// * `text` - File contents
/// * `path` - Path reported in errors
/// * `kind` - Whether keys are single letters or words
/// # Returns
/// `Result<CountedKeys>` - the counts, or a `StatsParse` error naming the offending line
pub fn parse_counted_keys(text: &str, path: &Path, kind: KeyKind) -> Result<CountedKeys> {
    let mut parsed = CountedKeys::default();
    for (index, raw_line) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(comment) = line.strip_prefix('#') {
            if let Some(value) = parse_crosswords_generated(comment.trim()) {
                parsed.crosswords_generated = Some(value);
            }
            continue;
        }

        let (key_text, count_text) = match line.split_once(':') {
            Some(parts) => parts,
            None => return Err(parse_error(path, line_number, "Expected '<key>:<count>'.")),
        };
        let key = key_text.trim().to_uppercase();
        if key.is_empty() {
            return Err(parse_error(path, line_number, "Missing key."));
        }
        match kind {
            KeyKind::Letter => {
                let mut chars = key.chars();
                let valid = matches!((chars.next(), chars.next()), (Some(c), None) if is_letter(c));
                if !valid {
                    return Err(parse_error(path, line_number, "Expected a single A-Z letter."));
                }
            },
            KeyKind::Word => {
                if !is_letter_word(&key) {
                    return Err(parse_error(path, line_number, "Expected only A-Z letters."));
                }
            }
        }
        let count = match count_text.trim().parse::<i64>() {
            Ok(count) if count < 0 => return Err(parse_error(path, line_number, "Count must be non-negative.")),
            Ok(count) => count as usize,
            Err(_) => return Err(parse_error(path, line_number, "Count must be integer.")),
        };
        parsed.counts.insert(key, count);
    }
    Ok(parsed)
}

/// Loads a counted-key file, failing with `StatsNotFound` when it does not exist
pub fn load_counted_keys(path: &Path, kind: KeyKind) -> Result<CountedKeys> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(GeneratorError::StatsNotFound { path: path.to_path_buf() })
        },
        Err(e) => return Err(e.into()),
    };
    parse_counted_keys(&text, path, kind)
}

/// Letter totals counted over a dictionary
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LetterTally {
    pub counts: Counts,
    pub words_counted: usize,
    pub skipped_non_ascii_words: usize,
    pub total_letters: usize,
}

/// Counts each letter over every all-letter word of `words`
///
/// Used to bootstrap letter statistics when no letter file exists. Words holding anything
/// outside `A`-`Z` are skipped and counted as skipped.
pub fn count_dictionary_letters(words: &[String]) -> LetterTally {
    let mut tally = LetterTally::default();
    for word in words.iter() {
        if !is_letter_word(word) {
            tally.skipped_non_ascii_words += 1;
            continue;
        }
        tally.words_counted += 1;
        for c in word.chars() {
            *tally.counts.entry(c.to_string()).or_insert(0) += 1;
            tally.total_letters += 1;
        }
    }
    tally
}

/// Orders counted keys by descending count, then ascending key
pub fn sorted_by_count<'a, I>(counts: I) -> Vec<(&'a str, usize)>
where
    I: IntoIterator<Item = (&'a String, &'a usize)>,
{
    let mut items: Vec<(&str, usize)> = counts.into_iter().map(|(k, v)| (k.as_str(), *v)).collect();
    items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    items
}

/// Renders a statistics file: `# key=value` header lines, then `key:count` lines with
/// lowercase keys in `sorted_by_count` order
pub fn render_counted_keys<'a, I>(header: &[(String, String)], counts: I) -> String
where
    I: IntoIterator<Item = (&'a String, &'a usize)>,
{
    let mut lines: Vec<String> = header.iter().map(|(key, value)| format!("# {}={}", key, value)).collect();
    lines.extend(
        sorted_by_count(counts)
            .into_iter()
            .map(|(key, count)| format!("{}:{}", key.to_lowercase(), count)),
    );
    let mut s = lines.join("\n");
    s.push('\n');
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn parse(text: &str, kind: KeyKind) -> Result<CountedKeys> {
        parse_counted_keys(text, Path::new("stats.txt"), kind)
    }

    #[test]
    fn duplicate_key_overwrites() {
        let parsed = parse("e:120\ne:80\n", KeyKind::Letter).unwrap();
        assert_eq!(parsed.counts.len(), 1);
        assert_eq!(parsed.counts.get("E"), Some(&80));
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let text = "# format=v1\n\n# Crosswords_Generated= 42\ncane : 3\n  acre:0  \n";
        let parsed = parse(text, KeyKind::Word).unwrap();
        assert_eq!(parsed.crosswords_generated, Some(42));
        assert_eq!(parsed.counts.get("CANE"), Some(&3));
        assert_eq!(parsed.counts.get("ACRE"), Some(&0));
    }

    #[test]
    fn malformed_marker_is_ignored() {
        let parsed = parse("# crosswords_generated=-3\n# crosswords_generated=lots\n", KeyKind::Word).unwrap();
        assert_eq!(parsed.crosswords_generated, None);
    }

    #[test]
    fn errors_name_the_line() {
        let err = parse("a:1\nb2\n", KeyKind::Letter).unwrap_err();
        match err {
            GeneratorError::StatsParse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(err_line(parse("ab:1", KeyKind::Letter)) == Some(1));
        assert!(err_line(parse("a:-1", KeyKind::Letter)) == Some(1));
        assert!(err_line(parse("\n\na:x", KeyKind::Letter)) == Some(3));
        assert!(err_line(parse("can't:1", KeyKind::Word)) == Some(1));
        assert!(err_line(parse(":1", KeyKind::Word)) == Some(1));
    }

    fn err_line(result: Result<CountedKeys>) -> Option<usize> {
        match result {
            Err(GeneratorError::StatsParse { line, .. }) => Some(line),
            _ => None,
        }
    }

    #[test]
    fn error_message_includes_path_and_line() {
        let err = parse("a:1\nb2\n", KeyKind::Letter).unwrap_err();
        assert!(err.to_string().contains("stats.txt:2"));
    }

    #[test]
    fn dictionary_letters_are_counted() {
        let words: Vec<String> = ["CANE", "ÉCLAIR", "ACE"].iter().map(|w| w.to_string()).collect();
        let tally = count_dictionary_letters(&words);
        assert_eq!(tally.skipped_non_ascii_words, 1);
        assert_eq!(tally.words_counted, 2);
        assert_eq!(tally.total_letters, 7);
        assert_eq!(tally.counts.get("A"), Some(&2));
        assert_eq!(tally.counts.get("N"), Some(&1));
    }

    #[test]
    fn render_sorts_by_count_then_key() {
        let counts: BTreeMap<String, usize> =
            [("CANE", 2), ("ACRE", 2), ("RACE", 5)].iter().map(|(k, v)| (k.to_string(), *v)).collect();
        let header = vec![("format".to_string(), "v1".to_string())];
        assert_eq!(render_counted_keys(&header, &counts), "# format=v1\nrace:5\nacre:2\ncane:2\n");
    }
}
