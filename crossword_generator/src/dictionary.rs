//! Dictionary and forbidden-word list loading.
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;

use hashbrown::HashSet;

use crate::error::{GeneratorError, Result};
use crate::letters::is_letter_word;

/// Splits newline-delimited text into trimmed, uppercased, non-blank words
pub fn parse_word_list(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(|line| line.to_uppercase())
        .collect()
}

/// Loads a required word list
/// # Arguments
/// * `path` - Newline-delimited word file
/// # Returns
/// `Result<Vec<String>>` - the normalized words in file order, or `DictionaryNotFound`
pub fn load_word_list(path: &Path) -> Result<Vec<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(parse_word_list(&text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(GeneratorError::DictionaryNotFound { path: path.to_path_buf() })
        },
        Err(e) => Err(e.into()),
    }
}

/// Loads an optional word list; a missing file yields an empty set
pub fn load_optional_word_set(path: &Path) -> Result<BTreeSet<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(parse_word_list(&text).into_iter().collect()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeSet::new()),
        Err(e) => Err(e.into()),
    }
}

/// Removes forbidden words, keeping the order of the rest
pub fn filter_forbidden(words: Vec<String>, forbidden: &BTreeSet<String>) -> Vec<String> {
    if forbidden.is_empty() {
        return words;
    }
    words.into_iter().filter(|word| !forbidden.contains(word)).collect()
}

/// A normalized dictionary
#[derive(Clone, Debug, Default)]
pub struct Dictionary {
    /// Every distinct word, in first-seen order
    words: Vec<String>,
    /// The subset of `words` made only of `A`-`Z`
    letter_words: Vec<String>,
}
impl Dictionary {
    /// Builds a dictionary, collapsing duplicates while keeping first occurrences
    pub fn new<I: IntoIterator<Item = String>>(words: I) -> Dictionary {
        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for word in words {
            let word = word.trim().to_uppercase();
            if word.is_empty() || seen.contains(&word) {
                continue;
            }
            seen.insert(word.clone());
            unique.push(word);
        }
        let letter_words = unique.iter().filter(|w| is_letter_word(w)).cloned().collect();
        Dictionary { words: unique, letter_words }
    }

    /// Loads the dictionary at `dictionary_path` minus the optional forbidden list
    pub fn load(dictionary_path: &Path, forbidden_path: &Path) -> Result<Dictionary> {
        let words = load_word_list(dictionary_path)?;
        let forbidden = load_optional_word_set(forbidden_path)?;
        Ok(Dictionary::new(filter_forbidden(words, &forbidden)))
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Unique words made only of `A`-`Z`; the pool seeds are matched against
    pub fn letter_words(&self) -> &[String] {
        &self.letter_words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_lists_are_normalized() {
        assert_eq!(parse_word_list(" cane\n\nAcre \n\t\n"), vec!["CANE", "ACRE"]);
    }

    #[test]
    fn forbidden_words_are_removed_in_order() {
        let words = parse_word_list("cane\nacre\nrace\n");
        let forbidden: BTreeSet<String> = ["ACRE".to_string()].into_iter().collect();
        assert_eq!(filter_forbidden(words, &forbidden), vec!["CANE", "RACE"]);
    }

    #[test]
    fn dictionary_collapses_duplicates() {
        let dictionary = Dictionary::new(parse_word_list("cane\nCANE\ncan't\nrace\n"));
        assert_eq!(dictionary.words(), ["CANE", "CAN'T", "RACE"]);
        assert_eq!(dictionary.letter_words(), ["CANE", "RACE"]);
    }

    #[test]
    fn missing_dictionary_is_fatal_but_missing_forbidden_is_not() {
        let missing = Path::new("definitely/not/here/words.txt");
        assert!(matches!(load_word_list(missing), Err(GeneratorError::DictionaryNotFound { .. })));
        assert!(load_optional_word_set(missing).unwrap().is_empty());
    }
}
