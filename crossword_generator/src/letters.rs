//! Letter multisets and the word matcher.
//!
//! A seed is treated as a multiset of `A`-`Z` letters. A dictionary word matches the seed when
//! it uses no letter more often than the seed holds it.
use std::collections::BTreeSet;

use rayon::prelude::*;

/// Represents a multiset of letters, indexed `A = 0` through `Z = 25`
pub type Letters = [usize; 26];

pub const ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const VOWELS: &str = "AEIOU";
pub const CONSONANTS: &str = "BCDFGHJKLMNPQRSTVWXYZ";

/// Whether `c` is one of the 26 uppercase English letters
pub fn is_letter(c: char) -> bool {
    c.is_ascii_uppercase()
}

pub fn is_vowel(c: char) -> bool {
    VOWELS.contains(c)
}

pub fn is_consonant(c: char) -> bool {
    CONSONANTS.contains(c)
}

/// Whether `word` is non-empty and made only of `A`-`Z`
pub fn is_letter_word(word: &str) -> bool {
    !word.is_empty() && word.chars().all(is_letter)
}

/// Index of a letter within `Letters`
/// # Arguments
/// * `c` - Uppercase letter
/// # Returns
/// `usize` - `0` for `'A'` up to `25` for `'Z'`
pub fn letter_index(c: char) -> usize {
    c as usize - 65
}

/// Inverse of `letter_index`
pub fn letter_at(index: usize) -> char {
    (index as u8 + 65) as char
}

/// The alphabet as a vector of letters
pub fn alphabet() -> Vec<char> {
    ALPHABET.chars().collect()
}

/// Counts the letters of a word
/// # Arguments
/// * `word` - Word to count, expected to be normalized to uppercase
/// # Returns
/// `Option<Letters>` - the letter counts, or `None` if `word` holds anything outside `A`-`Z`
pub fn letter_counts(word: &str) -> Option<Letters> {
    let mut counts = [0usize; 26];
    for c in word.chars() {
        if !is_letter(c) {
            return None;
        }
        counts[letter_index(c)] += 1;
    }
    Some(counts)
}

/// Counts the letters of `word`, skipping anything outside `A`-`Z`
pub fn letter_counts_lossy(word: &str) -> Letters {
    let mut counts = [0usize; 26];
    for c in word.chars().filter(|c| is_letter(*c)) {
        counts[letter_index(c)] += 1;
    }
    counts
}

/// Number of letters held in a multiset
pub fn total(letters: &Letters) -> usize {
    letters.iter().sum()
}

/// Size of the multiset intersection of two letter multisets
pub fn shared_letter_count(a: &Letters, b: &Letters) -> usize {
    a.iter().zip(b.iter()).map(|(x, y)| *x.min(y)).sum()
}

/// Merges two multisets by taking the per-letter maximum
pub fn merge_by_max(a: &Letters, b: &Letters) -> Letters {
    let mut merged = [0usize; 26];
    for i in 0..26 {
        merged[i] = a[i].max(b[i]);
    }
    merged
}

/// Checks whether a `word` can be made using the given `letters`
/// # Arguments
/// * `word` - The word to check
/// * `letters` - Length-26 array of the number of each letter available
/// # Returns
/// * `bool` - Whether `word` can be made using `letters`
pub fn is_makeable(word: &str, letters: &Letters) -> bool {
    let mut available_letters = *letters;
    for c in word.chars() {
        if !is_letter(c) {
            return false;
        }
        let slot = &mut available_letters[letter_index(c)];
        if *slot == 0 {
            return false;
        }
        *slot -= 1;
    }
    true
}

/// Returns every dictionary word buildable from the `seed` letters
///
/// Words are trimmed and uppercased before checking. A word longer than the seed, or containing
/// anything outside `A`-`Z`, never matches. An empty seed, or a seed with non-letters, matches
/// nothing. The output keeps the dictionary's order.
/// # Arguments
/// * `seed` - Seed letters
/// * `dictionary` - Words to filter
/// # Returns
/// `Vec<String>` - the normalized matching words
pub fn match_words(seed: &str, dictionary: &[String]) -> Vec<String> {
    let seed = seed.trim().to_uppercase();
    if seed.is_empty() {
        return Vec::new();
    }
    let seed_counts = match letter_counts(&seed) {
        Some(counts) => counts,
        None => return Vec::new(),
    };
    let seed_length = seed.len();
    dictionary
        .par_iter()
        .filter_map(|raw_word| {
            let candidate = raw_word.trim().to_uppercase();
            if candidate.is_empty() || candidate.len() > seed_length {
                return None;
            }
            if is_makeable(&candidate, &seed_counts) {
                Some(candidate)
            }
            else {
                None
            }
        })
        .collect()
}

/// The full word set for a seed: matched words of at least `min_word_length` letters
pub fn full_word_set(seed: &str, dictionary: &[String], min_word_length: usize) -> BTreeSet<String> {
    match_words(seed, dictionary)
        .into_iter()
        .filter(|word| word.len() >= min_word_length)
        .collect()
}

/// Whether every distinct seed letter appears in at least one of the `words`
///
/// A seed holding anything outside `A`-`Z` is never fully used.
pub fn all_seed_letters_used<'a, I>(seed: &str, words: I) -> bool
where
    I: IntoIterator<Item = &'a String>,
{
    let mut used = [false; 26];
    for word in words {
        for c in word.chars().filter(|c| is_letter(*c)) {
            used[letter_index(c)] = true;
        }
    }
    seed.trim()
        .to_uppercase()
        .chars()
        .all(|c| is_letter(c) && used[letter_index(c)])
}

/// The distinct seed letters that appear in none of the `words`, in alphabetical order
pub fn unused_seed_letters<'a, I>(seed: &str, words: I) -> Vec<char>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut used = [false; 26];
    for word in words {
        for c in word.chars().filter(|c| is_letter(*c)) {
            used[letter_index(c)] = true;
        }
    }
    let seed_letters: BTreeSet<char> = seed
        .trim()
        .to_uppercase()
        .chars()
        .filter(|c| is_letter(*c))
        .collect();
    seed_letters.into_iter().filter(|c| !used[letter_index(*c)]).collect()
}

/// Spells out a multiset in alphabetical order
pub fn letters_to_string(letters: &Letters) -> String {
    let mut s = String::with_capacity(total(letters));
    for (index, count) in letters.iter().enumerate() {
        for _ in 0..*count {
            s.push(letter_at(index));
        }
    }
    s
}
