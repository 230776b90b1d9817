//! Seed letter generation policies and seed mutation.
use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;

use rand::prelude::*;

use crate::letters::{self, is_consonant, is_letter, is_vowel, letter_counts, Letters, ALPHABET};
use crate::stats::Counts;

pub const MIN_SEED_LETTER_SET_SIZE: usize = 6;
pub const MAX_SEED_LETTER_SET_SIZE: usize = 9;
/// Possible vowel counts of a fresh seed and their relative weights
pub const VOWEL_COUNT_WEIGHTS: [(usize, u32); 3] = [(2, 3), (3, 5), (4, 2)];
/// Rare word merges make at most `max(MIN_RARE_WORD_PICK_ATTEMPTS, pool * RARE_WORD_PICK_MULTIPLIER)` picks
pub const RARE_WORD_PICK_MULTIPLIER: usize = 4;
pub const MIN_RARE_WORD_PICK_ATTEMPTS: usize = 20;
/// Rare word merges keep at most this many pick history lines
pub const MAX_PICK_HISTORY: usize = 80;
/// Rare word merges keep at most this many rejected word lines
pub const MAX_REJECTED_WORD_HISTORY: usize = 40;

/// Inclusive range of seed lengths
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SeedLengthRange {
    pub min: usize,
    pub max: usize,
}
impl SeedLengthRange {
    /// The generation range for a maximum letter set size: `[max(6, size - 1), clamp(size, 6, 9)]`
    pub fn for_max_size(max_letter_set_size: usize) -> SeedLengthRange {
        let max = max_letter_set_size.clamp(MIN_SEED_LETTER_SET_SIZE, MAX_SEED_LETTER_SET_SIZE);
        let min = MIN_SEED_LETTER_SET_SIZE.max(max - 1);
        SeedLengthRange { min, max }
    }

    pub fn contains(&self, length: usize) -> bool {
        self.min <= length && length <= self.max
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        rng.gen_range(self.min..=self.max)
    }
}

/// Picks how many vowels a seed of `length` letters gets
///
/// Only counts no larger than `length` are eligible; if none are, `min(length, 4)` is used.
pub fn pick_vowel_count<R: Rng + ?Sized>(length: usize, rng: &mut R) -> usize {
    let allowed: Vec<(usize, u32)> = VOWEL_COUNT_WEIGHTS
        .iter()
        .copied()
        .filter(|(count, _)| *count <= length)
        .collect();
    match allowed.choose_weighted(rng, |(_, weight)| *weight) {
        Ok((count, _)) => *count,
        Err(_) => length.min(4),
    }
}

/// Draws `count` letters from `pool` with replacement
pub fn draw_letters<R: Rng + ?Sized>(pool: &[char], count: usize, rng: &mut R) -> Vec<char> {
    if pool.is_empty() {
        return Vec::new();
    }
    (0..count).filter_map(|_| pool.choose(rng).copied()).collect()
}

/// Shuffles the letters of a seed
pub fn shuffle_letters<R: Rng + ?Sized>(letters: &str, rng: &mut R) -> String {
    let mut chars: Vec<char> = letters.chars().collect();
    chars.shuffle(rng);
    chars.into_iter().collect()
}

/// Weighted-vowel random draw over an alphabet
///
/// Picks a length in `range` and a vowel count by weight, draws that many vowels and the rest
/// as consonants (both with replacement, both restricted to `alphabet`), fills any shortfall
/// from the whole `alphabet`, then shuffles.
/// # Arguments
/// * `range` - Allowed seed lengths
/// * `alphabet` - Letters that may be drawn
/// * `rng` - Source of randomness
/// # Returns
/// `String` - the seed letters
pub fn weighted_vowel_seed<R: Rng + ?Sized>(range: SeedLengthRange, alphabet: &[char], rng: &mut R) -> String {
    let length = range.sample(rng);
    let vowel_count = pick_vowel_count(length, rng);
    let vowels: Vec<char> = alphabet.iter().copied().filter(|c| is_vowel(*c)).collect();
    let consonants: Vec<char> = alphabet.iter().copied().filter(|c| is_consonant(*c)).collect();

    let mut seed = draw_letters(&vowels, vowel_count, rng);
    seed.extend(draw_letters(&consonants, length.saturating_sub(vowel_count), rng));
    if seed.len() < length {
        let shortfall = length - seed.len();
        seed.extend(draw_letters(alphabet, shortfall, rng));
    }
    seed.shuffle(rng);
    seed.into_iter().collect()
}

/// Random-alphabet draw: a length in `range`, then that many distinct letters of `alphabet`
///
/// Letters repeat only when `alphabet` holds fewer letters than the drawn length; each is then
/// drawn independently with replacement.
/// # Arguments
/// * `range` - Allowed seed lengths
/// * `alphabet` - Letters that may be drawn
/// * `rng` - Source of randomness
/// # Returns
/// `String` - the seed letters in random order
pub fn random_alphabet_letters<R: Rng + ?Sized>(range: SeedLengthRange, alphabet: &[char], rng: &mut R) -> String {
    let length = range.sample(rng);
    let mut seed: Vec<char> = if length <= alphabet.len() {
        alphabet.choose_multiple(rng, length).copied().collect()
    }
    else {
        draw_letters(alphabet, length, rng)
    };
    seed.shuffle(rng);
    seed.into_iter().collect()
}

/// A fresh seed drawn over the whole alphabet
pub fn initial_seed<R: Rng + ?Sized>(range: SeedLengthRange, rng: &mut R) -> String {
    weighted_vowel_seed(range, &letters::alphabet(), rng)
}

/// The distinct letters of the previous seed, most frequent first (ties alphabetical)
pub fn rank_previous_letters(previous_seed: &str, letter_stats: &Counts) -> Vec<char> {
    let mut ranked: Vec<char> = previous_seed
        .trim()
        .to_uppercase()
        .chars()
        .filter(|c| is_letter(*c))
        .collect::<BTreeSet<char>>()
        .into_iter()
        .collect();
    ranked.sort_by_key(|c| std::cmp::Reverse(letter_stats.get(&c.to_string()).copied().unwrap_or(0)));
    ranked
}

/// The alphabet without `excluded`, or the whole alphabet if nothing would remain
pub fn reduced_alphabet(excluded: &[char]) -> Vec<char> {
    let reduced: Vec<char> = ALPHABET.chars().filter(|c| !excluded.contains(c)).collect();
    if reduced.is_empty() {
        letters::alphabet()
    }
    else {
        reduced
    }
}

/// Letters of the previous seed chosen for exclusion
#[derive(Clone, Debug, PartialEq)]
pub struct Exclusion {
    /// How many letters were asked for; more than `excluded` holds when the previous seed is short
    pub exclude_count: usize,
    pub ranked_previous: Vec<char>,
    pub excluded: Vec<char>,
}
impl Exclusion {
    pub fn reduced_alphabet(&self) -> Vec<char> {
        reduced_alphabet(&self.excluded)
    }
}

/// Draws how many letters to exclude from `exclude`, then takes that many of the previous
/// seed's most frequent letters
pub fn select_exclusion<R: Rng + ?Sized>(
    previous_seed: &str,
    letter_stats: &Counts,
    exclude: RangeInclusive<usize>,
    rng: &mut R,
) -> Exclusion {
    let exclude_count = rng.gen_range(exclude);
    let ranked_previous = rank_previous_letters(previous_seed, letter_stats);
    let excluded: Vec<char> = ranked_previous.iter().copied().take(exclude_count).collect();
    Exclusion { exclude_count, ranked_previous, excluded }
}

/// Outcome of the history-biased exclusion policy
#[derive(Clone, Debug, PartialEq)]
pub struct ExclusionDraw {
    pub exclusion: Exclusion,
    pub reduced_alphabet: Vec<char>,
    pub seed: String,
}

/// Excludes 1 to 3 (per `exclude`) of the previous seed's most frequent letters, then performs
/// the random-alphabet draw over what remains of the alphabet
pub fn exclusion_seed<R: Rng + ?Sized>(
    previous_seed: &str,
    letter_stats: &Counts,
    exclude: RangeInclusive<usize>,
    range: SeedLengthRange,
    rng: &mut R,
) -> ExclusionDraw {
    let exclusion = select_exclusion(previous_seed, letter_stats, exclude, rng);
    let reduced_alphabet = exclusion.reduced_alphabet();
    let seed = random_alphabet_letters(range, &reduced_alphabet, rng);
    ExclusionDraw { exclusion, reduced_alphabet, seed }
}

/// Outcome of the rarity-biased merge policy
#[derive(Clone, Debug, PartialEq)]
pub struct RareMerge {
    /// Merged letters; may fall short of the range minimum when the pick budget ran out
    pub letters: Letters,
    pub selected_words: Vec<String>,
    pub pick_attempts: usize,
    pub pick_limit: usize,
    pub reset_rounds: usize,
    pub rejected_words: usize,
    /// Every pick and pool reset, first `MAX_PICK_HISTORY` kept
    pub pick_history: History,
    /// Every rejected pick, first `MAX_REJECTED_WORD_HISTORY` kept
    pub rejected_history: History,
}
impl RareMerge {
    pub fn length(&self) -> usize {
        letters::total(&self.letters)
    }
}

/// A bounded sample of log lines plus the count of every line offered
#[derive(Clone, Debug, PartialEq)]
pub struct History {
    pub sample: Vec<String>,
    pub total: usize,
    limit: usize,
}
impl History {
    pub fn new(limit: usize) -> History {
        History { sample: Vec::new(), total: 0, limit }
    }

    /// Counts a line, building it only while the sample has room
    pub fn push_with<F: FnOnce() -> String>(&mut self, line: F) {
        self.total += 1;
        if self.sample.len() < self.limit {
            self.sample.push(line());
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.total > self.sample.len()
    }
}

/// One pick of a rare word merge, rendered into the merge histories
struct Pick<'a> {
    attempt: usize,
    before: &'a [String],
    word: &'a str,
    count: usize,
    candidate_length: usize,
    range: SeedLengthRange,
}
impl Pick<'_> {
    fn line(&self, action: &str) -> String {
        format!(
            "pick={} before=[{}] picked={}(count={}) candidate_length={} range={}..{} action={}",
            self.attempt,
            self.before.join(","),
            self.word,
            self.count,
            self.candidate_length,
            self.range.min,
            self.range.max,
            action
        )
    }
}

/// Index of the rarest word in `words` by `word_stats`, ties broken uniformly
fn pick_rarest<R: Rng + ?Sized>(words: &[String], word_stats: &Counts, rng: &mut R) -> usize {
    if words.len() == 1 {
        return 0;
    }
    let count_of = |word: &String| word_stats.get(word).copied().unwrap_or(0);
    let min_count = words.iter().map(count_of).min().unwrap_or(0);
    let rarest: Vec<usize> = (0..words.len()).filter(|i| count_of(&words[*i]) == min_count).collect();
    rarest.choose(rng).copied().unwrap_or(0)
}

/// Builds seed letters by merging the letter counts of globally rare words
///
/// Rounds pick the rarest word still available and merge it by per-letter maximum. A merge
/// longer than `range.max` discards the whole round and restores the pool; a merge that adds no
/// letters drops that word for the rest of the round; an exhausted pool starts a new round
/// without spending a pick. Picking stops once `range.min` letters are merged or the pick
/// budget `max(20, pool * 4)` is spent.
/// # Arguments
/// * `pool` - Unique letter-only source words
/// * `word_stats` - Historical word counts; unknown words count as zero
/// * `range` - Allowed seed lengths
/// * `rng` - Source of randomness
pub fn rare_word_merge<R: Rng + ?Sized>(
    pool: &[String],
    word_stats: &Counts,
    range: SeedLengthRange,
    rng: &mut R,
) -> RareMerge {
    let pick_limit = MIN_RARE_WORD_PICK_ATTEMPTS.max(pool.len() * RARE_WORD_PICK_MULTIPLIER);
    let mut merge = RareMerge {
        letters: [0; 26],
        selected_words: Vec::new(),
        pick_attempts: 0,
        pick_limit,
        reset_rounds: 0,
        rejected_words: 0,
        pick_history: History::new(MAX_PICK_HISTORY),
        rejected_history: History::new(MAX_REJECTED_WORD_HISTORY),
    };
    let mut available: Vec<String> = pool.to_vec();
    let mut merged_length = 0;

    while merged_length < range.min && !pool.is_empty() && merge.pick_attempts < pick_limit {
        if available.is_empty() {
            merge.pick_history.push_with(|| {
                format!(
                    "pick=pool_exhausted before=[{}] merged_length={} action=reset_round",
                    merge.selected_words.join(","),
                    merged_length
                )
            });
            merge.reset_rounds += 1;
            merge.letters = [0; 26];
            merge.selected_words.clear();
            merged_length = 0;
            available = pool.to_vec();
            continue;
        }

        merge.pick_attempts += 1;
        let index = pick_rarest(&available, word_stats, rng);
        let word_letters = match letter_counts(&available[index]) {
            Some(counts) => counts,
            None => {
                available.remove(index);
                continue;
            }
        };
        let candidate = letters::merge_by_max(&merge.letters, &word_letters);
        let candidate_length = letters::total(&candidate);
        let pick = Pick {
            attempt: merge.pick_attempts,
            before: &merge.selected_words,
            word: &available[index],
            count: word_stats.get(&available[index]).copied().unwrap_or(0),
            candidate_length,
            range,
        };
        if candidate_length > range.max {
            merge.rejected_history.push_with(|| pick.line("reset_exceeds_range"));
            merge.pick_history.push_with(|| pick.line("reset_exceeds_range after=[]"));
            merge.rejected_words += 1;
            merge.reset_rounds += 1;
            merge.letters = [0; 26];
            merge.selected_words.clear();
            merged_length = 0;
            available = pool.to_vec();
            continue;
        }
        if candidate_length == merged_length {
            let after = format!("skip_no_progress after=[{}]", merge.selected_words.join(","));
            merge.rejected_history.push_with(|| pick.line("skip_no_progress"));
            merge.pick_history.push_with(|| pick.line(&after));
            merge.rejected_words += 1;
            available.remove(index);
            continue;
        }
        let applied = pick.line("apply");
        merge.letters = candidate;
        merged_length = candidate_length;
        merge.selected_words.push(available.remove(index));
        merge.pick_history.push_with(|| format!("{} after=[{}]", applied, merge.selected_words.join(",")));
    }
    merge
}

/// Spells out merged letters in a random order
pub fn seed_from_letters<R: Rng + ?Sized>(letters: &Letters, rng: &mut R) -> String {
    shuffle_letters(&letters::letters_to_string(letters), rng)
}

/// Picks the seed letter to swap out during mutation
///
/// Prefers the singleton consonant occurring most often across `repeat_source` words (ties
/// broken uniformly among the tied letters in alphabetical order), then any singleton
/// consonant, then any singleton letter, then any letter. Singletons are considered in the
/// order they first appear in the seed.
/// # Returns
/// `Option<char>` - `None` only for an empty seed
pub fn pick_letter_to_remove<R: Rng + ?Sized>(
    seed: &str,
    repeat_source: &BTreeSet<String>,
    rng: &mut R,
) -> Option<char> {
    let chars: Vec<char> = seed.chars().collect();
    if chars.is_empty() {
        return None;
    }
    let mut singletons: Vec<char> = Vec::new();
    for c in chars.iter() {
        if chars.iter().filter(|other| *other == c).count() == 1 {
            singletons.push(*c);
        }
    }
    let singleton_consonants: Vec<char> = singletons.iter().copied().filter(|c| is_consonant(*c)).collect();

    if let Some(dominant) = pick_dominant_consonant(repeat_source, &singleton_consonants, rng) {
        return Some(dominant);
    }
    if let Some(c) = singleton_consonants.choose(rng) {
        return Some(*c);
    }
    if let Some(c) = singletons.choose(rng) {
        return Some(*c);
    }
    chars.choose(rng).copied()
}

fn pick_dominant_consonant<R: Rng + ?Sized>(
    repeat_source: &BTreeSet<String>,
    singleton_consonants: &[char],
    rng: &mut R,
) -> Option<char> {
    if repeat_source.is_empty() || singleton_consonants.is_empty() {
        return None;
    }
    let mut counts: BTreeMap<char, usize> = BTreeMap::new();
    for word in repeat_source.iter() {
        for c in word.chars().filter(|c| singleton_consonants.contains(c)) {
            *counts.entry(c).or_insert(0) += 1;
        }
    }
    let max_count = counts.values().copied().max()?;
    let best: Vec<char> = counts.iter().filter(|(_, n)| **n == max_count).map(|(c, _)| *c).collect();
    best.choose(rng).copied()
}

/// Removes the first occurrence of `letter` from `seed`
pub fn remove_first(seed: &str, letter: char) -> String {
    match seed.find(letter) {
        Some(index) => {
            let mut s = seed.to_string();
            s.remove(index);
            s
        },
        None => seed.to_string(),
    }
}

/// Letters of the alphabet absent from a freshly drawn seed; each may be added back at most once
pub fn remaining_addition_alphabet(seed: &str) -> BTreeSet<char> {
    ALPHABET.chars().filter(|c| !seed.contains(*c)).collect()
}

/// Letters that may be added during a mutation, in alphabetical order
pub fn addition_pool(seed: &str, remaining: &BTreeSet<char>, blocked: &BTreeSet<char>) -> Vec<char> {
    remaining
        .iter()
        .copied()
        .filter(|c| !blocked.contains(c) && !seed.contains(*c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;

    fn stats(pairs: &[(&str, usize)]) -> Counts {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn word_set(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn seed_length_range_is_clamped() {
        assert_eq!(SeedLengthRange::for_max_size(9), SeedLengthRange { min: 8, max: 9 });
        assert_eq!(SeedLengthRange::for_max_size(7), SeedLengthRange { min: 6, max: 7 });
        assert_eq!(SeedLengthRange::for_max_size(6), SeedLengthRange { min: 6, max: 6 });
        assert_eq!(SeedLengthRange::for_max_size(2), SeedLengthRange { min: 6, max: 6 });
        assert_eq!(SeedLengthRange::for_max_size(30), SeedLengthRange { min: 8, max: 9 });
    }

    #[test]
    fn vowel_count_is_clipped_to_length() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            assert!([2, 3].contains(&pick_vowel_count(3, &mut rng)));
            assert_eq!(pick_vowel_count(1, &mut rng), 1);
            assert!([2, 3, 4].contains(&pick_vowel_count(8, &mut rng)));
        }
    }

    #[test]
    fn initial_seed_has_weighted_vowels() {
        let mut rng = StdRng::seed_from_u64(5);
        let range = SeedLengthRange::for_max_size(9);
        for _ in 0..200 {
            let seed = initial_seed(range, &mut rng);
            assert!(range.contains(seed.len()));
            let vowels = seed.chars().filter(|c| is_vowel(*c)).count();
            assert!((2..=4).contains(&vowels), "{}", seed);
        }
    }

    #[test]
    fn random_alphabet_draw_uses_distinct_letters() {
        let alphabet: Vec<char> = "ABCDEFGHIJKLMNOPQRSTUVW".chars().collect();
        let range = SeedLengthRange::for_max_size(9);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let seed = random_alphabet_letters(range, &alphabet, &mut rng);
            assert!(range.contains(seed.len()));
            let distinct: BTreeSet<char> = seed.chars().collect();
            assert_eq!(distinct.len(), seed.len(), "{}", seed);
            assert!(seed.chars().all(|c| alphabet.contains(&c)));
        }
    }

    #[test]
    fn random_alphabet_draw_repeats_only_for_short_alphabets() {
        let mut rng = StdRng::seed_from_u64(7);
        let seed = random_alphabet_letters(SeedLengthRange::for_max_size(6), &['A', 'B'], &mut rng);
        assert_eq!(seed.len(), 6);
        assert!(seed.chars().all(|c| c == 'A' || c == 'B'));
    }

    #[test]
    fn excluded_letters_follow_frequency_then_alphabet() {
        let letter_stats = stats(&[("E", 100), ("T", 90), ("S", 90), ("R", 10)]);
        assert_eq!(rank_previous_letters("rest", &letter_stats), vec!['E', 'S', 'T', 'R']);
        assert_eq!(rank_previous_letters("RE", &letter_stats), vec!['E', 'R']);
        assert!(rank_previous_letters("", &letter_stats).is_empty());
    }

    #[test]
    fn exclusion_seed_avoids_excluded_letters() {
        let letter_stats = stats(&[("E", 100), ("A", 80), ("T", 60)]);
        let mut rng = StdRng::seed_from_u64(21);
        for _ in 0..100 {
            let draw = exclusion_seed("TEA", &letter_stats, 1..=3, SeedLengthRange::for_max_size(9), &mut rng);
            let exclusion = &draw.exclusion;
            assert!((1..=3).contains(&exclusion.exclude_count));
            assert_eq!(exclusion.excluded, exclusion.ranked_previous[..exclusion.exclude_count].to_vec());
            assert!(draw.seed.chars().all(|c| !exclusion.excluded.contains(&c)));
        }
    }

    #[test]
    fn reduced_alphabet_never_empty() {
        let everything: Vec<char> = ALPHABET.chars().collect();
        assert_eq!(reduced_alphabet(&everything).len(), 26);
        assert_eq!(reduced_alphabet(&['A', 'Z']).len(), 24);
    }

    #[test]
    fn rare_merge_prefers_unseen_words() {
        let pool: Vec<String> = ["CAT", "DOG", "EMU", "BIRD"].iter().map(|w| w.to_string()).collect();
        let word_stats = stats(&[("CAT", 5), ("DOG", 0), ("EMU", 0), ("BIRD", 9)]);
        let mut rng = StdRng::seed_from_u64(3);
        let merge = rare_word_merge(&pool, &word_stats, SeedLengthRange::for_max_size(6), &mut rng);
        assert_eq!(merge.length(), 6);
        let mut selected = merge.selected_words.clone();
        selected.sort();
        assert_eq!(selected, vec!["DOG", "EMU"]);
    }

    #[test]
    fn rare_merge_budget_is_bounded() {
        let pool = vec!["AB".to_string()];
        let mut rng = StdRng::seed_from_u64(3);
        let merge = rare_word_merge(&pool, &Counts::new(), SeedLengthRange::for_max_size(9), &mut rng);
        assert_eq!(merge.pick_limit, MIN_RARE_WORD_PICK_ATTEMPTS);
        assert_eq!(merge.pick_attempts, MIN_RARE_WORD_PICK_ATTEMPTS);
        assert_eq!(merge.length(), 2);
        assert_eq!(merge.reset_rounds, MIN_RARE_WORD_PICK_ATTEMPTS - 1);
        assert_eq!(merge.pick_history.total, 2 * MIN_RARE_WORD_PICK_ATTEMPTS - 1);
        assert_eq!(
            merge.pick_history.sample[..2],
            [
                "pick=1 before=[] picked=AB(count=0) candidate_length=2 range=8..9 action=apply after=[AB]",
                "pick=pool_exhausted before=[AB] merged_length=2 action=reset_round",
            ]
        );
        assert_eq!(merge.rejected_history.total, 0);
    }

    #[test]
    fn rare_merge_records_rejected_picks() {
        let pool: Vec<String> = ["ABCDE", "FGHIJ"].iter().map(|w| w.to_string()).collect();
        let mut rng = StdRng::seed_from_u64(4);
        let merge = rare_word_merge(&pool, &Counts::new(), SeedLengthRange::for_max_size(6), &mut rng);
        assert_eq!(merge.pick_attempts, MIN_RARE_WORD_PICK_ATTEMPTS);
        assert_eq!(merge.rejected_words, MIN_RARE_WORD_PICK_ATTEMPTS / 2);
        assert_eq!(merge.rejected_history.total, merge.rejected_words);
        assert!(!merge.rejected_history.is_truncated());
        let first_reject = &merge.rejected_history.sample[0];
        assert!(first_reject.starts_with("pick=2 "), "{}", first_reject);
        assert!(first_reject.ends_with("candidate_length=10 range=6..6 action=reset_exceeds_range"));
        assert!(merge.pick_history.sample[1].ends_with("action=reset_exceeds_range after=[]"));

        let pool: Vec<String> = ["AB", "BA"].iter().map(|w| w.to_string()).collect();
        let merge = rare_word_merge(&pool, &Counts::new(), SeedLengthRange::for_max_size(6), &mut rng);
        assert!(merge.rejected_history.sample[0].ends_with("candidate_length=2 range=6..6 action=skip_no_progress"));
        let skipped = &merge.pick_history.sample[1];
        assert!(
            skipped.ends_with("action=skip_no_progress after=[AB]") || skipped.ends_with("action=skip_no_progress after=[BA]"),
            "{}",
            skipped
        );
    }

    #[test]
    fn history_keeps_a_bounded_sample() {
        let mut history = History::new(2);
        let mut built = 0;
        for i in 0..3 {
            history.push_with(|| {
                built += 1;
                i.to_string()
            });
        }
        assert_eq!(history.sample, vec!["0", "1"]);
        assert_eq!(history.total, 3);
        assert_eq!(built, 2);
        assert!(history.is_truncated());
    }

    #[test]
    fn rare_merge_with_empty_pool_merges_nothing() {
        let mut rng = StdRng::seed_from_u64(3);
        let merge = rare_word_merge(&[], &Counts::new(), SeedLengthRange::for_max_size(9), &mut rng);
        assert_eq!(merge.length(), 0);
        assert_eq!(merge.pick_attempts, 0);
    }

    #[test]
    fn removal_prefers_dominant_singleton_consonant() {
        let mut rng = StdRng::seed_from_u64(9);
        let repeat_source = word_set(&["TINE", "TEAS", "TIES"]);
        assert_eq!(pick_letter_to_remove("TSAEIND", &repeat_source, &mut rng), Some('T'));
    }

    #[test]
    fn removal_falls_back_without_singletons() {
        let mut rng = StdRng::seed_from_u64(9);
        let removed = pick_letter_to_remove("AABB", &BTreeSet::new(), &mut rng);
        assert!(removed == Some('A') || removed == Some('B'));
        let removed = pick_letter_to_remove("AABBE", &BTreeSet::new(), &mut rng);
        assert_eq!(removed, Some('E'));
        assert_eq!(pick_letter_to_remove("", &BTreeSet::new(), &mut rng), None);
    }

    #[test]
    fn addition_pool_skips_blocked_and_present_letters() {
        let remaining = remaining_addition_alphabet("ABCDEFGHIJKLMNOPQRSTUVW");
        assert_eq!(remaining.iter().collect::<String>(), "XYZ");
        let blocked: BTreeSet<char> = ['Y'].into_iter().collect();
        assert_eq!(addition_pool("ABX", &remaining, &blocked), vec!['Z']);
        assert_eq!(remove_first("BANANA", 'A'), "BNANA");
    }
}
