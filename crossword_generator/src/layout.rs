//! Grid layout synthesis: greedy placement of words onto a shared crossword grid, and
//! extraction of every word readable from the finished grid.
use std::collections::BTreeSet;
use std::fmt;

use array2d::Array2D;
use hashbrown::{HashMap, HashSet};
use rand::distributions::Standard;
use rand::prelude::*;

use crate::letters::is_letter_word;

/// Value of an empty cell in a materialized grid
pub const EMPTY_CELL: char = '.';
/// Maximum number of rows a layout may span
pub const MAX_ROWS: usize = 14;
/// Maximum number of columns a layout may span
pub const MAX_COLUMNS: usize = 14;
/// The base word plus this many of the longest remaining words are placed first
pub const PRIORITY_WORD_COUNT: usize = 3;
/// Shortest run of letters read back as a word
pub const MIN_WORD_LENGTH: usize = 4;

/// Enumeration of the direction a word is played
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// The word runs left to right
    Horizontal,
    /// The word runs top to bottom
    Vertical,
}
impl Distribution<Direction> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Direction {
        match rng.gen_range(0..=1) {
            0 => Direction::Horizontal,
            _ => Direction::Vertical,
        }
    }
}
impl Direction {
    /// Row and column offsets between consecutive letters of a word
    fn step(self) -> (i32, i32) {
        match self {
            Direction::Horizontal => (0, 1),
            Direction::Vertical => (1, 0),
        }
    }
}
impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Direction::Horizontal => write!(f, "horizontal"),
            Direction::Vertical => write!(f, "vertical"),
        }
    }
}

/// A cell coordinate; the base word starts at the origin and others may extend into negatives
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}
impl Position {
    pub fn new(row: i32, col: i32) -> Position {
        Position { row, col }
    }

    /// The position `by` steps away along `direction` (negative steps go backwards)
    fn offset(self, direction: Direction, by: i32) -> Position {
        let (dr, dc) = direction.step();
        Position { row: self.row + dr * by, col: self.col + dc * by }
    }

    /// The two neighbors across `direction` (above/below for horizontal words)
    fn perpendicular_neighbors(self, direction: Direction) -> [Position; 2] {
        match direction {
            Direction::Horizontal => [Position::new(self.row - 1, self.col), Position::new(self.row + 1, self.col)],
            Direction::Vertical => [Position::new(self.row, self.col - 1), Position::new(self.row, self.col + 1)],
        }
    }
}

/// An occupied cell: its letter plus which word orientations already run through it
#[derive(Copy, Clone, Debug)]
struct Cell {
    letter: char,
    horizontal: bool,
    vertical: bool,
}
impl Cell {
    fn has(&self, direction: Direction) -> bool {
        match direction {
            Direction::Horizontal => self.horizontal,
            Direction::Vertical => self.vertical,
        }
    }

    fn mark(&mut self, direction: Direction) {
        match direction {
            Direction::Horizontal => self.horizontal = true,
            Direction::Vertical => self.vertical = true,
        }
    }
}

/// A word at a starting position and direction
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Placement {
    pub word: String,
    pub start: Position,
    pub direction: Direction,
}
impl Placement {
    pub fn new(word: &str, start: Position, direction: Direction) -> Placement {
        Placement { word: word.to_string(), start, direction }
    }

    /// Each cell the word covers, with the letter it puts there
    pub fn cells(&self) -> impl Iterator<Item = (Position, char)> + '_ {
        self.word
            .chars()
            .enumerate()
            .map(move |(i, c)| (self.start.offset(self.direction, i as i32), c))
    }

    fn end(&self) -> Position {
        self.start.offset(self.direction, self.word.chars().count() as i32 - 1)
    }
}

/// Inclusive bounding box of the occupied cells
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub min_row: i32,
    pub max_row: i32,
    pub min_col: i32,
    pub max_col: i32,
}
impl Bounds {
    fn origin() -> Bounds {
        Bounds { min_row: 0, max_row: 0, min_col: 0, max_col: 0 }
    }

    fn include(&mut self, position: Position) {
        self.min_row = self.min_row.min(position.row);
        self.max_row = self.max_row.max(position.row);
        self.min_col = self.min_col.min(position.col);
        self.max_col = self.max_col.max(position.col);
    }

    pub fn rows(&self) -> usize {
        (self.max_row - self.min_row + 1) as usize
    }

    pub fn columns(&self) -> usize {
        (self.max_col - self.min_col + 1) as usize
    }
}

/// A sparse crossword grid under construction
#[derive(Clone, Debug)]
pub struct Grid {
    cells: HashMap<Position, Cell>,
    /// Positions of each letter, in the order they were first written
    letter_index: HashMap<char, Vec<Position>>,
    bounds: Bounds,
    placements: Vec<Placement>,
}
impl Default for Grid {
    fn default() -> Self {
        Grid::new()
    }
}
impl Grid {
    pub fn new() -> Grid {
        Grid {
            cells: HashMap::new(),
            letter_index: HashMap::new(),
            bounds: Bounds::origin(),
            placements: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn letter(&self, position: Position) -> Option<char> {
        self.cells.get(&position).map(|cell| cell.letter)
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Checks whether `placement` may be played on the grid
    ///
    /// A legal placement does not extend an existing word at either end, does not touch a
    /// parallel word through any newly written cell, agrees with every letter it crosses, never
    /// runs along a word of its own orientation, writes at least one new cell, and keeps the
    /// layout within `MAX_ROWS` by `MAX_COLUMNS`.
    /// # Arguments
    /// * `placement` - The word, start and direction to check
    /// # Returns
    /// `bool` - whether the placement is legal
    pub fn can_place(&self, placement: &Placement) -> bool {
        if placement.word.is_empty() {
            return false;
        }
        let direction = placement.direction;
        if self.cells.contains_key(&placement.start.offset(direction, -1)) {
            return false;
        }
        if self.cells.contains_key(&placement.end().offset(direction, 1)) {
            return false;
        }

        let mut bounds = self.bounds;
        let mut adds_new_cell = false;
        for (position, letter) in placement.cells() {
            match self.cells.get(&position) {
                None => {
                    let neighbors = position.perpendicular_neighbors(direction);
                    if neighbors.iter().any(|n| self.cells.contains_key(n)) {
                        return false;
                    }
                    adds_new_cell = true;
                },
                Some(existing) => {
                    if existing.letter != letter || existing.has(direction) {
                        return false;
                    }
                }
            }
            bounds.include(position);
        }
        if bounds.rows() > MAX_ROWS || bounds.columns() > MAX_COLUMNS {
            return false;
        }
        adds_new_cell
    }

    /// Plays a word on the grid (assumes `can_place` already passed)
    pub fn place(&mut self, placement: Placement) {
        let direction = placement.direction;
        for (position, letter) in placement.cells() {
            match self.cells.get_mut(&position) {
                Some(existing) => existing.mark(direction),
                None => {
                    let mut cell = Cell { letter, horizontal: false, vertical: false };
                    cell.mark(direction);
                    self.cells.insert(position, cell);
                    self.letter_index.entry(letter).or_default().push(position);
                }
            }
            self.bounds.include(position);
        }
        self.placements.push(placement);
    }

    /// Every legal placement of `word` that crosses a letter already on the grid
    ///
    /// For each letter of the word and each grid cell holding that letter, the horizontal and the
    /// vertical placement aligning the two are tried. The result has no duplicates and keeps the
    /// order in which placements were first found.
    pub fn candidate_placements(&self, word: &str) -> Vec<Placement> {
        let mut seen: HashSet<Placement> = HashSet::new();
        let mut placements = Vec::new();
        for (index, letter) in word.chars().enumerate() {
            let positions = match self.letter_index.get(&letter) {
                Some(positions) => positions,
                None => continue,
            };
            for position in positions.iter() {
                for direction in [Direction::Horizontal, Direction::Vertical] {
                    let start = position.offset(direction, -(index as i32));
                    let placement = Placement::new(word, start, direction);
                    if !seen.contains(&placement) && self.can_place(&placement) {
                        seen.insert(placement.clone());
                        placements.push(placement);
                    }
                }
            }
        }
        placements
    }

    /// Materializes the occupied cells into a grid cropped to the bounding box
    pub fn into_layout(self) -> Layout {
        if self.cells.is_empty() {
            return Layout::empty();
        }
        let bounds = self.bounds;
        let mut board = Array2D::filled_with(EMPTY_CELL, bounds.rows(), bounds.columns());
        for (position, cell) in self.cells.iter() {
            let row = (position.row - bounds.min_row) as usize;
            let col = (position.col - bounds.min_col) as usize;
            board[(row, col)] = cell.letter;
        }
        Layout { board, placements: self.placements }
    }
}

/// A finished crossword: the cropped board plus the placements that produced it
#[derive(Clone, Debug)]
pub struct Layout {
    board: Array2D<char>,
    placements: Vec<Placement>,
}
impl Layout {
    pub fn empty() -> Layout {
        Layout { board: Array2D::filled_with(EMPTY_CELL, 0, 0), placements: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    pub fn num_rows(&self) -> usize {
        self.board.num_rows()
    }

    pub fn num_columns(&self) -> usize {
        self.board.num_columns()
    }

    /// The words played, in the order they were placed
    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    /// Row-major strings of the board, with `EMPTY_CELL` marking empty cells
    pub fn rows(&self) -> Vec<String> {
        (0..self.board.num_rows())
            .map(|r| (0..self.board.num_columns()).map(|c| self.board[(r, c)]).collect())
            .collect()
    }

    /// Every word of at least `min_word_length` letters readable across rows, then down columns
    pub fn words(&self, min_word_length: usize) -> Vec<String> {
        extract_words(&self.rows(), min_word_length)
    }

    /// The layout word set
    pub fn word_set(&self, min_word_length: usize) -> BTreeSet<String> {
        self.words(min_word_length).into_iter().collect()
    }
}
impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for row in self.rows() {
            writeln!(f, "{}", row)?;
        }
        Ok(())
    }
}

/// Collects each maximal run of non-empty cells of at least `min_word_length` in one line
fn collect_line_words<I: Iterator<Item = char>>(line: I, min_word_length: usize, words: &mut Vec<String>) {
    let mut current = String::new();
    for c in line.chain(std::iter::once(EMPTY_CELL)) {
        if c == EMPTY_CELL {
            if current.chars().count() >= min_word_length {
                words.push(current.to_uppercase());
            }
            current.clear();
        }
        else {
            current.push(c);
        }
    }
}

/// Reads every horizontal and vertical word out of grid rows
///
/// Rows shorter than the widest row are treated as padded with empty cells. Rows are scanned
/// first, then columns; each maximal run of at least `min_word_length` non-empty cells is
/// returned uppercased.
pub fn extract_words<S: AsRef<str>>(rows: &[S], min_word_length: usize) -> Vec<String> {
    let rows: Vec<Vec<char>> = rows.iter().map(|row| row.as_ref().chars().collect()).collect();
    let column_count = rows.iter().map(|row| row.len()).max().unwrap_or(0);
    let mut words = Vec::new();
    for row in rows.iter() {
        let padded = row.iter().copied().chain(std::iter::repeat(EMPTY_CELL)).take(column_count);
        collect_line_words(padded, min_word_length, &mut words);
    }
    for col in 0..column_count {
        let column = rows.iter().map(|row| row.get(col).copied().unwrap_or(EMPTY_CELL));
        collect_line_words(column, min_word_length, &mut words);
    }
    words
}

/// Uppercases, drops words with non-letters and removes duplicates, keeping first occurrences
fn normalize_words<S: AsRef<str>>(words: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(words.len());
    for raw_word in words {
        let candidate = raw_word.as_ref().trim().to_uppercase();
        if !is_letter_word(&candidate) || seen.contains(&candidate) {
            continue;
        }
        seen.insert(candidate.clone());
        normalized.push(candidate);
    }
    normalized
}

/// The base word followed by up to `PRIORITY_WORD_COUNT - 1` of the longest other words
fn priority_words(words: &[String], base_word: &str) -> Vec<String> {
    let mut by_length: Vec<&String> = words.iter().collect();
    by_length.sort_by(|w1, w2| w2.len().cmp(&w1.len()));
    let mut priority = vec![base_word.to_string()];
    for word in by_length {
        if priority.len() == PRIORITY_WORD_COUNT {
            break;
        }
        if word != base_word {
            priority.push(word.clone());
        }
    }
    priority
}

/// Greedily packs `words` into a crossword
///
/// A base word is drawn uniformly from the longest words and placed at the origin, horizontally
/// or vertically at random when both fit. The remaining priority words (the longest ones) are
/// then tried in length order, followed by every other word in random order. Each word takes a
/// uniformly chosen legal crossing placement, or is skipped when it has none.
/// # Arguments
/// * `words` - Candidate words, normalized internally
/// * `rng` - Source of randomness
/// # Returns
/// `Layout` - the cropped grid, empty when no word could be placed
pub fn synthesize<S: AsRef<str>, R: Rng + ?Sized>(words: &[S], rng: &mut R) -> Layout {
    let words = normalize_words(words);
    let longest = match words.iter().map(|w| w.len()).max() {
        Some(length) => length,
        None => return Layout::empty(),
    };
    let longest_words: Vec<&String> = words.iter().filter(|w| w.len() == longest).collect();
    let base_word = match longest_words.choose(rng) {
        Some(word) => (*word).clone(),
        None => return Layout::empty(),
    };

    let priority = priority_words(&words, &base_word);
    let mut remaining: Vec<String> = words.iter().filter(|w| !priority.contains(w)).cloned().collect();
    remaining.shuffle(rng);

    let fits_horizontal = base_word.len() <= MAX_COLUMNS;
    let fits_vertical = base_word.len() <= MAX_ROWS;
    let direction = match (fits_horizontal, fits_vertical) {
        (true, true) => rng.gen::<Direction>(),
        (true, false) => Direction::Horizontal,
        (false, true) => Direction::Vertical,
        (false, false) => return Layout::empty(),
    };

    let mut grid = Grid::new();
    grid.place(Placement::new(&base_word, Position::new(0, 0), direction));

    for word in priority.iter().chain(remaining.iter()) {
        if *word == base_word {
            continue;
        }
        let placements = grid.candidate_placements(word);
        if let Some(placement) = placements.choose(rng) {
            grid.place(placement.clone());
        }
    }
    grid.into_layout()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;

    fn grid_with(word: &str, direction: Direction) -> Grid {
        let mut grid = Grid::new();
        grid.place(Placement::new(word, Position::new(0, 0), direction));
        grid
    }

    #[test]
    fn single_word_layout_reads_back_the_word() {
        let mut rng = StdRng::seed_from_u64(7);
        let layout = synthesize(&["TEST"], &mut rng);
        assert_eq!(layout.placements().len(), 1);
        assert_eq!(layout.placements()[0].start, Position::new(0, 0));
        assert!(layout.rows() == vec!["TEST"] || layout.rows() == vec!["T", "E", "S", "T"]);
        let expected: BTreeSet<String> = ["TEST".to_string()].into_iter().collect();
        assert_eq!(layout.word_set(MIN_WORD_LENGTH), expected);
    }

    #[test]
    fn crossing_placement_is_legal() {
        let grid = grid_with("TEST", Direction::Horizontal);
        let tots = Placement::new("TOTS", Position::new(0, 0), Direction::Vertical);
        assert!(grid.can_place(&tots));
    }

    #[test]
    fn rejects_same_orientation_reuse() {
        let grid = grid_with("TEST", Direction::Horizontal);
        let again = Placement::new("TEST", Position::new(0, 0), Direction::Horizontal);
        assert!(!grid.can_place(&again));
    }

    #[test]
    fn rejects_word_extension() {
        let grid = grid_with("TEST", Direction::Horizontal);
        let extends = Placement::new("BEST", Position::new(0, 4), Direction::Horizontal);
        assert!(!grid.can_place(&extends));
        let prefixes = Placement::new("BEST", Position::new(0, -4), Direction::Horizontal);
        assert!(!grid.can_place(&prefixes));
    }

    #[test]
    fn rejects_mismatched_letters() {
        let grid = grid_with("TEST", Direction::Horizontal);
        let clash = Placement::new("ROAD", Position::new(-1, 1), Direction::Vertical);
        assert!(!grid.can_place(&clash));
    }

    #[test]
    fn rejects_parallel_neighbors() {
        let mut grid = grid_with("SEAT", Direction::Horizontal);
        grid.place(Placement::new("EARL", Position::new(0, 1), Direction::Vertical));
        let touching = Placement::new("AREA", Position::new(0, 2), Direction::Vertical);
        assert!(!grid.can_place(&touching));
    }

    #[test]
    fn rejects_layouts_wider_than_the_bound() {
        let mut grid = grid_with("ABCDEFGHIJKLMN", Direction::Horizontal);
        grid.place(Placement::new("NOON", Position::new(0, 13), Direction::Vertical));
        let wide = Placement::new("OPEN", Position::new(1, 13), Direction::Horizontal);
        assert!(!grid.can_place(&wide));
        let repeated = Placement::new("NOON", Position::new(0, 13), Direction::Vertical);
        assert!(!grid.can_place(&repeated));
    }

    #[test]
    fn candidate_placements_cross_existing_letters() {
        let grid = grid_with("TEST", Direction::Horizontal);
        let placements = grid.candidate_placements("SETS");
        assert!(!placements.is_empty());
        for placement in placements.iter() {
            assert_eq!(placement.direction, Direction::Vertical);
            assert!(placement.cells().any(|(p, c)| grid.letter(p) == Some(c)));
        }
        let unique: HashSet<&Placement> = placements.iter().collect();
        assert_eq!(unique.len(), placements.len());
    }

    #[test]
    fn words_longer_than_the_bound_produce_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        let layout = synthesize(&["ABCDEFGHIJKLMNO"], &mut rng);
        assert!(layout.is_empty());
        assert!(layout.rows().is_empty());
    }

    #[test]
    fn extraction_pads_ragged_rows() {
        let rows = ["CART", "A", "REST", "T"];
        let words = extract_words(&rows, 4);
        assert_eq!(words, vec!["CART", "REST", "CART"]);
    }

    #[test]
    fn synthesis_is_reproducible() {
        let words = ["CRANE", "NACRE", "CANE", "ACRE", "RACE", "EARN", "NEAR"];
        let first = synthesize(&words, &mut StdRng::seed_from_u64(42));
        let second = synthesize(&words, &mut StdRng::seed_from_u64(42));
        assert_eq!(first.rows(), second.rows());
        assert_eq!(first.placements(), second.placements());
    }

    #[test]
    fn base_word_is_one_of_the_longest() {
        let words = ["CANE", "CRANE", "NACRE", "RACE"];
        let layout = synthesize(&words, &mut StdRng::seed_from_u64(3));
        let base = &layout.placements()[0];
        assert!(base.word == "CRANE" || base.word == "NACRE");
        assert_eq!(base.start, Position::new(0, 0));
    }
}
