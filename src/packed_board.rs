//! A fixed-size grid storing two bits per cell

use std::fmt;

use static_assertions::const_assert;

use crate::error::GameError;

/// Number of bits used to encode one cell
pub const BITS_PER_CELL: usize = 2;
/// Number of cells packed into each storage word
pub const CELLS_PER_WORD: usize = 64 / BITS_PER_CELL;

// cells must never straddle two words
const_assert!(64 % BITS_PER_CELL == 0);
// empty, two players and the reserved pattern all fit in a cell
const_assert!(1 << BITS_PER_CELL >= 4);

mod static_masks {
    use super::{BITS_PER_CELL, CELLS_PER_WORD};

    /// The low bit of every cell in a word
    pub const fn low_bits() -> u64 {
        let mut mask = 0;
        let mut cell = 0;
        while cell < CELLS_PER_WORD {
            mask |= 1 << (cell * BITS_PER_CELL);
            cell += 1;
        }
        mask
    }

    pub const CELL_MASK: u64 = (1 << BITS_PER_CELL) - 1;
}

/// The content of a single board cell
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Cell {
    Empty = 0,
    One = 1,
    Two = 2,
}

impl Cell {
    fn from_bits(bits: u64) -> Result<Self, GameError> {
        match bits {
            0 => Ok(Cell::Empty),
            1 => Ok(Cell::One),
            2 => Ok(Cell::Two),
            reserved => Err(GameError::Board(format!(
                "reserved cell pattern {:#04b} in packed storage",
                reserved
            ))),
        }
    }

    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }

    /// The player owning this cell, if any
    pub fn owner(self) -> Option<Player> {
        match self {
            Cell::Empty => None,
            Cell::One => Some(Player::One),
            Cell::Two => Some(Player::Two),
        }
    }
}

/// One of the two sides of a game
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, serde::Serialize, serde::Deserialize)]
pub enum Player {
    One,
    Two,
}

impl Player {
    /// Get the other player
    #[inline]
    pub fn other(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    #[inline]
    pub fn to_cell(self) -> Cell {
        match self {
            Player::One => Cell::One,
            Player::Two => Cell::Two,
        }
    }

    /// Host-neutral encoding, 1 or 2
    pub fn code(self) -> u8 {
        match self {
            Player::One => 1,
            Player::Two => 2,
        }
    }

    /// Get player name for display
    pub fn name(self) -> &'static str {
        match self {
            Player::One => "Player 1",
            Player::Two => "Player 2",
        }
    }
}

impl TryFrom<u8> for Player {
    type Error = GameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Player::One),
            2 => Ok(Player::Two),
            other => Err(GameError::InvalidPlayer(other)),
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A cell coordinate, row 0 being the top row
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct Position {
    pub row: u16,
    pub col: u16,
}

impl Position {
    #[inline]
    pub fn new(row: u16, col: u16) -> Self {
        Self { row, col }
    }
}

/// A `rows` x `cols` grid storing 2 bits per cell in `u64` words
///
/// The word slice is sized once in [`PackedBoard::new`] and never grows, so
/// cloning costs one copy of the storage words regardless of how the cells
/// are filled.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct PackedBoard {
    rows: u16,
    cols: u16,
    words: Box<[u64]>,
    // number of non-empty cells
    filled: u32,
}

impl PackedBoard {
    pub fn new(rows: u16, cols: u16) -> Self {
        let cells = rows as usize * cols as usize;
        let num_words = (cells + CELLS_PER_WORD - 1) / CELLS_PER_WORD;
        Self {
            rows,
            cols,
            words: vec![0; num_words].into_boxed_slice(),
            filled: 0,
        }
    }

    #[inline]
    pub fn rows(&self) -> u16 {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> u16 {
        self.cols
    }

    #[inline]
    pub fn cell_count(&self) -> u32 {
        self.rows as u32 * self.cols as u32
    }

    #[inline]
    pub fn filled(&self) -> u32 {
        self.filled
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.filled == self.cell_count()
    }

    #[inline]
    pub fn in_bounds(&self, row: usize, col: usize) -> bool {
        row < self.rows as usize && col < self.cols as usize
    }

    fn check_bounds(&self, row: usize, col: usize) -> Result<(), GameError> {
        if self.in_bounds(row, col) {
            Ok(())
        } else {
            Err(GameError::OutOfBounds {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            })
        }
    }

    // (word index, bit shift) of a cell
    #[inline]
    fn locate(&self, row: usize, col: usize) -> (usize, usize) {
        let idx = row * self.cols as usize + col;
        (idx / CELLS_PER_WORD, (idx % CELLS_PER_WORD) * BITS_PER_CELL)
    }

    pub fn get(&self, row: usize, col: usize) -> Result<Cell, GameError> {
        self.check_bounds(row, col)?;
        let (word, shift) = self.locate(row, col);
        Cell::from_bits((self.words[word] >> shift) & static_masks::CELL_MASK)
    }

    /// Unchecked read for positions already known to be in bounds
    ///
    /// The reserved pattern is never written, so it reads back as empty here.
    #[inline]
    pub fn at(&self, pos: Position) -> Cell {
        let (word, shift) = self.locate(pos.row as usize, pos.col as usize);
        match (self.words[word] >> shift) & static_masks::CELL_MASK {
            1 => Cell::One,
            2 => Cell::Two,
            _ => Cell::Empty,
        }
    }

    pub fn set(&mut self, row: usize, col: usize, value: Cell) -> Result<(), GameError> {
        self.check_bounds(row, col)?;
        self.put(Position::new(row as u16, col as u16), value);
        Ok(())
    }

    /// Unchecked write for positions already known to be in bounds
    #[inline]
    pub(crate) fn put(&mut self, pos: Position, value: Cell) {
        let (word, shift) = self.locate(pos.row as usize, pos.col as usize);
        let previous = (self.words[word] >> shift) & static_masks::CELL_MASK;
        self.words[word] =
            (self.words[word] & !(static_masks::CELL_MASK << shift)) | ((value as u64) << shift);

        match (previous == 0, value.is_empty()) {
            (true, false) => self.filled += 1,
            (false, true) => self.filled -= 1,
            _ => {}
        }
    }

    /// Deep copy of the board, proportional to the number of storage words
    #[inline]
    pub fn fast_clone(&self) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            words: self.words.clone(),
            filled: self.filled,
        }
    }

    /// Number of contiguous occupied cells counted up from the bottom row
    pub fn column_height(&self, col: usize) -> Result<u16, GameError> {
        self.check_bounds(0, col)?;
        let mut height = 0;
        for row in (0..self.rows).rev() {
            if self.at(Position::new(row, col as u16)).is_empty() {
                break;
            }
            height += 1;
        }
        Ok(height)
    }

    /// The row a piece dropped into `col` would land in, `None` when the column is full
    pub fn drop_row(&self, col: usize) -> Result<Option<u16>, GameError> {
        let height = self.column_height(col)?;
        Ok(if height < self.rows {
            Some(self.rows - 1 - height)
        } else {
            None
        })
    }

    /// Count the cells holding `cell`
    pub fn count(&self, cell: Cell) -> u32 {
        let low = static_masks::low_bits();
        let (mut ones, mut twos) = (0, 0);
        for &word in self.words.iter() {
            let lo = word & low;
            let hi = (word >> 1) & low;
            ones += (lo & !hi).count_ones();
            twos += (hi & !lo).count_ones();
        }
        match cell {
            Cell::One => ones,
            Cell::Two => twos,
            Cell::Empty => self.cell_count() - self.filled,
        }
    }

    /// Check the storage for reserved patterns and a consistent fill counter
    pub fn validate(&self) -> Result<(), GameError> {
        let low = static_masks::low_bits();
        for (i, &word) in self.words.iter().enumerate() {
            let reserved = word & (word >> 1) & low;
            if reserved != 0 {
                return Err(GameError::Board(format!(
                    "reserved cell pattern in storage word {}",
                    i
                )));
            }
        }
        let occupied = self.count(Cell::One) + self.count(Cell::Two);
        if occupied != self.filled {
            return Err(GameError::Board(format!(
                "fill counter {} does not match {} occupied cells",
                self.filled, occupied
            )));
        }
        Ok(())
    }

    /// Empty every cell, keeping the dimensions
    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
        self.filled = 0;
    }

    /// Iterate over every position, row by row from the top
    pub fn positions(&self) -> impl Iterator<Item = Position> {
        let cols = self.cols;
        (0..self.rows).flat_map(move |row| (0..cols).map(move |col| Position::new(row, col)))
    }

    #[cfg(test)]
    pub(crate) fn corrupt(&mut self, row: usize, col: usize) {
        let (word, shift) = self.locate(row, col);
        self.words[word] |= static_masks::CELL_MASK << shift;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_roundtrip_across_words() {
        let mut board = PackedBoard::new(6, 7);
        board.set(5, 6, Cell::One).unwrap();
        // index 32 starts the second word
        board.set(4, 4, Cell::Two).unwrap();
        assert_eq!(board.get(5, 6).unwrap(), Cell::One);
        assert_eq!(board.get(4, 4).unwrap(), Cell::Two);
        assert_eq!(board.get(0, 0).unwrap(), Cell::Empty);
        assert_eq!(board.filled(), 2);
    }

    #[test]
    fn test_out_of_bounds() {
        let mut board = PackedBoard::new(6, 7);
        assert!(matches!(
            board.get(6, 0),
            Err(GameError::OutOfBounds { row: 6, col: 0, .. })
        ));
        assert!(board.set(0, 7, Cell::One).is_err());
        assert_eq!(board.filled(), 0);
    }

    #[test]
    fn test_fill_counter_and_is_full() {
        let mut board = PackedBoard::new(2, 2);
        for pos in board.positions().collect::<Vec<_>>() {
            board.set(pos.row as usize, pos.col as usize, Cell::Two).unwrap();
        }
        assert!(board.is_full());
        // overwriting an occupied cell keeps the count
        board.set(0, 0, Cell::One).unwrap();
        assert_eq!(board.filled(), 4);
        board.set(0, 0, Cell::Empty).unwrap();
        assert_eq!(board.filled(), 3);
        assert!(!board.is_full());
    }

    #[test]
    fn test_fast_clone_is_independent() {
        let mut board = PackedBoard::new(15, 15);
        board.set(7, 7, Cell::One).unwrap();
        let mut copy = board.fast_clone();
        copy.set(7, 8, Cell::Two).unwrap();
        assert_eq!(board.get(7, 8).unwrap(), Cell::Empty);
        assert_eq!(board.filled(), 1);
        assert_eq!(copy.filled(), 2);
    }

    #[test]
    fn test_column_height_and_drop_row() {
        let mut board = PackedBoard::new(6, 7);
        assert_eq!(board.drop_row(3).unwrap(), Some(5));
        board.set(5, 3, Cell::One).unwrap();
        board.set(4, 3, Cell::Two).unwrap();
        assert_eq!(board.column_height(3).unwrap(), 2);
        assert_eq!(board.drop_row(3).unwrap(), Some(3));
        for row in 0..4 {
            board.set(row, 3, Cell::One).unwrap();
        }
        assert_eq!(board.drop_row(3).unwrap(), None);
        assert!(board.drop_row(7).is_err());
    }

    #[test]
    fn test_count_by_cell() {
        let mut board = PackedBoard::new(3, 3);
        board.set(0, 0, Cell::One).unwrap();
        board.set(1, 1, Cell::One).unwrap();
        board.set(2, 2, Cell::Two).unwrap();
        assert_eq!(board.count(Cell::One), 2);
        assert_eq!(board.count(Cell::Two), 1);
        assert_eq!(board.count(Cell::Empty), 6);
    }

    #[test]
    fn test_reserved_pattern_is_board_error() {
        let mut board = PackedBoard::new(3, 3);
        board.corrupt(1, 2);
        assert!(matches!(board.get(1, 2), Err(GameError::Board(_))));
        assert!(board.validate().is_err());
    }

    #[test]
    fn test_player_codes() {
        assert_eq!(Player::try_from(1).unwrap(), Player::One);
        assert_eq!(Player::try_from(2).unwrap(), Player::Two);
        assert_eq!(Player::try_from(0), Err(GameError::InvalidPlayer(0)));
        assert_eq!(Player::Two.code(), 2);
        assert_eq!(Player::One.other(), Player::Two);
    }
}
