use anyhow::{anyhow, Result};

use crate::error::GameError;
use crate::geometry::{Direction, Geometry, DIRECTIONS};
use crate::packed_board::{Cell, PackedBoard, Player, Position};

/// Dimensions and win condition of a line-connection game
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Rules {
    pub rows: u16,
    pub cols: u16,
    /// Contiguous pieces needed to win
    pub win_length: u16,
    /// Pieces drop to the lowest empty row of a column
    pub gravity: bool,
}

impl Rules {
    pub fn new(rows: u16, cols: u16, win_length: u16, gravity: bool) -> Result<Self, GameError> {
        if rows == 0 || cols == 0 {
            return Err(GameError::InvalidRules(format!(
                "board must have at least one row and column, got {}x{}",
                rows, cols
            )));
        }
        if win_length < 2 || win_length > rows.max(cols) {
            return Err(GameError::InvalidRules(format!(
                "win length {} does not fit a {}x{} board",
                win_length, rows, cols
            )));
        }
        if rows as u32 * cols as u32 > u16::MAX as u32 {
            return Err(GameError::InvalidRules(format!(
                "{}x{} board is too large",
                rows, cols
            )));
        }
        Ok(Self {
            rows,
            cols,
            win_length,
            gravity,
        })
    }

    /// 6x7, four in a row, pieces drop into columns
    pub const fn connect_four() -> Self {
        Self {
            rows: 6,
            cols: 7,
            win_length: 4,
            gravity: true,
        }
    }

    /// 15x15, five in a row, free placement
    pub const fn gomoku() -> Self {
        Self {
            rows: 15,
            cols: 15,
            win_length: 5,
            gravity: false,
        }
    }

    pub const fn tic_tac_toe() -> Self {
        Self {
            rows: 3,
            cols: 3,
            win_length: 3,
            gravity: false,
        }
    }
}

/// A move as submitted by a player
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Move {
    /// Drop a piece into a column (gravity games)
    Drop { col: u16 },
    /// Place a piece on a cell (free-placement games)
    Place { row: u16, col: u16 },
}

impl Move {
    fn kind(self) -> &'static str {
        match self {
            Move::Drop { .. } => "drop",
            Move::Place { .. } => "place",
        }
    }

    pub fn col(self) -> u16 {
        match self {
            Move::Drop { col } | Move::Place { col, .. } => col,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum MoveOutcome {
    Playing,
    Win(Player),
    Draw,
}

/// Board, turn and result bookkeeping for one game
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct GameState {
    rules: Rules,
    board: PackedBoard,
    current_player: Player,
    move_count: u32,
    winner: Option<Player>,
    starting_player: Player,
    // cells in the order they were filled, for undo
    history: Vec<Position>,
}

impl GameState {
    /// A fresh game, Player One to move
    pub fn new(rules: Rules) -> Self {
        Self::with_starting_player(rules, Player::One)
    }

    pub fn with_starting_player(rules: Rules, starting_player: Player) -> Self {
        Self {
            rules,
            board: PackedBoard::new(rules.rows, rules.cols),
            current_player: starting_player,
            move_count: 0,
            winner: None,
            starting_player,
            history: Vec::with_capacity(rules.rows as usize * rules.cols as usize),
        }
    }

    /// Replays a string of 1-indexed column digits on a gravity board
    pub fn from_moves<S: AsRef<str>>(rules: Rules, moves: S) -> Result<Self> {
        let mut state = Self::new(rules);
        for column_char in moves.as_ref().chars() {
            match column_char.to_digit(10).map(|c| c as u16) {
                Some(column) if column >= 1 => {
                    state.make_move(Move::Drop { col: column - 1 })?;
                }
                _ => return Err(anyhow!("could not parse '{}' as a valid move", column_char)),
            }
        }
        Ok(state)
    }

    #[inline]
    pub fn rules(&self) -> Rules {
        self.rules
    }

    #[inline]
    pub fn board(&self) -> &PackedBoard {
        &self.board
    }

    #[inline]
    pub fn geometry(&self) -> Geometry {
        Geometry::new(self.rules.rows, self.rules.cols)
    }

    #[inline]
    pub fn current_player(&self) -> Player {
        self.current_player
    }

    #[inline]
    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    #[inline]
    pub fn starting_player(&self) -> Player {
        self.starting_player
    }

    pub fn last_move(&self) -> Option<Position> {
        self.history.last().copied()
    }

    #[inline]
    pub fn get_winner(&self) -> Option<Player> {
        self.winner
    }

    #[inline]
    pub fn is_game_over(&self) -> bool {
        self.winner.is_some() || self.board.is_full()
    }

    pub fn is_draw(&self) -> bool {
        self.winner.is_none() && self.board.is_full()
    }

    pub fn outcome(&self) -> MoveOutcome {
        match self.winner {
            Some(player) => MoveOutcome::Win(player),
            None if self.board.is_full() => MoveOutcome::Draw,
            None => MoveOutcome::Playing,
        }
    }

    /// The cell `mv` would fill, or why it is not legal
    pub fn resolve(&self, mv: Move) -> Result<Position, GameError> {
        if self.is_game_over() {
            return Err(GameError::GameAlreadyOver);
        }
        match (mv, self.rules.gravity) {
            (Move::Drop { col }, true) => match self.board.drop_row(col as usize)? {
                Some(row) => Ok(Position::new(row, col)),
                None => Err(GameError::PositionOccupied { row: 0, col }),
            },
            (Move::Place { row, col }, false) => {
                if self.board.get(row as usize, col as usize)?.is_empty() {
                    Ok(Position::new(row, col))
                } else {
                    Err(GameError::PositionOccupied { row, col })
                }
            }
            (mv, gravity) => Err(GameError::MoveKindMismatch {
                expected: if gravity { "drop" } else { "place" },
                found: mv.kind(),
            }),
        }
    }

    pub fn is_valid_move(&self, mv: Move) -> bool {
        self.resolve(mv).is_ok()
    }

    /// Applies `mv` for the current player, leaving the state untouched on error
    pub fn make_move(&mut self, mv: Move) -> Result<MoveOutcome, GameError> {
        let pos = self.resolve(mv)?;
        self.apply(pos);
        Ok(self.outcome())
    }

    /// Fills a cell already validated by `resolve` or taken from `legal_moves`
    pub(crate) fn apply(&mut self, pos: Position) {
        let player = self.current_player;
        self.board.put(pos, player.to_cell());
        self.history.push(pos);
        self.move_count += 1;

        if self.longest_run_through(pos, player) >= self.rules.win_length {
            self.winner = Some(player);
        } else if !self.board.is_full() {
            self.current_player = player.other();
        }
    }

    /// Removes the most recent piece and hands the turn back to its owner
    pub fn undo(&mut self) -> Option<Position> {
        let pos = self.history.pop()?;
        if let Some(owner) = self.board.at(pos).owner() {
            self.current_player = owner;
        }
        self.board.put(pos, Cell::Empty);
        self.move_count -= 1;
        self.winner = None;
        Some(pos)
    }

    pub fn reset(&mut self) {
        self.reset_with_starting_player(self.starting_player);
    }

    pub fn reset_with_starting_player(&mut self, player: Player) {
        self.board.clear();
        self.history.clear();
        self.current_player = player;
        self.starting_player = player;
        self.move_count = 0;
        self.winner = None;
    }

    /// Independent deep copy, undo history included
    #[inline]
    pub fn fast_clone(&self) -> Self {
        Self {
            rules: self.rules,
            board: self.board.fast_clone(),
            current_player: self.current_player,
            move_count: self.move_count,
            winner: self.winner,
            starting_player: self.starting_player,
            history: self.history.clone(),
        }
    }

    /// Copy for exploring one search branch
    ///
    /// Same board, turn and result as `self` but no undo history, so the copy
    /// costs the board words alone. `undo` on it only reverts moves made on the branch.
    #[inline]
    pub(crate) fn branch(&self) -> Self {
        Self {
            rules: self.rules,
            board: self.board.fast_clone(),
            current_player: self.current_player,
            move_count: self.move_count,
            winner: self.winner,
            starting_player: self.starting_player,
            history: Vec::new(),
        }
    }

    /// A hypothetical copy of this state with `player` to move; `self` is untouched
    pub fn with_current_player(&self, player: Player) -> Self {
        let mut hypothetical = self.fast_clone();
        hypothetical.current_player = player;
        hypothetical
    }

    /// Contiguous cells of `player` through `pos` along `direction`, counting `pos` itself
    ///
    /// The content of `pos` is ignored so this also answers "what if `player` played here".
    pub fn run_through(&self, pos: Position, direction: Direction, player: Player) -> u16 {
        let geometry = self.geometry();
        let cell = player.to_cell();
        let forward = geometry
            .ray(pos, direction, true)
            .take_while(|&p| self.board.at(p) == cell)
            .count();
        let backward = geometry
            .ray(pos, direction, false)
            .take_while(|&p| self.board.at(p) == cell)
            .count();
        (1 + forward + backward) as u16
    }

    pub fn longest_run_through(&self, pos: Position, player: Player) -> u16 {
        DIRECTIONS
            .iter()
            .map(|&direction| self.run_through(pos, direction, player))
            .max()
            .unwrap_or(1)
    }

    /// Whether a piece could be put on `pos` right now
    pub fn is_playable(&self, pos: Position) -> bool {
        if !self.board.at(pos).is_empty() {
            return false;
        }
        !self.rules.gravity || matches!(self.board.drop_row(pos.col as usize), Ok(Some(row)) if row == pos.row)
    }

    /// The move that fills `pos` in this game's move kind
    pub fn move_to(&self, pos: Position) -> Move {
        if self.rules.gravity {
            Move::Drop { col: pos.col }
        } else {
            Move::Place {
                row: pos.row,
                col: pos.col,
            }
        }
    }

    /// Every cell a legal move could fill
    pub fn playable_positions(&self) -> Vec<Position> {
        if self.is_game_over() {
            return Vec::new();
        }
        if self.rules.gravity {
            (0..self.rules.cols)
                .filter_map(|col| match self.board.drop_row(col as usize) {
                    Ok(Some(row)) => Some(Position::new(row, col)),
                    _ => None,
                })
                .collect()
        } else {
            self.board
                .positions()
                .filter(|&p| self.board.at(p).is_empty())
                .collect()
        }
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        self.playable_positions()
            .into_iter()
            .map(|p| self.move_to(p))
            .collect()
    }

    /// Playable cells worth searching
    ///
    /// Gravity games have at most one per column so all are returned; free-placement
    /// games only consider empty cells within `radius` of an existing piece, and
    /// fall back to every empty cell when none is that close.
    pub fn candidate_positions(&self, radius: u16) -> Vec<Position> {
        if self.rules.gravity || self.is_game_over() {
            return self.playable_positions();
        }
        if self.move_count == 0 {
            return vec![self.geometry().center()];
        }
        let geometry = self.geometry();
        let radius = radius as i32;
        let nearby: Vec<Position> = self
            .board
            .positions()
            .filter(|&p| self.board.at(p).is_empty())
            .filter(|&p| {
                (-radius..=radius).any(|dr| {
                    (-radius..=radius).any(|dc| {
                        let (row, col) = (p.row as i32 + dr, p.col as i32 + dc);
                        geometry.contains(row, col)
                            && !self
                                .board
                                .at(Position::new(row as u16, col as u16))
                                .is_empty()
                    })
                })
            })
            .collect();
        if nearby.is_empty() {
            self.playable_positions()
        } else {
            nearby
        }
    }

    pub fn candidate_moves(&self, radius: u16) -> Vec<Move> {
        self.candidate_positions(radius)
            .into_iter()
            .map(|p| self.move_to(p))
            .collect()
    }
}

/// Creates a fresh game for any board size, win length and gravity setting
pub fn new_game(rows: u16, cols: u16, win_length: u16, gravity: bool) -> Result<GameState, GameError> {
    Ok(GameState::new(Rules::new(rows, cols, win_length, gravity)?))
}
