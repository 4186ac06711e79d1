//! Tactical pattern detection
//!
//! The analyzer answers, for either player and regardless of whose turn it is:
//! - which cells win immediately
//! - which open threes and closed fours are on the board
//! - which moves create a fork (two threats a single block cannot stop)
//! - which `_ X _ X _` patterns a gravity game holds on a playable row
//!
//! Patterns are deduplicated by their canonical cell set, so a line seen from
//! several scan directions or origins is reported once.

use std::collections::HashSet;

use crate::game_state::{GameState, Move};
use crate::geometry::{Direction, Geometry, DIRECTIONS};
use crate::packed_board::{Cell, Player, Position};

/// Search radius used when looking for fork moves on free-placement boards
const FORK_RADIUS: u16 = 2;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub enum ThreatKind {
    /// Playing the completion cell wins on the spot
    ImmediateWin,
    /// Four in a line with at least one open end
    ClosedFour,
    /// A move creating two threats at once
    Fork,
    /// `_ X _ X _` on a row where every gap is playable
    BottomRowFork,
    /// Exactly three in a line with both ends open
    OpenThree,
}

/// A pattern found on the board, owned by one player
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct ThreatPattern {
    pub kind: ThreatKind,
    pub owner: Player,
    /// The owner's pieces forming the pattern
    pub stones: Vec<Position>,
    /// Empty cells completing or extending the pattern
    pub completions: Vec<Position>,
}

impl ThreatPattern {
    fn new(
        kind: ThreatKind,
        owner: Player,
        mut stones: Vec<Position>,
        mut completions: Vec<Position>,
    ) -> Self {
        stones.sort_unstable();
        completions.sort_unstable();
        completions.dedup();
        Self {
            kind,
            owner,
            stones,
            completions,
        }
    }
}

fn dedup_patterns(patterns: Vec<ThreatPattern>) -> Vec<ThreatPattern> {
    let mut seen = HashSet::new();
    patterns
        .into_iter()
        .filter(|p| seen.insert(p.clone()))
        .collect()
}

fn dedup_positions(positions: Vec<Position>) -> Vec<Position> {
    let mut seen = HashSet::new();
    positions.into_iter().filter(|p| seen.insert(*p)).collect()
}

// a run's cells with its empty flanking cells, if any
type Run = (Vec<Position>, Option<Position>, Option<Position>);

/// Read-only pattern scanner over one game state
pub struct ThreatAnalyzer<'a> {
    state: &'a GameState,
    geometry: Geometry,
}

impl<'a> ThreatAnalyzer<'a> {
    pub fn new(state: &'a GameState) -> Self {
        Self {
            state,
            geometry: state.geometry(),
        }
    }

    #[inline]
    fn owns(&self, pos: Position, player: Player) -> bool {
        self.state.board().at(pos) == player.to_cell()
    }

    #[inline]
    fn is_empty_at(&self, pos: Option<Position>) -> Option<Position> {
        pos.filter(|&p| self.state.board().at(p) == Cell::Empty)
    }

    fn pieces(&self, player: Player) -> impl Iterator<Item = Position> + '_ {
        let cell = player.to_cell();
        self.state
            .board()
            .positions()
            .filter(move |&p| self.state.board().at(p) == cell)
    }

    /// Contiguous run of `player` starting at `start` and walking forward
    fn run_from(&self, start: Position, direction: Direction, player: Player) -> Vec<Position> {
        std::iter::once(start)
            .chain(self.geometry.ray(start, direction, true))
            .take_while(|&p| self.owns(p, player))
            .collect()
    }

    /// Pieces of `player` adjacent to `pos` along `direction`, both ways
    fn run_around(&self, pos: Position, direction: Direction, player: Player) -> Vec<Position> {
        let mut cells: Vec<Position> = self
            .geometry
            .ray(pos, direction, true)
            .take_while(|&p| self.owns(p, player))
            .collect();
        cells.extend(
            self.geometry
                .ray(pos, direction, false)
                .take_while(|&p| self.owns(p, player)),
        );
        cells
    }

    /// Runs of exactly `len` pieces, each reported once from its first cell
    fn runs_of(&self, player: Player, len: usize) -> Vec<Run> {
        let mut runs = Vec::new();
        for start in self.pieces(player) {
            for &direction in DIRECTIONS.iter() {
                let before = self.geometry.step(start, direction, -1);
                if before.map_or(false, |p| self.owns(p, player)) {
                    continue;
                }
                let run = self.run_from(start, direction, player);
                if run.len() != len {
                    continue;
                }
                let after = self.geometry.step(start, direction, len as i32);
                runs.push((run, self.is_empty_at(before), self.is_empty_at(after)));
            }
        }
        runs
    }

    /// Empty cells touching a piece of `player`, in board order
    fn touching(&self, player: Player) -> Vec<Position> {
        let mut cells: Vec<Position> = self
            .pieces(player)
            .flat_map(|piece| {
                DIRECTIONS.into_iter().flat_map(move |d| {
                    [
                        self.geometry.step(piece, d, 1),
                        self.geometry.step(piece, d, -1),
                    ]
                })
            })
            .filter_map(|p| self.is_empty_at(p))
            .collect();
        cells.sort_unstable();
        cells.dedup();
        cells
    }

    /// Playable cells that complete a line for `player` (gapped lines included)
    pub fn winning_cells(&self, player: Player) -> Vec<Position> {
        if self.state.is_game_over() {
            return Vec::new();
        }
        let win_length = self.state.rules().win_length;
        // a completing cell always touches one of the player's pieces
        let cells = if self.state.rules().gravity {
            self.state.playable_positions()
        } else {
            self.touching(player)
        };
        cells
            .into_iter()
            .filter(|&p| self.state.longest_run_through(p, player) >= win_length)
            .collect()
    }

    pub fn winning_moves(&self, player: Player) -> Vec<Move> {
        self.to_moves(self.winning_cells(player))
    }

    /// Moves `player` must make to stop the opponent winning next turn
    pub fn forced_blocks(&self, player: Player) -> Vec<Move> {
        self.winning_moves(player.other())
    }

    pub fn immediate_wins(&self, player: Player) -> Vec<ThreatPattern> {
        let win_length = self.state.rules().win_length;
        let patterns = self
            .winning_cells(player)
            .into_iter()
            .flat_map(|cell| {
                DIRECTIONS
                    .into_iter()
                    .filter(move |&d| self.state.run_through(cell, d, player) >= win_length)
                    .map(move |d| {
                        ThreatPattern::new(
                            ThreatKind::ImmediateWin,
                            player,
                            self.run_around(cell, d, player),
                            vec![cell],
                        )
                    })
            })
            .collect();
        dedup_patterns(patterns)
    }

    /// Exactly three in a line with both flanking cells in bounds and empty
    pub fn open_threes(&self, player: Player) -> Vec<ThreatPattern> {
        let patterns = self
            .runs_of(player, 3)
            .into_iter()
            .filter_map(|(stones, before, after)| match (before, after) {
                (Some(b), Some(a)) => Some(ThreatPattern::new(
                    ThreatKind::OpenThree,
                    player,
                    stones,
                    vec![b, a],
                )),
                _ => None,
            })
            .collect();
        dedup_patterns(patterns)
    }

    /// Exactly four in a line with at least one open end
    ///
    /// Only meaningful when more than four are needed to win; with four, a
    /// line of four has already ended the game.
    pub fn closed_fours(&self, player: Player) -> Vec<ThreatPattern> {
        if self.state.rules().win_length <= 4 {
            return Vec::new();
        }
        let patterns = self
            .runs_of(player, 4)
            .into_iter()
            .filter_map(|(stones, before, after)| {
                let completions: Vec<Position> = before.into_iter().chain(after).collect();
                if completions.is_empty() {
                    None
                } else {
                    Some(ThreatPattern::new(
                        ThreatKind::ClosedFour,
                        player,
                        stones,
                        completions,
                    ))
                }
            })
            .collect();
        dedup_patterns(patterns)
    }

    fn fork_candidates(&self) -> Vec<Position> {
        self.state.candidate_positions(FORK_RADIUS)
    }

    /// Cells where `player` would create two threats at once
    ///
    /// A fork is either two new open threes through the cell (double-three) or
    /// two distinct winning cells afterwards. Cells that win outright are not forks.
    pub fn fork_cells(&self, player: Player) -> Vec<Position> {
        if self.state.is_game_over() {
            return Vec::new();
        }
        let win_length = self.state.rules().win_length;
        let existing = self.winning_cells(player);
        self.fork_candidates()
            .into_iter()
            .filter(|&cell| self.state.longest_run_through(cell, player) < win_length)
            .filter(|&cell| self.creates_fork(cell, player, &existing))
            .collect()
    }

    /// Whether `player` playing `cell` forks, looking only at the lines through it
    ///
    /// `existing` holds the winning cells before the move; they stay winning
    /// afterwards apart from `cell` itself.
    fn creates_fork(&self, cell: Position, player: Player, existing: &[Position]) -> bool {
        let rules = self.state.rules();
        let mut threes = 0;
        let mut wins: Vec<Position> = existing.iter().copied().filter(|&w| w != cell).collect();

        for &direction in DIRECTIONS.iter() {
            let forward = self.count_with(cell, direction, player, cell, true);
            let backward = self.count_with(cell, direction, player, cell, false);
            if forward + backward + 1 == 3 {
                let before = self.geometry.step(cell, direction, -(backward as i32 + 1));
                let after = self.geometry.step(cell, direction, forward as i32 + 1);
                if self.is_empty_at(before).is_some() && self.is_empty_at(after).is_some() {
                    threes += 1;
                }
            }

            // a new winning cell lies on this line with `cell` inside its run
            for n in 1..rules.win_length as i32 {
                for &sign in [1, -1].iter() {
                    let target = match self.geometry.step(cell, direction, n * sign) {
                        Some(target) => target,
                        None => continue,
                    };
                    if !wins.contains(&target)
                        && self.playable_after(target, cell)
                        && self.run_with(target, direction, player, cell) >= rules.win_length
                    {
                        wins.push(target);
                    }
                }
            }
        }

        // in gravity games the cell above becomes playable
        if rules.gravity && cell.row > 0 {
            let above = Position::new(cell.row - 1, cell.col);
            if !wins.contains(&above)
                && DIRECTIONS
                    .iter()
                    .any(|&d| self.run_with(above, d, player, cell) >= rules.win_length)
            {
                wins.push(above);
            }
        }

        threes >= 2 || wins.len() >= 2
    }

    /// Pieces of `player` leaving `pos` along `direction`, with `extra` counted as owned
    fn count_with(
        &self,
        pos: Position,
        direction: Direction,
        player: Player,
        extra: Position,
        forward: bool,
    ) -> usize {
        self.geometry
            .ray(pos, direction, forward)
            .take_while(|&p| p == extra || self.owns(p, player))
            .count()
    }

    fn run_with(&self, pos: Position, direction: Direction, player: Player, extra: Position) -> u16 {
        (1 + self.count_with(pos, direction, player, extra, true)
            + self.count_with(pos, direction, player, extra, false)) as u16
    }

    /// Whether `pos` could be played once `filled` holds a piece
    fn playable_after(&self, pos: Position, filled: Position) -> bool {
        if pos == filled || self.is_empty_at(Some(pos)).is_none() {
            return false;
        }
        !self.state.rules().gravity
            || self.state.is_playable(pos)
            || (pos.col == filled.col && pos.row + 1 == filled.row)
    }

    pub fn fork_moves(&self, player: Player) -> Vec<Move> {
        self.to_moves(self.fork_cells(player))
    }

    fn fork_patterns(&self, player: Player) -> Vec<ThreatPattern> {
        self.fork_cells(player)
            .into_iter()
            .map(|cell| ThreatPattern::new(ThreatKind::Fork, player, Vec::new(), vec![cell]))
            .collect()
    }

    /// `_ X _ X _` on a row where all three gaps can be played right now
    ///
    /// Taking the middle gap leaves an open three with both ends playable, so
    /// the defender has to answer before it is made.
    pub fn bottom_row_forks(&self, player: Player) -> Vec<ThreatPattern> {
        let rules = self.state.rules();
        if !rules.gravity || rules.win_length != 4 || rules.cols < 5 {
            return Vec::new();
        }
        let mut patterns = Vec::new();
        for row in 0..rules.rows {
            for start in 0..=(rules.cols - 5) {
                let cells: Vec<Position> = (start..start + 5).map(|col| Position::new(row, col)).collect();
                let stones = [cells[1], cells[3]];
                let gaps = [cells[0], cells[2], cells[4]];
                if stones.iter().all(|&p| self.owns(p, player))
                    && gaps.iter().all(|&p| self.state.is_playable(p))
                {
                    patterns.push(ThreatPattern::new(
                        ThreatKind::BottomRowFork,
                        player,
                        stones.to_vec(),
                        gaps.to_vec(),
                    ));
                }
            }
        }
        dedup_patterns(patterns)
    }

    /// Moves `defender` should consider to defuse the opponent's forks
    ///
    /// Every gap of an opposing `_ X _ X _` (both flanks included) and every
    /// cell where the opponent could fork next turn.
    pub fn get_fork_blocking_moves(&self, defender: Player) -> Vec<Move> {
        let attacker = defender.other();
        let mut cells: Vec<Position> = self
            .bottom_row_forks(attacker)
            .into_iter()
            .flat_map(|p| p.completions)
            .collect();
        cells.extend(self.fork_cells(attacker));
        let cells = dedup_positions(cells);
        self.to_moves(cells)
    }

    /// Every pattern held by `player`, deduplicated
    pub fn patterns(&self, player: Player) -> Vec<ThreatPattern> {
        let mut patterns = self.immediate_wins(player);
        patterns.extend(self.closed_fours(player));
        patterns.extend(self.fork_patterns(player));
        patterns.extend(self.bottom_row_forks(player));
        patterns.extend(self.open_threes(player));
        dedup_patterns(patterns)
    }

    /// Candidate cells for `player` in search order
    ///
    /// Immediate wins first, then forced blocks, then forks, then the rest by
    /// distance to the centre.
    pub fn ordered_positions(&self, player: Player, radius: u16) -> Vec<Position> {
        self.order(player, radius, true)
    }

    /// Like `ordered_positions`, optionally skipping the fork scan
    pub(crate) fn order(&self, player: Player, radius: u16, with_forks: bool) -> Vec<Position> {
        let wins = self.winning_cells(player);
        let blocks = self.winning_cells(player.other());
        let forks = if with_forks && wins.is_empty() && blocks.is_empty() {
            self.fork_cells(player)
        } else {
            Vec::new()
        };

        let mut candidates = self.state.candidate_positions(radius);
        candidates.extend(wins.iter().chain(&blocks).copied());
        let mut candidates = dedup_positions(candidates);

        let tier = |p: &Position| {
            if wins.contains(p) {
                0
            } else if blocks.contains(p) {
                1
            } else if forks.contains(p) {
                2
            } else {
                3
            }
        };
        candidates.sort_by_key(|p| (tier(p), self.geometry.center_distance(*p), *p));
        candidates
    }

    pub fn ordered_moves(&self, player: Player, radius: u16) -> Vec<Move> {
        self.to_moves(self.ordered_positions(player, radius))
    }

    fn to_moves(&self, cells: Vec<Position>) -> Vec<Move> {
        cells.into_iter().map(|p| self.state.move_to(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_state::Rules;

    fn place(state: &mut GameState, player: Player, row: u16, col: u16) {
        let mut hypothetical = state.with_current_player(player);
        hypothetical
            .make_move(Move::Place { row, col })
            .expect("legal placement");
        // keep the turn owned by the caller's setup
        *state = hypothetical.with_current_player(state.current_player());
    }

    fn gomoku_with(one: &[(u16, u16)], two: &[(u16, u16)]) -> GameState {
        let mut state = GameState::new(Rules::gomoku());
        for &(r, c) in one {
            place(&mut state, Player::One, r, c);
        }
        for &(r, c) in two {
            place(&mut state, Player::Two, r, c);
        }
        state
    }

    #[test]
    fn test_open_three_horizontal() {
        let state = gomoku_with(&[(7, 5), (7, 6), (7, 7)], &[]);
        let threes = ThreatAnalyzer::new(&state).open_threes(Player::One);
        assert_eq!(threes.len(), 1);
        assert_eq!(
            threes[0].completions,
            vec![Position::new(7, 4), Position::new(7, 8)]
        );
    }

    #[test]
    fn test_open_three_diagonal() {
        let state = gomoku_with(&[(4, 4), (5, 5), (6, 6)], &[]);
        let threes = ThreatAnalyzer::new(&state).open_threes(Player::One);
        assert_eq!(threes.len(), 1);
        assert_eq!(threes[0].stones.len(), 3);
    }

    #[test]
    fn test_blocked_three_is_not_open() {
        let state = gomoku_with(&[(7, 5), (7, 6), (7, 7)], &[(7, 8)]);
        assert!(ThreatAnalyzer::new(&state).open_threes(Player::One).is_empty());
        // edge of the board counts as blocked
        let edge = gomoku_with(&[(0, 0), (0, 1), (0, 2)], &[]);
        assert!(ThreatAnalyzer::new(&edge).open_threes(Player::One).is_empty());
    }

    #[test]
    fn test_closed_four() {
        let state = gomoku_with(&[(3, 3), (3, 4), (3, 5), (3, 6)], &[(3, 2)]);
        let analyzer = ThreatAnalyzer::new(&state);
        let fours = analyzer.closed_fours(Player::One);
        assert_eq!(fours.len(), 1);
        assert_eq!(fours[0].completions, vec![Position::new(3, 7)]);
        assert_eq!(analyzer.winning_cells(Player::One), vec![Position::new(3, 7)]);
    }

    #[test]
    fn test_gapped_winning_cell() {
        let state = gomoku_with(&[(5, 1), (5, 2), (5, 4), (5, 5)], &[]);
        let cells = ThreatAnalyzer::new(&state).winning_cells(Player::One);
        assert!(cells.contains(&Position::new(5, 3)));
    }

    #[test]
    fn test_gravity_winning_cell_must_be_playable() -> anyhow::Result<()> {
        // player one holds (5,0) (5,1) (5,2) on the bottom row
        let state = GameState::from_moves(Rules::connect_four(), "172737")?;
        let analyzer = ThreatAnalyzer::new(&state);
        assert_eq!(analyzer.winning_moves(Player::One), vec![Move::Drop { col: 3 }]);
        assert_eq!(analyzer.forced_blocks(Player::Two), vec![Move::Drop { col: 3 }]);
        Ok(())
    }

    #[test]
    fn test_double_three_fork() {
        // playing (7,7) makes (7,5..7) and (5..7,7) open threes at once
        let state = gomoku_with(&[(7, 5), (7, 6), (5, 7), (6, 7)], &[]);
        let forks = ThreatAnalyzer::new(&state).fork_cells(Player::One);
        assert!(forks.contains(&Position::new(7, 7)));
    }

    #[test]
    fn test_open_four_is_double_win_fork() {
        let state = gomoku_with(&[(7, 5), (7, 6), (7, 7)], &[(0, 0)]);
        let forks = ThreatAnalyzer::new(&state).fork_cells(Player::One);
        assert!(forks.contains(&Position::new(7, 4)));
        assert!(forks.contains(&Position::new(7, 8)));
        // one winning cell afterwards is not a fork
        assert!(!forks.contains(&Position::new(7, 3)));
        assert!(!forks.contains(&Position::new(7, 9)));
    }

    #[test]
    fn test_gravity_double_win_fork() -> anyhow::Result<()> {
        // player one on (5,1) and (5,2); dropping in column 4 opens both ends
        let state = GameState::from_moves(Rules::connect_four(), "2737")?;
        let forks = ThreatAnalyzer::new(&state).fork_cells(Player::One);
        assert_eq!(forks, vec![Position::new(5, 3)]);
        Ok(())
    }

    /// Fork cells found by playing each candidate and rescanning the whole board
    fn forks_by_rescan(state: &GameState, player: Player) -> Vec<Position> {
        let win_length = state.rules().win_length;
        state
            .candidate_positions(FORK_RADIUS)
            .into_iter()
            .filter(|&cell| state.longest_run_through(cell, player) < win_length)
            .filter(|&cell| {
                let mut after = state.with_current_player(player);
                after.apply(cell);
                let analyzer = ThreatAnalyzer::new(&after);
                let threes = analyzer
                    .open_threes(player)
                    .into_iter()
                    .filter(|t| t.stones.contains(&cell))
                    .count();
                threes >= 2 || analyzer.winning_cells(player).len() >= 2
            })
            .collect()
    }

    #[test]
    fn test_fork_cells_match_full_rescan() -> anyhow::Result<()> {
        let gomoku = [
            gomoku_with(&[(7, 5), (7, 6), (5, 7), (6, 7)], &[(8, 8)]),
            gomoku_with(&[(7, 7), (6, 6), (8, 6), (6, 8)], &[(7, 6), (7, 8), (5, 5)]),
            gomoku_with(&[(3, 3), (3, 4), (4, 3), (5, 5)], &[(2, 2), (3, 5), (6, 6)]),
            gomoku_with(&[(7, 3), (7, 4), (7, 6)], &[(7, 2), (6, 6)]),
        ];
        let connect_four = [
            GameState::from_moves(Rules::connect_four(), "2737")?,
            GameState::from_moves(Rules::connect_four(), "44332")?,
            GameState::from_moves(Rules::connect_four(), "3435544")?,
            GameState::from_moves(Rules::connect_four(), "2747")?,
        ];
        for state in gomoku.iter().chain(connect_four.iter()) {
            let analyzer = ThreatAnalyzer::new(state);
            for &player in &[Player::One, Player::Two] {
                assert_eq!(analyzer.fork_cells(player), forks_by_rescan(state, player));
            }
        }
        Ok(())
    }

    #[test]
    fn test_winning_cells_match_every_empty_cell() {
        let state = gomoku_with(
            &[(5, 1), (5, 2), (5, 4), (5, 5), (9, 9), (10, 10), (11, 11), (12, 12)],
            &[(8, 8)],
        );
        let brute: Vec<Position> = state
            .playable_positions()
            .into_iter()
            .filter(|&p| state.longest_run_through(p, Player::One) >= 5)
            .collect();
        assert_eq!(ThreatAnalyzer::new(&state).winning_cells(Player::One), brute);
        assert_eq!(brute, vec![Position::new(5, 3), Position::new(13, 13)]);
    }

    #[test]
    fn test_bottom_row_fork_blocking_moves() -> anyhow::Result<()> {
        // player one on the second and fourth bottom cells, player two stacked on the last column
        let state = GameState::from_moves(Rules::connect_four(), "2747")?;
        let analyzer = ThreatAnalyzer::new(&state);
        assert_eq!(analyzer.bottom_row_forks(Player::One).len(), 1);
        let blocks = analyzer.get_fork_blocking_moves(Player::Two);
        for col in &[0, 2, 4] {
            assert!(blocks.contains(&Move::Drop { col: *col }));
        }
        Ok(())
    }

    #[test]
    fn test_patterns_deduplicated() {
        let state = gomoku_with(&[(7, 5), (7, 6), (7, 7)], &[]);
        let analyzer = ThreatAnalyzer::new(&state);
        let first = analyzer.patterns(Player::One);
        let set: HashSet<_> = first.iter().cloned().collect();
        assert_eq!(set.len(), first.len());
    }

    #[test]
    fn test_ordering_puts_wins_then_blocks_first() -> anyhow::Result<()> {
        // player one can complete the bottom row, player two threatens the last column
        let state = GameState::from_moves(Rules::connect_four(), "172737")?;
        assert_eq!(state.current_player(), Player::One);
        let analyzer = ThreatAnalyzer::new(&state);
        let ordered = analyzer.ordered_moves(Player::One, 2);
        assert_eq!(ordered[0], Move::Drop { col: 3 });
        assert_eq!(ordered[1], Move::Drop { col: 6 });
        assert_eq!(ordered.len(), 7);
        Ok(())
    }
}
