//! Position scoring
//!
//! A position is scored from one player's perspective in four tiers, each
//! weighted at least ten times the next:
//! 1. terminal: won, lost or drawn
//! 2. tactical: cells that win immediately, and threats that cannot be answered
//! 3. structural: open threes (weighted towards the centre), closed fours and,
//!    in gravity games, winning cells that are not playable yet
//! 4. tempo: winnable lines running through placed pieces
//!
//! The score is antisymmetric: `evaluate(s, p) == -evaluate(s, p.other())`.

use std::collections::HashSet;

use serde::Serialize;

use crate::config::EvalWeights;
use crate::game_state::GameState;
use crate::packed_board::{Cell, Player, Position};
use crate::threat::ThreatAnalyzer;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize)]
pub enum GamePhase {
    Opening,
    Middle,
    Endgame,
}

impl GamePhase {
    pub fn from_fill(filled: u32, cells: u32) -> Self {
        if filled * 6 < cells {
            GamePhase::Opening
        } else if filled * 2 < cells {
            GamePhase::Middle
        } else {
            GamePhase::Endgame
        }
    }
}

/// Summary of a position, taken from the point of view of the player to move
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize)]
pub struct PositionAnalysis {
    pub current_player_threats: u32,
    pub opponent_threats: u32,
    pub total_pieces: u32,
    pub connectivity_score: i32,
    pub game_phase: GamePhase,
    pub evaluation_score: i32,
}

// per-player tallies from one pass over every line window
#[derive(Default)]
struct LineStats {
    connectivity: i64,
    latent: HashSet<Position>,
}

fn line_stats(state: &GameState) -> [LineStats; 2] {
    let rules = state.rules();
    let board = state.board();
    let mut stats = [LineStats::default(), LineStats::default()];

    for window in state.geometry().windows(rules.win_length) {
        let (mut ones, mut twos) = (0u16, 0u16);
        let mut empty = None;
        for pos in window.cells() {
            match board.at(pos) {
                Cell::One => ones += 1,
                Cell::Two => twos += 1,
                Cell::Empty => empty = Some(pos),
            }
        }
        for (idx, (mine, theirs)) in [(ones, twos), (twos, ones)].iter().enumerate() {
            if *theirs != 0 || *mine == 0 {
                continue;
            }
            stats[idx].connectivity += *mine as i64;
            if rules.gravity && *mine == rules.win_length - 1 {
                if let Some(cell) = empty.filter(|&p| !state.is_playable(p)) {
                    stats[idx].latent.insert(cell);
                }
            }
        }
    }
    stats
}

#[inline]
fn index(player: Player) -> usize {
    match player {
        Player::One => 0,
        Player::Two => 1,
    }
}

/// Scores positions with a fixed set of weights
#[derive(Clone, Debug, Default)]
pub struct Evaluator {
    weights: EvalWeights,
}

impl Evaluator {
    pub fn new(weights: EvalWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &EvalWeights {
        &self.weights
    }

    /// Signed score of `state` for `perspective`, positive when it is ahead
    ///
    /// Non-terminal scores stay strictly inside `(-win, win)`.
    pub fn evaluate(&self, state: &GameState, perspective: Player) -> i32 {
        if let Some(winner) = state.get_winner() {
            return if winner == perspective {
                self.weights.win
            } else {
                -self.weights.win
            };
        }
        if state.is_draw() {
            return 0;
        }

        let analyzer = ThreatAnalyzer::new(state);
        let stats = line_stats(state);
        let mover = state.current_player();
        let waiter = mover.other();
        let mover_wins = analyzer.winning_cells(mover).len() as i64;
        let waiter_wins = analyzer.winning_cells(waiter).len() as i64;

        let mut mover_score = mover_wins * self.weights.immediate_threat as i64;
        let mut waiter_score = waiter_wins * self.weights.immediate_threat as i64;
        // the side to move converts any winning cell; otherwise two cells cannot both be blocked
        if mover_wins >= 1 {
            mover_score += self.weights.unanswerable as i64;
        } else if waiter_wins >= 2 {
            waiter_score += self.weights.unanswerable as i64;
        } else if waiter_wins == 0 && !analyzer.bottom_row_forks(mover).is_empty() {
            mover_score += self.weights.unanswerable as i64;
        }

        mover_score += self.structural(state, &analyzer, &stats, mover);
        waiter_score += self.structural(state, &analyzer, &stats, waiter);

        let score = if perspective == mover {
            mover_score - waiter_score
        } else {
            waiter_score - mover_score
        };
        let bound = self.weights.win as i64 - 1;
        score.max(-bound).min(bound) as i32
    }

    fn structural(
        &self,
        state: &GameState,
        analyzer: &ThreatAnalyzer,
        stats: &[LineStats; 2],
        player: Player,
    ) -> i64 {
        let geometry = state.geometry();
        let max_distance = geometry.max_center_distance() as i64;

        let threes: i64 = analyzer
            .open_threes(player)
            .iter()
            .map(|three| {
                let middle = three.stones[three.stones.len() / 2];
                let proximity = max_distance - geometry.center_distance(middle) as i64;
                self.weights.open_three as i64 + self.weights.center as i64 * proximity
            })
            .sum();
        let fours = analyzer.closed_fours(player).len() as i64 * self.weights.closed_four as i64;
        let own = &stats[index(player)];
        let latent = own.latent.len() as i64 * self.weights.open_three as i64;
        let tempo = own.connectivity * self.weights.connectivity as i64;

        threes + fours + latent + tempo
    }

    /// Connectivity of `player` minus that of the opponent
    pub fn connectivity_score(&self, state: &GameState, player: Player) -> i32 {
        let stats = line_stats(state);
        (stats[index(player)].connectivity - stats[index(player.other())].connectivity) as i32
    }

    /// Snapshot of the position for the player to move
    pub fn analyze(&self, state: &GameState) -> PositionAnalysis {
        let me = state.current_player();
        let analyzer = ThreatAnalyzer::new(state);
        let board = state.board();
        PositionAnalysis {
            current_player_threats: analyzer.patterns(me).len() as u32,
            opponent_threats: analyzer.patterns(me.other()).len() as u32,
            total_pieces: state.move_count(),
            connectivity_score: self.connectivity_score(state, me),
            game_phase: GamePhase::from_fill(board.filled(), board.cell_count()),
            evaluation_score: self.evaluate(state, me),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_state::{Move, Rules};

    fn evaluator() -> Evaluator {
        Evaluator::new(EvalWeights::default())
    }

    #[test]
    fn test_terminal_scores() -> anyhow::Result<()> {
        let won = GameState::from_moves(Rules::connect_four(), "1212121")?;
        let weights = EvalWeights::default();
        assert_eq!(evaluator().evaluate(&won, Player::One), weights.win);
        assert_eq!(evaluator().evaluate(&won, Player::Two), -weights.win);
        Ok(())
    }

    #[test]
    fn test_draw_scores_zero() {
        let mut state = GameState::new(Rules::tic_tac_toe());
        for &(row, col) in &[(0, 0), (0, 1), (0, 2), (1, 1), (1, 0), (1, 2), (2, 1), (2, 0), (2, 2)] {
            state.make_move(Move::Place { row, col }).unwrap();
        }
        assert_eq!(evaluator().evaluate(&state, Player::One), 0);
    }

    #[test]
    fn test_antisymmetric() -> anyhow::Result<()> {
        let state = GameState::from_moves(Rules::connect_four(), "4453")?;
        let e = evaluator();
        assert_eq!(
            e.evaluate(&state, Player::One),
            -e.evaluate(&state, Player::Two)
        );
        Ok(())
    }

    #[test]
    fn test_center_preferred_on_opening() -> anyhow::Result<()> {
        let center = GameState::from_moves(Rules::connect_four(), "4")?;
        let edge = GameState::from_moves(Rules::connect_four(), "1")?;
        let e = evaluator();
        assert!(e.evaluate(&center, Player::One) > e.evaluate(&edge, Player::One));
        Ok(())
    }

    #[test]
    fn test_threat_outweighs_structure() -> anyhow::Result<()> {
        // player two to move with a winning cell outweighs player one's two winning cells
        let state = GameState::from_moves(Rules::connect_four(), "4747375")?;
        assert_eq!(state.current_player(), Player::Two);
        let score = evaluator().evaluate(&state, Player::One);
        assert!(score < 0, "score was {}", score);
        Ok(())
    }

    #[test]
    fn test_bottom_row_fork_is_unanswerable_for_mover() -> anyhow::Result<()> {
        let state = GameState::from_moves(Rules::connect_four(), "2747")?;
        assert_eq!(state.current_player(), Player::One);
        let score = evaluator().evaluate(&state, Player::One);
        assert!(score > EvalWeights::default().unanswerable / 2, "score was {}", score);
        Ok(())
    }

    #[test]
    fn test_latent_threat_counts_in_gravity_games() -> anyhow::Result<()> {
        // player two holds (4,1) (4,2) (4,3); (4,0) is not playable until column 1 has a piece
        let with_latent = GameState::from_moves(Rules::connect_four(), "223344")?;
        let stats = line_stats(&with_latent);
        assert!(stats[index(Player::Two)]
            .latent
            .contains(&Position::new(4, 0)));
        Ok(())
    }

    #[test]
    fn test_analysis_phase_and_counts() -> anyhow::Result<()> {
        let state = GameState::from_moves(Rules::connect_four(), "44")?;
        let analysis = evaluator().analyze(&state);
        assert_eq!(analysis.total_pieces, 2);
        assert_eq!(analysis.game_phase, GamePhase::Opening);
        assert_eq!(analysis.current_player_threats, 0);
        assert_eq!(GamePhase::from_fill(30, 42), GamePhase::Endgame);
        assert_eq!(GamePhase::from_fill(10, 42), GamePhase::Middle);
        Ok(())
    }
}
