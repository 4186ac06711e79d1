//! The surface an embedding application drives: one live game, its series and an engine

use log::info;

use crate::config::{Difficulty, EngineConfig};
use crate::error::GameError;
use crate::evaluator::PositionAnalysis;
use crate::game_state::{GameState, Move, MoveOutcome, Rules};
use crate::packed_board::{Player, Position};
use crate::search::SearchEngine;
use crate::series::SeriesController;
use crate::threat::ThreatAnalyzer;

/// A game in progress together with the series it belongs to
///
/// Every query works on the live state or a clone of it; only `make_move`,
/// `undo` and the reset/series calls mutate anything.
#[derive(Clone, Debug)]
pub struct Session {
    state: GameState,
    series: SeriesController,
    engine: SearchEngine,
    config: EngineConfig,
}

impl Session {
    pub fn new(rules: Rules, config: EngineConfig) -> Self {
        Self {
            state: GameState::new(rules),
            series: SeriesController::default(),
            engine: SearchEngine::from_config(&config),
            config,
        }
    }

    /// Starts a fresh game with new rules; the series starter moves first
    pub fn new_game(
        &mut self,
        rows: u16,
        cols: u16,
        win_length: u16,
        gravity: bool,
    ) -> Result<(), GameError> {
        let rules = Rules::new(rows, cols, win_length, gravity)?;
        self.state = GameState::with_starting_player(rules, self.series.starting_player());
        info!(
            "New {}x{} game, {} in a row{}, {} starts",
            rows,
            cols,
            win_length,
            if gravity { " with gravity" } else { "" },
            self.state.current_player()
        );
        Ok(())
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn series(&self) -> &SeriesController {
        &self.series
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn current_player(&self) -> Player {
        self.state.current_player()
    }

    pub fn make_move(&mut self, mv: Move) -> Result<MoveOutcome, GameError> {
        let outcome = self.state.make_move(mv)?;
        match outcome {
            MoveOutcome::Win(player) => {
                info!("{} wins after {} moves", player, self.state.move_count())
            }
            MoveOutcome::Draw => info!("Draw after {} moves", self.state.move_count()),
            MoveOutcome::Playing => {}
        }
        Ok(outcome)
    }

    pub fn is_valid_move(&self, mv: Move) -> bool {
        self.state.is_valid_move(mv)
    }

    pub fn undo(&mut self) -> Option<Position> {
        self.state.undo()
    }

    pub fn is_game_over(&self) -> bool {
        self.state.is_game_over()
    }

    pub fn get_winner(&self) -> Option<Player> {
        self.state.get_winner()
    }

    /// Best move for the player to move, searching `depth` plies
    pub fn get_best_move(&mut self, depth: u32) -> Option<Move> {
        let player = self.state.current_player();
        self.engine.best_move(&self.state, depth, player)
    }

    pub fn get_best_move_for(&mut self, difficulty: Difficulty) -> Option<Move> {
        self.engine.best_move_at(&self.state, difficulty)
    }

    /// Best move `player` would make if it were their turn; the game is untouched
    pub fn get_best_move_for_player(&mut self, player: Player, depth: u32) -> Option<Move> {
        self.engine.best_move_for_player(&self.state, player, depth)
    }

    pub fn evaluate_position(&self, player: Player) -> i32 {
        self.engine.evaluator().evaluate(&self.state, player)
    }

    pub fn analyze_position(&self) -> PositionAnalysis {
        self.engine.evaluator().analyze(&self.state)
    }

    /// Moves that stop the opponent's forks, for the player to move
    pub fn get_fork_blocking_moves(&self) -> Vec<Move> {
        ThreatAnalyzer::new(&self.state).get_fork_blocking_moves(self.state.current_player())
    }

    pub fn reset_with_starting_player(&mut self, player: Player) {
        self.state.reset_with_starting_player(player);
    }

    /// Clears the series tally and the board
    pub fn start_new_series(&mut self, loser_starts: bool) {
        self.series.start_new_series(loser_starts);
        self.state
            .reset_with_starting_player(self.series.starting_player());
    }

    /// Records a finished game and resets the board for the next one
    ///
    /// Returns the next starting player, or `None` if the game is still being played.
    pub fn finish_game(&mut self) -> Option<Player> {
        if !self.state.is_game_over() {
            return None;
        }
        let next = self.series.record_result(self.state.get_winner());
        self.state.reset_with_starting_player(next);
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;

    fn session() -> Session {
        let config = EngineConfig {
            search: SearchConfig {
                parallel: false,
                ..SearchConfig::default()
            },
            ..EngineConfig::default()
        };
        Session::new(Rules::connect_four(), config)
    }

    fn play(session: &mut Session, cols: &[u16]) -> Result<(), GameError> {
        for &col in cols {
            session.make_move(Move::Drop { col })?;
        }
        Ok(())
    }

    #[test]
    fn test_new_game_rejects_bad_rules() {
        let mut session = session();
        assert!(matches!(
            session.new_game(3, 3, 4, false),
            Err(GameError::InvalidRules(_))
        ));
        assert!(session.new_game(15, 15, 5, false).is_ok());
        assert_eq!(session.state().rules(), Rules::gomoku());
    }

    #[test]
    fn test_finish_game_rotates_starter() -> anyhow::Result<()> {
        let mut session = session();
        assert_eq!(session.finish_game(), None);
        play(&mut session, &[0, 1, 0, 1, 0, 1, 0])?;
        assert_eq!(session.get_winner(), Some(Player::One));
        assert_eq!(session.finish_game(), Some(Player::Two));
        assert_eq!(session.current_player(), Player::Two);
        assert_eq!(session.state().move_count(), 0);
        assert_eq!(session.series().wins(Player::One), 1);
        Ok(())
    }

    #[test]
    fn test_best_move_completes_line() -> anyhow::Result<()> {
        let mut session = session();
        play(&mut session, &[2, 2, 3, 3, 4, 4])?;
        let best = session.get_best_move_for(Difficulty::Easy);
        assert!(best == Some(Move::Drop { col: 1 }) || best == Some(Move::Drop { col: 5 }));
        Ok(())
    }

    #[test]
    fn test_fork_blocking_for_player_to_move() -> anyhow::Result<()> {
        let mut session = session();
        // player one holds columns 1 and 3 of the bottom row, player two defends
        play(&mut session, &[1, 6, 3, 6, 6])?;
        assert_eq!(session.current_player(), Player::Two);
        let blocks = session.get_fork_blocking_moves();
        assert!(blocks.contains(&Move::Drop { col: 0 }));
        assert!(blocks.contains(&Move::Drop { col: 4 }));
        Ok(())
    }

    #[test]
    fn test_series_reset_clears_board() -> anyhow::Result<()> {
        let mut session = session();
        play(&mut session, &[3, 3])?;
        session.start_new_series(true);
        assert_eq!(session.state().move_count(), 0);
        assert_eq!(session.current_player(), Player::One);
        assert_eq!(session.series().games_played(), 0);
        Ok(())
    }
}
