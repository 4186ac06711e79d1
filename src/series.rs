//! Tracks who starts each game of a multi-game series

use log::info;

use crate::packed_board::Player;

/// Opens the first game of every series, and every game without rotation
pub const DEFAULT_STARTER: Player = Player::One;

/// Chooses the starting player of each game and keeps the series tally
///
/// With `loser_starts` set, the loser of a decided game starts the next one and a
/// draw keeps the previous starter. Otherwise the default starter opens every game.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct SeriesController {
    loser_starts: bool,
    starting_player: Player,
    last_winner: Option<Player>,
    wins: [u32; 2],
    draws: u32,
}

impl Default for SeriesController {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SeriesController {
    pub fn new(loser_starts: bool) -> Self {
        Self {
            loser_starts,
            starting_player: DEFAULT_STARTER,
            last_winner: None,
            wins: [0; 2],
            draws: 0,
        }
    }

    /// Clears the tally; the default starter opens the first game
    pub fn start_new_series(&mut self, loser_starts: bool) {
        *self = Self::new(loser_starts);
        info!(
            "New series, {} starts{}",
            self.starting_player,
            if loser_starts { ", loser starts next game" } else { "" }
        );
    }

    /// Records a finished game and returns the starter of the next one
    pub fn record_result(&mut self, winner: Option<Player>) -> Player {
        match winner {
            Some(player) => self.wins[Self::slot(player)] += 1,
            None => self.draws += 1,
        }
        self.last_winner = winner;

        self.starting_player = match (self.loser_starts, winner) {
            (true, Some(player)) => player.other(),
            (true, None) => self.starting_player,
            (false, _) => DEFAULT_STARTER,
        };
        info!(
            "Game {} finished ({}), {} starts next",
            self.games_played(),
            winner.map_or("draw", Player::name),
            self.starting_player
        );
        self.starting_player
    }

    pub fn starting_player(&self) -> Player {
        self.starting_player
    }

    pub fn last_winner(&self) -> Option<Player> {
        self.last_winner
    }

    pub fn loser_starts(&self) -> bool {
        self.loser_starts
    }

    pub fn games_played(&self) -> u32 {
        self.wins[0] + self.wins[1] + self.draws
    }

    pub fn wins(&self, player: Player) -> u32 {
        self.wins[Self::slot(player)]
    }

    pub fn draws(&self) -> u32 {
        self.draws
    }

    fn slot(player: Player) -> usize {
        match player {
            Player::One => 0,
            Player::Two => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loser_starts_next_game() {
        let mut series = SeriesController::new(true);
        assert_eq!(series.starting_player(), Player::One);
        assert_eq!(series.record_result(Some(Player::One)), Player::Two);
        assert_eq!(series.record_result(Some(Player::One)), Player::Two);
        assert_eq!(series.record_result(Some(Player::Two)), Player::One);
        assert_eq!(series.wins(Player::One), 2);
        assert_eq!(series.wins(Player::Two), 1);
        assert_eq!(series.last_winner(), Some(Player::Two));
    }

    #[test]
    fn test_draw_keeps_starter() {
        let mut series = SeriesController::new(true);
        series.record_result(Some(Player::One));
        assert_eq!(series.record_result(None), Player::Two);
        assert_eq!(series.draws(), 1);
        assert_eq!(series.last_winner(), None);
        assert_eq!(series.games_played(), 2);
    }

    #[test]
    fn test_fixed_starter_without_rotation() {
        let mut series = SeriesController::new(false);
        assert_eq!(series.record_result(Some(Player::One)), Player::One);
        assert_eq!(series.record_result(Some(Player::Two)), Player::One);
    }

    #[test]
    fn test_new_series_clears_tally() {
        let mut series = SeriesController::new(true);
        series.record_result(Some(Player::One));
        series.record_result(None);
        series.start_new_series(false);
        assert_eq!(series.games_played(), 0);
        assert_eq!(series.starting_player(), Player::One);
        assert_eq!(series.last_winner(), None);
        assert!(!series.loser_starts());
    }

    #[test]
    fn test_fixed_starter_after_rotating_series() {
        let mut series = SeriesController::new(true);
        assert_eq!(series.record_result(Some(Player::One)), Player::Two);
        series.start_new_series(false);
        assert_eq!(series.starting_player(), DEFAULT_STARTER);
        assert_eq!(series.record_result(Some(Player::Two)), DEFAULT_STARTER);
        assert_eq!(series.record_result(None), DEFAULT_STARTER);
    }
}
