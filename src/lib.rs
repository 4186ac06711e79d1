//! An engine for playing or analysing line-connection board games
//!
//! Connect Four, Gomoku and Tic-Tac-Toe are all the same game with different
//! dimensions, run lengths and gravity. This crate keeps the board in packed
//! 2-bit cells, recognises threats and forks, scores positions and chooses
//! moves with a depth-limited alpha-beta search.
//!
//! # Basic Usage
//!
//! ```
//! use lineup::{game_state::{GameState, Move, Rules}, packed_board::Player, search::SearchEngine};
//!
//!# use std::error::Error;
//!# fn main() -> Result<(), Box<dyn Error>> {
//! // player one has three in a row on the bottom row, open at both ends
//! let state = GameState::from_moves(Rules::connect_four(), "334455")?;
//! let mut engine = SearchEngine::new(Default::default(), Default::default());
//! let best_move = engine.best_move(&state, 4, Player::One);
//!
//! assert!(best_move == Some(Move::Drop { col: 1 }) || best_move == Some(Move::Drop { col: 5 }));
//!# Ok(())
//!# }
//! ```

pub use anyhow;

pub mod error;

pub mod packed_board;

pub mod geometry;

pub mod game_state;

pub mod threat;

pub mod config;

pub mod evaluator;

pub mod search;

pub mod series;

pub mod session;


pub use config::{Difficulty, EngineConfig};
pub use error::{ConfigError, GameError};
pub use game_state::{new_game, GameState, Move, MoveOutcome, Rules};
pub use packed_board::{Player, Position};
pub use search::SearchEngine;
pub use session::Session;
