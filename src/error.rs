use std::path::PathBuf;

/// Errors returned by board and game operations.
///
/// A rejected move never mutates the game it was applied to.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("position ({row}, {col}) is outside the {rows}x{cols} board")]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: u16,
        cols: u16,
    },

    #[error("position ({row}, {col}) is already occupied")]
    PositionOccupied { row: u16, col: u16 },

    #[error("the game is already over")]
    GameAlreadyOver,

    #[error("invalid player value {0}, expected 1 or 2")]
    InvalidPlayer(u8),

    #[error("{found} move used in a game that expects {expected} moves")]
    MoveKindMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("invalid game rules: {0}")]
    InvalidRules(String),

    /// Corrupted packed storage; indicates a defect, not a recoverable condition.
    #[error("board invariant violated: {0}")]
    Board(String),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}
