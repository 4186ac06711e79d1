//! A depth-limited game tree search for line-connection games

use log::{debug, trace};
use rayon::prelude::*;

use crate::config::{Difficulty, EngineConfig, EvalWeights, SearchConfig};
use crate::evaluator::Evaluator;
use crate::game_state::{GameState, Move};
use crate::packed_board::{Player, Position};
use crate::threat::ThreatAnalyzer;

/// The outcome of a top-level search
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct SearchResult {
    pub best_move: Move,
    /// Score of the position after `best_move`, from the searching player's perspective
    pub score: i32,
    pub nodes: u64,
}

/// An agent choosing moves with minimax and alpha-beta pruning
///
/// # Notes
/// The search depth is fixed per call; there is no iterative deepening. Every
/// branch is explored on its own copy of the game state (without undo history),
/// which is dropped once the branch returns, so nothing is ever undone. Below
/// the root only the best-ordered `max_candidates` moves are searched.
///
/// # Position Scoring
/// Leaves are scored by the [`Evaluator`] from the searching player's point of
/// view. Won and lost leaves are nudged by the remaining depth so that faster
/// wins and slower losses are preferred.
#[derive(Clone, Debug)]
pub struct SearchEngine {
    config: SearchConfig,
    evaluator: Evaluator,

    /// The number of nodes searched by the last call (for diagnostics only)
    pub node_count: u64,
}

impl SearchEngine {
    pub fn new(config: SearchConfig, weights: EvalWeights) -> Self {
        Self {
            config,
            evaluator: Evaluator::new(weights),
            node_count: 0,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.search.clone(), config.weights.clone())
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    fn leaf_score(&self, state: &GameState, depth: u32, ai_player: Player) -> i32 {
        let score = self.evaluator.evaluate(state, ai_player);
        match state.get_winner() {
            Some(winner) if winner == ai_player => score.saturating_add(depth as i32),
            Some(_) => score.saturating_sub(depth as i32),
            None => score,
        }
    }

    /// Moves tried below the root, best-ordered and capped at `max_candidates`
    fn children(&self, state: &GameState, depth: u32) -> Vec<Position> {
        let mut positions = ThreatAnalyzer::new(state).order(
            state.current_player(),
            self.config.candidate_radius,
            depth >= 2,
        );
        positions.truncate(self.config.max_candidates);
        positions
    }

    /// Performs game tree search
    ///
    /// Returns the score of the position for `ai_player`
    fn minimax(
        &mut self,
        state: &GameState,
        depth: u32,
        mut alpha: i32,
        mut beta: i32,
        ai_player: Player,
    ) -> i32 {
        self.node_count += 1;

        if depth == 0 || state.is_game_over() {
            return self.leaf_score(state, depth, ai_player);
        }

        let positions = self.children(state, depth);
        if positions.is_empty() {
            return self.leaf_score(state, depth, ai_player);
        }

        if state.current_player() == ai_player {
            let mut best = i32::MIN;
            for pos in positions {
                let mut next = state.branch();
                next.apply(pos);
                let score = self.minimax(&next, depth - 1, alpha, beta, ai_player);
                best = best.max(score);
                alpha = alpha.max(best);
                // the opponent will not allow this branch
                if alpha >= beta {
                    break;
                }
            }
            best
        } else {
            let mut best = i32::MAX;
            for pos in positions {
                let mut next = state.branch();
                next.apply(pos);
                let score = self.minimax(&next, depth - 1, alpha, beta, ai_player);
                best = best.min(score);
                beta = beta.min(best);
                if alpha >= beta {
                    break;
                }
            }
            best
        }
    }

    /// Searches the moves of the player to move, scoring them for `ai_player`
    ///
    /// Returns `None` when the game is over or no move is legal; callers treat
    /// that as a draw or stalemate, not as an error.
    pub fn search(&mut self, state: &GameState, depth: u32, ai_player: Player) -> Option<SearchResult> {
        self.node_count = 1;
        if state.is_game_over() {
            return None;
        }
        let depth = depth.max(1);
        let mover = state.current_player();
        let maximizing = mover == ai_player;
        let analyzer = ThreatAnalyzer::new(state);

        // take a win on this move without searching
        if let Some(&cell) = analyzer.winning_cells(mover).first() {
            let mut next = state.branch();
            next.apply(cell);
            let result = SearchResult {
                best_move: state.move_to(cell),
                score: self.leaf_score(&next, depth - 1, ai_player),
                nodes: self.node_count,
            };
            debug!("Immediate win for {} at {:?}", mover, result.best_move);
            return Some(result);
        }

        let positions = analyzer.order(mover, self.config.candidate_radius, true);
        if positions.is_empty() {
            return None;
        }

        let scored: Vec<(Position, i32)> = if self.config.parallel && positions.len() > 1 {
            let results: Vec<(Position, i32, u64)> = positions
                .par_iter()
                .map(|&pos| {
                    let mut engine = self.clone();
                    engine.node_count = 0;
                    let mut next = state.branch();
                    next.apply(pos);
                    let score = engine.minimax(&next, depth - 1, i32::MIN, i32::MAX, ai_player);
                    (pos, score, engine.node_count)
                })
                .collect();
            self.node_count += results.iter().map(|r| r.2).sum::<u64>();
            results.into_iter().map(|(pos, score, _)| (pos, score)).collect()
        } else {
            let (mut alpha, mut beta) = (i32::MIN, i32::MAX);
            let mut scored = Vec::with_capacity(positions.len());
            for pos in positions {
                let mut next = state.branch();
                next.apply(pos);
                let score = self.minimax(&next, depth - 1, alpha, beta, ai_player);
                if maximizing {
                    alpha = alpha.max(score);
                } else {
                    beta = beta.min(score);
                }
                scored.push((pos, score));
            }
            scored
        };

        // keep the earliest candidate on ties so move ordering decides
        let mut best: Option<(Position, i32)> = None;
        for &(pos, score) in scored.iter() {
            trace!("Candidate {:?} scored {}", pos, score);
            let better = match best {
                None => true,
                Some((_, best_score)) if maximizing => score > best_score,
                Some((_, best_score)) => score < best_score,
            };
            if better {
                best = Some((pos, score));
            }
        }

        best.map(|(pos, score)| {
            let result = SearchResult {
                best_move: state.move_to(pos),
                score,
                nodes: self.node_count,
            };
            debug!(
                "Depth {} search for {}: best {:?}, score {}, {} nodes",
                depth, ai_player, result.best_move, result.score, result.nodes
            );
            result
        })
    }

    /// The best move for the player to move when `ai_player` is scoring
    pub fn best_move(&mut self, state: &GameState, depth: u32, ai_player: Player) -> Option<Move> {
        self.search(state, depth, ai_player).map(|r| r.best_move)
    }

    /// The best move `player` could make here, whether or not it is their turn
    ///
    /// Searches a hypothetical copy with `player` to move; `state` is not modified.
    pub fn best_move_for_player(
        &mut self,
        state: &GameState,
        player: Player,
        depth: u32,
    ) -> Option<Move> {
        let hypothetical = state.with_current_player(player);
        self.best_move(&hypothetical, depth, player)
    }

    /// The best move for the player to move at a difficulty tier
    pub fn best_move_at(&mut self, state: &GameState, difficulty: Difficulty) -> Option<Move> {
        let depth = self.config.depth_for(difficulty);
        self.best_move(state, depth, state.current_player())
    }
}
