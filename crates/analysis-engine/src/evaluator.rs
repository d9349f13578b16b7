//! Evaluation types and the seams between analysis code and the engine.
//!
//! Scores are always from the side to move's point of view, as UCI reports them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Centipawn value assigned to mate-in-zero; mate-in-n sits `10 * n` below it
const MATE_SCORE: i32 = 10_000;

/// Exactly one of a centipawn score or a mate distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "evaluation_type", rename_all = "lowercase")]
pub enum Score {
    Cp {
        centipawn_eval: i32,
    },
    Mate {
        /// Positive = side to move mates, negative = side to move is mated
        mate_in: i32,
    },
}

impl Score {
    /// Score on a single centipawn scale, mates mapped near +-10000.
    pub fn centipawns(&self) -> i32 {
        match *self {
            Score::Cp { centipawn_eval } => centipawn_eval,
            Score::Mate { mate_in } if mate_in > 0 => MATE_SCORE - mate_in * 10,
            Score::Mate { mate_in } => -MATE_SCORE - mate_in * 10,
        }
    }

    pub fn is_mate(&self) -> bool {
        matches!(self, Score::Mate { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineEvaluation {
    #[serde(flatten)]
    pub score: Score,
    /// `None` when the side to move has no legal moves
    pub best_move: Option<String>,
    pub best_line: Vec<String>,
    pub depth: u32,
}

/// Something that can evaluate FEN positions.
#[async_trait]
pub trait PositionEvaluator: Send {
    async fn evaluate(&mut self, fen: &str, depth: u32) -> Result<EngineEvaluation, EngineError>;
}

/// Hands out exclusively owned evaluator sessions.
///
/// Each concurrent analysis acquires its own session; `release` is the normal
/// shutdown path, dropping a session must also tear it down.
#[async_trait]
pub trait EngineSource: Send + Sync + 'static {
    type Session: PositionEvaluator + Send + 'static;

    async fn acquire(&self) -> Result<Self::Session, EngineError>;

    async fn release(&self, session: Self::Session) {
        drop(session);
    }
}
