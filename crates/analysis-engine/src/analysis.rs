//! Move-quality analysis: three engine calls, then pure classification.

use chess_core::position::{apply_uci_move, parse_fen, parse_uci_move};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::evaluator::PositionEvaluator;

/// Classification thresholds (centipawn loss, inclusive upper bounds)
const THRESHOLD_EXCELLENT: i32 = 15;
const THRESHOLD_GOOD: i32 = 50;
const THRESHOLD_INACCURACY: i32 = 100;
const THRESHOLD_MISTAKE: i32 = 300;

/// Ordered best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveQuality {
    Excellent,
    Good,
    Inaccuracy,
    Mistake,
    Blunder,
}

impl MoveQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveQuality::Excellent => "excellent",
            MoveQuality::Good => "good",
            MoveQuality::Inaccuracy => "inaccuracy",
            MoveQuality::Mistake => "mistake",
            MoveQuality::Blunder => "blunder",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveAnalysis {
    #[serde(rename = "move")]
    pub move_uci: String,
    /// Before the move, from the mover's point of view
    pub eval_before: i32,
    /// After the move, from the mover's point of view
    pub eval_after: i32,
    pub eval_diff: i32,
    pub best_move: Option<String>,
    pub best_eval: i32,
    pub centipawns_lost: i32,
    pub classification: MoveQuality,
}

pub fn classify_move(cp_loss: i32) -> MoveQuality {
    if cp_loss <= THRESHOLD_EXCELLENT {
        MoveQuality::Excellent
    } else if cp_loss <= THRESHOLD_GOOD {
        MoveQuality::Good
    } else if cp_loss <= THRESHOLD_INACCURACY {
        MoveQuality::Inaccuracy
    } else if cp_loss <= THRESHOLD_MISTAKE {
        MoveQuality::Mistake
    } else {
        MoveQuality::Blunder
    }
}

pub fn calculate_cp_loss(best_eval: i32, after_eval: i32) -> i32 {
    (best_eval - after_eval).max(0)
}

/// Analyze one move: evaluate before, after (negated back to the mover) and
/// the engine's own best move, then classify the centipawn loss.
pub async fn analyze_move<E>(
    engine: &mut E,
    fen: &str,
    move_uci: &str,
    depth: u32,
) -> Result<MoveAnalysis, EngineError>
where
    E: PositionEvaluator + ?Sized,
{
    // Legality first so no engine time is spent on garbage
    let pos = parse_fen(fen)?;
    parse_uci_move(&pos, move_uci)?;
    let fen_after = apply_uci_move(fen, move_uci)?;

    let before = engine.evaluate(fen, depth).await?;
    let after = engine.evaluate(&fen_after, depth).await?;
    let best = engine.evaluate(fen, depth).await?;

    let eval_before = before.score.centipawns();
    let eval_after = -after.score.centipawns();
    let best_eval = best.score.centipawns();
    let centipawns_lost = calculate_cp_loss(best_eval, eval_after);

    Ok(MoveAnalysis {
        move_uci: move_uci.to_string(),
        eval_before,
        eval_after,
        eval_diff: eval_after - eval_before,
        best_move: best.best_move,
        best_eval,
        centipawns_lost,
        classification: classify_move(centipawns_lost),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::{EngineEvaluation, Score};
    use async_trait::async_trait;

    const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    /// Replays canned scores in call order
    struct Scripted {
        scores: Vec<Score>,
        calls: Vec<String>,
    }

    #[async_trait]
    impl PositionEvaluator for Scripted {
        async fn evaluate(&mut self, fen: &str, depth: u32) -> Result<EngineEvaluation, EngineError> {
            self.calls.push(fen.to_string());
            let score = self.scores.remove(0);
            Ok(EngineEvaluation {
                score,
                best_move: Some("d2d4".to_string()),
                best_line: vec!["d2d4".to_string()],
                depth,
            })
        }
    }

    #[test]
    fn test_classify_move() {
        assert_eq!(classify_move(0), MoveQuality::Excellent);
        assert_eq!(classify_move(15), MoveQuality::Excellent);
        assert_eq!(classify_move(16), MoveQuality::Good);
        assert_eq!(classify_move(50), MoveQuality::Good);
        assert_eq!(classify_move(100), MoveQuality::Inaccuracy);
        assert_eq!(classify_move(300), MoveQuality::Mistake);
        assert_eq!(classify_move(301), MoveQuality::Blunder);
    }

    #[test]
    fn test_classification_is_monotonic() {
        let mut previous = classify_move(0);
        for loss in 0..=1000 {
            let current = classify_move(loss);
            assert!(current >= previous, "loss {loss} improved the label");
            previous = current;
        }
    }

    #[test]
    fn test_cp_loss_never_negative() {
        assert_eq!(calculate_cp_loss(20, 50), 0);
        assert_eq!(calculate_cp_loss(50, -100), 150);
    }

    #[tokio::test]
    async fn test_analyze_move_negates_after_eval() {
        let mut engine = Scripted {
            // before, after (opponent to move), best
            scores: vec![
                Score::Cp { centipawn_eval: 30 },
                Score::Cp { centipawn_eval: 90 },
                Score::Cp { centipawn_eval: 30 },
            ],
            calls: Vec::new(),
        };

        let result = analyze_move(&mut engine, START_FEN, "g2g4", 12).await.unwrap();
        assert_eq!(result.eval_after, -90);
        assert_eq!(result.centipawns_lost, 120);
        assert_eq!(result.eval_diff, -120);
        assert_eq!(result.classification, MoveQuality::Mistake);
        assert_eq!(result.best_move.as_deref(), Some("d2d4"));
        assert_eq!(engine.calls.len(), 3);
        assert_ne!(engine.calls[1], START_FEN);
    }

    #[tokio::test]
    async fn test_mate_is_not_collapsed() {
        let mut engine = Scripted {
            scores: vec![
                Score::Mate { mate_in: 2 },
                Score::Cp { centipawn_eval: 0 },
                Score::Mate { mate_in: 2 },
            ],
            calls: Vec::new(),
        };
        let result = analyze_move(&mut engine, START_FEN, "e2e4", 12).await.unwrap();
        assert_eq!(result.classification, MoveQuality::Blunder);
        assert!(result.centipawns_lost > 9000);
    }

    #[tokio::test]
    async fn test_illegal_move_skips_engine() {
        let mut engine = Scripted {
            scores: Vec::new(),
            calls: Vec::new(),
        };
        let err = analyze_move(&mut engine, START_FEN, "e2e5", 12).await.unwrap_err();
        assert!(matches!(err, EngineError::IllegalMove { .. }));
        assert!(engine.calls.is_empty());
    }
}
