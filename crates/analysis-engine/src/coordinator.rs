//! Single-call position and move analysis.
//!
//! The engine evaluation and the human-move model each run in their own task
//! with their own engine session; both are joined before returning. Dropping
//! an analysis future aborts both tasks, which drops their sessions.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use chess_core::position::{
    parse_fen, parse_uci_move, phase_of, tactical_features_of, GamePhase, TacticalFeature,
};
use serde::{Deserialize, Serialize};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info};

use crate::analysis::{self, MoveAnalysis};
use crate::error::EngineError;
use crate::evaluator::{EngineEvaluation, EngineSource, PositionEvaluator};
use crate::human_model::{EloInference, HumanMoveModel, MoveDistribution, MoveProbability};

/// Probability above which a move counts as typical for the rating
const TYPICAL_MOVE_PROBABILITY: f64 = 0.10;

const ALTERNATIVE_MOVES: usize = 3;

/// Task handle that aborts the task when dropped before completion.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Future for AbortOnDrop<T> {
    type Output = Result<T, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn spawn_scoped<F>(task: F) -> AbortOnDrop<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    AbortOnDrop(tokio::spawn(task))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionAnalysis {
    pub fen: String,
    pub engine_eval: EngineEvaluation,
    pub move_probabilities: MoveDistribution,
    pub phase: GamePhase,
    pub tactical_features: Vec<TacticalFeature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMoveAnalysis {
    pub move_analysis: MoveAnalysis,
    /// Probability of the move at the target rating (0.01 when outside the top 5)
    pub move_probability: f64,
    pub inferred_rating: EloInference,
    pub is_typical: bool,
    pub alternatives: Vec<MoveProbability>,
}

pub struct AnalysisCoordinator<S: EngineSource> {
    source: Arc<S>,
    model: Arc<HumanMoveModel>,
    depth: u32,
}

impl<S: EngineSource> Clone for AnalysisCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            model: self.model.clone(),
            depth: self.depth,
        }
    }
}

impl<S: EngineSource> AnalysisCoordinator<S> {
    pub fn new(source: S, model: HumanMoveModel, depth: u32) -> Self {
        Self {
            source: Arc::new(source),
            model: Arc::new(model),
            depth,
        }
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Engine evaluation, rating-conditioned move probabilities, phase and
    /// tactical tags for one position.
    pub async fn full_position_analysis(
        &self,
        fen: &str,
        rating: u32,
    ) -> Result<PositionAnalysis, EngineError> {
        let pos = parse_fen(fen)?;
        let phase = phase_of(&pos);
        let tactical_features = tactical_features_of(&pos);

        let depth = self.depth;
        let engine_task = {
            let source = self.source.clone();
            let fen = fen.to_string();
            spawn_scoped(async move {
                let mut session = source.acquire().await?;
                let result = session.evaluate(&fen, depth).await;
                source.release(session).await;
                result
            })
        };
        let model_task = {
            let source = self.source.clone();
            let model = self.model.clone();
            let fen = fen.to_string();
            spawn_scoped(async move {
                let mut session = source.acquire().await?;
                let result = model.move_probabilities(&mut session, &fen, rating).await;
                source.release(session).await;
                result
            })
        };

        let (engine_eval, move_probabilities) = tokio::join!(engine_task, model_task);
        let engine_eval = engine_eval??;
        let move_probabilities = move_probabilities??;

        debug!(fen, rating, phase = phase.as_str(), "Position analysis complete");

        Ok(PositionAnalysis {
            fen: fen.to_string(),
            engine_eval,
            move_probabilities,
            phase,
            tactical_features,
        })
    }

    /// Quality of `move_uci` plus how typical it is for a player of `rating`.
    pub async fn user_move_analysis(
        &self,
        fen: &str,
        move_uci: &str,
        rating: u32,
    ) -> Result<UserMoveAnalysis, EngineError> {
        let pos = parse_fen(fen)?;
        parse_uci_move(&pos, move_uci)?;

        let depth = self.depth;
        let quality_task = {
            let source = self.source.clone();
            let fen = fen.to_string();
            let mv = move_uci.to_string();
            spawn_scoped(async move {
                let mut session = source.acquire().await?;
                let result = analysis::analyze_move(&mut session, &fen, &mv, depth).await;
                source.release(session).await;
                result
            })
        };
        let model_task = {
            let source = self.source.clone();
            let model = self.model.clone();
            let fen = fen.to_string();
            let mv = move_uci.to_string();
            spawn_scoped(async move {
                let mut session = source.acquire().await?;
                let result = async {
                    let distribution = model.move_probabilities(&mut session, &fen, rating).await?;
                    let inference = model.infer_rating(&mut session, &fen, &mv).await?;
                    Ok::<_, EngineError>((distribution, inference))
                }
                .await;
                source.release(session).await;
                result
            })
        };

        let (move_analysis, model_result) = tokio::join!(quality_task, model_task);
        let move_analysis = move_analysis??;
        let (distribution, inferred_rating) = model_result??;

        let move_probability = distribution.probability_of(move_uci);
        info!(
            fen,
            mv = move_uci,
            rating,
            quality = move_analysis.classification.as_str(),
            move_probability,
            "Move analysis complete"
        );

        Ok(UserMoveAnalysis {
            move_analysis,
            move_probability,
            inferred_rating,
            is_typical: move_probability > TYPICAL_MOVE_PROBABILITY,
            alternatives: distribution.top(ALTERNATIVE_MOVES).to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::Score;
    use crate::human_model::RATING_ANCHORS;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[derive(Default)]
    struct Counters {
        live: AtomicUsize,
        max_live: AtomicUsize,
        acquired: AtomicUsize,
    }

    struct FakeSession {
        counters: Arc<Counters>,
        fail: bool,
        delay: Duration,
    }

    impl Drop for FakeSession {
        fn drop(&mut self) {
            self.counters.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl PositionEvaluator for FakeSession {
        async fn evaluate(&mut self, fen: &str, depth: u32) -> Result<EngineEvaluation, EngineError> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(EngineError::Failure("engine crashed".into()));
            }
            let cp = (fen.len() as i32 % 40) - 20;
            Ok(EngineEvaluation {
                score: Score::Cp { centipawn_eval: cp },
                best_move: Some("e2e4".to_string()),
                best_line: vec!["e2e4".to_string(), "e7e5".to_string()],
                depth,
            })
        }
    }

    struct FakeSource {
        counters: Arc<Counters>,
        fail: bool,
        delay: Duration,
    }

    #[async_trait]
    impl EngineSource for FakeSource {
        type Session = FakeSession;

        async fn acquire(&self) -> Result<FakeSession, EngineError> {
            let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
            self.counters.max_live.fetch_max(live, Ordering::SeqCst);
            self.counters.acquired.fetch_add(1, Ordering::SeqCst);
            Ok(FakeSession {
                counters: self.counters.clone(),
                fail: self.fail,
                delay: self.delay,
            })
        }
    }

    fn coordinator(fail: bool) -> (AnalysisCoordinator<FakeSource>, Arc<Counters>) {
        coordinator_with_delay(fail, Duration::from_millis(2))
    }

    fn coordinator_with_delay(
        fail: bool,
        delay: Duration,
    ) -> (AnalysisCoordinator<FakeSource>, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let source = FakeSource {
            counters: counters.clone(),
            fail,
            delay,
        };
        (
            AnalysisCoordinator::new(source, HumanMoveModel::with_seed(5), 12),
            counters,
        )
    }

    #[tokio::test]
    async fn test_full_analysis_runs_two_sessions_concurrently() {
        let (coord, counters) = coordinator(false);
        let result = coord.full_position_analysis(START_FEN, 1500).await.unwrap();

        assert_eq!(result.phase, GamePhase::Opening);
        assert!(result.tactical_features.is_empty());
        assert_eq!(result.engine_eval.depth, 12);
        assert_eq!(result.move_probabilities.moves.len(), 5);
        assert_eq!(counters.acquired.load(Ordering::SeqCst), 2);
        assert_eq!(counters.max_live.load(Ordering::SeqCst), 2);
        assert_eq!(counters.live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_user_move_analysis() {
        let (coord, counters) = coordinator(false);
        let result = coord
            .user_move_analysis(START_FEN, "e2e4", 1200)
            .await
            .unwrap();

        assert_eq!(result.move_analysis.move_uci, "e2e4");
        assert!(result.alternatives.len() <= 3);
        assert!(RATING_ANCHORS.contains(&result.inferred_rating.most_likely_rating));
        assert_eq!(result.is_typical, result.move_probability > 0.10);
        assert_eq!(counters.live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_engine_failure_propagates_and_sessions_are_released() {
        let (coord, counters) = coordinator(true);
        let err = coord
            .full_position_analysis(START_FEN, 1500)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Failure(_)));
        assert_eq!(counters.live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_illegal_move_rejected_before_acquire() {
        let (coord, counters) = coordinator(false);
        let err = coord
            .user_move_analysis(START_FEN, "e2e5", 1500)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::IllegalMove { .. }));
        assert_eq!(counters.acquired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_fen() {
        let (coord, _) = coordinator(false);
        let err = coord
            .full_position_analysis("8/8/8 w", 1500)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidPosition(_)));
    }

    #[tokio::test]
    async fn test_dropped_analysis_releases_sessions() {
        let (coord, counters) = coordinator_with_delay(false, Duration::from_millis(30));

        let timed_out = tokio::time::timeout(
            Duration::from_millis(10),
            coord.full_position_analysis(START_FEN, 1500),
        )
        .await;
        assert!(timed_out.is_err());

        // The model task alone would need ~300ms to finish its candidates
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counters.acquired.load(Ordering::SeqCst), 2);
        assert_eq!(counters.live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dropped_move_analysis_releases_sessions() {
        let (coord, counters) = coordinator_with_delay(false, Duration::from_millis(30));

        let timed_out = tokio::time::timeout(
            Duration::from_millis(10),
            coord.user_move_analysis(START_FEN, "e2e4", 1500),
        )
        .await;
        assert!(timed_out.is_err());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counters.live.load(Ordering::SeqCst), 0);
    }
}
