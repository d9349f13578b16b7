//! Rating-conditioned move probabilities.
//!
//! This approximates human play from engine scores: a shallower search for
//! weaker players, a softmax whose temperature rises with rating, and some
//! uniform noise below 1500. It is not a learned model of human moves; a
//! trained one can replace it behind `move_probabilities` and `infer_rating`.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chess_core::position::{move_to_uci, parse_fen, parse_uci_move, to_fen};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use shakmaty::Position;
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::evaluator::PositionEvaluator;

/// Canonical ratings `infer_rating` chooses between
pub const RATING_ANCHORS: [u32; 4] = [1100, 1300, 1500, 1900];

pub const MIN_PROBABILITY: f64 = 0.01;
pub const MAX_PROBABILITY: f64 = 0.99;

/// Legal moves scored per position, in move generation order
const CANDIDATE_MOVES: usize = 10;

/// Moves kept in a distribution
const TOP_MOVES: usize = 5;

/// Noise amplitude at rating 0; shrinks linearly to nothing at 1500
const MAX_NOISE: f64 = 0.1;
const NOISE_FREE_RATING: f64 = 1500.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveProbability {
    #[serde(rename = "move")]
    pub move_uci: String,
    pub probability: f64,
}

/// At most five moves, most likely first, summing to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveDistribution {
    pub rating: u32,
    pub moves: Vec<MoveProbability>,
}

impl MoveDistribution {
    /// Probability of `move_uci`, or the floor value when it is not listed.
    pub fn probability_of(&self, move_uci: &str) -> f64 {
        self.moves
            .iter()
            .find(|m| m.move_uci == move_uci)
            .map(|m| m.probability)
            .unwrap_or(MIN_PROBABILITY)
    }

    pub fn top(&self, n: usize) -> &[MoveProbability] {
        &self.moves[..self.moves.len().min(n)]
    }

    pub fn total(&self) -> f64 {
        self.moves.iter().map(|m| m.probability).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EloInference {
    pub most_likely_rating: u32,
    pub distribution: BTreeMap<u32, f64>,
    pub confidence: f64,
}

/// Search depth used to imitate a player of `rating`.
pub fn depth_for_rating(rating: u32) -> u32 {
    match rating {
        r if r < 1200 => 8,
        r if r < 1500 => 12,
        r if r < 1800 => 16,
        _ => 20,
    }
}

pub fn temperature_for_rating(rating: u32) -> f64 {
    ((rating as f64 - 800.0) / 1200.0).clamp(0.5, 1.5)
}

pub fn noise_amplitude(rating: u32) -> f64 {
    ((NOISE_FREE_RATING - rating as f64) / NOISE_FREE_RATING).max(0.0) * MAX_NOISE
}

/// Turn `(move, eval)` pairs into a bounded top-5 distribution.
///
/// Evals are centipawns from the mover's point of view.
pub fn evals_to_distribution<R: Rng + ?Sized>(
    evals: &[(String, i32)],
    rating: u32,
    rng: &mut R,
) -> Vec<MoveProbability> {
    let Some(best_eval) = evals.iter().map(|(_, e)| *e).max() else {
        return Vec::new();
    };

    let temperature = temperature_for_rating(rating);
    let weights: Vec<f64> = evals
        .iter()
        .map(|(_, e)| {
            let normalized = (*e - best_eval) as f64 / 100.0;
            (normalized / temperature).exp()
        })
        .collect();
    let total: f64 = weights.iter().sum();

    let amplitude = noise_amplitude(rating);
    let mut probs: Vec<f64> = weights
        .iter()
        .map(|w| {
            let p = w / total;
            if amplitude > 0.0 {
                p + rng.random_range(-amplitude..=amplitude)
            } else {
                p
            }
        })
        .collect();
    normalize_bounded(&mut probs);

    let mut moves: Vec<MoveProbability> = evals
        .iter()
        .zip(probs)
        .map(|((mv, _), probability)| MoveProbability {
            move_uci: mv.clone(),
            probability,
        })
        .collect();
    moves.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    moves.truncate(TOP_MOVES);

    // The kept subset is renormalized on its own
    let mut top: Vec<f64> = moves.iter().map(|m| m.probability).collect();
    normalize_bounded(&mut top);
    for (m, p) in moves.iter_mut().zip(top) {
        m.probability = p;
    }
    moves
}

/// Rescale to sum 1 with every entry in `[MIN_PROBABILITY, MAX_PROBABILITY]`.
///
/// Out-of-range entries are pinned to the violated bound (low side first) and
/// the remaining mass is spread proportionally over the rest. A single entry
/// is always 1.
pub fn normalize_bounded(probs: &mut [f64]) {
    let n = probs.len();
    if n == 0 {
        return;
    }
    if n == 1 {
        probs[0] = 1.0;
        return;
    }

    for p in probs.iter_mut() {
        *p = p.max(0.0);
    }

    let mut pinned: Vec<Option<f64>> = vec![None; n];
    loop {
        let pinned_mass: f64 = pinned.iter().flatten().sum();
        let free: Vec<usize> = (0..n).filter(|&i| pinned[i].is_none()).collect();
        if free.is_empty() {
            break;
        }
        let free_mass: f64 = free.iter().map(|&i| probs[i]).sum();
        let target = 1.0 - pinned_mass;
        let scaled = |i: usize| {
            if free_mass > 0.0 {
                probs[i] * target / free_mass
            } else {
                target / free.len() as f64
            }
        };

        let low: Vec<usize> = free
            .iter()
            .copied()
            .filter(|&i| scaled(i) < MIN_PROBABILITY)
            .collect();
        if !low.is_empty() {
            for i in low {
                pinned[i] = Some(MIN_PROBABILITY);
            }
            continue;
        }

        let high: Vec<usize> = free
            .iter()
            .copied()
            .filter(|&i| scaled(i) > MAX_PROBABILITY)
            .collect();
        if !high.is_empty() {
            for i in high {
                pinned[i] = Some(MAX_PROBABILITY);
            }
            continue;
        }

        let values: Vec<(usize, f64)> = free.iter().map(|&i| (i, scaled(i))).collect();
        for (i, v) in values {
            probs[i] = v;
        }
        break;
    }

    for (p, pin) in probs.iter_mut().zip(pinned) {
        if let Some(bound) = pin {
            *p = bound;
        }
    }
}

/// Rating-conditioned move model. Safe to share between concurrent analyses.
pub struct HumanMoveModel {
    rng: Mutex<StdRng>,
}

impl Default for HumanMoveModel {
    fn default() -> Self {
        Self::new()
    }
}

impl HumanMoveModel {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Deterministic noise, for tests and reproducible runs.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Likely moves for a player of `rating` in `fen`.
    ///
    /// A failed evaluation of a single candidate scores it 0 instead of
    /// failing the whole distribution.
    pub async fn move_probabilities<E>(
        &self,
        engine: &mut E,
        fen: &str,
        rating: u32,
    ) -> Result<MoveDistribution, EngineError>
    where
        E: PositionEvaluator + ?Sized,
    {
        let pos = parse_fen(fen)?;
        let depth = depth_for_rating(rating);

        let mut evals = Vec::with_capacity(CANDIDATE_MOVES);
        for mv in pos.legal_moves().iter().take(CANDIDATE_MOVES) {
            let uci = move_to_uci(mv);
            let mut next = pos.clone();
            next.play_unchecked(*mv);

            let score = match engine.evaluate(&to_fen(&next), depth).await {
                // Reported for the opponent; flip back to the mover
                Ok(eval) => -eval.score.centipawns(),
                Err(e) => {
                    warn!(fen, mv = %uci, error = %e, "Candidate evaluation failed, scoring 0");
                    0
                }
            };
            evals.push((uci, score));
        }

        let moves = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            evals_to_distribution(&evals, rating, &mut *rng)
        };
        debug!(fen, rating, depth, candidates = evals.len(), "Move distribution ready");

        Ok(MoveDistribution { rating, moves })
    }

    /// Which anchor rating best explains `move_uci` being played in `fen`.
    pub async fn infer_rating<E>(
        &self,
        engine: &mut E,
        fen: &str,
        move_uci: &str,
    ) -> Result<EloInference, EngineError>
    where
        E: PositionEvaluator + ?Sized,
    {
        let pos = parse_fen(fen)?;
        parse_uci_move(&pos, move_uci)?;

        let mut distribution = BTreeMap::new();
        let mut most_likely_rating = RATING_ANCHORS[0];
        let mut confidence = f64::MIN;

        for rating in RATING_ANCHORS {
            let probability = self
                .move_probabilities(engine, fen, rating)
                .await?
                .probability_of(move_uci);
            distribution.insert(rating, probability);
            // Strictly greater: ties stay with the lower anchor
            if probability > confidence {
                confidence = probability;
                most_likely_rating = rating;
            }
        }

        Ok(EloInference {
            most_likely_rating,
            distribution,
            confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::{EngineEvaluation, Score};
    use async_trait::async_trait;

    const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    fn assert_bounded(moves: &[MoveProbability]) {
        let total: f64 = moves.iter().map(|m| m.probability).sum();
        assert!((total - 1.0).abs() <= 0.05, "sum was {total}");
        for m in moves {
            assert!(
                m.probability >= MIN_PROBABILITY - 1e-9 && m.probability <= MAX_PROBABILITY + 1e-9,
                "{} out of bounds: {}",
                m.move_uci,
                m.probability
            );
        }
    }

    /// Scores a position by a hash of its FEN; can be told to fail every n-th call
    struct FakeEngine {
        calls: usize,
        fail_every: Option<usize>,
    }

    #[async_trait]
    impl PositionEvaluator for FakeEngine {
        async fn evaluate(&mut self, fen: &str, depth: u32) -> Result<EngineEvaluation, EngineError> {
            self.calls += 1;
            if let Some(n) = self.fail_every {
                if self.calls % n == 0 {
                    return Err(EngineError::Failure("scripted".into()));
                }
            }
            let cp = (fen.bytes().map(|b| b as i32).sum::<i32>() % 200) - 100;
            Ok(EngineEvaluation {
                score: Score::Cp { centipawn_eval: cp },
                best_move: None,
                best_line: Vec::new(),
                depth,
            })
        }
    }

    #[test]
    fn test_depth_steps() {
        assert_eq!(depth_for_rating(800), 8);
        assert_eq!(depth_for_rating(1199), 8);
        assert_eq!(depth_for_rating(1200), 12);
        assert_eq!(depth_for_rating(1500), 16);
        assert_eq!(depth_for_rating(1800), 20);
        assert_eq!(depth_for_rating(2800), 20);
    }

    #[test]
    fn test_temperature_and_noise() {
        assert_eq!(temperature_for_rating(800), 0.5);
        assert_eq!(temperature_for_rating(2000), 1.0);
        assert_eq!(temperature_for_rating(3000), 1.5);
        assert!((noise_amplitude(0) - 0.1).abs() < 1e-12);
        assert_eq!(noise_amplitude(1500), 0.0);
        assert_eq!(noise_amplitude(2200), 0.0);
    }

    #[test]
    fn test_normalize_bounded_extremes() {
        let mut probs = vec![1.0, 0.0, 0.0];
        normalize_bounded(&mut probs);
        assert_eq!(probs[1], MIN_PROBABILITY);
        assert_eq!(probs[2], MIN_PROBABILITY);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);

        let mut single = vec![0.3];
        normalize_bounded(&mut single);
        assert_eq!(single, vec![1.0]);
    }

    #[test]
    fn test_distribution_invariants_across_ratings() {
        let evals: Vec<(String, i32)> = [
            ("e2e4", 40),
            ("d2d4", 35),
            ("g1f3", 30),
            ("c2c4", 25),
            ("b1c3", 10),
            ("g2g4", -120),
            ("f2f3", -90),
            ("a2a4", -15),
        ]
        .iter()
        .map(|(m, e)| (m.to_string(), *e))
        .collect();

        let mut rng = StdRng::seed_from_u64(7);
        for rating in (600..=3000).step_by(100) {
            let moves = evals_to_distribution(&evals, rating, &mut rng);
            assert_eq!(moves.len(), 5);
            assert_bounded(&moves);
            assert!(moves
                .windows(2)
                .all(|w| w[0].probability >= w[1].probability));
        }
    }

    #[test]
    fn test_strong_players_prefer_best_move() {
        let evals = vec![("e2e4".to_string(), 50), ("g2g4".to_string(), -1950)];
        let mut rng = StdRng::seed_from_u64(1);
        let moves = evals_to_distribution(&evals, 2400, &mut rng);
        assert_eq!(moves[0].move_uci, "e2e4");
        assert_eq!(moves[0].probability, MAX_PROBABILITY);
        assert_eq!(moves[1].probability, MIN_PROBABILITY);
    }

    #[tokio::test]
    async fn test_move_probabilities_uses_ten_candidates() {
        let model = HumanMoveModel::with_seed(42);
        let mut engine = FakeEngine {
            calls: 0,
            fail_every: None,
        };
        let dist = model
            .move_probabilities(&mut engine, START_FEN, 1300)
            .await
            .unwrap();
        assert_eq!(engine.calls, 10);
        assert_eq!(dist.moves.len(), 5);
        assert_eq!(dist.rating, 1300);
        assert_bounded(&dist.moves);
        assert_eq!(dist.probability_of("h7h5"), MIN_PROBABILITY);
        assert_eq!(dist.top(3).len(), 3);
    }

    #[tokio::test]
    async fn test_failed_candidates_do_not_abort() {
        let model = HumanMoveModel::with_seed(3);
        let mut engine = FakeEngine {
            calls: 0,
            fail_every: Some(2),
        };
        let dist = model
            .move_probabilities(&mut engine, START_FEN, 1600)
            .await
            .unwrap();
        assert_bounded(&dist.moves);
    }

    #[tokio::test]
    async fn test_no_legal_moves_gives_empty_distribution() {
        let model = HumanMoveModel::with_seed(0);
        let mut engine = FakeEngine {
            calls: 0,
            fail_every: None,
        };
        // Fool's mate, white is checkmated
        let fen = "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3";
        let dist = model.move_probabilities(&mut engine, fen, 1500).await.unwrap();
        assert!(dist.moves.is_empty());
        assert_eq!(engine.calls, 0);
    }

    #[tokio::test]
    async fn test_infer_rating_returns_anchor() {
        let model = HumanMoveModel::with_seed(11);
        let mut engine = FakeEngine {
            calls: 0,
            fail_every: None,
        };
        let inference = model
            .infer_rating(&mut engine, START_FEN, "e2e4")
            .await
            .unwrap();
        assert!(RATING_ANCHORS.contains(&inference.most_likely_rating));
        assert_eq!(inference.distribution.len(), 4);
        assert_eq!(
            inference.distribution[&inference.most_likely_rating],
            inference.confidence
        );
    }

    #[tokio::test]
    async fn test_infer_rating_rejects_illegal_move() {
        let model = HumanMoveModel::with_seed(11);
        let mut engine = FakeEngine {
            calls: 0,
            fail_every: None,
        };
        let err = model
            .infer_rating(&mut engine, START_FEN, "e1e8")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::IllegalMove { .. }));
    }
}
