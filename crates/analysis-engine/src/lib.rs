pub mod analysis;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod evaluator;
pub mod human_model;
pub mod stockfish;

pub use coordinator::AnalysisCoordinator;
pub use error::EngineError;
pub use evaluator::{EngineEvaluation, EngineSource, PositionEvaluator, Score};
pub use human_model::HumanMoveModel;
pub use stockfish::{StockfishEngine, StockfishLauncher};
