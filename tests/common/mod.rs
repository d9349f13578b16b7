//! Shared helpers for the integration tests: engine discovery, a material-count
//! engine stand-in, and a scripted language model.
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Mutex;

use analysis_engine::config::EngineConfig;
use analysis_engine::{EngineError, EngineEvaluation, EngineSource, PositionEvaluator, Score};
use async_trait::async_trait;
use chess_core::position::{move_to_uci, parse_fen};
use coach_agent::llm::{ContentBlock, Message, ModelTurn, StopReason, ToolDefinition};
use coach_agent::{LessonModel, ServiceError};
use shakmaty::{Color, Position, Role};

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Locate Stockfish the same way the CLI does. `None` means tests should skip.
pub fn find_stockfish() -> Option<PathBuf> {
    EngineConfig::from_env().discover_stockfish().ok()
}

fn role_value(role: Role) -> i32 {
    match role {
        Role::Pawn => 100,
        Role::Knight | Role::Bishop => 300,
        Role::Rook => 500,
        Role::Queen => 900,
        Role::King => 0,
    }
}

/// Counts material from the side to move's point of view. Deterministic and
/// fast, good enough to drive the analysis pipeline without a real engine.
pub struct MaterialSession;

#[async_trait]
impl PositionEvaluator for MaterialSession {
    async fn evaluate(&mut self, fen: &str, depth: u32) -> Result<EngineEvaluation, EngineError> {
        let pos = parse_fen(fen)?;
        let board = pos.board();
        let balance: i32 = board
            .occupied()
            .into_iter()
            .filter_map(|sq| board.piece_at(sq))
            .map(|piece| {
                let value = role_value(piece.role);
                if piece.color == Color::White { value } else { -value }
            })
            .sum();
        let cp = if pos.turn() == Color::White { balance } else { -balance };

        let best_move = pos.legal_moves().first().map(move_to_uci);
        Ok(EngineEvaluation {
            score: Score::Cp { centipawn_eval: cp },
            best_line: best_move.iter().cloned().collect(),
            best_move,
            depth,
        })
    }
}

pub struct MaterialSource;

#[async_trait]
impl EngineSource for MaterialSource {
    type Session = MaterialSession;

    async fn acquire(&self) -> Result<MaterialSession, EngineError> {
        Ok(MaterialSession)
    }
}

type Script = Box<dyn Fn(usize) -> Result<ModelTurn, ServiceError> + Send + Sync>;

/// Answers turn `n` with `script(n)` and keeps every transcript it was shown.
pub struct ScriptedModel {
    script: Script,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedModel {
    pub fn new(
        script: impl Fn(usize) -> Result<ModelTurn, ServiceError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn transcript(&self, call: usize) -> Vec<Message> {
        self.seen.lock().unwrap()[call].clone()
    }
}

#[async_trait]
impl LessonModel for ScriptedModel {
    async fn respond(
        &self,
        _system: &str,
        messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<ModelTurn, ServiceError> {
        let n = {
            let mut seen = self.seen.lock().unwrap();
            seen.push(messages.to_vec());
            seen.len() - 1
        };
        (self.script)(n)
    }
}

/// A model turn; stop reason follows from whether it calls tools.
pub fn turn(blocks: Vec<ContentBlock>) -> ModelTurn {
    let calls_tools = blocks
        .iter()
        .any(|b| matches!(b, ContentBlock::ToolUse { .. }));
    ModelTurn {
        content: blocks,
        stop_reason: Some(if calls_tools {
            StopReason::ToolUse
        } else {
            StopReason::EndTurn
        }),
    }
}

pub fn tool_use(id: &str, name: &str, input: serde_json::Value) -> ContentBlock {
    ContentBlock::ToolUse {
        id: id.to_string(),
        name: name.to_string(),
        input,
    }
}

/// Every tool result the agent sent back, as `(content, is_error)`.
pub fn tool_results(messages: &[Message]) -> Vec<(String, bool)> {
    messages
        .iter()
        .flat_map(|m| m.content.iter())
        .filter_map(|block| match block {
            ContentBlock::ToolResult {
                content, is_error, ..
            } => Some((content.clone(), *is_error)),
            _ => None,
        })
        .collect()
}
