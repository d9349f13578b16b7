//! Executes parsed tool calls against the analysis coordinator and the
//! current step draft.

use analysis_engine::{AnalysisCoordinator, EngineSource};
use chess_core::opening::classify_pgn;
use chess_core::position::{parse_fen, phase_of, tactical_features_of};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::ToolError;
use crate::lesson::{Annotation, Question, StepDraft};
use crate::tools::ToolCall;

pub struct LessonToolkit<S: EngineSource> {
    coordinator: AnalysisCoordinator<S>,
}

impl<S: EngineSource> LessonToolkit<S> {
    pub fn new(coordinator: AnalysisCoordinator<S>) -> Self {
        Self { coordinator }
    }

    /// Run one call. Annotation and question tools write into `draft`.
    pub async fn execute(&self, call: ToolCall, draft: &mut StepDraft) -> Result<Value, ToolError> {
        debug!(tool = call.kind().name(), "Executing tool");

        match call {
            ToolCall::AnalyzePosition(p) => {
                let analysis = self
                    .coordinator
                    .full_position_analysis(&p.fen, p.target_rating)
                    .await?;
                Ok(serde_json::to_value(analysis)?)
            }
            ToolCall::AnalyzeMove(p) => {
                let analysis = self
                    .coordinator
                    .user_move_analysis(&p.fen_before, &p.move_uci, p.target_rating)
                    .await?;
                Ok(serde_json::to_value(analysis)?)
            }
            ToolCall::ClassifyOpening(p) => Ok(serde_json::to_value(classify_pgn(&p.pgn))?),
            ToolCall::GetPositionType(p) => {
                let pos = parse_fen(&p.fen).map_err(|e| ToolError::InvalidPosition(e.to_string()))?;
                Ok(json!({
                    "fen": p.fen,
                    "phase": phase_of(&pos),
                    "tactical_features": tactical_features_of(&pos),
                }))
            }
            ToolCall::CreateBoardAnnotation(p) => {
                let annotation = Annotation::new(
                    p.annotation_type,
                    p.color,
                    p.from_square.as_deref(),
                    p.to_square.as_deref(),
                    p.square.as_deref(),
                )?;
                let value = serde_json::to_value(&annotation)?;
                draft.add_annotation(annotation);
                Ok(value)
            }
            ToolCall::CreateQuestion(p) => {
                let question = Question::new(
                    p.question_type,
                    &p.question_text,
                    &p.correct_answer,
                    p.options,
                    p.explanation,
                )?;
                let value = serde_json::to_value(&question)?;
                draft.set_question(question);
                Ok(value)
            }
        }
    }
}
