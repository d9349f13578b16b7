//! The lesson agent: a bounded tool-calling conversation turned into steps.

use analysis_engine::{AnalysisCoordinator, EngineSource};
use chess_core::pgn::parse_pgn;
use tracing::{debug, error, info, warn};

use crate::error::LessonError;
use crate::lesson::{Lesson, LessonReport};
use crate::llm::{ContentBlock, LessonModel, Message, ModelTurn};
use crate::prompts;
use crate::segment::StepSegmenter;
use crate::toolkit::LessonToolkit;
use crate::tools::{tool_definitions, ToolCall};

/// Hard cap on model turns per lesson
pub const MAX_ITERATIONS: usize = 30;

/// Loop position after the game is parsed. Each transition consumes the state.
#[derive(Debug)]
enum AgentState {
    Conversing { iteration: usize },
    ToolDispatch { iteration: usize, turn: ModelTurn },
    Finalizing { capped: bool },
}

#[derive(Debug, Clone)]
pub struct LessonRequest {
    pub pgn: String,
    pub target_rating: u32,
    pub focus_areas: Vec<String>,
}

pub struct LessonAgent<M: LessonModel, S: EngineSource> {
    model: M,
    coordinator: AnalysisCoordinator<S>,
}

impl<M: LessonModel, S: EngineSource> LessonAgent<M, S> {
    pub fn new(model: M, coordinator: AnalysisCoordinator<S>) -> Self {
        Self { model, coordinator }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Generate a lesson, or fail without any partial steps.
    pub async fn generate_lesson(&self, request: &LessonRequest) -> Result<Lesson, LessonError> {
        let game = parse_pgn(&request.pgn)?;
        info!(
            moves = game.move_count(),
            rating = request.target_rating,
            "Starting lesson generation"
        );

        // Fresh per run: nothing from a previous lesson can leak in
        let toolkit = LessonToolkit::new(self.coordinator.clone());
        let mut segmenter = StepSegmenter::new(&game);

        let system = prompts::system_prompt(request.target_rating, &request.focus_areas);
        let tools = tool_definitions();
        let mut messages = vec![Message::user_text(prompts::user_prompt(
            &game,
            request.target_rating,
        ))];

        let mut state = AgentState::Conversing { iteration: 1 };
        loop {
            state = match state {
                AgentState::Conversing { iteration } if iteration > MAX_ITERATIONS => {
                    AgentState::Finalizing { capped: true }
                }
                AgentState::Conversing { iteration } => {
                    debug!(iteration, "Requesting model turn");
                    let turn = self.model.respond(&system, &messages, &tools).await?;
                    if turn.has_tool_calls() {
                        AgentState::ToolDispatch { iteration, turn }
                    } else {
                        for block in &turn.content {
                            if let ContentBlock::Text { text } = block {
                                segmenter.push_text(text);
                            }
                        }
                        info!(iteration, stop_reason = ?turn.stop_reason, "Model finished the lesson");
                        AgentState::Finalizing { capped: false }
                    }
                }
                AgentState::ToolDispatch { iteration, turn } => {
                    let mut results = Vec::new();
                    for block in &turn.content {
                        match block {
                            ContentBlock::Text { text } => segmenter.push_text(text),
                            ContentBlock::ToolUse { id, name, input } => {
                                let outcome = match ToolCall::parse(name, input) {
                                    Ok(call) => toolkit.execute(call, segmenter.draft_mut()).await,
                                    Err(e) => Err(e),
                                };
                                results.push(match outcome {
                                    Ok(value) => ContentBlock::tool_result(id, value.to_string(), false),
                                    Err(e) => {
                                        warn!(iteration, tool = %name, error = %e, "Tool call failed");
                                        ContentBlock::tool_result(id, format!("tool failed: {e}"), true)
                                    }
                                });
                            }
                            ContentBlock::ToolResult { .. } | ContentBlock::Unknown => {}
                        }
                    }

                    debug!(iteration, calls = results.len(), "Returning tool results");
                    messages.extend(Message::assistant(turn.content));
                    messages.push(Message::tool_results(results));
                    AgentState::Conversing {
                        iteration: iteration + 1,
                    }
                }
                AgentState::Finalizing { capped } => {
                    if capped {
                        warn!(max_iterations = MAX_ITERATIONS, "Iteration limit reached, finalizing lesson");
                    }
                    let steps = segmenter.finish();
                    info!(steps = steps.len(), "Lesson generated");
                    return Ok(Lesson::new(steps, request.focus_areas.clone()));
                }
            };
        }
    }

    /// Like [`generate_lesson`](Self::generate_lesson) but always returns a terminal report.
    pub async fn generate_report(&self, request: &LessonRequest) -> LessonReport {
        let result = self.generate_lesson(request).await;
        if let Err(e) = &result {
            error!(error = %e, "Lesson generation failed");
        }
        LessonReport::from_result(result)
    }
}
