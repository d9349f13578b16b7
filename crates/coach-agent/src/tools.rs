//! Tool catalog offered to the model, and typed parsing of its calls.
//!
//! Every tool the model can invoke is a `ToolKind`; a call is parsed into a
//! `ToolCall` carrying statically shaped parameters before anything runs.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::lesson::{AnnotationType, BoardColor, QuestionType};
use crate::llm::ToolDefinition;

pub use crate::error::ToolError;

pub const MIN_TARGET_RATING: u32 = 800;
pub const MAX_TARGET_RATING: u32 = 2800;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    AnalyzePosition,
    AnalyzeMove,
    ClassifyOpening,
    GetPositionType,
    CreateBoardAnnotation,
    CreateQuestion,
}

impl ToolKind {
    pub fn all() -> &'static [ToolKind] {
        &[
            ToolKind::AnalyzePosition,
            ToolKind::AnalyzeMove,
            ToolKind::ClassifyOpening,
            ToolKind::GetPositionType,
            ToolKind::CreateBoardAnnotation,
            ToolKind::CreateQuestion,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::AnalyzePosition => "analyze_position",
            ToolKind::AnalyzeMove => "analyze_move",
            ToolKind::ClassifyOpening => "classify_opening",
            ToolKind::GetPositionType => "get_position_type",
            ToolKind::CreateBoardAnnotation => "create_board_annotation",
            ToolKind::CreateQuestion => "create_question",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|kind| kind.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolKind::AnalyzePosition => {
                "Engine evaluation, likely moves for a player of the target rating, game phase and tactical features for a position."
            }
            ToolKind::AnalyzeMove => {
                "Classify a move (excellent/good/inaccuracy/mistake/blunder), report centipawns lost, the engine's preferred move, and how typical the move is at the target rating."
            }
            ToolKind::ClassifyOpening => "Identify the opening of a game: ECO code, name and typical plans.",
            ToolKind::GetPositionType => {
                "Classify a position as opening, middlegame or endgame and list its tactical features."
            }
            ToolKind::CreateBoardAnnotation => {
                "Draw an arrow, circle or highlight on the board for the current lesson step."
            }
            ToolKind::CreateQuestion => "Attach an interactive question to the current lesson step.",
        }
    }

    pub fn input_schema(&self) -> Value {
        let rating = json!({
            "type": "integer",
            "description": "Skill rating of the student",
            "minimum": MIN_TARGET_RATING,
            "maximum": MAX_TARGET_RATING
        });

        match self {
            ToolKind::AnalyzePosition => json!({
                "type": "object",
                "properties": {
                    "fen": { "type": "string", "description": "Position in FEN" },
                    "target_rating": rating
                },
                "required": ["fen", "target_rating"]
            }),
            ToolKind::AnalyzeMove => json!({
                "type": "object",
                "properties": {
                    "fen_before": { "type": "string", "description": "Position before the move, in FEN" },
                    "move": { "type": "string", "description": "Move in UCI, e.g. 'e2e4' or 'e7e8q'" },
                    "target_rating": rating
                },
                "required": ["fen_before", "move", "target_rating"]
            }),
            ToolKind::ClassifyOpening => json!({
                "type": "object",
                "properties": {
                    "pgn": { "type": "string", "description": "Game in PGN" }
                },
                "required": ["pgn"]
            }),
            ToolKind::GetPositionType => json!({
                "type": "object",
                "properties": {
                    "fen": { "type": "string", "description": "Position in FEN" }
                },
                "required": ["fen"]
            }),
            ToolKind::CreateBoardAnnotation => json!({
                "type": "object",
                "properties": {
                    "annotation_type": { "type": "string", "enum": ["arrow", "circle", "highlight"] },
                    "color": { "type": "string", "enum": ["red", "green", "blue", "yellow", "orange"] },
                    "from_square": { "type": "string", "description": "Arrow start, e.g. 'e2'" },
                    "to_square": { "type": "string", "description": "Arrow end, e.g. 'e4'" },
                    "square": { "type": "string", "description": "Square for circles and highlights" }
                },
                "required": ["annotation_type", "color"]
            }),
            ToolKind::CreateQuestion => json!({
                "type": "object",
                "properties": {
                    "question_type": { "type": "string", "enum": ["multiple_choice", "move_selection"] },
                    "question_text": { "type": "string" },
                    "options": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "At least two options for multiple choice"
                    },
                    "correct_answer": { "type": "string" },
                    "explanation": { "type": "string" }
                },
                "required": ["question_type", "question_text", "correct_answer"]
            }),
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// The whole catalog in service form.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    ToolKind::all().iter().map(ToolKind::definition).collect()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnalyzePositionParams {
    pub fen: String,
    pub target_rating: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnalyzeMoveParams {
    pub fen_before: String,
    #[serde(rename = "move")]
    pub move_uci: String,
    pub target_rating: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClassifyOpeningParams {
    pub pgn: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PositionTypeParams {
    pub fen: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnnotationParams {
    pub annotation_type: AnnotationType,
    pub color: BoardColor,
    pub from_square: Option<String>,
    pub to_square: Option<String>,
    pub square: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QuestionParams {
    pub question_type: QuestionType,
    pub question_text: String,
    pub correct_answer: String,
    pub options: Option<Vec<String>>,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    AnalyzePosition(AnalyzePositionParams),
    AnalyzeMove(AnalyzeMoveParams),
    ClassifyOpening(ClassifyOpeningParams),
    GetPositionType(PositionTypeParams),
    CreateBoardAnnotation(AnnotationParams),
    CreateQuestion(QuestionParams),
}

impl ToolCall {
    /// Parse and validate a call by tool name and JSON input.
    pub fn parse(name: &str, input: &Value) -> Result<Self, ToolError> {
        let kind = ToolKind::from_name(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let call = match kind {
            ToolKind::AnalyzePosition => {
                let params: AnalyzePositionParams = params(input)?;
                check_rating(params.target_rating)?;
                ToolCall::AnalyzePosition(params)
            }
            ToolKind::AnalyzeMove => {
                let params: AnalyzeMoveParams = params(input)?;
                check_rating(params.target_rating)?;
                ToolCall::AnalyzeMove(params)
            }
            ToolKind::ClassifyOpening => ToolCall::ClassifyOpening(params(input)?),
            ToolKind::GetPositionType => ToolCall::GetPositionType(params(input)?),
            ToolKind::CreateBoardAnnotation => ToolCall::CreateBoardAnnotation(params(input)?),
            ToolKind::CreateQuestion => ToolCall::CreateQuestion(params(input)?),
        };

        Ok(call)
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            ToolCall::AnalyzePosition(_) => ToolKind::AnalyzePosition,
            ToolCall::AnalyzeMove(_) => ToolKind::AnalyzeMove,
            ToolCall::ClassifyOpening(_) => ToolKind::ClassifyOpening,
            ToolCall::GetPositionType(_) => ToolKind::GetPositionType,
            ToolCall::CreateBoardAnnotation(_) => ToolKind::CreateBoardAnnotation,
            ToolCall::CreateQuestion(_) => ToolKind::CreateQuestion,
        }
    }
}

fn params<T: DeserializeOwned>(input: &Value) -> Result<T, ToolError> {
    T::deserialize(input).map_err(|e| ToolError::InvalidParameters(e.to_string()))
}

/// Ratings outside the supported band are rejected, not clamped.
pub fn check_rating(rating: u32) -> Result<u32, ToolError> {
    if (MIN_TARGET_RATING..=MAX_TARGET_RATING).contains(&rating) {
        Ok(rating)
    } else {
        Err(ToolError::RatingOutOfRange(rating))
    }
}
