//! Lesson data model: annotations, questions, steps and the finished lesson.

use chess_core::game_data::PlayedPosition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shakmaty::Square;

use crate::error::{LessonError, ToolError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardColor {
    Red,
    Green,
    Blue,
    Yellow,
    Orange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationType {
    Arrow,
    Circle,
    Highlight,
}

impl AnnotationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationType::Arrow => "arrow",
            AnnotationType::Circle => "circle",
            AnnotationType::Highlight => "highlight",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnnotationKind {
    Arrow { from: String, to: String },
    Circle { square: String },
    Highlight { square: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: String,
    #[serde(flatten)]
    pub kind: AnnotationKind,
    pub color: BoardColor,
}

impl Annotation {
    /// Build an annotation, requiring the squares its type needs.
    pub fn new(
        annotation_type: AnnotationType,
        color: BoardColor,
        from_square: Option<&str>,
        to_square: Option<&str>,
        square: Option<&str>,
    ) -> Result<Self, ToolError> {
        let kind = match annotation_type {
            AnnotationType::Arrow => match (from_square, to_square) {
                (Some(from), Some(to)) => AnnotationKind::Arrow {
                    from: board_square(from)?,
                    to: board_square(to)?,
                },
                _ => {
                    return Err(ToolError::InvalidAnnotation(
                        "arrows require both from_square and to_square".into(),
                    ))
                }
            },
            AnnotationType::Circle | AnnotationType::Highlight => {
                let square = square.ok_or_else(|| {
                    ToolError::InvalidAnnotation(format!(
                        "{} requires a square",
                        annotation_type.as_str()
                    ))
                })?;
                let square = board_square(square)?;
                if annotation_type == AnnotationType::Circle {
                    AnnotationKind::Circle { square }
                } else {
                    AnnotationKind::Highlight { square }
                }
            }
        };

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            color,
        })
    }
}

/// Normalised square name, e.g. "E4" -> "e4"
fn board_square(name: &str) -> Result<String, ToolError> {
    let name = name.trim().to_ascii_lowercase();
    name.parse::<Square>()
        .map(|sq| sq.to_string())
        .map_err(|_| ToolError::InvalidAnnotation(format!("'{name}' is not a board square")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    MoveSelection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice { options: Vec<String> },
    MoveSelection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(flatten)]
    pub kind: QuestionKind,
    pub question: String,
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Question {
    pub fn new(
        question_type: QuestionType,
        question: &str,
        correct_answer: &str,
        options: Option<Vec<String>>,
        explanation: Option<String>,
    ) -> Result<Self, ToolError> {
        if question.trim().is_empty() {
            return Err(ToolError::InvalidQuestion("question_text is empty".into()));
        }

        let kind = match question_type {
            QuestionType::MultipleChoice => {
                let options = options.unwrap_or_default();
                if options.len() < 2 {
                    return Err(ToolError::InvalidQuestion(
                        "multiple choice questions need at least 2 options".into(),
                    ));
                }
                QuestionKind::MultipleChoice { options }
            }
            QuestionType::MoveSelection => QuestionKind::MoveSelection,
        };

        Ok(Self {
            kind,
            question: question.to_string(),
            correct_answer: correct_answer.to_string(),
            explanation: explanation.filter(|e| !e.trim().is_empty()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonStep {
    pub step_number: usize,
    pub position_fen: String,
    /// UCI move that led to `position_fen`, if any
    pub move_made: Option<String>,
    pub text: String,
    pub annotations: Vec<Annotation>,
    pub question: Option<Question>,
}

/// Commentary, annotations and question collected since the last step boundary.
#[derive(Debug, Clone, Default)]
pub struct StepDraft {
    text: String,
    annotations: Vec<Annotation>,
    question: Option<Question>,
}

impl StepDraft {
    pub fn push_text(&mut self, fragment: &str) {
        if !self.text.is_empty() && !self.text.ends_with('\n') && !fragment.starts_with('\n') {
            self.text.push('\n');
        }
        self.text.push_str(fragment);
    }

    pub fn add_annotation(&mut self, annotation: Annotation) {
        self.annotations.push(annotation);
    }

    /// One question per step; a later one replaces an earlier one.
    pub fn set_question(&mut self, question: Question) {
        self.question = Some(question);
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn question(&self) -> Option<&Question> {
        self.question.as_ref()
    }

    pub fn into_step(self, step_number: usize, position: &PlayedPosition) -> LessonStep {
        LessonStep {
            step_number,
            position_fen: position.fen.clone(),
            move_made: position.move_uci.clone(),
            text: self.text.trim().to_string(),
            annotations: self.annotations,
            question: self.question,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    pub steps: Vec<LessonStep>,
    pub total_steps: usize,
    pub focus_areas: Vec<String>,
}

impl Lesson {
    pub fn new(steps: Vec<LessonStep>, focus_areas: Vec<String>) -> Self {
        Self {
            total_steps: steps.len(),
            steps,
            focus_areas,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonStatus {
    Completed,
    Failed,
}

/// Terminal outcome of a run. Failed runs never carry steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonReport {
    pub status: LessonStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub steps: Vec<LessonStep>,
    pub total_steps: usize,
    pub focus_areas: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl LessonReport {
    pub fn from_result(result: Result<Lesson, LessonError>) -> Self {
        match result {
            Ok(lesson) => Self {
                status: LessonStatus::Completed,
                error_message: None,
                total_steps: lesson.total_steps,
                steps: lesson.steps,
                focus_areas: lesson.focus_areas,
                generated_at: Utc::now(),
            },
            Err(e) => Self {
                status: LessonStatus::Failed,
                error_message: Some(e.to_string()),
                steps: Vec::new(),
                total_steps: 0,
                focus_areas: Vec::new(),
                generated_at: Utc::now(),
            },
        }
    }
}
