//! Splits model commentary into lesson steps.
//!
//! A step starts at a markdown heading line (`#` to `###` then a space) or at a
//! separator line of three or more dashes. Headings stay in the new step's
//! text; separators are dropped.

use chess_core::game_data::GameRecord;

use crate::lesson::{LessonStep, StepDraft};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    Heading,
    Separator,
}

fn boundary(line: &str) -> Option<Boundary> {
    let trimmed = line.trim();

    let hashes = trimmed.chars().take_while(|&c| c == '#').count();
    if (1..=3).contains(&hashes) && trimmed[hashes..].starts_with(' ') {
        return Some(Boundary::Heading);
    }

    if trimmed.len() >= 3 && trimmed.chars().all(|c| c == '-') {
        return Some(Boundary::Separator);
    }

    None
}

/// Accumulates text and tool output into steps bound to game positions.
pub struct StepSegmenter<'a> {
    game: &'a GameRecord,
    steps: Vec<LessonStep>,
    draft: StepDraft,
}

impl<'a> StepSegmenter<'a> {
    pub fn new(game: &'a GameRecord) -> Self {
        Self {
            game,
            steps: Vec::new(),
            draft: StepDraft::default(),
        }
    }

    /// Buffer that annotation and question tools write into.
    pub fn draft_mut(&mut self) -> &mut StepDraft {
        &mut self.draft
    }

    pub fn steps(&self) -> &[LessonStep] {
        &self.steps
    }

    /// Feed one text fragment from the model.
    pub fn push_text(&mut self, fragment: &str) {
        let mut pending = String::new();

        for line in fragment.split_inclusive('\n') {
            match boundary(line) {
                Some(kind) => {
                    if !pending.is_empty() {
                        self.draft.push_text(&pending);
                        pending.clear();
                    }
                    self.seal();
                    if kind == Boundary::Heading {
                        pending.push_str(line);
                    }
                }
                None => pending.push_str(line),
            }
        }

        if !pending.is_empty() {
            self.draft.push_text(&pending);
        }
    }

    /// Close the current step if it has commentary. An empty draft keeps its
    /// annotations and question for the next step.
    pub fn seal(&mut self) {
        if !self.draft.has_text() {
            return;
        }
        let index = self.steps.len();
        let position = self.game.position_for_step(index);
        let draft = std::mem::take(&mut self.draft);
        self.steps.push(draft.into_step(index + 1, position));
    }

    /// Seal whatever is left and hand over the steps.
    pub fn finish(mut self) -> Vec<LessonStep> {
        self.seal();
        self.steps
    }
}
