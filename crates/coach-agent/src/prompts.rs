//! Prompt text for lesson generation.

use chess_core::game_data::GameRecord;

/// System instructions: who the student is and how a lesson is laid out.
pub fn system_prompt(target_rating: u32, focus_areas: &[String]) -> String {
    let mut prompt = format!(
        "You are a chess coach writing a lesson for a student rated {target_rating}.

Study the game with the tools provided, then teach from it:
- Pick 3-5 instructive moments rather than commenting on every move
- Open with the opening, then the critical moments, then a short conclusion
- Match the depth of explanation to the student's rating
- Be encouraging and concrete about what to do differently

Tools:
- analyze_position: engine evaluation plus the moves a player of a given rating tends to choose
- analyze_move: how good a move was and what the engine preferred
- classify_opening: name of the opening played
- get_position_type: opening, middlegame or endgame, with tactical features
- create_board_annotation: arrow, circle or highlight on the current step's board
- create_question: an interactive question for the current step

Lesson layout:
- Begin every lesson step with a markdown heading line starting with `### `
- Create annotations and questions after the heading of the step they belong to
- Use one or two annotations per step and a question every two or three steps
- Positions are FEN strings and moves are UCI strings (e.g. e2e4) in every tool call"
    );

    if !focus_areas.is_empty() {
        prompt.push_str(&format!(
            "\n- Give extra attention to: {}",
            focus_areas.join(", ")
        ));
    }

    prompt
}

/// First user message: the game itself.
pub fn user_prompt(game: &GameRecord, target_rating: u32) -> String {
    let meta = &game.metadata;
    format!(
        "Create a lesson from this game.

White: {white}
Black: {black}
Result: {result}
Moves played: {moves}
Starting position: {start}

PGN:
{pgn}

Student rating: {target_rating}

Write 3-5 lesson steps. For each step, analyze the relevant position with the tools, \
explain the idea in markdown, and mark the key squares or moves on the board.",
        white = meta.white,
        black = meta.black,
        result = meta.result,
        moves = game.move_count(),
        start = game.start_fen(),
        pgn = game.pgn.trim(),
    )
}
