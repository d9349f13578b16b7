//! Lightweight regex-based PGN parser with full main-line replay.

use std::sync::LazyLock;

use regex::Regex;
use shakmaty::san::San;
use shakmaty::{Chess, Position};
use thiserror::Error;
use tracing::warn;

use crate::game_data::{GameMetadata, GameRecord, PlayedPosition};
use crate::position::{move_to_uci, parse_fen, to_fen, BoardError};

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\[(\w+)\s+"([^"]*)"\]"#).expect("header regex"));
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^}]*\}|;[^\n]*").expect("comment regex"));
static VARIATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^()]*\)").expect("variation regex"));
static MOVE_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.+").expect("move number regex"));
static SAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[KQRBN]?[a-h]?[1-8]?x?[a-h][1-8](?:=?[QRBN])?|O-O-O|O-O|0-0-0|0-0)[+#]?[!?]*$")
        .expect("san regex")
});

const RESULT_TOKENS: &[&str] = &["1-0", "0-1", "1/2-1/2", "*"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PgnError {
    #[error("PGN is empty")]
    Empty,

    #[error("PGN contains neither tags nor moves")]
    NoGame,

    #[error("Invalid start position: {0}")]
    StartPosition(#[from] BoardError),
}

/// Parse a PGN string and replay its main line into a [`GameRecord`].
///
/// Headers, comments, NAGs and variations are ignored. A PGN with
/// tags but no moves parses to a record holding only the start position.
/// Replay stops at the first unreadable token or illegal move and keeps the
/// legal prefix.
pub fn parse_pgn(pgn: &str) -> Result<GameRecord, PgnError> {
    if pgn.trim().is_empty() {
        return Err(PgnError::Empty);
    }

    let mut metadata = GameMetadata::default();
    let mut setup = None;
    let mut start_fen = None;
    let mut header_count = 0usize;

    for cap in HEADER_RE.captures_iter(pgn) {
        header_count += 1;
        let value = cap[2].to_string();
        match &cap[1] {
            "White" => metadata.white = value,
            "Black" => metadata.black = value,
            "Result" => metadata.result = value,
            "Date" => metadata.date = Some(value),
            "Event" => metadata.event = Some(value),
            "ECO" => metadata.eco = Some(value),
            "WhiteElo" => metadata.white_elo = value.parse().ok(),
            "BlackElo" => metadata.black_elo = value.parse().ok(),
            "SetUp" => setup = Some(value),
            "FEN" => start_fen = Some(value),
            _ => {}
        }
    }

    let san_moves = extract_moves(pgn);
    if header_count == 0 && san_moves.is_empty() {
        return Err(PgnError::NoGame);
    }

    // A FEN tag is honoured unless SetUp explicitly says otherwise
    let mut pos = match (setup.as_deref(), start_fen) {
        (Some("0"), _) | (_, None) => Chess::default(),
        (_, Some(fen)) => parse_fen(&fen)?,
    };

    let mut positions = vec![PlayedPosition {
        fen: to_fen(&pos),
        ply: 0,
        move_uci: None,
        move_san: None,
    }];
    let mut moves_uci = Vec::with_capacity(san_moves.len());
    let mut moves_san = Vec::with_capacity(san_moves.len());

    for (i, raw) in san_moves.iter().enumerate() {
        let ply = i + 1;
        let Some(mv) = normalize_san(raw)
            .parse::<San>()
            .ok()
            .and_then(|san| san.to_move(&pos).ok())
        else {
            warn!(san = %raw, ply, "Illegal move, keeping the game up to here");
            break;
        };

        let uci = move_to_uci(&mv);
        let san_text = San::from_move(&pos, mv).to_string();
        pos.play_unchecked(mv);

        positions.push(PlayedPosition {
            fen: to_fen(&pos),
            ply,
            move_uci: Some(uci.clone()),
            move_san: Some(san_text.clone()),
        });
        moves_uci.push(uci);
        moves_san.push(san_text);
    }

    Ok(GameRecord {
        metadata,
        positions,
        moves_uci,
        moves_san,
        pgn: pgn.to_string(),
    })
}

/// Extract SAN moves from PGN text (after removing headers, comments, variations).
/// Stops at the first token that is not a move.
fn extract_moves(pgn: &str) -> Vec<String> {
    let no_headers = HEADER_RE.replace_all(pgn, "");
    let no_comments = COMMENT_RE.replace_all(&no_headers, " ");

    // Strip innermost variations until none remain
    let mut movetext = no_comments.into_owned();
    while VARIATION_RE.is_match(&movetext) {
        movetext = VARIATION_RE.replace_all(&movetext, " ").into_owned();
    }

    let mut moves = Vec::new();
    for token in movetext.split_whitespace() {
        if RESULT_TOKENS.contains(&token) || token.starts_with('$') || token == "e.p." {
            continue;
        }
        // "12." / "12..." / "12.e4"
        let token = MOVE_NUMBER_RE.replace(token, "");
        if token.is_empty() {
            continue;
        }
        if !SAN_RE.is_match(&token) {
            warn!(token = %token, ply = moves.len() + 1, "Unexpected token in movetext, ignoring the rest");
            break;
        }
        moves.push(token.into_owned());
    }

    moves
}

/// Drop check/annotation suffixes and normalise zero-castling.
fn normalize_san(san: &str) -> String {
    let clean = san.trim_end_matches(|c: char| matches!(c, '+' | '#' | '!' | '?'));
    match clean {
        "0-0" => "O-O".to_string(),
        "0-0-0" => "O-O-O".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pgn_basic() {
        let pgn = r#"[White "Player1"]
[Black "Player2"]
[Result "1-0"]
[Date "2025.01.15"]
[WhiteElo "1500"]

1. e4 e5 2. Nf3 Nc6 1-0"#;

        let game = parse_pgn(pgn).unwrap();
        assert_eq!(game.metadata.white, "Player1");
        assert_eq!(game.metadata.black, "Player2");
        assert_eq!(game.metadata.result, "1-0");
        assert_eq!(game.metadata.white_elo, Some(1500));
        assert_eq!(game.moves_san, vec!["e4", "e5", "Nf3", "Nc6"]);
        assert_eq!(game.moves_uci, vec!["e2e4", "e7e5", "g1f3", "b8c6"]);
        assert_eq!(game.positions.len(), 5);
        assert_eq!(game.positions[0].move_uci, None);
        assert_eq!(game.positions[4].move_uci.as_deref(), Some("b8c6"));
    }

    #[test]
    fn test_comments_variations_and_suffixes() {
        let pgn = "1. e4 {best by test} e5 (1... c5 2. Nf3 (2. c3)) 2. Bc4 $1 Nf6?! 3. Qh5 Nc6?? 4. Qxf7# 1-0";
        let game = parse_pgn(pgn).unwrap();
        assert_eq!(game.move_count(), 7);
        assert_eq!(game.moves_uci.last().map(String::as_str), Some("h5f7"));
        assert_eq!(game.metadata.white, "Unknown");
    }

    #[test]
    fn test_castling_and_compact_numbers() {
        let pgn = "1.e4 e5 2.Nf3 Nc6 3.Bc4 Bc5 4.O-O Nf6";
        let game = parse_pgn(pgn).unwrap();
        assert_eq!(game.moves_uci[6], "e1g1");
        assert_eq!(game.moves_san[6], "O-O");
    }

    #[test]
    fn test_headers_only_yields_start_position() {
        let game = parse_pgn("[Event \"Casual\"]\n\n*").unwrap();
        assert_eq!(game.positions.len(), 1);
        assert_eq!(
            game.start_fen(),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
        );
    }

    #[test]
    fn test_fen_header_start() {
        let pgn = r#"[SetUp "1"]
[FEN "4k3/8/8/8/8/8/4P3/4K3 w - - 0 50"]

50. e4 Kd7"#;
        let game = parse_pgn(pgn).unwrap();
        assert_eq!(game.start_fen(), "4k3/8/8/8/8/8/4P3/4K3 w - - 0 50");
        assert_eq!(game.moves_uci, vec!["e2e4", "e8d7"]);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(matches!(parse_pgn(""), Err(PgnError::Empty)));
        assert!(matches!(
            parse_pgn("this is not a chess game"),
            Err(PgnError::NoGame)
        ));
        assert!(matches!(
            parse_pgn("[FEN \"not a position\"]\n\n1. e4"),
            Err(PgnError::StartPosition(_))
        ));
    }

    #[test]
    fn test_illegal_move_keeps_prefix() {
        let game = parse_pgn("1. e4 e5 2. Ke3 Nc6 3. Nf3").unwrap();
        assert_eq!(game.moves_uci, vec!["e2e4", "e7e5"]);
        assert_eq!(game.positions.len(), 3);
    }

    #[test]
    fn test_late_illegal_move_keeps_game() {
        let pgn = "1. e4 e5 2. Nf3 Nc6 3. Bc4 Nf6 4. Ng5 d5 5. exd5 Nxd5 6. Nxf7 Kxf7 \
                   7. Qf3+ Ke6 8. Ke3 Ncb4 1-0";
        let game = parse_pgn(pgn).unwrap();
        assert_eq!(game.move_count(), 14);
        assert_eq!(game.moves_san.last().map(String::as_str), Some("Ke6"));
    }

    #[test]
    fn test_unknown_token_keeps_prefix() {
        let game = parse_pgn("1. e4 d5 2. exd5 Qxd5 3. Nc3 ?? Qa5").unwrap();
        assert_eq!(game.move_count(), 5);

        let en_passant = parse_pgn("1. e4 a6 2. e5 d5 3. exd6 e.p. cxd6").unwrap();
        assert_eq!(en_passant.move_count(), 6);
        assert_eq!(en_passant.moves_uci[4], "e5d6");
    }

    #[test]
    fn test_position_for_step_clamps() {
        let game = parse_pgn("1. d4 d5").unwrap();
        assert_eq!(game.position_for_step(1).move_uci.as_deref(), Some("d2d4"));
        assert_eq!(game.position_for_step(99).ply, 2);
    }
}
