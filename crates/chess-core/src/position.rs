//! Position helpers and the position classifier.
//!
//! Positions cross every boundary as FEN strings and moves as UCI strings;
//! this module is where they are turned into shakmaty values and back.
//! The classifier is intentionally simple: phase depends only on the move
//! number and the amount of material left, and the tactical tags are plain
//! attack/defence counts without any exchange evaluation.

use serde::{Deserialize, Serialize};
use shakmaty::fen::Fen;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Move, Position, Role, Square};
use thiserror::Error;

/// Full-move number up to which a position counts as the opening
const OPENING_MAX_FULLMOVE: u32 = 10;

/// Piece count (kings and pawns included) at or below which a position is an endgame
const ENDGAME_MAX_PIECES: usize = 10;

/// More simultaneously attacked pieces than this marks the position as tactical
const TACTICAL_ATTACKED_PIECES: usize = 2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("Invalid FEN '{fen}': {reason}")]
    InvalidFen { fen: String, reason: String },

    #[error("Invalid UCI move '{0}'")]
    InvalidUci(String),

    #[error("Illegal move {uci} in position {fen}")]
    IllegalMove { uci: String, fen: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    Opening,
    Middlegame,
    Endgame,
}

impl GamePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            GamePhase::Opening => "opening",
            GamePhase::Middlegame => "middlegame",
            GamePhase::Endgame => "endgame",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TacticalFeature {
    HangingPieces,
    Check,
    Tactical,
}

/// Parse a FEN string into a playable position.
pub fn parse_fen(fen: &str) -> Result<Chess, BoardError> {
    let invalid = |reason: String| BoardError::InvalidFen {
        fen: fen.to_string(),
        reason,
    };
    let parsed: Fen = fen.trim().parse().map_err(|e| invalid(format!("{e}")))?;
    parsed
        .into_position::<Chess>(CastlingMode::Standard)
        .map_err(|e| invalid(format!("{e}")))
}

/// Render a position as FEN.
pub fn to_fen(pos: &Chess) -> String {
    Fen::from_position(pos, EnPassantMode::Legal).to_string()
}

/// UCI text for a move (standard castling notation, e.g. `e1g1`).
pub fn move_to_uci(mv: &Move) -> String {
    mv.to_uci(CastlingMode::Standard).to_string()
}

/// Resolve a UCI string to a legal move in `pos`.
pub fn parse_uci_move(pos: &Chess, uci: &str) -> Result<Move, BoardError> {
    let parsed: UciMove = uci
        .trim()
        .parse()
        .map_err(|_| BoardError::InvalidUci(uci.to_string()))?;
    parsed.to_move(pos).map_err(|_| BoardError::IllegalMove {
        uci: uci.to_string(),
        fen: to_fen(pos),
    })
}

/// Play a UCI move on a FEN position and return the resulting FEN.
pub fn apply_uci_move(fen: &str, uci: &str) -> Result<String, BoardError> {
    let mut pos = parse_fen(fen)?;
    let mv = parse_uci_move(&pos, uci)?;
    pos.play_unchecked(mv);
    Ok(to_fen(&pos))
}

/// Classify a FEN as opening, middlegame or endgame.
pub fn phase(fen: &str) -> Result<GamePhase, BoardError> {
    Ok(phase_of(&parse_fen(fen)?))
}

pub fn phase_of(pos: &Chess) -> GamePhase {
    let piece_count = pos.board().occupied().count();

    if pos.fullmoves().get() <= OPENING_MAX_FULLMOVE {
        GamePhase::Opening
    } else if piece_count <= ENDGAME_MAX_PIECES {
        GamePhase::Endgame
    } else {
        GamePhase::Middlegame
    }
}

/// Tactical feature tags for a FEN, in a fixed order without duplicates.
pub fn tactical_features(fen: &str) -> Result<Vec<TacticalFeature>, BoardError> {
    Ok(tactical_features_of(&parse_fen(fen)?))
}

pub fn tactical_features_of(pos: &Chess) -> Vec<TacticalFeature> {
    let mut features = Vec::new();

    if !hanging_pieces(pos).is_empty() {
        features.push(TacticalFeature::HangingPieces);
    }
    if pos.is_check() {
        features.push(TacticalFeature::Check);
    }
    if attacked_piece_count(pos) > TACTICAL_ATTACKED_PIECES {
        features.push(TacticalFeature::Tactical);
    }

    features
}

/// Non-pawn, non-king pieces attacked by the opponent and not defended by their own side.
pub fn hanging_pieces(pos: &Chess) -> Vec<Square> {
    let board = pos.board();
    let occupied = board.occupied();

    occupied
        .into_iter()
        .filter(|&sq| {
            let Some(piece) = board.piece_at(sq) else {
                return false;
            };
            if matches!(piece.role, Role::Pawn | Role::King) {
                return false;
            }
            let attacked = board.attacks_to(sq, !piece.color, occupied).any();
            let defended = board.attacks_to(sq, piece.color, occupied).any();
            attacked && !defended
        })
        .collect()
}

/// Number of pieces of either colour currently attacked by the other side.
pub fn attacked_piece_count(pos: &Chess) -> usize {
    let board = pos.board();
    let occupied = board.occupied();

    occupied
        .into_iter()
        .filter(|&sq| {
            board
                .piece_at(sq)
                .map(|piece| board.attacks_to(sq, !piece.color, occupied).any())
                .unwrap_or(false)
        })
        .count()
}
