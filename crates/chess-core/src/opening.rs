//! Opening identification from the first moves of a game.
//!
//! A small fixed table of named lines matched by exact SAN prefix, then a
//! first-move fallback, then a catch-all. Not an ECO database.

use serde::{Deserialize, Serialize};

use crate::pgn::parse_pgn;

/// Plies taken from a game when identifying its opening
pub const OPENING_PLIES: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningInfo {
    pub eco: String,
    pub name: String,
    pub variation: String,
    pub typical_plans: Vec<String>,
}

struct OpeningLine {
    moves: &'static [&'static str],
    eco: &'static str,
    name: &'static str,
    plans: &'static [&'static str],
}

// Longer lines first so the most specific prefix wins
const NAMED_LINES: &[OpeningLine] = &[
    OpeningLine {
        moves: &["e4", "e5", "Nf3", "Nc6", "Bc4"],
        eco: "C50",
        name: "Italian Game",
        plans: &[
            "Control center with d4",
            "Develop pieces quickly",
            "Castle kingside",
            "Attack on f7",
        ],
    },
    OpeningLine {
        moves: &["e4", "e5", "Nf3", "Nc6", "Bb5"],
        eco: "C60",
        name: "Ruy Lopez",
        plans: &[
            "Pressure the e5 pawn through the c6 knight",
            "Prepare d4 with c3",
            "Keep the light-squared bishop on the a4-e8 diagonal",
        ],
    },
    OpeningLine {
        moves: &["d4", "d5", "c4"],
        eco: "D06",
        name: "Queen's Gambit",
        plans: &[
            "Challenge black's center",
            "Develop pieces to natural squares",
            "Fight for central control",
        ],
    },
    OpeningLine {
        moves: &["e4", "c5"],
        eco: "B20",
        name: "Sicilian Defense",
        plans: &[
            "Fight for the d4 square",
            "Create pawn asymmetry",
            "Black plays for counterplay on the queenside",
        ],
    },
    OpeningLine {
        moves: &["e4", "e6"],
        eco: "C00",
        name: "French Defense",
        plans: &[
            "Build a pawn chain",
            "Black breaks with c5",
            "White plays for a space advantage",
        ],
    },
    OpeningLine {
        moves: &["e4", "c6"],
        eco: "B10",
        name: "Caro-Kann Defense",
        plans: &[
            "Support d5 with the c-pawn",
            "Develop the light-squared bishop before e6",
            "Aim for a sound pawn structure",
        ],
    },
];

impl OpeningInfo {
    fn new(eco: &str, name: &str, plans: &[&str]) -> Self {
        Self {
            eco: eco.to_string(),
            name: name.to_string(),
            variation: String::new(),
            typical_plans: plans.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Result used when a game cannot be read at all.
    pub fn unknown() -> Self {
        Self {
            eco: "Unknown".to_string(),
            name: "Unknown Opening".to_string(),
            variation: String::new(),
            typical_plans: Vec::new(),
        }
    }
}

/// Identify an opening from SAN moves (suffix-free, as produced by replay).
pub fn identify_opening<S: AsRef<str>>(moves: &[S]) -> OpeningInfo {
    let moves: Vec<&str> = moves.iter().map(|m| m.as_ref()).collect();

    let Some(first) = moves.first() else {
        return OpeningInfo::new("A00", "Start Position", &["Develop pieces", "Control center"]);
    };

    if let Some(line) = NAMED_LINES.iter().find(|line| moves.starts_with(line.moves)) {
        return OpeningInfo::new(line.eco, line.name, line.plans);
    }

    match *first {
        "e4" => OpeningInfo::new(
            "B00",
            "King's Pawn Opening",
            &["Control center", "Develop pieces", "Castle"],
        ),
        "d4" => OpeningInfo::new(
            "A40",
            "Queen's Pawn Opening",
            &["Control center", "Develop pieces", "Build solid structure"],
        ),
        "Nf3" | "c4" => OpeningInfo::new(
            "A00",
            "Flank Opening",
            &["Flexible piece development", "Control from distance"],
        ),
        _ => OpeningInfo::new("A00", "Uncommon Opening", &["Develop pieces", "Control center"]),
    }
}

/// Identify the opening of a PGN from its first [`OPENING_PLIES`] moves.
pub fn classify_pgn(pgn: &str) -> OpeningInfo {
    match parse_pgn(pgn) {
        Ok(game) => {
            let prefix = &game.moves_san[..game.moves_san.len().min(OPENING_PLIES)];
            identify_opening(prefix)
        }
        Err(_) => OpeningInfo::unknown(),
    }
}
