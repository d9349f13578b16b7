use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameMetadata {
    pub white: String,
    pub black: String,
    pub result: String, // "1-0", "0-1", "1/2-1/2", "*"
    pub date: Option<String>,
    pub event: Option<String>,
    pub eco: Option<String>,
    pub white_elo: Option<u32>,
    pub black_elo: Option<u32>,
}

impl Default for GameMetadata {
    fn default() -> Self {
        Self {
            white: "Unknown".to_string(),
            black: "Unknown".to_string(),
            result: "*".to_string(),
            date: None,
            event: None,
            eco: None,
            white_elo: None,
            black_elo: None,
        }
    }
}

/// A position reached while replaying a game. Ply 0 is the start position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayedPosition {
    pub fen: String,
    pub ply: usize,
    /// Move that produced this position (UCI), `None` for the start position
    pub move_uci: Option<String>,
    pub move_san: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
    pub metadata: GameMetadata,
    /// Start position followed by the position after every move
    pub positions: Vec<PlayedPosition>,
    pub moves_uci: Vec<String>, // UCI notation
    pub moves_san: Vec<String>, // SAN notation, no check suffixes
    pub pgn: String,
}

impl GameRecord {
    pub fn start_fen(&self) -> &str {
        &self.positions[0].fen
    }

    pub fn move_count(&self) -> usize {
        self.moves_uci.len()
    }

    /// Position for the n-th lesson step, clamped to the last known position.
    pub fn position_for_step(&self, step: usize) -> &PlayedPosition {
        let idx = step.min(self.positions.len() - 1);
        &self.positions[idx]
    }
}
