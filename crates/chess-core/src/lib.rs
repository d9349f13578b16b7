pub mod game_data;
pub mod opening;
pub mod pgn;
pub mod position;
