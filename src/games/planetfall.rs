// Planetfall: http://ifdb.tads.org/viewgame?id=xe6kb3cuqwie2q38

use crate::adapter::{GameAdapter, ScoreLocation};
use crate::error::Result;

pub const SELF_OBJECT: u16 = 236;
pub const MOVES_ADDR: usize = 10473;
pub const SCORE_ADDR: usize = 10026;
pub const MAX_SCORE: i32 = 80;
pub const NUM_WORLD_OBJS: u16 = 252;

pub const VICTORY_MARKER: &str = "****  You have won  ****";
pub const GAME_OVER_MARKER: &str = "****  You have died  ****";

/// The status line and the echoed prompt are chrome
fn is_banner(line: &str) -> bool {
    line.starts_with('>') || line.contains("Score:")
}

pub fn adapter() -> Result<GameAdapter> {
    GameAdapter::builder("planetfall")
        .banner(is_banner)
        .victory_marker(VICTORY_MARKER)
        .game_over_marker(GAME_OVER_MARKER)
        .self_object(SELF_OBJECT)
        .moves_addr(MOVES_ADDR)
        .score(ScoreLocation::Byte(SCORE_ADDR), MAX_SCORE)
        .num_world_objs(NUM_WORLD_OBJS)
        .build()
}
