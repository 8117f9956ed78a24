//! Typed model of the analysis reply.

use serde::{Deserialize, Serialize};

/// Direction of a tile swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Up,
    Down,
    Left,
    Right,
}

impl MoveDirection {
    /// Unit offset in (col, row) board coordinates
    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }
}

/// Current level objective as reported by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Objective {
    /// What needs to be collected or cleared
    #[serde(rename = "type")]
    pub kind: String,
    pub target: u32,
    pub current: u32,
}

/// A follow-up the suggested swap sets up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUp {
    pub setup: String,
    /// [row, col]
    pub position: [u32; 2],
    #[serde(default)]
    pub special_tile: Option<String>,
}

/// The swap the model recommends playing now
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedMove {
    /// [row, col] of the tile to pick up
    pub start_pos: [u32; 2],
    pub direction: MoveDirection,
    #[serde(default)]
    pub immediate_outcome: String,
    #[serde(default)]
    pub cascade_potential: String,
    #[serde(default)]
    pub next_moves: Vec<FollowUp>,
}

/// A special tile already on the board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialTile {
    /// striped / wrapped / color_bomb
    #[serde(rename = "type")]
    pub kind: String,
    /// [row, col]
    pub position: [u32; 2],
    #[serde(default)]
    pub potential_combinations: String,
}

/// Full board analysis returned by the vision model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardAnalysis {
    pub moves_left: i32,
    pub current_objectives: Objective,
    pub best_move: PlannedMove,
    #[serde(default)]
    pub special_tiles: Vec<SpecialTile>,
}

/// Slice the first JSON object out of a free-text model reply.
///
/// Models often wrap the requested JSON in prose or code fences; the
/// object is taken as everything between the first `{` and the last `}`.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}
