//! Synthetic pointer input for replaying suggested moves.

use std::thread;
use std::time::Duration;

use rdev::{simulate, Button, EventType};

use crate::analysis::PlannedMove;
use crate::capture::Region;
use crate::error::{Error, Result};

/// Screen-space point used for pointer gestures
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Compute the screen-space drag for a suggested swap.
///
/// The board is assumed to fill the capture region; cell size follows the
/// smaller region dimension divided by the larger grid dimension, so
/// non-square regions still land on cell centers. Moves that start or end
/// outside the configured grid are rejected, they come from the model and
/// cannot be trusted.
pub fn drag_for_move(
    region: Region,
    rows: u32,
    cols: u32,
    mv: &PlannedMove,
) -> Result<(Point, Point)> {
    region.validate()?;
    if rows == 0 || cols == 0 {
        return Err(Error::Config("board geometry must be at least 1x1".into()));
    }

    let cell = region.width().min(region.height()) / cols.max(rows);
    if cell == 0 {
        return Err(Error::Config(format!(
            "region {} is too small for a {}x{} board",
            region, rows, cols
        )));
    }

    let [row, col] = mv.start_pos;
    if row >= rows || col >= cols {
        return Err(Error::BadResponse {
            reason: format!(
                "move starts at ({}, {}) outside the {}x{} board",
                row, col, rows, cols
            ),
        });
    }

    let (dx, dy) = mv.direction.delta();
    let target_col = i64::from(col) + i64::from(dx);
    let target_row = i64::from(row) + i64::from(dy);
    if target_col < 0
        || target_row < 0
        || target_col >= i64::from(cols)
        || target_row >= i64::from(rows)
    {
        return Err(Error::BadResponse {
            reason: format!(
                "move {:?} from ({}, {}) leaves the board",
                mv.direction, row, col
            ),
        });
    }

    let cell = f64::from(cell);
    let start = Point {
        x: f64::from(region.left) + (f64::from(col) + 0.5) * cell,
        y: f64::from(region.top) + (f64::from(row) + 0.5) * cell,
    };
    let end = Point {
        x: start.x + f64::from(dx) * cell,
        y: start.y + f64::from(dy) * cell,
    };
    Ok((start, end))
}

/// Performs pointer gestures; the system driver is swapped out in tests
pub trait PointerDriver {
    fn drag(&mut self, from: Point, to: Point, duration: Duration) -> Result<()>;
}

/// Pointer driver backed by OS-level event injection
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPointer;

/// Intermediate move events per drag; enough for games that track the
/// pointer path rather than teleporting the tile.
const DRAG_STEPS: u32 = 20;

impl SystemPointer {
    pub fn new() -> Self {
        Self
    }

    fn emit(event: &EventType) -> Result<()> {
        simulate(event).map_err(|e| Error::Input(format!("could not simulate {:?}: {:?}", event, e)))
    }
}

impl PointerDriver for SystemPointer {
    fn drag(&mut self, from: Point, to: Point, duration: Duration) -> Result<()> {
        Self::emit(&EventType::MouseMove {
            x: from.x,
            y: from.y,
        })?;
        Self::emit(&EventType::ButtonPress(Button::Left))?;

        let step = duration / DRAG_STEPS;
        for i in 1..=DRAG_STEPS {
            let t = f64::from(i) / f64::from(DRAG_STEPS);
            Self::emit(&EventType::MouseMove {
                x: from.x + (to.x - from.x) * t,
                y: from.y + (to.y - from.y) * t,
            })?;
            thread::sleep(step);
        }

        Self::emit(&EventType::ButtonRelease(Button::Left))
    }
}
