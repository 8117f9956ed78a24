//! The play loop: capture, analyze, act.

use std::time::Duration;

use crate::analysis::{BoardAnalysis, MoveAnalyzer};
use crate::cancel::{sleep_unless_cancelled, CancelToken};
use crate::capture::{CaptureLoop, FrameSource, Region};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::input::{drag_for_move, PointerDriver};
use crate::retention::RetentionSweeper;

/// Consecutive failed rounds (capture or analysis) tolerated before the
/// session gives up.
const MAX_CONSECUTIVE_FAILURES: u32 = 5;

/// Outcome of a finished play session
#[derive(Debug, Clone, Copy, Default)]
pub struct BotOutcome {
    /// Capture-analyze-act rounds attempted
    pub rounds: u64,
    /// Moves replayed onto the screen
    pub moves_played: u64,
    /// Rounds lost to a failed capture or analysis
    pub failed_rounds: u64,
    /// True when the model reported the level finished
    pub finished: bool,
}

/// Plays rounds of capture, analysis, and synthetic input until the level
/// finishes or the token fires.
///
/// Every frame is persisted with the capture naming scheme, so the
/// retention sweeper (which runs for the whole session) ages play frames
/// exactly like plain captures.
pub struct GameBot<S, A, P> {
    config: Config,
    source: S,
    analyzer: A,
    pointer: P,
}

impl<S: FrameSource, A: MoveAnalyzer, P: PointerDriver> GameBot<S, A, P> {
    pub fn new(config: Config, source: S, analyzer: A, pointer: P) -> Self {
        Self {
            config,
            source,
            analyzer,
            pointer,
        }
    }

    /// Run the session. The sweeper is stopped (joined) on every exit
    /// path, the same guarantee the capture manager gives.
    pub fn run(&mut self, token: &CancelToken) -> Result<BotOutcome> {
        let region = self.config.region.ok_or(Error::RegionUnset)?;
        let capture = CaptureLoop::new(&self.config)?;

        let sweeper = RetentionSweeper::new(&self.config).spawn();
        let result = self.play_rounds(&capture, region, token);
        sweeper.stop();

        result
    }

    fn play_rounds(
        &mut self,
        capture: &CaptureLoop,
        region: Region,
        token: &CancelToken,
    ) -> Result<BotOutcome> {
        std::fs::create_dir_all(&self.config.save_dir)?;

        let settle = Duration::from_millis(self.config.analysis.settle_ms);
        let drag_time = Duration::from_millis(self.config.analysis.drag_ms);
        let mut outcome = BotOutcome::default();
        let mut consecutive_failures = 0u32;

        while !token.is_cancelled() {
            outcome.rounds += 1;

            let analysis = match self.observe(capture) {
                Ok(analysis) => {
                    consecutive_failures = 0;
                    analysis
                }
                Err(e) if e.is_transient() || matches!(e, Error::Http(_) | Error::BadResponse { .. }) => {
                    consecutive_failures += 1;
                    outcome.failed_rounds += 1;
                    tracing::warn!(
                        "Round failed ({} in a row): {}",
                        consecutive_failures,
                        e
                    );
                    if consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                        return Err(e);
                    }
                    sleep_unless_cancelled(settle, token);
                    continue;
                }
                Err(e) => return Err(e),
            };

            log_analysis(&analysis);

            if analysis.moves_left <= 0 {
                tracing::info!("No moves left, session finished");
                outcome.finished = true;
                break;
            }

            match drag_for_move(
                region,
                self.config.board_rows,
                self.config.board_cols,
                &analysis.best_move,
            ) {
                Ok((from, to)) => {
                    self.pointer.drag(from, to, drag_time)?;
                    outcome.moves_played += 1;
                }
                Err(e) => {
                    outcome.failed_rounds += 1;
                    tracing::warn!("Skipping unplayable move: {}", e);
                }
            }

            // Let the board animate before the next look.
            sleep_unless_cancelled(settle, token);
        }

        Ok(outcome)
    }

    /// Grab and persist one frame, then analyze it
    fn observe(&mut self, capture: &CaptureLoop) -> Result<BoardAnalysis> {
        let frame_path = capture.tick(&mut self.source)?;
        let png = std::fs::read(&frame_path)?;
        self.analyzer.analyze(&png)
    }
}

fn log_analysis(analysis: &BoardAnalysis) {
    tracing::info!(
        "Moves left: {}, objective: {} ({}/{})",
        analysis.moves_left,
        analysis.current_objectives.kind,
        analysis.current_objectives.current,
        analysis.current_objectives.target
    );
    let mv = &analysis.best_move;
    tracing::info!(
        "Best move: ({}, {}) {:?} - {}",
        mv.start_pos[0],
        mv.start_pos[1],
        mv.direction,
        mv.immediate_outcome
    );
    for special in &analysis.special_tiles {
        tracing::debug!(
            "Special tile {} at ({}, {})",
            special.kind,
            special.position[0],
            special.position[1]
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{MoveDirection, Objective, PlannedMove};
    use crate::capture::CapturedFrame;
    use crate::input::Point;
    use chrono::Local;
    use std::cell::RefCell;
    use tempfile::TempDir;

    struct SolidSource;

    impl FrameSource for SolidSource {
        fn grab(&mut self, region: Region) -> Result<CapturedFrame> {
            Ok(CapturedFrame {
                png_bytes: vec![7u8; 16],
                width: region.width(),
                height: region.height(),
                taken_at: Local::now(),
            })
        }
    }

    struct ScriptedAnalyzer {
        replies: RefCell<Vec<Result<BoardAnalysis>>>,
    }

    impl ScriptedAnalyzer {
        fn new(replies: Vec<Result<BoardAnalysis>>) -> Self {
            Self {
                replies: RefCell::new(replies),
            }
        }
    }

    impl MoveAnalyzer for ScriptedAnalyzer {
        fn analyze(&self, _png_bytes: &[u8]) -> Result<BoardAnalysis> {
            let mut replies = self.replies.borrow_mut();
            assert!(!replies.is_empty(), "analyzer called more than scripted");
            replies.remove(0)
        }
    }

    #[derive(Default)]
    struct RecordingPointer {
        drags: Vec<(Point, Point)>,
    }

    impl PointerDriver for RecordingPointer {
        fn drag(&mut self, from: Point, to: Point, _duration: Duration) -> Result<()> {
            self.drags.push((from, to));
            Ok(())
        }
    }

    fn analysis(moves_left: i32, row: u32, col: u32, direction: MoveDirection) -> BoardAnalysis {
        BoardAnalysis {
            moves_left,
            current_objectives: Objective {
                kind: "clear tiles".into(),
                target: 10,
                current: 4,
            },
            best_move: PlannedMove {
                start_pos: [row, col],
                direction,
                immediate_outcome: String::new(),
                cascade_potential: String::new(),
                next_moves: Vec::new(),
            },
            special_tiles: Vec::new(),
        }
    }

    fn fast_config(save_dir: &std::path::Path) -> Config {
        let mut config = Config {
            save_dir: save_dir.to_path_buf(),
            region: Some(Region::new(0, 0, 900, 900)),
            ..Default::default()
        };
        config.analysis.settle_ms = 0;
        config.analysis.drag_ms = 0;
        config
    }

    #[test]
    fn plays_until_no_moves_left() {
        let temp = TempDir::new().unwrap();
        let analyzer = ScriptedAnalyzer::new(vec![
            Ok(analysis(5, 2, 3, MoveDirection::Right)),
            Ok(analysis(0, 0, 0, MoveDirection::Down)),
        ]);
        let mut bot = GameBot::new(
            fast_config(temp.path()),
            SolidSource,
            analyzer,
            RecordingPointer::default(),
        );

        let outcome = bot.run(&CancelToken::new()).unwrap();
        assert!(outcome.finished);
        assert_eq!(outcome.rounds, 2);
        assert_eq!(outcome.moves_played, 1);
        assert_eq!(bot.pointer.drags.len(), 1);
    }

    #[test]
    fn analysis_failure_skips_the_round() {
        let temp = TempDir::new().unwrap();
        let analyzer = ScriptedAnalyzer::new(vec![
            Err(Error::BadResponse {
                reason: "garbled".into(),
            }),
            Ok(analysis(0, 0, 0, MoveDirection::Down)),
        ]);
        let mut bot = GameBot::new(
            fast_config(temp.path()),
            SolidSource,
            analyzer,
            RecordingPointer::default(),
        );

        let outcome = bot.run(&CancelToken::new()).unwrap();
        assert!(outcome.finished);
        assert_eq!(outcome.failed_rounds, 1);
        assert_eq!(outcome.moves_played, 0);
    }

    #[test]
    fn unplayable_move_is_skipped_without_input() {
        let temp = TempDir::new().unwrap();
        let analyzer = ScriptedAnalyzer::new(vec![
            // Up from the top row would leave the board.
            Ok(analysis(3, 0, 0, MoveDirection::Up)),
            Ok(analysis(0, 0, 0, MoveDirection::Down)),
        ]);
        let mut bot = GameBot::new(
            fast_config(temp.path()),
            SolidSource,
            analyzer,
            RecordingPointer::default(),
        );

        let outcome = bot.run(&CancelToken::new()).unwrap();
        assert!(outcome.finished);
        assert_eq!(outcome.moves_played, 0);
        assert!(bot.pointer.drags.is_empty());
    }

    #[test]
    fn cancelled_token_stops_before_the_first_round() {
        let temp = TempDir::new().unwrap();
        let analyzer = ScriptedAnalyzer::new(vec![]);
        let mut bot = GameBot::new(
            fast_config(temp.path()),
            SolidSource,
            analyzer,
            RecordingPointer::default(),
        );

        let token = CancelToken::new();
        token.cancel();
        let outcome = bot.run(&token).unwrap();
        assert_eq!(outcome.rounds, 0);
        assert!(!outcome.finished);
    }

    #[test]
    fn region_is_required_before_anything_runs() {
        let temp = TempDir::new().unwrap();
        let mut config = fast_config(temp.path());
        config.region = None;
        let mut bot = GameBot::new(
            config,
            SolidSource,
            ScriptedAnalyzer::new(vec![]),
            RecordingPointer::default(),
        );

        assert!(matches!(
            bot.run(&CancelToken::new()),
            Err(Error::RegionUnset)
        ));
    }
}
