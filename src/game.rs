//! Game state: board, active piece, lookahead, progression, gravity and phases.

use crate::board::{Board, collides};
use crate::catalog::Catalog;
use crate::piece::{ActivePiece, Piece};
use crate::progression::Progression;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    Paused,
    GameOver,
}

/// What happened when a piece was committed to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockReport {
    pub lines: u32,
    pub points: u32,
    /// The replacement piece had no room to spawn.
    pub game_over: bool,
}

/// Outcome of one loop tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Idle,
    Fell,
    Locked(LockReport),
}

/// A freshly placed active piece and the lookahead drawn behind it.
#[derive(Debug, Clone)]
pub struct Spawned {
    pub active: ActivePiece,
    pub next: Piece,
    pub blocked: bool,
}

/// Column where a shape of `shape_width` starts when centred on the board.
pub fn spawn_column(board_width: usize, shape_width: usize) -> i32 {
    (board_width / 2) as i32 - (shape_width / 2) as i32
}

/// Promote the lookahead (or draw fresh when there is none), centre it on row 0
/// and draw the next lookahead. `blocked` means the spawn position is taken.
pub fn spawn<R: Rng + ?Sized>(
    board: &Board,
    catalog: &Catalog,
    lookahead: Option<Piece>,
    rng: &mut R,
) -> Spawned {
    let piece = lookahead.unwrap_or_else(|| catalog.pick_random(rng));
    let next = catalog.pick_random(rng);
    let active = ActivePiece {
        x: spawn_column(board.width(), piece.shape.width()),
        y: 0,
        piece,
    };
    let blocked = collides(board, &active);
    Spawned {
        active,
        next,
        blocked,
    }
}

/// Game state: playfield, current piece, next piece, score, level, phase.
#[derive(Debug)]
pub struct GameState {
    pub board: Board,
    pub active: ActivePiece,
    pub next: Option<Piece>,
    pub progression: Progression,
    pub phase: Phase,
    catalog: Catalog,
    rng: StdRng,
    /// Baseline for the gravity timer.
    last_drop: Instant,
}

impl GameState {
    pub fn new(catalog: Catalog, config: &crate::GameConfig, now: Instant) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let board = Board::new(usize::from(config.width), usize::from(config.height));
        let spawned = spawn(&board, &catalog, None, &mut rng);
        let phase = if spawned.blocked {
            Phase::GameOver
        } else if config.autostart {
            Phase::Running
        } else {
            Phase::Paused
        };
        Self {
            board,
            active: spawned.active,
            next: Some(spawned.next),
            progression: Progression::new(),
            phase,
            catalog,
            rng,
            last_drop: now,
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    #[inline]
    pub fn is_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    /// Shift the active piece if the target is free. Returns whether it moved.
    pub fn try_move(&mut self, dx: i32, dy: i32) -> bool {
        let candidate = self.active.shifted(dx, dy);
        if collides(&self.board, &candidate) {
            return false;
        }
        self.active = candidate;
        true
    }

    pub fn move_left(&mut self) -> bool {
        self.is_running() && self.try_move(-1, 0)
    }

    pub fn move_right(&mut self) -> bool {
        self.is_running() && self.try_move(1, 0)
    }

    /// One row down. Never locks; gravity handles landing.
    pub fn soft_drop(&mut self) -> bool {
        self.is_running() && self.try_move(0, 1)
    }

    /// Clockwise in place. No kicks: if the turned shape does not fit at the
    /// current anchor, the old orientation stays.
    pub fn rotate(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        let candidate = self.active.rotated_cw();
        if collides(&self.board, &candidate) {
            return false;
        }
        self.active = candidate;
        true
    }

    /// Drop until blocked, then lock, clear and respawn without waiting for gravity.
    pub fn hard_drop(&mut self, now: Instant) -> Option<LockReport> {
        if !self.is_running() {
            return None;
        }
        while self.try_move(0, 1) {}
        Some(self.lock_and_respawn(now))
    }

    /// Advance the gravity timer. At most one row of descent per call.
    pub fn tick(&mut self, now: Instant) -> Step {
        if !self.is_running() {
            return Step::Idle;
        }
        let elapsed = now.saturating_duration_since(self.last_drop);
        if elapsed <= self.progression.drop_interval {
            return Step::Idle;
        }
        if self.try_move(0, 1) {
            self.last_drop = now;
            return Step::Fell;
        }
        Step::Locked(self.lock_and_respawn(now))
    }

    fn lock_and_respawn(&mut self, now: Instant) -> LockReport {
        self.board.lock(&self.active);
        let lines = self.board.clear_full_rows();
        let points = self.progression.record_clear(lines);
        if lines > 0 {
            tracing::debug!(
                lines,
                points,
                level = self.progression.level,
                "rows cleared"
            );
        }
        self.spawn_next();
        self.last_drop = now;
        LockReport {
            lines,
            points,
            game_over: self.is_over(),
        }
    }

    fn spawn_next(&mut self) {
        let lookahead = self.next.take();
        let spawned = spawn(&self.board, &self.catalog, lookahead, &mut self.rng);
        self.active = spawned.active;
        self.next = Some(spawned.next);
        if spawned.blocked {
            self.phase = Phase::GameOver;
            tracing::info!(
                score = self.progression.score,
                level = self.progression.level,
                lines = self.progression.lines,
                filled = self.board.filled_count(),
                "game over"
            );
        }
    }

    /// Running ↔ Paused. Resuming restarts the gravity timer.
    pub fn toggle_pause(&mut self, now: Instant) {
        match self.phase {
            Phase::Running => self.phase = Phase::Paused,
            Phase::Paused => {
                self.phase = Phase::Running;
                self.last_drop = now;
            }
            Phase::GameOver => {}
        }
    }

    /// Start (or resume) play; a finished game is reset first.
    pub fn start(&mut self, now: Instant) {
        match self.phase {
            Phase::GameOver => self.reset(now),
            Phase::Paused => {
                self.phase = Phase::Running;
                self.last_drop = now;
            }
            Phase::Running => {}
        }
    }

    /// Fresh board, piece and counters. The pending lookahead carries over.
    pub fn reset(&mut self, now: Instant) {
        self.board = Board::new(self.board.width(), self.board.height());
        self.progression = Progression::new();
        self.phase = Phase::Running;
        self.spawn_next();
        self.last_drop = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Cell, board_from_rows};
    use crate::piece::ColorId;
    use std::time::Duration;

    const O_ONLY: &str = r##"{"O": {"shape": [[1,1],[1,1]], "color": "#f0f000"}}"##;
    const I_ONLY: &str = r##"{"I": {"shape": [[1,1,1,1]], "color": "#00f0f0"}}"##;

    fn config(width: u16, height: u16) -> crate::GameConfig {
        crate::GameConfig {
            width,
            height,
            seed: Some(42),
            autostart: true,
        }
    }

    fn game(catalog: &str, width: u16, height: u16, now: Instant) -> GameState {
        GameState::new(Catalog::from_json(catalog).unwrap(), &config(width, height), now)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_spawn_is_centred_on_row_zero() {
        assert_eq!(spawn_column(10, 4), 3);
        assert_eq!(spawn_column(10, 3), 4);
        assert_eq!(spawn_column(10, 2), 4);
        let g = game(I_ONLY, 10, 20, Instant::now());
        assert_eq!((g.active.x, g.active.y), (3, 0));
    }

    #[test]
    fn test_starts_paused_without_autostart() {
        let mut cfg = config(10, 20);
        cfg.autostart = false;
        let now = Instant::now();
        let mut g = GameState::new(Catalog::builtin(), &cfg, now);
        assert_eq!(g.phase, Phase::Paused);
        assert!(!g.move_left());
        assert_eq!(g.tick(now + ms(5000)), Step::Idle);
        g.start(now);
        assert_eq!(g.phase, Phase::Running);
    }

    #[test]
    fn test_lookahead_becomes_active_on_next_spawn() {
        let now = Instant::now();
        let mut g = GameState::new(Catalog::builtin(), &config(10, 20), now);
        for _ in 0..5 {
            let upcoming = g.next.clone().unwrap();
            g.hard_drop(now).unwrap();
            assert_eq!(g.active.piece, upcoming);
            assert!(g.next.is_some());
        }
    }

    #[test]
    fn test_move_into_left_wall_is_rejected() {
        let mut g = game(O_ONLY, 10, 20, Instant::now());
        while g.move_left() {}
        assert_eq!(g.active.x, 0);
        let before = g.active.clone();
        assert!(!g.move_left());
        assert!(!g.try_move(-1, 0));
        assert_eq!(g.active, before);
    }

    #[test]
    fn test_rotation_without_room_keeps_orientation() {
        let mut g = game(I_ONLY, 10, 20, Instant::now());
        assert!(g.rotate());
        assert_eq!((g.active.piece.shape.width(), g.active.piece.shape.height()), (1, 4));
        while g.move_right() {}
        assert_eq!(g.active.x, 9);
        let before = g.active.clone();
        // horizontal I would poke three columns past the wall; no kick
        assert!(!g.rotate());
        assert_eq!(g.active, before);
    }

    #[test]
    fn test_gravity_waits_for_interval() {
        let t0 = Instant::now();
        let mut g = game(O_ONLY, 10, 20, t0);
        assert_eq!(g.tick(t0 + ms(1000)), Step::Idle);
        assert_eq!(g.tick(t0 + ms(1001)), Step::Fell);
        assert_eq!(g.active.y, 1);
        // baseline moved to the last fall
        assert_eq!(g.tick(t0 + ms(1500)), Step::Idle);
        assert_eq!(g.tick(t0 + ms(2002)), Step::Fell);
        assert_eq!(g.active.y, 2);
    }

    #[test]
    fn test_landing_locks_and_respawns() {
        let t0 = Instant::now();
        let mut g = game(O_ONLY, 4, 4, t0);
        assert_eq!(g.active.x, 1);
        let mut t = t0;
        let mut steps = Vec::new();
        for _ in 0..3 {
            t += ms(1001);
            steps.push(g.tick(t));
        }
        assert_eq!(
            steps,
            [
                Step::Fell,
                Step::Fell,
                Step::Locked(LockReport {
                    lines: 0,
                    points: 0,
                    game_over: false
                })
            ]
        );
        assert_eq!(g.board.filled_count(), 4);
        assert_eq!(
            g.board.get(1, 3),
            Some(&Cell::Filled(ColorId::new("#f0f000")))
        );
        assert_eq!((g.active.x, g.active.y), (1, 0));
    }

    #[test]
    fn test_soft_drop_never_locks() {
        let mut g = game(O_ONLY, 4, 4, Instant::now());
        while g.soft_drop() {}
        assert_eq!(g.active.y, 2);
        assert!(!g.soft_drop());
        assert_eq!(g.board.filled_count(), 0);
    }

    #[test]
    fn test_hard_drop_clears_and_scores() {
        let now = Instant::now();
        let mut g = game(O_ONLY, 4, 4, now);
        g.board = board_from_rows(&["....", "....", "a..a", "b..b"]);
        let report = g.hard_drop(now).unwrap();
        assert_eq!(
            report,
            LockReport {
                lines: 2,
                points: 100,
                game_over: false
            }
        );
        assert_eq!(g.board.filled_count(), 0);
        assert_eq!(g.progression.score, 100);
        assert_eq!(g.progression.lines, 2);
        assert_eq!(g.active.y, 0);
    }

    #[test]
    fn test_blocked_spawn_ends_game_without_touching_board() {
        let now = Instant::now();
        let mut g = game(O_ONLY, 4, 4, now);
        g.board = board_from_rows(&[".x..", "....", "....", "...."]);
        let before = g.board.clone();
        g.spawn_next();
        assert_eq!(g.phase, Phase::GameOver);
        assert_eq!(g.board, before);
        // the blocked piece is still there to be painted
        assert_eq!((g.active.x, g.active.y), (1, 0));
    }

    #[test]
    fn test_stacking_to_the_top_ends_game() {
        let now = Instant::now();
        let mut g = game(O_ONLY, 4, 4, now);
        assert!(!g.hard_drop(now).unwrap().game_over);
        let report = g.hard_drop(now).unwrap();
        assert!(report.game_over);
        assert!(g.is_over());
        assert_eq!(g.board.filled_count(), 8);

        // frozen: no gravity, no input
        assert_eq!(g.tick(now + ms(10_000)), Step::Idle);
        assert!(!g.move_left());
        assert!(g.hard_drop(now).is_none());
        g.toggle_pause(now);
        assert_eq!(g.phase, Phase::GameOver);
    }

    #[test]
    fn test_start_after_game_over_resets() {
        let now = Instant::now();
        let mut g = game(O_ONLY, 4, 4, now);
        g.board = board_from_rows(&["....", "....", "a..a", "b..b"]);
        g.hard_drop(now);
        g.hard_drop(now);
        g.hard_drop(now);
        assert!(g.is_over());
        assert!(g.progression.score > 0);

        g.start(now);
        assert_eq!(g.phase, Phase::Running);
        assert_eq!(g.board.filled_count(), 0);
        assert_eq!(g.progression, Progression::new());
        assert_eq!(g.active.y, 0);
    }

    #[test]
    fn test_pause_suspends_gravity_and_input() {
        let t0 = Instant::now();
        let mut g = game(O_ONLY, 10, 20, t0);
        g.toggle_pause(t0);
        assert_eq!(g.phase, Phase::Paused);
        assert_eq!(g.tick(t0 + ms(5000)), Step::Idle);
        assert!(!g.move_right());
        assert!(!g.rotate());
        assert_eq!(g.active.y, 0);

        // resuming does not bank the paused time
        let t1 = t0 + ms(5000);
        g.toggle_pause(t1);
        assert_eq!(g.tick(t1 + ms(10)), Step::Idle);
        assert_eq!(g.tick(t1 + ms(1001)), Step::Fell);
    }

    #[test]
    fn test_level_up_speeds_gravity() {
        let now = Instant::now();
        let mut g = game(I_ONLY, 4, 6, now);
        for _ in 0..10 {
            g.board = board_from_rows(&["....", "....", "....", "....", "....", "...."]);
            let r = g.hard_drop(now).unwrap();
            assert_eq!(r.lines, 1);
        }
        assert_eq!(g.progression.level, 2);
        assert_eq!(g.progression.drop_interval, ms(900));
        // 9 clears at level 1, the tenth too: level updates after scoring
        assert_eq!(g.progression.score, 40 * 10);
    }
}
