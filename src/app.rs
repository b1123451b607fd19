//! App: terminal init, main loop, remote events and key handling.

use crate::game::{GameState, LockReport, Phase, Step};
use crate::highscores::{MAX_NAME_CHARS, ScoreRecord, ScoreSubmission};
use crate::input::{Action, key_to_action, name_entry_action};
use crate::remote::{RemoteClient, RemoteEvent};
use crate::theme::Theme;
use crate::ui::{LineClearFlash, View};
use crate::{Args, GameConfig};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};

/// What the terminal shows. No game exists until a catalog has loaded.
pub enum Screen {
    Loading,
    CatalogFailed(String),
    Playing(GameState),
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    remote: RemoteClient,
    screen: Screen,
    leaderboard: Vec<ScoreRecord>,
    /// Name field on the game-over panel.
    name: String,
    /// A submission is in flight; further saves are ignored.
    submitting: bool,
    /// Blocking message; the next key press dismisses it.
    notice: Option<String>,
    flash: LineClearFlash,
    no_animation: bool,
    frame_duration: Duration,
}

impl App {
    pub fn new(args: &Args, config: GameConfig, theme: Theme, remote: RemoteClient) -> Self {
        let frame_rate = if args.frame_rate.is_finite() && args.frame_rate > 0.0 {
            args.frame_rate
        } else {
            60.0
        };
        let app = Self {
            config,
            theme,
            remote,
            screen: Screen::Loading,
            leaderboard: Vec::new(),
            name: String::new(),
            submitting: false,
            notice: None,
            flash: LineClearFlash::default(),
            no_animation: args.no_animation,
            frame_duration: Duration::from_secs_f64(1.0 / frame_rate),
        };
        app.remote.request_catalog();
        app.remote.request_leaderboard();
        app
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let frame_start = Instant::now();
            while let Some(event) = self.remote.poll() {
                self.handle_remote(event, frame_start);
            }
            self.tick(frame_start);

            let view = View {
                screen: &self.screen,
                theme: &self.theme,
                leaderboard: &self.leaderboard,
                name: &self.name,
                submitting: self.submitting,
                notice: self.notice.as_deref(),
            };
            let flash = &mut self.flash;
            terminal.draw(|f| crate::ui::draw(f, &view, flash, frame_start))?;

            let timeout = self.frame_duration.saturating_sub(frame_start.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        // Repeats keep held arrows moving; releases carry no command.
                        if key.kind == KeyEventKind::Release {
                            continue;
                        }
                        if self.handle_key(key, Instant::now()) {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    fn tick(&mut self, now: Instant) {
        let Screen::Playing(state) = &mut self.screen else {
            return;
        };
        if let Step::Locked(report) = state.tick(now) {
            self.on_lock(report);
        }
    }

    fn on_lock(&mut self, report: LockReport) {
        if report.lines > 0 && !self.no_animation {
            self.flash.trigger(&self.theme);
        }
        if report.game_over {
            self.name.clear();
        }
    }

    fn handle_remote(&mut self, event: RemoteEvent, now: Instant) {
        match event {
            RemoteEvent::CatalogLoaded(Ok(catalog)) => {
                if matches!(self.screen, Screen::Playing(_)) {
                    return;
                }
                tracing::info!(
                    count = catalog.len(),
                    pieces = %catalog.names().collect::<Vec<_>>().join(","),
                    "catalog loaded"
                );
                self.screen = Screen::Playing(GameState::new(catalog, &self.config, now));
            }
            RemoteEvent::CatalogLoaded(Err(err)) => {
                tracing::error!(%err, "could not load pieces");
                self.screen = Screen::CatalogFailed(err.to_string());
            }
            RemoteEvent::LeaderboardLoaded(Ok(rows)) => {
                tracing::debug!(entries = rows.len(), "leaderboard refreshed");
                self.leaderboard = rows;
            }
            RemoteEvent::LeaderboardLoaded(Err(err)) => {
                tracing::warn!(%err, "could not refresh leaderboard");
            }
            RemoteEvent::ScoreSubmitted(Ok(())) => {
                tracing::info!("score saved");
                self.submitting = false;
                self.name.clear();
                self.remote.request_leaderboard();
                if let Screen::Playing(state) = &mut self.screen {
                    state.reset(now);
                }
            }
            RemoteEvent::ScoreSubmitted(Err(err)) => {
                tracing::warn!(%err, "score not saved");
                self.submitting = false;
                self.notice = Some(format!("Could not save score: {err}"));
            }
        }
    }

    /// Returns true when the app should exit.
    fn handle_key(&mut self, key: KeyEvent, now: Instant) -> bool {
        if self.notice.take().is_some() {
            return false;
        }
        let action = match &self.screen {
            Screen::Playing(state) if state.is_over() => name_entry_action(key),
            _ => key_to_action(key),
        };
        self.apply(action, now)
    }

    /// Returns true when the app should exit.
    fn apply(&mut self, action: Action, now: Instant) -> bool {
        if action == Action::Quit {
            return true;
        }
        if matches!(self.screen, Screen::CatalogFailed(_)) && action == Action::Reset {
            tracing::info!("retrying catalog load");
            self.screen = Screen::Loading;
            self.remote.request_catalog();
            return false;
        }
        match &mut self.screen {
            Screen::Loading | Screen::CatalogFailed(_) => {}
            Screen::Playing(state) if state.phase == Phase::GameOver => match action {
                Action::Type(c) if self.name.chars().count() < MAX_NAME_CHARS => {
                    self.name.push(c);
                }
                Action::Erase => {
                    self.name.pop();
                }
                Action::SaveScore if !self.submitting => {
                    let p = &state.progression;
                    let submission = ScoreSubmission::new(&self.name, p.score, p.level, p.lines);
                    tracing::info!(name = %submission.name, score = submission.score, "submitting score");
                    self.submitting = true;
                    self.remote.submit_score(submission);
                }
                Action::Reset if !self.submitting => {
                    self.name.clear();
                    state.reset(now);
                }
                _ => {}
            },
            Screen::Playing(state) => {
                let report = match action {
                    Action::MoveLeft => {
                        state.move_left();
                        None
                    }
                    Action::MoveRight => {
                        state.move_right();
                        None
                    }
                    Action::SoftDrop => {
                        state.soft_drop();
                        None
                    }
                    Action::Rotate => {
                        state.rotate();
                        None
                    }
                    Action::HardDrop => state.hard_drop(now),
                    Action::Pause => {
                        state.toggle_pause(now);
                        None
                    }
                    Action::Start => {
                        state.start(now);
                        None
                    }
                    Action::Reset => {
                        state.reset(now);
                        None
                    }
                    _ => None,
                };
                if let Some(report) = report {
                    self.on_lock(report);
                }
            }
        }
        false
    }
}
