//! Layout and drawing: playfield, next preview, stats, leaderboard, overlays.

use crate::app::Screen;
use crate::board::Cell;
use crate::game::{GameState, Phase};
use crate::highscores::ScoreRecord;
use crate::piece::Piece;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap};
use std::time::Instant;
use tachyonfx::{Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx};

/// Each board cell is two terminal columns wide so cells look square.
const CELL_WIDTH: u16 = 2;
const SIDEBAR_WIDTH: u16 = 26;
/// Next + stats + a ten-row leaderboard.
const SIDEBAR_MIN_HEIGHT: u16 = 26;
const LINE_CLEAR_FADE_MS: u32 = 350;

const FILLED: &str = "██";
const EMPTY: &str = " ·";

/// Everything a frame needs besides the terminal.
pub struct View<'a> {
    pub screen: &'a Screen,
    pub theme: &'a Theme,
    pub leaderboard: &'a [ScoreRecord],
    /// Name typed on the game-over panel.
    pub name: &'a str,
    pub submitting: bool,
    pub notice: Option<&'a str>,
}

/// Board flash after rows clear (TachyonFX fade from the title colour back to the board).
#[derive(Default)]
pub struct LineClearFlash {
    effect: Option<Effect>,
    last_frame: Option<Instant>,
}

impl LineClearFlash {
    pub fn trigger(&mut self, theme: &Theme) {
        self.effect = Some(fx::fade_from(
            theme.title,
            theme.bg,
            (LINE_CLEAR_FADE_MS, Interpolation::Linear),
        ));
        self.last_frame = None;
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, now: Instant) {
        let Some(effect) = self.effect.as_mut() else {
            return;
        };
        let delta = self
            .last_frame
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or(std::time::Duration::ZERO);
        let delta_ms = u32::try_from(delta.as_millis()).unwrap_or(u32::MAX);
        self.last_frame = Some(now);
        frame.render_effect(effect, area, TfxDuration::from_millis(delta_ms));
        if effect.done() {
            self.effect = None;
            self.last_frame = None;
        }
    }
}

/// Outer size (with border) of a board of `width` x `height` cells.
fn playfield_size(width: usize, height: usize) -> (u16, u16) {
    let w = u16::try_from(width).unwrap_or(u16::MAX);
    let h = u16::try_from(height).unwrap_or(u16::MAX);
    (w.saturating_mul(CELL_WIDTH).saturating_add(2), h.saturating_add(2))
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn border_style(theme: &Theme) -> Style {
    Style::default().fg(theme.div_line).bg(theme.bg)
}

/// Draw the current screen, then any overlay and the line-clear flash.
pub fn draw(frame: &mut Frame, view: &View<'_>, flash: &mut LineClearFlash, now: Instant) {
    let area = frame.area();
    match view.screen {
        Screen::Loading => draw_message(
            frame,
            view.theme,
            area,
            " Tetrixtui ",
            &["Loading pieces…", "", "Q  Quit"],
            view.theme.div_line,
        ),
        Screen::CatalogFailed(err) => draw_message(
            frame,
            view.theme,
            area,
            " Pieces unavailable ",
            &[err.as_str(), "", "R  Retry    Q  Quit"],
            Color::Red,
        ),
        Screen::Playing(state) => {
            let board_rect = draw_game(frame, view, state, area);
            flash.render(frame, board_rect, now);
            match state.phase {
                Phase::Paused => draw_pause_overlay(frame, view.theme, board_rect),
                Phase::GameOver => draw_game_over(frame, view, state, area),
                Phase::Running => {}
            }
        }
    }
    if let Some(notice) = view.notice {
        draw_message(
            frame,
            view.theme,
            area,
            " Notice ",
            &[notice, "", "Press any key"],
            Color::Red,
        );
    }
}

fn draw_message(
    frame: &mut Frame,
    theme: &Theme,
    area: Rect,
    title: &str,
    lines: &[&str],
    border: Color,
) {
    let text_w = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let width = u16::try_from(text_w).unwrap_or(u16::MAX).saturating_add(6).max(30);
    let height = u16::try_from(lines.len()).unwrap_or(u16::MAX).saturating_add(4);
    let popup = centered(area, width, height);
    let body: Vec<Line> = std::iter::once(Line::from(""))
        .chain(lines.iter().map(|l| Line::from(Span::styled(*l, theme.main_fg))))
        .collect();
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(body)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .style(Style::default().bg(theme.bg))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border).bg(theme.bg))
                .title(Span::styled(title.to_string(), theme.title)),
        )
        .render(popup, frame.buffer_mut());
}

/// Playfield + sidebar, centred. Returns the board's inner rect.
fn draw_game(frame: &mut Frame, view: &View<'_>, state: &GameState, area: Rect) -> Rect {
    let (pw, ph) = playfield_size(state.board.width(), state.board.height());
    let total_w = pw + SIDEBAR_WIDTH;
    let total_h = ph.max(SIDEBAR_MIN_HEIGHT);

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_h),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(pw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);
    let playfield_area = Rect {
        height: ph.min(columns[0].height),
        ..columns[0]
    };

    let board_rect = draw_playfield(frame, view.theme, state, playfield_area);
    draw_sidebar(frame, view, state, columns[1]);
    board_rect
}

fn draw_playfield(frame: &mut Frame, theme: &Theme, state: &GameState, area: Rect) -> Rect {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(theme))
        .title(Span::styled(" Tetrixtui ", theme.title));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let buf = frame.buffer_mut();
    let empty_style = Style::default().fg(theme.div_line).bg(theme.bg);
    for (y, row) in state.board.rows().enumerate() {
        for (x, cell) in row.iter().enumerate() {
            match cell {
                Cell::Filled(color) => {
                    let c = theme.piece_color(color);
                    put_cell(buf, inner, x, y, FILLED, Style::default().fg(c).bg(theme.bg));
                }
                Cell::Empty => put_cell(buf, inner, x, y, EMPTY, empty_style),
            }
        }
    }

    // The active piece stays visible after game over, frozen where it spawned.
    let c = theme.piece_color(&state.active.piece.color);
    let style = Style::default().fg(c).bg(theme.bg);
    for (x, y) in state.active.cells() {
        if let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) {
            put_cell(buf, inner, x, y, FILLED, style);
        }
    }
    inner
}

/// Write one board cell; anything outside `area` is skipped.
fn put_cell(buf: &mut Buffer, area: Rect, x: usize, y: usize, symbol: &str, style: Style) {
    let (Ok(x), Ok(y)) = (u16::try_from(x), u16::try_from(y)) else {
        return;
    };
    let rx = area.x.saturating_add(x.saturating_mul(CELL_WIDTH));
    let ry = area.y.saturating_add(y);
    if rx.saturating_add(CELL_WIDTH) <= area.right() && ry < area.bottom() {
        buf.set_string(rx, ry, symbol, style);
    }
}

fn draw_sidebar(frame: &mut Frame, view: &View<'_>, state: &GameState, area: Rect) {
    let theme = view.theme;
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Next (border + title + 4 rows)
            Constraint::Length(5), // Score, level, lines
            Constraint::Min(4),    // Leaderboard
        ])
        .split(area);

    // --- Next ---
    let next_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(theme))
        .title(Span::styled(" Next ", title_style));
    let next_inner = next_block.inner(chunks[0]);
    next_block.render(chunks[0], frame.buffer_mut());
    if let Some(next) = &state.next {
        draw_piece_preview(frame.buffer_mut(), theme, next, next_inner);
    }

    // --- Stats ---
    let stats_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(theme));
    let stats_inner = stats_block.inner(chunks[1]);
    stats_block.render(chunks[1], frame.buffer_mut());
    let p = &state.progression;
    let stats_lines = vec![
        Line::from(vec![
            Span::styled("Score: ", title_style),
            Span::styled(p.score.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Level: ", title_style),
            Span::styled(p.level.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Lines: ", title_style),
            Span::styled(p.lines.to_string(), fg_style),
        ]),
    ];
    Paragraph::new(stats_lines).render(stats_inner, frame.buffer_mut());

    draw_leaderboard(frame, theme, view.leaderboard, chunks[2]);
}

/// Piece centred in `area`.
fn draw_piece_preview(buf: &mut Buffer, theme: &Theme, piece: &Piece, area: Rect) {
    let shape_w = u16::try_from(piece.shape.width()).unwrap_or(u16::MAX);
    let shape_h = u16::try_from(piece.shape.height()).unwrap_or(u16::MAX);
    let cols = area.width / CELL_WIDTH;
    let origin = Rect {
        x: area.x + cols.saturating_sub(shape_w) / 2 * CELL_WIDTH,
        y: area.y + area.height.saturating_sub(shape_h) / 2,
        width: shape_w.saturating_mul(CELL_WIDTH),
        height: shape_h,
    }
    .intersection(area);
    let c = theme.piece_color(&piece.color);
    let style = Style::default().fg(c).bg(theme.bg);
    for (x, y) in piece.shape.filled_cells() {
        put_cell(buf, origin, x, y, FILLED, style);
    }
}

fn draw_leaderboard(frame: &mut Frame, theme: &Theme, rows: &[ScoreRecord], area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(theme))
        .title(Span::styled(" Leaderboard ", theme.title));
    let lines: Vec<Line> = if rows.is_empty() {
        vec![Line::from(Span::styled("No scores yet", theme.inactive_fg))]
    } else {
        rows.iter()
            .enumerate()
            .map(|(i, r)| {
                Line::from(vec![
                    Span::styled(format!("{:>2}. ", i + 1), theme.inactive_fg),
                    Span::styled(format!("{:<10} ", r.name), theme.main_fg),
                    Span::styled(format!("{:>7}", r.score), theme.title),
                ])
            })
            .collect()
    };
    Paragraph::new(lines)
        .block(block)
        .render(area, frame.buffer_mut());
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, board: Rect) {
    let popup = centered(board, 18, 5);
    let lines = vec![
        Line::from(Span::styled(
            "PAUSED",
            Style::default()
                .fg(theme.title)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled("S  Start", theme.main_fg)),
        Line::from(Span::styled("P  Resume", theme.main_fg)),
    ];
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default().bg(theme.bg))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style(theme)),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, view: &View<'_>, state: &GameState, area: Rect) {
    let theme = view.theme;
    let p = &state.progression;
    let popup = centered(area, 40, 13);
    let fg = Style::default().fg(theme.main_fg);
    let status = if view.submitting {
        Line::from(Span::styled("Saving…", theme.inactive_fg))
    } else {
        Line::from(Span::styled(
            "Enter  Save   Tab  Play again   Esc  Quit",
            theme.inactive_fg,
        ))
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " GAME OVER ",
            Style::default()
                .fg(Color::White)
                .bg(Color::Red)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(format!("Score: {}", p.score), fg)),
        Line::from(Span::styled(format!("Level: {}", p.level), fg)),
        Line::from(Span::styled(format!("Lines: {}", p.lines), fg)),
        Line::from(""),
        Line::from(vec![
            Span::styled("Name: ", Style::default().fg(theme.title)),
            Span::styled(format!("{}_", view.name), fg),
        ]),
        Line::from(""),
        status,
    ];
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default().bg(theme.bg))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style(theme))
                .title(Span::styled(" Tetrixtui ", theme.title)),
        )
        .render(popup, frame.buffer_mut());
}
