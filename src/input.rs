//! Key bindings: normal and vim-style, plus the name field on the game-over panel.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveLeft,
    MoveRight,
    SoftDrop,
    Rotate,
    HardDrop,
    Pause,
    Start,
    Reset,
    SaveScore,
    /// Character typed into the name field.
    Type(char),
    /// Backspace in the name field.
    Erase,
    Quit,
    None,
}

/// Map key event to game action. Supports both normal (arrows, space) and vim (hjkl).
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if !no_mod {
        return Action::None;
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('p' | 'P') => Action::Pause,
        KeyCode::Char('s' | 'S') | KeyCode::Enter => Action::Start,
        KeyCode::Char('r' | 'R') => Action::Reset,
        KeyCode::Left | KeyCode::Char('h') => Action::MoveLeft,
        KeyCode::Right | KeyCode::Char('l') => Action::MoveRight,
        KeyCode::Up | KeyCode::Char('k') => Action::Rotate,
        KeyCode::Down | KeyCode::Char('j') => Action::SoftDrop,
        KeyCode::Char(' ') => Action::HardDrop,
        _ => Action::None,
    }
}

/// Keys while the game-over panel owns the keyboard: letters go to the name field.
pub fn name_entry_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    match code {
        KeyCode::Enter => Action::SaveScore,
        KeyCode::Tab => Action::Reset,
        KeyCode::Esc => Action::Quit,
        KeyCode::Backspace => Action::Erase,
        KeyCode::Char(c) if !c.is_control() => Action::Type(c),
        _ => Action::None,
    }
}
