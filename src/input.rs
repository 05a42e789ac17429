//! Key bindings: arrows and vim-style; Shift slides the cursor's row or column.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CursorLeft,
    CursorRight,
    CursorUp,
    CursorDown,
    SlideLeft,
    SlideRight,
    SlideUp,
    SlideDown,
    MoreGears,
    FewerGears,
    Reset,
    Confirm,
    Pause,
    Quit,
    None,
}

/// Map key event to game action. Shift+arrow or HJKL slides, plain arrow or hjkl moves the cursor.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    let shift = modifiers.contains(KeyModifiers::SHIFT);
    if modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
        return Action::None;
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('p') => Action::Pause,
        KeyCode::Char('r') => Action::Reset,
        KeyCode::Char('+') | KeyCode::Char('=') => Action::MoreGears,
        KeyCode::Char('-') | KeyCode::Char('_') => Action::FewerGears,
        KeyCode::Enter | KeyCode::Char(' ') => Action::Confirm,
        KeyCode::Left if shift => Action::SlideLeft,
        KeyCode::Right if shift => Action::SlideRight,
        KeyCode::Up if shift => Action::SlideUp,
        KeyCode::Down if shift => Action::SlideDown,
        KeyCode::Char('H') => Action::SlideLeft,
        KeyCode::Char('L') => Action::SlideRight,
        KeyCode::Char('K') => Action::SlideUp,
        KeyCode::Char('J') => Action::SlideDown,
        KeyCode::Left | KeyCode::Char('h') => Action::CursorLeft,
        KeyCode::Right | KeyCode::Char('l') => Action::CursorRight,
        KeyCode::Up | KeyCode::Char('k') => Action::CursorUp,
        KeyCode::Down | KeyCode::Char('j') => Action::CursorDown,
        _ => Action::None,
    }
}
