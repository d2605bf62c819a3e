use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Quit,
    Refresh,
    NextPool,
    PrevPool,
    SelectUp,
    SelectDown,
    JumpTop,
    JumpBottom,
    ScrollUp,
    ScrollDown,
    StartSearch,
    ToggleDiagnostics,
    CycleTheme,
    ShowHelp,
    Back,
    None,
}

/// Key bindings in normal mode.
pub fn handle_key(key: KeyEvent) -> Action {
    match (key.code, key.modifiers) {
        (KeyCode::Char('q'), _)
        | (KeyCode::Char('c'), KeyModifiers::CONTROL) => Action::Quit,

        (KeyCode::Char('r'), _) | (KeyCode::F(5), _) => Action::Refresh,

        (KeyCode::Tab, _)     | (KeyCode::Right, _) | (KeyCode::Char('l'), _) => Action::NextPool,
        (KeyCode::BackTab, _) | (KeyCode::Left, _)  | (KeyCode::Char('h'), _) => Action::PrevPool,

        // Navigation: arrow keys and vim jk
        (KeyCode::Up,   _) | (KeyCode::Char('k'), _) => Action::SelectUp,
        (KeyCode::Down, _) | (KeyCode::Char('j'), _) => Action::SelectDown,
        (KeyCode::Char('g'), _) | (KeyCode::Home, _) => Action::JumpTop,
        (KeyCode::Char('G'), _) | (KeyCode::End,  _) => Action::JumpBottom,

        (KeyCode::PageUp,   _) => Action::ScrollUp,
        (KeyCode::PageDown, _) => Action::ScrollDown,

        (KeyCode::Char('/'), _) => Action::StartSearch,
        (KeyCode::Char('w'), _) => Action::ToggleDiagnostics,
        (KeyCode::Char('t'), _) => Action::CycleTheme,
        (KeyCode::Char('?'), _)
        | (KeyCode::F(1), _)   => Action::ShowHelp,
        (KeyCode::Esc, _)      => Action::Back,

        _ => Action::None,
    }
}

/// What a key does while the search prompt is open.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchEdit {
    Push(char),
    Pop,
    /// Close the prompt, keep the query.
    Accept,
    /// Close the prompt and clear the query.
    Cancel,
    Quit,
    None,
}

pub fn handle_search_key(key: KeyEvent) -> SearchEdit {
    match (key.code, key.modifiers) {
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => SearchEdit::Quit,
        (KeyCode::Enter, _)     => SearchEdit::Accept,
        (KeyCode::Esc, _)       => SearchEdit::Cancel,
        (KeyCode::Backspace, _) => SearchEdit::Pop,
        (KeyCode::Char(c), m) if !m.contains(KeyModifiers::CONTROL) => SearchEdit::Push(c),
        _ => SearchEdit::None,
    }
}
