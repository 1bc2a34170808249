use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    FocusNext,
    FocusPrev,
    Down,
    Up,
    PageDown,
    PageUp,
    Top,
    Bottom,
    Select,
    Back,
    Refresh,
    Delete,
    ConfirmYes,
    ConfirmNo,
    ToggleHelp,
    ScrollOutputUp,
    ScrollOutputDown,
    FollowOutput,
}

pub fn map_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Action::Delete)
        }
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char('?') => Some(Action::ToggleHelp),
        KeyCode::Tab if key.modifiers.contains(KeyModifiers::SHIFT) => Some(Action::FocusPrev),
        KeyCode::Tab => Some(Action::FocusNext),
        KeyCode::BackTab => Some(Action::FocusPrev),
        KeyCode::Down if key.modifiers.contains(KeyModifiers::SHIFT) => {
            Some(Action::ScrollOutputDown)
        }
        KeyCode::Up if key.modifiers.contains(KeyModifiers::SHIFT) => Some(Action::ScrollOutputUp),
        KeyCode::Down | KeyCode::Char('j') => Some(Action::Down),
        KeyCode::Up | KeyCode::Char('k') => Some(Action::Up),
        KeyCode::Char('J') | KeyCode::Char(']') => Some(Action::ScrollOutputDown),
        KeyCode::Char('K') | KeyCode::Char('[') => Some(Action::ScrollOutputUp),
        KeyCode::Char('f') => Some(Action::FollowOutput),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::Home | KeyCode::Char('g') => Some(Action::Top),
        KeyCode::End | KeyCode::Char('G') => Some(Action::Bottom),
        KeyCode::Enter => Some(Action::Select),
        KeyCode::Esc => Some(Action::Back),
        KeyCode::Char('r') => Some(Action::Refresh),
        KeyCode::Char('y') | KeyCode::Char('Y') => Some(Action::ConfirmYes),
        KeyCode::Char('n') | KeyCode::Char('N') => Some(Action::ConfirmNo),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{Action, map_key};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    #[test]
    fn maps_quit() {
        let key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert_eq!(map_key(key), Some(Action::Quit));
    }

    #[test]
    fn tab_and_backtab_move_focus() {
        let forward = KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE);
        let backward = KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT);
        assert_eq!(map_key(forward), Some(Action::FocusNext));
        assert_eq!(map_key(backward), Some(Action::FocusPrev));
    }

    #[test]
    fn ctrl_d_requests_delete() {
        let key = KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL);
        assert_eq!(map_key(key), Some(Action::Delete));
    }

    #[test]
    fn vim_keys_move_selection() {
        let down = KeyEvent::new(KeyCode::Char('j'), KeyModifiers::NONE);
        let up = KeyEvent::new(KeyCode::Char('k'), KeyModifiers::NONE);
        assert_eq!(map_key(down), Some(Action::Down));
        assert_eq!(map_key(up), Some(Action::Up));
    }

    #[test]
    fn shift_arrows_scroll_output() {
        let key = KeyEvent::new(KeyCode::Down, KeyModifiers::SHIFT);
        assert_eq!(map_key(key), Some(Action::ScrollOutputDown));
    }

    #[test]
    fn unmapped_key_is_ignored() {
        let key = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE);
        assert_eq!(map_key(key), None);
    }
}
