use crate::app::{App, AppState};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

pub fn handle_key(key: KeyEvent, app: &mut App) {
    if key.kind != KeyEventKind::Press {
        return;
    }
    match app.state {
        AppState::Chat => handle_chat_input(key, app),
        AppState::QuitConfirm => handle_quit_confirm_input(key, app),
        AppState::Quit => {}
    }
}

pub fn handle_chat_input(key: KeyEvent, app: &mut App) {
    match key.code {
        KeyCode::Esc => {
            app.state = AppState::QuitConfirm;
        }
        KeyCode::Enter => app.send_message(),
        KeyCode::PageUp => app.scroll_up(),
        KeyCode::PageDown => app.scroll_down(),
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Char(c) => {
            if key.modifiers.contains(KeyModifiers::CONTROL) {
                match c {
                    'c' => app.state = AppState::QuitConfirm,
                    'u' => app.scroll_up(),
                    'd' => app.scroll_down(),
                    _ => {}
                }
            } else {
                app.input.push(c);
            }
        }
        _ => {}
    }
}

pub fn handle_quit_confirm_input(key: KeyEvent, app: &mut App) {
    match key.code {
        KeyCode::Char('y') | KeyCode::Enter => {
            app.state = AppState::Quit;
        }
        KeyCode::Char('n') | KeyCode::Esc => {
            app.state = AppState::Chat;
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::errors::ChatlineResult;
    use crate::socket::Outbound;
    use tokio::sync::mpsc;

    struct NullOutbound;

    impl Outbound for NullOutbound {
        fn send_message(&self, _text: &str) -> ChatlineResult<()> {
            Ok(())
        }
    }

    fn app() -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        App::new(&Config::default(), Box::new(NullOutbound), tx)
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_typing_and_enter_sends() {
        let mut app = app();
        for c in "hey".chars() {
            handle_key(press(KeyCode::Char(c)), &mut app);
        }
        handle_key(press(KeyCode::Backspace), &mut app);
        assert_eq!(app.input, "he");

        handle_key(press(KeyCode::Enter), &mut app);
        assert!(app.input.is_empty());
        assert_eq!(app.session.messages()[0].content, "he");
    }

    #[test]
    fn test_quit_requires_confirmation() {
        let mut app = app();
        handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), &mut app);
        assert_eq!(app.state, AppState::QuitConfirm);
        assert!(app.input.is_empty());

        handle_key(press(KeyCode::Char('n')), &mut app);
        assert_eq!(app.state, AppState::Chat);

        handle_key(press(KeyCode::Esc), &mut app);
        handle_key(press(KeyCode::Char('y')), &mut app);
        assert!(app.should_quit());
    }

    #[test]
    fn test_scrolling_detaches_from_tail() {
        let mut app = app();
        app.chat_scroll = 5;
        handle_key(press(KeyCode::PageUp), &mut app);
        assert_eq!(app.chat_scroll, 4);
        assert!(!app.follow_tail);
        handle_key(KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL), &mut app);
        assert_eq!(app.chat_scroll, 5);
    }
}
