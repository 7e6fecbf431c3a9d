use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, AuthRequest, LoginState, RegisterState, Screen};
use crate::tui::AppEvent;

/// Lines moved per PageUp/PageDown
const PAGE: u16 = 10;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Resize(_, _) => app.follow_tail = true,
        AppEvent::Tick => app.tick_animation(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if ctrl(&key, 'c') {
        app.should_quit = true;
        return;
    }

    match app.screen {
        Screen::Login => handle_login(app, key),
        Screen::Register => handle_register(app, key),
        Screen::Chat => handle_chat(app, key),
    }
}

fn has_ctrl(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
}

fn ctrl(key: &KeyEvent, c: char) -> bool {
    key.code == KeyCode::Char(c) && has_ctrl(key)
}

fn handle_login(app: &mut App, key: KeyEvent) {
    if app.login.loading {
        return;
    }
    if ctrl(&key, 'r') {
        app.switch_screen(Screen::Register);
        return;
    }

    let state = &mut app.login;
    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Tab | KeyCode::Down => state.focus = (state.focus + 1) % LoginState::FIELDS,
        KeyCode::BackTab | KeyCode::Up => {
            state.focus = (state.focus + LoginState::FIELDS - 1) % LoginState::FIELDS
        }
        KeyCode::Enter => match state.form.validate() {
            Ok(()) => {
                state.error = None;
                state.loading = true;
                app.auth_request = Some(AuthRequest::Login(state.form.clone()));
            }
            Err(e) => state.error = Some(e.to_string()),
        },
        KeyCode::Backspace => {
            state.field_mut().pop();
        }
        KeyCode::Char(c) if !has_ctrl(&key) => state.field_mut().push(c),
        _ => {}
    }
}

fn handle_register(app: &mut App, key: KeyEvent) {
    if app.register.loading {
        return;
    }
    if ctrl(&key, 'l') {
        app.switch_screen(Screen::Login);
        return;
    }

    let state = &mut app.register;
    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Tab | KeyCode::Down => state.focus = (state.focus + 1) % RegisterState::FIELDS,
        KeyCode::BackTab | KeyCode::Up => {
            state.focus = (state.focus + RegisterState::FIELDS - 1) % RegisterState::FIELDS
        }
        KeyCode::Enter => match state.form.validate() {
            Ok(()) => {
                state.error = None;
                state.loading = true;
                app.auth_request = Some(AuthRequest::Signup(state.form.clone()));
            }
            Err(e) => state.error = Some(e.to_string()),
        },
        KeyCode::Backspace => {
            state.field_mut().pop();
        }
        KeyCode::Char(c) if !has_ctrl(&key) => state.field_mut().push(c),
        _ => {}
    }
}

fn handle_chat(app: &mut App, key: KeyEvent) {
    if ctrl(&key, 'o') {
        app.auth_request = Some(AuthRequest::Logout);
        return;
    }

    // Scrolling works while a request is pending; editing does not
    match key.code {
        KeyCode::Esc => {
            app.should_quit = true;
            return;
        }
        KeyCode::PageUp => {
            app.follow_tail = false;
            app.chat_scroll = app.chat_scroll.saturating_sub(PAGE);
            return;
        }
        KeyCode::PageDown => {
            app.chat_scroll = app.chat_scroll.saturating_add(PAGE);
            return;
        }
        _ => {}
    }

    if app.is_pending() {
        return;
    }

    match key.code {
        KeyCode::Enter => app.submit_input(),
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if app.input_cursor < app.input.chars().count() {
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => app.input_cursor = app.input_cursor.saturating_sub(1),
        KeyCode::Right => {
            app.input_cursor = (app.input_cursor + 1).min(app.input.chars().count());
        }
        KeyCode::Home => app.input_cursor = 0,
        KeyCode::End => app.input_cursor = app.input.chars().count(),
        KeyCode::Char(c) if !has_ctrl(&key) => {
            let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
            app.input.insert(byte_pos, c);
            app.input_cursor += 1;
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::signed_in_app;
    use crate::app::App;
    use medinsight_core::{ExchangeController, MemorySessionProvider};
    use std::sync::Arc;

    fn press(app: &mut App, code: KeyCode) {
        handle_event(app, AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)));
    }

    fn press_ctrl(app: &mut App, c: char) {
        handle_event(
            app,
            AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)),
        );
    }

    fn type_str(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn logged_out_app() -> App {
        App::new(
            Box::new(MemorySessionProvider::new()),
            ExchangeController::new(Arc::new(crate::app::tests::EchoBackend)),
        )
    }

    #[test]
    fn test_char_to_byte_index() {
        assert_eq!(char_to_byte_index("héllo", 2), 3);
        assert_eq!(char_to_byte_index("abc", 10), 3);
    }

    #[test]
    fn test_ctrl_c_quits_anywhere() {
        let mut app = logged_out_app();
        press_ctrl(&mut app, 'c');
        assert!(app.should_quit);
    }

    #[test]
    fn test_login_form_requires_fields() {
        let mut app = logged_out_app();
        type_str(&mut app, "ana@example.com");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.login.error.as_deref(), Some("Please fill in all fields"));
        assert!(app.auth_request.is_none());
    }

    #[test]
    fn test_login_form_queues_request() {
        let mut app = logged_out_app();
        type_str(&mut app, "ana@example.com");
        press(&mut app, KeyCode::Tab);
        type_str(&mut app, "secret1");
        press(&mut app, KeyCode::Enter);

        assert!(app.login.loading);
        match &app.auth_request {
            Some(AuthRequest::Login(form)) => {
                assert_eq!(form.email, "ana@example.com");
                assert_eq!(form.password, "secret1");
            }
            other => panic!("unexpected request: {other:?}"),
        }

        // typing is ignored while signing in
        press(&mut app, KeyCode::Char('x'));
        assert_eq!(app.login.form.password, "secret1");
    }

    #[test]
    fn test_register_mismatch_and_switching() {
        let mut app = logged_out_app();
        press_ctrl(&mut app, 'r');
        assert_eq!(app.screen, Screen::Register);

        type_str(&mut app, "Ana");
        press(&mut app, KeyCode::Tab);
        type_str(&mut app, "ana@example.com");
        press(&mut app, KeyCode::Tab);
        type_str(&mut app, "secret1");
        press(&mut app, KeyCode::Tab);
        type_str(&mut app, "secret2");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.register.error.as_deref(), Some("Passwords do not match"));

        press_ctrl(&mut app, 'l');
        assert_eq!(app.screen, Screen::Login);
        assert!(app.register.error.is_none());
    }

    #[tokio::test]
    async fn test_chat_editing_and_submit() {
        let mut app = signed_in_app();
        type_str(&mut app, "fevr");
        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Char('e'));
        assert_eq!(app.input, "fever");

        press(&mut app, KeyCode::Enter);
        assert!(app.is_pending());
        assert_eq!(app.turns().len(), 1);

        // input is disabled while the request is out
        type_str(&mut app, "more");
        press(&mut app, KeyCode::Enter);
        assert!(app.input.is_empty());
        assert_eq!(app.turns().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_enter_does_nothing() {
        let mut app = signed_in_app();
        type_str(&mut app, "   ");
        press(&mut app, KeyCode::Enter);
        assert!(!app.is_pending());
        assert!(app.turns().is_empty());
    }

    #[test]
    fn test_logout_key_queues_request() {
        let mut app = signed_in_app();
        press_ctrl(&mut app, 'o');
        assert!(matches!(app.auth_request, Some(AuthRequest::Logout)));
    }

    #[test]
    fn test_control_chords_do_not_type() {
        let mut app = logged_out_app();
        type_str(&mut app, "ana");
        press_ctrl(&mut app, 'o');
        press_ctrl(&mut app, 'l');
        assert_eq!(app.login.form.email, "ana");

        press_ctrl(&mut app, 'r');
        assert_eq!(app.screen, Screen::Register);
        press_ctrl(&mut app, 'r');
        assert!(app.register.form.display_name.is_empty());

        let mut app = signed_in_app();
        type_str(&mut app, "rash");
        press_ctrl(&mut app, 'r');
        press_ctrl(&mut app, 'l');
        assert_eq!(app.input, "rash");
        assert_eq!(app.input_cursor, 4);
    }
}
