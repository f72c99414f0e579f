use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, SUGGESTIONS};
use crate::tui::AppEvent;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => app.insert_str(&text),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
    }
    app.poll_exchange().await;
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        // Quit
        KeyCode::Char('c') | KeyCode::Char('q') if ctrl => app.should_quit = true,

        // Dismiss the error banner
        KeyCode::Esc => app.session.dismiss_error(),

        // Shift/Alt+Enter add a line break, plain Enter sends
        KeyCode::Enter
            if key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) =>
        {
            app.insert_char('\n');
        }
        KeyCode::Enter => app.send_message(),

        // Chat scrolling
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_half_page_up(),
        KeyCode::PageDown => app.scroll_half_page_down(),
        KeyCode::Char('u') if ctrl => app.scroll_half_page_up(),
        KeyCode::Char('d') if ctrl => app.scroll_half_page_down(),

        // Input editing
        KeyCode::Backspace => app.backspace(),
        KeyCode::Delete => app.delete(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Char('a') if ctrl => app.cursor_home(),
        KeyCode::Char('e') if ctrl => app.cursor_end(),

        // Number keys pick a suggestion while the welcome panel is up and the box is empty
        KeyCode::Char(c @ '1'..='3') if app.show_welcome() && app.input.is_empty() => {
            let idx = c as usize - '1' as usize;
            app.apply_suggestion(idx);
        }

        KeyCode::Char(_) if ctrl => {}
        KeyCode::Char(c) => app.insert_char(c),
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    let in_chat = app.chat_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollDown if in_chat => app.scroll_down(3),
        MouseEventKind::ScrollUp if in_chat => app.scroll_up(3),
        MouseEventKind::Down(MouseButton::Left) if app.show_welcome() => {
            let clicked = app
                .suggestion_areas
                .iter()
                .position(|r| point_in_rect(x, y, *r));
            if let Some(idx) = clicked.filter(|i| *i < SUGGESTIONS.len()) {
                app.apply_suggestion(idx);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventKind, KeyEventState};
    use crate::webhook::WebhookClient;

    fn app() -> App {
        App::new(WebhookClient::new("http://127.0.0.1:9/webhook/test", "customer1"))
    }

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn type_str(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_key(app, key(KeyCode::Char(c), KeyModifiers::NONE));
        }
    }

    #[test]
    fn test_ctrl_c_quits() {
        let mut app = app();
        handle_key(&mut app, key(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }

    #[test]
    fn test_typing_and_shift_enter() {
        let mut app = app();
        type_str(&mut app, "line one");
        handle_key(&mut app, key(KeyCode::Enter, KeyModifiers::SHIFT));
        type_str(&mut app, "two");
        assert_eq!(app.input, "line one\ntwo");
        assert!(app.session.conversation().is_empty());
    }

    #[test]
    fn test_enter_on_blank_input_does_nothing() {
        let mut app = app();
        type_str(&mut app, "   ");
        handle_key(&mut app, key(KeyCode::Enter, KeyModifiers::NONE));
        assert!(app.session.conversation().is_empty());
        assert!(!app.is_pending());
        assert!(app.exchange_task.is_none());
    }

    #[test]
    fn test_number_key_picks_suggestion_only_on_empty_welcome() {
        let mut app = app();
        handle_key(&mut app, key(KeyCode::Char('3'), KeyModifiers::NONE));
        assert_eq!(app.input, "Request a refund");

        // With text in the box digits are typed normally
        handle_key(&mut app, key(KeyCode::Char('1'), KeyModifiers::NONE));
        assert_eq!(app.input, "Request a refund1");
    }

    #[test]
    fn test_click_on_suggestion() {
        let mut app = app();
        app.suggestion_areas = vec![Rect::new(0, 0, 10, 1), Rect::new(0, 2, 10, 1)];
        handle_mouse(
            &mut app,
            MouseEvent {
                kind: MouseEventKind::Down(MouseButton::Left),
                column: 3,
                row: 2,
                modifiers: KeyModifiers::NONE,
            },
        );
        assert_eq!(app.input, SUGGESTIONS[1]);
    }

    #[tokio::test]
    async fn test_enter_sends_once() {
        let mut app = app();
        type_str(&mut app, "I need help");
        handle_key(&mut app, key(KeyCode::Enter, KeyModifiers::NONE));
        assert!(app.is_pending());
        assert_eq!(app.session.conversation().len(), 1);

        // A second Enter while pending is rejected
        handle_key(&mut app, key(KeyCode::Enter, KeyModifiers::NONE));
        assert_eq!(app.session.conversation().len(), 1);
    }

    #[test]
    fn test_esc_dismisses_error() {
        let mut app = app();
        let mut input = "hi".to_string();
        app.session.submit(&mut input);
        app.session.complete(Err(crate::webhook::ExchangeError::Status(
            reqwest::StatusCode::NOT_FOUND,
        )));
        assert!(app.session.last_error().is_some());

        handle_key(&mut app, key(KeyCode::Esc, KeyModifiers::NONE));
        assert_eq!(app.session.last_error(), None);
    }
}
