use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tracing::debug;

use crate::app::App;
use crate::tui::AppEvent;

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
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Reply(outcome) => app.finish_turn(outcome),
        AppEvent::Health(online) => app.set_backend_status(online),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match key.code {
        KeyCode::Esc => app.should_quit = true,

        KeyCode::Enter => {
            if !app.controller.input_enabled() {
                debug!("enter pressed while waiting for a reply");
            } else {
                app.submit_input();
            }
        }

        // Transcript scrolling
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_up(app.page_size()),
        KeyCode::PageDown => app.scroll_down(app.page_size()),

        // Ask box editing
        KeyCode::Backspace => {
            if app.cursor > 0 {
                app.cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.cursor = app.cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.cursor = (app.cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.cursor = 0;
        }
        KeyCode::End => {
            app.cursor = app.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.cursor);
            app.input.insert(byte_pos, c);
            app.cursor += 1;
        }
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{app_with, EchoFetcher};
    use std::sync::Arc;

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_char_to_byte_index_multibyte() {
        let s = "añb";
        assert_eq!(char_to_byte_index(s, 0), 0);
        assert_eq!(char_to_byte_index(s, 2), 3);
        assert_eq!(char_to_byte_index(s, 10), s.len());
    }

    #[tokio::test]
    async fn test_editing_with_cursor() {
        let (mut app, _rx) = app_with(Arc::new(EchoFetcher));
        type_text(&mut app, "héllo");
        handle_event(&mut app, key(KeyCode::Home));
        handle_event(&mut app, key(KeyCode::Delete));
        handle_event(&mut app, key(KeyCode::End));
        handle_event(&mut app, key(KeyCode::Backspace));
        handle_event(&mut app, key(KeyCode::Left));
        type_text(&mut app, "!");

        assert_eq!(app.input, "él!l");
        assert_eq!(app.cursor, 3);
    }

    #[tokio::test]
    async fn test_enter_on_whitespace_does_nothing() {
        let (mut app, _rx) = app_with(Arc::new(EchoFetcher));
        type_text(&mut app, "   ");
        handle_event(&mut app, key(KeyCode::Enter));

        assert_eq!(app.controller.transcript().len(), 1);
        assert!(app.controller.input_enabled());
        assert_eq!(app.input, "   ");
    }

    #[tokio::test]
    async fn test_enter_runs_a_turn_through_the_event_loop() {
        let (mut app, mut rx) = app_with(Arc::new(EchoFetcher));
        type_text(&mut app, "ping");
        handle_event(&mut app, key(KeyCode::Enter));
        assert!(!app.controller.input_enabled());

        // Typing is still allowed, but a second Enter is ignored
        type_text(&mut app, "again");
        handle_event(&mut app, key(KeyCode::Enter));
        assert_eq!(app.controller.transcript().len(), 2);

        while let Some(event) = rx.recv().await {
            let done = matches!(event, AppEvent::Reply(_));
            handle_event(&mut app, event);
            if done {
                break;
            }
        }

        let contents: Vec<&str> = app
            .controller
            .transcript()
            .iter()
            .skip(1)
            .map(|m| m.content())
            .collect();
        assert_eq!(contents, vec!["ping", "echo: ping"]);
        assert!(app.controller.input_enabled());
        assert_eq!(app.input, "again");
    }

    #[tokio::test]
    async fn test_escape_quits() {
        let (mut app, _rx) = app_with(Arc::new(EchoFetcher));
        handle_event(&mut app, key(KeyCode::Esc));
        assert!(app.should_quit);
    }
}
