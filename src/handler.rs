use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::App;
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => insert_text(app, &text),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
    }

    // Every event doubles as a chance to pick up a finished request
    app.poll_in_flight().await;
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        handle_control_key(app, key);
        return;
    }

    match key.code {
        KeyCode::Enter => app.submit(),
        KeyCode::Esc => {
            // Escape hatch for a hung backend; otherwise drop the draft
            if !app.cancel_request() {
                app.session.draft_mut().clear();
                app.input_cursor = 0;
            }
        }

        // Welcome panel: pick an example
        KeyCode::Tab if app.session.history().is_empty() => app.use_selected_example(),
        KeyCode::Up if app.session.history().is_empty() => app.example_nav_up(),
        KeyCode::Down if app.session.history().is_empty() => app.example_nav_down(),

        // Transcript
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_half_page_up(),
        KeyCode::PageDown => app.scroll_half_page_down(),

        // Draft editing, allowed while a request is pending
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let draft = app.session.draft_mut();
                let byte_pos = char_to_byte_index(draft, app.input_cursor);
                draft.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let cursor = app.input_cursor;
            let draft = app.session.draft_mut();
            if cursor < draft.chars().count() {
                let byte_pos = char_to_byte_index(draft, cursor);
                draft.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.session.draft().chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.input_cursor = 0;
        }
        KeyCode::End => {
            app.input_cursor = app.session.draft().chars().count();
        }
        KeyCode::Char(c) => insert_char(app, c),
        _ => {}
    }
}

fn handle_control_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('c') | KeyCode::Char('q') => app.quit(),
        KeyCode::Char('l') => app.clear_chat(),
        KeyCode::Char('p') => app.focus_prev_data(),
        KeyCode::Char('n') => app.focus_next_data(),
        KeyCode::Char('u') => app.scroll_half_page_up(),
        KeyCode::Char('d') => app.scroll_half_page_down(),
        _ => {}
    }
}

fn insert_char(app: &mut App, c: char) {
    let cursor = app.input_cursor;
    let draft = app.session.draft_mut();
    let byte_pos = char_to_byte_index(draft, cursor);
    draft.insert(byte_pos, c);
    app.input_cursor += 1;
}

/// Pasted text goes in as a single line.
fn insert_text(app: &mut App, text: &str) {
    for c in text.chars() {
        insert_char(app, if c == '\n' || c == '\r' { ' ' } else { c });
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
