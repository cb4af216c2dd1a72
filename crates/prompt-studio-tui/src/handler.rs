use std::path::PathBuf;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use prompt_studio_core::form::{clamp_max_output_tokens, step_temperature, MAX_OUTPUT_TOKENS_MAX};
use ratatui::layout::Rect;

use crate::app::{App, Field, InputMode};
use crate::input::{edit_number, edit_text};
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => {
            app.tick_status();
        }
        AppEvent::ImportFinished { ticket, outcome } => {
            app.finish_import(ticket, outcome);
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => {
                app.should_quit = true;
                return;
            }
            KeyCode::Char('s') if !app.show_import_prompt => {
                app.submit();
                return;
            }
            KeyCode::Char('o') if !app.show_import_prompt => {
                app.open_import_prompt();
                return;
            }
            _ => return,
        }
    }

    if app.show_import_prompt {
        handle_import_prompt(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_import_prompt(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_import_prompt(),
        KeyCode::Enter => {
            let path = app.import_path_input.trim().to_string();
            app.close_import_prompt();
            if !path.is_empty() {
                app.start_import(PathBuf::from(path));
            }
        }
        code => {
            let path = &app.import_path_input;
            if let Some(next) = edit_text(path, &mut app.import_path_cursor, code, false) {
                app.import_path_input = next;
            }
        }
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        // Quit
        KeyCode::Char('q') => app.should_quit = true,

        // Field navigation
        KeyCode::Tab | KeyCode::Down | KeyCode::Char('j') => app.focus_next(),
        KeyCode::BackTab | KeyCode::Up | KeyCode::Char('k') => app.focus_prev(),

        // Activate
        KeyCode::Enter | KeyCode::Char('i') => activate_field(app),

        // Adjust choice and range controls
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('+') => adjust_field(app, 1),
        KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('-') => adjust_field(app, -1),

        // History scroll
        KeyCode::PageDown => app.scroll_history_down(app.history_height.max(1) / 2),
        KeyCode::PageUp => app.scroll_history_up(app.history_height.max(1) / 2),

        _ => {}
    }
}

fn activate_field(app: &mut App) {
    match app.focus {
        field if field.is_editable() => app.input_mode = InputMode::Editing,
        Field::Import => app.open_import_prompt(),
        Field::Model => adjust_field(app, 1),
        Field::Generate => app.submit(),
        _ => {}
    }
}

/// Step a choice or range control, clamped the way the widget presents it
fn adjust_field(app: &mut App, delta: i32) {
    let form = app.session.form_mut();
    match app.focus {
        Field::Model => {
            let model = if delta > 0 { form.model().next() } else { form.model().prev() };
            form.set_model(model);
        }
        Field::Temperature => {
            form.set_temperature(step_temperature(form.temperature(), delta));
        }
        Field::MaxTokens => {
            let next = form.max_output_tokens().saturating_add_signed(delta);
            form.set_max_output_tokens(clamp_max_output_tokens(next));
        }
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.stop_editing();
            return;
        }
        KeyCode::Tab => {
            app.focus_next();
            return;
        }
        KeyCode::BackTab => {
            app.focus_prev();
            return;
        }
        KeyCode::Enter if !app.focus.is_multiline() => {
            app.stop_editing();
            return;
        }
        KeyCode::Up if app.focus == Field::MaxTokens => {
            adjust_field(app, 1);
            return;
        }
        KeyCode::Down if app.focus == Field::MaxTokens => {
            adjust_field(app, -1);
            return;
        }
        _ => {}
    }

    if !app.focus.is_editable() {
        app.stop_editing();
        return;
    }

    let multiline = app.focus.is_multiline();
    let form = app.session.form_mut();
    match app.focus {
        Field::Instruction => {
            let cursor = &mut app.instruction_cursor;
            if let Some(next) = edit_text(form.instruction(), cursor, key.code, multiline) {
                form.set_instruction(next);
            }
        }
        Field::Prompt => {
            let cursor = &mut app.prompt_cursor;
            if let Some(next) = edit_text(form.prompt(), cursor, key.code, multiline) {
                form.set_prompt(next);
            }
        }
        Field::Credential => {
            let cursor = &mut app.credential_cursor;
            if let Some(next) = edit_text(form.credential().expose(), cursor, key.code, false) {
                form.set_credential(next);
            }
        }
        Field::MaxTokens => {
            // Only the upper bound holds while typing, so the field can be
            // cleared and retyped; the lower bound applies on leaving it
            if let Some(next) = edit_number(form.max_output_tokens(), key.code) {
                form.set_max_output_tokens(next.min(MAX_OUTPUT_TOKENS_MAX));
            }
        }
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

    let in_history = app.history_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollDown if in_history => app.scroll_history_down(3),
        MouseEventKind::ScrollUp if in_history => app.scroll_history_up(3),
        MouseEventKind::Down(MouseButton::Left) if !app.show_import_prompt => {
            let clicked = app
                .field_areas
                .iter()
                .find(|(_, rect)| point_in_rect(x, y, *rect))
                .map(|(field, _)| *field);

            if let Some(field) = clicked {
                app.stop_editing();
                app.focus = field;
                if matches!(field, Field::Import | Field::Generate) {
                    activate_field(app);
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prompt_studio_core::{ChatRole, ImportOutcome, Model, Session};
    use tokio::sync::mpsc;

    fn test_app() -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        App::new(Session::new(), tx)
    }

    fn press(app: &mut App, code: KeyCode) {
        handle_event(app, AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))).unwrap();
    }

    fn ctrl(app: &mut App, c: char) {
        handle_event(
            app,
            AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)),
        )
        .unwrap();
    }

    fn type_str(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn focus(app: &mut App, field: Field) {
        while app.focus != field {
            press(app, KeyCode::Tab);
        }
    }

    #[test]
    fn test_typing_updates_form_state() {
        let mut app = test_app();
        focus(&mut app, Field::Prompt);
        press(&mut app, KeyCode::Enter);
        type_str(&mut app, "hello");

        assert_eq!(app.input_mode, InputMode::Editing);
        assert_eq!(app.session.form().prompt(), "hello");
    }

    #[test]
    fn test_enter_in_prompt_inserts_newline() {
        let mut app = test_app();
        focus(&mut app, Field::Prompt);
        press(&mut app, KeyCode::Enter);
        type_str(&mut app, "a");
        press(&mut app, KeyCode::Enter);
        type_str(&mut app, "b");

        assert_eq!(app.session.form().prompt(), "a\nb");
        assert!(app.session.log().is_empty());
    }

    #[test]
    fn test_ctrl_s_submits_from_editing() {
        let mut app = test_app();
        focus(&mut app, Field::Prompt);
        press(&mut app, KeyCode::Enter);
        type_str(&mut app, "hello");
        ctrl(&mut app, 's');

        let turns: Vec<_> = app.session.log().all().collect();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role(), ChatRole::User);
        assert_eq!(turns[0].content(), "hello");
        assert!(turns[1].content().contains("hello"));
        assert_eq!(app.session.form().prompt(), "");
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[test]
    fn test_generate_button_submits() {
        let mut app = test_app();
        app.session.form_mut().set_prompt("one");
        focus(&mut app, Field::Generate);
        press(&mut app, KeyCode::Enter);
        app.session.form_mut().set_prompt("two");
        press(&mut app, KeyCode::Enter);

        let contents: Vec<&str> = app.session.log().all().map(|t| t.content()).collect();
        assert_eq!(contents.len(), 4);
        assert_eq!(contents[0], "one");
        assert_eq!(contents[2], "two");
    }

    #[test]
    fn test_typed_q_does_not_quit_while_editing() {
        let mut app = test_app();
        press(&mut app, KeyCode::Enter);
        type_str(&mut app, "quiet");

        assert!(!app.should_quit);
        assert_eq!(app.session.form().instruction(), "quiet");

        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn test_temperature_slider_clamps() {
        let mut app = test_app();
        focus(&mut app, Field::Temperature);
        for _ in 0..10 {
            press(&mut app, KeyCode::Right);
        }
        assert_eq!(app.session.form().temperature(), 1.0);

        for _ in 0..20 {
            press(&mut app, KeyCode::Left);
        }
        assert_eq!(app.session.form().temperature(), 0.0);
    }

    #[test]
    fn test_max_tokens_entry_clamps() {
        let mut app = test_app();
        focus(&mut app, Field::MaxTokens);
        press(&mut app, KeyCode::Enter);
        type_str(&mut app, "0");
        assert_eq!(app.session.form().max_output_tokens(), 8000);

        for _ in 0..4 {
            press(&mut app, KeyCode::Backspace);
        }
        assert_eq!(app.session.form().max_output_tokens(), 0);
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.session.form().max_output_tokens(), 1);

        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Down);
        assert_eq!(app.session.form().max_output_tokens(), 1);
        press(&mut app, KeyCode::Up);
        assert_eq!(app.session.form().max_output_tokens(), 2);
    }

    #[test]
    fn test_max_tokens_can_be_retyped() {
        let mut app = test_app();
        focus(&mut app, Field::MaxTokens);
        press(&mut app, KeyCode::Enter);
        for _ in 0..6 {
            press(&mut app, KeyCode::Backspace);
        }
        type_str(&mut app, "500");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.session.form().max_output_tokens(), 500);
    }

    #[test]
    fn test_leaving_cleared_max_tokens_settles_in_range() {
        let mut app = test_app();
        app.session.form_mut().set_prompt("hi");
        focus(&mut app, Field::MaxTokens);
        press(&mut app, KeyCode::Enter);
        for _ in 0..4 {
            press(&mut app, KeyCode::Backspace);
        }
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.session.form().max_output_tokens(), 1);

        focus(&mut app, Field::MaxTokens);
        press(&mut app, KeyCode::Enter);
        for _ in 0..4 {
            press(&mut app, KeyCode::Backspace);
        }
        ctrl(&mut app, 's');
        assert_eq!(app.session.form().max_output_tokens(), 1);
        assert_eq!(app.session.log().len(), 2);
    }

    #[test]
    fn test_resize_event_is_ignored() {
        let mut app = test_app();
        app.session.form_mut().set_prompt("keep");
        handle_event(&mut app, AppEvent::Resize).unwrap();

        assert_eq!(app.session.form().prompt(), "keep");
        assert!(!app.should_quit);
    }

    #[test]
    fn test_model_cycles() {
        let mut app = test_app();
        focus(&mut app, Field::Model);
        press(&mut app, KeyCode::Right);
        assert_eq!(app.session.form().model(), Model::Gpt35Turbo);
        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Left);
        assert_eq!(app.session.form().model(), Model::Llama3);
    }

    #[test]
    fn test_credential_entry() {
        let mut app = test_app();
        focus(&mut app, Field::Credential);
        press(&mut app, KeyCode::Enter);
        type_str(&mut app, "sk-123");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.session.form().credential().expose(), "sk-123");
    }

    #[test]
    fn test_import_prompt_escape_cancels() {
        let mut app = test_app();
        ctrl(&mut app, 'o');
        assert!(app.show_import_prompt);
        type_str(&mut app, "prompt.json");
        assert_eq!(app.import_path_input, "prompt.json");

        press(&mut app, KeyCode::Esc);
        assert!(!app.show_import_prompt);
        assert!(app.pending_import.is_none());
    }

    #[test]
    fn test_import_finished_event_merges() {
        let mut app = test_app();
        let ticket = app.session.begin_import();
        handle_event(
            &mut app,
            AppEvent::ImportFinished {
                ticket,
                outcome: ImportOutcome::Instruction("be concise".into()),
            },
        )
        .unwrap();

        assert_eq!(app.session.form().instruction(), "be concise");
    }

    #[test]
    fn test_failed_import_event_changes_nothing_visible() {
        let mut app = test_app();
        app.session.form_mut().set_instruction("keep");
        let ticket = app.session.begin_import();
        handle_event(
            &mut app,
            AppEvent::ImportFinished {
                ticket,
                outcome: ImportOutcome::Failed,
            },
        )
        .unwrap();

        assert_eq!(app.session.form().instruction(), "keep");
        assert!(app.status.is_none());
    }

    #[tokio::test]
    async fn test_import_prompt_enter_starts_import() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = App::new(Session::new(), tx);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"systemInstruction": "from file", "other": 1}"#).unwrap();

        ctrl(&mut app, 'o');
        type_str(&mut app, &path.to_string_lossy());
        press(&mut app, KeyCode::Enter);
        assert!(!app.show_import_prompt);

        let event = rx.recv().await.unwrap();
        handle_event(&mut app, event).unwrap();
        assert_eq!(app.session.form().instruction(), "from file");
    }

    #[test]
    fn test_click_focuses_field() {
        let mut app = test_app();
        app.field_areas = vec![
            (Field::Instruction, Rect::new(0, 0, 10, 3)),
            (Field::Credential, Rect::new(0, 3, 10, 3)),
        ];
        handle_event(
            &mut app,
            AppEvent::Mouse(MouseEvent {
                kind: MouseEventKind::Down(MouseButton::Left),
                column: 2,
                row: 4,
                modifiers: KeyModifiers::NONE,
            }),
        )
        .unwrap();

        assert_eq!(app.focus, Field::Credential);
    }
}
