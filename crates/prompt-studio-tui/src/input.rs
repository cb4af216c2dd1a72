//! Controlled text editing
//!
//! Fields don't own a text buffer. Each edit takes the current value from the
//! form, returns the new value, and the caller writes it back to the form. Only
//! the cursor (a character index) lives in the UI.

use crossterm::event::KeyCode;

/// Convert a character index to a byte index for UTF-8 safe string operations
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Keep a cursor inside the value, e.g. after an import replaced the text
pub fn clamp_cursor(value: &str, cursor: usize) -> usize {
    cursor.min(value.chars().count())
}

/// Apply an editing key to `value`.
///
/// Returns the new value when the text changed. Cursor-only movement updates
/// `cursor` and returns `None`. `Enter` inserts a newline only when
/// `multiline` is set.
pub fn edit_text(value: &str, cursor: &mut usize, key: KeyCode, multiline: bool) -> Option<String> {
    let char_count = value.chars().count();
    *cursor = (*cursor).min(char_count);

    match key {
        KeyCode::Char(c) => Some(insert_at(value, cursor, c)),
        KeyCode::Enter if multiline => Some(insert_at(value, cursor, '\n')),
        KeyCode::Backspace => {
            if *cursor == 0 {
                return None;
            }
            *cursor -= 1;
            let mut next = value.to_string();
            next.remove(char_to_byte_index(value, *cursor));
            Some(next)
        }
        KeyCode::Delete => {
            if *cursor >= char_count {
                return None;
            }
            let mut next = value.to_string();
            next.remove(char_to_byte_index(value, *cursor));
            Some(next)
        }
        KeyCode::Left => {
            *cursor = cursor.saturating_sub(1);
            None
        }
        KeyCode::Right => {
            *cursor = (*cursor + 1).min(char_count);
            None
        }
        KeyCode::Home => {
            *cursor = line_start(value, *cursor);
            None
        }
        KeyCode::End => {
            *cursor = line_end(value, *cursor);
            None
        }
        _ => None,
    }
}

fn insert_at(value: &str, cursor: &mut usize, c: char) -> String {
    let mut next = value.to_string();
    next.insert(char_to_byte_index(value, *cursor), c);
    *cursor += 1;
    next
}

fn line_start(value: &str, cursor: usize) -> usize {
    let before: Vec<char> = value.chars().take(cursor).collect();
    before
        .iter()
        .rposition(|&c| c == '\n')
        .map(|i| i + 1)
        .unwrap_or(0)
}

fn line_end(value: &str, cursor: usize) -> usize {
    let rest = value.chars().skip(cursor).take_while(|&c| c != '\n').count();
    cursor + rest
}

/// Row and column of the cursor within a multi-line value
pub fn cursor_row_col(value: &str, cursor: usize) -> (usize, usize) {
    let mut row = 0;
    let mut col = 0;
    for c in value.chars().take(cursor) {
        if c == '\n' {
            row += 1;
            col = 0;
        } else {
            col += 1;
        }
    }
    (row, col)
}

/// Apply a digit-entry key to a numeric field. Backspace drops the last digit.
/// The caller clamps the result to the field's range.
pub fn edit_number(value: u32, key: KeyCode) -> Option<u32> {
    match key {
        KeyCode::Char(c) => {
            let digit = c.to_digit(10)?;
            Some(value.saturating_mul(10).saturating_add(digit))
        }
        KeyCode::Backspace => Some(value / 10),
        _ => None,
    }
}
