use std::path::PathBuf;

use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

use prompt_studio_core::form::clamp_max_output_tokens;
use prompt_studio_core::import::ADVISORY_EXTENSION;
use prompt_studio_core::{import_from, ChatRole, ImportOutcome, ImportTicket, Session};

use crate::input::clamp_cursor;
use crate::tui::AppEvent;

/// Ticks a status banner stays visible (300ms each)
const STATUS_TICKS: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Focusable form controls, in tab order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Instruction,
    Import,
    Prompt,
    Model,
    Credential,
    Temperature,
    MaxTokens,
    Generate,
}

impl Field {
    pub fn all() -> [Field; 8] {
        [
            Field::Instruction,
            Field::Import,
            Field::Prompt,
            Field::Model,
            Field::Credential,
            Field::Temperature,
            Field::MaxTokens,
            Field::Generate,
        ]
    }

    pub fn next(&self) -> Field {
        let all = Self::all();
        let i = all.iter().position(|f| f == self).unwrap_or(0);
        all[(i + 1) % all.len()]
    }

    pub fn prev(&self) -> Field {
        let all = Self::all();
        let i = all.iter().position(|f| f == self).unwrap_or(0);
        all[(i + all.len() - 1) % all.len()]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Field::Instruction => "System Instruction",
            Field::Import => "Upload JSON",
            Field::Prompt => "User Prompt",
            Field::Model => "Model",
            Field::Credential => "API Key",
            Field::Temperature => "Temperature",
            Field::MaxTokens => "Max Tokens",
            Field::Generate => "Generate",
        }
    }

    /// Fields that accept typed input in editing mode
    pub fn is_editable(&self) -> bool {
        matches!(
            self,
            Field::Instruction | Field::Prompt | Field::Credential | Field::MaxTokens
        )
    }

    pub fn is_multiline(&self) -> bool {
        matches!(self, Field::Instruction | Field::Prompt)
    }
}

/// One rendered row of the conversation history, already wrapped to width
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryRow {
    /// "You:" or "AI:" heading
    Label(ChatRole),
    Text(ChatRole, String),
    Blank,
}

/// Transient error banner shown in the footer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub ticks_left: u8,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: Field,
    pub session: Session,

    // Cursor positions (character indices) for the controlled text fields
    pub instruction_cursor: usize,
    pub prompt_cursor: usize,
    pub credential_cursor: usize,

    // Import prompt state
    pub show_import_prompt: bool,
    pub import_path_input: String,
    pub import_path_cursor: usize,
    pub pending_import: Option<ImportTicket>,

    // Output state
    pub history_scroll: u16,
    /// Keep the newest turn in view across renders until the user scrolls up
    pub history_follow: bool,
    pub history_height: u16,
    pub history_width: u16,
    pub status: Option<StatusMessage>,

    // Panel areas for mouse hit-testing (updated during render)
    pub history_area: Option<Rect>,
    pub field_areas: Vec<(Field, Rect)>,

    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(session: Session, events: UnboundedSender<AppEvent>) -> Self {
        let instruction_cursor = session.form().instruction().chars().count();

        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            focus: Field::Instruction,
            session,

            instruction_cursor,
            prompt_cursor: 0,
            credential_cursor: 0,

            show_import_prompt: false,
            import_path_input: String::new(),
            import_path_cursor: 0,
            pending_import: None,

            history_scroll: 0,
            history_follow: true,
            history_height: 0,
            history_width: 0,
            status: None,

            history_area: None,
            field_areas: Vec::new(),

            events,
        }
    }

    pub fn focus_next(&mut self) {
        self.stop_editing();
        self.focus = self.focus.next();
    }

    pub fn focus_prev(&mut self) {
        self.stop_editing();
        self.focus = self.focus.prev();
    }

    /// Return to normal mode. Max tokens may sit out of range while digits are
    /// being typed; leaving the field settles it into `[1, 8000]`.
    pub fn stop_editing(&mut self) {
        if self.input_mode == InputMode::Editing && self.focus == Field::MaxTokens {
            let form = self.session.form_mut();
            form.set_max_output_tokens(clamp_max_output_tokens(form.max_output_tokens()));
        }
        self.input_mode = InputMode::Normal;
    }

    pub fn set_status(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            ticks_left: STATUS_TICKS,
        });
    }

    /// Count down the status banner (called by Tick event)
    pub fn tick_status(&mut self) {
        if let Some(status) = &mut self.status {
            status.ticks_left = status.ticks_left.saturating_sub(1);
            if status.ticks_left == 0 {
                self.status = None;
            }
        }
    }

    /// Submit the current prompt and show the reply
    pub fn submit(&mut self) {
        self.stop_editing();
        match self.session.submit() {
            Ok(_) => {
                self.prompt_cursor = 0;
                self.scroll_history_to_bottom();
            }
            Err(e) => {
                self.set_status(format!("Generation failed: {}", e));
            }
        }
    }

    pub fn open_import_prompt(&mut self) {
        self.show_import_prompt = true;
        self.import_path_input.clear();
        self.import_path_cursor = 0;
    }

    pub fn close_import_prompt(&mut self) {
        self.show_import_prompt = false;
        self.import_path_input.clear();
        self.import_path_cursor = 0;
    }

    /// Kick off a background read of `path`. The result comes back through the
    /// event queue as [`AppEvent::ImportFinished`].
    pub fn start_import(&mut self, path: PathBuf) {
        let ticket = self.session.begin_import();
        self.pending_import = Some(ticket);
        info!(ticket = ticket.id(), ?path, "importing file");

        let tx = self.events.clone();
        tokio::spawn(async move {
            let outcome = import_from(&path).await;
            let _ = tx.send(AppEvent::ImportFinished { ticket, outcome });
        });
    }

    pub fn finish_import(&mut self, ticket: ImportTicket, outcome: ImportOutcome) {
        if self.pending_import == Some(ticket) {
            self.pending_import = None;
        }
        if self.session.finish_import(ticket, outcome) {
            self.instruction_cursor =
                clamp_cursor(self.session.form().instruction(), self.instruction_cursor);
        }
    }

    pub fn import_filter_hint(&self) -> String {
        format!("*.{}", ADVISORY_EXTENSION)
    }

    fn max_history_scroll(&self) -> u16 {
        self.history_line_count().saturating_sub(self.history_height)
    }

    pub fn scroll_history_down(&mut self, lines: u16) {
        let max_scroll = self.max_history_scroll();
        self.history_scroll = self.history_scroll.saturating_add(lines).min(max_scroll);
        self.history_follow = self.history_scroll == max_scroll;
    }

    pub fn scroll_history_up(&mut self, lines: u16) {
        self.history_scroll = self.history_scroll.saturating_sub(lines);
        self.history_follow = false;
    }

    /// Called by render once the pane size is known
    pub fn settle_history_scroll(&mut self) {
        if self.history_follow {
            self.scroll_history_to_bottom();
        } else {
            self.history_scroll = self.history_scroll.min(self.max_history_scroll());
        }
    }

    /// Scroll history so the newest exchange is visible
    pub fn scroll_history_to_bottom(&mut self) {
        let visible_height = if self.history_height > 0 {
            self.history_height
        } else {
            20
        };

        let total_lines = self.history_line_count();
        self.history_scroll = total_lines.saturating_sub(visible_height);
        self.history_follow = true;
    }

    fn history_wrap_width(&self) -> usize {
        // Default to 50 until the first render records the real width
        if self.history_width > 0 {
            self.history_width as usize
        } else {
            50
        }
    }

    /// History laid out as rows no wider than the history pane. Rendering and
    /// scroll limits both work from these rows, so they always agree.
    pub fn history_rows(&self) -> Vec<HistoryRow> {
        let width = self.history_wrap_width();
        let mut rows = Vec::new();

        for turn in self.session.log().all() {
            let role = turn.role();
            rows.push(HistoryRow::Label(role));
            if turn.content().is_empty() {
                rows.push(HistoryRow::Text(role, String::new()));
            }
            for line in turn.content().lines() {
                rows.extend(
                    wrap_line(line, width)
                        .into_iter()
                        .map(|row| HistoryRow::Text(role, row)),
                );
            }
            rows.push(HistoryRow::Blank);
        }

        rows
    }

    pub fn history_line_count(&self) -> u16 {
        u16::try_from(self.history_rows().len()).unwrap_or(u16::MAX)
    }
}

/// Greedy word wrap. Breaks at the last space that fits, or mid-word when a
/// single word is wider than `width`. Always returns at least one row.
pub fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();
    let mut current: Vec<char> = Vec::new();

    for c in line.chars() {
        current.push(c);
        if current.len() <= width {
            continue;
        }
        // `current` is one char too wide; a space at index `width` breaks cleanly
        match current[..=width].iter().rposition(|c| *c == ' ') {
            Some(space) if space > 0 => {
                rows.push(current[..space].iter().collect());
                current = current.split_off(space + 1);
            }
            _ => {
                rows.push(current[..width].iter().collect());
                current = current.split_off(width);
            }
        }
    }

    rows.push(current.into_iter().collect());
    rows
}
