use prompt_studio_core::ChatRole;
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{
        Block, Borders, Clear, Gauge, Paragraph, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Wrap,
    },
    Frame,
};

use crate::app::{App, Field, HistoryRow, InputMode};
use crate::input::cursor_row_col;

/// Tallest the latest-response block grows before it scrolls
const RESPONSE_MAX_HEIGHT: u16 = 8;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    let [form_area, output_area] = Layout::horizontal([
        Constraint::Percentage(50),
        Constraint::Percentage(50),
    ])
    .areas(body_area);

    render_form(app, frame, form_area);
    render_output(app, frame, output_area);

    render_footer(app, frame, footer_area);

    if app.show_import_prompt {
        render_import_prompt(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let form = app.session.form();

    let title = Line::from(vec![
        Span::styled(" Prompt Studio ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("[{}] ", form.model().display_name()),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = if app.show_import_prompt {
        " IMPORT "
    } else {
        match app.input_mode {
            InputMode::Normal => " FORM ",
            InputMode::Editing => " EDIT ",
        }
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut spans = vec![
        Span::styled(mode_text, mode_style),
        Span::styled(" ", label_style),
    ];

    if let Some(status) = &app.status {
        spans.push(Span::styled(
            format!(" {} ", status.text),
            Style::default().bg(Color::Red).fg(Color::White),
        ));
    } else {
        let hints = if app.show_import_prompt {
            vec![
                Span::styled(" Enter ", key_style),
                Span::styled(" import ", label_style),
                Span::styled(" Esc ", key_style),
                Span::styled(" cancel ", label_style),
            ]
        } else {
            match app.input_mode {
                InputMode::Normal => {
                    let mut hints = vec![
                        Span::styled(" Tab/j/k ", key_style),
                        Span::styled(" field ", label_style),
                    ];
                    match app.focus {
                        Field::Model | Field::Temperature | Field::MaxTokens => hints.extend(vec![
                            Span::styled(" h/l ", key_style),
                            Span::styled(" adjust ", label_style),
                        ]),
                        _ => hints.extend(vec![
                            Span::styled(" Enter ", key_style),
                            Span::styled(" select ", label_style),
                        ]),
                    }
                    hints.extend(vec![
                        Span::styled(" ^S ", key_style),
                        Span::styled(" generate ", label_style),
                        Span::styled(" ^O ", key_style),
                        Span::styled(" upload ", label_style),
                        Span::styled(" PgUp/PgDn ", key_style),
                        Span::styled(" history ", label_style),
                        Span::styled(" q ", key_style),
                        Span::styled(" quit ", label_style),
                    ]);
                    hints
                }
                InputMode::Editing => {
                    let mut hints = Vec::new();
                    if app.focus.is_multiline() {
                        hints.extend(vec![
                            Span::styled(" Enter ", key_style),
                            Span::styled(" newline ", label_style),
                        ]);
                    }
                    hints.extend(vec![
                        Span::styled(" ^S ", key_style),
                        Span::styled(" generate ", label_style),
                        Span::styled(" Tab ", key_style),
                        Span::styled(" next field ", label_style),
                        Span::styled(" Esc ", key_style),
                        Span::styled(" stop typing ", label_style),
                    ]);
                    hints
                }
            }
        };
        spans.extend(hints);
    }

    let footer = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn field_block(app: &App, field: Field, title: String) -> Block<'static> {
    let focused = app.focus == field && !app.show_import_prompt;
    let border_color = if focused && app.input_mode == InputMode::Editing {
        Color::Yellow
    } else if focused {
        Color::Cyan
    } else {
        Color::DarkGray
    };

    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title)
}

fn is_editing(app: &App, field: Field) -> bool {
    app.focus == field && app.input_mode == InputMode::Editing && !app.show_import_prompt
}

fn render_form(app: &mut App, frame: &mut Frame, area: Rect) {
    let [
        instruction_area,
        import_area,
        prompt_area,
        model_area,
        credential_area,
        temperature_area,
        max_tokens_area,
        generate_area,
        _,
    ] = Layout::vertical([
        Constraint::Length(6),
        Constraint::Length(3),
        Constraint::Length(6),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .areas(area);

    // Store areas for mouse hit-testing
    app.field_areas = vec![
        (Field::Instruction, instruction_area),
        (Field::Import, import_area),
        (Field::Prompt, prompt_area),
        (Field::Model, model_area),
        (Field::Credential, credential_area),
        (Field::Temperature, temperature_area),
        (Field::MaxTokens, max_tokens_area),
        (Field::Generate, generate_area),
    ];

    let form = app.session.form();

    // Text fields
    render_text_field(
        frame,
        instruction_area,
        field_block(app, Field::Instruction, format!(" {} ", Field::Instruction.label())),
        form.instruction(),
        app.instruction_cursor,
        is_editing(app, Field::Instruction),
    );
    render_text_field(
        frame,
        prompt_area,
        field_block(app, Field::Prompt, format!(" {} ", Field::Prompt.label())),
        form.prompt(),
        app.prompt_cursor,
        is_editing(app, Field::Prompt),
    );

    // Credential is masked one-for-one so the cursor still lines up
    let masked = "•".repeat(form.credential().char_count());
    render_text_field(
        frame,
        credential_area,
        field_block(app, Field::Credential, format!(" {} ", Field::Credential.label())),
        &masked,
        app.credential_cursor,
        is_editing(app, Field::Credential),
    );

    // Upload button
    let mut import_line = vec![Span::styled(
        format!(" {} ", Field::Import.label()),
        button_style(app.focus == Field::Import),
    )];
    import_line.push(Span::styled(
        format!("  {}", app.import_filter_hint()),
        Style::default().fg(Color::DarkGray),
    ));
    if app.pending_import.is_some() {
        import_line.push(Span::styled(
            "  loading...",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ));
    }
    let import = Paragraph::new(Line::from(import_line))
        .block(field_block(app, Field::Import, String::new()));
    frame.render_widget(import, import_area);

    // Model selector
    let model = form.model();
    let model_line = Line::from(vec![
        Span::raw("< "),
        Span::styled(model.display_name(), Style::default().fg(Color::Cyan).bold()),
        Span::raw(" >  "),
        Span::styled(model.as_str(), Style::default().fg(Color::DarkGray)),
    ]);
    let model_widget = Paragraph::new(model_line)
        .block(field_block(app, Field::Model, format!(" {} ", Field::Model.label())));
    frame.render_widget(model_widget, model_area);

    // Temperature slider. The label shows the stored value even if the gauge
    // has to pin it to the ends.
    let temperature = form.temperature();
    let ratio = if temperature.is_finite() {
        f64::from(temperature).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let gauge = Gauge::default()
        .block(field_block(
            app,
            Field::Temperature,
            format!(" {}: {:.1} ", Field::Temperature.label(), temperature),
        ))
        .gauge_style(Style::default().fg(Color::Blue).bg(Color::Black))
        .ratio(ratio)
        .label(format!("{:.1}", temperature));
    frame.render_widget(gauge, temperature_area);

    // Max tokens
    let max_tokens_text = form.max_output_tokens().to_string();
    let max_tokens = Paragraph::new(max_tokens_text.as_str()).block(field_block(
        app,
        Field::MaxTokens,
        format!(" {} (1-8000) ", Field::MaxTokens.label()),
    ));
    frame.render_widget(max_tokens, max_tokens_area);
    if is_editing(app, Field::MaxTokens) {
        frame.set_cursor_position((
            max_tokens_area.x + 1 + max_tokens_text.len() as u16,
            max_tokens_area.y + 1,
        ));
    }

    // Generate button
    let generate = Paragraph::new(Span::styled(
        format!(" {} ", Field::Generate.label()),
        button_style(app.focus == Field::Generate),
    ))
    .alignment(Alignment::Center)
    .block(field_block(app, Field::Generate, String::new()));
    frame.render_widget(generate, generate_area);
}

fn button_style(focused: bool) -> Style {
    if focused {
        Style::default().bg(Color::Blue).fg(Color::White).add_modifier(Modifier::BOLD)
    } else {
        Style::default().bg(Color::DarkGray).fg(Color::White)
    }
}

/// Draw a controlled text field, scrolled so the cursor stays visible
fn render_text_field(
    frame: &mut Frame,
    area: Rect,
    block: Block<'static>,
    value: &str,
    cursor: usize,
    editing: bool,
) {
    let inner = block.inner(area);
    let inner_height = inner.height.max(1) as usize;
    let inner_width = inner.width.max(1) as usize;

    let (row, col) = cursor_row_col(value, cursor);
    let v_scroll = row.saturating_sub(inner_height - 1);
    let h_scroll = col.saturating_sub(inner_width - 1);

    let paragraph = Paragraph::new(Text::raw(value))
        .style(Style::default().fg(Color::White))
        .block(block)
        .scroll((v_scroll as u16, h_scroll as u16));
    frame.render_widget(paragraph, area);

    if editing {
        frame.set_cursor_position((
            inner.x + (col - h_scroll) as u16,
            inner.y + (row - v_scroll) as u16,
        ));
    }
}

fn render_output(app: &mut App, frame: &mut Frame, area: Rect) {
    let latest = app.session.latest_response().map(str::to_string);

    let history_area = match latest {
        Some(response) => {
            let response_lines = response.lines().count().max(1) as u16;
            let response_height = (response_lines + 2).min(RESPONSE_MAX_HEIGHT);
            let [response_area, history_area] = Layout::vertical([
                Constraint::Length(response_height),
                Constraint::Min(0),
            ])
            .areas(area);

            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Green))
                .title(" Latest Response ");
            let paragraph = Paragraph::new(response)
                .block(block)
                .wrap(Wrap { trim: false });
            frame.render_widget(paragraph, response_area);

            history_area
        }
        None => area,
    };

    render_history(app, frame, history_area);
}

fn render_history(app: &mut App, frame: &mut Frame, area: Rect) {
    app.history_area = Some(area);

    // Store dimensions for scroll calculations (inner size minus borders)
    app.history_height = area.height.saturating_sub(2);
    app.history_width = area.width.saturating_sub(2);
    app.settle_history_scroll();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation History ");

    // Rows are pre-wrapped to the pane width, so no Paragraph wrapping here
    let rows = app.history_rows();
    let history_text = if rows.is_empty() {
        Text::from(Span::styled(
            "No messages yet. Fill in a prompt and press Generate.",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let lines: Vec<Line> = rows.into_iter().map(history_line).collect();
        Text::from(lines)
    };

    let history = Paragraph::new(history_text)
        .block(block)
        .scroll((app.history_scroll, 0));
    frame.render_widget(history, area);

    let total_lines = app.history_line_count();
    if total_lines > app.history_height {
        let max_scroll = total_lines.saturating_sub(app.history_height);
        let mut scrollbar_state =
            ScrollbarState::new(max_scroll as usize).position(app.history_scroll as usize);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area,
            &mut scrollbar_state,
        );
    }
}

fn history_line(row: HistoryRow) -> Line<'static> {
    let color = |role: ChatRole| match role {
        ChatRole::User => Color::Cyan,
        ChatRole::Assistant => Color::Green,
    };
    match row {
        HistoryRow::Label(role) => Line::from(Span::styled(
            format!("{}:", role.label()),
            Style::default().fg(color(role)).add_modifier(Modifier::BOLD),
        )),
        HistoryRow::Text(role, text) => {
            Line::from(Span::styled(text, Style::default().fg(color(role))))
        }
        HistoryRow::Blank => Line::default(),
    }
}

fn render_import_prompt(app: &App, frame: &mut Frame, area: Rect) {
    // Centered, and never larger than the terminal
    let popup_width = 64.min(area.width.saturating_sub(4));
    let popup_height = 7.min(area.height);

    let popup_x = area.x + area.width.saturating_sub(popup_width) / 2;
    let popup_y = area.y + area.height.saturating_sub(popup_height) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height).intersection(area);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(format!(" Upload JSON ({}) ", app.import_filter_hint()));

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    if inner.is_empty() {
        return;
    }

    // Instructions, when there is room for them above the input row
    if inner.height >= 3 {
        let instructions =
            Paragraph::new("Path to a settings file. Enter to import, Esc to cancel.")
                .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 1));
    }

    // Input field, scrolled horizontally to keep the cursor visible
    let input_y = inner.y + 2.min(inner.height - 1);
    let input_area = Rect::new(inner.x, input_y, inner.width, 1);
    let inner_width = input_area.width as usize;
    let cursor_pos = app.import_path_cursor;
    let scroll_offset = (cursor_pos + 1).saturating_sub(inner_width);

    let visible_text: String = app
        .import_path_input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text).style(Style::default().fg(Color::Cyan));
    frame.render_widget(input, input_area);

    let cursor_x = (cursor_pos - scroll_offset) as u16;
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));
}

#[cfg(test)]
mod tests {
    use super::*;
    use prompt_studio_core::Session;
    use ratatui::{backend::TestBackend, buffer::Buffer, Terminal};
    use tokio::sync::mpsc;

    fn test_app() -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        App::new(Session::new(), tx)
    }

    fn draw(app: &mut App) -> Buffer {
        draw_sized(app, 120, 44)
    }

    fn draw_sized(app: &mut App, width: u16, height: u16) -> Buffer {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        terminal.backend().buffer().clone()
    }

    fn area_text(buffer: &Buffer, area: Rect) -> String {
        (area.top()..area.bottom())
            .map(|y| {
                (area.left()..area.right())
                    .map(|x| buffer[(x, y)].symbol())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn buffer_text(buffer: &Buffer) -> String {
        let width = buffer.area.width as usize;
        buffer
            .content()
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_render_is_idempotent() {
        let mut app = test_app();
        app.session.form_mut().set_instruction("be concise");
        app.session.form_mut().set_prompt("hello");
        app.submit();

        let first = draw(&mut app);
        let second = draw(&mut app);
        assert_eq!(first, second);
        assert_eq!(app.session.log().len(), 2);
    }

    #[test]
    fn test_render_shows_history_and_latest_response() {
        let mut app = test_app();
        let before = buffer_text(&draw(&mut app));
        assert!(!before.contains("Latest Response"));
        assert!(before.contains("Conversation History"));

        app.session.form_mut().set_prompt("hello");
        app.submit();
        let after = buffer_text(&draw(&mut app));

        assert!(after.contains("Latest Response"));
        assert!(after.contains("You:"));
        assert!(after.contains("AI:"));
        assert!(after.contains("simulated response to: \"hello\""));
    }

    #[test]
    fn test_render_masks_credential() {
        let mut app = test_app();
        app.session.form_mut().set_credential("sk-secret");
        let text = buffer_text(&draw(&mut app));

        assert!(!text.contains("sk-secret"));
        assert!(text.contains("•••••••••"));
    }

    #[test]
    fn test_render_out_of_range_temperature_does_not_panic() {
        let mut app = test_app();
        app.session.form_mut().set_temperature(7.5);
        let text = buffer_text(&draw(&mut app));
        assert!(text.contains("Temperature: 7.5"));
    }

    #[test]
    fn test_render_records_field_areas() {
        let mut app = test_app();
        draw(&mut app);
        assert_eq!(app.field_areas.len(), Field::all().len());
        assert!(app.history_area.is_some());
    }

    #[test]
    fn test_render_import_prompt() {
        let mut app = test_app();
        app.open_import_prompt();
        let text = buffer_text(&draw(&mut app));
        assert!(text.contains("Upload JSON (*.json)"));
    }

    #[test]
    fn test_import_prompt_fits_short_terminal() {
        let mut app = test_app();
        app.open_import_prompt();
        app.import_path_input = "settings/a-rather-long-path/prompt.json".to_string();
        app.import_path_cursor = app.import_path_input.chars().count();

        for (width, height) in [(80, 5), (80, 3), (30, 2)] {
            let text = buffer_text(&draw_sized(&mut app, width, height));
            if height >= 5 {
                assert!(text.contains("prompt.json"));
            }
        }
    }

    #[test]
    fn test_history_scrolls_to_newest_turn() {
        let mut app = test_app();
        draw_sized(&mut app, 40, 30);
        for i in 0..6 {
            app.session
                .form_mut()
                .set_prompt(format!("aaaaaa bbbbbb cccccc dddddd eeeeee ffffff gggggg END{}", i));
            app.submit();
        }

        // The pane shrinks once the latest response shows; stay pinned to the end
        let buffer = draw_sized(&mut app, 40, 30);
        let history_text = area_text(&buffer, app.history_area.unwrap());
        assert!(history_text.contains("END5\""));

        app.scroll_history_up(10);
        draw_sized(&mut app, 40, 30);
        app.scroll_history_down(u16::MAX);
        let buffer = draw_sized(&mut app, 40, 30);

        let history = app.history_area.unwrap();
        let history_text = area_text(&buffer, history);
        assert!(history_text.contains("END5\""));
        assert!(!history_text.contains("END0"));
    }
}
