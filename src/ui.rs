use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{
        Axis, Block, Borders, Cell, Chart, Dataset, GraphType, List, ListItem, Paragraph, Row,
        Table, Wrap,
    },
};
use unicode_width::UnicodeWidthChar;

use crate::app::App;
use crate::chart::{project_chart, LineChartSpec};
use crate::session::{CONNECTION_ERROR_PREFIX, ERROR_PREFIX};
use crate::state::{Message, Role, RowRecord};
use crate::table::{project_table, TableView};
use crate::theme;

const MAX_COLUMN_WIDTH: u16 = 24;

/// Split a summary line on `**` and bold every closed pair. A trailing
/// unmatched `**` is kept as literal text.
fn styled_summary_line(text: &str) -> Line<'static> {
    let mut parts: Vec<&str> = text.split("**").collect();
    // An even number of parts means the last `**` never closes
    let unmatched = if parts.len() % 2 == 0 { parts.pop() } else { None };

    let mut spans: Vec<Span<'static>> = parts
        .iter()
        .enumerate()
        .filter(|(_, part)| !part.is_empty())
        .map(|(i, part)| {
            if i % 2 == 0 {
                Span::raw(part.to_string())
            } else {
                Span::styled(part.to_string(), Style::default().add_modifier(Modifier::BOLD))
            }
        })
        .collect();

    if let Some(rest) = unmatched {
        spans.push(Span::raw(format!("**{}", rest)));
    }

    Line::from(spans)
}

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

    let focused = app.focused_data_message().cloned();
    match focused {
        Some(message) => {
            let [chat_area, data_area] = Layout::horizontal([
                Constraint::Percentage(55),
                Constraint::Percentage(45),
            ])
            .areas(body_area);
            render_chat_column(app, frame, chat_area);
            render_data_panel(&message, frame, data_area);
        }
        None => render_chat_column(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let theme = theme::get();

    let title = Line::from(vec![
        Span::styled(" 🏠 Real Estate Analysis Chatbot ", theme.title),
        Span::styled(format!("v{}", env!("CARGO_PKG_VERSION")), theme.muted),
        Span::raw("  "),
        Span::styled(app.endpoint().to_string(), theme.muted),
    ]);

    frame.render_widget(Paragraph::new(title), area);
}

fn render_chat_column(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    app.chat_area = Some(chat_area);

    if app.session.history().is_empty() && !app.is_pending() {
        render_welcome(app, frame, chat_area);
    } else {
        render_transcript(app, frame, chat_area);
    }

    render_input(app, frame, input_area);
}

fn render_welcome(app: &mut App, frame: &mut Frame, area: Rect) {
    let theme = theme::get();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.accent))
        .title(" Chat ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [intro_area, examples_area] = Layout::vertical([
        Constraint::Length(5),
        Constraint::Min(0),
    ])
    .areas(inner);

    let intro = Text::from(vec![
        Line::from(Span::styled("👋 Welcome!", theme.title)),
        Line::from(Span::styled(
            "Ask me anything about real estate areas in Pune",
            theme.muted,
        )),
        Line::default(),
        Line::from(Span::styled(
            "💡 Try these examples (↑/↓ to pick, Tab to use):",
            theme.muted,
        )),
    ]);
    frame.render_widget(Paragraph::new(intro).wrap(Wrap { trim: true }), intro_area);

    let items: Vec<ListItem> = app
        .example_queries
        .iter()
        .map(|q| ListItem::new(format!(" {} ", q)))
        .collect();

    let list = List::new(items)
        .highlight_style(
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, examples_area, &mut app.example_state);
}

fn is_error_text(text: &str) -> bool {
    text.starts_with(ERROR_PREFIX) || text.starts_with(CONNECTION_ERROR_PREFIX)
}

fn data_hint(message: &Message) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(chart) = message.chart_data.as_ref().filter(|c| !c.labels.is_empty()) {
        parts.push(format!("📈 chart: {} points", chart.labels.len()));
    }
    if let Some(rows) = message.table_data.as_ref().filter(|t| !t.is_empty()) {
        parts.push(format!("📋 table: {} rows", rows.len()));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" · "))
    }
}

fn transcript_lines(app: &App) -> Vec<Line<'static>> {
    let theme = theme::get();
    let mut lines: Vec<Line<'static>> = Vec::new();

    for (i, msg) in app.session.history().iter().enumerate() {
        match msg.role {
            Role::User => {
                lines.push(Line::from(Span::styled("👤 You", theme.user)));
                for line in msg.text.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            Role::Bot => {
                lines.push(Line::from(Span::styled("🤖 Bot", theme.bot)));
                if is_error_text(&msg.text) {
                    for line in msg.text.lines() {
                        lines.push(Line::from(Span::styled(line.to_string(), theme.error)));
                    }
                } else {
                    for line in msg.text.lines() {
                        lines.push(styled_summary_line(line));
                    }
                }

                if let Some(hint) = data_hint(msg) {
                    let marker = if app.data_focus == Some(i) { "▶ " } else { "  " };
                    lines.push(Line::from(Span::styled(
                        format!("{}{}", marker, hint),
                        theme.muted.add_modifier(Modifier::ITALIC),
                    )));
                }
            }
        }
        lines.push(Line::default());
    }

    // Typing placeholder, never part of the history
    if app.is_pending() {
        lines.push(Line::from(Span::styled("🤖 Bot", theme.bot)));
        let dots = ".".repeat(app.animation_frame as usize + 1);
        lines.push(Line::from(Span::styled(
            format!("typing{}", dots),
            theme.muted.add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    let theme = theme::get();

    let chat = Paragraph::new(Text::from(transcript_lines(app))).wrap(Wrap { trim: false });

    // Measured before the block is attached, so borders are not counted
    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);
    let total = chat.line_count(inner_width).min(u16::MAX as usize) as u16;
    app.update_transcript_size(total, inner_height);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.accent))
        .title(format!(" Chat ({} messages) ", app.session.history().len()));

    let chat = chat.block(block).scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

/// First char to draw and the cursor's display column relative to it, so the
/// cursor stays inside `width` columns. Wide glyphs count as two.
fn input_window(draft: &str, cursor: usize, width: usize) -> (usize, usize) {
    let widths: Vec<usize> = draft.chars().map(|c| c.width().unwrap_or(0)).collect();
    let cursor = cursor.min(widths.len());

    let mut start = 0;
    let mut column: usize = widths[..cursor].iter().sum();
    while start < cursor && column >= width {
        column -= widths[start];
        start += 1;
    }
    (start, column)
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let theme = theme::get();

    let (title, border) = if app.is_pending() {
        (" Analyzing… (Esc to cancel) ", theme.muted)
    } else {
        (" Ask (Enter to send) ", Style::default().fg(theme.accent))
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(title);

    // Horizontal scrolling keeps the cursor visible
    let inner_width = area.width.saturating_sub(2) as usize;
    let draft = app.session.draft();
    let (scroll_offset, cursor_x) = input_window(draft, app.input_cursor, inner_width);

    let input = if draft.is_empty() {
        Paragraph::new(Span::styled(
            "Type your query... e.g., 'Analyze Wakad'",
            theme.muted,
        ))
    } else {
        let mut used = 0;
        let visible_text: String = draft
            .chars()
            .skip(scroll_offset)
            .take_while(|c| {
                used += c.width().unwrap_or(0);
                used <= inner_width
            })
            .collect();
        Paragraph::new(visible_text).style(theme.input)
    };

    frame.render_widget(input.block(input_block), area);

    frame.set_cursor_position((area.x + cursor_x as u16 + 1, area.y + 1));
}

fn render_data_panel(message: &Message, frame: &mut Frame, area: Rect) {
    let chart = message.chart_data.as_ref().and_then(project_chart);
    let records = message.table_data.as_deref().filter(|t| !t.is_empty());

    match (chart, records) {
        (Some(spec), Some(records)) => {
            let [chart_area, table_area] = Layout::vertical([
                Constraint::Percentage(55),
                Constraint::Percentage(45),
            ])
            .areas(area);
            render_chart(&spec, frame, chart_area);
            render_table(records, frame, table_area);
        }
        (Some(spec), None) => render_chart(&spec, frame, area),
        (None, Some(records)) => render_table(records, frame, area),
        (None, None) => {}
    }
}

fn render_chart(spec: &LineChartSpec, frame: &mut Frame, area: Rect) {
    let theme = theme::get();

    let datasets = vec![Dataset::default()
        .name(spec.series_label)
        .marker(theme.chart_marker)
        .graph_type(GraphType::Line)
        .style(theme.chart_line)
        .data(&spec.points)];

    // First, middle and last label; the axis spreads them evenly
    let x_labels: Vec<Span> = match spec.labels.len() {
        0..=2 => spec.labels.iter().map(|l| Span::raw(l.clone())).collect(),
        n => [0, n / 2, n - 1]
            .iter()
            .map(|&i| Span::raw(spec.labels[i].clone()))
            .collect(),
    };

    let [y_min, y_max] = spec.y_bounds;
    let y_labels: Vec<Span> = [y_min, (y_min + y_max) / 2.0, y_max]
        .iter()
        .map(|v| Span::raw(format!("{:.1}", v)))
        .collect();

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.accent))
                .title(format!(" {} ", spec.title)),
        )
        .x_axis(
            Axis::default()
                .style(theme.muted)
                .bounds(spec.x_bounds)
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .style(theme.muted)
                .bounds(spec.y_bounds)
                .labels(y_labels),
        );

    frame.render_widget(chart, area);
}

fn column_widths(view: &TableView) -> Vec<Constraint> {
    view.headers
        .iter()
        .enumerate()
        .map(|(col, header)| {
            let widest_cell = view
                .rows
                .iter()
                .map(|row| row[col].to_string().chars().count())
                .max()
                .unwrap_or(0);
            let width = widest_cell.max(header.chars().count()) as u16;
            Constraint::Length(width.min(MAX_COLUMN_WIDTH))
        })
        .collect()
}

fn render_table(records: &[RowRecord], frame: &mut Frame, area: Rect) {
    let theme = theme::get();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.accent));

    let view = match project_table(records) {
        Ok(Some(view)) => view,
        Ok(None) => return,
        Err(e) => {
            let warning = Paragraph::new(Span::styled(format!("⚠ Table data is malformed: {}", e), theme.error))
                .wrap(Wrap { trim: true })
                .block(block.title(" Data preview "));
            frame.render_widget(warning, area);
            return;
        }
    };

    let title = if view.is_truncated() {
        format!(" Data preview ({} of {} rows) ", view.rows.len(), view.total_rows)
    } else {
        format!(" Data preview ({} rows) ", view.total_rows)
    };

    let widths = column_widths(&view);
    let header = Row::new(view.headers.iter().map(|h| Cell::from(h.clone())))
        .style(theme.table_header);

    let rows: Vec<Row> = view
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let cells = row.iter().map(|cell| Cell::from(cell.to_string()));
            let row = Row::new(cells);
            if i % 2 == 1 {
                row.style(theme.table_stripe)
            } else {
                row
            }
        })
        .collect();

    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(2)
        .block(block.title(title));

    frame.render_widget(table, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let theme = theme::get();
    let key_style = theme.key_hint;
    let label_style = theme.key_label;

    let mut hints = vec![
        Span::styled(" Enter ", key_style),
        Span::styled(" send ", label_style),
    ];

    if app.is_pending() {
        hints.extend([
            Span::styled(" Esc ", key_style),
            Span::styled(" cancel ", label_style),
        ]);
    }

    if app.session.history().is_empty() {
        hints.extend([
            Span::styled(" ↑/↓ ", key_style),
            Span::styled(" example ", label_style),
            Span::styled(" Tab ", key_style),
            Span::styled(" use ", label_style),
        ]);
    } else {
        hints.extend([
            Span::styled(" ↑/↓ PgUp/PgDn ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" ^P/^N ", key_style),
            Span::styled(" data ", label_style),
            Span::styled(" ^L ", key_style),
            Span::styled(" clear chat ", label_style),
        ]);
    }

    hints.extend([
        Span::styled(" ^C ", key_style),
        Span::styled(" quit ", label_style),
    ]);

    frame.render_widget(Paragraph::new(Line::from(hints)).bold(), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisClient, AnalysisReport, AnalysisResponse};
    use crate::config::{Config, Overrides};
    use crate::state::ChartSeries;
    use ratatui::{backend::TestBackend, Terminal};

    fn plain(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn test_app() -> App {
        let settings = Config::new().resolve(&Overrides::default());
        App::new(AnalysisClient::new("http://127.0.0.1:9/api/analyze/"), &settings)
    }

    fn answer(app: &mut App, query: &str, summary: &str) {
        app.session.set_draft(query);
        let submission = app.session.begin_submit().unwrap();
        let _ = app.session.resolve(
            submission,
            Ok(AnalysisResponse::Success(AnalysisReport {
                summary: summary.to_string(),
                chart_data: None,
                table_data: None,
            })),
        );
    }

    /// Draw the whole screen and return it row by row.
    fn screen(app: &mut App, width: u16, height: u16) -> Vec<String> {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| render(app, f)).unwrap();

        let buffer = terminal.backend().buffer();
        (0..height)
            .map(|y| {
                (0..width)
                    .map(|x| buffer.cell((x, y)).map(|c| c.symbol()).unwrap_or(" "))
                    .collect()
            })
            .collect()
    }

    fn shows(rows: &[String], needle: &str) -> bool {
        rows.iter().any(|row| row.contains(needle))
    }

    fn speakers(app: &App) -> Vec<String> {
        transcript_lines(app)
            .iter()
            .map(plain)
            .filter(|l| l == "👤 You" || l == "🤖 Bot")
            .collect()
    }

    #[test]
    fn welcome_panel_lists_examples_on_empty_history() {
        let mut app = test_app();
        let rows = screen(&mut app, 80, 20);

        assert!(shows(&rows, "Welcome!"));
        assert!(shows(&rows, "Analyze Wakad"));
        assert!(shows(&rows, "Compare Aundh and Baner"));
        assert!(!shows(&rows, "typing"));
    }

    #[test]
    fn pending_request_replaces_welcome_with_typing_placeholder() {
        let mut app = test_app();
        app.session.set_draft("Analyze Wakad");
        let submission = app.session.begin_submit().unwrap();

        let rows = screen(&mut app, 80, 20);
        assert!(!shows(&rows, "Welcome!"));
        assert!(shows(&rows, "typing"));
        assert_eq!(app.session.history().len(), 1);

        let _ = app.session.resolve(
            submission,
            Ok(AnalysisResponse::Failure {
                error: "No data found".to_string(),
            }),
        );
        let rows = screen(&mut app, 80, 20);
        assert!(!shows(&rows, "typing"));
        assert!(shows(&rows, "Error: No data found"));
    }

    #[test]
    fn typing_placeholder_is_never_part_of_history() {
        let mut app = test_app();
        answer(&mut app, "Analyze Wakad", "Wakad is steady");
        app.session.set_draft("Analyze Baner");
        let _submission = app.session.begin_submit().unwrap();

        let lines: Vec<String> = transcript_lines(&app).iter().map(plain).collect();
        assert_eq!(lines.last().map(String::as_str), Some("typing."));
        assert_eq!(app.session.history().len(), 3);
        assert!(app.session.history().iter().all(|m| !m.text.starts_with("typing")));
    }

    #[test]
    fn one_block_per_message_in_order() {
        let mut app = test_app();
        answer(&mut app, "first", "answer one");
        answer(&mut app, "second", "answer two");

        assert_eq!(speakers(&app), vec!["👤 You", "🤖 Bot", "👤 You", "🤖 Bot"]);

        let lines: Vec<String> = transcript_lines(&app).iter().map(plain).collect();
        let pos = |text: &str| lines.iter().position(|l| l == text).unwrap();
        assert!(pos("first") < pos("answer one"));
        assert!(pos("answer one") < pos("second"));
        assert!(pos("second") < pos("answer two"));
    }

    #[test]
    fn following_bottom_keeps_typing_placeholder_on_screen() {
        let mut app = test_app();
        // Ten-column words wrap at word boundaries, not mid-word
        answer(&mut app, "long", &"aaaaaaaaaa bbbbbbbbbb ".repeat(6));
        for i in 0..8 {
            answer(&mut app, &format!("q{}", i), &format!("answer to q{}", i));
        }
        app.session.set_draft("final");
        let _submission = app.session.begin_submit().unwrap();

        let rows = screen(&mut app, 20, 24);
        assert!(shows(&rows, "typing"));
        assert!(shows(&rows, "final"));
    }

    #[test]
    fn following_bottom_shows_newest_reply() {
        let mut app = test_app();
        for i in 0..6 {
            answer(&mut app, &format!("q{}", i), &"cccccccccc dddddddddd ".repeat(3));
        }
        answer(&mut app, "latest", "newest reply");

        let rows = screen(&mut app, 20, 24);
        assert!(shows(&rows, "latest"));
        assert!(shows(&rows, "newest reply"));
    }

    #[test]
    fn trailing_marker_with_nothing_after_stays_literal() {
        let line = styled_summary_line("price **");
        assert_eq!(plain(&line), "price **");
    }

    #[test]
    fn input_window_counts_display_columns() {
        // Narrow text: no scrolling until the cursor reaches the edge
        assert_eq!(input_window("Analyze", 7, 10), (0, 7));
        assert_eq!(input_window("Analyze Wakad", 13, 10), (4, 9));

        // Each house emoji is two columns wide
        assert_eq!(input_window("🏠🏠", 2, 10), (0, 4));
        assert_eq!(input_window("🏠🏠🏠", 3, 4), (2, 2));
        assert_eq!(input_window("पुणे", 0, 10), (0, 0));
    }

    #[test]
    fn bold_pairs_are_styled() {
        let line = styled_summary_line("Wakad is **hot** right now");
        assert_eq!(plain(&line), "Wakad is hot right now");
        assert_eq!(line.spans.len(), 3);
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn unmatched_marker_stays_literal() {
        let line = styled_summary_line("price **rising");
        assert_eq!(plain(&line), "price **rising");
    }

    #[test]
    fn data_hint_names_available_payloads() {
        let mut msg = Message::bot("ok");
        assert_eq!(data_hint(&msg), None);

        msg.chart_data = Some(ChartSeries {
            labels: vec!["2021".into(), "2022".into()],
            values: vec![1.0, 2.0],
        });
        assert_eq!(data_hint(&msg).unwrap(), "📈 chart: 2 points");
    }
}
