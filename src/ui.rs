use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use crate::app::{App, MAX_INPUT_LINES, SUGGESTIONS};
use crate::conversation::{ChatMessage, ChatRole};
use crate::normalize::format_time;

/// Convert **bold** markdown spans to styled spans; everything else is literal
fn parse_markdown_line(text: &str, base: Style) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("**") {
        let after_open = &rest[start + 2..];
        let Some(len) = after_open.find("**").filter(|len| *len > 0) else {
            break;
        };
        if start > 0 {
            spans.push(Span::styled(rest[..start].to_string(), base));
        }
        spans.push(Span::styled(
            after_open[..len].to_string(),
            base.add_modifier(Modifier::BOLD),
        ));
        rest = &after_open[len + 2..];
    }

    if !rest.is_empty() {
        spans.push(Span::styled(rest.to_string(), base));
    }

    Line::from(spans)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let banner_height = if app.session.last_error().is_some() { 3 } else { 0 };
    let input_lines = input_rows(&app.input);

    // Main layout: header, chat, error banner, input, footer
    let [header_area, chat_area, banner_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(banner_height),
        Constraint::Length(input_lines + 2),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    if app.show_welcome() {
        render_welcome(app, frame, chat_area);
    } else {
        app.suggestion_areas.clear();
        render_chat(app, frame, chat_area);
    }

    if banner_height > 0 {
        render_error_banner(app, frame, banner_area);
    }

    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let status = if app.is_pending() {
        Span::styled(" ● working ", Style::default().fg(Color::Yellow))
    } else {
        Span::styled(" ● online ", Style::default().fg(Color::Green))
    };

    let title = Line::from(vec![
        Span::styled(" AI Customer Support ", Style::default().fg(Color::Cyan).bold()),
        status,
        Span::styled(
            format!("{} ", app.client.endpoint()),
            Style::default().fg(Color::Gray),
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
    let mut hints = vec![
        Span::styled(" CHAT ", Style::default().bg(Color::Blue).fg(Color::White)),
        Span::raw(" Enter send  Shift+Enter newline  PgUp/PgDn scroll  Ctrl+C quit"),
    ];
    if app.session.last_error().is_some() {
        hints.push(Span::raw("  Esc dismiss error"));
    }
    if app.show_welcome() {
        hints.push(Span::raw("  1-3 suggestion"));
    }

    let footer = Paragraph::new(Line::from(hints)).style(Style::default().fg(Color::Gray));
    frame.render_widget(footer, area);
}

fn render_welcome(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let intro = Text::from(vec![
        Line::from(Span::styled(
            "Welcome to Customer Support",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(Span::styled(
            "I'm here to help you with any questions or issues. Just type your message below to get started.",
            Style::default().fg(Color::Gray),
        )),
    ]);

    let intro_height = 4.min(inner.height);
    let intro_area = Rect::new(inner.x, inner.y + inner.height.saturating_sub(intro_height + 7) / 2, inner.width, intro_height);
    frame.render_widget(
        Paragraph::new(intro).alignment(Alignment::Center).wrap(Wrap { trim: true }),
        intro_area,
    );

    // One row per suggestion, with a gap between them
    app.suggestion_areas.clear();
    let mut y = intro_area.y + intro_area.height + 1;
    for (i, suggestion) in SUGGESTIONS.iter().enumerate() {
        if y >= inner.y + inner.height {
            break;
        }
        let label = format!(" [{}] {} ", i + 1, suggestion);
        let width = (label.chars().count() as u16).min(inner.width);
        let x = inner.x + inner.width.saturating_sub(width) / 2;
        let row = Rect::new(x, y, width, 1);

        frame.render_widget(
            Paragraph::new(label).style(Style::default().fg(Color::Blue).bg(Color::Black)),
            row,
        );
        app.suggestion_areas.push(row);
        y += 2;
    }
}

fn message_lines(msg: &ChatMessage) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let time = format_time(&msg.timestamp);

    match msg.role {
        ChatRole::User => {
            lines.push(Line::from(vec![
                Span::styled("You", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
                Span::styled(format!("  {}", time), Style::default().fg(Color::Gray)),
            ]));
            for line in msg.content.lines() {
                lines.push(Line::from(Span::styled(line.to_string(), Style::default().fg(Color::Cyan))));
            }
        }
        ChatRole::Assistant => {
            let (label_color, body_style) = if msg.is_error {
                (Color::Red, Style::default().fg(Color::Red))
            } else {
                (Color::Yellow, Style::default())
            };

            let mut header = vec![
                Span::styled("Support", Style::default().fg(label_color).add_modifier(Modifier::BOLD)),
                Span::styled(format!("  {}", time), Style::default().fg(Color::Gray)),
            ];
            if let Some(intent) = &msg.intent {
                header.push(Span::raw("  "));
                header.push(Span::styled(
                    format!("[{}]", intent),
                    Style::default().fg(Color::Magenta),
                ));
            }
            lines.push(Line::from(header));

            for line in msg.content.lines() {
                lines.push(parse_markdown_line(line, body_style));
            }
        }
    }

    lines.push(Line::default());
    lines
}

/// Rows the input box shows, capped at MAX_INPUT_LINES
fn input_rows(input: &str) -> u16 {
    let breaks = input.matches('\n').count().min(MAX_INPUT_LINES as usize - 1);
    breaks as u16 + 1
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" Conversation ({}) ", app.session.conversation().len()));

    let inner = block.inner(area);
    app.chat_height = inner.height;

    let mut lines: Vec<Line> = app
        .session
        .conversation()
        .messages()
        .iter()
        .flat_map(message_lines)
        .collect();

    if app.is_pending() {
        lines.push(Line::from(Span::styled(
            "Support",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("typing{}", dots),
            Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });

    // Count rows with the same word wrapping the widget renders with
    let total = u16::try_from(chat.line_count(inner.width)).unwrap_or(u16::MAX);
    app.chat_max_scroll = total.saturating_sub(inner.height);
    if app.follow_bottom {
        app.chat_scroll = app.chat_max_scroll;
    } else {
        app.chat_scroll = app.chat_scroll.min(app.chat_max_scroll);
    }

    let chat = chat.block(block).scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_error_banner(app: &App, frame: &mut Frame, area: Rect) {
    let Some(err) = app.session.last_error() else {
        return;
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Error (Esc to dismiss) ");

    let banner = Paragraph::new(err.to_string())
        .style(Style::default().fg(Color::Red))
        .block(block);

    frame.render_widget(banner, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let pending = app.is_pending();
    let border_color = if pending { Color::DarkGray } else { Color::Yellow };
    let title = if pending { " Waiting for reply... " } else { " Type your message... " };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let inner = input_block.inner(area);
    let inner_width = inner.width as usize;
    let visible_rows = inner.height as usize;
    let (cursor_line, cursor_col) = app.cursor_line_col();

    // Keep the cursor's line and column in view
    let first_line = if visible_rows == 0 {
        0
    } else {
        (cursor_line + 1).saturating_sub(visible_rows)
    };
    let col_offset = if inner_width == 0 || cursor_col < inner_width {
        0
    } else {
        cursor_col - inner_width + 1
    };

    let visible: Vec<Line> = app
        .input
        .split('\n')
        .skip(first_line)
        .take(visible_rows)
        .map(|line| Line::from(line.chars().skip(col_offset).take(inner_width).collect::<String>()))
        .collect();

    let text_style = if pending {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Cyan)
    };
    let input = Paragraph::new(Text::from(visible))
        .style(text_style)
        .block(input_block);

    frame.render_widget(input, area);

    if !pending {
        let cursor_x = (cursor_col - col_offset) as u16;
        let cursor_y = (cursor_line - first_line) as u16;
        frame.set_cursor_position((inner.x + cursor_x, inner.y + cursor_y));
    }
}
