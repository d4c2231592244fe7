//! UI rendering for the TUI.
//!
//! Defines the layout and renders both screens.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::app::{App, Screen, SetupField};
use crate::app::ChatContext;
use crate::config::mask_secret;
use crate::session::ChatRole;

/// Renders the entire UI.
pub fn render(frame: &mut Frame, app: &App, context: Option<&ChatContext>) {
    match app.screen {
        Screen::Setup => render_setup(frame, app),
        Screen::Chat => render_chat(frame, app, context),
    }
}

/// Renders the connection setup form.
fn render_setup(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(2),
        ])
        .split(area);

    let title = Paragraph::new(Line::from(Span::styled(
        " sqlchat - connect to a database ",
        Style::default().add_modifier(Modifier::BOLD),
    )));
    frame.render_widget(title, layout[0]);

    let mut lines = Vec::new();
    lines.push(Line::raw(""));
    for field in SetupField::visible(app.form.mode) {
        let active = *field == app.form.active;
        let marker = if active { "> " } else { "  " };
        let value = if field.is_secret() {
            mask_secret(app.form.value(*field))
        } else {
            app.form.value(*field).to_string()
        };

        let style = if active {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::styled(marker, style),
            Span::styled(format!("{:<16}", field.label()), style),
            Span::styled(value, style),
        ]));
    }
    lines.push(Line::raw(""));
    if let Some(error) = &app.form.error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    }

    let form = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Connection "),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(form, layout[1]);

    let hints = Paragraph::new(
        "Tab/Up/Down move, Left/Right switch database mode, Enter connect, Ctrl-C quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(hints, layout[2]);
}

/// Renders the chat screen.
fn render_chat(frame: &mut Frame, app: &App, context: Option<&ChatContext>) {
    let area = frame.area();

    let activity_height = if app.is_processing { 6 } else { 0 };
    let status_height = if app.error.is_some() || app.notice.is_some() {
        2
    } else {
        0
    };

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(activity_height),
            Constraint::Length(status_height),
            Constraint::Length(3),
        ])
        .split(area);

    render_header(frame, layout[0], context);
    render_transcript(frame, layout[1], app, context);
    if app.is_processing {
        render_activity(frame, layout[2], app);
    }
    if status_height > 0 {
        render_status(frame, layout[3], app);
    }
    render_input(frame, layout[4], app);
}

fn render_header(frame: &mut Frame, area: Rect, context: Option<&ChatContext>) {
    let info = context.map(|c| c.connection_info()).unwrap_or("(not connected)");
    let line = Line::from(vec![
        Span::styled(" sqlchat ", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(info, Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_transcript(frame: &mut Frame, area: Rect, app: &App, context: Option<&ChatContext>) {
    let mut lines: Vec<Line> = Vec::new();

    if let Some(context) = context {
        for message in context.store().messages() {
            let (label, style) = match message.role {
                ChatRole::User => ("You", Style::default().fg(Color::Green)),
                ChatRole::Assistant => ("Assistant", Style::default().fg(Color::Cyan)),
            };
            lines.push(Line::from(Span::styled(
                label,
                style.add_modifier(Modifier::BOLD),
            )));
            for text_line in message.content.lines() {
                lines.push(Line::raw(text_line.to_string()));
            }
            lines.push(Line::raw(""));
        }
    }

    // chat_scroll counts lines from the bottom
    let visible = area.height.saturating_sub(2) as usize;
    let total = lines.len();
    let offset = total
        .saturating_sub(visible)
        .saturating_sub(app.chat_scroll.min(total));

    let transcript = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Chat "))
        .wrap(Wrap { trim: false })
        .scroll((offset as u16, 0));
    frame.render_widget(transcript, area);
}

fn render_activity(frame: &mut Frame, area: Rect, app: &App) {
    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        format!("{} thinking", app.spinner_frame()),
        Style::default().fg(Color::Yellow),
    )));
    if !app.streaming.is_empty() {
        // Show the tail of the stream; earlier text scrolls away
        let tail: String = app
            .streaming
            .lines()
            .rev()
            .take(2)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect::<Vec<_>>()
            .join("\n");
        for text_line in tail.lines() {
            lines.push(Line::from(Span::styled(
                text_line.to_string(),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }
    for entry in &app.activity {
        lines.push(Line::from(Span::styled(
            entry.clone(),
            Style::default().fg(Color::DarkGray),
        )));
    }

    let activity = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Working "))
        .wrap(Wrap { trim: false });
    frame.render_widget(activity, area);
}

fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let line = if let Some(error) = &app.error {
        Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        ))
    } else if let Some(notice) = &app.notice {
        Line::from(Span::styled(
            notice.clone(),
            Style::default().fg(Color::Yellow),
        ))
    } else {
        Line::raw("")
    };
    frame.render_widget(Paragraph::new(line).wrap(Wrap { trim: false }), area);
}

fn render_input(frame: &mut Frame, area: Rect, app: &App) {
    let border_style = if app.is_processing {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Cyan)
    };

    let line = Line::from(vec![
        Span::styled(
            "> ",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(app.input.text.clone()),
    ]);

    let input = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(" Ask a question "),
    );
    frame.render_widget(input, area);

    if !app.is_processing {
        // Border (1) + prompt "> " (2)
        let cursor_x = area.x + 1 + 2 + app.input.cursor_column() as u16;
        let cursor_y = area.y + 1;
        frame.set_cursor_position((cursor_x, cursor_y));
    }
}
