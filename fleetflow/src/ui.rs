//! UI rendering for the TUI.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use fleetflow_core::journal::Severity;

use crate::app::App;

/// Border color for the status block
const BORDER_STATUS: Color = Color::Rgb(0, 150, 150);
/// Border color for the journal block
const BORDER_JOURNAL: Color = Color::Rgb(80, 160, 80);
/// Active tracking indicator color
const TRACKING_ACTIVE: Color = Color::Rgb(50, 205, 50);
/// Idle tracking indicator color
const TRACKING_IDLE: Color = Color::Rgb(128, 128, 128);

/// Render the application UI.
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::vertical([
        Constraint::Length(4),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .split(frame.area());

    render_status(frame, app, chunks[0]);
    render_journal(frame, app, chunks[1]);
    render_footer(frame, chunks[2]);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let state = if app.tracking {
        Span::styled(
            "TRACKING",
            Style::default()
                .fg(TRACKING_ACTIVE)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled("idle", Style::default().fg(TRACKING_IDLE))
    };

    let fix = match app.latest {
        Some(sample) => format!("{:.5}, {:.5}", sample.latitude, sample.longitude),
        None => "no fix yet".to_string(),
    };

    let lines = vec![
        Line::from(vec![Span::raw("Session:  "), state]),
        Line::from(format!("Position: {fix}")),
    ];

    let block = Block::default()
        .title(" Fleet Flow ")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_STATUS));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_journal(frame: &mut Frame, app: &App, area: Rect) {
    // Newest entries last; keep only what fits so the tail stays visible
    let visible = (area.height as usize).saturating_sub(2);
    let skip = app.entries.len().saturating_sub(visible);

    let rows: Vec<Row> = app
        .entries
        .iter()
        .skip(skip)
        .map(|entry| {
            Row::new(vec![
                Cell::from(entry.timestamp.clone()).style(Style::default().fg(TRACKING_IDLE)),
                Cell::from(entry.message.clone())
                    .style(Style::default().fg(severity_color(entry.severity))),
            ])
        })
        .collect();

    let block = Block::default()
        .title(" Journal ")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_JOURNAL));

    let table = Table::new(rows, [Constraint::Length(8), Constraint::Min(0)])
        .column_spacing(2)
        .block(block);

    frame.render_widget(table, area);
}

fn render_footer(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(" s start/stop   x cancel from notification   c clear journal   q quit")
        .style(Style::default().fg(TRACKING_IDLE));
    frame.render_widget(help, area);
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Error => Color::Red,
        Severity::Warning => Color::Yellow,
        Severity::Info => Color::Reset,
        Severity::Success => Color::Green,
    }
}
