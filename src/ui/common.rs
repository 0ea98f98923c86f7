//! Common UI components: header bar, status bar, and help overlay.

use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::App;
use crate::duration::format_duration;

/// Render the header bar with link status and poll counters.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let state = app.link_state();
    let stats = app.stats();

    let mut spans = vec![
        Span::styled(" ● ", app.theme.link_style(state)),
        Span::styled("FOXESPTEMP ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("│ "),
        Span::raw(app.source_description().to_string()),
        Span::raw(" │ "),
        Span::styled(state.symbol(), app.theme.link_style(state)),
        Span::raw(" │ "),
        Span::styled(
            format!("{}", stats.rendered),
            Style::default().fg(app.theme.online),
        ),
        Span::raw(" ok "),
        if stats.failed > 0 {
            Span::styled(
                format!("{}", stats.failed),
                Style::default().fg(app.theme.failed),
            )
        } else {
            Span::styled("0", Style::default().add_modifier(Modifier::DIM))
        },
        Span::raw(" failed"),
    ];

    let in_flight = app.in_flight();
    if in_flight > 0 {
        spans.push(Span::raw(" │ "));
        spans.push(Span::styled(
            format!("{} pending", in_flight),
            Style::default().fg(app.theme.waiting),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Render the status bar at the bottom.
///
/// Shows the countdown to the next poll, the age of the last update, and
/// available controls. Temporary status messages take precedence.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    let stats = app.stats();
    let next = app
        .next_poll_in()
        .map(|d| format!("Next poll in {}", format_duration(d)))
        .unwrap_or_else(|| "Timer stopped".to_string());
    let last = stats
        .last_success
        .map(|t| format!("Updated {} ago", format_duration(t.elapsed())))
        .unwrap_or_else(|| "No update yet".to_string());

    let status = format!(" {} | {} | r:poll e:export ?:help q:quit", next, last);
    let paragraph = Paragraph::new(status).style(Style::default().add_modifier(Modifier::DIM));
    frame.render_widget(paragraph, area);
}

/// Render the help overlay with keyboard shortcuts.
///
/// Displayed as a centered modal on top of the page.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        Line::from("  ↑/↓ j/k     Move selection"),
        Line::from("  Home/End    Jump to first/last"),
        Line::from("  r           Poll now"),
        Line::from("  e           Export page to JSON"),
        Line::from("  q Esc       Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let paragraph = Paragraph::new(help_text).block(block);

    let help_width = 38u16.min(area.width.saturating_sub(4));
    let help_height = 11u16.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(help_width)) / 2;
    let y = area.y + (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    frame.render_widget(Clear, help_area);
    frame.render_widget(paragraph, help_area);
}

/// Shown instead of the page when the terminal is too small.
pub fn render_too_small(frame: &mut Frame, area: Rect) {
    let msg = format!(
        "Terminal too small: {}x{}\nMinimum: {}x{}",
        area.width,
        area.height,
        super::MIN_WIDTH,
        super::MIN_HEIGHT
    );
    let paragraph = Paragraph::new(msg)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Yellow));
    let centered = Rect::new(0, (area.height / 2).saturating_sub(1), area.width, 2.min(area.height));
    frame.render_widget(paragraph, centered);
}
