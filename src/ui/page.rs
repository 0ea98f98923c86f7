//! Status page view.
//!
//! One row per element: label, identifier, current text, and how long ago
//! it was last written.

use std::time::Duration;

use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Table, TableState},
    Frame,
};

use crate::app::App;
use crate::duration::format_duration;
use crate::render::FAILURE_MESSAGE;
use crate::view::Element;

/// Values written more recently than this are highlighted.
const FRESH_FOR: Duration = Duration::from_secs(2);

/// Render the page as a table.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let page = app.page();

    let header = Row::new(vec![
        Cell::from("Field"),
        Cell::from("Id"),
        Cell::from("Value"),
        Cell::from("Updated"),
    ])
    .height(1)
    .style(app.theme.header);

    let rows: Vec<Row> = page
        .elements()
        .iter()
        .map(|element| {
            Row::new(vec![
                Cell::from(element.label().to_string()),
                Cell::from(element.id().to_string())
                    .style(Style::default().add_modifier(Modifier::DIM)),
                Cell::from(display_text(element)).style(value_style(app, element)),
                Cell::from(
                    element
                        .updated_at()
                        .map(|t| format_duration(t.elapsed()))
                        .unwrap_or_else(|| "-".to_string()),
                ),
            ])
        })
        .collect();

    let widths = [
        Constraint::Fill(2),   // Label
        Constraint::Fill(1),   // Id
        Constraint::Fill(3),   // Value
        Constraint::Length(9), // Updated
    ];

    let selected = app.selected.min(page.len().saturating_sub(1));
    let title = format!(" Status ({} fields) ", page.len());

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(Style::default().fg(app.theme.border)),
        )
        .row_highlight_style(app.theme.selected)
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    state.select(Some(selected));

    frame.render_stateful_widget(table, area, &mut state);
}

fn display_text(element: &Element) -> String {
    if element.text().is_empty() {
        "-".to_string()
    } else {
        element.text().to_string()
    }
}

fn value_style(app: &App, element: &Element) -> Style {
    if element.text() == FAILURE_MESSAGE {
        return Style::default().fg(app.theme.failed);
    }
    match element.updated_at() {
        Some(t) if t.elapsed() < FRESH_FOR => app.theme.fresh,
        _ => Style::default(),
    }
}
