//! Terminal UI rendering using ratatui.
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ Header (common::render_header)       │
//! ├──────────────────────────────────────┤
//! │                                      │
//! │ Status page table (page::render)     │
//! │                                      │
//! ├──────────────────────────────────────┤
//! │ Status Bar (common::render_status)   │
//! └──────────────────────────────────────┘
//!         ↑
//!    Help overlay rendered on top (common::render_help)
//! ```

pub mod common;
pub mod page;
pub mod theme;

pub use theme::Theme;

use ratatui::layout::{Constraint, Layout};
use ratatui::Frame;

use crate::app::App;

/// Minimum terminal size for usable display
pub const MIN_WIDTH: u16 = 40;
pub const MIN_HEIGHT: u16 = 8;

/// Draw one frame.
pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        common::render_too_small(frame, area);
        return;
    }

    let chunks = Layout::vertical([
        Constraint::Length(1), // Header bar
        Constraint::Min(4),    // Page
        Constraint::Length(1), // Status bar
    ])
    .split(area);

    common::render_header(frame, app, chunks[0]);
    page::render(frame, app, chunks[1]);
    common::render_status_bar(frame, app, chunks[2]);

    if app.show_help {
        common::render_help(frame, app, area);
    }
}
