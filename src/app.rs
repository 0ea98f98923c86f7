//! Application state for the terminal front end.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::runtime::Handle;

use crate::poller::{PollStats, PollerHandle, StatusPoller};
use crate::ui::Theme;
use crate::view::Page;

/// Connection state shown in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No cycle has completed yet.
    Waiting,
    /// The last completed cycle rendered a document.
    Online,
    /// The last completed cycle failed.
    Failed,
}

impl LinkState {
    pub fn from_stats(stats: &PollStats) -> Self {
        if stats.last_failed() {
            LinkState::Failed
        } else if stats.last_success.is_some() {
            LinkState::Online
        } else {
            LinkState::Waiting
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            LinkState::Waiting => "WAIT",
            LinkState::Online => "OK",
            LinkState::Failed => "FAIL",
        }
    }
}

/// Main application state.
pub struct App {
    pub running: bool,
    pub show_help: bool,
    pub selected: usize,
    pub theme: Theme,

    poller: StatusPoller<Page>,
    timer: Option<PollerHandle>,
    runtime: Handle,

    // Status message (temporary feedback)
    pub status_message: Option<(String, Instant)>,
}

impl App {
    /// Create the app around a poller and (optionally) its running timer.
    pub fn new(poller: StatusPoller<Page>, timer: Option<PollerHandle>, runtime: Handle) -> Self {
        Self {
            running: true,
            show_help: false,
            selected: 0,
            theme: Theme::auto_detect(),
            poller,
            timer,
            runtime,
            status_message: None,
        }
    }

    /// Returns a description of the status source.
    pub fn source_description(&self) -> &str {
        self.poller.source_description()
    }

    /// Copy of the page for rendering, taken under the view lock.
    pub fn page(&self) -> Page {
        self.poller.view().lock().clone()
    }

    pub fn stats(&self) -> PollStats {
        self.poller.stats()
    }

    pub fn link_state(&self) -> LinkState {
        LinkState::from_stats(&self.stats())
    }

    pub fn in_flight(&self) -> usize {
        self.poller.in_flight()
    }

    /// Time until the timer fires again, if it is running.
    pub fn next_poll_in(&self) -> Option<Duration> {
        self.timer
            .as_ref()
            .filter(|t| t.is_running())
            .map(PollerHandle::next_poll_in)
    }

    /// Start an extra cycle right away. The timer is unaffected.
    pub fn poll_now(&mut self) {
        let poller = self.poller.clone();
        self.runtime.spawn(async move {
            poller.poll_once().await;
        });
        self.set_status_message("Polling...".to_string());
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired (3 seconds).
    pub fn get_status_message(&self) -> Option<&str> {
        if let Some((msg, time)) = &self.status_message {
            if time.elapsed() < Duration::from_secs(3) {
                return Some(msg);
            }
        }
        None
    }

    pub fn select_next(&mut self) {
        let max = self.page().len().saturating_sub(1);
        self.selected = (self.selected + 1).min(max);
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.page().len().saturating_sub(1);
    }

    /// Toggle the help overlay.
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Stop the timer and signal the main loop to exit.
    pub fn quit(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop();
        }
        self.running = false;
    }

    /// Export the current page to a file.
    pub fn export_state(&self, path: &Path) -> Result<()> {
        export_page(&self.page(), self.source_description(), path)
    }
}

/// Write a page as pretty JSON: source description plus one entry per element.
pub fn export_page(page: &Page, source: &str, path: &Path) -> Result<()> {
    let export = serde_json::json!({
        "source": source,
        "exported_at": chrono::Local::now().to_rfc3339(),
        "elements": page.elements(),
    });
    let json = serde_json::to_string_pretty(&export)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{default_layout, ElementSpec};
    use tempfile::tempdir;

    #[test]
    fn test_link_state() {
        let mut stats = PollStats::default();
        assert_eq!(LinkState::from_stats(&stats), LinkState::Waiting);

        stats.last_success = Some(Instant::now());
        assert_eq!(LinkState::from_stats(&stats), LinkState::Online);

        stats.last_failure = Some(Instant::now() + Duration::from_millis(1));
        assert_eq!(LinkState::from_stats(&stats), LinkState::Failed);
        assert_eq!(LinkState::Failed.symbol(), "FAIL");
    }

    #[test]
    fn test_export_page() {
        let mut page = Page::from_layout(&[ElementSpec::new("temp", "Temperature (C)")]);
        crate::view::StatusView::element(&mut page, "temp")
            .unwrap()
            .set_text("21.50");

        let dir = tempdir().unwrap();
        let path = dir.path().join("export.json");
        export_page(&page, "http: http://dev/json", &path).unwrap();

        let exported: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(exported["source"], "http: http://dev/json");
        assert_eq!(exported["elements"][0]["id"], "temp");
        assert_eq!(exported["elements"][0]["label"], "Temperature (C)");
        assert_eq!(exported["elements"][0]["text"], "21.50");
        assert!(exported["elements"][0].get("writes").is_none());
    }

    #[test]
    fn test_default_page_exports_all_elements() {
        let page = Page::from_layout(&default_layout());
        let dir = tempdir().unwrap();
        let path = dir.path().join("export.json");
        export_page(&page, "test", &path).unwrap();

        let exported: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(exported["elements"].as_array().unwrap().len(), 11);
    }
}
