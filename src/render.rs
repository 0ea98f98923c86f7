//! Projection of status documents onto a [`StatusView`].

use tracing::trace;

use crate::document::StatusDocument;
use crate::format::FormatRules;
use crate::view::StatusView;

/// Text written to the failure element when a poll cycle fails.
pub const FAILURE_MESSAGE: &str = "Update failed.";

/// Identifier of the element reserved for the failure message.
pub const DEFAULT_FAILURE_ELEMENT: &str = "status";

/// Counts from one render pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderReport {
    /// Fields written to a matching element.
    pub written: usize,
    /// Fields with no matching element.
    pub skipped: usize,
}

/// Writes documents and failures onto a view.
#[derive(Debug, Clone)]
pub struct Renderer {
    rules: FormatRules,
    failure_element: String,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(FormatRules::default(), DEFAULT_FAILURE_ELEMENT)
    }
}

impl Renderer {
    pub fn new(rules: FormatRules, failure_element: impl Into<String>) -> Self {
        Self {
            rules,
            failure_element: failure_element.into(),
        }
    }

    pub fn rules(&self) -> &FormatRules {
        &self.rules
    }

    pub fn failure_element(&self) -> &str {
        &self.failure_element
    }

    /// Write every field of `doc` to the element of the same identifier.
    ///
    /// Fields are visited in document order. Fields without an element are
    /// skipped.
    pub fn render<V: StatusView + ?Sized>(&self, view: &mut V, doc: &StatusDocument) -> RenderReport {
        let mut report = RenderReport::default();
        for (key, value) in doc.iter() {
            match view.element(key) {
                Some(element) => {
                    element.set_text(self.rules.format(key, value));
                    report.written += 1;
                }
                None => {
                    trace!(field = key, "no element for field");
                    report.skipped += 1;
                }
            }
        }
        report
    }

    /// Put [`FAILURE_MESSAGE`] into the failure element and touch nothing else.
    ///
    /// Returns `false` if the view has no failure element.
    pub fn render_failure<V: StatusView + ?Sized>(&self, view: &mut V) -> bool {
        match view.element(&self.failure_element) {
            Some(element) => {
                element.set_text(FAILURE_MESSAGE);
                true
            }
            None => false,
        }
    }
}
