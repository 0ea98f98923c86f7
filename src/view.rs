//! The page that status fields are projected onto.
//!
//! A [`StatusView`] resolves element identifiers to optional bindings. A
//! missing element is not an error; the caller simply has nothing to write.
//! [`Page`] is the in-memory implementation used by the terminal UI.

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Anything that exposes identifier-addressed text elements.
pub trait StatusView: Send {
    /// Resolve the element with identifier `id`, if the view has one.
    fn element(&mut self, id: &str) -> Option<&mut Element>;
}

/// Layout entry for one element: identifier plus a human-readable label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSpec {
    pub id: String,
    #[serde(default)]
    pub label: String,
}

impl ElementSpec {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    /// Label to show, falling back to the identifier.
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.id
        } else {
            &self.label
        }
    }
}

/// The start page layout served by the firmware, plus a status line.
pub fn default_layout() -> Vec<ElementSpec> {
    vec![
        ElementSpec::new("ts", "UpdateTS"),
        ElementSpec::new("lastsht4xheat", "LastSHT4xHeaterTS"),
        ElementSpec::new("temp", "Temperature (C)"),
        ElementSpec::new("hum", "Humidity (%)"),
        ElementSpec::new("pm010", "PM 1.0 (µg/m³)"),
        ElementSpec::new("pm025", "PM 2.5 (µg/m³)"),
        ElementSpec::new("pm040", "PM 4.0 (µg/m³)"),
        ElementSpec::new("pm100", "PM 10.0 (µg/m³)"),
        ElementSpec::new("press", "Pressure (hPa)"),
        ElementSpec::new("raing", "Rain (mm/min)"),
        ElementSpec::new("status", "Status"),
    ]
}

/// A single text element on the page.
#[derive(Debug, Clone, Serialize)]
pub struct Element {
    id: String,
    label: String,
    text: String,
    /// Number of writes since creation.
    #[serde(skip)]
    writes: u64,
    #[serde(skip)]
    updated_at: Option<Instant>,
}

impl Element {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            text: String::new(),
            writes: 0,
            updated_at: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn writes(&self) -> u64 {
        self.writes
    }

    /// When the element was last written, if ever.
    pub fn updated_at(&self) -> Option<Instant> {
        self.updated_at
    }

    /// Replace the displayed text.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.writes += 1;
        self.updated_at = Some(Instant::now());
    }
}

impl From<&ElementSpec> for Element {
    fn from(spec: &ElementSpec) -> Self {
        Element::new(spec.id.clone(), spec.display_label())
    }
}

/// An ordered set of elements addressed by identifier.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Page {
    elements: Vec<Element>,
}

impl Page {
    /// Create an empty page.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a page from a layout. Later duplicates of an identifier are dropped.
    pub fn from_layout<'a, I>(layout: I) -> Self
    where
        I: IntoIterator<Item = &'a ElementSpec>,
    {
        let mut page = Self::new();
        for spec in layout {
            page.push(Element::from(spec));
        }
        page
    }

    /// Add an element unless one with the same identifier already exists.
    pub fn push(&mut self, element: Element) -> bool {
        if self.get(element.id()).is_some() {
            return false;
        }
        self.elements.push(element);
        true
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn get(&self, id: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    /// Current text of an element.
    pub fn text(&self, id: &str) -> Option<&str> {
        self.get(id).map(Element::text)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl StatusView for Page {
    fn element(&mut self, id: &str) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_matches_device_page() {
        let page = Page::from_layout(&default_layout());
        assert_eq!(page.len(), 11);
        assert_eq!(page.get("ts").unwrap().label(), "UpdateTS");
        assert_eq!(page.get("raing").unwrap().label(), "Rain (mm/min)");
        assert!(page.get("status").is_some());
    }

    #[test]
    fn test_lookup_absent_is_none() {
        let mut page = Page::from_layout(&default_layout());
        assert!(page.element("unknownfield").is_none());
    }

    #[test]
    fn test_set_text_tracks_writes() {
        let mut page = Page::from_layout(&[ElementSpec::new("temp", "")]);
        assert_eq!(page.text("temp"), Some(""));
        assert!(page.get("temp").unwrap().updated_at().is_none());

        page.element("temp").unwrap().set_text("21.5");
        let el = page.get("temp").unwrap();
        assert_eq!(el.text(), "21.5");
        assert_eq!(el.writes(), 1);
        assert!(el.updated_at().is_some());
        // Empty label falls back to the identifier
        assert_eq!(el.label(), "temp");
    }

    #[test]
    fn test_duplicate_ids_dropped() {
        let layout = vec![ElementSpec::new("a", "first"), ElementSpec::new("a", "second")];
        let page = Page::from_layout(&layout);
        assert_eq!(page.len(), 1);
        assert_eq!(page.get("a").unwrap().label(), "first");
    }
}
