//! # foxwatch
//!
//! A live status page for FoxESPTemp environmental sensors.
//!
//! The device serves its latest readings as a flat JSON object at `/json`.
//! foxwatch fetches that document on a fixed period and writes each field
//! into the page element with the same identifier, formatting timestamp
//! fields as readable dates. A failed cycle writes "Update failed." into a
//! reserved element and leaves every other value as it was.
//!
//! ```text
//!  ┌──────────────┐  document  ┌──────────────┐  Renderer  ┌────────────┐
//!  │ StatusSource │───────────▶│ StatusPoller │───────────▶│ StatusView │
//!  │ (http, file) │            │   (timer)    │            │   (Page)   │
//!  └──────────────┘            └──────────────┘            └────────────┘
//! ```
//!
//! - **[`source`]**: the [`StatusSource`] trait, with [`HttpSource`] for the
//!   device and [`FileSource`] for captured documents
//! - **[`poller`]**: [`StatusPoller`] runs one cycle at a time or on a timer
//! - **[`render`]** and **[`format`]**: field-to-element binding and value display
//! - **[`view`]**: the [`StatusView`] seam and the in-memory [`Page`]
//! - **[`app`]**, **[`events`]**, **[`ui`]**: the terminal front end
//!
//! ## Usage
//!
//! ```bash
//! # Watch a device
//! foxwatch --endpoint http://192.168.1.50
//!
//! # Print the page once and exit
//! foxwatch --endpoint http://192.168.1.50 --once
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use foxwatch::{HttpSource, Page, Renderer, StatusPoller};
//!
//! # tokio_test::block_on(async {
//! let source = HttpSource::builder().endpoint("192.168.1.50").build().unwrap();
//! let page = Arc::new(Mutex::new(Page::from_layout(&foxwatch::view::default_layout())));
//! let poller = StatusPoller::new(Box::new(source), page.clone(), Renderer::default());
//!
//! poller.poll_once().await;
//! println!("{:?}", page.lock().text("temp"));
//! # });
//! ```

pub mod app;
pub mod config;
pub mod document;
pub mod duration;
pub mod error;
pub mod events;
pub mod format;
pub mod logging;
pub mod poller;
pub mod render;
pub mod source;
pub mod ui;
pub mod view;

// Re-export main types for convenience
pub use app::App;
pub use config::Settings;
pub use document::StatusDocument;
pub use error::PollError;
pub use format::{FieldFormat, FormatRules};
pub use poller::{PollOutcome, PollStats, PollerHandle, Sequencing, StatusPoller};
pub use render::{RenderReport, Renderer, FAILURE_MESSAGE};
pub use source::{FileSource, HttpSource, HttpSourceBuilder, StatusSource};
pub use view::{Element, ElementSpec, Page, StatusView};
