//! Layered settings.
//!
//! Built-in defaults are overridden by an optional TOML file, then by
//! `FOXWATCH_*` environment variables, then by command-line flags.
//!
//! ```toml
//! endpoint = "http://192.168.1.50"
//! interval = "30s"
//! failure_element = "status"
//! timestamp_fields = ["ts", "lastsht4xheat"]
//!
//! [[elements]]
//! id = "temp"
//! label = "Temperature (C)"
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Deserializer};

use crate::duration::parse_duration;
use crate::format::{FormatRules, DEFAULT_TIMESTAMP_FIELDS};
use crate::poller::{Sequencing, DEFAULT_INTERVAL};
use crate::render::{Renderer, DEFAULT_FAILURE_ELEMENT};
use crate::source::DEFAULT_STATUS_PATH;
use crate::view::{default_layout, Element, ElementSpec, Page};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "FOXWATCH";

/// Everything needed to build a poller and its page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Device base URL, e.g. "http://192.168.1.50".
    pub endpoint: Option<String>,
    /// Path of the status document.
    pub path: String,
    /// Period between poll cycles.
    #[serde(deserialize_with = "de_duration")]
    pub interval: Duration,
    /// Optional request timeout; none by default.
    #[serde(deserialize_with = "de_opt_duration")]
    pub timeout: Option<Duration>,
    /// Element that receives the failure message.
    pub failure_element: String,
    /// Fields rendered as epoch-second timestamps.
    pub timestamp_fields: Vec<String>,
    /// Drop responses that complete after a newer one was applied.
    pub discard_stale: bool,
    /// Poll once at startup instead of waiting a full period.
    pub poll_on_start: bool,
    /// Page layout.
    pub elements: Vec<ElementSpec>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: None,
            path: DEFAULT_STATUS_PATH.to_string(),
            interval: DEFAULT_INTERVAL,
            timeout: None,
            failure_element: DEFAULT_FAILURE_ELEMENT.to_string(),
            timestamp_fields: DEFAULT_TIMESTAMP_FIELDS.iter().map(|s| s.to_string()).collect(),
            discard_stale: false,
            poll_on_start: true,
            elements: default_layout(),
        }
    }
}

impl Settings {
    /// Load settings from an optional file plus `FOXWATCH_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    fn load_with_prefix(path: Option<&Path>, prefix: &str) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(Environment::with_prefix(prefix));

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            bail!("interval must be greater than zero");
        }
        if self.failure_element.trim().is_empty() {
            bail!("failure_element must not be empty");
        }
        if let Some(spec) = self.elements.iter().find(|e| e.id.trim().is_empty()) {
            bail!("element with label {:?} has an empty id", spec.label);
        }
        Ok(())
    }

    pub fn sequencing(&self) -> Sequencing {
        if self.discard_stale {
            Sequencing::DiscardStale
        } else {
            Sequencing::Unordered
        }
    }

    pub fn renderer(&self) -> Renderer {
        Renderer::new(
            FormatRules::with_timestamps(self.timestamp_fields.iter().cloned()),
            self.failure_element.clone(),
        )
    }

    /// Build the page, adding the failure element if the layout lacks it.
    pub fn page(&self) -> Page {
        let mut page = Page::from_layout(&self.elements);
        page.push(Element::new(self.failure_element.clone(), "Status"));
        page
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DurationValue {
    Millis(u64),
    Text(String),
}

impl DurationValue {
    fn into_duration(self) -> Result<Duration> {
        match self {
            DurationValue::Millis(ms) => Ok(Duration::from_millis(ms)),
            DurationValue::Text(s) => match s.trim().parse::<u64>() {
                Ok(ms) => Ok(Duration::from_millis(ms)),
                Err(_) => parse_duration(&s),
            },
        }
    }
}

fn de_duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    DurationValue::deserialize(deserializer)?
        .into_duration()
        .map_err(serde::de::Error::custom)
}

fn de_opt_duration<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Duration>, D::Error> {
    Option::<DurationValue>::deserialize(deserializer)?
        .map(DurationValue::into_duration)
        .transpose()
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn toml_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::load_with_prefix(None, "FOXWATCH_TEST_DEFAULTS").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.interval, Duration::from_secs(30));
        assert_eq!(settings.path, "/json");
        assert_eq!(settings.sequencing(), Sequencing::Unordered);
        assert!(settings.timeout.is_none());
    }

    #[test]
    fn test_load_file() {
        let file = toml_file(
            r#"
            endpoint = "http://192.168.1.50"
            interval = "10s"
            timeout = 2500
            failure_element = "ts"
            discard_stale = true

            [[elements]]
            id = "ts"
            label = "UpdateTS"

            [[elements]]
            id = "temp"
            "#,
        );

        let settings = Settings::load_with_prefix(Some(file.path()), "FOXWATCH_TEST_FILE").unwrap();

        assert_eq!(settings.endpoint.as_deref(), Some("http://192.168.1.50"));
        assert_eq!(settings.interval, Duration::from_secs(10));
        assert_eq!(settings.timeout, Some(Duration::from_millis(2500)));
        assert_eq!(settings.sequencing(), Sequencing::DiscardStale);
        assert_eq!(settings.elements.len(), 2);
        assert_eq!(settings.elements[1].display_label(), "temp");

        // Failure element is already in the layout, so nothing is added
        let page = settings.page();
        assert_eq!(page.len(), 2);
    }

    #[test]
    fn test_env_overrides_file() {
        let file = toml_file(r#"endpoint = "http://from-file""#);
        std::env::set_var("FOXWATCH_TEST_ENV_ENDPOINT", "http://from-env");
        std::env::set_var("FOXWATCH_TEST_ENV_INTERVAL", "45000");

        let settings = Settings::load_with_prefix(Some(file.path()), "FOXWATCH_TEST_ENV").unwrap();

        assert_eq!(settings.endpoint.as_deref(), Some("http://from-env"));
        assert_eq!(settings.interval, Duration::from_secs(45));
    }

    #[test]
    fn test_rejects_zero_interval() {
        let file = toml_file(r#"interval = "0s""#);
        assert!(Settings::load_with_prefix(Some(file.path()), "FOXWATCH_TEST_ZERO").is_err());
    }

    #[test]
    fn test_rejects_bad_interval() {
        let file = toml_file(r#"interval = "soon""#);
        assert!(Settings::load_with_prefix(Some(file.path()), "FOXWATCH_TEST_BAD").is_err());
    }

    #[test]
    fn test_page_adds_missing_failure_element() {
        let settings = Settings {
            elements: vec![ElementSpec::new("temp", "Temperature")],
            ..Settings::default()
        };
        let page = settings.page();
        assert_eq!(page.len(), 2);
        assert_eq!(page.get("status").unwrap().label(), "Status");
    }

    #[test]
    fn test_renderer_uses_timestamp_fields() {
        let settings = Settings {
            timestamp_fields: vec!["boot".to_string()],
            ..Settings::default()
        };
        let renderer = settings.renderer();
        assert_eq!(
            renderer.rules().format("boot", &serde_json::json!(0)),
            "0 (NEVER)"
        );
        assert_eq!(renderer.rules().format("ts", &serde_json::json!(0)), "0");
    }
}
