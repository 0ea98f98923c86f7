//! Field formatting rules.
//!
//! Most fields are shown as-is. A few are epoch-second timestamps that get
//! an ISO-8601 rendering appended, with `NEVER` standing in for zero.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Utc};
use serde_json::Value;

use crate::document::{display_value, loosely_equals_zero, numeric_value};

/// Sentinel shown instead of a timestamp when the raw value is zero.
pub const NEVER: &str = "NEVER";

/// Shown instead of a timestamp when the value has no numeric meaning.
pub const INVALID: &str = "INVALID";

/// Fields the firmware reports as epoch seconds.
pub const DEFAULT_TIMESTAMP_FIELDS: [&str; 2] = ["ts", "lastsht4xheat"];

/// Largest absolute millisecond offset a browser `Date` accepts.
const MAX_DATE_MILLIS: f64 = 8.64e15;

/// The Gregorian calendar repeats every 400 years (146097 days).
const MILLIS_PER_400_YEARS: i64 = 146_097 * 86_400_000;

/// How the value of one field is turned into display text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldFormat {
    /// The value's string form.
    #[default]
    Plain,
    /// `"<raw> (<ISO-8601>)"`, or `"<raw> (NEVER)"` when the value is 0.
    EpochSeconds,
}

impl FieldFormat {
    /// Format a single value.
    pub fn apply(self, value: &Value) -> String {
        match self {
            FieldFormat::Plain => display_value(value),
            FieldFormat::EpochSeconds => format_epoch_seconds(value),
        }
    }
}

/// Lookup table from field name to [`FieldFormat`].
///
/// Keys without an entry use [`FieldFormat::Plain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatRules {
    rules: HashMap<String, FieldFormat>,
}

impl Default for FormatRules {
    fn default() -> Self {
        Self::with_timestamps(DEFAULT_TIMESTAMP_FIELDS)
    }
}

impl FormatRules {
    /// A table where every field is plain.
    pub fn plain() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// A table marking the given fields as epoch-second timestamps.
    pub fn with_timestamps<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rules = fields
            .into_iter()
            .map(|f| (f.into(), FieldFormat::EpochSeconds))
            .collect();
        Self { rules }
    }

    /// Set the rule for one field.
    pub fn set(&mut self, field: impl Into<String>, format: FieldFormat) {
        self.rules.insert(field.into(), format);
    }

    /// The rule that applies to `field`.
    pub fn rule_for(&self, field: &str) -> FieldFormat {
        self.rules.get(field).copied().unwrap_or_default()
    }

    /// Format `value` using the rule for `field`.
    pub fn format(&self, field: &str, value: &Value) -> String {
        self.rule_for(field).apply(value)
    }
}

/// Format an epoch-seconds value as `"<raw> (<ISO-8601>)"`.
pub fn format_epoch_seconds(value: &Value) -> String {
    let raw = display_value(value);
    let stamp = if loosely_equals_zero(value) {
        NEVER.to_string()
    } else {
        numeric_value(value)
            .and_then(iso_from_seconds)
            .unwrap_or_else(|| INVALID.to_string())
    };
    format!("{} ({})", raw, stamp)
}

/// Render seconds since the epoch as `YYYY-MM-DDTHH:MM:SS.sssZ`.
///
/// Sub-millisecond precision is truncated. Years outside 0000..=9999 use
/// the signed six-digit form (`+010000`, `-000001`). Returns `None` outside
/// the range a browser `Date` can represent.
pub fn iso_from_seconds(secs: f64) -> Option<String> {
    let millis = (secs * 1000.0).trunc();
    if !millis.is_finite() || millis.abs() > MAX_DATE_MILLIS {
        return None;
    }
    let millis = millis as i64;

    // Shift by whole 400-year cycles so the instant fits chrono's range,
    // then add the cycles back onto the year.
    let cycles = millis / MILLIS_PER_400_YEARS;
    let dt = DateTime::<Utc>::from_timestamp_millis(millis - cycles * MILLIS_PER_400_YEARS)?;
    let year = i64::from(dt.year()) + cycles * 400;

    let year = if (0..=9999).contains(&year) {
        format!("{:04}", year)
    } else {
        let sign = if year < 0 { '-' } else { '+' };
        format!("{}{:06}", sign, year.abs())
    };
    Some(format!("{}-{}", year, dt.format("%m-%dT%H:%M:%S%.3fZ")))
}
