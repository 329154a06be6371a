//! Parsing of the `key=value` configuration text.
//!
//! Scheduler configurations travel through the system as an opaque blob of
//! newline-delimited `key=value` pairs. This module is the one place that
//! understands that format; the raw text itself is persisted untouched.

use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur when parsing configuration text.
#[derive(Debug, Clone, Error)]
pub enum PropsError {
    /// A non-comment line had no `=` separator.
    #[error("line {0}: missing '=' separator")]
    MissingSeparator(usize),

    /// A line had an `=` but nothing before it.
    #[error("line {0}: empty key")]
    EmptyKey(usize),
}

/// Parsed view over one configuration text blob.
///
/// Keys are unique; when the text repeats a key, the last occurrence wins.
/// Lines starting with `#` or `!` are comments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigProps {
    entries: BTreeMap<String, String>,
}

impl ConfigProps {
    /// Parse configuration text into properties.
    pub fn parse(text: &str) -> Result<Self, PropsError> {
        let mut entries = BTreeMap::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }

            let (key, value) = line
                .split_once('=')
                .ok_or(PropsError::MissingSeparator(idx + 1))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(PropsError::EmptyKey(idx + 1));
            }

            entries.insert(key.to_string(), value.trim().to_string());
        }

        Ok(Self { entries })
    }

    /// Look up a single value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Look up a value, falling back to a default.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Look up a boolean value. Absent or non-`true` values read as false.
    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// Look up an unsigned integer value. Absent or unparsable values read as None.
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    /// Collect all entries under `prefix.`, with the prefix stripped.
    ///
    /// `with_prefix("listener")` over `listener.audit=logging` yields
    /// `("audit", "logging")`.
    pub fn with_prefix(&self, prefix: &str) -> BTreeMap<String, String> {
        let full = format!("{}.", prefix);
        self.entries
            .iter()
            .filter_map(|(k, v)| {
                k.strip_prefix(&full)
                    .map(|rest| (rest.to_string(), v.clone()))
            })
            .collect()
    }

    /// Group `prefix.<name>.<field>` entries by `<name>`.
    ///
    /// `grouped("job")` over `job.nightly.schedule=@daily` yields
    /// `{"nightly": {"schedule": "@daily"}}`. Entries under the prefix that
    /// lack a `<field>` segment are skipped.
    pub fn grouped(&self, prefix: &str) -> BTreeMap<String, BTreeMap<String, String>> {
        let mut groups: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for (rest, value) in self.with_prefix(prefix) {
            if let Some((name, field)) = rest.split_once('.') {
                if !name.is_empty() && !field.is_empty() {
                    groups
                        .entry(name.to_string())
                        .or_default()
                        .insert(field.to_string(), value);
                }
            }
        }
        groups
    }

    /// Number of parsed entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the text parsed to no entries at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
