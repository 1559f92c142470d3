//! Per-operation timeouts
//!
//! Resources declare defaults and users may override them through a
//! `timeouts` attribute such as `{ create = "20m", delete = "10m" }`.

use crate::schema::{Attribute, AttributeBuilder, AttributeType};
use crate::types::Config;
use std::collections::HashMap;
use std::time::Duration;

pub const TIMEOUTS_ATTRIBUTE: &str = "timeouts";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Timeouts {
    /// Same default for every operation
    pub fn new(default: Duration) -> Self {
        Self {
            create: default,
            read: default,
            update: default,
            delete: default,
        }
    }

    pub fn with_create(mut self, timeout: Duration) -> Self {
        self.create = timeout;
        self
    }

    pub fn with_update(mut self, timeout: Duration) -> Self {
        self.update = timeout;
        self
    }

    pub fn with_delete(mut self, timeout: Duration) -> Self {
        self.delete = timeout;
        self
    }

    /// Applies overrides from the `timeouts` attribute on top of `self`.
    /// Unparseable values keep the default; schema validation reports them.
    pub fn resolve(&self, config: &Config) -> Self {
        let mut resolved = *self;
        let Some(overrides) = config.get_map(TIMEOUTS_ATTRIBUTE) else {
            return resolved;
        };

        let lookup = |key: &str| {
            overrides
                .get(key)
                .and_then(|v| v.as_string())
                .and_then(|s| parse_duration(s))
        };

        if let Some(d) = lookup("create") {
            resolved.create = d;
        }
        if let Some(d) = lookup("read") {
            resolved.read = d;
        }
        if let Some(d) = lookup("update") {
            resolved.update = d;
        }
        if let Some(d) = lookup("delete") {
            resolved.delete = d;
        }
        resolved
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::new(Duration::from_secs(20 * 60))
    }
}

/// Schema attribute for the `timeouts` block
pub fn timeouts_attribute() -> Attribute {
    let fields: HashMap<String, AttributeType> = ["create", "read", "update", "delete"]
        .iter()
        .map(|k| (k.to_string(), AttributeType::String))
        .collect();

    AttributeBuilder::new(TIMEOUTS_ATTRIBUTE, AttributeType::Object(fields))
        .optional()
        .description("Operation timeouts, e.g. { create = \"20m\" }")
        .build()
}

/// Parses durations in the `1h30m`, `10m`, `45s`, `500ms` style
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let mut total = Duration::ZERO;
    let mut rest = input;
    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        if digits_end == 0 {
            return None;
        }
        let amount: f64 = rest[..digits_end].parse().ok()?;
        rest = &rest[digits_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let seconds = match &rest[..unit_end] {
            "h" => amount * 3600.0,
            "m" => amount * 60.0,
            "s" => amount,
            "ms" => amount / 1000.0,
            _ => return None,
        };
        rest = &rest[unit_end..];
        total += Duration::from_secs_f64(seconds);
    }

    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Dynamic;

    #[test]
    fn parses_common_durations() {
        assert_eq!(parse_duration("10m"), Some(Duration::from_secs(600)));
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("1h30m"), Some(Duration::from_secs(5400)));
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
    }

    #[test]
    fn rejects_malformed_durations() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("10"), None);
        assert_eq!(parse_duration("m10"), None);
        assert_eq!(parse_duration("10d"), None);
    }

    #[test]
    fn resolve_applies_overrides() {
        let defaults = Timeouts::new(Duration::from_secs(600))
            .with_delete(Duration::from_secs(1200));

        let mut config = Config::new();
        config.set(
            TIMEOUTS_ATTRIBUTE,
            Dynamic::Map(HashMap::from([
                ("create".to_string(), Dynamic::from("30m")),
                ("update".to_string(), Dynamic::from("nonsense")),
            ])),
        );

        let resolved = defaults.resolve(&config);
        assert_eq!(resolved.create, Duration::from_secs(1800));
        assert_eq!(resolved.update, Duration::from_secs(600));
        assert_eq!(resolved.delete, Duration::from_secs(1200));
    }

    #[test]
    fn resolve_without_block_keeps_defaults() {
        let defaults = Timeouts::default();
        assert_eq!(defaults.resolve(&Config::new()), defaults);
    }
}
