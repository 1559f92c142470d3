//! Client-side filtering for data source results
//!
//! A data source flattens every API object into a [`Row`] and then narrows the
//! rows with the user's `filter` blocks. A row must satisfy every filter whose
//! field it has; a filter is satisfied when any of its values equals, or
//! matches as a regular expression, the row's field.

use crate::schema::{Attribute, AttributeBuilder, AttributeType};
use crate::types::{Diagnostics, Dynamic};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

pub const FILTER_ATTRIBUTE: &str = "filter";

/// One flattened result object keyed by attribute name
pub type Row = serde_json::Map<String, Value>;

#[derive(Debug, Clone)]
struct FilterValue {
    literal: String,
    pattern: Option<Regex>,
}

impl FilterValue {
    fn new(raw: String) -> Self {
        // Values that are not valid patterns still match literally
        let pattern = match Regex::new(&raw) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::trace!("filter value {:?} is not a valid regex: {}", raw, e);
                None
            }
        };
        Self {
            literal: raw,
            pattern,
        }
    }

    fn matches(&self, candidate: &str) -> bool {
        self.literal == candidate
            || self
                .pattern
                .as_ref()
                .is_some_and(|re| re.is_match(candidate))
    }
}

#[derive(Debug, Clone)]
pub struct Filter {
    name: String,
    values: Vec<FilterValue>,
}

impl Filter {
    pub fn new<N, I, S>(name: N, values: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values
                .into_iter()
                .map(|v| FilterValue::new(v.into()))
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|v| v.literal.as_str())
    }

    /// Fields that are not strings, integers or booleans always pass
    fn accepts(&self, field: &Value) -> bool {
        let candidate = match field {
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) if n.is_i64() || n.is_u64() => n.to_string(),
            _ => return true,
        };

        self.values.iter().any(|v| v.matches(&candidate))
    }
}

/// The set of `filter` blocks of one data source read
#[derive(Debug, Clone, Default)]
pub struct DataSourceFilter {
    filters: Vec<Filter>,
}

impl DataSourceFilter {
    pub fn new(filters: Vec<Filter>) -> Self {
        Self { filters }
    }

    /// Builds filters from the `filter` attribute. Returns `None` when the
    /// attribute is absent or empty, meaning every row is kept.
    pub fn from_config(value: Option<&Dynamic>) -> Option<Self> {
        let blocks = value?.as_list()?;

        let filters: Vec<Filter> = blocks
            .iter()
            .filter_map(|block| {
                let block = block.as_map()?;
                let name = block.get("name")?.as_string()?;
                let values = block
                    .get("values")
                    .and_then(|v| v.as_list())
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(|item| item.as_string().cloned())
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default();
                Some(Filter::new(name.clone(), values))
            })
            .collect();

        if filters.is_empty() {
            None
        } else {
            Some(Self { filters })
        }
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.filters.iter().all(|filter| match row.get(&filter.name) {
            Some(field) => filter.accepts(field),
            None => true,
        })
    }

    /// Drops non-matching rows, keeping the order of the rest
    pub fn apply(&self, rows: &mut Vec<Row>) {
        rows.retain(|row| self.matches(row));
    }
}

/// Applies `filter` when present
pub fn apply_filter(rows: &mut Vec<Row>, filter: Option<&DataSourceFilter>) {
    if let Some(filter) = filter {
        let before = rows.len();
        filter.apply(rows);
        tracing::debug!("filter kept {} of {} rows", rows.len(), before);
    }
}

/// Schema for the `filter` attribute shared by data sources
pub fn filter_attribute() -> Attribute {
    let fields = HashMap::from([
        ("name".to_string(), AttributeType::String),
        (
            "values".to_string(),
            AttributeType::List(Box::new(AttributeType::String)),
        ),
    ]);

    AttributeBuilder::object_list(FILTER_ATTRIBUTE, fields)
        .optional()
        .description("Client-side filters; values may be literals or regular expressions")
        .build()
}

/// Warns about filter blocks that can never match or are malformed.
/// Reads still apply them as written.
pub fn validate_filter_config(value: Option<&Dynamic>, diagnostics: &mut Diagnostics) {
    let Some(blocks) = value.and_then(|v| v.as_list()) else {
        return;
    };

    for (idx, block) in blocks.iter().enumerate() {
        let Some(block) = block.as_map() else {
            continue;
        };
        let name = block.get("name").and_then(|v| v.as_string());
        if name.is_none() {
            diagnostics.add_warning(
                format!("filter.{} has no name and is ignored", idx),
                None::<String>,
            );
            continue;
        }

        let empty = block
            .get("values")
            .and_then(|v| v.as_list())
            .map_or(true, |items| items.is_empty());
        if empty {
            diagnostics.add_warning(
                format!("filter.{} has no values and will match nothing", idx),
                name.map(|n| format!("Filter on \"{}\" excludes every row that has it", n)),
            );
        }
    }
}
