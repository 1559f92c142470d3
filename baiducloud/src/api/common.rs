//! Common types and utilities for BCE APIs

use serde::{Deserialize, Serialize};

/// Error document returned by BCE services
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Key/value tag attached to BCE resources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagModel {
    pub tag_key: String,
    #[serde(default)]
    pub tag_value: String,
}

/// Billing block shared by paid resources
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Billing {
    pub payment_timing: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation: Option<Reservation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub reservation_length: u32,
    #[serde(default = "default_time_unit")]
    pub reservation_time_unit: String,
}

fn default_time_unit() -> String {
    "Month".to_string()
}

/// Marker-based paging fields shared by list responses
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MarkerPage {
    #[serde(default)]
    pub marker: String,
    #[serde(default)]
    pub is_truncated: bool,
    #[serde(default)]
    pub next_marker: String,
    #[serde(default)]
    pub max_keys: u32,
}

impl MarkerPage {
    /// Marker for the following page, if there is one
    pub fn next(&self) -> Option<&str> {
        if self.is_truncated && !self.next_marker.is_empty() {
            Some(&self.next_marker)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn add_optional<K: Into<String>, V: ToString>(mut self, key: K, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.params.push((key.into(), v.to_string()));
        }
        self
    }

    /// Value-less action parameter such as `?resize`
    pub fn flag<K: Into<String>>(mut self, key: K) -> Self {
        self.params.push((key.into(), String::new()));
        self
    }

    /// Idempotency token for mutating calls
    pub fn client_token(self) -> Self {
        self.add("clientToken", uuid::Uuid::new_v4())
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            String::new()
        } else {
            format!(
                "?{}",
                self.params
                    .iter()
                    .map(|(k, v)| {
                        if v.is_empty() {
                            urlencoding::encode(k).into_owned()
                        } else {
                            format!("{}={}", urlencoding::encode(k), urlencoding::encode(v))
                        }
                    })
                    .collect::<Vec<_>>()
                    .join("&")
            )
        }
    }
}

/// Marker paging request parameters
#[derive(Debug, Clone, Default)]
pub struct PaginationParams {
    pub marker: Option<String>,
    pub max_keys: Option<u32>,
}

impl PaginationParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    pub fn with_max_keys(mut self, max_keys: u32) -> Self {
        self.max_keys = Some(max_keys);
        self
    }

    pub fn apply(&self, params: ApiQueryParams) -> ApiQueryParams {
        params
            .add_optional("marker", self.marker.as_deref().filter(|m| !m.is_empty()))
            .add_optional("maxKeys", self.max_keys)
    }
}

/// Largest page BCE list APIs accept
pub const MAX_PAGE_SIZE: u32 = 1000;
