//! Framework error type

#[derive(Debug, thiserror::Error)]
pub enum TfplugError {
    #[error("Provider not configured")]
    ProviderNotConfigured,

    /// A factory was asked for a type it does not serve
    #[error("Unknown {kind}: {name}")]
    UnknownType { kind: &'static str, name: String },

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Custom(String),
}

pub type Result<T> = std::result::Result<T, TfplugError>;

impl TfplugError {
    pub fn unknown_resource(name: &str) -> Self {
        TfplugError::UnknownType {
            kind: "resource",
            name: name.to_string(),
        }
    }

    pub fn unknown_data_source(name: &str) -> Self {
        TfplugError::UnknownType {
            kind: "data source",
            name: name.to_string(),
        }
    }
}

impl From<String> for TfplugError {
    fn from(s: String) -> Self {
        TfplugError::Custom(s)
    }
}

impl From<&str> for TfplugError {
    fn from(s: &str) -> Self {
        TfplugError::Custom(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_types_name_their_kind() {
        assert_eq!(
            TfplugError::unknown_resource("baiducloud_bos").to_string(),
            "Unknown resource: baiducloud_bos"
        );
        assert_eq!(
            TfplugError::unknown_data_source("baiducloud_bos").to_string(),
            "Unknown data source: baiducloud_bos"
        );
    }
}
