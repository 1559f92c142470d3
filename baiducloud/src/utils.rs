//! Helpers for data source outputs

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("cannot expand '~': home directory is unknown")]
    NoHomeDir,

    #[error("failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Replaces a leading `~` with the home directory
pub fn expand_home(path: &str) -> Result<PathBuf, OutputError> {
    if path == "~" {
        return dirs::home_dir().ok_or(OutputError::NoHomeDir);
    }
    match path.strip_prefix("~/") {
        Some(rest) => Ok(dirs::home_dir().ok_or(OutputError::NoHomeDir)?.join(rest)),
        None => Ok(PathBuf::from(path)),
    }
}

/// Writes `value` as pretty JSON, creating parent directories and replacing
/// any existing file.
pub async fn write_to_file<T: Serialize + ?Sized>(path: &str, value: &T) -> Result<(), OutputError> {
    let target = expand_home(path)?;
    let body = serde_json::to_vec_pretty(value)?;

    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| io_error(parent, source))?;
    }
    tokio::fs::write(&target, body)
        .await
        .map_err(|source| io_error(&target, source))?;

    tracing::debug!("wrote data source output to {}", target.display());
    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> OutputError {
    OutputError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Hex SHA-256 over the ids, used as a data source id
pub fn stable_id<I, S>(ids: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hasher = Sha256::new();
    for id in ids {
        hasher.update(id.as_ref().as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn second_write_replaces_first() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        let path = path.to_str().unwrap();

        write_to_file(path, &json!([{"id": "vpc-1"}, {"id": "vpc-2"}]))
            .await
            .unwrap();
        write_to_file(path, &json!([{"id": "vpc-3"}])).await.unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written, json!([{"id": "vpc-3"}]));
    }

    #[tokio::test]
    async fn creates_missing_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/c/out.json");

        write_to_file(path.to_str().unwrap(), &json!({"ok": true}))
            .await
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n"), "output is pretty printed");
    }

    #[test]
    fn expands_home_prefix() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_home("~/x.json").unwrap(), home.join("x.json"));
        assert_eq!(expand_home("~").unwrap(), home);
        assert_eq!(expand_home("/tmp/x.json").unwrap(), PathBuf::from("/tmp/x.json"));
        assert_eq!(expand_home("a~/b").unwrap(), PathBuf::from("a~/b"));
    }

    #[test]
    fn stable_id_depends_on_order_and_content() {
        let a = stable_id(["vpc-1", "vpc-2"]);
        assert_eq!(a, stable_id(vec!["vpc-1".to_string(), "vpc-2".to_string()]));
        assert_ne!(a, stable_id(["vpc-2", "vpc-1"]));
        assert_ne!(stable_id(["ab", "c"]), stable_id(["a", "bc"]));
        assert_eq!(a.len(), 64);
    }
}
