//! Whole-document JSON persistence shared by the file-backed stores.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;

use crate::error::{SchemaError, SchemaResult};

/// Replace `path` with `bytes` so readers see either the old or the new document.
///
/// The bytes go to a sibling `.tmp` file which is then renamed over the target.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> SchemaResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| SchemaError::io(parent, e))?;
    }

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)
        .await
        .map_err(|e| SchemaError::io(&tmp, e))?;
    fs::rename(&tmp, path)
        .await
        .map_err(|e| SchemaError::io(path, e))?;
    Ok(())
}

/// Serialize `value` as pretty JSON and write it atomically
pub async fn write_json<T: Serialize>(path: &Path, value: &T) -> SchemaResult<()> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    write_atomic(path, &bytes).await
}

/// Read a JSON document, or `None` when the file does not exist yet
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> SchemaResult<Option<T>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SchemaError::io(path, e)),
    }
}
