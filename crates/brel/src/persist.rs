use std::io::Write;
use std::path::Path;

use brel_core::{BrowserConfig, ReleaseStore};

use crate::error::PipelineError;

/// Read a browser's release file.
///
/// # Errors
/// Returns an error when the file cannot be read or does not hold the
/// browser's `releases` map.
pub async fn load_store(path: &Path, config: &BrowserConfig) -> Result<ReleaseStore, PipelineError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|error| PipelineError::io(path, &error))?;
    Ok(ReleaseStore::load(&raw, config.bcd_browser_name, config.scheme())?)
}

/// Serialize `store` and atomically replace the file at `path`.
///
/// # Errors
/// Returns an error when serialization, the write or the rename fails.
/// The previous file is left in place on failure.
pub async fn save_store(path: &Path, store: &ReleaseStore) -> Result<(), PipelineError> {
    let content = store.serialize()?;
    let target = path.to_path_buf();

    tokio::task::spawn_blocking(move || write_atomic(&target, content.as_bytes()))
        .await
        .map_err(|error| PipelineError::Join(error.to_string()))?
        .map_err(|error| PipelineError::io(path, &error))
}

/// Write `data` next to `path` and move it over the release file once it
/// is on disk. Readers see either the old file or the new one.
fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let checkout_dir = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "release file has no parent")
    })?;

    // Same directory as the target so the final rename never crosses filesystems.
    let mut staged = tempfile::Builder::new()
        .prefix(".brel-")
        .suffix(".json.tmp")
        .tempfile_in(checkout_dir)?;
    staged.write_all(data)?;
    staged.as_file().sync_all()?;

    // A failed persist hands the staged file back; dropping it removes it.
    staged.persist(path).map_err(|error| error.error)?;
    Ok(())
}
