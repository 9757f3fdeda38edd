//! # Collaborator Implementations
//!
//! In-memory and filesystem implementations of the traits in
//! [`crate::client`]. The filesystem variants write through a temporary file
//! and a rename so a crash never leaves a half written checkpoint or registry.

pub mod checkpoint;
pub mod element_source;
pub mod metadata;
pub mod registry_store;

pub use checkpoint::{FilesystemCheckpointStore, InMemoryCheckpointStore};
pub use element_source::{FilesystemElementSource, InMemoryElementSource};
pub use metadata::{InMemoryProcessMetadataStore, NoopProcessMetadataStore, StepProgress};
pub use registry_store::{InMemoryRegistryStore, JsonFileRegistryStore};

use std::path::Path;
use uuid::Uuid;

/// Write `bytes` to `path` atomically: temp file first, then rename
///
/// Every call writes its own temp file, so concurrent writers never share one.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let mut temp_path = path.as_os_str().to_owned();
    temp_path.push(format!(".{}.tmp", Uuid::new_v4().simple()));
    if let Err(e) = tokio::fs::write(&temp_path, bytes).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e);
    }
    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e);
    }
    Ok(())
}
