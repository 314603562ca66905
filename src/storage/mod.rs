//! Durable persistence for schedules and run history
//!
//! Both stores write through [`write_atomic`]: serialize, write to a unique
//! temp file in the destination directory, then `rename` into place. A
//! reader never observes a partially written file, even across a crash
//! mid-write.

pub mod history_index;
pub mod schedule_store;

pub use history_index::HistoryIndex;
pub use schedule_store::ScheduleStore;

use std::path::Path;

use uuid::Uuid;

use crate::errors::StorageResult;

/// Atomically replace `path` with `contents`
///
/// The temp file lives in the same directory as the destination so the
/// final `rename` never crosses a filesystem boundary.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> StorageResult<()> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("store");
    let tmp_name = format!(".{}.{}.tmp", file_name, Uuid::new_v4());
    let tmp_path = match path.parent() {
        Some(parent) => parent.join(&tmp_name),
        None => std::path::PathBuf::from(&tmp_name),
    };

    tokio::fs::write(&tmp_path, contents).await?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        // Never leave temp droppings next to the store
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e.into());
    }
    Ok(())
}
