use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::{fs as tokio_fs, io::AsyncWriteExt};

use crate::error::ExportError;

/// Sibling path the export is staged in before being renamed into place
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("new_leads"));
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}

/// Write `buffer` to `path` so that readers only ever see the complete file
pub async fn write_atomic(path: &Path, buffer: &[u8]) -> Result<(), ExportError> {
    let write_error = |source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    };

    let staging = staging_path(path);
    log::debug!("Staging output in {}", staging.display());

    let result = async {
        let mut file = tokio_fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&staging)
            .await?;
        file.write_all(buffer).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        tokio_fs::rename(&staging, path).await
    }
    .await;

    if let Err(e) = result {
        let _ = tokio_fs::remove_file(&staging).await;
        return Err(write_error(e));
    }

    log::debug!("Output file {} written ({} bytes)", path.display(), buffer.len());
    Ok(())
}
