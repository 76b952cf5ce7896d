// Scoped temp files for attachments that are downloaded and re-uploaded.
//
// A `StagedAttachment` owns its file on disk: dropping it deletes the file, so
// every exit path of a quote (success, send failure, early `?`) cleans up.

use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct StagedAttachment {
    path: PathBuf,
    filename: String,
}

impl StagedAttachment {
    /// Write `bytes` to `<dir>/<message_id>_<index>.<ext>`.
    ///
    /// The guard exists before the write starts, so a failed or partial write
    /// is removed as well.
    pub async fn write(
        dir: &Path,
        message_id: u64,
        index: usize,
        filename: &str,
        bytes: &[u8],
    ) -> io::Result<Self> {
        let staged = Self {
            path: dir.join(staged_file_name(message_id, index, filename)),
            filename: filename.to_string(),
        };
        tokio::fs::write(&staged.path, bytes).await?;
        Ok(staged)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name the file is uploaded under.
    pub fn filename(&self) -> &str {
        &self.filename
    }
}

impl Drop for StagedAttachment {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to delete staged attachment"
                );
            }
        }
    }
}

fn staged_file_name(message_id: u64, index: usize, filename: &str) -> String {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("bin")
        .to_ascii_lowercase();
    format!("{message_id}_{index}.{extension}")
}
