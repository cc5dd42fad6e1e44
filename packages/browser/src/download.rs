//! Download completion tracking.
//!
//! Browser downloads are asynchronous: clicking the link returns long
//! before the file is on disk. [`wait_for_download`] polls the download
//! directory until exactly one completed file is present.
//!
//! Chrome and Firefox write in-progress downloads under a temporary suffix
//! and rename on completion, so entries ending in one of
//! [`PARTIAL_SUFFIXES`] are treated as "not yet done".

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ev_sales_models::progress::ProgressCallback;

use crate::BrowserError;
use crate::wait::WaitPolicy;

/// File suffixes browsers use while a download is still in progress.
pub const PARTIAL_SUFFIXES: &[&str] = &[".crdownload", ".part", ".tmp", ".download"];

/// Snapshot of a download directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryState {
    /// Completed files, sorted by name.
    pub completed: Vec<String>,
    /// Number of entries still being written.
    pub in_progress: usize,
}

/// Returns `true` if `name` looks like an in-progress download.
#[must_use]
pub fn is_partial(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    PARTIAL_SUFFIXES.iter().any(|s| lower.ends_with(s))
}

/// Lists the download directory.
///
/// # Errors
///
/// Returns [`BrowserError::MissingPath`] if `dir` does not exist, or
/// [`BrowserError::Io`] if it cannot be read.
pub async fn scan(dir: &Path) -> Result<DirectoryState, BrowserError> {
    if !tokio::fs::try_exists(dir).await? {
        return Err(BrowserError::MissingPath {
            path: dir.to_path_buf(),
        });
    }

    let mut state = DirectoryState::default();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_partial(&name) {
            state.in_progress += 1;
        } else {
            state.completed.push(name);
        }
    }
    state.completed.sort();

    Ok(state)
}

/// Polls `dir` until it holds exactly one completed file and returns its
/// path.
///
/// An empty directory (or one with only partial files) means the download
/// has not finished yet and polling continues. A missing directory fails
/// immediately.
///
/// # Errors
///
/// - [`BrowserError::MissingPath`] if `dir` does not exist at any poll.
/// - [`BrowserError::AmbiguousDownload`] if more than one completed file
///   is present.
/// - [`BrowserError::TimedOut`] / [`BrowserError::Cancelled`] per `policy`.
pub async fn wait_for_download(
    dir: &Path,
    policy: &WaitPolicy,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<PathBuf, BrowserError> {
    const WHAT: &str = "the download to complete";

    log::info!("Waiting for the file to get downloaded to {}...", dir.display());

    let mut attempt: u32 = 1;
    loop {
        policy.check(WHAT, attempt)?;

        let state = scan(dir).await?;
        match state.completed.as_slice() {
            [file] if state.in_progress == 0 => {
                let path = dir.join(file);
                log::info!("File downloaded successfully to {}", path.display());
                return Ok(path);
            }
            [] | [_] => {
                log::debug!(
                    "Poll {attempt}: {} completed, {} in progress",
                    state.completed.len(),
                    state.in_progress
                );
            }
            _ => {
                return Err(BrowserError::AmbiguousDownload {
                    dir: dir.to_path_buf(),
                    files: state.completed,
                });
            }
        }

        progress.inc(1);
        progress.set_message(format!("Waiting for download (poll {attempt})"));

        policy.pause(WHAT, attempt).await?;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ev_sales_models::progress::null_progress;

    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "ev_sales_download_{name}_{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn poll_policy() -> WaitPolicy {
        WaitPolicy::default().with_interval(Duration::from_millis(10))
    }

    #[test]
    fn recognizes_partial_suffixes() {
        assert!(is_partial("report.pdf.crdownload"));
        assert!(is_partial("report.pdf.PART"));
        assert!(!is_partial("report.pdf"));
    }

    #[tokio::test]
    async fn missing_directory_fails_fast() {
        let dir = std::env::temp_dir().join("ev_sales_download_does_not_exist");
        let _ = std::fs::remove_dir_all(&dir);

        let err = wait_for_download(&dir, &poll_policy(), &null_progress())
            .await
            .unwrap_err();
        assert!(matches!(err, BrowserError::MissingPath { .. }));
    }

    #[tokio::test]
    async fn returns_single_completed_file() {
        let dir = temp_dir("single");
        std::fs::write(dir.join("report.pdf"), b"%PDF").unwrap();

        let path = wait_for_download(&dir, &poll_policy(), &null_progress())
            .await
            .unwrap();
        assert_eq!(path, dir.join("report.pdf"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn keeps_polling_while_empty() {
        let dir = temp_dir("empty");
        let policy = poll_policy().with_max_attempts(3);

        let err = wait_for_download(&dir, &policy, &null_progress())
            .await
            .unwrap_err();
        assert!(matches!(err, BrowserError::TimedOut { attempts: 3, .. }));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn waits_for_file_that_arrives_later() {
        let dir = temp_dir("late");
        let writer_dir = dir.clone();
        let writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            tokio::fs::write(writer_dir.join("report.pdf"), b"%PDF")
                .await
                .unwrap();
        });

        let path = wait_for_download(&dir, &poll_policy(), &null_progress())
            .await
            .unwrap();
        writer.await.unwrap();
        assert_eq!(path, dir.join("report.pdf"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn in_progress_download_is_not_complete() {
        let dir = temp_dir("partial");
        std::fs::write(dir.join("report.pdf.crdownload"), b"%PD").unwrap();
        let policy = poll_policy().with_max_attempts(2);

        let err = wait_for_download(&dir, &policy, &null_progress())
            .await
            .unwrap_err();
        assert!(matches!(err, BrowserError::TimedOut { .. }));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn two_files_fail_loudly() {
        let dir = temp_dir("two");
        std::fs::write(dir.join("a.pdf"), b"%PDF").unwrap();
        std::fs::write(dir.join("b.pdf"), b"%PDF").unwrap();

        let err = wait_for_download(&dir, &poll_policy(), &null_progress())
            .await
            .unwrap_err();
        match err {
            BrowserError::AmbiguousDownload { files, .. } => {
                assert_eq!(files, vec!["a.pdf", "b.pdf"]);
            }
            other => panic!("unexpected error: {other}"),
        }

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
