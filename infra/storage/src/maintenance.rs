use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{error, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Infix shared by every temporary file the engine writes next to its data file.
pub(crate) const TMP_MARKER: &str = ".lfxtmp.";

const STALE_AFTER: Duration = Duration::from_secs(300);

/// Removes temporary files orphaned by a crash in the middle of a commit.
///
/// Only files belonging to `data_file` and older than five minutes are touched, so a
/// second process sharing the directory keeps its in-flight temp files.
pub(crate) async fn purge_tmp(data_file: &Path) {
    let Some(dir) = data_file.parent().map(Path::to_path_buf) else {
        return;
    };
    let prefix = match data_file.file_name().and_then(|name| name.to_str()) {
        Some(name) => format!("{name}{TMP_MARKER}"),
        None => return,
    };
    let now = SystemTime::now();

    match tokio::task::spawn_blocking(move || remove_stale(&dir, &prefix, now)).await {
        Ok((removed, failed)) if removed > 0 || failed > 0 => {
            info!(removed, failed, "Cleaned up temporary files");
        },
        Err(e) => {
            error!(error = %e, "Temp file cleanup task panicked");
        },
        _ => {},
    }
}

fn remove_stale(dir: &Path, prefix: &str, now: SystemTime) -> (usize, usize) {
    let mut removed = 0;
    let mut failed = 0;

    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .flatten()
        .filter(|entry| is_tmp(entry, prefix) && is_stale(entry, now))
        .for_each(|entry| match std::fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "Failed to remove stale temp file");
                failed += 1;
            },
        });

    (removed, failed)
}

fn is_tmp(entry: &DirEntry, prefix: &str) -> bool {
    entry.file_type().is_file()
        && entry.file_name().to_str().is_some_and(|name| name.starts_with(prefix))
}

fn is_stale(entry: &DirEntry, now: SystemTime) -> bool {
    // Unknown mtime counts as stale, an mtime in the future does not.
    entry
        .metadata()
        .ok()
        .and_then(|m| m.modified().ok())
        .is_none_or(|modified| now.duration_since(modified).is_ok_and(|age| age > STALE_AFTER))
}
