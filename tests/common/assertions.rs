//! Custom test assertions

use native_vids::Event;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;

/// Every regular file below `dir`
pub fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return found;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            found.extend(files_under(&path));
        } else {
            found.push(path);
        }
    }
    found
}

/// Assert that no download left anything in the temp dir
pub fn assert_temp_empty(temp_dir: &Path) {
    let leftovers = files_under(temp_dir);
    assert!(leftovers.is_empty(), "temporary files leaked: {leftovers:?}");
}

/// Drain whatever events are buffered right now
pub fn drain_events(events: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    received
}
