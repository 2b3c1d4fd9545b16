use crate::render;
use anyhow::Result;
use docvault_core::Vault;
use notify::event::EventKind;
use notify::{Event, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebounceEventResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Quiet period a file must go through without events before it is picked up.
const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Files a drop folder should pick up: regular files that are not hidden and
/// not a partial download.
pub fn is_upload_candidate(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.starts_with('.') || name.ends_with('~') {
        return false;
    }
    let partial = [".part", ".tmp", ".crdownload", ".download"];
    !partial.iter().any(|ext| name.ends_with(ext))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    len: u64,
    modified: Option<SystemTime>,
}

impl FileStamp {
    fn of(path: &Path) -> Option<Self> {
        let meta = std::fs::metadata(path).ok()?;
        Some(Self {
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

/// Tracks what has already been handed to the vault, by path and by the
/// size and mtime the file had when it was taken.
#[derive(Debug, Default)]
pub struct DropFolder {
    taken: HashMap<PathBuf, FileStamp>,
}

impl DropFolder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Candidate paths from a create or modify event that are ready to
    /// upload. Empty files are left alone until content arrives. A file that
    /// was already taken comes back only when its size or mtime changed.
    pub fn take_new(&mut self, event: &Event) -> Vec<PathBuf> {
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            return Vec::new();
        }
        let mut out = Vec::new();
        for path in &event.paths {
            if !is_upload_candidate(path) {
                continue;
            }
            let Some(stamp) = FileStamp::of(path) else {
                continue;
            };
            if stamp.len == 0 || self.taken.get(path) == Some(&stamp) {
                continue;
            }
            self.taken.insert(path.clone(), stamp);
            out.push(path.clone());
        }
        out
    }

    pub fn len(&self) -> usize {
        self.taken.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taken.is_empty()
    }
}

/// Uploads every new file dropped into `dir`, one at a time, until Ctrl-C.
///
/// Events are debounced so a file is only looked at once writes to it have
/// gone quiet.
pub async fn watch_dir(vault: &mut Vault, dir: &Path) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<DebounceEventResult>();
    let mut debouncer = new_debouncer(SETTLE_DELAY, None, move |result: DebounceEventResult| {
        let _ = tx.send(result);
    })?;
    debouncer.watch(dir, RecursiveMode::NonRecursive)?;

    let mut folder = DropFolder::new();
    println!("Watching {} for new documents...", dir.display());
    loop {
        let batch = tokio::select! {
            batch = rx.recv() => match batch {
                Some(batch) => batch,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        };
        let events = match batch {
            Ok(events) => events,
            Err(errors) => {
                for e in errors {
                    warn!("watch error: {:?}", e);
                }
                continue;
            }
        };
        for event in events {
            for path in folder.take_new(&event.event) {
                debug!(path = %path.display(), "uploading dropped file");
                let _ = vault.upload(path).await;
                for notice in vault.take_notices() {
                    println!("{}", render::notice_line(&notice));
                }
            }
        }
    }
    println!("Stopped after {} file(s).", folder.len());
    Ok(())
}
