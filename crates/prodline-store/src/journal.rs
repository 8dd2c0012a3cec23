//! JSON Lines journal for the production event log.
//!
//! Each appended event is written as one JSON object per line and flushed
//! immediately. A torn or corrupted line only loses that event: replay
//! skips lines that fail to parse.

use prodline_core::ProductionEvent;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::StoreResult;

/// Append-only journal file.
pub struct EventJournal {
    path: PathBuf,
    writer: BufWriter<File>,
    records_written: usize,
}

impl EventJournal {
    /// Open (or create) the journal at `path` in append mode.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        info!(path = %path.display(), "Opening event journal (append mode)");

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            records_written: 0,
        })
    }

    /// Read every well-formed event from the journal at `path`.
    ///
    /// A missing file is an empty journal.
    pub fn replay(path: impl AsRef<Path>) -> StoreResult<Vec<ProductionEvent>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(path)?);
        let mut events = Vec::new();
        let mut skipped = 0usize;

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ProductionEvent>(&line) {
                Ok(event) => events.push(event),
                Err(e) => {
                    skipped += 1;
                    warn!(line = line_no + 1, error = %e, "Skipping corrupt journal line");
                }
            }
        }

        info!(
            path = %path.display(),
            events = events.len(),
            skipped,
            "Replayed event journal"
        );
        Ok(events)
    }

    /// Write one event and flush it to disk.
    pub fn append(&mut self, event: &ProductionEvent) -> StoreResult<()> {
        let json = serde_json::to_string(event)?;
        writeln!(self.writer, "{}", json)?;
        self.writer.flush()?;
        self.records_written += 1;
        debug!(event_id = event.id.0, "Journaled production event");
        Ok(())
    }

    /// Number of events written through this handle.
    pub fn records_written(&self) -> usize {
        self.records_written
    }
}

impl Drop for EventJournal {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            warn!(?e, path = %self.path.display(), "Failed to flush event journal on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use prodline_core::{EventId, FlowDirection, MachineId, NewProductionEvent};
    use tempfile::TempDir;

    fn make_event(id: u64) -> ProductionEvent {
        ProductionEvent::from_new(
            EventId(id),
            NewProductionEvent::new(MachineId(1), "gear", id as i64, Utc::now()),
        )
    }

    #[test]
    fn test_append_and_replay() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("events.jsonl");

        let mut journal = EventJournal::open(&path).unwrap();
        for i in 1..=3 {
            journal.append(&make_event(i)).unwrap();
        }
        assert_eq!(journal.records_written(), 3);
        drop(journal);

        let events = EventJournal::replay(&path).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[2].id, EventId(3));
        assert_eq!(events[2].quantity, 3);
    }

    #[test]
    fn test_reopen_appends() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("events.jsonl");

        {
            let mut journal = EventJournal::open(&path).unwrap();
            journal.append(&make_event(1)).unwrap();
        }
        {
            let mut journal = EventJournal::open(&path).unwrap();
            let mut event = make_event(2);
            event.direction = Some(FlowDirection::Output);
            journal.append(&event).unwrap();
        }

        let events = EventJournal::replay(&path).unwrap();
        assert_eq!(events.len(), 2, "Second open should append, not truncate");
        assert_eq!(events[1].direction, Some(FlowDirection::Output));
    }

    #[test]
    fn test_replay_skips_corrupt_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("events.jsonl");

        let good = serde_json::to_string(&make_event(1)).unwrap();
        std::fs::write(&path, format!("{good}\n{{\"id\":2,\"machine\n\n")).unwrap();

        let events = EventJournal::replay(&path).unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_replay_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let events = EventJournal::replay(temp_dir.path().join("absent.jsonl")).unwrap();
        assert!(events.is_empty());
    }
}
