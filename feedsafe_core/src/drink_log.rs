//! Drink log for the active session.
//!
//! Consumed drinks are appended to a JSONL (JSON Lines) file with file
//! locking so a second process (e.g. a watch loop) can read safely.

use crate::{DrinkEntry, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Sink for consumed drinks
pub trait DrinkSink {
    fn append(&mut self, entry: &DrinkEntry) -> Result<()>;
}

/// JSONL-based drink log with file locking
pub struct JsonlDrinkLog {
    path: PathBuf,
}

impl JsonlDrinkLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Start a new session by truncating the log. Returns how many entries
    /// were dropped.
    pub fn clear(&mut self) -> Result<usize> {
        if !self.path.exists() {
            return Ok(0);
        }
        let dropped = read_entries(&self.path)?.len();

        let file = OpenOptions::new().write(true).open(&self.path)?;
        file.lock_exclusive()?;
        file.set_len(0)?;
        file.sync_all()?;
        file.unlock()?;

        tracing::info!("Cleared {} drinks from {:?}", dropped, self.path);
        Ok(dropped)
    }
}

impl DrinkSink for JsonlDrinkLog {
    fn append(&mut self, entry: &DrinkEntry) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(entry)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!("Appended drink {} to log", entry.id);
        Ok(())
    }
}

/// Read all drinks from a log file; unreadable lines are skipped
pub fn read_entries(path: &Path) -> Result<Vec<DrinkEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut entries = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<DrinkEntry>(&line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                tracing::warn!("Failed to parse drink at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} drinks from log", entries.len());
    Ok(entries)
}
