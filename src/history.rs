use crate::core::record::FileRecord;
use crate::dedup::{Decision, Pass};
use crate::error::HistoryError;
use crate::store::FileStore;
use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

pub const HISTORY_FILE: &str = "history.jsonl";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub id: String,
    pub name: String,
}

/// One applied decision: which copy was kept and which went to the trash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub timestamp: String,
    pub pass: Pass,
    pub key: String,
    pub retained: FileRef,
    pub trashed: Vec<FileRef>,
}

impl HistoryRecord {
    pub fn from_decision(decision: &Decision<'_>) -> Self {
        let file_ref = |record: &FileRecord| FileRef {
            id: record.id.clone(),
            name: record.name.clone(),
        };
        Self {
            timestamp: Utc::now().to_rfc3339(),
            pass: decision.pass,
            key: decision.key.clone(),
            retained: file_ref(decision.outcome.preferred()),
            trashed: decision
                .outcome
                .targets()
                .iter()
                .map(|&record| file_ref(record))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Latest,
    Index(usize),
    All,
}

/// JSONL log of applied decisions in the state directory.
#[derive(Debug, Clone)]
pub struct History {
    path: PathBuf,
}

impl History {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(HISTORY_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &HistoryRecord) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| HistoryError::io(parent, e))?;
        }
        let mut out = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| HistoryError::io(&self.path, e))?;
        writeln!(out, "{}", serde_json::to_string(record)?)
            .map_err(|e| HistoryError::io(&self.path, e))?;
        Ok(())
    }

    /// All readable records; malformed lines are skipped with a warning.
    /// A missing file reads as an empty history.
    pub fn load(&self) -> Result<Vec<HistoryRecord>, HistoryError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(HistoryError::io(&self.path, e)),
        };

        let mut records = Vec::new();
        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| HistoryError::io(&self.path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryRecord>(&line) {
                Ok(record) => records.push(record),
                Err(err) => log::warn!("Skipping malformed history entry {}: {}", i, err),
            }
        }
        Ok(records)
    }

    fn rewrite(&self, records: &[HistoryRecord]) -> Result<(), HistoryError> {
        let mut content = String::new();
        for record in records {
            content.push_str(&serde_json::to_string(record)?);
            content.push('\n');
        }
        fs::write(&self.path, content).map_err(|e| HistoryError::io(&self.path, e))
    }

    /// Take the selected records' files back out of the trash, then drop
    /// those records from the history. Returns the restored files in order.
    pub fn restore<S>(&self, store: &mut S, selection: Selection) -> Result<Vec<FileRef>>
    where
        S: FileStore + ?Sized,
    {
        let records = self.load()?;
        let indices = select(records.len(), selection)?;

        let mut restored = Vec::new();
        for &i in &indices {
            let record = &records[i];
            log::debug!(
                "restoring {} file(s) from record {}",
                record.trashed.len(),
                record.timestamp
            );
            for file in &record.trashed {
                store
                    .restore(&file.id)
                    .with_context(|| format!("Failed to restore {} ({})", file.name, file.id))?;
                restored.push(file.clone());
            }
        }

        let remaining: Vec<HistoryRecord> = records
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !indices.contains(i))
            .map(|(_, record)| record)
            .collect();
        self.rewrite(&remaining)
            .with_context(|| format!("Failed to update history file {:?}", self.path))?;

        log::info!("Removed {} record(s) from history", indices.len());
        Ok(restored)
    }
}

fn select(len: usize, selection: Selection) -> Result<Vec<usize>, HistoryError> {
    if len == 0 {
        return Err(HistoryError::Empty);
    }
    match selection {
        Selection::All => Ok((0..len).collect()),
        Selection::Latest => Ok(vec![len - 1]),
        Selection::Index(index) if index < len => Ok(vec![index]),
        Selection::Index(index) => Err(HistoryError::InvalidIndex {
            index,
            max: len - 1,
        }),
    }
}
