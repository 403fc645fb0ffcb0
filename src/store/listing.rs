use super::{paginate, FilePage, FileStore, Query, DEFAULT_PAGE_SIZE};
use crate::core::record::FileRecord;
use crate::error::StoreError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

pub const LEDGER_FILE: &str = "trashed.jsonl";

#[derive(Debug, Serialize, Deserialize)]
struct LedgerEntry {
    id: String,
    trashed: bool,
    at: String,
}

/// File store backed by an exported `files.list` listing.
///
/// Trash and restore requests are appended to a JSONL ledger in the state
/// directory; the last entry for an id decides whether it is trashed.
#[derive(Debug)]
pub struct ListingStore {
    files: Vec<FileRecord>,
    ledger_path: PathBuf,
    trashed: HashMap<String, bool>,
    page_size: usize,
}

impl ListingStore {
    pub fn open(listing: &Path, state_dir: &Path) -> Result<Self, StoreError> {
        let raw = fs::read_to_string(listing).map_err(|e| StoreError::io(listing, e))?;
        let mut files: Vec<FileRecord> =
            read_pages(&raw)?.into_iter().flat_map(|p| p.files).collect();
        // Listings are served oldest first, like the remote `orderBy=createdTime`.
        files.sort_by(|a, b| a.created_time.cmp(&b.created_time));

        let ledger_path = state_dir.join(LEDGER_FILE);
        let trashed = read_ledger(&ledger_path)?;

        log::info!(
            "Loaded {} file(s) from {}, {} ledger entries",
            files.len(),
            listing.display(),
            trashed.len()
        );

        Ok(Self {
            files,
            ledger_path,
            trashed,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }

    fn is_trashed(&self, record: &FileRecord) -> bool {
        self.trashed
            .get(&record.id)
            .copied()
            .unwrap_or_else(|| record.trashed.unwrap_or(false))
    }

    fn record(&mut self, id: &str, trashed: bool) -> Result<(), StoreError> {
        if !self.files.iter().any(|f| f.id == id) {
            return Err(StoreError::UnknownFile(id.to_string()));
        }

        if let Some(parent) = self.ledger_path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let entry = LedgerEntry {
            id: id.to_string(),
            trashed,
            at: Utc::now().to_rfc3339(),
        };
        let mut out = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.ledger_path)
            .map_err(|e| StoreError::io(&self.ledger_path, e))?;
        writeln!(out, "{}", serde_json::to_string(&entry)?)
            .map_err(|e| StoreError::io(&self.ledger_path, e))?;

        self.trashed.insert(entry.id, trashed);
        Ok(())
    }
}

impl FileStore for ListingStore {
    fn list(&self, query: &Query, page_token: Option<&str>) -> Result<FilePage, StoreError> {
        query.ensure_local()?;

        let matching: Vec<&FileRecord> = self
            .files
            .iter()
            .filter(|f| query.matches(f, self.is_trashed(f)))
            .collect();
        paginate(matching, self.page_size, page_token)
    }

    fn trash(&mut self, id: &str) -> Result<(), StoreError> {
        self.record(id, true)
    }

    fn restore(&mut self, id: &str) -> Result<(), StoreError> {
        self.record(id, false)
    }
}

/// An export holds either one response object or an array of them.
fn read_pages(raw: &str) -> Result<Vec<FilePage>, StoreError> {
    let pages = match serde_json::from_str::<serde_json::Value>(raw)? {
        serde_json::Value::Array(pages) => pages
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<FilePage>, _>>()?,
        page => vec![serde_json::from_value(page)?],
    };
    Ok(pages)
}

fn read_ledger(path: &Path) -> Result<HashMap<String, bool>, StoreError> {
    let mut state = HashMap::new();
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(state),
        Err(e) => return Err(StoreError::io(path, e)),
    };

    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| StoreError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<LedgerEntry>(&line) {
            Ok(entry) => {
                state.insert(entry.id, entry.trashed);
            }
            Err(err) => log::warn!("Skipping malformed ledger entry {}: {}", i, err),
        }
    }
    Ok(state)
}
