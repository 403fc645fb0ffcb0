use super::{paginate, FilePage, FileStore, Query, DEFAULT_PAGE_SIZE};
use crate::core::record::FileRecord;
use crate::error::StoreError;
use std::collections::HashSet;

/// A store held entirely in memory. Every trash call is recorded, which
/// makes it the store of choice for dry runs in tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: Vec<FileRecord>,
    page_size: usize,
    trashed: HashSet<String>,
    trash_calls: Vec<String>,
    fail_list: bool,
    fail_trash_on: Option<String>,
}

impl MemoryStore {
    pub fn new(files: Vec<FileRecord>) -> Self {
        Self {
            files,
            page_size: DEFAULT_PAGE_SIZE,
            ..Self::default()
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Make every listing call fail.
    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    /// Make trashing `id` fail.
    pub fn failing_trash_on(mut self, id: &str) -> Self {
        self.fail_trash_on = Some(id.to_string());
        self
    }

    /// Ids passed to successful `trash` calls, in call order.
    pub fn trash_calls(&self) -> &[String] {
        &self.trash_calls
    }

    pub fn is_trashed(&self, id: &str) -> bool {
        self.trashed.contains(id)
    }

    fn simulated_failure(what: &str) -> StoreError {
        StoreError::io(
            "memory",
            std::io::Error::other(format!("{} failed", what)),
        )
    }

    fn require(&self, id: &str) -> Result<(), StoreError> {
        if self.files.iter().any(|f| f.id == id) {
            Ok(())
        } else {
            Err(StoreError::UnknownFile(id.to_string()))
        }
    }
}

impl FileStore for MemoryStore {
    fn list(&self, query: &Query, page_token: Option<&str>) -> Result<FilePage, StoreError> {
        if self.fail_list {
            return Err(Self::simulated_failure("list"));
        }
        query.ensure_local()?;
        let matching: Vec<&FileRecord> = self
            .files
            .iter()
            .filter(|f| {
                let trashed = f.trashed.unwrap_or(false) || self.trashed.contains(&f.id);
                query.matches(f, trashed)
            })
            .collect();
        paginate(matching, self.page_size, page_token)
    }

    fn trash(&mut self, id: &str) -> Result<(), StoreError> {
        self.require(id)?;
        if self.fail_trash_on.as_deref() == Some(id) {
            return Err(Self::simulated_failure("trash"));
        }
        self.trashed.insert(id.to_string());
        self.trash_calls.push(id.to_string());
        Ok(())
    }

    fn restore(&mut self, id: &str) -> Result<(), StoreError> {
        self.require(id)?;
        self.trashed.remove(id);
        Ok(())
    }
}
