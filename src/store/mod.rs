// Remote file store collaborator.
//
// The dedup logic only needs two things from the store: paged listing of
// file metadata and a way to move a file to the trash. Anything that talks
// to a real remote service implements `FileStore`.

pub mod listing;
pub mod memory;
pub mod query;

pub use listing::ListingStore;
pub use memory::MemoryStore;
pub use query::Query;

use crate::core::record::FileRecord;
use crate::error::StoreError;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// One page of a listing, in the remote response shape.
///
/// Records that cannot be read at all (no id, wrong field types) are skipped
/// with a warning instead of failing the page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePage {
    #[serde(default, deserialize_with = "readable_records")]
    pub files: Vec<FileRecord>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

fn readable_records<'de, D>(deserializer: D) -> Result<Vec<FileRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<FileRecord>(value) {
            Ok(record) => Some(record),
            Err(err) => {
                log::warn!("Skipping unreadable listing record: {}", err);
                None
            }
        })
        .collect())
}

pub trait FileStore {
    /// Fetch one page; `page_token` is `None` for the first page.
    fn list(&self, query: &Query, page_token: Option<&str>) -> Result<FilePage, StoreError>;

    /// Move a file to the trash.
    fn trash(&mut self, id: &str) -> Result<(), StoreError>;

    /// Take a file back out of the trash.
    fn restore(&mut self, id: &str) -> Result<(), StoreError>;
}

pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Cut one page out of already-filtered records. Page tokens are offsets.
pub(crate) fn paginate(
    matching: Vec<&FileRecord>,
    page_size: usize,
    page_token: Option<&str>,
) -> Result<FilePage, StoreError> {
    let start = match page_token {
        None => 0,
        Some(token) => token
            .parse::<usize>()
            .ok()
            .filter(|&offset| offset <= matching.len())
            .ok_or_else(|| StoreError::UnknownPage(token.to_string()))?,
    };
    let end = matching.len().min(start + page_size.max(1));

    Ok(FilePage {
        files: matching[start..end].iter().map(|&r| r.clone()).collect(),
        next_page_token: (end < matching.len()).then(|| end.to_string()),
    })
}

/// Every record matching a query, in listing order.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub files: Vec<FileRecord>,
    pub pages: usize,
}

/// Walk all pages of a listing. Failures are returned as-is, nothing is retried.
pub fn fetch_all<S: FileStore + ?Sized>(store: &S, query: &Query) -> Result<Listing, StoreError> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Fetching metadata…");
    spinner.enable_steady_tick(Duration::from_millis(100));

    log::debug!(
        "listing with query: {} (fields {}, ordered by {})",
        query,
        Query::fields(),
        Query::order_by()
    );

    let mut listing = Listing::default();
    let mut page_token: Option<String> = None;
    loop {
        let page = match store.list(query, page_token.as_deref()) {
            Ok(page) => page,
            Err(err) => {
                spinner.abandon_with_message("Fetch failed");
                return Err(err);
            }
        };
        listing.pages += 1;
        listing.files.extend(page.files);
        spinner.set_message(format!(
            "Fetching metadata… {} file(s), {} page(s)",
            listing.files.len(),
            listing.pages
        ));

        match page.next_page_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    spinner.finish_with_message(format!(
        "Fetched {} file(s) in {} page(s)",
        listing.files.len(),
        listing.pages
    ));
    Ok(listing)
}
