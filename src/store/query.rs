use crate::core::record::FileRecord;
use crate::error::StoreError;
use std::cmp::Ordering;
use std::fmt;

pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// Listing filter, rendered in the remote query language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub mime_type: String,
    /// Extra free-text clause appended with `and`.
    pub extra: Option<String>,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            extra: None,
        }
    }
}

impl Query {
    pub fn with_extra(mut self, extra: Option<String>) -> Self {
        self.extra = extra.filter(|e| !e.trim().is_empty());
        self
    }

    /// Field list requested from the remote side for every file.
    pub fn fields() -> &'static str {
        "nextPageToken,files(id,name,size,mimeType,trashed,modifiedTime,createdTime,\
         ownedByMe,webViewLink,imageMediaMetadata(width,height,cameraModel,time))"
    }

    pub fn order_by() -> &'static str {
        "createdTime"
    }

    /// Evaluate the query against a record for stores that filter locally.
    /// `trashed` is the store's own view of the trash state. A clause that
    /// cannot be evaluated never matches; stores reject such queries up
    /// front with [`Query::ensure_local`].
    pub fn matches(&self, record: &FileRecord, trashed: bool) -> bool {
        if trashed {
            return false;
        }
        if record
            .mime_type
            .as_deref()
            .is_some_and(|mime| mime != self.mime_type)
        {
            return false;
        }
        self.extra_clauses().iter().all(|clause| {
            clause
                .matches(&record.name, record.created_time.as_deref())
                .unwrap_or(false)
        })
    }

    /// Parse the extra clause into the subset a local store can evaluate.
    /// Clauses it cannot read come back as [`Clause::Unsupported`].
    pub fn extra_clauses(&self) -> Vec<Clause> {
        self.extra
            .as_deref()
            .map(|extra| split_clauses(extra).into_iter().map(Clause::parse).collect())
            .unwrap_or_default()
    }

    /// Fail when any extra clause is outside the locally supported subset.
    pub fn ensure_local(&self) -> Result<(), StoreError> {
        let unsupported = self.extra_clauses().into_iter().find_map(|clause| match clause {
            Clause::Unsupported(text) => Some(text),
            _ => None,
        });
        match unsupported {
            Some(text) => Err(StoreError::UnsupportedQuery(text)),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mimeType='{}' and trashed=false", self.mime_type)?;
        if let Some(extra) = &self.extra {
            write!(f, " and {}", extra.trim())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    NameContains(String),
    CreatedTime(Ordering, bool, String),
    Unsupported(String),
}

impl Clause {
    fn parse(raw: &str) -> Clause {
        let text = raw.trim();

        if let Some(value) = text
            .strip_prefix("name contains ")
            .and_then(|rest| unquote(rest.trim()))
        {
            return Clause::NameContains(value);
        }

        if let Some(rest) = text.strip_prefix("createdTime") {
            let rest = rest.trim_start();
            let parsed = [
                (">=", Ordering::Greater, true),
                ("<=", Ordering::Less, true),
                (">", Ordering::Greater, false),
                ("<", Ordering::Less, false),
            ]
            .into_iter()
            .find_map(|(op, ordering, inclusive)| {
                let value = unquote(rest.strip_prefix(op)?.trim())?;
                Some(Clause::CreatedTime(ordering, inclusive, value))
            });
            if let Some(clause) = parsed {
                return clause;
            }
        }

        Clause::Unsupported(text.to_string())
    }

    /// `None` when the clause cannot be evaluated locally.
    pub fn matches(&self, name: &str, created_time: Option<&str>) -> Option<bool> {
        match self {
            Clause::NameContains(needle) => Some(name.contains(needle.as_str())),
            Clause::CreatedTime(ordering, inclusive, bound) => {
                let Some(created) = created_time else {
                    return Some(false);
                };
                let cmp = created.cmp(bound.as_str());
                Some(cmp == *ordering || (*inclusive && cmp == Ordering::Equal))
            }
            Clause::Unsupported(_) => None,
        }
    }
}

/// Split on top-level ` and `; quoted text is never split.
fn split_clauses(extra: &str) -> Vec<&str> {
    const AND: &str = " and ";
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;

    for (i, c) in extra.char_indices() {
        if i < start {
            continue;
        }
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if quoted => escaped = true,
            '\'' => quoted = !quoted,
            ' ' if !quoted && extra[i..].starts_with(AND) => {
                parts.push(&extra[start..i]);
                start = i + AND.len();
            }
            _ => {}
        }
    }
    parts.push(&extra[start..]);
    parts
}

/// Strip one pair of single quotes. A bare quote inside the value means the
/// text is more than one literal, so it is rejected.
fn unquote(value: &str) -> Option<String> {
    let inner = value.strip_prefix('\'')?.strip_suffix('\'')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push(chars.next()?),
            '\'' => return None,
            c => out.push(c),
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_base_query() {
        assert_eq!(
            Query::default().to_string(),
            "mimeType='image/jpeg' and trashed=false"
        );
    }

    #[test]
    fn test_render_with_extra() {
        let query = Query::default().with_extra(Some("name contains '2016-01-02'".into()));
        assert_eq!(
            query.to_string(),
            "mimeType='image/jpeg' and trashed=false and name contains '2016-01-02'"
        );
    }

    #[test]
    fn test_blank_extra_is_dropped() {
        let query = Query::default().with_extra(Some("   ".into()));
        assert!(query.extra.is_none());
    }

    #[test]
    fn test_parse_clauses() {
        let query = Query::default().with_extra(Some(
            "name contains 'IMG' and createdTime >= '2016-01-02' and starred=true".into(),
        ));
        assert_eq!(
            query.extra_clauses(),
            vec![
                Clause::NameContains("IMG".into()),
                Clause::CreatedTime(Ordering::Greater, true, "2016-01-02".into()),
                Clause::Unsupported("starred=true".into()),
            ]
        );
    }

    #[test]
    fn test_created_time_bounds() {
        let after = Clause::parse("createdTime > '2016-01-02'");
        assert_eq!(after.matches("a", Some("2016-01-02")), Some(false));
        assert_eq!(after.matches("a", Some("2016-01-03T00:00:00Z")), Some(true));
        assert_eq!(after.matches("a", None), Some(false));

        let before = Clause::parse("createdTime <= '2016-01-02'");
        assert_eq!(before.matches("a", Some("2016-01-02")), Some(true));
        assert_eq!(before.matches("a", Some("2016-01-03")), Some(false));
    }

    #[test]
    fn test_matches_record() {
        let mut record = FileRecord {
            id: "a".into(),
            name: "IMG_20160102_101010.jpg".into(),
            mime_type: Some("image/jpeg".into()),
            created_time: Some("2016-01-02T10:10:10Z".into()),
            ..FileRecord::default()
        };
        let query = Query::default().with_extra(Some(
            "name contains '20160102' and createdTime >= '2016-01-02'".into(),
        ));

        assert!(query.matches(&record, false));
        assert!(!query.matches(&record, true));

        record.mime_type = Some("image/png".into());
        assert!(!query.matches(&record, false));

        record.mime_type = None;
        record.name = "other.jpg".into();
        assert!(!query.matches(&record, false));
    }

    #[test]
    fn test_unsupported_clause_has_no_verdict() {
        assert_eq!(Clause::parse("starred=true").matches("a", None), None);
    }

    #[test]
    fn test_and_inside_quotes_is_not_split() {
        let query = Query::default().with_extra(Some("name contains 'rock and roll'".into()));
        assert_eq!(
            query.extra_clauses(),
            vec![Clause::NameContains("rock and roll".into())]
        );
        assert!(query.ensure_local().is_ok());

        let rock = FileRecord {
            id: "rock".into(),
            name: "rock and roll.jpg".into(),
            ..FileRecord::default()
        };
        let other = FileRecord {
            id: "other".into(),
            name: "IMG_20200101_120000.jpg".into(),
            ..FileRecord::default()
        };
        assert!(query.matches(&rock, false));
        assert!(!query.matches(&other, false));
    }

    #[test]
    fn test_escaped_quote_in_literal() {
        let query = Query::default().with_extra(Some(
            r"name contains 'don\'t and stop' and createdTime < '2020'".into(),
        ));
        assert_eq!(
            query.extra_clauses(),
            vec![
                Clause::NameContains("don't and stop".into()),
                Clause::CreatedTime(Ordering::Less, false, "2020".into()),
            ]
        );
    }

    #[test]
    fn test_negated_and_or_clauses_are_rejected() {
        for extra in [
            "not name contains 'IMG'",
            "name contains 'a' or name contains 'b'",
            "name contains 'a' and starred=true",
        ] {
            let query = Query::default().with_extra(Some(extra.into()));
            assert!(
                matches!(query.ensure_local(), Err(StoreError::UnsupportedQuery(_))),
                "{extra}"
            );
        }
    }

    #[test]
    fn test_unsupported_clause_matches_nothing() {
        let record = FileRecord {
            id: "a".into(),
            name: "IMG_1.jpg".into(),
            ..FileRecord::default()
        };
        let query = Query::default().with_extra(Some("not name contains 'IMG'".into()));
        assert!(!query.matches(&record, false));
    }
}
