// Equivalence grouping of remote photos.
//
// Records are bucketed by a derived key: the capture time from metadata when
// it looks real, otherwise the file name (device-style names are rewritten to
// the canonical shape first so both uploads land in the same bucket).

use crate::core::naming::normalize_device_name;
use crate::core::record::FileRecord;
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Time,
    DeviceName,
    Name,
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeySource::Time => "capture time",
            KeySource::DeviceName => "device name",
            KeySource::Name => "file name",
        })
    }
}

/// Bucket key. Equality and ordering only look at the key text, so a
/// name-derived key that equals a time-derived one shares its bucket.
#[derive(Debug, Clone)]
pub struct GroupKey {
    pub value: String,
    pub source: KeySource,
}

impl GroupKey {
    /// Derive the key for a record, or `None` when it has no image metadata.
    pub fn derive(record: &FileRecord) -> Option<Self> {
        if record.image_media_metadata.is_none() {
            return None;
        }

        if let Some(time) = record.capture_time() {
            return Some(Self {
                value: time.to_string(),
                source: KeySource::Time,
            });
        }

        match normalize_device_name(&record.name) {
            Some(value) => Some(Self {
                value,
                source: KeySource::DeviceName,
            }),
            None => Some(Self {
                value: record.name.clone(),
                source: KeySource::Name,
            }),
        }
    }
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for GroupKey {}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Records sharing a key, sorted ascending by pixel area.
#[derive(Debug, Clone)]
pub struct DuplicateGroup<'a> {
    pub key: GroupKey,
    pub members: Vec<&'a FileRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    pub total: usize,
    pub with_time: usize,
    pub eligible: usize,
    pub groups: usize,
}

/// Whether a record may take part in duplicate detection at all.
pub fn is_eligible(record: &FileRecord) -> bool {
    record.is_owned() && record.dimensions().is_some()
}

/// Bucket the records and keep only buckets that look like the same photo
/// uploaded at different resolutions.
pub fn build_groups(records: &[FileRecord]) -> (Vec<DuplicateGroup<'_>>, GroupingStats) {
    let mut stats = GroupingStats {
        total: records.len(),
        with_time: records.iter().filter(|r| r.capture_time().is_some()).count(),
        ..GroupingStats::default()
    };

    let mut keyed: Vec<(GroupKey, &FileRecord)> = records
        .iter()
        .filter(|record| is_eligible(record))
        .filter_map(|record| GroupKey::derive(record).map(|key| (key, record)))
        .collect();
    stats.eligible = keyed.len();

    // Stable, so members keep listing order inside a bucket.
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    let groups: Vec<DuplicateGroup<'_>> = keyed
        .chunk_by(|a, b| a.0 == b.0)
        .filter(|run| run.len() > 1)
        .filter(|run| has_resolution_variation(run.iter().map(|(_, record)| *record)))
        .map(|run| {
            let mut members: Vec<&FileRecord> = run.iter().map(|(_, record)| *record).collect();
            members.sort_by_key(|record| record.pixel_area().unwrap_or(0));
            DuplicateGroup {
                key: run[0].0.clone(),
                members,
            }
        })
        .collect();

    stats.groups = groups.len();
    log::debug!(
        "grouped {} eligible of {} records into {} duplicate groups",
        stats.eligible,
        stats.total,
        stats.groups
    );

    (groups, stats)
}

/// True when at least two members differ in `(width, height)`.
fn has_resolution_variation<'a>(mut members: impl Iterator<Item = &'a FileRecord>) -> bool {
    let Some(first) = members.next().and_then(FileRecord::dimensions) else {
        return false;
    };
    members.any(|record| record.dimensions() != Some(first))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::fixtures::*;

    #[test]
    fn test_key_prefers_capture_time() {
        let record = with_time(
            photo("a", "IMG_20200101_120000.jpg", 10, 10, 1),
            "2020:01:01 12:00:00",
        );
        let key = GroupKey::derive(&record).unwrap();
        assert_eq!(key.value, "2020:01:01 12:00:00");
        assert_eq!(key.source, KeySource::Time);
    }

    #[test]
    fn test_key_falls_back_to_normalized_name_for_short_time() {
        let record = with_time(photo("a", "IMG_20200101_120000.jpg", 10, 10, 1), "12:00");
        let key = GroupKey::derive(&record).unwrap();
        assert_eq!(key.value, "2020-01-01 12.00.00.jpg");
        assert_eq!(key.source, KeySource::DeviceName);
    }

    #[test]
    fn test_key_uses_raw_name_otherwise() {
        let record = photo("a", "holiday.jpg", 10, 10, 1);
        let key = GroupKey::derive(&record).unwrap();
        assert_eq!(key.value, "holiday.jpg");
        assert_eq!(key.source, KeySource::Name);
    }

    #[test]
    fn test_key_requires_metadata() {
        let mut record = photo("a", "holiday.jpg", 10, 10, 1);
        record.image_media_metadata = None;
        assert!(GroupKey::derive(&record).is_none());
    }

    #[test]
    fn test_key_is_deterministic() {
        let record = photo("a", "IMG_20210630_235959extra.jpg", 10, 10, 1);
        let first = GroupKey::derive(&record).unwrap();
        let second = GroupKey::derive(&record).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.source, second.source);
    }

    #[test]
    fn test_device_and_canonical_names_share_a_group() {
        let records = vec![
            photo("a", "IMG_20200101_120000.jpg", 100, 100, 1000),
            photo("b", "2020-01-01 12.00.00.jpg", 4000, 3000, 5000),
        ];

        let (groups, stats) = build_groups(&records);
        assert_eq!(groups.len(), 1);
        assert_eq!(stats.eligible, 2);
        let ids: Vec<&str> = groups[0].members.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_same_resolution_group_is_dropped() {
        let records = vec![
            photo("a", "2020-01-01 12.00.00.jpg", 4000, 3000, 5000),
            photo("b", "IMG_20200101_120000.jpg", 4000, 3000, 5100),
            photo("c", "2020-01-01 12.00.00.jpg", 4000, 3000, 4900),
        ];

        let (groups, _) = build_groups(&records);
        assert!(groups.is_empty());
    }

    #[test]
    fn test_rotated_resolution_counts_as_variation() {
        let records = vec![
            photo("a", "x.jpg", 3000, 4000, 5000),
            photo("b", "x.jpg", 4000, 3000, 5000),
        ];

        let (groups, _) = build_groups(&records);
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn test_singletons_are_dropped() {
        let records = vec![
            photo("a", "one.jpg", 10, 10, 1),
            photo("b", "two.jpg", 20, 20, 2),
        ];

        let (groups, _) = build_groups(&records);
        assert!(groups.is_empty());
    }

    #[test]
    fn test_unowned_and_dimensionless_records_are_excluded() {
        let mut foreign = photo("c", "x.jpg", 300, 300, 3);
        foreign.owned_by_me = Some(false);
        let mut no_height = photo("d", "x.jpg", 400, 400, 4);
        if let Some(meta) = no_height.image_media_metadata.as_mut() {
            meta.height = None;
        }
        let mut no_meta = photo("e", "x.jpg", 500, 500, 5);
        no_meta.image_media_metadata = None;

        let records = vec![
            photo("a", "x.jpg", 100, 100, 1),
            foreign,
            no_height,
            no_meta,
        ];

        let (groups, stats) = build_groups(&records);
        assert!(groups.is_empty());
        assert_eq!(stats.total, 4);
        assert_eq!(stats.eligible, 1);
    }

    #[test]
    fn test_members_sorted_ascending_by_area() {
        let records = vec![
            photo("big", "x.jpg", 4000, 3000, 5000),
            photo("small", "x.jpg", 100, 100, 100),
            photo("mid", "x.jpg", 2000, 1500, 2000),
        ];

        let (groups, _) = build_groups(&records);
        let ids: Vec<&str> = groups[0].members.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["small", "mid", "big"]);
    }

    #[test]
    fn test_groups_come_out_in_key_order() {
        let records = vec![
            photo("z1", "zebra.jpg", 10, 10, 1),
            photo("a1", "apple.jpg", 10, 10, 1),
            photo("z2", "zebra.jpg", 20, 20, 2),
            photo("a2", "apple.jpg", 20, 20, 2),
        ];

        let (groups, stats) = build_groups(&records);
        let keys: Vec<&str> = groups.iter().map(|g| g.key.value.as_str()).collect();
        assert_eq!(keys, vec!["apple.jpg", "zebra.jpg"]);
        assert_eq!(stats.groups, 2);
    }

    #[test]
    fn test_stats_count_time_metadata() {
        let records = vec![
            with_time(photo("a", "a.jpg", 10, 10, 1), "2020:01:01 00:00:00"),
            with_time(photo("b", "b.jpg", 10, 10, 1), "bad"),
            photo("c", "c.jpg", 10, 10, 1),
        ];

        let (_, stats) = build_groups(&records);
        assert_eq!(stats.with_time, 1);
    }
}
