// Secondary matching for renamed uploads.
//
// The photo service renames its copies to `YYYY-MM-DD HH.MM.SS` while the
// phone keeps `IMG_YYYYMMDD_HHMMSS`, and the two clocks can round to
// neighbouring seconds. For every canonically named photo we rebuild the
// device names one second either side and look those up directly.

use crate::core::grouping::is_eligible;
use crate::core::naming::ShotName;
use crate::core::policy::{self, ResolutionOutcome};
use crate::core::record::FileRecord;
use std::collections::{HashMap, HashSet};

pub const SECOND_OFFSETS: [i64; 3] = [-1, 0, 1];

/// One renamed copy found for a higher-resolution photo.
#[derive(Debug, Clone)]
pub struct FuzzyMatch<'a> {
    /// Device name the lower-resolution copy was found under.
    pub matched_name: String,
    /// Seconds between the two names.
    pub offset: i64,
    pub outcome: ResolutionOutcome<'a>,
}

/// Find lower-resolution device-named copies of canonically named photos and
/// run each pair through the resolution policy.
pub fn find_renamed<'a>(records: &'a [FileRecord]) -> Vec<FuzzyMatch<'a>> {
    let eligible: Vec<&FileRecord> = records.iter().filter(|r| is_eligible(r)).collect();

    let mut by_name: HashMap<&str, Vec<&FileRecord>> = HashMap::new();
    for &record in &eligible {
        by_name.entry(record.name.as_str()).or_default().push(record);
    }

    let mut claimed: HashSet<&str> = HashSet::new();
    let mut matches = Vec::new();

    for &current in &eligible {
        let Some(shot) = ShotName::parse_canonical(&current.name) else {
            continue;
        };
        let current_area = current.pixel_area().unwrap_or(0);

        for offset in SECOND_OFFSETS {
            let Some(device_name) = shot.shifted(offset).map(|s| s.to_device()) else {
                continue;
            };
            let Some(candidates) = by_name.get(device_name.as_str()) else {
                continue;
            };

            for &candidate in candidates {
                if candidate.id == current.id
                    || candidate.pixel_area().unwrap_or(0) >= current_area
                    || claimed.contains(candidate.id.as_str())
                {
                    continue;
                }

                let Some(outcome) = policy::evaluate(&[candidate, current]) else {
                    continue;
                };
                if !outcome.targets().is_empty() {
                    claimed.insert(candidate.id.as_str());
                }
                log::debug!(
                    "renamed copy {} matches {} at offset {}",
                    candidate.name,
                    current.name,
                    offset
                );
                matches.push(FuzzyMatch {
                    matched_name: device_name.clone(),
                    offset,
                    outcome,
                });
            }
        }
    }

    matches
}
