//! Parsing and formatting of the two photo-name shapes seen in backups.
//!
//! Phones upload as `IMG_YYYYMMDD_HHMMSS<suffix>` while the photo service
//! renames its own copies to `YYYY-MM-DD HH.MM.SS<suffix>`. Both parsers are
//! total: anything that does not match exactly, including impossible dates,
//! gives `None`.

use chrono::{Duration, NaiveDate, NaiveDateTime};

const DEVICE_PREFIX: &str = "IMG_";

/// A photo name broken into its capture second and trailing suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShotName {
    pub taken: NaiveDateTime,
    pub suffix: String,
}

impl ShotName {
    /// Parse `IMG_YYYYMMDD_HHMMSS<suffix>`.
    pub fn parse_device(name: &str) -> Option<Self> {
        let rest = name.strip_prefix(DEVICE_PREFIX)?;
        let date = rest.get(0..8)?;
        if rest.get(8..9)? != "_" {
            return None;
        }
        let time = rest.get(9..15)?;
        if !all_digits(date) || !all_digits(time) {
            return None;
        }

        let taken = build_timestamp(
            digits(&date[0..4])?,
            digits(&date[4..6])?,
            digits(&date[6..8])?,
            digits(&time[0..2])?,
            digits(&time[2..4])?,
            digits(&time[4..6])?,
        )?;

        Some(Self {
            taken,
            suffix: rest[15..].to_string(),
        })
    }

    /// Parse `YYYY-MM-DD HH.MM.SS<suffix>`.
    pub fn parse_canonical(name: &str) -> Option<Self> {
        let head = name.get(0..19)?;
        if !head.is_ascii() {
            return None;
        }
        let bytes = head.as_bytes();
        let separators = [(4, b'-'), (7, b'-'), (10, b' '), (13, b'.'), (16, b'.')];
        if separators.iter().any(|&(i, sep)| bytes[i] != sep) {
            return None;
        }

        let taken = build_timestamp(
            digits(&head[0..4])?,
            digits(&head[5..7])?,
            digits(&head[8..10])?,
            digits(&head[11..13])?,
            digits(&head[14..16])?,
            digits(&head[17..19])?,
        )?;

        Some(Self {
            taken,
            suffix: name[19..].to_string(),
        })
    }

    pub fn to_device(&self) -> String {
        format!(
            "{}{}{}",
            DEVICE_PREFIX,
            self.taken.format("%Y%m%d_%H%M%S"),
            self.suffix
        )
    }

    pub fn to_canonical(&self) -> String {
        format!("{}{}", self.taken.format("%Y-%m-%d %H.%M.%S"), self.suffix)
    }

    /// Same suffix, capture time moved by `seconds`.
    pub fn shifted(&self, seconds: i64) -> Option<Self> {
        let taken = self
            .taken
            .checked_add_signed(Duration::try_seconds(seconds)?)?;
        Some(Self {
            taken,
            suffix: self.suffix.clone(),
        })
    }
}

/// Rewrite a device-native name into the canonical shape, if it is one.
pub fn normalize_device_name(name: &str) -> Option<String> {
    ShotName::parse_device(name).map(|shot| shot.to_canonical())
}

fn all_digits(field: &str) -> bool {
    !field.is_empty() && field.bytes().all(|b| b.is_ascii_digit())
}

fn digits(field: &str) -> Option<u32> {
    if !all_digits(field) {
        return None;
    }
    field.parse().ok()
}

fn build_timestamp(
    year: u32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)?
        .and_hms_opt(hour, minute, second)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_device_name_keeps_suffix() {
        assert_eq!(
            normalize_device_name("IMG_20210630_235959extra.jpg").as_deref(),
            Some("2021-06-30 23.59.59extra.jpg")
        );
    }

    #[test]
    fn test_parse_device_rejects_near_misses() {
        for name in [
            "IMG_2021063_235959.jpg",
            "IMG_20210630-235959.jpg",
            "IMG_20210630_23595.jpg",
            "img_20210630_235959.jpg",
            "IMG_2021O630_235959.jpg",
            "IMG_20210230_120000.jpg",
            "IMG_20210630_246000.jpg",
            "DSC_0001.jpg",
            "IMG_",
            "",
        ] {
            assert!(ShotName::parse_device(name).is_none(), "{name}");
        }
    }

    #[test]
    fn test_parse_device_multibyte_does_not_panic() {
        assert!(ShotName::parse_device("IMG_2021063é_235959.jpg").is_none());
        assert!(ShotName::parse_canonical("2021-06-30 23.59.5é.jpg").is_none());
    }

    #[test]
    fn test_parse_canonical() {
        let shot = ShotName::parse_canonical("2020-01-01 12.00.01.jpg").unwrap();
        assert_eq!(shot.suffix, ".jpg");
        assert_eq!(shot.to_device(), "IMG_20200101_120001.jpg");
        assert_eq!(shot.to_canonical(), "2020-01-01 12.00.01.jpg");
    }

    #[test]
    fn test_parse_canonical_rejects_wrong_separators() {
        assert!(ShotName::parse_canonical("2020-01-01_12.00.01.jpg").is_none());
        assert!(ShotName::parse_canonical("2020/01/01 12.00.01.jpg").is_none());
        assert!(ShotName::parse_canonical("2020-01-01 12:00:01.jpg").is_none());
        assert!(ShotName::parse_canonical("2020-01-01").is_none());
    }

    #[test]
    fn test_shift_rolls_over_day_boundary() {
        let shot = ShotName::parse_canonical("2020-12-31 23.59.59.jpg").unwrap();
        assert_eq!(
            shot.shifted(1).unwrap().to_device(),
            "IMG_20210101_000000.jpg"
        );

        let shot = ShotName::parse_canonical("2021-01-01 00.00.00.jpg").unwrap();
        assert_eq!(
            shot.shifted(-1).unwrap().to_device(),
            "IMG_20201231_235959.jpg"
        );
    }

    #[test]
    fn test_device_round_trip_through_canonical() {
        let device = "IMG_20200101_120000_HDR.jpg";
        let canonical = normalize_device_name(device).unwrap();
        let back = ShotName::parse_canonical(&canonical).unwrap().to_device();
        assert_eq!(back, device);
    }
}
