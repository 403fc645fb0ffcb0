use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Image metadata block attached to a remote file.
///
/// Every field is optional: the remote side omits whatever it could not read
/// from the upload. Dimensions that are not non-negative integers read as
/// absent, which leaves the record ineligible for grouping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMediaMetadata {
    #[serde(
        default,
        deserialize_with = "lenient_dimension",
        skip_serializing_if = "Option::is_none"
    )]
    pub width: Option<u32>,
    #[serde(
        default,
        deserialize_with = "lenient_dimension",
        skip_serializing_if = "Option::is_none"
    )]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

/// Snapshot of one remote file as returned by a listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    #[serde(
        default,
        deserialize_with = "lenient_size",
        skip_serializing_if = "Option::is_none"
    )]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owned_by_me: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trashed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_metadata",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_media_metadata: Option<ImageMediaMetadata>,
}

impl FileRecord {
    pub fn is_owned(&self) -> bool {
        self.owned_by_me.unwrap_or(false)
    }

    /// `(width, height)` when both are known.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        let meta = self.image_media_metadata.as_ref()?;
        Some((meta.width?, meta.height?))
    }

    /// Pixel count, or `None` for records without usable dimensions.
    pub fn pixel_area(&self) -> Option<u64> {
        self.dimensions().map(|(w, h)| u64::from(w) * u64::from(h))
    }

    /// The metadata capture time, ignoring values too short to be real.
    pub fn capture_time(&self) -> Option<&str> {
        let time = self.image_media_metadata.as_ref()?.time.as_deref()?;
        (time.chars().count() > 5).then_some(time)
    }

    pub fn camera_model(&self) -> Option<&str> {
        self.image_media_metadata
            .as_ref()?
            .camera_model
            .as_deref()
            .filter(|model| !model.is_empty())
    }

    pub fn has_camera_model(&self) -> bool {
        self.camera_model().is_some()
    }

    /// One-line summary used in reports: `name (WxH, N MP, K KiB), link`.
    pub fn summary(&self) -> RecordSummary<'_> {
        RecordSummary(self)
    }
}

pub struct RecordSummary<'a>(&'a FileRecord);

impl fmt::Display for RecordSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.0;
        write!(f, "{} (", record.name)?;
        match record.dimensions() {
            Some((w, h)) => write!(f, "{}x{}", w, h)?,
            None => f.write_str("?x?")?,
        }
        let megapixels = record.pixel_area().unwrap_or(0) / (1024 * 1024);
        write!(f, ", {} MP, ", megapixels)?;
        match record.size {
            Some(size) => write!(f, "{} KiB", size / 1024)?,
            None => f.write_str("? KiB")?,
        }
        write!(
            f,
            "), {}",
            record.web_view_link.as_deref().unwrap_or("<no link>")
        )
    }
}

/// Integer that may arrive as a JSON number or, like the remote API's int64
/// values, as a string. Anything unreadable becomes `None`.
fn lenient_integer<T: TryFrom<u64>>(field: &str, raw: Value) -> Option<T> {
    let parsed = match &raw {
        Value::Number(n) => n.as_u64(),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    }
    .and_then(|n| T::try_from(n).ok());

    if parsed.is_none() {
        log::warn!("Ignoring unreadable {}: {}", field, raw);
    }
    parsed
}

fn lenient_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(|raw| lenient_integer("size", raw)))
}

fn lenient_dimension<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .and_then(|raw| lenient_integer("image dimension", raw)))
}

fn lenient_metadata<'de, D>(deserializer: D) -> Result<Option<ImageMediaMetadata>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(|raw| {
        serde_json::from_value(raw)
            .map_err(|err| log::warn!("Ignoring unreadable imageMediaMetadata: {}", err))
            .ok()
    }))
}
