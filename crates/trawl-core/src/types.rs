use serde::{Deserialize, Serialize};

/// Placeholder stored in `Post::url` when no permalink could be built.
pub const NO_URL: &str = "N/A";

/// Minimum normalized text length for a candidate to count as a post.
pub const MIN_POST_TEXT_CHARS: usize = 10;

/// One recruiting post pulled from a group feed.
///
/// Identity is `id`: two posts with the same id are the same entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: String,
    pub text: String,
    pub author: String,
    pub url: String,
    /// Creation time of the local record, unix milliseconds.
    pub timestamp: i64,
    #[serde(default)]
    pub score: u32,
    #[serde(default)]
    pub matched_keywords: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DetectionKind {
    /// Page text missing or suspiciously short.
    Blank,
    /// Captcha, checkpoint, or other challenge page.
    Interstitial,
    /// The detector itself failed; callers treat this like a positive hit.
    Unknown,
}

impl DetectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionKind::Blank => "blank",
            DetectionKind::Interstitial => "interstitial",
            DetectionKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for DetectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A positive detector verdict. "No detection" is `Option::<Detection>::None`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Detection {
    pub kind: DetectionKind,
}

impl Detection {
    pub fn new(kind: DetectionKind) -> Self {
        Self { kind }
    }
}

/// Counts gathered during candidate discovery, reported with every extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Diagnostics {
    pub url: String,
    pub body_len: usize,
    /// Name of the discovery strategy that produced the candidates, if any did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    pub candidates: usize,
    pub feed_found: bool,
    pub article_count: usize,
}

/// What the page-side agent hands back for one `begin extraction` request.
/// The variants are mutually exclusive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExtractionResult {
    Posts {
        posts: Vec<Post>,
        #[serde(default)]
        diagnostics: Diagnostics,
    },
    Detection {
        detection: Detection,
    },
    Error {
        reason: String,
    },
}

impl ExtractionResult {
    pub fn timeout() -> Self {
        ExtractionResult::Error {
            reason: "TIMEOUT".into(),
        }
    }

    pub fn detection(&self) -> Option<Detection> {
        match self {
            ExtractionResult::Detection { detection } => Some(*detection),
            _ => None,
        }
    }
}

/// Current wall-clock time as unix milliseconds.
pub fn now_millis() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// ISO calendar day (`YYYY-MM-DD`, UTC) for a unix-millisecond timestamp.
pub fn iso_day(millis: i64) -> String {
    let dt = time::OffsetDateTime::from_unix_timestamp_nanos(millis as i128 * 1_000_000)
        .unwrap_or(time::OffsetDateTime::UNIX_EPOCH);
    let d = dt.date();
    format!("{:04}-{:02}-{:02}", d.year(), u8::from(d.month()), d.day())
}

/// Render unix milliseconds as RFC 3339, falling back to the raw number.
pub fn format_millis(millis: i64) -> String {
    time::OffsetDateTime::from_unix_timestamp_nanos(millis as i128 * 1_000_000)
        .ok()
        .and_then(|dt| {
            dt.format(&time::format_description::well_known::Rfc3339)
                .ok()
        })
        .unwrap_or_else(|| millis.to_string())
}

pub const MILLIS_PER_HOUR: i64 = 3_600_000;
