use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// Chirp identifier. Signed, so any integer a client sends is a valid lookup key.
pub type ChirpId = i32;

/// A single short text post.
///
/// Serialises to `{"id", "username", "content", "posted_at"}` with `posted_at`
/// rendered as a timezone-naive ISO-8601 timestamp. On input an offset
/// (`Z`, `+02:00`) is accepted and dropped, keeping the wall-clock time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chirp {
    pub id: ChirpId,
    pub username: String,
    pub content: String,
    #[serde(deserialize_with = "deserialize_posted_at")]
    pub posted_at: NaiveDateTime,
}

impl Chirp {
    pub fn new(id: ChirpId, username: &str, content: &str) -> Self {
        Self {
            id,
            username: username.to_string(),
            content: content.to_string(),
            posted_at: now_local(),
        }
    }
}

/// The list envelope used on the wire and in `chirps.json`: `{"chirps": [...]}`.
///
/// Generic so the federation layer can carry peer entries verbatim as
/// `serde_json::Value` without re-validating them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChirpList<T> {
    pub chirps: Vec<T>,
}

/// Body of `POST /chirps`. Missing fields deserialise to empty strings so the
/// handler can report them as invalid input instead of a parse failure.
#[derive(Debug, Deserialize)]
pub struct CreateChirpRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub content: String,
}

/// Body of a successful `DELETE /chirps/<id>`.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteChirpResponse {
    pub message: String,
}

fn deserialize_posted_at<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse::<NaiveDateTime>()
        .or_else(|_| DateTime::parse_from_rfc3339(&raw).map(|dt| dt.naive_local()))
        .map_err(serde::de::Error::custom)
}

/// Local wall-clock time without a zone, matching the stored timestamp format.
pub fn now_local() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}
