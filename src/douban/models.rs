//! Wire types for the Douban mobile "interests" API, plus the fixed
//! vocabularies (watch statuses, star ratings) the destination uses.

use chrono::{DateTime, NaiveDateTime, TimeZone, Timelike};
use serde::Deserialize;

use crate::calendar::shanghai;

/// Watch-status categories the source partitions a user's history into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchStatus {
    /// Wants to watch ("mark").
    Mark,
    /// Currently watching ("doing").
    Doing,
    /// Watched ("done").
    Done,
}

impl WatchStatus {
    pub const ALL: [WatchStatus; 3] = [WatchStatus::Mark, WatchStatus::Doing, WatchStatus::Done];

    /// The wire code used as the API's status filter.
    pub fn code(self) -> &'static str {
        match self {
            WatchStatus::Mark => "mark",
            WatchStatus::Doing => "doing",
            WatchStatus::Done => "done",
        }
    }

    /// The display name stored in the destination's status property.
    pub fn display(self) -> &'static str {
        match self {
            WatchStatus::Mark => "想看",
            WatchStatus::Doing => "在看",
            WatchStatus::Done => "看过",
        }
    }

    /// Maps a wire code back to a status; unknown codes are absent, not an
    /// error, since the source vocabulary may grow.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "mark" => Some(WatchStatus::Mark),
            "doing" => Some(WatchStatus::Doing),
            "done" => Some(WatchStatus::Done),
            _ => None,
        }
    }
}

/// Maps the 1–5 numeric rating to its star string. Anything outside the
/// known scale maps to `None` rather than erroring.
pub fn star_rating(value: i64) -> Option<&'static str> {
    match value {
        1 => Some("⭐️"),
        2 => Some("⭐️⭐️"),
        3 => Some("⭐️⭐️⭐️"),
        4 => Some("⭐️⭐️⭐️⭐️"),
        5 => Some("⭐️⭐️⭐️⭐️⭐️"),
        _ => None,
    }
}

/// One page of the paginated interests endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct InterestsPage {
    #[serde(default)]
    pub interests: Vec<Interest>,
}

/// One item of a user's watching history. Immutable once fetched.
#[derive(Debug, Clone, Deserialize)]
pub struct Interest {
    /// The movie itself; entries without one are malformed and skipped.
    pub subject: Option<Subject>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub rating: Option<RatingPayload>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub create_time: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RatingPayload {
    #[serde(default)]
    pub value: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Subject {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub actors: Vec<Person>,
    #[serde(default)]
    pub directors: Vec<Person>,
    #[serde(default)]
    pub pic: Option<Picture>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl Subject {
    /// Cover image URL with the webp variant swapped for jpg, which the
    /// destination can actually render as an icon.
    pub fn cover_url(&self) -> Option<String> {
        let normal = self.pic.as_ref()?.normal.as_ref()?;
        if normal.is_empty() {
            return None;
        }
        Some(normal.replace(".webp", ".jpg"))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Person {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Picture {
    #[serde(default)]
    pub normal: Option<String>,
}

/// Parses the source's creation timestamp (naive local time at UTC+8, or
/// RFC 3339) to Unix seconds, truncated to the minute to match what the
/// destination stores.
pub fn parse_create_time(text: &str) -> Option<i64> {
    let local = if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        dt.with_timezone(&shanghai())
    } else {
        let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").ok()?;
        shanghai().from_local_datetime(&naive).single()?
    };
    let truncated = local.with_second(0)?;
    Some(truncated.timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_vocabulary_round_trips() {
        for status in WatchStatus::ALL {
            assert_eq!(WatchStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(WatchStatus::from_code("dropped"), None);
        assert_eq!(WatchStatus::Done.display(), "看过");
    }

    #[test]
    fn ratings_outside_the_scale_are_absent() {
        assert_eq!(star_rating(3), Some("⭐️⭐️⭐️"));
        assert_eq!(star_rating(0), None);
        assert_eq!(star_rating(6), None);
        assert_eq!(star_rating(-1), None);
    }

    #[test]
    fn create_time_truncates_to_the_minute() {
        let ts = parse_create_time("2024-01-01 07:25:43").unwrap();
        // 2024-01-01 07:25:00 +08:00 == 2023-12-31 23:25:00 UTC
        assert_eq!(ts, 1_704_065_100);
    }

    #[test]
    fn unparseable_create_time_is_absent() {
        assert_eq!(parse_create_time("yesterday"), None);
    }

    #[test]
    fn cover_url_swaps_webp_for_jpg() {
        let subject = Subject {
            title: None,
            url: None,
            genres: vec![],
            actors: vec![],
            directors: vec![],
            pic: Some(Picture {
                normal: Some("https://img.example.com/p123.webp".into()),
            }),
            kind: None,
        };
        assert_eq!(
            subject.cover_url().as_deref(),
            Some("https://img.example.com/p123.jpg")
        );
    }

    #[test]
    fn interests_page_tolerates_missing_fields() {
        let raw = serde_json::json!({
            "interests": [
                { "status": "done" },
                {
                    "subject": { "title": "花样年华", "genres": [] },
                    "status": "done",
                    "rating": { "value": 5 },
                    "create_time": "2024-01-01 20:00:00"
                }
            ]
        });
        let page: InterestsPage = serde_json::from_value(raw).unwrap();
        assert_eq!(page.interests.len(), 2);
        assert!(page.interests[0].subject.is_none());
        assert_eq!(
            page.interests[1].rating.as_ref().and_then(|r| r.value),
            Some(5)
        );
    }
}
