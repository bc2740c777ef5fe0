//! Sync frontier models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{parse_timestamp, Army};

/// Persisted `(timestamp, id)` cursor marking what has already been synced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watermark {
    pub timestamp: DateTime<Utc>,
    /// The timestamp string as it appeared in the export
    pub raw_timestamp: String,
    pub last_id: i64,
}

impl Watermark {
    /// Ordering key: timestamp first, id breaks ties.
    fn position(&self) -> (DateTime<Utc>, i64) {
        (self.timestamp, self.last_id)
    }

    /// Whether a record at `(timestamp, id)` is at or behind this watermark.
    pub fn covers(&self, timestamp: DateTime<Utc>, id: i64) -> bool {
        timestamp < self.timestamp || (timestamp == self.timestamp && id <= self.last_id)
    }

    /// The furthest position reached by a set of armies.
    pub fn from_armies<'a, I>(armies: I) -> Option<Watermark>
    where
        I: IntoIterator<Item = &'a Army>,
    {
        armies
            .into_iter()
            .filter_map(|army| {
                army.effective_timestamp().map(|ts| Watermark {
                    timestamp: ts.instant,
                    raw_timestamp: ts.raw,
                    last_id: army.id,
                })
            })
            .fold(None, |best: Option<Watermark>, candidate| match best {
                Some(best) if best.position() >= candidate.position() => Some(best),
                _ => Some(candidate),
            })
    }

    /// The later of two watermarks, so a stored frontier never moves back.
    pub fn advance(self, other: Watermark) -> Watermark {
        if other.position() > self.position() {
            other
        } else {
            self
        }
    }
}

/// Marker document stored in the destination's watermark collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatermarkMarker {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl WatermarkMarker {
    /// Build a marker for a watermark, stamped with the current time.
    pub fn new(watermark: &Watermark) -> Self {
        Self {
            last_updated_time: Some(watermark.raw_timestamp.clone()),
            last_id: Some(watermark.last_id),
            last_run_at: Some(Utc::now().to_rfc3339()),
            ..Default::default()
        }
    }

    /// The watermark this marker describes, if it carries a parseable time.
    ///
    /// A missing id means no record at that exact time has been synced yet.
    pub fn watermark(&self) -> Option<Watermark> {
        let raw = self.last_updated_time.as_ref()?;
        let timestamp = parse_timestamp(raw)?;
        Some(Watermark {
            timestamp,
            raw_timestamp: raw.clone(),
            last_id: self.last_id.unwrap_or(-1),
        })
    }
}

/// The lower bound a sync run filters the export against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncCursor {
    /// Exclusive `(timestamp, id)` frontier from a previous run
    Watermark(Watermark),
    /// Inclusive time bound given by the operator or the local state file
    Since(DateTime<Utc>),
}

impl SyncCursor {
    /// Whether an army still needs syncing under this cursor.
    pub fn admits(&self, army: &Army) -> bool {
        self.admits_at(army.effective_timestamp().map(|ts| ts.instant), army.id)
    }

    /// Same as [`SyncCursor::admits`] for a bare position. No timestamp, no admission.
    pub fn admits_at(&self, timestamp: Option<DateTime<Utc>>, id: i64) -> bool {
        let Some(timestamp) = timestamp else {
            return false;
        };
        match self {
            SyncCursor::Watermark(watermark) => !watermark.covers(timestamp, id),
            SyncCursor::Since(since) => timestamp >= *since,
        }
    }

    /// The stored watermark this cursor started from, if any.
    pub fn watermark(&self) -> Option<&Watermark> {
        match self {
            SyncCursor::Watermark(watermark) => Some(watermark),
            SyncCursor::Since(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn army(id: i64, updated: &str) -> Army {
        Army {
            id,
            updated_time: Some(updated.to_string()),
            ..Default::default()
        }
    }

    fn marker_at(ts: &str, id: i64) -> Watermark {
        Watermark {
            timestamp: parse_timestamp(ts).unwrap(),
            raw_timestamp: ts.to_string(),
            last_id: id,
        }
    }

    fn covers(wm: &Watermark, id: i64, ts: &str) -> bool {
        wm.covers(parse_timestamp(ts).unwrap(), id)
    }

    #[test]
    fn test_covers_tie_break_on_id() {
        let wm = marker_at("2024-05-01T10:00:00Z", 50);

        assert!(covers(&wm, 50, "2024-05-01T10:00:00Z"));
        assert!(covers(&wm, 3, "2024-05-01T10:00:00Z"));
        assert!(!covers(&wm, 51, "2024-05-01T10:00:00Z"));
        assert!(covers(&wm, 999, "2024-05-01T09:59:59Z"));
        assert!(!covers(&wm, 1, "2024-05-01T10:00:01Z"));
    }

    #[test]
    fn test_covers_compares_instants_not_strings() {
        let wm = marker_at("2024-05-01T10:00:00Z", 50);
        assert!(covers(&wm, 50, "2024-05-01T12:00:00+02:00"));
        assert!(!covers(&wm, 51, "2024-05-01T10:00:00.000+00:00"));
    }

    #[test]
    fn test_from_armies_picks_max_id_at_max_time() {
        let armies = vec![
            army(9, "2024-05-01T10:00:00Z"),
            army(4, "2024-06-01T00:00:00Z"),
            army(7, "2024-06-01T00:00:00Z"),
            army(5, "2024-06-01T00:00:00Z"),
            Army {
                id: 100,
                updated_time: Some("garbage".into()),
                ..Default::default()
            },
        ];

        let wm = Watermark::from_armies(&armies).unwrap();
        assert_eq!(wm.raw_timestamp, "2024-06-01T00:00:00Z");
        assert_eq!(wm.last_id, 7);

        assert!(Watermark::from_armies(&Vec::<Army>::new()).is_none());
    }

    #[test]
    fn test_advance_never_regresses() {
        let old = marker_at("2024-06-01T00:00:00Z", 7);
        let earlier = marker_at("2024-05-01T00:00:00Z", 100);
        let same_time_higher_id = marker_at("2024-06-01T00:00:00Z", 8);

        assert_eq!(old.clone().advance(earlier), old);
        assert_eq!(
            old.clone().advance(same_time_higher_id.clone()),
            same_time_higher_id
        );
    }

    #[test]
    fn test_marker_roundtrip_fields() {
        let marker = WatermarkMarker::new(&marker_at("2024-06-01T00:00:00Z", 7));
        let json = serde_json::to_value(&marker).unwrap();
        assert_eq!(json["lastUpdatedTime"], "2024-06-01T00:00:00Z");
        assert_eq!(json["lastId"], 7);
        assert!(json.get("note").is_none());

        let wm = marker.watermark().unwrap();
        assert_eq!(
            wm.timestamp,
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_marker_without_time_has_no_watermark() {
        let marker = WatermarkMarker {
            last_id: Some(3),
            ..Default::default()
        };
        assert!(marker.watermark().is_none());
    }

    #[test]
    fn test_since_cursor_is_inclusive() {
        let cursor = SyncCursor::Since(parse_timestamp("2024-05-01T10:00:00Z").unwrap());
        assert!(cursor.admits(&army(1, "2024-05-01T10:00:00Z")));
        assert!(cursor.admits(&army(1, "2024-05-02T00:00:00Z")));
        assert!(!cursor.admits(&army(1, "2024-04-30T00:00:00Z")));
        assert!(!cursor.admits(&Army {
            id: 2,
            ..Default::default()
        }));
    }

    #[test]
    fn test_watermark_cursor_admission() {
        let cursor = SyncCursor::Watermark(marker_at("2024-05-01T10:00:00Z", 50));
        assert!(cursor.admits(&army(51, "2024-05-01T10:00:00Z")));
        assert!(!cursor.admits(&army(50, "2024-05-01T10:00:00Z")));
        assert!(!cursor.admits_at(parse_timestamp("2023-01-01T00:00:00Z"), 900));
        assert!(!cursor.admits_at(None, 900));
    }
}
