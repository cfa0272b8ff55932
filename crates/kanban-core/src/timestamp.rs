//! Card and board timestamps.
//!
//! Header values arrive either as bare dates (`2024-03-01`) or as full
//! ISO-8601 date-times. Both are accepted and normalized to one canonical
//! string form, `YYYY-MM-DDTHH:MM:SS.mmmZ`, which is also the only form ever
//! written back out.

use crate::error::{KanbanError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const CANONICAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current time at millisecond precision, so a freshly stamped value
    /// compares equal to itself after a write/read cycle.
    pub fn now() -> Self {
        Self(Utc::now().trunc_subsecs(3))
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.trunc_subsecs(3))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let s = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self::from_datetime(dt.with_timezone(&Utc)));
        }
        for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Ok(Self::from_datetime(Utc.from_utc_datetime(&naive)));
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                return Ok(Self(Utc.from_utc_datetime(&midnight)));
            }
        }
        Err(KanbanError::InvalidTimestamp(raw.to_string()))
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn to_canonical(&self) -> String {
        self.0.format(CANONICAL_FORMAT).to_string()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical())
    }
}

impl FromStr for Timestamp {
    type Err = KanbanError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_canonical())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Timestamp::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_only_is_midnight_utc() {
        let ts = Timestamp::parse("2024-03-01").unwrap();
        assert_eq!(ts.to_canonical(), "2024-03-01T00:00:00.000Z");
    }

    #[test]
    fn full_iso_is_normalized() {
        let ts = Timestamp::parse("2024-03-01T10:15:30Z").unwrap();
        assert_eq!(ts.to_canonical(), "2024-03-01T10:15:30.000Z");

        let offset = Timestamp::parse("2024-03-01T12:15:30.123456+02:00").unwrap();
        assert_eq!(offset.to_canonical(), "2024-03-01T10:15:30.123Z");
    }

    #[test]
    fn naive_datetime_is_treated_as_utc() {
        let ts = Timestamp::parse("2024-03-01T08:00:00").unwrap();
        assert_eq!(ts.to_canonical(), "2024-03-01T08:00:00.000Z");
        let spaced = Timestamp::parse("2024-03-01 08:00:00").unwrap();
        assert_eq!(ts, spaced);
    }

    #[test]
    fn garbage_is_rejected() {
        for raw in ["", "yesterday", "2024-13-01", "01/03/2024"] {
            assert!(
                matches!(Timestamp::parse(raw), Err(KanbanError::InvalidTimestamp(_))),
                "expected invalid: {raw}"
            );
        }
    }

    #[test]
    fn canonical_form_reparses_to_same_value() {
        let now = Timestamp::now();
        assert_eq!(Timestamp::parse(&now.to_canonical()).unwrap(), now);
    }

    #[test]
    fn serializes_as_string() {
        let ts = Timestamp::parse("2024-03-01").unwrap();
        let yaml = serde_yaml::to_value(ts).unwrap();
        assert_eq!(
            yaml,
            serde_yaml::Value::String("2024-03-01T00:00:00.000Z".to_string())
        );
        let back: Timestamp = serde_yaml::from_value(yaml).unwrap();
        assert_eq!(back, ts);
    }
}
