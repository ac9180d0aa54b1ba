use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use tabled::Tabled;

/// Format of a day-section heading joined with a scheduled-time cell,
/// e.g. "Saturday 25 January 2025 20:30". The source publishes English
/// weekday and month names; any format drift lands here and in the
/// selectors in `scrape.rs`, nowhere else.
pub const SOURCE_DATETIME_FMT: &str = "%A %d %B %Y %H:%M";

/// Fixed display format for absolute timestamps on the wire.
pub const DISPLAY_DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// Operational status as printed in the table. Values the source invents
/// beyond the known set pass through verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlightStatus {
    Scheduled,
    Arrived,
    Departed,
    Delayed,
    Other(String),
}

impl FlightStatus {
    /// Arrived and Departed flights are done; everything else, a delayed
    /// or unknown status included, stays relevant for the next-flight scan.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlightStatus::Arrived | FlightStatus::Departed)
    }
}

impl From<&str> for FlightStatus {
    fn from(raw: &str) -> FlightStatus {
        match raw {
            "Scheduled" => FlightStatus::Scheduled,
            "Arrived" => FlightStatus::Arrived,
            "Departed" => FlightStatus::Departed,
            "Delayed" => FlightStatus::Delayed,
            other => FlightStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlightStatus::Scheduled => f.write_str("Scheduled"),
            FlightStatus::Arrived => f.write_str("Arrived"),
            FlightStatus::Departed => f.write_str("Departed"),
            FlightStatus::Delayed => f.write_str("Delayed"),
            FlightStatus::Other(other) => f.write_str(other),
        }
    }
}

impl Serialize for FlightStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FlightStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<FlightStatus, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.as_str().into())
    }
}

/// One row of the live flight table, tagged with the day-section label it
/// was printed under. `date` stays the verbatim heading text; day
/// filtering matches it exactly and never re-derives it from the instant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Tabled)]
pub struct FlightRecord {
    #[tabled(rename = "Date")]
    pub date: String,
    #[serde(rename = "from")]
    #[tabled(rename = "From")]
    pub origin: String,
    #[tabled(rename = "Flight")]
    pub flight: String,
    #[tabled(rename = "Sched")]
    pub sched: String,
    #[tabled(rename = "Status")]
    pub status: FlightStatus,
    #[tabled(rename = "Expected")]
    pub expected: String,
    /// Absolute scheduled time, None when the label + sched cell text did
    /// not combine into a parseable timestamp. A first-class unknown: the
    /// record is kept and sorts after every dated one.
    #[serde(rename = "datetime", with = "display_instant")]
    #[tabled(skip)]
    pub scheduled_instant: Option<NaiveDateTime>,
}

impl FlightRecord {
    /// Builds a record from a day-section label and one row's cell texts
    /// in source order: origin, flight code, scheduled, status, expected.
    /// A row with fewer than five cells is malformed markup and yields
    /// None; an unparseable scheduled time only degrades the instant.
    pub fn from_row(label: &str, cells: &[String]) -> Option<FlightRecord> {
        let [origin, flight, sched, status, expected] = cells.get(..5)? else {
            return None;
        };
        let scheduled_instant =
            NaiveDateTime::parse_from_str(&format!("{label} {sched}"), SOURCE_DATETIME_FMT).ok();
        Some(FlightRecord {
            date: label.to_string(),
            origin: origin.clone(),
            flight: flight.clone(),
            sched: sched.clone(),
            status: status.as_str().into(),
            expected: expected.clone(),
            scheduled_instant,
        })
    }
}

/// Serializes the optional instant as the fixed display string (or null),
/// so records cross the output boundary in display form while staying
/// structured in memory.
pub mod display_instant {
    use super::DISPLAY_DATETIME_FMT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(instant) => serializer.collect_str(&instant.format(DISPLAY_DATETIME_FMT)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => NaiveDateTime::parse_from_str(&raw, DISPLAY_DATETIME_FMT)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
