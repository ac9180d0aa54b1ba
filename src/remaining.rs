use crate::flight::{DISPLAY_DATETIME_FMT, FlightRecord};
use chrono::{NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::fmt;

pub const NO_UPCOMING_MESSAGE: &str = "No upcoming flights available.";

/// Coarse operational classification derived purely from minutes
/// remaining until the next relevant flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AirportStatus {
    Open,
    ClosingSoon,
    Closing,
    Closed,
}

impl AirportStatus {
    /// Thresholds are closed bounds, first match wins.
    pub fn from_minutes(total_minutes: i64) -> AirportStatus {
        if total_minutes < 0 {
            AirportStatus::Closed
        } else if total_minutes <= 3 {
            AirportStatus::Closing
        } else if total_minutes <= 20 {
            AirportStatus::ClosingSoon
        } else {
            AirportStatus::Open
        }
    }
}

impl fmt::Display for AirportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AirportStatus::Open => f.write_str("open"),
            AirportStatus::ClosingSoon => f.write_str("closing_soon"),
            AirportStatus::Closing => f.write_str("closing"),
            AirportStatus::Closed => f.write_str("closed"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Countdown {
    pub current_time: String,
    pub time_remaining: String,
    pub airport_status: AirportStatus,
    pub next_flight: FlightRecord,
}

/// Countdown to the next relevant flight, or the sentinel when nothing
/// qualifies. Ephemeral: computed per query, persisted only through the
/// freshness cache.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NextFlightReport {
    NoUpcoming { message: String },
    Upcoming(Countdown),
}

impl NextFlightReport {
    pub fn none() -> NextFlightReport {
        NextFlightReport::NoUpcoming {
            message: NO_UPCOMING_MESSAGE.to_string(),
        }
    }

    /// An airline-reported expected time beats the scheduled baseline.
    /// It carries no date of its own and is always read on the reference
    /// time's calendar day; a malformed value is silently ignored.
    fn target_time(
        flight: &FlightRecord,
        scheduled: NaiveDateTime,
        now: NaiveDateTime,
    ) -> NaiveDateTime {
        if flight.expected.is_empty() {
            return scheduled;
        }
        match NaiveTime::parse_from_str(&flight.expected, "%H:%M") {
            Ok(expected) => now.date().and_time(expected),
            Err(_) => scheduled,
        }
    }

    /// Minutes remaining use floor division at the seconds step, so 4m59s
    /// counts as 4 minutes and -1s as -1 minute. The h/m decomposition of
    /// a negative total looks odd by design; consumers read
    /// `airport_status` for operational meaning.
    pub fn compute(flight: Option<&FlightRecord>, now: NaiveDateTime) -> NextFlightReport {
        let Some(flight) = flight else {
            return NextFlightReport::none();
        };
        let Some(scheduled) = flight.scheduled_instant else {
            return NextFlightReport::none();
        };

        let target = Self::target_time(flight, scheduled, now);
        let total_minutes = (target - now).num_seconds().div_euclid(60);
        let hours = total_minutes.div_euclid(60);
        let minutes = total_minutes.rem_euclid(60);
        let time_remaining = if hours != 0 {
            format!("{hours}h {minutes}m")
        } else {
            format!("{minutes}m")
        };

        NextFlightReport::Upcoming(Countdown {
            current_time: now.format(DISPLAY_DATETIME_FMT).to_string(),
            time_remaining,
            airport_status: AirportStatus::from_minutes(total_minutes),
            next_flight: flight.clone(),
        })
    }
}
