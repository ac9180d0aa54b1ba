use crate::cache::{CachedFeed, ResponseCache};
use crate::error::BoardError;
use crate::feed::FlightFeed;
use crate::flight::{FlightRecord, FlightStatus};
use crate::remaining::NextFlightReport;
use crate::scrape::FlightSource;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use tabled::Tabled;

/// Reduced per-flight shape for a single day's board: flight code, the
/// best available time (expected when the airline reported one, else
/// scheduled) and status.
#[derive(Clone, Debug, PartialEq, Serialize, Tabled)]
pub struct DayFlight {
    #[tabled(rename = "Flight")]
    pub flight_code: String,
    #[tabled(rename = "Time")]
    pub expected_time: String,
    #[tabled(rename = "Status")]
    pub status: FlightStatus,
}

impl From<&FlightRecord> for DayFlight {
    fn from(record: &FlightRecord) -> DayFlight {
        let expected_time = if record.expected.is_empty() {
            record.sched.clone()
        } else {
            record.expected.clone()
        };
        DayFlight {
            flight_code: record.flight.clone(),
            expected_time,
            status: record.status.clone(),
        }
    }
}

/// Query façade over one source and one freshness cache. Every query
/// takes its reference time as an explicit parameter; the wall clock is
/// read only at the CLI edge.
pub struct FlightBoard<S, C> {
    source: S,
    cache: C,
}

/// Reference time for one query. The freshness cache is shared across
/// real-clock queries only: an explicit override neither reads the
/// cached snapshot (its TTL check would be meaningless against an
/// arbitrary instant) nor stamps one, so a deterministic query can
/// never poison later wall-clock ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryTime {
    Wall(NaiveDateTime),
    Override(NaiveDateTime),
}

impl QueryTime {
    pub fn instant(self) -> NaiveDateTime {
        match self {
            QueryTime::Wall(instant) | QueryTime::Override(instant) => instant,
        }
    }
}

impl<S: FlightSource, C: ResponseCache> FlightBoard<S, C> {
    pub fn new(source: S, cache: C) -> FlightBoard<S, C> {
        FlightBoard { source, cache }
    }

    /// One fetch and one full parse/sort pass, unless a wall-clock query
    /// finds the cache still inside its freshness window. `fetched_at`
    /// is only ever stamped with a wall-clock instant.
    fn feed(&self, at: QueryTime) -> Result<FlightFeed, BoardError> {
        if let QueryTime::Wall(now) = at {
            if let Some(cached) = self.cache.load(now) {
                tracing::debug!(flights = cached.flights.len(), "serving cached feed");
                return Ok(FlightFeed::from_records(cached.flights));
            }
        }

        let sections = self.source.sections()?;
        let feed = FlightFeed::from_sections(&sections);
        tracing::info!(flights = feed.records().len(), "normalized live feed");
        if let QueryTime::Wall(now) = at {
            self.cache.store(&CachedFeed {
                fetched_at: now,
                flights: feed.records().to_vec(),
            });
        }
        Ok(feed)
    }

    /// The full sorted feed, optionally narrowed to one day label.
    pub fn flights(
        &self,
        day: Option<&str>,
        at: QueryTime,
    ) -> Result<Vec<FlightRecord>, BoardError> {
        let feed = self.feed(at)?;
        Ok(match day {
            Some(label) => feed.for_day(label),
            None => feed.into_records(),
        })
    }

    /// The reduced board for one day label.
    pub fn day_view(&self, day: &str, at: QueryTime) -> Result<Vec<DayFlight>, BoardError> {
        Ok(self
            .feed(at)?
            .for_day(day)
            .iter()
            .map(DayFlight::from)
            .collect())
    }

    /// Next relevant flight with its countdown, or the sentinel.
    pub fn next_flight(&self, at: QueryTime) -> Result<NextFlightReport, BoardError> {
        let feed = self.feed(at)?;
        let reference = at.instant();
        Ok(NextFlightReport::compute(feed.next_flight(reference), reference))
    }
}

/// Explicit reference-time override for deterministic queries. A value
/// that does not parse is the caller's input error, never a silent
/// fallback to the wall clock.
pub fn parse_reference_time(date: &str, time: &str) -> Result<NaiveDateTime, BoardError> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
        BoardError::InvalidReferenceTime {
            input: date.to_string(),
            expected: "YYYY-MM-DD",
        }
    })?;
    let time = NaiveTime::parse_from_str(time, "%H:%M:%S").map_err(|_| {
        BoardError::InvalidReferenceTime {
            input: time.to_string(),
            expected: "HH:MM:SS",
        }
    })?;
    Ok(date.and_time(time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::remaining::AirportStatus;
    use crate::scrape::DaySection;
    use chrono::TimeDelta;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DAY_ONE: &str = "Saturday 25 January 2025";
    const DAY_TWO: &str = "Sunday 26 January 2025";

    /// Fixture source counting how often it is actually hit.
    struct StubSource {
        sections: Vec<DaySection>,
        fetches: AtomicUsize,
    }

    impl StubSource {
        fn new(sections: Vec<DaySection>) -> StubSource {
            StubSource {
                sections,
                fetches: AtomicUsize::new(0),
            }
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    impl FlightSource for StubSource {
        fn sections(&self) -> Result<Vec<DaySection>, BoardError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.sections.clone())
        }
    }

    struct FailingSource;

    impl FlightSource for FailingSource {
        fn sections(&self) -> Result<Vec<DaySection>, BoardError> {
            Err(BoardError::SourceStatus { status: 503 })
        }
    }

    fn section(label: &str, rows: &[[&str; 5]]) -> DaySection {
        let mut all_rows = vec![vec![]];
        all_rows.extend(
            rows.iter()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<_>>()),
        );
        DaySection {
            label: label.to_string(),
            rows: all_rows,
        }
    }

    fn fixture_sections() -> Vec<DaySection> {
        vec![
            section(
                DAY_ONE,
                &[
                    ["London Heathrow", "BA490", "20:30", "Scheduled", "20:45"],
                    ["Manchester", "EZY1901", "19:00", "Arrived", ""],
                ],
            ),
            section(DAY_TWO, &[["Malaga", "VY7001", "08:15", "Scheduled", ""]]),
        ]
    }

    fn board(sections: Vec<DaySection>) -> FlightBoard<StubSource, MemoryCache> {
        FlightBoard::new(
            StubSource::new(sections),
            MemoryCache::new(TimeDelta::seconds(60)),
        )
    }

    fn at(day: u32, hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, day)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    fn wall(day: u32, hour: u32, min: u32) -> QueryTime {
        QueryTime::Wall(at(day, hour, min))
    }

    #[test]
    fn test_flights_sorted_across_days() {
        let board = board(fixture_sections());
        let flights = board.flights(None, wall(25, 20, 40)).unwrap();

        let codes: Vec<&str> = flights.iter().map(|f| f.flight.as_str()).collect();
        assert_eq!(vec!["EZY1901", "BA490", "VY7001"], codes);
    }

    #[test]
    fn test_day_filter_exact_and_near_miss() {
        let board = board(fixture_sections());

        let flights = board.flights(Some(DAY_ONE), wall(25, 20, 40)).unwrap();
        assert_eq!(2, flights.len());
        assert!(flights.iter().all(|f| f.date == DAY_ONE));

        let near_miss = board
            .flights(Some("saturday 25 january 2025"), wall(25, 20, 40))
            .unwrap();
        assert!(near_miss.is_empty());
    }

    #[test]
    fn test_day_view_prefers_expected_time() {
        let board = board(fixture_sections());
        let view = board.day_view(DAY_ONE, wall(25, 20, 40)).unwrap();

        assert_eq!(
            vec![
                DayFlight {
                    flight_code: "EZY1901".to_string(),
                    expected_time: "19:00".to_string(),
                    status: FlightStatus::Arrived,
                },
                DayFlight {
                    flight_code: "BA490".to_string(),
                    expected_time: "20:45".to_string(),
                    status: FlightStatus::Scheduled,
                },
            ],
            view
        );
    }

    #[test]
    fn test_next_flight_countdown() {
        let board = board(fixture_sections());
        // BA490 is scheduled 20:30 but expected 20:45; at 20:25 it is the
        // nearest relevant flight and the expected time drives the countdown
        let report = board.next_flight(wall(25, 20, 25)).unwrap();

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!("20m", value["time_remaining"]);
        assert_eq!("closing_soon", value["airport_status"]);
        assert_eq!("BA490", value["next_flight"]["flight"]);
    }

    #[test]
    fn test_next_flight_rolls_over_once_scheduled_time_passes() {
        let board = board(fixture_sections());
        // 20:30 has passed, so Sunday's VY7001 is next regardless of the
        // still-pending expected time on BA490
        let report = board.next_flight(wall(25, 20, 40)).unwrap();

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!("VY7001", value["next_flight"]["flight"]);
        assert_eq!("open", value["airport_status"]);
    }

    #[test]
    fn test_next_flight_sentinel_when_all_terminal() {
        let board = board(vec![section(
            DAY_ONE,
            &[["Manchester", "EZY1901", "19:00", "Arrived", ""]],
        )]);

        let report = board.next_flight(wall(25, 20, 40)).unwrap();
        assert_eq!(NextFlightReport::none(), report);
    }

    #[test]
    fn test_cache_skips_repeat_fetches_within_window() {
        let board = board(fixture_sections());

        board.flights(None, wall(25, 20, 40)).unwrap();
        board.next_flight(wall(25, 20, 40)).unwrap();
        assert_eq!(1, board.source.fetches());

        // past the freshness window the source is hit again
        board.flights(None, wall(25, 20, 42)).unwrap();
        assert_eq!(2, board.source.fetches());
    }

    #[test]
    fn test_cached_feed_keeps_order_and_countdown() {
        let board = board(fixture_sections());
        let first = board.next_flight(wall(25, 20, 25)).unwrap();
        let second = board.next_flight(wall(25, 20, 25)).unwrap();
        assert_eq!(first, second);
        assert_eq!(1, board.source.fetches());

        match second {
            NextFlightReport::Upcoming(countdown) => {
                assert_eq!(AirportStatus::ClosingSoon, countdown.airport_status)
            }
            NextFlightReport::NoUpcoming { message } => panic!("unexpected sentinel: {message}"),
        }
    }

    #[test]
    fn test_override_queries_bypass_the_shared_cache() {
        let board = board(fixture_sections());
        let future = at(25, 20, 25) + TimeDelta::days(365 * 5);
        board.next_flight(QueryTime::Override(future)).unwrap();
        assert_eq!(1, board.source.fetches());

        // a later wall-clock query is not served the override's snapshot
        // as if it were fresh
        board.flights(None, wall(25, 20, 40)).unwrap();
        assert_eq!(2, board.source.fetches());
        board.flights(None, wall(26, 1, 40)).unwrap();
        assert_eq!(3, board.source.fetches());

        // and an override never reads the shared snapshot either
        board.next_flight(QueryTime::Override(at(25, 20, 25))).unwrap();
        assert_eq!(4, board.source.fetches());
    }

    #[test]
    fn test_fetch_failure_surfaces() {
        let board = FlightBoard::new(FailingSource, MemoryCache::new(TimeDelta::seconds(60)));
        let err = board.flights(None, wall(25, 20, 40)).unwrap_err();
        assert!(matches!(err, BoardError::SourceStatus { status: 503 }));
    }

    #[test]
    fn test_reference_time_override() {
        assert_eq!(
            at(25, 20, 40),
            parse_reference_time("2025-01-25", "20:40:00").unwrap()
        );

        let err = parse_reference_time("25/01/2025", "20:40:00").unwrap_err();
        assert!(matches!(err, BoardError::InvalidReferenceTime { .. }));

        let err = parse_reference_time("2025-01-25", "20:40").unwrap_err();
        assert!(matches!(err, BoardError::InvalidReferenceTime { .. }));
    }
}
