use crate::flight::FlightRecord;
use crate::scrape::DaySection;
use chrono::NaiveDateTime;

/// The whole live table as one sequence of records, ascending by
/// scheduled instant with unknown instants last. Rebuilt from scratch on
/// every fetch; records carry no identity across fetches.
pub struct FlightFeed {
    records: Vec<FlightRecord>,
}

impl FlightFeed {
    /// Records without a parseable instant sort as the maximum time.
    fn sort_key(record: &FlightRecord) -> NaiveDateTime {
        record.scheduled_instant.unwrap_or(NaiveDateTime::MAX)
    }

    /// Parses every data row of every day-section, tagging each record
    /// with its section label. The first row of a section is the table
    /// header; rows with missing cells are dropped with a warning.
    /// Pure with respect to the section data: same markup, same feed.
    pub fn from_sections(sections: &[DaySection]) -> FlightFeed {
        let mut records = Vec::new();
        for section in sections {
            for row in section.rows.iter().skip(1) {
                match FlightRecord::from_row(&section.label, row) {
                    Some(record) => records.push(record),
                    None => tracing::warn!(
                        label = %section.label,
                        cells = row.len(),
                        "dropping row with missing cells"
                    ),
                }
            }
        }
        FlightFeed::from_records(records)
    }

    /// Restores feed order for records that re-enter from the cache.
    /// The sort is stable, so ties and unknown instants keep their
    /// relative order.
    pub fn from_records(mut records: Vec<FlightRecord>) -> FlightFeed {
        records.sort_by_key(Self::sort_key);
        FlightFeed { records }
    }

    pub fn records(&self) -> &[FlightRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<FlightRecord> {
        self.records
    }

    /// Exact verbatim match against the section label, weekday and month
    /// names included. A near-miss label matches nothing.
    pub fn for_day(&self, day: &str) -> Vec<FlightRecord> {
        self.records
            .iter()
            .filter(|record| record.date == day)
            .cloned()
            .collect()
    }

    /// First record that is still operationally relevant (not Arrived or
    /// Departed) and scheduled strictly after the reference time. The
    /// feed is already sorted, so the first hit is the temporally
    /// nearest one.
    pub fn next_flight(&self, at: NaiveDateTime) -> Option<&FlightRecord> {
        self.records.iter().find(|record| {
            !record.status.is_terminal()
                && record.scheduled_instant.is_some_and(|instant| instant > at)
        })
    }
}
