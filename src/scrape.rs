use crate::error::BoardError;
use scraper::{Html, Selector};

pub const LIVE_FEED_URL: &str =
    "https://www.gibraltarairport.gi/airlines-and-destinations/live-flight-information";

/// One day heading plus the raw cell texts of every table row printed
/// under it, header row included. This is the whole input contract
/// between the markup layer and the feed normalizer.
#[derive(Clone, Debug, PartialEq)]
pub struct DaySection {
    pub label: String,
    pub rows: Vec<Vec<String>>,
}

/// Where day-sections come from. The live site in production, fixture
/// sections in tests.
pub trait FlightSource {
    fn sections(&self) -> Result<Vec<DaySection>, BoardError>;
}

fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Walks the live page markup: each `div.flight-day` is a day-section,
/// its `h6` the label, each `tr` a row of `td` cell texts. A section
/// without a heading keeps its rows under an empty label; the
/// normalizer still treats its first row as the table header, and the
/// remaining records degrade to unknown instants instead of sinking
/// the feed.
pub fn parse_sections(html: &str) -> Vec<DaySection> {
    let document = Html::parse_document(html);
    let day_selector = Selector::parse("div.flight-day").unwrap();
    let label_selector = Selector::parse("h6").unwrap();
    let row_selector = Selector::parse("tr").unwrap();
    let cell_selector = Selector::parse("td").unwrap();

    let mut sections = Vec::new();
    for day in document.select(&day_selector) {
        let label = match day.select(&label_selector).next() {
            Some(heading) => clean_text(&heading.text().collect::<String>()),
            None => {
                tracing::warn!("day-section without a heading");
                String::new()
            }
        };

        let rows = day
            .select(&row_selector)
            .map(|row| {
                row.select(&cell_selector)
                    .map(|cell| clean_text(&cell.text().collect::<String>()))
                    .collect()
            })
            .collect();

        sections.push(DaySection { label, rows });
    }
    sections
}

/// Fetches the live flight table in one blocking request. No retries or
/// backoff: a failed fetch is reported upward as a single attempt.
pub struct LiveSource {
    url: String,
    client: reqwest::blocking::Client,
}

impl LiveSource {
    pub fn new(url: impl Into<String>) -> LiveSource {
        LiveSource {
            url: url.into(),
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl FlightSource for LiveSource {
    fn sections(&self) -> Result<Vec<DaySection>, BoardError> {
        tracing::debug!(url = %self.url, "fetching live flight table");
        let response = self.client.get(&self.url).send()?;
        if !response.status().is_success() {
            return Err(BoardError::SourceStatus {
                status: response.status().as_u16(),
            });
        }
        let body = response.text()?;
        let sections = parse_sections(&body);
        tracing::info!(sections = sections.len(), "fetched live flight table");
        Ok(sections)
    }
}
