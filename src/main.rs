use crate::cache::FileCache;
use crate::query::{FlightBoard, QueryTime, parse_reference_time};
use crate::remaining::{AirportStatus, NextFlightReport};
use crate::scrape::{LIVE_FEED_URL, LiveSource};
use chrono::{Local, TimeDelta};
use clap::Parser;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::{Context, Editor, Helper, Highlighter, Hinter, Validator};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tabled::Tabled;
use tabled::settings::Style;

mod cache;
mod error;
mod feed;
mod flight;
mod query;
mod remaining;
mod scrape;

#[derive(Parser)]
struct Args {
    /// Live flight table URL
    #[arg(long, default_value = LIVE_FEED_URL)]
    url: String,
    /// Path to the cached feed snapshot
    #[arg(long, value_name = "FILE", default_value = "flights_cache.json")]
    cache: PathBuf,
    /// Freshness window of the cached snapshot, in seconds
    #[arg(long, default_value_t = 60)]
    ttl: i64,
    /// One command to run non-interactively with JSON output, e.g.
    /// `next` or `ls Saturday 25 January 2025`
    command: Vec<String>,
}

#[derive(Helper, Hinter, Highlighter, Validator)]
pub struct CompleteHelper {
    pub commands: Vec<String>,
}

impl Completer for CompleteHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let mut candidates = Vec::new();

        for cmd in &self.commands {
            if cmd.starts_with(line) {
                candidates.push(Pair {
                    display: cmd.clone(),
                    replacement: format!("{} ", cmd),
                });
            }
        }

        Ok((0, candidates))
    }
}

type Board = FlightBoard<LiveSource, FileCache>;

fn paginate(content: String) {
    let mut pager = Command::new("less")
        .arg("-R")
        .stdin(Stdio::piped())
        .spawn()
        // Fallback to 'more' if 'less' isn't available
        .or_else(|_| Command::new("more").stdin(Stdio::piped()).spawn())
        .expect("Failed to spawn pager");

    let mut stdin = pager.stdin.take().expect("Failed to open stdin for pager");

    if let Err(e) = stdin.write_all(content.as_bytes()) {
        // Broken pipe is common if the user quits the pager early
        if e.kind() != std::io::ErrorKind::BrokenPipe {
            eprintln!("Error writing to pager: {}", e);
        }
    }

    // Wait for the user to close the pager before returning to the ">> " prompt
    let _ = pager.wait();
}

fn show_table<T: Tabled>(rows: Vec<T>) {
    if rows.is_empty() {
        println!("No matching flights found.");
        return;
    }
    let mut table = tabled::Table::new(&rows);
    table.with(Style::rounded());
    table.with(tabled::settings::Alignment::left());
    if rows.len() > 20 {
        paginate(table.to_string());
    } else {
        println!("{}", table);
    }
}

fn colored_status(status: AirportStatus) -> colored::ColoredString {
    let label = status.to_string();
    match status {
        AirportStatus::Open => label.green(),
        AirportStatus::ClosingSoon => label.yellow(),
        AirportStatus::Closing | AirportStatus::Closed => label.red(),
    }
}

fn show_report(report: &NextFlightReport) {
    match report {
        NextFlightReport::NoUpcoming { message } => println!("{}", message),
        NextFlightReport::Upcoming(countdown) => {
            let flight = &countdown.next_flight;
            println!("Next flight: {} from {}", flight.flight, flight.origin);
            println!("  Scheduled: {} ({})", flight.sched, flight.date);
            if !flight.expected.is_empty() {
                println!("  Expected:  {}", flight.expected);
            }
            println!(
                "  Remaining: {}  Airport: {}",
                countdown.time_remaining,
                colored_status(countdown.airport_status)
            );
        }
    }
}

fn now() -> QueryTime {
    QueryTime::Wall(Local::now().naive_local())
}

fn run_command(
    board: &Board,
    parts: &[String],
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match parts[0].as_str() {
        "ls" => {
            let day = (parts.len() > 1).then(|| parts[1..].join(" "));
            let flights = board.flights(day.as_deref(), now())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&flights)?);
            } else {
                show_table(flights);
            }
        }
        "day" => {
            if parts.len() < 2 {
                println!("Usage: day <label, e.g. Saturday 25 January 2025>");
                return Ok(());
            }
            let view = board.day_view(&parts[1..].join(" "), now())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                show_table(view);
            }
        }
        "next" => {
            let reference = match (parts.get(1), parts.get(2)) {
                (Some(date), Some(time)) => QueryTime::Override(parse_reference_time(date, time)?),
                (Some(_), None) => {
                    println!("Usage: next [YYYY-MM-DD HH:MM:SS]");
                    return Ok(());
                }
                _ => now(),
            };
            let report = board.next_flight(reference)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                show_report(&report);
            }
        }
        other => println!("Unknown command: {}", other),
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let board = FlightBoard::new(
        LiveSource::new(args.url.as_str()),
        FileCache::new(&args.cache, TimeDelta::seconds(args.ttl)),
    );

    if !args.command.is_empty() {
        return run_command(&board, &args.command, true);
    }

    println!("Flight board online. Live source: {}", args.url);

    let config = rustyline::Config::builder()
        .history_ignore_space(true)
        .completion_type(rustyline::CompletionType::List)
        .build();

    let helper = CompleteHelper {
        commands: vec![
            "ls".to_string(),
            "day".to_string(),
            "next".to_string(),
            "help".to_string(),
            "exit".to_string(),
        ],
    };

    let mut rl = Editor::with_config(config)?;
    rl.set_helper(Some(helper));

    loop {
        let readline = rl.readline(">> ");
        match readline {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                rl.add_history_entry(trimmed)?;

                let parts: Vec<String> = trimmed.split_whitespace().map(str::to_string).collect();
                match parts[0].as_str() {
                    "help" | "?" => {
                        println!("\nAvailable Commands:");
                        println!("  ls [day]          - List all flights, or only the given day heading");
                        println!("  day <label>       - Reduced board for one day, e.g. day Saturday 25 January 2025");
                        println!("  next [date time]  - Next relevant flight and countdown; optional reference");
                        println!("                      time as YYYY-MM-DD HH:MM:SS for deterministic output");
                        println!("  help / ?          - Show this help menu");
                        println!("  exit / quit       - Exit the flight board\n");
                    }
                    "exit" | "quit" => break,
                    _ => {
                        if let Err(err) = run_command(&board, &parts, false) {
                            println!("Error: {}", err);
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }
    Ok(())
}
