//! # Report Module
//!
//! Renders reconciliation results as the plain text report that is printed or
//! mailed. Each itinerary gets an identification line, its status lines and a
//! blank separator line.

use crate::itinerary::ExpectedItinerary;
use crate::reconcile::{ArrivalStatus, DepartureStatus, ReconciliationResult, TrackStatus};
use crate::service::ApiError;
use chrono::{NaiveDate, NaiveTime};
use std::fmt::Write;

const INDENT: &str = "    ";

/// Subject line of the report for `date`.
pub fn subject(date: NaiveDate) -> String {
    format!("Fahrplan-Updates für {}", date.format("%Y-%m-%d"))
}

fn hhmm(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Identification line, e.g. `ICE 791 um 07:33 (Berlin Hbf -> Braunschweig Hbf), Gleis 14`.
pub fn info_line(itinerary: &ExpectedItinerary) -> String {
    format!(
        "{} um {} ({} -> {}), Gleis {}",
        itinerary.service(),
        hhmm(itinerary.departure_time()),
        itinerary.departure(),
        itinerary.destination(),
        itinerary.track()
    )
}

/// Status lines, one per deviating dimension.
pub fn status_lines(itinerary: &ExpectedItinerary, result: &ReconciliationResult) -> Vec<String> {
    if result.all_ok() {
        return vec![format!("{INDENT}Zug verkehrt planmäßig")];
    }
    if result.departure == DepartureStatus::NotFound {
        return vec![format!("{INDENT}Zug fällt aus / Zug nicht gefunden")];
    }

    let mut lines = Vec::new();

    if !result.destination_reached {
        lines.push(format!("{INDENT}Ohne Halt in {}", itinerary.destination()));
    }

    match result.departure {
        DepartureStatus::OnTime => lines.push(format!("{INDENT}Abfahrtszeit planmässig")),
        DepartureStatus::Deviated(actual) => {
            lines.push(format!("{INDENT}Abfahrtszeit abweichend um {}", hhmm(actual)))
        }
        DepartureStatus::NotFound => {}
    }

    if let TrackStatus::Deviated(track) = &result.track {
        lines.push(format!("{INDENT}Abweichend von Gleis {track}"));
    }

    let scheduled = hhmm(itinerary.arrival_time());
    match result.arrival {
        ArrivalStatus::Deviated(Some(actual)) => lines.push(format!(
            "{INDENT}Ankunftszeit abweichend um {} (statt {scheduled})",
            hhmm(actual)
        )),
        ArrivalStatus::Deviated(None) => {
            lines.push(format!("{INDENT}Ankunftszeit unbekannt (statt {scheduled})"))
        }
        ArrivalStatus::OnTime | ArrivalStatus::NotApplicable => {}
    }

    lines
}

/// Accumulates the report for a batch of itineraries.
#[derive(Debug, Default)]
pub struct Report {
    text: String,
    checked: usize,
    failed: usize,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the verdict for one itinerary.
    pub fn add(&mut self, itinerary: &ExpectedItinerary, result: &ReconciliationResult) {
        let lines = status_lines(itinerary, result);
        self.push_block(itinerary, &lines);
        if !result.all_ok() {
            self.failed += 1;
        }
    }

    /// Adds an itinerary whose check was aborted by the timetable service.
    pub fn add_failure(&mut self, itinerary: &ExpectedItinerary, error: &ApiError) {
        let lines = [format!("{INDENT}Abfrage fehlgeschlagen: {error}")];
        self.push_block(itinerary, &lines);
        self.failed += 1;
    }

    fn push_block(&mut self, itinerary: &ExpectedItinerary, lines: &[String]) {
        // Writing to a String cannot fail.
        let _ = writeln!(self.text, "{}", info_line(itinerary));
        for line in lines {
            let _ = writeln!(self.text, "{line}");
        }
        self.text.push('\n');
        self.checked += 1;
    }

    /// Number of itineraries added so far.
    pub fn checked(&self) -> usize {
        self.checked
    }

    /// True when every added itinerary runs as expected.
    pub fn all_ok(&self) -> bool {
        self.failed == 0
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}
