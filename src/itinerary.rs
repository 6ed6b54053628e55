//! # Itinerary Module
//!
//! The expected journey legs that are checked against the live timetable,
//! either the built-in list or a JSON itinerary file.

use crate::constants::ConfigError;
use crate::service::string_or_number;
use chrono::{NaiveTime, TimeDelta};
use serde::Deserialize;
use std::convert::TryFrom;
use std::fs;
use std::path::Path;

/// One intended journey leg as the traveller expects it to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedItinerary {
    departure: String,
    destination: String,
    service: String,
    departure_time: NaiveTime,
    arrival_time: NaiveTime,
    track: String,
}

impl ExpectedItinerary {
    /// Builds an itinerary from the textual form used in itinerary files.
    ///
    /// Times are `H:MM` or `HH:MM`. The track is kept as a string since the
    /// live board reports it that way.
    pub fn new(
        departure: &str,
        destination: &str,
        service: &str,
        departure_time: &str,
        arrival_time: &str,
        track: impl ToString,
    ) -> Result<Self, String> {
        Ok(Self {
            departure: departure.to_string(),
            destination: destination.to_string(),
            service: service.to_string(),
            departure_time: parse_time_of_day(departure_time)?,
            arrival_time: parse_time_of_day(arrival_time)?,
            track: track.to_string(),
        })
    }

    pub fn departure(&self) -> &str {
        &self.departure
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Trainline plus number, e.g. `ICE 791`.
    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn departure_time(&self) -> NaiveTime {
        self.departure_time
    }

    pub fn arrival_time(&self) -> NaiveTime {
        self.arrival_time
    }

    pub fn track(&self) -> &str {
        &self.track
    }
}

/// Parses a time of day written as `H:MM` or `HH:MM`.
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, String> {
    let (hours, minutes) = value
        .trim()
        .split_once(':')
        .ok_or_else(|| format!("'{value}' is not a time of day"))?;
    let hours: u32 = hours
        .parse()
        .map_err(|_| format!("invalid hour in '{value}'"))?;
    let minutes: u32 = minutes
        .parse()
        .map_err(|_| format!("invalid minute in '{value}'"))?;
    NaiveTime::from_hms_opt(hours, minutes, 0).ok_or_else(|| format!("'{value}' is out of range"))
}

/// Raw entry of an itinerary file.
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct ItineraryEntry {
    departure: String,
    destination: String,
    service: String,
    departure_time: String,
    arrival_time: String,
    #[serde(deserialize_with = "string_or_number")]
    track: String,
}

impl TryFrom<ItineraryEntry> for ExpectedItinerary {
    type Error = String;

    fn try_from(entry: ItineraryEntry) -> Result<Self, Self::Error> {
        ExpectedItinerary::new(
            &entry.departure,
            &entry.destination,
            &entry.service,
            &entry.departure_time,
            &entry.arrival_time,
            entry.track,
        )
        .map_err(|e| format!("{}: {e}", entry.service))
    }
}

/// Parses an itinerary list from its JSON representation.
pub fn parse_itineraries(json: &str) -> Result<Vec<ExpectedItinerary>, String> {
    let entries: Vec<ItineraryEntry> = serde_json::from_str(json).map_err(|e| e.to_string())?;
    entries.into_iter().map(ExpectedItinerary::try_from).collect()
}

/// Loads the itinerary list from a JSON file.
///
/// # Errors
///
/// Returns `ConfigError::Itineraries` if the file cannot be read or parsed.
pub fn load_itineraries(path: &Path) -> Result<Vec<ExpectedItinerary>, ConfigError> {
    let to_config_error = |message: String| ConfigError::Itineraries {
        path: path.to_path_buf(),
        message,
    };
    let json = fs::read_to_string(path).map_err(|e| to_config_error(e.to_string()))?;
    parse_itineraries(&json).map_err(to_config_error)
}

/// Time of day from hours and minutes past midnight.
fn clock(hour: i64, minute: i64) -> NaiveTime {
    NaiveTime::MIN + TimeDelta::minutes(hour * 60 + minute)
}

/// The connections checked when no itinerary file is given.
pub fn default_itineraries() -> Vec<ExpectedItinerary> {
    [
        ("Berlin Hbf", "Braunschweig Hbf", "ICE 595", clock(7, 34), clock(8, 56), "14"),
        ("Braunschweig Hbf", "Berlin Hbf", "ICE 370", clock(15, 59), clock(17, 28), "7"),
        ("Braunschweig Hbf", "Berlin Hbf", "ICE 598", clock(16, 59), clock(18, 25), "7"),
        ("Braunschweig Hbf", "Berlin Hbf", "ICE 278", clock(17, 59), clock(19, 28), "7"),
    ]
    .into_iter()
    .map(|(from, to, service, dep, arr, track)| ExpectedItinerary {
        departure: from.to_string(),
        destination: to.to_string(),
        service: service.to_string(),
        departure_time: dep,
        arrival_time: arr,
        track: track.to_string(),
    })
    .collect()
}
