//! # Reconcile Module
//!
//! Compares one expected itinerary against the live timetable for a given
//! date. The live departure board lists services by their actual departure
//! time, so a delayed or rescheduled service may only show up on an earlier
//! board. The search therefore walks backwards from the expected departure in
//! half-hour steps until the service is found or the early-morning floor is
//! reached.

use crate::itinerary::ExpectedItinerary;
use crate::service::{ApiError, DepartureMatch, Stop, Timetable};
use chrono::{NaiveDate, NaiveTime, TimeDelta, Timelike};
use log::{debug, info};

/// The backward search only probes while the probe hour is above this value.
pub const SEARCH_FLOOR_HOUR: u32 = 4;

/// Step size of the backward search, in minutes.
const SEARCH_STEP_MINUTES: i64 = 30;

/// Outcome of comparing a scheduled time with the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepartureStatus {
    OnTime,
    Deviated(NaiveTime),
    /// No matching service in the search window.
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackStatus {
    OnTrack,
    Deviated(String),
    /// Only used together with `DepartureStatus::NotFound`.
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalStatus {
    OnTime,
    /// `None` when the destination stop carries no arrival time.
    Deviated(Option<NaiveTime>),
    /// The destination was not reached or the service was not found.
    NotApplicable,
}

/// Verdict for one itinerary on one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationResult {
    pub departure: DepartureStatus,
    pub track: TrackStatus,
    pub destination_reached: bool,
    pub arrival: ArrivalStatus,
}

impl ReconciliationResult {
    /// Result for a service that could not be located.
    pub fn not_found() -> Self {
        Self {
            departure: DepartureStatus::NotFound,
            track: TrackStatus::NotFound,
            destination_reached: false,
            arrival: ArrivalStatus::NotApplicable,
        }
    }

    /// True when the service runs exactly as expected.
    pub fn all_ok(&self) -> bool {
        self.departure == DepartureStatus::OnTime
            && self.track == TrackStatus::OnTrack
            && self.destination_reached
            && self.arrival == ArrivalStatus::OnTime
    }
}

/// Moves a time of day back by half an hour, e.g. 07:04 -> 06:34.
pub fn time_minus_30(time: NaiveTime) -> NaiveTime {
    time - TimeDelta::minutes(SEARCH_STEP_MINUTES)
}

/// Walks the departure board backwards from the expected departure time.
async fn search_departure<T: Timetable>(
    timetable: &T,
    itinerary: &ExpectedItinerary,
    date: NaiveDate,
) -> Result<Option<DepartureMatch>, ApiError> {
    let Some(station) = timetable.resolve_station(itinerary.departure()).await? else {
        info!("station '{}' not found", itinerary.departure());
        return Ok(None);
    };

    let mut probe = itinerary.departure_time();
    while probe.hour() > SEARCH_FLOOR_HOUR {
        debug!(
            "probing {} at {station} for {date} {}",
            itinerary.service(),
            probe.format("%H:%M")
        );
        if let Some(found) = timetable
            .lookup_departure(&station, date, probe, itinerary.service())
            .await?
        {
            return Ok(Some(found));
        }
        probe = time_minus_30(probe);
    }

    Ok(None)
}

/// Arrival time at the last stop whose name starts with `destination`.
///
/// The outer `Option` tells whether any stop matched.
fn destination_arrival(stops: &[Stop], destination: &str) -> Option<Option<NaiveTime>> {
    stops
        .iter()
        .rev()
        .find(|stop| stop.name.starts_with(destination))
        .map(|stop| stop.arrival)
}

/// Checks `itinerary` against the live timetable for `date`.
///
/// # Errors
///
/// Any `ApiError` aborts the check for this itinerary.
pub async fn check_for_date<T: Timetable>(
    timetable: &T,
    itinerary: &ExpectedItinerary,
    date: NaiveDate,
) -> Result<ReconciliationResult, ApiError> {
    let Some(found) = search_departure(timetable, itinerary, date).await? else {
        info!("{} not found on {date}", itinerary.service());
        return Ok(ReconciliationResult::not_found());
    };

    let stops = timetable.lookup_journey_stops(&found.reference).await?;
    for stop in &stops {
        debug!(
            "{}: arr {:?} dep {:?}",
            stop.name, stop.arrival, stop.departure
        );
    }

    let departure = if found.time == itinerary.departure_time() {
        DepartureStatus::OnTime
    } else {
        DepartureStatus::Deviated(found.time)
    };

    let track = if found.track == itinerary.track() {
        TrackStatus::OnTrack
    } else {
        TrackStatus::Deviated(found.track)
    };

    let reached = destination_arrival(&stops, itinerary.destination());
    let arrival = match reached {
        Some(Some(time)) if time == itinerary.arrival_time() => ArrivalStatus::OnTime,
        Some(time) => ArrivalStatus::Deviated(time),
        None => ArrivalStatus::NotApplicable,
    };

    let result = ReconciliationResult {
        departure,
        track,
        destination_reached: reached.is_some(),
        arrival,
    };
    info!("{} on {date}: {result:?}", itinerary.service());
    Ok(result)
}
