//! # Service Module
//!
//! This module handles all interactions with the Deutsche Bahn Fahrplan API.
//! It defines the data structures for deserializing API responses and the
//! three read operations the reconciler needs: station lookup, departure
//! board lookup and journey details lookup.
//!
//! Not finding something (no station with that exact name, no matching
//! service on the board) is an ordinary outcome and is returned as `None`.
//! Only failed requests and unreadable payloads are errors.

use crate::constants::Credentials;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use log::{debug, warn};
use once_cell::sync::Lazy;
use reqwest::Url;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::convert::TryFrom;
use std::fmt;

/// A lazily initialized, shared `reqwest::Client` for making HTTP requests.
/// Using a single client instance is more efficient as it reuses connection pools.
static CLIENT: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

/// Track reported when the departure board does not name one.
pub const UNKNOWN_TRACK: &str = "0";

/// Errors raised by the timetable service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The service answered with a non-success status.
    #[error("Fahrplan API request failed with status {status}: {payload}")]
    Status { status: u16, payload: String },

    /// The service answered, but the payload could not be understood.
    #[error("Fahrplan API returned an unreadable payload (status {status}): {message}")]
    Payload {
        status: u16,
        message: String,
        payload: String,
    },

    /// The request never produced a response.
    #[error("Fahrplan API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The configured base URL cannot carry a request path.
    #[error("Invalid Fahrplan API base URL '{0}'")]
    BaseUrl(String),
}

/// Opaque station identifier, as returned by the location search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationId(pub String);

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque reference to one live service run, used to fetch its stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JourneyRef(pub String);

/// The departure board entry matching the requested service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartureMatch {
    /// Reference for the journey details lookup.
    pub reference: JourneyRef,
    /// Departure time shown on the board.
    pub time: NaiveTime,
    /// Track shown on the board, `UNKNOWN_TRACK` when absent.
    pub track: String,
}

/// A stop of a live service run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stop {
    pub name: String,
    /// Absent at the origin.
    pub arrival: Option<NaiveTime>,
    /// Absent at the terminus.
    pub departure: Option<NaiveTime>,
}

/// Read access to a timetable.
///
/// Implemented by `TimetableClient` for the live API; the reconciler only
/// depends on this trait.
#[allow(async_fn_in_trait)]
pub trait Timetable {
    /// Returns the id of the first station whose name equals `name` exactly.
    async fn resolve_station(&self, name: &str) -> Result<Option<StationId>, ApiError>;

    /// Looks up `service` on the departure board of `station` at `date` and `time`.
    async fn lookup_departure(
        &self,
        station: &StationId,
        date: NaiveDate,
        time: NaiveTime,
        service: &str,
    ) -> Result<Option<DepartureMatch>, ApiError>;

    /// Returns the stops of a journey in the order the service calls at them.
    async fn lookup_journey_stops(&self, reference: &JourneyRef) -> Result<Vec<Stop>, ApiError>;
}

/// Internal struct representing a location search result.
#[derive(Deserialize, Debug)]
struct ApiLocation {
    name: String,
    #[serde(deserialize_with = "string_or_number")]
    id: String,
}

/// Internal struct representing a single departure board entry.
///
/// Only `name` is needed to skip an entry; the remaining fields are checked
/// once the entry is known to be the requested service.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ApiDeparture {
    name: String,
    #[serde(default)]
    date_time: Option<String>,
    #[serde(default, deserialize_with = "optional_string_or_number")]
    track: Option<String>,
    #[serde(default)]
    details_id: Option<String>,
}

/// Internal struct representing a single stop of a journey.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ApiStop {
    #[serde(default)]
    stop_name: String,
    #[serde(default)]
    arr_time: Option<String>,
    #[serde(default)]
    dep_time: Option<String>,
}

/// Some fields (station ids, tracks) arrive either as JSON strings or numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Text(String),
    Integer(i64),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::Text(text) => text,
            StringOrNumber::Integer(number) => number.to_string(),
        }
    }
}

/// Deserializes a string or an integer into a `String`.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    StringOrNumber::deserialize(deserializer).map(String::from)
}

fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(String::from))
}

/// Parses a stop time; an unreadable value counts as unknown.
fn parse_clock(value: &str) -> Option<NaiveTime> {
    match NaiveTime::parse_from_str(value, "%H:%M") {
        Ok(time) => Some(time),
        Err(e) => {
            warn!("ignoring stop time '{value}': {e}");
            None
        }
    }
}

fn parse_board_time(value: &str) -> Result<NaiveTime, String> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .map(|dt| dt.time())
        .map_err(|e| format!("invalid dateTime '{value}': {e}"))
}

/// Converts a raw board entry into the application's `DepartureMatch`.
impl TryFrom<ApiDeparture> for DepartureMatch {
    type Error = String;

    fn try_from(entry: ApiDeparture) -> Result<Self, Self::Error> {
        let details_id = entry
            .details_id
            .ok_or_else(|| format!("{}: missing detailsId", entry.name))?;
        let date_time = entry
            .date_time
            .ok_or_else(|| format!("{}: missing dateTime", entry.name))?;
        Ok(DepartureMatch {
            reference: JourneyRef(details_id),
            time: parse_board_time(&date_time)?,
            track: entry.track.unwrap_or_else(|| UNKNOWN_TRACK.to_string()),
        })
    }
}

/// Converts a raw journey stop into the application's `Stop`.
impl From<ApiStop> for Stop {
    fn from(stop: ApiStop) -> Self {
        Stop {
            arrival: stop.arr_time.as_deref().and_then(parse_clock),
            departure: stop.dep_time.as_deref().and_then(parse_clock),
            name: stop.stop_name,
        }
    }
}

/// HTTP client for the Fahrplan API.
///
/// Holds the credentials loaded at startup; each operation issues exactly one
/// request and nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct TimetableClient {
    base_url: String,
    credentials: Credentials,
}

impl TimetableClient {
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            base_url: base_url.into(),
            credentials,
        }
    }

    /// Builds `<base>/<endpoint>/<query>`, percent-encoding the query segment.
    fn endpoint_url(&self, endpoint: &str, query: &str) -> Result<Url, ApiError> {
        let invalid = || ApiError::BaseUrl(self.base_url.clone());
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .push(endpoint)
            .push(query);
        Ok(url)
    }

    /// Performs the actual HTTP GET request and decodes the JSON body.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - The API endpoint (`location`, `departureBoard`, `journeyDetails`).
    /// * `query` - The path argument of the endpoint.
    /// * `params` - Additional query string parameters.
    async fn make_request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &str,
        params: &[(&str, String)],
    ) -> Result<Reply<T>, ApiError> {
        let url = self.endpoint_url(endpoint, query)?;
        debug!("GET {url} {params:?}");

        let response = CLIENT
            .get(url)
            .header("DB-Client-Id", &self.credentials.client_id)
            .header("DB-Api-Key", &self.credentials.client_secret)
            .header(ACCEPT, "application/json")
            .query(params)
            .send()
            .await?;

        let status = response.status();
        let payload = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                payload,
            });
        }

        let status = status.as_u16();
        match serde_json::from_str(&payload) {
            Ok(value) => Ok(Reply {
                value,
                status,
                payload,
            }),
            Err(e) => Err(ApiError::Payload {
                status,
                message: e.to_string(),
                payload,
            }),
        }
    }
}

/// A decoded response, keeping what is needed to report a bad entry later.
struct Reply<T> {
    value: T,
    status: u16,
    payload: String,
}

impl<T> Reply<T> {
    fn malformed(self, message: String) -> ApiError {
        ApiError::Payload {
            status: self.status,
            message,
            payload: self.payload,
        }
    }
}

impl Timetable for TimetableClient {
    async fn resolve_station(&self, name: &str) -> Result<Option<StationId>, ApiError> {
        let reply: Reply<Vec<ApiLocation>> = self.make_request("location", name, &[]).await?;

        Ok(reply
            .value
            .into_iter()
            .find(|location| location.name == name)
            .map(|location| StationId(location.id)))
    }

    async fn lookup_departure(
        &self,
        station: &StationId,
        date: NaiveDate,
        time: NaiveTime,
        service: &str,
    ) -> Result<Option<DepartureMatch>, ApiError> {
        let timestamp = date.and_time(time).format("%Y-%m-%dT%H:%M:%S").to_string();
        let mut reply: Reply<Vec<ApiDeparture>> = self
            .make_request("departureBoard", &station.0, &[("date", timestamp)])
            .await?;

        let Some(index) = reply.value.iter().position(|entry| entry.name == service) else {
            return Ok(None);
        };
        let entry = reply.value.swap_remove(index);
        match DepartureMatch::try_from(entry) {
            Ok(found) => Ok(Some(found)),
            Err(message) => Err(reply.malformed(message)),
        }
    }

    async fn lookup_journey_stops(&self, reference: &JourneyRef) -> Result<Vec<Stop>, ApiError> {
        let reply: Reply<Vec<ApiStop>> =
            self.make_request("journeyDetails", &reference.0, &[]).await?;

        Ok(reply.value.into_iter().map(Stop::from).collect())
    }
}
