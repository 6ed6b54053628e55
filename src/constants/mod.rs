//! # Constants and Configuration Module
//!
//! This module defines static constants and handles the loading and validation
//! of the Fahrplan API credentials. Credentials live in two plain text files
//! inside a credentials directory and are read once, when the timetable client
//! is constructed.
//!
//! A missing, unreadable or blank credential file is a configuration error and
//! is reported separately from failures of the remote service.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Base URL of the Deutsche Bahn Fahrplan API (v1).
pub const DEFAULT_BASE_URL: &str = "https://apis.deutschebahn.com/db-api-marketplace/apis/fahrplan/v1";
/// File holding the `DB-Client-Id` credential.
pub const CLIENT_ID_FILE: &str = "fahrplanapi-client-id.txt";
/// File holding the `DB-Api-Key` credential.
pub const CLIENT_SECRET_FILE: &str = "fahrplanapi-client-secret.txt";

/// Environment variable overriding the credentials directory.
pub const CREDENTIALS_DIR_VAR: &str = "FAHRPLAN_CREDENTIALS_DIR";
/// Environment variable overriding the API base URL.
pub const BASE_URL_VAR: &str = "FAHRPLAN_BASE_URL";

/// Represents errors that can occur while loading the tool's configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The credential file does not exist or cannot be read.
    MissingFile(PathBuf),
    /// The credential file exists but contains only whitespace.
    EmptyFile(PathBuf),
    /// The itinerary file cannot be read or does not describe a valid itinerary list.
    Itineraries { path: PathBuf, message: String },
}

impl fmt::Display for ConfigError {
    /// Formats the configuration error for display.
    ///
    /// The message names the offending file and how to fix it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingFile(path) => write!(
                f,
                "Access data for Fahrplan API required: cannot read '{}'. \
                Place the file in the credentials directory or set {CREDENTIALS_DIR_VAR}.",
                path.display()
            ),
            ConfigError::EmptyFile(path) => write!(
                f,
                "Credential file '{}' is empty. \
                It must contain a non-empty Fahrplan API credential.",
                path.display()
            ),
            ConfigError::Itineraries { path, message } => {
                write!(f, "Invalid itinerary file '{}': {message}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// The two static tokens required by every Fahrplan API request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Sent as `DB-Client-Id`.
    pub client_id: String,
    /// Sent as `DB-Api-Key`.
    pub client_secret: String,
}

impl Credentials {
    /// Reads both credential files from `dir`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if either file is missing, unreadable or blank.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        Ok(Self {
            client_id: load_credential(&dir.join(CLIENT_ID_FILE))?,
            client_secret: load_credential(&dir.join(CLIENT_SECRET_FILE))?,
        })
    }
}

/// A generic helper to load and validate a single credential value.
///
/// The `fetch` closure does the actual reading so that the validation rules
/// (trimmed, non-empty) are shared regardless of where the value comes from.
fn load_with<F>(path: &Path, fetch: F) -> Result<String, ConfigError>
where
    F: Fn(&Path) -> io::Result<String>,
{
    match fetch(path) {
        Ok(raw) => {
            let value = raw.trim();
            if value.is_empty() {
                Err(ConfigError::EmptyFile(path.to_path_buf()))
            } else {
                Ok(value.to_string())
            }
        }
        Err(_) => Err(ConfigError::MissingFile(path.to_path_buf())),
    }
}

/// Reads a credential from a file using the `load_with` helper.
fn load_credential(path: &Path) -> Result<String, ConfigError> {
    load_with(path, |p| fs::read_to_string(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_reads_and_trims_both_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CLIENT_ID_FILE), "my-id\n").unwrap();
        fs::write(dir.path().join(CLIENT_SECRET_FILE), "  my-secret  ").unwrap();

        let credentials = Credentials::load(dir.path()).unwrap();
        assert_eq!(credentials.client_id, "my-id");
        assert_eq!(credentials.client_secret, "my-secret");
    }

    #[test]
    fn load_reports_missing_secret() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CLIENT_ID_FILE), "my-id").unwrap();

        let err = Credentials::load(dir.path()).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingFile(dir.path().join(CLIENT_SECRET_FILE))
        );
    }

    #[test]
    fn load_reports_blank_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CLIENT_ID_FILE), "   \n").unwrap();
        fs::write(dir.path().join(CLIENT_SECRET_FILE), "secret").unwrap();

        let err = Credentials::load(dir.path()).unwrap_err();
        assert_eq!(err, ConfigError::EmptyFile(dir.path().join(CLIENT_ID_FILE)));
    }

    #[test]
    fn load_with_maps_io_errors_to_missing() {
        let path = Path::new("nowhere.txt");
        let result = load_with(path, |_| Err(io::Error::other("denied")));
        assert_eq!(result, Err(ConfigError::MissingFile(path.to_path_buf())));
    }

    #[test]
    fn config_error_display() {
        let missing = ConfigError::MissingFile(PathBuf::from("fahrplanapi-client-id.txt"));
        assert!(missing.to_string().starts_with("Access data for Fahrplan API required"));
        assert!(missing.to_string().contains(CREDENTIALS_DIR_VAR));

        let empty = ConfigError::EmptyFile(PathBuf::from("secret.txt"));
        assert_eq!(
            empty.to_string(),
            "Credential file 'secret.txt' is empty. \
             It must contain a non-empty Fahrplan API credential."
        );
    }
}
