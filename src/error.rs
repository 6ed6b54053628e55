use crate::{constants::ConfigError, mail::MailError, service::ApiError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Timetable lookup failed: {0}")]
    Api(#[from] ApiError),

    #[error("Sending the report failed: {0}")]
    Mail(#[from] MailError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn error_display() {
        let err = AppError::from(ApiError::Status {
            status: 500,
            payload: "oops".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "Timetable lookup failed: Fahrplan API request failed with status 500: oops"
        );

        let err = AppError::from(ConfigError::EmptyFile(PathBuf::from("id.txt")));
        assert!(err.to_string().starts_with("Configuration error: Credential file 'id.txt'"));
    }
}
