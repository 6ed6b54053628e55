//! # Mail Module
//!
//! Hands the rendered report to the system `mail` command.

use crate::report::Report;
use clap::ValueEnum;
use log::info;
use std::process::{ExitStatus, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Program used to send the report.
pub const MAIL_PROGRAM: &str = "mail";

/// When a report is mailed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DispatchPolicy {
    /// Only when at least one itinerary deviates from its timetable.
    #[default]
    OnFailure,
    /// Whenever at least one itinerary was checked.
    Always,
}

impl DispatchPolicy {
    pub fn should_send(&self, report: &Report) -> bool {
        if report.checked() == 0 {
            return false;
        }
        match self {
            DispatchPolicy::OnFailure => !report.all_ok(),
            DispatchPolicy::Always => true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to pass the report to the mail program: {0}")]
    Io(#[from] std::io::Error),

    #[error("Mail program exited with {0}")]
    Exit(ExitStatus),
}

/// Sends reports through a `mail`-compatible program (`<program> -s <subject> <recipient>`).
#[derive(Debug, Clone)]
pub struct Mailer {
    program: String,
}

impl Default for Mailer {
    fn default() -> Self {
        Self::new(MAIL_PROGRAM)
    }
}

impl Mailer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Writes `body` to the program's stdin and waits for it to finish.
    pub async fn send(&self, subject: &str, recipient: &str, body: &str) -> Result<(), MailError> {
        let mut child = Command::new(&self.program)
            .arg("-s")
            .arg(subject)
            .arg(recipient)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|source| MailError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(body.as_bytes()).await?;
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(MailError::Exit(status));
        }

        info!("report '{subject}' sent to {recipient}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::itinerary::ExpectedItinerary;
    use crate::reconcile::{ArrivalStatus, DepartureStatus, ReconciliationResult, TrackStatus};
    use crate::service::ApiError;

    fn itinerary() -> ExpectedItinerary {
        ExpectedItinerary::new("Berlin Hbf", "Braunschweig Hbf", "ICE 791", "7:33", "8:57", 14)
            .unwrap()
    }

    fn failing_report() -> Report {
        let mut report = Report::new();
        report.add(&itinerary(), &ReconciliationResult::not_found());
        report
    }

    fn passing_report() -> Report {
        let mut report = Report::new();
        report.add(
            &itinerary(),
            &ReconciliationResult {
                departure: DepartureStatus::OnTime,
                track: TrackStatus::OnTrack,
                destination_reached: true,
                arrival: ArrivalStatus::OnTime,
            },
        );
        report
    }

    #[test]
    fn on_failure_policy() {
        assert!(DispatchPolicy::OnFailure.should_send(&failing_report()));
        assert!(!DispatchPolicy::OnFailure.should_send(&passing_report()));
    }

    #[test]
    fn aborted_check_counts_as_failure() {
        let mut report = passing_report();
        report.add_failure(
            &itinerary(),
            &ApiError::Status {
                status: 500,
                payload: String::new(),
            },
        );
        assert!(DispatchPolicy::OnFailure.should_send(&report));
    }

    #[test]
    fn always_policy() {
        assert!(DispatchPolicy::Always.should_send(&failing_report()));
        assert!(DispatchPolicy::Always.should_send(&passing_report()));
    }

    #[test]
    fn nothing_checked_sends_nothing() {
        assert!(!DispatchPolicy::Always.should_send(&Report::new()));
        assert!(!DispatchPolicy::OnFailure.should_send(&Report::new()));
    }

    #[test]
    fn default_policy_is_on_failure() {
        assert_eq!(DispatchPolicy::default(), DispatchPolicy::OnFailure);
        assert_eq!(Mailer::default().program, MAIL_PROGRAM);
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let mailer = Mailer::new("definitely-not-a-mail-program");
        let err = mailer.send("subject", "me@example.org", "body").await.unwrap_err();
        assert!(matches!(err, MailError::Spawn { .. }));
    }

    // `sh -s` runs its stdin as a script, which lets the body choose the exit code.
    #[cfg(unix)]
    #[tokio::test]
    async fn exit_status_is_checked() {
        let mailer = Mailer::new("sh");
        mailer
            .send("subject", "me@example.org", "exit 0\n")
            .await
            .unwrap();

        let err = mailer
            .send("subject", "me@example.org", "exit 3\n")
            .await
            .unwrap_err();
        assert!(matches!(err, MailError::Exit(status) if status.code() == Some(3)));
    }
}
