//! # Fahrplan Agent
//!
//! A command-line tool that checks whether a list of expected train
//! connections runs as scheduled on a given day (tomorrow by default).
//!
//! Each connection is looked up on the live departure board of the Deutsche
//! Bahn Fahrplan API. Delays, track changes and skipped stops are collected
//! into a short German report which is printed, or mailed when a recipient is
//! configured.

use chrono::{Days, Local, NaiveDate};
use clap::Parser;
use constants::{BASE_URL_VAR, CREDENTIALS_DIR_VAR, Credentials, DEFAULT_BASE_URL};
use dotenvy::dotenv;
use itinerary::ExpectedItinerary;
use log::{error, info};
use mail::{DispatchPolicy, Mailer};
use report::Report;
use service::{Timetable, TimetableClient};
use std::path::PathBuf;

mod constants;
mod error;
mod itinerary;
mod logging;
mod mail;
mod reconcile;
mod report;
mod service;

use error::AppError;

/// Defines the command-line arguments for the Fahrplan Agent.
#[derive(Parser, Debug)]
#[command(
    name = "fahrplan_agent",
    version,
    about = "Checks expected train connections against the live DB timetable.",
    long_about = None
)]
struct Cli {
    /// Day to check (YYYY-MM-DD). Defaults to tomorrow.
    #[arg(short, long)]
    date: Option<NaiveDate>,

    /// Mail the report to this address instead of printing it.
    #[arg(short, long)]
    mailto: Option<String>,

    /// When a report is mailed.
    #[arg(short, long, value_enum, default_value_t = DispatchPolicy::OnFailure)]
    policy: DispatchPolicy,

    /// JSON file with the connections to check. Defaults to the built-in list.
    #[arg(short, long)]
    itineraries: Option<PathBuf>,

    /// Directory containing the Fahrplan API credential files.
    #[arg(long, env = CREDENTIALS_DIR_VAR, default_value = ".")]
    credentials_dir: PathBuf,

    /// Base URL of the Fahrplan API.
    #[arg(long, env = BASE_URL_VAR, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Report failed lookups and keep checking the remaining connections.
    #[arg(long)]
    isolate_failures: bool,
}

/// Everything a run needs, resolved once at startup.
#[derive(Debug)]
struct Config {
    date: NaiveDate,
    mailto: Option<String>,
    policy: DispatchPolicy,
    itineraries: Vec<ExpectedItinerary>,
    isolate_failures: bool,
}

impl Config {
    /// Resolves the CLI arguments, loading the itinerary file if one is given.
    fn from_cli(cli: &Cli) -> Result<Self, AppError> {
        let itineraries = match &cli.itineraries {
            Some(path) => itinerary::load_itineraries(path)?,
            None => itinerary::default_itineraries(),
        };

        Ok(Self {
            date: cli
                .date
                .unwrap_or_else(|| Local::now().date_naive() + Days::new(1)),
            mailto: cli.mailto.clone(),
            policy: cli.policy,
            itineraries,
            isolate_failures: cli.isolate_failures,
        })
    }
}

/// Checks every configured itinerary in turn and collects the verdicts.
///
/// # Errors
///
/// Returns the first `ApiError` unless `isolate_failures` is set, in which
/// case failed itineraries are reported and the batch continues.
async fn check_all<T: Timetable>(timetable: &T, config: &Config) -> Result<Report, AppError> {
    let mut report = Report::new();

    for itinerary in &config.itineraries {
        match reconcile::check_for_date(timetable, itinerary, config.date).await {
            Ok(result) => report.add(itinerary, &result),
            Err(e) if config.isolate_failures => {
                error!("checking {} failed: {e}", itinerary.service());
                report.add_failure(itinerary, &e);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(report)
}

/// Prints the report, or mails it when a recipient is configured and the
/// dispatch policy asks for it.
async fn dispatch(config: &Config, report: &Report, mailer: &Mailer) -> Result<(), AppError> {
    let subject = report::subject(config.date);

    match &config.mailto {
        None => {
            println!("{subject}");
            println!();
            print!("{}", report.text());
        }
        Some(recipient) if config.policy.should_send(report) => {
            mailer.send(&subject, recipient, report.text()).await?;
        }
        Some(_) => info!("all connections run as scheduled, no mail sent"),
    }

    Ok(())
}

/// The main entry point for the application.
///
/// 1. Loads environment variables from a `.env` file and sets up logging.
/// 2. Parses command-line arguments.
/// 3. Loads the API credentials; with the `fail-fast-config` feature a
///    missing credential exits immediately.
/// 4. Checks every itinerary and prints or mails the report.
#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load environment variables from a .env file, if it exists.
    let _ = dotenv();
    logging::initialize_logging();

    let cli = Cli::parse();

    let credentials = match Credentials::load(&cli.credentials_dir) {
        Ok(credentials) => credentials,
        #[cfg(feature = "fail-fast-config")]
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
        #[cfg(not(feature = "fail-fast-config"))]
        Err(e) => return Err(e.into()),
    };
    let config = Config::from_cli(&cli)?;
    let client = TimetableClient::new(cli.base_url, credentials);

    info!(
        "checking {} connections for {}",
        config.itineraries.len(),
        config.date
    );
    let report = check_all(&client, &config).await?;
    dispatch(&config, &report, &Mailer::default()).await
}
