use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use env_logger::{Builder, Env};
use serde::Serialize;
use std::process::ExitCode;
use std::sync::Arc;

use orbitwatch::time::parse_utc;
use orbitwatch::{Config, Service, ServiceResult};

#[derive(Parser)]
#[command(name = "orbitwatch")]
#[command(about = "Satellite positions, ground tracks and passes from cached orbital elements")]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<String>,
    /// Use only locally stored elements
    #[arg(long, global = true)]
    offline: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve,
    /// List catalog satellites with their element status
    Satellites,
    /// Element cache status
    Status {
        #[arg(long)]
        satellite: Option<String>,
    },
    /// Fetch fresh elements for one satellite
    Refresh {
        satellite: String,
        /// Report the outcome instead of failing when no source answers
        #[arg(long)]
        best_effort: bool,
    },
    /// Best-effort refresh of every catalog satellite
    RefreshAll,
    /// Current subpoint
    Position { satellite: String },
    /// Ground track, from now or between two instants
    Track {
        satellite: String,
        #[arg(long, default_value_t = 20)]
        minutes: u32,
        #[arg(long, default_value_t = 10)]
        step: u32,
        #[arg(long, value_parser = parse_utc, requires = "end")]
        start: Option<DateTime<Utc>>,
        #[arg(long, value_parser = parse_utc, requires = "start")]
        end: Option<DateTime<Utc>>,
    },
    /// Visibility passes over the configured observer
    Passes {
        satellite: String,
        #[arg(long, default_value_t = 24)]
        hours: u32,
        #[arg(long, default_value_t = 10.0)]
        min_elevation: f64,
        #[arg(long, value_parser = parse_utc)]
        start: Option<DateTime<Utc>>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let service = match config.build_service(!cli.offline) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Serve => serve(config, service).await,
        Commands::Satellites => print_json(&service.satellites()),
        Commands::Status { satellite: None } => print_json(&service.status_all()),
        Commands::Status {
            satellite: Some(key),
        } => report(service.element_status(&key)),
        Commands::Refresh {
            satellite,
            best_effort: true,
        } => report(service.refresh(&satellite).await),
        Commands::Refresh {
            satellite,
            best_effort: false,
        } => report(refresh(&service, &satellite).await),
        Commands::RefreshAll => print_json(&service.refresh_all().await),
        Commands::Position { satellite } => report(service.current_position(&satellite).await),
        Commands::Track {
            satellite,
            minutes,
            step,
            start,
            end,
        } => {
            let result = match (start, end) {
                (Some(start), Some(end)) => {
                    service.ground_track(&satellite, start, end, step).await
                }
                _ => service.ground_track_now(&satellite, minutes, step).await,
            };
            report(result)
        }
        Commands::Passes {
            satellite,
            hours,
            min_elevation,
            start,
        } => report(
            service
                .visibility_passes(&satellite, hours, min_elevation, start)
                .await,
        ),
    }
}

async fn serve(config: Config, service: Arc<Service>) -> ExitCode {
    if config.startup_refresh_enabled() {
        let service = service.clone();
        tokio::spawn(async move { service.startup_refresh().await });
    } else {
        log::info!("Startup element refresh disabled");
    }

    match orbitwatch::web::run_server(service, config.web).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn refresh(service: &Service, key: &str) -> ServiceResult<serde_json::Value> {
    let entry = service.catalog_entry(key)?;
    let source = service.refresh_or_fail(&entry.key).await?;
    Ok(serde_json::json!({
        "satellite": entry,
        "refreshed": true,
        "source": source,
    }))
}

fn report<T: Serialize>(result: ServiceResult<T>) -> ExitCode {
    match result {
        Ok(value) => print_json(&value),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error encoding output: {}", e);
            ExitCode::FAILURE
        }
    }
}
