use anyhow::Result;
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use std::sync::Arc;

use skycast_core::{
    Config, Connectivity, DiskStore, HistoryEntry, LookupCoordinator, VisualCrossingClient,
    WeatherSnapshot, WeatherStore,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "skycast", version, about = "Weather lookup with an offline cache")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the Visual Crossing API key.
    Configure,

    /// Look up current conditions and the short forecast for a location.
    Show {
        /// City or location name.
        location: String,

        /// Skip the network and show the cached snapshot instead.
        #[arg(long)]
        offline: bool,
    },

    /// Print previous successful lookups, newest first.
    History,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { location, offline } => show(&location, offline).await,
            Command::History => history().await,
        }
    }
}

fn configure() -> Result<()> {
    let mut config = Config::load()?;

    let api_key = inquire::Password::new("Visual Crossing API key:")
        .without_confirmation()
        .prompt()?;
    config.set_api_key(api_key);
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn show(location: &str, offline: bool) -> Result<()> {
    let config = Config::load()?;

    // Offline lookups never touch the network, so a missing key is fine there.
    let api_key = if offline {
        config.api_key.clone().unwrap_or_default()
    } else {
        config.require_api_key()?.to_string()
    };

    let source = Arc::new(VisualCrossingClient::new(api_key));
    let store = WeatherStore::new(Arc::new(DiskStore::open_default()?));
    let coordinator = LookupCoordinator::new(source, store);

    let connectivity = if offline {
        println!("You're offline. Showing cached data.");
        Connectivity::Offline
    } else {
        Connectivity::Unknown
    };

    let state = coordinator.lookup(location, connectivity).await;

    if let Some(message) = state.error {
        anyhow::bail!(message);
    }
    if let Some(snapshot) = &state.data {
        print_snapshot(snapshot, location);
    }

    Ok(())
}

async fn history() -> Result<()> {
    let store = WeatherStore::new(Arc::new(DiskStore::open_default()?));
    let log = store.load_history().await;

    if log.is_empty() {
        println!("No search history yet");
        return Ok(());
    }

    for entry in log.entries() {
        print_history_entry(entry);
    }

    Ok(())
}

fn print_snapshot(snapshot: &WeatherSnapshot, location: &str) {
    let name = snapshot.resolved_address.as_deref().unwrap_or(location);
    let current = &snapshot.current_conditions;

    println!("{name}");
    println!("  {}  {}", format_temp(current.temp), current.conditions);
    println!(
        "  humidity {:.0}%  wind {:.1} mph  pressure {:.1} mb  visibility {:.1} mi",
        current.humidity, current.windspeed, current.pressure, current.visibility
    );

    if snapshot.days.is_empty() {
        return;
    }

    println!("Forecast:");
    for day in snapshot.days.iter().take(5) {
        println!(
            "  {}  {} / {}  {}",
            day.datetime,
            format_temp(day.tempmax),
            format_temp(day.tempmin),
            day.conditions
        );
    }
}

fn print_history_entry(entry: &HistoryEntry) {
    let name = entry
        .snapshot
        .resolved_address
        .as_deref()
        .unwrap_or("Unknown location");
    let current = &entry.snapshot.current_conditions;

    println!(
        "{}  {}  {} {}",
        format_timestamp(&entry.timestamp),
        name,
        format_temp(current.temp),
        current.conditions
    );
}

fn format_temp(temp: f64) -> String {
    format!("{}°F", temp.round())
}

fn format_timestamp(timestamp: &str) -> String {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|when| when.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}
