//! Core library for the `skycast` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The remote weather source and its Visual Crossing implementation
//! - Local persistence for the latest snapshot and the search history
//! - The lookup coordinator deciding fetch-vs-cache per query
//!
//! It is used by `skycast-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod connectivity;
pub mod lookup;
pub mod model;
pub mod source;
pub mod store;

pub use config::Config;
pub use connectivity::Connectivity;
pub use lookup::LookupCoordinator;
pub use model::{
    CurrentConditions, DayForecast, HistoryEntry, HistoryLog, LookupState, WeatherSnapshot,
};
pub use source::{FetchError, WeatherSource, visualcrossing::VisualCrossingClient};
pub use store::{DiskStore, MemoryStore, StoreBackend, StoreError, StoreKeys, WeatherStore};
