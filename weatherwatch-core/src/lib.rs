//! Core library for the `weatherwatch` poller.
//!
//! This crate defines:
//! - Configuration handling
//! - The location permission gate and per-cycle location fetch
//! - The OpenWeather client and the display-field renderer
//! - The controller that ties them into a cancellable poll loop
//!
//! The display surface, permission prompts and location source are traits,
//! so hosts other than `weatherwatch-cli` can drive the same controller.

pub mod config;
pub mod controller;
pub mod error;
pub mod location;
pub mod model;
pub mod permission;
pub mod provider;
pub mod render;
pub mod screen;

pub use config::{Config, LocationSource};
pub use controller::{ControllerSettings, LocationWeatherController};
pub use error::CycleError;
pub use location::{FixedLocation, IpLocation, LocationFetcher, LocationProvider};
pub use model::{
    CycleOutcome, CycleState, LocationFix, LocationPriority, PermissionState, Units,
    WeatherObservation, WeatherQuery,
};
pub use permission::{PermissionGate, PermissionSystem};
pub use provider::{WeatherClient, openweather::OpenWeatherClient};
pub use render::{ConditionIcon, DisplayFields, Renderer};
pub use screen::{Notice, Screen};
