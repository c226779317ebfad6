use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CycleError;

/// Coarse-location permission as reported by the permission subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
    NotDetermined,
}

impl PermissionState {
    pub fn is_granted(self) -> bool {
        self == PermissionState::Granted
    }

    /// Maps a stored consent answer (`None` = never asked) to a state.
    pub fn from_consent(consent: Option<bool>) -> Self {
        match consent {
            Some(true) => PermissionState::Granted,
            Some(false) => PermissionState::Denied,
            None => PermissionState::NotDetermined,
        }
    }
}

/// A single position fix. Produced at most once per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
}

/// Accuracy/power hint passed to the location provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationPriority {
    HighAccuracy,
    #[default]
    Balanced,
    LowPower,
}

/// Unit system requested from the weather endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Imperial,
    Metric,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Imperial => "imperial",
            Units::Metric => "metric",
        }
    }

    pub fn temperature_suffix(&self) -> &'static str {
        match self {
            Units::Imperial => "°F",
            Units::Metric => "°C",
        }
    }

    pub fn speed_suffix(&self) -> &'static str {
        match self {
            Units::Imperial => "mph",
            Units::Metric => "m/s",
        }
    }
}

impl std::fmt::Display for Units {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Units {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "imperial" => Ok(Units::Imperial),
            "metric" => Ok(Units::Metric),
            _ => Err(anyhow::anyhow!(
                "Unknown unit system '{value}'. Supported: imperial, metric."
            )),
        }
    }
}

/// One weather request keyed by a location fix.
#[derive(Debug, Clone)]
pub struct WeatherQuery {
    pub fix: LocationFix,
    pub api_key: String,
    pub units: Units,
}

/// Current conditions as returned by the weather endpoint.
///
/// Temperatures and wind speed are in the units of the query; visibility is
/// in meters, pressure in hPa, sunrise/sunset in UNIX epoch seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub place_name: String,
    pub units: Units,
    pub temperature: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub feels_like: f64,
    pub humidity_pct: u8,
    pub cloud_cover_pct: u8,
    pub description: String,
    pub wind_speed: f64,
    pub wind_direction_deg: f64,
    pub wind_gust: Option<f64>,
    pub visibility_m: f64,
    pub pressure_hpa: f64,
    pub condition_code: String,
    pub sunrise: i64,
    pub sunset: i64,
}

/// Per-cycle bookkeeping, handed into a cycle and returned from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleState {
    pub in_progress: bool,
    pub last_update: Option<DateTime<Utc>>,
}

/// How a single cycle ended.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Permission was not granted at cycle start; nothing happened.
    Skipped,
    Rendered,
    Failed(CycleError),
}

impl CycleOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, CycleOutcome::Rendered)
    }
}
