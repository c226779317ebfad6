use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use crate::{
    error::CycleError,
    model::{WeatherObservation, WeatherQuery},
};

use super::WeatherClient;

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    endpoint_url: Url,
    http: Client,
}

impl OpenWeatherClient {
    /// `base_url` is joined with `endpoint`, so a base ending in `/` keeps
    /// its path (`.../data/2.5/` + `weather`).
    pub fn new(base_url: &str, endpoint: &str) -> Result<Self> {
        let base = Url::parse(base_url)
            .with_context(|| format!("Invalid weather base URL: {base_url}"))?;
        let endpoint_url = base
            .join(endpoint)
            .with_context(|| format!("Invalid weather endpoint: {endpoint}"))?;

        Ok(Self {
            endpoint_url,
            http: Client::new(),
        })
    }

    pub fn endpoint_url(&self) -> &Url {
        &self.endpoint_url
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    temp_min: f64,
    temp_max: f64,
    feels_like: f64,
    humidity: u8,
    pressure: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
    #[serde(default)]
    deg: f64,
    gust: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwClouds {
    all: u8,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    clouds: OwClouds,
    #[serde(default)]
    visibility: f64,
    sys: OwSys,
}

fn parse_observation(
    body: &str,
    query: &WeatherQuery,
) -> Result<WeatherObservation, CycleError> {
    if body.trim().is_empty() {
        return Err(CycleError::MalformedResponse("empty body".into()));
    }

    let parsed: OwCurrentResponse = serde_json::from_str(body)
        .map_err(|e| CycleError::MalformedResponse(format!("invalid JSON: {e}")))?;

    let condition = parsed
        .weather
        .into_iter()
        .next()
        .ok_or_else(|| CycleError::MalformedResponse("no weather conditions".into()))?;

    Ok(WeatherObservation {
        place_name: parsed.name,
        units: query.units,
        temperature: parsed.main.temp,
        temp_min: parsed.main.temp_min,
        temp_max: parsed.main.temp_max,
        feels_like: parsed.main.feels_like,
        humidity_pct: parsed.main.humidity,
        cloud_cover_pct: parsed.clouds.all,
        description: condition.description,
        wind_speed: parsed.wind.speed,
        wind_direction_deg: parsed.wind.deg,
        wind_gust: parsed.wind.gust,
        visibility_m: parsed.visibility,
        pressure_hpa: parsed.main.pressure,
        condition_code: condition.icon,
        sunrise: parsed.sys.sunrise,
        sunset: parsed.sys.sunset,
    })
}

#[async_trait]
impl WeatherClient for OpenWeatherClient {
    async fn fetch_weather(&self, query: &WeatherQuery) -> Result<WeatherObservation, CycleError> {
        let lat = query.fix.latitude.to_string();
        let lon = query.fix.longitude.to_string();
        debug!(url = %self.endpoint_url, %lat, %lon, units = %query.units, "requesting weather");

        let res = self
            .http
            .get(self.endpoint_url.clone())
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("appid", query.api_key.as_str()),
                ("units", query.units.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                CycleError::NetworkFailure(format!("request to OpenWeather failed: {e}"))
            })?;

        let status = res.status();
        let body = res.text().await.map_err(|e| {
            CycleError::NetworkFailure(format!("failed to read OpenWeather response body: {e}"))
        })?;

        if !status.is_success() {
            return Err(CycleError::NetworkFailure(format!(
                "OpenWeather request failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        parse_observation(&body, query)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LocationFix, Units};

    fn query() -> WeatherQuery {
        WeatherQuery {
            fix: LocationFix {
                latitude: 32.75,
                longitude: -97.33,
            },
            api_key: "K".into(),
            units: Units::Imperial,
        }
    }

    const SAMPLE: &str = r#"{
        "name": "Fort Worth",
        "main": {"temp": 72.4, "temp_min": 70.0, "temp_max": 75.1, "feels_like": 71.9,
                 "humidity": 40, "pressure": 1015},
        "weather": [{"description": "scattered clouds", "icon": "03d"}],
        "wind": {"speed": 8.05, "deg": 180},
        "clouds": {"all": 40},
        "visibility": 10000,
        "sys": {"sunrise": 1700000000, "sunset": 1700040000}
    }"#;

    #[test]
    fn parses_current_conditions() {
        let obs = parse_observation(SAMPLE, &query()).expect("sample should parse");

        assert_eq!(obs.place_name, "Fort Worth");
        assert_eq!(obs.temperature, 72.4);
        assert_eq!(obs.condition_code, "03d");
        assert_eq!(obs.description, "scattered clouds");
        assert_eq!(obs.wind_gust, None);
        assert_eq!(obs.wind_direction_deg, 180.0);
        assert_eq!(obs.visibility_m, 10_000.0);
        assert_eq!(obs.pressure_hpa, 1015.0);
        assert_eq!(obs.sunset, 1_700_040_000);
        assert_eq!(obs.units, Units::Imperial);
    }

    #[test]
    fn empty_body_is_malformed() {
        let err = parse_observation("  ", &query()).unwrap_err();
        assert!(matches!(err, CycleError::MalformedResponse(_)));
    }

    #[test]
    fn missing_condition_is_malformed() {
        let body = SAMPLE.replace(
            r#"[{"description": "scattered clouds", "icon": "03d"}]"#,
            "[]",
        );
        let err = parse_observation(&body, &query()).unwrap_err();
        assert_eq!(err, CycleError::MalformedResponse("no weather conditions".into()));
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "é".repeat(250);
        let truncated = truncate_body(&long);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 203);
        assert_eq!(truncate_body("short"), "short");
    }
}
