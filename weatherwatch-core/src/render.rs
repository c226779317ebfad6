//! Maps a [`WeatherObservation`] onto the fixed set of display fields.

use chrono::{DateTime, FixedOffset, Local};

use crate::model::WeatherObservation;

pub const METERS_TO_MILES: f64 = 0.00062137119;
pub const HPA_TO_INHG: f64 = 0.02953;

/// Condition artwork keyed by the OpenWeather icon code. Day and night
/// variants share an icon where the artwork does not differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionIcon {
    ClearDay,
    ClearNight,
    FewCloudsDay,
    FewCloudsNight,
    ScatteredClouds,
    BrokenClouds,
    ShowerRain,
    RainDay,
    RainNight,
    Thunderstorm,
    Snow,
    Mist,
}

impl ConditionIcon {
    /// Exact match on the condition code; `None` for anything unlisted.
    pub fn from_code(code: &str) -> Option<Self> {
        let icon = match code {
            "01d" => Self::ClearDay,
            "01n" => Self::ClearNight,
            "02d" => Self::FewCloudsDay,
            "02n" => Self::FewCloudsNight,
            "03d" | "03n" => Self::ScatteredClouds,
            "04d" | "04n" => Self::BrokenClouds,
            "09d" | "09n" => Self::ShowerRain,
            "10d" => Self::RainDay,
            "10n" => Self::RainNight,
            "11d" | "11n" => Self::Thunderstorm,
            "13d" | "13n" => Self::Snow,
            "50d" | "50n" => Self::Mist,
            _ => return None,
        };
        Some(icon)
    }

    pub fn asset_name(&self) -> &'static str {
        match self {
            Self::ClearDay => "ic_01d",
            Self::ClearNight => "ic_01n",
            Self::FewCloudsDay => "ic_02d",
            Self::FewCloudsNight => "ic_02n",
            Self::ScatteredClouds => "ic_03",
            Self::BrokenClouds => "ic_04",
            Self::ShowerRain => "ic_09",
            Self::RainDay => "ic_10d",
            Self::RainNight => "ic_10n",
            Self::Thunderstorm => "ic_11",
            Self::Snow => "ic_13",
            Self::Mist => "ic_50",
        }
    }

    /// Terminal stand-in for the artwork.
    pub fn glyph(&self) -> &'static str {
        match self {
            Self::ClearDay => "☀",
            Self::ClearNight => "☾",
            Self::FewCloudsDay | Self::FewCloudsNight => "⛅",
            Self::ScatteredClouds | Self::BrokenClouds => "☁",
            Self::ShowerRain | Self::RainDay | Self::RainNight => "☂",
            Self::Thunderstorm => "⚡",
            Self::Snow => "❄",
            Self::Mist => "≋",
        }
    }
}

/// Everything the screen shows. Replaced as a whole on each render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayFields {
    pub connection: String,
    pub city: String,
    pub temperature: String,
    pub description: String,
    pub wind: String,
    pub precipitation: String,
    pub other: String,
    pub sun: String,
    pub icon: Option<ConditionIcon>,
}

#[derive(Debug, Clone)]
pub struct Renderer {
    fields: DisplayFields,
    offset: FixedOffset,
}

impl Renderer {
    /// Renderer formatting times in the machine's current UTC offset.
    pub fn new() -> Self {
        Self::with_offset(*Local::now().offset())
    }

    pub fn with_offset(offset: FixedOffset) -> Self {
        Self {
            fields: DisplayFields::default(),
            offset,
        }
    }

    pub fn fields(&self) -> &DisplayFields {
        &self.fields
    }

    /// Builds a complete new set of fields from `obs` and swaps it in.
    /// An unrecognised condition code keeps the previous icon.
    pub fn render(&mut self, obs: &WeatherObservation) -> &DisplayFields {
        let deg = obs.units.temperature_suffix();
        let speed = obs.units.speed_suffix();

        let gust = match obs.wind_gust {
            Some(g) => format!("gust {g:.1} {speed}"),
            None => "no gusts".to_string(),
        };

        let next = DisplayFields {
            connection: "Updated just now".to_string(),
            city: obs.place_name.clone(),
            temperature: format!("{:.1}{deg}", obs.temperature),
            description: format!(
                "{}\nHigh {:.0}{deg} · Low {:.0}{deg}",
                capitalize_words(&obs.description),
                obs.temp_max,
                obs.temp_min,
            ),
            wind: format!(
                "{:.1} {speed} from {:.0}°, {gust}",
                obs.wind_speed, obs.wind_direction_deg
            ),
            precipitation: format!(
                "Humidity {}% · Cloud cover {}%",
                obs.humidity_pct, obs.cloud_cover_pct
            ),
            other: format!(
                "Feels like {:.0}{deg} · Visibility {:.1} mi · Pressure {:.2} inHg",
                obs.feels_like,
                meters_to_miles(obs.visibility_m),
                hpa_to_inhg(obs.pressure_hpa),
            ),
            sun: format!(
                "Sunrise {} · Sunset {}",
                format_clock(obs.sunrise, self.offset),
                format_clock(obs.sunset, self.offset),
            ),
            icon: ConditionIcon::from_code(&obs.condition_code).or(self.fields.icon),
        };

        self.fields = next;
        &self.fields
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Upper-cases the first letter of every space-separated word.
pub fn capitalize_words(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn meters_to_miles(meters: f64) -> f64 {
    meters * METERS_TO_MILES
}

pub fn hpa_to_inhg(hpa: f64) -> f64 {
    hpa * HPA_TO_INHG
}

/// `hh:mm AM/PM` for a UNIX timestamp in `offset`; `--:--` if out of range.
pub fn format_clock(epoch_secs: i64, offset: FixedOffset) -> String {
    DateTime::from_timestamp(epoch_secs, 0)
        .map(|utc| utc.with_timezone(&offset).format("%I:%M %p").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::Units;

    pub(crate) fn observation(code: &str) -> WeatherObservation {
        WeatherObservation {
            place_name: "Fort Worth".into(),
            units: Units::Imperial,
            temperature: 72.4,
            temp_min: 70.0,
            temp_max: 75.0,
            feels_like: 71.6,
            humidity_pct: 40,
            cloud_cover_pct: 20,
            description: "scattered clouds".into(),
            wind_speed: 8.05,
            wind_direction_deg: 180.0,
            wind_gust: Some(12.3),
            visibility_m: 10_000.0,
            pressure_hpa: 1015.0,
            condition_code: code.into(),
            sunrise: 1_700_000_000,
            sunset: 1_700_040_000,
        }
    }

    fn utc_renderer() -> Renderer {
        Renderer::with_offset(FixedOffset::east_opt(0).unwrap())
    }

    #[test]
    fn day_and_night_share_icons_where_listed() {
        for (day, night) in [
            ("03d", "03n"),
            ("04d", "04n"),
            ("09d", "09n"),
            ("11d", "11n"),
            ("13d", "13n"),
            ("50d", "50n"),
        ] {
            assert_eq!(ConditionIcon::from_code(day), ConditionIcon::from_code(night));
            assert!(ConditionIcon::from_code(day).is_some());
        }
        assert_ne!(ConditionIcon::from_code("01d"), ConditionIcon::from_code("01n"));
        assert_ne!(ConditionIcon::from_code("10d"), ConditionIcon::from_code("10n"));
    }

    #[test]
    fn icon_match_is_exact() {
        assert_eq!(ConditionIcon::from_code("03"), None);
        assert_eq!(ConditionIcon::from_code("03D"), None);
        assert_eq!(ConditionIcon::from_code(" 03d"), None);
        assert_eq!(ConditionIcon::from_code("03d").unwrap().asset_name(), "ic_03");
    }

    #[test]
    fn conversions_use_exact_factors() {
        assert_eq!(meters_to_miles(10_000.0), 10_000.0 * 0.00062137119);
        assert_eq!(hpa_to_inhg(1015.0), 1015.0 * 0.02953);
    }

    #[test]
    fn capitalizes_each_word() {
        assert_eq!(capitalize_words("scattered clouds"), "Scattered Clouds");
        assert_eq!(capitalize_words("light  intensity drizzle"), "Light Intensity Drizzle");
        assert_eq!(capitalize_words(""), "");
    }

    #[test]
    fn formats_sun_times_with_meridiem() {
        let utc = FixedOffset::east_opt(0).unwrap();
        assert_eq!(format_clock(1_700_000_000, utc), "10:13 PM");
        assert_eq!(format_clock(1_700_040_000, utc), "09:20 AM");

        let cdt = FixedOffset::west_opt(5 * 3600).unwrap();
        assert_eq!(format_clock(1_700_000_000, cdt), "05:13 PM");
    }

    #[test]
    fn render_fills_every_field() {
        let mut renderer = utc_renderer();
        let fields = renderer.render(&observation("03n")).clone();

        assert_eq!(fields.connection, "Updated just now");
        assert_eq!(fields.city, "Fort Worth");
        assert!(fields.temperature.contains("72.4"));
        assert!(fields.description.starts_with("Scattered Clouds"));
        assert!(fields.wind.contains("gust 12.3 mph"));
        assert!(fields.precipitation.contains("40%"));
        assert!(fields.other.contains("6.2 mi"));
        assert!(fields.other.contains("29.97 inHg"));
        assert_eq!(fields.sun, "Sunrise 10:13 PM · Sunset 09:20 AM");
        assert_eq!(fields.icon, Some(ConditionIcon::ScatteredClouds));
    }

    #[test]
    fn unknown_code_keeps_previous_icon() {
        let mut renderer = utc_renderer();
        renderer.render(&observation("13d"));

        let mut next = observation("99x");
        next.temperature = 30.0;
        let fields = renderer.render(&next);

        assert_eq!(fields.icon, Some(ConditionIcon::Snow));
        assert!(fields.temperature.contains("30.0"));
    }

    #[test]
    fn missing_gust_is_spelled_out() {
        let mut obs = observation("01d");
        obs.wind_gust = None;
        obs.units = Units::Metric;

        let fields = utc_renderer().render(&obs).clone();
        assert!(fields.wind.ends_with("no gusts"));
        assert!(fields.wind.contains("m/s"));
        assert!(fields.temperature.ends_with("°C"));
    }
}
