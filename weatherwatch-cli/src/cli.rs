use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use inquire::{CustomType, Password, PasswordDisplayMode, Select};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use weatherwatch_core::{
    Config, CycleOutcome, LocationFix, LocationSource, LocationWeatherController, PermissionState,
    Units, location::provider_from_source, provider::client_from_config,
};

use crate::{consent::ConsentPermissions, terminal::TerminalScreen};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherwatch", version, about = "Polls local weather for your location")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure the API key, units and location source.
    Configure,

    /// Keep the weather on screen, refreshing on an interval until Ctrl-C.
    Watch(RunArgs),

    /// Fetch and show the weather once.
    Once(RunArgs),

    /// Forget the stored answer to the location prompt.
    Revoke,
}

/// Per-run overrides of the stored config.
#[derive(Debug, Args, Default)]
pub struct RunArgs {
    /// Milliseconds between refreshes.
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Unit system: "imperial" or "metric".
    #[arg(long)]
    pub units: Option<String>,

    /// Pin the latitude instead of looking it up (needs --lon).
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Pin the longitude instead of looking it up (needs --lat).
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lon: Option<f64>,
}

impl RunArgs {
    fn apply(&self, config: &mut Config) -> anyhow::Result<()> {
        if let Some(ms) = self.interval_ms {
            config.poll_interval_ms = ms;
        }
        if let Some(units) = &self.units {
            config.units = Units::try_from(units.as_str())?;
        }
        if let (Some(latitude), Some(longitude)) = (self.lat, self.lon) {
            config.location = LocationSource::fixed(LocationFix {
                latitude,
                longitude,
            });
        }
        Ok(())
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Watch(args) => watch(args).await,
            Command::Once(args) => once(args).await,
            Command::Revoke => revoke(),
        }
    }
}

type TerminalController = LocationWeatherController<
    Arc<ConsentPermissions>,
    weatherwatch_core::OpenWeatherClient,
    TerminalScreen,
>;

fn build_controller(args: &RunArgs) -> anyhow::Result<TerminalController> {
    let mut config = Config::load()?;
    args.apply(&mut config)?;
    let permissions = Arc::new(ConsentPermissions::new(Config::config_file_path()?));

    let weather = client_from_config(&config)?;
    let location = provider_from_source(&config.location);

    LocationWeatherController::from_config(
        &config,
        permissions,
        location,
        weather,
        TerminalScreen::new(),
    )
}

async fn watch(args: RunArgs) -> anyhow::Result<()> {
    let mut controller = build_controller(&args)?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, stopping");
            }
            cancel.cancel();
        }
    });

    if controller.start(cancel).await == PermissionState::Denied {
        tracing::debug!("permission denied; nothing to do");
    }
    Ok(())
}

async fn once(args: RunArgs) -> anyhow::Result<()> {
    let mut controller = build_controller(&args)?;

    match controller.start_once().await? {
        CycleOutcome::Rendered => Ok(()),
        CycleOutcome::Skipped => bail!("Location permission is not granted"),
        CycleOutcome::Failed(err) => bail!("Weather update failed: {err}"),
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    if api_key.trim().is_empty() {
        bail!("API key must not be empty");
    }
    config.set_api_key(api_key.trim().to_string());

    let units = Select::new("Units:", vec![Units::Imperial, Units::Metric])
        .prompt()
        .context("Failed to read units")?;
    config.units = units;

    let source = Select::new("Location source:", vec!["ip", "fixed"])
        .prompt()
        .context("Failed to read location source")?;
    config.location = match source {
        "fixed" => {
            let latitude = CustomType::<f64>::new("Latitude:")
                .prompt()
                .context("Failed to read latitude")?;
            let longitude = CustomType::<f64>::new("Longitude:")
                .prompt()
                .context("Failed to read longitude")?;
            LocationSource::fixed(LocationFix {
                latitude,
                longitude,
            })
        }
        _ => LocationSource::Ip,
    };

    config.validate()?;
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn revoke() -> anyhow::Result<()> {
    let mut config = Config::load()?;
    config.location_consent = None;
    config.save()?;
    println!("Location consent cleared; you will be asked again on the next run.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_args_override_config() {
        let cli = Cli::parse_from([
            "weatherwatch", "watch", "--interval-ms", "5000", "--units", "metric", "--lat",
            "32.75", "--lon", "-97.33",
        ]);
        let Command::Watch(args) = cli.command else {
            panic!("expected watch");
        };

        let mut config = Config::default();
        args.apply(&mut config).unwrap();

        assert_eq!(config.poll_interval_ms, 5000);
        assert_eq!(config.units, Units::Metric);
        assert_eq!(
            config.location,
            LocationSource::Fixed {
                latitude: 32.75,
                longitude: -97.33,
            }
        );
    }

    #[test]
    fn lat_requires_lon() {
        let res = Cli::try_parse_from(["weatherwatch", "once", "--lat", "1.0"]);
        assert!(res.is_err());
    }

    #[test]
    fn bad_units_are_rejected() {
        let args = RunArgs {
            units: Some("kelvin".into()),
            ..RunArgs::default()
        };
        assert!(args.apply(&mut Config::default()).is_err());
    }
}
