//! The poll loop: permission gate, then location → weather → render, once
//! per interval, until told to stop.

use chrono::Utc;
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::{
    config::Config,
    error::CycleError,
    location::{LocationFetcher, LocationProvider},
    model::{CycleOutcome, CycleState, PermissionState, Units, WeatherObservation, WeatherQuery},
    permission::{PermissionGate, PermissionSystem},
    provider::WeatherClient,
    render::Renderer,
    screen::Screen,
};

/// Values the controller needs from config, resolved once up front.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub api_key: String,
    pub units: Units,
    pub poll_interval: Duration,
}

impl ControllerSettings {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self {
            api_key: config.api_key()?.to_string(),
            units: config.units,
            poll_interval: config.poll_interval(),
        })
    }
}

pub struct LocationWeatherController<P, W, S> {
    permissions: P,
    fetcher: LocationFetcher,
    weather: W,
    screen: S,
    renderer: Renderer,
    settings: ControllerSettings,
    indicator_open: bool,
}

impl<P, W, S> LocationWeatherController<P, W, S>
where
    P: PermissionSystem,
    W: WeatherClient,
    S: Screen,
{
    pub fn new(
        permissions: P,
        fetcher: LocationFetcher,
        weather: W,
        screen: S,
        renderer: Renderer,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            permissions,
            fetcher,
            weather,
            screen,
            renderer,
            settings,
            indicator_open: false,
        }
    }

    /// Builds a controller from config with the given collaborators.
    pub fn from_config(
        config: &Config,
        permissions: P,
        location: Arc<dyn LocationProvider>,
        weather: W,
        screen: S,
    ) -> anyhow::Result<Self> {
        let settings = ControllerSettings::from_config(config)?;
        let fetcher = LocationFetcher::new(location, config.priority, config.location_timeout());
        Ok(Self::new(permissions, fetcher, weather, screen, Renderer::new(), settings))
    }

    pub fn screen(&self) -> &S {
        &self.screen
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Asks for permission, then polls until `cancel` fires.
    ///
    /// Returns `Denied` straight away when the gate refuses; the caller should
    /// leave the denial notice up and do nothing more.
    pub async fn start(&mut self, cancel: CancellationToken) -> PermissionState {
        let state = PermissionGate::new(&self.permissions)
            .check_and_request(&mut self.screen)
            .await;

        if state.is_granted() {
            self.run(cancel).await;
        }
        state
    }

    /// Gate plus exactly one cycle.
    pub async fn start_once(&mut self) -> Result<CycleOutcome, CycleError> {
        let state = PermissionGate::new(&self.permissions)
            .check_and_request(&mut self.screen)
            .await;
        if !state.is_granted() {
            return Err(CycleError::PermissionDenied);
        }
        let (_, outcome) = self.run_cycle(CycleState::default()).await;
        Ok(outcome)
    }

    /// Cycle, sleep `poll_interval`, repeat. A failed cycle never ends the
    /// loop; only `cancel` does, including mid-cycle and mid-sleep.
    pub async fn run(&mut self, cancel: CancellationToken) {
        let mut state = CycleState::default();
        let mut iteration: u64 = 0;
        info!(interval_ms = self.settings.poll_interval.as_millis() as u64, "poll loop started");

        loop {
            iteration += 1;
            let span = info_span!("cycle", iteration);

            tokio::select! {
                _ = cancel.cancelled() => {
                    // Stopped mid-cycle; the cycle still owes its dismiss.
                    self.close_indicator();
                    break;
                }
                (next, outcome) = self.run_cycle(state).instrument(span) => {
                    state = next;
                    log_outcome(&outcome);
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        }

        info!(iterations = iteration, "poll loop stopped");
    }

    /// One cycle. If permission is missing nothing is shown; otherwise the
    /// in-progress indicator opens and is dismissed exactly once, whichever
    /// way the cycle ends.
    pub async fn run_cycle(&mut self, state: CycleState) -> (CycleState, CycleOutcome) {
        if !self.permissions.check().is_granted() {
            debug!("permission not granted at cycle start; skipping");
            return (state, CycleOutcome::Skipped);
        }

        self.open_indicator();
        let mut state = CycleState {
            in_progress: true,
            ..state
        };

        let result = self.fetch_observation().await;

        let outcome = match result {
            Ok(obs) => {
                let fields = self.renderer.render(&obs);
                self.screen.apply(fields);
                state.last_update = Some(Utc::now());
                CycleOutcome::Rendered
            }
            Err(err) => CycleOutcome::Failed(err),
        };

        self.close_indicator();
        state.in_progress = false;

        (state, outcome)
    }

    fn open_indicator(&mut self) {
        self.screen.show_in_progress();
        self.indicator_open = true;
    }

    fn close_indicator(&mut self) {
        if std::mem::take(&mut self.indicator_open) {
            self.screen.dismiss_in_progress();
        }
    }

    async fn fetch_observation(&self) -> Result<WeatherObservation, CycleError> {
        let fix = self.fetcher.fetch_once().await?;
        debug!(lat = fix.latitude, lon = fix.longitude, "got location fix");

        let query = WeatherQuery {
            fix,
            api_key: self.settings.api_key.clone(),
            units: self.settings.units,
        };
        self.weather.fetch_weather(&query).await
    }
}

fn log_outcome(outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::Rendered => info!("weather updated"),
        CycleOutcome::Skipped => debug!("cycle skipped"),
        CycleOutcome::Failed(err) => warn!(error = %err, "cycle failed; keeping previous data"),
    }
}
