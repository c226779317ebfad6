//! Location permission backed by a yes/no prompt whose answer is kept in
//! the config file.

use async_trait::async_trait;
use inquire::{Confirm, InquireError};
use std::{path::PathBuf, sync::Mutex};
use tracing::{info, warn};
use weatherwatch_core::{Config, PermissionState, PermissionSystem};

const HELP: &str = "Your IP address or configured coordinates are sent to the weather service.";

/// Reads the stored answer from the config file on every check, so a
/// `weatherwatch revoke` from another shell takes effect on the next cycle.
pub struct ConsentPermissions {
    path: PathBuf,
    cached: Mutex<Option<bool>>,
}

impl ConsentPermissions {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            cached: Mutex::new(None),
        }
    }

    fn cached(&self) -> Option<bool> {
        self.cached.lock().map(|c| *c).unwrap_or(None)
    }

    fn remember(&self, consent: Option<bool>) {
        if let Ok(mut cached) = self.cached.lock() {
            *cached = consent;
        }
    }

    /// Falls back to the last answer seen when the file can't be read.
    fn consent(&self) -> Option<bool> {
        match Config::load_from(&self.path) {
            Ok(cfg) => {
                self.remember(cfg.location_consent);
                cfg.location_consent
            }
            Err(err) => {
                warn!(error = %err, "could not re-read location consent, using last known answer");
                self.cached()
            }
        }
    }

    fn record(&self, granted: bool) {
        self.remember(Some(granted));

        let saved = Config::load_from(&self.path).and_then(|mut cfg| {
            cfg.location_consent = Some(granted);
            cfg.save_to(&self.path)
        });
        if let Err(err) = saved {
            warn!(error = %err, "could not persist location consent");
        }
    }

    /// Only an explicit yes or no is stored. A prompt closed with Esc or
    /// Ctrl-C denies this run and leaves the stored answer alone.
    fn settle_answer(&self, answer: Result<bool, InquireError>) -> bool {
        match answer {
            Ok(granted) => {
                self.record(granted);
                granted
            }
            Err(err) => {
                info!(error = %err, "location prompt closed without an answer");
                false
            }
        }
    }
}

#[async_trait]
impl PermissionSystem for ConsentPermissions {
    fn check(&self) -> PermissionState {
        PermissionState::from_consent(self.consent())
    }

    /// An earlier refusal earns an explanation before asking again.
    fn should_show_rationale(&self) -> bool {
        self.consent() == Some(false)
    }

    async fn request(&self) -> bool {
        let answer = tokio::task::spawn_blocking(|| {
            Confirm::new("Allow weatherwatch to use your approximate location?")
                .with_default(true)
                .with_help_message(HELP)
                .prompt()
        })
        .await;

        match answer {
            Ok(answer) => self.settle_answer(answer),
            Err(err) => {
                warn!(error = %err, "location prompt task failed");
                false
            }
        }
    }
}
