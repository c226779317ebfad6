//! Location providers and the per-cycle fetch with its timeout race.
//!
//! The fetcher's timeout is the only timeout on a location request.
//! Providers must not add their own; they stop when their cancellation
//! token fires.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::{
    fmt::Debug,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    config::LocationSource,
    error::CycleError,
    model::{LocationFix, LocationPriority},
};

pub const DEFAULT_IP_LOCATION_URL: &str = "http://ip-api.com/json/?fields=status,message,lat,lon";

#[async_trait]
pub trait LocationProvider: Send + Sync + Debug {
    /// Requests a single current fix. `Ok(None)` means the provider answered
    /// but had no position. Cancellation is best-effort.
    async fn current_fix(
        &self,
        priority: LocationPriority,
        cancel: CancellationToken,
    ) -> Result<Option<LocationFix>, CycleError>;
}

/// Always reports the same coordinates.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation {
    fix: LocationFix,
}

impl FixedLocation {
    pub fn new(fix: LocationFix) -> Self {
        Self { fix }
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_fix(
        &self,
        _priority: LocationPriority,
        _cancel: CancellationToken,
    ) -> Result<Option<LocationFix>, CycleError> {
        Ok(Some(self.fix))
    }
}

/// Coarse location from an IP geolocation service.
#[derive(Debug, Clone)]
pub struct IpLocation {
    url: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct IpLocationResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

impl IpLocation {
    pub fn new() -> Self {
        Self::with_url(DEFAULT_IP_LOCATION_URL)
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: Client::new(),
        }
    }

    async fn lookup(&self) -> Result<Option<LocationFix>, CycleError> {
        let res = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| CycleError::Location(format!("IP lookup request failed: {e}")))?;

        let status = res.status();
        if !status.is_success() {
            return Err(CycleError::Location(format!(
                "IP lookup failed with status {status}"
            )));
        }

        let parsed: IpLocationResponse = res
            .json()
            .await
            .map_err(|e| CycleError::Location(format!("IP lookup returned bad JSON: {e}")))?;

        if parsed.status != "success" {
            debug!(
                status = %parsed.status,
                message = parsed.message.as_deref().unwrap_or(""),
                "IP lookup returned no position"
            );
            return Ok(None);
        }

        Ok(parsed
            .lat
            .zip(parsed.lon)
            .map(|(latitude, longitude)| LocationFix {
                latitude,
                longitude,
            }))
    }
}

impl Default for IpLocation {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocationProvider for IpLocation {
    async fn current_fix(
        &self,
        priority: LocationPriority,
        cancel: CancellationToken,
    ) -> Result<Option<LocationFix>, CycleError> {
        debug!(?priority, url = %self.url, "requesting IP location");
        tokio::select! {
            _ = cancel.cancelled() => Err(CycleError::Location("IP lookup cancelled".into())),
            result = self.lookup() => result,
        }
    }
}

/// Construct the provider named by the config.
pub fn provider_from_source(source: &LocationSource) -> Arc<dyn LocationProvider> {
    match *source {
        LocationSource::Ip => Arc::new(IpLocation::new()),
        LocationSource::Fixed {
            latitude,
            longitude,
        } => Arc::new(FixedLocation::new(LocationFix {
            latitude,
            longitude,
        })),
    }
}

/// Claims the single terminal outcome of a cycle's location request.
/// Returns `true` for the first caller only.
fn settle(latch: &AtomicBool) -> bool {
    latch
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_ok()
}

/// Gets one fix per cycle, bounded by `timeout`.
#[derive(Debug, Clone)]
pub struct LocationFetcher {
    provider: Arc<dyn LocationProvider>,
    priority: LocationPriority,
    timeout: Duration,
}

impl LocationFetcher {
    pub fn new(
        provider: Arc<dyn LocationProvider>,
        priority: LocationPriority,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            priority,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Races one provider request against the timeout.
    ///
    /// The request runs in its own task. Whichever of the request and the
    /// timer settles the latch first decides the outcome; a result arriving
    /// after the timeout is dropped. Dropping the returned future cancels
    /// the outstanding request.
    pub async fn fetch_once(&self) -> Result<LocationFix, CycleError> {
        let latch = Arc::new(AtomicBool::new(false));
        let cancel = CancellationToken::new();
        let _cancel_on_drop = cancel.clone().drop_guard();
        let (tx, mut rx) = oneshot::channel();

        tokio::spawn({
            let provider = Arc::clone(&self.provider);
            let latch = Arc::clone(&latch);
            let cancel = cancel.clone();
            let priority = self.priority;
            async move {
                let result = provider.current_fix(priority, cancel).await;
                if settle(&latch) {
                    let _ = tx.send(result);
                } else {
                    debug!("location result arrived after timeout; ignored");
                }
            }
        });

        let delivered = tokio::select! {
            delivered = &mut rx => delivered,
            _ = tokio::time::sleep(self.timeout) => {
                if settle(&latch) {
                    cancel.cancel();
                    warn!(
                        timeout_ms = self.timeout.as_millis() as u64,
                        "location request timed out"
                    );
                    return Err(CycleError::LocationTimeout);
                }
                // The request won the latch just before the timer fired.
                rx.await
            }
        };

        match delivered {
            Ok(Ok(Some(fix))) => Ok(fix),
            Ok(Ok(None)) => Err(CycleError::LocationNullResult),
            Ok(Err(err)) => Err(err),
            Err(_) => {
                settle(&latch);
                Err(CycleError::Location("location request aborted".into()))
            }
        }
    }
}
