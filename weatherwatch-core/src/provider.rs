use crate::{
    Config, CycleError, WeatherObservation, WeatherQuery,
    provider::openweather::OpenWeatherClient,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

/// One REST call per query. Exactly one result per call, no retries;
/// the next poll iteration is the only recovery.
#[async_trait]
pub trait WeatherClient: Send + Sync + Debug {
    async fn fetch_weather(&self, query: &WeatherQuery) -> Result<WeatherObservation, CycleError>;
}

#[async_trait]
impl<T: WeatherClient + ?Sized> WeatherClient for Arc<T> {
    async fn fetch_weather(&self, query: &WeatherQuery) -> Result<WeatherObservation, CycleError> {
        (**self).fetch_weather(query).await
    }
}

/// Construct the weather client from config.
pub fn client_from_config(config: &Config) -> anyhow::Result<OpenWeatherClient> {
    OpenWeatherClient::new(&config.base_url, &config.endpoint)
}
