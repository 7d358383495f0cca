use std::fmt::Debug;

use async_trait::async_trait;

use crate::{error::EtlError, model::WeatherObservation};

pub mod openweather;

/// Source of fresh observations for the pipeline.
///
/// Implementations perform at most one remote call per invocation; retry
/// policy lives in the orchestrator, not here.
#[async_trait]
pub trait ObservationSource: Send + Sync + Debug {
    async fn fetch(&self, city: &str) -> Result<WeatherObservation, EtlError>;
}
