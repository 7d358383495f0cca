//! Per-city extract, merge and upload orchestration.
//!
//! Each city runs the strict sequence fetch -> load -> merge -> write ->
//! warehouse handoff, isolated from every other city. Cities fan out
//! concurrently; the external scheduler keeps at most one pass in flight
//! per city, so no two runs touch the same blob at once.

use std::sync::Arc;

use futures::future::join_all;

use crate::{
    config::RetryConfig,
    error::{CityPipelineError, EtlError, PipelineStep},
    merge::merge,
    model::CityDataset,
    notify::Notifier,
    provider::ObservationSource,
    store::BlobStore,
    warehouse::WarehouseLoader,
};

const SUCCESS_MESSAGE: &str = "Weather ETL Pipeline Completed Successfully!";

/// Outcome of one successful city run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityRun {
    pub city: String,
    /// Whether a novel observation was appended and persisted this run.
    pub changed: bool,
}

/// Per-city results of one full pass, plus any notification deliveries
/// that themselves failed.
#[derive(Debug)]
pub struct PipelineReport {
    pub cities: Vec<Result<CityRun, CityPipelineError>>,
    pub notification_failures: Vec<EtlError>,
}

impl PipelineReport {
    pub fn all_succeeded(&self) -> bool {
        self.cities.iter().all(Result::is_ok)
    }

    pub fn failed_cities(&self) -> impl Iterator<Item = &CityPipelineError> {
        self.cities.iter().filter_map(|run| run.as_ref().err())
    }
}

/// Sequences the extract-merge-upload pipeline over every configured city
/// and notifies the operator channel with the outcome.
#[derive(Debug)]
pub struct Pipeline {
    source: Arc<dyn ObservationSource>,
    store: Arc<dyn BlobStore>,
    warehouse: Arc<dyn WarehouseLoader>,
    notifier: Arc<dyn Notifier>,
    retry: RetryConfig,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn ObservationSource>,
        store: Arc<dyn BlobStore>,
        warehouse: Arc<dyn WarehouseLoader>,
        notifier: Arc<dyn Notifier>,
        retry: RetryConfig,
    ) -> Self {
        Self { source, store, warehouse, notifier, retry }
    }

    /// Run one full pass over `cities`.
    ///
    /// A failed city never aborts another city's run. The success
    /// notification fires once, and only when every city completed without
    /// error; each failed city gets its own failure notification.
    /// Notification delivery failures are reported but never retried.
    pub async fn run(&self, cities: &[String]) -> PipelineReport {
        let runs = join_all(cities.iter().map(|city| self.run_city(city))).await;

        let mut notification_failures = Vec::new();

        for err in runs.iter().filter_map(|run| run.as_ref().err()) {
            tracing::error!(city = %err.city, step = %err.step, "city pipeline failed: {}", err.source);
            if let Err(notify_err) = self.notifier.notify(&failure_message(err)).await {
                tracing::warn!("failure notification was not delivered: {notify_err}");
                notification_failures.push(notify_err);
            }
        }

        if runs.iter().all(Result::is_ok) {
            if let Err(notify_err) = self.notifier.notify(SUCCESS_MESSAGE).await {
                tracing::warn!("success notification was not delivered: {notify_err}");
                notification_failures.push(notify_err);
            }
        }

        PipelineReport { cities: runs, notification_failures }
    }

    /// One city, with the whole-pipeline retry policy applied: a failed
    /// attempt is retried as a unit, from the fetch onward.
    async fn run_city(&self, city: &str) -> Result<CityRun, CityPipelineError> {
        let mut attempt = 0;
        loop {
            match self.run_city_once(city).await {
                Ok(run) => return Ok(run),
                Err(err) if attempt < self.retry.retries => {
                    attempt += 1;
                    tracing::warn!(city, attempt, "retrying city pipeline: {err}");
                    tokio::time::sleep(self.retry.delay()).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn run_city_once(&self, city: &str) -> Result<CityRun, CityPipelineError> {
        let observation = self
            .source
            .fetch(city)
            .await
            .map_err(|e| CityPipelineError::new(city, PipelineStep::Fetch, e))?;

        let blob = CityDataset::blob_name(city);

        let existed = self
            .store
            .exists(&blob)
            .await
            .map_err(|e| CityPipelineError::new(city, PipelineStep::Load, e.into()))?;

        let existing = if existed {
            // Absence was ruled out by `exists`; a failing read here is a
            // hard error, including a NotFound one.
            let bytes = self
                .store
                .read(&blob)
                .await
                .map_err(|e| CityPipelineError::new(city, PipelineStep::Load, e.into()))?;

            let dataset = CityDataset::from_csv_bytes(&bytes)
                .map_err(|e| CityPipelineError::new(city, PipelineStep::Load, e))?;
            Some(dataset)
        } else {
            None
        };

        let merged = merge(existing, observation);

        if merged.changed {
            let bytes = merged
                .dataset
                .to_csv_bytes()
                .map_err(|e| CityPipelineError::new(city, PipelineStep::Write, e))?;

            // The backing store has no in-place append: replace the whole
            // blob, removing the old one first when it was present.
            if existed {
                self.store
                    .delete(&blob)
                    .await
                    .map_err(|e| CityPipelineError::new(city, PipelineStep::Write, e.into()))?;
            }
            self.store
                .write(&blob, &bytes)
                .await
                .map_err(|e| CityPipelineError::new(city, PipelineStep::Write, e.into()))?;

            tracing::info!(city, records = merged.dataset.len(), "dataset updated");
        } else {
            tracing::info!(city, "observation already recorded, store untouched");
        }

        self.warehouse
            .load_city(city)
            .await
            .map_err(|e| CityPipelineError::new(city, PipelineStep::WarehouseLoad, e))?;

        Ok(CityRun { city: city.to_string(), changed: merged.changed })
    }
}

fn failure_message(err: &CityPipelineError) -> String {
    format!(
        "Weather ETL Task Failed\n\
         City: {}\n\
         Step: {}\n\
         Error: {}\n\
         See service logs for details.",
        err.city, err.step, err.source,
    )
}
