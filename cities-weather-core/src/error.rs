use thiserror::Error;

/// Failures raised by a [`crate::store::BlobStore`] implementation.
///
/// `NotFound` is the expected-absence case; everything else is `Io`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no blob named `{0}` in the store")]
    NotFound(String),

    #[error("store operation failed for `{name}`")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Error kinds a city pipeline can surface.
#[derive(Debug, Error)]
pub enum EtlError {
    /// The weather provider could not be reached or answered with a
    /// non-success status.
    #[error("weather provider request failed: {0}")]
    Provider(String),

    /// The provider answered, but the body was missing required fields or
    /// could not be decoded.
    #[error("malformed provider response: {0}")]
    Parse(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A stored dataset blob could not be decoded back into records.
    #[error("stored dataset is malformed: {0}")]
    MergeInvariant(String),

    #[error("notification delivery failed: {0}")]
    Notification(String),
}

/// The step of a city pipeline in which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    Fetch,
    Load,
    Merge,
    Write,
    WarehouseLoad,
}

impl PipelineStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStep::Fetch => "fetch",
            PipelineStep::Load => "load",
            PipelineStep::Merge => "merge",
            PipelineStep::Write => "write",
            PipelineStep::WarehouseLoad => "warehouse load",
        }
    }
}

impl std::fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A city pipeline failure with enough context for an operator to diagnose:
/// which city, which step, and the underlying cause.
#[derive(Debug, Error)]
#[error("city `{city}` failed at the {step} step: {source}")]
pub struct CityPipelineError {
    pub city: String,
    pub step: PipelineStep,
    #[source]
    pub source: EtlError,
}

impl CityPipelineError {
    pub fn new(city: impl Into<String>, step: PipelineStep, source: EtlError) -> Self {
        Self { city: city.into(), step, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn city_error_names_city_and_step() {
        let err = CityPipelineError::new(
            "Mumbai",
            PipelineStep::Fetch,
            EtlError::Provider("connection refused".to_string()),
        );

        let msg = err.to_string();
        assert!(msg.contains("Mumbai"));
        assert!(msg.contains("fetch"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn store_not_found_is_distinguishable_from_io() {
        let err = EtlError::from(StoreError::NotFound("london.csv".to_string()));
        assert!(matches!(err, EtlError::Store(StoreError::NotFound(_))));
    }
}
