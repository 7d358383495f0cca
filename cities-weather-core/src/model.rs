use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::EtlError;

/// Textual form of every timestamp in a stored dataset. The `observed_at`
/// string in this format is the deduplication key.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One normalized weather reading for a city at a point in time.
///
/// Temperatures are in Fahrenheit; the three timestamps are city-local,
/// all derived from provider epochs with the same per-response UTC offset.
/// Serde renames match the header row of the stored CSV blobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Temperature (F)")]
    pub temperature: f64,
    #[serde(rename = "Feels Like (F)")]
    pub feels_like: f64,
    #[serde(rename = "Min Temperature (F)")]
    pub temp_min: f64,
    #[serde(rename = "Max Temperature (F)")]
    pub temp_max: f64,
    #[serde(rename = "Pressure")]
    pub pressure: u32,
    #[serde(rename = "Humidity")]
    pub humidity: u8,
    #[serde(rename = "Wind Speed")]
    pub wind_speed: f64,
    #[serde(rename = "Time of Record", with = "timestamp")]
    pub observed_at: NaiveDateTime,
    #[serde(rename = "Sunrise", with = "timestamp")]
    pub sunrise: NaiveDateTime,
    #[serde(rename = "Sunset", with = "timestamp")]
    pub sunset: NaiveDateTime,
}

impl WeatherObservation {
    /// The textual representation of `observed_at` that identifies this
    /// record for deduplication.
    pub fn observed_at_key(&self) -> String {
        self.observed_at.format(TIMESTAMP_FORMAT).to_string()
    }
}

mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    use super::TIMESTAMP_FORMAT;

    pub fn serialize<S: Serializer>(dt: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(de::Error::custom)
    }
}

/// The durable, append-only sequence of observations for one city.
///
/// Records keep arrival order; nothing is ever removed or rewritten once
/// appended. The whole dataset round-trips through a single CSV blob.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CityDataset {
    records: Vec<WeatherObservation>,
}

impl CityDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<WeatherObservation>) -> Self {
        Self { records }
    }

    /// Name of the blob backing this city's dataset.
    pub fn blob_name(city: &str) -> String {
        format!("{}.csv", city.to_lowercase())
    }

    pub fn records(&self) -> &[WeatherObservation] {
        &self.records
    }

    pub fn push(&mut self, observation: WeatherObservation) {
        self.records.push(observation);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serialize to the CSV blob form: one header row, one row per record,
    /// in append order.
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, EtlError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for record in &self.records {
            writer
                .serialize(record)
                .map_err(|e| EtlError::MergeInvariant(format!("failed to encode dataset: {e}")))?;
        }
        writer
            .into_inner()
            .map_err(|e| EtlError::MergeInvariant(format!("failed to encode dataset: {e}")))
    }

    /// Decode a CSV blob produced by [`Self::to_csv_bytes`].
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self, EtlError> {
        let mut reader = csv::Reader::from_reader(bytes);
        let mut records = Vec::new();
        for row in reader.deserialize() {
            let record: WeatherObservation = row
                .map_err(|e| EtlError::MergeInvariant(format!("failed to decode dataset: {e}")))?;
            records.push(record);
        }
        Ok(Self { records })
    }
}
