//! Warehouse bulk-load preparation.
//!
//! The warehouse itself is an external collaborator: the core renders the
//! per-city COPY statement and hands it over through the [`WarehouseLoader`]
//! seam. Row-level ingestion errors are configured to skip the bad row
//! (`ON_ERROR = 'CONTINUE'`), not abort the load.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::{config::WarehouseConfig, error::EtlError};

/// Render the bulk-copy statement loading `<city>.csv` from the stage into
/// the city's warehouse table.
pub fn copy_into_statement(warehouse: &WarehouseConfig, city: &str) -> String {
    let city = city.to_lowercase();
    let table = format!("{}.{}.{}", warehouse.database, warehouse.schema, city);
    let stage = format!("@{}.{}.{}", warehouse.database, warehouse.schema, warehouse.stage);
    let file_format =
        format!("{}.{}.{}", warehouse.database, warehouse.schema, warehouse.file_format);

    format!(
        "COPY INTO {table} (\n\
         City,\n\
         Description,\n\
         Temperature,\n\
         Feels_Like,\n\
         Min_Temperature,\n\
         Max_Temperature,\n\
         Pressure,\n\
         Humidity,\n\
         Wind_Speed,\n\
         Time_of_Record,\n\
         Sunrise,\n\
         Sunset\n\
         )\n\
         FROM '{stage}/{city}.csv'\n\
         FILE_FORMAT = (FORMAT_NAME = {file_format})\n\
         ON_ERROR = 'CONTINUE';"
    )
}

/// Hands a city's dataset over to the warehouse after its blob is current.
#[async_trait]
pub trait WarehouseLoader: Send + Sync + Debug {
    async fn load_city(&self, city: &str) -> Result<(), EtlError>;
}

/// Renders the COPY statement and records it for the warehouse executor.
///
/// Statement execution runs inside the managed warehouse; this loader is the
/// handoff point and keeps the statement in the service logs.
#[derive(Debug, Clone)]
pub struct CopyStatementLoader {
    warehouse: WarehouseConfig,
}

impl CopyStatementLoader {
    pub fn new(warehouse: WarehouseConfig) -> Self {
        Self { warehouse }
    }
}

#[async_trait]
impl WarehouseLoader for CopyStatementLoader {
    async fn load_city(&self, city: &str) -> Result<(), EtlError> {
        let statement = copy_into_statement(&self.warehouse, city);
        tracing::info!(city, %statement, "prepared warehouse copy statement");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_names_table_stage_and_error_policy() {
        let statement = copy_into_statement(&WarehouseConfig::default(), "Seattle");

        assert!(statement.starts_with(
            "COPY INTO cities_weather_database.cities_weather_schema.seattle ("
        ));
        assert!(statement.contains(
            "FROM '@cities_weather_database.cities_weather_schema.cities_weather_stage_area/seattle.csv'"
        ));
        assert!(statement.contains(
            "FILE_FORMAT = (FORMAT_NAME = cities_weather_database.cities_weather_schema.csv_format)"
        ));
        assert!(statement.ends_with("ON_ERROR = 'CONTINUE';"));
    }

    #[test]
    fn statement_lists_every_dataset_column() {
        let statement = copy_into_statement(&WarehouseConfig::default(), "London");

        for column in [
            "City", "Description", "Temperature", "Feels_Like", "Min_Temperature",
            "Max_Temperature", "Pressure", "Humidity", "Wind_Speed", "Time_of_Record",
            "Sunrise", "Sunset",
        ] {
            assert!(statement.contains(column), "missing column {column}");
        }
    }
}
