//! Novelty decision for fetched observations.
//!
//! The merge is pure: given the current dataset (possibly absent) and one
//! candidate observation, it produces the next dataset and whether anything
//! changed. Persistence is the caller's concern.

use crate::model::{CityDataset, WeatherObservation};

/// Outcome of merging one candidate observation into a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeResult {
    pub dataset: CityDataset,
    pub changed: bool,
}

/// Merge `candidate` into `existing`.
///
/// - No existing dataset: the result is a fresh one-element dataset.
/// - Duplicate candidate: the existing dataset is returned unmodified.
/// - Novel candidate: appended at the end, keeping arrival order.
///
/// A candidate is a duplicate when its `observed_at` string and any stored
/// record's `observed_at` string contain one another. Both strings use the
/// fixed-width dataset format, where containment reduces to equality.
pub fn merge(existing: Option<CityDataset>, candidate: WeatherObservation) -> MergeResult {
    let Some(dataset) = existing else {
        return MergeResult {
            dataset: CityDataset::from_records(vec![candidate]),
            changed: true,
        };
    };

    let key = candidate.observed_at_key();
    let duplicate = dataset.records().iter().any(|record| {
        let stored = record.observed_at_key();
        stored.contains(&key) || key.contains(&stored)
    });

    if duplicate {
        return MergeResult { dataset, changed: false };
    }

    let mut updated = dataset;
    updated.push(candidate);
    MergeResult { dataset: updated, changed: true }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::observation;

    #[test]
    fn absent_dataset_bootstraps_a_single_record() {
        let candidate = observation("Seattle", "2025-03-11 10:00:00");

        let result = merge(None, candidate.clone());

        assert!(result.changed);
        assert_eq!(result.dataset.records(), &[candidate]);
    }

    #[test]
    fn duplicate_timestamp_leaves_dataset_unmodified() {
        let existing = CityDataset::from_records(vec![
            observation("London", "2025-03-11 10:00:00"),
            observation("London", "2025-03-11 10:05:00"),
        ]);
        let candidate = observation("London", "2025-03-11 10:05:00");

        let result = merge(Some(existing.clone()), candidate);

        assert!(!result.changed);
        assert_eq!(result.dataset, existing);
    }

    #[test]
    fn merging_a_duplicate_twice_stays_a_no_op() {
        let candidate = observation("London", "2025-03-11 10:05:00");
        let first = merge(None, candidate.clone());
        let second = merge(Some(first.dataset.clone()), candidate.clone());
        let third = merge(Some(second.dataset.clone()), candidate);

        assert!(first.changed);
        assert!(!second.changed);
        assert!(!third.changed);
        assert_eq!(third.dataset, first.dataset);
    }

    #[test]
    fn novel_timestamp_appends_exactly_once_at_the_end() {
        let existing = CityDataset::from_records(vec![
            observation("Beijing", "2025-03-11 10:00:00"),
            observation("Beijing", "2025-03-11 10:05:00"),
        ]);
        let candidate = observation("Beijing", "2025-03-11 10:10:00");

        let result = merge(Some(existing.clone()), candidate.clone());

        assert!(result.changed);
        assert_eq!(result.dataset.len(), 3);
        assert_eq!(result.dataset.records()[..2], *existing.records());
        assert_eq!(result.dataset.records()[2], candidate);
    }

    #[test]
    fn containment_runs_in_both_directions() {
        // Same fixed-width format either side, so equal strings are the
        // only containment case the dataset codec can produce.
        let existing = CityDataset::from_records(vec![observation("Portland", "2025-03-11 10:00:00")]);
        let candidate = observation("Portland", "2025-03-11 10:00:00");

        let result = merge(Some(existing), candidate);

        assert!(!result.changed);
    }
}
