//! Duplicate Validator

use crate::outcome::StageOutcome;
use crate::record::{Dataset, Record};
use std::collections::HashMap;
use tracing::{debug, info};

/// Duplicate stage result
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateResult {
    pub outcome: StageOutcome,
    /// Every member of every duplicate group, in original order
    pub duplicates: Vec<Record>,
}

impl DuplicateResult {
    /// Rows that took part in a duplicate group (survivors included)
    pub fn duplicate_count(&self) -> usize {
        self.duplicates.len()
    }
}

/// Removes exact-duplicate rows, keeping the first occurrence
#[derive(Debug, Default, Clone, Copy)]
pub struct DuplicateValidator;

impl DuplicateValidator {
    pub fn new() -> Self {
        Self
    }

    /// Group rows by their full value list; sequence numbers play no part
    pub fn validate(&self, dataset: Dataset) -> DuplicateResult {
        // First position of each distinct value list, and how often it occurs
        let mut groups: HashMap<&[String], (usize, usize)> = HashMap::new();
        for (pos, record) in dataset.records().iter().enumerate() {
            groups
                .entry(record.values.as_slice())
                .and_modify(|(_, size)| *size += 1)
                .or_insert((pos, 1));
        }

        let mut first_of_group = vec![true; dataset.len()];
        let mut in_group = vec![false; dataset.len()];
        for (pos, record) in dataset.records().iter().enumerate() {
            let (first, size) = groups[record.values.as_slice()];
            in_group[pos] = size > 1;
            first_of_group[pos] = first == pos;
        }
        drop(groups);

        let duplicates: Vec<Record> = dataset
            .records()
            .iter()
            .zip(&in_group)
            .filter(|(_, dup)| **dup)
            .map(|(r, _)| r.clone())
            .collect();

        let input_rows = dataset.len();
        let mut pos = 0;
        let outcome = StageOutcome::partition(dataset, |record| {
            let repeat = !first_of_group[pos];
            pos += 1;
            if repeat {
                debug!("Row {} duplicates an earlier row", record.sheet_row());
            }
            repeat
        });

        info!(
            "Duplicate check: {} rows in, {} in duplicate groups, {} removed",
            input_rows,
            duplicates.len(),
            outcome.removed_count()
        );

        DuplicateResult { outcome, duplicates }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fixtures::{dataset, row};
    use proptest::prelude::*;

    #[test]
    fn test_first_occurrence_survives() {
        let input = dataset(vec![
            row("a", "1"),
            row("b", "1"),
            row("a", "1"),
            row("c", "1"),
            row("b", "1"),
            row("a", "1"),
        ]);
        let result = DuplicateValidator::new().validate(input);

        assert_eq!(result.outcome.dataset().sequences(), vec![0, 1, 3]);
        let removed: Vec<usize> = result.outcome.removed().iter().map(|r| r.sequence).collect();
        assert_eq!(removed, vec![2, 4, 5]);
        let reported: Vec<usize> = result.duplicates.iter().map(|r| r.sequence).collect();
        assert_eq!(reported, vec![0, 1, 2, 4, 5]);
        assert_eq!(result.duplicate_count(), 5);
    }

    #[test]
    fn test_rows_differing_in_one_field_are_distinct() {
        let input = dataset(vec![row("a", "1"), row("a", "2")]);
        let result = DuplicateValidator::new().validate(input);
        assert!(result.outcome.is_clean());
        assert!(result.duplicates.is_empty());
    }

    #[test]
    fn test_no_duplicates_keeps_input() {
        let input = dataset(vec![row("c", "1"), row("a", "1"), row("b", "1")]);
        let result = DuplicateValidator::new().validate(input.clone());
        assert!(result.outcome.is_clean());
        assert_eq!(result.outcome.into_dataset(), input);
    }

    fn arb_rows() -> impl Strategy<Value = Vec<Vec<String>>> {
        prop::collection::vec((0u8..4, 0u8..3), 0..40).prop_map(|cells| {
            cells
                .into_iter()
                .map(|(t, v)| row(&format!("t{t}"), &v.to_string()))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_dedup_is_idempotent(rows in arb_rows()) {
            let validator = DuplicateValidator::new();
            let once = validator.validate(dataset(rows)).outcome.into_dataset();
            let twice = validator.validate(once.clone());
            prop_assert!(twice.outcome.is_clean());
            prop_assert_eq!(twice.outcome.into_dataset(), once);
        }

        #[test]
        fn prop_dedup_conserves_and_orders(rows in arb_rows()) {
            let input = dataset(rows);
            let n = input.len();
            let result = DuplicateValidator::new().validate(input);
            prop_assert_eq!(result.outcome.dataset().len() + result.outcome.removed_count(), n);
            let kept = result.outcome.dataset().sequences();
            prop_assert!(kept.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
