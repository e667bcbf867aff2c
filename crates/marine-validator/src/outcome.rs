//! Stage Outcomes

use crate::record::{Dataset, Record};

/// What a row-removing stage did to its input
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    /// No row broke the stage's rule; the dataset passes through untouched
    Clean(Dataset),
    /// Some rows were rejected
    RowsRemoved { kept: Dataset, removed: Vec<Record> },
}

impl StageOutcome {
    /// Build from a kept dataset and the rows taken out of it
    pub fn new(kept: Dataset, removed: Vec<Record>) -> Self {
        if removed.is_empty() {
            Self::Clean(kept)
        } else {
            Self::RowsRemoved { kept, removed }
        }
    }

    /// Split a dataset in original order, moving rows matching `reject` out
    pub fn partition<F>(dataset: Dataset, mut reject: F) -> Self
    where
        F: FnMut(&Record) -> bool,
    {
        let template = dataset.with_records(Vec::new());
        let (removed, kept): (Vec<Record>, Vec<Record>) =
            dataset.into_records().into_iter().partition(|r| reject(r));
        Self::new(template.with_records(kept), removed)
    }

    pub fn dataset(&self) -> &Dataset {
        match self {
            Self::Clean(dataset) => dataset,
            Self::RowsRemoved { kept, .. } => kept,
        }
    }

    pub fn into_dataset(self) -> Dataset {
        match self {
            Self::Clean(dataset) => dataset,
            Self::RowsRemoved { kept, .. } => kept,
        }
    }

    pub fn removed(&self) -> &[Record] {
        match self {
            Self::Clean(_) => &[],
            Self::RowsRemoved { removed, .. } => removed,
        }
    }

    pub fn removed_count(&self) -> usize {
        self.removed().len()
    }

    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Clean(_))
    }
}
