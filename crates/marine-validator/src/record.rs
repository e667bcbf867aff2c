//! Records, Datasets and Column Projection

use crate::error::{SchemaError, ValidationError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Name of the timestamp column
pub const TIME_COLUMN: &str = "time";

/// Columns every input table must carry, in output order
pub const REQUIRED_COLUMNS: [&str; 11] = [
    TIME_COLUMN,
    "AtmosphericPressure",
    "WindDirection",
    "WindSpeed",
    "Gust",
    "WaveHeight",
    "WavePeriod",
    "MeanWaveDirection",
    "AirTemperature",
    "SeaTemperature",
    "RelativeHumidity",
];

/// One sensor observation
///
/// `sequence` is the 0-based position of the row in the raw input and is
/// carried unchanged through every stage. It is the row identity used for
/// duplicate tie-breaks and report cross-referencing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    pub sequence: usize,
    pub values: Vec<String>,
}

impl Record {
    /// Create a new record
    pub fn new(sequence: usize, values: Vec<String>) -> Self {
        Self { sequence, values }
    }

    /// Row number in the source sheet (1-based, header on row 1)
    pub fn sheet_row(&self) -> usize {
        self.sequence + 2
    }
}

/// Ordered sequence of records sharing one column set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Dataset {
    /// Create a dataset, checking every record against the column count
    pub fn new(columns: Vec<String>, records: Vec<Record>) -> Result<Self, ValidationError> {
        if let Some(bad) = records.iter().find(|r| r.values.len() != columns.len()) {
            return Err(ValidationError::WidthMismatch {
                sequence: bad.sequence,
                expected: columns.len(),
                found: bad.values.len(),
            });
        }
        Ok(Self { columns, records })
    }

    /// Dataset with the required columns and no rows
    pub fn empty() -> Self {
        Self {
            columns: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            records: Vec::new(),
        }
    }

    /// Same schema, different rows. Callers only pass records taken from `self`.
    pub(crate) fn with_records(&self, records: Vec<Record>) -> Self {
        Self {
            columns: self.columns.clone(),
            records,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Position of a named column
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Position of a column a stage cannot run without
    pub fn require_column(&self, name: &'static str) -> Result<usize, ValidationError> {
        self.column_index(name)
            .ok_or(ValidationError::MissingColumn(name))
    }

    /// Original sequence numbers, in current order
    pub fn sequences(&self) -> Vec<usize> {
        self.records.iter().map(|r| r.sequence).collect()
    }

    /// Render as header + rows
    pub fn to_table(&self) -> Vec<Vec<String>> {
        let mut table = Vec::with_capacity(self.records.len() + 1);
        table.push(self.columns.clone());
        table.extend(self.records.iter().map(|r| r.values.clone()));
        table
    }
}

/// Selects the required columns out of a raw table
#[derive(Debug, Clone)]
pub struct ColumnProjector {
    /// Header position of each entry in `REQUIRED_COLUMNS`
    positions: Vec<usize>,
}

impl ColumnProjector {
    /// Resolve required column positions from the header row
    pub fn resolve(header: &[String]) -> Result<Self, SchemaError> {
        let mut positions = Vec::with_capacity(REQUIRED_COLUMNS.len());
        let mut missing = Vec::new();

        for name in REQUIRED_COLUMNS {
            match header.iter().position(|h| h.trim() == name) {
                Some(pos) => positions.push(pos),
                None => missing.push(name.to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(SchemaError::MissingColumns(missing));
        }

        debug!("Resolved column positions: {:?}", positions);
        Ok(Self { positions })
    }

    /// Project data rows (header already removed) into a dataset
    pub fn project(&self, rows: Vec<Vec<String>>) -> Result<Dataset, ValidationError> {
        let mut records = Vec::with_capacity(rows.len());

        for (sequence, mut row) in rows.into_iter().enumerate() {
            let found = row.len();
            let mut values = Vec::with_capacity(self.positions.len());
            for (&pos, column) in self.positions.iter().zip(REQUIRED_COLUMNS) {
                let cell = row.get_mut(pos).ok_or(ValidationError::RaggedRow {
                    row: sequence + 2,
                    column,
                    position: pos,
                    found,
                })?;
                values.push(std::mem::take(cell));
            }
            records.push(Record::new(sequence, values));
        }

        info!("Projected {} rows onto {} columns", records.len(), self.positions.len());
        Ok(Dataset {
            columns: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            records,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn test_projection_reorders_and_drops_extra_columns() {
        let mut header = header();
        header.reverse();
        header.insert(3, "Station".to_string());
        let projector = ColumnProjector::resolve(&header).unwrap();

        let mut raw = row("2023-01-01T00:00:00Z", "1");
        raw.reverse();
        raw.insert(3, "M2".to_string());

        let dataset = projector.project(vec![raw]).unwrap();
        assert_eq!(dataset.columns()[0], TIME_COLUMN);
        assert_eq!(dataset.records()[0].values[0], "2023-01-01T00:00:00Z");
        assert!(!dataset.records()[0].values.contains(&"M2".to_string()));
    }

    #[test]
    fn test_missing_columns_are_all_listed() {
        let header = s(&["time", "AtmosphericPressure", "WindSpeed"]);
        let err = ColumnProjector::resolve(&header).unwrap_err();
        match err {
            SchemaError::MissingColumns(cols) => {
                assert!(cols.contains(&"Gust".to_string()));
                assert!(cols.contains(&"RelativeHumidity".to_string()));
                assert_eq!(cols.len(), REQUIRED_COLUMNS.len() - 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_header_whitespace_is_ignored() {
        let header: Vec<String> = REQUIRED_COLUMNS.iter().map(|c| format!(" {c} ")).collect();
        assert!(ColumnProjector::resolve(&header).is_ok());
    }

    #[test]
    fn test_ragged_row_is_an_error() {
        let projector = ColumnProjector::resolve(&header()).unwrap();
        let err = projector.project(vec![s(&["2023-01-01T00:00:00Z", "1"])]).unwrap_err();
        assert!(matches!(err, ValidationError::RaggedRow { row: 2, .. }));
    }

    #[test]
    fn test_sequence_follows_input_order() {
        let projector = ColumnProjector::resolve(&header()).unwrap();
        let rows = (0..4).map(|i| row(&format!("t{i}"), "1")).collect();
        let dataset = projector.project(rows).unwrap();
        assert_eq!(dataset.sequences(), vec![0, 1, 2, 3]);
        assert_eq!(dataset.records()[3].sheet_row(), 5);
    }

    #[test]
    fn test_width_mismatch_rejected() {
        let err = Dataset::new(header(), vec![Record::new(0, s(&["a"]))]).unwrap_err();
        assert!(matches!(err, ValidationError::WidthMismatch { sequence: 0, .. }));
    }

    #[test]
    fn test_to_table_has_header_first() {
        let dataset = dataset(vec![row("t", "1")]);
        let table = dataset.to_table();
        assert_eq!(table.len(), 2);
        assert_eq!(table[0], header());
    }
}
