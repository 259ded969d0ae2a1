use csv::{ReaderBuilder, Trim};

use crate::constants::MIN_VALID_ROW_FRACTION;
use crate::prelude::{AnalysisError, AnalysisResult};

/// Row table with the first two columns coerced to numbers.
///
/// Entries that do not parse, or parse to a non-finite value, are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleTable {
    pub columns: usize,
    pub rows: Vec<(Option<f64>, Option<f64>)>,
}

/// Surviving samples after rows with missing values were dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedSamples {
    pub time: Vec<f64>,
    pub voltage: Vec<f64>,
    pub dropped: usize,
}

fn coerce(field: Option<&str>) -> Option<f64> {
    field
        .and_then(|raw| raw.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

impl SampleTable {
    /// Parse a comma-delimited body without a header row. The column count is
    /// taken from the first record; extra trailing fields are ignored.
    pub fn parse(body: &str) -> AnalysisResult<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(body.as_bytes());

        let mut columns = None;
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|err| {
                AnalysisError::MalformedInput(format!("failed to read CSV table: {}", err))
            })?;
            // A whitespace-only line; rows of empty fields still count.
            if record.len() == 1 && record.get(0).map_or(true, str::is_empty) {
                continue;
            }
            let width = *columns.get_or_insert(record.len());
            if width < 2 {
                return Err(AnalysisError::InsufficientColumns(width));
            }
            rows.push((coerce(record.get(0)), coerce(record.get(1))));
        }

        match columns {
            Some(columns) => Ok(Self { columns, rows }),
            None => Err(AnalysisError::MalformedInput(
                "no columns to parse from file".into(),
            )),
        }
    }

    /// Drop rows with a missing time or voltage, preserving row order.
    pub fn clean(self) -> AnalysisResult<CleanedSamples> {
        let total = self.rows.len();
        let (time, voltage): (Vec<f64>, Vec<f64>) = self
            .rows
            .into_iter()
            .filter_map(|(t, v)| Some((t?, v?)))
            .unzip();

        let dropped = total - time.len();
        if dropped > 0 && (time.len() as f64) < total as f64 * MIN_VALID_ROW_FRACTION {
            return Err(AnalysisError::ExcessiveInvalidData { dropped, total });
        }

        Ok(CleanedSamples {
            time,
            voltage,
            dropped,
        })
    }
}
