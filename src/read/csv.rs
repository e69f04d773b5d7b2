// src/read/csv.rs

use std::path::{Path, PathBuf};

use csv::ReaderBuilder;

use super::{ReadError, Reader, RecordIter};

/// Yields every row of a CSV file as its list of fields.
///
/// Defaults to the excel dialect: comma separated, `"` quoted with doubled
/// quotes as escapes, no header row. Rows may have differing lengths.
#[derive(Debug, Clone)]
pub struct CsvReader {
    path: PathBuf,
    delimiter: u8,
    quote: u8,
}

impl CsvReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
            quote: b'"',
        }
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn quote(mut self, quote: u8) -> Self {
        self.quote = quote;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Reader for CsvReader {
    type Item = Vec<String>;

    fn read(&self) -> Result<RecordIter<Vec<String>>, ReadError> {
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .quote(self.quote)
            .from_path(&self.path)?;

        let rows = reader.into_records().map(|row| {
            row.map(|record| record.iter().map(str::to_string).collect())
                .map_err(ReadError::from)
        });
        Ok(Box::new(rows))
    }
}
