//! CSV recipient source

use crate::error::SourceError;
use crate::models::RecipientRecord;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Lazy, single-pass reader of recipient rows
///
/// The header row is read when the source is opened; data rows are parsed one
/// at a time as the iterator advances.
pub struct RecipientSource<R> {
    headers: Vec<String>,
    records: csv::StringRecordsIntoIter<R>,
}

impl RecipientSource<File> {
    /// Open a CSV file with a header row
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SourceError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_reader(file)
    }
}

impl<R: Read> RecipientSource<R> {
    pub fn from_reader(reader: R) -> Result<Self, SourceError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = reader.headers()?.iter().map(str::to_string).collect();

        Ok(Self {
            headers,
            records: reader.into_records(),
        })
    }

    /// Column names from the header row
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    fn to_record(&self, row: &csv::StringRecord) -> RecipientRecord {
        let mut record: RecipientRecord = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, header)| (header.as_str(), row.get(i).unwrap_or("")))
            .collect();

        if let Some(position) = row.position() {
            record = record.with_line(position.line());
        }
        record
    }
}

impl<R: Read> Iterator for RecipientSource<R> {
    type Item = Result<RecipientRecord, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.records.next()?;
        Some(row.map(|row| self.to_record(&row)).map_err(SourceError::from))
    }
}
