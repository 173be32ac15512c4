//! Contact list parsing for uploads.

use crate::storage::NewCustomer;
use csv::{Reader, ReaderBuilder, StringRecord, Trim};
use std::collections::HashMap;

/// One contact row. Every column is optional and defaults to an empty string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactRow {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub service_date: String,
}

impl ContactRow {
    /// First and last name joined by a space, skipping empty parts
    pub fn display_name(&self) -> String {
        [self.first_name.as_str(), self.last_name.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn into_customer(self) -> NewCustomer {
        NewCustomer {
            name: self.display_name(),
            email: self.email,
            phone: self.phone,
            service_date: self.service_date,
        }
    }
}

/// Header name to column position. Last duplicate header wins.
#[derive(Debug, Default)]
struct Columns(HashMap<String, usize>);

impl Columns {
    fn from_headers(headers: &StringRecord) -> Self {
        Self(
            headers
                .iter()
                .enumerate()
                .map(|(i, name)| (name.to_string(), i))
                .collect(),
        )
    }

    fn field(&self, record: &StringRecord, name: &str) -> String {
        self.0
            .get(name)
            .and_then(|&i| record.get(i))
            .unwrap_or_default()
            .to_string()
    }

    fn row(&self, record: &StringRecord) -> ContactRow {
        ContactRow {
            first_name: self.field(record, "first_name"),
            last_name: self.field(record, "last_name"),
            email: self.field(record, "email"),
            phone: self.field(record, "phone"),
            service_date: self.field(record, "service_date"),
        }
    }
}

/// Streams contact rows out of comma separated text with a header row.
///
/// Fields are trimmed and short rows are padded with empty strings. Rows are
/// yielded one at a time so callers can commit each before the next is read.
pub struct ContactReader<'a> {
    reader: Reader<&'a [u8]>,
    columns: Columns,
}

impl<'a> ContactReader<'a> {
    pub fn new(content: &'a str) -> Result<Self, csv::Error> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b',')
            .trim(Trim::All)
            .flexible(true)
            .from_reader(content.as_bytes());
        let columns = Columns::from_headers(reader.headers()?);
        Ok(Self { reader, columns })
    }
}

impl Iterator for ContactReader<'_> {
    type Item = Result<ContactRow, csv::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut record = StringRecord::new();
        match self.reader.read_record(&mut record) {
            Ok(true) => Some(Ok(self.columns.row(&record))),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
