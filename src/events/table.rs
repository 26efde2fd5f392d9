//! Tabular form of the event log
//!
//! A [`LogTable`] is a header plus rows of optional string cells. A missing
//! cell (`None`) is the missing-value marker and is written as an empty
//! field. The on-disk encoding is comma separated with `\n` line endings;
//! fields containing a comma, quote or line break are quoted with doubled
//! inner quotes.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use tracing::{debug, instrument};

use crate::events::record::{EventRecord, LOG_COLUMNS};
use crate::simulation::{SimulationError, SimulationResult};

/// One row of cells
pub type Row = Vec<Option<String>>;

/// Header and rows of a persisted log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogTable {
    header: Vec<String>,
    rows: Vec<Row>,
}

impl LogTable {
    /// Create an empty table with the given header
    pub fn new(header: Vec<String>) -> Self {
        Self { header, rows: Vec::new() }
    }

    /// Create an empty table with the event log header
    pub fn with_log_header() -> Self {
        Self::new(LOG_COLUMNS.iter().map(|c| c.to_string()).collect())
    }

    /// Build the table for a sequence of records, in the given order
    pub fn from_records(records: &[EventRecord]) -> Self {
        let mut table = Self::with_log_header();
        table.rows = records.iter().map(EventRecord::to_cells).collect();
        table
    }

    /// Append a row; its arity must match the header
    pub fn push_row(&mut self, row: Row) -> SimulationResult<()> {
        if row.len() != self.header.len() {
            return Err(SimulationError::invalid_log(format!(
                "row {} has {} cells, expected {}",
                self.rows.len(),
                row.len(),
                self.header.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Column names
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// All rows
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of data rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.header.len()
    }

    /// Position of a named column
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|c| c == name)
    }

    /// All values of a named column
    pub fn column(&self, name: &str) -> Option<Vec<Option<&str>>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[index].as_deref()).collect())
    }

    /// A single cell; `None` when missing or out of range
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column)?.as_deref()
    }

    /// Same shape, every cell passed through `f(row, column, cell)`
    pub fn map_cells<F>(&self, mut f: F) -> LogTable
    where
        F: FnMut(usize, usize, &Option<String>) -> Option<String>,
    {
        let rows = self
            .rows
            .iter()
            .enumerate()
            .map(|(r, row)| row.iter().enumerate().map(|(c, cell)| f(r, c, cell)).collect())
            .collect();
        LogTable { header: self.header.clone(), rows }
    }

    /// Whether the header is exactly the event log column list
    pub fn has_log_header(&self) -> bool {
        self.header.iter().map(String::as_str).eq(LOG_COLUMNS.iter().copied())
    }

    /// Parse CSV text; the first record is the header
    pub fn parse(text: &str) -> SimulationResult<Self> {
        let mut records = parse_records(text)?.into_iter();
        let header = records
            .next()
            .ok_or_else(|| SimulationError::invalid_log("missing header row"))?
            .into_iter()
            .map(|cell| cell.unwrap_or_default())
            .collect();

        let mut table = Self::new(header);
        for row in records {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Read an event log table, requiring the event log header
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn read_from<P: AsRef<Path>>(path: P) -> SimulationResult<Self> {
        let mut text = String::new();
        File::open(path.as_ref())?.read_to_string(&mut text)?;

        let table = Self::parse(&text)?;
        if !table.has_log_header() {
            return Err(SimulationError::invalid_log(format!(
                "unexpected header [{}], expected [{}]",
                table.header.join(", "),
                LOG_COLUMNS.join(", ")
            )));
        }

        debug!("Read {} rows", table.row_count());
        Ok(table)
    }

    /// Render as CSV text with a header row
    pub fn to_csv_string(&self) -> String {
        let mut out = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.write_csv(&mut out);
        String::from_utf8_lossy(&out).into_owned()
    }

    /// Write as CSV to any writer
    pub fn write_csv<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        write_record(writer, self.header.iter().map(|h| Some(h.as_str())))?;
        for row in &self.rows {
            write_record(writer, row.iter().map(|cell| cell.as_deref()))?;
        }
        Ok(())
    }

    /// Write as CSV to a file; the parent directory must already exist
    #[instrument(skip_all, fields(path = %path.as_ref().display(), rows = self.rows.len()))]
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> SimulationResult<()> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        self.write_csv(&mut writer)?;
        writer.flush()?;
        debug!("Wrote {} rows", self.rows.len());
        Ok(())
    }
}

fn write_record<'a, W, I>(writer: &mut W, cells: I) -> std::io::Result<()>
where
    W: Write,
    I: Iterator<Item = Option<&'a str>>,
{
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            writer.write_all(b",")?;
        }
        if let Some(value) = cell {
            // An empty present cell is quoted so it does not read back as missing
            if value.is_empty() || value.contains([',', '"', '\n', '\r']) {
                write!(writer, "\"{}\"", value.replace('"', "\"\""))?;
            } else {
                writer.write_all(value.as_bytes())?;
            }
        }
    }
    writer.write_all(b"\n")
}

/// Split CSV text into records of cells; empty unquoted fields become `None`
fn parse_records(text: &str) -> SimulationResult<Vec<Row>> {
    let mut records = Vec::new();
    let mut record: Row = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();
    let mut line = 1usize;

    fn finish_field(record: &mut Row, field: &mut String, quoted: &mut bool) {
        let value = std::mem::take(field);
        record.push(if value.is_empty() && !*quoted { None } else { Some(value) });
        *quoted = false;
    }

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(ch);
                }
                _ => field.push(ch),
            }
            continue;
        }

        match ch {
            '"' if field.is_empty() && !quoted => {
                in_quotes = true;
                quoted = true;
            }
            '"' => {
                return Err(SimulationError::invalid_log(format!(
                    "unexpected quote on line {}",
                    line
                )));
            }
            ',' => finish_field(&mut record, &mut field, &mut quoted),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                // A completely blank line carries no record
                if !(record.is_empty() && field.is_empty() && !quoted) {
                    finish_field(&mut record, &mut field, &mut quoted);
                    records.push(std::mem::take(&mut record));
                }
                line += 1;
            }
            _ => field.push(ch),
        }
    }

    if in_quotes {
        return Err(SimulationError::invalid_log(format!(
            "unterminated quoted field starting before line {}",
            line
        )));
    }
    if !(record.is_empty() && field.is_empty() && !quoted) {
        finish_field(&mut record, &mut field, &mut quoted);
        records.push(record);
    }

    Ok(records)
}
