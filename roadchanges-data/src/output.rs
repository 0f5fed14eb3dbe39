//! Serialising change rows as CSV or as a PostgreSQL bulk-load script.

use std::fmt;
use std::io::{self, Write};

use thiserror::Error;

use roadchanges_core::{COLUMNS, ChangeRow};

/// Errors raised while writing rows.
#[derive(Debug, Error)]
pub enum WriteRowsError {
    /// Writing to the sink failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
    /// Encoding a row failed.
    #[error("failed to encode row: {0}")]
    Csv(#[from] csv::Error),
    /// The requested table name is not a plain SQL identifier.
    #[error("invalid table name '{0}': expected an identifier such as `changes` or `public.changes`")]
    InvalidTableName(String),
}

/// A validated, optionally schema-qualified SQL table name.
///
/// # Examples
/// ```
/// use roadchanges_data::TableName;
///
/// assert!(TableName::new("public.road_changes").is_ok());
/// assert!(TableName::new("changes; drop table users").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName(String);

impl TableName {
    /// Validate `name` as `identifier(.identifier)*`.
    ///
    /// # Errors
    ///
    /// Returns [`WriteRowsError::InvalidTableName`] when any dotted part is
    /// empty or contains characters outside `[A-Za-z0-9_]`, or starts with a
    /// digit.
    pub fn new(name: &str) -> Result<Self, WriteRowsError> {
        if name.split('.').all(is_identifier) {
            Ok(Self(name.to_owned()))
        } else {
            Err(WriteRowsError::InvalidTableName(name.to_owned()))
        }
    }

    /// The name as written in SQL.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|rest| rest.is_ascii_alphanumeric() || rest == '_')
}

/// Output flavour.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Header line, then data rows.
    #[default]
    Csv,
    /// `create table` and `copy ... from stdin` statements, then data rows.
    Sql {
        /// Target table.
        table: TableName,
    },
}

/// Streams [`ChangeRow`]s to a sink.
///
/// Rows use LF terminators and minimal quoting; absent values are empty
/// fields.
///
/// # Examples
/// ```
/// use roadchanges_data::{OutputFormat, RowWriter};
///
/// # fn main() -> Result<(), roadchanges_data::WriteRowsError> {
/// let writer = RowWriter::new(Vec::new(), &OutputFormat::Csv)?;
/// let bytes = writer.finish()?;
/// assert!(bytes.starts_with(b"ts,action,obj_action,kind,"));
/// # Ok(())
/// # }
/// ```
pub struct RowWriter<W: Write> {
    inner: csv::Writer<W>,
    rows: u64,
}

impl<W: Write> RowWriter<W> {
    /// Write the header or SQL preamble and prepare for rows.
    ///
    /// # Errors
    ///
    /// Returns [`WriteRowsError`] when the preamble cannot be written.
    pub fn new(mut sink: W, format: &OutputFormat) -> Result<Self, WriteRowsError> {
        if let OutputFormat::Sql { table } = format {
            write_sql_preamble(&mut sink, table)?;
        }
        let mut inner = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(sink);
        if matches!(format, OutputFormat::Csv) {
            inner.write_record(COLUMNS.iter().map(|column| column.name))?;
        }
        Ok(Self { inner, rows: 0 })
    }

    /// Append one row.
    ///
    /// # Errors
    ///
    /// Returns [`WriteRowsError`] when encoding or writing fails.
    pub fn write_row(&mut self, row: &ChangeRow) -> Result<(), WriteRowsError> {
        self.inner.serialize(row)?;
        self.rows = self.rows.saturating_add(1);
        Ok(())
    }

    /// Number of data rows written so far.
    #[must_use]
    pub const fn rows_written(&self) -> u64 {
        self.rows
    }

    /// Flush buffered output and hand back the sink.
    ///
    /// # Errors
    ///
    /// Returns [`WriteRowsError::Io`] when the final flush fails.
    pub fn finish(self) -> Result<W, WriteRowsError> {
        self.inner
            .into_inner()
            .map_err(|err| WriteRowsError::Io(err.into_error()))
    }
}

fn write_sql_preamble<W: Write>(sink: &mut W, table: &TableName) -> io::Result<()> {
    writeln!(sink, "create table if not exists {table} (")?;
    let mut columns = COLUMNS.iter().peekable();
    while let Some(column) = columns.next() {
        let separator = if columns.peek().is_some() { "," } else { "" };
        writeln!(sink, "    {} {}{separator}", column.name, column.sql_type)?;
    }
    writeln!(sink, ");")?;
    let names: Vec<&str> = COLUMNS.iter().map(|column| column.name).collect();
    writeln!(
        sink,
        "copy {table} ({}) from stdin (format csv);",
        names.join(",")
    )
}
