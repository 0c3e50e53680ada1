use crate::codec::{Block, Column, ColumnData, ColumnType};
use crate::timezone::{TimezoneResolver, TzDatabase};
use crate::{Error, ErrorContext, Result};
use chrono::{DateTime, TimeZone};
use chrono_tz::Tz;

use super::connection::HttpConnection;

/// Called once when a result set is finished, with its terminal error if any.
pub type ReleaseFn = Box<dyn FnOnce(Option<&Error>) + Send>;

/// Forward-only cursor over the blocks of one query response.
///
/// Holds the connection mutably until dropped; dropping early detaches the
/// response stream without reading the remainder.
pub struct Rows<'c> {
    conn: &'c mut HttpConnection,
    columns: Vec<String>,
    types: Vec<ColumnType>,
    block: Option<Block>,
    // 1-based position within `block`; 0 before the first `next()`.
    row: usize,
    exhausted: bool,
    release: Option<ReleaseFn>,
}

impl<'c> Rows<'c> {
    pub(crate) fn new(conn: &'c mut HttpConnection, first: Option<Block>, release: Option<ReleaseFn>) -> Self {
        let (columns, types) = match &first {
            Some(block) => (
                block.column_names(),
                block.columns().iter().map(|c| c.column_type.clone()).collect(),
            ),
            None => (Vec::new(), Vec::new()),
        };
        Self {
            conn,
            columns,
            types,
            exhausted: first.is_none(),
            block: first,
            row: 0,
            release,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_types(&self) -> &[ColumnType] {
        &self.types
    }

    /// Advance to the next row, pulling blocks as needed.
    pub async fn next(&mut self) -> Result<bool> {
        loop {
            if let Some(block) = &self.block {
                if self.row < block.rows() {
                    self.row += 1;
                    return Ok(true);
                }
            }
            if self.exhausted {
                self.finish(None);
                return Ok(false);
            }
            match self.conn.read_data().await {
                Ok(Some(block)) => {
                    self.block = Some(block);
                    self.row = 0;
                }
                Ok(None) => {
                    self.block = None;
                    self.exhausted = true;
                }
                Err(e) => {
                    self.block = None;
                    self.exhausted = true;
                    self.finish(Some(&e));
                    return Err(e);
                }
            }
        }
    }

    fn finish(&mut self, err: Option<&Error>) {
        if let Some(release) = self.release.take() {
            release(err);
        }
    }

    fn cell(&self, idx: usize) -> Result<(&Column, usize)> {
        let block = self
            .block
            .as_ref()
            .filter(|_| self.row > 0)
            .ok_or_else(|| Error::scan_with_context("no current row", ErrorContext::new().with_source("rows_scan")))?;
        let column = block.column(idx).ok_or_else(|| {
            Error::scan_with_context(
                "column index out of range",
                ErrorContext::new()
                    .with_field_path(format!("rows[{}]", idx))
                    .with_details(format!("{} columns", block.columns().len())),
            )
        })?;
        Ok((column, self.row - 1))
    }

    pub fn get_str(&self, idx: usize) -> Result<&str> {
        let (column, row) = self.cell(idx)?;
        match &column.data {
            ColumnData::String(v) => Ok(&v[row]),
            _ => Err(mismatch(column, "String")),
        }
    }

    /// Any unsigned integer column, widened.
    pub fn get_u64(&self, idx: usize) -> Result<u64> {
        let (column, row) = self.cell(idx)?;
        match &column.data {
            ColumnData::UInt8(v) => Ok(v[row].into()),
            ColumnData::UInt16(v) => Ok(v[row].into()),
            ColumnData::UInt32(v) => Ok(v[row].into()),
            ColumnData::UInt64(v) => Ok(v[row]),
            _ => Err(mismatch(column, "UInt64")),
        }
    }

    /// Any signed integer column, or an unsigned one that fits.
    pub fn get_i64(&self, idx: usize) -> Result<i64> {
        let (column, row) = self.cell(idx)?;
        match &column.data {
            ColumnData::Int8(v) => Ok(v[row].into()),
            ColumnData::Int16(v) => Ok(v[row].into()),
            ColumnData::Int32(v) => Ok(v[row].into()),
            ColumnData::Int64(v) => Ok(v[row]),
            ColumnData::UInt8(v) => Ok(v[row].into()),
            ColumnData::UInt16(v) => Ok(v[row].into()),
            ColumnData::UInt32(v) => Ok(v[row].into()),
            _ => Err(mismatch(column, "Int64")),
        }
    }

    pub fn get_f64(&self, idx: usize) -> Result<f64> {
        let (column, row) = self.cell(idx)?;
        match &column.data {
            ColumnData::Float32(v) => Ok(v[row].into()),
            ColumnData::Float64(v) => Ok(v[row]),
            _ => Err(mismatch(column, "Float64")),
        }
    }

    pub fn get_bool(&self, idx: usize) -> Result<bool> {
        let (column, row) = self.cell(idx)?;
        match &column.data {
            ColumnData::Bool(v) => Ok(v[row]),
            ColumnData::UInt8(v) => Ok(v[row] != 0),
            _ => Err(mismatch(column, "Bool")),
        }
    }

    /// A `DateTime` value in the column's zone, else the server's, else UTC.
    pub fn get_datetime(&self, idx: usize) -> Result<DateTime<Tz>> {
        let (column, row) = self.cell(idx)?;
        let secs = match &column.data {
            ColumnData::DateTime(v) => v[row],
            _ => return Err(mismatch(column, "DateTime")),
        };
        let tz = match column.column_type.timezone() {
            Some(name) => TzDatabase.resolve(name)?,
            None => self.conn.server_timezone().unwrap_or(Tz::UTC),
        };
        tz.timestamp_opt(i64::from(secs), 0).single().ok_or_else(|| {
            Error::scan_with_context(
                "timestamp out of range",
                ErrorContext::new()
                    .with_field_path(column.name.clone())
                    .with_details(secs.to_string()),
            )
        })
    }
}

fn mismatch(column: &Column, wanted: &str) -> Error {
    Error::scan_with_context(
        format!("cannot read {} as {}", column.column_type, wanted),
        ErrorContext::new()
            .with_field_path(column.name.clone())
            .with_source("rows_scan"),
    )
}

impl Drop for Rows<'_> {
    fn drop(&mut self) {
        if !self.exhausted {
            self.conn.decoder = None;
        }
        self.finish(None);
    }
}
