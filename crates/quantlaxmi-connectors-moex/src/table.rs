//! ISS rectangular sections.
//!
//! With `iss.meta=off` every requested section comes back as
//! `{"columns": [...], "data": [[...], ...]}`. Cells are typed JSON values;
//! `null` marks a field the exchange has no value for (e.g. `LAST` before the
//! first trade).

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{IssError, IssResult};

const DATE_FMT: &str = "%Y-%m-%d";
const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";
const TIME_FMT: &str = "%H:%M:%S";

static NULL: Value = Value::Null;

#[derive(Debug, Deserialize)]
struct RawTable {
    columns: Vec<String>,
    data: Vec<Vec<Value>>,
}

/// One named section of an ISS response.
#[derive(Debug, Clone)]
pub struct IssTable {
    name: String,
    columns: Vec<String>,
    data: Vec<Vec<Value>>,
}

impl IssTable {
    /// Extract section `name` from a decoded response body.
    pub fn from_response(root: &Value, name: &str) -> IssResult<Self> {
        let section = root
            .get(name)
            .ok_or_else(|| IssError::MissingSection(name.to_string()))?;
        let raw: RawTable = serde_json::from_value(section.clone())?;
        Ok(Self {
            name: name.to_string(),
            columns: raw.columns,
            data: raw.data,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Index of `column`, or a schema error.
    pub fn column(&self, column: &str) -> IssResult<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| IssError::MissingColumn {
                section: self.name.clone(),
                column: column.to_string(),
            })
    }

    /// Fail fast when any of `columns` is absent.
    pub fn require(&self, columns: &[&str]) -> IssResult<()> {
        for column in columns {
            self.column(column)?;
        }
        Ok(())
    }

    pub fn rows(&self) -> impl Iterator<Item = IssRow<'_>> {
        self.data
            .iter()
            .enumerate()
            .map(move |(index, cells)| IssRow {
                table: self,
                index,
                cells,
            })
    }

    /// Inner join on `SECID`, keeping this table's row order.
    pub fn join_on_secid<'a>(
        &'a self,
        other: &'a IssTable,
    ) -> IssResult<Vec<(IssRow<'a>, IssRow<'a>)>> {
        let mut by_secid: HashMap<String, IssRow<'a>> = HashMap::with_capacity(other.len());
        for row in other.rows() {
            by_secid.insert(row.string("SECID")?, row);
        }

        let mut joined = Vec::with_capacity(self.len());
        for row in self.rows() {
            let secid = row.string("SECID")?;
            if let Some(matched) = by_secid.remove(&secid) {
                joined.push((row, matched));
            }
        }
        Ok(joined)
    }
}

/// Borrowed view of one data row with typed accessors.
#[derive(Debug, Clone, Copy)]
pub struct IssRow<'a> {
    table: &'a IssTable,
    index: usize,
    cells: &'a [Value],
}

impl<'a> IssRow<'a> {
    fn cell(&self, column: &str) -> IssResult<&'a Value> {
        let idx = self.table.column(column)?;
        Ok(self.cells.get(idx).unwrap_or(&NULL))
    }

    fn bad(&self, column: &str, value: &Value) -> IssError {
        IssError::BadCell {
            section: self.table.name.clone(),
            row: self.index,
            column: column.to_string(),
            value: value.to_string(),
        }
    }

    /// Non-null string cell.
    pub fn string(&self, column: &str) -> IssResult<String> {
        match self.cell(column)? {
            Value::String(s) => Ok(s.clone()),
            other => Err(self.bad(column, other)),
        }
    }

    pub fn opt_string(&self, column: &str) -> IssResult<Option<String>> {
        let value = self.cell(column)?;
        match value {
            Value::Null => Ok(None),
            Value::String(s) if s.is_empty() => Ok(None),
            Value::String(s) => Ok(Some(s.clone())),
            _ => Err(self.bad(column, value)),
        }
    }

    /// Numeric cell; `null` is `None`.
    pub fn opt_f64(&self, column: &str) -> IssResult<Option<f64>> {
        let value = self.cell(column)?;
        match value {
            Value::Null => Ok(None),
            Value::Number(n) => n.as_f64().map(Some).ok_or_else(|| self.bad(column, value)),
            _ => Err(self.bad(column, value)),
        }
    }

    pub fn opt_u64(&self, column: &str) -> IssResult<Option<u64>> {
        let value = self.cell(column)?;
        match value {
            Value::Null => Ok(None),
            Value::Number(n) => match n.as_u64() {
                Some(v) => Ok(Some(v)),
                // Integer columns occasionally arrive as whole floats
                None => match n.as_f64() {
                    Some(f) if f >= 0.0 && f.fract() == 0.0 => Ok(Some(f as u64)),
                    _ => Err(self.bad(column, value)),
                },
            },
            _ => Err(self.bad(column, value)),
        }
    }

    /// Required unsigned count that must fit in `u32` (lot sizes).
    pub fn u32(&self, column: &str) -> IssResult<u32> {
        let value = self.cell(column)?;
        self.opt_u64(column)?
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| self.bad(column, value))
    }

    pub fn date(&self, column: &str) -> IssResult<NaiveDate> {
        let value = self.cell(column)?;
        value
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s, DATE_FMT).ok())
            .ok_or_else(|| self.bad(column, value))
    }

    pub fn opt_datetime(&self, column: &str) -> IssResult<Option<NaiveDateTime>> {
        let value = self.cell(column)?;
        match value {
            Value::Null => Ok(None),
            Value::String(s) => NaiveDateTime::parse_from_str(s, DATETIME_FMT)
                .map(Some)
                .map_err(|_| self.bad(column, value)),
            _ => Err(self.bad(column, value)),
        }
    }

    pub fn opt_time(&self, column: &str) -> IssResult<Option<NaiveTime>> {
        let value = self.cell(column)?;
        match value {
            Value::Null => Ok(None),
            Value::String(s) if s.is_empty() => Ok(None),
            Value::String(s) => NaiveTime::parse_from_str(s, TIME_FMT)
                .map(Some)
                .map_err(|_| self.bad(column, value)),
            _ => Err(self.bad(column, value)),
        }
    }
}
