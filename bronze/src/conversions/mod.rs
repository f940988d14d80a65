//! Source cells and their normalization into destination [`crate::types::Value`]s.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use uuid::Uuid;

use crate::conversions::numeric::PgNumeric;

pub mod normalize;
pub mod numeric;

/// A typed value as decoded from a source column.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    String(String),
    I16(i16),
    I32(i32),
    U32(u32),
    I64(i64),
    F32(f32),
    F64(f64),
    Numeric(PgNumeric),
    Date(NaiveDate),
    Time(NaiveTime),
    TimeStamp(NaiveDateTime),
    TimeStampTz(DateTime<Utc>),
    Uuid(Uuid),
    Json(serde_json::Value),
    Bytes(Vec<u8>),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

/// Wraps an optional decoded value, mapping `None` to [`Cell::Null`].
pub(crate) fn cell_from_option<T>(value: Option<T>, wrap: impl FnOnce(T) -> Cell) -> Cell {
    value.map(wrap).unwrap_or(Cell::Null)
}
