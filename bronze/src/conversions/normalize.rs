use std::fmt::Write;

use chrono::SecondsFormat;

use crate::conversions::Cell;
use crate::types::Value;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Converts a source [`Cell`] into the destination [`Value`] it is loaded as.
///
/// Temporal values become ISO-8601 strings, numerics become floats and every other scalar keeps
/// its shape. Values without a finite float form (NaN, infinities) become null.
pub fn normalize_cell(cell: Cell) -> Value {
    match cell {
        Cell::Null => Value::Null,
        Cell::Bool(value) => Value::Bool(value),
        Cell::String(value) => Value::String(value),
        Cell::I16(value) => Value::Integer(value.into()),
        Cell::I32(value) => Value::Integer(value.into()),
        Cell::U32(value) => Value::Integer(value.into()),
        Cell::I64(value) => Value::Integer(value),
        // Through the shortest decimal form, widening `real` bits would add digits.
        Cell::F32(value) => value.to_string().parse().map_or(Value::Null, finite_float),
        Cell::F64(value) => finite_float(value),
        Cell::Numeric(value) => value.to_f64().map_or(Value::Null, finite_float),
        Cell::Date(value) => Value::String(value.format(DATE_FORMAT).to_string()),
        Cell::Time(value) => Value::String(value.format(TIME_FORMAT).to_string()),
        Cell::TimeStamp(value) => Value::String(value.format(TIMESTAMP_FORMAT).to_string()),
        Cell::TimeStampTz(value) => {
            Value::String(value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        }
        Cell::Uuid(value) => Value::String(value.hyphenated().to_string()),
        Cell::Json(value) => Value::String(value.to_string()),
        Cell::Bytes(value) => Value::String(bytea_hex(&value)),
    }
}

fn finite_float(value: f64) -> Value {
    if value.is_finite() {
        Value::Float(value)
    } else {
        Value::Null
    }
}

/// Renders bytes in the Postgres `bytea` hex output format, e.g. `\x0aff`.
fn bytea_hex(bytes: &[u8]) -> String {
    let mut hex = String::with_capacity(2 + bytes.len() * 2);
    hex.push_str("\\x");
    for byte in bytes {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}
