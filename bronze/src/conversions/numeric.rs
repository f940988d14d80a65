use std::fmt::{self, Write};
use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt};
use tokio_postgres::types::{FromSql, Type};

const POSITIVE_SIGN: u16 = 0x0000;
const NEGATIVE_SIGN: u16 = 0x4000;
const NAN_SIGN: u16 = 0xC000;
const POSITIVE_INFINITY_SIGN: u16 = 0xD000;
const NEGATIVE_INFINITY_SIGN: u16 = 0xF000;

/// Decimal digits held by one base 10000 digit.
const DEC_DIGITS: usize = 4;

/// A Postgres `numeric` decoded from the binary wire format.
///
/// Regular values keep the base 10000 digits of the wire format so no precision is lost before
/// the value is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PgNumeric {
    NaN,
    PositiveInfinity,
    NegativeInfinity,
    Value {
        negative: bool,
        /// Power of 10000 of the first digit.
        weight: i16,
        /// Number of decimal digits after the point.
        scale: u16,
        digits: Vec<i16>,
    },
}

impl PgNumeric {
    pub fn is_finite(&self) -> bool {
        matches!(self, PgNumeric::Value { .. })
    }

    /// Converts to the closest `f64`, `None` for NaN and the infinities.
    pub fn to_f64(&self) -> Option<f64> {
        if !self.is_finite() {
            return None;
        }

        self.to_string().parse().ok()
    }
}

impl<'a> FromSql<'a> for PgNumeric {
    fn from_sql(
        _: &Type,
        raw: &'a [u8],
    ) -> Result<Self, Box<dyn std::error::Error + 'static + Sync + Send>> {
        let mut rdr = Cursor::new(raw);

        let num_digits = rdr.read_u16::<BigEndian>()?;
        let weight = rdr.read_i16::<BigEndian>()?;
        let sign = rdr.read_u16::<BigEndian>()?;
        let scale = rdr.read_u16::<BigEndian>()?;

        let negative = match sign {
            POSITIVE_SIGN => false,
            NEGATIVE_SIGN => true,
            NAN_SIGN => return Ok(PgNumeric::NaN),
            POSITIVE_INFINITY_SIGN => return Ok(PgNumeric::PositiveInfinity),
            NEGATIVE_INFINITY_SIGN => return Ok(PgNumeric::NegativeInfinity),
            other => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("invalid numeric sign {other:#06x}"),
                )
                .into());
            }
        };

        let mut digits = Vec::with_capacity(num_digits as usize);
        for _ in 0..num_digits {
            digits.push(rdr.read_i16::<BigEndian>()?);
        }

        Ok(PgNumeric::Value {
            negative,
            weight,
            scale,
            digits,
        })
    }

    fn accepts(ty: &Type) -> bool {
        matches!(*ty, Type::NUMERIC)
    }
}

/// Renders the value the way Postgres prints it, e.g. `-12.50` for scale 2.
impl fmt::Display for PgNumeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (negative, weight, scale, digits) = match self {
            PgNumeric::NaN => return f.write_str("NaN"),
            PgNumeric::PositiveInfinity => return f.write_str("Infinity"),
            PgNumeric::NegativeInfinity => return f.write_str("-Infinity"),
            PgNumeric::Value {
                negative,
                weight,
                scale,
                digits,
            } => (*negative, *weight as i32, *scale as usize, digits),
        };

        let digit_at = |position: i32| -> i16 {
            usize::try_from(position)
                .ok()
                .and_then(|position| digits.get(position).copied())
                .unwrap_or(0)
        };

        let mut rendered = String::new();
        if negative && digits.iter().any(|digit| *digit != 0) {
            rendered.push('-');
        }

        if weight < 0 {
            rendered.push('0');
        } else {
            write!(rendered, "{}", digit_at(0))?;
            for position in 1..=weight {
                write!(rendered, "{:04}", digit_at(position))?;
            }
        }

        if scale > 0 {
            let mut fraction = String::with_capacity(scale + DEC_DIGITS);
            let mut position = weight + 1;
            while fraction.len() < scale {
                write!(fraction, "{:04}", digit_at(position))?;
                position += 1;
            }
            fraction.truncate(scale);

            rendered.push('.');
            rendered.push_str(&fraction);
        }

        f.write_str(&rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(negative: bool, weight: i16, scale: u16, digits: &[i16]) -> PgNumeric {
        PgNumeric::Value {
            negative,
            weight,
            scale,
            digits: digits.to_vec(),
        }
    }

    fn wire(num_digits: u16, weight: i16, sign: u16, scale: u16, digits: &[i16]) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.extend_from_slice(&num_digits.to_be_bytes());
        raw.extend_from_slice(&weight.to_be_bytes());
        raw.extend_from_slice(&sign.to_be_bytes());
        raw.extend_from_slice(&scale.to_be_bytes());
        for digit in digits {
            raw.extend_from_slice(&digit.to_be_bytes());
        }
        raw
    }

    #[test]
    fn displays_decimals_with_scale() {
        assert_eq!(value(false, 0, 2, &[123, 4500]).to_string(), "123.45");
        assert_eq!(value(true, 0, 2, &[12, 5000]).to_string(), "-12.50");
        assert_eq!(value(false, -1, 4, &[42]).to_string(), "0.0042");
        assert_eq!(value(false, -2, 8, &[42]).to_string(), "0.00000042");
        assert_eq!(value(false, 1, 0, &[1234, 5678]).to_string(), "12345678");
        assert_eq!(value(false, 2, 0, &[1]).to_string(), "100000000");
        assert_eq!(value(false, 0, 0, &[]).to_string(), "0");
    }

    #[test]
    fn special_values_have_no_float() {
        assert_eq!(PgNumeric::NaN.to_f64(), None);
        assert_eq!(PgNumeric::PositiveInfinity.to_f64(), None);
        assert_eq!(PgNumeric::NegativeInfinity.to_string(), "-Infinity");
    }

    #[test]
    fn converts_to_nearest_float() {
        assert_eq!(value(false, 0, 2, &[32, 3800]).to_f64(), Some(32.38));
        assert_eq!(value(true, 0, 4, &[0, 2500]).to_f64(), Some(-0.25));
    }

    #[test]
    fn decodes_binary_wire_format() {
        let raw = wire(2, 0, NEGATIVE_SIGN, 2, &[14, 4000]);
        let decoded = PgNumeric::from_sql(&Type::NUMERIC, &raw).unwrap();
        assert_eq!(decoded, value(true, 0, 2, &[14, 4000]));
        assert_eq!(decoded.to_f64(), Some(-14.4));

        let raw = wire(0, 0, NAN_SIGN, 0, &[]);
        assert_eq!(
            PgNumeric::from_sql(&Type::NUMERIC, &raw).unwrap(),
            PgNumeric::NaN
        );

        let raw = wire(0, 0, POSITIVE_INFINITY_SIGN, 0, &[]);
        assert_eq!(
            PgNumeric::from_sql(&Type::NUMERIC, &raw).unwrap(),
            PgNumeric::PositiveInfinity
        );
    }

    #[test]
    fn rejects_truncated_or_unknown_input() {
        assert!(PgNumeric::from_sql(&Type::NUMERIC, &[0, 1]).is_err());

        let raw = wire(0, 0, 0x1234, 0, &[]);
        assert!(PgNumeric::from_sql(&Type::NUMERIC, &raw).is_err());
    }
}
