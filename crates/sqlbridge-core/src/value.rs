//! Dynamically typed SQL values.
//!
//! [`Value`] is what extractors produce and setters consume. Its
//! discriminant, [`ValueKind`], is the dispatch key for setter resolution:
//! the set of parameter kinds is closed, so a tagged union replaces
//! open-ended runtime-class lookup.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A dynamically-typed SQL value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// SQL NULL
    Null,
    Bool(bool),
    TinyInt(i8),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Float(f32),
    Double(f64),
    /// Exact numeric kept in its textual form to avoid precision loss.
    Decimal(String),
    Text(String),
    Bytes(Vec<u8>),
    /// Days since 1970-01-01.
    Date(i32),
    /// Microseconds since midnight.
    Time(i64),
    /// Timezone-naive wall clock, microseconds since 1970-01-01T00:00:00.
    Timestamp(i64),
    /// Instant in time, microseconds since the Unix epoch (UTC).
    TimestampTz(i64),
    Interval(Interval),
    Point(Point),
    Uuid([u8; 16]),
    Json(serde_json::Value),
    Array(Vec<Value>),
}

/// The discriminant of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueKind {
    Null,
    Bool,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    Decimal,
    Text,
    Bytes,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Interval,
    Point,
    Uuid,
    Json,
    Array,
}

impl ValueKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::TinyInt => "tinyint",
            ValueKind::SmallInt => "smallint",
            ValueKind::Int => "int",
            ValueKind::BigInt => "bigint",
            ValueKind::Float => "float",
            ValueKind::Double => "double",
            ValueKind::Decimal => "decimal",
            ValueKind::Text => "text",
            ValueKind::Bytes => "bytes",
            ValueKind::Date => "date",
            ValueKind::Time => "time",
            ValueKind::Timestamp => "timestamp",
            ValueKind::TimestampTz => "timestamptz",
            ValueKind::Interval => "interval",
            ValueKind::Point => "point",
            ValueKind::Uuid => "uuid",
            ValueKind::Json => "json",
            ValueKind::Array => "array",
        }
    }

    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            ValueKind::TinyInt | ValueKind::SmallInt | ValueKind::Int | ValueKind::BigInt
        )
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A calendar interval split the way SQL products store it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Interval {
    pub months: i32,
    pub days: i32,
    pub micros: i64,
}

impl Interval {
    pub const fn new(months: i32, days: i32, micros: i64) -> Self {
        Self {
            months,
            days,
            micros,
        }
    }

    /// Render as an ISO-8601 duration, e.g. `P1Y2M3DT4H5M6.5S`.
    pub fn to_iso8601(&self) -> String {
        let mut out = String::from("P");
        let years = self.months / 12;
        let months = self.months % 12;
        if years != 0 {
            out.push_str(&format!("{}Y", years));
        }
        if months != 0 {
            out.push_str(&format!("{}M", months));
        }
        if self.days != 0 {
            out.push_str(&format!("{}D", self.days));
        }
        if self.micros != 0 {
            out.push('T');
            let hours = self.micros / 3_600_000_000;
            let rem = self.micros % 3_600_000_000;
            let minutes = rem / 60_000_000;
            let rem = rem % 60_000_000;
            let seconds = rem / 1_000_000;
            let frac = rem % 1_000_000;
            if hours != 0 {
                out.push_str(&format!("{}H", hours));
            }
            if minutes != 0 {
                out.push_str(&format!("{}M", minutes));
            }
            if seconds != 0 || frac != 0 {
                if frac == 0 {
                    out.push_str(&format!("{}S", seconds));
                } else {
                    let digits = format!("{:06}", frac.abs());
                    let sign = if seconds == 0 && frac < 0 { "-" } else { "" };
                    out.push_str(&format!(
                        "{}{}.{}S",
                        sign,
                        seconds,
                        digits.trim_end_matches('0')
                    ));
                }
            }
        }
        if out.len() == 1 {
            out.push_str("T0S");
        }
        out
    }
}

/// A two-dimensional point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Format 16 raw bytes as a hyphenated UUID string.
pub fn format_uuid(bytes: &[u8; 16]) -> String {
    let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

/// Parse a hyphenated or bare 32-digit hex UUID.
pub fn parse_uuid(text: &str) -> Option<[u8; 16]> {
    let hex: String = text.trim().chars().filter(|c| *c != '-').collect();
    if hex.len() != 32 {
        return None;
    }
    let mut out = [0u8; 16];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = u8::from_str_radix(hex.get(i * 2..i * 2 + 2)?, 16).ok()?;
    }
    Some(out)
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::TinyInt(_) => ValueKind::TinyInt,
            Value::SmallInt(_) => ValueKind::SmallInt,
            Value::Int(_) => ValueKind::Int,
            Value::BigInt(_) => ValueKind::BigInt,
            Value::Float(_) => ValueKind::Float,
            Value::Double(_) => ValueKind::Double,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::Text(_) => ValueKind::Text,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Date(_) => ValueKind::Date,
            Value::Time(_) => ValueKind::Time,
            Value::Timestamp(_) => ValueKind::Timestamp,
            Value::TimestampTz(_) => ValueKind::TimestampTz,
            Value::Interval(_) => ValueKind::Interval,
            Value::Point(_) => ValueKind::Point,
            Value::Uuid(_) => ValueKind::Uuid,
            Value::Json(_) => ValueKind::Json,
            Value::Array(_) => ValueKind::Array,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Any integer variant widened to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::TinyInt(v) => Some(i64::from(*v)),
            Value::SmallInt(v) => Some(i64::from(*v)),
            Value::Int(v) => Some(i64::from(*v)),
            Value::BigInt(v) => Some(*v),
            _ => None,
        }
    }

    /// Any floating or integer variant as `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Decimal(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Convert to `kind`, the way an explicit-type read does.
    ///
    /// NULL converts to NULL of every kind. Lossy or unparseable conversions
    /// fail with `TypeMismatch`.
    pub fn coerce(self, kind: ValueKind) -> Result<Value> {
        if self.kind() == kind || self.is_null() {
            return Ok(self);
        }
        let actual = self.kind();
        let mismatch = || Error::type_mismatch(kind.as_str(), actual);
        let converted = match kind {
            ValueKind::Null => None,
            ValueKind::Bool => match &self {
                Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "t" | "1" | "y" | "yes" => Some(Value::Bool(true)),
                    "false" | "f" | "0" | "n" | "no" => Some(Value::Bool(false)),
                    _ => None,
                },
                other => other.integer_in_range().map(|v| Value::Bool(v != 0)),
            },
            ValueKind::TinyInt => self
                .integer_in_range()
                .and_then(|v| i8::try_from(v).ok())
                .map(Value::TinyInt),
            ValueKind::SmallInt => self
                .integer_in_range()
                .and_then(|v| i16::try_from(v).ok())
                .map(Value::SmallInt),
            ValueKind::Int => self
                .integer_in_range()
                .and_then(|v| i32::try_from(v).ok())
                .map(Value::Int),
            ValueKind::BigInt => self.integer_in_range().map(Value::BigInt),
            ValueKind::Float => self.float_value().map(|v| Value::Float(v as f32)),
            ValueKind::Double => self.float_value().map(Value::Double),
            ValueKind::Decimal => match &self {
                Value::Text(s) => s
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .map(|_| Value::Decimal(s.trim().to_string())),
                Value::Float(v) => Some(Value::Decimal(v.to_string())),
                Value::Double(v) => Some(Value::Decimal(v.to_string())),
                other => other.as_i64().map(|v| Value::Decimal(v.to_string())),
            },
            ValueKind::Text => self.to_text().map(Value::Text),
            ValueKind::Bytes => match self {
                Value::Text(s) => Some(Value::Bytes(s.into_bytes())),
                Value::Uuid(u) => Some(Value::Bytes(u.to_vec())),
                _ => None,
            },
            ValueKind::Timestamp => match self {
                Value::TimestampTz(v) => Some(Value::Timestamp(v)),
                Value::Date(d) => i64::from(d).checked_mul(86_400_000_000).map(Value::Timestamp),
                _ => None,
            },
            ValueKind::TimestampTz => match self {
                Value::Timestamp(v) => Some(Value::TimestampTz(v)),
                Value::BigInt(secs) => secs.checked_mul(1_000_000).map(Value::TimestampTz),
                _ => None,
            },
            ValueKind::Date => match self {
                Value::Timestamp(v) | Value::TimestampTz(v) => {
                    i32::try_from(v.div_euclid(86_400_000_000)).ok().map(Value::Date)
                }
                _ => None,
            },
            ValueKind::Time => match self {
                Value::Timestamp(v) | Value::TimestampTz(v) => {
                    Some(Value::Time(v.rem_euclid(86_400_000_000)))
                }
                _ => None,
            },
            ValueKind::Uuid => match &self {
                Value::Text(s) => parse_uuid(s).map(Value::Uuid),
                Value::Bytes(b) => <[u8; 16]>::try_from(b.as_slice()).ok().map(Value::Uuid),
                _ => None,
            },
            ValueKind::Json => match self {
                Value::Text(s) => serde_json::from_str(&s).ok().map(Value::Json),
                Value::Bool(b) => Some(Value::Json(serde_json::Value::Bool(b))),
                Value::BigInt(v) => Some(Value::Json(serde_json::Value::from(v))),
                Value::Double(v) => Some(Value::Json(serde_json::Value::from(v))),
                _ => None,
            },
            ValueKind::Interval | ValueKind::Point | ValueKind::Array => None,
        };
        converted.ok_or_else(mismatch)
    }

    fn integer_in_range(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Float(v) if v.fract() == 0.0 && v.abs() < 9.2e18 => Some(*v as i64),
            Value::Double(v) if v.fract() == 0.0 && v.abs() < 9.2e18 => Some(*v as i64),
            Value::Text(s) | Value::Decimal(s) => s.trim().parse().ok(),
            other => other.as_i64(),
        }
    }

    fn float_value(&self) -> Option<f64> {
        match self {
            Value::Text(s) | Value::Decimal(s) => s.trim().parse().ok(),
            other => other.as_f64(),
        }
    }

    fn to_text(&self) -> Option<String> {
        Some(match self {
            Value::Bool(b) => b.to_string(),
            Value::TinyInt(v) => v.to_string(),
            Value::SmallInt(v) => v.to_string(),
            Value::Int(v) => v.to_string(),
            Value::BigInt(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Double(v) => v.to_string(),
            Value::Decimal(s) | Value::Text(s) => s.clone(),
            Value::Bytes(b) => String::from_utf8(b.clone()).ok()?,
            Value::Interval(i) => i.to_iso8601(),
            Value::Point(p) => p.to_string(),
            Value::Uuid(u) => format_uuid(u),
            Value::Json(j) => j.to_string(),
            _ => return None,
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Date(d) => write!(f, "date({})", d),
            Value::Time(t) => write!(f, "time({})", t),
            Value::Timestamp(t) => write!(f, "timestamp({})", t),
            Value::TimestampTz(t) => write!(f, "timestamptz({})", t),
            Value::Bytes(b) => write!(f, "bytes[{}]", b.len()),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            other => match other.to_text() {
                Some(text) => f.write_str(&text),
                None => write!(f, "<{}>", other.kind()),
            },
        }
    }
}

macro_rules! impl_from_for_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_for_value! {
    bool => Bool,
    i8 => TinyInt,
    i16 => SmallInt,
    i32 => Int,
    i64 => BigInt,
    f32 => Float,
    f64 => Double,
    String => Text,
    Vec<u8> => Bytes,
    Interval => Interval,
    Point => Point,
    serde_json::Value => Json,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Typed extraction from a [`Value`].
///
/// Implementations accept only values that are already an instance of the
/// target type (integer widening is allowed); anything else is a
/// `TypeMismatch`. Use [`Value::coerce`] first for converting reads.
pub trait FromValue: Sized {
    /// Name of the target type used in mismatch messages.
    const TYPE_NAME: &'static str;

    fn from_value(value: &Value) -> Result<Self>;
}

fn mismatch<T: FromValue>(value: &Value) -> Error {
    Error::type_mismatch(T::TYPE_NAME, value.kind())
}

impl FromValue for Value {
    const TYPE_NAME: &'static str = "value";

    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl FromValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_value(value: &Value) -> Result<Self> {
        value.as_bool().ok_or_else(|| mismatch::<Self>(value))
    }
}

impl FromValue for i64 {
    const TYPE_NAME: &'static str = "i64";

    fn from_value(value: &Value) -> Result<Self> {
        value.as_i64().ok_or_else(|| mismatch::<Self>(value))
    }
}

impl FromValue for i32 {
    const TYPE_NAME: &'static str = "i32";

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::TinyInt(v) => Ok(i32::from(*v)),
            Value::SmallInt(v) => Ok(i32::from(*v)),
            Value::Int(v) => Ok(*v),
            other => Err(mismatch::<Self>(other)),
        }
    }
}

impl FromValue for i16 {
    const TYPE_NAME: &'static str = "i16";

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::TinyInt(v) => Ok(i16::from(*v)),
            Value::SmallInt(v) => Ok(*v),
            other => Err(mismatch::<Self>(other)),
        }
    }
}

impl FromValue for f64 {
    const TYPE_NAME: &'static str = "f64";

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Float(v) => Ok(f64::from(*v)),
            Value::Double(v) => Ok(*v),
            other => Err(mismatch::<Self>(other)),
        }
    }
}

impl FromValue for f32 {
    const TYPE_NAME: &'static str = "f32";

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Float(v) => Ok(*v),
            other => Err(mismatch::<Self>(other)),
        }
    }
}

impl FromValue for String {
    const TYPE_NAME: &'static str = "String";

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            other => Err(mismatch::<Self>(other)),
        }
    }
}

impl FromValue for Vec<u8> {
    const TYPE_NAME: &'static str = "Vec<u8>";

    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_bytes()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| mismatch::<Self>(value))
    }
}

impl FromValue for Interval {
    const TYPE_NAME: &'static str = "Interval";

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Interval(i) => Ok(*i),
            other => Err(mismatch::<Self>(other)),
        }
    }
}

impl FromValue for Point {
    const TYPE_NAME: &'static str = "Point";

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Point(p) => Ok(*p),
            other => Err(mismatch::<Self>(other)),
        }
    }
}

impl FromValue for serde_json::Value {
    const TYPE_NAME: &'static str = "serde_json::Value";

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Json(j) => Ok(j.clone()),
            other => Err(mismatch::<Self>(other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const TYPE_NAME: &'static str = T::TYPE_NAME;

    fn from_value(value: &Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(Value::Null.kind(), ValueKind::Null);
        assert_eq!(Value::from(5_i64).kind(), ValueKind::BigInt);
        assert_eq!(Value::from("x").kind(), ValueKind::Text);
        assert_eq!(Value::from(Some(1.5_f64)).kind(), ValueKind::Double);
        assert_eq!(Value::from(None::<i32>).kind(), ValueKind::Null);
    }

    #[test]
    fn test_from_value_is_strict() {
        assert_eq!(i64::from_value(&Value::Int(7)).unwrap(), 7);
        assert_eq!(i32::from_value(&Value::SmallInt(7)).unwrap(), 7);
        assert!(matches!(
            i32::from_value(&Value::BigInt(7)),
            Err(Error::TypeMismatch(_))
        ));
        assert!(matches!(
            String::from_value(&Value::BigInt(1)),
            Err(Error::TypeMismatch(_))
        ));
        assert_eq!(Option::<String>::from_value(&Value::Null).unwrap(), None);
    }

    #[test]
    fn test_coerce_numeric_and_text() {
        assert_eq!(Value::BigInt(42).coerce(ValueKind::Int).unwrap(), Value::Int(42));
        assert!(Value::BigInt(1 << 40).coerce(ValueKind::Int).is_err());
        assert_eq!(
            Value::Text(" 12 ".into()).coerce(ValueKind::BigInt).unwrap(),
            Value::BigInt(12)
        );
        assert_eq!(
            Value::Double(2.5).coerce(ValueKind::Text).unwrap(),
            Value::Text("2.5".into())
        );
        assert_eq!(Value::BigInt(0).coerce(ValueKind::Bool).unwrap(), Value::Bool(false));
        assert_eq!(Value::Null.coerce(ValueKind::Uuid).unwrap(), Value::Null);
        assert!(matches!(
            Value::Text("abc".into()).coerce(ValueKind::Double),
            Err(Error::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_coerce_temporal() {
        let day = 86_400_000_000_i64;
        assert_eq!(
            Value::Timestamp(3 * day + 5).coerce(ValueKind::Date).unwrap(),
            Value::Date(3)
        );
        assert_eq!(
            Value::Timestamp(3 * day + 5).coerce(ValueKind::Time).unwrap(),
            Value::Time(5)
        );
        assert_eq!(
            Value::BigInt(10).coerce(ValueKind::TimestampTz).unwrap(),
            Value::TimestampTz(10_000_000)
        );
    }

    #[test]
    fn test_coerce_out_of_range_date_is_mismatch() {
        assert!(matches!(
            Value::Date(i32::MAX).coerce(ValueKind::Timestamp),
            Err(Error::TypeMismatch(_))
        ));
        assert_eq!(
            Value::Date(-1).coerce(ValueKind::Timestamp).unwrap(),
            Value::Timestamp(-86_400_000_000)
        );
    }

    #[test]
    fn test_coerce_large_float_is_mismatch() {
        assert!(matches!(
            Value::Float(1e20).coerce(ValueKind::BigInt),
            Err(Error::TypeMismatch(_))
        ));
        assert_eq!(
            Value::Float(42.0).coerce(ValueKind::BigInt).unwrap(),
            Value::BigInt(42)
        );
    }

    #[test]
    fn test_uuid_roundtrip_text() {
        let text = "123e4567-e89b-12d3-a456-426614174000";
        let bytes = parse_uuid(text).unwrap();
        assert_eq!(format_uuid(&bytes), text);
        assert!(parse_uuid("not-a-uuid").is_none());
    }

    #[test]
    fn test_interval_iso8601() {
        let iv = Interval::new(14, 3, 4 * 3_600_000_000 + 5 * 60_000_000 + 6_500_000);
        assert_eq!(iv.to_iso8601(), "P1Y2M3DT4H5M6.5S");
        assert_eq!(Interval::default().to_iso8601(), "PT0S");
    }
}
