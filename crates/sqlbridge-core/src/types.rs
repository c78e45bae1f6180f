//! Column type descriptors.
//!
//! A [`ColumnType`] is read once per column from driver metadata and never
//! changes afterwards. [`TypeCode`] is the normalized, product-independent
//! classification; the database-specific spelling is kept in `type_name`.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::value::ValueKind;

/// Normalized SQL type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeCode {
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Float,
    Double,
    Numeric,
    Decimal,
    Char,
    VarChar,
    LongVarChar,
    NChar,
    NVarChar,
    LongNVarChar,
    Clob,
    NClob,
    Binary,
    VarBinary,
    LongVarBinary,
    Blob,
    Date,
    Time,
    TimeWithTimeZone,
    Timestamp,
    TimestampWithTimeZone,
    Boolean,
    Bit,
    Null,
    Array,
    Struct,
    Other,
}

impl TypeCode {
    /// Every type code, in declaration order.
    pub const ALL: [TypeCode; 32] = [
        TypeCode::TinyInt,
        TypeCode::SmallInt,
        TypeCode::Integer,
        TypeCode::BigInt,
        TypeCode::Real,
        TypeCode::Float,
        TypeCode::Double,
        TypeCode::Numeric,
        TypeCode::Decimal,
        TypeCode::Char,
        TypeCode::VarChar,
        TypeCode::LongVarChar,
        TypeCode::NChar,
        TypeCode::NVarChar,
        TypeCode::LongNVarChar,
        TypeCode::Clob,
        TypeCode::NClob,
        TypeCode::Binary,
        TypeCode::VarBinary,
        TypeCode::LongVarBinary,
        TypeCode::Blob,
        TypeCode::Date,
        TypeCode::Time,
        TypeCode::TimeWithTimeZone,
        TypeCode::Timestamp,
        TypeCode::TimestampWithTimeZone,
        TypeCode::Boolean,
        TypeCode::Bit,
        TypeCode::Null,
        TypeCode::Array,
        TypeCode::Struct,
        TypeCode::Other,
    ];

    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            TypeCode::TinyInt | TypeCode::SmallInt | TypeCode::Integer | TypeCode::BigInt
        )
    }

    pub const fn is_floating(self) -> bool {
        matches!(self, TypeCode::Real | TypeCode::Float | TypeCode::Double)
    }

    pub const fn is_exact_numeric(self) -> bool {
        matches!(self, TypeCode::Numeric | TypeCode::Decimal)
    }

    pub const fn is_character(self) -> bool {
        matches!(
            self,
            TypeCode::Char
                | TypeCode::VarChar
                | TypeCode::LongVarChar
                | TypeCode::NChar
                | TypeCode::NVarChar
                | TypeCode::LongNVarChar
                | TypeCode::Clob
                | TypeCode::NClob
        )
    }

    pub const fn is_binary(self) -> bool {
        matches!(
            self,
            TypeCode::Binary | TypeCode::VarBinary | TypeCode::LongVarBinary | TypeCode::Blob
        )
    }

    pub const fn is_temporal(self) -> bool {
        matches!(
            self,
            TypeCode::Date
                | TypeCode::Time
                | TypeCode::TimeWithTimeZone
                | TypeCode::Timestamp
                | TypeCode::TimestampWithTimeZone
        )
    }

    /// Large objects are streamed by most drivers and must be materialized.
    pub const fn is_lob(self) -> bool {
        matches!(self, TypeCode::Clob | TypeCode::NClob | TypeCode::Blob)
    }

    /// The value kind a driver returns for this code when no conversion applies.
    pub const fn default_kind(self) -> ValueKind {
        match self {
            TypeCode::TinyInt => ValueKind::TinyInt,
            TypeCode::SmallInt => ValueKind::SmallInt,
            TypeCode::Integer => ValueKind::Int,
            TypeCode::BigInt => ValueKind::BigInt,
            TypeCode::Real => ValueKind::Float,
            TypeCode::Float | TypeCode::Double => ValueKind::Double,
            TypeCode::Numeric | TypeCode::Decimal => ValueKind::Decimal,
            TypeCode::Char
            | TypeCode::VarChar
            | TypeCode::LongVarChar
            | TypeCode::NChar
            | TypeCode::NVarChar
            | TypeCode::LongNVarChar
            | TypeCode::Clob
            | TypeCode::NClob
            | TypeCode::Other => ValueKind::Text,
            TypeCode::Binary | TypeCode::VarBinary | TypeCode::LongVarBinary | TypeCode::Blob => {
                ValueKind::Bytes
            }
            TypeCode::Date => ValueKind::Date,
            TypeCode::Time | TypeCode::TimeWithTimeZone => ValueKind::Time,
            TypeCode::Timestamp => ValueKind::Timestamp,
            TypeCode::TimestampWithTimeZone => ValueKind::TimestampTz,
            TypeCode::Boolean | TypeCode::Bit => ValueKind::Bool,
            TypeCode::Null => ValueKind::Null,
            TypeCode::Array => ValueKind::Array,
            TypeCode::Struct => ValueKind::Json,
        }
    }

    /// Classify a declared type name (as written in DDL) into a type code.
    ///
    /// Exact well-known spellings are matched first; anything else falls back
    /// to SQLite-style affinity rules, and finally to [`TypeCode::Other`].
    pub fn from_declared(declared: &str) -> TypeCode {
        let parsed = DeclaredType::parse(declared);
        let base = parsed.base.as_str();
        match base {
            "" => TypeCode::Other,
            "TINYINT" | "INT1" => TypeCode::TinyInt,
            "SMALLINT" | "INT2" => TypeCode::SmallInt,
            "INT" | "INTEGER" | "MEDIUMINT" | "INT4" => TypeCode::Integer,
            "BIGINT" | "INT8" | "UNSIGNED BIG INT" => TypeCode::BigInt,
            "REAL" | "FLOAT4" => TypeCode::Real,
            "FLOAT" => TypeCode::Float,
            "DOUBLE" | "DOUBLE PRECISION" | "FLOAT8" | "BINARY_DOUBLE" => TypeCode::Double,
            "NUMERIC" | "NUMBER" => TypeCode::Numeric,
            "DECIMAL" | "DEC" => TypeCode::Decimal,
            "CHAR" | "CHARACTER" => TypeCode::Char,
            "VARCHAR" | "VARCHAR2" | "CHARACTER VARYING" | "VARYING CHARACTER" => {
                TypeCode::VarChar
            }
            "TEXT" | "LONGTEXT" | "MEDIUMTEXT" | "LONG VARCHAR" => TypeCode::LongVarChar,
            "NCHAR" | "NATIVE CHARACTER" => TypeCode::NChar,
            "NVARCHAR" | "NVARCHAR2" => TypeCode::NVarChar,
            "CLOB" | "CHARACTER LARGE OBJECT" => TypeCode::Clob,
            "NCLOB" => TypeCode::NClob,
            "BINARY" => TypeCode::Binary,
            "VARBINARY" | "BYTEA" | "RAW" => TypeCode::VarBinary,
            "LONGBLOB" | "LONG RAW" => TypeCode::LongVarBinary,
            "BLOB" | "BINARY LARGE OBJECT" => TypeCode::Blob,
            "DATE" => TypeCode::Date,
            "TIME" | "TIME WITHOUT TIME ZONE" => TypeCode::Time,
            "TIMETZ" | "TIME WITH TIME ZONE" => TypeCode::TimeWithTimeZone,
            "TIMESTAMP" | "DATETIME" | "TIMESTAMP WITHOUT TIME ZONE" => TypeCode::Timestamp,
            "TIMESTAMPTZ" | "TIMESTAMP WITH TIME ZONE" | "TIMESTAMP WITH LOCAL TIME ZONE" => {
                TypeCode::TimestampWithTimeZone
            }
            "BOOLEAN" | "BOOL" => TypeCode::Boolean,
            "BIT" => TypeCode::Bit,
            "NULL" => TypeCode::Null,
            "ARRAY" => TypeCode::Array,
            "POINT" | "INTERVAL" | "JSON" | "JSONB" | "UUID" | "GEOMETRY" => TypeCode::Other,
            _ if base.ends_with("[]") => TypeCode::Array,
            _ if base.contains("INT") => TypeCode::BigInt,
            _ if base.contains("CHAR") || base.contains("TEXT") => TypeCode::VarChar,
            _ if base.contains("CLOB") => TypeCode::Clob,
            _ if base.contains("BLOB") => TypeCode::Blob,
            _ if base.contains("REAL") || base.contains("FLOA") || base.contains("DOUB") => {
                TypeCode::Double
            }
            _ => TypeCode::Other,
        }
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeCode::TinyInt => "TINYINT",
            TypeCode::SmallInt => "SMALLINT",
            TypeCode::Integer => "INTEGER",
            TypeCode::BigInt => "BIGINT",
            TypeCode::Real => "REAL",
            TypeCode::Float => "FLOAT",
            TypeCode::Double => "DOUBLE",
            TypeCode::Numeric => "NUMERIC",
            TypeCode::Decimal => "DECIMAL",
            TypeCode::Char => "CHAR",
            TypeCode::VarChar => "VARCHAR",
            TypeCode::LongVarChar => "LONGVARCHAR",
            TypeCode::NChar => "NCHAR",
            TypeCode::NVarChar => "NVARCHAR",
            TypeCode::LongNVarChar => "LONGNVARCHAR",
            TypeCode::Clob => "CLOB",
            TypeCode::NClob => "NCLOB",
            TypeCode::Binary => "BINARY",
            TypeCode::VarBinary => "VARBINARY",
            TypeCode::LongVarBinary => "LONGVARBINARY",
            TypeCode::Blob => "BLOB",
            TypeCode::Date => "DATE",
            TypeCode::Time => "TIME",
            TypeCode::TimeWithTimeZone => "TIME_WITH_TIMEZONE",
            TypeCode::Timestamp => "TIMESTAMP",
            TypeCode::TimestampWithTimeZone => "TIMESTAMP_WITH_TIMEZONE",
            TypeCode::Boolean => "BOOLEAN",
            TypeCode::Bit => "BIT",
            TypeCode::Null => "NULL",
            TypeCode::Array => "ARRAY",
            TypeCode::Struct => "STRUCT",
            TypeCode::Other => "OTHER",
        };
        f.write_str(name)
    }
}

/// Immutable descriptor of one column's (or parameter's) database type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnType {
    /// Normalized type code.
    pub type_code: TypeCode,
    /// Database-specific type name, as the driver reports it.
    pub type_name: String,
    /// Kind of value the driver returns by default for this column.
    pub native_kind: ValueKind,
    /// Numeric precision, or maximum length for character/binary types.
    pub precision: u32,
    /// Numeric scale. Negative scales are legal in some products.
    pub scale: i32,
    /// Display width in characters.
    pub display_size: u32,
}

impl ColumnType {
    /// Create a descriptor with the default native kind for `type_code`.
    pub fn new(type_code: TypeCode, type_name: impl Into<String>) -> Self {
        Self {
            type_code,
            type_name: type_name.into(),
            native_kind: type_code.default_kind(),
            precision: 0,
            scale: 0,
            display_size: 0,
        }
    }

    /// Build a descriptor from a declared type such as `DECIMAL(10,2)`.
    pub fn from_declared(declared: &str) -> Self {
        let parsed = DeclaredType::parse(declared);
        let code = TypeCode::from_declared(declared);
        let mut ty = ColumnType::new(code, declared.trim());
        if let Some(p) = parsed.precision {
            ty.precision = p;
            ty.display_size = p;
        }
        if let Some(s) = parsed.scale {
            ty.scale = s;
        }
        if ty.display_size == 0 {
            ty.display_size = default_display_size(code);
        }
        ty
    }

    /// Set precision and scale.
    pub fn with_precision(mut self, precision: u32, scale: i32) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }

    /// Set display width.
    pub fn with_display_size(mut self, display_size: u32) -> Self {
        self.display_size = display_size;
        self
    }

    /// Override the driver's default value kind.
    pub fn with_native_kind(mut self, kind: ValueKind) -> Self {
        self.native_kind = kind;
        self
    }

    /// Case-insensitive comparison of the database-specific type name.
    pub fn name_is(&self, name: &str) -> bool {
        self.base_name().eq_ignore_ascii_case(name)
    }

    /// The type name without length/precision arguments, uppercased.
    pub fn base_name(&self) -> String {
        DeclaredType::parse(&self.type_name).base
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.type_name, self.type_code)
    }
}

fn default_display_size(code: TypeCode) -> u32 {
    match code {
        TypeCode::TinyInt => 4,
        TypeCode::SmallInt => 6,
        TypeCode::Integer => 11,
        TypeCode::BigInt => 20,
        TypeCode::Real | TypeCode::Float | TypeCode::Double => 25,
        TypeCode::Boolean | TypeCode::Bit => 5,
        TypeCode::Date => 10,
        TypeCode::Time => 15,
        TypeCode::TimeWithTimeZone => 21,
        TypeCode::Timestamp => 26,
        TypeCode::TimestampWithTimeZone => 32,
        _ => 0,
    }
}

/// A declared type split into its base name and numeric arguments.
///
/// `VARCHAR(20)` parses to base `VARCHAR`, precision 20; `TIMESTAMP(6) WITH
/// TIME ZONE` parses to base `TIMESTAMP WITH TIME ZONE`, precision 6.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredType {
    pub base: String,
    pub precision: Option<u32>,
    pub scale: Option<i32>,
}

fn declared_type_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\s*([A-Za-z_][A-Za-z0-9_ ]*?(?:\[\])?)\s*(?:\(\s*(\d+)\s*(?:,\s*(-?\d+)\s*)?\))?(?:\s+([A-Za-z][A-Za-z ]*?))?\s*$",
        )
        .expect("declared type pattern is valid")
    })
}

impl DeclaredType {
    pub fn parse(declared: &str) -> Self {
        let Some(caps) = declared_type_regex().captures(declared) else {
            return Self {
                base: declared.trim().to_ascii_uppercase(),
                precision: None,
                scale: None,
            };
        };
        let mut base = caps
            .get(1)
            .map(|m| m.as_str().trim().to_ascii_uppercase())
            .unwrap_or_default();
        if let Some(suffix) = caps.get(4) {
            base.push(' ');
            base.push_str(&suffix.as_str().trim().to_ascii_uppercase());
        }
        let base = base.split_whitespace().collect::<Vec<_>>().join(" ");
        Self {
            base,
            precision: caps.get(2).and_then(|m| m.as_str().parse().ok()),
            scale: caps.get(3).and_then(|m| m.as_str().parse().ok()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_declared_with_arguments() {
        let d = DeclaredType::parse("decimal(10, 2)");
        assert_eq!(d.base, "DECIMAL");
        assert_eq!(d.precision, Some(10));
        assert_eq!(d.scale, Some(2));

        let d = DeclaredType::parse("TIMESTAMP(6) WITH TIME ZONE");
        assert_eq!(d.base, "TIMESTAMP WITH TIME ZONE");
        assert_eq!(d.precision, Some(6));

        let d = DeclaredType::parse("  double   precision ");
        assert_eq!(d.base, "DOUBLE PRECISION");
        assert_eq!(d.precision, None);
    }

    #[test]
    fn test_classify_declared_names() {
        assert_eq!(TypeCode::from_declared("INTEGER"), TypeCode::Integer);
        assert_eq!(TypeCode::from_declared("varchar(255)"), TypeCode::VarChar);
        assert_eq!(TypeCode::from_declared("TIMESTAMPTZ"), TypeCode::TimestampWithTimeZone);
        assert_eq!(TypeCode::from_declared("int[]"), TypeCode::Array);
        assert_eq!(TypeCode::from_declared("interval"), TypeCode::Other);
        assert_eq!(TypeCode::from_declared("point"), TypeCode::Other);
        assert_eq!(TypeCode::from_declared(""), TypeCode::Other);
        // affinity fallbacks
        assert_eq!(TypeCode::from_declared("UNSIGNED INTEGER"), TypeCode::BigInt);
        assert_eq!(TypeCode::from_declared("VARYING TEXT"), TypeCode::VarChar);
    }

    #[test]
    fn test_column_type_from_declared() {
        let ty = ColumnType::from_declared("NUMERIC(12,4)");
        assert_eq!(ty.type_code, TypeCode::Numeric);
        assert_eq!(ty.precision, 12);
        assert_eq!(ty.scale, 4);
        assert_eq!(ty.native_kind, ValueKind::Decimal);
        assert!(ty.name_is("numeric"));

        let ty = ColumnType::from_declared("BIGINT");
        assert_eq!(ty.display_size, 20);
        assert!(ty.type_code.is_integer());
    }

    #[test]
    fn test_category_predicates() {
        assert!(TypeCode::Clob.is_character());
        assert!(TypeCode::Clob.is_lob());
        assert!(TypeCode::Blob.is_binary());
        assert!(TypeCode::TimestampWithTimeZone.is_temporal());
        assert!(TypeCode::Double.is_floating());
        assert!(!TypeCode::Decimal.is_floating());
    }

    #[test]
    fn test_all_codes_are_distinct() {
        let unique: std::collections::HashSet<_> = TypeCode::ALL.iter().collect();
        assert_eq!(unique.len(), TypeCode::ALL.len());
        assert_eq!(TypeCode::ALL.first(), Some(&TypeCode::TinyInt));
        assert_eq!(TypeCode::ALL.last(), Some(&TypeCode::Other));
    }
}
