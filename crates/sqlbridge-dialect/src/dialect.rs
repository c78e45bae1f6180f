//! The [`Dialect`] capability trait and the building blocks dialects share.

use std::fmt;
use std::io::Read;
use std::sync::{Arc, OnceLock};

use sqlbridge_core::{
    ColumnType, Cursor, DriverOperation, Error, ParameterSink, Result, Value, ValueKind,
    quote_ident,
};

/// Reads one cell of the current row: cursor × zero-based column index.
///
/// Returns [`Value::Null`] when the cell is SQL NULL.
pub type Extractor = Arc<dyn Fn(&dyn Cursor, usize) -> Result<Value> + Send + Sync>;

/// Binds one parameter: statement × one-based parameter index × value.
pub type Setter = Arc<dyn Fn(&mut dyn ParameterSink, usize, &Value) -> Result<()> + Send + Sync>;

/// Per-database-product conversion rules.
///
/// A dialect is stateless. One instance is selected per connection and
/// shared read-only afterwards, so implementations must be `Send + Sync`.
pub trait Dialect: fmt::Debug + Send + Sync {
    /// Short product name, used in logs.
    fn name(&self) -> &'static str;

    /// Connection URL prefixes this dialect claims, e.g. `postgresql:`.
    fn url_prefixes(&self) -> &'static [&'static str];

    /// Case-insensitive prefix match against [`url_prefixes`](Dialect::url_prefixes).
    fn accepts_url(&self, url: &str) -> bool {
        self.url_prefixes()
            .iter()
            .any(|prefix| starts_with_ignore_case(url, prefix))
    }

    /// The extractor for a column of type `column`.
    fn extractor(&self, column: &ColumnType) -> Extractor;

    /// The setter for parameters of kind `kind`. Never called for NULL.
    fn setter(&self, kind: ValueKind) -> Setter;

    /// Quote one identifier part.
    fn quote_ident(&self, name: &str) -> String {
        quote_ident(name)
    }
}

/// ASCII case-insensitive `starts_with`.
pub fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len()
        && text.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// The fallback dialect: untyped read, untyped bind, no special cases.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericDialect;

impl GenericDialect {
    /// The process-wide shared instance.
    pub fn shared() -> Arc<dyn Dialect> {
        static INSTANCE: OnceLock<Arc<dyn Dialect>> = OnceLock::new();
        Arc::clone(INSTANCE.get_or_init(|| Arc::new(GenericDialect)))
    }
}

impl Dialect for GenericDialect {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn url_prefixes(&self) -> &'static [&'static str] {
        &[]
    }

    fn extractor(&self, _column: &ColumnType) -> Extractor {
        untyped_extractor()
    }

    fn setter(&self, _kind: ValueKind) -> Setter {
        untyped_setter()
    }
}

/// The cursor's untyped default read.
pub fn untyped_extractor() -> Extractor {
    static UNTYPED: OnceLock<Extractor> = OnceLock::new();
    Arc::clone(
        UNTYPED.get_or_init(|| Arc::new(|cursor: &dyn Cursor, index: usize| cursor.read(index))),
    )
}

/// The statement's untyped default bind.
pub fn untyped_setter() -> Setter {
    static UNTYPED: OnceLock<Setter> = OnceLock::new();
    Arc::clone(UNTYPED.get_or_init(|| {
        Arc::new(|sink: &mut dyn ParameterSink, index: usize, value: &Value| {
            sink.bind(index, value.clone())
        })
    }))
}

/// Wrap a type-specific read so it only runs for non-NULL cells.
pub fn null_guarded<F>(read: F) -> Extractor
where
    F: Fn(&dyn Cursor, usize) -> Result<Value> + Send + Sync + 'static,
{
    Arc::new(move |cursor: &dyn Cursor, index: usize| {
        if cursor.is_null(index)? {
            return Ok(Value::Null);
        }
        read(cursor, index)
    })
}

/// Calendar-aware UTC timestamp read producing an instant.
pub fn utc_timestamp_extractor() -> Extractor {
    null_guarded(|cursor, index| cursor.read_timestamp_utc(index).map(Value::TimestampTz))
}

/// Explicitly typed read through the cursor.
pub fn typed_extractor(kind: ValueKind) -> Extractor {
    null_guarded(move |cursor, index| cursor.read_as(index, kind))
}

/// Materialize a character large object into a string.
pub fn clob_extractor() -> Extractor {
    null_guarded(|cursor, index| {
        let mut text = String::new();
        cursor
            .read_lob(index)?
            .read_to_string(&mut text)
            .map_err(|e| Error::driver_source(DriverOperation::Read, e))?;
        Ok(Value::Text(text))
    })
}

/// Materialize a binary large object into bytes.
pub fn blob_extractor() -> Extractor {
    null_guarded(|cursor, index| {
        let mut bytes = Vec::new();
        cursor
            .read_lob(index)?
            .read_to_end(&mut bytes)
            .map_err(|e| Error::driver_source(DriverOperation::Read, e))?;
        Ok(Value::Bytes(bytes))
    })
}

/// Untyped read whose text results are parsed by `parse`.
///
/// Non-text values are passed through, for drivers that already decode the
/// type natively.
pub fn parsed_text_extractor(what: &'static str, parse: fn(&str) -> Option<Value>) -> Extractor {
    null_guarded(move |cursor, index| match cursor.read(index)? {
        Value::Text(text) => parse(&text).ok_or_else(|| {
            Error::driver(
                DriverOperation::Read,
                format!("column {} holds malformed {} text '{}'", index, what, text),
            )
        }),
        other => Ok(other),
    })
}

/// Calendar-aware UTC timestamp bind for temporal parameters.
pub fn utc_timestamp_setter() -> Setter {
    Arc::new(|sink: &mut dyn ParameterSink, index: usize, value: &Value| match value {
        Value::Timestamp(micros) | Value::TimestampTz(micros) => {
            sink.bind_timestamp_utc(index, *micros)
        }
        other => sink.bind(index, other.clone()),
    })
}

/// Bind the value's text rendering, falling back to the untyped bind when
/// `render` declines.
pub fn text_setter(render: fn(&Value) -> Option<String>) -> Setter {
    Arc::new(
        move |sink: &mut dyn ParameterSink, index: usize, value: &Value| match render(value) {
            Some(text) => sink.bind(index, Value::Text(text)),
            None => sink.bind(index, value.clone()),
        },
    )
}

/// Bind booleans as the integers 0 and 1.
pub fn bool_as_int_setter() -> Setter {
    Arc::new(|sink: &mut dyn ParameterSink, index: usize, value: &Value| match value {
        Value::Bool(b) => sink.bind(index, Value::Int(i32::from(*b))),
        other => sink.bind(index, other.clone()),
    })
}

/// Text rendering used by several dialects for structured values.
pub fn render_structured(value: &Value) -> Option<String> {
    match value {
        Value::Interval(interval) => Some(interval.to_iso8601()),
        Value::Point(point) => Some(point.to_string()),
        Value::Uuid(bytes) => Some(sqlbridge_core::format_uuid(bytes)),
        Value::Json(json) => Some(json.to_string()),
        _ => None,
    }
}
