//! Row mappers: turn the current cursor row into a caller type.

use std::sync::Arc;

use sqlbridge_core::{
    ColumnType, Cursor, Error, FromValue, Result, Row, RowColumns, RowExtractionError, TypeCode,
    Value, ValueKind,
};
use sqlbridge_dialect::Extractor;

/// Read access to the row a cursor is positioned on.
///
/// Every read goes through the column's cached extractor. Extractor
/// failures come back as [`Error::RowExtraction`] naming the row and column.
pub struct RowView<'a> {
    cursor: &'a dyn Cursor,
    columns: &'a Arc<RowColumns>,
    extractors: &'a [Extractor],
    index: u64,
}

impl<'a> RowView<'a> {
    pub(crate) fn new(
        cursor: &'a dyn Cursor,
        columns: &'a Arc<RowColumns>,
        extractors: &'a [Extractor],
        index: u64,
    ) -> Self {
        Self {
            cursor,
            columns,
            extractors,
            index,
        }
    }

    /// Position of this row in the cursor's iteration, starting at 0.
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    /// Shared labels and types of the result.
    pub fn columns(&self) -> &Arc<RowColumns> {
        self.columns
    }

    /// Converted value at `index`.
    pub fn get(&self, index: usize) -> Result<Value> {
        let Some(extract) = self.extractors.get(index) else {
            return Err(Error::no_such_column(
                format!("#{}", index),
                self.columns.labels().labels().to_vec(),
            ));
        };
        extract(self.cursor, index).map_err(|source| self.extraction_error(index, source))
    }

    /// Converted value at `index`, then coerced to `kind`.
    pub fn get_as(&self, index: usize, kind: ValueKind) -> Result<Value> {
        self.get(index)?
            .coerce(kind)
            .map_err(|e| e.in_column(self.label(index)))
    }

    /// Converted value of the column labelled `label`.
    pub fn get_by_label(&self, label: &str) -> Result<Value> {
        self.get(self.columns.labels().index_of(label)?)
    }

    /// Converted value of the column labelled `label`, then coerced to `kind`.
    pub fn get_by_label_as(&self, label: &str, kind: ValueKind) -> Result<Value> {
        self.get_as(self.columns.labels().index_of(label)?, kind)
    }

    /// Converted value at `index` as a Rust type.
    pub fn get_typed<T: FromValue>(&self, index: usize) -> Result<T> {
        let value = self.get(index)?;
        T::from_value(&value).map_err(|e| e.in_column(self.label(index)))
    }

    fn label(&self, index: usize) -> &str {
        self.columns
            .labels()
            .labels()
            .get(index)
            .map_or("", String::as_str)
    }

    fn extraction_error(&self, index: usize, source: Error) -> Error {
        let column_type = self
            .columns
            .column_type(index)
            .map_or_else(|| ColumnType::new(TypeCode::Other, ""), |t| (**t).clone());
        Error::RowExtraction(RowExtractionError {
            row_index: self.index,
            column_index: index,
            column_label: self.label(index).to_string(),
            column_type,
            source: Box::new(source),
        })
    }
}

/// Converts the current row into a caller type.
///
/// Closures `FnMut(&RowView) -> Result<T>` are mappers.
pub trait RowMapper {
    type Output;

    fn map_row(&mut self, row: &RowView<'_>) -> Result<Self::Output>;
}

impl<F, T> RowMapper for F
where
    F: FnMut(&RowView<'_>) -> Result<T>,
{
    type Output = T;

    fn map_row(&mut self, row: &RowView<'_>) -> Result<T> {
        self(row)
    }
}

/// Builds a [`Row`] from every column of the current row.
///
/// Column metadata is captured on the first call and shared by every row it
/// produces. A mapper is bound to one result shape; handing it a row with a
/// different column count is an `IllegalState` error.
#[derive(Debug, Default)]
pub struct GenericRowMapper {
    columns: Option<Arc<RowColumns>>,
}

impl GenericRowMapper {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RowMapper for GenericRowMapper {
    type Output = Row;

    fn map_row(&mut self, row: &RowView<'_>) -> Result<Row> {
        let columns = match &self.columns {
            Some(columns) if columns.len() == row.len() => Arc::clone(columns),
            Some(columns) => {
                return Err(Error::illegal_state(format!(
                    "row mapper was built for {} columns but the row has {}",
                    columns.len(),
                    row.len()
                )));
            }
            None => {
                let columns = Arc::clone(row.columns());
                self.columns = Some(Arc::clone(&columns));
                columns
            }
        };
        let values = (0..row.len())
            .map(|index| row.get(index))
            .collect::<Result<Vec<_>>>()?;
        Ok(Row::new(row.index(), columns, values))
    }
}
