//! The read side of the conversion pipeline.

use std::sync::Arc;

use sqlbridge_core::{
    ColumnMeta, ColumnType, Cursor, Error, FromValue, ResourceKind, Result, Row, RowColumns,
    Value, ValueKind,
};
use sqlbridge_dialect::{Dialect, Extractor};

use crate::mapper::{GenericRowMapper, RowMapper, RowView};

/// A cursor whose every cell read passes through the dialect's extractors.
///
/// Column metadata and the label→index map are captured when the cursor is
/// wrapped. Extractors are resolved once, when the first row is reached,
/// and kept for the cursor's lifetime. A cursor supports a single iteration:
/// once it has been advanced or handed out as an iterator, asking for
/// another iterator is an `IllegalState` error.
pub struct ConvertingCursor<C> {
    inner: C,
    dialect: Arc<dyn Dialect>,
    metas: Vec<ColumnMeta>,
    columns: Arc<RowColumns>,
    extractors: Option<Vec<Extractor>>,
    position: Option<u64>,
    exhausted: bool,
    iterated: bool,
    closed: bool,
}

impl<C: Cursor> ConvertingCursor<C> {
    /// Wrap `inner`, reading its column metadata once.
    pub fn new(inner: C, dialect: Arc<dyn Dialect>) -> Result<Self> {
        let metas = inner.columns()?;
        let columns = Arc::new(RowColumns::new(
            metas.iter().map(|m| m.label.clone()).collect(),
            metas.iter().map(|m| m.column_type.clone()).collect(),
        ));
        tracing::trace!(
            dialect = dialect.name(),
            columns = metas.len(),
            "Wrapped cursor"
        );
        Ok(Self {
            inner,
            dialect,
            metas,
            columns,
            extractors: None,
            position: None,
            exhausted: false,
            iterated: false,
            closed: false,
        })
    }

    pub fn dialect(&self) -> &Arc<dyn Dialect> {
        &self.dialect
    }

    /// Driver-reported metadata, in column order.
    pub fn column_metas(&self) -> &[ColumnMeta] {
        &self.metas
    }

    /// Shared labels and types.
    pub fn columns(&self) -> &Arc<RowColumns> {
        &self.columns
    }

    pub fn column_type(&self, index: usize) -> Option<&ColumnType> {
        self.metas.get(index).map(|m| &m.column_type)
    }

    pub fn column_count(&self) -> usize {
        self.metas.len()
    }

    /// Zero-based index of the current row, if positioned on one.
    pub fn row_index(&self) -> Option<u64> {
        if self.exhausted { None } else { self.position }
    }

    /// Move to the next row.
    pub fn advance(&mut self) -> Result<bool> {
        if self.closed {
            return Err(Error::illegal_state("cursor is closed"));
        }
        if self.exhausted {
            return Ok(false);
        }
        if !self.inner.advance()? {
            self.exhausted = true;
            return Ok(false);
        }
        self.position = Some(self.position.map_or(0, |p| p + 1));
        if self.extractors.is_none() {
            self.extractors = Some(
                self.metas
                    .iter()
                    .map(|m| self.dialect.extractor(&m.column_type))
                    .collect(),
            );
            tracing::trace!(
                dialect = self.dialect.name(),
                columns = self.metas.len(),
                "Resolved column extractors"
            );
        }
        Ok(true)
    }

    /// View of the current row.
    pub fn current(&self) -> Result<RowView<'_>> {
        match (&self.extractors, self.row_index()) {
            (Some(extractors), Some(index)) => Ok(RowView::new(
                &self.inner,
                &self.columns,
                extractors,
                index,
            )),
            _ => Err(Error::illegal_state("cursor is not positioned on a row")),
        }
    }

    /// Read by index.
    pub fn get(&self, index: usize) -> Result<Value> {
        self.current()?.get(index)
    }

    /// Read by index, coerced to `kind`.
    pub fn get_as(&self, index: usize, kind: ValueKind) -> Result<Value> {
        self.current()?.get_as(index, kind)
    }

    /// Read by label.
    pub fn get_by_label(&self, label: &str) -> Result<Value> {
        let index = self.columns.labels().index_of(label)?;
        self.get(index)
    }

    /// Read by label, coerced to `kind`.
    pub fn get_by_label_as(&self, label: &str, kind: ValueKind) -> Result<Value> {
        let index = self.columns.labels().index_of(label)?;
        self.get_as(index, kind)
    }

    /// Read by index into a Rust type.
    pub fn get_typed<T: FromValue>(&self, index: usize) -> Result<T> {
        self.current()?.get_typed(index)
    }

    /// Map the current row.
    pub fn map_current<M: RowMapper>(&self, mapper: &mut M) -> Result<M::Output> {
        let row = self.current()?;
        mapper.map_row(&row)
    }

    fn begin_iteration(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::illegal_state("cursor is closed"));
        }
        if self.iterated || self.position.is_some() || self.exhausted {
            return Err(Error::illegal_state(
                "cursor has already been iterated; results can only be walked once",
            ));
        }
        self.iterated = true;
        Ok(())
    }

    /// Iterate the remaining rows as [`Row`]s. Allowed once per cursor.
    pub fn rows(&mut self) -> Result<MappedRows<'_, C, GenericRowMapper>> {
        self.map_rows(GenericRowMapper::new())
    }

    /// Iterate the remaining rows through `mapper`. Allowed once per cursor.
    pub fn map_rows<M: RowMapper>(&mut self, mapper: M) -> Result<MappedRows<'_, C, M>> {
        self.begin_iteration()?;
        Ok(MappedRows {
            cursor: self,
            mapper,
            done: false,
        })
    }

    /// Release the underlying cursor. Later calls are no-ops.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.inner
            .close()
            .map_err(|e| Error::resource_release(ResourceKind::Cursor, e, None))
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn into_inner(self) -> C {
        self.inner
    }
}

/// Iterator over the remaining rows of a [`ConvertingCursor`].
///
/// Stops after the first error.
pub struct MappedRows<'c, C: Cursor, M: RowMapper> {
    cursor: &'c mut ConvertingCursor<C>,
    mapper: M,
    done: bool,
}

impl<C: Cursor, M: RowMapper> MappedRows<'_, C, M> {
    /// Collect every remaining row, failing on the first error.
    pub fn collect_all(self) -> Result<Vec<M::Output>> {
        self.collect()
    }
}

impl<C: Cursor, M: RowMapper> Iterator for MappedRows<'_, C, M> {
    type Item = Result<M::Output>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = match self.cursor.advance() {
            Ok(true) => self.cursor.map_current(&mut self.mapper),
            Ok(false) => {
                self.done = true;
                return None;
            }
            Err(e) => Err(e),
        };
        if item.is_err() {
            self.done = true;
        }
        Some(item)
    }
}

/// Wrap and fully drain a cursor into rows, closing it afterwards.
pub fn collect_rows<C: Cursor>(inner: C, dialect: Arc<dyn Dialect>) -> Result<Vec<Row>> {
    let mut cursor = ConvertingCursor::new(inner, dialect)?;
    let rows = cursor.rows().and_then(MappedRows::collect_all);
    let closed = cursor.close();
    match (rows, closed) {
        (Ok(rows), Ok(())) => Ok(rows),
        (Ok(_), Err(release)) => Err(release),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(release)) => Err(release.with_suppressed(e)),
    }
}
