//! Row decoding for the compression views.

use mysql::{Value, from_value_opt};

use super::CompressionView;
use crate::collector::error::CollectError;
use crate::collector::traits::{QuerySource, RowCursor};

/// One decoded row of `innodb_cmp` / `innodb_cmp_reset`.
///
/// Counters stay integers until emission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompressionRecord {
    /// Compressed page size in bytes. One row per page size in use.
    pub page_size: u64,
    pub compress_ops: u64,
    pub compress_ops_ok: u64,
    /// Seconds spent compressing.
    pub compress_time: u64,
    pub uncompress_ops: u64,
    /// Seconds spent uncompressing.
    pub uncompress_time: u64,
}

impl CompressionRecord {
    /// Column names in SELECT order.
    pub const COLUMNS: [&'static str; 6] = [
        "page_size",
        "compress_ops",
        "compress_ops_ok",
        "compress_time",
        "uncompress_ops",
        "uncompress_time",
    ];

    /// Decodes positional column values. `row` is 1-based and only used for errors.
    pub fn decode(
        values: Vec<Value>,
        view: CompressionView,
        row: usize,
    ) -> Result<Self, CollectError> {
        if values.len() != Self::COLUMNS.len() {
            return Err(CollectError::Decode {
                view: view.table(),
                row,
                column: "*",
                reason: format!(
                    "expected {} columns, got {}",
                    Self::COLUMNS.len(),
                    values.len()
                ),
            });
        }

        let mut fields = [0u64; 6];
        for ((field, value), column) in fields.iter_mut().zip(values).zip(Self::COLUMNS) {
            *field = from_value_opt::<u64>(value).map_err(|e| CollectError::Decode {
                view: view.table(),
                row,
                column,
                reason: e.to_string(),
            })?;
        }

        let [
            page_size,
            compress_ops,
            compress_ops_ok,
            compress_time,
            uncompress_ops,
            uncompress_time,
        ] = fields;
        Ok(Self {
            page_size,
            compress_ops,
            compress_ops_ok,
            compress_time,
            uncompress_ops,
            uncompress_time,
        })
    }
}

/// Lazy, single-pass sequence of [`CompressionRecord`]s over an open cursor.
///
/// The cursor is closed exactly once: when the rows run out, when the first
/// error is yielded, or when the sequence is dropped early. Nothing is
/// yielded after an error.
pub struct CompressionRows<C: RowCursor> {
    cursor: C,
    view: CompressionView,
    row: usize,
    done: bool,
}

impl<C: RowCursor> CompressionRows<C> {
    pub fn new(cursor: C, view: CompressionView) -> Self {
        Self {
            cursor,
            view,
            row: 0,
            done: false,
        }
    }

    /// Rows decoded so far.
    pub fn rows_read(&self) -> usize {
        self.row
    }

    fn finish(&mut self) {
        if !self.done {
            self.done = true;
            self.cursor.close();
        }
    }
}

/// Runs `view`'s query against `source` and wraps the cursor.
pub fn open<S: QuerySource>(
    source: &mut S,
    view: CompressionView,
) -> Result<CompressionRows<S::Cursor<'_>>, CollectError> {
    let cursor = source
        .open_cursor(view.query())
        .map_err(|source| CollectError::Query {
            view: view.table(),
            source,
        })?;
    Ok(CompressionRows::new(cursor, view))
}

impl<C: RowCursor> Iterator for CompressionRows<C> {
    type Item = Result<CompressionRecord, CollectError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let item = match self.cursor.next_row() {
            None => None,
            Some(Err(source)) => Some(Err(CollectError::Query {
                view: self.view.table(),
                source,
            })),
            Some(Ok(values)) => {
                self.row += 1;
                Some(CompressionRecord::decode(values, self.view, self.row))
            }
        };

        if !matches!(item, Some(Ok(_))) {
            self.finish();
        }
        item
    }
}

impl<C: RowCursor> Drop for CompressionRows<C> {
    fn drop(&mut self) {
        self.finish();
    }
}
