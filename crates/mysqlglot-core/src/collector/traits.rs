//! Abstractions over the database connection to enable testing and mocking.
//!
//! The `QuerySource` trait lets collectors run against a real MySQL
//! connection or against the in-memory [`MockSource`](super::mock::MockSource).

use mysql::prelude::Queryable;
use mysql::{Pool, PooledConn, QueryResult, Row, Text, Value};

/// Error raised by a query source or its cursor.
pub type SourceError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Single-pass cursor over the rows of one query.
pub trait RowCursor {
    /// Fetches the next row as positional column values.
    ///
    /// Returns `None` once the result set is exhausted.
    fn next_row(&mut self) -> Option<Result<Vec<Value>, SourceError>>;

    /// Releases the cursor. Called exactly once by the row decoder.
    fn close(&mut self);
}

/// An open database handle able to run a parameterless query.
///
/// Closing the handle itself is the owner's responsibility; collectors only
/// borrow it for one query and its row iteration.
pub trait QuerySource {
    type Cursor<'a>: RowCursor
    where
        Self: 'a;

    /// Submits `sql` and returns a cursor over its result set.
    fn open_cursor(&mut self, sql: &str) -> Result<Self::Cursor<'_>, SourceError>;
}

/// Hands out a fresh [`QuerySource`] for each scrape.
pub trait Connector: Send + Sync {
    type Source: QuerySource;

    fn connect(&self) -> Result<Self::Source, SourceError>;
}

/// Text-protocol cursor over a `mysql` query result.
pub struct MysqlCursor<'a> {
    result: Option<QueryResult<'a, 'a, 'a, Text>>,
}

impl RowCursor for MysqlCursor<'_> {
    fn next_row(&mut self) -> Option<Result<Vec<Value>, SourceError>> {
        let result = self.result.as_mut()?;
        result
            .next()
            .map(|row| row.map(Row::unwrap).map_err(SourceError::from))
    }

    fn close(&mut self) {
        // Dropping the result drains whatever is left on the wire, so the
        // connection can go back to the pool.
        self.result = None;
    }
}

impl QuerySource for PooledConn {
    type Cursor<'a> = MysqlCursor<'a>;

    fn open_cursor(&mut self, sql: &str) -> Result<MysqlCursor<'_>, SourceError> {
        let result = self.query_iter(sql)?;
        Ok(MysqlCursor {
            result: Some(result),
        })
    }
}

impl Connector for Pool {
    type Source = PooledConn;

    fn connect(&self) -> Result<PooledConn, SourceError> {
        Ok(self.get_conn()?)
    }
}
