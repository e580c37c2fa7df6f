//! In-memory query source for testing collectors without a MySQL server.
//!
//! `MockSource` stores scripted result sets keyed by table name and records
//! every query it receives and every cursor close.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use mysql::Value;
use thiserror::Error;

use crate::collector::traits::{Connector, QuerySource, RowCursor, SourceError};

/// Error produced by scripted failures.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct MockError(pub String);

/// One scripted entry of a result set.
#[derive(Debug, Clone)]
pub enum MockRow {
    /// Row returned as-is by the cursor.
    Values(Vec<Value>),
    /// Fetch failure returned instead of a row.
    Error(String),
}

/// In-memory query source.
///
/// Clones share the close counter, so a [`MockConnector`] handing out clones
/// still reports closes across all of them.
#[derive(Debug, Clone, Default)]
pub struct MockSource {
    /// Map from table name to its rows.
    tables: HashMap<String, Vec<MockRow>>,
    /// Tables whose query submission fails, with the error message.
    failing: HashMap<String, String>,
    queries: Vec<String>,
    closes: Arc<AtomicUsize>,
}

impl MockSource {
    /// Creates an empty source. Queries against unknown tables return no rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row to `table`.
    pub fn add_row(&mut self, table: &str, values: Vec<Value>) {
        self.tables
            .entry(table.to_string())
            .or_default()
            .push(MockRow::Values(values));
    }

    /// Appends several rows to `table`.
    pub fn add_rows(&mut self, table: &str, rows: impl IntoIterator<Item = Vec<Value>>) {
        for row in rows {
            self.add_row(table, row);
        }
    }

    /// Appends a fetch failure to `table`'s result set.
    pub fn add_fetch_error(&mut self, table: &str, message: impl Into<String>) {
        self.tables
            .entry(table.to_string())
            .or_default()
            .push(MockRow::Error(message.into()));
    }

    /// Replaces the rows of `table`.
    pub fn set_rows(&mut self, table: &str, rows: impl IntoIterator<Item = Vec<Value>>) {
        self.tables.remove(table);
        self.add_rows(table, rows);
    }

    /// Makes every query against `table` fail at submission.
    pub fn fail_query(&mut self, table: &str, message: impl Into<String>) {
        self.failing.insert(table.to_string(), message.into());
    }

    /// Number of cursors closed so far.
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Queries received, in order.
    pub fn queries(&self) -> &[String] {
        &self.queries
    }
}

/// Extracts the table name following `FROM`.
fn table_of(sql: &str) -> Option<&str> {
    let mut tokens = sql.split_whitespace();
    tokens.find(|t| t.eq_ignore_ascii_case("FROM"))?;
    tokens.next()
}

impl QuerySource for MockSource {
    type Cursor<'a> = MockCursor;

    fn open_cursor(&mut self, sql: &str) -> Result<MockCursor, SourceError> {
        self.queries.push(sql.to_string());
        let table = table_of(sql).unwrap_or_default();

        if let Some(message) = self.failing.get(table) {
            return Err(Box::new(MockError(message.clone())));
        }

        let rows = self.tables.get(table).cloned().unwrap_or_default();
        Ok(MockCursor {
            rows: rows.into(),
            closes: Arc::clone(&self.closes),
        })
    }
}

/// Cursor over a scripted result set.
#[derive(Debug)]
pub struct MockCursor {
    rows: VecDeque<MockRow>,
    closes: Arc<AtomicUsize>,
}

impl RowCursor for MockCursor {
    fn next_row(&mut self) -> Option<Result<Vec<Value>, SourceError>> {
        match self.rows.pop_front()? {
            MockRow::Values(values) => Some(Ok(values)),
            MockRow::Error(message) => Some(Err(Box::new(MockError(message)))),
        }
    }

    fn close(&mut self) {
        self.rows.clear();
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Connector handing out clones of a template [`MockSource`].
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    source: MockSource,
    connect_error: Option<String>,
}

impl MockConnector {
    pub fn new(source: MockSource) -> Self {
        Self {
            source,
            connect_error: None,
        }
    }

    /// Connector whose every `connect` fails.
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self {
            source: MockSource::new(),
            connect_error: Some(message.into()),
        }
    }

    /// Closes recorded across all handed-out sources.
    pub fn close_count(&self) -> usize {
        self.source.close_count()
    }
}

impl Connector for MockConnector {
    type Source = MockSource;

    fn connect(&self) -> Result<MockSource, SourceError> {
        match &self.connect_error {
            Some(message) => Err(Box::new(MockError(message.clone()))),
            None => Ok(self.source.clone()),
        }
    }
}
