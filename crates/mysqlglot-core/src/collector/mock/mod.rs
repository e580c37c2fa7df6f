//! Mock query sources for testing.
//!
//! This module provides `MockSource`, `MockConnector` and pre-built scenarios
//! for testing collectors without a running MySQL server.

mod scenarios;
mod source;

pub use scenarios::compression_row;
pub use source::{MockConnector, MockCursor, MockError, MockRow, MockSource};
