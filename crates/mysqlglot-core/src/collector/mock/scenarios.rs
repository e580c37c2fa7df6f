//! Pre-built mock scenarios.

use mysql::Value;

use super::MockSource;
use crate::collector::innodb_cmp::CompressionView;

/// Builds an `innodb_cmp`-shaped row in SELECT column order.
pub fn compression_row(
    page_size: u64,
    compress_ops: u64,
    compress_ops_ok: u64,
    compress_time: u64,
    uncompress_ops: u64,
    uncompress_time: u64,
) -> Vec<Value> {
    [
        page_size,
        compress_ops,
        compress_ops_ok,
        compress_time,
        uncompress_ops,
        uncompress_time,
    ]
    .into_iter()
    .map(Value::UInt)
    .collect()
}

impl MockSource {
    /// Server with compressed tables on 4K and 8K pages.
    ///
    /// Cells of the cumulative view come back as text, as the MySQL text
    /// protocol delivers them. The reset view holds smaller counters.
    pub fn typical_compression() -> Self {
        let mut source = MockSource::new();
        source.add_rows(
            CompressionView::Cumulative.table(),
            [
                text_row(["4096", "1520", "1498", "12", "310", "2"]),
                text_row(["8192", "88412", "86100", "341", "20011", "57"]),
            ],
        );
        source.add_rows(
            CompressionView::Reset.table(),
            [
                compression_row(4096, 20, 19, 0, 4, 0),
                compression_row(8192, 1050, 1021, 3, 240, 1),
            ],
        );
        source
    }
}

fn text_row<const N: usize>(cells: [&str; N]) -> Vec<Value> {
    cells
        .into_iter()
        .map(|cell| Value::Bytes(cell.as_bytes().to_vec()))
        .collect()
}
