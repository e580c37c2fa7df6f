//! `information_schema.innodb_cmp` and `innodb_cmp_reset` collection.
//!
//! Both views hold one row per compressed page size in use, with counters for
//! compress and uncompress operations. `innodb_cmp` is cumulative since server
//! start. `innodb_cmp_reset` has the same columns, but reading it resets the
//! server-side counters, so every scrape sees the values since the previous
//! read.
//!
//! Each field becomes its own gauge with `page_size` as the only label.

mod queries;
mod rows;

use tracing::debug;

use super::desc::{Desc, INFORMATION_SCHEMA, NAMESPACE};
use super::error::CollectError;
use super::sample::{Sample, SampleSink};
use super::traits::QuerySource;
use queries::{INNODB_CMP_QUERY, INNODB_CMP_RESET_QUERY};

pub use rows::{CompressionRecord, CompressionRows, open};

/// Which compression view a scrape reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionView {
    /// `innodb_cmp`: counters since server start.
    Cumulative,
    /// `innodb_cmp_reset`: counters since the previous read.
    Reset,
}

impl CompressionView {
    /// Fully-qualified table name.
    pub fn table(self) -> &'static str {
        match self {
            CompressionView::Cumulative => "information_schema.innodb_cmp",
            CompressionView::Reset => "information_schema.innodb_cmp_reset",
        }
    }

    pub fn query(self) -> &'static str {
        match self {
            CompressionView::Cumulative => INNODB_CMP_QUERY,
            CompressionView::Reset => INNODB_CMP_RESET_QUERY,
        }
    }

    fn short_table(self) -> &'static str {
        match self {
            CompressionView::Cumulative => "innodb_cmp",
            CompressionView::Reset => "innodb_cmp_reset",
        }
    }

    /// Metric short name for `field`, e.g. `cmp_reset_compress_ops`.
    fn metric_name(self, field: &str) -> String {
        match (self, field) {
            (CompressionView::Cumulative, "uncompress_ops" | "uncompress_time") => {
                field.to_string()
            }
            (CompressionView::Cumulative, _) => format!("cmp_{field}"),
            (CompressionView::Reset, _) => format!("cmp_reset_{field}"),
        }
    }
}

/// Descriptors for the six fields of one view.
#[derive(Debug, Clone)]
pub struct CmpDescs {
    pub page_size: Desc<1>,
    pub compress_ops: Desc<1>,
    pub compress_ops_ok: Desc<1>,
    pub compress_time: Desc<1>,
    pub uncompress_ops: Desc<1>,
    pub uncompress_time: Desc<1>,
}

impl CmpDescs {
    pub fn new(view: CompressionView) -> Self {
        let table = view.short_table();
        let desc = |field: &str, what: &str| {
            Desc::new(
                NAMESPACE,
                INFORMATION_SCHEMA,
                &view.metric_name(field),
                format!("InnoDB {what} for {table} table."),
                ["page_size"],
            )
        };

        Self {
            page_size: desc("page_size", "page size"),
            compress_ops: desc("compress_ops", "compress operations"),
            compress_ops_ok: desc("compress_ops_ok", "compress operations ok"),
            compress_time: desc("compress_time", "compression time"),
            uncompress_ops: desc("uncompress_ops", "uncompress operations"),
            uncompress_time: desc("uncompress_time", "uncompression time"),
        }
    }

    /// All six descriptors, in column order.
    pub fn all(&self) -> [&Desc<1>; 6] {
        [
            &self.page_size,
            &self.compress_ops,
            &self.compress_ops_ok,
            &self.compress_time,
            &self.uncompress_ops,
            &self.uncompress_time,
        ]
    }

    /// One gauge per descriptor, labelled with the record's page size.
    pub fn samples(&self, record: &CompressionRecord) -> [Sample; 6] {
        let page_size = record.page_size.to_string();
        let gauge = |desc: &Desc<1>, value: u64| desc.gauge(value as f64, [page_size.clone()]);

        [
            gauge(&self.page_size, record.page_size),
            gauge(&self.compress_ops, record.compress_ops),
            gauge(&self.compress_ops_ok, record.compress_ops_ok),
            gauge(&self.compress_time, record.compress_time),
            gauge(&self.uncompress_ops, record.uncompress_ops),
            gauge(&self.uncompress_time, record.uncompress_time),
        ]
    }
}

/// Collector for the InnoDB compression views.
///
/// Descriptors are built once in [`InnodbCmpCollector::new`] and never
/// change afterwards; scrapes only read them.
#[derive(Debug, Clone)]
pub struct InnodbCmpCollector {
    cumulative: CmpDescs,
    reset: CmpDescs,
}

impl Default for InnodbCmpCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl InnodbCmpCollector {
    pub fn new() -> Self {
        Self {
            cumulative: CmpDescs::new(CompressionView::Cumulative),
            reset: CmpDescs::new(CompressionView::Reset),
        }
    }

    pub fn descs(&self, view: CompressionView) -> &CmpDescs {
        match view {
            CompressionView::Cumulative => &self.cumulative,
            CompressionView::Reset => &self.reset,
        }
    }

    /// Collects from `information_schema.innodb_cmp`.
    pub fn scrape_compression_counters<S, K>(
        &self,
        source: &mut S,
        sink: &mut K,
    ) -> Result<(), CollectError>
    where
        S: QuerySource,
        K: SampleSink + ?Sized,
    {
        self.scrape(CompressionView::Cumulative, source, sink)
    }

    /// Collects from `information_schema.innodb_cmp_reset`.
    pub fn scrape_compression_counters_reset<S, K>(
        &self,
        source: &mut S,
        sink: &mut K,
    ) -> Result<(), CollectError>
    where
        S: QuerySource,
        K: SampleSink + ?Sized,
    {
        self.scrape(CompressionView::Reset, source, sink)
    }

    /// Query, then for each row emit all of its samples before fetching the next.
    ///
    /// Returns the first error. Samples of rows before the failing one stay
    /// emitted.
    pub fn scrape<S, K>(
        &self,
        view: CompressionView,
        source: &mut S,
        sink: &mut K,
    ) -> Result<(), CollectError>
    where
        S: QuerySource,
        K: SampleSink + ?Sized,
    {
        let descs = self.descs(view);
        let mut rows = open(source, view)?;

        for record in &mut rows {
            let record = record?;
            for sample in descs.samples(&record) {
                sink.send(sample)
                    .map_err(|_| CollectError::SinkClosed { view: view.table() })?;
            }
        }

        debug!(view = view.table(), rows = rows.rows_read(), "compression counters collected");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::{MockSource, compression_row};
    use mysql::Value;
    use std::collections::HashSet;
    use std::sync::mpsc;

    const CMP: &str = "information_schema.innodb_cmp";
    const CMP_RESET: &str = "information_schema.innodb_cmp_reset";

    fn scrape(collector: &InnodbCmpCollector, source: &mut MockSource) -> Vec<Sample> {
        let mut samples: Vec<Sample> = Vec::new();
        collector
            .scrape_compression_counters(source, &mut samples)
            .unwrap();
        samples
    }

    fn as_tuples(samples: &[Sample]) -> Vec<(String, f64, String)> {
        samples
            .iter()
            .map(|s| {
                (
                    s.fq_name().to_string(),
                    s.value(),
                    s.label("page_size").unwrap_or_default().to_string(),
                )
            })
            .collect()
    }

    #[test]
    fn single_row_yields_six_labelled_gauges() {
        let mut source = MockSource::new();
        source.add_row(CMP, compression_row(4096, 10, 9, 5, 3, 2));

        let samples = scrape(&InnodbCmpCollector::new(), &mut source);

        let expected = [
            ("mysql_info_schema_cmp_page_size", 4096.0),
            ("mysql_info_schema_cmp_compress_ops", 10.0),
            ("mysql_info_schema_cmp_compress_ops_ok", 9.0),
            ("mysql_info_schema_cmp_compress_time", 5.0),
            ("mysql_info_schema_uncompress_ops", 3.0),
            ("mysql_info_schema_uncompress_time", 2.0),
        ]
        .map(|(name, value)| (name.to_string(), value, "4096".to_string()));
        assert_eq!(as_tuples(&samples), expected);
        assert!(samples.iter().all(|s| s.label_names() == ["page_size"]));
    }

    #[test]
    fn emits_six_samples_per_row() {
        let mut source = MockSource::new();
        let page_sizes = [1024, 2048, 4096, 8192, 16384];
        source.add_rows(
            CMP,
            page_sizes.map(|p| compression_row(p, p / 2, p / 4, 1, 2, 3)),
        );

        let samples = scrape(&InnodbCmpCollector::new(), &mut source);

        assert_eq!(samples.len(), 6 * page_sizes.len());
        for (chunk, page_size) in samples.chunks(6).zip(page_sizes) {
            for sample in chunk {
                assert_eq!(sample.label("page_size"), Some(page_size.to_string().as_str()));
            }
        }
    }

    #[test]
    fn repeated_scrapes_of_unchanged_view_are_identical() {
        let collector = InnodbCmpCollector::new();
        let mut source = MockSource::typical_compression();

        let first = scrape(&collector, &mut source);
        let second = scrape(&collector, &mut source);

        assert_eq!(first, second);
        assert_eq!(source.close_count(), 2);
    }

    #[test]
    fn emits_decreasing_values_as_read() {
        let collector = InnodbCmpCollector::new();
        let mut source = MockSource::new();
        source.add_row(CMP, compression_row(4096, 500, 490, 20, 80, 4));
        let before = scrape(&collector, &mut source);

        // Server restarted: counters start over.
        source.set_rows(CMP, [compression_row(4096, 3, 3, 0, 1, 0)]);
        let after = scrape(&collector, &mut source);

        assert_eq!(before[1].value(), 500.0);
        assert_eq!(after[1].value(), 3.0);
        assert_eq!(after[4].value(), 1.0);
    }

    #[test]
    fn decode_error_on_third_row_keeps_earlier_samples() {
        let mut source = MockSource::new();
        source.add_row(CMP, compression_row(1024, 1, 1, 0, 0, 0));
        source.add_row(CMP, compression_row(2048, 2, 2, 0, 0, 0));
        let mut bad = compression_row(4096, 3, 3, 0, 0, 0);
        bad[1] = Value::Bytes(b"n/a".to_vec());
        source.add_row(CMP, bad);
        source.add_row(CMP, compression_row(8192, 4, 4, 0, 0, 0));

        let mut samples: Vec<Sample> = Vec::new();
        let err = InnodbCmpCollector::new()
            .scrape_compression_counters(&mut source, &mut samples)
            .unwrap_err();

        assert_eq!(samples.len(), 12);
        let labels: HashSet<&str> = samples.iter().filter_map(|s| s.label("page_size")).collect();
        assert_eq!(labels, HashSet::from(["1024", "2048"]));
        match err {
            CollectError::Decode { row, column, .. } => {
                assert_eq!(row, 3);
                assert_eq!(column, "compress_ops");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(source.close_count(), 1);
    }

    #[test]
    fn fetch_error_propagates_and_closes_cursor() {
        let mut source = MockSource::new();
        source.add_row(CMP, compression_row(1024, 1, 1, 0, 0, 0));
        source.add_fetch_error(CMP, "Lost connection to MySQL server during query");

        let mut samples: Vec<Sample> = Vec::new();
        let err = InnodbCmpCollector::new()
            .scrape_compression_counters(&mut source, &mut samples)
            .unwrap_err();

        assert!(matches!(err, CollectError::Query { view: CMP, .. }));
        assert!(err.to_string().contains("Lost connection"));
        assert_eq!(samples.len(), 6);
        assert_eq!(source.close_count(), 1);
    }

    #[test]
    fn query_failure_emits_nothing() {
        let mut source = MockSource::new();
        source.fail_query(CMP, "SELECT command denied to user 'exporter'@'localhost'");

        let mut samples: Vec<Sample> = Vec::new();
        let err = InnodbCmpCollector::new()
            .scrape_compression_counters(&mut source, &mut samples)
            .unwrap_err();

        assert!(!err.is_decode());
        assert!(samples.is_empty());
        assert_eq!(source.close_count(), 0);
    }

    #[test]
    fn cursor_closed_once_on_success_and_on_empty_view() {
        let collector = InnodbCmpCollector::new();

        let mut source = MockSource::typical_compression();
        scrape(&collector, &mut source);
        assert_eq!(source.close_count(), 1);

        let mut empty = MockSource::new();
        assert!(scrape(&collector, &mut empty).is_empty());
        assert_eq!(empty.close_count(), 1);
    }

    #[test]
    fn reset_view_uses_reset_names_and_query() {
        let mut source = MockSource::new();
        source.add_row(CMP_RESET, compression_row(8192, 10, 9, 5, 3, 2));

        let mut samples: Vec<Sample> = Vec::new();
        InnodbCmpCollector::new()
            .scrape_compression_counters_reset(&mut source, &mut samples)
            .unwrap();

        let names: Vec<&str> = samples.iter().map(Sample::fq_name).collect();
        assert_eq!(
            names,
            [
                "mysql_info_schema_cmp_reset_page_size",
                "mysql_info_schema_cmp_reset_compress_ops",
                "mysql_info_schema_cmp_reset_compress_ops_ok",
                "mysql_info_schema_cmp_reset_compress_time",
                "mysql_info_schema_cmp_reset_uncompress_ops",
                "mysql_info_schema_cmp_reset_uncompress_time",
            ]
        );
        assert!(samples[0].help().contains("innodb_cmp_reset"));
        assert!(source.queries()[0].contains("innodb_cmp_reset"));
    }

    #[test]
    fn views_do_not_share_rows() {
        let collector = InnodbCmpCollector::new();
        let mut source = MockSource::new();
        source.add_row(CMP, compression_row(4096, 100, 100, 1, 1, 1));
        source.add_row(CMP_RESET, compression_row(4096, 7, 7, 0, 0, 0));

        let mut cumulative: Vec<Sample> = Vec::new();
        let mut reset: Vec<Sample> = Vec::new();
        collector
            .scrape_compression_counters(&mut source, &mut cumulative)
            .unwrap();
        collector
            .scrape_compression_counters_reset(&mut source, &mut reset)
            .unwrap();

        assert_eq!(cumulative[1].value(), 100.0);
        assert_eq!(reset[1].value(), 7.0);
        assert_eq!(source.queries().len(), 2);
    }

    #[test]
    fn descriptor_names_are_unique_across_views() {
        let collector = InnodbCmpCollector::new();
        let names: HashSet<&str> = [CompressionView::Cumulative, CompressionView::Reset]
            .into_iter()
            .flat_map(|view| collector.descs(view).all().map(Desc::fq_name))
            .collect();
        assert_eq!(names.len(), 12);
    }

    #[test]
    fn closed_channel_aborts_scrape() {
        let mut source = MockSource::typical_compression();
        let (mut tx, rx) = mpsc::channel();
        drop(rx);

        let err = InnodbCmpCollector::new()
            .scrape_compression_counters(&mut source, &mut tx)
            .unwrap_err();

        assert!(matches!(err, CollectError::SinkClosed { .. }));
        assert_eq!(source.close_count(), 1);
    }

    #[test]
    fn channel_receives_every_sample_before_return() {
        let mut source = MockSource::typical_compression();
        let (mut tx, rx) = mpsc::channel();
        InnodbCmpCollector::new()
            .scrape_compression_counters(&mut source, &mut tx)
            .unwrap();
        drop(tx);
        assert_eq!(rx.iter().count(), 12);
    }
}
