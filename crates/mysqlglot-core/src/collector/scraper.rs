//! Scraper registry entries.
//!
//! A [`Scraper`] is one named unit of collection the exporter can enable or
//! disable. Names follow the `<schema>.<table>` form used by the
//! `--collect.*` flags.

use std::sync::Arc;

use super::error::CollectError;
use super::innodb_cmp::InnodbCmpCollector;
use super::sample::SampleSink;
use super::traits::QuerySource;

pub trait Scraper<S: QuerySource>: Send + Sync {
    /// Registry name, e.g. `info_schema.innodb_cmp`.
    fn name(&self) -> &'static str;

    /// Whether the scraper runs when no flag says otherwise.
    fn enabled_by_default(&self) -> bool {
        true
    }

    fn scrape(&self, source: &mut S, sink: &mut dyn SampleSink) -> Result<(), CollectError>;
}

/// Collects from `information_schema.innodb_cmp`.
#[derive(Debug, Clone)]
pub struct InnodbCmp {
    collector: Arc<InnodbCmpCollector>,
}

impl InnodbCmp {
    pub fn new(collector: Arc<InnodbCmpCollector>) -> Self {
        Self { collector }
    }
}

impl<S: QuerySource> Scraper<S> for InnodbCmp {
    fn name(&self) -> &'static str {
        "info_schema.innodb_cmp"
    }

    fn scrape(&self, source: &mut S, sink: &mut dyn SampleSink) -> Result<(), CollectError> {
        self.collector.scrape_compression_counters(source, sink)
    }
}

/// Collects from `information_schema.innodb_cmp_reset`.
#[derive(Debug, Clone)]
pub struct InnodbCmpReset {
    collector: Arc<InnodbCmpCollector>,
}

impl InnodbCmpReset {
    pub fn new(collector: Arc<InnodbCmpCollector>) -> Self {
        Self { collector }
    }
}

impl<S: QuerySource> Scraper<S> for InnodbCmpReset {
    fn name(&self) -> &'static str {
        "info_schema.innodb_cmp_reset"
    }

    fn scrape(&self, source: &mut S, sink: &mut dyn SampleSink) -> Result<(), CollectError> {
        self.collector.scrape_compression_counters_reset(source, sink)
    }
}

/// Every known scraper, sharing one set of descriptors.
pub fn default_scrapers<S: QuerySource + 'static>() -> Vec<Box<dyn Scraper<S>>> {
    let collector = Arc::new(InnodbCmpCollector::new());
    vec![
        Box::new(InnodbCmp::new(Arc::clone(&collector))),
        Box::new(InnodbCmpReset::new(collector)),
    ]
}
