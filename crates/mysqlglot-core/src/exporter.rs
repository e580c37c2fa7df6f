//! One scrape pass across all enabled scrapers.
//!
//! The exporter opens a connection per pass, runs every scraper into a local
//! sample buffer, adds its own health gauges and encodes the result in the
//! Prometheus text format. A failing scraper only marks itself unsuccessful;
//! samples it emitted before failing are kept, and other scrapers still run.

use std::collections::BTreeMap;
use std::time::Instant;

use prometheus::proto::MetricFamily;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::collector::{Connector, Desc, NAMESPACE, Sample, Scraper};

const EXPORTER: &str = "exporter";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("metrics encoding failed: {0}")]
    Encode(#[from] prometheus::Error),
    #[error("encoded metrics are not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub struct Exporter<C: Connector> {
    connector: C,
    scrapers: Vec<Box<dyn Scraper<C::Source>>>,
    up: Desc<0>,
    scrape_duration: Desc<1>,
    scrape_success: Desc<1>,
}

impl<C: Connector> Exporter<C> {
    pub fn new(connector: C, scrapers: Vec<Box<dyn Scraper<C::Source>>>) -> Self {
        Self {
            connector,
            scrapers,
            up: Desc::new(NAMESPACE, "", "up", "Whether the MySQL server is up.", []),
            scrape_duration: Desc::new(
                NAMESPACE,
                EXPORTER,
                "collector_duration_seconds",
                "Collector time duration.",
                ["collector"],
            ),
            scrape_success: Desc::new(
                NAMESPACE,
                EXPORTER,
                "collector_success",
                "mysql_exporter: Whether a collector succeeded.",
                ["collector"],
            ),
        }
    }

    /// Names of the scrapers run on every pass.
    pub fn scraper_names(&self) -> Vec<&'static str> {
        self.scrapers.iter().map(|s| s.name()).collect()
    }

    /// Runs one pass and returns every sample, health gauges included.
    pub fn collect(&self) -> Vec<Sample> {
        let mut samples: Vec<Sample> = Vec::new();

        let mut source = match self.connector.connect() {
            Ok(source) => source,
            Err(e) => {
                error!(error = %e, "failed to connect to MySQL");
                samples.push(self.up.gauge(0.0, []));
                return samples;
            }
        };
        samples.push(self.up.gauge(1.0, []));

        for scraper in &self.scrapers {
            let started = Instant::now();
            let before = samples.len();
            let result = scraper.scrape(&mut source, &mut samples);
            let elapsed = started.elapsed();

            let success = match result {
                Ok(()) => {
                    debug!(
                        collector = scraper.name(),
                        samples = samples.len() - before,
                        duration_ms = elapsed.as_millis() as u64,
                        "scrape succeeded"
                    );
                    1.0
                }
                Err(e) => {
                    warn!(
                        collector = scraper.name(),
                        samples = samples.len() - before,
                        error = %e,
                        "scrape failed"
                    );
                    0.0
                }
            };

            let collector = scraper.name().to_string();
            samples.push(
                self.scrape_duration
                    .gauge(elapsed.as_secs_f64(), [collector.clone()]),
            );
            samples.push(self.scrape_success.gauge(success, [collector]));
        }

        samples
    }

    pub fn gather(&self) -> Result<Vec<MetricFamily>, ExportError> {
        Ok(encode_samples(&self.collect())?)
    }

    /// Runs one pass and renders it in the text exposition format.
    pub fn render(&self) -> Result<String, ExportError> {
        let families = self.gather()?;
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Content type of [`Exporter::render`] output.
pub fn content_type() -> String {
    TextEncoder::new().format_type().to_string()
}

/// Groups samples by metric name into families on a throwaway registry.
pub fn encode_samples(samples: &[Sample]) -> Result<Vec<MetricFamily>, prometheus::Error> {
    let mut families: BTreeMap<&str, GaugeVec> = BTreeMap::new();

    for sample in samples {
        if !families.contains_key(sample.fq_name()) {
            let gauges = GaugeVec::new(
                Opts::new(sample.fq_name(), sample.help()),
                sample.label_names(),
            )?;
            families.insert(sample.fq_name(), gauges);
        }
        let values: Vec<&str> = sample.label_values().iter().map(String::as_str).collect();
        families[sample.fq_name()]
            .get_metric_with_label_values(&values)?
            .set(sample.value());
    }

    let registry = Registry::new();
    for gauges in families.into_values() {
        registry.register(Box::new(gauges))?;
    }
    Ok(registry.gather())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::default_scrapers;
    use crate::collector::mock::{MockConnector, MockSource, compression_row};

    fn exporter(connector: MockConnector) -> Exporter<MockConnector> {
        Exporter::new(connector, default_scrapers())
    }

    #[test]
    fn render_includes_compression_and_health_metrics() {
        let connector = MockConnector::new(MockSource::typical_compression());
        let text = exporter(connector.clone()).render().unwrap();

        assert!(text.contains("mysql_up 1"));
        assert!(text.contains("mysql_info_schema_cmp_compress_ops{page_size=\"4096\"} 1520"));
        assert!(text.contains("mysql_info_schema_cmp_reset_compress_ops{page_size=\"8192\"} 1050"));
        assert!(text.contains("# TYPE mysql_info_schema_uncompress_time gauge"));
        assert!(
            text.contains("mysql_exporter_collector_success{collector=\"info_schema.innodb_cmp\"} 1")
        );
        assert_eq!(connector.close_count(), 2);
    }

    #[test]
    fn unreachable_server_reports_down_only() {
        let samples = exporter(MockConnector::unreachable("connection refused")).collect();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].fq_name(), "mysql_up");
        assert_eq!(samples[0].value(), 0.0);
    }

    #[test]
    fn failing_scraper_does_not_affect_others() {
        let mut source = MockSource::new();
        source.add_row(
            "information_schema.innodb_cmp",
            compression_row(4096, 10, 9, 5, 3, 2),
        );
        source.fail_query("information_schema.innodb_cmp_reset", "Unknown table");

        let samples = exporter(MockConnector::new(source)).collect();

        let success = |collector: &str| {
            samples
                .iter()
                .find(|s| {
                    s.fq_name() == "mysql_exporter_collector_success"
                        && s.label("collector") == Some(collector)
                })
                .map(Sample::value)
        };
        assert_eq!(success("info_schema.innodb_cmp"), Some(1.0));
        assert_eq!(success("info_schema.innodb_cmp_reset"), Some(0.0));
        assert_eq!(
            samples
                .iter()
                .filter(|s| s.fq_name().starts_with("mysql_info_schema_"))
                .count(),
            6
        );
    }

    #[test]
    fn encode_samples_groups_by_name() {
        let mut source = MockSource::typical_compression();
        let mut samples: Vec<Sample> = Vec::new();
        crate::collector::InnodbCmpCollector::new()
            .scrape_compression_counters(&mut source, &mut samples)
            .unwrap();

        let families = encode_samples(&samples).unwrap();
        assert_eq!(families.len(), 6);
        assert!(families.iter().all(|f| f.get_metric().len() == 2));
    }

    #[test]
    fn encode_samples_rejects_conflicting_label_sets() {
        let labelled = Desc::new(NAMESPACE, "test", "pages", "Pages.", ["page_size"]);
        let bare = Desc::new(NAMESPACE, "test", "pages", "Pages.", []);
        let samples = [labelled.gauge(1.0, ["4096".to_string()]), bare.gauge(2.0, [])];

        assert!(encode_samples(&samples).is_err());
    }

    #[test]
    fn scraper_names_follow_registration_order() {
        let exporter = exporter(MockConnector::default());
        assert_eq!(
            exporter.scraper_names(),
            ["info_schema.innodb_cmp", "info_schema.innodb_cmp_reset"]
        );
    }

    #[test]
    fn content_type_is_text_format() {
        assert!(content_type().starts_with("text/plain"));
    }
}
