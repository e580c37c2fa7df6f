//! Metric descriptors.
//!
//! A [`Desc`] is the static identity of one exposed metric: fully-qualified
//! name, help text and label names. Descriptors are built once when a
//! collector is created and shared read-only by every scrape.

use std::fmt;
use std::sync::Arc;

use prometheus::Opts;

use super::sample::{Sample, ValueType};

/// Metric namespace shared by every collector of the exporter.
pub const NAMESPACE: &str = "mysql";

/// Subsystem for collectors reading `information_schema` views.
pub const INFORMATION_SCHEMA: &str = "info_schema";

/// Joins the non-empty parts with `_`, as the client library does.
///
/// `build_fq_name("mysql", "info_schema", "cmp_page_size")` yields
/// `mysql_info_schema_cmp_page_size`.
pub fn build_fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    Opts::new(name, "")
        .namespace(namespace)
        .subsystem(subsystem)
        .fq_name()
}

/// Type-erased descriptor data carried by every [`Sample`].
#[derive(Debug, PartialEq, Eq)]
pub struct DescInfo {
    pub fq_name: String,
    pub help: String,
    pub variable_labels: Vec<&'static str>,
}

/// Metric descriptor with `N` variable labels.
///
/// The label arity is part of the type, so a sample can only be built with
/// exactly as many label values as the descriptor declares.
#[derive(Clone, PartialEq, Eq)]
pub struct Desc<const N: usize> {
    info: Arc<DescInfo>,
}

impl<const N: usize> Desc<N> {
    pub fn new(
        namespace: &str,
        subsystem: &str,
        name: &str,
        help: impl Into<String>,
        variable_labels: [&'static str; N],
    ) -> Self {
        let opts = Opts::new(name, help)
            .namespace(namespace)
            .subsystem(subsystem);
        Self {
            info: Arc::new(DescInfo {
                fq_name: opts.fq_name(),
                help: opts.help,
                variable_labels: variable_labels.to_vec(),
            }),
        }
    }

    pub fn fq_name(&self) -> &str {
        &self.info.fq_name
    }

    pub fn help(&self) -> &str {
        &self.info.help
    }

    pub fn variable_labels(&self) -> &[&'static str] {
        &self.info.variable_labels
    }

    /// Builds a gauge sample for this descriptor.
    pub fn gauge(&self, value: f64, label_values: [String; N]) -> Sample {
        Sample::new(
            Arc::clone(&self.info),
            ValueType::Gauge,
            value,
            label_values.into(),
        )
    }
}

impl<const N: usize> fmt::Debug for Desc<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Desc")
            .field("fq_name", &self.info.fq_name)
            .field("help", &self.info.help)
            .field("variable_labels", &self.info.variable_labels)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_fq_name_joins_parts() {
        assert_eq!(
            build_fq_name(NAMESPACE, INFORMATION_SCHEMA, "cmp_page_size"),
            "mysql_info_schema_cmp_page_size"
        );
    }

    #[test]
    fn build_fq_name_skips_empty_parts() {
        assert_eq!(build_fq_name("mysql", "", "up"), "mysql_up");
        assert_eq!(build_fq_name("", "", "up"), "up");
        assert_eq!(build_fq_name("", "exporter", "up"), "exporter_up");
    }

    #[test]
    fn desc_name_matches_registered_gauge_name() {
        let desc = Desc::new(NAMESPACE, INFORMATION_SCHEMA, "uncompress_ops", "help", ["page_size"]);
        let gauges = prometheus::GaugeVec::new(
            Opts::new("uncompress_ops", "help")
                .namespace(NAMESPACE)
                .subsystem(INFORMATION_SCHEMA),
            desc.variable_labels(),
        )
        .unwrap();
        let registered = prometheus::core::Collector::desc(&gauges);
        assert_eq!(registered[0].fq_name, desc.fq_name());
        assert_eq!(desc.help(), "help");
    }

    #[test]
    fn gauge_pairs_label_values_with_names() {
        let desc = Desc::new("mysql", "info_schema", "cmp_compress_ops", "help", ["page_size"]);
        let sample = desc.gauge(10.0, ["4096".to_string()]);

        assert_eq!(sample.fq_name(), "mysql_info_schema_cmp_compress_ops");
        assert_eq!(sample.value(), 10.0);
        assert_eq!(sample.value_type(), ValueType::Gauge);
        assert_eq!(
            sample.labels().collect::<Vec<_>>(),
            vec![("page_size", "4096")]
        );
    }

    #[test]
    fn cloned_desc_shares_identity() {
        let desc = Desc::new("mysql", "", "up", "Whether MySQL is reachable.", []);
        let clone = desc.clone();
        assert_eq!(desc, clone);
        assert_eq!(clone.fq_name(), "mysql_up");
        assert!(clone.variable_labels().is_empty());
    }
}
