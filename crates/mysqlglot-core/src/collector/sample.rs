//! Metric samples and the sink they are delivered to.

use std::sync::Arc;
use std::sync::mpsc::{Sender, SyncSender};

use thiserror::Error;

use super::desc::DescInfo;

/// Value semantics of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Instantaneous snapshot, independent of previous observations.
    Gauge,
}

/// One point-in-time observation of a metric.
///
/// Built only through [`Desc::gauge`](super::Desc::gauge), which keeps the
/// label values in step with the descriptor's label names.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    desc: Arc<DescInfo>,
    value_type: ValueType,
    value: f64,
    label_values: Vec<String>,
}

impl Sample {
    pub(super) fn new(
        desc: Arc<DescInfo>,
        value_type: ValueType,
        value: f64,
        label_values: Vec<String>,
    ) -> Self {
        debug_assert_eq!(desc.variable_labels.len(), label_values.len());
        Self {
            desc,
            value_type,
            value,
            label_values,
        }
    }

    pub fn fq_name(&self) -> &str {
        &self.desc.fq_name
    }

    pub fn help(&self) -> &str {
        &self.desc.help
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn label_names(&self) -> &[&'static str] {
        &self.desc.variable_labels
    }

    pub fn label_values(&self) -> &[String] {
        &self.label_values
    }

    /// `(name, value)` label pairs in declaration order.
    pub fn labels(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.desc
            .variable_labels
            .iter()
            .copied()
            .zip(self.label_values.iter().map(String::as_str))
    }

    /// Value of the label called `name`, if the descriptor declares it.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels().find(|(n, _)| *n == name).map(|(_, v)| v)
    }
}

/// The receiving side of a sink is gone.
#[derive(Debug, Error)]
#[error("sample sink closed")]
pub struct SinkClosed;

/// Destination for samples produced by a scrape.
///
/// Append-only. Once a sample is handed over the collector never touches it
/// again.
pub trait SampleSink {
    fn send(&mut self, sample: Sample) -> Result<(), SinkClosed>;
}

impl SampleSink for Vec<Sample> {
    fn send(&mut self, sample: Sample) -> Result<(), SinkClosed> {
        self.push(sample);
        Ok(())
    }
}

impl SampleSink for Sender<Sample> {
    fn send(&mut self, sample: Sample) -> Result<(), SinkClosed> {
        Sender::send(self, sample).map_err(|_| SinkClosed)
    }
}

impl SampleSink for SyncSender<Sample> {
    fn send(&mut self, sample: Sample) -> Result<(), SinkClosed> {
        SyncSender::send(self, sample).map_err(|_| SinkClosed)
    }
}

impl<S: SampleSink + ?Sized> SampleSink for &mut S {
    fn send(&mut self, sample: Sample) -> Result<(), SinkClosed> {
        (**self).send(sample)
    }
}
