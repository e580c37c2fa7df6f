//! MySQL metrics collectors.
//!
//! Every collector follows the same shape: declare descriptors once, run one
//! fixed query, decode rows lazily, and push samples into a [`SampleSink`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Scraper                           │
//! │  ┌────────────────────┐     ┌─────────────────────────┐  │
//! │  │ InnodbCmpCollector │     │  Desc<N> (descriptors)  │  │
//! │  │  - innodb_cmp      │────▶│  built once, read-only  │  │
//! │  │  - innodb_cmp_reset│     └─────────────────────────┘  │
//! │  └─────────┬──────────┘                                  │
//! │            │ query / rows            samples             │
//! │     ┌──────▼──────┐             ┌──────────────┐         │
//! │     │ QuerySource │ (trait)     │  SampleSink  │ (trait) │
//! │     └──────┬──────┘             └──────────────┘         │
//! └────────────┼─────────────────────────────────────────────┘
//!              │
//!       ┌──────┴───────┐
//!       │              │
//! ┌─────▼──────┐ ┌─────▼──────┐
//! │ PooledConn │ │ MockSource │
//! │  (mysql)   │ │ (Testing)  │
//! └────────────┘ └────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use mysqlglot_core::collector::{InnodbCmpCollector, Sample};
//! use mysqlglot_core::collector::mock::MockSource;
//!
//! let mut source = MockSource::typical_compression();
//! let collector = InnodbCmpCollector::new();
//! let mut samples: Vec<Sample> = Vec::new();
//! collector
//!     .scrape_compression_counters(&mut source, &mut samples)
//!     .unwrap();
//! assert_eq!(samples.len(), 6 * 2);
//! ```

pub mod desc;
mod error;
pub mod innodb_cmp;
pub mod mock;
pub mod sample;
pub mod scraper;
pub mod traits;

pub use desc::{Desc, INFORMATION_SCHEMA, NAMESPACE, build_fq_name};
pub use error::CollectError;
pub use innodb_cmp::{CompressionRecord, CompressionRows, CompressionView, InnodbCmpCollector};
pub use sample::{Sample, SampleSink, ValueType};
pub use scraper::{InnodbCmp, InnodbCmpReset, Scraper, default_scrapers};
pub use traits::{Connector, QuerySource, RowCursor, SourceError};
