//! Core library for threadsplit
//!
//! This crate implements the **Functional Core** of threadsplit: it turns the
//! text lines extracted from a co-parenting message-thread export into one
//! record per message. It performs no I/O. PDF decoding lives in the `pdf`
//! crate; reading inputs and writing outputs lives in the `threadsplit`
//! binary (the Imperative Shell).
//!
//! # Pipeline
//!
//! ```text
//! Vec<Line> -> noise::filter_noise -> segment::segment -> record::build_record -> render
//! ```
//!
//! - [`noise`]: drops report titles, page numbers, rules and message counters
//!   found at page edges.
//! - [`segment`]: partitions lines into message blocks at anchored header
//!   lines. [`segment::is_boundary_anchor`] is the rule separating real
//!   boundaries from quoted headers.
//! - [`record`]: parses each block's header and collects body and attachments.
//! - [`render`]: serializes records and names output files.
//!
//! All patterns come from [`config::SplitConfig`], compiled once into a
//! [`config::CompiledConfig`] and passed explicitly.
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use threadsplit_core::{split_lines, Line, SplitConfig};
//!
//! let config = SplitConfig::default().compile()?;
//! let lines = Line::collect(vec![(1, vec!["03/14/2023 10:15 AM - Alice", "Hello"])]);
//! let outcome = split_lines(lines, &config)?;
//! assert_eq!(outcome.records.len(), 1);
//! ```

pub mod config;
pub mod error;
pub mod header;
pub mod line;
pub mod noise;
pub mod pipeline;
pub mod record;
pub mod render;
pub mod segment;

pub use config::{CompiledConfig, SplitConfig};
pub use error::{SplitError, SplitWarning};
pub use line::Line;
pub use pipeline::{check_input_size, split_lines, SplitOutcome};
pub use record::MessageRecord;
pub use render::OutputFile;
