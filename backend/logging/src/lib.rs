//! Structured logging setup for StreamAudit.
//!
//! Console output on stderr (stdout carries reports) plus an optional daily
//! rolling NDJSON file.

pub mod logger;

pub use logger::{build_filter, init_logger, LOG_FILE_PREFIX};
