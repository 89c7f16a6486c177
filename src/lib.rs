//! Sheetdoc - generate Word documents from spreadsheet rows
//!
//! This library reads rows from an .xlsx worksheet, substitutes their
//! values into the text placeholders of a .docx template, and writes one
//! styled document per row (or per configured content column) with
//! timestamped, collision-free filenames.
//!
//! # Features
//!
//! - TOML configuration mapping columns to template placeholders
//! - Paragraph-level substitution across body, tables, headers, footers
//! - Optional paragraph style override per binding
//! - Filename patterns with {name}, {date}, {time} and {seq} tokens
//! - Injected clock for deterministic, testable output naming
//!
//! # Example
//!
//! ```no_run
//! use sheetdoc::config::Config;
//! use sheetdoc::output::SystemClock;
//! use sheetdoc::pipeline;
//! use std::path::Path;
//!
//! let config = Config::load(Path::new("sheetdoc.toml"))?;
//! let summary = pipeline::run(&config, &SystemClock, false, false)?;
//!
//! println!("{} documents written", summary.documents_written);
//! # Ok::<(), sheetdoc::error::SheetdocError>(())
//! ```

pub mod cli;
pub mod config;
pub mod docx;
pub mod error;
pub mod excel;
pub mod output;
pub mod pipeline;
pub mod types;

// Re-export commonly used types
pub use error::{SheetdocError, SheetdocResult};
pub use types::{CellValue, GeneratedDocument, Row, RunSummary};
