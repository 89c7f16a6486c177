//! Excel source access - opening workbooks and yielding rows

pub mod reader;

pub use reader::{inspect, SheetReader, WorksheetInfo};
