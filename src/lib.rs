//! form2txt - Extract narrative text from Excel securities reports
//!
//! This crate walks a directory tree of Excel workbooks (`.xls` / `.xlsx`), finds
//! the narrative sheets of each report by name, and writes their body text to
//! plain-text files. Body text is a border-free string cell in column A; tables
//! drawn in the same column carry a left border and are skipped.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use form2txt::ConverterBuilder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Create a converter with default settings
//!     let converter = ConverterBuilder::new().build()?;
//!
//!     // Convert every workbook under `input/` into `out/`, mirroring the tree
//!     let summary = converter.tree().convert_all(Path::new("input"), Path::new("out"))?;
//!     println!("{} converted, {} skipped", summary.converted, summary.skipped);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Custom Configuration
//!
//! ```rust,no_run
//! use std::path::Path;
//! use form2txt::{CandidateSheetNames, ConverterBuilder, LineEnding, OutputLayout};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = ConverterBuilder::new()
//!         .with_candidate_sheets(CandidateSheetNames::new(["事業の状況", "対処すべき課題"]))
//!         .with_layout(OutputLayout::Flattened)  // out/<parent>_<name>.txt
//!         .with_line_ending(LineEnding::Lf)
//!         .build()?;
//!
//!     converter.convert_file(Path::new("input/A/report.xlsx"), Path::new("A_report.txt"))?;
//!     Ok(())
//! }
//! ```
//!
//! # Convert to String
//!
//! ```rust,no_run
//! use std::fs::File;
//! use form2txt::ConverterBuilder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = ConverterBuilder::new().build()?;
//!     let input = File::open("report.xls")?;
//!
//!     // `None` when the workbook has none of the candidate sheets
//!     if let Some(text) = converter.convert_to_string(input)? {
//!         print!("{}", text);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod api;
mod builder;
mod classifier;
mod error;
mod extractor;
mod normalizer;
mod parser;
mod security;
mod tree;
mod types;

// 公開API
pub use api::{CandidateSheetNames, ConversionOutcome, LineEnding, OutputLayout, TreeSummary};
pub use builder::{Converter, ConverterBuilder};
pub use classifier::is_printable;
pub use error::Form2TxtError;
pub use extractor::{extract_lines, SheetLines};
pub use normalizer::normalize;
pub use parser::Workbook;
pub use tree::{accept_entry, is_spreadsheet_name, output_file_name, TreeConverter};
pub use types::{CellKind, ConversionTask, Sheet, SheetRow, SpreadsheetCell};
