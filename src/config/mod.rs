//! Configuration loading and validation
//!
//! The configuration is a TOML file with `[source]`, `[template]`,
//! `[output]` and `[mapping]` sections, read once at startup into an
//! immutable [`Config`].

use crate::error::{SheetdocError, SheetdocResult};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Conventional configuration filename looked up in the current directory.
pub const DEFAULT_CONFIG_FILENAME: &str = "sheetdoc.toml";

/// Tokens the output filename pattern may use.
pub const PATTERN_TOKENS: [&str; 4] = ["name", "date", "time", "seq"];

/// Top-level configuration record. Read-only for the process lifetime.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub source: SourceConfig,
    pub template: TemplateConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub mapping: MappingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Path to the .xlsx workbook providing content
    pub path: PathBuf,
    /// Worksheet to read
    pub worksheet: String,
    /// 1-based row of the used range holding column names
    #[serde(default = "default_header_row")]
    pub header_row: usize,
    /// Columns that decide whether a row is blank. Empty list: a row is
    /// blank only when every cell is.
    #[serde(default)]
    pub key_columns: Vec<String>,
    /// What to do with a blank row: skip it or stop reading
    #[serde(default)]
    pub on_blank: BlankRowPolicy,
    /// Column-mode only: column holding the text marker to replace
    pub marker_column: Option<String>,
    /// Column-mode only: column naming the paragraph style to apply
    pub style_column: Option<String>,
    /// Column-mode only: column holding the per-row command
    /// (`replace_paragraph` or `add_paragraph`)
    pub command_column: Option<String>,
    /// Column-mode only: one generated document per entry
    #[serde(default)]
    pub content_columns: Vec<ContentColumn>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateConfig {
    /// Path to the .docx used as the styling skeleton
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Directory generated documents are written to (created if absent)
    pub directory: PathBuf,
    /// Filename pattern; supports {name}, {date}, {time} and {seq}
    #[serde(default = "default_pattern")]
    pub pattern: String,
    /// Value of the {name} token
    #[serde(default = "default_name")]
    pub name: String,
    /// Row-mode only: column overriding the {name} token per row
    pub name_column: Option<String>,
    /// Grouping: one document per row, or one per content column
    #[serde(default)]
    pub document_per: Grouping,
    /// Row-level failure policy
    #[serde(default)]
    pub on_error: ErrorPolicy,
    /// How many sequence bumps to try when a target filename already
    /// exists on disk
    #[serde(default = "default_collision_retries")]
    pub collision_retries: u32,
    /// Stamp the invoking user into the document's core properties
    #[serde(default = "default_true")]
    pub set_author: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingConfig {
    /// Ordered column-to-placeholder bindings (row mode)
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

/// One column-to-placeholder binding.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Binding {
    /// Source column providing the substitution content
    pub column: String,
    /// Literal text marker to locate in the template
    pub placeholder: String,
    /// chrono format string for date cells
    pub format: Option<String>,
    /// Paragraph style applied to the replaced paragraph
    pub style: Option<String>,
}

/// Column-mode output unit: one document generated from one content column.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentColumn {
    /// Source column providing the substitution content
    pub column: String,
    /// Value of the {name} token for this document
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlankRowPolicy {
    /// Filter the blank row and keep reading
    #[default]
    Skip,
    /// Treat the blank row as end-of-data
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grouping {
    /// One generated document per data row
    #[default]
    Row,
    /// One generated document per configured content column, rows acting
    /// as replace/append instructions
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Stop the run on the first row-level failure
    #[default]
    Abort,
    /// Record the failure, log it, continue with the next row
    Skip,
}

fn default_header_row() -> usize {
    1
}

fn default_pattern() -> String {
    "{name}_{date}_{time}.docx".to_string()
}

fn default_name() -> String {
    "document".to_string()
}

fn default_collision_retries() -> u32 {
    100
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> SheetdocResult<Config> {
        let content = fs::read_to_string(path).map_err(|e| {
            SheetdocError::Config(format!(
                "Failed to read configuration file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config = Config::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration TOML without touching the filesystem.
    pub fn parse(content: &str) -> SheetdocResult<Config> {
        toml::from_str(content).map_err(|e| SheetdocError::Config(e.to_string()))
    }

    /// Check cross-field constraints and that referenced files exist.
    pub fn validate(&self) -> SheetdocResult<()> {
        if !self.source.path.is_file() {
            return Err(SheetdocError::Config(format!(
                "source.path '{}' does not exist",
                self.source.path.display()
            )));
        }
        if !self.template.path.is_file() {
            return Err(SheetdocError::Config(format!(
                "template.path '{}' does not exist",
                self.template.path.display()
            )));
        }
        if self.source.worksheet.trim().is_empty() {
            return Err(SheetdocError::Config(
                "source.worksheet must not be empty".to_string(),
            ));
        }
        if self.source.header_row == 0 {
            return Err(SheetdocError::Config(
                "source.header_row is 1-based and must be at least 1".to_string(),
            ));
        }
        validate_pattern(&self.output.pattern)?;

        match self.output.document_per {
            Grouping::Row => {
                if self.mapping.bindings.is_empty() {
                    return Err(SheetdocError::Config(
                        "mapping.bindings must list at least one {column, placeholder} pair"
                            .to_string(),
                    ));
                }
                for binding in &self.mapping.bindings {
                    if binding.column.trim().is_empty() || binding.placeholder.trim().is_empty() {
                        return Err(SheetdocError::Config(
                            "mapping.bindings entries need a non-empty column and placeholder"
                                .to_string(),
                        ));
                    }
                }
            }
            Grouping::Column => {
                if self.source.marker_column.is_none() {
                    return Err(SheetdocError::Config(
                        "source.marker_column is required when output.document_per = \"column\""
                            .to_string(),
                    ));
                }
                if self.source.content_columns.is_empty() {
                    return Err(SheetdocError::Config(
                        "source.content_columns must list at least one {column, name} entry \
                         when output.document_per = \"column\""
                            .to_string(),
                    ));
                }
                for entry in &self.source.content_columns {
                    if entry.column.trim().is_empty() || entry.name.trim().is_empty() {
                        return Err(SheetdocError::Config(
                            "source.content_columns entries need a non-empty column and name"
                                .to_string(),
                        ));
                    }
                }
            }
        }

        Ok(())
    }

    /// Every column name the source worksheet header must provide.
    pub fn required_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        let mut push = |name: &str| {
            if !columns.iter().any(|c| c == name) {
                columns.push(name.to_string());
            }
        };

        match self.output.document_per {
            Grouping::Row => {
                for binding in &self.mapping.bindings {
                    push(&binding.column);
                }
                if let Some(ref name_column) = self.output.name_column {
                    push(name_column);
                }
            }
            Grouping::Column => {
                if let Some(ref marker) = self.source.marker_column {
                    push(marker);
                }
                if let Some(ref style) = self.source.style_column {
                    push(style);
                }
                if let Some(ref command) = self.source.command_column {
                    push(command);
                }
                for entry in &self.source.content_columns {
                    push(&entry.column);
                }
            }
        }
        for key in &self.source.key_columns {
            push(key);
        }
        columns
    }
}

/// Reject filename patterns with unknown or unclosed tokens.
pub fn validate_pattern(pattern: &str) -> SheetdocResult<()> {
    if pattern.trim().is_empty() {
        return Err(SheetdocError::Config(
            "output.pattern must not be empty".to_string(),
        ));
    }
    let mut rest = pattern;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let end = after.find('}').ok_or_else(|| {
            SheetdocError::Config(format!("output.pattern '{}' has an unclosed '{{'", pattern))
        })?;
        let token = &after[..end];
        if !PATTERN_TOKENS.contains(&token) {
            return Err(SheetdocError::Config(format!(
                "output.pattern token '{{{}}}' is not one of {{name}}, {{date}}, {{time}}, {{seq}}",
                token
            )));
        }
        rest = &after[end + 1..];
    }
    if rest.contains('}') {
        return Err(SheetdocError::Config(format!(
            "output.pattern '{}' has an unmatched '}}'",
            pattern
        )));
    }
    Ok(())
}

/// Commented example configuration written by `sheetdoc init`.
pub const EXAMPLE_CONFIG: &str = r#"# sheetdoc configuration.
# Adapt the paths, worksheet and bindings to your workbook.

[source]
path = "sourceData.xlsx"
worksheet = "Content"
# 1-based row of the used range holding the column names.
header_row = 1
# Rows where all key columns are blank are skipped ("skip") or end the
# run ("stop"). With no key columns, a row counts as blank only when
# every cell is.
key_columns = ["CustomerName"]
on_blank = "skip"

[template]
path = "template.docx"

[output]
directory = "generated"
# Tokens: {name} {date} {time} {seq}
pattern = "{name}_{seq}_{date}_{time}.docx"
name = "letter"
# document_per = "row"    : one document per data row (default)
# document_per = "column" : one document per source.content_columns entry,
#                           rows acting as replace/append instructions
document_per = "row"
# "abort" stops at the first failing row, "skip" records it and continues.
on_error = "abort"

[mapping]
bindings = [
    { column = "CustomerName", placeholder = "{{CUSTOMER}}" },
    { column = "Date", placeholder = "{{DATE}}", format = "%d.%m.%Y" },
    { column = "Body", placeholder = "{{BODY}}", style = "BodyText" },
]
"#;

/// Write the example configuration to `path`.
pub fn write_example(path: &Path, force: bool) -> SheetdocResult<()> {
    if path.exists() && !force {
        return Err(SheetdocError::Config(format!(
            "'{}' already exists (pass --force to overwrite)",
            path.display()
        )));
    }
    fs::write(path, EXAMPLE_CONFIG).map_err(|e| {
        SheetdocError::Config(format!("Failed to write '{}': {}", path.display(), e))
    })
}
