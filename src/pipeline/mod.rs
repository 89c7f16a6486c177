//! Conversion pipeline - sequences reader, template engine and writer
//!
//! Data flows one way: configuration → source rows → rendered documents
//! → output files. Configuration, template-load and source-open failures
//! abort before anything is written; per-unit failures follow the
//! configured abort-or-skip policy.

use crate::config::{Config, ErrorPolicy, Grouping};
use crate::docx::{AppendParagraph, Substitution, TemplateEngine};
use crate::error::{SheetdocError, SheetdocResult};
use crate::excel::SheetReader;
use crate::output::{Clock, OutputWriter};
use crate::types::{Failure, GeneratedDocument, Row, RunSummary};
use colored::Colorize;

/// Run a full conversion. With `dry_run` documents are rendered but not
/// persisted; the summary still counts them.
pub fn run(
    config: &Config,
    clock: &dyn Clock,
    verbose: bool,
    dry_run: bool,
) -> SheetdocResult<RunSummary> {
    let engine = TemplateEngine::load(&config.template.path)?;
    let required = config.required_columns();
    let reader = SheetReader::open(&config.source, &required)?;
    let author = if config.output.set_author {
        Some(current_user())
    } else {
        None
    };
    let mut writer = if dry_run {
        None
    } else {
        Some(OutputWriter::create(&config.output, clock)?)
    };

    let mut summary = RunSummary::default();
    match config.output.document_per {
        Grouping::Row => run_per_row(
            config,
            &engine,
            &reader,
            &mut writer,
            author.as_deref(),
            verbose,
            &mut summary,
        )?,
        Grouping::Column => run_per_column(
            config,
            &engine,
            &reader,
            &mut writer,
            author.as_deref(),
            verbose,
            &mut summary,
        )?,
    }

    Ok(summary)
}

/// Default mode: every non-skipped row becomes exactly one document.
#[allow(clippy::too_many_arguments)]
fn run_per_row(
    config: &Config,
    engine: &TemplateEngine,
    reader: &SheetReader,
    writer: &mut Option<OutputWriter>,
    author: Option<&str>,
    verbose: bool,
    summary: &mut RunSummary,
) -> SheetdocResult<()> {
    let mut rows = reader.rows();
    for row in rows.by_ref() {
        summary.rows_processed += 1;
        let unit = format!("row {}", row.index);
        let result = render_row(config, engine, &row, author)
            .and_then(|document| persist(writer, &document, verbose, summary));
        if let Err(error) = result {
            note_failure(config.output.on_error, summary, unit, error)?;
        }
    }
    summary.rows_skipped = rows.skipped();
    Ok(())
}

/// Build the substitutions for one row and render its document.
fn render_row(
    config: &Config,
    engine: &TemplateEngine,
    row: &Row,
    author: Option<&str>,
) -> SheetdocResult<GeneratedDocument> {
    let mut subs = Vec::with_capacity(config.mapping.bindings.len());
    for binding in &config.mapping.bindings {
        let value = row.get(&binding.column).ok_or_else(|| {
            SheetdocError::template_at_row(
                row.index,
                format!("column '{}' is missing from the row", binding.column),
            )
        })?;
        subs.push(Substitution {
            marker: binding.placeholder.clone(),
            content: value.format(binding.format.as_deref()),
            style: binding.style.clone(),
        });
    }

    let outcome = engine.render(&subs, &[], author)?;
    if !outcome.unmatched.is_empty() {
        return Err(SheetdocError::template_at_row(
            row.index,
            format!(
                "placeholder(s) {} have no matching location in the template",
                outcome.unmatched.join(", ")
            ),
        ));
    }

    let name = document_name(config, row);
    Ok(GeneratedDocument {
        name,
        bytes: outcome.bytes,
    })
}

/// Value of the {name} token for a row: the name column when configured
/// and non-blank, the static output name otherwise.
fn document_name(config: &Config, row: &Row) -> String {
    if let Some(ref column) = config.output.name_column {
        if let Some(value) = row.get(column) {
            if !value.is_blank() {
                return value.format(None);
            }
        }
    }
    config.output.name.clone()
}

/// By-columns mode: one document per configured content column, every
/// row contributing a replace or append instruction.
#[allow(clippy::too_many_arguments)]
fn run_per_column(
    config: &Config,
    engine: &TemplateEngine,
    reader: &SheetReader,
    writer: &mut Option<OutputWriter>,
    author: Option<&str>,
    verbose: bool,
    summary: &mut RunSummary,
) -> SheetdocResult<()> {
    let marker_column = config.source.marker_column.as_ref().ok_or_else(|| {
        SheetdocError::Config("source.marker_column is required in column mode".to_string())
    })?;

    let mut iter = reader.rows();
    let rows: Vec<Row> = iter.by_ref().collect();
    summary.rows_processed = rows.len();
    summary.rows_skipped = iter.skipped();

    for entry in &config.source.content_columns {
        let unit = format!("column '{}'", entry.column);
        let mut subs: Vec<Substitution> = Vec::new();
        let mut appends: Vec<AppendParagraph> = Vec::new();

        for row in &rows {
            let command = match instruction_command(config, row) {
                Some(command) => command,
                None => continue,
            };
            let content = row
                .get(&entry.column)
                .map(|v| v.format(None))
                .unwrap_or_default();
            let style = instruction_style(config, row);

            if command.contains("replace_paragraph") {
                let marker = row
                    .get(marker_column)
                    .map(|v| v.format(None))
                    .unwrap_or_default();
                if marker.trim().is_empty() {
                    warn(
                        summary,
                        format!("row {} has an empty marker cell, ignored", row.index),
                    );
                    continue;
                }
                subs.push(Substitution {
                    marker,
                    content,
                    style,
                });
            } else if command.contains("add_paragraph") {
                if !content.is_empty() {
                    appends.push(AppendParagraph { content, style });
                }
            } else {
                warn(
                    summary,
                    format!("row {} has unknown command '{}', ignored", row.index, command),
                );
            }
        }

        let result = engine
            .render(&subs, &appends, author)
            .and_then(|outcome| {
                for marker in &outcome.unmatched {
                    warn(
                        summary,
                        format!("marker '{}' not found in template for {}", marker, unit),
                    );
                }
                persist(
                    writer,
                    &GeneratedDocument {
                        name: entry.name.clone(),
                        bytes: outcome.bytes,
                    },
                    verbose,
                    summary,
                )
            });
        if let Err(error) = result {
            note_failure(config.output.on_error, summary, unit, error)?;
        }
    }
    Ok(())
}

/// The row's command in column mode. `None` means the row is ignored
/// (no command cell), mirroring the source workbook convention of
/// leaving scratch rows uncommanded.
fn instruction_command(config: &Config, row: &Row) -> Option<String> {
    match config.source.command_column {
        Some(ref column) => match row.get(column) {
            Some(value) if !value.is_blank() => Some(value.format(None)),
            _ => None,
        },
        None => Some("replace_paragraph".to_string()),
    }
}

/// The row's style in column mode; the literal "None" keeps the
/// template style, like an empty cell.
fn instruction_style(config: &Config, row: &Row) -> Option<String> {
    let column = config.source.style_column.as_ref()?;
    let value = row.get(column)?;
    if value.is_blank() {
        return None;
    }
    let style = value.format(None);
    if style == "None" {
        None
    } else {
        Some(style)
    }
}

fn persist(
    writer: &mut Option<OutputWriter>,
    document: &GeneratedDocument,
    verbose: bool,
    summary: &mut RunSummary,
) -> SheetdocResult<()> {
    match writer {
        Some(writer) => {
            let path = writer.write(document)?;
            summary.documents_written += 1;
            if verbose {
                println!("   📄 {}", path.display().to_string().cyan());
            }
        }
        None => {
            summary.documents_written += 1;
            if verbose {
                println!("   📄 {} {}", document.name.cyan(), "(dry run)".yellow());
            }
        }
    }
    Ok(())
}

fn note_failure(
    policy: ErrorPolicy,
    summary: &mut RunSummary,
    unit: String,
    error: SheetdocError,
) -> SheetdocResult<()> {
    match policy {
        ErrorPolicy::Abort => Err(error),
        ErrorPolicy::Skip => {
            eprintln!("{} {}: {}", "⚠️".yellow(), unit, error);
            summary.failures.push(Failure {
                unit,
                message: error.to_string(),
            });
            Ok(())
        }
    }
}

fn warn(summary: &mut RunSummary, message: String) {
    eprintln!("{} {}", "⚠️".yellow(), message);
    summary.warnings += 1;
}

/// The invoking user, stamped into generated documents' core properties.
fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
