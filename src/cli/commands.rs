use crate::config::{self, Config, Grouping};
use crate::docx::TemplateEngine;
use crate::error::{SheetdocError, SheetdocResult};
use crate::excel::{self, SheetReader};
use crate::output::SystemClock;
use crate::pipeline;
use crate::types::RunSummary;
use colored::Colorize;
use std::path::PathBuf;

/// Execute the generate command
pub fn generate(config_path: PathBuf, dry_run: bool, verbose: bool) -> SheetdocResult<RunSummary> {
    println!("{}", "📄 Sheetdoc - Generating documents".bold().green());
    println!("   Config: {}", config_path.display());
    println!();

    if dry_run {
        println!(
            "{}",
            "📋 DRY RUN MODE - No documents will be written\n".yellow()
        );
    }

    let config = Config::load(&config_path)?;

    if verbose {
        println!("{}", "🔧 Configuration:".cyan());
        println!("   Source:    {}", config.source.path.display());
        println!("   Worksheet: {}", config.source.worksheet);
        println!("   Template:  {}", config.template.path.display());
        println!("   Output:    {}", config.output.directory.display());
        println!("   Pattern:   {}", config.output.pattern);
        match config.output.document_per {
            Grouping::Row => println!(
                "   Mapping:   {} binding(s), one document per row",
                config.mapping.bindings.len()
            ),
            Grouping::Column => println!(
                "   Mapping:   {} content column(s), one document each",
                config.source.content_columns.len()
            ),
        }
        println!();
    }

    let summary = pipeline::run(&config, &SystemClock, verbose, dry_run)?;

    println!();
    println!("{}", "✅ Run complete".bold().green());
    println!("   Rows processed:    {}", summary.rows_processed);
    println!("   Rows skipped:      {}", summary.rows_skipped);
    println!("   Documents written: {}", summary.documents_written);
    if summary.warnings > 0 {
        println!(
            "   Warnings:          {}",
            summary.warnings.to_string().yellow()
        );
    }
    if !summary.failures.is_empty() {
        println!(
            "   Failures:          {}",
            summary.failures.len().to_string().red()
        );
        for failure in &summary.failures {
            println!("      {} {}", failure.unit.red(), failure.message);
        }
    }

    Ok(summary)
}

/// Execute the validate command - check configuration, source header
/// and template placeholders without writing anything
pub fn validate(config_path: PathBuf) -> SheetdocResult<()> {
    println!("{}", "🔍 Sheetdoc - Validating configuration".bold().green());
    println!("   Config: {}\n", config_path.display());

    let config = Config::load(&config_path)?;
    println!("   {} configuration parses and paths exist", "✔".green());

    let engine = TemplateEngine::load(&config.template.path)?;
    println!("   {} template loads", "✔".green());

    let reader = SheetReader::open(&config.source, &config.required_columns())?;
    println!(
        "   {} worksheet '{}' provides all configured columns",
        "✔".green(),
        config.source.worksheet
    );

    match config.output.document_per {
        Grouping::Row => {
            let markers: Vec<String> = config
                .mapping
                .bindings
                .iter()
                .map(|b| b.placeholder.clone())
                .collect();
            let missing = engine.missing_markers(&markers)?;
            if !missing.is_empty() {
                return Err(SheetdocError::Template(format!(
                    "placeholder(s) {} have no matching location in the template",
                    missing.join(", ")
                )));
            }
            println!(
                "   {} all {} placeholder(s) found in template",
                "✔".green(),
                markers.len()
            );
        }
        Grouping::Column => {
            // Markers come from cells in column mode; report the absent
            // ones without failing, matching the lenient generation path.
            if let Some(ref marker_column) = config.source.marker_column {
                let markers: Vec<String> = reader
                    .rows()
                    .filter_map(|row| row.get(marker_column).map(|v| v.format(None)))
                    .filter(|marker| !marker.trim().is_empty())
                    .collect();
                let missing = engine.missing_markers(&markers)?;
                for marker in &missing {
                    println!(
                        "   {} marker '{}' not found in template",
                        "⚠".yellow(),
                        marker
                    );
                }
                println!(
                    "   {} {} of {} row marker(s) found in template",
                    "✔".green(),
                    markers.len() - missing.len(),
                    markers.len()
                );
            }
        }
    }

    println!("\n{}", "✅ Configuration is valid".bold().green());
    Ok(())
}

/// Execute the inspect command - list the source workbook's worksheets
pub fn inspect(config_path: PathBuf) -> SheetdocResult<()> {
    let config = Config::load(&config_path)?;

    println!("{}", "📊 Sheetdoc - Worksheets".bold().green());
    println!("   Source: {}\n", config.source.path.display());

    for info in excel::inspect(&config.source.path)? {
        let marker = if info.name == config.source.worksheet {
            " ← configured worksheet".green().to_string()
        } else {
            String::new()
        };
        println!(
            "   {} ({} rows × {} columns){}",
            info.name.bright_blue().bold(),
            info.rows,
            info.columns,
            marker
        );
    }
    Ok(())
}

/// Execute the init command - write the example configuration file
pub fn init(path: PathBuf, force: bool) -> SheetdocResult<()> {
    config::write_example(&path, force)?;
    println!(
        "{} Example configuration written to '{}'",
        "✅".green(),
        path.display()
    );
    println!("   Adapt the paths, worksheet and bindings to your workbook.");
    Ok(())
}
