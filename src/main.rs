use clap::{Parser, Subcommand};
use colored::Colorize;
use sheetdoc::cli;
use sheetdoc::config::DEFAULT_CONFIG_FILENAME;
use sheetdoc::error::SheetdocError;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sheetdoc")]
#[command(about = "Generate styled Word documents from spreadsheet rows")]
#[command(long_about = "Sheetdoc - spreadsheet to Word document generator

Reads rows from an .xlsx worksheet, substitutes their values into the
placeholders of a .docx template, and writes one styled document per row
(or per configured content column) with timestamped, collision-free
filenames.

COMMANDS:
  generate  - Run the conversion (default when no command is given)
  validate  - Check configuration, source columns and placeholders
  inspect   - List the source workbook's worksheets
  init      - Write an example configuration file

EXAMPLES:
  sheetdoc                              # generate with ./sheetdoc.toml
  sheetdoc generate letters.toml -v     # verbose run
  sheetdoc generate letters.toml -n     # render without writing
  sheetdoc validate letters.toml        # check before running
  sheetdoc init                         # write sheetdoc.toml to adapt

EXIT CODES:
  0  full success
  1  run completed, but rows failed under on_error = \"skip\"
  2  configuration error      3  source read error
  4  template error           5  output write error")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the conversion described by the configuration file
    Generate {
        /// Path to the TOML configuration file
        #[arg(default_value = DEFAULT_CONFIG_FILENAME)]
        config: PathBuf,

        /// Render documents without writing them
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show per-document progress
        #[arg(short, long)]
        verbose: bool,
    },

    /// Check configuration, source columns and template placeholders
    Validate {
        /// Path to the TOML configuration file
        #[arg(default_value = DEFAULT_CONFIG_FILENAME)]
        config: PathBuf,
    },

    /// List the source workbook's worksheets and dimensions
    Inspect {
        /// Path to the TOML configuration file
        #[arg(default_value = DEFAULT_CONFIG_FILENAME)]
        config: PathBuf,
    },

    /// Write an example configuration file to adapt
    Init {
        /// Where to write the example configuration
        #[arg(default_value = DEFAULT_CONFIG_FILENAME)]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let code = match cli.command.unwrap_or(Commands::Generate {
        config: PathBuf::from(DEFAULT_CONFIG_FILENAME),
        dry_run: false,
        verbose: false,
    }) {
        Commands::Generate {
            config,
            dry_run,
            verbose,
        } => match cli::generate(config, dry_run, verbose) {
            Ok(summary) if summary.is_clean() => 0,
            Ok(_) => 1,
            Err(error) => report(error),
        },
        Commands::Validate { config } => exit_code(cli::validate(config)),
        Commands::Inspect { config } => exit_code(cli::inspect(config)),
        Commands::Init { path, force } => exit_code(cli::init(path, force)),
    };
    std::process::exit(code);
}

fn exit_code(result: Result<(), SheetdocError>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(error) => report(error),
    }
}

fn report(error: SheetdocError) -> i32 {
    eprintln!("{} {}", "❌".red(), error);
    error.exit_code()
}
