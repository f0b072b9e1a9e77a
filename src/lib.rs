//! # c2pml
//!
//! c2pml is a deterministic, rule-based translator that turns programs
//! written in a restricted C subset into Promela, the input language of
//! the [SPIN](https://spinroot.com/spin/whatispin.html) model checker.
//!
//! The translation is best-effort and syntax-directed: pointers and the
//! heap are flattened onto global backing arrays, functions returning a
//! value are rewritten to use out-parameters, and C control flow is
//! mapped onto Promela's guarded-command constructs. No type checking
//! and no optimization are performed.

mod report;

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use report::Report;

/// c2pml's available commands.
#[deny(missing_docs)]
#[derive(Subcommand)]
enum Commands {
    /// Translate the input and emit the resulting Promela model.
    Translate {
        /// Path of the output file.
        ///
        /// By default, the Promela model is printed to standard output.
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        output: Option<PathBuf>,
    },
    /// Run the translation pipeline for validation only, without emitting
    /// the Promela model.
    Check {
        /// Print a JSON-serialized report.
        ///
        /// By default, c2pml prints a user-friendly report.
        /// On syntax errors the report carries the offending line and
        /// column and the set of expected tokens.
        #[arg(long)]
        json: bool,
    },
}

/// A rule-based C-to-Promela translator.
///
/// c2pml translates programs written in a restricted C subset into
/// Promela models suitable for the SPIN model checker.
#[derive(Parser)]
#[deny(missing_docs)]
#[command(version, about, long_about)]
pub struct Cli {
    /// Path of the C source file, or `-` to read from standard input.
    #[arg(value_hint = clap::ValueHint::FilePath)]
    input: PathBuf,
    /// Warn about source patterns the rewrite passes leave untouched.
    ///
    /// The struct and return-value elimination passes never fail; by
    /// default they silently skip patterns they cannot rewrite, such as a
    /// pointer access whose struct type cannot be inferred.
    #[arg(long)]
    strict: bool,
    /// Verbose output
    #[command(flatten)]
    pub verbosity: clap_verbosity_flag::Verbosity,
    /// Actions to execute on the input.
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        let source = read_input(&self.input)?;
        let options = c2pml_core::TranslateOptions {
            strictness: if self.strict {
                c2pml_core::Strictness::Warn
            } else {
                c2pml_core::Strictness::Lenient
            },
        };
        match self.command {
            Commands::Translate { output } => {
                let promela = c2pml_core::translate_with(&source, &options)
                    .with_context(|| format!("failed to translate '{}'", self.input.display()))?;
                match output {
                    Some(path) => {
                        fs::write(&path, format!("{promela}\n"))
                            .with_context(|| format!("failed to write '{}'", path.display()))?;
                    }
                    None => println!("{promela}"),
                }
                Ok(())
            }
            Commands::Check { json } => {
                let report = Report::new(&self.input, c2pml_core::translate_with(&source, &options));
                report.print(json);
                if !report.valid() {
                    std::process::exit(1);
                }
                Ok(())
            }
        }
    }
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("failed to read standard input")?;
        return Ok(source);
    }
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("c") => {
            fs::read_to_string(path).with_context(|| format!("failed to read '{}'", path.display()))
        }
        _ => bail!("unsupported file format: expected a .c file"),
    }
}

// From Clap tutorial <https://docs.rs/clap/latest/clap/_derive/_tutorial/index.html#testing>
#[test]
fn verify_cli() {
    use clap::CommandFactory;
    Cli::command().debug_assert();
}
