use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use verdict_runtime::{Document, Verdict};

/// Verdict policy engine — evaluates compiled plan bundles.
#[derive(Parser)]
#[command(
    name = "verdict",
    version,
    about,
    long_about = "Verdict policy engine.\n\nEvaluates plan bundles produced by an upstream policy compiler against input and data documents.\n\nExamples:\n  verdict eval bundle.json -e policy/allow -i input.json -d data.json\n  verdict eval bundle.json -e policy/allow --strict\n  verdict plans bundle.json"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Evaluate one entry point of a plan bundle
    Eval {
        /// Path to the plan bundle (JSON)
        bundle: PathBuf,

        /// Entry point to evaluate
        #[arg(short, long)]
        entrypoint: String,

        /// Input document file (defaults to null)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Data document file (defaults to an empty object)
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Abort evaluation on builtin runtime errors
        #[arg(long)]
        strict: bool,
    },

    /// List the entry points of a plan bundle
    Plans {
        /// Path to the plan bundle (JSON)
        bundle: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Eval {
            bundle,
            entrypoint,
            input,
            data,
            strict,
        } => {
            let verdict = match Verdict::builder(&bundle).strict_builtin_errors(strict).build() {
                Ok(v) => v,
                Err(e) => {
                    eprintln!("error: failed to load bundle: {}", e);
                    process::exit(1);
                }
            };

            let input = load_document(input.as_deref(), Document::Null);
            let data = load_document(
                data.as_deref(),
                Document::from_json(&serde_json::json!({})),
            );

            let plan = match verdict.plan(&entrypoint) {
                Ok(p) => p,
                Err(e) => {
                    eprintln!("error: {}", e);
                    process::exit(1);
                }
            };

            match plan.evaluate(&input, &data) {
                Ok(results) => {
                    let json: Vec<serde_json::Value> =
                        results.iter().map(Document::to_json).collect();
                    match serde_json::to_string_pretty(&json) {
                        Ok(s) => println!("{}", s),
                        Err(e) => {
                            eprintln!("error: {}", e);
                            process::exit(1);
                        }
                    }
                }
                Err(e) => {
                    eprintln!("evaluation error: {}", e);
                    process::exit(1);
                }
            }
        }

        Command::Plans { bundle } => {
            let verdict = match Verdict::builder(&bundle).build() {
                Ok(v) => v,
                Err(e) => {
                    eprintln!("error: failed to load bundle: {}", e);
                    process::exit(1);
                }
            };
            for name in verdict.entry_points() {
                println!("{}", name);
            }
        }
    }
}

fn load_document(path: Option<&std::path::Path>, default: Document) -> Document {
    let Some(path) = path else {
        return default;
    };
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("error: failed to read '{}': {}", path.display(), e);
            process::exit(1);
        }
    };
    match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(value) => Document::from_json(&value),
        Err(e) => {
            eprintln!("error: '{}' is not valid JSON: {}", path.display(), e);
            process::exit(1);
        }
    }
}
