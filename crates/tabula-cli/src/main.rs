//! Interactive expression calculator.
//!
//! Reads lines at a prompt: assignments (`name = expr`) define symbols in
//! a dependency-tracked table, bare expressions evaluate against it, and
//! `.`-prefixed directives inspect it (`.defs`, `.vals`, `.clear`).

mod complete;
mod render;
mod repl;

use clap::Parser;
use std::process;
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "tabula")]
#[command(about = "Interactive expression calculator with a dependency-tracked symbol table")]
struct Args {
    /// Disable ANSI colour and highlighting in diagnostic output
    #[arg(long)]
    no_color: bool,
}

/// Initialize logging with a default filter.
///
/// Use the `RUST_LOG` environment variable to override the default.
/// Events go to stderr so they never interleave with prompt output.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,tabula_calc=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();

    let args = Args::parse();
    if let Err(err) = repl::run(!args.no_color) {
        error!("terminal error: {err}");
        process::exit(1);
    }
}
