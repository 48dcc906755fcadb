#[macro_use]
mod errors;
mod console;
mod repl;
mod storage;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use storage::Table;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "mysqlite", version = VERSION, about = "Tiny SQL database.")]
struct Cli {
    /// Path to the database file; created if it does not already exist.
    dbfile: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let Some(dbfile) = cli.dbfile else {
        eprintln!("Must supply a database filename.");
        return ExitCode::from(1);
    };

    let table = match Table::open(&dbfile) {
        Ok(table) => table,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(1);
        }
    };

    ExitCode::from(repl::run_stdin(table) as u8)
}
