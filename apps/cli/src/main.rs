//! opds-export CLI: turn a course spreadsheet into a static OPDS catalog.
//!
//! Reads one workbook and writes an index, one catalog per grade sheet and
//! one manifest per lesson row.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
