//! filesig CLI: hash every regular file under a directory.

use clap::Parser;
use filesig::engine::arg_parser::Cli;
use filesig::engine::cli::{exit_code_for, handle_run};
use std::process::ExitCode;
use std::time::Instant;

fn main() -> ExitCode {
    let start_time = Instant::now();
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let code = match handle_run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(exit_code_for(&err))
        }
    };
    log::debug!("Total time: {:?}", start_time.elapsed());
    code
}
