use std::process::ExitCode;

use clap::Parser;
use ngflags::cli::{Arguments, ExitStatus};
use ngflags::logging::init_tracing;

fn main() -> ExitCode {
    let args = Arguments::parse();
    init_tracing(args.verbosity());

    match ngflags::cli::run_cli(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitStatus::Error.into()
        }
    }
}
