//! taskpick - pick the next task from a dependency graph

use std::process::ExitCode;

fn main() -> ExitCode {
    match taskpick::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
