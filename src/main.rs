//! optica entry point
//!
//! Parses the command line, runs the selected command, prints any error to
//! stderr and exits non-zero on failure. All logic lives in the CLI module.

use optica::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
