#![forbid(unsafe_code)]

//! mds: More Disk Space CLI entry point.

use std::io::{self, Write};

use clap::Parser;

mod cli_app;

fn main() {
    let args = cli_app::Cli::parse();
    if let Err(e) = cli_app::run(&args) {
        // Either stream may already be closed; reporting must not panic.
        if cli_app::wants_json(&args) {
            let _ = writeln!(io::stdout(), "{}", cli_app::error_payload(&e));
        }
        let _ = writeln!(io::stderr(), "mds: {e}");
        std::process::exit(e.exit_code());
    }
}
