//! relpack - package compiled binaries into release archives and installers.

use relpack::cli::{self, OutputManager};
use std::process;

fn main() {
    let args = cli::parse_args();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    match cli::run(args) {
        Ok(exit_code) => {
            process::exit(exit_code);
        }
        Err(e) => {
            let output = OutputManager::new(false);
            output.error(&format!("Fatal error: {e}"));
            process::exit(1);
        }
    }
}
