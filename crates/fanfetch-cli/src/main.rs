mod cli;

use crate::cli::CliCommand;

#[tokio::main]
async fn main() {
    // Logging is initialized inside, once `-v` is known.
    if let Err(err) = CliCommand::run_from_args().await {
        eprintln!("fanfetch error: {:#}", err);
        std::process::exit(1);
    }
}
