use clap::Parser;
use tracing_subscriber::EnvFilter;

use droptidy::cli::{self, Cli};
use droptidy::output::OutputFormatter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("droptidy=info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = cli::run(cli) {
        OutputFormatter::error(&e);
        std::process::exit(1);
    }
}
