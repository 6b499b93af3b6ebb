use clap::Parser;
use tracing_subscriber::EnvFilter;

use strain_caller::cli;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("strain_caller=debug,info")
    } else {
        EnvFilter::new("strain_caller=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        cli::Commands::Call(args) => {
            cli::call::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::View(args) => {
            cli::view::run(args, cli.format, cli.verbose)?;
        }
    }

    Ok(())
}
