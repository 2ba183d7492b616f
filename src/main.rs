//! prlink CLI entry point.

use clap::Parser;

use prlink::cli::context::load_config;
use prlink::cli::{commands, handle_error, Cli, Commands};
use prlink::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => handle_error(err, cli.json),
    };

    let _logger = match LogConfig::try_from(&config.logging)
        .map_err(anyhow::Error::from)
        .and_then(|log_config| LoggerImpl::init(&log_config))
    {
        Ok(logger) => logger,
        Err(err) => handle_error(err, cli.json),
    };

    let result = match cli.command {
        Commands::Serve(args) => commands::serve::execute(args, &config, cli.json).await,
        Commands::Extract(args) => commands::extract::execute(args, cli.json),
        Commands::Record(args) => commands::record::execute(args, &config, cli.json).await,
        Commands::LinkPr(args) => commands::link::execute(args, &config, cli.json).await,
        Commands::Unlink(args) => commands::unlink::execute(args, &config, cli.json).await,
        Commands::Prs(args) => commands::prs::execute(args, &config, cli.json).await,
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}
