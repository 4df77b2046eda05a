mod cli;

use crate::cli::DualpxArguments;
use anyhow::Result;
use clap::Parser;
use dualpx::{proxy, socks};
use log::{LevelFilter, info, trace};

#[tokio::main]
async fn main() -> Result<()> {
    let args = DualpxArguments::parse();
    pretty_env_logger::env_logger::builder()
        .format_timestamp(None)
        .filter_level(if args.verbose { LevelFilter::Trace } else { LevelFilter::Info })
        .init();

    trace!("Arguments: {:#?}", args);
    let config = args.load_config().await?;

    // Handle command line subcommands
    args.handle_arguments(&config);

    info!("Starting dualpx");

    // Run the HTTP proxy and the SOCKS5 endpoint concurrently
    tokio::try_join!(proxy::start_http_proxy(&config), socks::start_socks_server(&config))?;

    Ok(())
}
