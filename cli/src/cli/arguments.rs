use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use dualpx::config::{ConfigOverrides, ProxyConfig};
use log::debug;

#[derive(Parser, Debug, Clone)]
#[command(name = "dualpx", about, author, version, long_about = None, propagate_version = true)]
pub struct DualpxArguments {
    #[arg(short = 'c', long = "config", help = "Path to a JSON configuration file (created with defaults if missing)")]
    pub(crate) config_path: Option<String>,
    #[arg(short = 'v', long = "verbose", help = "Enable verbose logging")]
    pub(crate) verbose: bool,
    #[clap(flatten)]
    pub(crate) listeners: ListenerArgs,
    #[command(subcommand)]
    pub(crate) command: Option<DualpxCommands>,
}

// Optional listener settings. Only provided flags override the configuration file.
#[derive(Args, Debug, Clone, Default)]
pub struct ListenerArgs {
    /// Address both listeners bind to (e.g. 0.0.0.0 or 127.0.0.1)
    #[arg(short = 'b', long = "bind")]
    pub bind_address: Option<String>,
    /// Port of the HTTP proxy (default 8080)
    #[arg(long = "http-port")]
    pub http_port: Option<u16>,
    /// Port of the SOCKS5 endpoint (default 8085)
    #[arg(long = "socks-port")]
    pub socks_port: Option<u16>,
    /// Do not start the SOCKS5 endpoint
    #[arg(long = "no-socks", action = ArgAction::SetTrue)]
    pub no_socks: bool,
    /// Give up dialing a CONNECT destination after this many seconds (0 disables the limit)
    #[arg(long = "connect-timeout")]
    pub connect_timeout: Option<u64>,
}

impl From<ListenerArgs> for ConfigOverrides {
    fn from(args: ListenerArgs) -> Self {
        ConfigOverrides {
            bind_address: args.bind_address,
            http_port: args.http_port,
            socks_port: args.socks_port,
            socks_enabled: if args.no_socks { Some(false) } else { None },
            connect_timeout_secs: args.connect_timeout,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum DualpxCommands {
    #[clap(name = "config", about = "Inspect the configuration")]
    Config {
        #[clap(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    #[clap(name = "show", about = "Show the effective configuration")]
    Show,
    #[clap(name = "show-path", about = "Show the path to the configuration file")]
    ShowPath,
}

impl DualpxArguments {
    /// Load the configuration file (or defaults), apply command line overrides and validate
    pub async fn load_config(&self) -> Result<ProxyConfig> {
        let mut config = ProxyConfig::resolve(self.config_path.clone()).await?;
        config.apply(self.listeners.clone().into());
        debug!("Effective configuration: {:?}", config);
        config.validate()?;
        Ok(config)
    }

    /// Run a one-shot subcommand and exit; does nothing when no subcommand was given
    pub fn handle_arguments(&self, config: &ProxyConfig) {
        if let Some(command) = &self.command {
            match command {
                DualpxCommands::Config { command } => match command {
                    ConfigCommands::Show => {
                        println!("{}", config);
                    }
                    ConfigCommands::ShowPath => match config.get_path() {
                        Some(path) => println!("{}", path.to_string_lossy()),
                        None => println!("No configuration file in use (built-in defaults)"),
                    },
                },
            }
            // Exit after the command has been executed
            std::process::exit(0);
        }
    }
}
