//! eden: Open Service Broker command-line client
//!
//! Commands:
//! - catalog: Show available service catalog
//! - provision: Create new service instance
//! - bind: Generate credentials for service instance
//! - unbind: Remove credentials for service instance
//! - update: Change parameters of a service instance
//! - deprovision: Destroy service instance
//! - services: List recorded service instances
//! - credentials: Display credentials of a binding
//! - rename: Rename a recorded service instance

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use eden_broker::OpenServiceBroker;
use eden_cli::commands::{
    self, bind::BindArgs, catalog::CatalogArgs, credentials::CredentialsArgs,
    provision::ProvisionArgs, rename::RenameArgs, unbind::UnbindArgs, update::UpdateArgs, Output,
};
use eden_cli::Config;
use eden_registry::Registry;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "eden")]
#[command(about = "Interact with any Open Service Broker API", version)]
struct Cli {
    /// Show verbose debug information
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Service instance name/ID
    #[arg(short, long, env = "EDEN_SERVICE", global = true)]
    instance: Option<String>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    /// Registry file (default: ~/.eden/config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Open Service Broker URL
    #[arg(long, global = true)]
    url: Option<String>,

    /// Override username or UAA client
    #[arg(long, global = true)]
    client: Option<String>,

    /// Override password or UAA client secret
    #[arg(long, global = true)]
    client_secret: Option<String>,

    /// Open Service Broker API version
    #[arg(long, global = true)]
    api_version: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show available service catalog
    #[command(visible_aliases = ["c", "inventory", "inv"])]
    Catalog(CatalogArgs),

    /// Create new service instance
    #[command(visible_alias = "p")]
    Provision(ProvisionArgs),

    /// Generate credentials for service instance
    #[command(visible_alias = "b")]
    Bind(BindArgs),

    /// Remove credentials for service instance
    #[command(visible_alias = "u")]
    Unbind(UnbindArgs),

    /// Change parameters of a service instance
    Update(UpdateArgs),

    /// Destroy service instance
    #[command(visible_alias = "d")]
    Deprovision,

    /// List recorded service instances
    #[command(visible_alias = "s")]
    Services,

    /// Display credentials of a binding
    #[command(visible_alias = "creds")]
    Credentials(CredentialsArgs),

    /// Rename a recorded service instance
    Rename(RenameArgs),
}

impl Cli {
    /// Environment configuration with command-line overrides applied
    fn resolve_config(&self) -> Result<Config> {
        let mut config = Config::from_env()?;
        if let Some(url) = &self.url {
            config.broker_url = url.clone();
        }
        if let Some(client) = &self.client {
            config.broker_client = client.clone();
        }
        if let Some(secret) = &self.client_secret {
            config.broker_client_secret = secret.clone();
        }
        if let Some(version) = &self.api_version {
            config.api_version = version.clone();
        }
        if let Some(path) = &self.config {
            config.registry_path = path.clone();
        }
        Ok(config)
    }
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn,eden=info,eden_cli=info,eden_registry=info,eden_broker=info",
        _ => "debug",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn broker_for(config: &Config) -> Result<OpenServiceBroker> {
    config.validate_broker()?;
    debug!("Using broker {}", config.broker_url);
    Ok(OpenServiceBroker::new(
        &config.broker_url,
        &config.broker_client,
        &config.broker_client_secret,
        &config.api_version,
    ))
}

fn load_registry(config: &Config) -> Result<Registry> {
    Registry::load(config.registry_path.clone()).with_context(|| {
        format!(
            "Could not load registry {}",
            config.registry_path.display()
        )
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.resolve_config()?;
    let poll = config.poll_settings();
    let instance = cli.instance.as_deref();

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let mut out = Output::new(&mut handle, cli.json);

    match &cli.command {
        Commands::Catalog(args) => {
            let broker = broker_for(&config)?;
            commands::catalog::run(&broker, args, &mut out).await?
        }
        Commands::Provision(args) => {
            let broker = broker_for(&config)?;
            let mut registry = load_registry(&config)?;
            commands::provision::run(&broker, &mut registry, poll, instance, args, &mut out)
                .await?
        }
        Commands::Bind(args) => {
            let broker = broker_for(&config)?;
            let mut registry = load_registry(&config)?;
            commands::bind::run(&broker, &mut registry, instance, args, &mut out).await?
        }
        Commands::Unbind(args) => {
            let broker = broker_for(&config)?;
            let mut registry = load_registry(&config)?;
            commands::unbind::run(&broker, &mut registry, instance, args, &mut out).await?
        }
        Commands::Update(args) => {
            let broker = broker_for(&config)?;
            let registry = load_registry(&config)?;
            commands::update::run(&broker, &registry, poll, instance, args, &mut out).await?
        }
        Commands::Deprovision => {
            let broker = broker_for(&config)?;
            let mut registry = load_registry(&config)?;
            commands::deprovision::run(&broker, &mut registry, poll, instance, &mut out).await?
        }
        Commands::Services => {
            let registry = load_registry(&config)?;
            commands::services::run(&registry, instance, &mut out)?
        }
        Commands::Credentials(args) => {
            let registry = load_registry(&config)?;
            commands::credentials::run(&registry, instance, args, &mut out)?
        }
        Commands::Rename(args) => {
            let mut registry = load_registry(&config)?;
            commands::rename::run(&mut registry, instance, args, &mut out)?
        }
    }

    handle.flush()?;
    Ok(())
}
