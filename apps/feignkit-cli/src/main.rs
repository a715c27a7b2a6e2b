use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use feignkit::{
    AsyncClient, BoxError, Client, ComponentCatalog, ConfigurationStore, EffectiveConfigView,
    FeignClientsRegistrar, FeignProperties, Request, RequestOptions, Response, TransportProvider,
};

/// Inspect and validate feign client configuration
#[derive(Parser)]
#[command(name = "feignkit")]
#[command(about = "Inspect and validate feign client configuration")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Accept unknown interceptor and capability names
    #[arg(long)]
    lenient: bool,

    /// Let a later client declaration replace an earlier one with the same context id
    #[arg(long)]
    allow_override: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every declared client and report its aliases
    Check,
    /// Print the loaded properties and each client's effective configuration as JSON
    PrintConfig,
}

/// Transport that refuses to send anything; building clients needs one.
struct Offline;

impl Client for Offline {
    fn execute(&self, request: Request, _options: &RequestOptions) -> Result<Response, BoxError> {
        Err(format!("offline: {} {}", request.method, request.url).into())
    }
}

#[async_trait::async_trait]
impl AsyncClient for Offline {
    async fn execute(
        &self,
        request: Request,
        _options: &RequestOptions,
    ) -> Result<Response, BoxError> {
        Err(format!("offline: {} {}", request.method, request.url).into())
    }
}

impl TransportProvider for Offline {
    fn client(&self, _context_id: &str) -> Result<Arc<dyn Client>, BoxError> {
        Ok(Arc::new(Offline))
    }

    fn async_client(&self, _context_id: &str) -> Result<Arc<dyn AsyncClient>, BoxError> {
        Ok(Arc::new(Offline))
    }
}

#[derive(Serialize)]
struct ClientReport {
    context_id: String,
    name: String,
    target_url: String,
    is_async: bool,
    aliases: BTreeSet<String>,
    effective: EffectiveConfigView,
}

#[derive(Serialize)]
struct ConfigReport<'a> {
    properties: &'a FeignProperties,
    clients: Vec<ClientReport>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let props = FeignProperties::load(cli.config.as_deref()).context("failed to load config")?;
    let catalog = if cli.lenient {
        ComponentCatalog::permissive()
    } else {
        ComponentCatalog::new()
    };

    let store = Arc::new(ConfigurationStore::new());
    props
        .populate(&store, &catalog, Vec::new())
        .context("invalid client configuration")?;

    let registrar =
        FeignClientsRegistrar::new(store, Arc::new(Offline)).allow_override(cli.allow_override);

    match cli.command.unwrap_or(Commands::Check) {
        Commands::Check => check(&registrar, &props),
        Commands::PrintConfig => print_config(&registrar, &props),
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn check(registrar: &FeignClientsRegistrar, props: &FeignProperties) -> Result<()> {
    tracing::info!("Checking configuration...");
    let registered = registrar.register_all(props.descriptors())?;

    println!("Configuration is valid");
    for client in &registered {
        let aliases: Vec<&str> = client.aliases.iter().map(String::as_str).collect();
        println!("{} -> {}", client.context_id, aliases.join(", "));
    }
    Ok(())
}

fn print_config(registrar: &FeignClientsRegistrar, props: &FeignProperties) -> Result<()> {
    let mut clients = Vec::with_capacity(props.clients.len());
    for descriptor in props.descriptors() {
        let registered = registrar.register(&descriptor)?;
        let effective = registrar.resolver().resolve(&descriptor).view();
        clients.push(ClientReport {
            context_id: registered.context_id,
            name: descriptor.name().to_owned(),
            target_url: descriptor.target_url(),
            is_async: descriptor.is_async(),
            aliases: registered.aliases,
            effective,
        });
    }

    let report = ConfigReport {
        properties: props,
        clients,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
