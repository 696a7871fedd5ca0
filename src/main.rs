//! ruteo - generate a delivery route from a JSON candidate file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ruteo::{CancelFlag, DeliveryCandidate, GenerationConfig, ProviderKind, ProviderSettings, RouteService};

#[derive(Debug, Parser)]
#[command(name = "ruteo", version, about = "Delivery route generation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sequence the candidates in FILE into one route and print it as JSON.
    Generate {
        /// JSON array of delivery candidates.
        #[arg(long)]
        candidates: PathBuf,
        /// JSON generation config; defaults apply to missing fields.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Overrides `proveedor_matrix` from the config.
        #[arg(long, value_enum)]
        provider: Option<ProviderKind>,
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,ruteo=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Generate {
            candidates,
            config,
            provider,
            pretty,
        } => generate(&candidates, config.as_deref(), provider, pretty),
    }
}

fn generate(
    candidates_path: &Path,
    config_path: Option<&Path>,
    provider: Option<ProviderKind>,
    pretty: bool,
) -> Result<()> {
    let candidates: Vec<DeliveryCandidate> = read_json(candidates_path)?;
    let mut config: GenerationConfig = match config_path {
        Some(path) => read_json(path)?,
        None => GenerationConfig::default(),
    };
    if let Some(provider) = provider {
        config.proveedor_matrix = provider;
    }

    let settings = ProviderSettings::from_env()?;
    info!(
        candidates = candidates.len(),
        provider = config.proveedor_matrix.as_str(),
        "generating route"
    );

    let service = RouteService::new(settings);
    let run = service.generate(&config, &candidates, &CancelFlag::new())?;

    let output = if pretty {
        serde_json::to_string_pretty(&run)?
    } else {
        serde_json::to_string(&run)?
    };
    println!("{output}");
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}
