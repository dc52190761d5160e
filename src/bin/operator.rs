//! ShortURL operator binary.
//!
//! Keeps the shortening service's Deployment and Service in place and
//! mirrors each ShortURL's short path, click count and validity into its
//! status.
//!
//! # Usage
//!
//! ```bash
//! # Run against the current kubeconfig context
//! cargo run --bin operator
//!
//! # Print the CRD manifest and exit
//! cargo run --bin operator -- --print-crd | kubectl apply -f -
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use kube::Client;
use shorturl_operator::config::OperatorConfig;
use shorturl_operator::operator::{crd, run_controller};
use shorturl_operator::telemetry::init_tracing;
use tracing::info;

/// Kubernetes operator for ShortURL resources.
#[derive(Parser)]
#[command(name = "operator")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: OperatorConfig,

    /// Print the CustomResourceDefinition as YAML and exit
    #[arg(long)]
    print_crd: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if cli.print_crd {
        print!("{}", crd::crd_yaml().context("Failed to render CRD")?);
        return Ok(());
    }

    let config = cli.config;
    config.validate()?;

    init_tracing(&config.log_level, &config.log_format)?;
    config.print_summary();

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    info!("Connected to Kubernetes cluster");

    run_controller(client, &config).await?;

    Ok(())
}
