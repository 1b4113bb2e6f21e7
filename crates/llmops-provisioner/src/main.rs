//! `llmops-deploy` - provision, tear down and inspect the inference endpoint.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use llmops_provisioner::{
    create_registry, DeployConfig, DeploymentPipeline, DeploymentPlan, Provisioner,
};

#[derive(Parser)]
#[command(name = "llmops-deploy")]
#[command(about = "Provision the SageMaker model, endpoint configuration and endpoint")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = "deploy.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace the model, endpoint configuration and endpoint, then wait for the endpoint
    Deploy,

    /// Delete the endpoint, endpoint configuration and model
    Teardown,

    /// Show what the registry currently holds for each resource
    Status {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = DeployConfig::from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    info!(
        region = %config.aws.region,
        endpoint = %config.endpoint.name,
        registry = ?config.registry,
        "configuration loaded"
    );

    let registry = create_registry(&config).await;
    let provisioner = Provisioner::new(registry, (&config.readiness).into());
    let pipeline = DeploymentPipeline::new(provisioner, DeploymentPlan::from_config(&config));

    match cli.command {
        Commands::Deploy => {
            let report = pipeline.run().await?;
            for stage in &report.stages {
                println!(
                    "{:<24} {:<32} {:<9} {:>8.1}s",
                    stage.kind,
                    stage.name,
                    if stage.replaced { "replaced" } else { "created" },
                    stage.elapsed.as_secs_f64()
                );
            }
            println!(
                "Endpoint {} is deployed and ready for inference ({}).",
                report.endpoint_name, report.endpoint_status
            );
        }
        Commands::Teardown => {
            let report = pipeline.teardown().await?;
            if report.removed.is_empty() {
                println!("Nothing to remove.");
            }
            for (kind, name) in &report.removed {
                println!("Deleted {kind} {name}");
            }
        }
        Commands::Status { json } => {
            let report = pipeline.status().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }
            for state in &report.resources {
                let status = match &state.description {
                    None => "absent".to_owned(),
                    Some(description) => description
                        .status
                        .as_ref()
                        .map_or_else(|| "present".to_owned(), ToString::to_string),
                };
                println!("{:<24} {:<32} {status}", state.kind, state.name);
            }
        }
    }

    Ok(())
}
