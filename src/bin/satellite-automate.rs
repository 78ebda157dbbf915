//! Satellite lifecycle automation CLI
//!
//! Publishes and promotes content views against a Red Hat Satellite server,
//! based on the upstream repository sync state rather than blindly.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use satellite_automate::katello::entities::TaskAction;
use satellite_automate::orchestration::poller::{PollOptions, TaskPoller};
use satellite_automate::orchestration::promoter::{PromoteOutcome, run_promote};
use satellite_automate::orchestration::publisher::{PublishOutcome, run_publish};
use satellite_automate::{KatelloClient, RunOptions, SatelliteConfig, SatelliteError};

/// Automate content view operations in Red Hat Satellite
#[derive(Parser)]
#[command(name = "satellite-automate")]
#[command(version = "0.1.0")]
#[command(about = "Automate content view operations in Red Hat Satellite", long_about = None)]
struct Cli {
    /// Path to config file (TOML format)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Number of concurrent requests
    #[arg(short, long, default_value = "10")]
    threads: usize,

    /// Force the operation
    #[arg(short, long)]
    force: bool,

    /// Wait until the action is completed
    #[arg(short, long)]
    wait: bool,

    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish a content view
    Publish {
        /// Label of the content view
        content_view: String,

        /// Publish this exact "major.minor" instead of the computed version
        #[arg(short = 'v', long = "version")]
        version: Option<String>,
    },

    /// Promote a content view to a lifecycle environment
    Promote {
        /// Label of the lifecycle environment
        environment: String,

        /// Promote this exact "major.minor" instead of the latest version
        #[arg(short = 'v', long = "version")]
        version: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    // Single exit-code decision point
    let code = match run(cli).await {
        Ok(()) => {
            info!("all operations complete");
            0
        }
        Err(e) => {
            error!("{}", e);
            e.exit_code()
        }
    };
    process::exit(code);
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(cli: Cli) -> Result<(), SatelliteError> {
    let config = SatelliteConfig::load(&cli.config).await?;
    let org_label = config.org.clone();
    let version_policy = config.version_policy;
    let client = Arc::new(KatelloClient::new(config)?);

    let org = client.find_organization(&org_label).await?;
    info!("found organization \"{}\" with id {}", org.label, org.id);

    match cli.command {
        Commands::Publish {
            content_view,
            version,
        } => {
            let options = RunOptions {
                threads: cli.threads,
                force: cli.force,
                wait: cli.wait,
                version,
            };

            let cv = client.find_content_view(org.id, &content_view).await?;
            info!("found content view \"{}\" with id {}", cv.label, cv.id);

            match run_publish(Arc::clone(&client), &cv, version_policy, &options).await? {
                PublishOutcome::AlreadyCurrent => {}
                PublishOutcome::Published {
                    version,
                    version_id,
                } => {
                    info!(
                        "new content view version {} has id {}",
                        version, version_id
                    );
                    if options.wait {
                        TaskPoller::new(TaskAction::Publish, PollOptions::default())
                            .wait(client.as_ref(), version_id)
                            .await?;
                    }
                }
            }
        }

        Commands::Promote {
            environment,
            version,
        } => {
            let options = RunOptions {
                threads: cli.threads,
                force: cli.force,
                wait: cli.wait,
                version,
            };

            let env = client.find_environment(org.id, &environment).await?;
            info!(
                "found lifecycle environment \"{}\" with id {}",
                env.label, env.id
            );

            match run_promote(client.as_ref(), &env, &options).await? {
                PromoteOutcome::AlreadyPresent { .. } => {}
                PromoteOutcome::Promoted { version_id, .. } => {
                    if options.wait {
                        TaskPoller::new(TaskAction::Promotion, PollOptions::default())
                            .wait(client.as_ref(), version_id)
                            .await?;
                    }
                }
            }
        }
    }

    Ok(())
}
