use std::path::PathBuf;

use clap::Parser;
use eyre::Result;

use cloud_manager::{Clients, CloudError, Context, Manifest};

/// Reconcile an environment's AWS resources with its manifest.
#[derive(Debug, Parser)]
#[command(name = "cloud-manager", version)]
struct Args {
    /// Directory holding env.json and an optional aws.properties.
    #[arg(env = "CLOUD_MANAGER_ENV_DIR")]
    env_dir: PathBuf,

    /// Plan and log tasks without executing them.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let manifest = Manifest::load(&args.env_dir)?;
    let env = manifest.environment(&args.env_dir, args.dry_run);
    tracing::info!(env = %env.name, region = %env.region, dry_run = env.dry_run, "start");

    let ctx = Context::new(env);
    ctx.install(Clients::initialize(&ctx.env).await?)?;

    match cloud_manager::reconcile(&ctx, &manifest).await {
        Ok((tasks, _)) => {
            tracing::info!(tasks = tasks.len(), "done");
            Ok(())
        }
        Err(CloudError::Task {
            action,
            resource,
            source,
        }) => Err(eyre::eyre!(
            "{action} failed for {resource}: {}",
            cloud_manager::error::format_err_chain(&*source)
        )),
        Err(e) => Err(e.into()),
    }
}
