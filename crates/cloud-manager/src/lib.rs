//! cloud-manager
//!
//! Reconciles the AWS objects of one environment (IAM roles, instance
//! profiles, classic load balancers) with a declared manifest.
//!
//! Public API:
//! - `remote::load_all()`: discover remote objects named `<env>-<id>`
//! - `Manifest::declare_into()`: merge the desired state into the registry
//! - `drift::detect_changes()`: mark existing resources that drifted
//! - `plan::plan()`: turn statuses into an ordered task list
//! - `task::execute_all()`: apply tasks, aborting on the first failure
//! - `reconcile()`: convenience: load → declare → detect → plan → execute

pub mod api;
pub mod aws;
pub mod client;
pub mod credentials;
pub mod drift;
pub mod env;
pub mod error;
pub mod manifest;
pub mod plan;
pub mod policy;
pub mod remote;
pub mod resource;
pub mod runner;
pub mod task;

pub use crate::client::Clients;
pub use crate::env::{Context, Environment};
pub use crate::error::CloudError;
pub use crate::manifest::Manifest;
pub use crate::plan::{Action, Task, Tasks};
pub use crate::resource::{Resource, ResourceKey, ResourceKind, ResourceStatus, Resources};
pub use crate::runner::Runner;

/// Full run: load → declare → detect → plan → execute.
///
/// In dry-run mode the planned tasks are logged and nothing is executed.
/// Returns the planned tasks along with the final registry.
pub async fn reconcile(
    ctx: &Context,
    manifest: &Manifest,
) -> Result<(Tasks, Resources), CloudError> {
    let mut resources = Resources::new();
    remote::load_all(ctx, &mut resources).await?;
    manifest.declare_into(&ctx.env, &mut resources)?;
    drift::detect_changes(&ctx.env, &mut resources)?;
    let tasks = plan::plan(&ctx.env, &resources)?;

    if tasks.is_empty() {
        tracing::info!("all resources in sync, no changes needed");
        return Ok((tasks, resources));
    }

    if ctx.env.dry_run {
        for task in &tasks {
            tracing::info!(action = %task.action, resource = %task.key, "planned task (dry run)");
        }
        tracing::info!(tasks = tasks.len(), "dry run, skipping execution");
        return Ok((tasks, resources));
    }

    tracing::info!(tasks = tasks.len(), "executing tasks");
    task::execute_all(ctx, &mut resources, &tasks).await?;
    Ok((tasks, resources))
}
