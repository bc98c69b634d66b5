//! Task execution.
//!
//! Every task performs one logical mutation and, on success, records the
//! result on its resource (`remote` and `status`). This is the only place
//! resource state changes after planning.

pub mod elb;
pub mod iam;

use crate::env::Context;
use crate::error::CloudError;
use crate::plan::{Action, Task, Tasks};
use crate::resource::{InstanceProfile, Kind, ResourceKey, Resources, Role};

/// IAM error code for a missing entity.
pub const NO_SUCH_ENTITY: &str = "NoSuchEntity";

pub async fn execute(
    ctx: &Context,
    resources: &mut Resources,
    task: &Task,
) -> Result<(), CloudError> {
    let key = &task.key;
    match task.action {
        Action::CreateRole => {
            let role: &mut Role = target(resources, key)?;
            iam::create_role(ctx, role).await?;
            let name = role.name.clone();
            if let Some(id) = role.instance_profile.clone()
                && let Some(profile) = resources.find_mut::<InstanceProfile>(&id)
            {
                iam::rejoin_instance_profile(ctx, profile, &name).await?;
            }
            Ok(())
        }
        Action::UpdateRole => iam::update_role(ctx, target(resources, key)?).await,
        Action::DeleteRole => {
            let role: &mut Role = target(resources, key)?;
            let name = role
                .remote
                .as_ref()
                .map_or_else(|| role.name.clone(), |r| r.role.role_name.clone());
            let profile_id = role.instance_profile.clone();
            iam::delete_role(ctx, role).await?;
            // delete_role took the role out of its profile
            if let Some(remote) = profile_id
                .and_then(|id| resources.find_mut::<InstanceProfile>(&id))
                .and_then(|profile| profile.remote.as_mut())
            {
                remote.role_names.retain(|n| *n != name);
            }
            Ok(())
        }
        Action::CreateInstanceProfile => {
            iam::create_instance_profile(ctx, target(resources, key)?).await
        }
        Action::UpdateInstanceProfile => {
            iam::update_instance_profile(ctx, target(resources, key)?).await
        }
        Action::DeleteInstanceProfile => {
            iam::delete_instance_profile(ctx, target(resources, key)?).await
        }
        Action::CreateElb => elb::create_elb(ctx, target(resources, key)?).await,
        Action::UpdateElb => elb::update_elb(ctx, target(resources, key)?).await,
        Action::DeleteElb => elb::delete_elb(ctx, target(resources, key)?).await,
    }
}

/// Run tasks in order. The first failure aborts the rest; tasks already
/// applied stay applied.
pub async fn execute_all(
    ctx: &Context,
    resources: &mut Resources,
    tasks: &Tasks,
) -> Result<(), CloudError> {
    for task in tasks {
        tracing::info!(action = %task.action, resource = %task.key, "executing task");
        if let Err(e) = execute(ctx, resources, task).await {
            tracing::error!(
                action = %task.action,
                resource = %task.key,
                error = %e,
                "task failed, aborting remaining tasks"
            );
            return Err(CloudError::Task {
                action: task.action,
                resource: task.key.clone(),
                source: Box::new(e),
            });
        }
    }
    Ok(())
}

fn target<'a, T: Kind>(
    resources: &'a mut Resources,
    key: &ResourceKey,
) -> Result<&'a mut T, CloudError> {
    resources
        .find_mut::<T>(&key.id)
        .ok_or_else(|| CloudError::Invariant(format!("task target {key} is not registered")))
}

/// Treat "already gone" as success when undoing an association.
fn ignore_absent(result: Result<(), CloudError>) -> Result<(), CloudError> {
    match result {
        Err(e) if e.aws_code() == Some(NO_SUCH_ENTITY) => Ok(()),
        other => other,
    }
}
