use std::time::Duration;

use crate::env::{naming, Context};
use crate::error::CloudError;
use crate::policy;
use crate::resource::{InstanceProfile, RemoteRole, ResourceStatus, Role};
use crate::task::ignore_absent;

/// Time for a new role to become usable by other services.
pub const ROLE_SETTLE_DELAY: Duration = Duration::from_secs(10);

pub async fn create_role(ctx: &Context, role: &mut Role) -> Result<(), CloudError> {
    if role.remote.is_some() {
        tracing::info!(role = %role.name, "role already exists");
        role.status = ResourceStatus::Existing;
        return Ok(());
    }
    policy::validate(&role.assume_role_policy_document)?;

    let iam = &ctx.clients()?.iam;
    tracing::info!(role = %role.name, path = %role.path, "create role");
    let remote = iam
        .create_role(&role.path, &role.name, &role.assume_role_policy_document)
        .await?;
    for arn in &role.managed_policy_arns {
        iam.attach_role_policy(&role.name, arn).await?;
    }
    if let Some(document) = &role.policy_document {
        iam.put_role_policy(&role.name, &role.name, document).await?;
    }

    role.remote = Some(RemoteRole {
        role: remote,
        managed_policy_arns: role.managed_policy_arns.clone(),
        policy_document: role.policy_document.clone(),
    });
    role.status = ResourceStatus::Existing;

    // wait role to be available
    tokio::time::sleep(ROLE_SETTLE_DELAY).await;
    Ok(())
}

pub async fn update_role(ctx: &Context, role: &mut Role) -> Result<(), CloudError> {
    let drift = role.drift()?;
    let iam = &ctx.clients()?.iam;
    let remote = role
        .remote
        .as_mut()
        .ok_or_else(|| CloudError::Invariant(format!("role {} has no remote state", role.name)))?;

    if drift.assume_role_policy {
        policy::validate(&role.assume_role_policy_document)?;
        tracing::info!(role = %role.name, "update assume role policy");
        iam.update_assume_role_policy(&role.name, &role.assume_role_policy_document)
            .await?;
        remote.role.assume_role_policy_document = role.assume_role_policy_document.clone();
    }

    if drift.managed_policies {
        for arn in remote
            .managed_policy_arns
            .iter()
            .filter(|arn| !role.managed_policy_arns.contains(*arn))
        {
            iam.detach_role_policy(&role.name, arn).await?;
        }
        for arn in role
            .managed_policy_arns
            .iter()
            .filter(|arn| !remote.managed_policy_arns.contains(*arn))
        {
            iam.attach_role_policy(&role.name, arn).await?;
        }
        remote.managed_policy_arns = role.managed_policy_arns.clone();
    }

    if drift.inline_policy
        && let Some(document) = &role.policy_document
    {
        tracing::info!(role = %role.name, "update role policy");
        iam.put_role_policy(&role.name, &role.name, document).await?;
        remote.policy_document = Some(document.clone());
    }

    role.status = ResourceStatus::Existing;
    Ok(())
}

/// Undo every attachment before the final delete; IAM refuses to delete a
/// role that still has policies or an instance profile.
pub async fn delete_role(ctx: &Context, role: &mut Role) -> Result<(), CloudError> {
    let iam = &ctx.clients()?.iam;
    let name = role
        .remote
        .as_ref()
        .map_or_else(|| role.name.clone(), |r| r.role.role_name.clone());

    let attached = iam
        .list_attached_role_policy_arns(&name)
        .await?
        .into_complete("attached role policies")?;
    if !attached.is_empty() {
        tracing::info!(role = %name, arns = ?attached, "detach role policies");
        for arn in &attached {
            iam.detach_role_policy(&name, arn).await?;
        }
    }
    if role
        .remote
        .as_ref()
        .is_some_and(|r| r.policy_document.is_some())
    {
        ignore_absent(iam.delete_role_policy(&name, &name).await)?;
    }

    if let Some(profile) = &role.instance_profile {
        let profile_name = naming::remote_name(&ctx.env.name, profile);
        tracing::info!(role = %name, instance_profile = %profile_name, "remove role from instance profile");
        ignore_absent(
            iam.remove_role_from_instance_profile(&profile_name, &name)
                .await,
        )?;
    }

    tracing::info!(role = %name, "delete role");
    iam.delete_role(&name).await?;
    role.remote = None;
    role.status = ResourceStatus::Deleted;
    Ok(())
}

/// Put a recreated role back into its instance profile. Only a profile
/// that is otherwise in sync and left empty by the role delete is touched;
/// new and changed profiles get their role from their own task.
pub async fn rejoin_instance_profile(
    ctx: &Context,
    profile: &mut InstanceProfile,
    role_name: &str,
) -> Result<(), CloudError> {
    if profile.status != ResourceStatus::Existing {
        return Ok(());
    }
    let Some(remote) = profile.remote.as_mut() else {
        return Ok(());
    };
    if !remote.role_names.is_empty() {
        return Ok(());
    }

    tracing::info!(instance_profile = %profile.name, role = %role_name, "add role to instance profile");
    ctx.clients()?
        .iam
        .add_role_to_instance_profile(&profile.name, role_name)
        .await?;
    remote.role_names.push(role_name.to_string());
    Ok(())
}

pub async fn create_instance_profile(
    ctx: &Context,
    profile: &mut InstanceProfile,
) -> Result<(), CloudError> {
    if profile.remote.is_some() {
        tracing::info!(instance_profile = %profile.name, "instance profile already exists");
        profile.status = ResourceStatus::Existing;
        return Ok(());
    }

    let iam = &ctx.clients()?.iam;
    tracing::info!(instance_profile = %profile.name, path = %profile.path, "create instance profile");
    let mut remote = iam
        .create_instance_profile(&profile.path, &profile.name)
        .await?;
    if let Some(role_name) = profile.role_name(&ctx.env) {
        iam.add_role_to_instance_profile(&profile.name, &role_name)
            .await?;
        remote.role_names = vec![role_name];
    }

    profile.remote = Some(remote);
    profile.status = ResourceStatus::Existing;
    Ok(())
}

pub async fn update_instance_profile(
    ctx: &Context,
    profile: &mut InstanceProfile,
) -> Result<(), CloudError> {
    let iam = &ctx.clients()?.iam;
    let desired = profile.role_name(&ctx.env);
    let remote = profile.remote.as_mut().ok_or_else(|| {
        CloudError::Invariant(format!(
            "instance profile {} has no remote state",
            profile.name
        ))
    })?;

    for stale in remote
        .role_names
        .iter()
        .filter(|name| desired.as_deref() != Some(name.as_str()))
    {
        tracing::info!(instance_profile = %profile.name, role = %stale, "remove role from instance profile");
        ignore_absent(
            iam.remove_role_from_instance_profile(&profile.name, stale)
                .await,
        )?;
    }
    if let Some(role_name) = &desired
        && !remote.role_names.contains(role_name)
    {
        tracing::info!(instance_profile = %profile.name, role = %role_name, "add role to instance profile");
        iam.add_role_to_instance_profile(&profile.name, role_name)
            .await?;
    }

    remote.role_names = desired.into_iter().collect();
    profile.status = ResourceStatus::Existing;
    Ok(())
}

pub async fn delete_instance_profile(
    ctx: &Context,
    profile: &mut InstanceProfile,
) -> Result<(), CloudError> {
    let iam = &ctx.clients()?.iam;
    let role_names = profile
        .remote
        .as_ref()
        .map(|r| r.role_names.clone())
        .unwrap_or_default();

    for role_name in &role_names {
        ignore_absent(
            iam.remove_role_from_instance_profile(&profile.name, role_name)
                .await,
        )?;
    }
    tracing::info!(instance_profile = %profile.name, "delete instance profile");
    iam.delete_instance_profile(&profile.name).await?;

    profile.remote = None;
    profile.status = ResourceStatus::Deleted;
    Ok(())
}
