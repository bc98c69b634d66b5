use crate::env::{naming, Context};
use crate::error::CloudError;
use crate::resource::{Kind, RemoteRole, Resources, Role};

pub async fn load(ctx: &Context, resources: &mut Resources) -> Result<(), CloudError> {
    let iam = &ctx.clients()?.iam;
    let roles = iam.list_roles("/").await?.into_complete("roles")?;

    for remote in roles {
        // ignore roles not matching naming convention
        let Some(id) = naming::resource_id(&ctx.env.name, &remote.role_name) else {
            continue;
        };
        let id = id.to_string();

        let managed_policy_arns = iam
            .list_attached_role_policy_arns(&remote.role_name)
            .await?
            .into_complete("attached role policies")?;
        let policy_document = iam
            .find_role_policy(&remote.role_name, &remote.role_name)
            .await?;

        tracing::debug!(role = %remote.role_name, "found role");
        let role = resources.find_or_insert_with(&id, || Role::discovered(&id, &remote.role_name))?;
        role.name = remote.role_name.clone();
        role.remote = Some(RemoteRole {
            role: remote,
            managed_policy_arns,
            policy_document,
        });
        role.found_in_remote();
    }
    Ok(())
}
