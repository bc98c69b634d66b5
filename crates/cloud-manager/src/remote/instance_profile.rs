use crate::env::{naming, Context};
use crate::error::CloudError;
use crate::resource::{InstanceProfile, Kind, Resources, Role};

pub async fn load(ctx: &Context, resources: &mut Resources) -> Result<(), CloudError> {
    let profiles = ctx
        .clients()?
        .iam
        .list_instance_profiles("/")
        .await?
        .into_complete("instance profiles")?;

    let env = &ctx.env.name;
    for remote in profiles {
        let Some(id) = naming::resource_id(env, &remote.instance_profile_name) else {
            continue;
        };
        let id = id.to_string();

        // a role still inside a profile must be removed from it before deletion
        for role_name in &remote.role_names {
            if let Some(role_id) = naming::resource_id(env, role_name)
                && let Some(role) = resources.find_mut::<Role>(role_id)
                && role.instance_profile.is_none()
            {
                role.instance_profile = Some(id.clone());
            }
        }

        let profile = resources.find_or_insert_with(&id, || {
            InstanceProfile::discovered(&id, &remote.instance_profile_name)
        })?;
        profile.name = remote.instance_profile_name.clone();
        profile.remote = Some(remote);
        profile.found_in_remote();
    }
    Ok(())
}
