use crate::env::Environment;
use crate::error::CloudError;
use crate::resource::{Elb, InstanceProfile, Resources, ResourceStatus, Role};

/// Run every change detector over the registry.
///
/// Only `Existing` resources can be demoted to `Changed`; running the
/// detectors twice gives the same result.
pub fn detect_changes(env: &Environment, resources: &mut Resources) -> Result<(), CloudError> {
    for role in resources.iter_mut::<Role>() {
        if role.status == ResourceStatus::Existing {
            let drift = role.drift()?;
            if drift.any() {
                tracing::info!(role = %role.name, ?drift, "role changed");
                role.status = ResourceStatus::Changed;
            }
        }
    }

    for profile in resources.iter_mut::<InstanceProfile>() {
        if profile.status == ResourceStatus::Existing {
            let drift = profile.drift(env);
            if drift.any() {
                tracing::info!(instance_profile = %profile.name, ?drift, "instance profile changed");
                profile.status = ResourceStatus::Changed;
            }
        }
    }

    for elb in resources.iter_mut::<Elb>() {
        if elb.status == ResourceStatus::Existing {
            let drift = elb.drift();
            if drift.any() {
                tracing::info!(elb = %elb.name, ?drift, "load balancer changed");
                elb.status = ResourceStatus::Changed;
            }
        }
    }

    Ok(())
}
