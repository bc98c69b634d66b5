//! Remote-state loaders.
//!
//! Each loader lists one kind of AWS object, keeps the ones named
//! `<env>-<id>`, and finds-or-creates the matching resource in the
//! registry. Objects outside the naming convention are ignored. Loaders
//! are idempotent: a second run against unchanged remote state leaves the
//! registry as it was.

pub mod elb;
pub mod instance_profile;
pub mod role;

use crate::env::Context;
use crate::error::CloudError;
use crate::resource::Resources;

/// Load every kind. Roles come before instance profiles so the profile
/// loader can link the roles it contains.
pub async fn load_all(ctx: &Context, resources: &mut Resources) -> Result<(), CloudError> {
    role::load(ctx, resources).await?;
    instance_profile::load(ctx, resources).await?;
    elb::load(ctx, resources).await?;
    tracing::info!(resources = resources.len(), "remote state loaded");
    Ok(())
}
