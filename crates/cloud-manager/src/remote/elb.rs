use crate::api::{ElbApi, Listener};
use crate::env::{naming, Context};
use crate::error::CloudError;
use crate::resource::elb::{ELB_VERSION, ELB_VERSION_TAG};
use crate::resource::{Elb, Kind, RemoteElb, Resources};

pub async fn load(ctx: &Context, resources: &mut Resources) -> Result<(), CloudError> {
    let clients = ctx.clients()?;
    let load_balancers = clients
        .elb
        .list_load_balancers()
        .await?
        .into_complete("load balancers")?;

    for remote in load_balancers {
        let Some(id) = naming::resource_id(&ctx.env.name, &remote.name) else {
            continue;
        };
        let id = id.to_string();

        let version = version(clients.elb.as_ref(), &remote.name).await?;
        if version != ELB_VERSION {
            tracing::info!(elb = %remote.name, version = %version, "skipping load balancer with incompatible version");
            continue;
        }

        let server_cert = match remote.listeners.iter().find_map(certificate_name) {
            Some(cert_name) => clients.iam.find_server_cert(cert_name).await?,
            None => None,
        };

        let elb = resources.find_or_insert_with(&id, || Elb::discovered(&id, &remote.name))?;
        elb.name = remote.name.clone();
        elb.remote = Some(RemoteElb {
            description: remote,
            server_cert,
        });
        elb.found_in_remote();
    }
    Ok(())
}

/// Value of the version tag; load balancers without it predate tagging
/// and count as version 1.
async fn version(elb: &dyn ElbApi, name: &str) -> Result<String, CloudError> {
    let tags = elb.describe_tags(name).await?;
    Ok(tags
        .into_iter()
        .find(|(key, _)| key == ELB_VERSION_TAG)
        .map(|(_, value)| value)
        .unwrap_or_else(|| ELB_VERSION.to_string()))
}

/// Server certificate name from the ARN on a secure listener
/// (`arn:aws:iam::123:server-certificate/<name>`).
fn certificate_name(listener: &Listener) -> Option<&str> {
    listener
        .ssl_certificate_id
        .as_deref()
        .filter(|_| listener.is_secure())
        .and_then(|arn| arn.rsplit('/').next())
}
