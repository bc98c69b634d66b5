use std::time::Duration;

use crate::api::{IamApi, Listener, LoadBalancerDescription, NewLoadBalancer, NewServerCert, ServerCert};
use crate::env::Context;
use crate::error::CloudError;
use crate::resource::elb::{ELB_VERSION, ELB_VERSION_TAG};
use crate::resource::{Elb, RemoteElb, ResourceStatus, ServerCertSpec};
use crate::runner::Runner;

/// Retries covering IAM/ELB propagation delay around certificates.
pub const CERT_RETRY_ATTEMPTS: u32 = 3;
pub const CERT_RETRY_INTERVAL: Duration = Duration::from_secs(20);

pub async fn create_elb(ctx: &Context, elb: &mut Elb) -> Result<(), CloudError> {
    if elb.remote.is_some() {
        tracing::info!(elb = %elb.name, "load balancer already exists");
        elb.status = ResourceStatus::Existing;
        return Ok(());
    }

    let clients = ctx.clients()?;
    let cert = upload_server_cert(clients.iam.as_ref(), &elb.name, elb.server_cert.as_ref()).await?;
    let listeners = elb
        .listeners
        .iter()
        .map(|listener| with_certificate(listener, cert.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;

    let request = NewLoadBalancer {
        name: elb.name.clone(),
        scheme: elb.scheme().to_string(),
        subnets: elb.subnets.clone(),
        security_groups: elb.security_groups.clone(),
        listeners,
        tags: vec![(ELB_VERSION_TAG.to_string(), ELB_VERSION.to_string())],
    };

    tracing::info!(elb = %elb.name, scheme = %request.scheme, "create load balancer");
    let api = clients.elb.as_ref();
    let request_ref = &request;
    // a just-uploaded certificate may not be visible to ELB yet
    let dns_name = Runner::new()
        .max_attempts(CERT_RETRY_ATTEMPTS)
        .retry_interval(CERT_RETRY_INTERVAL)
        .retry_on_code("CertificateNotFound")
        .run(move || api.create_load_balancer(request_ref))
        .await?;
    api.configure_health_check(&elb.name, &elb.health_check)
        .await?;

    elb.remote = Some(RemoteElb {
        description: LoadBalancerDescription {
            name: request.name,
            dns_name,
            scheme: request.scheme,
            subnets: request.subnets,
            security_groups: request.security_groups,
            listeners: request.listeners,
            health_check_target: Some(elb.health_check.clone()),
        },
        server_cert: cert,
    });
    elb.status = ResourceStatus::Existing;
    Ok(())
}

pub async fn update_elb(ctx: &Context, elb: &mut Elb) -> Result<(), CloudError> {
    let drift = elb.drift();
    let clients = ctx.clients()?;
    let remote = elb.remote.as_mut().ok_or_else(|| {
        CloudError::Invariant(format!("load balancer {} has no remote state", elb.name))
    })?;
    let lb = &mut remote.description;

    if drift.subnets {
        let attach: Vec<String> = elb
            .subnets
            .iter()
            .filter(|s| !lb.subnets.contains(*s))
            .cloned()
            .collect();
        let detach: Vec<String> = lb
            .subnets
            .iter()
            .filter(|s| !elb.subnets.contains(*s))
            .cloned()
            .collect();
        // attach first so the load balancer never runs without a subnet
        if !attach.is_empty() {
            tracing::info!(elb = %elb.name, subnets = ?attach, "attach subnets");
            clients.elb.attach_subnets(&elb.name, &attach).await?;
        }
        if !detach.is_empty() {
            tracing::info!(elb = %elb.name, subnets = ?detach, "detach subnets");
            clients.elb.detach_subnets(&elb.name, &detach).await?;
        }
        lb.subnets = elb.subnets.clone();
    }

    if drift.security_groups {
        tracing::info!(elb = %elb.name, security_groups = ?elb.security_groups, "apply security groups");
        clients
            .elb
            .apply_security_groups(&elb.name, &elb.security_groups)
            .await?;
        lb.security_groups = elb.security_groups.clone();
    }

    if drift.health_check {
        tracing::info!(elb = %elb.name, target = %elb.health_check, "configure health check");
        clients
            .elb
            .configure_health_check(&elb.name, &elb.health_check)
            .await?;
        lb.health_check_target = Some(elb.health_check.clone());
    }

    if drift.server_cert
        && let Some(cert) =
            upload_server_cert(clients.iam.as_ref(), &elb.name, elb.server_cert.as_ref()).await?
    {
        for listener in lb.listeners.iter_mut().filter(|l| l.is_secure()) {
            tracing::info!(elb = %elb.name, port = listener.load_balancer_port, cert = %cert.metadata.name, "switch listener certificate");
            let (api, name, port, arn) = (
                clients.elb.as_ref(),
                elb.name.as_str(),
                listener.load_balancer_port,
                cert.metadata.arn.as_str(),
            );
            Runner::new()
                .max_attempts(CERT_RETRY_ATTEMPTS)
                .retry_interval(CERT_RETRY_INTERVAL)
                .retry_on_code("CertificateNotFound")
                .run(move || api.set_listener_certificate(name, port, arn))
                .await?;
            listener.ssl_certificate_id = Some(cert.metadata.arn.clone());
        }
        if let Some(old) = remote.server_cert.replace(cert) {
            delete_server_cert(clients.iam.as_ref(), &old.metadata.name).await?;
        }
    }

    elb.status = ResourceStatus::Existing;
    Ok(())
}

/// Delete the load balancer first, then the certificate it was serving.
pub async fn delete_elb(ctx: &Context, elb: &mut Elb) -> Result<(), CloudError> {
    let clients = ctx.clients()?;
    tracing::info!(elb = %elb.name, "delete load balancer");
    clients.elb.delete_load_balancer(&elb.name).await?;

    if let Some(cert) = elb.remote.as_ref().and_then(|r| r.server_cert.as_ref()) {
        delete_server_cert(clients.iam.as_ref(), &cert.metadata.name).await?;
    }

    elb.remote = None;
    elb.status = ResourceStatus::Deleted;
    Ok(())
}

/// After a listener stops using a certificate, IAM may still report it in
/// use for a while.
pub async fn delete_server_cert(iam: &dyn IamApi, name: &str) -> Result<(), CloudError> {
    tracing::info!(cert = %name, "delete server cert");
    Runner::new()
        .max_attempts(CERT_RETRY_ATTEMPTS)
        .retry_interval(CERT_RETRY_INTERVAL)
        .retry_on_code("DeleteConflict")
        .run(move || iam.delete_server_cert(name))
        .await
}

async fn upload_server_cert(
    iam: &dyn IamApi,
    elb_name: &str,
    spec: Option<&ServerCertSpec>,
) -> Result<Option<ServerCert>, CloudError> {
    let Some(spec) = spec else {
        return Ok(None);
    };
    let request = NewServerCert {
        name: format!("{elb_name}-{}", jiff::Timestamp::now().as_second()),
        path: "/".into(),
        certificate_body: spec.certificate_body.clone(),
        private_key: spec.private_key.clone(),
        certificate_chain: spec.certificate_chain.clone(),
    };
    tracing::info!(cert = %request.name, "upload server cert");
    let metadata = iam.upload_server_cert(&request).await?;
    Ok(Some(ServerCert {
        metadata,
        certificate_body: spec.certificate_body.clone(),
    }))
}

fn with_certificate(listener: &Listener, cert: Option<&ServerCert>) -> Result<Listener, CloudError> {
    if !listener.is_secure() {
        return Ok(listener.clone());
    }
    let cert = cert.ok_or_else(|| {
        CloudError::Config(format!(
            "{} listener on port {} requires a server certificate",
            listener.protocol, listener.load_balancer_port
        ))
    })?;
    Ok(Listener {
        ssl_certificate_id: Some(cert.metadata.arn.clone()),
        ..listener.clone()
    })
}
