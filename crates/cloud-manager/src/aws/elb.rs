use aws_sdk_elasticloadbalancing::Client;
use aws_sdk_elasticloadbalancing::types::{HealthCheck, Listener as SdkListener, Tag};

use crate::api::{BoxFuture, ElbApi, Listener, LoadBalancerDescription, NewLoadBalancer, Page};
use crate::aws::{build_error, sdk_error};
use crate::error::CloudError;

/// Largest page DescribeLoadBalancers accepts.
const PAGE_SIZE: i32 = 400;

const HEALTH_CHECK_INTERVAL: i32 = 30;
const HEALTH_CHECK_TIMEOUT: i32 = 5;
const HEALTHY_THRESHOLD: i32 = 2;
const UNHEALTHY_THRESHOLD: i32 = 2;

pub struct AwsElb {
    client: Client,
}

impl AwsElb {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn description(lb: &aws_sdk_elasticloadbalancing::types::LoadBalancerDescription) -> LoadBalancerDescription {
    LoadBalancerDescription {
        name: lb.load_balancer_name().unwrap_or_default().to_string(),
        dns_name: lb.dns_name().unwrap_or_default().to_string(),
        scheme: lb.scheme().unwrap_or_default().to_string(),
        subnets: lb.subnets().to_vec(),
        security_groups: lb.security_groups().to_vec(),
        listeners: lb
            .listener_descriptions()
            .iter()
            .filter_map(|d| d.listener())
            .map(|l| Listener {
                protocol: l.protocol().to_string(),
                load_balancer_port: l.load_balancer_port(),
                instance_protocol: l.instance_protocol().unwrap_or_default().to_string(),
                instance_port: l.instance_port(),
                ssl_certificate_id: l.ssl_certificate_id().map(String::from),
            })
            .collect(),
        health_check_target: lb.health_check().map(|h| h.target().to_string()),
    }
}

fn sdk_listener(listener: &Listener) -> Result<SdkListener, CloudError> {
    SdkListener::builder()
        .protocol(&listener.protocol)
        .load_balancer_port(listener.load_balancer_port)
        .instance_protocol(&listener.instance_protocol)
        .instance_port(listener.instance_port)
        .set_ssl_certificate_id(listener.ssl_certificate_id.clone())
        .build()
        .map_err(|e| build_error("listener", e))
}

impl ElbApi for AwsElb {
    fn list_load_balancers(
        &self,
    ) -> BoxFuture<'_, Result<Page<LoadBalancerDescription>, CloudError>> {
        Box::pin(async move {
            let resp = self
                .client
                .describe_load_balancers()
                .page_size(PAGE_SIZE)
                .send()
                .await
                .map_err(|e| sdk_error("elb:DescribeLoadBalancers", e))?;
            Ok(Page {
                items: resp
                    .load_balancer_descriptions()
                    .iter()
                    .map(description)
                    .collect(),
                truncated: resp.next_marker().is_some_and(|m| !m.is_empty()),
            })
        })
    }

    fn describe_tags<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Vec<(String, String)>, CloudError>> {
        Box::pin(async move {
            let resp = self
                .client
                .describe_tags()
                .load_balancer_names(name)
                .send()
                .await
                .map_err(|e| sdk_error("elb:DescribeTags", e))?;
            Ok(resp
                .tag_descriptions()
                .iter()
                .flat_map(|d| d.tags())
                .map(|t| {
                    (
                        t.key().to_string(),
                        t.value().unwrap_or_default().to_string(),
                    )
                })
                .collect())
        })
    }

    fn create_load_balancer<'a>(
        &'a self,
        request: &'a NewLoadBalancer,
    ) -> BoxFuture<'a, Result<String, CloudError>> {
        Box::pin(async move {
            let listeners = request
                .listeners
                .iter()
                .map(sdk_listener)
                .collect::<Result<Vec<_>, _>>()?;
            let tags = request
                .tags
                .iter()
                .map(|(key, value)| {
                    Tag::builder()
                        .key(key)
                        .value(value)
                        .build()
                        .map_err(|e| build_error("tag", e))
                })
                .collect::<Result<Vec<_>, _>>()?;

            let resp = self
                .client
                .create_load_balancer()
                .load_balancer_name(&request.name)
                .scheme(&request.scheme)
                .set_subnets(Some(request.subnets.clone()))
                .set_security_groups(Some(request.security_groups.clone()))
                .set_listeners(Some(listeners))
                .set_tags(Some(tags))
                .send()
                .await
                .map_err(|e| sdk_error("elb:CreateLoadBalancer", e))?;
            Ok(resp.dns_name().unwrap_or_default().to_string())
        })
    }

    fn delete_load_balancer<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.client
                .delete_load_balancer()
                .load_balancer_name(name)
                .send()
                .await
                .map_err(|e| sdk_error("elb:DeleteLoadBalancer", e))?;
            Ok(())
        })
    }

    fn attach_subnets<'a>(
        &'a self,
        name: &'a str,
        subnets: &'a [String],
    ) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.client
                .attach_load_balancer_to_subnets()
                .load_balancer_name(name)
                .set_subnets(Some(subnets.to_vec()))
                .send()
                .await
                .map_err(|e| sdk_error("elb:AttachLoadBalancerToSubnets", e))?;
            Ok(())
        })
    }

    fn detach_subnets<'a>(
        &'a self,
        name: &'a str,
        subnets: &'a [String],
    ) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.client
                .detach_load_balancer_from_subnets()
                .load_balancer_name(name)
                .set_subnets(Some(subnets.to_vec()))
                .send()
                .await
                .map_err(|e| sdk_error("elb:DetachLoadBalancerFromSubnets", e))?;
            Ok(())
        })
    }

    fn apply_security_groups<'a>(
        &'a self,
        name: &'a str,
        security_groups: &'a [String],
    ) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.client
                .apply_security_groups_to_load_balancer()
                .load_balancer_name(name)
                .set_security_groups(Some(security_groups.to_vec()))
                .send()
                .await
                .map_err(|e| sdk_error("elb:ApplySecurityGroupsToLoadBalancer", e))?;
            Ok(())
        })
    }

    fn configure_health_check<'a>(
        &'a self,
        name: &'a str,
        target: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            let health_check = HealthCheck::builder()
                .target(target)
                .interval(HEALTH_CHECK_INTERVAL)
                .timeout(HEALTH_CHECK_TIMEOUT)
                .healthy_threshold(HEALTHY_THRESHOLD)
                .unhealthy_threshold(UNHEALTHY_THRESHOLD)
                .build()
                .map_err(|e| build_error("health check", e))?;
            self.client
                .configure_health_check()
                .load_balancer_name(name)
                .health_check(health_check)
                .send()
                .await
                .map_err(|e| sdk_error("elb:ConfigureHealthCheck", e))?;
            Ok(())
        })
    }

    fn set_listener_certificate<'a>(
        &'a self,
        name: &'a str,
        load_balancer_port: i32,
        certificate_arn: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.client
                .set_load_balancer_listener_ssl_certificate()
                .load_balancer_name(name)
                .load_balancer_port(load_balancer_port)
                .ssl_certificate_id(certificate_arn)
                .send()
                .await
                .map_err(|e| sdk_error("elb:SetLoadBalancerListenerSSLCertificate", e))?;
            Ok(())
        })
    }
}
