//! Capability surface the engine calls through.
//!
//! `IamApi` and `ElbApi` wrap one AWS service each. The SDK-backed
//! implementations live in `crate::aws`; tests substitute in-memory ones.
//! Methods return boxed futures for dyn compatibility.

use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;

use crate::error::CloudError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One listing response. `truncated` is set when the service had more
/// results than the requested page size.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub truncated: bool,
}

impl<T> Page<T> {
    pub fn complete(items: Vec<T>) -> Self {
        Self {
            items,
            truncated: false,
        }
    }

    /// Refuse to work from a partial view of remote state.
    pub fn into_complete(self, what: &str) -> Result<Vec<T>, CloudError> {
        if self.truncated {
            return Err(CloudError::Invariant(format!(
                "result is truncated, update code to paginate {what}"
            )));
        }
        Ok(self.items)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDescription {
    pub role_name: String,
    pub path: String,
    pub arn: String,
    /// As returned by IAM, percent-encoded.
    pub assume_role_policy_document: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceProfileDescription {
    pub instance_profile_name: String,
    pub path: String,
    pub arn: String,
    pub role_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCertMetadata {
    pub name: String,
    pub path: String,
    pub arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCert {
    pub metadata: ServerCertMetadata,
    pub certificate_body: String,
}

#[derive(Debug, Clone)]
pub struct NewServerCert {
    pub name: String,
    pub path: String,
    pub certificate_body: String,
    pub private_key: String,
    pub certificate_chain: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Listener {
    /// `HTTP`, `HTTPS`, `TCP` or `SSL`.
    pub protocol: String,
    pub load_balancer_port: i32,
    pub instance_protocol: String,
    pub instance_port: i32,
    #[serde(skip)]
    pub ssl_certificate_id: Option<String>,
}

impl Listener {
    pub fn is_secure(&self) -> bool {
        self.protocol.eq_ignore_ascii_case("HTTPS") || self.protocol.eq_ignore_ascii_case("SSL")
    }

    /// Same protocol and ports, ignoring the certificate.
    pub fn same_endpoint(&self, other: &Listener) -> bool {
        self.protocol.eq_ignore_ascii_case(&other.protocol)
            && self.load_balancer_port == other.load_balancer_port
            && self.instance_protocol.eq_ignore_ascii_case(&other.instance_protocol)
            && self.instance_port == other.instance_port
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadBalancerDescription {
    pub name: String,
    pub dns_name: String,
    /// `internet-facing` or `internal`.
    pub scheme: String,
    pub subnets: Vec<String>,
    pub security_groups: Vec<String>,
    pub listeners: Vec<Listener>,
    pub health_check_target: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewLoadBalancer {
    pub name: String,
    pub scheme: String,
    pub subnets: Vec<String>,
    pub security_groups: Vec<String>,
    pub listeners: Vec<Listener>,
    pub tags: Vec<(String, String)>,
}

pub trait IamApi: Send + Sync {
    fn list_roles<'a>(
        &'a self,
        path_prefix: &'a str,
    ) -> BoxFuture<'a, Result<Page<RoleDescription>, CloudError>>;

    fn list_attached_role_policy_arns<'a>(
        &'a self,
        role_name: &'a str,
    ) -> BoxFuture<'a, Result<Page<String>, CloudError>>;

    /// Inline policy document, or `None` when the role has no such policy.
    fn find_role_policy<'a>(
        &'a self,
        role_name: &'a str,
        policy_name: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>, CloudError>>;

    fn create_role<'a>(
        &'a self,
        path: &'a str,
        role_name: &'a str,
        assume_role_policy_document: &'a str,
    ) -> BoxFuture<'a, Result<RoleDescription, CloudError>>;

    fn update_assume_role_policy<'a>(
        &'a self,
        role_name: &'a str,
        policy_document: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>>;

    fn put_role_policy<'a>(
        &'a self,
        role_name: &'a str,
        policy_name: &'a str,
        policy_document: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>>;

    fn delete_role_policy<'a>(
        &'a self,
        role_name: &'a str,
        policy_name: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>>;

    fn attach_role_policy<'a>(
        &'a self,
        role_name: &'a str,
        policy_arn: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>>;

    fn detach_role_policy<'a>(
        &'a self,
        role_name: &'a str,
        policy_arn: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>>;

    fn delete_role<'a>(&'a self, role_name: &'a str) -> BoxFuture<'a, Result<(), CloudError>>;

    fn list_instance_profiles<'a>(
        &'a self,
        path_prefix: &'a str,
    ) -> BoxFuture<'a, Result<Page<InstanceProfileDescription>, CloudError>>;

    fn create_instance_profile<'a>(
        &'a self,
        path: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, Result<InstanceProfileDescription, CloudError>>;

    fn add_role_to_instance_profile<'a>(
        &'a self,
        profile_name: &'a str,
        role_name: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>>;

    fn remove_role_from_instance_profile<'a>(
        &'a self,
        profile_name: &'a str,
        role_name: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>>;

    fn delete_instance_profile<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>>;

    fn upload_server_cert<'a>(
        &'a self,
        cert: &'a NewServerCert,
    ) -> BoxFuture<'a, Result<ServerCertMetadata, CloudError>>;

    /// `None` when no certificate has this name.
    fn find_server_cert<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Option<ServerCert>, CloudError>>;

    fn delete_server_cert<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<(), CloudError>>;
}

pub trait ElbApi: Send + Sync {
    fn list_load_balancers(
        &self,
    ) -> BoxFuture<'_, Result<Page<LoadBalancerDescription>, CloudError>>;

    fn describe_tags<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Vec<(String, String)>, CloudError>>;

    /// Returns the DNS name of the new load balancer.
    fn create_load_balancer<'a>(
        &'a self,
        request: &'a NewLoadBalancer,
    ) -> BoxFuture<'a, Result<String, CloudError>>;

    fn delete_load_balancer<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<(), CloudError>>;

    fn attach_subnets<'a>(
        &'a self,
        name: &'a str,
        subnets: &'a [String],
    ) -> BoxFuture<'a, Result<(), CloudError>>;

    fn detach_subnets<'a>(
        &'a self,
        name: &'a str,
        subnets: &'a [String],
    ) -> BoxFuture<'a, Result<(), CloudError>>;

    fn apply_security_groups<'a>(
        &'a self,
        name: &'a str,
        security_groups: &'a [String],
    ) -> BoxFuture<'a, Result<(), CloudError>>;

    fn configure_health_check<'a>(
        &'a self,
        name: &'a str,
        target: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>>;

    fn set_listener_certificate<'a>(
        &'a self,
        name: &'a str,
        load_balancer_port: i32,
        certificate_arn: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>>;
}
