//! In-memory IAM and ELB services for driving the engine without AWS.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use cloud_manager::api::{
    BoxFuture, ElbApi, IamApi, InstanceProfileDescription, LoadBalancerDescription,
    NewLoadBalancer, NewServerCert, Page, RoleDescription, ServerCert, ServerCertMetadata,
};
use cloud_manager::{Clients, CloudError, Context, Environment, Manifest};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

pub const ENV: &str = "demo";
pub const REGION: &str = "us-east-1";

fn not_found(what: &str) -> CloudError {
    CloudError::aws(Some("NoSuchEntity"), format!("{what} not found"))
}

#[derive(Debug, Default)]
pub struct IamState {
    pub roles: BTreeMap<String, RoleDescription>,
    pub attached: BTreeMap<String, Vec<String>>,
    /// (role, policy name) -> document
    pub inline: BTreeMap<(String, String), String>,
    pub profiles: BTreeMap<String, InstanceProfileDescription>,
    pub certs: BTreeMap<String, ServerCert>,
    /// Report role listings as truncated.
    pub truncate_roles: bool,
    /// Number of `DeleteConflict` failures before a certificate delete succeeds.
    pub cert_delete_conflicts: u32,
    /// Calls starting with this prefix fail with `ServiceFailure`.
    pub failing_call: Option<String>,
}

#[derive(Debug, Default)]
pub struct FakeIam {
    pub state: Mutex<IamState>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeIam {
    fn record(&self, call: String) -> Result<(), CloudError> {
        let failing = self
            .state
            .lock()
            .unwrap()
            .failing_call
            .as_ref()
            .is_some_and(|prefix| call.starts_with(prefix.as_str()));
        self.calls.lock().unwrap().push(call.clone());
        if failing {
            return Err(CloudError::aws(Some("ServiceFailure"), format!("{call} failed")));
        }
        Ok(())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Seed a role the way IAM returns it: trust document percent-encoded.
    pub fn seed_role(&self, name: &str, path: &str, trust: &str) {
        self.state.lock().unwrap().roles.insert(
            name.to_string(),
            RoleDescription {
                role_name: name.to_string(),
                path: path.to_string(),
                arn: format!("arn:aws:iam::123456789012:role{path}{name}"),
                assume_role_policy_document: utf8_percent_encode(trust, NON_ALPHANUMERIC)
                    .to_string(),
            },
        );
    }

    pub fn seed_attached(&self, role: &str, arns: &[&str]) {
        self.state
            .lock()
            .unwrap()
            .attached
            .insert(role.to_string(), arns.iter().map(|a| a.to_string()).collect());
    }

    pub fn seed_profile(&self, name: &str, roles: &[&str]) {
        self.state.lock().unwrap().profiles.insert(
            name.to_string(),
            InstanceProfileDescription {
                instance_profile_name: name.to_string(),
                path: "/".into(),
                arn: format!("arn:aws:iam::123456789012:instance-profile/{name}"),
                role_names: roles.iter().map(|r| r.to_string()).collect(),
            },
        );
    }

    pub fn seed_cert(&self, name: &str, body: &str) -> String {
        let arn = format!("arn:aws:iam::123456789012:server-certificate/{name}");
        self.state.lock().unwrap().certs.insert(
            name.to_string(),
            ServerCert {
                metadata: ServerCertMetadata {
                    name: name.to_string(),
                    path: "/".into(),
                    arn: arn.clone(),
                },
                certificate_body: body.to_string(),
            },
        );
        arn
    }
}

impl IamApi for FakeIam {
    fn list_roles<'a>(
        &'a self,
        path_prefix: &'a str,
    ) -> BoxFuture<'a, Result<Page<RoleDescription>, CloudError>> {
        Box::pin(async move {
            self.record(format!("list_roles {path_prefix}"))?;
            let state = self.state.lock().unwrap();
            Ok(Page {
                items: state
                    .roles
                    .values()
                    .filter(|r| r.path.starts_with(path_prefix))
                    .cloned()
                    .collect(),
                truncated: state.truncate_roles,
            })
        })
    }

    fn list_attached_role_policy_arns<'a>(
        &'a self,
        role_name: &'a str,
    ) -> BoxFuture<'a, Result<Page<String>, CloudError>> {
        Box::pin(async move {
            let state = self.state.lock().unwrap();
            Ok(Page::complete(
                state.attached.get(role_name).cloned().unwrap_or_default(),
            ))
        })
    }

    fn find_role_policy<'a>(
        &'a self,
        role_name: &'a str,
        policy_name: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>, CloudError>> {
        Box::pin(async move {
            let state = self.state.lock().unwrap();
            Ok(state
                .inline
                .get(&(role_name.to_string(), policy_name.to_string()))
                .map(|doc| utf8_percent_encode(doc, NON_ALPHANUMERIC).to_string()))
        })
    }

    fn create_role<'a>(
        &'a self,
        path: &'a str,
        role_name: &'a str,
        assume_role_policy_document: &'a str,
    ) -> BoxFuture<'a, Result<RoleDescription, CloudError>> {
        Box::pin(async move {
            self.record(format!("create_role {role_name}"))?;
            if self.state.lock().unwrap().roles.contains_key(role_name) {
                return Err(CloudError::aws(
                    Some("EntityAlreadyExists"),
                    format!("role {role_name} already exists"),
                ));
            }
            self.seed_role(role_name, path, assume_role_policy_document);
            Ok(self.state.lock().unwrap().roles[role_name].clone())
        })
    }

    fn update_assume_role_policy<'a>(
        &'a self,
        role_name: &'a str,
        policy_document: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.record(format!("update_assume_role_policy {role_name}"))?;
            let mut state = self.state.lock().unwrap();
            let role = state
                .roles
                .get_mut(role_name)
                .ok_or_else(|| not_found(role_name))?;
            role.assume_role_policy_document =
                utf8_percent_encode(policy_document, NON_ALPHANUMERIC).to_string();
            Ok(())
        })
    }

    fn put_role_policy<'a>(
        &'a self,
        role_name: &'a str,
        policy_name: &'a str,
        policy_document: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.record(format!("put_role_policy {role_name}"))?;
            self.state.lock().unwrap().inline.insert(
                (role_name.to_string(), policy_name.to_string()),
                policy_document.to_string(),
            );
            Ok(())
        })
    }

    fn delete_role_policy<'a>(
        &'a self,
        role_name: &'a str,
        policy_name: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.record(format!("delete_role_policy {role_name}"))?;
            self.state
                .lock()
                .unwrap()
                .inline
                .remove(&(role_name.to_string(), policy_name.to_string()))
                .map(|_| ())
                .ok_or_else(|| not_found(policy_name))
        })
    }

    fn attach_role_policy<'a>(
        &'a self,
        role_name: &'a str,
        policy_arn: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.record(format!("attach_role_policy {role_name} {policy_arn}"))?;
            self.state
                .lock()
                .unwrap()
                .attached
                .entry(role_name.to_string())
                .or_default()
                .push(policy_arn.to_string());
            Ok(())
        })
    }

    fn detach_role_policy<'a>(
        &'a self,
        role_name: &'a str,
        policy_arn: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.record(format!("detach_role_policy {role_name} {policy_arn}"))?;
            if let Some(arns) = self.state.lock().unwrap().attached.get_mut(role_name) {
                arns.retain(|a| a != policy_arn);
            }
            Ok(())
        })
    }

    fn delete_role<'a>(&'a self, role_name: &'a str) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.record(format!("delete_role {role_name}"))?;
            let mut state = self.state.lock().unwrap();
            if state.attached.get(role_name).is_some_and(|a| !a.is_empty())
                || state.profiles.values().any(|p| p.role_names.iter().any(|r| r == role_name))
            {
                return Err(CloudError::aws(
                    Some("DeleteConflict"),
                    format!("role {role_name} is still in use"),
                ));
            }
            state.roles.remove(role_name).ok_or_else(|| not_found(role_name))?;
            state.attached.remove(role_name);
            Ok(())
        })
    }

    fn list_instance_profiles<'a>(
        &'a self,
        path_prefix: &'a str,
    ) -> BoxFuture<'a, Result<Page<InstanceProfileDescription>, CloudError>> {
        Box::pin(async move {
            self.record(format!("list_instance_profiles {path_prefix}"))?;
            let state = self.state.lock().unwrap();
            Ok(Page::complete(
                state
                    .profiles
                    .values()
                    .filter(|p| p.path.starts_with(path_prefix))
                    .cloned()
                    .collect(),
            ))
        })
    }

    fn create_instance_profile<'a>(
        &'a self,
        path: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, Result<InstanceProfileDescription, CloudError>> {
        Box::pin(async move {
            self.record(format!("create_instance_profile {name}"))?;
            let profile = InstanceProfileDescription {
                instance_profile_name: name.to_string(),
                path: path.to_string(),
                arn: format!("arn:aws:iam::123456789012:instance-profile{path}{name}"),
                role_names: Vec::new(),
            };
            self.state
                .lock()
                .unwrap()
                .profiles
                .insert(name.to_string(), profile.clone());
            Ok(profile)
        })
    }

    fn add_role_to_instance_profile<'a>(
        &'a self,
        profile_name: &'a str,
        role_name: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.record(format!("add_role_to_instance_profile {profile_name} {role_name}"))?;
            let mut state = self.state.lock().unwrap();
            let profile = state
                .profiles
                .get_mut(profile_name)
                .ok_or_else(|| not_found(profile_name))?;
            profile.role_names.push(role_name.to_string());
            Ok(())
        })
    }

    fn remove_role_from_instance_profile<'a>(
        &'a self,
        profile_name: &'a str,
        role_name: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.record(format!(
                "remove_role_from_instance_profile {profile_name} {role_name}"
            ))?;
            let mut state = self.state.lock().unwrap();
            let profile = state
                .profiles
                .get_mut(profile_name)
                .ok_or_else(|| not_found(profile_name))?;
            if !profile.role_names.iter().any(|r| r == role_name) {
                return Err(not_found(role_name));
            }
            profile.role_names.retain(|r| r != role_name);
            Ok(())
        })
    }

    fn delete_instance_profile<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.record(format!("delete_instance_profile {name}"))?;
            self.state
                .lock()
                .unwrap()
                .profiles
                .remove(name)
                .map(|_| ())
                .ok_or_else(|| not_found(name))
        })
    }

    fn upload_server_cert<'a>(
        &'a self,
        cert: &'a NewServerCert,
    ) -> BoxFuture<'a, Result<ServerCertMetadata, CloudError>> {
        Box::pin(async move {
            self.record(format!("upload_server_cert {}", cert.name))?;
            let arn = self.seed_cert(&cert.name, &cert.certificate_body);
            Ok(ServerCertMetadata {
                name: cert.name.clone(),
                path: cert.path.clone(),
                arn,
            })
        })
    }

    fn find_server_cert<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Option<ServerCert>, CloudError>> {
        Box::pin(async move { Ok(self.state.lock().unwrap().certs.get(name).cloned()) })
    }

    fn delete_server_cert<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.record(format!("delete_server_cert {name}"))?;
            let mut state = self.state.lock().unwrap();
            if state.cert_delete_conflicts > 0 {
                state.cert_delete_conflicts -= 1;
                return Err(CloudError::aws(
                    Some("DeleteConflict"),
                    format!("certificate {name} is in use"),
                ));
            }
            state.certs.remove(name).map(|_| ()).ok_or_else(|| not_found(name))
        })
    }
}

#[derive(Debug, Default)]
pub struct ElbState {
    pub load_balancers: BTreeMap<String, LoadBalancerDescription>,
    pub tags: BTreeMap<String, Vec<(String, String)>>,
    pub truncated: bool,
    /// Number of `CertificateNotFound` failures before a listener
    /// certificate switch succeeds.
    pub cert_not_found: u32,
}

#[derive(Debug, Default)]
pub struct FakeElb {
    pub state: Mutex<ElbState>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeElb {
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn seed(&self, lb: LoadBalancerDescription, tags: &[(&str, &str)]) {
        let mut state = self.state.lock().unwrap();
        state.tags.insert(
            lb.name.clone(),
            tags.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        state.load_balancers.insert(lb.name.clone(), lb);
    }

    fn with_lb(
        &self,
        name: &str,
        update: impl FnOnce(&mut LoadBalancerDescription),
    ) -> Result<(), CloudError> {
        let mut state = self.state.lock().unwrap();
        let lb = state.load_balancers.get_mut(name).ok_or_else(|| {
            CloudError::aws(Some("LoadBalancerNotFound"), format!("{name} not found"))
        })?;
        update(lb);
        Ok(())
    }
}

impl ElbApi for FakeElb {
    fn list_load_balancers(
        &self,
    ) -> BoxFuture<'_, Result<Page<LoadBalancerDescription>, CloudError>> {
        Box::pin(async move {
            self.record("list_load_balancers".into());
            let state = self.state.lock().unwrap();
            Ok(Page {
                items: state.load_balancers.values().cloned().collect(),
                truncated: state.truncated,
            })
        })
    }

    fn describe_tags<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Vec<(String, String)>, CloudError>> {
        Box::pin(async move {
            Ok(self
                .state
                .lock()
                .unwrap()
                .tags
                .get(name)
                .cloned()
                .unwrap_or_default())
        })
    }

    fn create_load_balancer<'a>(
        &'a self,
        request: &'a NewLoadBalancer,
    ) -> BoxFuture<'a, Result<String, CloudError>> {
        Box::pin(async move {
            self.record(format!("create_load_balancer {}", request.name));
            let dns_name = format!("{}.elb.amazonaws.com", request.name);
            let mut state = self.state.lock().unwrap();
            state.tags.insert(request.name.clone(), request.tags.clone());
            state.load_balancers.insert(
                request.name.clone(),
                LoadBalancerDescription {
                    name: request.name.clone(),
                    dns_name: dns_name.clone(),
                    scheme: request.scheme.clone(),
                    subnets: request.subnets.clone(),
                    security_groups: request.security_groups.clone(),
                    listeners: request.listeners.clone(),
                    health_check_target: None,
                },
            );
            Ok(dns_name)
        })
    }

    fn delete_load_balancer<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.record(format!("delete_load_balancer {name}"));
            let mut state = self.state.lock().unwrap();
            state.tags.remove(name);
            state.load_balancers.remove(name);
            Ok(())
        })
    }

    fn attach_subnets<'a>(
        &'a self,
        name: &'a str,
        subnets: &'a [String],
    ) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.record(format!("attach_subnets {name} {}", subnets.join(",")));
            self.with_lb(name, |lb| lb.subnets.extend(subnets.iter().cloned()))
        })
    }

    fn detach_subnets<'a>(
        &'a self,
        name: &'a str,
        subnets: &'a [String],
    ) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.record(format!("detach_subnets {name} {}", subnets.join(",")));
            self.with_lb(name, |lb| lb.subnets.retain(|s| !subnets.contains(s)))
        })
    }

    fn apply_security_groups<'a>(
        &'a self,
        name: &'a str,
        security_groups: &'a [String],
    ) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.record(format!("apply_security_groups {name}"));
            self.with_lb(name, |lb| lb.security_groups = security_groups.to_vec())
        })
    }

    fn configure_health_check<'a>(
        &'a self,
        name: &'a str,
        target: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.record(format!("configure_health_check {name} {target}"));
            self.with_lb(name, |lb| lb.health_check_target = Some(target.to_string()))
        })
    }

    fn set_listener_certificate<'a>(
        &'a self,
        name: &'a str,
        load_balancer_port: i32,
        certificate_arn: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.record(format!("set_listener_certificate {name} {load_balancer_port}"));
            {
                let mut state = self.state.lock().unwrap();
                if state.cert_not_found > 0 {
                    state.cert_not_found -= 1;
                    return Err(CloudError::aws(
                        Some("CertificateNotFound"),
                        format!("{certificate_arn} not found"),
                    ));
                }
            }
            self.with_lb(name, |lb| {
                for listener in lb
                    .listeners
                    .iter_mut()
                    .filter(|l| l.load_balancer_port == load_balancer_port)
                {
                    listener.ssl_certificate_id = Some(certificate_arn.to_string());
                }
            })
        })
    }
}

pub struct Harness {
    pub ctx: Context,
    pub iam: Arc<FakeIam>,
    pub elb: Arc<FakeElb>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_env(Environment::new(ENV, REGION))
    }

    pub fn with_env(env: Environment) -> Self {
        let iam = Arc::new(FakeIam::default());
        let elb = Arc::new(FakeElb::default());
        let clients = Clients::new(iam.clone(), elb.clone());
        Self {
            ctx: Context::with_clients(env, clients),
            iam,
            elb,
        }
    }

    pub fn dry_run() -> Self {
        Self::with_env(Environment {
            dry_run: true,
            ..Environment::new(ENV, REGION)
        })
    }
}

pub fn manifest(json: serde_json::Value) -> Manifest {
    Manifest::from_json(&json.to_string()).expect("manifest should parse")
}

/// Trust policy for EC2 in the standard partition.
pub fn ec2_trust() -> String {
    cloud_manager::policy::assume_ec2_role_document("amazonaws.com")
}
