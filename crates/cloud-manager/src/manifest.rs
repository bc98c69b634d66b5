use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::api::Listener;
use crate::env::Environment;
use crate::error::CloudError;
use crate::policy;
use crate::resource::elb::DEFAULT_HEALTH_CHECK;
use crate::resource::{Elb, InstanceProfile, Resources, Role, ServerCertSpec};

pub const MANIFEST_FILE: &str = "env.json";

/// Desired state of one environment, read from `<env_dir>/env.json`.
///
/// Resources are keyed by id; remote names are derived as `<name>-<id>`.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    /// Environment name, the prefix of every managed remote object.
    pub name: String,
    pub region: String,
    #[serde(default)]
    pub roles: BTreeMap<String, RoleSpec>,
    #[serde(default)]
    pub instance_profiles: BTreeMap<String, InstanceProfileSpec>,
    #[serde(default)]
    pub elbs: BTreeMap<String, ElbSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleSpec {
    #[serde(default)]
    pub path: Option<String>,
    /// Defaults to a trust policy for EC2 in the environment's partition.
    #[serde(default)]
    pub assume_role_policy_document: Option<Value>,
    /// Inline policy, stored under the role's name.
    #[serde(default)]
    pub policy_document: Option<Value>,
    #[serde(default)]
    pub managed_policy_arns: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstanceProfileSpec {
    #[serde(default)]
    pub path: Option<String>,
    /// Id of a role declared in the same manifest.
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ElbSpec {
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub subnets: Vec<String>,
    #[serde(default)]
    pub security_groups: Vec<String>,
    #[serde(default)]
    pub listeners: Vec<Listener>,
    /// e.g. `HTTP:80/health-check`
    #[serde(default)]
    pub health_check: Option<String>,
    #[serde(default)]
    pub server_cert: Option<ServerCertSpec>,
}

impl Manifest {
    pub fn load(env_dir: &Path) -> Result<Self, CloudError> {
        let path = env_dir.join(MANIFEST_FILE);
        tracing::info!(file = %path.display(), "load manifest");
        let contents = std::fs::read_to_string(&path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, CloudError> {
        let manifest: Self = serde_json::from_str(json)?;
        if manifest.name.trim().is_empty() {
            return Err(CloudError::Config("manifest name is required".into()));
        }
        if manifest.region.trim().is_empty() {
            return Err(CloudError::Config("manifest region is required".into()));
        }
        Ok(manifest)
    }

    pub fn environment(&self, env_dir: &Path, dry_run: bool) -> Environment {
        Environment {
            env_dir: env_dir.to_path_buf(),
            dry_run,
            ..Environment::new(&self.name, &self.region)
        }
    }

    /// Merge every declaration into the registry.
    ///
    /// Runs after the loaders, so a declaration may land on a resource the
    /// loaders already found remotely.
    pub fn declare_into(&self, env: &Environment, resources: &mut Resources) -> Result<(), CloudError> {
        let mut roles = BTreeMap::new();
        for (id, spec) in &self.roles {
            roles.insert(id.as_str(), role(env, id, spec)?);
        }

        let mut profiles = Vec::with_capacity(self.instance_profiles.len());
        for (id, spec) in &self.instance_profiles {
            let mut profile = InstanceProfile::new(env, id);
            if let Some(path) = &spec.path {
                profile.path = path.clone();
            }
            if let Some(role_id) = &spec.role {
                let role = roles.get_mut(role_id.as_str()).ok_or_else(|| {
                    CloudError::Config(format!(
                        "instance profile {id} references undeclared role {role_id}"
                    ))
                })?;
                if let Some(other) = &role.instance_profile {
                    return Err(CloudError::Config(format!(
                        "role {role_id} is already in instance profile {other}"
                    )));
                }
                role.instance_profile = Some(id.clone());
                profile.role = Some(role_id.clone());
            }
            profiles.push(profile);
        }

        for role in roles.into_values() {
            resources.declare(role)?;
        }
        for profile in profiles {
            resources.declare(profile)?;
        }
        for (id, spec) in &self.elbs {
            resources.declare(elb(env, id, spec)?)?;
        }
        Ok(())
    }
}

fn role(env: &Environment, id: &str, spec: &RoleSpec) -> Result<Role, CloudError> {
    let mut role = Role::new(env, id);
    if let Some(path) = &spec.path {
        role.path = path.clone();
    }
    if let Some(document) = &spec.assume_role_policy_document {
        role.assume_role_policy_document = serde_json::to_string(document)?;
    }
    policy::validate(&role.assume_role_policy_document)
        .map_err(|e| CloudError::Config(format!("role {id}: {e}")))?;
    role.policy_document = spec
        .policy_document
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    role.managed_policy_arns = spec.managed_policy_arns.clone();
    Ok(role)
}

fn elb(env: &Environment, id: &str, spec: &ElbSpec) -> Result<Elb, CloudError> {
    if spec.listeners.is_empty() {
        return Err(CloudError::Config(format!("elb {id} requires at least one listener")));
    }
    if spec.listeners.iter().any(Listener::is_secure) && spec.server_cert.is_none() {
        return Err(CloudError::Config(format!(
            "elb {id} has a secure listener but no server_cert"
        )));
    }
    let mut elb = Elb::new(env, id);
    elb.public = spec.public;
    elb.subnets = spec.subnets.clone();
    elb.security_groups = spec.security_groups.clone();
    elb.listeners = spec.listeners.clone();
    elb.health_check = spec
        .health_check
        .clone()
        .unwrap_or_else(|| DEFAULT_HEALTH_CHECK.to_string());
    elb.server_cert = spec.server_cert.clone();
    Ok(elb)
}
