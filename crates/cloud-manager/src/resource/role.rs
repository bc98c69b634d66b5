use crate::api::RoleDescription;
use crate::env::{naming, Environment};
use crate::error::CloudError;
use crate::policy::{self, Policy};
use crate::resource::{Kind, Resource, ResourceKind, ResourceStatus};

#[derive(Debug, Clone)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub status: ResourceStatus,
    pub path: String,
    pub assume_role_policy_document: String,
    /// Inline policy, stored under the role's own name.
    pub policy_document: Option<String>,
    pub managed_policy_arns: Vec<String>,
    /// Id of the instance profile this role is attached to.
    pub instance_profile: Option<String>,
    pub remote: Option<RemoteRole>,
}

/// What the loader found for a role.
#[derive(Debug, Clone)]
pub struct RemoteRole {
    pub role: RoleDescription,
    pub managed_policy_arns: Vec<String>,
    pub policy_document: Option<String>,
}

/// Which parts of a role differ from the declaration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleDrift {
    pub path: bool,
    pub assume_role_policy: bool,
    pub managed_policies: bool,
    pub inline_policy: bool,
}

impl RoleDrift {
    pub fn any(&self) -> bool {
        self.path || self.assume_role_policy || self.managed_policies || self.inline_policy
    }

    /// IAM cannot move a role to another path.
    pub fn requires_replacement(&self) -> bool {
        self.path
    }
}

impl Role {
    /// A role trusted by EC2 in the environment's partition.
    pub fn new(env: &Environment, id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: naming::remote_name(&env.name, id),
            status: ResourceStatus::New,
            path: "/".into(),
            assume_role_policy_document: policy::assume_ec2_role_document(env.region_domain()),
            policy_document: None,
            managed_policy_arns: Vec::new(),
            instance_profile: None,
            remote: None,
        }
    }

    /// Compare the declaration against the attached remote metadata.
    /// A role without remote metadata has no drift.
    pub fn drift(&self) -> Result<RoleDrift, CloudError> {
        let Some(remote) = &self.remote else {
            return Ok(RoleDrift::default());
        };

        let local_trust = Policy::from_json(&self.assume_role_policy_document)?;
        let remote_trust = Policy::from_remote(&remote.role.assume_role_policy_document)?;

        let inline_policy = match (&self.policy_document, &remote.policy_document) {
            (Some(local), Some(remote)) => {
                policy::policy_changed(&Policy::from_json(local)?, &Policy::from_remote(remote)?)
            }
            (Some(_), None) => true,
            (None, _) => false,
        };

        Ok(RoleDrift {
            path: self.path != remote.role.path,
            assume_role_policy: policy::policy_changed(&local_trust, &remote_trust),
            managed_policies: policy::managed_policy_changed(
                &self.managed_policy_arns,
                &remote.managed_policy_arns,
            ),
            inline_policy,
        })
    }
}

impl Kind for Role {
    const KIND: ResourceKind = ResourceKind::Role;

    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> ResourceStatus {
        self.status
    }

    fn set_status(&mut self, status: ResourceStatus) {
        self.status = status;
    }

    fn wrap(self) -> Resource {
        Resource::Role(self)
    }

    fn peek(resource: &Resource) -> Option<&Self> {
        match resource {
            Resource::Role(r) => Some(r),
            _ => None,
        }
    }

    fn peek_mut(resource: &mut Resource) -> Option<&mut Self> {
        match resource {
            Resource::Role(r) => Some(r),
            _ => None,
        }
    }

    fn discovered(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            status: ResourceStatus::ToDelete,
            path: "/".into(),
            assume_role_policy_document: String::new(),
            policy_document: None,
            managed_policy_arns: Vec::new(),
            instance_profile: None,
            remote: None,
        }
    }

    fn adopt(&mut self, desired: Self) {
        self.name = desired.name;
        self.path = desired.path;
        self.assume_role_policy_document = desired.assume_role_policy_document;
        self.policy_document = desired.policy_document;
        self.managed_policy_arns = desired.managed_policy_arns;
        if desired.instance_profile.is_some() {
            self.instance_profile = desired.instance_profile;
        }
    }
}
