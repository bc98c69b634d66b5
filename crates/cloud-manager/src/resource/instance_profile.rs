use crate::api::InstanceProfileDescription;
use crate::env::{naming, Environment};
use crate::resource::{Kind, Resource, ResourceKind, ResourceStatus};

#[derive(Debug, Clone)]
pub struct InstanceProfile {
    pub id: String,
    pub name: String,
    pub status: ResourceStatus,
    pub path: String,
    /// Id of the role to place in the profile.
    pub role: Option<String>,
    pub remote: Option<InstanceProfileDescription>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstanceProfileDrift {
    pub path: bool,
    pub roles: bool,
}

impl InstanceProfileDrift {
    pub fn any(&self) -> bool {
        self.path || self.roles
    }

    pub fn requires_replacement(&self) -> bool {
        self.path
    }
}

impl InstanceProfile {
    pub fn new(env: &Environment, id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: naming::remote_name(&env.name, id),
            status: ResourceStatus::New,
            path: "/".into(),
            role: None,
            remote: None,
        }
    }

    /// Remote name of the desired role, if any.
    pub fn role_name(&self, env: &Environment) -> Option<String> {
        self.role
            .as_deref()
            .map(|role| naming::remote_name(&env.name, role))
    }

    pub fn drift(&self, env: &Environment) -> InstanceProfileDrift {
        let Some(remote) = &self.remote else {
            return InstanceProfileDrift::default();
        };
        let roles = match self.role_name(env) {
            Some(name) => remote.role_names != [name],
            None => !remote.role_names.is_empty(),
        };
        InstanceProfileDrift {
            path: self.path != remote.path,
            roles,
        }
    }
}

impl Kind for InstanceProfile {
    const KIND: ResourceKind = ResourceKind::InstanceProfile;

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
        Resource::InstanceProfile(self)
    }

    fn peek(resource: &Resource) -> Option<&Self> {
        match resource {
            Resource::InstanceProfile(r) => Some(r),
            _ => None,
        }
    }

    fn peek_mut(resource: &mut Resource) -> Option<&mut Self> {
        match resource {
            Resource::InstanceProfile(r) => Some(r),
            _ => None,
        }
    }

    fn discovered(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            status: ResourceStatus::ToDelete,
            path: "/".into(),
            role: None,
            remote: None,
        }
    }

    fn adopt(&mut self, desired: Self) {
        self.name = desired.name;
        self.path = desired.path;
        self.role = desired.role;
    }
}
