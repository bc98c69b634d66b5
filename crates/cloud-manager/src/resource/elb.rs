use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;

use crate::api::{Listener, LoadBalancerDescription, ServerCert};
use crate::env::{naming, Environment};
use crate::resource::{Kind, Resource, ResourceKind, ResourceStatus};

/// Tag distinguishing load balancers created with the current layout from
/// legacy ones sharing the naming prefix.
pub const ELB_VERSION_TAG: &str = "cloud-manager:elb-version";
pub const ELB_VERSION: &str = "1";

pub const DEFAULT_HEALTH_CHECK: &str = "HTTP:80/health-check";

/// Classic load balancer.
#[derive(Debug, Clone)]
pub struct Elb {
    pub id: String,
    pub name: String,
    pub status: ResourceStatus,
    pub public: bool,
    pub subnets: Vec<String>,
    pub security_groups: Vec<String>,
    pub listeners: Vec<Listener>,
    pub health_check: String,
    pub server_cert: Option<ServerCertSpec>,
    pub remote: Option<RemoteElb>,
}

#[derive(Clone, Deserialize)]
pub struct ServerCertSpec {
    pub certificate_body: String,
    pub private_key: String,
    #[serde(default)]
    pub certificate_chain: Option<String>,
}

impl fmt::Debug for ServerCertSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerCertSpec")
            .field("certificate_body", &self.certificate_body)
            .field("private_key", &"<redacted>")
            .field("certificate_chain", &self.certificate_chain)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct RemoteElb {
    pub description: LoadBalancerDescription,
    /// Certificate served by the secure listener, when there is one.
    pub server_cert: Option<ServerCert>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElbDrift {
    pub scheme: bool,
    pub listeners: bool,
    pub subnets: bool,
    pub security_groups: bool,
    pub health_check: bool,
    pub server_cert: bool,
}

impl ElbDrift {
    pub fn any(&self) -> bool {
        self.scheme
            || self.listeners
            || self.subnets
            || self.security_groups
            || self.health_check
            || self.server_cert
    }

    /// Scheme and listener layout are fixed at creation.
    pub fn requires_replacement(&self) -> bool {
        self.scheme || self.listeners
    }
}

impl Elb {
    pub fn new(env: &Environment, id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: naming::remote_name(&env.name, id),
            status: ResourceStatus::New,
            public: false,
            subnets: Vec::new(),
            security_groups: Vec::new(),
            listeners: Vec::new(),
            health_check: DEFAULT_HEALTH_CHECK.into(),
            server_cert: None,
            remote: None,
        }
    }

    pub fn scheme(&self) -> &'static str {
        if self.public {
            "internet-facing"
        } else {
            "internal"
        }
    }

    pub fn drift(&self) -> ElbDrift {
        let Some(remote) = &self.remote else {
            return ElbDrift::default();
        };
        let lb = &remote.description;

        let listeners = self.listeners.len() != lb.listeners.len()
            || !self
                .listeners
                .iter()
                .all(|local| lb.listeners.iter().any(|r| local.same_endpoint(r)));

        let server_cert = match (&self.server_cert, &remote.server_cert) {
            (Some(local), Some(remote)) => {
                local.certificate_body.trim() != remote.certificate_body.trim()
            }
            (Some(_), None) => true,
            (None, _) => false,
        };

        ElbDrift {
            scheme: self.scheme() != lb.scheme,
            listeners,
            subnets: !same_members(&self.subnets, &lb.subnets),
            security_groups: !same_members(&self.security_groups, &lb.security_groups),
            health_check: lb.health_check_target.as_deref() != Some(self.health_check.as_str()),
            server_cert,
        }
    }
}

fn same_members(a: &[String], b: &[String]) -> bool {
    a.iter().collect::<BTreeSet<_>>() == b.iter().collect::<BTreeSet<_>>()
}

impl Kind for Elb {
    const KIND: ResourceKind = ResourceKind::Elb;

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
        Resource::Elb(self)
    }

    fn peek(resource: &Resource) -> Option<&Self> {
        match resource {
            Resource::Elb(r) => Some(r),
            _ => None,
        }
    }

    fn peek_mut(resource: &mut Resource) -> Option<&mut Self> {
        match resource {
            Resource::Elb(r) => Some(r),
            _ => None,
        }
    }

    fn discovered(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            status: ResourceStatus::ToDelete,
            public: false,
            subnets: Vec::new(),
            security_groups: Vec::new(),
            listeners: Vec::new(),
            health_check: DEFAULT_HEALTH_CHECK.into(),
            server_cert: None,
            remote: None,
        }
    }

    fn adopt(&mut self, desired: Self) {
        self.name = desired.name;
        self.public = desired.public;
        self.subnets = desired.subnets;
        self.security_groups = desired.security_groups;
        self.listeners = desired.listeners;
        self.health_check = desired.health_check;
        self.server_cert = desired.server_cert;
    }
}
