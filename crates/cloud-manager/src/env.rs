use std::path::PathBuf;
use std::sync::OnceLock;

use crate::client::Clients;
use crate::error::CloudError;

/// Process-wide settings for one planning/execution run.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Prefix of every managed remote object name.
    pub name: String,
    pub region: String,
    /// Directory holding `env.json` and the optional `aws.properties`.
    pub env_dir: PathBuf,
    pub dry_run: bool,
}

impl Environment {
    pub fn new(name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            region: region.into(),
            env_dir: PathBuf::from("."),
            dry_run: false,
        }
    }

    /// `<env>-`, the prefix every managed remote object carries.
    pub fn name_prefix(&self) -> String {
        format!("{}-", self.name)
    }

    /// DNS suffix of AWS service principals in this region's partition.
    pub fn region_domain(&self) -> &'static str {
        if self.region.starts_with("cn-") {
            "amazonaws.com.cn"
        } else {
            "amazonaws.com"
        }
    }
}

/// Threaded into every loader, planner and task.
///
/// The client bundle is installed once per run; a second install is a
/// programming error.
pub struct Context {
    pub env: Environment,
    clients: OnceLock<Clients>,
}

impl Context {
    pub fn new(env: Environment) -> Self {
        Self {
            env,
            clients: OnceLock::new(),
        }
    }

    pub fn with_clients(env: Environment, clients: Clients) -> Self {
        let ctx = Self::new(env);
        // A fresh OnceLock always accepts the first value.
        let _ = ctx.clients.set(clients);
        ctx
    }

    pub fn install(&self, clients: Clients) -> Result<(), CloudError> {
        self.clients.set(clients).map_err(|_| {
            CloudError::Invariant("clients should only be initialized once".into())
        })
    }

    pub fn clients(&self) -> Result<&Clients, CloudError> {
        self.clients
            .get()
            .ok_or_else(|| CloudError::Invariant("clients are not initialized".into()))
    }
}

/// Naming convention shared by loaders and resources.
pub mod naming {
    /// `<env>-<id>`
    pub fn remote_name(env: &str, id: &str) -> String {
        format!("{env}-{id}")
    }

    /// Recover the local resource id from a remote name, or `None` for
    /// objects that do not follow the convention.
    pub fn resource_id<'a>(env: &str, remote_name: &'a str) -> Option<&'a str> {
        remote_name
            .strip_prefix(env)
            .and_then(|rest| rest.strip_prefix('-'))
            .filter(|id| !id.is_empty())
    }
}
