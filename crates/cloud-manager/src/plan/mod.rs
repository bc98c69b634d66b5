//! Task planning.
//!
//! Each kind's planner turns resource statuses into tasks. The
//! orchestrating [`plan`] calls them in [`PLAN_ORDER`], a fixed order that
//! places dependencies first: roles before the instance profiles holding
//! them, certificates (uploaded by the ELB tasks) before listeners that
//! use them. A new kind must be slotted into that order by hand.

pub mod elb;
pub mod instance_profile;
pub mod role;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::env::Environment;
use crate::error::CloudError;
use crate::resource::{ResourceKey, ResourceKind, Resources};

pub const PLAN_ORDER: [ResourceKind; 3] = [
    ResourceKind::Role,
    ResourceKind::InstanceProfile,
    ResourceKind::Elb,
];

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "create-iam-role")]
    CreateRole,
    #[serde(rename = "update-iam-role")]
    UpdateRole,
    #[serde(rename = "del-iam-role")]
    DeleteRole,
    #[serde(rename = "create-instance-profile")]
    CreateInstanceProfile,
    #[serde(rename = "update-instance-profile")]
    UpdateInstanceProfile,
    #[serde(rename = "del-instance-profile")]
    DeleteInstanceProfile,
    #[serde(rename = "create-elb")]
    CreateElb,
    #[serde(rename = "update-elb")]
    UpdateElb,
    #[serde(rename = "del-elb")]
    DeleteElb,
}

impl Action {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::CreateRole => "create-iam-role",
            Self::UpdateRole => "update-iam-role",
            Self::DeleteRole => "del-iam-role",
            Self::CreateInstanceProfile => "create-instance-profile",
            Self::UpdateInstanceProfile => "update-instance-profile",
            Self::DeleteInstanceProfile => "del-instance-profile",
            Self::CreateElb => "create-elb",
            Self::UpdateElb => "update-elb",
            Self::DeleteElb => "del-elb",
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::CreateRole | Self::UpdateRole | Self::DeleteRole => ResourceKind::Role,
            Self::CreateInstanceProfile
            | Self::UpdateInstanceProfile
            | Self::DeleteInstanceProfile => ResourceKind::InstanceProfile,
            Self::CreateElb | Self::UpdateElb | Self::DeleteElb => ResourceKind::Elb,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One unit of work: an action bound to one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub key: ResourceKey,
    pub action: Action,
}

impl Task {
    pub fn new(key: ResourceKey, action: Action) -> Self {
        Self { key, action }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.action, self.key)
    }
}

/// Ordered task list shared by the per-kind planners.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tasks {
    tasks: Vec<Task>,
}

impl Tasks {
    pub fn push(&mut self, key: ResourceKey, action: Action) {
        self.tasks.push(Task::new(key, action));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Task> {
        self.tasks.iter()
    }

    pub fn as_slice(&self) -> &[Task] {
        &self.tasks
    }
}

impl<'a> IntoIterator for &'a Tasks {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}

/// Plan every kind in [`PLAN_ORDER`].
///
/// Planning reads statuses only, so re-planning after a successful run
/// yields no tasks.
pub fn plan(env: &Environment, resources: &Resources) -> Result<Tasks, CloudError> {
    let mut tasks = Tasks::default();
    for kind in PLAN_ORDER {
        match kind {
            ResourceKind::Role => role::plan(resources, &mut tasks)?,
            ResourceKind::InstanceProfile => instance_profile::plan(env, resources, &mut tasks),
            ResourceKind::Elb => elb::plan(resources, &mut tasks),
        }
    }
    tracing::info!(tasks = tasks.len(), "planned tasks");
    Ok(tasks)
}
