//! Desired-state resource model and the registry that owns it.

pub mod elb;
pub mod instance_profile;
pub mod role;

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CloudError;

pub use crate::resource::elb::{Elb, ElbDrift, RemoteElb, ServerCertSpec};
pub use crate::resource::instance_profile::{InstanceProfile, InstanceProfileDrift};
pub use crate::resource::role::{RemoteRole, Role, RoleDrift};

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Role,
    InstanceProfile,
    Elb,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Role => "iam-role",
            Self::InstanceProfile => "instance-profile",
            Self::Elb => "elb",
        })
    }
}

/// Composite key for addressing a resource in the registry.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ResourceKey {
    pub kind: ResourceKind,
    pub id: String,
}

impl ResourceKey {
    pub fn new(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.id)
    }
}

/// Lifecycle of one resource within a planning cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    /// Declared locally, not seen remotely.
    New,
    /// Declared locally and found remotely, in sync.
    Existing,
    /// Declared locally and found remotely, desired state differs.
    Changed,
    /// Found remotely, no longer declared locally.
    ToDelete,
    Deleted,
}

#[derive(Debug, Clone)]
pub enum Resource {
    Role(Role),
    InstanceProfile(InstanceProfile),
    Elb(Elb),
}

impl Resource {
    pub fn key(&self) -> ResourceKey {
        match self {
            Self::Role(r) => r.key(),
            Self::InstanceProfile(r) => r.key(),
            Self::Elb(r) => r.key(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Role(r) => &r.name,
            Self::InstanceProfile(r) => &r.name,
            Self::Elb(r) => &r.name,
        }
    }

    pub fn status(&self) -> ResourceStatus {
        match self {
            Self::Role(r) => r.status,
            Self::InstanceProfile(r) => r.status,
            Self::Elb(r) => r.status,
        }
    }
}

/// Implemented by every concrete resource so the registry can hand out
/// typed references.
pub trait Kind: Sized + 'static {
    const KIND: ResourceKind;

    fn id(&self) -> &str;
    fn status(&self) -> ResourceStatus;
    fn set_status(&mut self, status: ResourceStatus);

    fn wrap(self) -> Resource;
    fn peek(resource: &Resource) -> Option<&Self>;
    fn peek_mut(resource: &mut Resource) -> Option<&mut Self>;

    /// A resource known only from remote state, pending deletion until a
    /// local declaration adopts it.
    fn discovered(id: &str, name: &str) -> Self;

    /// Take the desired configuration of a local declaration, keeping
    /// remote metadata.
    fn adopt(&mut self, desired: Self);

    fn key(&self) -> ResourceKey {
        ResourceKey::new(Self::KIND, self.id())
    }

    /// Loader hook: the resource matched a remote object.
    fn found_in_remote(&mut self) {
        if self.status() == ResourceStatus::New {
            self.set_status(ResourceStatus::Existing);
        }
    }
}

/// Registry of every resource, unique per (kind, id).
#[derive(Debug, Default)]
pub struct Resources {
    entries: BTreeMap<ResourceKey, Resource>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &ResourceKey) -> Option<&Resource> {
        self.entries.get(key)
    }

    pub fn all(&self) -> impl Iterator<Item = &Resource> {
        self.entries.values()
    }

    /// Register a resource. A second resource with the same key is a
    /// configuration mistake.
    pub fn add<T: Kind>(&mut self, resource: T) -> Result<&mut T, CloudError> {
        let key = resource.key();
        match self.entries.entry(key.clone()) {
            Entry::Occupied(_) => Err(CloudError::Invariant(format!(
                "duplicate resource: {key}"
            ))),
            Entry::Vacant(slot) => T::peek_mut(slot.insert(resource.wrap()))
                .ok_or_else(|| kind_mismatch(&key)),
        }
    }

    pub fn find<T: Kind>(&self, id: &str) -> Option<&T> {
        self.entries
            .get(&ResourceKey::new(T::KIND, id))
            .and_then(T::peek)
    }

    pub fn find_mut<T: Kind>(&mut self, id: &str) -> Option<&mut T> {
        self.entries
            .get_mut(&ResourceKey::new(T::KIND, id))
            .and_then(T::peek_mut)
    }

    /// Find-or-create: how remote objects without a local declaration
    /// enter the model.
    pub fn find_or_insert_with<T: Kind>(
        &mut self,
        id: &str,
        create: impl FnOnce() -> T,
    ) -> Result<&mut T, CloudError> {
        let key = ResourceKey::new(T::KIND, id);
        let entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| create().wrap());
        T::peek_mut(entry).ok_or_else(|| kind_mismatch(&key))
    }

    /// Merge a local declaration. Unseen ids become `New`; ids already
    /// discovered remotely adopt the declaration and become `Existing`.
    pub fn declare<T: Kind>(&mut self, mut desired: T) -> Result<(), CloudError> {
        let key = desired.key();
        match self.entries.get_mut(&key) {
            Some(entry) => {
                let existing = T::peek_mut(entry).ok_or_else(|| kind_mismatch(&key))?;
                if existing.status() != ResourceStatus::ToDelete {
                    return Err(CloudError::Invariant(format!(
                        "duplicate resource: {key}"
                    )));
                }
                existing.adopt(desired);
                existing.set_status(ResourceStatus::Existing);
            }
            None => {
                desired.set_status(ResourceStatus::New);
                self.entries.insert(key, desired.wrap());
            }
        }
        Ok(())
    }

    pub fn iter<T: Kind>(&self) -> impl Iterator<Item = &T> {
        self.entries.values().filter_map(T::peek)
    }

    pub fn iter_mut<T: Kind>(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.values_mut().filter_map(T::peek_mut)
    }
}

fn kind_mismatch(key: &ResourceKey) -> CloudError {
    CloudError::Invariant(format!("registry entry {key} holds a different kind"))
}
