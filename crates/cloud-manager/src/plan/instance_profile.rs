use crate::env::Environment;
use crate::plan::{Action, Tasks};
use crate::resource::{InstanceProfile, Kind, ResourceStatus, Resources};

pub fn plan(env: &Environment, resources: &Resources, tasks: &mut Tasks) {
    for profile in resources.iter::<InstanceProfile>() {
        match profile.status {
            ResourceStatus::New => tasks.push(profile.key(), Action::CreateInstanceProfile),
            ResourceStatus::Changed => {
                if profile.drift(env).requires_replacement() {
                    tasks.push(profile.key(), Action::DeleteInstanceProfile);
                    tasks.push(profile.key(), Action::CreateInstanceProfile);
                } else {
                    tasks.push(profile.key(), Action::UpdateInstanceProfile);
                }
            }
            ResourceStatus::ToDelete => tasks.push(profile.key(), Action::DeleteInstanceProfile),
            ResourceStatus::Existing | ResourceStatus::Deleted => {}
        }
    }
}
