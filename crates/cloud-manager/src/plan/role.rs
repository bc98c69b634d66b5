use crate::error::CloudError;
use crate::plan::{Action, Tasks};
use crate::resource::{Kind, ResourceStatus, Resources, Role};

pub fn plan(resources: &Resources, tasks: &mut Tasks) -> Result<(), CloudError> {
    for role in resources.iter::<Role>() {
        match role.status {
            ResourceStatus::New => tasks.push(role.key(), Action::CreateRole),
            ResourceStatus::Changed => {
                if role.drift()?.requires_replacement() {
                    tasks.push(role.key(), Action::DeleteRole);
                    tasks.push(role.key(), Action::CreateRole);
                } else {
                    tasks.push(role.key(), Action::UpdateRole);
                }
            }
            ResourceStatus::ToDelete => tasks.push(role.key(), Action::DeleteRole),
            ResourceStatus::Existing | ResourceStatus::Deleted => {}
        }
    }
    Ok(())
}
