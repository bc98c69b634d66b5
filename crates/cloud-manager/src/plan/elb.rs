use crate::plan::{Action, Tasks};
use crate::resource::{Elb, Kind, ResourceStatus, Resources};

pub fn plan(resources: &Resources, tasks: &mut Tasks) {
    for elb in resources.iter::<Elb>() {
        match elb.status {
            ResourceStatus::New => tasks.push(elb.key(), Action::CreateElb),
            ResourceStatus::Changed => {
                if elb.drift().requires_replacement() {
                    tasks.push(elb.key(), Action::DeleteElb);
                    tasks.push(elb.key(), Action::CreateElb);
                } else {
                    tasks.push(elb.key(), Action::UpdateElb);
                }
            }
            ResourceStatus::ToDelete => tasks.push(elb.key(), Action::DeleteElb),
            ResourceStatus::Existing | ResourceStatus::Deleted => {}
        }
    }
}
