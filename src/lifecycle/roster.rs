//! Applicant roster and single-assignee bookkeeping for a task.

use mongodb::bson::oid::ObjectId;

use super::error::{LifecycleError, LifecycleResult};
use crate::models::{Task, TaskStatus};

pub fn add_applicant(task: &mut Task, helper_id: ObjectId) -> LifecycleResult<()> {
    if task.posted_by == helper_id {
        return Err(LifecycleError::forbidden("you cannot apply to your own task"));
    }
    if !task.status.accepts_applications() {
        return Err(LifecycleError::invalid_state(
            "task is not open for applications",
        ));
    }
    if task.is_applicant(&helper_id) {
        return Err(LifecycleError::conflict(
            "you have already applied to this task",
        ));
    }

    // Decided on the status before the append so later applicants never move it.
    let first_applicant = task.status == TaskStatus::Open;
    task.applicants.push(helper_id);
    if first_applicant {
        task.status = TaskStatus::Pending;
    }

    Ok(())
}

pub fn assign(task: &mut Task, helper_id: ObjectId) -> LifecycleResult<()> {
    if !matches!(
        task.status,
        TaskStatus::Open | TaskStatus::Pending | TaskStatus::InProgress
    ) {
        return Err(LifecycleError::invalid_state(format!(
            "a helper cannot be assigned to a task that is {}",
            task.status
        )));
    }
    if !task.is_applicant(&helper_id) {
        return Err(LifecycleError::conflict(
            "only a helper who applied to this task can be assigned",
        ));
    }
    if task.assigned_to == Some(helper_id) {
        return Err(LifecycleError::conflict(
            "this helper is already assigned to the task",
        ));
    }

    task.assigned_to = Some(helper_id);
    task.status = TaskStatus::InProgress;

    Ok(())
}

pub fn remove_applicant(task: &mut Task, helper_id: &ObjectId) -> LifecycleResult<()> {
    let before = task.applicants.len();
    task.applicants.retain(|id| id != helper_id);
    if task.applicants.len() == before {
        return Err(LifecycleError::not_found(
            "you have not applied to this task",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::controller::tests::sample_task;

    #[test]
    fn first_applicant_moves_open_task_to_pending() {
        let owner = ObjectId::new();
        let mut task = sample_task(owner);
        let helper = ObjectId::new();

        add_applicant(&mut task, helper).expect("first application");

        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.applicants, vec![helper]);
    }

    #[test]
    fn later_applicants_leave_pending_untouched() {
        let mut task = sample_task(ObjectId::new());
        let (h1, h2) = (ObjectId::new(), ObjectId::new());

        add_applicant(&mut task, h1).expect("first application");
        add_applicant(&mut task, h2).expect("second application");

        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.applicants, vec![h1, h2]);
    }

    #[test]
    fn duplicate_application_is_a_conflict_without_a_second_entry() {
        let mut task = sample_task(ObjectId::new());
        let helper = ObjectId::new();
        add_applicant(&mut task, helper).expect("first application");

        let err = add_applicant(&mut task, helper).unwrap_err();

        assert!(matches!(err, LifecycleError::Conflict(_)));
        assert_eq!(task.applicants.len(), 1);
    }

    #[test]
    fn owner_cannot_apply_to_own_task() {
        let owner = ObjectId::new();
        let mut task = sample_task(owner);

        let err = add_applicant(&mut task, owner).unwrap_err();

        assert!(matches!(err, LifecycleError::Forbidden(_)));
        assert_eq!(task.status, TaskStatus::Open);
    }

    #[test]
    fn applications_closed_once_in_progress() {
        let mut task = sample_task(ObjectId::new());
        task.status = TaskStatus::InProgress;

        let err = add_applicant(&mut task, ObjectId::new()).unwrap_err();

        assert!(matches!(err, LifecycleError::InvalidState(_)));
    }

    #[test]
    fn assign_requires_an_applicant() {
        let mut task = sample_task(ObjectId::new());
        add_applicant(&mut task, ObjectId::new()).expect("application");

        let err = assign(&mut task, ObjectId::new()).unwrap_err();

        assert!(matches!(err, LifecycleError::Conflict(_)));
        assert_eq!(task.assigned_to, None);
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn assign_replaces_the_single_assignee() {
        let mut task = sample_task(ObjectId::new());
        let (h1, h2) = (ObjectId::new(), ObjectId::new());
        add_applicant(&mut task, h1).expect("h1 applies");
        add_applicant(&mut task, h2).expect("h2 applies");

        assign(&mut task, h1).expect("assign h1");
        assign(&mut task, h2).expect("reassign to h2");

        assert_eq!(task.assigned_to, Some(h2));
        assert_eq!(task.status, TaskStatus::InProgress);
    }

    #[test]
    fn removing_a_non_applicant_is_not_found() {
        let mut task = sample_task(ObjectId::new());

        let err = remove_applicant(&mut task, &ObjectId::new()).unwrap_err();

        assert!(matches!(err, LifecycleError::NotFound(_)));
    }
}
