//! The task state machine.
//!
//! Every mutation reads the task, validates the request against its current
//! status and the actor's relation to it, and writes the result back with a
//! version/status precondition. A lost race re-reads and re-validates; a
//! failed guard is returned to the caller as-is.

use chrono::{DateTime as ChronoDateTime, Utc};
use log::{debug, info, warn};
use mongodb::bson::{oid::ObjectId, DateTime};
use std::sync::Arc;
use validator::Validate;

use super::error::{LifecycleError, LifecycleResult};
use super::reputation::ReputationAggregator;
use super::roster;
use crate::models::{
    CancelOutcome, NewReview, NewTask, Party, PartyRole, Review, RoleRating, Task, TaskStatus,
};
use crate::store::{PetDirectory, ReviewStore, StoreError, TaskPage, TaskStore, UserRatings};

pub const DEFAULT_CAS_RETRIES: u32 = 3;

/// A persisted review and the reviewee's refreshed rating.
///
/// `reviewee_rating` is `None` when aggregation failed after the review was
/// stored; the review stands and the rating can be recomputed later.
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub review: Review,
    pub reviewee_rating: Option<RoleRating>,
}

#[derive(Clone)]
pub struct TaskLifecycle {
    tasks: Arc<dyn TaskStore>,
    reviews: Arc<dyn ReviewStore>,
    pets: Arc<dyn PetDirectory>,
    reputation: ReputationAggregator,
    cas_retries: u32,
}

impl TaskLifecycle {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        reviews: Arc<dyn ReviewStore>,
        users: Arc<dyn UserRatings>,
        pets: Arc<dyn PetDirectory>,
    ) -> Self {
        let reputation = ReputationAggregator::new(tasks.clone(), reviews.clone(), users);
        Self {
            tasks,
            reviews,
            pets,
            reputation,
            cas_retries: DEFAULT_CAS_RETRIES,
        }
    }

    pub fn with_cas_retries(mut self, cas_retries: u32) -> Self {
        self.cas_retries = cas_retries.max(1);
        self
    }

    pub fn reputation(&self) -> &ReputationAggregator {
        &self.reputation
    }

    // ========================================================================
    // READS
    // ========================================================================

    pub async fn get_task(&self, task_id: &ObjectId) -> LifecycleResult<Task> {
        self.tasks
            .find_by_id(task_id)
            .await?
            .ok_or_else(|| LifecycleError::not_found("task not found"))
    }

    pub async fn list_open_tasks(
        &self,
        category: Option<&str>,
        page: i64,
        limit: i64,
    ) -> LifecycleResult<TaskPage> {
        let page = page.max(1);
        let limit = limit.clamp(1, 100);
        let skip = u64::try_from(page.saturating_sub(1).saturating_mul(limit)).unwrap_or(u64::MAX);

        Ok(self.tasks.find_open(category, skip, limit).await?)
    }

    /// Reviews received by `user_id`, optionally limited to one role.
    pub async fn reviews_for_user(
        &self,
        user_id: &ObjectId,
        role: Option<PartyRole>,
    ) -> LifecycleResult<Vec<Review>> {
        let roles = match role {
            Some(role) => vec![role],
            None => vec![PartyRole::Owner, PartyRole::Helper],
        };

        let mut reviews = Vec::new();
        for role in roles {
            reviews.extend(self.reputation.reviews_received(user_id, role).await?);
        }
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(reviews)
    }

    // ========================================================================
    // TRANSITIONS
    // ========================================================================

    pub async fn create_task(&self, actor: &ObjectId, input: NewTask) -> LifecycleResult<Task> {
        let input = input.trimmed();
        input.validate()?;
        if input.reward.is_none() && blank(input.reward_text.as_deref()) {
            return Err(LifecycleError::validation(
                "a reward or a reward description is required",
            ));
        }
        let scheduled_at = input
            .scheduled_at
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(parse_schedule)
            .transpose()?;

        match self.pets.owner_of(&input.pet_id).await? {
            None => return Err(LifecycleError::not_found("pet not found")),
            Some(owner) if &owner != actor => {
                return Err(LifecycleError::forbidden(
                    "you can only post tasks for your own pets",
                ));
            }
            Some(_) => {}
        }

        let now = DateTime::now();
        let task = Task {
            id: ObjectId::new(),
            title: input.title,
            description: input.description,
            category: input.category,
            location: input.location,
            reward: input.reward,
            reward_text: input.reward_text,
            scheduled_at,
            pet_id: input.pet_id,
            status: TaskStatus::Open,
            applicants: Vec::new(),
            assigned_to: None,
            posted_by: *actor,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        self.tasks.insert(&task).await?;
        info!("task {} created by {}", task.id, actor);

        Ok(task)
    }

    pub async fn apply(&self, actor: &ObjectId, task_id: &ObjectId) -> LifecycleResult<Task> {
        let (task, ()) = self
            .mutate(task_id, "apply", |task| roster::add_applicant(task, *actor))
            .await?;
        Ok(task)
    }

    pub async fn assign(
        &self,
        actor: &ObjectId,
        task_id: &ObjectId,
        helper_id: &ObjectId,
    ) -> LifecycleResult<Task> {
        let (task, ()) = self
            .mutate(task_id, "assign", |task| {
                if task.party_of(actor) != Party::Owner {
                    return Err(LifecycleError::forbidden(
                        "only the task owner can assign a helper",
                    ));
                }
                roster::assign(task, *helper_id)
            })
            .await?;
        Ok(task)
    }

    pub async fn complete(&self, actor: &ObjectId, task_id: &ObjectId) -> LifecycleResult<Task> {
        let (task, ()) = self
            .mutate(task_id, "complete", |task| {
                if task.party_of(actor) != Party::AssignedHelper {
                    return Err(LifecycleError::forbidden(
                        "only the assigned helper can mark a task as complete",
                    ));
                }
                expect_status(task, TaskStatus::InProgress, "task is not in progress")?;
                task.status = TaskStatus::PendingConfirmation;
                Ok(())
            })
            .await?;
        Ok(task)
    }

    pub async fn confirm(&self, actor: &ObjectId, task_id: &ObjectId) -> LifecycleResult<Task> {
        let (task, ()) = self
            .mutate(task_id, "confirm", |task| {
                if task.party_of(actor) != Party::Owner {
                    return Err(LifecycleError::forbidden(
                        "only the task owner can confirm completion",
                    ));
                }
                expect_status(
                    task,
                    TaskStatus::PendingConfirmation,
                    "task is not awaiting confirmation",
                )?;
                task.status = TaskStatus::Completed;
                Ok(())
            })
            .await?;
        Ok(task)
    }

    /// Cancels the task, or withdraws the actor's application when they are
    /// only an applicant.
    pub async fn cancel(
        &self,
        actor: &ObjectId,
        task_id: &ObjectId,
    ) -> LifecycleResult<(Task, CancelOutcome)> {
        self.mutate(task_id, "cancel", |task| {
            let party = task.party_of(actor);
            if party == Party::Outsider {
                return Err(LifecycleError::forbidden(
                    "only the owner, the assigned helper or an applicant can cancel this task",
                ));
            }
            if task.status.is_terminal() {
                return Err(LifecycleError::invalid_state(format!(
                    "task is already {}",
                    task.status
                )));
            }

            if party == Party::Applicant {
                roster::remove_applicant(task, actor)?;
                return Ok(CancelOutcome::Withdrawn);
            }
            task.status = TaskStatus::Cancelled;
            Ok(CancelOutcome::Cancelled)
        })
        .await
    }

    pub async fn submit_review(
        &self,
        actor: &ObjectId,
        task_id: &ObjectId,
        input: NewReview,
    ) -> LifecycleResult<ReviewOutcome> {
        input.validate()?;
        let task = self.get_task(task_id).await?;

        if !matches!(task.party_of(actor), Party::Owner | Party::AssignedHelper) {
            return Err(LifecycleError::forbidden(
                "only the owner or the assigned helper can review this task",
            ));
        }
        if task.status != TaskStatus::Completed {
            return Err(LifecycleError::invalid_state(
                "reviews can only be left on completed tasks",
            ));
        }
        if task.counterpart_of(actor) != Some(input.reviewee_id) {
            return Err(LifecycleError::validation(
                "you can only review the other party of this task",
            ));
        }
        if self
            .reviews
            .exists(actor, &input.reviewee_id, task_id)
            .await?
        {
            return Err(duplicate_review());
        }

        let review = Review {
            id: ObjectId::new(),
            reviewer_id: *actor,
            reviewee_id: input.reviewee_id,
            task_id: task.id,
            rating: input.rating,
            comment: input.comment,
            created_at: DateTime::now(),
        };
        match self.reviews.insert(&review).await {
            Ok(()) => {}
            Err(StoreError::DuplicateKey(_)) => return Err(duplicate_review()),
            Err(e) => return Err(e.into()),
        }
        info!(
            "review {} on task {} by {} for {}",
            review.id, task.id, actor, review.reviewee_id
        );

        let role = if review.reviewee_id == task.posted_by {
            PartyRole::Owner
        } else {
            PartyRole::Helper
        };
        let reviewee_rating = match self.reputation.recompute(&review.reviewee_id, role).await {
            Ok(rating) => Some(rating),
            Err(e) => {
                warn!(
                    "review {} stored but {} rating for {} was not refreshed: {}",
                    review.id,
                    role.as_str(),
                    review.reviewee_id,
                    e
                );
                None
            }
        };

        Ok(ReviewOutcome {
            review,
            reviewee_rating,
        })
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    /// Read-validate-write loop guarded by the task's version and status.
    async fn mutate<T, F>(
        &self,
        task_id: &ObjectId,
        operation: &'static str,
        mut transition: F,
    ) -> LifecycleResult<(Task, T)>
    where
        T: Send,
        F: FnMut(&mut Task) -> LifecycleResult<T> + Send,
    {
        for _ in 0..self.cas_retries {
            let mut task = self.get_task(task_id).await?;
            let expected_version = task.version;
            let expected_status = task.status;

            let outcome = match transition(&mut task) {
                Ok(outcome) => outcome,
                Err(e) => {
                    debug!("{} on task {} rejected: {}", operation, task_id, e);
                    return Err(e);
                }
            };
            task.version += 1;
            task.updated_at = DateTime::now();

            if self
                .tasks
                .replace_if_current(&task, expected_version, expected_status)
                .await?
            {
                info!(
                    "{} on task {}: {} -> {}",
                    operation, task_id, expected_status, task.status
                );
                return Ok((task, outcome));
            }
            debug!("task {} changed during {}, retrying", task_id, operation);
        }

        Err(LifecycleError::conflict(
            "task was modified concurrently, please retry",
        ))
    }
}

fn expect_status(task: &Task, status: TaskStatus, message: &str) -> LifecycleResult<()> {
    if task.status == status {
        Ok(())
    } else {
        Err(LifecycleError::invalid_state(message))
    }
}

fn duplicate_review() -> LifecycleError {
    LifecycleError::conflict("you have already reviewed this user for this task")
}

fn blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

fn parse_schedule(value: &str) -> LifecycleResult<DateTime> {
    ChronoDateTime::parse_from_rfc3339(value.trim())
        .map(|at| DateTime::from_chrono(at.with_timezone(&Utc)))
        .map_err(|_| LifecycleError::validation("scheduled_at must be an RFC 3339 timestamp"))
}
