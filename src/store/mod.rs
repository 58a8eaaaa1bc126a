//! Persistence contracts used by the lifecycle engine.
//!
//! The MongoDB adapters in [`mongo`] back the running server; the in-memory
//! adapters in `memory` back the test suites.

pub mod mongo;
#[cfg(test)]
pub mod memory;

use crate::models::{PartyRole, Review, RoleRating, Task, TaskStatus};
use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    /// A unique index rejected the write.
    #[error("duplicate key in {0}")]
    DuplicateKey(&'static str),
}

/// A page of tasks plus the total number of matches.
#[derive(Debug, Clone, Default)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub total: u64,
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert(&self, task: &Task) -> StoreResult<()>;

    async fn find_by_id(&self, id: &ObjectId) -> StoreResult<Option<Task>>;

    /// Replaces the stored task only when it still carries `expected_version`
    /// and `expected_status`. Returns `false` when another write got there first.
    async fn replace_if_current(
        &self,
        task: &Task,
        expected_version: i64,
        expected_status: TaskStatus,
    ) -> StoreResult<bool>;

    /// Ids of every task where `user_id` played `role`.
    async fn find_ids_by_role(&self, user_id: &ObjectId, role: PartyRole)
        -> StoreResult<Vec<ObjectId>>;

    /// Tasks still taking applications, newest first.
    async fn find_open(&self, category: Option<&str>, skip: u64, limit: i64)
        -> StoreResult<TaskPage>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Fails with [`StoreError::DuplicateKey`] when the
    /// (reviewer, reviewee, task) triple already exists.
    async fn insert(&self, review: &Review) -> StoreResult<()>;

    async fn exists(
        &self,
        reviewer_id: &ObjectId,
        reviewee_id: &ObjectId,
        task_id: &ObjectId,
    ) -> StoreResult<bool>;

    async fn find_for_reviewee(
        &self,
        reviewee_id: &ObjectId,
        task_ids: &[ObjectId],
    ) -> StoreResult<Vec<Review>>;
}

#[async_trait]
pub trait UserRatings: Send + Sync {
    /// Returns `false` when the user does not exist.
    async fn set_rating(&self, user_id: &ObjectId, rating: &RoleRating) -> StoreResult<bool>;
}

#[async_trait]
pub trait PetDirectory: Send + Sync {
    async fn owner_of(&self, pet_id: &ObjectId) -> StoreResult<Option<ObjectId>>;
}
