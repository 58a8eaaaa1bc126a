//! In-memory adapters for lifecycle tests.

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::{
    PetDirectory, ReviewStore, StoreError, StoreResult, TaskPage, TaskStore, UserRatings,
};
use crate::models::{PartyRole, Review, RoleRating, Task, TaskStatus};

#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    tasks: Arc<RwLock<HashMap<ObjectId, Task>>>,
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert(&self, task: &Task) -> StoreResult<()> {
        let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        if tasks.contains_key(&task.id) {
            return Err(StoreError::DuplicateKey("tasks"));
        }
        tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &ObjectId) -> StoreResult<Option<Task>> {
        let tasks = self.tasks.read().unwrap_or_else(PoisonError::into_inner);
        Ok(tasks.get(id).cloned())
    }

    async fn replace_if_current(
        &self,
        task: &Task,
        expected_version: i64,
        expected_status: TaskStatus,
    ) -> StoreResult<bool> {
        let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        match tasks.get_mut(&task.id) {
            Some(current)
                if current.version == expected_version && current.status == expected_status =>
            {
                *current = task.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_ids_by_role(
        &self,
        user_id: &ObjectId,
        role: PartyRole,
    ) -> StoreResult<Vec<ObjectId>> {
        let tasks = self.tasks.read().unwrap_or_else(PoisonError::into_inner);
        Ok(tasks
            .values()
            .filter(|task| match role {
                PartyRole::Owner => &task.posted_by == user_id,
                PartyRole::Helper => task.assigned_to.as_ref() == Some(user_id),
            })
            .map(|task| task.id)
            .collect())
    }

    async fn find_open(
        &self,
        category: Option<&str>,
        skip: u64,
        limit: i64,
    ) -> StoreResult<TaskPage> {
        let tasks = self.tasks.read().unwrap_or_else(PoisonError::into_inner);
        let mut open: Vec<Task> = tasks
            .values()
            .filter(|task| task.status.accepts_applications())
            .filter(|task| category.is_none_or(|c| task.category == c))
            .cloned()
            .collect();
        open.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = open.len() as u64;
        let tasks = open
            .into_iter()
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(0))
            .collect();

        Ok(TaskPage { tasks, total })
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryReviewStore {
    reviews: Arc<RwLock<Vec<Review>>>,
}

#[async_trait]
impl ReviewStore for InMemoryReviewStore {
    async fn insert(&self, review: &Review) -> StoreResult<()> {
        let mut reviews = self.reviews.write().unwrap_or_else(PoisonError::into_inner);
        let duplicate = reviews.iter().any(|r| {
            r.reviewer_id == review.reviewer_id
                && r.reviewee_id == review.reviewee_id
                && r.task_id == review.task_id
        });
        if duplicate {
            return Err(StoreError::DuplicateKey("reviews"));
        }
        reviews.push(review.clone());
        Ok(())
    }

    async fn exists(
        &self,
        reviewer_id: &ObjectId,
        reviewee_id: &ObjectId,
        task_id: &ObjectId,
    ) -> StoreResult<bool> {
        let reviews = self.reviews.read().unwrap_or_else(PoisonError::into_inner);
        Ok(reviews.iter().any(|r| {
            &r.reviewer_id == reviewer_id && &r.reviewee_id == reviewee_id && &r.task_id == task_id
        }))
    }

    async fn find_for_reviewee(
        &self,
        reviewee_id: &ObjectId,
        task_ids: &[ObjectId],
    ) -> StoreResult<Vec<Review>> {
        let reviews = self.reviews.read().unwrap_or_else(PoisonError::into_inner);
        Ok(reviews
            .iter()
            .rev()
            .filter(|r| &r.reviewee_id == reviewee_id && task_ids.contains(&r.task_id))
            .cloned()
            .collect())
    }
}

/// Users known to the store and the ratings written for them.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserRatings {
    users: Arc<RwLock<HashMap<ObjectId, HashMap<PartyRole, RoleRating>>>>,
}

impl InMemoryUserRatings {
    pub fn add_user(&self, user_id: ObjectId) {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        users.entry(user_id).or_default();
    }

    pub fn rating(&self, user_id: &ObjectId, role: PartyRole) -> Option<RoleRating> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        users.get(user_id)?.get(&role).copied()
    }
}

#[async_trait]
impl UserRatings for InMemoryUserRatings {
    async fn set_rating(&self, user_id: &ObjectId, rating: &RoleRating) -> StoreResult<bool> {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        match users.get_mut(user_id) {
            Some(ratings) => {
                ratings.insert(rating.role, *rating);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryPetDirectory {
    pets: Arc<RwLock<HashMap<ObjectId, ObjectId>>>,
}

impl InMemoryPetDirectory {
    pub fn add_pet(&self, owner_id: ObjectId) -> ObjectId {
        let pet_id = ObjectId::new();
        let mut pets = self.pets.write().unwrap_or_else(PoisonError::into_inner);
        pets.insert(pet_id, owner_id);
        pet_id
    }
}

#[async_trait]
impl PetDirectory for InMemoryPetDirectory {
    async fn owner_of(&self, pet_id: &ObjectId) -> StoreResult<Option<ObjectId>> {
        let pets = self.pets.read().unwrap_or_else(PoisonError::into_inner);
        Ok(pets.get(pet_id).copied())
    }
}

/// Fully wired in-memory collaborators for one test.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    pub tasks: InMemoryTaskStore,
    pub reviews: InMemoryReviewStore,
    pub users: InMemoryUserRatings,
    pub pets: InMemoryPetDirectory,
}

impl InMemoryBackend {
    /// Registers a new user and returns its id.
    pub fn user(&self) -> ObjectId {
        let id = ObjectId::new();
        self.users.add_user(id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::controller::tests::sample_task;
    use rstest::rstest;

    #[rstest]
    #[case::stale_version(0, TaskStatus::Open)]
    #[case::stale_status(1, TaskStatus::Open)]
    #[tokio::test]
    async fn stale_replace_leaves_the_task_alone(
        #[case] expected_version: i64,
        #[case] expected_status: TaskStatus,
    ) {
        let store = InMemoryTaskStore::default();
        let mut task = sample_task(ObjectId::new());
        task.version = 1;
        task.status = TaskStatus::Pending;
        store.insert(&task).await.expect("insert");

        let mut update = task.clone();
        update.status = TaskStatus::Cancelled;
        update.version = 2;
        let replaced = store
            .replace_if_current(&update, expected_version, expected_status)
            .await
            .expect("replace");

        assert!(!replaced);
        let stored = store.find_by_id(&task.id).await.expect("find");
        assert_eq!(stored, Some(task));
    }

    #[tokio::test]
    async fn current_replace_wins() {
        let store = InMemoryTaskStore::default();
        let task = sample_task(ObjectId::new());
        store.insert(&task).await.expect("insert");

        let mut update = task.clone();
        update.status = TaskStatus::Cancelled;
        update.version = 1;
        let replaced = store
            .replace_if_current(&update, 0, TaskStatus::Open)
            .await
            .expect("replace");

        assert!(replaced);
        assert_eq!(store.find_by_id(&task.id).await.expect("find"), Some(update));
    }
}
