use async_trait::async_trait;
use mongodb::bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::error::{ErrorKind, WriteError, WriteFailure};
use mongodb::options::{FindOptions, IndexOptions};
use mongodb::{Collection, Database, IndexModel};
use rocket::futures::TryStreamExt;

use super::{
    PetDirectory, ReviewStore, StoreError, StoreResult, TaskPage, TaskStore, UserRatings,
};
use crate::models::{PartyRole, PetOwnership, Review, RoleRating, Task, TaskStatus};

const TASKS: &str = "tasks";
const REVIEWS: &str = "reviews";
const USERS: &str = "users";
const PETS: &str = "pets";

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(WriteError { code: 11000, .. }))
    )
}

/// Creates the indexes the engine relies on, including the unique review triple.
pub async fn ensure_indexes(db: &Database) -> StoreResult<()> {
    let review_triple = IndexModel::builder()
        .keys(doc! { "reviewer_id": 1, "reviewee_id": 1, "task_id": 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build();
    db.collection::<Review>(REVIEWS)
        .create_index(review_triple, None)
        .await?;

    let task_indexes = vec![
        IndexModel::builder().keys(doc! { "posted_by": 1 }).build(),
        IndexModel::builder().keys(doc! { "assigned_to": 1 }).build(),
        IndexModel::builder()
            .keys(doc! { "status": 1, "created_at": -1 })
            .build(),
    ];
    db.collection::<Task>(TASKS)
        .create_indexes(task_indexes, None)
        .await?;

    Ok(())
}

// ============================================================================
// TASKS
// ============================================================================

pub struct MongoTaskStore {
    tasks: Collection<Task>,
}

impl MongoTaskStore {
    pub fn new(db: &Database) -> Self {
        Self {
            tasks: db.collection(TASKS),
        }
    }
}

#[async_trait]
impl TaskStore for MongoTaskStore {
    async fn insert(&self, task: &Task) -> StoreResult<()> {
        self.tasks.insert_one(task, None).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &ObjectId) -> StoreResult<Option<Task>> {
        Ok(self.tasks.find_one(doc! { "_id": id }, None).await?)
    }

    async fn replace_if_current(
        &self,
        task: &Task,
        expected_version: i64,
        expected_status: TaskStatus,
    ) -> StoreResult<bool> {
        let result = self
            .tasks
            .replace_one(
                doc! {
                    "_id": task.id,
                    "version": expected_version,
                    "status": expected_status.as_str(),
                },
                task,
                None,
            )
            .await?;

        Ok(result.matched_count == 1)
    }

    async fn find_ids_by_role(
        &self,
        user_id: &ObjectId,
        role: PartyRole,
    ) -> StoreResult<Vec<ObjectId>> {
        let options = FindOptions::builder().projection(doc! { "_id": 1 }).build();

        let docs: Vec<Document> = self
            .tasks
            .clone_with_type::<Document>()
            .find(doc! { role.task_field(): user_id }, options)
            .await?
            .try_collect()
            .await?;

        Ok(docs
            .iter()
            .filter_map(|d| d.get_object_id("_id").ok())
            .collect())
    }

    async fn find_open(
        &self,
        category: Option<&str>,
        skip: u64,
        limit: i64,
    ) -> StoreResult<TaskPage> {
        let mut filter = doc! {
            "status": {
                "$in": [TaskStatus::Open.as_str(), TaskStatus::Pending.as_str()]
            }
        };
        if let Some(category) = category {
            filter.insert("category", category);
        }

        let find_options = FindOptions::builder()
            .skip(skip)
            .limit(limit)
            .sort(doc! { "created_at": -1 })
            .build();

        let tasks: Vec<Task> = self
            .tasks
            .find(filter.clone(), find_options)
            .await?
            .try_collect()
            .await?;

        let total = self.tasks.count_documents(filter, None).await?;

        Ok(TaskPage { tasks, total })
    }
}

// ============================================================================
// REVIEWS
// ============================================================================

pub struct MongoReviewStore {
    reviews: Collection<Review>,
}

impl MongoReviewStore {
    pub fn new(db: &Database) -> Self {
        Self {
            reviews: db.collection(REVIEWS),
        }
    }
}

#[async_trait]
impl ReviewStore for MongoReviewStore {
    async fn insert(&self, review: &Review) -> StoreResult<()> {
        match self.reviews.insert_one(review, None).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(StoreError::DuplicateKey(REVIEWS)),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(
        &self,
        reviewer_id: &ObjectId,
        reviewee_id: &ObjectId,
        task_id: &ObjectId,
    ) -> StoreResult<bool> {
        let existing = self
            .reviews
            .find_one(
                doc! {
                    "reviewer_id": reviewer_id,
                    "reviewee_id": reviewee_id,
                    "task_id": task_id,
                },
                None,
            )
            .await?;

        Ok(existing.is_some())
    }

    async fn find_for_reviewee(
        &self,
        reviewee_id: &ObjectId,
        task_ids: &[ObjectId],
    ) -> StoreResult<Vec<Review>> {
        let find_options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();

        let reviews = self
            .reviews
            .find(
                doc! {
                    "reviewee_id": reviewee_id,
                    "task_id": { "$in": task_ids.to_vec() },
                },
                find_options,
            )
            .await?
            .try_collect()
            .await?;

        Ok(reviews)
    }
}

// ============================================================================
// USERS & PETS
// ============================================================================

pub struct MongoUserRatings {
    users: Collection<Document>,
}

impl MongoUserRatings {
    pub fn new(db: &Database) -> Self {
        Self {
            users: db.collection(USERS),
        }
    }
}

#[async_trait]
impl UserRatings for MongoUserRatings {
    async fn set_rating(&self, user_id: &ObjectId, rating: &RoleRating) -> StoreResult<bool> {
        let (rating_field, count_field) = rating.role.rating_fields();

        let result = self
            .users
            .update_one(
                doc! { "_id": user_id },
                doc! {
                    "$set": {
                        rating_field: rating.rating,
                        count_field: rating.review_count as i64,
                        "updated_at": DateTime::now(),
                    }
                },
                None,
            )
            .await?;

        Ok(result.matched_count == 1)
    }
}

pub struct MongoPetDirectory {
    pets: Collection<PetOwnership>,
}

impl MongoPetDirectory {
    pub fn new(db: &Database) -> Self {
        Self {
            pets: db.collection(PETS),
        }
    }
}

#[async_trait]
impl PetDirectory for MongoPetDirectory {
    async fn owner_of(&self, pet_id: &ObjectId) -> StoreResult<Option<ObjectId>> {
        let pet = self.pets.find_one(doc! { "_id": pet_id }, None).await?;
        Ok(pet.map(|p| p.owner_id))
    }
}
