//! Role-scoped reputation, recomputed from the full review history.

use log::info;
use mongodb::bson::oid::ObjectId;
use std::sync::Arc;

use super::error::{LifecycleError, LifecycleResult};
use crate::models::{PartyRole, Review, RoleRating};
use crate::store::{ReviewStore, TaskStore, UserRatings};

#[derive(Clone)]
pub struct ReputationAggregator {
    tasks: Arc<dyn TaskStore>,
    reviews: Arc<dyn ReviewStore>,
    users: Arc<dyn UserRatings>,
}

impl ReputationAggregator {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        reviews: Arc<dyn ReviewStore>,
        users: Arc<dyn UserRatings>,
    ) -> Self {
        Self {
            tasks,
            reviews,
            users,
        }
    }

    /// Recomputes and stores the rating `user_id` holds for `role`.
    ///
    /// Only reviews received on tasks where the user played that role count.
    /// Safe to re-run at any time.
    pub async fn recompute(
        &self,
        user_id: &ObjectId,
        role: PartyRole,
    ) -> LifecycleResult<RoleRating> {
        let reviews = self.reviews_received(user_id, role).await?;
        let rating = role_rating(role, &reviews);

        if !self.users.set_rating(user_id, &rating).await? {
            return Err(LifecycleError::not_found("user not found"));
        }

        info!(
            "{} rating for user {} recomputed: {} from {} review(s)",
            role.as_str(),
            user_id,
            rating.rating,
            rating.review_count
        );

        Ok(rating)
    }

    /// Reviews `user_id` received while playing `role`.
    pub async fn reviews_received(
        &self,
        user_id: &ObjectId,
        role: PartyRole,
    ) -> LifecycleResult<Vec<Review>> {
        let task_ids = self.tasks.find_ids_by_role(user_id, role).await?;
        if task_ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self.reviews.find_for_reviewee(user_id, &task_ids).await?)
    }
}

/// Mean rating rounded to one decimal place, 0 when there are no reviews.
pub fn role_rating(role: PartyRole, reviews: &[Review]) -> RoleRating {
    let review_count = reviews.len() as u64;
    let rating = if reviews.is_empty() {
        0.0
    } else {
        let total: i64 = reviews.iter().map(|r| i64::from(r.rating)).sum();
        round_to_tenth(total as f64 / reviews.len() as f64)
    };

    RoleRating {
        role,
        rating,
        review_count,
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
