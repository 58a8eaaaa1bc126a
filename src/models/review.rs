use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub reviewer_id: ObjectId,
    pub reviewee_id: ObjectId,
    pub task_id: ObjectId,
    pub rating: i32, // 1-5
    pub comment: Option<String>,
    pub created_at: DateTime,
}

/// Validated input for `submitReview`.
#[derive(Debug, Clone, Validate)]
pub struct NewReview {
    pub reviewee_id: ObjectId,
    #[validate(range(min = 1, max = 5, message = "rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(max = 1000, message = "comment must be at most 1000 characters"))]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SubmitReviewDto {
    pub reviewee_id: String,
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Debug, FromForm, Deserialize, JsonSchema)]
pub struct UserReviewsQuery {
    /// "owner" or "helper"
    pub role: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ReviewResponse {
    pub id: String,
    pub reviewer_id: String,
    pub reviewee_id: String,
    pub task_id: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: String,
}

impl From<Review> for ReviewResponse {
    fn from(review: Review) -> Self {
        ReviewResponse {
            id: review.id.to_hex(),
            reviewer_id: review.reviewer_id.to_hex(),
            reviewee_id: review.reviewee_id.to_hex(),
            task_id: review.task_id.to_hex(),
            rating: review.rating,
            comment: review.comment,
            created_at: review.created_at.to_chrono().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ReviewSubmittedResponse {
    pub review: ReviewResponse,
    /// Absent when the rating could not be refreshed; the review is still recorded.
    pub reviewee_rating: Option<crate::models::RoleRating>,
}
