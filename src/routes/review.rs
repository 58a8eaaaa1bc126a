use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use crate::guards::AuthGuard;
use crate::lifecycle::TaskLifecycle;
use crate::models::{
    NewReview, PartyRole, ReviewResponse, ReviewSubmittedResponse, RoleRating, SubmitReviewDto,
    UserReviewsQuery,
};
use crate::utils::{parse_object_id, trimmed_opt, ApiError, ApiResponse};

fn parse_role(value: &str) -> Result<PartyRole, ApiError> {
    PartyRole::parse(value)
        .ok_or_else(|| ApiError::bad_request("Invalid role. Choose 'owner' or 'helper'"))
}

#[openapi(tag = "Review")]
#[post("/task/<task_id>/review", data = "<dto>")]
pub async fn submit_review(
    engine: &State<TaskLifecycle>,
    auth: AuthGuard,
    task_id: String,
    dto: Json<SubmitReviewDto>,
) -> Result<Json<ApiResponse<ReviewSubmittedResponse>>, ApiError> {
    let task_id = parse_object_id(&task_id, "task")?;
    let input = NewReview {
        reviewee_id: parse_object_id(&dto.reviewee_id, "reviewee")?,
        rating: dto.rating,
        comment: trimmed_opt(dto.comment.as_deref()),
    };

    let outcome = engine.submit_review(&auth.user_id, &task_id, input).await?;

    Ok(Json(ApiResponse::success_with_message(
        "Review submitted successfully".to_string(),
        ReviewSubmittedResponse {
            review: outcome.review.into(),
            reviewee_rating: outcome.reviewee_rating,
        },
    )))
}

#[openapi(tag = "Review")]
#[get("/review/user/<user_id>?<query..>")]
pub async fn get_user_reviews(
    engine: &State<TaskLifecycle>,
    user_id: String,
    query: UserReviewsQuery,
) -> Result<Json<ApiResponse<Vec<ReviewResponse>>>, ApiError> {
    let user_id = parse_object_id(&user_id, "user")?;
    let role = query.role.as_deref().map(parse_role).transpose()?;

    let reviews = engine.reviews_for_user(&user_id, role).await?;

    Ok(Json(ApiResponse::success(
        reviews.into_iter().map(Into::into).collect(),
    )))
}

/// Re-runs the rating aggregation for one user and role.
#[openapi(tag = "Review")]
#[post("/review/user/<user_id>/recompute?<role>")]
pub async fn recompute_rating(
    engine: &State<TaskLifecycle>,
    _auth: AuthGuard,
    user_id: String,
    role: String,
) -> Result<Json<ApiResponse<RoleRating>>, ApiError> {
    let user_id = parse_object_id(&user_id, "user")?;
    let role = parse_role(&role)?;

    let rating = engine.reputation().recompute(&user_id, role).await?;

    Ok(Json(ApiResponse::success(rating)))
}
