use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use crate::guards::AuthGuard;
use crate::lifecycle::TaskLifecycle;
use crate::models::{
    AssignHelperDto, CancelOutcome, CancelResponse, CreateTaskDto, NewTask, OpenTasksQuery,
    Pagination, TaskListResponse, TaskResponse,
};
use crate::utils::{parse_object_id, trimmed_opt, ApiError, ApiResponse};

type TaskResult = Result<Json<ApiResponse<TaskResponse>>, ApiError>;

fn into_new_task(dto: CreateTaskDto) -> Result<NewTask, ApiError> {
    Ok(NewTask {
        title: dto.title,
        description: dto.description,
        category: dto.category,
        location: dto.location,
        reward: dto.reward,
        reward_text: dto.reward_text,
        scheduled_at: dto.scheduled_at,
        pet_id: parse_object_id(&dto.pet_id, "pet")?,
    })
}

// ============================================================================
// TASK POSTING & BROWSING
// ============================================================================

#[openapi(tag = "Task")]
#[post("/task/create", data = "<dto>")]
pub async fn create_task(
    engine: &State<TaskLifecycle>,
    auth: AuthGuard,
    dto: Json<CreateTaskDto>,
) -> TaskResult {
    let input = into_new_task(dto.into_inner())?;
    let task = engine.create_task(&auth.user_id, input).await?;

    Ok(Json(ApiResponse::success_with_message(
        "Task posted successfully".to_string(),
        task.into(),
    )))
}

#[openapi(tag = "Task")]
#[get("/task/<task_id>")]
pub async fn get_task(engine: &State<TaskLifecycle>, task_id: String) -> TaskResult {
    let task_id = parse_object_id(&task_id, "task")?;
    let task = engine.get_task(&task_id).await?;

    Ok(Json(ApiResponse::success(task.into())))
}

#[openapi(tag = "Task")]
#[get("/tasks/open?<query..>")]
pub async fn list_open_tasks(
    engine: &State<TaskLifecycle>,
    query: OpenTasksQuery,
) -> Result<Json<ApiResponse<TaskListResponse>>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let category = trimmed_opt(query.category.as_deref());

    let result = engine
        .list_open_tasks(category.as_deref(), page, limit)
        .await?;

    Ok(Json(ApiResponse::success(TaskListResponse {
        tasks: result.tasks.into_iter().map(Into::into).collect(),
        pagination: Pagination {
            page,
            limit,
            total: result.total,
            pages: (result.total as f64 / limit as f64).ceil() as i64,
        },
    })))
}

// ============================================================================
// LIFECYCLE TRANSITIONS
// ============================================================================

#[openapi(tag = "Task")]
#[post("/task/<task_id>/apply")]
pub async fn apply_to_task(
    engine: &State<TaskLifecycle>,
    auth: AuthGuard,
    task_id: String,
) -> TaskResult {
    let task_id = parse_object_id(&task_id, "task")?;
    let task = engine.apply(&auth.user_id, &task_id).await?;

    Ok(Json(ApiResponse::success_with_message(
        "Application submitted".to_string(),
        task.into(),
    )))
}

#[openapi(tag = "Task")]
#[post("/task/<task_id>/assign", data = "<dto>")]
pub async fn assign_helper(
    engine: &State<TaskLifecycle>,
    auth: AuthGuard,
    task_id: String,
    dto: Json<AssignHelperDto>,
) -> TaskResult {
    let task_id = parse_object_id(&task_id, "task")?;
    let helper_id = parse_object_id(&dto.helper_id, "helper")?;
    let task = engine.assign(&auth.user_id, &task_id, &helper_id).await?;

    Ok(Json(ApiResponse::success_with_message(
        "Helper assigned".to_string(),
        task.into(),
    )))
}

#[openapi(tag = "Task")]
#[post("/task/<task_id>/complete")]
pub async fn complete_task(
    engine: &State<TaskLifecycle>,
    auth: AuthGuard,
    task_id: String,
) -> TaskResult {
    let task_id = parse_object_id(&task_id, "task")?;
    let task = engine.complete(&auth.user_id, &task_id).await?;

    Ok(Json(ApiResponse::success_with_message(
        "Task marked as complete, awaiting owner confirmation".to_string(),
        task.into(),
    )))
}

#[openapi(tag = "Task")]
#[post("/task/<task_id>/confirm")]
pub async fn confirm_task(
    engine: &State<TaskLifecycle>,
    auth: AuthGuard,
    task_id: String,
) -> TaskResult {
    let task_id = parse_object_id(&task_id, "task")?;
    let task = engine.confirm(&auth.user_id, &task_id).await?;

    Ok(Json(ApiResponse::success_with_message(
        "Task completion confirmed".to_string(),
        task.into(),
    )))
}

#[openapi(tag = "Task")]
#[post("/task/<task_id>/cancel")]
pub async fn cancel_task(
    engine: &State<TaskLifecycle>,
    auth: AuthGuard,
    task_id: String,
) -> Result<Json<ApiResponse<CancelResponse>>, ApiError> {
    let task_id = parse_object_id(&task_id, "task")?;
    let (task, outcome) = engine.cancel(&auth.user_id, &task_id).await?;

    let message = match outcome {
        CancelOutcome::Withdrawn => "Application withdrawn",
        CancelOutcome::Cancelled => "Task cancelled",
    };

    Ok(Json(ApiResponse::success_with_message(
        message.to_string(),
        CancelResponse {
            outcome,
            task: task.into(),
        },
    )))
}
