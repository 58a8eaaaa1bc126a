pub mod review;
pub mod task;

use rocket::{Build, Rocket};
use rocket_okapi::openapi_get_routes;

/// Mounts the task and review API, plus its OpenAPI document, under `/api/v1`.
pub fn mount_api(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket.mount(
        "/api/v1",
        openapi_get_routes![
            // Tasks
            task::create_task,
            task::get_task,
            task::list_open_tasks,
            task::apply_to_task,
            task::assign_helper,
            task::complete_task,
            task::confirm_task,
            task::cancel_task,
            // Reviews
            review::submit_review,
            review::get_user_reviews,
            review::recompute_rating,
        ],
    )
}
