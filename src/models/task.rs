use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;
use validator::Validate;

use crate::utils::{trimmed, trimmed_opt};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    Pending,
    InProgress,
    PendingConfirmation,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::PendingConfirmation => "pending_confirmation",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// `open` and `pending` both accept new applicants.
    pub const fn accepts_applications(self) -> bool {
        matches!(self, Self::Open | Self::Pending)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The relation an actor has to a particular task, resolved once per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Owner,
    AssignedHelper,
    Applicant,
    Outsider,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Task {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub location: String,
    pub reward: Option<f64>,
    pub reward_text: Option<String>,
    pub scheduled_at: Option<DateTime>,
    pub pet_id: ObjectId,
    pub status: TaskStatus,
    pub applicants: Vec<ObjectId>,
    pub assigned_to: Option<ObjectId>,
    pub posted_by: ObjectId,
    // Bumped on every write; the store only replaces a task whose version still matches.
    pub version: i64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Task {
    pub fn party_of(&self, user_id: &ObjectId) -> Party {
        if &self.posted_by == user_id {
            Party::Owner
        } else if self.assigned_to.as_ref() == Some(user_id) {
            Party::AssignedHelper
        } else if self.is_applicant(user_id) {
            Party::Applicant
        } else {
            Party::Outsider
        }
    }

    pub fn is_applicant(&self, user_id: &ObjectId) -> bool {
        self.applicants.contains(user_id)
    }

    /// The other party of an assigned task, seen from `user_id`.
    pub fn counterpart_of(&self, user_id: &ObjectId) -> Option<ObjectId> {
        match self.party_of(user_id) {
            Party::Owner => self.assigned_to,
            Party::AssignedHelper => Some(self.posted_by),
            Party::Applicant | Party::Outsider => None,
        }
    }
}

/// Validated input for `createTask`.
#[derive(Debug, Clone, Validate)]
pub struct NewTask {
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    pub description: Option<String>,
    #[validate(length(min = 1, message = "category is required"))]
    pub category: String,
    #[validate(length(min = 1, message = "location is required"))]
    pub location: String,
    #[validate(range(min = 0.0, message = "reward must not be negative"))]
    pub reward: Option<f64>,
    pub reward_text: Option<String>,
    pub scheduled_at: Option<String>,
    pub pet_id: ObjectId,
}

impl NewTask {
    /// Strips surrounding whitespace; blank optional fields become `None`.
    pub fn trimmed(self) -> Self {
        Self {
            title: trimmed(&self.title),
            description: trimmed_opt(self.description.as_deref()),
            category: trimmed(&self.category),
            location: trimmed(&self.location),
            reward: self.reward,
            reward_text: trimmed_opt(self.reward_text.as_deref()),
            scheduled_at: trimmed_opt(self.scheduled_at.as_deref()),
            pet_id: self.pet_id,
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateTaskDto {
    pub title: String,
    pub description: Option<String>,
    #[serde(alias = "type")]
    pub category: String,
    pub location: String,
    pub reward: Option<f64>,
    pub reward_text: Option<String>,
    /// RFC 3339 timestamp, informational only
    pub scheduled_at: Option<String>,
    pub pet_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AssignHelperDto {
    pub helper_id: String,
}

#[derive(Debug, FromForm, Deserialize, JsonSchema)]
pub struct OpenTasksQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct TaskResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub location: String,
    pub reward: Option<f64>,
    pub reward_text: Option<String>,
    pub scheduled_at: Option<String>,
    pub pet_id: String,
    pub status: TaskStatus,
    pub applicants: Vec<String>,
    pub assigned_to: Option<String>,
    pub posted_by: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        TaskResponse {
            id: task.id.to_hex(),
            title: task.title,
            description: task.description,
            category: task.category,
            location: task.location,
            reward: task.reward,
            reward_text: task.reward_text,
            scheduled_at: task
                .scheduled_at
                .map(|at| at.to_chrono().to_rfc3339()),
            pet_id: task.pet_id.to_hex(),
            status: task.status,
            applicants: task.applicants.iter().map(|id| id.to_hex()).collect(),
            assigned_to: task.assigned_to.map(|id| id.to_hex()),
            posted_by: task.posted_by.to_hex(),
            created_at: task.created_at.to_chrono().to_rfc3339(),
            updated_at: task.updated_at.to_chrono().to_rfc3339(),
        }
    }
}

/// What a `cancel` request did to the task.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CancelOutcome {
    /// A bare applicant left the roster; the task is untouched otherwise.
    Withdrawn,
    Cancelled,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct CancelResponse {
    pub outcome: CancelOutcome,
    pub task: TaskResponse,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: u64,
    pub pages: i64,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskResponse>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_lists_applicants_as_hex() {
        let (owner, helper) = (ObjectId::new(), ObjectId::new());
        let now = DateTime::now();
        let task = Task {
            id: ObjectId::new(),
            title: "Evening walk".to_string(),
            description: None,
            category: "walking".to_string(),
            location: "Riverside".to_string(),
            reward: Some(15.0),
            reward_text: None,
            scheduled_at: None,
            pet_id: ObjectId::new(),
            status: TaskStatus::InProgress,
            applicants: vec![helper],
            assigned_to: Some(helper),
            posted_by: owner,
            version: 2,
            created_at: now,
            updated_at: now,
        };

        let response = TaskResponse::from(task);

        assert_eq!(response.applicants, vec![helper.to_hex()]);
        assert_eq!(response.assigned_to, Some(helper.to_hex()));
        assert_eq!(response.posted_by, owner.to_hex());
    }

    #[test]
    fn trimming_blanks_out_whitespace_fields() {
        let input = NewTask {
            title: "   ".to_string(),
            description: Some("  ".to_string()),
            category: " feeding ".to_string(),
            location: "Flat 4B".to_string(),
            reward: None,
            reward_text: Some(" jam ".to_string()),
            scheduled_at: Some(" ".to_string()),
            pet_id: ObjectId::new(),
        }
        .trimmed();

        assert_eq!(input.title, "");
        assert_eq!(input.description, None);
        assert_eq!(input.category, "feeding");
        assert_eq!(input.reward_text.as_deref(), Some("jam"));
        assert_eq!(input.scheduled_at, None);
        assert!(input.validate().is_err());
    }
}
