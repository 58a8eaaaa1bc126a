use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

/// The role a user played in a reviewed task. Ratings are kept per role.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PartyRole {
    Owner,
    Helper,
}

impl PartyRole {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "owner" => Some(Self::Owner),
            "helper" => Some(Self::Helper),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Helper => "helper",
        }
    }

    /// Task field holding the user for this role.
    pub const fn task_field(self) -> &'static str {
        match self {
            Self::Owner => "posted_by",
            Self::Helper => "assigned_to",
        }
    }

    /// User fields holding the average and its review count.
    pub const fn rating_fields(self) -> (&'static str, &'static str) {
        match self {
            Self::Owner => ("owner_rating", "owner_review_count"),
            Self::Helper => ("helper_rating", "helper_review_count"),
        }
    }
}

/// A freshly recomputed role-scoped rating.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, JsonSchema)]
pub struct RoleRating {
    pub role: PartyRole,
    pub rating: f64,
    pub review_count: u64,
}
