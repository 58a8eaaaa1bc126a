use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// The slice of a pet record needed to check ownership.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PetOwnership {
    pub owner_id: ObjectId,
}
