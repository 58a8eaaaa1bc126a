use mongodb::bson::oid::ObjectId;

use super::ApiError;

pub fn parse_object_id(value: &str, what: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(value.trim()).map_err(|_| ApiError::bad_request(format!("Invalid {} ID", what)))
}

/// Trims a required text field; blank input stays empty so validation rejects it.
pub fn trimmed(value: &str) -> String {
    value.trim().to_string()
}

/// Trims an optional text field, dropping it when blank.
pub fn trimmed_opt(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::http::Status;

    #[test]
    fn malformed_ids_are_bad_requests() {
        let err = parse_object_id("not-an-id", "task").unwrap_err();
        assert_eq!(err.status, Status::BadRequest);
        assert_eq!(err.message, "Invalid task ID");
    }

    #[test]
    fn ids_round_trip_through_hex() {
        let id = ObjectId::new();
        assert_eq!(parse_object_id(&format!(" {} ", id.to_hex()), "pet").ok(), Some(id));
    }

    #[test]
    fn blank_optionals_are_dropped() {
        assert_eq!(trimmed_opt(Some("   ")), None);
        assert_eq!(trimmed_opt(Some(" jam ")), Some("jam".to_string()));
        assert_eq!(trimmed("  walk "), "walk");
    }
}
