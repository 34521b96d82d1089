use super::*;
use crate::services::access::AccessError;

#[test]
fn user_error_maps_validation_to_bad_request() {
    assert_eq!(user_error(UserError::InvalidEmail).status, StatusCode::BAD_REQUEST);
    assert_eq!(user_error(UserError::EmptyName).status, StatusCode::BAD_REQUEST);
    assert_eq!(user_error(UserError::ClientMismatch).status, StatusCode::BAD_REQUEST);
}

#[test]
fn user_error_maps_conflict_and_access() {
    assert_eq!(user_error(UserError::EmailTaken).status, StatusCode::CONFLICT);
    assert_eq!(user_error(UserError::Access(AccessError::Forbidden)).status, StatusCode::FORBIDDEN);
}

#[test]
fn parse_role_rejects_unknown_roles() {
    assert_eq!(parse_role("service_center").unwrap(), Role::ServiceCenter);
    let err = parse_role("owner").unwrap_err();
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
    assert!(err.message.contains("owner"));
}
