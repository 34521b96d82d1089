use super::*;
use crate::state::test_helpers;

fn new_user(role: Role, client_id: Option<Uuid>) -> NewUser {
    NewUser { email: " Pat@Example.com ".into(), name: "Pat".into(), role, client_id }
}

#[test]
fn validate_new_user_normalizes_email() {
    assert_eq!(validate_new_user(&new_user(Role::Cpa, None)).unwrap(), "pat@example.com");
}

#[test]
fn validate_new_user_checks_fields() {
    let mut user = new_user(Role::Admin, None);
    user.email = "nope".into();
    assert!(matches!(validate_new_user(&user), Err(UserError::InvalidEmail)));

    let mut user = new_user(Role::Admin, None);
    user.name = "   ".into();
    assert!(matches!(validate_new_user(&user), Err(UserError::EmptyName)));
}

#[test]
fn validate_new_user_ties_client_id_to_client_role() {
    assert!(matches!(validate_new_user(&new_user(Role::Client, None)), Err(UserError::ClientMismatch)));
    assert!(matches!(
        validate_new_user(&new_user(Role::ServiceCenter, Some(Uuid::new_v4()))),
        Err(UserError::ClientMismatch)
    ));
    assert!(validate_new_user(&new_user(Role::Client, Some(Uuid::new_v4()))).is_ok());
}

#[tokio::test]
async fn non_admins_cannot_list_or_create_users() {
    let state = test_helpers::test_app_state();
    for role in [Role::Cpa, Role::ServiceCenter, Role::Client] {
        let actor = test_helpers::user_with_role(role);
        let err = list_users(&state.pool, &actor, None).await.unwrap_err();
        assert!(matches!(err, UserError::Access(AccessError::Forbidden)));
        let err = create_user(&state.pool, &actor, &new_user(Role::Cpa, None)).await.unwrap_err();
        assert!(matches!(err, UserError::Access(AccessError::Forbidden)));
    }
}

#[test]
fn user_row_serializes_role_snake_case() {
    let row = UserRow {
        id: Uuid::nil(),
        email: "sc@example.com".into(),
        name: "Center".into(),
        role: Role::ServiceCenter,
        client_id: None,
        created_at: time::macros::datetime!(2024-01-01 0:00 UTC),
    };
    let value = serde_json::to_value(&row).unwrap();
    assert_eq!(value["role"], "service_center");
    assert_eq!(value["clientId"], serde_json::Value::Null);
    assert_eq!(value["createdAt"], "2024-01-01T00:00:00Z");
}
