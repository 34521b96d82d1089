use super::*;

fn user(role: Role, client_id: Option<Uuid>) -> SessionUser {
    SessionUser {
        id: Uuid::new_v4(),
        email: "someone@example.com".into(),
        name: "Someone".into(),
        role,
        client_id,
    }
}

fn scope() -> ClientScope {
    ClientScope { id: Uuid::new_v4(), cpa_id: None, service_center_id: None, archived: false }
}

// =============================================================================
// Role
// =============================================================================

#[test]
fn role_round_trips_through_str() {
    for role in [Role::Admin, Role::Cpa, Role::ServiceCenter, Role::Client] {
        assert_eq!(Role::parse(role.as_str()), Some(role));
    }
    assert_eq!(Role::parse("owner"), None);
}

#[test]
fn role_serializes_snake_case() {
    assert_eq!(serde_json::to_value(Role::ServiceCenter).unwrap(), "service_center");
}

#[test]
fn only_client_is_not_staff() {
    assert!(Role::Admin.is_staff());
    assert!(Role::ServiceCenter.is_staff());
    assert!(!Role::Client.is_staff());
}

// =============================================================================
// relation
// =============================================================================

#[test]
fn relation_matches_assignment_columns() {
    let cpa = user(Role::Cpa, None);
    let center = user(Role::ServiceCenter, None);
    let mut s = scope();
    let client = user(Role::Client, Some(s.id));
    s.cpa_id = Some(cpa.id);
    s.service_center_id = Some(center.id);

    assert_eq!(relation(&cpa, &s), Relation::AssignedCpa);
    assert_eq!(relation(&center, &s), Relation::AssignedServiceCenter);
    assert_eq!(relation(&client, &s), Relation::OwnClient);
    assert_eq!(relation(&user(Role::Cpa, None), &s), Relation::Unrelated);
    assert_eq!(relation(&user(Role::Client, Some(Uuid::new_v4())), &s), Relation::Unrelated);
}

#[test]
fn cpa_listed_as_service_center_is_unrelated() {
    let cpa = user(Role::Cpa, None);
    let mut s = scope();
    s.service_center_id = Some(cpa.id);
    assert_eq!(relation(&cpa, &s), Relation::Unrelated);
}

// =============================================================================
// allows
// =============================================================================

#[test]
fn admin_has_every_permission() {
    for permission in [Permission::View, Permission::Contribute, Permission::Manage] {
        assert!(allows(Role::Admin, Relation::Unrelated, permission, false));
    }
}

#[test]
fn assigned_staff_can_manage() {
    assert!(allows(Role::Cpa, Relation::AssignedCpa, Permission::Manage, false));
    assert!(allows(Role::ServiceCenter, Relation::AssignedServiceCenter, Permission::Manage, false));
}

#[test]
fn unassigned_staff_sees_nothing() {
    assert!(!allows(Role::Cpa, Relation::Unrelated, Permission::View, false));
    assert!(!allows(Role::ServiceCenter, Relation::Unrelated, Permission::View, false));
}

#[test]
fn client_contributes_but_cannot_manage() {
    assert!(allows(Role::Client, Relation::OwnClient, Permission::View, false));
    assert!(allows(Role::Client, Relation::OwnClient, Permission::Contribute, false));
    assert!(!allows(Role::Client, Relation::OwnClient, Permission::Manage, false));
    assert!(!allows(Role::Client, Relation::Unrelated, Permission::View, false));
}

#[test]
fn archived_client_is_read_only_for_everyone() {
    assert!(allows(Role::Admin, Relation::Unrelated, Permission::View, true));
    assert!(!allows(Role::Admin, Relation::Unrelated, Permission::Manage, true));
    assert!(!allows(Role::Cpa, Relation::AssignedCpa, Permission::Contribute, true));
    assert!(!allows(Role::Client, Relation::OwnClient, Permission::Contribute, true));
}

#[test]
fn require_role_checks_membership() {
    let admin = user(Role::Admin, None);
    let client = user(Role::Client, None);
    assert!(require_role(&admin, &[Role::Admin, Role::Cpa]).is_ok());
    assert!(matches!(require_role(&client, &[Role::Admin]), Err(AccessError::Forbidden)));
}
