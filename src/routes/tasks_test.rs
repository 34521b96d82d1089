use super::*;
use axum::http::StatusCode;
use crate::services::access::AccessError;

#[test]
fn task_error_maps_to_status() {
    assert_eq!(task_error(TaskError::NotFound(Uuid::nil())).status, StatusCode::NOT_FOUND);
    assert_eq!(task_error(TaskError::EmptyTitle).status, StatusCode::BAD_REQUEST);
    assert_eq!(task_error(TaskError::Access(AccessError::Forbidden)).status, StatusCode::FORBIDDEN);
    assert_eq!(task_error(TaskError::Database(sqlx::Error::RowNotFound)).status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn create_body_defaults_status_and_description() {
    let body: CreateTaskBody =
        serde_json::from_value(serde_json::json!({ "clientId": Uuid::nil(), "title": "Call client" })).unwrap();
    assert_eq!(body.status, TaskStatus::Pending);
    assert!(body.description.is_empty());
    assert!(body.due_date.is_none());
}

#[test]
fn update_body_can_clear_due_date() {
    let body: UpdateTaskBody =
        serde_json::from_value(serde_json::json!({ "taskId": Uuid::nil(), "dueDate": null, "status": "in_progress" }))
            .unwrap();
    assert_eq!(body.due_date, Some(None));
    assert_eq!(body.status, Some(TaskStatus::InProgress));
}
