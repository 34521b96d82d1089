use super::*;
use time::macros::date;

// =============================================================================
// Status
// =============================================================================

#[test]
fn status_serializes_with_display_labels() {
    assert_eq!(serde_json::to_value(Status::NotStarted).unwrap(), "Not Started");
    assert_eq!(serde_json::to_value(Status::InProgress).unwrap(), "In Progress");
    assert_eq!(serde_json::to_value(Status::Completed).unwrap(), "Completed");
}

#[test]
fn status_parse_accepts_labels_and_snake_case() {
    assert_eq!(Status::parse("Completed"), Some(Status::Completed));
    assert_eq!(Status::parse(" In Progress "), Some(Status::InProgress));
    assert_eq!(Status::parse("not_started"), Some(Status::NotStarted));
    assert_eq!(Status::parse("done"), None);
}

#[test]
fn status_deserializes_the_same_spellings_parse_accepts() {
    for raw in ["Not Started", "not_started", "In Progress", "in_progress", "Completed", "completed"] {
        let decoded: Status = serde_json::from_value(serde_json::Value::from(raw)).unwrap();
        assert_eq!(Some(decoded), Status::parse(raw), "{raw}");
    }
    assert!(serde_json::from_str::<Status>(r#""done""#).is_err());
}

#[test]
fn status_default_is_not_started() {
    assert_eq!(Status::default(), Status::NotStarted);
    assert!(!Status::NotStarted.is_started());
    assert!(Status::InProgress.is_started());
}

// =============================================================================
// serde shape
// =============================================================================

#[test]
fn stage_deserializes_camel_case_with_defaults() {
    let client_id = Uuid::new_v4();
    let raw = serde_json::json!({
        "id": Uuid::nil(),
        "clientId": client_id,
        "name": "Kickoff",
        "order": 1,
        "startDate": "2024-01-15"
    });
    let stage: Stage = serde_json::from_value(raw).unwrap();
    assert_eq!(stage.client_id, client_id);
    assert_eq!(stage.status, Status::NotStarted);
    assert!(!stage.required);
    assert_eq!(stage.start_date, Some(date!(2024 - 01 - 15)));
    assert!(stage.completion_date.is_none());
}

#[test]
fn subtask_serializes_due_date_as_iso_day() {
    let mut subtask = Subtask::new(Uuid::nil(), "Upload W-9", 0);
    subtask.due_date = Some(date!(2024 - 03 - 01));
    let value = serde_json::to_value(&subtask).unwrap();
    assert_eq!(value["dueDate"], "2024-03-01");
    assert_eq!(value["documentRequired"], false);
    assert_eq!(value["stageId"], Uuid::nil().to_string());
}

// =============================================================================
// validate_stages
// =============================================================================

fn sample(client_id: Uuid) -> (Vec<Stage>, SubtaskMap) {
    let a = Stage::new(client_id, "Intake", 1);
    let b = Stage::new(client_id, "Review", 2);
    let mut subtasks = SubtaskMap::new();
    subtasks.insert(a.id, vec![Subtask::new(a.id, "Sign engagement letter", 0)]);
    (vec![a, b], subtasks)
}

#[test]
fn validate_accepts_well_formed_list() {
    let client_id = Uuid::new_v4();
    let (stages, subtasks) = sample(client_id);
    assert_eq!(validate_stages(client_id, &stages, &subtasks), Ok(()));
}

#[test]
fn validate_rejects_blank_stage_name() {
    let client_id = Uuid::new_v4();
    let (mut stages, subtasks) = sample(client_id);
    stages[1].name = "   ".into();
    let id = stages[1].id;
    assert_eq!(
        validate_stages(client_id, &stages, &subtasks),
        Err(StageValidationError::EmptyStageName(id))
    );
}

#[test]
fn validate_rejects_duplicate_stage_ids() {
    let client_id = Uuid::new_v4();
    let (mut stages, subtasks) = sample(client_id);
    stages[1].id = stages[0].id;
    assert!(matches!(
        validate_stages(client_id, &stages, &subtasks),
        Err(StageValidationError::DuplicateStage(_))
    ));
}

#[test]
fn validate_rejects_stage_from_other_client() {
    let client_id = Uuid::new_v4();
    let (mut stages, subtasks) = sample(client_id);
    stages[0].client_id = Uuid::new_v4();
    assert!(matches!(
        validate_stages(client_id, &stages, &subtasks),
        Err(StageValidationError::ForeignStage { .. })
    ));
}

#[test]
fn validate_rejects_subtasks_for_unknown_stage() {
    let client_id = Uuid::new_v4();
    let (stages, mut subtasks) = sample(client_id);
    let ghost = Uuid::new_v4();
    subtasks.insert(ghost, vec![Subtask::new(ghost, "Orphan", 0)]);
    assert_eq!(
        validate_stages(client_id, &stages, &subtasks),
        Err(StageValidationError::UnknownStage(ghost))
    );
}

#[test]
fn validate_rejects_misfiled_subtask() {
    let client_id = Uuid::new_v4();
    let (stages, mut subtasks) = sample(client_id);
    let other = stages[1].id;
    subtasks.insert(stages[1].id, vec![Subtask::new(stages[0].id, "Wrong key", 0)]);
    assert!(matches!(
        validate_stages(client_id, &stages, &subtasks),
        Err(StageValidationError::MisfiledSubtask { key, .. }) if key == other
    ));
}

#[test]
fn validate_rejects_blank_subtask_title() {
    let client_id = Uuid::new_v4();
    let (stages, mut subtasks) = sample(client_id);
    let stage_id = stages[0].id;
    subtasks.get_mut(&stage_id).unwrap()[0].title = String::new();
    assert!(matches!(
        validate_stages(client_id, &stages, &subtasks),
        Err(StageValidationError::EmptySubtaskTitle(_))
    ));
}

#[test]
fn validate_rejects_subtask_id_shared_across_stages() {
    let client_id = Uuid::new_v4();
    let (stages, mut subtasks) = sample(client_id);
    let reused = subtasks[&stages[0].id][0].id;
    let mut copy = Subtask::new(stages[1].id, "Same id, other stage", 0);
    copy.id = reused;
    subtasks.insert(stages[1].id, vec![copy]);
    assert_eq!(
        validate_stages(client_id, &stages, &subtasks),
        Err(StageValidationError::DuplicateSubtask(reused))
    );
}

#[test]
fn validate_rejects_subtask_id_repeated_within_stage() {
    let client_id = Uuid::new_v4();
    let (stages, mut subtasks) = sample(client_id);
    let list = subtasks.get_mut(&stages[0].id).unwrap();
    let twin = list[0].clone();
    list.push(twin);
    assert!(matches!(
        validate_stages(client_id, &stages, &subtasks),
        Err(StageValidationError::DuplicateSubtask(_))
    ));
}
