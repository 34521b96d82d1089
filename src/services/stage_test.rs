use super::*;
use onboarding::{TemplateStage, TemplateSubtask};
use time::macros::date;

fn board(client_id: Uuid, names: &[&str]) -> (Vec<Stage>, SubtaskMap) {
    let stages: Vec<Stage> = names
        .iter()
        .enumerate()
        .map(|(i, name)| Stage::new(client_id, *name, i32::try_from(i + 1).unwrap()))
        .collect();
    let mut subtasks = SubtaskMap::new();
    for stage in &stages {
        subtasks.insert(stage.id, vec![Subtask::new(stage.id, format!("{} task", stage.name), 0)]);
    }
    (stages, subtasks)
}

// =============================================================================
// remove_stage
// =============================================================================

#[test]
fn remove_stage_drops_subtasks_and_reindexes() {
    let client_id = Uuid::new_v4();
    let (mut stages, mut subtasks) = board(client_id, &["Intake", "Docs", "Review"]);
    let docs_id = stages[1].id;

    remove_stage(&mut stages, &mut subtasks, docs_id).unwrap();

    assert_eq!(stages.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(), ["Intake", "Review"]);
    assert_eq!(stages.iter().map(|s| s.order).collect::<Vec<_>>(), [1, 2]);
    assert!(!subtasks.contains_key(&docs_id));
    assert_eq!(subtasks.len(), 2);
}

#[test]
fn remove_stage_unknown_id_is_not_found() {
    let (mut stages, mut subtasks) = board(Uuid::new_v4(), &["Intake"]);
    let missing = Uuid::new_v4();
    let err = remove_stage(&mut stages, &mut subtasks, missing).unwrap_err();
    assert!(matches!(err, StageError::StageNotFound(id) if id == missing));
    assert_eq!(stages.len(), 1);
}

// =============================================================================
// patch_subtask
// =============================================================================

#[test]
fn patch_subtask_applies_only_given_fields() {
    let (stages, mut subtasks) = board(Uuid::new_v4(), &["Intake"]);
    let subtask_id = subtasks[&stages[0].id][0].id;

    let patch = SubtaskPatch {
        status: Some(Status::Completed),
        due_date: Some(Some(date!(2024 - 01 - 15))),
        ..SubtaskPatch::default()
    };
    patch_subtask(&mut subtasks, subtask_id, &patch).unwrap();

    let subtask = &subtasks[&stages[0].id][0];
    assert_eq!(subtask.status, Status::Completed);
    assert_eq!(subtask.due_date, Some(date!(2024 - 01 - 15)));
    assert_eq!(subtask.title, "Intake task");
}

#[test]
fn patch_subtask_can_clear_due_date() {
    let (stages, mut subtasks) = board(Uuid::new_v4(), &["Intake"]);
    let stage_id = stages[0].id;
    subtasks.get_mut(&stage_id).unwrap()[0].due_date = Some(date!(2024 - 02 - 01));
    let subtask_id = subtasks[&stage_id][0].id;

    let patch = SubtaskPatch { due_date: Some(None), ..SubtaskPatch::default() };
    patch_subtask(&mut subtasks, subtask_id, &patch).unwrap();
    assert_eq!(subtasks[&stage_id][0].due_date, None);
}

#[test]
fn patch_subtask_rejects_blank_title() {
    let (stages, mut subtasks) = board(Uuid::new_v4(), &["Intake"]);
    let subtask_id = subtasks[&stages[0].id][0].id;
    let patch = SubtaskPatch { title: Some("  ".into()), ..SubtaskPatch::default() };
    assert!(matches!(patch_subtask(&mut subtasks, subtask_id, &patch), Err(StageError::EmptySubtaskTitle)));
}

#[test]
fn patch_subtask_unknown_id_is_not_found() {
    let (_, mut subtasks) = board(Uuid::new_v4(), &["Intake"]);
    let err = patch_subtask(&mut subtasks, Uuid::new_v4(), &SubtaskPatch::default()).unwrap_err();
    assert!(matches!(err, StageError::SubtaskNotFound(_)));
}

#[test]
fn progress_patches_need_contribute_structure_patches_need_manage() {
    let progress = SubtaskPatch { status: Some(Status::InProgress), due_date: Some(None), ..SubtaskPatch::default() };
    assert_eq!(progress.required_permission(), Permission::Contribute);

    let rename = SubtaskPatch { title: Some("New".into()), ..SubtaskPatch::default() };
    assert_eq!(rename.required_permission(), Permission::Manage);

    let flag = SubtaskPatch { document_required: Some(true), ..SubtaskPatch::default() };
    assert_eq!(flag.required_permission(), Permission::Manage);
}

// =============================================================================
// append_template + cascade
// =============================================================================

#[test]
fn append_template_continues_order_and_cascades() {
    let client_id = Uuid::new_v4();
    let (mut stages, mut subtasks) = board(client_id, &["Intake"]);
    let intake_id = stages[0].id;
    {
        let intake = subtasks.get_mut(&intake_id).unwrap();
        intake[0].status = Status::Completed;
        intake[0].due_date = Some(date!(2024 - 03 - 10));
    }

    let template = StageTemplate {
        id: Uuid::new_v4(),
        name: "Tax".into(),
        stages: vec![TemplateStage {
            name: "Collect W-2".into(),
            required: true,
            subtasks: vec![TemplateSubtask { title: "Upload W-2".into(), document_required: true }],
        }],
    };
    append_template(&mut stages, &mut subtasks, client_id, &template);

    assert_eq!(stages.len(), 2);
    assert_eq!(stages[1].order, 2);
    validate_stages(client_id, &stages, &subtasks).unwrap();

    let recomputed = recompute(&stages, &subtasks, date!(2024 - 03 - 20));
    assert_eq!(recomputed.stages[0].status, Status::Completed);
    assert_eq!(recomputed.stages[0].completion_date, Some(date!(2024 - 03 - 20)));
    assert_eq!(recomputed.stages[1].start_date, Some(date!(2024 - 03 - 10)));
    assert_eq!(recomputed.stages[1].status, Status::NotStarted);
}

#[test]
fn stage_board_serializes_subtasks_by_stage_id() {
    let client_id = Uuid::new_v4();
    let (stages, subtasks) = board(client_id, &["Intake"]);
    let stage_id = stages[0].id;
    let board = StageBoard { client_id, stages, subtasks, changed: Vec::new() };
    let value = serde_json::to_value(&board).unwrap();
    assert_eq!(value["stages"][0]["status"], "Not Started");
    assert_eq!(value["subtasks"][stage_id.to_string()][0]["title"], "Intake task");
    assert!(value.get("changed").is_none());
}

// =============================================================================
// live database
// =============================================================================

#[cfg(feature = "live-db-tests")]
use crate::services::access::Role;
#[cfg(feature = "live-db-tests")]
use crate::services::client::{self, ClientRow, NewClient};
#[cfg(feature = "live-db-tests")]
use crate::state::test_helpers;

#[cfg(feature = "live-db-tests")]
async fn live_client(pool: &PgPool, name: &str) -> (SessionUser, ClientRow) {
    let admin = test_helpers::insert_user(pool, Role::Admin, None).await;
    let client = client::create_client(pool, &admin, &NewClient { name: name.into(), ..NewClient::default() })
        .await
        .expect("create_client should succeed");
    (admin, client)
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn save_persists_cascade_and_reorder_recomputes() {
    let pool = test_helpers::integration_pool().await;
    let (admin, client) = live_client(&pool, "Cascade Co").await;

    let a = Stage::new(client.id, "A", 1);
    let b = Stage::new(client.id, "B", 2);
    let mut subtasks = SubtaskMap::new();
    let mut done_early = Subtask::new(a.id, "early", 0);
    done_early.status = Status::Completed;
    done_early.due_date = Some(date!(2024 - 01 - 10));
    let mut done_late = Subtask::new(a.id, "late", 1);
    done_late.status = Status::Completed;
    done_late.due_date = Some(date!(2024 - 01 - 15));
    subtasks.insert(a.id, vec![done_early, done_late]);

    let saved = save_stages(&pool, &admin, client.id, vec![a.clone(), b.clone()], subtasks)
        .await
        .expect("save_stages should succeed");
    assert_eq!(saved.stages[0].status, Status::Completed);
    assert_eq!(saved.stages[1].start_date, Some(date!(2024 - 01 - 15)));

    let loaded = get_stages(&pool, &admin, client.id).await.expect("get_stages should succeed");
    assert_eq!(loaded.stages[1].id, b.id);
    assert_eq!(loaded.stages[1].start_date, Some(date!(2024 - 01 - 15)));
    assert_eq!(loaded.subtasks[&a.id].len(), 2);

    let reordered = reorder_stage(&pool, &admin, client.id, 1, 0)
        .await
        .expect("reorder should succeed");
    assert_eq!(reordered.stages[0].id, b.id);
    assert_eq!(reordered.stages.iter().map(|s| s.order).collect::<Vec<_>>(), [1, 2]);

    let deleted = delete_stage(&pool, &admin, a.id).await.expect("delete should succeed");
    assert_eq!(deleted.stages.len(), 1);
    assert!(!deleted.subtasks.contains_key(&a.id));
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn concurrent_subtask_updates_both_land() {
    let pool = test_helpers::integration_pool().await;

    for round in 0..10 {
        let (admin, client) = live_client(&pool, &format!("Race Co {round}")).await;
        let stage = Stage::new(client.id, "Intake", 1);
        let x = Subtask::new(stage.id, "x", 0);
        let y = Subtask::new(stage.id, "y", 1);
        let (x_id, y_id) = (x.id, y.id);
        let mut subtasks = SubtaskMap::new();
        subtasks.insert(stage.id, vec![x, y]);
        save_stages(&pool, &admin, client.id, vec![stage.clone()], subtasks)
            .await
            .expect("save_stages should succeed");

        let done = SubtaskPatch { status: Some(Status::Completed), ..SubtaskPatch::default() };
        let (left, right) =
            tokio::join!(update_subtask(&pool, &admin, x_id, &done), update_subtask(&pool, &admin, y_id, &done));
        left.expect("first update should succeed");
        right.expect("second update should succeed");

        let board = get_stages(&pool, &admin, client.id).await.expect("get_stages should succeed");
        let statuses: Vec<Status> = board.subtasks[&stage.id].iter().map(|t| t.status).collect();
        assert_eq!(statuses, [Status::Completed, Status::Completed], "round {round}");
        assert_eq!(board.stages[0].status, Status::Completed, "round {round}");
    }
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn save_with_reused_subtask_id_is_a_validation_error() {
    let pool = test_helpers::integration_pool().await;
    let (admin, client) = live_client(&pool, "Duplicate Co").await;
    let a = Stage::new(client.id, "A", 1);
    let b = Stage::new(client.id, "B", 2);
    let first = Subtask::new(a.id, "shared", 0);
    let mut second = Subtask::new(b.id, "shared", 0);
    second.id = first.id;
    let mut subtasks = SubtaskMap::new();
    subtasks.insert(a.id, vec![first]);
    subtasks.insert(b.id, vec![second]);

    let err = save_stages(&pool, &admin, client.id, vec![a, b], subtasks).await.unwrap_err();
    assert!(matches!(err, StageError::Invalid(StageValidationError::DuplicateSubtask(_))));
}
