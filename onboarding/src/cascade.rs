//! Stage cascade: derive stage status and dates from subtasks.
//!
//! DESIGN
//! ======
//! [`recompute`] is a pure function over `(stages, subtasks, today)`. Every
//! mutating stage endpoint calls it before persisting, so the stored rows
//! always satisfy the derivation rules below.
//!
//! Each pass runs two steps in order:
//!
//! 1. Self-correction: a stage whose stored status differs from
//!    [`stage_status`] takes the computed one. On becoming `In Progress`
//!    with no start date it is stamped `today`; on becoming `Completed` the
//!    completion date is stamped `today` unless one is already set.
//! 2. Start-date cascade: every stage after the first (by `order`) takes as
//!    start date the latest due date among the previous stage's completed
//!    subtasks. With no completed, dated subtask the start date is kept.
//!
//! Passes repeat until one changes nothing. Two passes always suffice for
//! a fixed subtask map; the loop is capped at [`MAX_PASSES`] anyway.
//!
//! The start-date cascade trusts the user-entered due date, not the moment
//! a subtask was actually completed. Editing an earlier due date after the
//! fact can therefore move the next stage's start backwards.

use time::Date;
use uuid::Uuid;

use crate::stage::{Stage, Status, Subtask, SubtaskMap};

/// Upper bound on derivation passes.
pub const MAX_PASSES: usize = 8;

/// Result of [`recompute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recomputed {
    /// Stages sorted by `order`, with derived fields applied.
    pub stages: Vec<Stage>,
    /// Ids of stages with at least one field changed, in first-change order.
    pub changed: Vec<Uuid>,
    /// Passes executed, including the final one that changed nothing.
    pub passes: usize,
}

impl Recomputed {
    #[must_use]
    pub fn is_changed(&self) -> bool {
        !self.changed.is_empty()
    }
}

/// Status a stage should have given its subtasks.
#[must_use]
pub fn stage_status(subtasks: &[Subtask]) -> Status {
    if subtasks.is_empty() {
        return Status::NotStarted;
    }
    if subtasks.iter().all(|s| s.status == Status::Completed) {
        return Status::Completed;
    }
    if subtasks.iter().any(|s| s.status.is_started()) {
        Status::InProgress
    } else {
        Status::NotStarted
    }
}

/// Latest due date among completed subtasks, if any has one.
#[must_use]
pub fn latest_completed_due_date(subtasks: &[Subtask]) -> Option<Date> {
    subtasks
        .iter()
        .filter(|s| s.status == Status::Completed)
        .filter_map(|s| s.due_date)
        .max()
}

/// Re-derive status, start date and completion date for every stage.
#[must_use]
pub fn recompute(stages: &[Stage], subtasks: &SubtaskMap, today: Date) -> Recomputed {
    let mut stages = stages.to_vec();
    stages.sort_by_key(|s| s.order);

    let mut changed = Vec::new();
    let mut passes = 0;
    while passes < MAX_PASSES {
        passes += 1;
        let mut touched = false;

        for stage in &mut stages {
            if self_correct(stage, subtasks_of(subtasks, stage.id), today) {
                mark(&mut changed, stage.id);
                touched = true;
            }
        }

        for idx in 1..stages.len() {
            let previous = subtasks_of(subtasks, stages[idx - 1].id);
            let Some(start) = latest_completed_due_date(previous) else {
                continue;
            };
            let stage = &mut stages[idx];
            if stage.start_date != Some(start) {
                stage.start_date = Some(start);
                mark(&mut changed, stage.id);
                touched = true;
            }
        }

        if !touched {
            break;
        }
    }

    Recomputed { stages, changed, passes }
}

fn subtasks_of(map: &SubtaskMap, stage_id: Uuid) -> &[Subtask] {
    map.get(&stage_id).map_or(&[][..], Vec::as_slice)
}

fn self_correct(stage: &mut Stage, subtasks: &[Subtask], today: Date) -> bool {
    let computed = stage_status(subtasks);
    if computed == stage.status {
        return false;
    }
    stage.status = computed;
    match computed {
        Status::InProgress if stage.start_date.is_none() => stage.start_date = Some(today),
        Status::Completed if stage.completion_date.is_none() => stage.completion_date = Some(today),
        _ => {}
    }
    true
}

fn mark(changed: &mut Vec<Uuid>, id: Uuid) {
    if !changed.contains(&id) {
        changed.push(id);
    }
}

#[cfg(test)]
#[path = "cascade_test.rs"]
mod tests;
