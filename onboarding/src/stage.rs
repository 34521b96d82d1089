//! Stage and subtask records.
//!
//! DESIGN
//! ======
//! Subtasks are not nested inside their stage. They are kept in a
//! [`SubtaskMap`] keyed by stage id, which is the shape the editors send and
//! the shape the cascade walks.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

/// Mapping from stage id to that stage's subtasks, in display order.
pub type SubtaskMap = HashMap<Uuid, Vec<Subtask>>;

/// Progress of a stage or a subtask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[default]
    #[serde(rename = "Not Started", alias = "not_started")]
    NotStarted,
    #[serde(rename = "In Progress", alias = "in_progress")]
    InProgress,
    #[serde(rename = "Completed", alias = "completed")]
    Completed,
}

impl Status {
    /// Label used on the wire and in the database.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        }
    }

    /// Parse a stored label. Accepts the snake-case spelling older rows used,
    /// as deserialization does.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "Not Started" | "not_started" => Some(Self::NotStarted),
            "In Progress" | "in_progress" => Some(Self::InProgress),
            "Completed" | "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// True for `In Progress` and `Completed`.
    #[must_use]
    pub fn is_started(self) -> bool {
        !matches!(self, Self::NotStarted)
    }
}

/// A named phase of client onboarding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub id: Uuid,
    pub client_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub required: bool,
    /// 1-based position among the client's stages.
    pub order: i32,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub start_date: Option<Date>,
    #[serde(default)]
    pub completion_date: Option<Date>,
}

impl Stage {
    /// New empty stage in `Not Started` with no dates.
    #[must_use]
    pub fn new(client_id: Uuid, name: impl Into<String>, order: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id,
            name: name.into(),
            required: false,
            order,
            status: Status::NotStarted,
            start_date: None,
            completion_date: None,
        }
    }
}

/// A single checklist item within a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: Uuid,
    pub stage_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub due_date: Option<Date>,
    #[serde(default)]
    pub document_required: bool,
    #[serde(default)]
    pub position: i32,
}

impl Subtask {
    #[must_use]
    pub fn new(stage_id: Uuid, title: impl Into<String>, position: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            stage_id,
            title: title.into(),
            status: Status::NotStarted,
            due_date: None,
            document_required: false,
            position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageValidationError {
    #[error("stage {0} has an empty name")]
    EmptyStageName(Uuid),
    #[error("stage {0} appears more than once")]
    DuplicateStage(Uuid),
    #[error("stage {stage_id} belongs to client {found}, expected {expected}")]
    ForeignStage { stage_id: Uuid, expected: Uuid, found: Uuid },
    #[error("subtasks reference unknown stage {0}")]
    UnknownStage(Uuid),
    #[error("subtask {0} appears more than once")]
    DuplicateSubtask(Uuid),
    #[error("subtask {0} has an empty title")]
    EmptySubtaskTitle(Uuid),
    #[error("subtask {subtask_id} is filed under stage {key} but points at {stage_id}")]
    MisfiledSubtask { subtask_id: Uuid, key: Uuid, stage_id: Uuid },
}

/// Check a full stage list for one client before it replaces the stored one.
///
/// # Errors
///
/// Returns the first structural problem found.
pub fn validate_stages(client_id: Uuid, stages: &[Stage], subtasks: &SubtaskMap) -> Result<(), StageValidationError> {
    let mut seen = HashSet::with_capacity(stages.len());
    for stage in stages {
        if stage.client_id != client_id {
            return Err(StageValidationError::ForeignStage {
                stage_id: stage.id,
                expected: client_id,
                found: stage.client_id,
            });
        }
        if stage.name.trim().is_empty() {
            return Err(StageValidationError::EmptyStageName(stage.id));
        }
        if !seen.insert(stage.id) {
            return Err(StageValidationError::DuplicateStage(stage.id));
        }
    }

    let mut seen_subtasks = HashSet::new();
    for (stage_id, items) in subtasks {
        if !seen.contains(stage_id) {
            return Err(StageValidationError::UnknownStage(*stage_id));
        }
        for subtask in items {
            if subtask.stage_id != *stage_id {
                return Err(StageValidationError::MisfiledSubtask {
                    subtask_id: subtask.id,
                    key: *stage_id,
                    stage_id: subtask.stage_id,
                });
            }
            if subtask.title.trim().is_empty() {
                return Err(StageValidationError::EmptySubtaskTitle(subtask.id));
            }
            if !seen_subtasks.insert(subtask.id) {
                return Err(StageValidationError::DuplicateSubtask(subtask.id));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "stage_test.rs"]
mod tests;
