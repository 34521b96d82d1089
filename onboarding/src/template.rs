//! Stage templates and their instantiation for a client.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::stage::{Stage, Subtask, SubtaskMap};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSubtask {
    pub title: String,
    #[serde(default)]
    pub document_required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateStage {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub subtasks: Vec<TemplateSubtask>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTemplate {
    pub id: Uuid,
    pub name: String,
    pub stages: Vec<TemplateStage>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("template name is empty")]
    EmptyName,
    #[error("template has no stages")]
    NoStages,
    #[error("template stage {0} has an empty name")]
    EmptyStageName(usize),
    #[error("template stage {stage} subtask {subtask} has an empty title")]
    EmptySubtaskTitle { stage: usize, subtask: usize },
}

impl StageTemplate {
    /// # Errors
    ///
    /// Returns the first blank name or title, or [`TemplateError::NoStages`].
    pub fn validate(&self) -> Result<(), TemplateError> {
        if self.name.trim().is_empty() {
            return Err(TemplateError::EmptyName);
        }
        if self.stages.is_empty() {
            return Err(TemplateError::NoStages);
        }
        for (stage_idx, stage) in self.stages.iter().enumerate() {
            if stage.name.trim().is_empty() {
                return Err(TemplateError::EmptyStageName(stage_idx));
            }
            if let Some(subtask) = stage.subtasks.iter().position(|s| s.title.trim().is_empty()) {
                return Err(TemplateError::EmptySubtaskTitle { stage: stage_idx, subtask });
            }
        }
        Ok(())
    }
}

/// Create fresh stages and subtasks for `client_id` from template stages.
///
/// New stages are ordered after the highest `order` in `existing`. Every
/// stage and subtask starts `Not Started` with no dates.
#[must_use]
pub fn instantiate(template: &[TemplateStage], client_id: Uuid, existing: &[Stage]) -> (Vec<Stage>, SubtaskMap) {
    let base = existing.iter().map(|s| s.order).max().unwrap_or(0);
    let mut stages = Vec::with_capacity(template.len());
    let mut subtasks = SubtaskMap::new();

    for (order, planned) in (base + 1..).zip(template) {
        let mut stage = Stage::new(client_id, planned.name.trim(), order);
        stage.required = planned.required;

        let items = (0..)
            .zip(&planned.subtasks)
            .map(|(position, item)| {
                let mut subtask = Subtask::new(stage.id, item.title.trim(), position);
                subtask.document_required = item.document_required;
                subtask
            })
            .collect::<Vec<_>>();
        if !items.is_empty() {
            subtasks.insert(stage.id, items);
        }
        stages.push(stage);
    }
    (stages, subtasks)
}

#[cfg(test)]
#[path = "template_test.rs"]
mod tests;
