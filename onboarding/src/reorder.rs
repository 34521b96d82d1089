//! Drag-and-drop stage reordering.

use crate::stage::Stage;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReorderError {
    #[error("stage index {index} out of range ({len} stages)")]
    OutOfRange { index: usize, len: usize },
}

/// Move the stage at `from` to `to`, then renumber every stage.
///
/// Indices refer to the slice as given, which callers keep in display order.
///
/// # Errors
///
/// Returns [`ReorderError::OutOfRange`] if either index is past the end.
pub fn move_stage(stages: &mut Vec<Stage>, from: usize, to: usize) -> Result<(), ReorderError> {
    let len = stages.len();
    for index in [from, to] {
        if index >= len {
            return Err(ReorderError::OutOfRange { index, len });
        }
    }
    let stage = stages.remove(from);
    stages.insert(to, stage);
    reindex(stages);
    Ok(())
}

/// Assign `order = index + 1` to every stage.
pub fn reindex(stages: &mut [Stage]) {
    for (idx, stage) in stages.iter_mut().enumerate() {
        stage.order = i32::try_from(idx + 1).unwrap_or(i32::MAX);
    }
}

#[cfg(test)]
#[path = "reorder_test.rs"]
mod tests;
