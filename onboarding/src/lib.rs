//! Shared onboarding domain model and derivation rules.
//!
//! This crate owns every rule the portal applies to onboarding data: the
//! stage/subtask model, the cascade that derives stage status and start dates
//! from subtasks, drag-reorder reindexing, document bucketing and folder
//! trees, and template instantiation. It performs no I/O so the server and
//! its tests can call it directly.

pub mod cascade;
pub mod document;
pub mod envelope;
pub mod reorder;
pub mod stage;
pub mod template;
pub mod tree;

pub use cascade::{Recomputed, recompute, stage_status};
pub use document::{Document, DocumentBucket, DocumentBuckets, UploadedBy, Visibility, classify};
pub use envelope::ApiResponse;
pub use reorder::{ReorderError, move_stage, reindex};
pub use stage::{Stage, StageValidationError, Status, Subtask, SubtaskMap, validate_stages};
pub use template::{StageTemplate, TemplateError, TemplateStage, TemplateSubtask, instantiate};
pub use tree::{FolderNode, build_tree};
