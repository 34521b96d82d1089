//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own SQL, file storage and access checks so route handlers
//! can stay focused on protocol translation and auth plumbing. Onboarding
//! rules themselves live in the `onboarding` crate; services load rows, call
//! those rules, and write the results back.

pub mod access;
pub mod client;
pub mod document;
pub mod email_auth;
pub mod email_log;
pub mod help;
pub mod mailer;
pub mod session;
pub mod stage;
pub mod storage;
pub mod task;
pub mod template;
pub mod user;
