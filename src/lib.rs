//! # mailsmith
//!
//! Drives a multi-step content-production workflow: draft an HTML artifact
//! from a natural-language brief via a pluggable generation backend, route it
//! through a human-approval gate, and deliver it through an email transport.
//!
//! The interesting part is the instance workflow engine: a per-run state
//! machine that sequences generation, human review and delivery, persists its
//! progress durably between asynchronous steps, and resumes correctly when an
//! external actor calls back hours or days later.
//!
//! ## Modules
//!
//! - `instance` - per-instance durable storage: config, state document,
//!   artifact archiving, progress log
//! - `prompt` - prompt composition from template, instructions and an
//!   existing artifact (edit mode)
//! - `clients` - collaborator boundary: generation backend, delivery
//!   transport and review service traits with HTTP adapters
//! - `engine` - the parametrized workflow orchestrator with sync/async
//!   execution modes and the resume entry point
//! - `server` - thin REST binding of the engine's operations
//!
//! Concurrency note: the engine assumes single-writer access per instance.
//! Concurrent invocations against the same instance id are not arbitrated by
//! a lock; callers serialize externally (e.g. only resume after observing a
//! waiting run).

pub mod clients;
pub mod engine;
pub mod error;
pub mod instance;
pub mod prompt;
pub mod server;

pub use engine::{ExecMode, Operation, Outcome, ResumeDecision, WorkflowEngine};
pub use error::{Error, Result};
