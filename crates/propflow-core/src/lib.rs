//! Core types for the Propflow automation engine
//!
//! This crate provides the fundamental types shared by every part of the
//! engine: identifiers, the causality-tracking Context, and the typed
//! domain event model.

mod context;
mod event;
mod ids;

pub use context::Context;
pub use event::{Event, EventPayload, IssueCategory, Severity, TriggerType};
pub use ids::{EventId, RuleId};
