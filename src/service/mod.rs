//! Service layer: lifecycle rules and their orchestration.
//!
//! [`TransitionEngine`] owns every status change. [`Scheduler`] and
//! [`AdminCommands`] are its two callers; [`ReportingService`] and
//! [`EventRecorder`] serve the read side and the event ledger.

pub mod admin_commands;
pub mod authorizer;
pub mod event_recorder;
pub mod reporting;
pub mod scheduler;
pub mod transition_engine;

pub use admin_commands::AdminCommands;
pub use authorizer::{AllowListAuthorizer, Authorizer};
pub use event_recorder::EventRecorder;
pub use reporting::{AccessSummary, AccountDetail, DashboardStats, PendingDeletion, ReportingService};
pub use scheduler::{Scheduler, SchedulerSettings, TickReport};
pub use transition_engine::TransitionEngine;
