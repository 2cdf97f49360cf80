//! Domain layer: account model, audit and ledger types, clock, event bus.
//!
//! Everything here is storage-agnostic. Persistence lives in
//! [`crate::persistence`], orchestration in [`crate::service`].

pub mod account;
pub mod account_id;
pub mod audit;
pub mod clock;
pub mod event_bus;
pub mod lifecycle_event;
pub mod policy;
pub mod status;
pub mod values;

pub use account::{Account, Deadline, DeadlineKind};
pub use account_id::AccountId;
pub use audit::{ActionType, Actor, AdminId, AuditLogEntry, SYSTEM_ACTOR};
pub use clock::{Clock, ManualClock, SystemClock};
pub use event_bus::EventBus;
pub use lifecycle_event::{EventSource, EventSourceFilter, LifecycleEvent};
pub use policy::LifecyclePolicy;
pub use status::AccountStatus;
pub use values::{ExtensionDays, Reason};
