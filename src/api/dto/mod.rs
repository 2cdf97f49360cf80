//! Data Transfer Objects for REST request/response serialization.
//!
//! Responses mostly reuse the domain and reporting types directly; the
//! types here cover request bodies, query strings and list envelopes.

pub mod account_dto;
pub mod command_dto;
pub mod common_dto;
pub mod event_dto;

pub use account_dto::*;
pub use command_dto::*;
pub use common_dto::*;
pub use event_dto::*;
