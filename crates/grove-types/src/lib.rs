//! Shared payload and domain types for the SupportGrove service.
//!
//! Nothing in here touches storage or HTTP; `grove-db` and `grove-api` both
//! build on these definitions.

pub mod api;
pub mod hashtags;
pub mod kinds;
pub mod models;
pub mod pagination;

pub use kinds::{NotificationKind, ReactionKind, ReportTarget, ResponseType, StorySort};
