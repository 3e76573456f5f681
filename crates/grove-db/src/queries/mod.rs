//! Store operations, grouped by the table family they own.
//!
//! Each public operation is a method on [`crate::Database`] that runs in one
//! transaction. The free functions taking `&Connection` are the building
//! blocks shared between operations inside that transaction.

pub mod categories;
pub mod comments;
pub mod notifications;
pub mod reactions;
pub mod reports;
pub mod sharing;
pub mod stories;

#[cfg(test)]
pub(crate) mod test_support;
