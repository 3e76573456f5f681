pub mod categories;
pub mod comments;
pub mod error;
pub mod extractors;
pub mod mailer;
pub mod notifications;
pub mod router;
pub mod sharing;
pub mod state;
pub mod stories;

pub use router::router;
pub use state::{AppState, AppStateInner};
