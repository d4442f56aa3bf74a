//! MeritPath citation client: configuration, the per-user session the views
//! talk to, and user alerts.

pub mod config;
pub mod notifier;
pub mod session;

pub use config::ClientConfig;
pub use notifier::{Notifier, RecordingNotifier, TracingNotifier};
pub use session::{CitationSession, CitersView, ProfileCheck, SubmitError};
