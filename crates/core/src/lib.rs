//! Shared building blocks.
//!
//! Identifiers, the domain error model and the reducer contract used by the
//! citation state. Nothing in here performs IO.

pub mod error;
pub mod id;
pub mod reducer;

pub use error::{DomainError, DomainResult};
pub use id::{JobId, UserId};
pub use reducer::{Reducer, replay};
