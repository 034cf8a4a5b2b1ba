//! Core types shared across the crate: the error taxonomy and the
//! cancellation token threaded through every operation.

pub mod cancel;
pub mod error;

pub use cancel::CancellationToken;
pub use error::{ErrorContext, RulesError, user_friendly_error};
