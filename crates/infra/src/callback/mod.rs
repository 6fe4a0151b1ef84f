//! Terminal-status callbacks to the caller's backend.
//!
//! Delivery is best-effort: the sender retries within its attempt budget and
//! then gives up, returning `false`. A failed callback never changes the
//! job's own outcome.

pub mod retry;
pub mod sender;

pub use retry::RetryPolicy;
pub use sender::{CallbackError, CallbackSender, CallbackTransport, HttpTransport};
