//! Shared helpers
//!
//! - [`with_error_handling`] / [`with_timeout`]: funnel native failures into [`crate::Error`]
//! - [`invoke_guarded`]: run user callbacks without letting a panic escape
//! - [`lock`]: poison-tolerant mutex access

mod error_handling;
mod guard;
mod sync;

pub use error_handling::{with_error_handling, with_timeout};
pub use guard::invoke_guarded;
pub(crate) use sync::{lock, read, write};
