pub mod core;
pub mod utils;

// Re-export the common types so callers can write `dslc::Context`
// instead of `dslc::core::context::Context`.
pub use crate::core::context::Context;
pub use crate::core::either::Either;
pub use crate::core::error::{Error, Result};
pub use crate::core::pipeline::{Abort, Parameter};
