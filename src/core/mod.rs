// Public modules
pub mod context;
pub mod either;
pub mod error;
pub mod parameters;
pub mod pipeline;
pub mod remote;
pub mod shell;

// Re-export common types for convenience
pub use either::Either;
pub use error::{Error, Result};
pub use pipeline::{Abort, Parameter};
