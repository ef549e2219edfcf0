//! # exposure-error
//!
//! Unified error handling for exposure.
//!
//! - **ErrorKind**: what went wrong (e.g. FileNotFound, DeserializationFailed)
//! - **ErrorStatus**: whether a caller may retry it
//! - **Error Context**: key/value pairs that locate the cause
//! - **Error Source**: the wrapped underlying error, if any
//!
//! ## Usage
//!
//! ```rust
//! use exposure_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::DeserializationFailed, "expected `,`")
//!         .with_operation("provider::load_inventory")
//!         .with_context("path", "inventory.json"))
//! }
//! ```
//!
//! The diagram engine itself never fails. Only snapshot acquisition and the
//! command-line surface produce these errors.

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using exposure Error
pub type Result<T> = std::result::Result<T, Error>;
