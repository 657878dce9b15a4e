//! Sharkbase Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Error handling and logging shared by the sharkbase workspace members.
//!
//! # Example
//!
//! ```no_run
//! use sharkbase_common::{Result, SharkbaseError};
//!
//! fn parse_root(raw: &str) -> Result<i64> {
//!     raw.parse()
//!         .map_err(|_| SharkbaseError::config(format!("invalid root taxon id '{}'", raw)))
//! }
//! ```

pub mod error;
pub mod logging;

pub use error::{Result, SharkbaseError};
