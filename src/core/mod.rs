//! Extraction engine.
//!
//! A run goes through three phases:
//!
//! 1. **Scan**: [`file_scanner`] selects the component sources.
//! 2. **Extract**: [`extract`] walks each source with the [`checker`] and
//!    type-checks template expressions through the [`bridge`].
//! 3. **Aggregate**: [`aggregate`] merges reads into a [`FlagReport`].
//!
//! [`context::ExtractContext`] drives all three.

pub mod aggregate;
pub mod bridge;
pub mod checker;
pub mod context;
pub mod error;
pub mod extract;
pub mod file_scanner;
pub mod flag_read;
pub mod parsers;
pub mod position;
pub mod resolve;
pub mod template;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregate::{FlagReport, ReadFilter};
pub use context::{ExtractContext, Extraction};
pub use error::ExtractError;
pub use flag_read::{FlagRead, FlagSource};
