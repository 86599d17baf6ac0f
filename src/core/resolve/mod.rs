//! Deciding which keyed reads are flag reads.
//!
//! - `literal`: reduce a key expression to a fixed string
//! - `nominal`: check whether a receiver type is the flag container

mod literal;
mod nominal;

pub use literal::{UnresolvedReason, literal_text, resolve_key};
pub use nominal::matches_flag_set;
