//! Source parsers.
//!
//! - `ts`: TypeScript parser built on swc, used for component sources,
//!   bundled declaration files and generated type-check translations.

pub mod ts;

pub use ts::{ExtractedComments, ParsedSource, parse_ts_source};
