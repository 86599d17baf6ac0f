//! Flag-read extraction.
//!
//! - `source_walker`: keyed reads in component source, and the driver for templates
//! - `template_meta`: where a component's template lives
//! - `template_walker`: keyed reads in templates, filtered through the type bridge

mod source_walker;
mod template_meta;
mod template_walker;

pub use source_walker::{UnitExtraction, extract_from_unit};
pub use template_meta::{ComponentDecl, TemplateLookup, template_of};
pub use template_walker::{TemplateFlagRead, collect_candidates};
