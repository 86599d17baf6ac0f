//! Angular template parsing.
//!
//! [`parse_template`] turns template text into a [`Template`] whose spans are
//! byte offsets into that text. Expressions inside bindings, interpolations and
//! block parameters are parsed eagerly, so every error in the template is
//! reported in one pass.

pub mod ast;
mod expr;
mod lexer;
mod markup;
mod microsyntax;
pub mod visitor;

use std::fmt;

pub use ast::*;
pub use expr::{parse_action, parse_binding, parse_interpolation};
pub use visitor::Visitor;

/// A syntax error in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateError {
    pub message: String,
    pub span: Span,
}

impl TemplateError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.span)
    }
}

impl std::error::Error for TemplateError {}

/// Parse a template. All errors are returned, in document order.
pub fn parse_template(text: &str) -> Result<Template, Vec<TemplateError>> {
    let (nodes, mut errors) = markup::parse_markup(text);
    if errors.is_empty() {
        return Ok(Template { nodes });
    }
    errors.sort_by_key(|e| (e.span.start, e.span.end));
    Err(errors)
}
