//! Recoverable problems found during extraction.
//!
//! A diagnostic never aborts a run: the read or component it concerns is
//! skipped and the rest of the project is still analyzed. Each diagnostic
//! carries everything the reporter needs to print it.

use std::path::{Path, PathBuf};

use enum_dispatch::enum_dispatch;

use crate::core::flag_read::FlagSource;
use crate::core::position::LineIndex;
use crate::core::resolve::UnresolvedReason;

// ============================================================
// Rule
// ============================================================

/// Identifier of each diagnostic type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Rule {
    UnresolvedKey,
    UnsupportedTemplate,
    MissingTemplate,
    PositionOutOfRange,
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rule::UnresolvedKey => write!(f, "unresolved-key"),
            Rule::UnsupportedTemplate => write!(f, "unsupported-template"),
            Rule::MissingTemplate => write!(f, "missing-template"),
            Rule::PositionOutOfRange => write!(f, "position-out-of-range"),
        }
    }
}

// ============================================================
// Location
// ============================================================

/// Position in a file the user edits, with the line for context display.
///
/// `line` and `col` are 1-based. `col` counts UTF-16 code units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceContext {
    pub file_path: PathBuf,
    pub line: usize,
    pub col: usize,
    pub source_line: String,
}

impl SourceContext {
    /// Context for byte `offset` of `text`, or `None` when it lies outside the text.
    pub fn at_offset(file_path: &Path, text: &str, index: &LineIndex, offset: usize) -> Option<Self> {
        let pos = index.locate(offset)?;
        Some(Self {
            file_path: file_path.to_path_buf(),
            line: pos.row + 1,
            col: pos.col + 1,
            source_line: index.line_text(text, pos.row).unwrap_or_default().to_string(),
        })
    }
}

/// Location information for report output.
pub enum ReportLocation<'a> {
    Source(&'a SourceContext),
    /// File-level only, no line context.
    File { path: &'a Path },
}

impl ReportLocation<'_> {
    pub fn path(&self) -> &Path {
        match self {
            ReportLocation::Source(context) => &context.file_path,
            ReportLocation::File { path } => path,
        }
    }

    /// `(line, col)`, both 1-based; `(0, 0)` for file-level locations.
    pub fn line_col(&self) -> (usize, usize) {
        match self {
            ReportLocation::Source(context) => (context.line, context.col),
            ReportLocation::File { .. } => (0, 0),
        }
    }
}

// ============================================================
// Diagnostic Types
// ============================================================

/// Keyed read on the flag container whose key is not a compile-time string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedKeyIssue {
    pub context: SourceContext,
    pub source: FlagSource,
    /// Source text of the key expression.
    pub key_text: String,
    pub reason: UnresolvedReason,
}

/// `template` or `templateUrl` whose value is not a string literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedTemplateDeclIssue {
    pub context: SourceContext,
    pub class_name: String,
    pub property: String,
}

/// `templateUrl` pointing at a file that does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingTemplateIssue {
    pub context: SourceContext,
    pub class_name: String,
    pub template_path: PathBuf,
}

/// A read whose offset could not be mapped to a line. It is reported at 1:1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionOutOfRangeIssue {
    pub file_path: PathBuf,
    pub offset: usize,
    pub flag_id: String,
}

// ============================================================
// Report Trait
// ============================================================

/// Trait for types that can be reported to the CLI.
#[enum_dispatch]
pub trait Report {
    fn location(&self) -> ReportLocation<'_>;

    /// Primary message to display.
    fn message(&self) -> String;

    fn rule(&self) -> Rule;

    /// Optional hint for fixing the problem.
    fn hint(&self) -> Option<&str> {
        None
    }

    /// Optional details for the "= note:" line.
    fn details(&self) -> Option<String> {
        None
    }
}

impl Report for UnresolvedKeyIssue {
    fn location(&self) -> ReportLocation<'_> {
        ReportLocation::Source(&self.context)
    }

    fn message(&self) -> String {
        self.key_text.clone()
    }

    fn rule(&self) -> Rule {
        Rule::UnresolvedKey
    }

    fn hint(&self) -> Option<&str> {
        Some("use a string literal or a constant initialized with one")
    }

    fn details(&self) -> Option<String> {
        Some(format!("{} in {} code, read skipped", self.reason, self.source))
    }
}

impl Report for UnsupportedTemplateDeclIssue {
    fn location(&self) -> ReportLocation<'_> {
        ReportLocation::Source(&self.context)
    }

    fn message(&self) -> String {
        self.property.clone()
    }

    fn rule(&self) -> Rule {
        Rule::UnsupportedTemplate
    }

    fn details(&self) -> Option<String> {
        Some(format!(
            "{} is not a string literal, template of {} skipped",
            self.property, self.class_name
        ))
    }
}

impl Report for MissingTemplateIssue {
    fn location(&self) -> ReportLocation<'_> {
        ReportLocation::Source(&self.context)
    }

    fn message(&self) -> String {
        self.template_path.display().to_string()
    }

    fn rule(&self) -> Rule {
        Rule::MissingTemplate
    }

    fn details(&self) -> Option<String> {
        Some(format!("template of {} skipped", self.class_name))
    }
}

impl Report for PositionOutOfRangeIssue {
    fn location(&self) -> ReportLocation<'_> {
        ReportLocation::File {
            path: &self.file_path,
        }
    }

    fn message(&self) -> String {
        self.flag_id.clone()
    }

    fn rule(&self) -> Rule {
        Rule::PositionOutOfRange
    }

    fn details(&self) -> Option<String> {
        Some(format!("offset {} is past the end of the file", self.offset))
    }
}

// ============================================================
// Diagnostic Enum
// ============================================================

/// A recoverable problem found during extraction.
#[enum_dispatch(Report)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    UnresolvedKey(UnresolvedKeyIssue),
    UnsupportedTemplateDecl(UnsupportedTemplateDeclIssue),
    MissingTemplate(MissingTemplateIssue),
    PositionOutOfRange(PositionOutOfRangeIssue),
}

impl Diagnostic {
    /// Ordering used for output: path, line, column, rule.
    pub fn sort_key(&self) -> (PathBuf, usize, usize, Rule) {
        let location = self.location();
        let (line, col) = location.line_col();
        (location.path().to_path_buf(), line, col, self.rule())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn context(text: &str, offset: usize) -> SourceContext {
        SourceContext::at_offset(
            Path::new("/app/a.component.ts"),
            text,
            &LineIndex::new(text),
            offset,
        )
        .unwrap()
    }

    #[test]
    fn context_is_one_based_with_line_text() {
        let ctx = context("first\n  flags[key];\n", 8);
        assert_eq!(ctx.line, 2);
        assert_eq!(ctx.col, 3);
        assert_eq!(ctx.source_line, "  flags[key];");
    }

    #[test]
    fn context_outside_text_is_none() {
        let text = "abc";
        assert_eq!(
            SourceContext::at_offset(Path::new("/a.ts"), text, &LineIndex::new(text), 10),
            None
        );
    }

    #[test]
    fn unresolved_key_report() {
        let diagnostic = Diagnostic::UnresolvedKey(UnresolvedKeyIssue {
            context: context("flags[key]", 6),
            source: FlagSource::Component,
            key_text: "key".to_string(),
            reason: UnresolvedReason::NotStatic,
        });
        assert_eq!(diagnostic.rule(), Rule::UnresolvedKey);
        assert_eq!(diagnostic.message(), "key");
        assert_eq!(
            diagnostic.details().as_deref(),
            Some("key is not a compile-time string in component code, read skipped")
        );
        assert!(diagnostic.hint().is_some());
    }

    #[test]
    fn file_level_diagnostics_sort_first_in_their_file() {
        let out_of_range = Diagnostic::PositionOutOfRange(PositionOutOfRangeIssue {
            file_path: PathBuf::from("/app/a.component.ts"),
            offset: 99,
            flag_id: "beta".to_string(),
        });
        let missing = Diagnostic::MissingTemplate(MissingTemplateIssue {
            context: context("templateUrl: './a.html'", 13),
            class_name: "AComponent".to_string(),
            template_path: PathBuf::from("/app/a.html"),
        });
        let mut diagnostics = vec![missing.clone(), out_of_range.clone()];
        diagnostics.sort_by_key(Diagnostic::sort_key);
        assert_eq!(diagnostics, vec![out_of_range, missing]);
    }

    #[test]
    fn rule_display() {
        assert_eq!(Rule::UnresolvedKey.to_string(), "unresolved-key");
        assert_eq!(Rule::UnsupportedTemplate.to_string(), "unsupported-template");
        assert_eq!(Rule::MissingTemplate.to_string(), "missing-template");
        assert_eq!(Rule::PositionOutOfRange.to_string(), "position-out-of-range");
    }
}
