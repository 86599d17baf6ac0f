//! Data model shared by the walkers, the bridge and the report layer.

use std::{fmt, path::PathBuf};

use serde::Serialize;

/// Where a flag read was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagSource {
    /// Keyed read in TypeScript component code.
    Component,
    /// Keyed read in an Angular template (inline or external).
    Template,
}

impl fmt::Display for FlagSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagSource::Component => write!(f, "component"),
            FlagSource::Template => write!(f, "template"),
        }
    }
}

/// One observed read of a feature flag.
///
/// `file_path` is always a real file on disk (the component source for
/// inline templates) and the position is relative to that file's content.
/// Rows and columns are zero-based; `col_end` is exclusive. Columns count
/// UTF-16 code units, so a character outside the Basic Multilingual Plane
/// takes two.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagRead {
    pub source: FlagSource,
    pub file_path: PathBuf,
    pub row: usize,
    pub col_start: usize,
    pub col_end: usize,
    pub flag_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// `template: '...'` inside the decorator.
    Inline,
    /// `templateUrl: './x.html'` pointing at a sibling file.
    External,
}

/// A template owned by a component declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateMetadata {
    pub kind: TemplateKind,
    /// Owning source file for inline templates, resolved template file otherwise.
    pub path: PathBuf,
    /// Template text as Angular sees it. Escape sequences of inline
    /// templates are already decoded.
    pub content: String,
    /// Byte offset in `path` where `content` begins. Always 0 for external templates.
    pub offset: usize,
    pub escapes: EscapeMap,
}

impl TemplateMetadata {
    pub fn is_inline(&self) -> bool {
        self.kind == TemplateKind::Inline
    }

    /// Byte offset in `path` of the content byte at `local`.
    pub fn file_offset(&self, local: usize) -> usize {
        self.offset + self.escapes.to_source(local)
    }
}

/// Maps offsets in decoded literal text back to the literal's source text.
///
/// Holds one `(decoded offset, extra source bytes so far)` entry after each
/// escape sequence whose source is longer than its decoded text, in
/// ascending order. Empty for text without escapes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EscapeMap(Vec<(usize, usize)>);

impl EscapeMap {
    /// Record that `extra` more source bytes than decoded bytes were
    /// consumed before decoded offset `at`.
    pub fn push(&mut self, at: usize, extra: usize) {
        if extra == 0 {
            return;
        }
        let total = self.0.last().map_or(0, |&(_, shift)| shift) + extra;
        match self.0.last_mut() {
            Some(last) if last.0 == at => last.1 = total,
            _ => self.0.push((at, total)),
        }
    }

    /// Source offset of decoded offset `local`. Offsets inside a decoded
    /// escape map to the start of its source sequence.
    pub fn to_source(&self, local: usize) -> usize {
        let index = self.0.partition_point(|&(at, _)| at <= local);
        let shift = index.checked_sub(1).map_or(0, |i| self.0[i].1);
        local + shift
    }
}
