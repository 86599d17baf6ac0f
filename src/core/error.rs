//! Fatal extraction errors.
//!
//! Anything that makes the result of a run untrustworthy is reported through
//! [`ExtractError`] and aborts the pass. Recoverable problems are collected as
//! [`crate::issues::Diagnostic`] values instead.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Failed to read source file: {}", path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse source file: {}: {message}", path.display())]
    SourceParse { path: PathBuf, message: String },

    #[error("Failed to read template file for component: {}", component.display())]
    TemplateRead {
        component: PathBuf,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse template: {}:\n{}", path.display(), format_diagnostics(diagnostics))]
    TemplateParse {
        path: PathBuf,
        diagnostics: Vec<String>,
    },

    #[error("Owning component file not found for template {}: {}", template.display(), owner.display())]
    OwningFileNotFound { template: PathBuf, owner: PathBuf },

    #[error("Type-check translation not available for template: {} (position {offset})", template.display())]
    TranslationUnavailable { template: PathBuf, offset: usize },

    #[error("Unable to resolve type at position {start} in template: {}", template.display())]
    NodeNotFound {
        template: PathBuf,
        start: usize,
        end: usize,
    },
}

fn format_diagnostics(diagnostics: &[String]) -> String {
    diagnostics
        .iter()
        .map(|d| format!("- {}", d))
        .collect::<Vec<_>>()
        .join("\n")
}
