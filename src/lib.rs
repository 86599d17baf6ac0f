//! ngflags - feature flag usage extraction for Angular projects
//!
//! ngflags finds every read of a feature flag in an Angular codebase: keyed
//! reads like `flags['new-dashboard']` on values of the flag container type,
//! in component TypeScript and in inline or external templates. Template
//! expressions are type-checked through a generated TypeScript translation,
//! so only reads on the real container type count.
//!
//! ## Module Structure
//!
//! - `cli`: Command-line interface layer
//! - `config`: Configuration file loading and parsing
//! - `core`: Extraction engine (scan, extract, aggregate)
//! - `issues`: Diagnostic type definitions and reporting
//! - `logging`: Tracing subscriber setup
//! - `utils`: Shared utility functions

pub mod cli;
pub mod config;
pub mod core;
pub mod issues;
pub mod logging;
pub mod utils;
