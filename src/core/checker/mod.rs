//! A small TypeScript type checker.
//!
//! The checker answers two questions for the extractor: "what is the static
//! type of this expression" and "which initializer does this name refer to".
//! It understands the subset of TypeScript that Angular components use to
//! hold flag maps: annotated fields and parameters, class and interface
//! members with inheritance, type aliases, generics with explicit or simply
//! inferred arguments, signals and observables. Anything beyond that types
//! as `unknown`, which never matches a flag container.

mod declared;
mod infer;
pub mod program;
pub mod scope;
mod symbols;
pub mod types;

use std::cell::Cell;

pub use program::{LIB_ROOT, ModuleTarget, Program, SourceUnit, UnitKind};
pub use scope::{Binding, Scope, ScopeHooks, ScopedWalker, TypeEnv};
pub use symbols::Initializer;
pub use types::{NamedType, ObjectType, Origin, Param, Signature, Type};

/// Nesting limit for recursive type computations.
const MAX_DEPTH: usize = 48;

pub struct Checker {
    program: Program,
    depth: Cell<usize>,
}

impl Default for Checker {
    fn default() -> Self {
        Self::new()
    }
}

impl Checker {
    pub fn new() -> Self {
        Self {
            program: Program::new(),
            depth: Cell::new(0),
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Enter one level of recursion, or `None` when the limit is reached.
    fn enter(&self) -> Option<DepthGuard<'_>> {
        let depth = self.depth.get();
        if depth >= MAX_DEPTH {
            return None;
        }
        self.depth.set(depth + 1);
        Some(DepthGuard(&self.depth))
    }
}

struct DepthGuard<'a>(&'a Cell<usize>);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}
