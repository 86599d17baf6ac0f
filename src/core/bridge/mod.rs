//! Types of template expressions.
//!
//! Templates are not TypeScript, so the bridge asks a [`TranslationService`]
//! for a TypeScript translation of the template, registers it with the
//! checker, and types the translated node that corresponds to a template span.
//! Translations are cached per template path for the whole run.

pub mod tcb;

use std::{
    cell::{OnceCell, RefCell},
    collections::HashMap,
    path::{Path, PathBuf},
    rc::Rc,
    sync::LazyLock,
};

use indexmap::IndexMap;
use regex::Regex;
use swc_common::Spanned;
use swc_ecma_ast::Expr;
use tracing::{debug, trace};

use crate::core::checker::{Checker, ScopeHooks, ScopedWalker, SourceUnit, Type, TypeEnv, UnitKind};
use crate::core::error::ExtractError;
use crate::core::resolve::matches_flag_set;
use crate::core::template::Span;

pub use tcb::{
    Selection, TcbGenerator, TemplateOwner, Translation, TranslationRequest, TranslationService,
};

static SPAN_COMMENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+),(\d+)$").unwrap());

/// A translation registered with the checker.
struct CachedTranslation {
    translation: Translation,
    unit: Rc<SourceUnit>,
    /// `"start,end"` to the translation offset where the annotated node ends.
    comment_map: OnceCell<HashMap<String, usize>>,
}

pub struct TypeBridge<'c> {
    checker: &'c Checker,
    service: Box<dyn TranslationService + 'c>,
    owners: RefCell<IndexMap<PathBuf, Vec<TemplateOwner>>>,
    cache: RefCell<HashMap<PathBuf, Rc<CachedTranslation>>>,
}

impl<'c> TypeBridge<'c> {
    pub fn new(checker: &'c Checker) -> Self {
        Self::with_service(checker, TcbGenerator)
    }

    pub fn with_service(checker: &'c Checker, service: impl TranslationService + 'c) -> Self {
        Self {
            checker,
            service: Box::new(service),
            owners: RefCell::default(),
            cache: RefCell::default(),
        }
    }

    /// Record that a component declares a template. Must happen before the
    /// template is first queried.
    pub fn register(&self, owner: TemplateOwner) {
        self.owners
            .borrow_mut()
            .entry(owner.template.path.clone())
            .or_default()
            .push(owner);
    }

    /// Static type of the template expression at `start..end` of `template_path`.
    pub fn resolve_type(
        &self,
        template_path: &Path,
        start: usize,
        end: usize,
    ) -> Result<Type, ExtractError> {
        let cached = self.translation(template_path, start)?;

        let selection = cached
            .translation
            .selections
            .iter()
            .find(|s| s.template.start == start && s.template.end == end);
        if let Some(selection) = selection
            && let Some(ty) = type_at(self.checker, &cached.unit, NodeQuery::Enclosing(selection.translation))
        {
            return Ok(ty);
        }

        let comments = cached
            .comment_map
            .get_or_init(|| build_comment_map(&cached.unit));
        if let Some(&end_offset) = comments.get(&format!("{},{}", start, end))
            && let Some(ty) = type_at(self.checker, &cached.unit, NodeQuery::EndingAt(end_offset))
        {
            return Ok(ty);
        }

        Err(ExtractError::NodeNotFound {
            template: template_path.to_path_buf(),
            start,
            end,
        })
    }

    /// Whether the expression at `span` has the flag container type `target`.
    pub fn receiver_matches(
        &self,
        template_path: &Path,
        span: Span,
        target: &str,
    ) -> Result<bool, ExtractError> {
        let ty = self.resolve_type(template_path, span.start, span.end)?;
        trace!(template = %template_path.display(), %span, ty = %ty, "template receiver type");
        Ok(matches_flag_set(&ty, target))
    }

    fn translation(
        &self,
        template_path: &Path,
        offset: usize,
    ) -> Result<Rc<CachedTranslation>, ExtractError> {
        if let Some(cached) = self.cache.borrow().get(template_path) {
            return Ok(cached.clone());
        }

        let owner_path = owning_file(template_path);
        let program = self.checker.program();
        if program.unit(&owner_path).is_none() {
            if !owner_path.is_file() {
                return Err(ExtractError::OwningFileNotFound {
                    template: template_path.to_path_buf(),
                    owner: owner_path,
                });
            }
            program.load(&owner_path)?;
        }

        let owners = self
            .owners
            .borrow()
            .get(template_path)
            .cloned()
            .unwrap_or_default();
        let request = TranslationRequest {
            template_path,
            offset,
            owner_path: &owner_path,
            owners: &owners,
        };
        let Some(translation) = self.service.translate(&request)? else {
            return Err(ExtractError::TranslationUnavailable {
                template: template_path.to_path_buf(),
                offset,
            });
        };
        debug!(
            template = %template_path.display(),
            translation = %translation.path.display(),
            selections = translation.selections.len(),
            "generated type-check translation"
        );
        let unit = program.add_virtual(
            translation.path.clone(),
            translation.text.clone(),
            UnitKind::Translation,
        )?;
        let cached = Rc::new(CachedTranslation {
            translation,
            unit,
            comment_map: OnceCell::new(),
        });
        self.cache
            .borrow_mut()
            .insert(template_path.to_path_buf(), cached.clone());
        Ok(cached)
    }
}

/// The component source a template belongs to: the file itself for inline
/// templates, the sibling `.ts` file with the same base name otherwise.
pub fn owning_file(template_path: &Path) -> PathBuf {
    template_path.with_extension("ts")
}

fn build_comment_map(unit: &SourceUnit) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (pos, comments) in &unit.parsed.comments.trailing {
        for comment in comments {
            let text = comment.text.trim();
            if SPAN_COMMENT_REGEX.is_match(text) {
                map.entry(text.to_string())
                    .or_insert_with(|| unit.parsed.offset(*pos));
            }
        }
    }
    map
}

#[derive(Debug, Clone, Copy)]
enum NodeQuery {
    /// Smallest expression enclosing the range.
    Enclosing(Span),
    /// Largest expression ending at the offset.
    EndingAt(usize),
}

struct NodeAt {
    query: NodeQuery,
    /// Lower is better.
    best: Option<(usize, Type)>,
}

impl ScopeHooks for NodeAt {
    fn expr(&mut self, checker: &Checker, env: &TypeEnv, expr: &Expr) {
        let (lo, hi) = env.unit.parsed.range(expr.span());
        let score = match self.query {
            NodeQuery::Enclosing(span) => (lo <= span.start && span.end <= hi).then(|| hi - lo),
            NodeQuery::EndingAt(end) => (hi == end).then(|| usize::MAX - (hi - lo)),
        };
        let Some(score) = score else {
            return;
        };
        if self.best.as_ref().is_none_or(|(best, _)| score < *best) {
            self.best = Some((score, checker.type_of_expr(env, expr)));
        }
    }
}

fn type_at(checker: &Checker, unit: &Rc<SourceUnit>, query: NodeQuery) -> Option<Type> {
    ScopedWalker::new(checker, unit.clone(), NodeAt { query, best: None })
        .run()
        .best
        .map(|(_, ty)| ty)
}
