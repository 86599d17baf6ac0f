//! Flag reads in component source, and the templates components declare.

use std::rc::Rc;

use swc_common::Spanned;
use swc_ecma_ast::{Class, Expr, MemberExpr, MemberProp, OptChainBase};
use tracing::{debug, instrument, warn};

use super::template_meta::{ComponentDecl, TemplateLookup, template_of};
use super::template_walker;
use crate::core::bridge::{TemplateOwner, TypeBridge};
use crate::core::checker::{Checker, ScopeHooks, ScopedWalker, SourceUnit, TypeEnv};
use crate::core::error::ExtractError;
use crate::core::flag_read::{FlagRead, FlagSource, TemplateMetadata};
use crate::core::position::LineIndex;
use crate::core::resolve::{matches_flag_set, resolve_key};
use crate::issues::{
    Diagnostic, MissingTemplateIssue, PositionOutOfRangeIssue, SourceContext, UnresolvedKeyIssue,
    UnsupportedTemplateDeclIssue,
};

/// Everything found in one compilation unit.
#[derive(Debug, Default)]
pub struct UnitExtraction {
    pub reads: Vec<FlagRead>,
    pub diagnostics: Vec<Diagnostic>,
}

struct FlagReadHooks<'a> {
    target: &'a str,
    index: LineIndex,
    reads: Vec<FlagRead>,
    diagnostics: Vec<Diagnostic>,
    components: Vec<ComponentDecl>,
}

impl FlagReadHooks<'_> {
    fn keyed_read(&mut self, checker: &Checker, env: &TypeEnv, member: &MemberExpr) {
        let MemberProp::Computed(computed) = &member.prop else {
            return;
        };
        let receiver = checker.type_of_expr(env, &member.obj);
        if !matches_flag_set(&receiver, self.target) {
            return;
        }

        let unit = &env.unit;
        let (start, end) = unit.parsed.range(computed.expr.span());
        match resolve_key(checker, env, &computed.expr) {
            Ok(flag_id) => {
                let Some(pos) = self.index.locate(start) else {
                    return;
                };
                self.reads.push(FlagRead {
                    source: FlagSource::Component,
                    file_path: unit.path.clone(),
                    row: pos.row,
                    col_start: pos.col,
                    col_end: pos.col + self.index.width(start, end),
                    flag_id,
                });
            }
            Err(reason) if reason.is_reportable() => {
                let key_text = unit.text.get(start..end).unwrap_or_default().to_string();
                warn!(path = %unit.path.display(), key = %key_text, %reason, "could not statically resolve flag key");
                let Some(context) = SourceContext::at_offset(&unit.path, &unit.text, &self.index, start)
                else {
                    return;
                };
                self.diagnostics
                    .push(Diagnostic::UnresolvedKey(UnresolvedKeyIssue {
                        context,
                        source: FlagSource::Component,
                        key_text,
                        reason,
                    }));
            }
            Err(_) => {}
        }
    }
}

impl ScopeHooks for FlagReadHooks<'_> {
    fn expr(&mut self, checker: &Checker, env: &TypeEnv, expr: &Expr) {
        match expr {
            Expr::Member(member) => self.keyed_read(checker, env, member),
            Expr::OptChain(chain) => {
                if let OptChainBase::Member(member) = &*chain.base {
                    self.keyed_read(checker, env, member);
                }
            }
            _ => {}
        }
    }

    fn class(&mut self, _checker: &Checker, _env: &TypeEnv, name: &str, class: &Class) {
        if let Some(component) = ComponentDecl::from_class(class, name) {
            self.components.push(component);
        }
    }
}

/// Extract every flag read of `unit` and of the templates its components declare.
///
/// Component reads come first in document order, followed by the reads of
/// each template in declaration order.
#[instrument(skip_all, fields(path = %unit.path.display()))]
pub fn extract_from_unit(
    bridge: &TypeBridge<'_>,
    checker: &Checker,
    unit: &Rc<SourceUnit>,
    target: &str,
) -> Result<UnitExtraction, ExtractError> {
    let hooks = ScopedWalker::new(
        checker,
        unit.clone(),
        FlagReadHooks {
            target,
            index: LineIndex::new(&unit.text),
            reads: Vec::new(),
            diagnostics: Vec::new(),
            components: Vec::new(),
        },
    )
    .run();
    debug!(reads = hooks.reads.len(), components = hooks.components.len(), "walked component source");

    let mut extraction = UnitExtraction {
        reads: hooks.reads,
        diagnostics: hooks.diagnostics,
    };

    // Every template of the unit is registered before any is type-checked,
    // so one translation of the file covers all of its inline templates.
    let mut templates = Vec::new();
    for component in &hooks.components {
        match template_of(unit, component)? {
            TemplateLookup::Found(template) => {
                bridge.register(TemplateOwner {
                    component_path: unit.path.clone(),
                    class_name: component.class_name.clone(),
                    template: template.clone(),
                });
                templates.push(template);
            }
            TemplateLookup::Absent => {}
            TemplateLookup::Unsupported { property, offset } => {
                warn!(component = %component.class_name, property, "template is not a string literal");
                if let Some(context) = SourceContext::at_offset(&unit.path, &unit.text, &hooks.index, offset) {
                    extraction.diagnostics.push(Diagnostic::UnsupportedTemplateDecl(
                        UnsupportedTemplateDeclIssue {
                            context,
                            class_name: component.class_name.clone(),
                            property: property.to_string(),
                        },
                    ));
                }
            }
            TemplateLookup::Missing { path, offset } => {
                warn!(component = %component.class_name, template = %path.display(), "template file not found");
                if let Some(context) = SourceContext::at_offset(&unit.path, &unit.text, &hooks.index, offset) {
                    extraction
                        .diagnostics
                        .push(Diagnostic::MissingTemplate(MissingTemplateIssue {
                            context,
                            class_name: component.class_name.clone(),
                            template_path: path,
                        }));
                }
            }
        }
    }

    for template in &templates {
        let reads = template_walker::extract(bridge, template, target)?;
        let external_index;
        let (text, index) = if template.is_inline() {
            (unit.text.as_str(), &hooks.index)
        } else {
            external_index = LineIndex::new(&template.content);
            (template.content.as_str(), &external_index)
        };
        for read in reads {
            extraction
                .reads
                .push(template_read(template, text, index, &read, &mut extraction.diagnostics));
        }
    }

    Ok(extraction)
}

/// Convert a template read to a position in the file the user edits.
fn template_read(
    template: &TemplateMetadata,
    text: &str,
    index: &LineIndex,
    read: &template_walker::TemplateFlagRead,
    diagnostics: &mut Vec<Diagnostic>,
) -> FlagRead {
    let offset = template.file_offset(read.key.start);
    let end = template.file_offset(read.key.end);
    let pos = index.locate(offset).unwrap_or_else(|| {
        warn!(path = %template.path.display(), offset, len = text.len(), "offset is outside of the file");
        diagnostics.push(Diagnostic::PositionOutOfRange(PositionOutOfRangeIssue {
            file_path: template.path.clone(),
            offset,
            flag_id: read.flag_id.clone(),
        }));
        Default::default()
    });
    FlagRead {
        source: FlagSource::Template,
        file_path: template.path.clone(),
        row: pos.row,
        col_start: pos.col,
        col_end: pos.col + index.width(offset, end),
        flag_id: read.flag_id.clone(),
    }
}
