//! Flag reads in Angular templates.

use tracing::{debug, trace};

use crate::core::bridge::TypeBridge;
use crate::core::error::ExtractError;
use crate::core::flag_read::TemplateMetadata;
use crate::core::template::{Expr, ExprKind, Span, Template, Visitor, parse_template, visitor};

/// A keyed read with a string-literal key. Spans are relative to the
/// template content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFlagRead {
    pub expr: Span,
    pub receiver: Span,
    pub key: Span,
    pub flag_id: String,
}

#[derive(Default)]
struct KeyedReads {
    found: Vec<TemplateFlagRead>,
}

impl Visitor for KeyedReads {
    fn visit_expr(&mut self, expr: &Expr) {
        if let ExprKind::KeyedRead { receiver, key } | ExprKind::SafeKeyedRead { receiver, key } =
            &expr.kind
            && let Some(flag_id) = key.as_string_literal()
        {
            self.found.push(TemplateFlagRead {
                expr: expr.span,
                receiver: receiver.span,
                key: key.span,
                flag_id: flag_id.to_string(),
            });
        }
        visitor::walk_expr(self, expr);
    }
}

fn parse(template: &TemplateMetadata) -> Result<Template, ExtractError> {
    parse_template(&template.content).map_err(|errors| ExtractError::TemplateParse {
        path: template.path.clone(),
        diagnostics: errors.iter().map(ToString::to_string).collect(),
    })
}

/// Every keyed read with a string-literal key, in document order, whatever
/// its receiver.
pub fn collect_candidates(template: &TemplateMetadata) -> Result<Vec<TemplateFlagRead>, ExtractError> {
    let parsed = parse(template)?;
    let mut reads = KeyedReads::default();
    reads.visit_nodes(&parsed.nodes);
    Ok(reads.found)
}

/// Keyed reads whose receiver is typed as the flag container `target`.
///
/// The owning component must already be registered with `bridge`.
pub fn extract(
    bridge: &TypeBridge<'_>,
    template: &TemplateMetadata,
    target: &str,
) -> Result<Vec<TemplateFlagRead>, ExtractError> {
    let candidates = collect_candidates(template)?;
    let mut accepted = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let receiver = Span::new(
            template.file_offset(candidate.receiver.start),
            template.file_offset(candidate.receiver.end),
        );
        if bridge.receiver_matches(&template.path, receiver, target)? {
            accepted.push(candidate);
        } else {
            trace!(flag = %candidate.flag_id, %receiver, "receiver is not a flag container");
        }
    }
    debug!(
        template = %template.path.display(),
        reads = accepted.len(),
        "extracted template reads"
    );
    Ok(accepted)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::core::bridge::TemplateOwner;
    use crate::core::checker::{Checker, UnitKind};
    use crate::core::flag_read::{EscapeMap, TemplateKind};

    fn external(content: &str) -> TemplateMetadata {
        TemplateMetadata {
            kind: TemplateKind::External,
            path: PathBuf::from("/virtual/app/x.component.html"),
            content: content.to_string(),
            offset: 0,
            escapes: EscapeMap::default(),
        }
    }

    fn ids(content: &str) -> Vec<String> {
        collect_candidates(&external(content))
            .unwrap()
            .into_iter()
            .map(|read| read.flag_id)
            .collect()
    }

    #[test]
    fn interpolation_read_spans() {
        let content = "{{ flags['feature-x'] }}";
        let reads = collect_candidates(&external(content)).unwrap();
        assert_eq!(reads.len(), 1);
        let read = &reads[0];
        assert_eq!(read.flag_id, "feature-x");
        assert_eq!(&content[read.receiver.start..read.receiver.end], "flags");
        assert_eq!(&content[read.key.start..read.key.end], "'feature-x'");
        assert_eq!(&content[read.expr.start..read.expr.end], "flags['feature-x']");
    }

    #[test]
    fn every_binding_context_is_visited() {
        let content = r#"
<div [hidden]="f['bound']" (click)="f['event'] && go()" title="{{ f['attr'] }}">
  <p *ngIf="f['structural']">{{ f['text'] }}</p>
</div>
@let enabled = f['let'];
@switch (f['switch']) {
  @case (f['case']) { @if (f['if']) {} @else if (f['else-if']) {} @else { {{ f['else'] }} } }
  @default { {{ f['default'] }} }
}
@for (item of f['for']; track item) { {{ f['item'] }} } @empty { {{ f['empty'] }} }
@defer (when f['when']) { {{ f['defer'] }} } @placeholder { {{ f['placeholder'] }} } @loading { {{ f['loading'] }} } @error { {{ f['error'] }} }
"#;
        let mut found = ids(content);
        found.sort();
        let mut expected = vec![
            "bound", "event", "attr", "structural", "text", "let", "switch", "case", "if",
            "else-if", "else", "default", "for", "item", "empty", "when", "defer", "placeholder",
            "loading", "error",
        ];
        expected.sort();
        assert_eq!(found, expected);
    }

    #[test]
    fn safe_keyed_and_nested_reads() {
        assert_eq!(ids("{{ f?.['a'] }}{{ g[f['b']] }}"), vec!["a", "b"]);
    }

    #[test]
    fn non_literal_keys_are_not_candidates() {
        assert!(ids("{{ f[key] }}{{ f[0] }}{{ f['a' + b] }}").is_empty());
    }

    #[test]
    fn malformed_template_is_fatal_with_diagnostics() {
        let err = collect_candidates(&external("@if (a) {")).unwrap_err();
        let ExtractError::TemplateParse { path, diagnostics } = err else {
            panic!("expected a parse error");
        };
        assert_eq!(path, PathBuf::from("/virtual/app/x.component.html"));
        assert!(diagnostics.iter().any(|d| d.contains("Unclosed block \"if\"")));
    }

    #[test]
    fn only_flag_container_receivers_are_kept() {
        let checker = Checker::new();
        checker
            .program()
            .add_virtual(
                PathBuf::from("/virtual/app/x.component.ts"),
                r#"
interface LDFlagSet { [key: string]: unknown }
export class XComponent {
    flags!: LDFlagSet;
    labels: Record<string, string> = {};
}
"#
                .to_string(),
                UnitKind::Source,
            )
            .unwrap();
        let template = external("{{ flags['beta'] }} {{ labels['title'] }}");
        let bridge = TypeBridge::new(&checker);
        bridge.register(TemplateOwner {
            component_path: PathBuf::from("/virtual/app/x.component.ts"),
            class_name: "XComponent".to_string(),
            template: template.clone(),
        });
        let reads = extract(&bridge, &template, "LDFlagSet").unwrap();
        assert_eq!(
            reads.iter().map(|r| r.flag_id.as_str()).collect::<Vec<_>>(),
            vec!["beta"]
        );
        assert!(Path::new(&template.path).ends_with("x.component.html"));
    }
}
