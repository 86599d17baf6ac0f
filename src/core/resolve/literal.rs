use std::fmt;

use swc_ecma_ast::{Expr, Lit};

use crate::core::checker::{Checker, TypeEnv};

/// Why a key expression could not be reduced to a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// `flags[0]`. Never a flag read, and not worth a warning.
    NumericKey,
    /// `` flags[`beta-${n}`] ``
    TemplateWithSubstitution,
    /// A reference whose declaration has no literal initializer, or any
    /// other computed expression.
    NotStatic,
}

impl UnresolvedReason {
    /// Whether the read should be reported to the user.
    pub fn is_reportable(self) -> bool {
        !matches!(self, UnresolvedReason::NumericKey)
    }
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedReason::NumericKey => write!(f, "numeric key"),
            UnresolvedReason::TemplateWithSubstitution => {
                write!(f, "template literal with substitutions")
            }
            UnresolvedReason::NotStatic => write!(f, "key is not a compile-time string"),
        }
    }
}

/// Text of a string literal or a template literal without substitutions.
///
/// Parentheses and `as const` are looked through.
pub fn literal_text(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Lit(Lit::Str(s)) => Some(s.value.to_string_lossy().to_string()),
        Expr::Tpl(tpl) if tpl.exprs.is_empty() => tpl
            .quasis
            .first()
            .and_then(|quasi| quasi.cooked.as_ref())
            .map(|cooked| cooked.to_string_lossy().to_string()),
        Expr::Paren(paren) => literal_text(&paren.expr),
        Expr::TsConstAssertion(assertion) => literal_text(&assertion.expr),
        _ => None,
    }
}

/// Reduce the key of a keyed read to the flag id it names.
///
/// Literals resolve directly. Identifiers and property accesses resolve when
/// the declaration they refer to is initialized with a literal; a
/// declaration initialized with another reference does not.
pub fn resolve_key(checker: &Checker, env: &TypeEnv, key: &Expr) -> Result<String, UnresolvedReason> {
    if let Some(text) = literal_text(key) {
        return Ok(text);
    }
    match key {
        Expr::Lit(Lit::Num(_)) => Err(UnresolvedReason::NumericKey),
        Expr::Tpl(_) => Err(UnresolvedReason::TemplateWithSubstitution),
        Expr::Paren(paren) => resolve_key(checker, env, &paren.expr),
        Expr::Ident(_) | Expr::Member(_) | Expr::OptChain(_) | Expr::TsNonNull(_) => checker
            .declaration_initializer(env, key)
            .and_then(|init| literal_text(&init.expr))
            .ok_or(UnresolvedReason::NotStatic),
        _ => Err(UnresolvedReason::NotStatic),
    }
}
