//! Following a name or member access to the expression it was initialized with.

use std::rc::Rc;

use swc_ecma_ast::{
    ClassMember, Expr, Lit, MemberProp, OptChainBase, Prop, PropOrSpread, TsEnumMemberId,
};

use super::declared::prop_name_text;
use super::program::{Decl, ModuleTarget, SourceUnit};
use super::scope::{Binding, TypeEnv};
use super::types::{NamedType, Type};
use super::Checker;

/// An initializer expression together with the environment it is evaluated in.
#[derive(Debug, Clone)]
pub struct Initializer {
    pub env: TypeEnv,
    pub expr: Rc<Expr>,
}

impl Initializer {
    fn module(unit: &Rc<SourceUnit>, expr: &Expr) -> Self {
        Self {
            env: TypeEnv::module(unit.clone()),
            expr: Rc::new(expr.clone()),
        }
    }
}

/// Remove wrappers that do not change which value an expression denotes.
fn strip(expr: &Expr) -> &Expr {
    match expr {
        Expr::Paren(paren) => strip(&paren.expr),
        Expr::TsConstAssertion(assertion) => strip(&assertion.expr),
        Expr::TsSatisfies(satisfies) => strip(&satisfies.expr),
        Expr::TsNonNull(non_null) => strip(&non_null.expr),
        _ => expr,
    }
}

/// Property name denoted by a member access, when it is static.
fn member_key(prop: &MemberProp) -> Option<String> {
    match prop {
        MemberProp::Ident(ident) => Some(ident.sym.to_string()),
        MemberProp::PrivateName(_) => None,
        MemberProp::Computed(computed) => match strip(&computed.expr) {
            Expr::Lit(Lit::Str(s)) => s.value.as_str().map(str::to_string),
            Expr::Tpl(tpl) if tpl.exprs.is_empty() => tpl
                .quasis
                .first()
                .and_then(|q| q.cooked.as_ref())
                .and_then(|c| c.as_str())
                .map(str::to_string),
            _ => None,
        },
    }
}

impl Checker {
    /// Initializer of the declaration that `expr` refers to.
    ///
    /// Handles identifiers bound by `const`/`let`/`var` (locally, at module
    /// level, or through imports) and member accesses whose receiver is an
    /// object literal, a class instance, a class, an enum or a namespace
    /// import. Only one declaration is followed: an initializer that is
    /// itself a reference is returned as is.
    pub fn declaration_initializer(&self, env: &TypeEnv, expr: &Expr) -> Option<Initializer> {
        let _guard = self.enter()?;
        match strip(expr) {
            Expr::Ident(ident) => self.ident_initializer(env, &ident.sym),
            Expr::Member(member) => self.member_initializer(env, &member.obj, &member.prop),
            Expr::OptChain(chain) => match &*chain.base {
                OptChainBase::Member(member) => {
                    self.member_initializer(env, &member.obj, &member.prop)
                }
                OptChainBase::Call(_) => None,
            },
            _ => None,
        }
    }

    fn ident_initializer(&self, env: &TypeEnv, name: &str) -> Option<Initializer> {
        match env.scope.lookup(name) {
            Some(Binding::Var {
                init: Some(init), ..
            }) => Some(Initializer {
                env: env.clone(),
                expr: init,
            }),
            Some(_) => None,
            None => self.module_initializer(&env.unit, name),
        }
    }

    fn module_initializer(&self, unit: &Rc<SourceUnit>, name: &str) -> Option<Initializer> {
        let decl = unit.find_decl(name)?;
        self.decl_initializer(unit, decl)
    }

    fn exported_initializer(&self, unit: &Rc<SourceUnit>, name: &str) -> Option<Initializer> {
        let _guard = self.enter()?;
        let decl = unit.find_export(name)?;
        self.decl_initializer(unit, decl)
    }

    fn decl_initializer(&self, unit: &Rc<SourceUnit>, decl: Decl<'_>) -> Option<Initializer> {
        match decl {
            Decl::Var(_, declarator) => declarator
                .init
                .as_deref()
                .map(|init| Initializer::module(unit, init)),
            Decl::Import { module, imported } | Decl::ReExport { module, imported } => {
                match self.program.resolve_module(unit, module) {
                    ModuleTarget::Unit(target) => self.exported_initializer(&target, imported),
                    ModuleTarget::External(_) => None,
                }
            }
            _ => None,
        }
    }

    fn member_initializer(&self, env: &TypeEnv, obj: &Expr, prop: &MemberProp) -> Option<Initializer> {
        let key = member_key(prop)?;

        if let Some(container) = self.declaration_initializer(env, obj)
            && let Expr::Object(object) = strip(&container.expr)
        {
            for prop in &object.props {
                let PropOrSpread::Prop(prop) = prop else {
                    continue;
                };
                match &**prop {
                    Prop::KeyValue(kv) if prop_name_text(&kv.key).as_deref() == Some(&key) => {
                        return Some(Initializer {
                            env: container.env.clone(),
                            expr: Rc::new((*kv.value).clone()),
                        });
                    }
                    Prop::Shorthand(ident) if *ident.sym == *key => {
                        return self.ident_initializer(&container.env, &ident.sym);
                    }
                    _ => {}
                }
            }
            return None;
        }

        let receiver = self.type_of_expr(env, obj).non_nullable();
        self.typed_member_initializer(&receiver, &key)
    }

    fn typed_member_initializer(&self, receiver: &Type, key: &str) -> Option<Initializer> {
        let _guard = self.enter()?;
        match receiver {
            Type::Named(named) => self.class_field_initializer(named, key, false),
            Type::ClassObject(named) => self.class_field_initializer(named, key, true),
            Type::EnumObject(named) => {
                let unit = named.declared_in().and_then(|p| self.program.unit(p))?;
                unit.find_decls(&named.name).into_iter().find_map(|decl| {
                    let Decl::Enum(decl) = decl else {
                        return None;
                    };
                    decl.members.iter().find_map(|member| {
                        let name = match &member.id {
                            TsEnumMemberId::Ident(ident) => Some(ident.sym.to_string()),
                            TsEnumMemberId::Str(s) => s.value.as_str().map(str::to_string),
                        };
                        if name.as_deref() != Some(key) {
                            return None;
                        }
                        member
                            .init
                            .as_deref()
                            .map(|init| Initializer::module(&unit, init))
                    })
                })
            }
            Type::Namespace(path) => {
                let unit = self.program.unit(path)?;
                self.exported_initializer(&unit, key)
            }
            Type::Union(members) => members
                .iter()
                .filter(|t| !t.is_nullish())
                .find_map(|t| self.typed_member_initializer(t, key)),
            _ => None,
        }
    }

    /// Initializer of a class field, searching base classes.
    fn class_field_initializer(&self, named: &NamedType, key: &str, is_static: bool) -> Option<Initializer> {
        let _guard = self.enter()?;
        let unit = named.declared_in().and_then(|p| self.program.unit(p))?;
        for decl in unit.find_decls(&named.name) {
            let Decl::Class(_, class) = decl else {
                continue;
            };
            for member in &class.body {
                let ClassMember::ClassProp(prop) = member else {
                    continue;
                };
                if prop.is_static != is_static || prop_name_text(&prop.key).as_deref() != Some(key) {
                    continue;
                }
                let value = prop.value.as_deref()?;
                let this = if is_static {
                    Type::ClassObject(named.clone())
                } else {
                    Type::Named(named.clone())
                };
                return Some(Initializer {
                    env: TypeEnv::module(unit.clone()).with_this(this),
                    expr: Rc::new(value.clone()),
                });
            }
        }
        self.heritage(named)
            .iter()
            .find_map(|base| self.class_field_initializer(base, key, is_static))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;
    use swc_common::Spanned;

    use super::*;
    use crate::core::checker::{ScopeHooks, ScopedWalker, UnitKind};

    struct InitAt<'a> {
        needle: &'a str,
        found: Vec<Option<String>>,
    }

    impl ScopeHooks for InitAt<'_> {
        fn expr(&mut self, checker: &Checker, env: &TypeEnv, expr: &Expr) {
            let (start, end) = env.unit.parsed.range(expr.span());
            if env.unit.text.get(start..end) != Some(self.needle) {
                return;
            }
            let init = checker.declaration_initializer(env, expr).map(|init| {
                let (start, end) = init.env.unit.parsed.range(init.expr.span());
                init.env.unit.text[start..end].to_string()
            });
            self.found.push(init);
        }
    }

    fn init_in(checker: &Checker, path: PathBuf, code: &str, needle: &str) -> Option<String> {
        let unit = checker
            .program()
            .add_virtual(path, code.to_string(), UnitKind::Source)
            .unwrap();
        let hooks = ScopedWalker::new(checker, unit, InitAt {
            needle,
            found: Vec::new(),
        })
        .run();
        hooks
            .found
            .last()
            .cloned()
            .unwrap_or_else(|| panic!("expression `{}` not found", needle))
    }

    fn init_of(code: &str, needle: &str) -> Option<String> {
        init_in(&Checker::new(), PathBuf::from("/virtual/test.ts"), code, needle)
    }

    #[test]
    fn local_const() {
        let init = init_of(
            "function f() { const KEY = 'new-dashboard'; KEY; }",
            "KEY",
        );
        assert_eq!(init.as_deref(), Some("'new-dashboard'"));
    }

    #[test]
    fn module_const() {
        let init = init_of("const KEY = `beta`; function f() { KEY; }", "KEY");
        assert_eq!(init.as_deref(), Some("`beta`"));
    }

    #[test]
    fn object_literal_member_through_as_const() {
        let init = init_of(
            "const FLAGS = { dashboard: 'new-dashboard' } as const; FLAGS.dashboard;",
            "FLAGS.dashboard",
        );
        assert_eq!(init.as_deref(), Some("'new-dashboard'"));
    }

    #[test]
    fn object_literal_with_string_key_access() {
        let init = init_of(
            "const FLAGS = { 'dash-board': 'x' }; FLAGS['dash-board'];",
            "FLAGS['dash-board']",
        );
        assert_eq!(init.as_deref(), Some("'x'"));
    }

    #[test]
    fn shorthand_property_follows_binding() {
        let init = init_of(
            "const dashboard = 'new-dashboard'; const FLAGS = { dashboard }; FLAGS.dashboard;",
            "FLAGS.dashboard",
        );
        assert_eq!(init.as_deref(), Some("'new-dashboard'"));
    }

    #[test]
    fn class_field_through_this() {
        let init = init_of(
            r#"
            class C {
                readonly key = 'beta';
                read() { this.key; }
            }
            "#,
            "this.key",
        );
        assert_eq!(init.as_deref(), Some("'beta'"));
    }

    #[test]
    fn static_field() {
        let init = init_of(
            "class Keys { static readonly BETA = 'beta'; } Keys.BETA;",
            "Keys.BETA",
        );
        assert_eq!(init.as_deref(), Some("'beta'"));
    }

    #[test]
    fn enum_member() {
        let init = init_of(
            "enum Keys { Beta = 'beta', Gamma = 'gamma' } Keys.Gamma;",
            "Keys.Gamma",
        );
        assert_eq!(init.as_deref(), Some("'gamma'"));
    }

    #[test]
    fn second_hop_is_returned_unresolved() {
        let init = init_of("const A = 'a'; const B = A; B;", "B");
        assert_eq!(init.as_deref(), Some("A"));
    }

    #[test]
    fn parameters_have_no_initializer() {
        let init = init_of("function f(key: string) { key; }", "key");
        assert_eq!(init, None);
    }

    #[test]
    fn imported_const() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("keys.ts"),
            "export const BETA_KEY = 'beta';\n",
        )
        .unwrap();
        let checker = Checker::new();
        let init = init_in(
            &checker,
            dir.path().join("main.ts"),
            "import { BETA_KEY } from './keys'; BETA_KEY;",
            "BETA_KEY",
        );
        assert_eq!(init.as_deref(), Some("'beta'"));
    }
}
