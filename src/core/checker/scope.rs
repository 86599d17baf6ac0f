//! Lexical scopes and the scope-tracking AST walker.
//!
//! swc's `Visit` hands out short-lived references, so bindings keep owned
//! copies of what later typing needs (declared types and shared initializer
//! expressions). Module-level names are never stored here; they are looked
//! up in the unit itself.

use std::{cell::RefCell, collections::HashMap, ptr, rc::Rc};

use swc_ecma_ast::{
    ArrowExpr, BlockStmt, CatchClause, Class, ClassDecl, ClassExpr, ClassMethod, ClassProp,
    Constructor, Decl, DefaultDecl, ExportDefaultDecl, Expr, FnDecl, ForHead, ForInStmt, ForOfStmt, ForStmt, Function, ParamOrTsParamProp, Pat,
    PrivateMethod, Stmt, TsParamPropParam, TsType, VarDeclOrExpr, VarDeclarator,
};
use swc_ecma_visit::{Visit, VisitWith};

use super::program::{DEFAULT_EXPORT, Decl as ModuleDecl, SourceUnit};
use super::types::{NamedType, Origin, Type};
use super::Checker;

/// What a local name is bound to.
#[derive(Debug, Clone)]
pub enum Binding {
    /// A variable. `ty` is the declared type, `init` the initializer.
    Var {
        ty: Option<Type>,
        init: Option<Rc<Expr>>,
    },
    /// The loop variable of `for (const x of iterable)`.
    Iterated(Rc<Expr>),
    /// A name whose type is known up front (parameters, nested functions).
    Typed(Type),
}

#[derive(Debug, Default)]
struct Frame {
    bindings: RefCell<HashMap<String, Binding>>,
    parent: Scope,
}

/// A chain of lexical frames. The empty scope is module level.
#[derive(Debug, Clone, Default)]
pub struct Scope(Option<Rc<Frame>>);

impl Scope {
    pub fn child(&self) -> Scope {
        Scope(Some(Rc::new(Frame {
            bindings: RefCell::default(),
            parent: self.clone(),
        })))
    }

    /// Bind `name` in the innermost frame. No-op at module level.
    pub fn declare(&self, name: impl Into<String>, binding: Binding) {
        if let Some(frame) = &self.0 {
            frame.bindings.borrow_mut().insert(name.into(), binding);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Binding> {
        let mut current = self.0.as_ref();
        while let Some(frame) = current {
            if let Some(binding) = frame.bindings.borrow().get(name) {
                return Some(binding.clone());
            }
            current = frame.parent.0.as_ref();
        }
        None
    }

    pub fn is_module_level(&self) -> bool {
        self.0.is_none()
    }
}

/// Everything needed to type an expression at some point of a unit.
#[derive(Debug, Clone)]
pub struct TypeEnv {
    pub unit: Rc<SourceUnit>,
    pub scope: Scope,
    pub this: Type,
}

impl TypeEnv {
    pub fn module(unit: Rc<SourceUnit>) -> Self {
        Self {
            unit,
            scope: Scope::default(),
            this: Type::Unknown,
        }
    }

    pub fn with_this(&self, this: Type) -> Self {
        Self {
            this,
            ..self.clone()
        }
    }

    pub fn with_scope(&self, scope: Scope) -> Self {
        Self {
            scope,
            ..self.clone()
        }
    }
}

/// Callbacks for [`ScopedWalker`].
pub trait ScopeHooks {
    /// Called for every expression before its children are visited.
    fn expr(&mut self, _checker: &Checker, _env: &TypeEnv, _expr: &Expr) {}

    /// Called for every class declaration before its body is visited,
    /// default-exported classes included. An anonymous default-exported class
    /// is named `default`.
    fn class(&mut self, _checker: &Checker, _env: &TypeEnv, _name: &str, _class: &Class) {}
}

/// Walks a unit while maintaining the lexical environment.
pub struct ScopedWalker<'c, H> {
    checker: &'c Checker,
    env: TypeEnv,
    class_this: Vec<Type>,
    entering_method: bool,
    type_params: Vec<String>,
    pub hooks: H,
}

impl<'c, H: ScopeHooks> ScopedWalker<'c, H> {
    pub fn new(checker: &'c Checker, unit: Rc<SourceUnit>, hooks: H) -> Self {
        Self {
            checker,
            env: TypeEnv::module(unit),
            class_this: Vec::new(),
            entering_method: false,
            type_params: Vec::new(),
            hooks,
        }
    }

    /// Walk the whole unit and return the hooks.
    pub fn run(mut self) -> H {
        let unit = self.env.unit.clone();
        unit.parsed.module.visit_with(&mut self);
        self.hooks
    }

    fn scoped<F: FnOnce(&mut Self)>(&mut self, this: Option<Type>, f: F) {
        let saved = self.env.clone();
        self.env.scope = self.env.scope.child();
        if let Some(this) = this {
            self.env.this = this;
        }
        f(self);
        self.env = saved;
    }

    fn with_type_params<F: FnOnce(&mut Self)>(&mut self, params: Vec<String>, f: F) {
        let len = self.type_params.len();
        self.type_params.extend(params);
        f(self);
        self.type_params.truncate(len);
    }

    fn annotation(&self, ty: Option<&TsType>) -> Option<Type> {
        ty.map(|ty| {
            self.checker
                .type_from_ts(&self.env.unit, ty, &self.type_params)
        })
    }

    fn declare_pat(&self, pat: &Pat, ty: Option<Type>) {
        self.checker
            .bind_pat(&self.env, pat, ty, &self.type_params);
    }

    /// Declare function and class declarations of a block before walking it.
    fn hoist(&self, stmts: &[Stmt]) {
        for stmt in stmts {
            match stmt {
                Stmt::Decl(Decl::Fn(func)) => {
                    let sig =
                        self.checker
                            .signature_of_function(&self.env, &func.function, &self.type_params);
                    self.env.scope.declare(
                        func.ident.sym.to_string(),
                        Binding::Typed(Type::Function(Rc::new(sig))),
                    );
                }
                Stmt::Decl(Decl::Class(class)) => self.env.scope.declare(
                    class.ident.sym.to_string(),
                    Binding::Typed(Type::Unknown),
                ),
                _ => {}
            }
        }
    }

    /// Instance type of a class declared at module level of the current unit.
    fn class_instance_type(&self, name: &str, class: &Class) -> Type {
        let is_module_level = self
            .env
            .unit
            .find_decls(name)
            .into_iter()
            .any(|d| matches!(d, ModuleDecl::Class(_, found) if ptr::eq(found, class)));
        if !is_module_level {
            return Type::Unknown;
        }
        let args = class
            .type_params
            .iter()
            .flat_map(|p| p.params.iter())
            .map(|p| Type::TypeParam(p.name.sym.to_string()))
            .collect();
        Type::Named(NamedType::new(
            name,
            Origin::Declared(self.env.unit.path.clone()),
            args,
        ))
    }

    fn visit_named_class(&mut self, name: &str, class: &Class) {
        self.hooks.class(self.checker, &self.env, name, class);
        let this = self.class_instance_type(name, class);
        let type_params = class
            .type_params
            .iter()
            .flat_map(|p| p.params.iter())
            .map(|p| p.name.sym.to_string())
            .collect();
        self.class_this.push(this);
        self.with_type_params(type_params, |walker| class.visit_with(walker));
        self.class_this.pop();
    }

    fn visit_function_like(&mut self, function: &Function, method_this: Option<Type>) {
        let explicit_this = function.params.first().and_then(|p| match &p.pat {
            Pat::Ident(ident) if &*ident.id.sym == "this" => {
                self.annotation(ident.type_ann.as_ref().map(|a| &*a.type_ann))
            }
            _ => None,
        });
        let this = explicit_this.or(method_this).unwrap_or(Type::Unknown);
        let type_params = function
            .type_params
            .iter()
            .flat_map(|p| p.params.iter())
            .map(|p| p.name.sym.to_string())
            .collect();

        self.with_type_params(type_params, |walker| {
            walker.scoped(Some(this), |walker| {
                for param in &function.params {
                    if let Pat::Ident(ident) = &param.pat
                        && &*ident.id.sym == "this"
                    {
                        continue;
                    }
                    param.pat.visit_with(walker);
                    walker.declare_pat(&param.pat, None);
                }
                if let Some(body) = &function.body {
                    walker.hoist(&body.stmts);
                    for stmt in &body.stmts {
                        stmt.visit_with(walker);
                    }
                }
            });
        });
    }
}

impl<H: ScopeHooks> Visit for ScopedWalker<'_, H> {
    fn visit_expr(&mut self, node: &Expr) {
        self.hooks.expr(self.checker, &self.env, node);
        node.visit_children_with(self);
    }

    fn visit_class_decl(&mut self, node: &ClassDecl) {
        self.visit_named_class(&node.ident.sym, &node.class);
    }

    fn visit_export_default_decl(&mut self, node: &ExportDefaultDecl) {
        match &node.decl {
            DefaultDecl::Class(class) => {
                let name = class.ident.as_ref().map_or(DEFAULT_EXPORT, |ident| &*ident.sym);
                self.visit_named_class(name, &class.class);
            }
            _ => node.visit_children_with(self),
        }
    }

    fn visit_class_expr(&mut self, node: &ClassExpr) {
        self.class_this.push(Type::Unknown);
        node.class.visit_with(self);
        self.class_this.pop();
    }

    fn visit_class_method(&mut self, node: &ClassMethod) {
        node.key.visit_with(self);
        self.entering_method = true;
        node.function.visit_with(self);
    }

    fn visit_private_method(&mut self, node: &PrivateMethod) {
        self.entering_method = true;
        node.function.visit_with(self);
    }

    fn visit_function(&mut self, node: &Function) {
        for decorator in &node.decorators {
            decorator.visit_with(self);
        }
        let method_this = if std::mem::take(&mut self.entering_method) {
            self.class_this.last().cloned()
        } else {
            None
        };
        self.visit_function_like(node, method_this);
    }

    fn visit_constructor(&mut self, node: &Constructor) {
        let this = self.class_this.last().cloned();
        self.scoped(this, |walker| {
            for param in &node.params {
                match param {
                    ParamOrTsParamProp::Param(param) => {
                        param.pat.visit_with(walker);
                        walker.declare_pat(&param.pat, None);
                    }
                    ParamOrTsParamProp::TsParamProp(prop) => {
                        for decorator in &prop.decorators {
                            decorator.visit_with(walker);
                        }
                        match &prop.param {
                            TsParamPropParam::Ident(ident) => {
                                walker.declare_pat(&Pat::Ident(ident.clone()), None)
                            }
                            TsParamPropParam::Assign(assign) => {
                                assign.right.visit_with(walker);
                                walker.declare_pat(&assign.left, None);
                            }
                        }
                    }
                }
            }
            if let Some(body) = &node.body {
                walker.hoist(&body.stmts);
                for stmt in &body.stmts {
                    stmt.visit_with(walker);
                }
            }
        });
    }

    fn visit_class_prop(&mut self, node: &ClassProp) {
        for decorator in &node.decorators {
            decorator.visit_with(self);
        }
        node.key.visit_with(self);
        if let Some(value) = &node.value {
            let this = self.class_this.last().cloned();
            self.scoped(this, |walker| value.visit_with(walker));
        }
    }

    fn visit_arrow_expr(&mut self, node: &ArrowExpr) {
        self.scoped(None, |walker| {
            for pat in &node.params {
                pat.visit_with(walker);
                walker.declare_pat(pat, None);
            }
            node.body.visit_with(walker);
        });
    }

    fn visit_block_stmt(&mut self, node: &BlockStmt) {
        self.scoped(None, |walker| {
            walker.hoist(&node.stmts);
            for stmt in &node.stmts {
                stmt.visit_with(walker);
            }
        });
    }

    fn visit_fn_decl(&mut self, node: &FnDecl) {
        node.function.visit_with(self);
    }

    fn visit_var_declarator(&mut self, node: &VarDeclarator) {
        if let Some(init) = &node.init {
            init.visit_with(self);
        }
        match &node.name {
            Pat::Ident(ident) => {
                let ty = self.annotation(ident.type_ann.as_ref().map(|a| &*a.type_ann));
                let init = node.init.as_ref().map(|init| Rc::new((**init).clone()));
                self.env
                    .scope
                    .declare(ident.id.sym.to_string(), Binding::Var { ty, init });
            }
            pat => self.declare_pat(pat, Some(Type::Unknown)),
        }
    }

    fn visit_for_of_stmt(&mut self, node: &ForOfStmt) {
        node.right.visit_with(self);
        self.scoped(None, |walker| {
            let iterable = Rc::new((*node.right).clone());
            match &node.left {
                ForHead::VarDecl(var) => {
                    for declarator in &var.decls {
                        match &declarator.name {
                            Pat::Ident(ident) => walker.env.scope.declare(
                                ident.id.sym.to_string(),
                                Binding::Iterated(iterable.clone()),
                            ),
                            pat => walker.declare_pat(pat, Some(Type::Unknown)),
                        }
                    }
                }
                ForHead::Pat(pat) => pat.visit_with(walker),
                ForHead::UsingDecl(_) => {}
            }
            node.body.visit_with(walker);
        });
    }

    fn visit_for_in_stmt(&mut self, node: &ForInStmt) {
        node.right.visit_with(self);
        self.scoped(None, |walker| {
            if let ForHead::VarDecl(var) = &node.left {
                for declarator in &var.decls {
                    walker.declare_pat(&declarator.name, Some(Type::String));
                }
            }
            node.body.visit_with(walker);
        });
    }

    fn visit_for_stmt(&mut self, node: &ForStmt) {
        self.scoped(None, |walker| {
            match &node.init {
                Some(VarDeclOrExpr::VarDecl(var)) => var.visit_with(walker),
                Some(VarDeclOrExpr::Expr(expr)) => expr.visit_with(walker),
                None => {}
            }
            node.test.visit_with(walker);
            node.update.visit_with(walker);
            node.body.visit_with(walker);
        });
    }

    fn visit_catch_clause(&mut self, node: &CatchClause) {
        self.scoped(None, |walker| {
            if let Some(param) = &node.param {
                walker.declare_pat(param, Some(Type::Any));
            }
            for stmt in &node.body.stmts {
                stmt.visit_with(walker);
            }
        });
    }

    fn visit_ts_type(&mut self, _node: &TsType) {}
}
