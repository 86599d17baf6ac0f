//! Types of declarations: annotations, signatures, and members of named types.

use std::{collections::HashMap, rc::Rc};

use swc_ecma_ast::{
    ArrowExpr, BlockStmtOrExpr, Class, ClassMember, Expr, Function, Lit, MethodKind, Param as
    AstParam, ParamOrTsParamProp, Pat, PropName, Stmt, TsEntityName, TsFnOrConstructorType,
    TsFnParam, TsInterfaceDecl, TsKeywordTypeKind, TsLit, TsParamPropParam, TsType,
    TsTypeAliasDecl, TsTypeElement, TsTypeOperatorOp, TsTypeParamDecl, TsTypeParamInstantiation, TsTypeQueryExpr,
    TsUnionOrIntersectionType,
};

use super::program::{Decl, ModuleTarget, SourceUnit};
use super::scope::{Binding, TypeEnv};
use super::types::{NamedType, ObjectType, Origin, Param, Signature, Type};
use super::Checker;

/// Names declared by a type parameter list.
pub(super) fn type_param_names(decl: Option<&TsTypeParamDecl>) -> Vec<String> {
    decl.map(|d| d.params.iter().map(|p| p.name.sym.to_string()).collect())
        .unwrap_or_default()
}

/// Text of a property key that is an identifier or a string literal.
pub(super) fn prop_name_text(key: &PropName) -> Option<String> {
    match key {
        PropName::Ident(ident) => Some(ident.sym.to_string()),
        PropName::Str(s) => s.value.as_str().map(str::to_string),
        PropName::Num(n) => Some(n.value.to_string()),
        _ => None,
    }
}

/// Key text of a type member (`foo: T`, `'foo': T`).
fn member_key_text(key: &Expr) -> Option<String> {
    match key {
        Expr::Ident(ident) => Some(ident.sym.to_string()),
        Expr::Lit(Lit::Str(s)) => s.value.as_str().map(str::to_string),
        _ => None,
    }
}

/// Bind type parameters to arguments; missing arguments become `unknown`.
fn bind_args(params: &[String], args: &[Type]) -> HashMap<String, Type> {
    params
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), args.get(i).cloned().unwrap_or(Type::Unknown)))
        .collect()
}

impl Checker {
    // ============================================================
    // Annotations
    // ============================================================

    /// Convert a type annotation written in `unit`.
    ///
    /// `type_params` lists the type parameters in scope at the annotation.
    pub fn type_from_ts(&self, unit: &Rc<SourceUnit>, ty: &TsType, type_params: &[String]) -> Type {
        let Some(_guard) = self.enter() else {
            return Type::Unknown;
        };
        match ty {
            TsType::TsKeywordType(keyword) => match keyword.kind {
                TsKeywordTypeKind::TsAnyKeyword => Type::Any,
                TsKeywordTypeKind::TsUnknownKeyword => Type::Unknown,
                TsKeywordTypeKind::TsNumberKeyword => Type::Number,
                TsKeywordTypeKind::TsObjectKeyword => Type::NonPrimitive,
                TsKeywordTypeKind::TsBooleanKeyword => Type::Boolean,
                TsKeywordTypeKind::TsBigIntKeyword => Type::BigInt,
                TsKeywordTypeKind::TsStringKeyword => Type::String,
                TsKeywordTypeKind::TsSymbolKeyword => Type::Symbol,
                TsKeywordTypeKind::TsVoidKeyword => Type::Void,
                TsKeywordTypeKind::TsUndefinedKeyword => Type::Undefined,
                TsKeywordTypeKind::TsNullKeyword => Type::Null,
                TsKeywordTypeKind::TsNeverKeyword => Type::Never,
                TsKeywordTypeKind::TsIntrinsicKeyword => Type::Unknown,
            },
            TsType::TsFnOrConstructorType(TsFnOrConstructorType::TsFnType(func)) => {
                let own = type_param_names(func.type_params.as_deref());
                let scope = [type_params, own.as_slice()].concat();
                Type::Function(Rc::new(Signature {
                    params: self.ts_fn_params(unit, &func.params, &scope),
                    ret: self.type_from_ts(unit, &func.type_ann.type_ann, &scope),
                    type_params: own,
                }))
            }
            TsType::TsTypeRef(reference) => {
                let args: Vec<Type> = reference
                    .type_params
                    .as_ref()
                    .map(|p| {
                        p.params
                            .iter()
                            .map(|t| self.type_from_ts(unit, t, type_params))
                            .collect()
                    })
                    .unwrap_or_default();
                match &reference.type_name {
                    TsEntityName::Ident(ident) => {
                        let name = &*ident.sym;
                        if args.is_empty() && type_params.iter().any(|p| p == name) {
                            Type::TypeParam(name.to_string())
                        } else {
                            self.resolve_type_name(unit, name, args)
                        }
                    }
                    TsEntityName::TsQualifiedName(qualified) => {
                        self.resolve_qualified_type(unit, &qualified.left, &qualified.right.sym, args)
                    }
                }
            }
            TsType::TsTypeQuery(query) => match &query.expr_name {
                TsTypeQueryExpr::TsEntityName(TsEntityName::Ident(ident)) => {
                    self.module_value_type(unit, &ident.sym)
                        .unwrap_or(Type::Unknown)
                }
                _ => Type::Unknown,
            },
            TsType::TsTypeLit(lit) => Type::Object(Rc::new(self.object_from_members(
                unit,
                &lit.members,
                type_params,
            ))),
            TsType::TsArrayType(array) => Type::Array(Box::new(self.type_from_ts(
                unit,
                &array.elem_type,
                type_params,
            ))),
            TsType::TsTupleType(tuple) => Type::Array(Box::new(Type::union(
                tuple
                    .elem_types
                    .iter()
                    .map(|e| self.type_from_ts(unit, &e.ty, type_params)),
            ))),
            TsType::TsUnionOrIntersectionType(TsUnionOrIntersectionType::TsUnionType(union)) => {
                Type::union(
                    union
                        .types
                        .iter()
                        .map(|t| self.type_from_ts(unit, t, type_params)),
                )
            }
            TsType::TsUnionOrIntersectionType(TsUnionOrIntersectionType::TsIntersectionType(
                intersection,
            )) => {
                let mut members = Vec::new();
                for t in &intersection.types {
                    match self.type_from_ts(unit, t, type_params) {
                        Type::Intersection(inner) => members.extend(inner),
                        t => members.push(t),
                    }
                }
                Type::Intersection(members)
            }
            TsType::TsParenthesizedType(paren) => {
                self.type_from_ts(unit, &paren.type_ann, type_params)
            }
            TsType::TsTypeOperator(op) => match op.op {
                TsTypeOperatorOp::ReadOnly => self.type_from_ts(unit, &op.type_ann, type_params),
                TsTypeOperatorOp::KeyOf => Type::String,
                TsTypeOperatorOp::Unique => Type::Symbol,
            },
            TsType::TsLitType(lit) => match &lit.lit {
                TsLit::Str(s) => Type::StringLit(s.value.to_string_lossy().to_string()),
                TsLit::Number(n) => Type::NumberLit(n.value),
                TsLit::Bool(b) => Type::BooleanLit(b.value),
                TsLit::Tpl(_) => Type::String,
                TsLit::BigInt(_) => Type::BigInt,
            },
            TsType::TsOptionalType(optional) => {
                self.type_from_ts(unit, &optional.type_ann, type_params)
            }
            TsType::TsRestType(rest) => self.type_from_ts(unit, &rest.type_ann, type_params),
            _ => Type::Unknown,
        }
    }

    /// Resolve a type name used in `unit`.
    pub(super) fn resolve_type_name(&self, unit: &Rc<SourceUnit>, name: &str, args: Vec<Type>) -> Type {
        match (name, args.len()) {
            ("Array" | "ReadonlyArray", 1) => return Type::Array(Box::new(args[0].clone())),
            ("Record", 2) => {
                return Type::Object(Rc::new(ObjectType {
                    index: Some(args[1].clone()),
                    ..Default::default()
                }));
            }
            ("NonNullable", 1) => return args[0].non_nullable(),
            ("Partial" | "Required" | "Readonly", 1) => {
                return match &args[0] {
                    Type::Array(elem) => Type::Array(elem.clone()),
                    _ => Type::Object(Rc::new(ObjectType {
                        index: Some(Type::Unknown),
                        ..Default::default()
                    })),
                };
            }
            _ => {}
        }

        for decl in unit.find_decls(name) {
            if let Some(ty) = self.type_of_type_decl(unit, decl, name, &args) {
                return ty;
            }
        }
        if let Some(globals) = self.program.globals()
            && globals.path != unit.path
        {
            for decl in globals.find_decls(name) {
                if let Some(ty) = self.type_of_type_decl(&globals, decl, name, &args) {
                    return ty;
                }
            }
        }
        Type::Named(NamedType::new(name, Origin::External(String::new()), args))
    }

    /// `ns.Name` where `ns` is a namespace import.
    fn resolve_qualified_type(
        &self,
        unit: &Rc<SourceUnit>,
        left: &TsEntityName,
        right: &str,
        args: Vec<Type>,
    ) -> Type {
        let TsEntityName::Ident(ns) = left else {
            return Type::Unknown;
        };
        match unit.find_decl(&ns.sym) {
            Some(Decl::NamespaceImport { module }) => match self.program.resolve_module(unit, module) {
                ModuleTarget::Unit(target) => self.resolve_exported_type(&target, right, args),
                ModuleTarget::External(module) => {
                    Type::Named(NamedType::new(right, Origin::External(module), args))
                }
            },
            _ => Type::Unknown,
        }
    }

    /// Type exported from `unit` under `name`.
    fn resolve_exported_type(&self, unit: &Rc<SourceUnit>, name: &str, args: Vec<Type>) -> Type {
        let Some(_guard) = self.enter() else {
            return Type::Unknown;
        };
        let decls = match unit.find_export(name) {
            Some(Decl::ReExport { module, imported }) => {
                return match self.program.resolve_module(unit, module) {
                    ModuleTarget::Unit(target) => self.resolve_exported_type(&target, imported, args),
                    ModuleTarget::External(module) => {
                        Type::Named(NamedType::new(imported, Origin::External(module), args))
                    }
                };
            }
            Some(decl @ Decl::Class(..)) => vec![decl],
            Some(_) => unit.find_decls(name),
            None => Vec::new(),
        };
        for decl in decls {
            if let Some(ty) = self.type_of_type_decl(unit, decl, name, &args) {
                return ty;
            }
        }
        Type::Unknown
    }

    fn type_of_type_decl(
        &self,
        unit: &Rc<SourceUnit>,
        decl: Decl<'_>,
        name: &str,
        args: &[Type],
    ) -> Option<Type> {
        match decl {
            Decl::Class(class_name, _) => Some(Type::Named(NamedType::new(
                class_name,
                Origin::Declared(unit.path.clone()),
                args.to_vec(),
            ))),
            Decl::Interface(_) | Decl::Enum(_) => Some(Type::Named(NamedType::new(
                name,
                Origin::Declared(unit.path.clone()),
                args.to_vec(),
            ))),
            // Aliases of object literal types stay nominal so the alias name
            // can be matched; everything else is expanded.
            Decl::Alias(alias) => Some(match self.alias_target(unit, alias, args) {
                Type::Object(_) => Type::Named(NamedType::new(
                    name,
                    Origin::Declared(unit.path.clone()),
                    args.to_vec(),
                )),
                expanded => expanded,
            }),
            Decl::Import { module, imported } => Some(match self.program.resolve_module(unit, module) {
                ModuleTarget::Unit(target) => self.resolve_exported_type(&target, imported, args.to_vec()),
                ModuleTarget::External(module) => Type::Named(NamedType::new(
                    imported,
                    Origin::External(module),
                    args.to_vec(),
                )),
            }),
            Decl::Function(_) | Decl::Var(..) | Decl::NamespaceImport { .. } | Decl::ReExport { .. } => {
                None
            }
        }
    }

    /// Right-hand side of a type alias with `args` applied.
    fn alias_target(&self, unit: &Rc<SourceUnit>, alias: &TsTypeAliasDecl, args: &[Type]) -> Type {
        let params = type_param_names(alias.type_params.as_deref());
        self.type_from_ts(unit, &alias.type_ann, &params)
            .substitute(&bind_args(&params, args))
    }

    /// Anonymous object type from type literal members.
    fn object_from_members(
        &self,
        unit: &Rc<SourceUnit>,
        members: &[TsTypeElement],
        type_params: &[String],
    ) -> ObjectType {
        let mut object = ObjectType::default();
        for member in members {
            match member {
                TsTypeElement::TsCallSignatureDecl(call) => {
                    let own = type_param_names(call.type_params.as_deref());
                    let scope = [type_params, own.as_slice()].concat();
                    object.calls.push(Rc::new(Signature {
                        params: self.ts_fn_params(unit, &call.params, &scope),
                        ret: self.annotation_or_any(unit, call.type_ann.as_deref().map(|a| &*a.type_ann), &scope),
                        type_params: own,
                    }));
                }
                TsTypeElement::TsIndexSignature(index) => {
                    object.index = Some(self.annotation_or_any(
                        unit,
                        index.type_ann.as_deref().map(|a| &*a.type_ann),
                        type_params,
                    ));
                }
                _ => {
                    if let Some((name, ty)) = self.type_element(unit, member, type_params) {
                        object.props.push((name, ty));
                    }
                }
            }
        }
        object
    }

    /// Name and type of a property, method or getter member.
    fn type_element(
        &self,
        unit: &Rc<SourceUnit>,
        member: &TsTypeElement,
        type_params: &[String],
    ) -> Option<(String, Type)> {
        match member {
            TsTypeElement::TsPropertySignature(prop) => {
                let name = member_key_text(&prop.key)?;
                let ty = self.annotation_or_any(unit, prop.type_ann.as_deref().map(|a| &*a.type_ann), type_params);
                let ty = if prop.optional {
                    Type::union([ty, Type::Undefined])
                } else {
                    ty
                };
                Some((name, ty))
            }
            TsTypeElement::TsGetterSignature(getter) => {
                let name = member_key_text(&getter.key)?;
                Some((
                    name,
                    self.annotation_or_any(unit, getter.type_ann.as_deref().map(|a| &*a.type_ann), type_params),
                ))
            }
            TsTypeElement::TsMethodSignature(method) => {
                let name = member_key_text(&method.key)?;
                let own = type_param_names(method.type_params.as_deref());
                let scope = [type_params, own.as_slice()].concat();
                Some((
                    name,
                    Type::Function(Rc::new(Signature {
                        params: self.ts_fn_params(unit, &method.params, &scope),
                        ret: self.annotation_or_any(unit, method.type_ann.as_deref().map(|a| &*a.type_ann), &scope),
                        type_params: own,
                    })),
                ))
            }
            _ => None,
        }
    }

    fn annotation_or_any(&self, unit: &Rc<SourceUnit>, ty: Option<&TsType>, type_params: &[String]) -> Type {
        ty.map(|ty| self.type_from_ts(unit, ty, type_params))
            .unwrap_or(Type::Any)
    }

    fn ts_fn_params(&self, unit: &Rc<SourceUnit>, params: &[TsFnParam], type_params: &[String]) -> Vec<Param> {
        params
            .iter()
            .filter_map(|param| match param {
                TsFnParam::Ident(ident) => {
                    if &*ident.id.sym == "this" {
                        return None;
                    }
                    Some(Param {
                        ty: self.annotation_or_any(unit, ident.type_ann.as_deref().map(|a| &*a.type_ann), type_params),
                        optional: ident.id.optional,
                        rest: false,
                    })
                }
                TsFnParam::Rest(rest) => Some(Param {
                    ty: rest
                        .type_ann
                        .as_deref()
                        .map(|a| self.type_from_ts(unit, &a.type_ann, type_params))
                        .unwrap_or_else(|| Type::Array(Box::new(Type::Any))),
                    optional: false,
                    rest: true,
                }),
                TsFnParam::Array(array) => Some(Param {
                    ty: self.annotation_or_any(unit, array.type_ann.as_deref().map(|a| &*a.type_ann), type_params),
                    optional: array.optional,
                    rest: false,
                }),
                TsFnParam::Object(object) => Some(Param {
                    ty: self.annotation_or_any(unit, object.type_ann.as_deref().map(|a| &*a.type_ann), type_params),
                    optional: object.optional,
                    rest: false,
                }),
            })
            .collect()
    }

    // ============================================================
    // Functions
    // ============================================================

    /// Declare the names bound by `pat` in the innermost frame of `env`.
    pub(super) fn bind_pat(&self, env: &TypeEnv, pat: &Pat, ty: Option<Type>, type_params: &[String]) {
        match pat {
            Pat::Ident(ident) => {
                let ty = ty
                    .or_else(|| {
                        ident
                            .type_ann
                            .as_deref()
                            .map(|a| self.type_from_ts(&env.unit, &a.type_ann, type_params))
                    })
                    .unwrap_or(Type::Any);
                env.scope.declare(ident.id.sym.to_string(), Binding::Typed(ty));
            }
            Pat::Assign(assign) => {
                let ty = ty.or_else(|| Some(self.type_of_expr(env, &assign.right).widened()));
                self.bind_pat(env, &assign.left, ty, type_params);
            }
            Pat::Rest(rest) => {
                let ty = rest
                    .type_ann
                    .as_deref()
                    .map(|a| self.type_from_ts(&env.unit, &a.type_ann, type_params));
                self.bind_pat(
                    env,
                    &rest.arg,
                    ty.or(Some(Type::Array(Box::new(Type::Any)))),
                    type_params,
                );
            }
            Pat::Array(array) => {
                for elem in array.elems.iter().flatten() {
                    self.bind_pat(env, elem, Some(Type::Unknown), type_params);
                }
            }
            Pat::Object(object) => {
                for prop in &object.props {
                    match prop {
                        swc_ecma_ast::ObjectPatProp::KeyValue(kv) => {
                            self.bind_pat(env, &kv.value, Some(Type::Unknown), type_params)
                        }
                        swc_ecma_ast::ObjectPatProp::Assign(assign) => env.scope.declare(
                            assign.key.sym.to_string(),
                            Binding::Typed(Type::Unknown),
                        ),
                        swc_ecma_ast::ObjectPatProp::Rest(rest) => {
                            self.bind_pat(env, &rest.arg, Some(Type::Unknown), type_params)
                        }
                    }
                }
            }
            Pat::Expr(_) | Pat::Invalid(_) => {}
        }
    }

    fn param_info(&self, env: &TypeEnv, pat: &Pat, type_params: &[String]) -> Param {
        match pat {
            Pat::Ident(ident) => Param {
                ty: ident
                    .type_ann
                    .as_deref()
                    .map(|a| self.type_from_ts(&env.unit, &a.type_ann, type_params))
                    .unwrap_or(Type::Any),
                optional: ident.id.optional,
                rest: false,
            },
            Pat::Assign(assign) => Param {
                optional: true,
                ..self.param_info(env, &assign.left, type_params)
            },
            Pat::Rest(rest) => Param {
                ty: rest
                    .type_ann
                    .as_deref()
                    .map(|a| self.type_from_ts(&env.unit, &a.type_ann, type_params))
                    .unwrap_or_else(|| Type::Array(Box::new(Type::Any))),
                optional: false,
                rest: true,
            },
            _ => Param {
                ty: Type::Any,
                optional: false,
                rest: false,
            },
        }
    }

    /// Signature of a function declaration, expression or method.
    ///
    /// Missing return annotations are inferred from the first `return`.
    pub fn signature_of_function(&self, env: &TypeEnv, function: &Function, type_params: &[String]) -> Signature {
        let own = type_param_names(function.type_params.as_deref());
        let scope = [type_params, own.as_slice()].concat();
        let pats: Vec<&Pat> = function
            .params
            .iter()
            .map(|p: &AstParam| &p.pat)
            .filter(|pat| !matches!(pat, Pat::Ident(ident) if &*ident.id.sym == "this"))
            .collect();
        let params = pats
            .iter()
            .map(|pat| self.param_info(env, pat, &scope))
            .collect();

        let ret = match &function.return_type {
            Some(ann) => self.type_from_ts(&env.unit, &ann.type_ann, &scope),
            None => {
                let body_env = env.with_scope(env.scope.child());
                for pat in &pats {
                    self.bind_pat(&body_env, pat, None, &scope);
                }
                let inferred = function
                    .body
                    .as_ref()
                    .and_then(|body| self.infer_return(&body_env, &body.stmts))
                    .unwrap_or(Type::Void);
                if function.is_async {
                    self.promise_of(inferred)
                } else {
                    inferred
                }
            }
        };
        Signature {
            type_params: own,
            params,
            ret,
        }
    }

    /// Signature of an arrow function, taking unannotated parameter types
    /// from `expected` when the arrow is passed where a function is expected.
    pub(super) fn signature_of_arrow(
        &self,
        env: &TypeEnv,
        arrow: &ArrowExpr,
        expected: Option<&Signature>,
    ) -> Signature {
        let own = type_param_names(arrow.type_params.as_deref());
        let body_env = env.with_scope(env.scope.child());
        let mut params = Vec::new();
        for (i, pat) in arrow.params.iter().enumerate() {
            let mut info = self.param_info(env, pat, &own);
            let annotated = matches!(pat, Pat::Ident(ident) if ident.type_ann.is_some());
            if !annotated
                && let Some(contextual) = expected.and_then(|sig| sig.param_type(i))
            {
                info.ty = contextual;
            }
            self.bind_pat(&body_env, pat, Some(info.ty.clone()), &own);
            params.push(info);
        }
        let ret = match &arrow.return_type {
            Some(ann) => self.type_from_ts(&env.unit, &ann.type_ann, &own),
            None => {
                let inferred = match &*arrow.body {
                    BlockStmtOrExpr::Expr(expr) => self.type_of_expr(&body_env, expr),
                    BlockStmtOrExpr::BlockStmt(block) => self
                        .infer_return(&body_env, &block.stmts)
                        .unwrap_or(Type::Void),
                };
                if arrow.is_async {
                    self.promise_of(inferred)
                } else {
                    inferred
                }
            }
        };
        Signature {
            type_params: own,
            params,
            ret,
        }
    }

    /// Type of the first `return` reachable in `stmts`, declaring the
    /// variables of each enclosing block on the way.
    pub(super) fn infer_return(&self, env: &TypeEnv, stmts: &[Stmt]) -> Option<Type> {
        let _guard = self.enter()?;
        let env = env.with_scope(env.scope.child());
        for stmt in stmts {
            match stmt {
                Stmt::Decl(swc_ecma_ast::Decl::Var(var)) => {
                    for declarator in &var.decls {
                        if let Pat::Ident(ident) = &declarator.name {
                            let ty = ident
                                .type_ann
                                .as_deref()
                                .map(|a| self.type_from_ts(&env.unit, &a.type_ann, &[]));
                            let init = declarator.init.as_ref().map(|e| Rc::new((**e).clone()));
                            env.scope
                                .declare(ident.id.sym.to_string(), Binding::Var { ty, init });
                        }
                    }
                }
                Stmt::Return(ret) => {
                    return Some(
                        ret.arg
                            .as_ref()
                            .map(|arg| self.type_of_expr(&env, arg))
                            .unwrap_or(Type::Void),
                    );
                }
                Stmt::Block(block) => {
                    if let Some(ty) = self.infer_return(&env, &block.stmts) {
                        return Some(ty);
                    }
                }
                Stmt::If(if_stmt) => {
                    if let Some(ty) = self.infer_return(&env, std::slice::from_ref(&*if_stmt.cons)) {
                        return Some(ty);
                    }
                    if let Some(alt) = &if_stmt.alt
                        && let Some(ty) = self.infer_return(&env, std::slice::from_ref(&**alt))
                    {
                        return Some(ty);
                    }
                }
                Stmt::Try(try_stmt) => {
                    if let Some(ty) = self.infer_return(&env, &try_stmt.block.stmts) {
                        return Some(ty);
                    }
                }
                _ => {}
            }
        }
        None
    }

    pub(super) fn promise_of(&self, ty: Type) -> Type {
        match self.program.globals() {
            Some(globals) => Type::Named(NamedType::new(
                "Promise",
                Origin::Declared(globals.path.clone()),
                vec![ty],
            )),
            None => Type::Unknown,
        }
    }

    // ============================================================
    // Members of named types
    // ============================================================

    /// Instance type of the class or interface itself, with its own type
    /// parameters as arguments.
    fn self_type(unit: &Rc<SourceUnit>, name: &str, params: &[String]) -> Type {
        Type::Named(NamedType::new(
            name,
            Origin::Declared(unit.path.clone()),
            params.iter().map(|p| Type::TypeParam(p.clone())).collect(),
        ))
    }

    /// Direct base types of `named` (`extends` and `implements`), with the
    /// type arguments of `named` applied.
    pub(super) fn heritage(&self, named: &NamedType) -> Vec<NamedType> {
        let Some(unit) = named.declared_in().and_then(|p| self.program.unit(p)) else {
            return Vec::new();
        };
        let mut bases = Vec::new();
        for decl in unit.find_decls(&named.name) {
            let (params, clauses): (Vec<String>, Vec<(&Expr, Option<&TsTypeParamInstantiation>)>) =
                match decl {
                    Decl::Interface(iface) => (
                        type_param_names(iface.type_params.as_deref()),
                        iface
                            .extends
                            .iter()
                            .map(|e| (&*e.expr, e.type_args.as_deref()))
                            .collect(),
                    ),
                    Decl::Class(_, class) => {
                        let mut clauses: Vec<(&Expr, Option<&TsTypeParamInstantiation>)> = class
                            .super_class
                            .iter()
                            .map(|s| (&**s, class.super_type_params.as_deref()))
                            .collect();
                        clauses.extend(
                            class
                                .implements
                                .iter()
                                .map(|e| (&*e.expr, e.type_args.as_deref())),
                        );
                        (type_param_names(class.type_params.as_deref()), clauses)
                    }
                    _ => continue,
                };
            let map = bind_args(&params, &named.args);
            for (expr, type_args) in clauses {
                let Expr::Ident(ident) = expr else {
                    continue;
                };
                let args = type_args
                    .map(|a| {
                        a.params
                            .iter()
                            .map(|t| self.type_from_ts(&unit, t, &params))
                            .collect()
                    })
                    .unwrap_or_default();
                if let Type::Named(base) = self.resolve_type_name(&unit, &ident.sym, args).substitute(&map) {
                    bases.push(base);
                }
            }
        }
        bases
    }

    /// Find `base_name` among the (transitive) bases of `named`.
    pub(super) fn find_base(&self, named: &NamedType, base_name: &str) -> Option<NamedType> {
        let _guard = self.enter()?;
        for base in self.heritage(named) {
            if base.name == base_name {
                return Some(base);
            }
            if let Some(found) = self.find_base(&base, base_name) {
                return Some(found);
            }
        }
        None
    }

    /// Type of instance member `name` of a class or interface.
    pub(super) fn named_member(&self, named: &NamedType, name: &str) -> Option<Type> {
        let _guard = self.enter()?;
        let unit = named.declared_in().and_then(|p| self.program.unit(p))?;
        for decl in unit.find_decls(&named.name) {
            let found = match decl {
                Decl::Interface(iface) => self.interface_member(&unit, iface, named, name),
                Decl::Class(_, class) => self.class_member(&unit, class, named, name, false),
                Decl::Alias(alias) => match self.alias_target(&unit, alias, &named.args) {
                    Type::Object(object) => object.prop(name).cloned(),
                    _ => None,
                },
                _ => None,
            };
            if found.is_some() {
                return found;
            }
        }
        self.heritage(named)
            .iter()
            .find_map(|base| self.named_member(base, name))
    }

    fn interface_member(
        &self,
        unit: &Rc<SourceUnit>,
        iface: &TsInterfaceDecl,
        named: &NamedType,
        name: &str,
    ) -> Option<Type> {
        let params = type_param_names(iface.type_params.as_deref());
        let map = bind_args(&params, &named.args);
        iface.body.body.iter().find_map(|member| {
            let (member_name, ty) = self.type_element(unit, member, &params)?;
            (member_name == name).then(|| ty.substitute(&map))
        })
    }

    /// Member `name` declared directly in `class`.
    pub(super) fn class_member(
        &self,
        unit: &Rc<SourceUnit>,
        class: &Class,
        named: &NamedType,
        name: &str,
        is_static: bool,
    ) -> Option<Type> {
        let params = type_param_names(class.type_params.as_deref());
        let map = bind_args(&params, &named.args);
        let this = if is_static {
            Type::ClassObject(named.clone())
        } else {
            Self::self_type(unit, &named.name, &params)
        };
        let env = TypeEnv::module(unit.clone()).with_this(this);

        for member in &class.body {
            let ty = match member {
                ClassMember::ClassProp(prop)
                    if prop.is_static == is_static
                        && prop_name_text(&prop.key).as_deref() == Some(name) =>
                {
                    match (&prop.type_ann, &prop.value) {
                        (Some(ann), _) => self.type_from_ts(unit, &ann.type_ann, &params),
                        (None, Some(value)) => {
                            let ty = self.type_of_expr(&env, value);
                            if prop.readonly { ty } else { ty.widened() }
                        }
                        (None, None) => Type::Any,
                    }
                }
                ClassMember::Method(method)
                    if method.is_static == is_static
                        && prop_name_text(&method.key).as_deref() == Some(name) =>
                {
                    let sig = self.signature_of_function(&env, &method.function, &params);
                    match method.kind {
                        MethodKind::Getter => sig.ret,
                        MethodKind::Method => Type::Function(Rc::new(sig)),
                        MethodKind::Setter => continue,
                    }
                }
                ClassMember::Constructor(ctor) if !is_static => {
                    let found = ctor.params.iter().find_map(|param| {
                        let ParamOrTsParamProp::TsParamProp(prop) = param else {
                            return None;
                        };
                        let TsParamPropParam::Ident(ident) = &prop.param else {
                            return None;
                        };
                        (&*ident.id.sym == name).then(|| {
                            ident
                                .type_ann
                                .as_deref()
                                .map(|a| self.type_from_ts(unit, &a.type_ann, &params))
                                .unwrap_or(Type::Any)
                        })
                    });
                    match found {
                        Some(ty) => ty,
                        None => continue,
                    }
                }
                _ => continue,
            };
            return Some(ty.substitute(&map));
        }
        None
    }

    /// Static member of a class, including inherited statics.
    pub(super) fn static_member(&self, named: &NamedType, name: &str) -> Option<Type> {
        let _guard = self.enter()?;
        let unit = named.declared_in().and_then(|p| self.program.unit(p))?;
        for decl in unit.find_decls(&named.name) {
            if let Decl::Class(_, class) = decl
                && let Some(ty) = self.class_member(&unit, class, named, name, true)
            {
                return Some(ty);
            }
        }
        self.heritage(named)
            .iter()
            .find_map(|base| self.static_member(base, name))
    }

    /// Index signature of a class or interface, inherited ones included.
    pub(super) fn named_index(&self, named: &NamedType) -> Option<Type> {
        let _guard = self.enter()?;
        let unit = named.declared_in().and_then(|p| self.program.unit(p))?;
        for decl in unit.find_decls(&named.name) {
            let (params, ann) = match decl {
                Decl::Interface(iface) => {
                    let params = type_param_names(iface.type_params.as_deref());
                    let ann = iface.body.body.iter().find_map(|m| match m {
                        TsTypeElement::TsIndexSignature(index) => Some(index.type_ann.as_deref()),
                        _ => None,
                    });
                    (params, ann)
                }
                Decl::Class(_, class) => {
                    let params = type_param_names(class.type_params.as_deref());
                    let ann = class.body.iter().find_map(|m| match m {
                        ClassMember::TsIndexSignature(index) if !index.is_static => {
                            Some(index.type_ann.as_deref())
                        }
                        _ => None,
                    });
                    (params, ann)
                }
                Decl::Alias(alias) => match self.alias_target(&unit, alias, &named.args) {
                    Type::Object(object) if object.index.is_some() => return object.index.clone(),
                    _ => continue,
                },
                _ => continue,
            };
            if let Some(ann) = ann {
                let ty = self.annotation_or_any(&unit, ann.map(|a| &*a.type_ann), &params);
                return Some(ty.substitute(&bind_args(&params, &named.args)));
            }
        }
        self.heritage(named)
            .iter()
            .find_map(|base| self.named_index(base))
    }

    /// Call signatures declared by an interface (`(): T`), inherited ones included.
    pub(super) fn named_call_signatures(&self, named: &NamedType) -> Vec<Rc<Signature>> {
        let Some(_guard) = self.enter() else {
            return Vec::new();
        };
        let Some(unit) = named.declared_in().and_then(|p| self.program.unit(p)) else {
            return Vec::new();
        };
        let mut sigs = Vec::new();
        for decl in unit.find_decls(&named.name) {
            let iface = match decl {
                Decl::Interface(iface) => iface,
                Decl::Alias(alias) => {
                    if let Type::Object(object) = self.alias_target(&unit, alias, &named.args) {
                        sigs.extend(object.calls.iter().cloned());
                    }
                    continue;
                }
                _ => continue,
            };
            let params = type_param_names(iface.type_params.as_deref());
            let map = bind_args(&params, &named.args);
            let object = self.object_from_members(&unit, &iface.body.body, &params);
            sigs.extend(object.calls.iter().map(|s| Rc::new(s.substitute(&map))));
        }
        if sigs.is_empty() {
            for base in self.heritage(named) {
                sigs.extend(self.named_call_signatures(&base));
            }
        }
        sigs
    }

    /// Type parameters and constructor parameters of a class. A class without
    /// its own constructor inherits the parameters of its base class.
    pub(super) fn constructor_signature(&self, named: &NamedType) -> Option<(Vec<String>, Signature)> {
        let _guard = self.enter()?;
        let unit = named.declared_in().and_then(|p| self.program.unit(p))?;
        for decl in unit.find_decls(&named.name) {
            let Decl::Class(_, class) = decl else {
                continue;
            };
            let class_params = type_param_names(class.type_params.as_deref());
            let env = TypeEnv::module(unit.clone());
            for member in &class.body {
                let ClassMember::Constructor(ctor) = member else {
                    continue;
                };
                let params = ctor
                    .params
                    .iter()
                    .map(|param| match param {
                        ParamOrTsParamProp::Param(param) => {
                            self.param_info(&env, &param.pat, &class_params)
                        }
                        ParamOrTsParamProp::TsParamProp(prop) => match &prop.param {
                            TsParamPropParam::Ident(ident) => {
                                self.param_info(&env, &Pat::Ident(ident.clone()), &class_params)
                            }
                            TsParamPropParam::Assign(assign) => Param {
                                optional: true,
                                ..self.param_info(&env, &assign.left, &class_params)
                            },
                        },
                    })
                    .collect();
                return Some((
                    class_params,
                    Signature {
                        type_params: Vec::new(),
                        params,
                        ret: Type::Void,
                    },
                ));
            }
            let inherited = self
                .heritage(named)
                .into_iter()
                .find_map(|base| {
                    self.constructor_signature(&base)
                        .map(|(params, sig)| sig.substitute(&bind_args(&params, &base.args)))
                });
            return Some((
                class_params,
                inherited.unwrap_or(Signature {
                    type_params: Vec::new(),
                    params: Vec::new(),
                    ret: Type::Void,
                }),
            ));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;

    use super::super::UnitKind;
    use super::super::testing::{type_of, type_of_in};
    use super::*;

    #[test]
    fn alias_expands_to_target() {
        let ty = type_of(
            r#"
            interface LDFlagSet { [key: string]: any }
            type Flags = LDFlagSet | null;
            declare const flags: Flags;
            flags;
            "#,
            "flags",
        );
        assert_eq!(ty.to_string(), "LDFlagSet | null");
    }

    #[test]
    fn generic_alias_substitutes_arguments() {
        let ty = type_of(
            r#"
            interface LDFlagSet { [key: string]: any }
            type Box<T> = { value: T };
            declare const b: Box<LDFlagSet>;
            b.value;
            "#,
            "b.value",
        );
        assert_eq!(ty.to_string(), "LDFlagSet");
    }

    #[test]
    fn object_alias_keeps_its_name() {
        let ty = type_of(
            r#"
            type LDFlagSet = { [key: string]: any };
            declare const flags: LDFlagSet;
            flags;
            "#,
            "flags",
        );
        assert_eq!(ty.to_string(), "LDFlagSet");
    }

    #[test]
    fn interface_members_follow_extends() {
        let ty = type_of(
            r#"
            interface LDFlagSet { [key: string]: any }
            interface Base<T> { flags: T }
            interface State extends Base<LDFlagSet> { name: string }
            declare const s: State;
            s.flags;
            "#,
            "s.flags",
        );
        assert_eq!(ty.to_string(), "LDFlagSet");
    }

    #[test]
    fn record_has_index_signature() {
        let ty = type_of(
            r#"
            declare const r: Record<string, unknown>;
            r['x'];
            "#,
            "r['x']",
        );
        assert_eq!(ty, Type::Unknown);
    }

    #[test]
    fn default_exported_class_through_default_import() {
        let checker = Checker::new();
        checker
            .program()
            .add_virtual(
                PathBuf::from("/virtual/panel.ts"),
                "interface LDFlagSet { [key: string]: any }\nexport default class PanelComponent { flags!: LDFlagSet; }\n".to_string(),
                UnitKind::Source,
            )
            .unwrap();
        let ty = type_of_in(
            &checker,
            PathBuf::from("/virtual/test.ts"),
            "import Panel from './panel';\ndeclare const p: Panel;\np.flags;\n",
            "p.flags",
        );
        assert_eq!(ty.to_string(), "LDFlagSet");
    }

    #[test]
    fn type_query_takes_value_type() {
        let ty = type_of(
            r#"
            interface LDFlagSet { [key: string]: any }
            declare const base: LDFlagSet;
            declare const copy: typeof base;
            copy;
            "#,
            "copy",
        );
        assert_eq!(ty.to_string(), "LDFlagSet");
    }

    #[test]
    fn type_query_of_unknown_name() {
        let ty = type_of("declare const copy: typeof missing; copy;", "copy");
        assert_eq!(ty, Type::Unknown);
    }

    #[test]
    fn tuple_becomes_array_of_union() {
        let ty = type_of("declare const t: [string, number]; t;", "t");
        assert_eq!(ty.to_string(), "(string | number)[]");
    }
}
