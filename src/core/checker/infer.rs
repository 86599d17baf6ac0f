//! Expression typing and type argument inference.

use std::{collections::HashMap, rc::Rc};

use swc_ecma_ast::{
    ArrayLit, BinaryOp, CallExpr, Callee, Expr, ExprOrSpread, Lit, MemberProp, NewExpr, ObjectLit,
    OptChainBase, OptChainExpr, Prop, PropOrSpread, TsTypeParamInstantiation, UnaryOp,
};

use super::declared::prop_name_text;
use super::program::{Decl, ModuleTarget, SourceUnit};
use super::scope::{Binding, TypeEnv};
use super::types::{NamedType, ObjectType, Origin, Signature, Type};
use super::Checker;

impl Checker {
    /// Static type of `expr` evaluated in `env`.
    pub fn type_of_expr(&self, env: &TypeEnv, expr: &Expr) -> Type {
        let Some(_guard) = self.enter() else {
            return Type::Unknown;
        };
        match expr {
            Expr::This(_) => env.this.clone(),
            Expr::Ident(ident) => self.type_of_ident(env, &ident.sym),
            Expr::Lit(lit) => match lit {
                Lit::Str(s) => Type::StringLit(s.value.to_string_lossy().to_string()),
                Lit::Num(n) => Type::NumberLit(n.value),
                Lit::Bool(b) => Type::BooleanLit(b.value),
                Lit::Null(_) => Type::Null,
                Lit::BigInt(_) => Type::BigInt,
                Lit::JSXText(_) => Type::String,
                Lit::Regex(_) => Type::Unknown,
            },
            Expr::Tpl(tpl) => match (tpl.exprs.is_empty(), tpl.quasis.first()) {
                (true, Some(quasi)) => match &quasi.cooked {
                    Some(cooked) => Type::StringLit(cooked.to_string_lossy().to_string()),
                    None => Type::String,
                },
                _ => Type::String,
            },
            Expr::Paren(paren) => self.type_of_expr(env, &paren.expr),
            Expr::TsAs(as_expr) => self.type_from_ts(&env.unit, &as_expr.type_ann, &[]),
            Expr::TsTypeAssertion(assertion) => {
                self.type_from_ts(&env.unit, &assertion.type_ann, &[])
            }
            Expr::TsConstAssertion(assertion) => self.type_of_expr(env, &assertion.expr),
            Expr::TsSatisfies(satisfies) => self.type_of_expr(env, &satisfies.expr),
            Expr::TsInstantiation(inst) => self.type_of_expr(env, &inst.expr),
            Expr::TsNonNull(non_null) => self.type_of_expr(env, &non_null.expr).non_nullable(),
            Expr::Member(member) => {
                let receiver = self.type_of_expr(env, &member.obj);
                self.member_access(env, &receiver, &member.prop)
            }
            Expr::OptChain(chain) => self.type_of_opt_chain(env, chain),
            Expr::Call(call) => self.type_of_call_expr(env, call),
            Expr::New(new) => self.type_of_new(env, new),
            Expr::Arrow(arrow) => Type::Function(Rc::new(self.signature_of_arrow(env, arrow, None))),
            Expr::Fn(func) => {
                Type::Function(Rc::new(self.signature_of_function(env, &func.function, &[])))
            }
            Expr::Object(object) => self.type_of_object_lit(env, object),
            Expr::Array(array) => self.type_of_array_lit(env, array),
            Expr::Cond(cond) => Type::union([
                self.type_of_expr(env, &cond.cons),
                self.type_of_expr(env, &cond.alt),
            ]),
            Expr::Bin(bin) => {
                let left = || self.type_of_expr(env, &bin.left);
                let right = || self.type_of_expr(env, &bin.right);
                match bin.op {
                    BinaryOp::LogicalOr | BinaryOp::NullishCoalescing => {
                        Type::union([left().non_nullable(), right()])
                    }
                    BinaryOp::LogicalAnd => {
                        let left = left();
                        let falsy = match &left {
                            Type::Union(members) => {
                                members.iter().filter(|t| t.is_nullish()).cloned().collect()
                            }
                            t if t.is_nullish() => vec![t.clone()],
                            _ => Vec::new(),
                        };
                        Type::union(falsy.into_iter().chain([right()]))
                    }
                    BinaryOp::Add => {
                        let (left, right) = (left(), right());
                        let stringy = |t: &Type| matches!(t, Type::String | Type::StringLit(_));
                        if stringy(&left) || stringy(&right) {
                            Type::String
                        } else if matches!(left, Type::Any) || matches!(right, Type::Any) {
                            Type::Any
                        } else {
                            Type::Number
                        }
                    }
                    BinaryOp::EqEq
                    | BinaryOp::NotEq
                    | BinaryOp::EqEqEq
                    | BinaryOp::NotEqEq
                    | BinaryOp::Lt
                    | BinaryOp::LtEq
                    | BinaryOp::Gt
                    | BinaryOp::GtEq
                    | BinaryOp::In
                    | BinaryOp::InstanceOf => Type::Boolean,
                    _ => Type::Number,
                }
            }
            Expr::Unary(unary) => match unary.op {
                UnaryOp::Bang | UnaryOp::Delete => Type::Boolean,
                UnaryOp::TypeOf => Type::String,
                UnaryOp::Void => Type::Undefined,
                UnaryOp::Minus | UnaryOp::Plus | UnaryOp::Tilde => Type::Number,
            },
            Expr::Update(_) => Type::Number,
            Expr::Assign(assign) => self.type_of_expr(env, &assign.right),
            Expr::Seq(seq) => seq
                .exprs
                .last()
                .map(|last| self.type_of_expr(env, last))
                .unwrap_or(Type::Unknown),
            Expr::Await(await_expr) => self.awaited(self.type_of_expr(env, &await_expr.arg)),
            _ => Type::Unknown,
        }
    }

    fn type_of_ident(&self, env: &TypeEnv, name: &str) -> Type {
        if let Some(binding) = env.scope.lookup(name) {
            return match binding {
                Binding::Typed(ty) => ty,
                Binding::Var { ty: Some(ty), .. } => ty,
                Binding::Var { ty: None, init: Some(init) } => self.type_of_expr(env, &init),
                Binding::Var { ty: None, init: None } => Type::Any,
                Binding::Iterated(iterable) => self.iterated_type(&self.type_of_expr(env, &iterable)),
            };
        }
        if name == "undefined" {
            return Type::Undefined;
        }
        if let Some(ty) = self.module_value_type(&env.unit, name) {
            return ty;
        }
        self.program
            .globals()
            .filter(|globals| globals.path != env.unit.path)
            .and_then(|globals| self.module_value_type(&globals, name))
            .unwrap_or(Type::Unknown)
    }

    fn iterated_type(&self, iterable: &Type) -> Type {
        match iterable {
            Type::Array(elem) => (**elem).clone(),
            Type::Any => Type::Any,
            Type::String | Type::StringLit(_) => Type::String,
            Type::Named(named) if matches!(named.name.as_str(), "ReadonlyArray" | "Set") => {
                named.args.first().cloned().unwrap_or(Type::Unknown)
            }
            Type::Union(members) => Type::union(
                members
                    .iter()
                    .filter(|t| !t.is_nullish())
                    .map(|t| self.iterated_type(t)),
            ),
            _ => Type::Unknown,
        }
    }

    /// Value type of a module-level name of `unit`, or `None` when the unit
    /// declares no value with that name.
    pub(super) fn module_value_type(&self, unit: &Rc<SourceUnit>, name: &str) -> Option<Type> {
        unit.find_decls(name)
            .into_iter()
            .find_map(|decl| self.value_of_decl(unit, decl))
    }

    /// Value exported from `unit` under `name`.
    pub(super) fn exported_value_type(&self, unit: &Rc<SourceUnit>, name: &str) -> Option<Type> {
        let _guard = self.enter()?;
        match unit.find_export(name)? {
            Decl::ReExport { module, imported } => match self.program.resolve_module(unit, module) {
                ModuleTarget::Unit(target) => self.exported_value_type(&target, imported),
                ModuleTarget::External(_) => Some(Type::Unknown),
            },
            decl => self.value_of_decl(unit, decl),
        }
    }

    fn value_of_decl(&self, unit: &Rc<SourceUnit>, decl: Decl<'_>) -> Option<Type> {
        let _guard = self.enter()?;
        let named = |name: &str| NamedType::new(name, Origin::Declared(unit.path.clone()), Vec::new());
        match decl {
            Decl::Class(name, _) => Some(Type::ClassObject(named(name))),
            Decl::Enum(decl) => Some(Type::EnumObject(named(&decl.id.sym))),
            Decl::Function(func) => {
                let env = TypeEnv::module(unit.clone());
                let overloads: Vec<_> = unit
                    .find_decls(&func.ident.sym)
                    .into_iter()
                    .filter_map(|d| match d {
                        Decl::Function(f) => Some(f),
                        _ => None,
                    })
                    .collect();
                // An implementation body is hidden behind its overloads.
                let declared: Vec<_> = overloads
                    .iter()
                    .filter(|f| f.function.body.is_none())
                    .collect();
                let chosen: Vec<_> = if declared.is_empty() {
                    overloads.iter().collect()
                } else {
                    declared
                };
                let mut sigs: Vec<Rc<Signature>> = chosen
                    .into_iter()
                    .map(|f| Rc::new(self.signature_of_function(&env, &f.function, &[])))
                    .collect();
                Some(if sigs.len() == 1 {
                    Type::Function(sigs.remove(0))
                } else {
                    Type::Object(Rc::new(ObjectType {
                        calls: sigs,
                        ..Default::default()
                    }))
                })
            }
            Decl::Var(_, declarator) => {
                let annotation = match &declarator.name {
                    swc_ecma_ast::Pat::Ident(ident) => ident.type_ann.as_deref(),
                    _ => None,
                };
                Some(match (annotation, &declarator.init) {
                    (Some(ann), _) => self.type_from_ts(unit, &ann.type_ann, &[]),
                    (None, Some(init)) => self.type_of_expr(&TypeEnv::module(unit.clone()), init),
                    (None, None) => Type::Any,
                })
            }
            Decl::Import { module, imported } => Some(match self.program.resolve_module(unit, module) {
                ModuleTarget::Unit(target) => self
                    .exported_value_type(&target, imported)
                    .unwrap_or(Type::Unknown),
                ModuleTarget::External(_) => Type::Unknown,
            }),
            Decl::NamespaceImport { module } => Some(match self.program.resolve_module(unit, module) {
                ModuleTarget::Unit(target) => Type::Namespace(target.path.clone()),
                ModuleTarget::External(_) => Type::Unknown,
            }),
            Decl::Interface(_) | Decl::Alias(_) | Decl::ReExport { .. } => None,
        }
    }

    // ============================================================
    // Members
    // ============================================================

    fn member_access(&self, env: &TypeEnv, receiver: &Type, prop: &MemberProp) -> Type {
        match prop {
            MemberProp::Ident(ident) => self.property_type(receiver, &ident.sym),
            MemberProp::PrivateName(_) => Type::Unknown,
            MemberProp::Computed(computed) => match self.type_of_expr(env, &computed.expr) {
                Type::StringLit(key) => self.property_type(receiver, &key),
                _ => self.element_type(receiver),
            },
        }
    }

    /// Type of property `name` of a value of type `receiver`.
    pub fn property_type(&self, receiver: &Type, name: &str) -> Type {
        let Some(_guard) = self.enter() else {
            return Type::Unknown;
        };
        match receiver {
            Type::Any => Type::Any,
            Type::Named(named) => self
                .named_member(named, name)
                .or_else(|| self.named_index(named))
                .unwrap_or(Type::Unknown),
            Type::Object(object) => object
                .prop(name)
                .cloned()
                .or_else(|| object.index.clone())
                .unwrap_or(Type::Unknown),
            Type::Array(elem) => match self.global_named("Array", vec![(**elem).clone()]) {
                Some(array) => self.property_type(&array, name),
                None => Type::Unknown,
            },
            Type::String | Type::StringLit(_) => match self.global_named("String", Vec::new()) {
                Some(string) => self.property_type(&string, name),
                None => Type::Unknown,
            },
            Type::Union(members) => Type::union(
                members
                    .iter()
                    .filter(|t| !t.is_nullish())
                    .map(|t| self.property_type(t, name)),
            ),
            Type::Intersection(members) => members
                .iter()
                .map(|t| self.property_type(t, name))
                .find(|t| *t != Type::Unknown)
                .unwrap_or(Type::Unknown),
            Type::ClassObject(named) => self.static_member(named, name).unwrap_or(Type::Unknown),
            Type::EnumObject(named) => Type::Named(named.clone()),
            Type::Namespace(path) => self
                .program
                .unit(path)
                .and_then(|unit| self.exported_value_type(&unit, name))
                .unwrap_or(Type::Unknown),
            _ => Type::Unknown,
        }
    }

    /// Type of `receiver[key]` for a key that is not a known string.
    pub fn element_type(&self, receiver: &Type) -> Type {
        let Some(_guard) = self.enter() else {
            return Type::Unknown;
        };
        match receiver {
            Type::Any => Type::Any,
            Type::Array(elem) => (**elem).clone(),
            Type::Object(object) => object.index.clone().unwrap_or(Type::Unknown),
            Type::Named(named) => self.named_index(named).unwrap_or(Type::Unknown),
            Type::Union(members) => Type::union(
                members
                    .iter()
                    .filter(|t| !t.is_nullish())
                    .map(|t| self.element_type(t)),
            ),
            Type::Intersection(members) => members
                .iter()
                .map(|t| self.element_type(t))
                .find(|t| *t != Type::Unknown)
                .unwrap_or(Type::Unknown),
            Type::EnumObject(named) => Type::Named(named.clone()),
            _ => Type::Unknown,
        }
    }

    fn global_named(&self, name: &str, args: Vec<Type>) -> Option<Type> {
        let globals = self.program.globals()?;
        Some(Type::Named(NamedType::new(
            name,
            Origin::Declared(globals.path.clone()),
            args,
        )))
    }

    fn type_of_opt_chain(&self, env: &TypeEnv, chain: &OptChainExpr) -> Type {
        let (receiver, result) = match &*chain.base {
            OptChainBase::Member(member) => {
                let receiver = self.type_of_expr(env, &member.obj);
                let result = self.member_access(env, &receiver.non_nullable(), &member.prop);
                (receiver, result)
            }
            OptChainBase::Call(call) => {
                let callee = self.type_of_expr(env, &call.callee);
                let result = self.type_of_call(
                    env,
                    &callee.non_nullable(),
                    &call.args,
                    call.type_args.as_deref(),
                );
                (callee, result)
            }
        };
        let nullable = match &receiver {
            Type::Union(members) => members.iter().any(Type::is_nullish),
            t => t.is_nullish(),
        };
        if nullable {
            Type::union([result, Type::Undefined])
        } else {
            result
        }
    }

    // ============================================================
    // Calls
    // ============================================================

    /// Call signatures of a value of type `ty`.
    pub fn call_signatures(&self, ty: &Type) -> Vec<Rc<Signature>> {
        match ty {
            Type::Function(sig) => vec![sig.clone()],
            Type::Object(object) => object.calls.clone(),
            Type::Named(named) => self.named_call_signatures(named),
            Type::Intersection(members) => members
                .iter()
                .flat_map(|t| self.call_signatures(t))
                .collect(),
            Type::Union(members) => members
                .iter()
                .filter(|t| !t.is_nullish())
                .map(|t| self.call_signatures(t))
                .find(|sigs| !sigs.is_empty())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    fn type_of_call_expr(&self, env: &TypeEnv, call: &CallExpr) -> Type {
        let Callee::Expr(callee) = &call.callee else {
            return Type::Unknown;
        };
        let callee = self.type_of_expr(env, callee);
        self.type_of_call(env, &callee, &call.args, call.type_args.as_deref())
    }

    fn type_of_call(
        &self,
        env: &TypeEnv,
        callee: &Type,
        args: &[ExprOrSpread],
        type_args: Option<&TsTypeParamInstantiation>,
    ) -> Type {
        if matches!(callee, Type::Any) {
            return Type::Any;
        }
        let sigs = self.call_signatures(callee);
        let Some(sig) = sigs
            .iter()
            .find(|sig| sig.accepts_arity(args.len()))
            .or_else(|| sigs.first())
        else {
            return Type::Unknown;
        };
        if sig.type_params.is_empty() {
            return sig.ret.clone();
        }
        let map = self.instantiate(env, &sig.type_params, sig, args, type_args);
        sig.ret.substitute(&map)
    }

    /// Bind `type_params` from explicit type arguments, or infer them from
    /// the call arguments. Unbound parameters become `unknown`.
    fn instantiate(
        &self,
        env: &TypeEnv,
        type_params: &[String],
        sig: &Signature,
        args: &[ExprOrSpread],
        type_args: Option<&TsTypeParamInstantiation>,
    ) -> HashMap<String, Type> {
        let mut map = HashMap::new();
        if let Some(type_args) = type_args {
            for (name, ty) in type_params.iter().zip(type_args.params.iter()) {
                map.insert(name.clone(), self.type_from_ts(&env.unit, ty, &[]));
            }
        } else {
            // Function arguments are typed after the others so their
            // parameters can take types inferred from the rest.
            let is_function = |arg: &ExprOrSpread| matches!(&*arg.expr, Expr::Arrow(_) | Expr::Fn(_));
            for (i, arg) in args.iter().enumerate() {
                if is_function(arg) {
                    continue;
                }
                let Some(param) = sig.param_type(i) else {
                    continue;
                };
                let ty = self.type_of_expr(env, &arg.expr);
                self.unify(&param, &ty, type_params, &mut map);
            }
            for (i, arg) in args.iter().enumerate() {
                if !is_function(arg) {
                    continue;
                }
                let Some(param) = sig.param_type(i) else {
                    continue;
                };
                let ty = match &*arg.expr {
                    Expr::Arrow(arrow) => {
                        let expected = match param.substitute(&map) {
                            Type::Function(expected) => Some(expected),
                            _ => None,
                        };
                        Type::Function(Rc::new(self.signature_of_arrow(
                            env,
                            arrow,
                            expected.as_deref(),
                        )))
                    }
                    other => self.type_of_expr(env, other),
                };
                self.unify(&param, &ty, type_params, &mut map);
            }
        }
        for name in type_params {
            map.entry(name.clone()).or_insert(Type::Unknown);
        }
        map
    }

    fn type_of_new(&self, env: &TypeEnv, new: &NewExpr) -> Type {
        match self.type_of_expr(env, &new.callee) {
            Type::Any => Type::Any,
            Type::ClassObject(class) => {
                let Some((class_params, ctor)) = self.constructor_signature(&class) else {
                    return Type::Named(class);
                };
                let args = new.args.as_deref().unwrap_or_default();
                let map = self.instantiate(env, &class_params, &ctor, args, new.type_args.as_deref());
                let args = class_params
                    .iter()
                    .map(|p| map.get(p).cloned().unwrap_or(Type::Unknown))
                    .collect();
                Type::Named(NamedType { args, ..class })
            }
            _ => Type::Unknown,
        }
    }

    fn awaited(&self, ty: Type) -> Type {
        match ty {
            Type::Named(named) if matches!(named.name.as_str(), "Promise" | "PromiseLike") => {
                named.args.into_iter().next().unwrap_or(Type::Unknown)
            }
            Type::Union(members) => Type::union(members.into_iter().map(|t| self.awaited(t))),
            t => t,
        }
    }

    // ============================================================
    // Literals
    // ============================================================

    fn type_of_object_lit(&self, env: &TypeEnv, object: &ObjectLit) -> Type {
        let mut result = ObjectType::default();
        let set = |props: &mut Vec<(String, Type)>, name: String, ty: Type| {
            props.retain(|(n, _)| *n != name);
            props.push((name, ty));
        };
        for prop in &object.props {
            match prop {
                PropOrSpread::Spread(spread) => {
                    if let Type::Object(spread) = self.type_of_expr(env, &spread.expr) {
                        for (name, ty) in &spread.props {
                            set(&mut result.props, name.clone(), ty.clone());
                        }
                    }
                }
                PropOrSpread::Prop(prop) => match &**prop {
                    Prop::KeyValue(kv) => {
                        if let Some(name) = prop_name_text(&kv.key) {
                            let ty = self.type_of_expr(env, &kv.value).widened();
                            set(&mut result.props, name, ty);
                        }
                    }
                    Prop::Shorthand(ident) => {
                        let ty = self.type_of_ident(env, &ident.sym).widened();
                        set(&mut result.props, ident.sym.to_string(), ty);
                    }
                    Prop::Method(method) => {
                        if let Some(name) = prop_name_text(&method.key) {
                            let sig = self.signature_of_function(env, &method.function, &[]);
                            set(&mut result.props, name, Type::Function(Rc::new(sig)));
                        }
                    }
                    Prop::Getter(getter) => {
                        if let Some(name) = prop_name_text(&getter.key) {
                            let ty = match (&getter.type_ann, &getter.body) {
                                (Some(ann), _) => self.type_from_ts(&env.unit, &ann.type_ann, &[]),
                                (None, Some(body)) => {
                                    self.infer_return(env, &body.stmts).unwrap_or(Type::Void)
                                }
                                (None, None) => Type::Any,
                            };
                            set(&mut result.props, name, ty);
                        }
                    }
                    Prop::Assign(_) | Prop::Setter(_) => {}
                },
            }
        }
        Type::Object(Rc::new(result))
    }

    fn type_of_array_lit(&self, env: &TypeEnv, array: &ArrayLit) -> Type {
        if array.elems.is_empty() {
            return Type::Array(Box::new(Type::Any));
        }
        let elems = array.elems.iter().flatten().map(|elem| {
            let ty = self.type_of_expr(env, &elem.expr);
            if elem.spread.is_some() {
                self.iterated_type(&ty)
            } else {
                ty.widened()
            }
        });
        Type::Array(Box::new(Type::union(elems)))
    }

    // ============================================================
    // Inference
    // ============================================================

    /// Infer bindings for `type_params` by matching `param` against `arg`.
    /// The first binding of a type parameter wins.
    pub(super) fn unify(
        &self,
        param: &Type,
        arg: &Type,
        type_params: &[String],
        map: &mut HashMap<String, Type>,
    ) {
        let Some(_guard) = self.enter() else {
            return;
        };
        match (param, arg) {
            (Type::TypeParam(name), _) if type_params.contains(name) => {
                if !map.contains_key(name) && !matches!(arg, Type::Never) {
                    map.insert(name.clone(), arg.widened());
                }
            }
            (Type::Union(members), _) => {
                let arg = arg.non_nullable();
                if arg == Type::Never {
                    return;
                }
                let arg_members = match &arg {
                    Type::Union(inner) => inner.clone(),
                    t => vec![t.clone()],
                };
                let mut unmatched = Vec::new();
                for arg_member in arg_members {
                    let structural = members
                        .iter()
                        .filter(|m| !m.is_nullish() && !is_naked(m, type_params))
                        .find(|m| self.shape_matches(m, &arg_member));
                    match structural {
                        Some(member) => self.unify(member, &arg_member, type_params, map),
                        None => unmatched.push(arg_member),
                    }
                }
                if !unmatched.is_empty()
                    && let Some(naked) = members.iter().find(|m| is_naked(m, type_params))
                {
                    self.unify(naked, &Type::union(unmatched), type_params, map);
                }
            }
            (_, Type::Union(arg_members)) => {
                for arg_member in arg_members.iter().filter(|t| !t.is_nullish()) {
                    self.unify(param, arg_member, type_params, map);
                }
            }
            (Type::Array(param_elem), Type::Array(arg_elem)) => {
                self.unify(param_elem, arg_elem, type_params, map)
            }
            (Type::Named(named), Type::Array(arg_elem))
                if matches!(named.name.as_str(), "Array" | "ReadonlyArray") =>
            {
                if let Some(param_elem) = named.args.first() {
                    self.unify(param_elem, arg_elem, type_params, map);
                }
            }
            (Type::Named(param_named), Type::Named(arg_named)) => {
                let matched = if param_named.name == arg_named.name {
                    Some(arg_named.clone())
                } else {
                    self.find_base(arg_named, &param_named.name)
                };
                if let Some(matched) = matched {
                    for (p, a) in param_named.args.iter().zip(matched.args.iter()) {
                        self.unify(p, a, type_params, map);
                    }
                }
            }
            (Type::Function(param_sig), Type::Function(arg_sig)) => {
                for (p, a) in param_sig.params.iter().zip(arg_sig.params.iter()) {
                    self.unify(&p.ty, &a.ty, type_params, map);
                }
                self.unify(&param_sig.ret, &arg_sig.ret, type_params, map);
            }
            (Type::Function(param_sig), Type::Named(_) | Type::Object(_)) => {
                if let Some(arg_sig) = self.call_signatures(arg).first() {
                    self.unify(&param_sig.ret, &arg_sig.ret, type_params, map);
                }
            }
            (Type::Object(param_object), Type::Object(_) | Type::Named(_)) => {
                for (name, ty) in &param_object.props {
                    let arg_prop = self.property_type(arg, name);
                    self.unify(ty, &arg_prop, type_params, map);
                }
            }
            _ => {}
        }
    }

    /// Whether `arg` can be matched against the structure of `param`.
    fn shape_matches(&self, param: &Type, arg: &Type) -> bool {
        match (param, arg) {
            (Type::Named(p), Type::Named(a)) => {
                p.name == a.name || self.find_base(a, &p.name).is_some()
            }
            (Type::Named(p), Type::Array(_)) => matches!(p.name.as_str(), "Array" | "ReadonlyArray"),
            (Type::Array(_), Type::Array(_)) => true,
            (Type::Function(_), Type::Function(_)) => true,
            (Type::Object(_), Type::Object(_)) => true,
            (p, a) => p == a,
        }
    }
}

fn is_naked(ty: &Type, type_params: &[String]) -> bool {
    matches!(ty, Type::TypeParam(name) if type_params.contains(name))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;

    use super::super::testing::{type_of, type_of_in};
    use super::*;

    #[test]
    fn annotated_field_through_this() {
        let ty = type_of(
            r#"
            interface LDFlagSet { [key: string]: any }
            class C {
                flags: LDFlagSet = {};
                read() { return this.flags; }
            }
            "#,
            "this.flags",
        );
        assert_eq!(ty.to_string(), "LDFlagSet");
    }

    #[test]
    fn this_in_default_exported_classes() {
        for class in ["export default class C", "export default class"] {
            let ty = type_of(
                &format!(
                    "interface LDFlagSet {{ [key: string]: any }}\n{} {{\n  flags!: LDFlagSet;\n  read() {{ return this.flags; }}\n}}\n",
                    class
                ),
                "this.flags",
            );
            assert_eq!(ty.to_string(), "LDFlagSet", "{}", class);
        }
    }

    #[test]
    fn constructor_parameter_property() {
        let ty = type_of(
            r#"
            interface LDFlagSet { [key: string]: any }
            class C {
                constructor(private readonly flags: LDFlagSet) {}
                read() { return this.flags; }
            }
            "#,
            "this.flags",
        );
        assert_eq!(ty.to_string(), "LDFlagSet");
    }

    #[test]
    fn writable_signal_call_returns_value() {
        let ty = type_of(
            r#"
            import { signal } from '@angular/core';
            interface LDFlagSet { [key: string]: any }
            declare const initial: LDFlagSet;
            class C {
                flags = signal(initial);
                read() { return this.flags(); }
            }
            "#,
            "this.flags()",
        );
        assert_eq!(ty.to_string(), "LDFlagSet");
    }

    #[test]
    fn required_input_with_explicit_type_argument() {
        let ty = type_of(
            r#"
            import { input } from '@angular/core';
            interface LDFlagSet { [key: string]: any }
            class C {
                flags = input.required<LDFlagSet>();
                read() { return this.flags(); }
            }
            "#,
            "this.flags()",
        );
        assert_eq!(ty.to_string(), "LDFlagSet");
    }

    #[test]
    fn optional_input_adds_undefined() {
        let ty = type_of(
            r#"
            import { input } from '@angular/core';
            interface LDFlagSet { [key: string]: any }
            class C {
                flags = input<LDFlagSet>();
                read() { return this.flags(); }
            }
            "#,
            "this.flags()",
        );
        assert_eq!(ty.to_string(), "LDFlagSet | undefined");
    }

    #[test]
    fn computed_infers_from_arrow_body() {
        let ty = type_of(
            r#"
            import { computed, signal } from '@angular/core';
            interface LDFlagSet { [key: string]: any }
            declare const initial: LDFlagSet;
            class C {
                source = signal(initial);
                flags = computed(() => this.source());
                read() { return this.flags(); }
            }
            "#,
            "this.flags()",
        );
        assert_eq!(ty.to_string(), "LDFlagSet");
    }

    #[test]
    fn behavior_subject_unwrapped_by_async_helper() {
        let ty = type_of(
            r#"
            import { BehaviorSubject } from 'rxjs';
            interface LDFlagSet { [key: string]: any }
            declare const initial: LDFlagSet;
            class C {
                flags$ = new BehaviorSubject<LDFlagSet>(initial);
                read() { return __ngUnwrapAsync(this.flags$); }
            }
            "#,
            "__ngUnwrapAsync(this.flags$)",
        );
        assert_eq!(ty.to_string(), "LDFlagSet | null");
    }

    #[test]
    fn inferred_constructor_argument() {
        let ty = type_of(
            r#"
            import { BehaviorSubject } from 'rxjs';
            interface LDFlagSet { [key: string]: any }
            declare const initial: LDFlagSet;
            const subject = new BehaviorSubject(initial);
            subject;
            "#,
            "subject",
        );
        assert_eq!(ty.to_string(), "BehaviorSubject<LDFlagSet>");
    }

    #[test]
    fn inherited_member_with_substituted_argument() {
        let ty = type_of(
            r#"
            interface LDFlagSet { [key: string]: any }
            class Holder<T> { value!: T; }
            class FlagHolder extends Holder<LDFlagSet> {}
            declare const h: FlagHolder;
            h.value;
            "#,
            "h.value",
        );
        assert_eq!(ty.to_string(), "LDFlagSet");
    }

    #[test]
    fn optional_chain_on_nullable_receiver() {
        let ty = type_of(
            r#"
            interface LDFlagSet { [key: string]: any }
            interface State { flags: LDFlagSet }
            declare const s: State | null;
            s?.flags;
            "#,
            "s?.flags",
        );
        assert_eq!(ty.to_string(), "LDFlagSet | undefined");
    }

    #[test]
    fn intersection_member_lookup() {
        let ty = type_of(
            r#"
            interface LDFlagSet { [key: string]: any }
            interface A { flags: LDFlagSet }
            interface B { name: string }
            declare const ab: A & B;
            ab.flags;
            "#,
            "ab.flags",
        );
        assert_eq!(ty.to_string(), "LDFlagSet");
    }

    #[test]
    fn array_map_infers_callback_result() {
        let ty = type_of(
            r#"
            interface LDFlagSet { [key: string]: any }
            declare const all: LDFlagSet[];
            const picked = all.map((f) => f);
            picked;
            "#,
            "picked",
        );
        assert_eq!(ty.to_string(), "LDFlagSet[]");
    }

    #[test]
    fn for_of_binding_takes_element_type() {
        let ty = type_of(
            r#"
            interface LDFlagSet { [key: string]: any }
            declare const all: LDFlagSet[];
            for (const item of all) {
                item;
            }
            "#,
            "item",
        );
        assert_eq!(ty.to_string(), "LDFlagSet");
    }

    #[test]
    fn await_unwraps_promise() {
        let ty = type_of(
            r#"
            interface LDFlagSet { [key: string]: any }
            declare function load(): Promise<LDFlagSet>;
            async function run() {
                const flags = await load();
                flags;
            }
            "#,
            "flags",
        );
        assert_eq!(ty.to_string(), "LDFlagSet");
    }

    #[test]
    fn imported_interface_keeps_declaring_file() {
        let dir = tempfile::tempdir().unwrap();
        let types = dir.path().join("types.ts");
        std::fs::write(&types, "export interface LDFlagSet { [key: string]: any }\n").unwrap();

        let checker = Checker::new();
        let ty = type_of_in(
            &checker,
            dir.path().join("main.ts"),
            r#"
            import { LDFlagSet } from './types';
            declare const flags: LDFlagSet;
            flags;
            "#,
            "flags",
        );
        match ty {
            Type::Named(named) => {
                assert_eq!(named.name, "LDFlagSet");
                assert_eq!(named.origin, Origin::Declared(PathBuf::from(&types)));
            }
            other => panic!("unexpected type {}", other),
        }
    }

    #[test]
    fn unresolved_package_type_is_external() {
        let ty = type_of(
            r#"
            import { LDFlagSet } from 'launchdarkly-js-client-sdk';
            declare const flags: LDFlagSet;
            flags;
            "#,
            "flags",
        );
        assert_eq!(
            ty,
            Type::Named(NamedType::new(
                "LDFlagSet",
                Origin::External("launchdarkly-js-client-sdk".into()),
                vec![]
            ))
        );
    }

    #[test]
    fn unknown_names_are_unknown() {
        assert_eq!(type_of("missing.flags;", "missing.flags"), Type::Unknown);
    }
}
