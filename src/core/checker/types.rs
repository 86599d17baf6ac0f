//! Owned type representation produced by the checker.

use std::{collections::HashMap, fmt, path::PathBuf, rc::Rc};

/// Where a named type is declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Declared in a file loaded into the program.
    Declared(PathBuf),
    /// Imported from a package that is not part of the program. Members are unknown.
    External(String),
}

/// A reference to a class, interface or enum, with type arguments applied.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedType {
    pub name: String,
    pub origin: Origin,
    pub args: Vec<Type>,
}

impl NamedType {
    pub fn new(name: impl Into<String>, origin: Origin, args: Vec<Type>) -> Self {
        Self {
            name: name.into(),
            origin,
            args,
        }
    }

    pub fn declared_in(&self) -> Option<&PathBuf> {
        match &self.origin {
            Origin::Declared(path) => Some(path),
            Origin::External(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub ty: Type,
    pub optional: bool,
    pub rest: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub type_params: Vec<String>,
    pub params: Vec<Param>,
    pub ret: Type,
}

impl Signature {
    /// Whether a call with `count` arguments can select this signature.
    pub fn accepts_arity(&self, count: usize) -> bool {
        let required = self
            .params
            .iter()
            .filter(|p| !p.optional && !p.rest)
            .count();
        let has_rest = self.params.iter().any(|p| p.rest);
        count >= required && (has_rest || count <= self.params.len())
    }

    /// Declared type of the parameter receiving the argument at `index`.
    pub fn param_type(&self, index: usize) -> Option<Type> {
        match self.params.get(index) {
            Some(p) if p.rest => Some(p.ty.element_type()),
            Some(p) => Some(p.ty.clone()),
            None => self
                .params
                .last()
                .filter(|p| p.rest)
                .map(|p| p.ty.element_type()),
        }
    }
}

/// Anonymous object type (`{ a: T; [k: string]: U; (): V }`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectType {
    pub props: Vec<(String, Type)>,
    pub index: Option<Type>,
    pub calls: Vec<Rc<Signature>>,
}

impl ObjectType {
    pub fn prop(&self, name: &str) -> Option<&Type> {
        self.props.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Any,
    Unknown,
    Never,
    Void,
    Undefined,
    Null,
    String,
    Number,
    Boolean,
    BigInt,
    Symbol,
    /// The non-primitive `object` keyword.
    NonPrimitive,
    StringLit(String),
    NumberLit(f64),
    BooleanLit(bool),
    /// Instance side of a class, an interface, or an enum.
    Named(NamedType),
    Object(Rc<ObjectType>),
    Function(Rc<Signature>),
    Array(Box<Type>),
    Union(Vec<Type>),
    Intersection(Vec<Type>),
    TypeParam(String),
    /// Static side of a class (`typeof C`).
    ClassObject(NamedType),
    /// The value of an enum declaration (`typeof E`).
    EnumObject(NamedType),
    /// `import * as ns from './x'`.
    Namespace(PathBuf),
}

impl Type {
    /// Build a union, flattening nested unions and dropping duplicates.
    pub fn union(types: impl IntoIterator<Item = Type>) -> Type {
        let mut members: Vec<Type> = Vec::new();
        for ty in types {
            match ty {
                Type::Union(inner) => {
                    for t in inner {
                        if !members.contains(&t) {
                            members.push(t);
                        }
                    }
                }
                Type::Never => {}
                t => {
                    if !members.contains(&t) {
                        members.push(t);
                    }
                }
            }
        }
        if members.iter().any(|t| matches!(t, Type::Any)) {
            return Type::Any;
        }
        match members.len() {
            0 => Type::Never,
            1 => members.remove(0),
            _ => Type::Union(members),
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Type::Null | Type::Undefined | Type::Void)
    }

    /// Remove `null` and `undefined` constituents.
    pub fn non_nullable(&self) -> Type {
        match self {
            Type::Union(members) => {
                Type::union(members.iter().filter(|t| !t.is_nullish()).cloned())
            }
            t if t.is_nullish() => Type::Never,
            t => t.clone(),
        }
    }

    /// Element type of an array, `Unknown` for anything else.
    pub fn element_type(&self) -> Type {
        match self {
            Type::Array(elem) => (**elem).clone(),
            Type::Any => Type::Any,
            _ => Type::Unknown,
        }
    }

    /// Widen literal types to their primitive.
    pub fn widened(&self) -> Type {
        match self {
            Type::StringLit(_) => Type::String,
            Type::NumberLit(_) => Type::Number,
            Type::BooleanLit(_) => Type::Boolean,
            t => t.clone(),
        }
    }

    /// Replace type parameters bound in `map`.
    pub fn substitute(&self, map: &HashMap<String, Type>) -> Type {
        if map.is_empty() {
            return self.clone();
        }
        match self {
            Type::TypeParam(name) => map.get(name).cloned().unwrap_or_else(|| self.clone()),
            Type::Named(named) => Type::Named(named.substitute(map)),
            Type::ClassObject(named) => Type::ClassObject(named.substitute(map)),
            Type::Array(elem) => Type::Array(Box::new(elem.substitute(map))),
            Type::Union(members) => Type::union(members.iter().map(|t| t.substitute(map))),
            Type::Intersection(members) => {
                Type::Intersection(members.iter().map(|t| t.substitute(map)).collect())
            }
            Type::Function(sig) => Type::Function(Rc::new(sig.substitute(map))),
            Type::Object(obj) => Type::Object(Rc::new(ObjectType {
                props: obj
                    .props
                    .iter()
                    .map(|(n, t)| (n.clone(), t.substitute(map)))
                    .collect(),
                index: obj.index.as_ref().map(|t| t.substitute(map)),
                calls: obj
                    .calls
                    .iter()
                    .map(|s| Rc::new(s.substitute(map)))
                    .collect(),
            })),
            _ => self.clone(),
        }
    }
}

impl NamedType {
    fn substitute(&self, map: &HashMap<String, Type>) -> NamedType {
        NamedType {
            name: self.name.clone(),
            origin: self.origin.clone(),
            args: self.args.iter().map(|t| t.substitute(map)).collect(),
        }
    }
}

impl Signature {
    pub fn substitute(&self, map: &HashMap<String, Type>) -> Signature {
        // Own type parameters shadow outer bindings.
        let scoped: HashMap<String, Type>;
        let map = if self.type_params.iter().any(|p| map.contains_key(p)) {
            scoped = map
                .iter()
                .filter(|(k, _)| !self.type_params.contains(*k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            &scoped
        } else {
            map
        };
        Signature {
            type_params: self.type_params.clone(),
            params: self
                .params
                .iter()
                .map(|p| Param {
                    ty: p.ty.substitute(map),
                    optional: p.optional,
                    rest: p.rest,
                })
                .collect(),
            ret: self.ret.substitute(map),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => write!(f, "any"),
            Type::Unknown => write!(f, "unknown"),
            Type::Never => write!(f, "never"),
            Type::Void => write!(f, "void"),
            Type::Undefined => write!(f, "undefined"),
            Type::Null => write!(f, "null"),
            Type::String => write!(f, "string"),
            Type::Number => write!(f, "number"),
            Type::Boolean => write!(f, "boolean"),
            Type::BigInt => write!(f, "bigint"),
            Type::Symbol => write!(f, "symbol"),
            Type::NonPrimitive => write!(f, "object"),
            Type::StringLit(s) => write!(f, "\"{}\"", s),
            Type::NumberLit(n) => write!(f, "{}", n),
            Type::BooleanLit(b) => write!(f, "{}", b),
            Type::Named(named) => write_named(f, named),
            Type::Object(obj) => {
                write!(f, "{{ ")?;
                for (name, ty) in &obj.props {
                    write!(f, "{}: {}; ", name, ty)?;
                }
                if let Some(index) = &obj.index {
                    write!(f, "[key: string]: {}; ", index)?;
                }
                write!(f, "}}")
            }
            Type::Function(sig) => {
                write!(f, "(")?;
                for (i, p) in sig.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}{}", if p.rest { "..." } else { "" }, p.ty)?;
                }
                write!(f, ") => {}", sig.ret)
            }
            Type::Array(elem) => match **elem {
                Type::Union(_) | Type::Function(_) => write!(f, "({})[]", elem),
                _ => write!(f, "{}[]", elem),
            },
            Type::Union(members) => write_joined(f, members, " | "),
            Type::Intersection(members) => write_joined(f, members, " & "),
            Type::TypeParam(name) => write!(f, "{}", name),
            Type::ClassObject(named) | Type::EnumObject(named) => write!(f, "typeof {}", named.name),
            Type::Namespace(path) => write!(f, "typeof import(\"{}\")", path.display()),
        }
    }
}

fn write_named(f: &mut fmt::Formatter<'_>, named: &NamedType) -> fmt::Result {
    write!(f, "{}", named.name)?;
    if !named.args.is_empty() {
        write!(f, "<")?;
        write_joined(f, &named.args, ", ")?;
        write!(f, ">")?;
    }
    Ok(())
}

fn write_joined(f: &mut fmt::Formatter<'_>, types: &[Type], sep: &str) -> fmt::Result {
    for (i, ty) in types.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        write!(f, "{}", ty)?;
    }
    Ok(())
}
