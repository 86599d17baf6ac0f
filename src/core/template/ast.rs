//! Template and expression syntax trees.
//!
//! All spans are byte offsets into the template text.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn empty(at: usize) -> Self {
        Self { start: at, end: at }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

// ============================================================
// Expressions
// ============================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// String value of a string literal.
    pub fn as_string_literal(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Literal(Literal::String(s)) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
    Boolean(bool),
    Null,
    Undefined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    TypeOf,
    Void,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Not => "!",
            UnaryOp::TypeOf => "typeof ",
            UnaryOp::Void => "void ",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub key: String,
    pub quoted: bool,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Missing expression, e.g. an empty binding.
    Empty,
    /// The component instance a bare name reads from.
    ImplicitReceiver,
    /// An explicit `this`.
    ThisReceiver,
    PropertyRead {
        receiver: Box<Expr>,
        name: String,
        name_span: Span,
    },
    SafePropertyRead {
        receiver: Box<Expr>,
        name: String,
        name_span: Span,
    },
    KeyedRead {
        receiver: Box<Expr>,
        key: Box<Expr>,
    },
    SafeKeyedRead {
        receiver: Box<Expr>,
        key: Box<Expr>,
    },
    Call {
        receiver: Box<Expr>,
        args: Vec<Expr>,
    },
    SafeCall {
        receiver: Box<Expr>,
        args: Vec<Expr>,
    },
    Literal(Literal),
    Array(Vec<Expr>),
    Map(Vec<MapEntry>),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: String,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        when_true: Box<Expr>,
        when_false: Box<Expr>,
    },
    Pipe {
        expr: Box<Expr>,
        name: String,
        name_span: Span,
        args: Vec<Expr>,
    },
    NonNull(Box<Expr>),
    /// `target = value` in event handlers. `target` is a property or keyed read.
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    /// `a; b` in event handlers.
    Chain(Vec<Expr>),
    /// `{{ a }} text {{ b }}`. `strings` has one more element than `exprs`.
    Interpolation {
        strings: Vec<String>,
        exprs: Vec<Expr>,
    },
    TemplateLiteral {
        quasis: Vec<String>,
        exprs: Vec<Expr>,
    },
    Parenthesized(Box<Expr>),
}

// ============================================================
// Nodes
// ============================================================

#[derive(Debug, Clone, PartialEq)]
pub struct TextAttribute {
    pub name: String,
    pub value: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// `[prop]="expr"`, `bind-prop`, or an interpolated attribute.
    Property,
    /// `[(prop)]="expr"`
    TwoWay,
    /// `[@trigger]` or `@trigger`.
    Animation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundAttribute {
    pub name: String,
    pub kind: BindingKind,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundEvent {
    pub name: String,
    pub handler: Expr,
    pub span: Span,
}

/// `#name` or `#name="exportAs"`.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub name: String,
    pub value: String,
    pub span: Span,
}

/// A template-local variable: `let-item="$implicit"` on `<ng-template>`, or
/// `let i = index` in microsyntax.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub value: String,
    pub span: Span,
}

/// One binding of structural directive microsyntax.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateBinding {
    /// `ngIf="cond"`, `of items`, `trackBy: fn`. `key` includes the directive prefix.
    Expression {
        key: String,
        value: Option<Expr>,
        span: Span,
    },
    Variable(Variable),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<TextAttribute>,
    pub inputs: Vec<BoundAttribute>,
    pub outputs: Vec<BoundEvent>,
    pub references: Vec<Reference>,
    pub variables: Vec<Variable>,
    /// Bindings of a `*directive` attribute, if any.
    pub template_bindings: Vec<TemplateBinding>,
    pub children: Vec<Node>,
    pub span: Span,
}

impl Element {
    pub fn is_ng_template(&self) -> bool {
        self.name == "ng-template"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub value: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundText {
    /// An [`ExprKind::Interpolation`].
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub value: String,
    pub span: Span,
}

/// `@let name = value;`
#[derive(Debug, Clone, PartialEq)]
pub struct LetDeclaration {
    pub name: String,
    pub name_span: Span,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfBranch {
    /// `None` for the final `@else`.
    pub condition: Option<Expr>,
    /// `@if (expr; as alias)`
    pub alias: Option<Variable>,
    pub children: Vec<Node>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfBlock {
    pub branches: Vec<IfBranch>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForBlock {
    pub item: Variable,
    pub expression: Expr,
    pub track: Option<Expr>,
    /// `let i = $index, e = $even`: `name` is the local, `value` the context variable.
    pub context_variables: Vec<Variable>,
    pub children: Vec<Node>,
    pub empty: Option<Vec<Node>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// `None` for `@default`.
    pub expression: Option<Expr>,
    pub children: Vec<Node>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchBlock {
    pub expression: Expr,
    pub cases: Vec<SwitchCase>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeferBlock {
    /// Expressions of `when` triggers, on the main block and `prefetch when`.
    pub triggers: Vec<Expr>,
    pub children: Vec<Node>,
    pub placeholder: Option<Vec<Node>>,
    pub loading: Option<Vec<Node>>,
    pub error: Option<Vec<Node>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    If(IfBlock),
    For(ForBlock),
    Switch(SwitchBlock),
    Defer(DeferBlock),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(Text),
    BoundText(BoundText),
    Comment(Comment),
    Block(Block),
    LetDeclaration(LetDeclaration),
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    pub nodes: Vec<Node>,
}
