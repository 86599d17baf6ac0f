//! Type-check translation of templates into TypeScript.
//!
//! Each template becomes one function whose `this` is the owning component
//! class. Every template expression is emitted wrapped in parentheses and
//! followed by a `/*start,end*/` comment holding its template span, and the
//! translated range is recorded as a [`Selection`].

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};

use crate::core::error::ExtractError;
use crate::core::flag_read::{EscapeMap, TemplateMetadata};
use crate::core::template::{
    Block, Element, Expr, ExprKind, Literal, Node, Span, Template, TemplateBinding, Variable,
    parse_template,
};

/// A template span and the translation range holding its expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Offsets in the template's file.
    pub template: Span,
    /// Offsets in the translation text.
    pub translation: Span,
}

/// A generated translation for every template stored in one file.
#[derive(Debug, Clone)]
pub struct Translation {
    pub path: PathBuf,
    pub text: String,
    pub selections: Vec<Selection>,
}

/// A component class and the template it declares.
#[derive(Debug, Clone)]
pub struct TemplateOwner {
    pub component_path: PathBuf,
    pub class_name: String,
    pub template: TemplateMetadata,
}

#[derive(Debug)]
pub struct TranslationRequest<'a> {
    pub template_path: &'a Path,
    /// File offset that triggered the request.
    pub offset: usize,
    /// Source file the template belongs to.
    pub owner_path: &'a Path,
    /// Registered owners of templates stored in `template_path`.
    pub owners: &'a [TemplateOwner],
}

/// Produces type-check translations. `None` means the template has no
/// translation, e.g. because no component declares it.
pub trait TranslationService {
    fn translate(
        &self,
        request: &TranslationRequest<'_>,
    ) -> Result<Option<Translation>, ExtractError>;
}

/// `<dir>/<stem>.ngtypecheck.ts` next to the template.
pub fn translation_path(template_path: &Path) -> PathBuf {
    let stem = template_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let dir = template_path.parent().unwrap_or_else(|| Path::new("/"));
    dir.join(format!("{}.ngtypecheck.ts", stem))
}

/// Generates translations from parsed templates.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcbGenerator;

impl TranslationService for TcbGenerator {
    fn translate(
        &self,
        request: &TranslationRequest<'_>,
    ) -> Result<Option<Translation>, ExtractError> {
        if request.owners.is_empty() {
            return Ok(None);
        }

        let mut emitter = Emitter::default();
        let mut imports: HashMap<&Path, String> = HashMap::new();
        for owner in request.owners {
            if imports.contains_key(owner.component_path.as_path()) {
                continue;
            }
            let alias = format!("_i{}", imports.len());
            emitter.out.push_str(&format!(
                "import * as {} from {};\n",
                alias,
                quote(&owner.component_path.to_string_lossy())
            ));
            imports.insert(&owner.component_path, alias);
        }

        // A template shared by several components is typed against the first.
        let mut seen_offsets = HashSet::new();
        for (index, owner) in request.owners.iter().enumerate() {
            if !seen_offsets.insert(owner.template.offset) {
                continue;
            }
            let template = parse_template(&owner.template.content).map_err(|errors| {
                ExtractError::TemplateParse {
                    path: request.template_path.to_path_buf(),
                    diagnostics: errors.iter().map(ToString::to_string).collect(),
                }
            })?;
            let alias = imports
                .get(owner.component_path.as_path())
                .cloned()
                .unwrap_or_default();
            emitter.function(
                index,
                &format!("{}.{}", alias, owner.class_name),
                &owner.template,
                &template,
            );
        }

        Ok(Some(Translation {
            path: translation_path(request.template_path),
            text: emitter.out,
            selections: emitter.selections,
        }))
    }
}

fn quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

#[derive(Default)]
struct Emitter {
    out: String,
    selections: Vec<Selection>,
    /// Template-local names, innermost scope last.
    scopes: Vec<Vec<String>>,
    /// Position of the current template in its file.
    origin: (usize, EscapeMap),
    indent: usize,
    temp: usize,
}

impl Emitter {
    fn function(
        &mut self,
        index: usize,
        this_type: &str,
        meta: &TemplateMetadata,
        template: &Template,
    ) {
        self.origin = (meta.offset, meta.escapes.clone());
        self.out
            .push_str(&format!("function _tcb{}(this: {}) {{\n", index, this_type));
        self.indent = 1;
        self.scopes = vec![Vec::new()];

        // References are visible everywhere in the template.
        let mut references = Vec::new();
        collect_references(&template.nodes, &mut references);
        for name in references {
            self.declare_any(&name);
        }
        self.nodes(&template.nodes);
        self.out.push_str("}\n");
    }

    fn file_offset(&self, local: usize) -> usize {
        self.origin.0 + self.origin.1.to_source(local)
    }

    fn start_line(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
    }

    fn line(&mut self, text: &str) {
        self.start_line();
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn open_block(&mut self) {
        self.line("{");
        self.indent += 1;
        self.scopes.push(Vec::new());
    }

    fn close_block(&mut self) {
        self.scopes.pop();
        self.indent -= 1;
        self.line("}");
    }

    fn declare(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(name.to_string());
        }
    }

    fn declare_any(&mut self, name: &str) {
        self.line(&format!("const {}: any = null as any;", name));
        self.declare(name);
    }

    fn is_local(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.iter().any(|n| n == name))
    }

    fn temp_name(&mut self) -> String {
        self.temp += 1;
        format!("_t{}", self.temp)
    }

    /// `expr;` with every node annotated.
    fn statement(&mut self, expr: &Expr) {
        if matches!(expr.kind, ExprKind::Empty) {
            return;
        }
        self.start_line();
        self.expr(expr);
        self.out.push_str(";\n");
    }

    fn const_decl(&mut self, name: &str, value: &Expr) {
        self.start_line();
        self.out.push_str(&format!("const {} = ", name));
        self.expr(value);
        self.out.push_str(";\n");
    }

    // ============================================================
    // Nodes
    // ============================================================

    fn nodes(&mut self, nodes: &[Node]) {
        for node in nodes {
            self.node(node);
        }
    }

    fn node(&mut self, node: &Node) {
        match node {
            Node::Element(element) if !element.template_bindings.is_empty() => {
                self.structural(element)
            }
            Node::Element(element) => self.element(element),
            Node::BoundText(text) => self.interpolation(&text.value),
            Node::LetDeclaration(decl) => {
                self.const_decl(&decl.name, &decl.value);
                self.declare(&decl.name);
            }
            Node::Block(block) => self.block(block),
            Node::Text(_) | Node::Comment(_) => {}
        }
    }

    fn interpolation(&mut self, value: &Expr) {
        match &value.kind {
            ExprKind::Interpolation { exprs, .. } => {
                for expr in exprs {
                    self.statement(expr);
                }
            }
            _ => self.statement(value),
        }
    }

    fn element(&mut self, element: &Element) {
        for input in &element.inputs {
            self.interpolation(&input.value);
        }
        for output in &element.outputs {
            self.open_block();
            self.declare_any("$event");
            self.statement(&output.handler);
            self.close_block();
        }
        if element.is_ng_template() {
            self.open_block();
            for variable in &element.variables {
                self.declare_any(&variable.name);
            }
            self.nodes(&element.children);
            self.close_block();
        } else {
            self.nodes(&element.children);
        }
    }

    /// An element carrying `*directive` microsyntax.
    fn structural(&mut self, element: &Element) {
        let directive = match element.template_bindings.first() {
            Some(TemplateBinding::Expression { key, .. }) => key.clone(),
            _ => String::new(),
        };
        let bindings: Vec<(&str, Option<&Expr>)> = element
            .template_bindings
            .iter()
            .filter_map(|binding| match binding {
                TemplateBinding::Expression { key, value, .. } => {
                    Some((key.as_str(), value.as_ref()))
                }
                TemplateBinding::Variable(_) => None,
            })
            .collect();
        let variables: Vec<&Variable> = element
            .template_bindings
            .iter()
            .filter_map(|binding| match binding {
                TemplateBinding::Variable(variable) => Some(variable),
                TemplateBinding::Expression { .. } => None,
            })
            .collect();

        match directive.as_str() {
            "ngFor" => self.ng_for(&bindings, &variables, element),
            "ngIf" => self.ng_if(&bindings, &variables, element),
            _ => {
                for (_, value) in &bindings {
                    if let Some(value) = value {
                        self.statement(value);
                    }
                }
                self.open_block();
                for variable in &variables {
                    self.declare_any(&variable.name);
                }
                self.element(element);
                self.close_block();
            }
        }
    }

    fn ng_for(&mut self, bindings: &[(&str, Option<&Expr>)], variables: &[&Variable], element: &Element) {
        for (key, value) in bindings {
            if *key != "ngForOf"
                && let Some(value) = value
            {
                self.statement(value);
            }
        }
        let item = variables
            .iter()
            .find(|v| v.value == "$implicit")
            .map(|v| v.name.clone())
            .unwrap_or_else(|| self.temp_name());

        self.start_line();
        self.out.push_str(&format!("for (const {} of ", item));
        match bindings.iter().find(|(key, _)| *key == "ngForOf") {
            Some((_, Some(iterable))) => self.expr(iterable),
            _ => self.out.push_str("[]"),
        }
        self.out.push_str(") {\n");
        self.indent += 1;
        self.scopes.push(vec![item.clone()]);
        for variable in variables {
            if variable.name == item {
                continue;
            }
            let declaration = match variable.value.as_str() {
                "$implicit" => format!("const {} = {};", variable.name, item),
                "index" | "count" => format!("const {}: number = 0;", variable.name),
                "first" | "last" | "even" | "odd" => {
                    format!("const {}: boolean = false;", variable.name)
                }
                _ => format!("const {}: any = null as any;", variable.name),
            };
            self.line(&declaration);
            self.declare(&variable.name);
        }
        self.element(element);
        self.close_block();
    }

    fn ng_if(&mut self, bindings: &[(&str, Option<&Expr>)], variables: &[&Variable], element: &Element) {
        for (key, value) in bindings {
            if *key != "ngIf"
                && let Some(value) = value
            {
                self.statement(value);
            }
        }
        let condition = bindings
            .iter()
            .find(|(key, _)| *key == "ngIf")
            .and_then(|(_, value)| *value);
        self.start_line();
        self.out.push_str("if (");
        match condition {
            Some(condition) => self.expr(condition),
            None => self.out.push_str("true"),
        }
        self.out.push_str(") {\n");
        self.indent += 1;
        self.scopes.push(Vec::new());
        for variable in variables {
            match (variable.value.as_str(), condition) {
                ("ngIf" | "$implicit", Some(condition)) => {
                    self.start_line();
                    self.out.push_str(&format!("const {} = ", variable.name));
                    self.plain_expr(condition);
                    self.out.push_str(";\n");
                    self.declare(&variable.name);
                }
                _ => self.declare_any(&variable.name),
            }
        }
        self.element(element);
        self.close_block();
    }

    // ============================================================
    // Blocks
    // ============================================================

    fn block(&mut self, block: &Block) {
        match block {
            Block::If(block) => {
                for (index, branch) in block.branches.iter().enumerate() {
                    self.start_line();
                    if index > 0 {
                        self.out.push_str("else ");
                    }
                    if let Some(condition) = &branch.condition {
                        self.out.push_str("if (");
                        self.expr(condition);
                        self.out.push_str(") ");
                    }
                    self.out.push_str("{\n");
                    self.indent += 1;
                    self.scopes.push(Vec::new());
                    if let (Some(alias), Some(condition)) = (&branch.alias, &branch.condition) {
                        self.start_line();
                        self.out.push_str(&format!("const {} = ", alias.name));
                        self.plain_expr(condition);
                        self.out.push_str(";\n");
                        self.declare(&alias.name);
                    }
                    self.nodes(&branch.children);
                    self.close_block();
                }
            }
            Block::For(block) => {
                self.start_line();
                self.out.push_str(&format!("for (const {} of ", block.item.name));
                self.expr(&block.expression);
                self.out.push_str(") {\n");
                self.indent += 1;
                self.scopes.push(vec![block.item.name.clone()]);
                for name in ["$index", "$count"] {
                    self.line(&format!("const {}: number = 0;", name));
                    self.declare(name);
                }
                for name in ["$first", "$last", "$even", "$odd"] {
                    self.line(&format!("const {}: boolean = false;", name));
                    self.declare(name);
                }
                for variable in &block.context_variables {
                    self.line(&format!("const {} = {};", variable.name, variable.value));
                    self.declare(&variable.name);
                }
                if let Some(track) = &block.track {
                    self.statement(track);
                }
                self.nodes(&block.children);
                self.close_block();
                if let Some(empty) = &block.empty {
                    self.open_block();
                    self.nodes(empty);
                    self.close_block();
                }
            }
            Block::Switch(block) => {
                self.start_line();
                self.out.push_str("switch (");
                self.expr(&block.expression);
                self.out.push_str(") {\n");
                self.indent += 1;
                for case in &block.cases {
                    self.start_line();
                    match &case.expression {
                        Some(expression) => {
                            self.out.push_str("case ");
                            self.expr(expression);
                            self.out.push_str(": {\n");
                        }
                        None => self.out.push_str("default: {\n"),
                    }
                    self.indent += 1;
                    self.scopes.push(Vec::new());
                    self.nodes(&case.children);
                    self.line("break;");
                    self.close_block();
                }
                self.indent -= 1;
                self.line("}");
            }
            Block::Defer(block) => {
                for trigger in &block.triggers {
                    self.statement(trigger);
                }
                for nodes in [
                    Some(&block.children),
                    block.placeholder.as_ref(),
                    block.loading.as_ref(),
                    block.error.as_ref(),
                ]
                .into_iter()
                .flatten()
                {
                    self.open_block();
                    self.nodes(nodes);
                    self.close_block();
                }
            }
        }
    }

    // ============================================================
    // Expressions
    // ============================================================

    /// Emit `expr` wrapped and annotated, recording a selection.
    fn expr(&mut self, expr: &Expr) {
        self.out.push('(');
        let start = self.out.len();
        self.expr_code(expr, true);
        let end = self.out.len();
        let template = Span::new(
            self.file_offset(expr.span.start),
            self.file_offset(expr.span.end),
        );
        self.out
            .push_str(&format!(" /*{},{}*/)", template.start, template.end));
        self.selections.push(Selection {
            template,
            translation: Span::new(start, end),
        });
    }

    /// Emit `expr` without annotations, for re-evaluated expressions.
    fn plain_expr(&mut self, expr: &Expr) {
        self.out.push('(');
        self.expr_code(expr, false);
        self.out.push(')');
    }

    fn child(&mut self, expr: &Expr, annotate: bool) {
        if annotate {
            self.expr(expr);
        } else {
            self.plain_expr(expr);
        }
    }

    fn list(&mut self, exprs: &[Expr], annotate: bool) {
        for (index, expr) in exprs.iter().enumerate() {
            if index > 0 {
                self.out.push_str(", ");
            }
            self.child(expr, annotate);
        }
    }

    fn expr_code(&mut self, expr: &Expr, annotate: bool) {
        match &expr.kind {
            ExprKind::Empty | ExprKind::Literal(Literal::Undefined) => {
                self.out.push_str("undefined")
            }
            ExprKind::ImplicitReceiver | ExprKind::ThisReceiver => self.out.push_str("this"),
            ExprKind::PropertyRead { receiver, name, .. } => {
                if matches!(receiver.kind, ExprKind::ImplicitReceiver) {
                    if self.is_local(name) {
                        self.out.push_str(name);
                    } else {
                        self.out.push_str(&format!("this.{}", name));
                    }
                } else {
                    self.child(receiver, annotate);
                    self.out.push('.');
                    self.out.push_str(name);
                }
            }
            ExprKind::SafePropertyRead { receiver, name, .. } => {
                self.child(receiver, annotate);
                self.out.push_str("?.");
                self.out.push_str(name);
            }
            ExprKind::KeyedRead { receiver, key } => {
                self.child(receiver, annotate);
                self.out.push('[');
                self.child(key, annotate);
                self.out.push(']');
            }
            ExprKind::SafeKeyedRead { receiver, key } => {
                self.child(receiver, annotate);
                self.out.push_str("?.[");
                self.child(key, annotate);
                self.out.push(']');
            }
            ExprKind::Call { receiver, args } => {
                if self.is_any_cast(receiver) {
                    self.out.push('(');
                    match args.first() {
                        Some(arg) => self.child(arg, annotate),
                        None => self.out.push_str("undefined"),
                    }
                    self.out.push_str(" as any)");
                    return;
                }
                self.child(receiver, annotate);
                self.out.push('(');
                self.list(args, annotate);
                self.out.push(')');
            }
            ExprKind::SafeCall { receiver, args } => {
                self.child(receiver, annotate);
                self.out.push_str("?.(");
                self.list(args, annotate);
                self.out.push(')');
            }
            ExprKind::Literal(literal) => {
                let text = match literal {
                    Literal::String(value) => quote(value),
                    Literal::Number(value) if value.is_finite() => value.to_string(),
                    Literal::Number(_) => "0".to_string(),
                    Literal::Boolean(value) => value.to_string(),
                    Literal::Null => "null".to_string(),
                    Literal::Undefined => "undefined".to_string(),
                };
                self.out.push_str(&text);
            }
            ExprKind::Array(items) => {
                self.out.push('[');
                self.list(items, annotate);
                self.out.push(']');
            }
            ExprKind::Map(entries) => {
                self.out.push('{');
                for (index, entry) in entries.iter().enumerate() {
                    self.out.push_str(if index > 0 { ", " } else { " " });
                    self.out.push_str(&quote(&entry.key));
                    self.out.push_str(": ");
                    self.child(&entry.value, annotate);
                }
                self.out.push_str(" }");
            }
            ExprKind::Unary { op, expr } => {
                self.out.push_str(op.as_str());
                self.child(expr, annotate);
            }
            ExprKind::Binary { op, left, right } => {
                self.child(left, annotate);
                self.out.push_str(&format!(" {} ", op));
                self.child(right, annotate);
            }
            ExprKind::Conditional {
                condition,
                when_true,
                when_false,
            } => {
                self.child(condition, annotate);
                self.out.push_str(" ? ");
                self.child(when_true, annotate);
                self.out.push_str(" : ");
                self.child(when_false, annotate);
            }
            ExprKind::Pipe {
                expr, name, args, ..
            } => {
                if name == "async" {
                    self.out.push_str("__ngUnwrapAsync(");
                    self.child(expr, annotate);
                    self.out.push(')');
                } else {
                    self.out.push_str("(null as any)(");
                    self.child(expr, annotate);
                    for arg in args {
                        self.out.push_str(", ");
                        self.child(arg, annotate);
                    }
                    self.out.push(')');
                }
            }
            ExprKind::NonNull(inner) => {
                self.child(inner, annotate);
                self.out.push('!');
            }
            ExprKind::Assign { target, value } => {
                self.child(target, annotate);
                self.out.push_str(" = ");
                self.child(value, annotate);
            }
            ExprKind::Chain(exprs) => self.list(exprs, annotate),
            ExprKind::Interpolation { exprs, .. } | ExprKind::TemplateLiteral { exprs, .. } => {
                self.out.push_str("\"\"");
                for expr in exprs {
                    self.out.push_str(" + ");
                    self.child(expr, annotate);
                }
            }
            ExprKind::Parenthesized(inner) => self.child(inner, annotate),
        }
    }

    /// `$any(x)` unless `$any` is shadowed by a template local.
    fn is_any_cast(&self, receiver: &Expr) -> bool {
        matches!(
            &receiver.kind,
            ExprKind::PropertyRead { receiver, name, .. }
                if name == "$any"
                    && matches!(receiver.kind, ExprKind::ImplicitReceiver)
                    && !self.is_local(name)
        )
    }
}

fn collect_references(nodes: &[Node], out: &mut Vec<String>) {
    for node in nodes {
        match node {
            Node::Element(element) => {
                out.extend(element.references.iter().map(|r| r.name.clone()));
                collect_references(&element.children, out);
            }
            Node::Block(Block::If(block)) => {
                for branch in &block.branches {
                    collect_references(&branch.children, out);
                }
            }
            Node::Block(Block::For(block)) => {
                collect_references(&block.children, out);
                if let Some(empty) = &block.empty {
                    collect_references(empty, out);
                }
            }
            Node::Block(Block::Switch(block)) => {
                for case in &block.cases {
                    collect_references(&case.children, out);
                }
            }
            Node::Block(Block::Defer(block)) => {
                collect_references(&block.children, out);
                for nodes in [&block.placeholder, &block.loading, &block.error]
                    .into_iter()
                    .flatten()
                {
                    collect_references(nodes, out);
                }
            }
            Node::Text(_) | Node::BoundText(_) | Node::Comment(_) | Node::LetDeclaration(_) => {}
        }
    }
}
