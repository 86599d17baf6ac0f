//! Markup parser: elements, attributes, text and control flow blocks.

use std::sync::LazyLock;

use regex::Regex;

use super::TemplateError;
use super::ast::{
    Block, BindingKind, BoundAttribute, BoundEvent, BoundText, Comment, DeferBlock, Element,
    Expr, ExprKind, ForBlock, IfBlock, IfBranch, LetDeclaration, Node, Reference, Span,
    SwitchBlock, SwitchCase, Text, TextAttribute, Variable,
};
use super::expr::{find_interpolation_end, parse_action, parse_binding, parse_interpolation};
use super::microsyntax::parse_template_bindings;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Content is kept verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Content is text, but may contain interpolations.
const ESCAPABLE_RAW_TEXT_ELEMENTS: &[&str] = &["textarea", "title"];

static FOR_LOOP_EXPRESSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([0-9A-Za-z_$]+)\s+of\s+([\S\s]*)").unwrap());
static FOR_TRACK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*track\s+)([\S\s]*)").unwrap());
static FOR_LET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*let\s+([\S\s]*)").unwrap());
static FOR_LET_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([0-9A-Za-z_$]+)\s*=\s*(\$[0-9A-Za-z_]+)\s*$").unwrap());
static IF_ALIAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*as\s+([0-9A-Za-z_$]+)\s*$").unwrap());
static DEFER_WHEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*(?:prefetch\s+|hydrate\s+)?when\s+)([\S\s]*)").unwrap());
static LET_DECLARATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s+)([A-Za-z_$][0-9A-Za-z_$]*)\s*=").unwrap());

const FOR_CONTEXT_VARIABLES: &[&str] = &["$index", "$first", "$last", "$even", "$odd", "$count"];

/// Parse template markup into nodes. Errors are collected; parsing continues
/// past recoverable problems.
pub fn parse_markup(text: &str) -> (Vec<Node>, Vec<TemplateError>) {
    let mut parser = MarkupParser {
        text,
        pos: 0,
        stack: Vec::new(),
        errors: Vec::new(),
    };
    let nodes = parser.parse_nodes();
    (nodes, parser.errors)
}

#[derive(Debug, Clone, PartialEq)]
enum Frame {
    Element(String),
    Block(String),
}

/// Parameter of a block, e.g. `track item.id` in `@for (...; track item.id)`.
#[derive(Debug, Clone)]
struct BlockParam {
    text: String,
    offset: usize,
}

/// A block before its name-specific structure is interpreted.
#[derive(Debug)]
struct RawBlock {
    name: String,
    params: Vec<BlockParam>,
    children: Vec<Node>,
    /// `@case` and `@default` blocks of a `@switch`.
    cases: Vec<RawBlock>,
    span: Span,
}

struct MarkupParser<'a> {
    text: &'a str,
    pos: usize,
    stack: Vec<Frame>,
    errors: Vec<TemplateError>,
}

impl<'a> MarkupParser<'a> {
    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_at(&self, skip: usize) -> Option<char> {
        self.rest().chars().nth(skip)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn error(&mut self, message: impl Into<String>, span: Span) {
        self.errors.push(TemplateError::new(message, span));
    }

    /// Whether `name` is open inside the innermost block. Elements outside a
    /// block cannot be closed from within it.
    fn has_open_element(&self, name: &str) -> bool {
        self.stack
            .iter()
            .rev()
            .take_while(|frame| matches!(frame, Frame::Element(_)))
            .any(|frame| matches!(frame, Frame::Element(open) if open.eq_ignore_ascii_case(name)))
    }

    fn has_open_block(&self) -> bool {
        self.stack.iter().any(|frame| matches!(frame, Frame::Block(_)))
    }

    fn at_block_start(&self) -> bool {
        self.peek() == Some('@') && self.peek_at(1).is_some_and(|c| c.is_ascii_alphabetic())
    }

    /// Parse nodes until the innermost frame is closed or input ends.
    fn parse_nodes(&mut self) -> Vec<Node> {
        let mut nodes = Vec::new();
        while !self.parse_node(&mut nodes) {}
        nodes
    }

    /// Parse one node into `nodes`. Returns true when the innermost frame was
    /// closed or input ended.
    fn parse_node(&mut self, nodes: &mut Vec<Node>) -> bool {
        let Some(c) = self.peek() else {
            if let Some(Frame::Block(name)) = self.stack.last().cloned() {
                let at = self.text.len();
                self.error(format!("Unclosed block \"{}\"", name), Span::empty(at));
            }
            return true;
        };
        let start = self.pos;
        if self.rest().starts_with("</") {
            let Some(name) = self.peek_closing_tag_name() else {
                self.text_node(nodes);
                return false;
            };
            match self.stack.last() {
                Some(Frame::Element(open)) if open.eq_ignore_ascii_case(&name) => {
                    self.consume_closing_tag();
                    return true;
                }
                _ if self.has_open_element(&name) => return true,
                _ => {
                    self.consume_closing_tag();
                    self.error(
                        format!(
                            "Unexpected closing tag \"{}\". It may happen when the tag has already been closed by another tag.",
                            name
                        ),
                        Span::new(start, self.pos),
                    );
                }
            }
        } else if self.rest().starts_with("<!--") {
            nodes.push(self.comment());
        } else if self.rest().starts_with("<!") {
            // Doctype and similar declarations carry nothing of interest.
            self.skip_past(">");
        } else if c == '<' && self.peek_at(1).is_some_and(|n| n.is_ascii_alphabetic()) {
            nodes.push(self.element());
        } else if c == '}' {
            match self.stack.last() {
                Some(Frame::Block(_)) => {
                    self.bump();
                    return true;
                }
                _ if self.has_open_block() => return true,
                _ => {
                    self.bump();
                    self.error(
                        "Unexpected closing block. The block may have been closed earlier. If you meant to write the } character, you should use the \"&#125;\" HTML entity instead.",
                        Span::new(start, self.pos),
                    );
                }
            }
        } else if self.at_block_start() {
            let node = if self.rest().starts_with("@let")
                && !self
                    .peek_at(4)
                    .is_some_and(|n| n.is_ascii_alphanumeric() || n == '_')
            {
                self.let_declaration()
            } else {
                self.block()
            };
            nodes.extend(node);
        } else {
            self.text_node(nodes);
        }
        false
    }

    fn skip_past(&mut self, needle: &str) {
        match self.rest().find(needle) {
            Some(index) => self.pos += index + needle.len(),
            None => self.pos = self.text.len(),
        }
    }

    // ============================================================
    // Text
    // ============================================================

    /// Text up to the next tag, block boundary, or end of input.
    fn text_node(&mut self, nodes: &mut Vec<Node>) {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if self.rest().starts_with("{{") {
                match find_interpolation_end(&self.rest()[2..]) {
                    Some(end) => self.pos += 2 + end + 2,
                    None => self.pos = self.text.len(),
                }
                continue;
            }
            // The first character is always consumed so a stray `<` makes progress.
            if self.pos > start && (c == '<' || c == '}' || self.at_block_start()) {
                break;
            }
            self.bump();
        }
        self.push_text(nodes, start, self.pos);
    }

    fn push_text(&mut self, nodes: &mut Vec<Node>, start: usize, end: usize) {
        let value = &self.text[start..end];
        if value.trim().is_empty() {
            return;
        }
        let span = Span::new(start, end);
        match parse_interpolation(value, start) {
            Ok(Some(expr)) => nodes.push(Node::BoundText(BoundText { value: expr, span })),
            Ok(None) => nodes.push(Node::Text(Text {
                value: value.to_string(),
                span,
            })),
            Err(err) => self.errors.push(err),
        }
    }

    fn comment(&mut self) -> Node {
        let start = self.pos;
        self.pos += "<!--".len();
        let content_start = self.pos;
        let content_end = match self.rest().find("-->") {
            Some(index) => {
                self.pos += index + "-->".len();
                content_start + index
            }
            None => {
                self.pos = self.text.len();
                self.error("Unterminated comment", Span::new(start, self.pos));
                self.pos
            }
        };
        Node::Comment(Comment {
            value: self.text[content_start..content_end].trim().to_string(),
            span: Span::new(start, self.pos),
        })
    }

    // ============================================================
    // Elements
    // ============================================================

    fn tag_name_end(&self, from: usize) -> usize {
        self.text[from..]
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/' || c == '<')
            .map(|i| from + i)
            .unwrap_or(self.text.len())
    }

    fn peek_closing_tag_name(&self) -> Option<String> {
        let from = self.pos + 2;
        let end = self.tag_name_end(from);
        let name = &self.text[from..end];
        (!name.is_empty()).then(|| name.to_string())
    }

    fn consume_closing_tag(&mut self) {
        self.skip_past(">");
    }

    fn element(&mut self) -> Node {
        let start = self.pos;
        self.bump();
        let name_end = self.tag_name_end(self.pos);
        let name = self.text[self.pos..name_end].to_string();
        self.pos = name_end;

        let mut element = Element {
            name: name.clone(),
            attributes: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            references: Vec::new(),
            variables: Vec::new(),
            template_bindings: Vec::new(),
            children: Vec::new(),
            span: Span::new(start, start),
        };

        let mut self_closing = false;
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => {
                    self.error(
                        format!("Unexpected end of input in tag <{}>", name),
                        Span::new(start, self.pos),
                    );
                    break;
                }
                Some('>') => {
                    self.bump();
                    break;
                }
                Some('/') if self.peek_at(1) == Some('>') => {
                    self.pos += 2;
                    self_closing = true;
                    break;
                }
                Some('/') => {
                    self.bump();
                }
                Some(_) => self.attribute(&mut element),
            }
        }

        let lower = name.to_ascii_lowercase();
        if self_closing || VOID_ELEMENTS.contains(&lower.as_str()) {
            element.span = Span::new(start, self.pos);
            return Node::Element(element);
        }

        if RAW_TEXT_ELEMENTS.contains(&lower.as_str())
            || ESCAPABLE_RAW_TEXT_ELEMENTS.contains(&lower.as_str())
        {
            let content_start = self.pos;
            let content_end = self.find_raw_text_end(&lower);
            if ESCAPABLE_RAW_TEXT_ELEMENTS.contains(&lower.as_str()) {
                self.push_text(&mut element.children, content_start, content_end);
            } else if !self.text[content_start..content_end].trim().is_empty() {
                element.children.push(Node::Text(Text {
                    value: self.text[content_start..content_end].to_string(),
                    span: Span::new(content_start, content_end),
                }));
            }
            self.pos = content_end;
            if self.pos < self.text.len() {
                self.consume_closing_tag();
            }
            element.span = Span::new(start, self.pos);
            return Node::Element(element);
        }

        self.stack.push(Frame::Element(name));
        element.children = self.parse_nodes();
        self.stack.pop();
        element.span = Span::new(start, self.pos);
        Node::Element(element)
    }

    fn find_raw_text_end(&self, name: &str) -> usize {
        let closing = format!("</{}", name);
        let lower_rest = self.rest().to_ascii_lowercase();
        match lower_rest.find(&closing) {
            Some(index) => self.pos + index,
            None => self.text.len(),
        }
    }

    fn attribute(&mut self, element: &mut Element) {
        let start = self.pos;
        // `[`/`(` delimited names may contain characters that end plain names.
        let name_end = self.text[self.pos..]
            .find(|c: char| {
                c.is_whitespace() || c == '=' || c == '>' || c == '<' || c == '"' || c == '\''
            })
            .map(|i| self.pos + i)
            .unwrap_or(self.text.len());
        let mut name_end = name_end;
        // `/` only ends a name when it starts `/>`.
        if let Some(slash) = self.text[self.pos..name_end].find("/>") {
            name_end = self.pos + slash;
        }
        if name_end == self.pos {
            self.bump();
            self.error("Unexpected character in tag", Span::new(start, self.pos));
            return;
        }
        let name = self.text[start..name_end].to_string();
        let name_span = Span::new(start, name_end);
        self.pos = name_end;

        let mut value = String::new();
        let mut value_offset = self.pos;
        let mut has_value = false;
        let save = self.pos;
        self.skip_whitespace();
        if self.peek() == Some('=') {
            self.bump();
            self.skip_whitespace();
            has_value = true;
            match self.peek() {
                Some(quote @ ('"' | '\'')) => {
                    self.bump();
                    value_offset = self.pos;
                    match self.rest().find(quote) {
                        Some(index) => {
                            value = self.text[self.pos..self.pos + index].to_string();
                            self.pos += index + 1;
                        }
                        None => {
                            value = self.rest().to_string();
                            self.pos = self.text.len();
                            self.error("Unterminated attribute value", Span::new(start, self.pos));
                        }
                    }
                }
                _ => {
                    value_offset = self.pos;
                    let end = self.text[self.pos..]
                        .find(|c: char| c.is_whitespace() || c == '>')
                        .map(|i| self.pos + i)
                        .unwrap_or(self.text.len());
                    value = self.text[self.pos..end].to_string();
                    self.pos = end;
                }
            }
        } else {
            self.pos = save;
        }
        let span = Span::new(start, self.pos);
        self.classify_attribute(element, &name, name_span, &value, value_offset, has_value, span);
    }

    #[allow(clippy::too_many_arguments)]
    fn classify_attribute(
        &mut self,
        element: &mut Element,
        name: &str,
        name_span: Span,
        value: &str,
        value_offset: usize,
        has_value: bool,
        span: Span,
    ) {
        let bracketed = |open: &str, close: &str| {
            name.strip_prefix(open)
                .and_then(|inner| inner.strip_suffix(close))
                .map(str::to_string)
        };

        if let Some(directive) = name.strip_prefix('*') {
            let key_span = Span::new(name_span.start + 1, name_span.end);
            match parse_template_bindings(directive, key_span, value, value_offset) {
                Ok(bindings) => element.template_bindings = bindings,
                Err(err) => self.errors.push(err),
            }
            return;
        }

        if let Some(target) = bracketed("[(", ")]").or_else(|| name.strip_prefix("bindon-").map(str::to_string)) {
            if let Some(expr) = self.binding(value, value_offset) {
                element.inputs.push(BoundAttribute {
                    name: target,
                    kind: BindingKind::TwoWay,
                    value: expr,
                    span,
                });
            }
            return;
        }

        if let Some(target) = bracketed("[", "]").or_else(|| name.strip_prefix("bind-").map(str::to_string)) {
            let (target, kind) = match target.strip_prefix('@') {
                Some(trigger) => (trigger.to_string(), BindingKind::Animation),
                None => (target, BindingKind::Property),
            };
            if let Some(expr) = self.binding(value, value_offset) {
                element.inputs.push(BoundAttribute {
                    name: target,
                    kind,
                    value: expr,
                    span,
                });
            }
            return;
        }

        if let Some(event) = bracketed("(", ")").or_else(|| name.strip_prefix("on-").map(str::to_string)) {
            match parse_action(value, value_offset) {
                Ok(handler) => element.outputs.push(BoundEvent {
                    name: event,
                    handler,
                    span,
                }),
                Err(err) => self.errors.push(err),
            }
            return;
        }

        if let Some(reference) = name.strip_prefix('#').or_else(|| name.strip_prefix("ref-")) {
            element.references.push(Reference {
                name: reference.to_string(),
                value: value.to_string(),
                span,
            });
            return;
        }

        if let Some(variable) = name.strip_prefix("let-") {
            element.variables.push(Variable {
                name: variable.to_string(),
                value: if value.is_empty() {
                    "$implicit".to_string()
                } else {
                    value.to_string()
                },
                span,
            });
            return;
        }

        if let Some(trigger) = name.strip_prefix('@') {
            let expr = if has_value && !value.trim().is_empty() {
                self.binding(value, value_offset)
            } else {
                Some(Expr::new(ExprKind::Empty, Span::empty(value_offset)))
            };
            if let Some(expr) = expr {
                element.inputs.push(BoundAttribute {
                    name: trigger.to_string(),
                    kind: BindingKind::Animation,
                    value: expr,
                    span,
                });
            }
            return;
        }

        match parse_interpolation(value, value_offset) {
            Ok(Some(expr)) => element.inputs.push(BoundAttribute {
                name: name.to_string(),
                kind: BindingKind::Property,
                value: expr,
                span,
            }),
            Ok(None) => element.attributes.push(TextAttribute {
                name: name.to_string(),
                value: value.to_string(),
                span,
            }),
            Err(err) => self.errors.push(err),
        }
    }

    fn binding(&mut self, value: &str, offset: usize) -> Option<Expr> {
        match parse_binding(value, offset) {
            Ok(expr) => Some(expr),
            Err(err) => {
                self.errors.push(err);
                None
            }
        }
    }

    // ============================================================
    // Blocks
    // ============================================================

    /// Name following `@`. `else if` is a single name.
    fn block_name(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.bump();
        }
        let mut name = self.text[start..self.pos].to_string();
        if name == "else" {
            let save = self.pos;
            self.skip_whitespace();
            if self.rest().starts_with("if")
                && !self
                    .peek_at(2)
                    .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                self.pos += 2;
                name = "else if".to_string();
            } else {
                self.pos = save;
            }
        }
        name
    }

    /// Parameters between parentheses, split on top-level `;`.
    fn block_params(&mut self) -> Result<Vec<BlockParam>, TemplateError> {
        let open = self.pos;
        self.bump();
        let mut params = Vec::new();
        let mut param_start = self.pos;
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        while let Some(c) = self.peek() {
            match quote {
                Some(q) => {
                    if c == '\\' {
                        self.bump();
                    } else if c == q {
                        quote = None;
                    }
                }
                None => match c {
                    '"' | '\'' | '`' => quote = Some(c),
                    '(' | '[' | '{' => depth += 1,
                    ')' if depth == 0 => {
                        push_param(&mut params, &self.text[param_start..self.pos], param_start);
                        self.bump();
                        return Ok(params);
                    }
                    ')' | ']' | '}' => depth = depth.saturating_sub(1),
                    ';' if depth == 0 => {
                        push_param(&mut params, &self.text[param_start..self.pos], param_start);
                        self.bump();
                        param_start = self.pos;
                        continue;
                    }
                    _ => {}
                },
            }
            self.bump();
        }
        Err(TemplateError::new(
            "Unclosed block parameters",
            Span::new(open, self.text.len()),
        ))
    }

    /// `@name (params) { children }`, with the cursor on `@`.
    fn raw_block(&mut self) -> Option<RawBlock> {
        let start = self.pos;
        self.bump();
        let name = self.block_name();
        self.skip_whitespace();
        let mut params = Vec::new();
        if self.peek() == Some('(') {
            match self.block_params() {
                Ok(parsed) => params = parsed,
                Err(err) => {
                    self.errors.push(err);
                    return None;
                }
            }
            self.skip_whitespace();
        }
        if self.peek() != Some('{') {
            self.error(
                format!(
                    "Incomplete block \"{}\". If you meant to write the @ character, you should use the \"&#64;\" HTML entity instead.",
                    name
                ),
                Span::new(start, self.pos),
            );
            return None;
        }
        self.bump();
        self.stack.push(Frame::Block(name.clone()));
        let (children, cases) = if name == "switch" {
            (Vec::new(), self.switch_body())
        } else {
            (self.parse_nodes(), Vec::new())
        };
        self.stack.pop();
        Some(RawBlock {
            name,
            params,
            children,
            cases,
            span: Span::new(start, self.pos),
        })
    }

    /// Body of a `@switch`: only `@case` and `@default` blocks and comments.
    fn switch_body(&mut self) -> Vec<RawBlock> {
        let mut cases = Vec::new();
        loop {
            self.skip_whitespace();
            let start = self.pos;
            if self.at_block_start() {
                self.bump();
                let name = self.block_name();
                self.pos = start;
                if name == "case" || name == "default" {
                    cases.extend(self.raw_block());
                    continue;
                }
            }
            let mut stray = Vec::new();
            let done = self.parse_node(&mut stray);
            if stray.iter().any(|node| !matches!(node, Node::Comment(_))) {
                self.error(
                    "@switch block can only contain @case and @default blocks",
                    Span::new(start, self.pos),
                );
            }
            if done {
                return cases;
            }
        }
    }

    /// The next block, if it is one of `names` and only whitespace precedes it.
    fn connected_block(&mut self, names: &[&str]) -> Option<RawBlock> {
        let save = self.pos;
        self.skip_whitespace();
        if self.at_block_start() {
            let name_start = self.pos;
            self.bump();
            let name = self.block_name();
            self.pos = name_start;
            if names.contains(&name.as_str()) {
                return self.raw_block();
            }
        }
        self.pos = save;
        None
    }

    fn block(&mut self) -> Option<Node> {
        let block = self.raw_block()?;
        let start = block.span.start;
        let node = match block.name.as_str() {
            "if" => self.if_block(block),
            "for" => self.for_block(block),
            "switch" => self.switch_block(block),
            "defer" => self.defer_block(block),
            "else" | "else if" | "empty" | "case" | "default" | "placeholder" | "loading"
            | "error" => {
                self.error(
                    format!("Unexpected @{} block", block.name),
                    Span::new(start, start + 1 + block.name.len()),
                );
                return None;
            }
            other => {
                self.error(
                    format!("Unrecognized block @{}", other),
                    Span::new(start, start + 1 + other.len()),
                );
                return None;
            }
        };
        node.map(Node::Block)
    }

    fn expression_param(&mut self, param: &BlockParam) -> Option<Expr> {
        self.binding(&param.text, param.offset)
    }

    fn if_block(&mut self, first: RawBlock) -> Option<Block> {
        let start = first.span.start;
        let mut branches = Vec::new();
        let mut end = first.span.end;
        let mut current = Some(first);
        while let Some(raw) = current.take() {
            end = raw.span.end;
            let is_else = raw.name == "else";
            let condition = match raw.params.first() {
                Some(param) if !is_else => self.expression_param(param),
                None if !is_else => {
                    self.error(
                        format!("@{} block must have at least one parameter", raw.name),
                        raw.span,
                    );
                    None
                }
                _ => None,
            };
            let mut alias = None;
            for param in raw.params.iter().skip(1) {
                match IF_ALIAS.captures(&param.text) {
                    Some(captures) if raw.name == "if" => {
                        alias = Some(Variable {
                            name: captures[1].to_string(),
                            value: "$implicit".to_string(),
                            span: Span::new(param.offset, param.offset + param.text.len()),
                        });
                    }
                    _ => self.error(
                        format!("Unrecognized @{} block parameter", raw.name),
                        Span::new(param.offset, param.offset + param.text.len()),
                    ),
                }
            }
            branches.push(IfBranch {
                condition,
                alias,
                children: raw.children,
                span: raw.span,
            });
            if !is_else {
                current = self.connected_block(&["else", "else if"]);
            }
        }
        Some(Block::If(IfBlock {
            branches,
            span: Span::new(start, end),
        }))
    }

    fn for_block(&mut self, raw: RawBlock) -> Option<Block> {
        let Some(first) = raw.params.first() else {
            self.error("@for loop does not have an expression", raw.span);
            return None;
        };
        let Some(captures) = FOR_LOOP_EXPRESSION.captures(&first.text) else {
            self.error(
                "Cannot parse expression. @for loop expression must match the pattern \"<identifier> of <expression>\"",
                Span::new(first.offset, first.offset + first.text.len()),
            );
            return None;
        };
        let item_match = captures.get(1)?;
        let expr_match = captures.get(2)?;
        let item = Variable {
            name: item_match.as_str().to_string(),
            value: "$implicit".to_string(),
            span: Span::new(first.offset + item_match.start(), first.offset + item_match.end()),
        };
        let expression = self.binding(expr_match.as_str(), first.offset + expr_match.start())?;

        let mut track = None;
        let mut context_variables = Vec::new();
        for param in raw.params.iter().skip(1) {
            let param_span = Span::new(param.offset, param.offset + param.text.len());
            if let Some(captures) = FOR_TRACK.captures(&param.text) {
                if track.is_some() {
                    self.error("@for loop can only have one \"track\" expression", param_span);
                }
                let Some(body) = captures.get(2) else {
                    continue;
                };
                track = self.binding(body.as_str(), param.offset + body.start());
            } else if let Some(captures) = FOR_LET.captures(&param.text) {
                let Some(list) = captures.get(1) else {
                    continue;
                };
                let mut item_offset = param.offset + list.start();
                for part in list.as_str().split(',') {
                    let part_span = Span::new(item_offset, item_offset + part.len());
                    item_offset += part.len() + 1;
                    match FOR_LET_ITEM.captures(part) {
                        Some(c) if FOR_CONTEXT_VARIABLES.contains(&&c[2]) => {
                            context_variables.push(Variable {
                                name: c[1].to_string(),
                                value: c[2].to_string(),
                                span: part_span,
                            })
                        }
                        Some(c) => self.error(
                            format!(
                                "Unknown context variable \"{}\" in @for loop. The allowed variables are: {}",
                                &c[2],
                                FOR_CONTEXT_VARIABLES.join(", ")
                            ),
                            part_span,
                        ),
                        None => self.error(
                            "Invalid @for loop \"let\" parameter. Parameter should match the pattern \"<name> = <variable name>\"",
                            part_span,
                        ),
                    }
                }
            } else {
                self.error("Unrecognized @for loop parameter", param_span);
            }
        }
        if track.is_none() {
            self.error("@for loop must have a \"track\" expression", raw.span);
        }

        let mut span = raw.span;
        let empty = self.connected_block(&["empty"]).map(|block| {
            span.end = block.span.end;
            block.children
        });
        Some(Block::For(ForBlock {
            item,
            expression,
            track,
            context_variables,
            children: raw.children,
            empty,
            span,
        }))
    }

    fn switch_block(&mut self, raw: RawBlock) -> Option<Block> {
        let Some(first) = raw.params.first() else {
            self.error("@switch block must have exactly one parameter", raw.span);
            return None;
        };
        let expression = self.expression_param(first)?;
        let mut cases = Vec::new();
        for case in raw.cases {
            let expression = match (case.name.as_str(), case.params.first()) {
                ("case", Some(param)) => match self.expression_param(param) {
                    Some(expr) => Some(expr),
                    None => continue,
                },
                ("case", None) => {
                    self.error("@case block must have exactly one parameter", case.span);
                    continue;
                }
                _ => None,
            };
            cases.push(SwitchCase {
                expression,
                children: case.children,
                span: case.span,
            });
        }
        Some(Block::Switch(SwitchBlock {
            expression,
            cases,
            span: raw.span,
        }))
    }

    fn defer_block(&mut self, raw: RawBlock) -> Option<Block> {
        let mut triggers = Vec::new();
        for param in &raw.params {
            if let Some(captures) = DEFER_WHEN.captures(&param.text)
                && let Some(body) = captures.get(2)
                && let Some(expr) = self.binding(body.as_str(), param.offset + body.start())
            {
                triggers.push(expr);
            }
        }
        let mut block = DeferBlock {
            triggers,
            children: raw.children,
            placeholder: None,
            loading: None,
            error: None,
            span: raw.span,
        };
        while let Some(connected) = self.connected_block(&["placeholder", "loading", "error"]) {
            block.span.end = connected.span.end;
            let slot = match connected.name.as_str() {
                "placeholder" => &mut block.placeholder,
                "loading" => &mut block.loading,
                _ => &mut block.error,
            };
            if slot.is_some() {
                self.error(
                    format!("@defer block can only have one @{} block", connected.name),
                    connected.span,
                );
            }
            *slot = Some(connected.children);
        }
        Some(Block::Defer(block))
    }

    /// `@let name = expr;`, with the cursor on `@`.
    fn let_declaration(&mut self) -> Option<Node> {
        let start = self.pos;
        self.pos += "@let".len();
        let Some(captures) = LET_DECLARATION.captures(self.rest()) else {
            self.skip_past(";");
            self.error("Invalid @let declaration", Span::new(start, self.pos));
            return None;
        };
        let name_match = captures.get(2)?;
        let name = name_match.as_str().to_string();
        let name_span = Span::new(self.pos + name_match.start(), self.pos + name_match.end());
        self.pos += captures.get(0)?.end();
        let value_start = self.pos;
        let Some(value_end) = find_statement_end(self.rest()).map(|i| value_start + i) else {
            self.pos = self.text.len();
            self.error("Unterminated @let declaration", Span::new(start, self.pos));
            return None;
        };
        self.pos = value_end + 1;
        let text = self.text;
        let value = self.binding(&text[value_start..value_end], value_start)?;
        Some(Node::LetDeclaration(LetDeclaration {
            name,
            name_span,
            value,
            span: Span::new(start, self.pos),
        }))
    }
}

fn push_param(params: &mut Vec<BlockParam>, text: &str, offset: usize) {
    if text.trim().is_empty() {
        return;
    }
    params.push(BlockParam {
        text: text.to_string(),
        offset,
    });
}

/// Index of the `;` ending a statement, skipping strings and brackets.
fn find_statement_end(text: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ';' if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(text: &str) -> Vec<Node> {
        let (nodes, errors) = parse_markup(text);
        assert_eq!(errors, vec![], "unexpected errors for {:?}", text);
        nodes
    }

    fn messages(text: &str) -> Vec<String> {
        parse_markup(text).1.into_iter().map(|e| e.message).collect()
    }

    fn element(node: &Node) -> &Element {
        match node {
            Node::Element(element) => element,
            other => panic!("expected element, got {:?}", other),
        }
    }

    #[test]
    fn interpolation_in_text_has_absolute_spans() {
        let nodes = parse("<p>Hi {{ flags['x'] }}</p>");
        let p = element(&nodes[0]);
        let Node::BoundText(text) = &p.children[0] else {
            panic!("expected bound text");
        };
        assert_eq!(text.span, Span::new(3, 22));
        let ExprKind::Interpolation { exprs, .. } = &text.value.kind else {
            panic!("expected interpolation");
        };
        let ExprKind::KeyedRead { key, .. } = &exprs[0].kind else {
            panic!("expected keyed read");
        };
        assert_eq!(key.span, Span::new(15, 18));
    }

    #[test]
    fn attribute_kinds() {
        let nodes = parse(
            r#"<input #box class="a" [value]="v" bind-title="t" (input)="x = $event" on-blur="b()" [(ngModel)]="m" [@fade]="f" title="{{ t }}">"#,
        );
        let input = element(&nodes[0]);
        assert_eq!(input.references[0].name, "box");
        assert_eq!(input.attributes[0].name, "class");
        let inputs: Vec<_> = input.inputs.iter().map(|i| (i.name.as_str(), i.kind)).collect();
        assert_eq!(
            inputs,
            vec![
                ("value", BindingKind::Property),
                ("title", BindingKind::Property),
                ("ngModel", BindingKind::TwoWay),
                ("fade", BindingKind::Animation),
                ("title", BindingKind::Property),
            ]
        );
        let outputs: Vec<_> = input.outputs.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(outputs, vec!["input", "blur"]);
    }

    #[test]
    fn binding_value_offset_points_inside_quotes() {
        let nodes = parse(r#"<a [href]="flags['x']"></a>"#);
        let a = element(&nodes[0]);
        assert_eq!(a.inputs[0].value.span, Span::new(11, 21));
    }

    #[test]
    fn structural_directive_and_template_variables() {
        let nodes = parse(
            r#"<li *ngFor="let f of flags; index as i">{{ i }}</li><ng-template let-item let-n="index"></ng-template>"#,
        );
        let li = element(&nodes[0]);
        assert_eq!(li.template_bindings.len(), 4);
        let template = element(&nodes[1]);
        assert!(template.is_ng_template());
        let vars: Vec<_> = template
            .variables
            .iter()
            .map(|v| (v.name.as_str(), v.value.as_str()))
            .collect();
        assert_eq!(vars, vec![("item", "$implicit"), ("n", "index")]);
    }

    #[test]
    fn void_and_self_closing_elements_have_no_children() {
        let nodes = parse("<br><app-x /><p>t</p>");
        assert_eq!(nodes.len(), 3);
        assert!(element(&nodes[0]).children.is_empty());
        assert!(element(&nodes[1]).children.is_empty());
    }

    #[test]
    fn raw_text_is_not_parsed() {
        let nodes = parse("<script>if (a < b) { x('}}') }</script>");
        let script = element(&nodes[0]);
        assert!(matches!(&script.children[0], Node::Text(t) if t.value.contains("a < b")));
    }

    #[test]
    fn interpolation_braces_do_not_close_blocks() {
        let nodes = parse("@if (a) { {{ {x: 1}['x'] }} }");
        let Node::Block(Block::If(block)) = &nodes[0] else {
            panic!("expected @if");
        };
        assert!(matches!(block.branches[0].children[0], Node::BoundText(_)));
    }

    #[test]
    fn if_chain_with_alias() {
        let nodes = parse("@if (user$ | async; as user) { a } @else if (b) { b } @else { c }");
        let Node::Block(Block::If(block)) = &nodes[0] else {
            panic!("expected @if");
        };
        assert_eq!(block.branches.len(), 3);
        assert_eq!(block.branches[0].alias.as_ref().map(|v| v.name.as_str()), Some("user"));
        assert!(block.branches[2].condition.is_none());
    }

    #[test]
    fn for_block_parts() {
        let nodes = parse(
            "@for (item of items; track item.id; let i = $index, odd = $odd) { {{ i }} } @empty { none }",
        );
        let Node::Block(Block::For(block)) = &nodes[0] else {
            panic!("expected @for");
        };
        assert_eq!(block.item.name, "item");
        assert_eq!(block.expression.span, Span::new(14, 19));
        assert!(block.track.is_some());
        let vars: Vec<_> = block
            .context_variables
            .iter()
            .map(|v| (v.name.as_str(), v.value.as_str()))
            .collect();
        assert_eq!(vars, vec![("i", "$index"), ("odd", "$odd")]);
        assert!(block.empty.is_some());
    }

    #[test]
    fn switch_cases() {
        let nodes = parse("@switch (k) { <!-- c --> @case ('a') { A } @default { D } }");
        let Node::Block(Block::Switch(block)) = &nodes[0] else {
            panic!("expected @switch");
        };
        assert_eq!(block.cases.len(), 2);
        assert!(block.cases[1].expression.is_none());
    }

    #[test]
    fn defer_sub_blocks() {
        let nodes = parse(
            "@defer (on viewport; prefetch when ready) { a } @placeholder (minimum 500ms) { p } @loading { l } @error { e }",
        );
        let Node::Block(Block::Defer(block)) = &nodes[0] else {
            panic!("expected @defer");
        };
        assert_eq!(block.triggers.len(), 1);
        assert!(block.placeholder.is_some() && block.loading.is_some() && block.error.is_some());
    }

    #[test]
    fn let_declaration() {
        let nodes = parse("@let beta = flags['beta'];");
        let Node::LetDeclaration(decl) = &nodes[0] else {
            panic!("expected @let");
        };
        assert_eq!(decl.name, "beta");
        assert_eq!(decl.name_span, Span::new(5, 9));
        assert_eq!(decl.value.span, Span::new(12, 25));
    }

    #[test]
    fn unclosed_element_closes_at_end_of_input() {
        let nodes = parse("<div><span>text");
        let div = element(&nodes[0]);
        assert_eq!(element(&div.children[0]).name, "span");
    }

    #[test]
    fn closing_an_ancestor_closes_open_children() {
        let nodes = parse("<div><p>one</div><b></b>");
        assert_eq!(nodes.len(), 2);
        assert_eq!(element(&element(&nodes[0]).children[0]).name, "p");
    }

    #[test]
    fn unclosed_block_is_an_error() {
        assert_eq!(messages("@if (a) { <p>x</p>"), vec!["Unclosed block \"if\""]);
    }

    #[test]
    fn stray_closing_tag_is_an_error() {
        assert_eq!(
            messages("<div></span></div>"),
            vec![
                "Unexpected closing tag \"span\". It may happen when the tag has already been closed by another tag."
            ]
        );
    }

    #[test]
    fn stray_closing_brace_is_an_error() {
        assert_eq!(messages("a } b").len(), 1);
    }

    #[test]
    fn for_without_track_is_an_error() {
        assert_eq!(
            messages("@for (x of xs) {}"),
            vec!["@for loop must have a \"track\" expression"]
        );
    }

    #[test]
    fn expression_errors_are_collected() {
        assert_eq!(messages(r#"<a [x]="a b" (y)="c | d"></a>"#).len(), 2);
    }
}
