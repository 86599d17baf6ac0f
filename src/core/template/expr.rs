//! Parser for template expressions.
//!
//! Bindings (`[x]="..."`, `{{ ... }}`) allow pipes and forbid assignments;
//! actions (`(x)="..."`) allow assignments and `;` chains and forbid pipes.

use super::TemplateError;
use super::ast::{Expr, ExprKind, Literal, MapEntry, Span, UnaryOp};
use super::lexer::{Token, TokenKind, tokenize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Binding,
    Action,
}

/// Parse a binding expression. `offset` is the position of `text` in the template.
pub fn parse_binding(text: &str, offset: usize) -> Result<Expr, TemplateError> {
    parse_complete(text, offset, ParseMode::Binding)
}

/// Parse an event handler.
pub fn parse_action(text: &str, offset: usize) -> Result<Expr, TemplateError> {
    parse_complete(text, offset, ParseMode::Action)
}

fn parse_complete(text: &str, offset: usize, mode: ParseMode) -> Result<Expr, TemplateError> {
    let tokens = tokenize(text, offset)?;
    let mut parser = ExprParser::new(text, offset, tokens, mode);
    let expr = parser.parse_chain()?;
    if let Some(token) = parser.peek() {
        return Err(parser.unexpected(token));
    }
    Ok(expr)
}

/// Parse `{{ a }} text {{ b }}`. Returns `None` when `text` has no interpolation.
pub fn parse_interpolation(text: &str, offset: usize) -> Result<Option<Expr>, TemplateError> {
    let mut strings = Vec::new();
    let mut exprs = Vec::new();
    let mut pos = 0;
    let mut literal = String::new();
    while let Some(open) = text[pos..].find("{{") {
        let open = pos + open;
        literal.push_str(&text[pos..open]);
        let inner_start = open + 2;
        let Some(close) = find_interpolation_end(&text[inner_start..]) else {
            return Err(TemplateError::new(
                "Missing closing interpolation `}}`",
                Span::new(offset + open, offset + text.len()),
            ));
        };
        let inner_end = inner_start + close;
        strings.push(std::mem::take(&mut literal));
        let inner = &text[inner_start..inner_end];
        if inner.trim().is_empty() {
            return Err(TemplateError::new(
                "Blank expressions are not allowed in interpolated strings",
                Span::new(offset + open, offset + inner_end + 2),
            ));
        }
        exprs.push(parse_binding(inner, offset + inner_start)?);
        pos = inner_end + 2;
    }
    if exprs.is_empty() {
        return Ok(None);
    }
    literal.push_str(&text[pos..]);
    strings.push(literal);
    Ok(Some(Expr::new(
        ExprKind::Interpolation { strings, exprs },
        Span::new(offset, offset + text.len()),
    )))
}

/// Byte index of the `}}` ending an interpolation, skipping quoted strings.
pub(super) fn find_interpolation_end(text: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None => {
                if c == '\'' || c == '"' || c == '`' {
                    quote = Some(c);
                } else if text[i..].starts_with("}}") {
                    return Some(i);
                }
            }
        }
    }
    None
}

pub(super) struct ExprParser<'a> {
    text: &'a str,
    offset: usize,
    tokens: Vec<Token>,
    index: usize,
    mode: ParseMode,
}

impl<'a> ExprParser<'a> {
    pub(super) fn new(text: &'a str, offset: usize, tokens: Vec<Token>, mode: ParseMode) -> Self {
        Self {
            text,
            offset,
            tokens,
            index: 0,
            mode,
        }
    }

    pub(super) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    pub(super) fn peek_at(&self, skip: usize) -> Option<&Token> {
        self.tokens.get(self.index + skip)
    }

    pub(super) fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).cloned();
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    /// Start of the next token, or the end of the input.
    pub(super) fn input_index(&self) -> usize {
        self.peek()
            .map(|t| t.span.start)
            .unwrap_or(self.offset + self.text.len())
    }

    /// End of the last consumed token.
    pub(super) fn last_end(&self) -> usize {
        self.index
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|t| t.span.end)
            .unwrap_or(self.offset)
    }

    pub(super) fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.last_end().max(start))
    }

    pub(super) fn unexpected(&self, token: &Token) -> TemplateError {
        let text = &self.text[token.span.start - self.offset..token.span.end - self.offset];
        TemplateError::new(format!("Unexpected token '{}'", text), token.span)
    }

    fn end_of_input(&self) -> TemplateError {
        TemplateError::new(
            "Unexpected end of expression",
            Span::empty(self.offset + self.text.len()),
        )
    }

    pub(super) fn consume_character(&mut self, c: char) -> bool {
        if self.peek().is_some_and(|t| t.is_character(c)) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    pub(super) fn consume_operator(&mut self, op: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_operator(op)) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    pub(super) fn consume_keyword(&mut self, keyword: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_keyword(keyword)) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn expect_character(&mut self, c: char) -> Result<(), TemplateError> {
        if self.consume_character(c) {
            return Ok(());
        }
        match self.peek() {
            Some(token) => Err(TemplateError::new(
                format!("Missing expected {}", c),
                token.span,
            )),
            None => Err(TemplateError::new(
                format!("Missing expected {}", c),
                Span::empty(self.offset + self.text.len()),
            )),
        }
    }

    /// An identifier or keyword usable as a name.
    pub(super) fn expect_name(&mut self) -> Result<(String, Span), TemplateError> {
        match self.peek() {
            Some(token) => match token.as_name() {
                Some(name) => {
                    let result = (name.to_string(), token.span);
                    self.index += 1;
                    Ok(result)
                }
                None => Err(TemplateError::new(
                    format!(
                        "Unexpected {}, expected identifier or keyword",
                        &self.text[token.span.start - self.offset..token.span.end - self.offset]
                    ),
                    token.span,
                )),
            },
            None => Err(self.end_of_input()),
        }
    }

    pub(super) fn parse_chain(&mut self) -> Result<Expr, TemplateError> {
        let start = self.input_index();
        let mut exprs = Vec::new();
        while self.peek().is_some() {
            exprs.push(self.parse_pipe()?);
            if self.consume_character(';') {
                if self.mode == ParseMode::Binding {
                    return Err(TemplateError::new(
                        "Binding expression cannot contain chained expression",
                        self.span_from(start),
                    ));
                }
                while self.consume_character(';') {}
            } else if let Some(token) = self.peek() {
                return Err(self.unexpected(token));
            }
        }
        Ok(match exprs.len() {
            0 => Expr::new(ExprKind::Empty, Span::empty(start)),
            1 => exprs.remove(0),
            _ => Expr::new(ExprKind::Chain(exprs), self.span_from(start)),
        })
    }

    pub(super) fn parse_pipe(&mut self) -> Result<Expr, TemplateError> {
        let start = self.input_index();
        let mut result = self.parse_expression()?;
        while self.consume_operator("|") {
            if self.mode == ParseMode::Action {
                return Err(TemplateError::new(
                    "Cannot have a pipe in an action expression",
                    self.span_from(start),
                ));
            }
            let (name, name_span) = self.expect_name()?;
            let mut args = Vec::new();
            while self.consume_character(':') {
                args.push(self.parse_expression()?);
            }
            result = Expr::new(
                ExprKind::Pipe {
                    expr: Box::new(result),
                    name,
                    name_span,
                    args,
                },
                self.span_from(start),
            );
        }
        Ok(result)
    }

    pub(super) fn parse_expression(&mut self) -> Result<Expr, TemplateError> {
        self.parse_conditional()
    }

    fn parse_conditional(&mut self) -> Result<Expr, TemplateError> {
        let start = self.input_index();
        let condition = self.parse_logical_or()?;
        if !self.consume_operator("?") {
            return Ok(condition);
        }
        let when_true = self.parse_pipe()?;
        self.expect_character(':')?;
        let when_false = self.parse_pipe()?;
        Ok(Expr::new(
            ExprKind::Conditional {
                condition: Box::new(condition),
                when_true: Box::new(when_true),
                when_false: Box::new(when_false),
            },
            self.span_from(start),
        ))
    }

    fn binary_level(
        &mut self,
        ops: &[&str],
        next: fn(&mut Self) -> Result<Expr, TemplateError>,
    ) -> Result<Expr, TemplateError> {
        let start = self.input_index();
        let mut result = next(self)?;
        loop {
            let Some(op) = ops.iter().find(|op| self.peek().is_some_and(|t| t.is_operator(op)))
            else {
                break;
            };
            self.index += 1;
            let right = next(self)?;
            result = Expr::new(
                ExprKind::Binary {
                    op: op.to_string(),
                    left: Box::new(result),
                    right: Box::new(right),
                },
                self.span_from(start),
            );
        }
        Ok(result)
    }

    fn parse_logical_or(&mut self) -> Result<Expr, TemplateError> {
        self.binary_level(&["||"], Self::parse_logical_and)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, TemplateError> {
        self.binary_level(&["&&"], Self::parse_nullish_coalescing)
    }

    fn parse_nullish_coalescing(&mut self) -> Result<Expr, TemplateError> {
        self.binary_level(&["??"], Self::parse_equality)
    }

    fn parse_equality(&mut self) -> Result<Expr, TemplateError> {
        self.binary_level(&["===", "!==", "==", "!="], Self::parse_relational)
    }

    fn parse_relational(&mut self) -> Result<Expr, TemplateError> {
        let start = self.input_index();
        let mut result = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(t) if t.is_keyword("in") => "in",
                Some(t) => match ["<=", ">=", "<", ">"].iter().find(|op| t.is_operator(op)) {
                    Some(op) => *op,
                    None => break,
                },
                None => break,
            };
            self.index += 1;
            let right = self.parse_additive()?;
            result = Expr::new(
                ExprKind::Binary {
                    op: op.to_string(),
                    left: Box::new(result),
                    right: Box::new(right),
                },
                self.span_from(start),
            );
        }
        Ok(result)
    }

    fn parse_additive(&mut self) -> Result<Expr, TemplateError> {
        self.binary_level(&["+", "-"], Self::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, TemplateError> {
        self.binary_level(&["*", "%", "/"], Self::parse_exponentiation)
    }

    fn parse_exponentiation(&mut self) -> Result<Expr, TemplateError> {
        let start = self.input_index();
        let base = self.parse_prefix()?;
        if !self.consume_operator("**") {
            return Ok(base);
        }
        // Right associative.
        let exponent = self.parse_exponentiation()?;
        Ok(Expr::new(
            ExprKind::Binary {
                op: "**".to_string(),
                left: Box::new(base),
                right: Box::new(exponent),
            },
            self.span_from(start),
        ))
    }

    fn parse_prefix(&mut self) -> Result<Expr, TemplateError> {
        let start = self.input_index();
        let op = match self.peek() {
            Some(t) if t.is_operator("+") => Some(UnaryOp::Plus),
            Some(t) if t.is_operator("-") => Some(UnaryOp::Minus),
            Some(t) if t.is_operator("!") => Some(UnaryOp::Not),
            Some(t) if t.is_keyword("typeof") => Some(UnaryOp::TypeOf),
            Some(t) if t.is_keyword("void") => Some(UnaryOp::Void),
            _ => None,
        };
        let Some(op) = op else {
            return self.parse_call_chain();
        };
        self.index += 1;
        let expr = self.parse_prefix()?;
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                expr: Box::new(expr),
            },
            self.span_from(start),
        ))
    }

    fn parse_call_chain(&mut self) -> Result<Expr, TemplateError> {
        let start = self.input_index();
        let mut result = self.parse_primary()?;
        loop {
            if self.consume_character('.') {
                result = self.parse_access_member(result, start, false)?;
            } else if self.consume_operator("?.") {
                if self.consume_character('(') {
                    result = self.parse_call(result, start, true)?;
                } else if self.consume_character('[') {
                    result = self.parse_keyed(result, start, true)?;
                } else {
                    result = self.parse_access_member(result, start, true)?;
                }
            } else if self.consume_character('[') {
                result = self.parse_keyed(result, start, false)?;
            } else if self.consume_character('(') {
                result = self.parse_call(result, start, false)?;
            } else if self.peek().is_some_and(|t| t.is_operator("!"))
                && !self.peek_at(1).is_some_and(|t| t.is_operator("="))
                && self.is_postfix_position()
            {
                self.index += 1;
                result = Expr::new(ExprKind::NonNull(Box::new(result)), self.span_from(start));
            } else {
                return Ok(result);
            }
        }
    }

    /// Whether a `!` at the current token directly follows an operand, making
    /// it a non-null assertion rather than a prefix not.
    fn is_postfix_position(&self) -> bool {
        self.index > 0
            && self
                .tokens
                .get(self.index - 1)
                .is_some_and(|prev| prev.span.end == self.tokens[self.index].span.start)
    }

    fn parse_access_member(&mut self, receiver: Expr, start: usize, safe: bool) -> Result<Expr, TemplateError> {
        let (name, name_span) = self.expect_name()?;
        let kind = if safe {
            ExprKind::SafePropertyRead {
                receiver: Box::new(receiver),
                name,
                name_span,
            }
        } else {
            ExprKind::PropertyRead {
                receiver: Box::new(receiver),
                name,
                name_span,
            }
        };
        let read = Expr::new(kind, self.span_from(start));
        if !safe {
            return self.parse_assignment(read, start);
        }
        Ok(read)
    }

    fn parse_keyed(&mut self, receiver: Expr, start: usize, safe: bool) -> Result<Expr, TemplateError> {
        let key = self.parse_pipe()?;
        self.expect_character(']')?;
        let kind = if safe {
            ExprKind::SafeKeyedRead {
                receiver: Box::new(receiver),
                key: Box::new(key),
            }
        } else {
            ExprKind::KeyedRead {
                receiver: Box::new(receiver),
                key: Box::new(key),
            }
        };
        let read = Expr::new(kind, self.span_from(start));
        if !safe {
            return self.parse_assignment(read, start);
        }
        Ok(read)
    }

    /// `target = value` after a property or keyed read.
    fn parse_assignment(&mut self, target: Expr, start: usize) -> Result<Expr, TemplateError> {
        if !self.consume_operator("=") {
            return Ok(target);
        }
        if self.mode == ParseMode::Binding {
            return Err(TemplateError::new(
                "Bindings cannot contain assignments",
                self.span_from(start),
            ));
        }
        let value = self.parse_conditional()?;
        Ok(Expr::new(
            ExprKind::Assign {
                target: Box::new(target),
                value: Box::new(value),
            },
            self.span_from(start),
        ))
    }

    fn parse_call(&mut self, receiver: Expr, start: usize, safe: bool) -> Result<Expr, TemplateError> {
        let mut args = Vec::new();
        if !self.consume_character(')') {
            loop {
                args.push(self.parse_pipe()?);
                if !self.consume_character(',') {
                    break;
                }
            }
            self.expect_character(')')?;
        }
        let kind = if safe {
            ExprKind::SafeCall {
                receiver: Box::new(receiver),
                args,
            }
        } else {
            ExprKind::Call {
                receiver: Box::new(receiver),
                args,
            }
        };
        Ok(Expr::new(kind, self.span_from(start)))
    }

    fn parse_primary(&mut self) -> Result<Expr, TemplateError> {
        let start = self.input_index();
        let Some(token) = self.peek().cloned() else {
            return Err(self.end_of_input());
        };
        let literal = |value| ExprKind::Literal(value);
        let kind = match &token.kind {
            TokenKind::Character('(') => {
                self.index += 1;
                let inner = self.parse_pipe()?;
                self.expect_character(')')?;
                ExprKind::Parenthesized(Box::new(inner))
            }
            TokenKind::Character('[') => {
                self.index += 1;
                let mut elements = Vec::new();
                if !self.consume_character(']') {
                    loop {
                        elements.push(self.parse_pipe()?);
                        if !self.consume_character(',') {
                            break;
                        }
                    }
                    self.expect_character(']')?;
                }
                ExprKind::Array(elements)
            }
            TokenKind::Character('{') => {
                self.index += 1;
                ExprKind::Map(self.parse_map_entries()?)
            }
            TokenKind::Keyword("null") => {
                self.index += 1;
                literal(Literal::Null)
            }
            TokenKind::Keyword("undefined") => {
                self.index += 1;
                literal(Literal::Undefined)
            }
            TokenKind::Keyword("true") => {
                self.index += 1;
                literal(Literal::Boolean(true))
            }
            TokenKind::Keyword("false") => {
                self.index += 1;
                literal(Literal::Boolean(false))
            }
            TokenKind::Keyword("this") => {
                self.index += 1;
                ExprKind::ThisReceiver
            }
            TokenKind::Number(n) => {
                self.index += 1;
                literal(Literal::Number(*n))
            }
            TokenKind::String(s) => {
                self.index += 1;
                literal(Literal::String(s.clone()))
            }
            TokenKind::Template { quasis, exprs } => {
                self.index += 1;
                let exprs = exprs
                    .iter()
                    .map(|span| {
                        let text = &self.text[span.start - self.offset..span.end - self.offset];
                        parse_complete(text, span.start, self.mode)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                ExprKind::TemplateLiteral {
                    quasis: quasis.clone(),
                    exprs,
                }
            }
            TokenKind::Identifier(_) | TokenKind::Keyword(_) => {
                let (name, name_span) = self.expect_name()?;
                let receiver = Expr::new(ExprKind::ImplicitReceiver, Span::empty(start));
                let read = Expr::new(
                    ExprKind::PropertyRead {
                        receiver: Box::new(receiver),
                        name,
                        name_span,
                    },
                    self.span_from(start),
                );
                return self.parse_assignment(read, start);
            }
            _ => return Err(self.unexpected(&token)),
        };
        Ok(Expr::new(kind, self.span_from(start)))
    }

    fn parse_map_entries(&mut self) -> Result<Vec<MapEntry>, TemplateError> {
        let mut entries = Vec::new();
        if self.consume_character('}') {
            return Ok(entries);
        }
        loop {
            let Some(token) = self.peek().cloned() else {
                return Err(self.end_of_input());
            };
            let (key, quoted) = match &token.kind {
                TokenKind::String(s) => {
                    self.index += 1;
                    (s.clone(), true)
                }
                _ => (self.expect_name()?.0, false),
            };
            let value = if self.consume_character(':') {
                self.parse_pipe()?
            } else {
                // Shorthand `{ a }` reads `a` from the component.
                let receiver = Expr::new(ExprKind::ImplicitReceiver, Span::empty(token.span.start));
                Expr::new(
                    ExprKind::PropertyRead {
                        receiver: Box::new(receiver),
                        name: key.clone(),
                        name_span: token.span,
                    },
                    token.span,
                )
            };
            entries.push(MapEntry { key, quoted, value });
            if !self.consume_character(',') {
                break;
            }
        }
        self.expect_character('}')?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    /// Compact rendering of an expression tree for assertions.
    fn render(expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Empty => "<empty>".into(),
            ExprKind::ImplicitReceiver => "".into(),
            ExprKind::ThisReceiver => "this".into(),
            ExprKind::PropertyRead { receiver, name, .. } => match receiver.kind {
                ExprKind::ImplicitReceiver => name.clone(),
                _ => format!("{}.{}", render(receiver), name),
            },
            ExprKind::SafePropertyRead { receiver, name, .. } => {
                format!("{}?.{}", render(receiver), name)
            }
            ExprKind::KeyedRead { receiver, key } => format!("{}[{}]", render(receiver), render(key)),
            ExprKind::SafeKeyedRead { receiver, key } => {
                format!("{}?.[{}]", render(receiver), render(key))
            }
            ExprKind::Call { receiver, args } => format!(
                "{}({})",
                render(receiver),
                args.iter().map(render).collect::<Vec<_>>().join(", ")
            ),
            ExprKind::SafeCall { receiver, args } => format!(
                "{}?.({})",
                render(receiver),
                args.iter().map(render).collect::<Vec<_>>().join(", ")
            ),
            ExprKind::Literal(Literal::String(s)) => format!("'{}'", s),
            ExprKind::Literal(Literal::Number(n)) => n.to_string(),
            ExprKind::Literal(Literal::Boolean(b)) => b.to_string(),
            ExprKind::Literal(Literal::Null) => "null".into(),
            ExprKind::Literal(Literal::Undefined) => "undefined".into(),
            ExprKind::Array(items) => format!(
                "[{}]",
                items.iter().map(render).collect::<Vec<_>>().join(", ")
            ),
            ExprKind::Map(entries) => format!(
                "{{{}}}",
                entries
                    .iter()
                    .map(|e| format!("{}: {}", e.key, render(&e.value)))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            ExprKind::Unary { op, expr } => format!("{}{}", op.as_str(), render(expr)),
            ExprKind::Binary { op, left, right } => {
                format!("({} {} {})", render(left), op, render(right))
            }
            ExprKind::Conditional {
                condition,
                when_true,
                when_false,
            } => format!(
                "({} ? {} : {})",
                render(condition),
                render(when_true),
                render(when_false)
            ),
            ExprKind::Pipe {
                expr, name, args, ..
            } => {
                let mut out = format!("({} | {}", render(expr), name);
                for arg in args {
                    out.push_str(&format!(":{}", render(arg)));
                }
                out.push(')');
                out
            }
            ExprKind::NonNull(inner) => format!("{}!", render(inner)),
            ExprKind::Assign { target, value } => format!("{} = {}", render(target), render(value)),
            ExprKind::Chain(exprs) => exprs.iter().map(render).collect::<Vec<_>>().join("; "),
            ExprKind::Interpolation { exprs, .. } => exprs
                .iter()
                .map(|e| format!("{{{{{}}}}}", render(e)))
                .collect::<Vec<_>>()
                .join(""),
            ExprKind::TemplateLiteral { exprs, .. } => format!(
                "`{}`",
                exprs.iter().map(render).collect::<Vec<_>>().join(",")
            ),
            ExprKind::Parenthesized(inner) => format!("({})", render(inner)),
        }
    }

    fn binding(text: &str) -> String {
        render(&parse_binding(text, 0).unwrap())
    }

    #[test]
    fn keyed_read_spans() {
        let expr = parse_binding("flags['beta']", 7).unwrap();
        assert_eq!(expr.span, Span::new(7, 20));
        let ExprKind::KeyedRead { receiver, key } = &expr.kind else {
            panic!("expected keyed read, got {:?}", expr.kind);
        };
        assert_eq!(receiver.span, Span::new(7, 12));
        assert_eq!(key.span, Span::new(13, 19));
        assert_eq!(key.as_string_literal(), Some("beta"));
    }

    #[test]
    fn safe_navigation() {
        assert_eq!(binding("a?.b?.['c']"), "a?.b?.['c']");
        assert_eq!(binding("a?.()"), "a?.()");
    }

    #[test]
    fn precedence() {
        assert_eq!(binding("a || b && c"), "(a || (b && c))");
        assert_eq!(binding("a ?? b === c"), "(a ?? (b === c))");
        assert_eq!(binding("a + b * c"), "(a + (b * c))");
        assert_eq!(binding("a ? b : c ? d : e"), "(a ? b : (c ? d : e))");
        assert_eq!(binding("2 ** 3 ** 2"), "(2 ** (3 ** 2))");
    }

    #[test]
    fn pipes_with_arguments() {
        assert_eq!(binding("flags$ | async"), "(flags$ | async)");
        assert_eq!(binding("d | date:'short':tz"), "(d | date:'short':tz)");
    }

    #[test]
    fn non_null_and_not() {
        assert_eq!(binding("flags!['a']"), "flags!['a']");
        assert_eq!(binding("!flags['a']"), "!flags['a']");
    }

    #[test]
    fn literals_and_maps() {
        assert_eq!(binding("{a: 1, 'b-c': x, d}"), "{a: 1, b-c: x, d: d}");
        assert_eq!(binding("[1, 'x', null]"), "[1, 'x', null]");
    }

    #[test]
    fn calls_and_signals() {
        assert_eq!(binding("flags()['a']"), "flags()['a']");
        assert_eq!(binding("$any(x).y"), "$any(x).y");
    }

    #[test]
    fn template_literal_offsets() {
        let expr = parse_binding("`a${b}`", 3).unwrap();
        let ExprKind::TemplateLiteral { quasis, exprs } = &expr.kind else {
            panic!("expected template literal");
        };
        assert_eq!(quasis, &vec!["a".to_string(), String::new()]);
        assert_eq!(exprs[0].span, Span::new(7, 8));
    }

    #[test]
    fn actions_allow_assignment_and_chains() {
        let expr = parse_action("x = $event; save()", 0).unwrap();
        assert_eq!(render(&expr), "x = $event; save()");
    }

    #[test]
    fn bindings_reject_assignment() {
        let err = parse_binding("x = 1", 0).unwrap_err();
        assert_eq!(err.message, "Bindings cannot contain assignments");
    }

    #[test]
    fn actions_reject_pipes() {
        assert!(parse_action("x | async", 0).is_err());
    }

    #[test]
    fn interpolation_segments() {
        let expr = parse_interpolation("Hi {{ name }} and {{ flags['x'] }}!", 100)
            .unwrap()
            .unwrap();
        let ExprKind::Interpolation { strings, exprs } = &expr.kind else {
            panic!("expected interpolation");
        };
        assert_eq!(strings, &vec!["Hi ".to_string(), " and ".to_string(), "!".to_string()]);
        assert_eq!(exprs.len(), 2);
        assert_eq!(exprs[1].span, Span::new(121, 131));
    }

    #[test]
    fn interpolation_skips_braces_in_strings() {
        let expr = parse_interpolation("{{ '}}' + a }}", 0).unwrap().unwrap();
        let ExprKind::Interpolation { exprs, .. } = &expr.kind else {
            panic!("expected interpolation");
        };
        assert_eq!(render(&exprs[0]), "('}}' + a)");
    }

    #[test]
    fn plain_text_has_no_interpolation() {
        assert_eq!(parse_interpolation("just text", 0).unwrap(), None);
    }

    #[test]
    fn trailing_garbage_is_reported() {
        let err = parse_binding("a b", 0).unwrap_err();
        assert_eq!(err.message, "Unexpected token 'b'");
    }
}
