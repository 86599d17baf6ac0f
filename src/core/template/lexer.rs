//! Tokenizer for template expressions.

use super::TemplateError;
use super::ast::Span;

const KEYWORDS: &[&str] = &[
    "as", "else", "false", "if", "in", "let", "null", "this", "true", "typeof", "undefined",
    "void",
];

/// Operators, longest first.
const OPERATORS: &[&str] = &[
    "===", "!==", "**", "==", "!=", "<=", ">=", "&&", "||", "??", "?.", "+", "-", "*", "/", "%",
    "^", "=", "<", ">", "!", "?", "&", "|",
];

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    Keyword(&'static str),
    String(String),
    Number(f64),
    Operator(&'static str),
    Character(char),
    /// A template literal. `exprs` are the spans of the `${...}` contents.
    Template { quasis: Vec<String>, exprs: Vec<Span> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn is_character(&self, c: char) -> bool {
        self.kind == TokenKind::Character(c)
    }

    pub fn is_operator(&self, op: &str) -> bool {
        matches!(self.kind, TokenKind::Operator(o) if o == op)
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self.kind, TokenKind::Keyword(k) if k == keyword)
    }

    /// Identifier or keyword text, usable as a property name.
    pub fn as_name(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Identifier(name) => Some(name),
            TokenKind::Keyword(keyword) => Some(keyword),
            _ => None,
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Tokenize `text`, which starts at byte `offset` of the template.
pub fn tokenize(text: &str, offset: usize) -> Result<Vec<Token>, TemplateError> {
    Lexer {
        text,
        offset,
        pos: 0,
    }
    .run()
}

struct Lexer<'a> {
    text: &'a str,
    offset: usize,
    pos: usize,
}

impl Lexer<'_> {
    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn peek_at(&self, skip: usize) -> Option<char> {
        self.text[self.pos..].chars().nth(skip)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(self.offset + start, self.offset + self.pos)
    }

    fn error(&self, message: impl Into<String>, start: usize) -> TemplateError {
        TemplateError::new(message, self.span_from(start))
    }

    fn run(mut self) -> Result<Vec<Token>, TemplateError> {
        let mut tokens = Vec::new();
        while let Some(c) = self.peek() {
            let start = self.pos;
            if c.is_whitespace() {
                self.bump();
                continue;
            }
            let kind = if is_ident_start(c) {
                self.identifier()
            } else if c.is_ascii_digit()
                || (c == '.' && self.peek_at(1).is_some_and(|n| n.is_ascii_digit()))
            {
                self.number(start)?
            } else if c == '\'' || c == '"' {
                self.string(c, start)?
            } else if c == '`' {
                self.template(start)?
            } else if "()[]{},:;.".contains(c) {
                self.bump();
                TokenKind::Character(c)
            } else if let Some(op) = self.operator() {
                TokenKind::Operator(op)
            } else {
                self.bump();
                return Err(self.error(format!("Unexpected character [{}]", c), start));
            };
            tokens.push(Token {
                kind,
                span: self.span_from(start),
            });
        }
        Ok(tokens)
    }

    fn identifier(&mut self) -> TokenKind {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_part) {
            self.bump();
        }
        let text = &self.text[start..self.pos];
        match KEYWORDS.iter().find(|k| **k == text) {
            Some(keyword) => TokenKind::Keyword(*keyword),
            None => TokenKind::Identifier(text.to_string()),
        }
    }

    fn number(&mut self, start: usize) -> Result<TokenKind, TemplateError> {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '.' || c == '_' {
                self.bump();
            } else if c == 'e' || c == 'E' {
                self.bump();
                if matches!(self.peek(), Some('+' | '-')) {
                    self.bump();
                }
            } else {
                break;
            }
        }
        let text: String = self.text[start..self.pos].chars().filter(|c| *c != '_').collect();
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| self.error(format!("Invalid number {}", text), start))
    }

    fn escape(&mut self, start: usize) -> Result<char, TemplateError> {
        let Some(c) = self.bump() else {
            return Err(self.error("Unterminated quote", start));
        };
        Ok(match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            '0' => '\0',
            'u' => {
                let hex_start = self.pos;
                for _ in 0..4 {
                    self.bump();
                }
                let hex = self.text.get(hex_start..self.pos).unwrap_or_default();
                u32::from_str_radix(hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| self.error(format!("Invalid unicode escape [\\u{}]", hex), start))?
            }
            other => other,
        })
    }

    fn string(&mut self, quote: char, start: usize) -> Result<TokenKind, TemplateError> {
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("Unterminated quote", start)),
                Some(c) if c == quote => break,
                Some('\\') => value.push(self.escape(start)?),
                Some(c) => value.push(c),
            }
        }
        Ok(TokenKind::String(value))
    }

    fn template(&mut self, start: usize) -> Result<TokenKind, TemplateError> {
        self.bump();
        let mut quasis = Vec::new();
        let mut exprs = Vec::new();
        let mut current = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("Unterminated template literal", start)),
                Some('`') => break,
                Some('\\') => current.push(self.escape(start)?),
                Some('$') if self.peek() == Some('{') => {
                    self.bump();
                    quasis.push(std::mem::take(&mut current));
                    let expr_start = self.pos;
                    self.skip_interpolated(start)?;
                    exprs.push(Span::new(self.offset + expr_start, self.offset + self.pos));
                    self.bump();
                }
                Some(c) => current.push(c),
            }
        }
        quasis.push(current);
        Ok(TokenKind::Template { quasis, exprs })
    }

    /// Advance to the `}` closing a `${`, leaving it unconsumed.
    fn skip_interpolated(&mut self, start: usize) -> Result<(), TemplateError> {
        let mut depth = 0usize;
        while let Some(c) = self.peek() {
            match c {
                '}' if depth == 0 => return Ok(()),
                '}' => depth -= 1,
                '{' => depth += 1,
                '\'' | '"' => {
                    let quote_start = self.pos;
                    self.string(c, quote_start)?;
                    continue;
                }
                '`' => {
                    let quote_start = self.pos;
                    self.template(quote_start)?;
                    continue;
                }
                _ => {}
            }
            self.bump();
        }
        Err(self.error("Unterminated template literal", start))
    }

    fn operator(&mut self) -> Option<&'static str> {
        let rest = &self.text[self.pos..];
        let op = OPERATORS.iter().copied().find(|op| rest.starts_with(op))?;
        // `a?.5:b` is a conditional, not an optional chain.
        let op = if op == "?." && rest[2..].starts_with(|c: char| c.is_ascii_digit()) {
            "?"
        } else {
            op
        };
        self.pos += op.len();
        Some(op)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize(text, 0)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn keyed_read_tokens_with_offsets() {
        let tokens = tokenize("flags['beta']", 10).unwrap();
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0].kind, TokenKind::Identifier("flags".into()));
        assert_eq!(tokens[0].span, Span::new(10, 15));
        assert_eq!(tokens[2].kind, TokenKind::String("beta".into()));
        assert_eq!(tokens[2].span, Span::new(16, 22));
    }

    #[test]
    fn longest_operator_wins() {
        assert_eq!(
            kinds("a?.b ?? c !== d"),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::Operator("?."),
                TokenKind::Identifier("b".into()),
                TokenKind::Operator("??"),
                TokenKind::Identifier("c".into()),
                TokenKind::Operator("!=="),
                TokenKind::Identifier("d".into()),
            ]
        );
    }

    #[test]
    fn conditional_with_decimal_is_not_optional_chain() {
        assert_eq!(
            kinds("a?.5:b"),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::Operator("?"),
                TokenKind::Number(0.5),
                TokenKind::Character(':'),
                TokenKind::Identifier("b".into()),
            ]
        );
    }

    #[test]
    fn template_literal_parts() {
        let tokens = tokenize("`a${b}c`", 0).unwrap();
        assert_eq!(
            tokens[0].kind,
            TokenKind::Template {
                quasis: vec!["a".into(), "c".into()],
                exprs: vec![Span::new(4, 5)],
            }
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(kinds(r#"'it\'s'"#), vec![TokenKind::String("it's".into())]);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = tokenize("'abc", 3).unwrap_err();
        assert_eq!(err.message, "Unterminated quote");
        assert_eq!(err.span.start, 3);
    }
}
