//! Structural directive microsyntax: `*ngFor="let item of items; index as i"`.

use super::TemplateError;
use super::ast::{Span, TemplateBinding, Variable};
use super::expr::{ExprParser, ParseMode};
use super::lexer::tokenize;

/// Parse the value of a `*directive` attribute.
///
/// `directive` is the attribute name without `*`, `key_span` its position and
/// `offset` the position of `value`.
pub fn parse_template_bindings(
    directive: &str,
    key_span: Span,
    value: &str,
    offset: usize,
) -> Result<Vec<TemplateBinding>, TemplateError> {
    let tokens = tokenize(value, offset)?;
    let mut parser = MicrosyntaxParser {
        inner: ExprParser::new(value, offset, tokens, ParseMode::Binding),
        directive: directive.to_string(),
        bindings: Vec::new(),
    };
    parser.run(key_span)?;
    Ok(parser.bindings)
}

struct MicrosyntaxParser<'a> {
    inner: ExprParser<'a>,
    directive: String,
    bindings: Vec<TemplateBinding>,
}

impl MicrosyntaxParser<'_> {
    fn run(&mut self, key_span: Span) -> Result<(), TemplateError> {
        let directive = self.directive.clone();
        self.keyword_bindings(directive, key_span)?;
        while let Some(token) = self.inner.peek() {
            let start = token.span.start;
            if self.inner.consume_keyword("let") {
                self.let_binding(start)?;
            } else {
                let (key, key_span) = self.binding_key()?;
                if !self.as_binding(&key, start)? {
                    let prefixed = format!("{}{}", self.directive, capitalize(&key));
                    self.keyword_bindings(prefixed, key_span)?;
                }
            }
            self.statement_terminator();
        }
        Ok(())
    }

    /// `key[:] expr [as alias]`. The expression is absent for `key as alias`
    /// and at the end of input.
    fn keyword_bindings(&mut self, key: String, key_span: Span) -> Result<(), TemplateError> {
        self.inner.consume_character(':');
        let value = match self.inner.peek() {
            None => None,
            Some(t) if t.is_keyword("as") || t.is_keyword("let") => None,
            Some(_) => Some(self.inner.parse_pipe()?),
        };
        let span = Span::new(key_span.start, self.inner.last_end().max(key_span.end));
        self.bindings.push(TemplateBinding::Expression {
            key: key.clone(),
            value,
            span,
        });
        self.as_binding(&key, key_span.start)?;
        self.statement_terminator();
        Ok(())
    }

    /// `as alias`, binding `alias` to the context property `value`.
    fn as_binding(&mut self, value: &str, start: usize) -> Result<bool, TemplateError> {
        if !self.inner.consume_keyword("as") {
            return Ok(false);
        }
        let (name, _) = self.binding_key()?;
        self.bindings.push(TemplateBinding::Variable(Variable {
            name,
            value: value.to_string(),
            span: self.inner.span_from(start),
        }));
        self.statement_terminator();
        Ok(true)
    }

    /// `let name [= contextKey]`, after `let` was consumed.
    fn let_binding(&mut self, start: usize) -> Result<(), TemplateError> {
        let (name, _) = self.binding_key()?;
        let value = if self.inner.consume_operator("=") {
            self.binding_key()?.0
        } else {
            "$implicit".to_string()
        };
        self.bindings.push(TemplateBinding::Variable(Variable {
            name,
            value,
            span: self.inner.span_from(start),
        }));
        Ok(())
    }

    /// A key, which may contain dashes.
    fn binding_key(&mut self) -> Result<(String, Span), TemplateError> {
        let (mut key, span) = self.inner.expect_name()?;
        let mut end = span.end;
        while self
            .inner
            .peek()
            .is_some_and(|t| t.is_operator("-") && t.span.start == end)
        {
            self.inner.advance();
            let (part, part_span) = self.inner.expect_name()?;
            key.push('-');
            key.push_str(&part);
            end = part_span.end;
        }
        Ok((key, Span::new(span.start, end)))
    }

    fn statement_terminator(&mut self) {
        if !self.inner.consume_character(';') {
            self.inner.consume_character(',');
        }
    }
}

fn capitalize(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    /// `key=<source>` for expressions, `let name=value` for variables.
    fn summary(directive: &str, text: &str) -> Vec<String> {
        let key_span = Span::new(0, directive.len() + 1);
        let offset = key_span.end + 2;
        parse_template_bindings(directive, key_span, text, offset)
            .unwrap()
            .into_iter()
            .map(|binding| match binding {
                TemplateBinding::Expression {
                    key,
                    value: Some(expr),
                    ..
                } => format!(
                    "{}={}",
                    key,
                    &text[expr.span.start - offset..expr.span.end - offset]
                ),
                TemplateBinding::Expression { key, .. } => key,
                TemplateBinding::Variable(v) => format!("let {}={}", v.name, v.value),
            })
            .collect()
    }

    #[test]
    fn ng_for_with_index_and_track_by() {
        assert_eq!(
            summary("ngFor", "let item of items | async; index as i; trackBy: byId"),
            vec![
                "ngFor",
                "let item=$implicit",
                "ngForOf=items | async",
                "let i=index",
                "ngForTrackBy=byId",
            ]
        );
    }

    #[test]
    fn ng_if_with_alias_and_else() {
        assert_eq!(
            summary("ngIf", "flags$ | async as flags; else loading"),
            vec!["ngIf=flags$ | async", "let flags=ngIf", "ngIfElse=loading"]
        );
    }

    #[test]
    fn let_with_explicit_context_key() {
        assert_eq!(
            summary("ngFor", "let x of xs; let i = index"),
            vec!["ngFor", "let x=$implicit", "ngForOf=xs", "let i=index"]
        );
    }

    #[test]
    fn expression_offsets_are_absolute() {
        let bindings =
            parse_template_bindings("ngIf", Span::new(5, 10), "flags['a']", 12).unwrap();
        let TemplateBinding::Expression {
            value: Some(expr), ..
        } = &bindings[0]
        else {
            panic!("expected expression binding");
        };
        assert_eq!(expr.span, Span::new(12, 22));
    }
}
