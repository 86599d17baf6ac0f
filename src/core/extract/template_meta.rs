//! Locating the template of an `@Component` class.

use std::{fs, io, path::PathBuf};

use swc_common::Spanned;
use swc_ecma_ast::{Class, Expr, Lit, ObjectLit, Prop, PropName, PropOrSpread};
use tracing::debug;

use crate::core::checker::SourceUnit;
use crate::core::checker::program::normalize;
use crate::core::error::ExtractError;
use crate::core::flag_read::{EscapeMap, TemplateKind, TemplateMetadata};
use crate::core::resolve::literal_text;

pub const TEMPLATE: &str = "template";
pub const TEMPLATE_URL: &str = "templateUrl";

/// A class decorated with `@Component({...})`.
#[derive(Debug, Clone)]
pub struct ComponentDecl {
    pub class_name: String,
    /// The decorator's configuration object.
    pub config: ObjectLit,
}

impl ComponentDecl {
    /// The component declared by the class `name`, if it carries
    /// `@Component` with an object literal argument.
    pub fn from_class(class: &Class, name: &str) -> Option<Self> {
        class.decorators.iter().find_map(|decorator| {
            let Expr::Call(call) = &*decorator.expr else {
                return None;
            };
            let callee = call.callee.as_expr()?;
            let is_component = match &**callee {
                Expr::Ident(ident) => &*ident.sym == "Component",
                Expr::Member(member) => member
                    .prop
                    .as_ident()
                    .is_some_and(|prop| &*prop.sym == "Component"),
                _ => false,
            };
            if !is_component {
                return None;
            }
            let Expr::Object(config) = &*call.args.first()?.expr else {
                return None;
            };
            Some(Self {
                class_name: name.to_string(),
                config: config.clone(),
            })
        })
    }
}

/// Outcome of looking up a component's template.
#[derive(Debug)]
pub enum TemplateLookup {
    Found(TemplateMetadata),
    /// Neither `template` nor `templateUrl` is declared.
    Absent,
    /// The property value is not a string literal. `offset` is the value's
    /// position in the component file.
    Unsupported {
        property: &'static str,
        offset: usize,
    },
    /// `templateUrl` names a file that does not exist.
    Missing { path: PathBuf, offset: usize },
}

enum PropertyValue<'a> {
    Expr(&'a Expr),
    /// Shorthand and other forms that carry no value expression.
    Other(swc_common::Span),
}

fn find_property<'a>(config: &'a ObjectLit, name: &str) -> Option<PropertyValue<'a>> {
    config.props.iter().find_map(|prop| {
        let PropOrSpread::Prop(prop) = prop else {
            return None;
        };
        match &**prop {
            Prop::KeyValue(kv) => {
                let key = match &kv.key {
                    PropName::Ident(ident) => Some(ident.sym.to_string()),
                    PropName::Str(s) => s.value.as_str().map(str::to_string),
                    _ => None,
                };
                (key.as_deref() == Some(name)).then_some(PropertyValue::Expr(&kv.value))
            }
            Prop::Shorthand(ident) if &*ident.sym == name => Some(PropertyValue::Other(ident.span)),
            _ => None,
        }
    })
}

/// Find the template declared by `component` in `unit`.
///
/// Inline template text is decoded the way the TypeScript compiler reads the
/// literal. Its escape map leads template offsets back to the component file.
pub fn template_of(unit: &SourceUnit, component: &ComponentDecl) -> Result<TemplateLookup, ExtractError> {
    if let Some(value) = find_property(&component.config, TEMPLATE) {
        return Ok(inline_template(unit, value));
    }
    if let Some(value) = find_property(&component.config, TEMPLATE_URL) {
        return external_template(unit, value);
    }
    Ok(TemplateLookup::Absent)
}

fn inline_template(unit: &SourceUnit, value: PropertyValue<'_>) -> TemplateLookup {
    let expr = match value {
        PropertyValue::Expr(expr) => expr,
        PropertyValue::Other(span) => {
            return TemplateLookup::Unsupported {
                property: TEMPLATE,
                offset: unit.parsed.range(span).0,
            };
        }
    };
    let (start, end) = unit.parsed.range(expr.span());
    let is_literal = match expr {
        Expr::Lit(Lit::Str(_)) => true,
        Expr::Tpl(tpl) => tpl.exprs.is_empty(),
        _ => false,
    };
    // Both quote characters are one byte.
    let raw = is_literal
        .then(|| unit.text.get(start + 1..end.saturating_sub(1)))
        .flatten();
    match raw {
        Some(raw) => {
            let (content, escapes) = unescape(raw);
            TemplateLookup::Found(TemplateMetadata {
                kind: TemplateKind::Inline,
                path: unit.path.clone(),
                content,
                offset: start + 1,
                escapes,
            })
        }
        None => TemplateLookup::Unsupported {
            property: TEMPLATE,
            offset: start,
        },
    }
}

/// Decode the escape sequences of a string or template literal body.
fn unescape(raw: &str) -> (String, EscapeMap) {
    let mut out = String::with_capacity(raw.len());
    let mut escapes = EscapeMap::default();
    let mut pos = 0;
    while let Some(found) = raw[pos..].find('\\') {
        let start = pos + found;
        out.push_str(&raw[pos..start]);
        let (decoded, len) = decode_escape(&raw[start + 1..]);
        let before = out.len();
        out.extend(decoded);
        let consumed = 1 + len;
        escapes.push(out.len(), consumed.saturating_sub(out.len() - before));
        pos = start + consumed;
    }
    out.push_str(&raw[pos..]);
    (out, escapes)
}

/// The character encoded by the escape sequence at the start of `rest`, which
/// follows a backslash, and the sequence's length in bytes. Line
/// continuations encode no character.
fn decode_escape(rest: &str) -> (Option<char>, usize) {
    let Some(c) = rest.chars().next() else {
        return (Some('\\'), 0);
    };
    let decoded = match c {
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'b' => '\u{8}',
        'f' => '\u{c}',
        'v' => '\u{b}',
        '0' => '\0',
        'x' => match hex_value(rest.get(1..3)) {
            Some(code) => return (char::from_u32(code), 3),
            None => 'x',
        },
        'u' => match unicode_escape(rest) {
            Some(escape) => return escape,
            None => 'u',
        },
        '\r' if rest[1..].starts_with('\n') => return (None, 2),
        '\r' | '\n' | '\u{2028}' | '\u{2029}' => return (None, c.len_utf8()),
        other => other,
    };
    (Some(decoded), c.len_utf8())
}

/// `u{...}`, `uXXXX` or a `uXXXX\uXXXX` surrogate pair. Lone surrogates
/// decode to U+FFFD.
fn unicode_escape(rest: &str) -> Option<(Option<char>, usize)> {
    if rest[1..].starts_with('{') {
        let close = rest.find('}')?;
        let code = hex_value(rest.get(2..close))?;
        return Some((Some(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)), close + 1));
    }
    let high = hex_value(rest.get(1..5))?;
    if (0xD800..0xDC00).contains(&high)
        && rest.get(5..7) == Some("\\u")
        && let Some(low) = hex_value(rest.get(7..11))
        && (0xDC00..0xE000).contains(&low)
    {
        let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
        return Some((char::from_u32(code), 11));
    }
    Some((Some(char::from_u32(high).unwrap_or(char::REPLACEMENT_CHARACTER)), 5))
}

fn hex_value(digits: Option<&str>) -> Option<u32> {
    let digits = digits?;
    if digits.is_empty() || digits.len() > 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

fn external_template(unit: &SourceUnit, value: PropertyValue<'_>) -> Result<TemplateLookup, ExtractError> {
    let (expr, offset) = match value {
        PropertyValue::Expr(expr) => (expr, unit.parsed.range(expr.span()).0),
        PropertyValue::Other(span) => {
            return Ok(TemplateLookup::Unsupported {
                property: TEMPLATE_URL,
                offset: unit.parsed.range(span).0,
            });
        }
    };
    let Some(url) = literal_text(expr) else {
        return Ok(TemplateLookup::Unsupported {
            property: TEMPLATE_URL,
            offset,
        });
    };

    let path = normalize(&unit.dir().join(&url));
    match fs::read_to_string(&path) {
        Ok(content) => {
            debug!(component = %unit.path.display(), template = %path.display(), "read external template");
            Ok(TemplateLookup::Found(TemplateMetadata {
                kind: TemplateKind::External,
                path,
                content,
                offset: 0,
                escapes: EscapeMap::default(),
            }))
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(TemplateLookup::Missing { path, offset }),
        Err(source) => Err(ExtractError::TemplateRead {
            component: unit.path.clone(),
            path,
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::{path::Path, rc::Rc};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::core::checker::program::Decl;
    use crate::core::checker::{Checker, UnitKind};

    fn unit(checker: &Checker, path: &Path, code: &str) -> Rc<SourceUnit> {
        checker
            .program()
            .add_virtual(path.to_path_buf(), code.to_string(), UnitKind::Source)
            .unwrap()
    }

    fn component(unit: &SourceUnit, name: &str) -> ComponentDecl {
        let Some(Decl::Class(name, class)) = unit.find_decl(name) else {
            panic!("class {} not found", name);
        };
        ComponentDecl::from_class(class, name).unwrap()
    }

    fn lookup(code: &str) -> TemplateLookup {
        let checker = Checker::new();
        let unit = unit(&checker, Path::new("/virtual/a.component.ts"), code);
        template_of(&unit, &component(&unit, "AComponent")).unwrap()
    }

    #[test]
    fn inline_template_offset_points_at_first_character() {
        let code = "@Component({ template: '<p>{{ x }}</p>' })\nexport class AComponent {}\n";
        let TemplateLookup::Found(meta) = lookup(code) else {
            panic!("expected a template");
        };
        assert_eq!(meta.kind, TemplateKind::Inline);
        assert_eq!(meta.path, PathBuf::from("/virtual/a.component.ts"));
        assert_eq!(meta.content, "<p>{{ x }}</p>");
        assert_eq!(&code[meta.offset..meta.offset + 3], "<p>");
    }

    #[test]
    fn backtick_template_spans_lines() {
        let code = "@Component({\n  'template': `\n<p>{{ a }}</p>\n`\n})\nclass AComponent {}\n";
        let TemplateLookup::Found(meta) = lookup(code) else {
            panic!("expected a template");
        };
        assert_eq!(meta.content, "\n<p>{{ a }}</p>\n");
        assert_eq!(&code[meta.offset..meta.offset + meta.content.len()], meta.content);
    }

    #[test]
    fn escaped_quote_is_decoded() {
        let code = "@Component({ template: '<p>{{ flags[\\'beta\\'] }}</p>' })\nclass AComponent {}\n";
        let TemplateLookup::Found(meta) = lookup(code) else {
            panic!("expected a template");
        };
        assert_eq!(meta.content, "<p>{{ flags['beta'] }}</p>");
        let key = meta.content.find("'beta'").unwrap();
        assert_eq!(&code[meta.file_offset(key)..meta.file_offset(key) + 2], "\\'");
        let close = meta.content.find("}}").unwrap();
        assert_eq!(&code[meta.file_offset(close)..meta.file_offset(close) + 2], "}}");
    }

    #[test]
    fn unescape_decodes_literal_escapes() {
        let (text, escapes) = unescape(r"a\n\x41\u0042\u{43}\uD83D\uDE00\
z\q");
        assert_eq!(text, "a\nABC\u{1F600}zq");
        assert_eq!(escapes.to_source(text.find('z').unwrap()), r"a\n\x41\u0042\u{43}\uD83D\uDE00\".len() + 1);
        assert_eq!(escapes.to_source(text.len()), r"a\n\x41\u0042\u{43}\uD83D\uDE00\".len() + 4);
    }

    #[test]
    fn unescape_without_escapes_is_identity() {
        let (text, escapes) = unescape("<p>{{ flags['x'] }}</p>");
        assert_eq!(text, "<p>{{ flags['x'] }}</p>");
        assert_eq!(escapes, EscapeMap::default());
    }

    #[test]
    fn non_literal_template_is_unsupported() {
        let code = "const T = '<p></p>';\n@Component({ template: T })\nclass AComponent {}\n";
        let lookup = lookup(code);
        let TemplateLookup::Unsupported { property, offset } = lookup else {
            panic!("expected unsupported, got {:?}", lookup);
        };
        assert_eq!(property, TEMPLATE);
        assert_eq!(&code[offset..offset + 1], "T");
    }

    #[test]
    fn substituted_template_literal_is_unsupported() {
        let code = "const x = 1;\n@Component({ template: `<p>${x}</p>` })\nclass AComponent {}\n";
        assert!(matches!(
            lookup(code),
            TemplateLookup::Unsupported { property: TEMPLATE, .. }
        ));
    }

    #[test]
    fn component_without_template() {
        let code = "@Component({ selector: 'a' })\nclass AComponent {}\n";
        assert!(matches!(lookup(code), TemplateLookup::Absent));
    }

    #[test]
    fn qualified_decorator_is_recognized() {
        let code = "import * as ng from '@angular/core';\n@ng.Component({ template: '' })\nclass AComponent {}\n";
        assert!(matches!(lookup(code), TemplateLookup::Found(_)));
    }

    #[test]
    fn other_decorators_are_not_components() {
        let checker = Checker::new();
        let unit = unit(
            &checker,
            Path::new("/virtual/a.ts"),
            "@Injectable({ providedIn: 'root' })\nclass AService {}\n",
        );
        let Some(Decl::Class(name, class)) = unit.find_decl("AService") else {
            panic!("class not found");
        };
        assert!(ComponentDecl::from_class(class, name).is_none());
    }

    #[test]
    fn external_template_resolves_against_the_component_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("views")).unwrap();
        fs::write(dir.path().join("views/a.component.html"), "<p></p>").unwrap();
        let checker = Checker::new();
        let unit = unit(
            &checker,
            &dir.path().join("a.component.ts"),
            "@Component({ templateUrl: './views/../views/a.component.html' })\nclass AComponent {}\n",
        );
        let TemplateLookup::Found(meta) = template_of(&unit, &component(&unit, "AComponent")).unwrap()
        else {
            panic!("expected a template");
        };
        assert_eq!(meta.kind, TemplateKind::External);
        assert_eq!(meta.path, dir.path().join("views/a.component.html"));
        assert_eq!(meta.content, "<p></p>");
        assert_eq!(meta.offset, 0);
    }

    #[test]
    fn missing_external_template() {
        let dir = tempfile::tempdir().unwrap();
        let checker = Checker::new();
        let unit = unit(
            &checker,
            &dir.path().join("a.component.ts"),
            "@Component({ templateUrl: './gone.html' })\nclass AComponent {}\n",
        );
        let lookup = template_of(&unit, &component(&unit, "AComponent")).unwrap();
        let TemplateLookup::Missing { path, .. } = lookup else {
            panic!("expected missing, got {:?}", lookup);
        };
        assert_eq!(path, dir.path().join("gone.html"));
    }

    #[test]
    fn unreadable_external_template_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("a.component.html")).unwrap();
        let checker = Checker::new();
        let unit = unit(
            &checker,
            &dir.path().join("a.component.ts"),
            "@Component({ templateUrl: './a.component.html' })\nclass AComponent {}\n",
        );
        let err = template_of(&unit, &component(&unit, "AComponent")).unwrap_err();
        let ExtractError::TemplateRead { component, .. } = err else {
            panic!("expected a read error, got {:?}", err);
        };
        assert_eq!(component, dir.path().join("a.component.ts"));
    }
}
