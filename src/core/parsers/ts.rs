use std::collections::HashMap;
use std::sync::Arc;

use swc_common::{
    BytePos, FileName, GLOBALS, Globals, SourceMap, Span,
    comments::{Comment, SingleThreadedComments},
};
use swc_ecma_ast::Module;
use swc_ecma_parser::{Parser, StringInput, Syntax, TsSyntax};

/// Map of byte positions to comments.
pub type CommentMap = HashMap<BytePos, Vec<Comment>>;

/// Comments extracted from `SingleThreadedComments` during parsing and stored
/// independently of swc's lifetime.
#[derive(Debug, Clone, Default)]
pub struct ExtractedComments {
    pub leading: CommentMap,
    pub trailing: CommentMap,
}

impl ExtractedComments {
    /// Must be called before `SingleThreadedComments` is dropped.
    pub fn from_swc(comments: &SingleThreadedComments) -> Self {
        let (leading, trailing) = comments.borrow_all();
        Self {
            leading: leading.iter().map(|(k, v)| (*k, v.clone())).collect(),
            trailing: trailing.iter().map(|(k, v)| (*k, v.clone())).collect(),
        }
    }

    /// Trailing comments attached to the token ending at `pos`.
    pub fn trailing_at(&self, pos: BytePos) -> &[Comment] {
        self.trailing.get(&pos).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A parsed TypeScript file.
pub struct ParsedSource {
    pub module: Module,
    pub source_map: Arc<SourceMap>,
    pub comments: ExtractedComments,
    /// Position of the first byte of the file in `source_map`.
    pub start_pos: BytePos,
}

impl ParsedSource {
    /// Byte offset of `pos` relative to the start of the file.
    pub fn offset(&self, pos: BytePos) -> usize {
        (pos.0 - self.start_pos.0) as usize
    }

    /// `(start, end)` byte offsets of `span` relative to the start of the file.
    pub fn range(&self, span: Span) -> (usize, usize) {
        (self.offset(span.lo), self.offset(span.hi))
    }

    /// Absolute position of a file-relative byte offset.
    pub fn pos(&self, offset: usize) -> BytePos {
        BytePos(self.start_pos.0 + offset as u32)
    }
}

/// Parse TypeScript source code into an AST.
///
/// Decorators are always enabled; `.tsx` files additionally enable JSX and
/// `.d.ts` files are parsed in declaration mode.
pub fn parse_ts_source(code: String, file_path: &str) -> Result<ParsedSource, String> {
    let source_map: Arc<SourceMap> = Default::default();

    GLOBALS.set(&Globals::new(), || {
        let source_file = source_map.new_source_file(FileName::Real(file_path.into()).into(), code);

        let syntax = Syntax::Typescript(TsSyntax {
            tsx: file_path.ends_with(".tsx"),
            decorators: true,
            dts: file_path.ends_with(".d.ts"),
            ..Default::default()
        });

        let comments = SingleThreadedComments::default();
        let mut parser = Parser::new(syntax, StringInput::from(&*source_file), Some(&comments));

        let module = parser
            .parse_module()
            .map_err(|e| format!("{:?}", e))?;

        // Extract comments immediately (before SingleThreadedComments drops)
        let extracted_comments = ExtractedComments::from_swc(&comments);

        Ok(ParsedSource {
            module,
            start_pos: source_file.start_pos,
            source_map: source_map.clone(),
            comments: extracted_comments,
        })
    })
}

#[cfg(test)]
mod tests {
    use swc_ecma_ast::{Decl, ModuleItem, Stmt};

    use super::*;

    #[test]
    fn parses_decorated_class() {
        let code = r#"
            @Component({ selector: 'app-x', template: '' })
            export class XComponent {
                @Input() flags!: LDFlagSet;
            }
        "#;
        let parsed = parse_ts_source(code.to_string(), "/app/x.component.ts").unwrap();
        assert_eq!(parsed.module.body.len(), 1);
    }

    #[test]
    fn offsets_are_file_relative() {
        let code = "const a = 1;\nconst b = 2;";
        let parsed = parse_ts_source(code.to_string(), "/app/a.ts").unwrap();
        let ModuleItem::Stmt(Stmt::Decl(Decl::Var(var))) = &parsed.module.body[1] else {
            panic!("expected a variable declaration");
        };
        assert_eq!(parsed.range(var.span), (13, 25));
    }

    #[test]
    fn collects_trailing_comments() {
        let code = "(a.b /*3,7*/);";
        let parsed = parse_ts_source(code.to_string(), "/app/a.ngtypecheck.ts").unwrap();
        let comments = parsed.comments.trailing_at(parsed.pos(4));
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].text.as_str(), "3,7");
    }

    #[test]
    fn syntax_error_is_reported() {
        assert!(parse_ts_source("const = ;".to_string(), "/app/bad.ts").is_err());
    }
}
