//! Read-only traversal of templates.
//!
//! Override the `visit_*` methods of interest and call the matching `walk_*`
//! function to continue into children.

use super::ast::*;

pub trait Visitor {
    fn visit_nodes(&mut self, nodes: &[Node]) {
        for node in nodes {
            self.visit_node(node);
        }
    }

    fn visit_node(&mut self, node: &Node) {
        walk_node(self, node);
    }

    fn visit_element(&mut self, element: &Element) {
        walk_element(self, element);
    }

    fn visit_block(&mut self, block: &Block) {
        walk_block(self, block);
    }

    fn visit_let_declaration(&mut self, decl: &LetDeclaration) {
        self.visit_expr(&decl.value);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }
}

pub fn walk_node<V: Visitor + ?Sized>(visitor: &mut V, node: &Node) {
    match node {
        Node::Element(element) => visitor.visit_element(element),
        Node::BoundText(text) => visitor.visit_expr(&text.value),
        Node::Block(block) => visitor.visit_block(block),
        Node::LetDeclaration(decl) => visitor.visit_let_declaration(decl),
        Node::Text(_) | Node::Comment(_) => {}
    }
}

pub fn walk_element<V: Visitor + ?Sized>(visitor: &mut V, element: &Element) {
    for binding in &element.template_bindings {
        if let TemplateBinding::Expression {
            value: Some(value), ..
        } = binding
        {
            visitor.visit_expr(value);
        }
    }
    for input in &element.inputs {
        visitor.visit_expr(&input.value);
    }
    for output in &element.outputs {
        visitor.visit_expr(&output.handler);
    }
    visitor.visit_nodes(&element.children);
}

pub fn walk_block<V: Visitor + ?Sized>(visitor: &mut V, block: &Block) {
    match block {
        Block::If(block) => {
            for branch in &block.branches {
                if let Some(condition) = &branch.condition {
                    visitor.visit_expr(condition);
                }
                visitor.visit_nodes(&branch.children);
            }
        }
        Block::For(block) => {
            visitor.visit_expr(&block.expression);
            if let Some(track) = &block.track {
                visitor.visit_expr(track);
            }
            visitor.visit_nodes(&block.children);
            if let Some(empty) = &block.empty {
                visitor.visit_nodes(empty);
            }
        }
        Block::Switch(block) => {
            visitor.visit_expr(&block.expression);
            for case in &block.cases {
                if let Some(expression) = &case.expression {
                    visitor.visit_expr(expression);
                }
                visitor.visit_nodes(&case.children);
            }
        }
        Block::Defer(block) => {
            for trigger in &block.triggers {
                visitor.visit_expr(trigger);
            }
            visitor.visit_nodes(&block.children);
            for nodes in [&block.placeholder, &block.loading, &block.error]
                .into_iter()
                .flatten()
            {
                visitor.visit_nodes(nodes);
            }
        }
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, expr: &Expr) {
    match &expr.kind {
        ExprKind::Empty
        | ExprKind::ImplicitReceiver
        | ExprKind::ThisReceiver
        | ExprKind::Literal(_) => {}
        ExprKind::PropertyRead { receiver, .. } | ExprKind::SafePropertyRead { receiver, .. } => {
            visitor.visit_expr(receiver);
        }
        ExprKind::KeyedRead { receiver, key } | ExprKind::SafeKeyedRead { receiver, key } => {
            visitor.visit_expr(receiver);
            visitor.visit_expr(key);
        }
        ExprKind::Call { receiver, args } | ExprKind::SafeCall { receiver, args } => {
            visitor.visit_expr(receiver);
            for arg in args {
                visitor.visit_expr(arg);
            }
        }
        ExprKind::Array(items) | ExprKind::Chain(items) => {
            for item in items {
                visitor.visit_expr(item);
            }
        }
        ExprKind::Map(entries) => {
            for entry in entries {
                visitor.visit_expr(&entry.value);
            }
        }
        ExprKind::Unary { expr, .. } | ExprKind::NonNull(expr) | ExprKind::Parenthesized(expr) => {
            visitor.visit_expr(expr);
        }
        ExprKind::Binary { left, right, .. } => {
            visitor.visit_expr(left);
            visitor.visit_expr(right);
        }
        ExprKind::Conditional {
            condition,
            when_true,
            when_false,
        } => {
            visitor.visit_expr(condition);
            visitor.visit_expr(when_true);
            visitor.visit_expr(when_false);
        }
        ExprKind::Pipe { expr, args, .. } => {
            visitor.visit_expr(expr);
            for arg in args {
                visitor.visit_expr(arg);
            }
        }
        ExprKind::Assign { target, value } => {
            visitor.visit_expr(target);
            visitor.visit_expr(value);
        }
        ExprKind::Interpolation { exprs, .. } | ExprKind::TemplateLiteral { exprs, .. } => {
            for expr in exprs {
                visitor.visit_expr(expr);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::core::template::parse_template;

    /// Collects the names of every property read, in visiting order.
    #[derive(Default)]
    struct Reads(Vec<String>);

    impl Visitor for Reads {
        fn visit_expr(&mut self, expr: &Expr) {
            if let ExprKind::PropertyRead { name, .. } = &expr.kind {
                self.0.push(name.clone());
            }
            walk_expr(self, expr);
        }
    }

    fn reads(text: &str) -> Vec<String> {
        let template = parse_template(text).unwrap();
        let mut visitor = Reads::default();
        visitor.visit_nodes(&template.nodes);
        visitor.0
    }

    #[test]
    fn visits_every_binding_context() {
        let names = reads(
            r#"<div *ngIf="a" [x]="b" (click)="c()" title="{{ d }}">{{ e }}</div>
@let f = g;
@if (h) { {{ i }} } @else if (j) { {{ k }} } @else { {{ l }} }
@for (item of m; track n) { {{ o }} } @empty { {{ p }} }
@switch (q) { @case (r) { {{ s }} } @default { {{ t }} } }
@defer (when u) { {{ v }} } @placeholder { {{ w }} } @loading { {{ x }} } @error { {{ y }} }"#,
        );
        assert_eq!(
            names,
            [
                "a", "b", "d", "c", "e", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q",
                "r", "s", "t", "u", "v", "w", "x", "y"
            ]
        );
    }
}
