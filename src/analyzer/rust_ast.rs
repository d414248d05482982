//! String literals in Rust source, found with `syn`.

use syn::punctuated::Punctuated;
use syn::visit::{self, Visit};
use syn::{Attribute, Expr, LitStr, Macro, Token};

use super::{SourceNode, offset_of};
use crate::query::HostNode;

/// Visitor collecting every `"..."` and `r#"..."#` literal.
struct LiteralVisitor<'s> {
    source: &'s str,
    literals: Vec<SourceNode>,
}

impl<'s> LiteralVisitor<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            literals: Vec::new(),
        }
    }

    fn record(&mut self, lit: &LitStr) {
        let span = lit.span();
        let (start, end) = (span.start(), span.end());
        let range = offset_of(self.source, start.line, start.column)
            .zip(offset_of(self.source, end.line, end.column))
            .map(|(s, e)| s..e);

        let token = match &range {
            Some(range) => self.source[range.clone()].to_string(),
            None => lit.token().to_string(),
        };
        self.literals.push(SourceNode {
            node: HostNode::string_literal(lit.value(), token),
            line: Some(start.line),
            range,
        });
    }
}

impl<'ast> Visit<'ast> for LiteralVisitor<'_> {
    fn visit_lit_str(&mut self, lit: &'ast LitStr) {
        self.record(lit);
    }

    // Doc comments surface as `#[doc = "..."]`.
    fn visit_attribute(&mut self, _attr: &'ast Attribute) {}

    // Macro bodies are opaque to syn; most query macros take plain expressions.
    fn visit_macro(&mut self, mac: &'ast Macro) {
        if let Ok(args) = mac.parse_body_with(Punctuated::<Expr, Token![,]>::parse_terminated) {
            for arg in &args {
                visit::visit_expr(self, arg);
            }
        }
    }
}

/// Every string literal in `source`, in source order.
pub fn string_literals(source: &str) -> Result<Vec<SourceNode>, syn::Error> {
    let syntax = syn::parse_file(source)?;
    let mut visitor = LiteralVisitor::new(source);
    visitor.visit_file(&syntax);
    Ok(visitor.literals)
}
