//! Rendering of parse trees for display and debugging.

use crate::fa::TypeTag;
use crate::node::Ast;

/// Multi-line indented rendering with spans.
pub fn format_node<T: TypeTag, X>(node: &Ast<'_, T, X>, indent: usize) -> String {
    let mut out = String::new();
    write_node(node, indent, &mut out);
    out
}

fn write_node<T: TypeTag, X>(node: &Ast<'_, T, X>, indent: usize, out: &mut String) {
    let pad = "  ".repeat(indent);
    match node {
        Ast::Empty { tag } => {
            out.push_str(&format!("{}{} (empty)\n", pad, tag.name()));
        }
        Ast::Char { ch, end, .. } => {
            out.push_str(&format!("{}'{}' @{}\n", pad, escape(*ch), *end - 1));
        }
        Ast::Branch { tag, children, span } => {
            out.push_str(&format!("{}{} @{}..{}\n", pad, tag.name(), span.start, span.end));
            for child in *children {
                write_node(child, indent + 1, out);
            }
        }
        Ast::PreParsed { name, span, .. } => {
            out.push_str(&format!("{}<{}> @{}..{}\n", pad, name, span.start, span.end));
        }
    }
}

/// Compact s-expression rendering: `(S 'a' (A ...))` for branches, `'c'`
/// for character leaves, `<Name>` for pre-parsed spans, and the bare tag
/// name for empty nodes.
pub fn ast_to_string<T: TypeTag, X>(node: &Ast<'_, T, X>) -> String {
    match node {
        Ast::Empty { tag } => tag.name().to_string(),
        Ast::Char { ch, .. } => format!("'{}'", escape(*ch)),
        Ast::Branch { tag, children, .. } => {
            let mut parts = vec![tag.name().to_string()];
            for child in *children {
                parts.push(ast_to_string(child));
            }
            format!("({})", parts.join(" "))
        }
        Ast::PreParsed { name, .. } => format!("<{}>", name),
    }
}

/// Concatenation of every character leaf under `node`, in source order.
pub fn collect_text<T: TypeTag, X>(node: &Ast<'_, T, X>) -> String {
    let mut out = String::new();
    collect_into(node, &mut out);
    out
}

fn collect_into<T: TypeTag, X>(node: &Ast<'_, T, X>, out: &mut String) {
    match node {
        Ast::Char { ch, .. } => out.push(*ch),
        Ast::Branch { children, .. } => {
            for child in *children {
                collect_into(child, out);
            }
        }
        _ => {}
    }
}

fn escape(c: char) -> String {
    match c {
        '\n' => "\\n".to_string(),
        '\r' => "\\r".to_string(),
        '\t' => "\\t".to_string(),
        _ => c.to_string(),
    }
}
