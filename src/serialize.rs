//! HTML serialization of sanitized fragments.
//!
//! Text and attribute values are always escaped: raw-text elements (`script`,
//! `style`, ...) are in the drop-set, so nothing in a sanitized fragment is
//! ever written unescaped.

use crate::node::{Fragment, Node};
use crate::policy::VOID_ELEMENTS;

/// Elements whose first newline is swallowed by the parser.
const LEADING_NEWLINE_ELEMENTS: &[&str] = &["listing", "pre", "textarea"];

/// Serialize a sanitized fragment to a string.
pub fn serialize_fragment(fragment: &Fragment) -> String {
    let mut out = String::new();
    for child in fragment.children() {
        serialize_node(child, &mut out);
    }
    out
}

fn serialize_node(node: &Node, out: &mut String) {
    match node {
        Node::Fragment(children) => {
            for child in children {
                serialize_node(child, out);
            }
        }
        Node::Element(el) => {
            let tag = el.name();
            out.push('<');
            out.push_str(tag);
            for (k, v) in el.attrs() {
                out.push(' ');
                out.push_str(k);
                out.push_str("=\"");
                escape_attribute(v, out);
                out.push('"');
            }
            out.push('>');

            if VOID_ELEMENTS.contains(&tag) {
                return;
            }

            if LEADING_NEWLINE_ELEMENTS.contains(&tag)
                && matches!(el.children().first(), Some(Node::Text(t)) if t.starts_with('\n'))
            {
                out.push('\n');
            }

            for child in el.children() {
                serialize_node(child, out);
            }

            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        Node::Text(text) => escape_text(text, out),
        Node::Comment(comment) => {
            out.push_str("<!--");
            out.push_str(comment);
            out.push_str("-->");
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}
