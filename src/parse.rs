//! Adapter over the HTML parser (`scraper`, backed by `html5ever`).
//!
//! The parser is lenient and never fails: any string yields a tree. The
//! arena tree it produces is copied into a [`Node`] tree with an explicit
//! stack, so the depth of the input never translates into call-stack depth.

use ego_tree::NodeRef;
use ego_tree::iter::Children;
use scraper::Html;
use scraper::node::Node as HtmlNode;

use crate::node::{Element, Node};

/// Parse `input` as an HTML fragment in a `<body>` context.
///
/// Returns a [`Node::Fragment`] holding the parsed nodes. Doctypes and
/// processing instructions are discarded.
///
/// # Example
///
/// ```
/// use sane_html::{Node, parse_fragment};
///
/// let root = parse_fragment("<b>bold</b> text");
/// assert_eq!(root.children().len(), 2);
/// assert_eq!(root.children()[1], Node::text(" text"));
/// ```
pub fn parse_fragment(input: &str) -> Node {
    let document = Html::parse_fragment(input);
    let root = document.tree.root();

    // html5ever places fragment content under a synthetic <html> element.
    let content = root
        .children()
        .find(|child| matches!(child.value(), HtmlNode::Element(el) if el.name() == "html"))
        .unwrap_or(root);

    Node::Fragment(convert_children(content))
}

enum Converted {
    Leaf(Node),
    Open(Option<Element>),
    Skip,
}

fn convert(node: NodeRef<'_, HtmlNode>) -> Converted {
    match node.value() {
        HtmlNode::Text(text) => Converted::Leaf(Node::Text(String::from(&**text))),
        HtmlNode::Comment(comment) => Converted::Leaf(Node::Comment(String::from(&**comment))),
        HtmlNode::Element(el) => {
            let mut element = Element::new(el.name());
            for (name, value) in el.attrs() {
                element.push_attr(name.to_string(), value.to_string());
            }
            Converted::Open(Some(element))
        }
        // Nested fragments (template contents) are transparent.
        HtmlNode::Document | HtmlNode::Fragment => Converted::Open(None),
        _ => Converted::Skip,
    }
}

fn convert_children(parent: NodeRef<'_, HtmlNode>) -> Vec<Node> {
    let mut out = Vec::new();
    let mut top = parent.children();
    let mut stack: Vec<(Children<'_, HtmlNode>, Option<Element>)> = Vec::new();

    loop {
        let next = match stack.last_mut() {
            Some((children, _)) => children.next(),
            None => top.next(),
        };

        match next {
            Some(child) => match convert(child) {
                Converted::Leaf(node) => attach(&mut stack, &mut out, node),
                Converted::Open(element) => stack.push((child.children(), element)),
                Converted::Skip => {}
            },
            None => match stack.pop() {
                Some((_, Some(element))) => attach(&mut stack, &mut out, element.into()),
                Some((_, None)) => {}
                None => break,
            },
        }
    }

    out
}

fn attach(stack: &mut [(Children<'_, HtmlNode>, Option<Element>)], out: &mut Vec<Node>, node: Node) {
    match stack.iter_mut().rev().find_map(|(_, el)| el.as_mut()) {
        Some(parent) => parent.push_child(node),
        None => out.push(node),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(node: &Node) -> &Element {
        match node {
            Node::Element(el) => el,
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn plain_text_is_a_single_text_node() {
        let root = parse_fragment("a simple example");
        assert_eq!(root.children(), &[Node::text("a simple example")]);
    }

    #[test]
    fn elements_and_text_keep_order() {
        let root = parse_fragment("<b>bold</b> text <i>it</i>");
        let children = root.children();
        assert_eq!(children.len(), 4);
        assert_eq!(element(&children[0]).name(), "b");
        assert_eq!(children[1], Node::text(" text "));
        assert_eq!(element(&children[2]).name(), "i");
    }

    #[test]
    fn no_synthetic_html_wrapper() {
        let root = parse_fragment("<p>x</p>");
        assert_eq!(element(&root.children()[0]).name(), "p");
    }

    #[test]
    fn names_are_lower_cased_and_entities_decoded() {
        let root = parse_fragment(r#"<A HREF="/x?a=1&amp;b=2">Tom &amp; Jerry</A>"#);
        let a = element(&root.children()[0]);
        assert_eq!(a.name(), "a");
        assert_eq!(a.attr("href"), Some("/x?a=1&b=2"));
        assert_eq!(a.children(), &[Node::text("Tom & Jerry")]);
    }

    #[test]
    fn script_content_is_kept_as_text() {
        let root = parse_fragment("<script>alert(1)</script>");
        let script = element(&root.children()[0]);
        assert_eq!(script.name(), "script");
        assert_eq!(script.children(), &[Node::text("alert(1)")]);
    }

    #[test]
    fn comments_are_preserved_as_nodes() {
        let root = parse_fragment("a<!-- note -->b");
        assert_eq!(
            root.children(),
            &[
                Node::text("a"),
                Node::Comment(" note ".into()),
                Node::text("b")
            ]
        );
    }

    #[test]
    fn malformed_markup_never_fails() {
        let root = parse_fragment("<b><i>unclosed <p attr=\"x");
        assert!(!root.children().is_empty());
        let root = parse_fragment("</div></span>>>\u{0}<<");
        assert!(!root.children().is_empty());
    }

    #[test]
    fn deep_nesting_is_converted_iteratively() {
        let input = "<span>".repeat(20_000) + "deep";
        let root = parse_fragment(&input);
        let mut depth = 0;
        let mut node = &root;
        while let Some(child) = node.children().first() {
            node = child;
            depth += 1;
        }
        assert_eq!(*node, Node::text("deep"));
        assert!(depth > 1);
    }
}
