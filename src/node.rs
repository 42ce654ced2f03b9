//! The node tree the sanitizer reads and writes.
//!
//! A parent owns its children outright; there are no parent links and no
//! sharing between trees. Input trees come from [`parse_fragment`] or are
//! built by the caller; output trees are only ever built by the sanitizer and
//! handed out as a [`Fragment`].
//!
//! [`parse_fragment`]: crate::parse::parse_fragment

use std::fmt;

use crate::serialize;

/// A node of an HTML tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    /// A fragment root: an ordered forest with no element of its own.
    Fragment(Vec<Node>),
    /// An element with its attributes and children.
    Element(Element),
    /// A run of character data (already entity-decoded).
    Text(String),
    /// A comment.
    Comment(String),
}

impl Node {
    /// Shorthand for a text node.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// The node's children; empty for text and comments.
    pub fn children(&self) -> &[Node] {
        match self {
            Self::Fragment(children) => children,
            Self::Element(element) => element.children(),
            Self::Text(_) | Self::Comment(_) => &[],
        }
    }

    fn take_children(&mut self) -> Vec<Node> {
        match self {
            Self::Fragment(children) => std::mem::take(children),
            Self::Element(element) => std::mem::take(&mut element.children),
            Self::Text(_) | Self::Comment(_) => Vec::new(),
        }
    }
}

impl Drop for Node {
    // The default recursive drop would overflow the stack on deeply nested
    // trees, so descendants are flattened onto a heap stack first.
    fn drop(&mut self) {
        let mut pending = self.take_children();
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.take_children());
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

/// An element node.
///
/// The tag name and attribute names are stored lower-cased. Attribute names
/// are unique; when the same name is set twice, the first value wins, as it
/// does in an HTML parser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    /// Create an element with no attributes and no children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Add an attribute, unless one with the same name is already present.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_attr(name.into(), value.into());
        self
    }

    /// Append a child node.
    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Append several child nodes.
    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    /// The lower-cased tag name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attributes in source order.
    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The value of attribute `name`, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Child nodes in order.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub(crate) fn push_attr(&mut self, name: String, value: String) {
        let name = name.to_ascii_lowercase();
        if !self.attrs.iter().any(|(k, _)| *k == name) {
            self.attrs.push((name, value));
        }
    }

    pub(crate) fn push_child(&mut self, child: Node) {
        self.children.push(child);
    }

    pub(crate) fn from_parts(name: String, attrs: Vec<(String, String)>, children: Vec<Node>) -> Self {
        Self {
            name,
            attrs,
            children,
        }
    }
}

/// A sanitized fragment: an ordered forest produced by the sanitizer.
///
/// Fragments can only be obtained from a [`Sanitizer`](crate::Sanitizer), so
/// every fragment satisfies the policy it was produced under.
///
/// ```compile_fail
/// let forged = sane_html::Fragment::default();
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fragment {
    children: Vec<Node>,
}

impl Fragment {
    pub(crate) fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    /// The top-level nodes of the fragment.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Consume the fragment, returning its top-level nodes.
    pub fn into_children(self) -> Vec<Node> {
        self.children
    }

    /// Returns `true` if the fragment has no nodes.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Concatenated text content of the fragment, without markup.
    pub fn text(&self) -> String {
        let mut out = String::new();
        let mut pending: Vec<&Node> = self.children.iter().rev().collect();
        while let Some(node) = pending.pop() {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Comment(_) => {}
                Node::Fragment(_) | Node::Element(_) => {
                    pending.extend(node.children().iter().rev());
                }
            }
        }
        out
    }

    /// Serialize the fragment to an HTML string.
    pub fn to_html(&self) -> String {
        serialize::serialize_fragment(self)
    }

    /// View the fragment as a [`Node::Fragment`] root, e.g. to sanitize it
    /// again under another policy.
    pub fn to_node(&self) -> Node {
        Node::Fragment(self.children.clone())
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_html())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_names_are_lower_cased() {
        let el = Element::new("DIV").with_attr("Title", "x");
        assert_eq!(el.name(), "div");
        assert_eq!(el.attr("title"), Some("x"));
        assert_eq!(el.attr("TITLE"), Some("x"));
    }

    #[test]
    fn first_duplicate_attribute_wins() {
        let el = Element::new("a")
            .with_attr("href", "/first")
            .with_attr("HREF", "/second");
        assert_eq!(el.attrs().collect::<Vec<_>>(), vec![("href", "/first")]);
    }

    #[test]
    fn children_are_ordered() {
        let el = Element::new("p")
            .with_child(Node::text("a"))
            .with_child(Element::new("b").with_child(Node::text("b")))
            .with_child(Node::text("c"));
        assert_eq!(el.children().len(), 3);
        assert_eq!(el.children()[0], Node::text("a"));
        assert_eq!(el.children()[2], Node::text("c"));
    }

    #[test]
    fn deep_tree_drops_without_overflow() {
        let mut node = Node::text("leaf");
        for _ in 0..200_000 {
            node = Element::new("div").with_child(node).into();
        }
        drop(node);
    }

    #[test]
    fn deep_fragment_chain_drops_without_overflow() {
        let mut node = Node::text("leaf");
        for i in 0..200_000 {
            node = if i % 2 == 0 {
                Node::Fragment(vec![node])
            } else {
                Element::new("b").with_child(node).into()
            };
        }
        drop(node);

        let mut node = Node::Fragment(vec![]);
        for _ in 0..200_000 {
            node = Node::Fragment(vec![node]);
        }
        drop(node);
    }

    #[test]
    fn fragment_text_concatenates_in_order() {
        let fragment = Fragment::new(vec![
            Element::new("b").with_child(Node::text("bold")).into(),
            Node::text(" and "),
            Element::new("i")
                .with_child(Node::Comment("hidden".into()))
                .with_child(Node::text("italic"))
                .into(),
        ]);
        assert_eq!(fragment.text(), "bold and italic");
    }
}
