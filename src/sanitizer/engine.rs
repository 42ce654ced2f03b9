//! The tree rewrite: a depth-first, pre-order walk that builds a new output
//! tree from an input tree.
//!
//! The walk keeps its own stack of open frames instead of recursing, and
//! refuses to open a frame deeper than [`MAX_NESTING_DEPTH`]; anything deeper
//! is dropped with its subtree.

use std::slice;

use crate::node::{Element, Fragment, Node};
use crate::policy::{Policy, VOID_ELEMENTS, closes_ancestor, fits_table_model, holds_text};

use super::classify::{Disposition, classify_with_report};

/// Deepest element nesting the engine descends into.
pub const MAX_NESTING_DEPTH: usize = 512;

/// Counts of what a sanitization pass removed.
///
/// Purely diagnostic: the sanitized output does not depend on it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SanitizeReport {
    /// Elements whose tag was removed while their content was kept.
    pub unwrapped_elements: usize,
    /// Nodes removed together with their descendants (drop-set elements and
    /// comments).
    pub dropped_subtrees: usize,
    /// Attributes removed from kept elements, including rejected URIs.
    pub dropped_attributes: usize,
    /// URI-valued attributes removed because their value failed validation.
    pub rejected_uris: usize,
    /// Subtrees removed because they were nested deeper than
    /// [`MAX_NESTING_DEPTH`].
    pub truncated_subtrees: usize,
}

impl SanitizeReport {
    /// Returns `true` if the pass removed nothing.
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

enum FrameKind {
    Root,
    Unwrap,
    Keep {
        name: String,
        attrs: Vec<(String, String)>,
    },
}

struct Frame<'a> {
    input: slice::Iter<'a, Node>,
    output: Vec<Node>,
    kind: FrameKind,
}

impl<'a> Frame<'a> {
    fn new(input: &'a [Node], kind: FrameKind) -> Self {
        Self {
            input: input.iter(),
            output: Vec::new(),
            kind,
        }
    }

    fn kept_name(&self) -> Option<&str> {
        match &self.kind {
            FrameKind::Keep { name, .. } => Some(name),
            FrameKind::Root | FrameKind::Unwrap => None,
        }
    }
}

/// Sanitize the tree under `root` with `policy`.
///
/// A [`Node::Fragment`] root contributes its children; any other root is
/// treated as a one-node forest and classified like every other node.
pub fn sanitize(root: &Node, policy: &Policy) -> Fragment {
    sanitize_with_report(root, policy).0
}

/// Like [`sanitize`], also returning what was removed.
pub fn sanitize_with_report(root: &Node, policy: &Policy) -> (Fragment, SanitizeReport) {
    let top: &[Node] = match root {
        Node::Fragment(children) => children,
        other => slice::from_ref(other),
    };

    let mut report = SanitizeReport::default();
    let mut stack = vec![Frame::new(top, FrameKind::Root)];

    loop {
        let depth = stack.len();
        let next = match stack.last_mut() {
            Some(frame) => frame.input.next(),
            None => break,
        };

        let Some(node) = next else {
            let Some(done) = stack.pop() else {
                break;
            };
            match done.kind {
                FrameKind::Root => return (Fragment::new(done.output), report),
                FrameKind::Unwrap => {
                    for node in done.output {
                        emit(&mut stack, node);
                    }
                }
                FrameKind::Keep { name, attrs } => {
                    let element = Element::from_parts(name, attrs, done.output);
                    emit(&mut stack, element.into());
                }
            }
            continue;
        };

        if depth > MAX_NESTING_DEPTH && matches!(node, Node::Element(_) | Node::Fragment(_)) {
            tracing::debug!(
                "Dropping {:?} nested beyond depth {MAX_NESTING_DEPTH}",
                node_label(node)
            );
            report.truncated_subtrees += 1;
            continue;
        }

        let parent = stack.iter().rev().find_map(Frame::kept_name);
        match (classify_with_report(node, policy, &mut report), node) {
            (Disposition::DropSubtree, _) => {
                tracing::trace!("Dropping subtree {:?}", node_label(node));
                report.dropped_subtrees += 1;
            }
            (Disposition::Keep(_), Node::Text(text)) => {
                if holds_text(parent) {
                    emit(&mut stack, Node::text(text));
                } else if !text.is_empty() {
                    tracing::trace!("Dropping text directly inside <{}>", parent.unwrap_or_default());
                    report.dropped_subtrees += 1;
                }
            }
            (Disposition::Keep(attrs), Node::Element(el)) => {
                let name = el.name();
                // Keeping it would make a re-parse close a kept ancestor early
                // or move it out of the table it sits in.
                if !fits_table_model(name, parent)
                    || closes_ancestor(name, stack.iter().rev().filter_map(Frame::kept_name))
                {
                    report.unwrapped_elements += 1;
                    stack.push(Frame::new(el.children(), FrameKind::Unwrap));
                } else if VOID_ELEMENTS.contains(&name) {
                    if !el.children().is_empty() {
                        report.dropped_subtrees += 1;
                    }
                    let element = Element::from_parts(name.to_string(), attrs, Vec::new());
                    emit(&mut stack, element.into());
                } else {
                    let kind = FrameKind::Keep {
                        name: name.to_string(),
                        attrs,
                    };
                    stack.push(Frame::new(el.children(), kind));
                }
            }
            (Disposition::Keep(_), _) => {}
            (Disposition::Unwrap, _) => {
                if matches!(node, Node::Element(_)) {
                    report.unwrapped_elements += 1;
                }
                stack.push(Frame::new(node.children(), FrameKind::Unwrap));
            }
        }
    }

    (Fragment::new(Vec::new()), report)
}

/// Append `node` to the output of the innermost open frame.
fn emit(stack: &mut [Frame<'_>], node: Node) {
    if let Some(frame) = stack.last_mut() {
        push_node(&mut frame.output, node);
    }
}

/// Append `node`, merging adjacent text so the output matches what a parser
/// would build from its serialization.
fn push_node(output: &mut Vec<Node>, node: Node) {
    if let Node::Text(text) = &node {
        if text.is_empty() {
            return;
        }
        if let Some(Node::Text(prev)) = output.last_mut() {
            prev.push_str(text);
            return;
        }
    }
    output.push(node);
}

fn node_label(node: &Node) -> &str {
    match node {
        Node::Element(el) => el.name(),
        Node::Comment(_) => "#comment",
        Node::Text(_) => "#text",
        Node::Fragment(_) => "#fragment",
    }
}
