//! Per-node classification: keep, unwrap, or drop with the whole subtree.

use crate::node::{Element, Node};
use crate::policy::Policy;
use crate::uri;

use super::engine::SanitizeReport;

/// What happens to a single node of the input tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Keep the node. For elements, carries the attributes that survive the
    /// policy, in source order.
    Keep(Vec<(String, String)>),
    /// Discard the element but splice its sanitized children into the parent.
    Unwrap,
    /// Discard the node and everything below it.
    DropSubtree,
}

/// Classify `node` under `policy`.
///
/// Text is always kept and comments are always dropped. For elements the
/// drop-set is consulted before the allow-set, so a dangerous tag cannot be
/// allow-listed; allowed elements keep only permitted attributes whose URI
/// values (if any) validate, and every other element is unwrapped.
///
/// # Example
///
/// ```
/// use sane_html::{Disposition, Element, Node, Sanitizer, classify};
///
/// let policy = Sanitizer::simple().policy();
/// let script: Node = Element::new("script").into();
/// assert_eq!(classify(&script, policy), Disposition::DropSubtree);
///
/// let link: Node = Element::new("a").with_attr("href", "javascript:alert(1)").into();
/// assert_eq!(classify(&link, policy), Disposition::Keep(vec![]));
///
/// let div: Node = Element::new("div").into();
/// assert_eq!(classify(&div, policy), Disposition::Unwrap);
/// ```
pub fn classify(node: &Node, policy: &Policy) -> Disposition {
    classify_with_report(node, policy, &mut SanitizeReport::default())
}

pub(crate) fn classify_with_report(
    node: &Node,
    policy: &Policy,
    report: &mut SanitizeReport,
) -> Disposition {
    match node {
        Node::Text(_) => Disposition::Keep(Vec::new()),
        Node::Comment(_) => Disposition::DropSubtree,
        Node::Fragment(_) => Disposition::Unwrap,
        Node::Element(el) => classify_element(el, policy, report),
    }
}

fn classify_element(el: &Element, policy: &Policy, report: &mut SanitizeReport) -> Disposition {
    let tag = el.name();
    if policy.is_dropped(tag) {
        Disposition::DropSubtree
    } else if policy.is_allowed_tag(tag) {
        Disposition::Keep(sanitize_attributes(el, policy, report))
    } else {
        Disposition::Unwrap
    }
}

fn sanitize_attributes(
    el: &Element,
    policy: &Policy,
    report: &mut SanitizeReport,
) -> Vec<(String, String)> {
    let tag = el.name();
    let mut kept = Vec::new();

    for (name, value) in el.attrs() {
        if !policy.is_allowed_attribute(tag, name) {
            tracing::trace!("Dropping attribute {name:?} on <{tag}>");
            report.dropped_attributes += 1;
            continue;
        }
        if policy.is_uri_attribute(name) {
            let accepted = if name == "srcset" {
                uri::validate_srcset(value, policy.uri_rules())
            } else {
                uri::validate(value, policy.uri_rules())
            };
            if !accepted {
                tracing::trace!("Rejecting URI in {name:?} on <{tag}>");
                report.dropped_attributes += 1;
                report.rejected_uris += 1;
                continue;
            }
        }
        kept.push((name.to_string(), value.to_string()));
    }

    kept
}
