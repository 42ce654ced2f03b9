//! Compilation of a [`SanitizerConfig`] into an immutable [`Policy`].
//!
//! A policy layers the caller's allow-lists over closed tables that no option
//! can change: the drop-set of elements removed together with their content,
//! the attributes that never survive, and the attributes whose values are URIs.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;

use crate::config::{AllowedAttributes, SanitizerConfig};
use crate::error::{ConfigurationError, Result};
use crate::uri::UriRules;

/// Key in `allowedAttributes` that applies to every tag.
pub const WILDCARD_TAG: &str = "*";

/// Elements removed with their whole subtree under every policy.
///
/// Script and style carriers, plus elements whose content is raw text or
/// foreign content and therefore does not survive a serialize/parse round trip
/// unchanged.
pub const DROP_SET: &[&str] = &[
    "applet", "base", "embed", "frame", "frameset", "iframe", "link", "math", "meta", "noembed",
    "noframes", "noscript", "object", "plaintext", "script", "style", "svg", "template", "xmp",
];

/// Attributes removed under every policy, in addition to event handlers (`on*`).
pub const DENIED_ATTRIBUTES: &[&str] = &["srcdoc", "style"];

/// Attributes whose values are URIs and must pass URI validation.
pub const URI_ATTRIBUTES: &[&str] = &[
    "action",
    "background",
    "cite",
    "codebase",
    "data",
    "formaction",
    "href",
    "longdesc",
    "manifest",
    "ping",
    "poster",
    "src",
    "srcset",
    "xlink:href",
];

/// Tags kept by the "simple" profile.
pub const SIMPLE_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "br", "cite", "code", "dfn", "em", "i", "kbd", "mark", "q",
    "s", "samp", "small", "span", "strong", "sub", "sup", "time", "u", "var", "wbr",
];

/// HTML void elements: never have children and never have a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose start tag makes an HTML parser close an open ancestor.
///
/// Keeping one of `tags` below a kept element named in `closes` would not
/// survive re-parsing, unless a kept element from `shields` sits between
/// them. A shield of `"*"` limits the check to the nearest kept ancestor.
#[derive(Debug)]
pub struct ImpliedEnd {
    /// Elements the rule applies to.
    pub tags: &'static [&'static str],
    /// Ancestors their start tag closes.
    pub closes: &'static [&'static str],
    /// Ancestors that stop the search.
    pub shields: &'static [&'static str],
}

const BUTTON_SCOPE: &[&str] = &[
    "applet", "button", "caption", "html", "marquee", "object", "table", "td", "template", "th",
];

const HEADINGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

/// Parser rules that close open elements, as they apply to kept elements.
pub const IMPLIED_ENDS: &[ImpliedEnd] = &[
    ImpliedEnd {
        tags: &[
            "address", "article", "aside", "blockquote", "center", "details", "dialog", "dir",
            "div", "dl", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3",
            "h4", "h5", "h6", "header", "hgroup", "hr", "li", "listing", "main", "menu", "nav",
            "ol", "p", "pre", "search", "section", "summary", "table", "ul", "dd", "dt",
        ],
        closes: &["p"],
        shields: BUTTON_SCOPE,
    },
    ImpliedEnd {
        tags: &["li"],
        closes: &["li"],
        shields: &[
            "button", "caption", "dl", "marquee", "menu", "object", "ol", "table", "td",
            "template", "th", "ul",
        ],
    },
    ImpliedEnd {
        tags: &["dd", "dt"],
        closes: &["dd", "dt"],
        shields: &[
            "button", "caption", "dl", "marquee", "menu", "object", "ol", "table", "td",
            "template", "th", "ul",
        ],
    },
    ImpliedEnd {
        tags: HEADINGS,
        closes: HEADINGS,
        shields: &["*"],
    },
    ImpliedEnd {
        tags: &["a"],
        closes: &["a"],
        shields: &["applet", "caption", "marquee", "object", "td", "template", "th"],
    },
    ImpliedEnd {
        tags: &["nobr"],
        closes: &["nobr"],
        shields: &["applet", "caption", "marquee", "object", "td", "template", "th"],
    },
    ImpliedEnd {
        tags: &["form"],
        closes: &["form"],
        shields: &[],
    },
    ImpliedEnd {
        tags: &["button"],
        closes: &["button"],
        shields: &[
            "applet", "caption", "html", "marquee", "object", "table", "td", "template", "th",
        ],
    },
    ImpliedEnd {
        tags: &["option"],
        closes: &["option"],
        shields: &["*"],
    },
];

/// Returns `true` if keeping `tag` inside the kept elements `ancestors`
/// (innermost first) would make a parser close one of them.
pub fn closes_ancestor<'a>(tag: &str, ancestors: impl IntoIterator<Item = &'a str>) -> bool {
    let rules: Vec<&ImpliedEnd> = IMPLIED_ENDS
        .iter()
        .filter(|rule| rule.tags.contains(&tag))
        .collect();
    if rules.is_empty() {
        return false;
    }

    let mut open = rules;
    for (depth, ancestor) in ancestors.into_iter().enumerate() {
        if open.iter().any(|rule| rule.closes.contains(&ancestor)) {
            return true;
        }
        open.retain(|rule| {
            !(rule.shields.contains(&ancestor) || (depth == 0 && rule.shields.contains(&"*")))
        });
        if open.is_empty() {
            return false;
        }
    }
    false
}

/// Table-model elements and the kept parents they survive re-parsing under.
/// Anywhere else a parser ignores them or inserts a missing wrapper.
pub const TABLE_PARENTS: &[(&str, &[&str])] = &[
    ("caption", &["table"]),
    ("colgroup", &["table"]),
    ("col", &["colgroup"]),
    ("thead", &["table"]),
    ("tbody", &["table"]),
    ("tfoot", &["table"]),
    ("tr", &["thead", "tbody", "tfoot"]),
    ("td", &["tr"]),
    ("th", &["tr"]),
];

/// Table-model containers and the only elements they may hold directly.
/// Text and any other element would be moved out of the table on re-parse.
pub const TABLE_CONTENT: &[(&str, &[&str])] = &[
    ("table", &["caption", "colgroup", "thead", "tbody", "tfoot"]),
    ("thead", &["tr"]),
    ("tbody", &["tr"]),
    ("tfoot", &["tr"]),
    ("tr", &["td", "th"]),
    ("colgroup", &["col"]),
];

/// Returns `true` if `tag` may be kept with `parent` as its nearest kept
/// ancestor (`None` at the top level) as far as the table model goes.
pub fn fits_table_model(tag: &str, parent: Option<&str>) -> bool {
    if let Some((_, parents)) = TABLE_PARENTS.iter().find(|(name, _)| *name == tag) {
        if !parent.is_some_and(|p| parents.contains(&p)) {
            return false;
        }
    }
    match parent.and_then(|p| TABLE_CONTENT.iter().find(|(name, _)| *name == p)) {
        Some((_, children)) => children.contains(&tag),
        None => true,
    }
}

/// Returns `true` if text may be kept below the kept element `parent`.
pub fn holds_text(parent: Option<&str>) -> bool {
    !parent.is_some_and(|p| TABLE_CONTENT.iter().any(|(name, _)| *name == p))
}

fn tag_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9-]*$").expect("valid regex"))
}

fn attribute_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z_:][a-z0-9_:.-]*$").expect("valid regex"))
}

/// Returns `true` for attributes no policy may keep.
pub fn is_denied_attribute(name: &str) -> bool {
    name.starts_with("on") || DENIED_ATTRIBUTES.contains(&name)
}

/// The compiled, immutable rules a sanitizer enforces.
///
/// Built once per [`Sanitizer`](crate::Sanitizer) and only read afterwards, so
/// it can be shared between threads without locking.
#[derive(Debug)]
pub struct Policy {
    allowed_tags: HashSet<String>,
    allowed_attributes: HashMap<String, HashSet<String>>,
    uri_rules: UriRules,
}

impl Policy {
    /// Validate `config` and compile it.
    ///
    /// Tag and attribute names are lower-cased. Tags from [`DROP_SET`] that
    /// appear in the allow-list are ignored.
    pub fn compile(config: &SanitizerConfig) -> Result<Self> {
        let mut allowed_tags = HashSet::with_capacity(config.allowed_tags.len());
        for tag in &config.allowed_tags {
            let tag = normalize_tag(tag)?;
            if DROP_SET.contains(&tag.as_str()) {
                tracing::warn!("Ignoring allowed tag {tag:?}: it is always dropped");
                continue;
            }
            allowed_tags.insert(tag);
        }

        let mut allowed_attributes: HashMap<String, HashSet<String>> = HashMap::new();
        match &config.allowed_attributes {
            None => {}
            Some(AllowedAttributes::Global(names)) => {
                let names = normalize_attributes(names)?;
                allowed_attributes.insert(WILDCARD_TAG.to_string(), names);
            }
            Some(AllowedAttributes::PerTag(map)) => {
                for (tag, names) in map {
                    let tag = if tag == WILDCARD_TAG {
                        tag.clone()
                    } else {
                        normalize_tag(tag)?
                    };
                    allowed_attributes
                        .entry(tag)
                        .or_default()
                        .extend(normalize_attributes(names)?);
                }
            }
        }

        let uri_rules = UriRules::from_config(config)?;

        tracing::debug!(
            "Compiled sanitizer policy: {} tags, {} attribute sets, {}",
            allowed_tags.len(),
            allowed_attributes.len(),
            uri_rules,
        );

        Ok(Self {
            allowed_tags,
            allowed_attributes,
            uri_rules,
        })
    }

    /// Returns `true` if `tag` is removed together with its subtree.
    pub fn is_dropped(&self, tag: &str) -> bool {
        DROP_SET.contains(&tag)
    }

    /// Returns `true` if `tag` is kept in the output.
    pub fn is_allowed_tag(&self, tag: &str) -> bool {
        !self.is_dropped(tag) && self.allowed_tags.contains(tag)
    }

    /// Returns `true` if `attribute` may be kept on a `tag` element, before
    /// any URI check.
    pub fn is_allowed_attribute(&self, tag: &str, attribute: &str) -> bool {
        if is_denied_attribute(attribute) {
            return false;
        }
        [tag, WILDCARD_TAG].iter().any(|key| {
            self.allowed_attributes
                .get(*key)
                .is_some_and(|names| names.contains(attribute))
        })
    }

    /// Returns `true` if the value of `attribute` is a URI (or a list of URIs).
    pub fn is_uri_attribute(&self, attribute: &str) -> bool {
        URI_ATTRIBUTES.contains(&attribute)
    }

    /// The URI rules applied to URI-valued attributes.
    pub fn uri_rules(&self) -> &UriRules {
        &self.uri_rules
    }
}

fn normalize_tag(tag: &str) -> Result<String> {
    let tag = tag.trim().to_ascii_lowercase();
    if tag_name_regex().is_match(&tag) {
        Ok(tag)
    } else {
        Err(ConfigurationError::InvalidTagName(tag))
    }
}

fn normalize_attributes<'a>(names: impl IntoIterator<Item = &'a String>) -> Result<HashSet<String>> {
    names
        .into_iter()
        .map(|name| {
            let name = name.trim().to_ascii_lowercase();
            if attribute_name_regex().is_match(&name) {
                Ok(name)
            } else {
                Err(ConfigurationError::InvalidAttributeName(name))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SanitizerBuilder;

    fn compile(builder: SanitizerBuilder) -> Result<Policy> {
        Policy::compile(builder.config())
    }

    #[test]
    fn tags_are_case_normalized() {
        let policy = compile(SanitizerBuilder::new().allow_tags(["P", " Em "])).unwrap();
        assert!(policy.is_allowed_tag("p"));
        assert!(policy.is_allowed_tag("em"));
        assert!(!policy.is_allowed_tag("b"));
    }

    #[test]
    fn drop_set_cannot_be_allow_listed() {
        let policy = compile(SanitizerBuilder::new().allow_tags(["script", "STYLE", "b"])).unwrap();
        assert!(policy.is_dropped("script"));
        assert!(!policy.is_allowed_tag("script"));
        assert!(!policy.is_allowed_tag("style"));
        assert!(policy.is_allowed_tag("b"));
    }

    #[test]
    fn invalid_tag_name_is_rejected() {
        let err = compile(SanitizerBuilder::new().allow_tags(["b<script>"])).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidTagName(ref t) if t == "b<script>"));

        assert!(compile(SanitizerBuilder::new().allow_tags([""])).is_err());
        assert!(compile(SanitizerBuilder::new().allow_tags(["1b"])).is_err());
    }

    #[test]
    fn custom_element_names_are_accepted() {
        let policy = compile(SanitizerBuilder::new().allow_tags(["my-widget", "h1"])).unwrap();
        assert!(policy.is_allowed_tag("my-widget"));
        assert!(policy.is_allowed_tag("h1"));
    }

    #[test]
    fn invalid_attribute_name_is_rejected() {
        let err = compile(SanitizerBuilder::new().allow_attributes("a", ["hr ef"])).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidAttributeName(_)));

        let err = compile(SanitizerBuilder::new().allow_attributes("a b", ["href"])).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidTagName(_)));
    }

    #[test]
    fn per_tag_and_global_attributes() {
        let policy = compile(
            SanitizerBuilder::new()
                .allow_tags(["a", "img"])
                .allow_attributes("A", ["HREF"])
                .allow_global_attributes(["title"]),
        )
        .unwrap();
        assert!(policy.is_allowed_attribute("a", "href"));
        assert!(!policy.is_allowed_attribute("img", "href"));
        assert!(policy.is_allowed_attribute("img", "title"));
        assert!(policy.is_allowed_attribute("a", "title"));
    }

    #[test]
    fn event_handlers_and_style_are_never_allowed() {
        let policy = compile(
            SanitizerBuilder::new()
                .allow_tags(["b"])
                .allow_global_attributes(["onclick", "onerror", "style", "srcdoc", "class"]),
        )
        .unwrap();
        assert!(!policy.is_allowed_attribute("b", "onclick"));
        assert!(!policy.is_allowed_attribute("b", "onerror"));
        assert!(!policy.is_allowed_attribute("b", "style"));
        assert!(!policy.is_allowed_attribute("b", "srcdoc"));
        assert!(policy.is_allowed_attribute("b", "class"));
    }

    #[test]
    fn implied_end_detection() {
        assert!(closes_ancestor("a", ["b", "a"]));
        assert!(!closes_ancestor("a", ["td", "a"]));
        assert!(closes_ancestor("div", ["span", "p"]));
        assert!(!closes_ancestor("div", ["button", "p"]));
        assert!(closes_ancestor("li", ["b", "li"]));
        assert!(!closes_ancestor("li", ["ul", "li"]));
        assert!(closes_ancestor("dt", ["dd"]));
        assert!(closes_ancestor("h2", ["h1"]));
        assert!(!closes_ancestor("h2", ["b", "h1"]));
        assert!(!closes_ancestor("span", ["span", "p"]));
        assert!(!closes_ancestor("p", []));
        assert!(closes_ancestor("nobr", ["b", "nobr"]));
        assert!(!closes_ancestor("nobr", ["td", "nobr"]));
    }

    #[test]
    fn table_model_placement() {
        assert!(fits_table_model("table", None));
        assert!(fits_table_model("tbody", Some("table")));
        assert!(fits_table_model("tr", Some("tbody")));
        assert!(fits_table_model("td", Some("tr")));
        assert!(fits_table_model("col", Some("colgroup")));
        assert!(fits_table_model("b", Some("td")));
        assert!(fits_table_model("table", Some("td")));

        assert!(!fits_table_model("tr", Some("table")));
        assert!(!fits_table_model("td", Some("table")));
        assert!(!fits_table_model("td", None));
        assert!(!fits_table_model("col", Some("table")));
        assert!(!fits_table_model("b", Some("table")));
        assert!(!fits_table_model("table", Some("tr")));
        assert!(!fits_table_model("p", Some("colgroup")));

        assert!(holds_text(None));
        assert!(holds_text(Some("td")));
        assert!(holds_text(Some("caption")));
        assert!(!holds_text(Some("table")));
        assert!(!holds_text(Some("tr")));
    }

    #[test]
    fn uri_attributes_are_fixed() {
        let policy = compile(SanitizerBuilder::new()).unwrap();
        assert!(policy.is_uri_attribute("href"));
        assert!(policy.is_uri_attribute("src"));
        assert!(policy.is_uri_attribute("srcset"));
        assert!(!policy.is_uri_attribute("title"));
    }
}
