//! The options dictionary a [`Sanitizer`] is built from, plus a fluent
//! builder for assembling one in code.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::policy::{SIMPLE_TAGS, WILDCARD_TAG};
use crate::sanitizer::Sanitizer;

/// Attributes permitted on kept elements.
///
/// In JSON this is either an array (a global set that applies to every tag)
/// or an object keyed by tag name, where the key `"*"` applies to every tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AllowedAttributes {
    /// The same attribute names are allowed on every kept element.
    Global(BTreeSet<String>),
    /// Attribute names allowed per tag name (or `"*"` for any tag).
    PerTag(BTreeMap<String, BTreeSet<String>>),
}

impl AllowedAttributes {
    /// Returns `true` if no attribute is allowed anywhere.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Global(names) => names.is_empty(),
            Self::PerTag(map) => map.values().all(BTreeSet::is_empty),
        }
    }
}

/// The options dictionary used to construct a [`Sanitizer`].
///
/// Keys follow the camelCase names of the option dictionary (`allowedTags`,
/// `allowedAttributes`, `allowedProtocols`, `allowedOrigins`,
/// `allowedURIPattern`, `baseURL`). Any other key is rejected.
///
/// A sanitizer keeps the exact value it was built from and hands it back via
/// [`Sanitizer::creation_options`], so the policy in force can be reviewed or
/// dumped to JSON.
///
/// # Example
///
/// ```
/// use sane_html::SanitizerConfig;
///
/// let config = SanitizerConfig::from_json(r#"{
///     "allowedTags": ["p", "a"],
///     "allowedAttributes": { "a": ["href"] },
///     "allowedProtocols": ["https"]
/// }"#).unwrap();
/// assert!(config.allowed_tags.contains("p"));
///
/// assert!(SanitizerConfig::from_json(r#"{ "allowTags": [] }"#).is_err());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SanitizerConfig {
    /// Element names kept in the output. Every other element is unwrapped,
    /// or dropped with its subtree if it is inherently dangerous.
    #[serde(default)]
    pub allowed_tags: BTreeSet<String>,

    /// Attribute names kept on allowed elements. `None` keeps no attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_attributes: Option<AllowedAttributes>,

    /// URI schemes accepted in URI-valued attributes. `None` selects
    /// `http`, `https` and `mailto`; an empty set rejects every absolute URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_protocols: Option<BTreeSet<String>>,

    /// Origins (`scheme://host[:port]`) URIs must belong to. Empty means no
    /// origin restriction.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub allowed_origins: BTreeSet<String>,

    /// Regular expression every accepted URI must match in full.
    #[serde(
        default,
        rename = "allowedURIPattern",
        skip_serializing_if = "Option::is_none"
    )]
    pub allowed_uri_pattern: Option<String>,

    /// Base URL relative references are resolved against before checking
    /// their scheme and origin.
    #[serde(default, rename = "baseURL", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl SanitizerConfig {
    /// Parse an options dictionary from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Options for the "string only" profile: no element survives, every
    /// element is replaced by its text.
    pub fn string_only() -> Self {
        Self::default()
    }

    /// Options for the "simple" profile: a fixed set of inline formatting
    /// elements, no attributes.
    pub fn simple() -> Self {
        Self {
            allowed_tags: SIMPLE_TAGS.iter().map(|t| t.to_string()).collect(),
            ..Self::default()
        }
    }
}

/// Builder for configuring and compiling a [`Sanitizer`].
///
/// Each call adds to the underlying [`SanitizerConfig`]; nothing is validated
/// until [`build`](Self::build).
///
/// # Example
///
/// ```
/// use sane_html::SanitizerBuilder;
///
/// let sanitizer = SanitizerBuilder::new()
///     .allow_tags(["p", "a", "em"])
///     .allow_attributes("a", ["href", "title"])
///     .allow_protocols(["https"])
///     .build()
///     .unwrap();
///
/// let out = sanitizer.sane_string_from(r#"<p><a href="https://example.com" onclick="x()">hi</a></p>"#);
/// assert_eq!(out, r#"<p><a href="https://example.com">hi</a></p>"#);
/// ```
#[derive(Clone, Debug, Default)]
pub struct SanitizerBuilder {
    config: SanitizerConfig,
}

impl SanitizerBuilder {
    /// Create a builder with an empty allow-list (the "string only" policy).
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing options dictionary.
    pub fn from_config(config: SanitizerConfig) -> Self {
        Self { config }
    }

    /// Add element names to the tag allow-list.
    pub fn allow_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.config
            .allowed_tags
            .extend(tags.into_iter().map(Into::into));
        self
    }

    /// Allow the given attribute names on `tag`.
    pub fn allow_attributes<I, T>(mut self, tag: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut map = match self.config.allowed_attributes.take() {
            Some(AllowedAttributes::PerTag(map)) => map,
            Some(AllowedAttributes::Global(names)) if !names.is_empty() => {
                BTreeMap::from([(WILDCARD_TAG.to_string(), names)])
            }
            Some(AllowedAttributes::Global(_)) | None => BTreeMap::new(),
        };
        map.entry(tag.into())
            .or_default()
            .extend(attributes.into_iter().map(Into::into));
        self.config.allowed_attributes = Some(AllowedAttributes::PerTag(map));
        self
    }

    /// Allow the given attribute names on every kept element.
    pub fn allow_global_attributes<I, T>(self, attributes: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.allow_attributes(WILDCARD_TAG, attributes)
    }

    /// Add URI schemes to the protocol allow-list.
    ///
    /// The first call replaces the default `http`/`https`/`mailto` set.
    pub fn allow_protocols<I, T>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.config
            .allowed_protocols
            .get_or_insert_with(BTreeSet::new)
            .extend(protocols.into_iter().map(Into::into));
        self
    }

    /// Restrict URIs to the given origins.
    pub fn allow_origins<I, T>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.config
            .allowed_origins
            .extend(origins.into_iter().map(Into::into));
        self
    }

    /// Require every URI to match `pattern` in full.
    pub fn uri_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.allowed_uri_pattern = Some(pattern.into());
        self
    }

    /// Resolve relative URIs against `base` before validating them.
    pub fn base_url(mut self, base: impl Into<String>) -> Self {
        self.config.base_url = Some(base.into());
        self
    }

    /// The options dictionary assembled so far.
    pub fn config(&self) -> &SanitizerConfig {
        &self.config
    }

    /// Validate the options and compile them into a [`Sanitizer`].
    pub fn build(self) -> Result<Sanitizer> {
        Sanitizer::new(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_dictionary_is_string_only() {
        let config = SanitizerConfig::from_json("{}").unwrap();
        assert_eq!(config, SanitizerConfig::string_only());
        assert!(config.allowed_tags.is_empty());
        assert!(config.allowed_protocols.is_none());
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = SanitizerConfig::from_json(r#"{ "allowedElements": ["b"] }"#).unwrap_err();
        assert!(err.to_string().contains("allowedElements"));
    }

    #[test]
    fn camel_case_keys_are_recognized() {
        let config = SanitizerConfig::from_json(
            r#"{
                "allowedTags": ["a"],
                "allowedAttributes": { "a": ["href"] },
                "allowedProtocols": ["https"],
                "allowedOrigins": ["https://example.com"],
                "allowedURIPattern": "https://.*",
                "baseURL": "https://example.com/docs/"
            }"#,
        )
        .unwrap();
        assert!(config.allowed_tags.contains("a"));
        assert_eq!(
            config.allowed_protocols,
            Some(BTreeSet::from(["https".to_string()]))
        );
        assert!(config.allowed_origins.contains("https://example.com"));
        assert_eq!(config.allowed_uri_pattern.as_deref(), Some("https://.*"));
        assert_eq!(config.base_url.as_deref(), Some("https://example.com/docs/"));
    }

    #[test]
    fn allowed_attributes_accepts_array_or_object() {
        let global = SanitizerConfig::from_json(r#"{ "allowedAttributes": ["title", "lang"] }"#)
            .unwrap();
        assert_eq!(
            global.allowed_attributes,
            Some(AllowedAttributes::Global(BTreeSet::from([
                "lang".into(),
                "title".into()
            ])))
        );

        let per_tag =
            SanitizerConfig::from_json(r#"{ "allowedAttributes": { "*": ["title"], "img": ["src"] } }"#)
                .unwrap();
        let Some(AllowedAttributes::PerTag(map)) = per_tag.allowed_attributes else {
            panic!("expected per-tag attributes");
        };
        assert!(map["*"].contains("title"));
        assert!(map["img"].contains("src"));
    }

    #[test]
    fn wrong_value_type_is_rejected() {
        assert!(SanitizerConfig::from_json(r#"{ "allowedTags": "b" }"#).is_err());
        assert!(SanitizerConfig::from_json(r#"{ "allowedURIPattern": 3 }"#).is_err());
    }

    #[test]
    fn serializes_back_to_the_same_keys() {
        let config = SanitizerBuilder::new()
            .allow_tags(["a"])
            .allow_attributes("a", ["href"])
            .uri_pattern("https://.*")
            .config()
            .clone();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"allowedTags\""));
        assert!(json.contains("\"allowedAttributes\""));
        assert!(json.contains("\"allowedURIPattern\""));
        assert!(!json.contains("allowedOrigins"));
        assert_eq!(SanitizerConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn builder_merges_global_into_per_tag() {
        let config = SanitizerBuilder::from_config(SanitizerConfig {
            allowed_attributes: Some(AllowedAttributes::Global(BTreeSet::from(["title".into()]))),
            ..SanitizerConfig::default()
        })
        .allow_attributes("a", ["href"])
        .config()
        .clone();

        let Some(AllowedAttributes::PerTag(map)) = config.allowed_attributes else {
            panic!("expected per-tag attributes");
        };
        assert!(map[WILDCARD_TAG].contains("title"));
        assert!(map["a"].contains("href"));
    }

    #[test]
    fn builder_protocols_replace_defaults() {
        let config = SanitizerBuilder::new()
            .allow_protocols(["ftp"])
            .config()
            .clone();
        assert_eq!(
            config.allowed_protocols,
            Some(BTreeSet::from(["ftp".to_string()]))
        );
    }

    #[test]
    fn simple_profile_has_no_attributes() {
        let config = SanitizerConfig::simple();
        assert!(config.allowed_tags.contains("b"));
        assert!(config.allowed_tags.contains("em"));
        assert!(config.allowed_tags.contains("a"));
        assert!(config.allowed_attributes.is_none());
    }

    #[test]
    fn empty_attribute_lists_survive_serialization() {
        for json in [
            r#"{"allowedTags":["a"],"allowedAttributes":{"a":[]}}"#,
            r#"{"allowedTags":["a"],"allowedAttributes":[]}"#,
        ] {
            let config = SanitizerConfig::from_json(json).unwrap();
            assert!(config.allowed_attributes.as_ref().is_some_and(AllowedAttributes::is_empty));
            assert_eq!(serde_json::to_string(&config).unwrap(), json);
        }

        let absent = SanitizerConfig::from_json(r#"{"allowedTags":["a"]}"#).unwrap();
        assert!(!serde_json::to_string(&absent).unwrap().contains("allowedAttributes"));
    }
}
