//! The [`Sanitizer`] façade: an immutable policy bound to the sanitize
//! operations.
//!
//! - [`classify`] decides what happens to a single node.
//! - [`engine`] rewrites a whole tree with an explicit stack.

pub mod classify;
pub mod engine;

use std::sync::OnceLock;

pub use classify::{Disposition, classify};
pub use engine::{MAX_NESTING_DEPTH, SanitizeReport};

use crate::config::{SanitizerBuilder, SanitizerConfig};
use crate::error::Result;
use crate::node::{Fragment, Node};
use crate::parse::parse_fragment;
use crate::policy::Policy;

/// Sanitizes untrusted HTML under a fixed policy.
///
/// A sanitizer is built once from a [`SanitizerConfig`] and never changes
/// afterwards. All operations take `&self` and touch no shared mutable state,
/// so one instance can serve any number of threads.
///
/// # Example
///
/// ```
/// use sane_html::Sanitizer;
///
/// let simple = Sanitizer::simple();
/// assert_eq!(
///     simple.sane_string_from("<b>bold</b><script>alert(4)</script> text"),
///     "<b>bold</b> text"
/// );
///
/// let text_only = Sanitizer::string_only();
/// assert_eq!(text_only.sane_string_from("<b>bold</b> text"), "bold text");
/// ```
#[derive(Debug)]
pub struct Sanitizer {
    config: SanitizerConfig,
    policy: Policy,
}

impl Sanitizer {
    /// Validate `config` and compile it into a sanitizer.
    ///
    /// Fails with a [`ConfigurationError`](crate::ConfigurationError) on an
    /// invalid tag or attribute name, protocol, origin, pattern or base URL.
    pub fn new(config: SanitizerConfig) -> Result<Self> {
        let policy = Policy::compile(&config)?;
        Ok(Self { config, policy })
    }

    /// Build a sanitizer from a JSON options dictionary.
    ///
    /// ```
    /// use sane_html::Sanitizer;
    ///
    /// let sanitizer = Sanitizer::from_json(r#"{ "allowedTags": ["p"] }"#).unwrap();
    /// assert_eq!(sanitizer.sane_string_from("<p><b>x</b></p>"), "<p>x</p>");
    ///
    /// assert!(Sanitizer::from_json(r#"{ "allowedTagz": ["p"] }"#).is_err());
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        Self::new(SanitizerConfig::from_json(json)?)
    }

    /// Start a [`SanitizerBuilder`].
    pub fn builder() -> SanitizerBuilder {
        SanitizerBuilder::new()
    }

    /// The shared "string only" sanitizer: every element is unwrapped to its
    /// text, drop-set elements vanish with their content.
    pub fn string_only() -> &'static Sanitizer {
        static STRING_ONLY: OnceLock<Sanitizer> = OnceLock::new();
        STRING_ONLY.get_or_init(|| Self::profile(SanitizerConfig::string_only()))
    }

    /// The shared "simple" sanitizer: inline formatting elements survive
    /// without attributes.
    pub fn simple() -> &'static Sanitizer {
        static SIMPLE: OnceLock<Sanitizer> = OnceLock::new();
        SIMPLE.get_or_init(|| Self::profile(SanitizerConfig::simple()))
    }

    fn profile(config: SanitizerConfig) -> Self {
        Self::new(config).unwrap_or_else(|e| panic!("Built-in profile is invalid: {e}"))
    }

    /// Parse `input`, sanitize it and serialize the result.
    pub fn sane_string_from(&self, input: &str) -> String {
        self.sane_fragment_from(input).to_html()
    }

    /// Parse `input` and return the sanitized tree.
    pub fn sane_fragment_from(&self, input: &str) -> Fragment {
        self.sanitize_tree(&parse_fragment(input))
    }

    /// Like [`sane_fragment_from`](Self::sane_fragment_from), also reporting
    /// what was removed.
    pub fn sane_fragment_with_report(&self, input: &str) -> (Fragment, SanitizeReport) {
        engine::sanitize_with_report(&parse_fragment(input), &self.policy)
    }

    /// Sanitize an already-built tree.
    pub fn sanitize_tree(&self, root: &Node) -> Fragment {
        engine::sanitize(root, &self.policy)
    }

    /// The options dictionary this sanitizer was built from, unchanged.
    pub fn creation_options(&self) -> &SanitizerConfig {
        &self.config
    }

    /// The compiled policy.
    pub fn policy(&self) -> &Policy {
        &self.policy
    }
}
