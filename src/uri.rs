//! URI validation for URI-valued attributes.
//!
//! Strings are parsed with the WHATWG URL rules (the `url` crate), the same
//! rules a browser applies when it follows an `href` or loads a `src`. Leading
//! and trailing C0 controls and spaces are stripped and tabs and newlines are
//! removed before the scheme is read, so `" java\tscript:..."` is judged as the
//! `javascript:` URL a browser would see.

use std::collections::HashSet;
use std::fmt;

use regex::Regex;
use url::{Origin, ParseError, Url};

use crate::config::SanitizerConfig;
use crate::error::{ConfigurationError, Result};

/// Schemes accepted when `allowedProtocols` is not given.
pub const DEFAULT_PROTOCOLS: &[&str] = &["http", "https", "mailto"];

/// Base used only to check that a relative reference is well formed when no
/// base URL is configured.
const PLACEHOLDER_BASE: &str = "https://relative.invalid/";

fn scheme_regex() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9+.-]*$").expect("valid regex"))
}

/// Compiled URI rules: allowed schemes, allowed origins, an optional
/// whole-URI pattern and an optional base for relative references.
#[derive(Debug)]
pub struct UriRules {
    protocols: HashSet<String>,
    origins: Vec<Origin>,
    pattern: Option<Regex>,
    base: Option<Url>,
}

impl UriRules {
    /// Validate and compile the URI-related options of `config`.
    pub fn from_config(config: &SanitizerConfig) -> Result<Self> {
        let protocols = match &config.allowed_protocols {
            Some(protocols) => protocols
                .iter()
                .map(|p| normalize_protocol(p))
                .collect::<Result<HashSet<_>>>()?,
            None => DEFAULT_PROTOCOLS.iter().map(|p| p.to_string()).collect(),
        };

        let origins = config
            .allowed_origins
            .iter()
            .map(|o| parse_origin(o))
            .collect::<Result<Vec<_>>>()?;

        let pattern = config
            .allowed_uri_pattern
            .as_deref()
            .map(|p| Regex::new(&format!("^(?:{p})$")))
            .transpose()?;

        let base = config.base_url.as_deref().map(parse_base).transpose()?;

        Ok(Self {
            protocols,
            origins,
            pattern,
            base,
        })
    }

    fn allows_scheme(&self, scheme: &str) -> bool {
        self.protocols.contains(scheme)
    }

    fn allows_origin(&self, origin: &Origin) -> bool {
        self.origins.is_empty() || self.origins.contains(origin)
    }

    fn matches_pattern(&self, uri: &str) -> bool {
        self.pattern.as_ref().is_none_or(|re| re.is_match(uri))
    }
}

impl fmt::Display for UriRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} protocols, {} origins, pattern: {}, base: {}",
            self.protocols.len(),
            self.origins.len(),
            self.pattern.as_ref().map_or("none", Regex::as_str),
            self.base.as_ref().map_or("none", Url::as_str),
        )
    }
}

fn normalize_protocol(protocol: &str) -> Result<String> {
    let scheme = protocol.trim().trim_end_matches(':').to_ascii_lowercase();
    if scheme_regex().is_match(&scheme) {
        Ok(scheme)
    } else {
        Err(ConfigurationError::InvalidProtocol(protocol.to_string()))
    }
}

fn parse_origin(origin: &str) -> Result<Origin> {
    let invalid = |reason: String| ConfigurationError::InvalidOrigin {
        origin: origin.to_string(),
        reason,
    };

    let url = Url::parse(origin.trim()).map_err(|e| invalid(e.to_string()))?;
    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("must not carry a path, query or fragment".into()));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(invalid("must not carry credentials".into()));
    }
    let origin = url.origin();
    if !origin.is_tuple() {
        return Err(invalid("scheme has no host-based origin".into()));
    }
    Ok(origin)
}

fn parse_base(base: &str) -> Result<Url> {
    let invalid = |reason: String| ConfigurationError::InvalidBaseUrl {
        url: base.to_string(),
        reason,
    };

    let url = Url::parse(base.trim()).map_err(|e| invalid(e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(invalid("cannot be used as a base".into()));
    }
    Ok(url)
}

/// Apply the normalization a URL parser performs before reading the scheme:
/// strip leading and trailing C0 controls and spaces, drop tabs and newlines.
fn normalize(uri: &str) -> String {
    uri.trim_matches(|c: char| c <= ' ')
        .chars()
        .filter(|c| !matches!(c, '\t' | '\n' | '\r'))
        .collect()
}

/// A reference starting with two slashes (either direction) names a host
/// but takes its scheme from the document.
fn is_network_path(reference: &str) -> bool {
    let mut chars = reference.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some('/' | '\\'), Some('/' | '\\'))
    )
}

/// Decide whether `uri` may be kept in a URI-valued attribute under `rules`.
///
/// A URI is accepted when it parses, its scheme is allowed, its origin is
/// allowed (or no origin restriction is configured) and it matches the
/// pattern (if any). Relative references are resolved against the configured
/// base first; without a base they are rejected whenever an origin
/// restriction exists.
pub fn validate(uri: &str, rules: &UriRules) -> bool {
    let normalized = normalize(uri);

    match Url::parse(&normalized) {
        Ok(url) => validate_absolute(&url, rules),
        Err(ParseError::RelativeUrlWithoutBase) => match &rules.base {
            Some(base) => base
                .join(&normalized)
                .is_ok_and(|url| validate_absolute(&url, rules)),
            None => validate_unresolved(&normalized, rules),
        },
        Err(_) => false,
    }
}

fn validate_absolute(url: &Url, rules: &UriRules) -> bool {
    rules.allows_scheme(url.scheme())
        && rules.allows_origin(&url.origin())
        && rules.matches_pattern(url.as_str())
}

fn validate_unresolved(reference: &str, rules: &UriRules) -> bool {
    if !rules.origins.is_empty() {
        return false;
    }
    // The document's scheme is unknown, so a host reference must be fine under
    // either web scheme.
    if is_network_path(reference) && !(rules.allows_scheme("http") && rules.allows_scheme("https"))
    {
        return false;
    }
    let Ok(placeholder) = Url::parse(PLACEHOLDER_BASE) else {
        return false;
    };
    placeholder.join(reference).is_ok() && rules.matches_pattern(reference)
}

/// Validate every candidate URL of a `srcset` value.
///
/// The attribute is accepted only if it has at least one candidate and all
/// of them pass [`validate`].
pub fn validate_srcset(srcset: &str, rules: &UriRules) -> bool {
    let mut candidates = srcset
        .split(',')
        .filter_map(|candidate| candidate.split_ascii_whitespace().next())
        .peekable();
    candidates.peek().is_some() && candidates.all(|url| validate(url, rules))
}
