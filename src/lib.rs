//! # sane_html
//!
//! An HTML sanitizer that turns untrusted markup into output free of script
//! execution vectors, under a reusable, immutable policy.
//!
//! ## Overview
//!
//! A [`Sanitizer`] is compiled once from a [`SanitizerConfig`] (the options
//! dictionary) and then applied to any number of inputs. Every element of
//! the parsed input is classified:
//!
//! - kept, with only the attributes the policy allows and only URIs that pass
//!   validation;
//! - unwrapped, the tag removed and its content spliced into the parent;
//! - dropped with its whole subtree, for elements in the closed drop-set
//!   (`script`, `style`, and other raw-text or foreign-content carriers) that
//!   no policy can allow.
//!
//! The tree walk is iterative and depth-limited, its output is a pure
//! function of input and policy, and sanitizing sanitized output changes
//! nothing.
//!
//! ## Quick start
//!
//! ```rust
//! use sane_html::{Sanitizer, SanitizerBuilder};
//!
//! let simple = Sanitizer::simple();
//! assert_eq!(simple.sane_string_from("<b>bold</b> text"), "<b>bold</b> text");
//! assert_eq!(
//!     simple.sane_string_from(r#"<a href="javascript:alert(1)">x</a>"#),
//!     "<a>x</a>"
//! );
//!
//! let links = SanitizerBuilder::new()
//!     .allow_tags(["a", "p"])
//!     .allow_attributes("a", ["href"])
//!     .allow_protocols(["https"])
//!     .build()
//!     .unwrap();
//! assert_eq!(
//!     links.sane_string_from(r#"<p><a href="https://example.com">ok</a><a href="http://example.com">no</a></p>"#),
//!     r#"<p><a href="https://example.com">ok</a><a>no</a></p>"#
//! );
//! ```
//!
//! ## Options
//!
//! | Key | Type | Meaning |
//! |-----|------|---------|
//! | `allowedTags` | array | Elements kept in the output. |
//! | `allowedAttributes` | array or object | Attributes kept, globally or per tag (`"*"` for any tag). |
//! | `allowedProtocols` | array | URI schemes accepted; defaults to `http`, `https`, `mailto`. |
//! | `allowedOrigins` | array | Origins URIs must belong to. |
//! | `allowedURIPattern` | string | Regular expression URIs must match in full. |
//! | `baseURL` | string | Base for resolving relative URIs. |

pub mod config;
pub mod error;
pub mod node;
pub mod parse;
pub mod policy;
pub mod sanitizer;
pub mod serialize;
pub mod uri;

pub use config::{AllowedAttributes, SanitizerBuilder, SanitizerConfig};
pub use error::{ConfigurationError, Result};
pub use node::{Element, Fragment, Node};
pub use parse::parse_fragment;
pub use policy::Policy;
pub use sanitizer::{Disposition, MAX_NESTING_DEPTH, SanitizeReport, Sanitizer, classify};
pub use uri::{UriRules, validate as validate_uri};
