//! Allow-list HTML sanitizer. A [`Policy`] names the tags, attributes and URL schemes that may
//! survive; a [`Cleaner`] copies what the policy allows into a fresh tree, or reports whether
//! markup already conforms.
//!
//! ```
//! use safelist::Policy;
//!
//! let html = "<p><a href='http://example.com/' onclick='stealCookies()'>Link</a></p>";
//! assert_eq!(
//!     safelist::clean(html, &Policy::basic()).unwrap(),
//!     "<p><a href=\"http://example.com/\" rel=\"nofollow\">Link</a></p>"
//! );
//! ```
#![warn(clippy::all)]
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate html5ever;
#[macro_use]
extern crate log;
#[macro_use]
extern crate maplit;

pub mod arena_dom;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod policy;
pub mod protocol;
pub mod transformer;

pub use cleaner::Cleaner;
pub use config::Preset;
pub use error::Error;
pub use policy::Policy;

/// Cleans body content. Relative links are dropped unless the policy preserves them.
pub fn clean(body_html: &str, policy: &Policy) -> Result<String, Error> {
    Cleaner::new(policy).clean_body_html(body_html, None)
}

/// Cleans body content, resolving relative links against `base_uri`.
pub fn clean_with_base_uri(
    body_html: &str,
    base_uri: &str,
    policy: &Policy,
) -> Result<String, Error> {
    Cleaner::new(policy).clean_body_html(body_html, Some(base_uri))
}

pub fn is_valid(body_html: &str, policy: &Policy) -> bool {
    Cleaner::new(policy).is_valid_body_html(body_html)
}
