//! URL handling for Portico.
//!
//! - [`resolver`]: pure conversions between absolute and site-relative URLs,
//!   computed against an explicit [`UrlContext`] instead of process globals.
//! - [`routers`]: the rule-router contract used by the dispatcher and a
//!   reference [`PatternRouter`].
//!
//! ## Example
//!
//! ```
//! use portico_urls::{UrlContext, UrlResolver};
//!
//! let resolver = UrlResolver::new(
//!     UrlContext::new("/")
//!         .with_host("www.example.com")
//!         .with_request_uri("/about/team"),
//! );
//!
//! assert_eq!(
//!     resolver.to_absolute("contact", true).as_deref(),
//!     Some("http://www.example.com/contact")
//! );
//! assert_eq!(resolver.to_relative("http://www.example.com/contact"), "contact");
//! assert!(!resolver.is_site_url("//evil.example/phish"));
//! ```

pub mod resolver;
pub mod routers;

pub use resolver::{UrlContext, UrlResolver};
pub use routers::{
	Binding, PatternRouter, RedirectTarget, RouteResult, Rule, RuleRouter, RuleSet,
};
