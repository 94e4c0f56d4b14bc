//! Rule routing.
//!
//! A [`RuleSet`] is an ordered list of URL rules. A [`RuleRouter`] picks the
//! rule that handles a request and reports a [`RouteResult`]: either a
//! redirect or a binding to a handler identifier plus captured parameters.

mod pattern;
mod rule;

pub use pattern::PatternRouter;
pub use rule::{Binding, RedirectTarget, RouteResult, Rule, RuleSet};

use portico_http::Request;

/// Picks the rule that handles a request.
///
/// `None` is a routing miss: no rule applies and the dispatcher produces no
/// response.
pub trait RuleRouter: Send + Sync {
	fn resolve(&self, request: &Request, rules: &RuleSet) -> Option<RouteResult>;
}
