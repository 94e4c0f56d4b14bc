use portico_http::{Params, Request};

use super::{RouteResult, RuleRouter, RuleSet};

/// Segment-based rule router.
///
/// Patterns are matched against the request path segment by segment:
///
/// - `""` or `"/"` matches only the site root;
/// - a literal segment must equal the path segment;
/// - `$Name` captures the path segment as parameter `Name` and may be absent
///   when the path runs out, `$Name!` must be present.
///
/// Path segments beyond the pattern are left for the handler as the
/// request's remaining path. A target of the form `$Name` names the handler
/// through a captured parameter.
///
/// # Examples
///
/// ```
/// use portico_http::Request;
/// use portico_urls::{PatternRouter, RouteResult, RuleRouter, RuleSet};
///
/// let mut rules = RuleSet::new();
/// rules.add(100, "blog/$Year!/$Slug", "BlogHandler");
///
/// let request = Request::builder().uri("/blog/2024/hello/comments").build().unwrap();
/// let Some(RouteResult::Binding(binding)) = PatternRouter.resolve(&request, &rules) else {
///     panic!("expected a binding");
/// };
///
/// assert_eq!(binding.handler, "BlogHandler");
/// assert_eq!(binding.params["Year"], "2024");
/// assert_eq!(binding.params["Slug"], "hello");
/// assert_eq!(binding.consumed, 3);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternRouter;

impl PatternRouter {
	/// Match `pattern` against `segments`, returning captured params and the
	/// number of consumed segments.
	fn match_pattern(pattern: &str, segments: &[&str]) -> Option<(Params, usize)> {
		let parts: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
		if parts.is_empty() {
			return segments.is_empty().then(|| (Params::new(), 0));
		}

		let mut params = Params::new();
		let mut consumed = 0;
		for (idx, part) in parts.iter().enumerate() {
			let segment = segments.get(idx);
			match part.strip_prefix('$') {
				Some(name) => {
					let (name, required) = match name.strip_suffix('!') {
						Some(name) => (name, true),
						None => (name, false),
					};
					match segment {
						Some(value) => {
							params.insert(name.to_string(), (*value).to_string());
							consumed += 1;
						}
						None if required => return None,
						None => {}
					}
				}
				None => {
					if segment != Some(part) {
						return None;
					}
					consumed += 1;
				}
			}
		}
		Some((params, consumed))
	}
}

impl RuleRouter for PatternRouter {
	fn resolve(&self, request: &Request, rules: &RuleSet) -> Option<RouteResult> {
		let segments = request.remaining_segments();
		for rule in rules.iter() {
			let Some((params, consumed)) = Self::match_pattern(&rule.pattern, &segments) else {
				continue;
			};
			tracing::debug!(pattern = %rule.pattern, target = %rule.target, "Rule matched");

			let target = match rule.target.strip_prefix('$') {
				Some(name) => params.get(name).cloned().unwrap_or_default(),
				None => rule.target.clone(),
			};
			return Some(RouteResult::from_target(&target, params, consumed));
		}
		None
	}
}
