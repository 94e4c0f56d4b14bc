use portico_http::Params;
use std::cmp::Reverse;

/// One URL rule: a pattern and the target it routes to.
///
/// Targets starting with `->` are redirects (`->/home`, `->301 /home`);
/// anything else names a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
	pub priority: i32,
	pub pattern: String,
	pub target: String,
}

impl Rule {
	pub fn new(priority: i32, pattern: impl Into<String>, target: impl Into<String>) -> Self {
		Self {
			priority,
			pattern: pattern.into(),
			target: target.into(),
		}
	}
}

/// Rules ordered by descending priority.
///
/// Rules with equal priority keep the order they were added in. A rule set is
/// built once at startup and shared read-only between requests.
///
/// # Examples
///
/// ```
/// use portico_urls::RuleSet;
///
/// let mut rules = RuleSet::new();
/// rules.add(10, "admin", "AdminHandler");
/// rules.add(100, "", "->/home");
/// rules.add(10, "dev", "DevHandler");
///
/// let patterns: Vec<&str> = rules.iter().map(|rule| rule.pattern.as_str()).collect();
/// assert_eq!(patterns, ["", "admin", "dev"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
	rules: Vec<Rule>,
}

impl RuleSet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add(&mut self, priority: i32, pattern: impl Into<String>, target: impl Into<String>) {
		self.push(Rule::new(priority, pattern, target));
	}

	/// Add several `(pattern, target)` rules sharing one priority.
	pub fn add_rules<I, P, T>(&mut self, priority: i32, rules: I)
	where
		I: IntoIterator<Item = (P, T)>,
		P: Into<String>,
		T: Into<String>,
	{
		for (pattern, target) in rules {
			self.rules.push(Rule::new(priority, pattern, target));
		}
		self.sort();
	}

	pub fn push(&mut self, rule: Rule) {
		self.rules.push(rule);
		self.sort();
	}

	fn sort(&mut self) {
		// stable: equal priorities keep insertion order
		self.rules.sort_by_key(|rule| Reverse(rule.priority));
	}

	pub fn iter(&self) -> impl Iterator<Item = &Rule> {
		self.rules.iter()
	}

	pub fn len(&self) -> usize {
		self.rules.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rules.is_empty()
	}
}

impl FromIterator<Rule> for RuleSet {
	fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
		let mut set = Self {
			rules: iter.into_iter().collect(),
		};
		set.sort();
		set
	}
}

/// Where a redirect rule sends the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
	pub location: String,
	/// Explicit status code, 302 when absent.
	pub code: Option<u16>,
}

/// A matched rule bound to a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
	pub handler: String,
	pub params: Params,
	/// Number of path segments the rule consumed.
	pub consumed: usize,
}

/// Outcome of routing a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteResult {
	Redirect(RedirectTarget),
	Binding(Binding),
}

impl RouteResult {
	/// Interpret a rule target.
	///
	/// # Examples
	///
	/// ```
	/// use portico_urls::{RedirectTarget, RouteResult};
	/// use std::collections::HashMap;
	///
	/// assert_eq!(
	///     RouteResult::from_target("->/home", HashMap::new(), 0),
	///     RouteResult::Redirect(RedirectTarget { location: "/home".to_string(), code: None })
	/// );
	/// assert_eq!(
	///     RouteResult::from_target("->301 /new-home", HashMap::new(), 0),
	///     RouteResult::Redirect(RedirectTarget { location: "/new-home".to_string(), code: Some(301) })
	/// );
	/// assert!(matches!(
	///     RouteResult::from_target("PageHandler", HashMap::new(), 1),
	///     RouteResult::Binding(binding) if binding.handler == "PageHandler" && binding.consumed == 1
	/// ));
	/// ```
	pub fn from_target(target: &str, params: Params, consumed: usize) -> Self {
		match target.strip_prefix("->") {
			Some(redirect) => RouteResult::Redirect(parse_redirect(redirect)),
			None => RouteResult::Binding(Binding {
				handler: target.trim().to_string(),
				params,
				consumed,
			}),
		}
	}
}

/// Parse `"/home"` or `"301 /home"`.
pub(crate) fn parse_redirect(spec: &str) -> RedirectTarget {
	let spec = spec.trim();
	if let Some((code, location)) = spec.split_once(char::is_whitespace)
		&& code.len() == 3
		&& let Ok(code) = code.parse::<u16>()
	{
		return RedirectTarget {
			location: location.trim().to_string(),
			code: Some(code),
		};
	}
	RedirectTarget {
		location: spec.to_string(),
		code: None,
	}
}
