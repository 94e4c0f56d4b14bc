use super::{Params, Request};
use http::HeaderMap;
use std::collections::HashMap;

impl Request {
	/// Decode an `application/x-www-form-urlencoded` query string.
	///
	/// Later occurrences of a key replace earlier ones.
	pub(super) fn parse_query(query: &str) -> Params {
		url::form_urlencoded::parse(query.as_bytes())
			.into_owned()
			.collect()
	}

	pub(super) fn parse_cookie_header(headers: &HeaderMap) -> HashMap<String, String> {
		headers
			.get_all(http::header::COOKIE)
			.iter()
			.filter_map(|value| value.to_str().ok())
			.flat_map(|value| value.split(';'))
			.filter_map(|pair| {
				let (name, value) = pair.trim().split_once('=')?;
				if name.is_empty() {
					return None;
				}
				Some((name.to_string(), value.to_string()))
			})
			.collect()
	}

	/// Get a decoded query variable.
	///
	/// # Examples
	///
	/// ```
	/// use portico_http::Request;
	///
	/// let request = Request::builder()
	///     .uri("/search?q=hello%20world&isDev=1")
	///     .build()
	///     .unwrap();
	///
	/// assert_eq!(request.query_param("q"), Some("hello world"));
	/// assert_eq!(request.query_param("isDev"), Some("1"));
	/// assert_eq!(request.query_param("missing"), None);
	/// ```
	pub fn query_param(&self, name: &str) -> Option<&str> {
		self.query.get(name).map(String::as_str)
	}

	pub fn query_params(&self) -> &Params {
		&self.query
	}

	pub fn post_var(&self, name: &str) -> Option<&str> {
		self.post_vars.get(name).map(String::as_str)
	}

	pub fn post_vars(&self) -> &Params {
		&self.post_vars
	}

	/// Look up a variable in the post body first, then in the query string.
	pub fn request_var(&self, name: &str) -> Option<&str> {
		self.post_var(name).or_else(|| self.query_param(name))
	}

	/// Push the parameters captured by one routing stage.
	pub fn push_params(&mut self, params: Params) {
		self.param_stack.push(params);
	}

	/// Parameters captured by the most recent routing stage.
	pub fn latest_params(&self) -> Option<&Params> {
		self.param_stack.last()
	}

	/// Look up a routing parameter, most recent stage first.
	///
	/// # Examples
	///
	/// ```
	/// use portico_http::Request;
	/// use std::collections::HashMap;
	///
	/// let mut request = Request::builder().uri("/blog/2024/hello").build().unwrap();
	/// request.push_params(HashMap::from([
	///     ("Controller".to_string(), "blog".to_string()),
	///     ("Action".to_string(), "archive".to_string()),
	/// ]));
	/// request.push_params(HashMap::from([("Action".to_string(), "show".to_string())]));
	///
	/// assert_eq!(request.param("Action"), Some("show"));
	/// assert_eq!(request.param("Controller"), Some("blog"));
	/// assert_eq!(request.param("ID"), None);
	/// ```
	pub fn param(&self, name: &str) -> Option<&str> {
		self.param_stack
			.iter()
			.rev()
			.find_map(|params| params.get(name))
			.map(String::as_str)
	}

	/// Query vars, post vars and routing parameters merged into one map.
	///
	/// Later sources win: post vars override query vars, routing stages
	/// override both, and later stages override earlier ones.
	pub fn all_params(&self) -> Params {
		let mut merged = self.query.clone();
		merged.extend(self.post_vars.iter().map(|(k, v)| (k.clone(), v.clone())));
		for params in &self.param_stack {
			merged.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
		}
		merged
	}
}
