use super::Request;

impl Request {
	/// Returns true if the request arrived over HTTPS.
	///
	/// Either the transport reported a TLS connection, or a fronting proxy
	/// set `X-Forwarded-Protocol: https`.
	///
	/// # Examples
	///
	/// ```
	/// use portico_http::Request;
	///
	/// let request = Request::builder().uri("/").secure(true).build().unwrap();
	/// assert!(request.is_secure());
	///
	/// let request = Request::builder()
	///     .uri("/")
	///     .header("X-Forwarded-Protocol", "HTTPS")
	///     .build()
	///     .unwrap();
	/// assert!(request.is_secure());
	/// ```
	pub fn is_secure(&self) -> bool {
		if self.is_secure {
			return true;
		}
		self.header_str("x-forwarded-protocol")
			.is_some_and(|proto| proto.eq_ignore_ascii_case("https"))
	}

	/// `https` or `http`.
	pub fn scheme(&self) -> &'static str {
		if self.is_secure() { "https" } else { "http" }
	}

	/// Host (with port, if any) from the `Host` header.
	pub fn host(&self) -> Option<&str> {
		self.header_str("host").filter(|host| !host.is_empty())
	}

	/// `scheme://host`, when a host is known.
	pub fn scheme_and_host(&self) -> Option<String> {
		self.host().map(|host| format!("{}://{}", self.scheme(), host))
	}

	/// Path and query as received, e.g. `/about/team?page=2`.
	pub fn request_uri(&self) -> String {
		let base = self.base_url.trim_end_matches('/');
		let mut uri = format!("{}/{}", base, self.path);
		if self.trailing_slash {
			uri.push('/');
		}
		if let Some(query) = &self.raw_query {
			uri.push('?');
			uri.push_str(query);
		}
		uri
	}

	/// Returns true for requests sent with `X-Requested-With: XMLHttpRequest`.
	pub fn is_ajax(&self) -> bool {
		self.header_str("x-requested-with")
			.is_some_and(|value| value.eq_ignore_ascii_case("XMLHttpRequest"))
	}

	/// Header value as a string, skipping values that are not visible ASCII.
	pub fn header_str(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|value| value.to_str().ok())
	}
}
