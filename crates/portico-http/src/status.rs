//! Registry of the HTTP status codes a [`Response`](crate::Response) accepts.

/// Registered status codes and their standard reason phrases.
pub const STATUS_CODES: &[(u16, &str)] = &[
	(100, "Continue"),
	(101, "Switching Protocols"),
	(200, "OK"),
	(201, "Created"),
	(202, "Accepted"),
	(203, "Non-Authoritative Information"),
	(204, "No Content"),
	(205, "Reset Content"),
	(206, "Partial Content"),
	(301, "Moved Permanently"),
	(302, "Found"),
	(303, "See Other"),
	(304, "Not Modified"),
	(305, "Use Proxy"),
	(307, "Temporary Redirect"),
	(400, "Bad Request"),
	(401, "Unauthorized"),
	(403, "Forbidden"),
	(404, "Not Found"),
	(405, "Method Not Allowed"),
	(406, "Not Acceptable"),
	(407, "Proxy Authentication Required"),
	(408, "Request Timeout"),
	(409, "Conflict"),
	(410, "Gone"),
	(411, "Length Required"),
	(412, "Precondition Failed"),
	(413, "Request Entity Too Large"),
	(414, "Request-URI Too Long"),
	(415, "Unsupported Media Type"),
	(416, "Request Range Not Satisfiable"),
	(417, "Expectation Failed"),
	(422, "Unprocessable Entity"),
	(500, "Internal Server Error"),
	(501, "Not Implemented"),
	(502, "Bad Gateway"),
	(503, "Service Unavailable"),
	(504, "Gateway Timeout"),
	(505, "HTTP Version Not Supported"),
];

/// Codes after which no further body-producing work should happen.
pub const FINISHED_CODES: &[u16] = &[301, 302, 401, 403];

/// Look up the registered description for `code`.
///
/// # Examples
///
/// ```
/// use portico_http::status::description;
///
/// assert_eq!(description(404), Some("Not Found"));
/// assert_eq!(description(418), None);
/// ```
pub fn description(code: u16) -> Option<&'static str> {
	STATUS_CODES
		.iter()
		.find(|(registered, _)| *registered == code)
		.map(|(_, description)| *description)
}

/// Returns true if `code` is in the registry.
pub fn is_registered(code: u16) -> bool {
	description(code).is_some()
}

/// Returns true for any 3xx code, registered or not.
pub fn is_redirect(code: u16) -> bool {
	(300..400).contains(&code)
}
