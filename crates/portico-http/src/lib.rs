//! # Portico HTTP
//!
//! Message model shared by every Portico crate: the pre-parsed [`Request`]
//! handed over by the transport adapter, the [`Response`] produced by the
//! dispatch pipeline, per-request [`Session`] state and the framework-wide
//! [`Error`] type.
//!
//! ## Example
//!
//! ```
//! use portico_http::{Request, Response};
//! use http::Method;
//!
//! let request = Request::builder()
//!     .method(Method::GET)
//!     .uri("/about/team?page=2")
//!     .build()
//!     .unwrap();
//! assert_eq!(request.path(), "about/team");
//! assert_eq!(request.query_param("page"), Some("2"));
//!
//! let mut response = Response::new();
//! response.set_body("Hello");
//! assert_eq!(response.status_code(), 200);
//! assert_eq!(response.header("Content-Length"), Some("5"));
//! ```

pub mod error;
pub mod extensions;
pub mod request;
pub mod response;
pub mod session;
pub mod status;
pub mod upload;

pub use error::{Error, Result};
pub use extensions::Extensions;
pub use request::{Params, Request, RequestBuilder};
pub use response::Response;
pub use session::{
	InMemorySessionStore, Session, SessionId, SessionStore, is_truthy, is_truthy_str,
};
pub use upload::{UploadEntry, UploadRegistry, UploadVerifier, UploadedFile};
