//! Uploaded file descriptors and provenance checks.
//!
//! The transport adapter writes uploads to temporary files and describes them
//! with [`UploadedFile`]. Before anything else touches a request, every
//! temporary path is checked against an [`UploadVerifier`] so a crafted form
//! field cannot point a handler at an arbitrary file on disk.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};

/// One file of an upload field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadEntry {
	pub filename: String,
	/// Temporary location. `None` when the client sent the field empty.
	pub tmp_path: Option<PathBuf>,
	pub content_type: Option<String>,
	pub size: u64,
}

/// An upload form field, holding one or many files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
	pub field: String,
	pub entries: Vec<UploadEntry>,
}

impl UploadedFile {
	/// Single-file field.
	pub fn single(field: impl Into<String>, entry: UploadEntry) -> Self {
		Self {
			field: field.into(),
			entries: vec![entry],
		}
	}

	/// Check every non-empty temporary path with `verifier`.
	///
	/// # Errors
	///
	/// Returns [`Error::MalformedRequest`] naming the field on the first path
	/// the verifier does not recognise.
	pub fn verify(&self, verifier: &dyn UploadVerifier) -> Result<()> {
		for entry in &self.entries {
			let Some(path) = entry.tmp_path.as_deref() else {
				continue;
			};
			if !verifier.is_genuine(path) {
				tracing::warn!(field = %self.field, path = %path.display(), "Rejected upload with unknown temporary file");
				return Err(Error::MalformedRequest(format!(
					"File upload '{}' doesn't appear to be a valid upload",
					self.field
				)));
			}
		}
		Ok(())
	}
}

/// Decides whether a temporary path was really produced by the transport.
pub trait UploadVerifier: Send + Sync {
	fn is_genuine(&self, path: &Path) -> bool;
}

/// Verifier backed by the set of paths the transport registered.
///
/// # Examples
///
/// ```
/// use portico_http::{UploadEntry, UploadRegistry, UploadedFile};
/// use std::path::PathBuf;
///
/// let registry = UploadRegistry::new();
/// registry.register("/tmp/upload-1");
///
/// let file = UploadedFile::single("avatar", UploadEntry {
///     filename: "me.png".to_string(),
///     tmp_path: Some(PathBuf::from("/tmp/upload-1")),
///     content_type: Some("image/png".to_string()),
///     size: 128,
/// });
/// assert!(file.verify(&registry).is_ok());
///
/// let forged = UploadedFile::single("avatar", UploadEntry {
///     filename: "passwd".to_string(),
///     tmp_path: Some(PathBuf::from("/etc/passwd")),
///     content_type: None,
///     size: 0,
/// });
/// assert!(forged.verify(&registry).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct UploadRegistry {
	paths: Arc<Mutex<HashSet<PathBuf>>>,
}

impl UploadRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(&self, path: impl Into<PathBuf>) {
		self.paths.lock().insert(path.into());
	}

	/// Forget a path once its temporary file has been cleaned up.
	pub fn unregister(&self, path: &Path) -> bool {
		self.paths.lock().remove(path)
	}

	/// Register every temporary path of `files`.
	pub fn register_all(&self, files: &[UploadedFile]) {
		let mut paths = self.paths.lock();
		for entry in files.iter().flat_map(|file| &file.entries) {
			if let Some(path) = &entry.tmp_path {
				paths.insert(path.clone());
			}
		}
	}
}

impl UploadVerifier for UploadRegistry {
	fn is_genuine(&self, path: &Path) -> bool {
		self.paths.lock().contains(path)
	}
}
