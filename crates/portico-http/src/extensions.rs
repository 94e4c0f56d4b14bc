//! Typed per-request values shared between the dispatcher, hooks and handlers.

use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Type-keyed store, one value per type.
///
/// Clones share the same storage, so a value inserted by a pre-request hook
/// is visible to the handler and to the post-request hook.
#[derive(Clone, Default)]
pub struct Extensions {
	map: Arc<Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>>,
}

impl Extensions {
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert a value, returning the previous value of the same type.
	///
	/// # Examples
	///
	/// ```
	/// use portico_http::Extensions;
	///
	/// #[derive(Clone, Debug, PartialEq)]
	/// struct CurrentPage(u32);
	///
	/// let extensions = Extensions::new();
	/// assert_eq!(extensions.insert(CurrentPage(1)), None);
	/// assert_eq!(extensions.insert(CurrentPage(2)), Some(CurrentPage(1)));
	/// assert_eq!(extensions.get::<CurrentPage>(), Some(CurrentPage(2)));
	/// ```
	pub fn insert<T: Send + Sync + 'static>(&self, value: T) -> Option<T> {
		self.map
			.lock()
			.insert(TypeId::of::<T>(), Box::new(value))
			.and_then(|old| old.downcast::<T>().ok())
			.map(|old| *old)
	}

	/// Cloned value of type `T`, if present.
	pub fn get<T>(&self) -> Option<T>
	where
		T: Clone + Send + Sync + 'static,
	{
		self.map
			.lock()
			.get(&TypeId::of::<T>())
			.and_then(|boxed| boxed.downcast_ref::<T>())
			.cloned()
	}

	/// Run `f` against the stored value, if present.
	pub fn with<T, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R>
	where
		T: Send + Sync + 'static,
	{
		let mut map = self.map.lock();
		map.get_mut(&TypeId::of::<T>())
			.and_then(|boxed| boxed.downcast_mut::<T>())
			.map(f)
	}

	pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
		self.map.lock().contains_key(&TypeId::of::<T>())
	}

	pub fn remove<T: Send + Sync + 'static>(&self) -> Option<T> {
		self.map
			.lock()
			.remove(&TypeId::of::<T>())
			.and_then(|boxed| boxed.downcast::<T>().ok())
			.map(|value| *value)
	}

	pub fn len(&self) -> usize {
		self.map.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.map.lock().is_empty()
	}

	pub fn clear(&self) {
		self.map.lock().clear();
	}
}

impl fmt::Debug for Extensions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Extensions")
			.field("len", &self.len())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[derive(Clone, Debug, PartialEq)]
	struct Breadcrumbs(Vec<String>);

	#[test]
	fn test_clones_share_storage() {
		let extensions = Extensions::new();
		let shared = extensions.clone();

		shared.insert(Breadcrumbs(vec!["home".to_string()]));

		assert_eq!(
			extensions.get::<Breadcrumbs>(),
			Some(Breadcrumbs(vec!["home".to_string()]))
		);
	}

	#[test]
	fn test_with_mutates_in_place() {
		let extensions = Extensions::new();
		extensions.insert(Breadcrumbs(Vec::new()));

		let len = extensions.with(|crumbs: &mut Breadcrumbs| {
			crumbs.0.push("about".to_string());
			crumbs.0.len()
		});

		assert_eq!(len, Some(1));
		assert_eq!(extensions.with(|_: &mut u32| ()), None);
	}

	#[test]
	fn test_remove_and_clear() {
		let extensions = Extensions::new();
		extensions.insert(1u8);
		extensions.insert("page".to_string());

		assert_eq!(extensions.remove::<u8>(), Some(1));
		assert_eq!(extensions.len(), 1);

		extensions.clear();
		assert!(extensions.is_empty());
	}
}
