use std::{
    rc::{Rc, Weak},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

/// A single-threaded, reference-counted resource with interior mutability.
///
/// `StResource` uses `Rc<RwLock<T>>` internally. Every strong handle shares ownership of the
/// value; [`StResource::downgrade`] hands out a non-owning [`StWeak`] that can be upgraded
/// again as long as at least one strong handle is alive.
///
/// # Type Parameters
/// - `T`: The type of the contained resource
///
/// # Examples
///
/// ```
/// use cubewar::core::StResource;
///
/// let counter = StResource::new(0);
/// *counter.get_mut() += 1;
/// assert_eq!(*counter.get(), 1);
///
/// let observer = counter.downgrade();
/// assert!(observer.upgrade().is_some());
/// drop(counter);
/// assert!(observer.upgrade().is_none());
/// ```
///
/// # Panics
/// - Panics if a read guard is alive while trying to acquire a write guard in the same thread
/// - Panics if a write guard is alive while trying to acquire any guard in the same thread
pub struct StResource<T> {
    /// Shared storage behind every handle.
    pub resource: Rc<RwLock<T>>,
}

impl<T> StResource<T> {
    /// Creates a new `StResource` containing the given value.
    ///
    /// # Arguments
    /// * `resource` - The value to be stored in the resource
    pub fn new(resource: T) -> Self {
        Self {
            resource: Rc::new(RwLock::new(resource)),
        }
    }

    /// Returns a read-only guard that allows reading the contained value.
    ///
    /// # Panics
    /// Panics if the lock is poisoned or a write guard is alive.
    pub fn get(&self) -> RwLockReadGuard<'_, T> {
        self.resource.read().unwrap()
    }

    /// Returns a mutable guard that allows modifying the contained value.
    ///
    /// # Panics
    /// Panics if the lock is poisoned or any other guard is alive.
    pub fn get_mut(&self) -> RwLockWriteGuard<'_, T> {
        self.resource.write().unwrap()
    }

    /// Creates a non-owning handle to the same value.
    pub fn downgrade(&self) -> StWeak<T> {
        StWeak {
            resource: Rc::downgrade(&self.resource),
        }
    }

    /// Returns `true` when both handles point at the same allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.resource, &other.resource)
    }

    /// Number of strong handles currently sharing the value.
    pub fn strong_count(&self) -> usize {
        Rc::strong_count(&self.resource)
    }
}

impl<T> Clone for StResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}

/// Non-owning counterpart of [`StResource`].
///
/// Upgrading fails once every strong handle has been dropped; callers treat that as an
/// ordinary outcome rather than an error.
pub struct StWeak<T> {
    resource: Weak<RwLock<T>>,
}

impl<T> StWeak<T> {
    /// A weak handle that never upgrades.
    pub fn new() -> Self {
        Self {
            resource: Weak::new(),
        }
    }

    /// Attempts to recover a strong handle.
    pub fn upgrade(&self) -> Option<StResource<T>> {
        self.resource
            .upgrade()
            .map(|resource| StResource { resource })
    }

    /// `true` once the value has been dropped.
    pub fn is_expired(&self) -> bool {
        self.resource.strong_count() == 0
    }

    /// Returns `true` when this handle observes the allocation owned by `strong`.
    pub fn points_to(&self, strong: &StResource<T>) -> bool {
        std::ptr::eq(self.resource.as_ptr(), Rc::as_ptr(&strong.resource))
    }
}

impl<T> Clone for StWeak<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}

impl<T> Default for StWeak<T> {
    fn default() -> Self {
        Self::new()
    }
}
