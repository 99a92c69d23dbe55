//! Volatile caches.
//!
//! Values that are cheap to recompute but read often (aggregate stats
//! over a whole fit) are kept in a [`VolatileCell`] and dropped wholesale
//! at a point the caller chooses, typically after a batch of edits.

/// Something holding volatile cached data.
pub trait Volatile {
    /// Drop every volatile value, so the next read recomputes it.
    fn clear_volatile(&mut self);
}

/// A lazily computed value that stays until explicitly cleared.
///
/// # Examples
///
/// ```rust
/// use fitcalc::volatile::{Volatile, VolatileCell};
///
/// let mut calls = 0;
/// let mut cell = VolatileCell::new();
///
/// assert_eq!(*cell.get_or_init(|| { calls += 1; 42 }), 42);
/// assert_eq!(*cell.get_or_init(|| { calls += 1; 0 }), 42);
/// cell.clear_volatile();
/// assert_eq!(*cell.get_or_init(|| { calls += 1; 7 }), 7);
/// assert_eq!(calls, 2);
/// ```
#[derive(Debug, Clone)]
pub struct VolatileCell<T> {
    value: Option<T>,
}

impl<T> VolatileCell<T> {
    pub const fn new() -> Self {
        Self { value: None }
    }

    /// The cached value, without computing it.
    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn is_cached(&self) -> bool {
        self.value.is_some()
    }

    pub fn get_or_init(&mut self, init: impl FnOnce() -> T) -> &T {
        self.value.get_or_insert_with(init)
    }

    /// Like [`get_or_init`](Self::get_or_init); a failed computation
    /// leaves the cell empty.
    pub fn get_or_try_init<E>(&mut self, init: impl FnOnce() -> Result<T, E>) -> Result<&T, E> {
        let value = match self.value.take() {
            Some(value) => value,
            None => init()?,
        };
        Ok(self.value.insert(value))
    }

    pub fn clear(&mut self) {
        self.value = None;
    }
}

impl<T> Default for VolatileCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Volatile for VolatileCell<T> {
    fn clear_volatile(&mut self) {
        self.clear();
    }
}
