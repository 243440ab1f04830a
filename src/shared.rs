use std::sync::{Arc, Mutex, PoisonError};

/// Lock-protected value shared between the engine and its sensor callback.
///
/// Every access goes through a closure, so a reader sees either all of an
/// update or none of it.
#[derive(Debug, Default)]
pub struct SharedState<T> {
    inner: Arc<Mutex<T>>,
}

impl<T> SharedState<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(value)),
        }
    }

    /// Runs `f` with exclusive access to the value.
    pub fn open<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        // a panicked sample callback leaves the state consistent
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Another handle onto the same value.
    pub fn clone_handle(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
