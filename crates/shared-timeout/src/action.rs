//! # Timeout Actions
//!
//! The capability a registry value exposes to the sweep. Every value type
//! stored in a [`TimeoutRegistry`](crate::TimeoutRegistry) implements
//! [`TimeoutAction`], even if only as a no-op.

use std::fmt;
use std::sync::Arc;

/// Action run once when an entry is evicted because its deadline passed.
///
/// The value is consumed: after `on_timeout` returns it is dropped.
pub trait TimeoutAction: Send {
    /// Called exactly once, outside the registry lock.
    fn on_timeout(self);
}

/// By-reference timeout hook for values held behind a shared handle.
///
/// `Arc<T>` implements [`TimeoutAction`] for every `T: TimeoutHook`, so a
/// registry of `Arc<dyn SomeTrait>` fires the hook of the pointee.
pub trait TimeoutHook: Send + Sync {
    /// Called exactly once when the owning registry entry expires.
    fn on_timeout(&self);
}

impl<T: TimeoutHook + ?Sized> TimeoutAction for Arc<T> {
    fn on_timeout(self) {
        TimeoutHook::on_timeout(&*self);
    }
}

impl<T: TimeoutAction> TimeoutAction for Option<T> {
    fn on_timeout(self) {
        if let Some(value) = self {
            value.on_timeout();
        }
    }
}

/// A value paired with a timeout callback field.
pub struct WithTimeout<V> {
    /// The stored value.
    pub value: V,
    timeout_cb: Option<Box<dyn FnOnce() + Send>>,
}

impl<V> WithTimeout<V> {
    /// Wrap `value`, running `on_timeout` if the entry expires.
    pub fn new(value: V, on_timeout: impl FnOnce() + Send + 'static) -> Self {
        Self {
            value,
            timeout_cb: Some(Box::new(on_timeout)),
        }
    }

    /// Wrap `value` without a callback; eviction is silent.
    pub fn silent(value: V) -> Self {
        Self {
            value,
            timeout_cb: None,
        }
    }

    /// Whether a callback is attached.
    #[must_use]
    pub fn has_callback(&self) -> bool {
        self.timeout_cb.is_some()
    }

    /// Discard the callback and return the value.
    pub fn into_inner(self) -> V {
        self.value
    }
}

impl<V: Send> TimeoutAction for WithTimeout<V> {
    fn on_timeout(self) {
        if let Some(cb) = self.timeout_cb {
            cb();
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for WithTimeout<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WithTimeout")
            .field("value", &self.value)
            .field("has_callback", &self.timeout_cb.is_some())
            .finish()
    }
}

macro_rules! silent_timeout {
    ($($ty:ty),* $(,)?) => {
        $(
            impl TimeoutAction for $ty {
                fn on_timeout(self) {}
            }
        )*
    };
}

silent_timeout!(
    (),
    bool,
    u8,
    u16,
    u32,
    u64,
    usize,
    i32,
    i64,
    f64,
    String,
    &'static str,
    Vec<u8>,
);
